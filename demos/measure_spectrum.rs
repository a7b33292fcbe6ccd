// Spectrum measurement example
//
// Runs one adaptive measurement and prints the resulting spectrum and
// colorimetry. The polling loop lives here, in the caller: the library
// never sleeps or retries on its own.

use std::sync::Arc;
use std::thread;

use radiospec_rs::{
    AdaptationSettings, DeviceRegistry, MeasurementController, RadioExtended, RuntimeConfig,
    SimulatedDriver,
};

const CONFIG: &str = r#"
[poll]
poll_interval_ms = 25
max_poll_attempts = 40
"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("Spectrum Measurement Example");
    println!("============================\n");

    let config = RuntimeConfig::from_toml_str(CONFIG)?;
    let driver = Arc::new(SimulatedDriver::new().with_polls_until_done(5));
    let registry = DeviceRegistry::<RadioExtended>::new(driver);

    let session = registry.open_first()?;
    println!("Opened {} device at {}\n", session.family_name(), session.selector());
    let mut controller = MeasurementController::new(session);

    // 1. Start an adaptive measurement
    println!("1. Measuring with automatic exposure...");
    controller.measure_with_adaptation(&AdaptationSettings::new(2_000.0, 8))?;

    // 2. Poll until the instrument is done, or give up
    let mut finished = false;
    for attempt in 1..=config.poll.max_poll_attempts {
        let status = controller.poll()?;
        if let Some(report) = status.adaptation {
            println!(
                "   poll {:>2}: {} ms x {}{}",
                attempt,
                report.integration_time_ms,
                report.average_count,
                if report.complete { " (settled)" } else { "" }
            );
        }
        if !status.is_measuring() {
            finished = true;
            break;
        }
        thread::sleep(config.poll.interval());
    }

    if !finished {
        println!("Measurement did not finish in time, aborting");
        controller.break_measurement()?;
        return Ok(());
    }

    // 3. Read the results
    let mut result = controller.fetch()?;
    let exposure = result.exposure()?;
    println!(
        "\n2. Exposure: {} ms x {}, peak {:.0} counts at pixel {}{}",
        exposure.integration_time_ms,
        exposure.average_count,
        exposure.peak_counts,
        exposure.peak_pixel,
        if exposure.is_saturated() { " (saturated)" } else { "" }
    );

    let spectrum = result.spectrum(380.0, 780.0, 10.0)?;
    println!("\n3. Spectrum (10 nm steps):");
    println!("{}", spectrum.to_frame()?);

    let xy = result.chromaticity()?;
    let cct = result.color_temperature()?;
    let cri = result.color_rendering()?;
    let tm30 = result.tm30()?;
    println!("\n4. Colorimetry:");
    println!("   x = {:.4}, y = {:.4}, u' = {:.4}, v' = {:.4}", xy.x, xy.y, xy.u_prime, xy.v_prime);
    println!("   CCT = {:.0} K, Duv = {:.4}", cct.cct, cct.duv);
    println!("   Ra = {:.1}, R9 = {:.1}", cri.ra, cri.special[8]);
    println!("   Rf = {:.1}, Rg = {:.1}", tm30.rf, tm30.rg);
    println!("   Photometric = {:.1}", result.photometric()?);
    println!("   Radiometric 380-780 nm = {:.3}", result.radiometric(380.0, 780.0)?);

    Ok(())
}
