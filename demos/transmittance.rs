// Transmittance example
//
// Takes a dark, a reference and a sample reading and computes transmittance
// and absorbance per pixel. Runs against the built-in simulator; the sample
// is simulated by dimming the light source.

use std::sync::Arc;
use std::thread;

use clap::Parser;
use polars::prelude::{CsvWriter, SerWriter};
use radiospec_rs::spectral_math::SpectralTriple;
use radiospec_rs::{
    DeviceRegistry, MeasurementController, MeasurementSettings, PollPolicy, SimulatedDriver,
    Spectro,
};

#[derive(Parser)]
#[command(name = "transmittance")]
#[command(version = "1.0")]
#[command(about = "Measure transmittance and absorbance of a sample")]
struct Args {
    /// Integration time in milliseconds
    #[arg(short, long, default_value_t = 10.0)]
    integration_time: f64,

    /// Number of scans averaged per reading
    #[arg(short, long, default_value_t = 4)]
    average: i32,

    /// Fraction of the light the simulated sample lets through
    #[arg(short, long, default_value_t = 0.35)]
    sample: f64,

    /// Write the result table to this CSV file
    #[arg(short, long)]
    output: Option<std::path::PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, help = "Show debug information and detailed logs")]
    verbose: bool,
}

fn read(
    controller: &mut MeasurementController<Spectro>,
    settings: &MeasurementSettings,
    policy: PollPolicy,
) -> Result<Vec<f64>, Box<dyn std::error::Error>> {
    controller.measure(settings)?;
    let mut attempts = 0;
    while controller.poll()?.is_measuring() {
        attempts += 1;
        if attempts >= policy.max_poll_attempts {
            controller.break_measurement()?;
            return Err("measurement timed out".into());
        }
        thread::sleep(policy.interval());
    }
    Ok(controller.fetch()?.samples()?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }

    let driver = Arc::new(SimulatedDriver::new());
    let registry = DeviceRegistry::<Spectro>::new(driver.clone());
    let mut controller = MeasurementController::new(registry.open_first()?);
    let settings = MeasurementSettings::default()
        .integration_time(args.integration_time)
        .averaging(args.average);
    let policy = PollPolicy::default();

    let wavelengths = controller.session_mut().pixel_wavelengths()?;

    println!("Reading dark (shutter closed)...");
    controller.session_mut().set_shutter(false)?;
    let dark = read(&mut controller, &settings, policy)?;

    println!("Reading reference...");
    controller.session_mut().set_shutter(true)?;
    let reference = read(&mut controller, &settings, policy)?;

    println!("Reading sample...");
    driver.set_illumination(args.sample);
    let light = read(&mut controller, &settings, policy)?;

    let corrected = SpectralTriple::new(dark, light, reference)?.correct(&wavelengths)?;
    let mut frame = corrected.to_frame()?;
    println!("{}", frame);

    if let Some(path) = args.output {
        let mut file = std::fs::File::create(&path)?;
        CsvWriter::new(&mut file).finish(&mut frame)?;
        println!("Saved {} rows to {}", frame.height(), path.display());
    }

    Ok(())
}
