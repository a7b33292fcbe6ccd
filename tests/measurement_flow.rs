use std::sync::Arc;

use radiospec_rs::spectral_math::{self, SpectralTriple};
use radiospec_rs::{
    AdaptationSettings, Capability, DeviceFamily, DeviceRegistry, GeneralInstrument, MeasurementController,
    MeasurementPhase, MeasurementSettings, PollPolicy, Radio, RadioExtended, SimulatedDevice,
    SimulatedDriver, Spectro, SpectroAdaptive, SpectroError,
};

fn poll_until_ready<F: DeviceFamily>(
    controller: &mut MeasurementController<F>,
    policy: PollPolicy,
) -> Result<u32, SpectroError> {
    let mut polls = 1;
    while controller.poll()?.is_measuring() {
        assert!(
            polls < policy.max_poll_attempts,
            "measurement did not finish after {} polls",
            polls
        );
        polls += 1;
    }
    Ok(polls)
}

fn read_pixels<F: DeviceFamily>(
    controller: &mut MeasurementController<F>,
    integration_ms: f64,
) -> Vec<f64> {
    controller
        .measure(&MeasurementSettings::new(integration_ms, 1))
        .unwrap();
    poll_until_ready(controller, PollPolicy::default()).unwrap();
    controller.fetch().unwrap().samples().unwrap()
}

#[test]
fn test_dark_light_reference_sequence() {
    let driver = Arc::new(SimulatedDriver::new().with_polls_until_done(2));
    let registry = DeviceRegistry::<Spectro>::new(driver.clone());
    let mut controller = MeasurementController::new(registry.open_first().unwrap());
    let wavelengths = controller.session_mut().pixel_wavelengths().unwrap();

    controller.session_mut().set_shutter(false).unwrap();
    let dark = read_pixels(&mut controller, 10.0);
    controller.session_mut().set_shutter(true).unwrap();
    let reference = read_pixels(&mut controller, 10.0);
    driver.set_illumination(0.5);
    let light = read_pixels(&mut controller, 10.0);

    let triple = SpectralTriple::new(dark, light, reference).unwrap();
    let corrected = triple.correct(&wavelengths).unwrap();
    for t in corrected.transmittance() {
        assert!(t.is_finite());
        assert!(*t >= 0.0 && *t <= 0.5 + 1e-9);
    }

    let frame = corrected.to_frame().unwrap();
    assert_eq!(frame.height(), wavelengths.len());
    assert_eq!(frame.width(), 6);

    assert_eq!(
        spectral_math::transmittance(triple.dark(), triple.light(), triple.reference()).unwrap(),
        corrected.transmittance()
    );
}

#[test]
fn test_adaptive_measurement_end_to_end() {
    let driver = Arc::new(SimulatedDriver::new().with_polls_until_done(4));
    let registry = DeviceRegistry::<RadioExtended>::new(driver.clone());
    let mut controller = MeasurementController::new(registry.open_first().unwrap());

    controller
        .measure_with_adaptation(&AdaptationSettings::new(2_000.0, 8))
        .unwrap();
    let polls = poll_until_ready(&mut controller, PollPolicy::default()).unwrap();
    assert_eq!(polls, 4);
    assert_eq!(driver.call_count("adaptation_status"), 4);

    let mut result = controller.fetch().unwrap();
    let report = result.adaptation().unwrap();
    assert!(report.complete);

    let exposure = result.exposure().unwrap();
    assert_eq!(exposure.integration_time_ms, report.integration_time_ms);
    assert_eq!(exposure.average_count, report.average_count);
    assert!(!exposure.is_saturated());

    let cct = result.color_temperature().unwrap();
    assert!(cct.cct > 4_000.0 && cct.cct < 6_000.0);
    drop(result);

    assert_eq!(controller.phase(), MeasurementPhase::Idle);
}

#[test]
fn test_parameter_validation_for_every_family() {
    fn check<F: DeviceFamily>() {
        let driver = Arc::new(SimulatedDriver::new());
        let registry = DeviceRegistry::<F>::new(driver.clone());
        let mut controller = MeasurementController::new(registry.open_first().unwrap());
        let calls = driver.total_calls();

        let bad = [
            MeasurementSettings::new(10.0, 0),
            MeasurementSettings::new(10.0, -1),
            MeasurementSettings::new(-1.0, 1),
        ];
        for settings in bad {
            assert!(controller.measure(&settings).unwrap_err().is_argument());
        }
        for count in [0, -1] {
            assert!(controller
                .session_mut()
                .set_average_count(count)
                .unwrap_err()
                .is_argument());
        }
        assert!(controller
            .session_mut()
            .set_integration_time(-1.0)
            .unwrap_err()
            .is_argument());
        if F::CAPABILITIES.supports(Capability::Adaptation) {
            for settings in [
                AdaptationSettings::new(100.0, 0),
                AdaptationSettings::new(-1.0, 4),
            ] {
                assert!(controller
                    .measure_with_adaptation(&settings)
                    .unwrap_err()
                    .is_argument());
            }
        }
        assert_eq!(driver.total_calls(), calls, "{} reached the driver", F::NAME);

        // A controller that never started reports "not measuring"
        assert!(!controller.poll().unwrap().is_measuring());
        assert_eq!(controller.phase(), MeasurementPhase::Idle);

        controller.measure(&MeasurementSettings::default()).unwrap();
        poll_until_ready(&mut controller, PollPolicy::default()).unwrap();
        let mut result = controller.fetch().unwrap();
        let calls = driver.total_calls();
        for step in [0.0, -1.0] {
            assert!(result.spectrum(400.0, 700.0, step).unwrap_err().is_argument());
        }
        assert_eq!(driver.total_calls(), calls, "{} spectrum reached the driver", F::NAME);
        assert_eq!(result.spectrum(400.0, 700.0, 5.0).unwrap().values.len(), 61);
    }

    check::<GeneralInstrument>();
    check::<Radio>();
    check::<RadioExtended>();
    check::<Spectro>();
    check::<SpectroAdaptive>();
}

#[test]
fn test_sessions_on_different_devices_are_independent() {
    let driver = Arc::new(SimulatedDriver::with_devices(vec![
        SimulatedDevice::new("B-1", "S-1", "D-1"),
        SimulatedDevice {
            pixel_count: 512,
            ..SimulatedDevice::new("B-2", "S-2", "D-2")
        },
    ]));
    let registry = DeviceRegistry::<GeneralInstrument>::new(driver.clone());

    let mut first = registry.open_serial("D-1").unwrap();
    let mut second = registry.open_serial("D-2").unwrap();
    assert_eq!(first.pixel_count().unwrap(), 256);
    assert_eq!(second.pixel_count().unwrap(), 512);

    first.close();
    assert!(first.pixel_count().unwrap_err().is_state());
    assert_eq!(second.pixel_count().unwrap(), 512);

    drop(second);
    assert_eq!(driver.call_count("close"), 2);
    assert_eq!(driver.open_handles(), 0);
}

#[test]
fn test_sessions_move_between_threads() {
    let driver = Arc::new(SimulatedDriver::new().with_polls_until_done(2));
    let registry = DeviceRegistry::<Radio>::new(driver);
    let session = registry.open_first().unwrap();

    let handle = std::thread::spawn(move || {
        let mut controller = MeasurementController::new(session);
        controller.measure(&MeasurementSettings::default()).unwrap();
        poll_until_ready(&mut controller, PollPolicy::default()).unwrap();
        let mut result = controller.fetch().unwrap();
        result.chromaticity().unwrap()
    });

    let xy = handle.join().unwrap();
    assert!(xy.x > 0.3 && xy.y > 0.3);
}
