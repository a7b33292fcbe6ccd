//! The asynchronous measurement protocol.
//!
//! ```text
//! Idle ──prepare──▶ Armed ──start──▶ Running ──poll(done)──▶ Ready ──fetch──▶ Idle
//!   │                                   ▲
//!   ├──────────────start/measure────────┘
//!   └──measure_with_adaptation──▶ Adapting ──poll(done)──▶ Ready
//!
//! Armed/Running/Adapting/Broken ──break_measurement──▶ Idle
//! Running/Adapting ──poll(driver failure)──▶ Broken
//! ```
//!
//! Nothing here sleeps or retries. The caller decides how often to [`poll`]
//! and when to give up.
//!
//! [`poll`]: MeasurementController::poll

use std::fmt;

use polars::prelude::*;

use crate::device_family::{Capability, DeviceFamily};
use crate::error::{Result, StateError};
use crate::handle_session::HandleSession;
use crate::measurement_config::{
    validate_band, AdaptationSettings, MeasurementSettings, WavelengthGrid,
};
use crate::native_driver::{CRI_SPECIAL_INDICES, TM30_HUE_BINS};
use crate::scratch_pool::take_cells;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeasurementPhase {
    Idle,
    Armed,
    Running,
    Adapting,
    Ready,
    Broken,
}

impl MeasurementPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementPhase::Idle => "idle",
            MeasurementPhase::Armed => "armed",
            MeasurementPhase::Running => "running",
            MeasurementPhase::Adapting => "adapting",
            MeasurementPhase::Ready => "ready",
            MeasurementPhase::Broken => "broken",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self,
            MeasurementPhase::Armed | MeasurementPhase::Running | MeasurementPhase::Adapting
        )
    }
}

impl fmt::Display for MeasurementPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exposure the instrument settled on during adaptation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptationReport {
    pub integration_time_ms: f32,
    pub average_count: i32,
    pub complete: bool,
}

/// Result of one [`MeasurementController::poll`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollStatus {
    pub measuring: bool,
    /// Present while or after polling an adaptation measurement.
    pub adaptation: Option<AdaptationReport>,
}

impl PollStatus {
    const NOT_MEASURING: Self = Self {
        measuring: false,
        adaptation: None,
    };

    pub fn is_measuring(&self) -> bool {
        self.measuring
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureReport {
    pub integration_time_ms: f32,
    pub average_count: i32,
    pub saturated_pixels: i32,
    pub peak_pixel: i32,
    pub peak_counts: f32,
    pub dark_level: f32,
}

impl ExposureReport {
    pub fn is_saturated(&self) -> bool {
        self.saturated_pixels > 0
    }
}

/// CIE 1931 xy and CIE 1976 u'v' chromaticity coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chromaticity {
    pub x: f64,
    pub y: f64,
    pub u_prime: f64,
    pub v_prime: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorTemperature {
    /// Correlated color temperature in kelvin.
    pub cct: f64,
    /// Distance from the Planckian locus.
    pub duv: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorRendering {
    pub ra: f64,
    /// R1..R15
    pub special: [f64; CRI_SPECIAL_INDICES],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tm30Report {
    pub rf: f64,
    pub rg: f64,
    pub hue_fidelity: [f64; TM30_HUE_BINS],
    pub hue_chroma_shift: [f64; TM30_HUE_BINS],
}

/// A spectrum resampled onto an equidistant wavelength grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    pub grid: WavelengthGrid,
    pub values: Vec<f64>,
}

const WAVELENGTH_COLUMN_NAME: &str = "wavelength";
const VALUE_COLUMN_NAME: &str = "value";

impl Spectrum {
    pub fn wavelengths(&self) -> Vec<f64> {
        self.grid.wavelengths()
    }

    pub fn to_frame(&self) -> Result<DataFrame> {
        let columns: Vec<Column> = vec![
            Series::new(WAVELENGTH_COLUMN_NAME.into(), self.wavelengths()).into(),
            Series::new(VALUE_COLUMN_NAME.into(), self.values.as_slice()).into(),
        ];
        Ok(DataFrame::new(columns)?)
    }
}

/// Drives measurements on one session.
pub struct MeasurementController<F: DeviceFamily> {
    session: HandleSession<F>,
    phase: MeasurementPhase,
    adaptation: Option<AdaptationReport>,
}

impl<F: DeviceFamily> MeasurementController<F> {
    pub fn new(session: HandleSession<F>) -> Self {
        Self {
            session,
            phase: MeasurementPhase::Idle,
            adaptation: None,
        }
    }

    pub fn phase(&self) -> MeasurementPhase {
        self.phase
    }

    pub fn session(&self) -> &HandleSession<F> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut HandleSession<F> {
        &mut self.session
    }

    pub fn into_session(self) -> HandleSession<F> {
        self.session
    }

    /// Report of the last adaptation poll, if the current measurement adapts.
    pub fn adaptation(&self) -> Option<AdaptationReport> {
        self.adaptation
    }

    /// Check that a new measurement may be started from the current phase.
    fn ensure_startable(&self, operation: &'static str, allow_armed: bool) -> Result<()> {
        self.session.handle(operation)?;
        match self.phase {
            MeasurementPhase::Idle => Ok(()),
            MeasurementPhase::Ready => {
                log::debug!("Discarding unfetched {} measurement", F::NAME);
                Ok(())
            }
            MeasurementPhase::Armed if allow_armed => Ok(()),
            MeasurementPhase::Broken => Err(StateError::MeasurementBroken { operation }.into()),
            phase => Err(StateError::MeasurementInProgress { operation, phase }.into()),
        }
    }

    /// Arm the hardware without starting acquisition.
    pub fn prepare(&mut self, settings: &MeasurementSettings) -> Result<()> {
        const OP: &str = "prepare_measurement";
        F::require(Capability::Prepare, OP)?;
        settings.validate::<F>()?;
        self.ensure_startable(OP, true)?;

        let _span = tracing::debug_span!("prepare", family = F::NAME).entered();
        self.session.invoke_status(OP, |driver, handle| {
            driver.prepare_measurement(
                handle,
                settings.integration_time_ms as f32,
                settings.average_count,
            )
        })?;
        self.adaptation = None;
        self.phase = MeasurementPhase::Armed;
        Ok(())
    }

    /// Start acquisition, with the armed settings or the session's current ones.
    pub fn start(&mut self) -> Result<()> {
        const OP: &str = "start_measurement";
        self.ensure_startable(OP, true)?;

        let _span = tracing::debug_span!("start", family = F::NAME).entered();
        self.session
            .invoke_status(OP, |driver, handle| driver.start_measurement(handle))?;
        self.adaptation = None;
        self.phase = MeasurementPhase::Running;
        Ok(())
    }

    /// Start acquisition with explicit exposure settings.
    pub fn measure(&mut self, settings: &MeasurementSettings) -> Result<()> {
        const OP: &str = "measure";
        settings.validate::<F>()?;
        self.ensure_startable(OP, true)?;

        let _span = tracing::debug_span!(
            "measure",
            family = F::NAME,
            integration_ms = settings.integration_time_ms,
            average = settings.average_count
        )
        .entered();
        self.session.invoke_status(OP, |driver, handle| {
            driver.measure(
                handle,
                settings.integration_time_ms as f32,
                settings.average_count,
            )
        })?;
        self.adaptation = None;
        self.phase = MeasurementPhase::Running;
        Ok(())
    }

    /// Let the instrument find its own exposure, then measure.
    pub fn measure_with_adaptation(&mut self, settings: &AdaptationSettings) -> Result<()> {
        const OP: &str = "measure_with_adaptation";
        F::require(Capability::Adaptation, OP)?;
        settings.validate::<F>()?;
        self.ensure_startable(OP, false)?;

        let _span = tracing::debug_span!("measure_with_adaptation", family = F::NAME).entered();
        self.session.invoke_status(OP, |driver, handle| {
            driver.measure_with_adaptation(
                handle,
                settings.max_integration_time_ms as f32,
                settings.max_average_count,
            )
        })?;
        self.adaptation = None;
        self.phase = MeasurementPhase::Adapting;
        Ok(())
    }

    /// Ask whether the instrument is still measuring.
    ///
    /// Running and Adapting move to Ready once the driver reports the
    /// measurement finished. Every other phase answers "not measuring"
    /// without a driver call, including a controller that never started.
    pub fn poll(&mut self) -> Result<PollStatus> {
        const OP: &str = "poll";
        self.session.handle(OP)?;

        match self.phase {
            MeasurementPhase::Running => {
                let measuring = self.query(OP, Self::poll_running)?;
                if !measuring {
                    log::debug!("{} measurement finished", F::NAME);
                    self.phase = MeasurementPhase::Ready;
                }
                Ok(PollStatus {
                    measuring,
                    adaptation: None,
                })
            }
            MeasurementPhase::Adapting => {
                let (measuring, report) = self.query(OP, Self::poll_adapting)?;
                self.adaptation = Some(report);
                if !measuring {
                    log::debug!(
                        "{} adaptation finished at {} ms x {}",
                        F::NAME,
                        report.integration_time_ms,
                        report.average_count
                    );
                    self.phase = MeasurementPhase::Ready;
                }
                Ok(PollStatus {
                    measuring,
                    adaptation: Some(report),
                })
            }
            MeasurementPhase::Broken => Err(StateError::MeasurementBroken { operation: OP }.into()),
            MeasurementPhase::Ready => Ok(PollStatus {
                measuring: false,
                adaptation: self.adaptation,
            }),
            MeasurementPhase::Idle | MeasurementPhase::Armed => Ok(PollStatus::NOT_MEASURING),
        }
    }

    /// Run a poll query; a driver failure leaves the measurement Broken.
    fn query<T>(
        &mut self,
        operation: &'static str,
        query: fn(&mut HandleSession<F>) -> Result<T>,
    ) -> Result<T> {
        query(&mut self.session).inspect_err(|err| {
            if err.is_driver() {
                log::warn!("{} on {} device failed: {}", operation, F::NAME, err);
                self.phase = MeasurementPhase::Broken;
            }
        })
    }

    fn poll_running(session: &mut HandleSession<F>) -> Result<bool> {
        const OP: &str = "is_measuring";
        session.invoke(
            OP,
            |driver, handle, pool| {
                let [measuring] = pool.cells::<u8, 1>(OP)?;
                Ok(driver.is_measuring(handle, measuring))
            },
            |pool| Ok(pool.values::<u8, 1>(OP)?[0] != 0),
        )
    }

    fn poll_adapting(session: &mut HandleSession<F>) -> Result<(bool, AdaptationReport)> {
        const OP: &str = "adaptation_status";
        session.invoke(
            OP,
            |driver, handle, pool| {
                let cells = pool.split();
                let [measuring, complete] = take_cells::<u8, 2>(cells.bytes, OP)?;
                let [integration_ms] = take_cells::<f32, 1>(cells.floats, OP)?;
                let [average_count] = take_cells::<i32, 1>(cells.ints, OP)?;
                Ok(driver.adaptation_status(
                    handle,
                    measuring,
                    integration_ms,
                    average_count,
                    complete,
                ))
            },
            |pool| {
                let [measuring, complete] = pool.values::<u8, 2>(OP)?;
                let [integration_time_ms] = pool.values::<f32, 1>(OP)?;
                let [average_count] = pool.values::<i32, 1>(OP)?;
                Ok((
                    measuring != 0,
                    AdaptationReport {
                        integration_time_ms,
                        average_count,
                        complete: complete != 0,
                    },
                ))
            },
        )
    }

    /// Abort whatever is in flight and return to Idle.
    ///
    /// A no-op while Idle. A finished but unfetched result is dropped locally.
    pub fn break_measurement(&mut self) -> Result<()> {
        const OP: &str = "break_measurement";
        let phase = std::mem::replace(&mut self.phase, MeasurementPhase::Idle);
        self.adaptation = None;

        match phase {
            MeasurementPhase::Idle | MeasurementPhase::Ready => Ok(()),
            _ => {
                log::debug!("Breaking {} measurement ({})", F::NAME, phase);
                self.session
                    .invoke_status(OP, |driver, handle| driver.break_measurement(handle))
            }
        }
    }

    /// Hand out the finished measurement and return to Idle.
    ///
    /// Rejected while a measurement is still armed, running or adapting.
    pub fn fetch(&mut self) -> Result<Completed<'_, F>> {
        const OP: &str = "fetch";
        self.session.handle(OP)?;

        match self.phase {
            MeasurementPhase::Ready => {
                self.phase = MeasurementPhase::Idle;
                Ok(Completed {
                    session: &mut self.session,
                    adaptation: self.adaptation.take(),
                })
            }
            MeasurementPhase::Idle => Err(StateError::NoResult { operation: OP }.into()),
            MeasurementPhase::Broken => Err(StateError::MeasurementBroken { operation: OP }.into()),
            phase => Err(StateError::MeasurementInProgress {
                operation: OP,
                phase,
            }
            .into()),
        }
    }
}

/// Quantities of one finished measurement.
///
/// Borrows the controller, so no other measurement can start while results
/// are being read.
pub struct Completed<'a, F: DeviceFamily> {
    session: &'a mut HandleSession<F>,
    adaptation: Option<AdaptationReport>,
}

impl<F: DeviceFamily> fmt::Debug for Completed<'_, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completed")
            .field("family", &F::NAME)
            .field("adaptation", &self.adaptation)
            .finish_non_exhaustive()
    }
}

impl<F: DeviceFamily> Completed<'_, F> {
    pub fn adaptation(&self) -> Option<AdaptationReport> {
        self.adaptation
    }

    /// Raw detector counts, one per pixel.
    pub fn samples(&mut self) -> Result<Vec<f64>> {
        const OP: &str = "raw_samples";
        F::require(Capability::RawSamples, OP)?;
        let mut samples = vec![0.0; self.session.pixel_count()?];
        self.session.invoke(
            OP,
            |driver, handle, _| Ok(driver.raw_samples(handle, &mut samples)),
            |_| Ok(()),
        )?;
        Ok(samples)
    }

    pub fn exposure(&mut self) -> Result<ExposureReport> {
        const OP: &str = "exposure_report";
        self.session.invoke(
            OP,
            |driver, handle, pool| {
                let cells = pool.split();
                let [integration_ms, peak_counts, dark_level] =
                    take_cells::<f32, 3>(cells.floats, OP)?;
                let [average_count, saturated_pixels, peak_pixel] =
                    take_cells::<i32, 3>(cells.ints, OP)?;
                Ok(driver.exposure_report(
                    handle,
                    integration_ms,
                    average_count,
                    saturated_pixels,
                    peak_pixel,
                    peak_counts,
                    dark_level,
                ))
            },
            |pool| {
                let [integration_time_ms, peak_counts, dark_level] = pool.values::<f32, 3>(OP)?;
                let [average_count, saturated_pixels, peak_pixel] = pool.values::<i32, 3>(OP)?;
                Ok(ExposureReport {
                    integration_time_ms,
                    average_count,
                    saturated_pixels,
                    peak_pixel,
                    peak_counts,
                    dark_level,
                })
            },
        )
    }

    /// Spectrum resampled onto `begin..=end` in `step` increments.
    pub fn spectrum(&mut self, begin: f64, end: f64, step: f64) -> Result<Spectrum> {
        let grid = WavelengthGrid::new(begin, end, step)?;
        let mut values = vec![0.0; grid.len()];
        self.session.invoke(
            "spectrum",
            |driver, handle, _| Ok(driver.spectrum(handle, begin, end, step, &mut values)),
            |_| Ok(()),
        )?;
        Ok(Spectrum { grid, values })
    }

    /// Spectrum on the fixed 0.1 nm grid.
    pub fn spectrum_high_resolution(&mut self, begin: f64, end: f64) -> Result<Spectrum> {
        const OP: &str = "spectrum_high_resolution";
        F::require(Capability::HighResolution, OP)?;
        let grid = WavelengthGrid::high_resolution(begin, end)?;
        let mut values = vec![0.0; grid.len()];
        self.session.invoke(
            OP,
            |driver, handle, _| Ok(driver.spectrum_high_resolution(handle, begin, end, &mut values)),
            |_| Ok(()),
        )?;
        Ok(Spectrum { grid, values })
    }

    /// Radiometric integral over `[begin, end]` nanometres.
    pub fn radiometric(&mut self, begin: f64, end: f64) -> Result<f64> {
        const OP: &str = "radiometric";
        validate_band(begin, end)?;
        self.session.invoke(
            OP,
            |driver, handle, pool| {
                let [value] = pool.cells::<f64, 1>(OP)?;
                Ok(driver.radiometric(handle, begin, end, value))
            },
            |pool| Ok(pool.values::<f64, 1>(OP)?[0]),
        )
    }

    pub fn photometric(&mut self) -> Result<f64> {
        const OP: &str = "photometric";
        self.session.invoke(
            OP,
            |driver, handle, pool| {
                let [value] = pool.cells::<f64, 1>(OP)?;
                Ok(driver.photometric(handle, value))
            },
            |pool| Ok(pool.values::<f64, 1>(OP)?[0]),
        )
    }

    pub fn chromaticity(&mut self) -> Result<Chromaticity> {
        const OP: &str = "chromaticity";
        F::require(Capability::Colorimetry, OP)?;
        self.session.invoke(
            OP,
            |driver, handle, pool| {
                let [x, y, u_prime, v_prime] = pool.cells::<f64, 4>(OP)?;
                Ok(driver.chromaticity(handle, x, y, u_prime, v_prime))
            },
            |pool| {
                let [x, y, u_prime, v_prime] = pool.values::<f64, 4>(OP)?;
                Ok(Chromaticity {
                    x,
                    y,
                    u_prime,
                    v_prime,
                })
            },
        )
    }

    pub fn color_temperature(&mut self) -> Result<ColorTemperature> {
        const OP: &str = "color_temperature";
        F::require(Capability::Colorimetry, OP)?;
        self.session.invoke(
            OP,
            |driver, handle, pool| {
                let [cct, duv] = pool.cells::<f64, 2>(OP)?;
                Ok(driver.color_temperature(handle, cct, duv))
            },
            |pool| {
                let [cct, duv] = pool.values::<f64, 2>(OP)?;
                Ok(ColorTemperature { cct, duv })
            },
        )
    }

    pub fn color_rendering(&mut self) -> Result<ColorRendering> {
        const OP: &str = "color_rendering";
        F::require(Capability::Colorimetry, OP)?;
        let mut special = [0.0; CRI_SPECIAL_INDICES];
        let ra = self.session.invoke(
            OP,
            |driver, handle, pool| {
                let [ra] = pool.cells::<f64, 1>(OP)?;
                Ok(driver.color_rendering(handle, ra, &mut special))
            },
            |pool| Ok(pool.values::<f64, 1>(OP)?[0]),
        )?;
        Ok(ColorRendering { ra, special })
    }

    pub fn tm30(&mut self) -> Result<Tm30Report> {
        const OP: &str = "tm30";
        F::require(Capability::Tm30, OP)?;
        let mut hue_fidelity = [0.0; TM30_HUE_BINS];
        let mut hue_chroma_shift = [0.0; TM30_HUE_BINS];
        let (rf, rg) = self.session.invoke(
            OP,
            |driver, handle, pool| {
                let [rf, rg] = pool.cells::<f64, 2>(OP)?;
                Ok(driver.tm30(handle, rf, rg, &mut hue_fidelity, &mut hue_chroma_shift))
            },
            |pool| {
                let [rf, rg] = pool.values::<f64, 2>(OP)?;
                Ok((rf, rg))
            },
        )?;
        Ok(Tm30Report {
            rf,
            rg,
            hue_fidelity,
            hue_chroma_shift,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::device_family::{GeneralInstrument, Radio, RadioExtended, Spectro, SpectroAdaptive};
    use crate::device_registry::DeviceSelector;
    use crate::error::{ArgumentError, SpectroError};
    use crate::simulator::SimulatedDriver;

    fn open_controller<F: DeviceFamily>(polls: u32) -> (Arc<SimulatedDriver>, MeasurementController<F>) {
        let driver = Arc::new(SimulatedDriver::new().with_polls_until_done(polls));
        let session = HandleSession::open(driver.clone(), &DeviceSelector::Index(0)).unwrap();
        (driver, MeasurementController::new(session))
    }

    fn run_to_ready<F: DeviceFamily>(controller: &mut MeasurementController<F>) {
        for _ in 0..100 {
            if !controller.poll().unwrap().is_measuring() {
                break;
            }
        }
        assert_eq!(controller.phase(), MeasurementPhase::Ready);
    }

    #[test]
    fn test_poll_never_started_reports_not_measuring() {
        let (driver, mut controller) = open_controller::<GeneralInstrument>(3);
        let status = controller.poll().unwrap();
        assert!(!status.is_measuring());
        assert_eq!(status.adaptation, None);
        assert_eq!(controller.phase(), MeasurementPhase::Idle);
        assert_eq!(driver.call_count("is_measuring"), 0);
    }

    #[test]
    fn test_measure_poll_fetch_cycle() {
        let (driver, mut controller) = open_controller::<GeneralInstrument>(3);
        controller.measure(&MeasurementSettings::new(50.0, 2)).unwrap();
        assert_eq!(controller.phase(), MeasurementPhase::Running);

        assert!(controller.poll().unwrap().is_measuring());
        assert!(controller.poll().unwrap().is_measuring());
        assert!(!controller.poll().unwrap().is_measuring());
        assert_eq!(controller.phase(), MeasurementPhase::Ready);
        assert_eq!(driver.call_count("is_measuring"), 3);

        let mut completed = controller.fetch().unwrap();
        let samples = completed.samples().unwrap();
        assert_eq!(samples.len(), 256);
        let exposure = completed.exposure().unwrap();
        assert_eq!(exposure.integration_time_ms, 50.0);
        assert_eq!(exposure.average_count, 2);
        drop(completed);

        assert_eq!(controller.phase(), MeasurementPhase::Idle);
        assert!(controller.fetch().unwrap_err().is_state());
    }

    #[test]
    fn test_prepare_then_start() {
        let (driver, mut controller) = open_controller::<Spectro>(1);
        controller.prepare(&MeasurementSettings::new(20.0, 1)).unwrap();
        assert_eq!(controller.phase(), MeasurementPhase::Armed);
        assert!(!controller.poll().unwrap().is_measuring());
        assert_eq!(controller.phase(), MeasurementPhase::Armed);

        controller.start().unwrap();
        assert_eq!(controller.phase(), MeasurementPhase::Running);
        run_to_ready(&mut controller);
        assert_eq!(driver.call_count("start_measurement"), 1);
    }

    #[test]
    fn test_fetch_while_running_is_rejected() {
        let (driver, mut controller) = open_controller::<GeneralInstrument>(5);
        controller.measure(&MeasurementSettings::default()).unwrap();
        let calls = driver.total_calls();

        let err = controller.fetch().unwrap_err();
        assert!(matches!(
            err,
            SpectroError::State(StateError::MeasurementInProgress {
                phase: MeasurementPhase::Running,
                ..
            })
        ));
        assert_eq!(driver.total_calls(), calls);
        assert_eq!(controller.phase(), MeasurementPhase::Running);
    }

    #[test]
    fn test_start_while_running_is_rejected() {
        let (_, mut controller) = open_controller::<GeneralInstrument>(5);
        controller.measure(&MeasurementSettings::default()).unwrap();
        assert!(controller.measure(&MeasurementSettings::default()).unwrap_err().is_state());
        assert!(controller.start().unwrap_err().is_state());
    }

    #[test]
    fn test_break_returns_to_idle() {
        let (driver, mut controller) = open_controller::<GeneralInstrument>(5);

        controller.break_measurement().unwrap();
        assert_eq!(driver.call_count("break_measurement"), 0);

        controller.measure(&MeasurementSettings::default()).unwrap();
        controller.poll().unwrap();
        controller.break_measurement().unwrap();
        assert_eq!(controller.phase(), MeasurementPhase::Idle);
        assert_eq!(driver.call_count("break_measurement"), 1);
        assert!(controller.fetch().unwrap_err().is_state());

        controller.prepare(&MeasurementSettings::default()).unwrap();
        controller.break_measurement().unwrap();
        assert_eq!(controller.phase(), MeasurementPhase::Idle);
        assert_eq!(driver.call_count("break_measurement"), 2);
    }

    #[test]
    fn test_adaptation_reports_applied_exposure() {
        let (_, mut controller) = open_controller::<SpectroAdaptive>(2);
        controller
            .measure_with_adaptation(&AdaptationSettings::new(800.0, 4))
            .unwrap();
        assert_eq!(controller.phase(), MeasurementPhase::Adapting);

        let first = controller.poll().unwrap();
        assert!(first.is_measuring());
        assert!(!first.adaptation.unwrap().complete);

        let last = controller.poll().unwrap();
        assert!(!last.is_measuring());
        let report = last.adaptation.unwrap();
        assert!(report.complete);
        assert!(report.integration_time_ms <= 800.0);
        assert!(report.average_count >= 1 && report.average_count <= 4);

        let completed = controller.fetch().unwrap();
        assert_eq!(completed.adaptation(), Some(report));
        let debug = format!("{completed:?}");
        assert!(debug.starts_with("Completed"));
        assert!(debug.contains(SpectroAdaptive::NAME));
    }

    #[test]
    fn test_invalid_parameters_never_reach_driver() {
        let (driver, mut controller) = open_controller::<GeneralInstrument>(1);
        let calls = driver.total_calls();

        for settings in [
            MeasurementSettings::new(10.0, 0),
            MeasurementSettings::new(10.0, -3),
            MeasurementSettings::new(-0.5, 1),
        ] {
            assert!(controller.measure(&settings).unwrap_err().is_argument());
            assert!(controller.prepare(&settings).unwrap_err().is_argument());
        }
        assert!(controller
            .measure_with_adaptation(&AdaptationSettings::new(100.0, 0))
            .unwrap_err()
            .is_argument());
        assert_eq!(driver.total_calls(), calls);
        assert_eq!(controller.phase(), MeasurementPhase::Idle);

        controller.measure(&MeasurementSettings::default()).unwrap();
        run_to_ready(&mut controller);
        let mut completed = controller.fetch().unwrap();
        let calls = driver.total_calls();
        assert!(completed.spectrum(400.0, 700.0, 0.0).unwrap_err().is_argument());
        assert!(completed.spectrum(400.0, 700.0, -1.0).unwrap_err().is_argument());
        assert!(completed.spectrum(700.0, 400.0, 1.0).unwrap_err().is_argument());
        assert!(matches!(
            completed.spectrum(0.0, 1e6, 1e-9).unwrap_err(),
            SpectroError::Argument(ArgumentError::GridTooLarge { .. })
        ));
        assert!(completed.spectrum(0.0, 1e300, 1e-10).unwrap_err().is_argument());
        assert_eq!(driver.total_calls(), calls);
    }

    #[test]
    fn test_spectrum_lengths() {
        let (_, mut controller) = open_controller::<RadioExtended>(1);
        controller.measure(&MeasurementSettings::default()).unwrap();
        run_to_ready(&mut controller);

        let mut completed = controller.fetch().unwrap();
        let spectrum = completed.spectrum(400.0, 700.0, 5.0).unwrap();
        assert_eq!(spectrum.values.len(), 61);
        let spectrum = completed.spectrum(380.0, 780.0, 1.0).unwrap();
        assert_eq!(spectrum.values.len(), 401);
        let high = completed.spectrum_high_resolution(500.0, 510.0).unwrap();
        assert_eq!(high.values.len(), 101);
        assert_eq!(high.grid.step(), 0.1);

        let frame = spectrum.to_frame().unwrap();
        assert_eq!(frame.height(), 401);
        assert_eq!(frame.width(), 2);
    }

    #[test]
    fn test_colorimetry() {
        let (_, mut controller) = open_controller::<RadioExtended>(1);
        controller.measure(&MeasurementSettings::default()).unwrap();
        run_to_ready(&mut controller);

        let mut completed = controller.fetch().unwrap();
        let xy = completed.chromaticity().unwrap();
        assert!(xy.x > 0.0 && xy.x < 1.0);
        assert!(xy.y > 0.0 && xy.y < 1.0);
        assert!(completed.color_temperature().unwrap().cct > 1000.0);
        let cri = completed.color_rendering().unwrap();
        assert!(cri.ra > 0.0);
        assert!(cri.special.iter().all(|r| *r > 0.0));
        let tm30 = completed.tm30().unwrap();
        assert!(tm30.rf > 0.0 && tm30.rg > 0.0);
        assert!(completed.photometric().unwrap() > 0.0);
        assert!(completed.radiometric(380.0, 780.0).unwrap() > 0.0);
    }

    #[test]
    fn test_unsupported_operations() {
        let (driver, mut controller) = open_controller::<Radio>(1);
        assert!(matches!(
            controller.prepare(&MeasurementSettings::default()),
            Err(SpectroError::Unsupported { .. })
        ));
        controller.measure(&MeasurementSettings::default()).unwrap();
        run_to_ready(&mut controller);

        let mut completed = controller.fetch().unwrap();
        assert!(matches!(completed.samples(), Err(SpectroError::Unsupported { .. })));
        assert!(matches!(completed.tm30(), Err(SpectroError::Unsupported { .. })));
        assert!(matches!(
            completed.spectrum_high_resolution(400.0, 700.0),
            Err(SpectroError::Unsupported { .. })
        ));
        assert_eq!(driver.call_count("raw_samples"), 0);

        let (_, mut spectro) = open_controller::<Spectro>(1);
        assert!(matches!(
            spectro.measure_with_adaptation(&AdaptationSettings::default()),
            Err(SpectroError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_poll_failure_breaks_measurement() {
        let (driver, mut controller) = open_controller::<GeneralInstrument>(3);
        controller.measure(&MeasurementSettings::default()).unwrap();
        driver.fail_next("is_measuring", -11);

        let err = controller.poll().unwrap_err();
        assert_eq!(err.driver_code().map(|c| c.raw()), Some(-11));
        assert_eq!(controller.phase(), MeasurementPhase::Broken);

        assert!(controller.poll().unwrap_err().is_state());
        assert!(controller.measure(&MeasurementSettings::default()).unwrap_err().is_state());
        assert!(controller.fetch().unwrap_err().is_state());

        controller.break_measurement().unwrap();
        assert_eq!(controller.phase(), MeasurementPhase::Idle);
        controller.measure(&MeasurementSettings::default()).unwrap();
    }

    #[test]
    fn test_closed_session_rejects_measurement() {
        let (driver, mut controller) = open_controller::<GeneralInstrument>(1);
        controller.session_mut().close();
        let calls = driver.total_calls();

        assert!(controller.poll().unwrap_err().is_state());
        assert!(controller.measure(&MeasurementSettings::default()).unwrap_err().is_state());
        assert!(controller.fetch().unwrap_err().is_state());
        assert!(controller.break_measurement().is_ok());
        assert_eq!(driver.total_calls(), calls);
    }
}
