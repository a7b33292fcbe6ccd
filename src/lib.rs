//! # radiospec-rs
//!
//! Host-side control of spectroradiometers and colorimeters through their
//! vendor driver modules.
//!
//! The vendor driver is a flat table of native entry points that take an
//! opaque device handle, write their results into caller-provided cells and
//! return a status code. This crate wraps that table into safe, typed
//! sessions with a checked measurement state machine.
//!
//! ## Features
//!
//! - **Device discovery**: enumerate devices with their identity strings, open by index,
//!   COM port, network address, USB serial or device path
//! - **One session type for every family**: [`HandleSession`] is generic over a
//!   [`DeviceFamily`] that supplies scratch layout, capabilities and limits
//! - **Asynchronous measurements**: prepare, start, poll, break and fetch through
//!   [`MeasurementController`]; the caller owns the polling loop
//! - **Typed results**: spectra, radiometric and photometric integrals, chromaticity,
//!   color temperature, color rendering and TM-30 reports
//! - **Spectral math**: transmittance, reflectance and absorbance from dark/light/reference
//!   readings, with `polars` DataFrame output
//! - **Simulator**: an in-process [`NativeDriver`] for tests and demos (feature `simulator`)
//!
//! ## Examples
//!
//! ### Measuring a Spectrum
//!
//! ```rust
//! use std::sync::Arc;
//! use radiospec_rs::{
//!     DeviceRegistry, GeneralInstrument, MeasurementController, MeasurementSettings,
//!     SimulatedDriver,
//! };
//!
//! let registry = DeviceRegistry::<GeneralInstrument>::new(Arc::new(SimulatedDriver::new()));
//! let session = registry.open_first()?;
//! let mut controller = MeasurementController::new(session);
//!
//! controller.measure(&MeasurementSettings::default().integration_time(20.0))?;
//! while controller.poll()?.is_measuring() {
//!     std::thread::sleep(std::time::Duration::from_millis(10));
//! }
//!
//! let mut result = controller.fetch()?;
//! let spectrum = result.spectrum(380.0, 780.0, 5.0)?;
//! println!("{} points, {:.1} lm", spectrum.values.len(), result.photometric()?);
//! # Ok::<(), radiospec_rs::SpectroError>(())
//! ```
//!
//! ### Transmittance
//!
//! ```rust
//! use radiospec_rs::spectral_math::SpectralTriple;
//!
//! let triple = SpectralTriple::new(vec![10.0, 10.0], vec![60.0, 60.0], vec![100.0, 100.0])?;
//! let frame = triple.to_frame(&[500.0, 501.0])?;
//! println!("{}", frame);
//! # Ok::<(), radiospec_rs::SpectroError>(())
//! ```

pub mod device_family;
pub mod device_registry;
pub mod driver_runtime;
pub mod error;
pub mod handle_session;
pub mod measurement;
pub mod measurement_config;
pub mod native_driver;
pub mod scratch_pool;
pub mod spectral_math;

#[cfg(any(test, feature = "simulator"))]
pub mod simulator;

// Re-export the main types for convenience
pub use device_family::{
    Capabilities, Capability, DeviceFamily, GeneralInstrument, Radio, RadioExtended, Spectro,
    SpectroAdaptive,
};

pub use device_registry::{DeviceInfo, DeviceRegistry, DeviceSelector};

pub use error::{ArgumentError, ErrorCode, OpenError, Result, SpectroError, StateError};

pub use handle_session::{HandleSession, IntegrationLimits};

pub use measurement::{
    AdaptationReport, Chromaticity, ColorRendering, ColorTemperature, Completed, ExposureReport,
    MeasurementController, MeasurementPhase, PollStatus, Spectrum, Tm30Report,
};

pub use measurement_config::{AdaptationSettings, MeasurementSettings, WavelengthGrid};

pub use native_driver::{NativeDriver, NativeHandle};

pub use driver_runtime::{DriverBundle, PollPolicy, RuntimeConfig};

#[cfg(any(test, feature = "simulator"))]
pub use simulator::{SimulatedDevice, SimulatedDriver};
