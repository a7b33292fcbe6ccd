//! Error types shared by every session, controller and registry operation.
//!
//! Three domains matter to callers:
//!
//! - [`ArgumentError`]: rejected locally, the driver was never called.
//! - [`SpectroError::Driver`]: the raw non-zero status of a native call, passed on verbatim.
//! - [`StateError`]: the session is closed or the measurement is in the wrong phase.

use std::fmt;

use crate::measurement::MeasurementPhase;
use crate::scratch_pool::CellKind;

/// Status code returned by every native driver entry point.
///
/// Zero is success. Any other value is vendor specific and is never
/// reinterpreted by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    pub const SUCCESS: Self = Self(0);

    /// Returned by [`NativeDriver`](crate::native_driver::NativeDriver) entry points a
    /// driver module does not export.
    pub const NOT_EXPORTED: Self = Self(i32::MIN);

    pub fn is_success(self) -> bool {
        self.0 == 0
    }

    pub fn raw(self) -> i32 {
        self.0
    }

    /// Turn a status into a result, tagging failures with the operation name.
    pub fn check(self, operation: &'static str) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(SpectroError::Driver {
                operation,
                code: self,
            })
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for ErrorCode {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArgumentError {
    #[error("wavelength step must be positive, got {step}")]
    NonPositiveStep { step: f64 },

    #[error("average count must be positive, got {count}")]
    NonPositiveAverageCount { count: i32 },

    #[error("integration time must not be negative, got {ms} ms")]
    NegativeIntegrationTime { ms: f64 },

    #[error("integration time {ms} ms exceeds the {max_ms} ms supported by this device family")]
    IntegrationTimeTooLong { ms: f64, max_ms: f64 },

    #[error("{name} must be a finite number")]
    NotFinite { name: &'static str },

    #[error("wavelength range is inverted: begin {begin} > end {end}")]
    InvertedRange { begin: f64, end: f64 },

    #[error("wavelength grid would hold {points} points, more than the {max} supported")]
    GridTooLarge { points: f64, max: usize },

    #[error("sample sequences differ in length (dark {dark}, light {light}, reference {reference})")]
    LengthMismatch {
        dark: usize,
        light: usize,
        reference: usize,
    },

    #[error("{axis} axis has {axis_len} points but the samples have {samples}")]
    AxisMismatch {
        axis: &'static str,
        axis_len: usize,
        samples: usize,
    },

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{0:?} is not a plain file name")]
    InvalidFileName(String),

    #[error("device index must not be negative, got {0}")]
    NegativeIndex(i32),

    #[error("baud rate must be positive")]
    ZeroBaudRate,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("{operation} called on a closed session")]
    Closed { operation: &'static str },

    #[error("{operation} rejected while the measurement is {phase}")]
    MeasurementInProgress {
        operation: &'static str,
        phase: MeasurementPhase,
    },

    #[error("{operation} rejected: no finished measurement to read")]
    NoResult { operation: &'static str },

    #[error("{operation} rejected: the previous measurement broke, call break_measurement first")]
    MeasurementBroken { operation: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OpenError {
    #[error("opening {selector} failed with driver status {code}")]
    Driver { selector: String, code: ErrorCode },

    #[error("driver reported success opening {selector} but returned a null handle")]
    NullHandle { selector: String },

    #[error("serial port {port} is not present on this host")]
    PortNotFound { port: String },

    #[error("no {family} device found. Please connect one or specify a selector manually")]
    NoDevices { family: &'static str },

    #[error("no device with serial number {serial} found")]
    DeviceNotFound { serial: String },
}

#[derive(Debug, thiserror::Error)]
pub enum SpectroError {
    #[error("invalid argument: {0}")]
    Argument(#[from] ArgumentError),

    #[error("{operation} failed with driver status {code}")]
    Driver {
        operation: &'static str,
        code: ErrorCode,
    },

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Open(#[from] OpenError),

    #[error("{family} devices do not support {operation}")]
    Unsupported {
        family: &'static str,
        operation: &'static str,
    },

    #[error("{operation} needs {needed} {kind} scratch cells but the pool holds {available}")]
    ScratchExhausted {
        operation: &'static str,
        kind: CellKind,
        needed: usize,
        available: usize,
    },

    #[error("Serial port error: {0}")]
    SerialPort(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("DataFrame error: {0}")]
    Frame(#[from] polars::prelude::PolarsError),
}

impl SpectroError {
    pub fn is_argument(&self) -> bool {
        matches!(self, Self::Argument(_))
    }

    pub fn is_driver(&self) -> bool {
        matches!(self, Self::Driver { .. } | Self::Open(OpenError::Driver { .. }))
    }

    pub fn is_state(&self) -> bool {
        matches!(self, Self::State(_))
    }

    /// The native status code, if this failure came out of the driver.
    pub fn driver_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Driver { code, .. } | Self::Open(OpenError::Driver { code, .. }) => Some(*code),
            _ => None,
        }
    }
}

/// Outcome of every public operation: the value on success, a typed failure otherwise.
pub type Result<T> = std::result::Result<T, SpectroError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_check() {
        assert!(ErrorCode::SUCCESS.check("probe").is_ok());

        let err = ErrorCode(-7).check("probe").unwrap_err();
        assert!(err.is_driver());
        assert_eq!(err.driver_code(), Some(ErrorCode(-7)));
        assert_eq!(err.to_string(), "probe failed with driver status -7");
    }

    #[test]
    fn test_error_domains_are_distinct() {
        let arg: SpectroError = ArgumentError::NonPositiveAverageCount { count: 0 }.into();
        assert!(arg.is_argument());
        assert!(!arg.is_driver());
        assert_eq!(arg.driver_code(), None);

        let state: SpectroError = StateError::Closed { operation: "pixel_count" }.into();
        assert!(state.is_state());
        assert_eq!(state.to_string(), "pixel_count called on a closed session");
    }

    #[test]
    fn test_open_error_carries_code() {
        let err: SpectroError = OpenError::Driver {
            selector: "index 3".to_string(),
            code: ErrorCode(12),
        }
        .into();
        assert_eq!(err.driver_code(), Some(ErrorCode(12)));
    }
}
