//! The foreign surface of one driver family.
//!
//! A vendor driver module is a flat table of functions: each takes the opaque
//! handle plus scalar or array arguments, writes its results into caller
//! supplied out-parameters and returns a status code. [`NativeDriver`] is that
//! table. The binding to an actual shared library implements it; the rest of
//! this crate only ever talks to the trait.
//!
//! Entry points not exported by every family have a default body returning
//! [`ErrorCode::NOT_EXPORTED`]. Sessions check family capabilities before
//! calling them, so a default is only reached through a misdeclared family.

use std::num::NonZeroUsize;

use crate::device_registry::DeviceSelector;
use crate::error::ErrorCode;

/// Size of each identity string buffer handed to `device_identity`, including the NUL.
pub const IDENTITY_LEN: usize = 64;

/// Number of special color-rendering indices (R1..R15) written by `color_rendering`.
pub const CRI_SPECIAL_INDICES: usize = 15;

/// Number of hue-angle bins in a TM-30 report.
pub const TM30_HUE_BINS: usize = 16;

/// Opaque, non-null token for one open instrument connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeHandle(NonZeroUsize);

impl NativeHandle {
    pub fn from_raw(raw: usize) -> Option<Self> {
        NonZeroUsize::new(raw).map(Self)
    }

    pub fn as_raw(self) -> usize {
        self.0.get()
    }
}

/// Decode a NUL-terminated identity buffer written by the driver.
pub fn decode_identity(buffer: &[u8]) -> String {
    let end = buffer.iter().position(|&b| b == 0).unwrap_or(buffer.len());
    String::from_utf8_lossy(&buffer[..end]).trim().to_string()
}

pub trait NativeDriver: Send + Sync {
    // Discovery and lifecycle

    fn device_count(&self, count: &mut i32) -> ErrorCode;

    fn device_identity(
        &self,
        index: i32,
        board_serial: &mut [u8],
        spectrometer_serial: &mut [u8],
        device_serial: &mut [u8],
    ) -> ErrorCode;

    fn open(&self, selector: &DeviceSelector, handle: &mut usize) -> ErrorCode;

    fn close(&self, handle: NativeHandle) -> ErrorCode;

    // Device information

    fn pixel_count(&self, handle: NativeHandle, count: &mut i32) -> ErrorCode;

    fn pixel_wavelengths(&self, handle: NativeHandle, wavelengths: &mut [f64]) -> ErrorCode;

    fn wavelength_range(&self, handle: NativeHandle, begin: &mut f32, end: &mut f32)
        -> ErrorCode;

    fn integration_time_limits(
        &self,
        handle: NativeHandle,
        min_ms: &mut f32,
        max_ms: &mut f32,
    ) -> ErrorCode;

    fn set_integration_time(&self, handle: NativeHandle, ms: f32) -> ErrorCode;

    fn integration_time(&self, handle: NativeHandle, ms: &mut f32) -> ErrorCode;

    fn set_average_count(&self, handle: NativeHandle, count: i32) -> ErrorCode;

    fn average_count(&self, handle: NativeHandle, count: &mut i32) -> ErrorCode;

    fn detector_temperature(&self, handle: NativeHandle, celsius: &mut f64) -> ErrorCode;

    fn adc_resolution(&self, handle: NativeHandle, bits: &mut i16) -> ErrorCode;

    fn set_shutter(&self, _handle: NativeHandle, _open: u8) -> ErrorCode {
        ErrorCode::NOT_EXPORTED
    }

    // Measurement protocol

    fn prepare_measurement(
        &self,
        _handle: NativeHandle,
        _integration_ms: f32,
        _average_count: i32,
    ) -> ErrorCode {
        ErrorCode::NOT_EXPORTED
    }

    /// Start a measurement previously armed with `prepare_measurement`.
    fn start_measurement(&self, handle: NativeHandle) -> ErrorCode;

    fn measure(&self, handle: NativeHandle, integration_ms: f32, average_count: i32)
        -> ErrorCode;

    fn measure_with_adaptation(
        &self,
        _handle: NativeHandle,
        _max_integration_ms: f32,
        _max_average_count: i32,
    ) -> ErrorCode {
        ErrorCode::NOT_EXPORTED
    }

    fn is_measuring(&self, handle: NativeHandle, measuring: &mut u8) -> ErrorCode;

    fn adaptation_status(
        &self,
        _handle: NativeHandle,
        _measuring: &mut u8,
        _integration_ms: &mut f32,
        _average_count: &mut i32,
        _complete: &mut u8,
    ) -> ErrorCode {
        ErrorCode::NOT_EXPORTED
    }

    fn break_measurement(&self, handle: NativeHandle) -> ErrorCode;

    // Results of the last finished measurement

    fn raw_samples(&self, _handle: NativeHandle, _samples: &mut [f64]) -> ErrorCode {
        ErrorCode::NOT_EXPORTED
    }

    fn exposure_report(
        &self,
        handle: NativeHandle,
        integration_ms: &mut f32,
        average_count: &mut i32,
        saturated_pixels: &mut i32,
        peak_pixel: &mut i32,
        peak_counts: &mut f32,
        dark_level: &mut f32,
    ) -> ErrorCode;

    fn spectrum(
        &self,
        handle: NativeHandle,
        begin: f64,
        end: f64,
        step: f64,
        values: &mut [f64],
    ) -> ErrorCode;

    fn spectrum_high_resolution(
        &self,
        _handle: NativeHandle,
        _begin: f64,
        _end: f64,
        _values: &mut [f64],
    ) -> ErrorCode {
        ErrorCode::NOT_EXPORTED
    }

    fn radiometric(&self, handle: NativeHandle, begin: f64, end: f64, value: &mut f64)
        -> ErrorCode;

    fn photometric(&self, handle: NativeHandle, value: &mut f64) -> ErrorCode;

    fn chromaticity(
        &self,
        _handle: NativeHandle,
        _x: &mut f64,
        _y: &mut f64,
        _u_prime: &mut f64,
        _v_prime: &mut f64,
    ) -> ErrorCode {
        ErrorCode::NOT_EXPORTED
    }

    fn color_temperature(&self, _handle: NativeHandle, _cct: &mut f64, _duv: &mut f64) -> ErrorCode {
        ErrorCode::NOT_EXPORTED
    }

    fn color_rendering(&self, _handle: NativeHandle, _ra: &mut f64, _special: &mut [f64]) -> ErrorCode {
        ErrorCode::NOT_EXPORTED
    }

    fn tm30(
        &self,
        _handle: NativeHandle,
        _rf: &mut f64,
        _rg: &mut f64,
        _hue_fidelity: &mut [f64],
        _hue_chroma_shift: &mut [f64],
    ) -> ErrorCode {
        ErrorCode::NOT_EXPORTED
    }
}
