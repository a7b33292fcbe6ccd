//! In-process stand-in for a vendor driver module.
//!
//! [`SimulatedDriver`] implements every [`NativeDriver`] entry point against
//! a list of fake instruments. It counts calls per entry point and can inject
//! one-shot failures, which is what the tests and demos of this crate use to
//! exercise the session and measurement layers without hardware.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::device_registry::DeviceSelector;
use crate::error::ErrorCode;
use crate::native_driver::{NativeDriver, NativeHandle};

/// No device matches the selector.
pub const ERR_NO_DEVICE: i32 = -1;
/// The handle is unknown or already closed.
pub const ERR_INVALID_HANDLE: i32 = -2;
/// A caller buffer does not have the expected length.
pub const ERR_BUFFER_SIZE: i32 = -3;
/// A new measurement was requested while one is running.
pub const ERR_BUSY: i32 = -4;
/// Results were requested before a measurement finished.
pub const ERR_NO_MEASUREMENT: i32 = -5;

const DARK_LEVEL: f32 = 100.0;
const FULL_SCALE: f64 = 65_535.0;
const MIN_INTEGRATION_MS: f32 = 0.01;
const MAX_INTEGRATION_MS: f32 = 60_000.0;

/// One fake instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedDevice {
    pub board_serial: String,
    pub spectrometer_serial: String,
    pub device_serial: String,
    pub pixel_count: usize,
    pub wavelength_begin: f32,
    pub wavelength_end: f32,
}

impl SimulatedDevice {
    pub fn new(board_serial: &str, spectrometer_serial: &str, device_serial: &str) -> Self {
        Self {
            board_serial: board_serial.to_string(),
            spectrometer_serial: spectrometer_serial.to_string(),
            device_serial: device_serial.to_string(),
            ..Self::default()
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn pixel_wavelength(&self, pixel: usize) -> f64 {
        let span = f64::from(self.wavelength_end - self.wavelength_begin);
        let last = self.pixel_count.saturating_sub(1).max(1) as f64;
        f64::from(self.wavelength_begin) + span * pixel as f64 / last
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self {
            board_serial: "SIM-B0001".to_string(),
            spectrometer_serial: "SIM-S0001".to_string(),
            device_serial: "SIM-D0001".to_string(),
            pixel_count: 256,
            wavelength_begin: 380.0,
            wavelength_end: 780.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Activity {
    /// Nothing was ever started on this handle.
    Never,
    Armed,
    Measuring { adaptive: bool, remaining: u32 },
    Finished,
}

#[derive(Debug)]
struct OpenDevice {
    device: SimulatedDevice,
    integration_ms: f32,
    average_count: i32,
    shutter_open: bool,
    activity: Activity,
}

impl OpenDevice {
    fn new(device: SimulatedDevice) -> Self {
        Self {
            device,
            integration_ms: 100.0,
            average_count: 1,
            shutter_open: true,
            activity: Activity::Never,
        }
    }

    fn is_running(&self) -> bool {
        matches!(self.activity, Activity::Measuring { .. })
    }

    /// Advance a running measurement by one poll and report whether it is still running.
    fn advance(&mut self) -> bool {
        if let Activity::Measuring {
            adaptive,
            remaining,
        } = self.activity
        {
            let remaining = remaining.saturating_sub(1);
            self.activity = if remaining == 0 {
                Activity::Finished
            } else {
                Activity::Measuring {
                    adaptive,
                    remaining,
                }
            };
            remaining > 0
        } else {
            false
        }
    }
}

#[derive(Debug)]
struct SimState {
    devices: Vec<SimulatedDevice>,
    open: HashMap<usize, OpenDevice>,
    next_handle: usize,
    calls: HashMap<&'static str, usize>,
    faults: HashMap<&'static str, i32>,
    null_handle_once: bool,
    polls_until_done: u32,
    illumination: f64,
}

/// Fake driver table shared by any number of sessions.
#[derive(Debug)]
pub struct SimulatedDriver {
    state: Mutex<SimState>,
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedDriver {
    /// A driver that sees one default device.
    pub fn new() -> Self {
        Self::with_devices(vec![SimulatedDevice::default()])
    }

    pub fn with_devices(devices: Vec<SimulatedDevice>) -> Self {
        Self {
            state: Mutex::new(SimState {
                devices,
                open: HashMap::new(),
                next_handle: 0x1000,
                calls: HashMap::new(),
                faults: HashMap::new(),
                null_handle_once: false,
                polls_until_done: 3,
                illumination: 1.0,
            }),
        }
    }

    /// Number of polls after which a started measurement reports done.
    pub fn with_polls_until_done(self, polls: u32) -> Self {
        self.lock().polls_until_done = polls.max(1);
        self
    }

    /// Make the next call of `operation` fail with `code`, without side effects.
    pub fn fail_next(&self, operation: &'static str, code: i32) {
        self.lock().faults.insert(operation, code);
    }

    /// Make the next successful `open` write a null handle.
    pub fn return_null_handle_once(&self) {
        self.lock().null_handle_once = true;
    }

    /// Scale the simulated light source. Zero gives a dark reading.
    pub fn set_illumination(&self, illumination: f64) {
        self.lock().illumination = illumination.max(0.0);
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.lock().calls.get(operation).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.lock().calls.values().sum()
    }

    pub fn open_handles(&self) -> usize {
        self.lock().open.len()
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count the call, apply a pending fault, otherwise run `body`.
    fn call(
        &self,
        operation: &'static str,
        body: impl FnOnce(&mut SimState) -> ErrorCode,
    ) -> ErrorCode {
        let mut state = self.lock();
        *state.calls.entry(operation).or_insert(0) += 1;
        if let Some(code) = state.faults.remove(operation) {
            return ErrorCode(code);
        }
        body(&mut *state)
    }

    /// Like [`call`](Self::call), for entry points that take a handle.
    fn with_handle(
        &self,
        operation: &'static str,
        handle: NativeHandle,
        body: impl FnOnce(&mut OpenDevice, &SimState) -> ErrorCode,
    ) -> ErrorCode {
        self.call(operation, |state| {
            let Some(mut device) = state.open.remove(&handle.as_raw()) else {
                return ErrorCode(ERR_INVALID_HANDLE);
            };
            let status = body(&mut device, &*state);
            state.open.insert(handle.as_raw(), device);
            status
        })
    }

    /// Like [`with_handle`](Self::with_handle), but only once a measurement finished.
    fn with_result(
        &self,
        operation: &'static str,
        handle: NativeHandle,
        body: impl FnOnce(&OpenDevice, f64) -> ErrorCode,
    ) -> ErrorCode {
        self.with_handle(operation, handle, |device, state| {
            if device.activity == Activity::Finished {
                body(&*device, state.illumination)
            } else {
                ErrorCode(ERR_NO_MEASUREMENT)
            }
        })
    }
}

// Outside this window the simulated source emits nothing measurable.
const EMISSION_BAND_NM: (f64, f64) = (200.0, 1100.0);

/// Spectral power of the simulated source: a warm-white bump around 580 nm.
fn spectral_power(wavelength: f64, illumination: f64) -> f64 {
    let x = (wavelength - 580.0) / 110.0;
    illumination * (-x * x).exp()
}

fn counts(device: &OpenDevice, wavelength: f64, illumination: f64) -> f64 {
    let signal = spectral_power(wavelength, illumination)
        * f64::from(device.integration_ms)
        * if device.shutter_open { 50.0 } else { 0.0 };
    (f64::from(DARK_LEVEL) + signal).min(FULL_SCALE)
}

#[allow(clippy::cast_precision_loss)]
fn fill_grid(values: &mut [f64], begin: f64, step: f64, illumination: f64) {
    for (i, value) in values.iter_mut().enumerate() {
        *value = spectral_power(begin + i as f64 * step, illumination);
    }
}

impl NativeDriver for SimulatedDriver {
    fn device_count(&self, count: &mut i32) -> ErrorCode {
        self.call("device_count", |state| {
            *count = i32::try_from(state.devices.len()).unwrap_or(i32::MAX);
            ErrorCode::SUCCESS
        })
    }

    fn device_identity(
        &self,
        index: i32,
        board_serial: &mut [u8],
        spectrometer_serial: &mut [u8],
        device_serial: &mut [u8],
    ) -> ErrorCode {
        self.call("device_identity", |state| {
            let Some(device) = usize::try_from(index).ok().and_then(|i| state.devices.get(i))
            else {
                return ErrorCode(ERR_NO_DEVICE);
            };
            for (buffer, text) in [
                (board_serial, &device.board_serial),
                (spectrometer_serial, &device.spectrometer_serial),
                (device_serial, &device.device_serial),
            ] {
                let len = text.len().min(buffer.len().saturating_sub(1));
                buffer[..len].copy_from_slice(&text.as_bytes()[..len]);
                buffer[len..].fill(0);
            }
            ErrorCode::SUCCESS
        })
    }

    fn open(&self, selector: &DeviceSelector, handle: &mut usize) -> ErrorCode {
        self.call("open", |state| {
            let device = match selector {
                DeviceSelector::Index(index) => {
                    usize::try_from(*index).ok().and_then(|i| state.devices.get(i))
                }
                DeviceSelector::UsbSerial(serial) => {
                    state.devices.iter().find(|d| &d.device_serial == serial)
                }
                _ => state.devices.first(),
            };
            let Some(device) = device.cloned() else {
                return ErrorCode(ERR_NO_DEVICE);
            };

            if std::mem::take(&mut state.null_handle_once) {
                *handle = 0;
                return ErrorCode::SUCCESS;
            }

            let raw = state.next_handle;
            state.next_handle += 1;
            state.open.insert(raw, OpenDevice::new(device));
            *handle = raw;
            ErrorCode::SUCCESS
        })
    }

    fn close(&self, handle: NativeHandle) -> ErrorCode {
        self.call("close", |state| match state.open.remove(&handle.as_raw()) {
            Some(_) => ErrorCode::SUCCESS,
            None => ErrorCode(ERR_INVALID_HANDLE),
        })
    }

    fn pixel_count(&self, handle: NativeHandle, count: &mut i32) -> ErrorCode {
        self.with_handle("pixel_count", handle, |device, _| {
            *count = i32::try_from(device.device.pixel_count).unwrap_or(i32::MAX);
            ErrorCode::SUCCESS
        })
    }

    fn pixel_wavelengths(&self, handle: NativeHandle, wavelengths: &mut [f64]) -> ErrorCode {
        self.with_handle("pixel_wavelengths", handle, |device, _| {
            if wavelengths.len() != device.device.pixel_count {
                return ErrorCode(ERR_BUFFER_SIZE);
            }
            for (pixel, wavelength) in wavelengths.iter_mut().enumerate() {
                *wavelength = device.device.pixel_wavelength(pixel);
            }
            ErrorCode::SUCCESS
        })
    }

    fn wavelength_range(&self, handle: NativeHandle, begin: &mut f32, end: &mut f32) -> ErrorCode {
        self.with_handle("wavelength_range", handle, |device, _| {
            *begin = device.device.wavelength_begin;
            *end = device.device.wavelength_end;
            ErrorCode::SUCCESS
        })
    }

    fn integration_time_limits(
        &self,
        handle: NativeHandle,
        min_ms: &mut f32,
        max_ms: &mut f32,
    ) -> ErrorCode {
        self.with_handle("integration_time_limits", handle, |_, _| {
            *min_ms = MIN_INTEGRATION_MS;
            *max_ms = MAX_INTEGRATION_MS;
            ErrorCode::SUCCESS
        })
    }

    fn set_integration_time(&self, handle: NativeHandle, ms: f32) -> ErrorCode {
        self.with_handle("set_integration_time", handle, |device, _| {
            device.integration_ms = ms;
            ErrorCode::SUCCESS
        })
    }

    fn integration_time(&self, handle: NativeHandle, ms: &mut f32) -> ErrorCode {
        self.with_handle("integration_time", handle, |device, _| {
            *ms = device.integration_ms;
            ErrorCode::SUCCESS
        })
    }

    fn set_average_count(&self, handle: NativeHandle, count: i32) -> ErrorCode {
        self.with_handle("set_average_count", handle, |device, _| {
            device.average_count = count;
            ErrorCode::SUCCESS
        })
    }

    fn average_count(&self, handle: NativeHandle, count: &mut i32) -> ErrorCode {
        self.with_handle("average_count", handle, |device, _| {
            *count = device.average_count;
            ErrorCode::SUCCESS
        })
    }

    fn detector_temperature(&self, handle: NativeHandle, celsius: &mut f64) -> ErrorCode {
        self.with_handle("detector_temperature", handle, |_, _| {
            *celsius = 24.5;
            ErrorCode::SUCCESS
        })
    }

    fn adc_resolution(&self, handle: NativeHandle, bits: &mut i16) -> ErrorCode {
        self.with_handle("adc_resolution", handle, |_, _| {
            *bits = 16;
            ErrorCode::SUCCESS
        })
    }

    fn set_shutter(&self, handle: NativeHandle, open: u8) -> ErrorCode {
        self.with_handle("set_shutter", handle, |device, _| {
            device.shutter_open = open != 0;
            ErrorCode::SUCCESS
        })
    }

    fn prepare_measurement(
        &self,
        handle: NativeHandle,
        integration_ms: f32,
        average_count: i32,
    ) -> ErrorCode {
        self.with_handle("prepare_measurement", handle, |device, _| {
            if device.is_running() {
                return ErrorCode(ERR_BUSY);
            }
            device.integration_ms = integration_ms;
            device.average_count = average_count;
            device.activity = Activity::Armed;
            ErrorCode::SUCCESS
        })
    }

    fn start_measurement(&self, handle: NativeHandle) -> ErrorCode {
        self.with_handle("start_measurement", handle, |device, state| {
            if device.is_running() {
                return ErrorCode(ERR_BUSY);
            }
            device.activity = Activity::Measuring {
                adaptive: false,
                remaining: state.polls_until_done,
            };
            ErrorCode::SUCCESS
        })
    }

    fn measure(&self, handle: NativeHandle, integration_ms: f32, average_count: i32) -> ErrorCode {
        self.with_handle("measure", handle, |device, state| {
            if device.is_running() {
                return ErrorCode(ERR_BUSY);
            }
            device.integration_ms = integration_ms;
            device.average_count = average_count;
            device.activity = Activity::Measuring {
                adaptive: false,
                remaining: state.polls_until_done,
            };
            ErrorCode::SUCCESS
        })
    }

    fn measure_with_adaptation(
        &self,
        handle: NativeHandle,
        max_integration_ms: f32,
        max_average_count: i32,
    ) -> ErrorCode {
        self.with_handle("measure_with_adaptation", handle, |device, state| {
            if device.is_running() {
                return ErrorCode(ERR_BUSY);
            }
            // Settle at half of the allowed exposure
            device.integration_ms = max_integration_ms / 2.0;
            device.average_count = (max_average_count / 2).max(1);
            device.activity = Activity::Measuring {
                adaptive: true,
                remaining: state.polls_until_done,
            };
            ErrorCode::SUCCESS
        })
    }

    fn is_measuring(&self, handle: NativeHandle, measuring: &mut u8) -> ErrorCode {
        self.with_handle("is_measuring", handle, |device, _| {
            // A handle that never started reports "not measuring" rather than an error
            *measuring = u8::from(device.advance());
            ErrorCode::SUCCESS
        })
    }

    fn adaptation_status(
        &self,
        handle: NativeHandle,
        measuring: &mut u8,
        integration_ms: &mut f32,
        average_count: &mut i32,
        complete: &mut u8,
    ) -> ErrorCode {
        self.with_handle("adaptation_status", handle, |device, _| {
            let running = device.advance();
            *measuring = u8::from(running);
            *complete = u8::from(!running);
            *integration_ms = device.integration_ms;
            *average_count = device.average_count;
            ErrorCode::SUCCESS
        })
    }

    fn break_measurement(&self, handle: NativeHandle) -> ErrorCode {
        self.with_handle("break_measurement", handle, |device, _| {
            device.activity = Activity::Never;
            ErrorCode::SUCCESS
        })
    }

    fn raw_samples(&self, handle: NativeHandle, samples: &mut [f64]) -> ErrorCode {
        self.with_result("raw_samples", handle, |device, illumination| {
            if samples.len() != device.device.pixel_count {
                return ErrorCode(ERR_BUFFER_SIZE);
            }
            for (pixel, sample) in samples.iter_mut().enumerate() {
                *sample = counts(device, device.device.pixel_wavelength(pixel), illumination);
            }
            ErrorCode::SUCCESS
        })
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
    ) -> ErrorCode {
        self.with_result("exposure_report", handle, |device, illumination| {
            let mut peak = (0, f64::MIN);
            let mut saturated = 0;
            for pixel in 0..device.device.pixel_count {
                let value = counts(device, device.device.pixel_wavelength(pixel), illumination);
                if value >= FULL_SCALE {
                    saturated += 1;
                }
                if value > peak.1 {
                    peak = (pixel, value);
                }
            }

            *integration_ms = device.integration_ms;
            *average_count = device.average_count;
            *saturated_pixels = saturated;
            *peak_pixel = i32::try_from(peak.0).unwrap_or(i32::MAX);
            *peak_counts = peak.1 as f32;
            *dark_level = DARK_LEVEL;
            ErrorCode::SUCCESS
        })
    }

    fn spectrum(
        &self,
        handle: NativeHandle,
        begin: f64,
        _end: f64,
        step: f64,
        values: &mut [f64],
    ) -> ErrorCode {
        self.with_result("spectrum", handle, |_, illumination| {
            fill_grid(values, begin, step, illumination);
            ErrorCode::SUCCESS
        })
    }

    fn spectrum_high_resolution(
        &self,
        handle: NativeHandle,
        begin: f64,
        _end: f64,
        values: &mut [f64],
    ) -> ErrorCode {
        self.with_result("spectrum_high_resolution", handle, |_, illumination| {
            fill_grid(values, begin, 0.1, illumination);
            ErrorCode::SUCCESS
        })
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
    fn radiometric(&self, handle: NativeHandle, begin: f64, end: f64, value: &mut f64) -> ErrorCode {
        self.with_result("radiometric", handle, |_, illumination| {
            let low = begin.max(EMISSION_BAND_NM.0);
            let high = end.min(EMISSION_BAND_NM.1);
            *value = if low > high {
                0.0
            } else {
                let steps = (high - low).floor() as usize;
                (0..=steps)
                    .map(|i| spectral_power(low + i as f64, illumination))
                    .sum()
            };
            ErrorCode::SUCCESS
        })
    }

    fn photometric(&self, handle: NativeHandle, value: &mut f64) -> ErrorCode {
        self.with_result("photometric", handle, |_, illumination| {
            *value = 683.0 * illumination * 0.42;
            ErrorCode::SUCCESS
        })
    }

    fn chromaticity(
        &self,
        handle: NativeHandle,
        x: &mut f64,
        y: &mut f64,
        u_prime: &mut f64,
        v_prime: &mut f64,
    ) -> ErrorCode {
        self.with_result("chromaticity", handle, |_, _| {
            *x = 0.3457;
            *y = 0.3585;
            *u_prime = 0.2092;
            *v_prime = 0.4881;
            ErrorCode::SUCCESS
        })
    }

    fn color_temperature(&self, handle: NativeHandle, cct: &mut f64, duv: &mut f64) -> ErrorCode {
        self.with_result("color_temperature", handle, |_, _| {
            *cct = 5003.0;
            *duv = 0.0032;
            ErrorCode::SUCCESS
        })
    }

    #[allow(clippy::cast_precision_loss)]
    fn color_rendering(&self, handle: NativeHandle, ra: &mut f64, special: &mut [f64]) -> ErrorCode {
        self.with_result("color_rendering", handle, |_, _| {
            *ra = 91.2;
            for (i, value) in special.iter_mut().enumerate() {
                *value = 95.0 - i as f64;
            }
            ErrorCode::SUCCESS
        })
    }

    #[allow(clippy::cast_precision_loss)]
    fn tm30(
        &self,
        handle: NativeHandle,
        rf: &mut f64,
        rg: &mut f64,
        hue_fidelity: &mut [f64],
        hue_chroma_shift: &mut [f64],
    ) -> ErrorCode {
        self.with_result("tm30", handle, |_, _| {
            *rf = 88.0;
            *rg = 101.0;
            for (i, value) in hue_fidelity.iter_mut().enumerate() {
                *value = 80.0 + i as f64;
            }
            for (i, value) in hue_chroma_shift.iter_mut().enumerate() {
                *value = (i as f64 - 8.0) / 100.0;
            }
            ErrorCode::SUCCESS
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(driver: &SimulatedDriver) -> NativeHandle {
        let mut raw = 0;
        assert!(driver.open(&DeviceSelector::Index(0), &mut raw).is_success());
        NativeHandle::from_raw(raw).unwrap()
    }

    #[test]
    fn test_never_started_is_not_measuring() {
        let driver = SimulatedDriver::new();
        let handle = open(&driver);
        let mut measuring = 7;
        assert!(driver.is_measuring(handle, &mut measuring).is_success());
        assert_eq!(measuring, 0);
    }

    #[test]
    fn test_results_need_finished_measurement() {
        let driver = SimulatedDriver::new().with_polls_until_done(1);
        let handle = open(&driver);
        let mut value = 0.0;
        assert_eq!(driver.photometric(handle, &mut value), ErrorCode(ERR_NO_MEASUREMENT));

        assert!(driver.measure(handle, 10.0, 1).is_success());
        assert_eq!(driver.measure(handle, 10.0, 1), ErrorCode(ERR_BUSY));
        let mut measuring = 1;
        assert!(driver.is_measuring(handle, &mut measuring).is_success());
        assert_eq!(measuring, 0);
        assert!(driver.photometric(handle, &mut value).is_success());
        assert!(value > 0.0);
    }

    #[test]
    fn test_radiometric_over_wide_band() {
        let driver = SimulatedDriver::new().with_polls_until_done(1);
        let handle = open(&driver);
        assert!(driver.measure(handle, 10.0, 1).is_success());
        let mut measuring = 1;
        assert!(driver.is_measuring(handle, &mut measuring).is_success());

        let mut visible = 0.0;
        assert!(driver.radiometric(handle, 380.0, 780.0, &mut visible).is_success());
        let mut wide = 0.0;
        assert!(driver.radiometric(handle, 0.0, 1e300, &mut wide).is_success());
        assert!(wide.is_finite());
        assert!(wide >= visible && visible > 0.0);

        let mut outside = 1.0;
        assert!(driver.radiometric(handle, 2000.0, 3000.0, &mut outside).is_success());
        assert_eq!(outside, 0.0);
    }

    #[test]
    fn test_fault_injection_is_one_shot() {
        let driver = SimulatedDriver::new();
        let handle = open(&driver);
        driver.fail_next("adc_resolution", 42);

        let mut bits = 0;
        assert_eq!(driver.adc_resolution(handle, &mut bits), ErrorCode(42));
        assert_eq!(bits, 0);
        assert!(driver.adc_resolution(handle, &mut bits).is_success());
        assert_eq!(bits, 16);
        assert_eq!(driver.call_count("adc_resolution"), 2);
    }

    #[test]
    fn test_closed_handle_is_invalid() {
        let driver = SimulatedDriver::new();
        let handle = open(&driver);
        assert!(driver.close(handle).is_success());
        assert_eq!(driver.close(handle), ErrorCode(ERR_INVALID_HANDLE));
        assert_eq!(driver.open_handles(), 0);
    }

    #[test]
    fn test_identity_is_nul_terminated() {
        let driver = SimulatedDriver::new();
        let mut board = [0xffu8; 8];
        let mut spectrometer = [0xffu8; 64];
        let mut device = [0xffu8; 64];
        assert!(driver
            .device_identity(0, &mut board, &mut spectrometer, &mut device)
            .is_success());
        assert_eq!(&board, b"SIM-B00\0");
        assert_eq!(&spectrometer[..10], b"SIM-S0001\0");
        assert_eq!(
            driver.device_identity(3, &mut board, &mut spectrometer, &mut device),
            ErrorCode(ERR_NO_DEVICE)
        );
    }
}
