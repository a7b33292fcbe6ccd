use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::device_family::{Capability, DeviceFamily};
use crate::device_registry::DeviceSelector;
use crate::error::{ErrorCode, OpenError, Result, StateError};
use crate::measurement_config::{validate_average_count, validate_integration_time};
use crate::native_driver::{NativeDriver, NativeHandle};
use crate::scratch_pool::ScratchPool;

/// One open instrument connection.
///
/// Owns exactly one native handle and the scratch cells every call on it
/// writes into. Operations take `&mut self`, so a session can only ever be
/// driven from one place at a time; distinct sessions are independent and
/// may live on different threads.
pub struct HandleSession<F: DeviceFamily> {
    handle: Option<NativeHandle>,
    scratch: ScratchPool,
    driver: Arc<dyn NativeDriver>,
    selector: DeviceSelector,
    _family: PhantomData<fn() -> F>,
}

/// Lower and upper integration-time bound reported by the device, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegrationLimits {
    pub min_ms: f32,
    pub max_ms: f32,
}

impl fmt::Display for IntegrationLimits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} ms", self.min_ms, self.max_ms)
    }
}

impl<F: DeviceFamily> fmt::Debug for HandleSession<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleSession")
            .field("family", &F::NAME)
            .field("selector", &self.selector)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl<F: DeviceFamily> HandleSession<F> {
    /// Open the device addressed by `selector`.
    ///
    /// The handle comes back through the pool's pointer cell; a non-zero
    /// status or a null handle fails without leaving anything to close.
    pub fn open(driver: Arc<dyn NativeDriver>, selector: &DeviceSelector) -> Result<Self> {
        const OP: &str = "open";
        selector.validate()?;

        let mut scratch = ScratchPool::new(F::SCRATCH);
        let [raw] = scratch.cells::<usize, 1>(OP)?;
        let status = driver.open(selector, raw);
        if !status.is_success() {
            scratch.discard();
            return Err(OpenError::Driver {
                selector: selector.to_string(),
                code: status,
            }
            .into());
        }

        let [raw] = scratch.values::<usize, 1>(OP)?;
        let handle = NativeHandle::from_raw(raw).ok_or_else(|| OpenError::NullHandle {
            selector: selector.to_string(),
        })?;

        log::info!("Opened {} device at {}", F::NAME, selector);
        Ok(Self {
            handle: Some(handle),
            scratch,
            driver,
            selector: selector.clone(),
            _family: PhantomData,
        })
    }

    pub fn family_name(&self) -> &'static str {
        F::NAME
    }

    pub fn selector(&self) -> &DeviceSelector {
        &self.selector
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_none()
    }

    /// Release the native handle.
    ///
    /// Only the first call reaches the driver. A failing close is logged, never returned.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            let status = self.driver.close(handle);
            if status.is_success() {
                log::info!("Closed {} device at {}", F::NAME, self.selector);
            } else {
                log::warn!(
                    "Closing {} device at {} failed with driver status {}",
                    F::NAME,
                    self.selector,
                    status
                );
            }
        }
    }

    pub(crate) fn handle(&self, operation: &'static str) -> Result<NativeHandle> {
        self.handle
            .ok_or_else(|| StateError::Closed { operation }.into())
    }

    /// Issue one native call.
    ///
    /// `native` passes scratch cells (and any caller buffers) as out-parameters
    /// and returns the driver status. `read` runs only on success and copies the
    /// filled cells into a typed value. On failure the cells are discarded and
    /// the status is returned as-is.
    pub(crate) fn invoke<T>(
        &mut self,
        operation: &'static str,
        native: impl FnOnce(&dyn NativeDriver, NativeHandle, &mut ScratchPool) -> Result<ErrorCode>,
        read: impl FnOnce(&ScratchPool) -> Result<T>,
    ) -> Result<T> {
        let handle = self.handle(operation)?;
        let status = native(self.driver.as_ref(), handle, &mut self.scratch)?;

        if let Err(err) = status.check(operation) {
            log::debug!("{} on {} returned status {}", operation, self.selector, status);
            self.scratch.discard();
            return Err(err);
        }
        read(&self.scratch)
    }

    /// Issue a native call without scalar outputs.
    pub(crate) fn invoke_status(
        &mut self,
        operation: &'static str,
        native: impl FnOnce(&dyn NativeDriver, NativeHandle) -> ErrorCode,
    ) -> Result<()> {
        self.invoke(operation, |driver, handle, _| Ok(native(driver, handle)), |_| Ok(()))
    }

    pub fn pixel_count(&mut self) -> Result<usize> {
        const OP: &str = "pixel_count";
        self.invoke(
            OP,
            |driver, handle, pool| {
                let [count] = pool.cells::<i32, 1>(OP)?;
                Ok(driver.pixel_count(handle, count))
            },
            |pool| {
                let [count] = pool.values::<i32, 1>(OP)?;
                Ok(usize::try_from(count).unwrap_or(0))
            },
        )
    }

    /// Calibrated wavelength of every detector pixel, in nanometres.
    pub fn pixel_wavelengths(&mut self) -> Result<Vec<f64>> {
        let mut wavelengths = vec![0.0; self.pixel_count()?];
        self.invoke(
            "pixel_wavelengths",
            |driver, handle, _| Ok(driver.pixel_wavelengths(handle, &mut wavelengths)),
            |_| Ok(()),
        )?;
        Ok(wavelengths)
    }

    /// Wavelength range covered by the detector, in nanometres.
    pub fn wavelength_range(&mut self) -> Result<(f32, f32)> {
        const OP: &str = "wavelength_range";
        self.invoke(
            OP,
            |driver, handle, pool| {
                let [begin, end] = pool.cells::<f32, 2>(OP)?;
                Ok(driver.wavelength_range(handle, begin, end))
            },
            |pool| {
                let [begin, end] = pool.values::<f32, 2>(OP)?;
                Ok((begin, end))
            },
        )
    }

    pub fn integration_time_limits(&mut self) -> Result<IntegrationLimits> {
        const OP: &str = "integration_time_limits";
        self.invoke(
            OP,
            |driver, handle, pool| {
                let [min_ms, max_ms] = pool.cells::<f32, 2>(OP)?;
                Ok(driver.integration_time_limits(handle, min_ms, max_ms))
            },
            |pool| {
                let [min_ms, max_ms] = pool.values::<f32, 2>(OP)?;
                Ok(IntegrationLimits { min_ms, max_ms })
            },
        )
    }

    pub fn set_integration_time(&mut self, ms: f64) -> Result<()> {
        validate_integration_time::<F>(ms)?;
        self.invoke_status("set_integration_time", |driver, handle| {
            driver.set_integration_time(handle, ms as f32)
        })
    }

    pub fn integration_time(&mut self) -> Result<f32> {
        const OP: &str = "integration_time";
        self.invoke(
            OP,
            |driver, handle, pool| {
                let [ms] = pool.cells::<f32, 1>(OP)?;
                Ok(driver.integration_time(handle, ms))
            },
            |pool| Ok(pool.values::<f32, 1>(OP)?[0]),
        )
    }

    pub fn set_average_count(&mut self, count: i32) -> Result<()> {
        validate_average_count(count)?;
        self.invoke_status("set_average_count", |driver, handle| {
            driver.set_average_count(handle, count)
        })
    }

    pub fn average_count(&mut self) -> Result<i32> {
        const OP: &str = "average_count";
        self.invoke(
            OP,
            |driver, handle, pool| {
                let [count] = pool.cells::<i32, 1>(OP)?;
                Ok(driver.average_count(handle, count))
            },
            |pool| Ok(pool.values::<i32, 1>(OP)?[0]),
        )
    }

    /// Detector temperature in degrees Celsius.
    pub fn detector_temperature(&mut self) -> Result<f64> {
        const OP: &str = "detector_temperature";
        self.invoke(
            OP,
            |driver, handle, pool| {
                let [celsius] = pool.cells::<f64, 1>(OP)?;
                Ok(driver.detector_temperature(handle, celsius))
            },
            |pool| Ok(pool.values::<f64, 1>(OP)?[0]),
        )
    }

    /// ADC resolution in bits.
    pub fn adc_resolution(&mut self) -> Result<i16> {
        const OP: &str = "adc_resolution";
        self.invoke(
            OP,
            |driver, handle, pool| {
                let [bits] = pool.cells::<i16, 1>(OP)?;
                Ok(driver.adc_resolution(handle, bits))
            },
            |pool| Ok(pool.values::<i16, 1>(OP)?[0]),
        )
    }

    /// Open or close the shutter, e.g. to capture a dark reference.
    pub fn set_shutter(&mut self, open: bool) -> Result<()> {
        F::require(Capability::Shutter, "set_shutter")?;
        self.invoke_status("set_shutter", |driver, handle| {
            driver.set_shutter(handle, u8::from(open))
        })
    }
}

impl<F: DeviceFamily> Drop for HandleSession<F> {
    fn drop(&mut self) {
        self.close();
    }
}
