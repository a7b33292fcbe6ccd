use crate::device_family::DeviceFamily;
use crate::error::ArgumentError;

/// Step of the high-resolution spectrum variant, in nanometres. Not user settable.
pub const HIGH_RESOLUTION_STEP: f64 = 0.1;

/// Largest number of points a resampled spectrum may hold.
pub const MAX_GRID_POINTS: usize = 1 << 24;

// Absorbs representation error in (end - begin) / step, e.g. 400.0 / 0.1.
const GRID_EPSILON: f64 = 1e-9;

fn require_finite(value: f64, name: &'static str) -> Result<(), ArgumentError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ArgumentError::NotFinite { name })
    }
}

/// Number of points in the grid `begin, begin + step, ..., <= end`.
///
/// `floor((end - begin) / step) + 1`
pub fn derived_length(begin: f64, end: f64, step: f64) -> Result<usize, ArgumentError> {
    WavelengthGrid::new(begin, end, step).map(|grid| grid.len())
}

/// Equidistant wavelength axis for resampled spectra.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavelengthGrid {
    begin: f64,
    end: f64,
    step: f64,
}

impl WavelengthGrid {
    pub fn new(begin: f64, end: f64, step: f64) -> Result<Self, ArgumentError> {
        require_finite(begin, "wavelength begin")?;
        require_finite(end, "wavelength end")?;
        require_finite(step, "wavelength step")?;

        if step <= 0.0 {
            return Err(ArgumentError::NonPositiveStep { step });
        }
        if begin > end {
            return Err(ArgumentError::InvertedRange { begin, end });
        }

        let points = ((end - begin) / step + GRID_EPSILON).floor() + 1.0;
        #[allow(clippy::cast_precision_loss)]
        let max_points = MAX_GRID_POINTS as f64;
        if !points.is_finite() || points > max_points {
            return Err(ArgumentError::GridTooLarge {
                points,
                max: MAX_GRID_POINTS,
            });
        }

        Ok(Self { begin, end, step })
    }

    /// Grid with the fixed 0.1 nm step used by the high-resolution spectrum.
    pub fn high_resolution(begin: f64, end: f64) -> Result<Self, ArgumentError> {
        Self::new(begin, end, HIGH_RESOLUTION_STEP)
    }

    pub fn begin(&self) -> f64 {
        self.begin
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Bounded by [`MAX_GRID_POINTS`], checked in [`WavelengthGrid::new`].
    #[allow(clippy::cast_sign_loss)]
    pub fn len(&self) -> usize {
        ((self.end - self.begin) / self.step + GRID_EPSILON).floor() as usize + 1
    }

    /// Never true: a valid grid holds at least `begin`.
    pub fn is_empty(&self) -> bool {
        false
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn wavelengths(&self) -> Vec<f64> {
        (0..self.len())
            .map(|i| self.begin + i as f64 * self.step)
            .collect()
    }
}

/// Exposure parameters for `prepare` and `measure`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementSettings {
    pub integration_time_ms: f64,
    pub average_count: i32,
}

impl MeasurementSettings {
    pub fn new(integration_time_ms: f64, average_count: i32) -> Self {
        Self {
            integration_time_ms,
            average_count,
        }
    }

    pub fn integration_time(mut self, ms: f64) -> Self {
        self.integration_time_ms = ms;
        self
    }

    pub fn averaging(mut self, count: i32) -> Self {
        self.average_count = count;
        self
    }

    pub fn validate<F: DeviceFamily>(&self) -> Result<(), ArgumentError> {
        validate_integration_time::<F>(self.integration_time_ms)?;
        validate_average_count(self.average_count)
    }
}

impl Default for MeasurementSettings {
    fn default() -> Self {
        Self::new(100.0, 1)
    }
}

/// Upper bounds the instrument may use while adapting its exposure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptationSettings {
    pub max_integration_time_ms: f64,
    pub max_average_count: i32,
}

impl AdaptationSettings {
    pub fn new(max_integration_time_ms: f64, max_average_count: i32) -> Self {
        Self {
            max_integration_time_ms,
            max_average_count,
        }
    }

    pub fn validate<F: DeviceFamily>(&self) -> Result<(), ArgumentError> {
        validate_integration_time::<F>(self.max_integration_time_ms)?;
        validate_average_count(self.max_average_count)
    }
}

impl Default for AdaptationSettings {
    fn default() -> Self {
        Self::new(5_000.0, 10)
    }
}

pub fn validate_integration_time<F: DeviceFamily>(ms: f64) -> Result<(), ArgumentError> {
    require_finite(ms, "integration time")?;
    if ms < 0.0 {
        return Err(ArgumentError::NegativeIntegrationTime { ms });
    }
    if ms > F::MAX_INTEGRATION_MS {
        return Err(ArgumentError::IntegrationTimeTooLong {
            ms,
            max_ms: F::MAX_INTEGRATION_MS,
        });
    }
    Ok(())
}

pub fn validate_average_count(count: i32) -> Result<(), ArgumentError> {
    if count <= 0 {
        return Err(ArgumentError::NonPositiveAverageCount { count });
    }
    Ok(())
}

/// Validate a `[begin, end]` band used by band-limited integrals.
pub fn validate_band(begin: f64, end: f64) -> Result<(), ArgumentError> {
    require_finite(begin, "wavelength begin")?;
    require_finite(end, "wavelength end")?;
    if begin > end {
        return Err(ArgumentError::InvertedRange { begin, end });
    }
    Ok(())
}
