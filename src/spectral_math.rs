//! Dark/light/reference arithmetic.
//!
//! Every function is total: a non-positive reference signal yields a
//! transmittance of exactly zero, and zero transmittance yields infinite
//! absorbance. Values are never clamped.

use polars::prelude::*;

use crate::error::{ArgumentError, Result};

pub const WAVELENGTH_COLUMN_NAME: &str = "wavelength";
pub const DARK_COLUMN_NAME: &str = "dark";
pub const LIGHT_COLUMN_NAME: &str = "light";
pub const REFERENCE_COLUMN_NAME: &str = "reference";
pub const TRANSMITTANCE_COLUMN_NAME: &str = "transmittance";
pub const ABSORBANCE_COLUMN_NAME: &str = "absorbance";

fn ratio(dark: f64, light: f64, reference: f64) -> f64 {
    let span = reference - dark;
    if span > 0.0 {
        (light - dark) / span
    } else {
        0.0
    }
}

fn absorbance_of(transmittance: f64) -> f64 {
    if transmittance > 0.0 {
        -transmittance.log10()
    } else {
        f64::INFINITY
    }
}

fn ratios(dark: &[f64], light: &[f64], reference: &[f64]) -> Vec<f64> {
    dark.iter()
        .zip(light)
        .zip(reference)
        .map(|((d, l), r)| ratio(*d, *l, *r))
        .collect()
}

fn check_lengths(dark: &[f64], light: &[f64], reference: &[f64]) -> Result<()> {
    if dark.len() != light.len() || dark.len() != reference.len() {
        return Err(ArgumentError::LengthMismatch {
            dark: dark.len(),
            light: light.len(),
            reference: reference.len(),
        }
        .into());
    }
    Ok(())
}

/// `(light - dark) / (reference - dark)` per pixel.
pub fn transmittance(dark: &[f64], light: &[f64], reference: &[f64]) -> Result<Vec<f64>> {
    check_lengths(dark, light, reference)?;
    Ok(ratios(dark, light, reference))
}

/// Same ratio as [`transmittance`], measured against a white standard.
pub fn reflectance(dark: &[f64], light: &[f64], reference: &[f64]) -> Result<Vec<f64>> {
    transmittance(dark, light, reference)
}

/// `-log10(T)` per pixel, `+inf` where no light came through.
pub fn absorbance(dark: &[f64], light: &[f64], reference: &[f64]) -> Result<Vec<f64>> {
    let transmittance = transmittance(dark, light, reference)?;
    Ok(absorbance_from_transmittance(&transmittance))
}

pub fn absorbance_from_transmittance(transmittance: &[f64]) -> Vec<f64> {
    transmittance.iter().copied().map(absorbance_of).collect()
}

/// Dark, light and reference readings of equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralTriple {
    dark: Vec<f64>,
    light: Vec<f64>,
    reference: Vec<f64>,
}

impl SpectralTriple {
    pub fn new(dark: Vec<f64>, light: Vec<f64>, reference: Vec<f64>) -> Result<Self> {
        check_lengths(&dark, &light, &reference)?;
        Ok(Self {
            dark,
            light,
            reference,
        })
    }

    pub fn dark(&self) -> &[f64] {
        &self.dark
    }

    pub fn light(&self) -> &[f64] {
        &self.light
    }

    pub fn reference(&self) -> &[f64] {
        &self.reference
    }

    pub fn len(&self) -> usize {
        self.dark.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dark.is_empty()
    }

    pub fn transmittance(&self) -> Vec<f64> {
        ratios(&self.dark, &self.light, &self.reference)
    }

    pub fn reflectance(&self) -> Vec<f64> {
        self.transmittance()
    }

    pub fn absorbance(&self) -> Vec<f64> {
        absorbance_from_transmittance(&self.transmittance())
    }

    /// Attach a wavelength axis and compute both derived quantities.
    pub fn correct(&self, wavelengths: &[f64]) -> Result<CorrectedSpectrum> {
        if wavelengths.len() != self.len() {
            return Err(ArgumentError::AxisMismatch {
                axis: WAVELENGTH_COLUMN_NAME,
                axis_len: wavelengths.len(),
                samples: self.len(),
            }
            .into());
        }

        let transmittance = self.transmittance();
        let absorbance = absorbance_from_transmittance(&transmittance);
        Ok(CorrectedSpectrum {
            wavelengths: wavelengths.to_vec(),
            triple: self.clone(),
            transmittance,
            absorbance,
        })
    }

    pub fn to_frame(&self, wavelengths: &[f64]) -> Result<DataFrame> {
        self.correct(wavelengths)?.to_frame()
    }
}

/// A triple together with its wavelength axis, transmittance and absorbance.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectedSpectrum {
    wavelengths: Vec<f64>,
    triple: SpectralTriple,
    transmittance: Vec<f64>,
    absorbance: Vec<f64>,
}

impl CorrectedSpectrum {
    pub fn wavelengths(&self) -> &[f64] {
        &self.wavelengths
    }

    pub fn triple(&self) -> &SpectralTriple {
        &self.triple
    }

    pub fn transmittance(&self) -> &[f64] {
        &self.transmittance
    }

    pub fn absorbance(&self) -> &[f64] {
        &self.absorbance
    }

    pub fn to_frame(&self) -> Result<DataFrame> {
        let columns: Vec<Column> = [
            (WAVELENGTH_COLUMN_NAME, self.wavelengths.as_slice()),
            (DARK_COLUMN_NAME, self.triple.dark()),
            (LIGHT_COLUMN_NAME, self.triple.light()),
            (REFERENCE_COLUMN_NAME, self.triple.reference()),
            (TRANSMITTANCE_COLUMN_NAME, self.transmittance.as_slice()),
            (ABSORBANCE_COLUMN_NAME, self.absorbance.as_slice()),
        ]
        .into_iter()
        .map(|(name, values)| Series::new(name.into(), values).into())
        .collect();

        Ok(DataFrame::new(columns)?)
    }
}
