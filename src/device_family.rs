//! Capability descriptors for the parallel driver families.
//!
//! All families share the same session, result and measurement machinery; they
//! differ in which operations their driver module exports, how many scratch
//! cells their richest call needs, and their integration-time ceiling.

use crate::error::{Result, SpectroError};
use crate::scratch_pool::ScratchLayout;

/// Operations a family's driver module exports beyond the common set
/// (measure, poll, break, resampled spectrum, integrals, device information).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub prepare: bool,
    pub adaptation: bool,
    pub raw_samples: bool,
    pub shutter: bool,
    pub colorimetry: bool,
    pub tm30: bool,
    pub high_resolution: bool,
}

/// An operation that only some families export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Prepare,
    Adaptation,
    RawSamples,
    Shutter,
    Colorimetry,
    Tm30,
    HighResolution,
}

impl Capabilities {
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Prepare => self.prepare,
            Capability::Adaptation => self.adaptation,
            Capability::RawSamples => self.raw_samples,
            Capability::Shutter => self.shutter,
            Capability::Colorimetry => self.colorimetry,
            Capability::Tm30 => self.tm30,
            Capability::HighResolution => self.high_resolution,
        }
    }
}

pub trait DeviceFamily: Send + 'static {
    const NAME: &'static str;
    const SCRATCH: ScratchLayout;
    const CAPABILITIES: Capabilities;
    /// Longest integration time the family accepts, in milliseconds.
    const MAX_INTEGRATION_MS: f64;

    /// Reject `operation` locally if the family's driver does not export it.
    fn require(capability: Capability, operation: &'static str) -> Result<()> {
        if Self::CAPABILITIES.supports(capability) {
            Ok(())
        } else {
            Err(SpectroError::Unsupported {
                family: Self::NAME,
                operation,
            })
        }
    }
}

/// General instrument core: every operation, the largest scratch layout.
#[derive(Debug, Clone, Copy)]
pub struct GeneralInstrument;

impl DeviceFamily for GeneralInstrument {
    const NAME: &'static str = "general instrument";
    const SCRATCH: ScratchLayout = ScratchLayout::new(4, 2, 8, 8, 8, 1);
    const CAPABILITIES: Capabilities = Capabilities {
        prepare: true,
        adaptation: true,
        raw_samples: true,
        shutter: true,
        colorimetry: true,
        tm30: true,
        high_resolution: true,
    };
    const MAX_INTEGRATION_MS: f64 = 60_000.0;
}

/// Colorimetry instrument, first generation.
#[derive(Debug, Clone, Copy)]
pub struct Radio;

impl DeviceFamily for Radio {
    const NAME: &'static str = "radio";
    const SCRATCH: ScratchLayout = ScratchLayout::new(2, 1, 4, 4, 6, 1);
    const CAPABILITIES: Capabilities = Capabilities {
        prepare: false,
        adaptation: true,
        raw_samples: false,
        shutter: false,
        colorimetry: true,
        tm30: false,
        high_resolution: false,
    };
    const MAX_INTEGRATION_MS: f64 = 30_000.0;
}

/// Colorimetry instrument with TM-30 reports and the fixed 0.1 nm grid.
#[derive(Debug, Clone, Copy)]
pub struct RadioExtended;

impl DeviceFamily for RadioExtended {
    const NAME: &'static str = "radio extended";
    const SCRATCH: ScratchLayout = ScratchLayout::new(2, 1, 8, 8, 8, 1);
    const CAPABILITIES: Capabilities = Capabilities {
        prepare: true,
        adaptation: true,
        raw_samples: false,
        shutter: false,
        colorimetry: true,
        tm30: true,
        high_resolution: true,
    };
    const MAX_INTEGRATION_MS: f64 = 60_000.0;
}

/// Raw-spectrum module without automatic adaptation.
#[derive(Debug, Clone, Copy)]
pub struct Spectro;

impl DeviceFamily for Spectro {
    const NAME: &'static str = "spectro";
    const SCRATCH: ScratchLayout = ScratchLayout::new(2, 1, 4, 4, 2, 1);
    const CAPABILITIES: Capabilities = Capabilities {
        prepare: true,
        adaptation: false,
        raw_samples: true,
        shutter: true,
        colorimetry: false,
        tm30: false,
        high_resolution: false,
    };
    const MAX_INTEGRATION_MS: f64 = 10_000.0;
}

/// Raw-spectrum module with automatic adaptation.
#[derive(Debug, Clone, Copy)]
pub struct SpectroAdaptive;

impl DeviceFamily for SpectroAdaptive {
    const NAME: &'static str = "spectro adaptive";
    const SCRATCH: ScratchLayout = ScratchLayout::new(2, 1, 4, 4, 2, 1);
    const CAPABILITIES: Capabilities = Capabilities {
        prepare: true,
        adaptation: true,
        raw_samples: true,
        shutter: true,
        colorimetry: false,
        tm30: false,
        high_resolution: true,
    };
    const MAX_INTEGRATION_MS: f64 = 10_000.0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_rejects_missing_capability() {
        assert!(GeneralInstrument::require(Capability::Tm30, "tm30").is_ok());

        let err = Spectro::require(Capability::Colorimetry, "chromaticity").unwrap_err();
        assert_eq!(
            err.to_string(),
            "spectro devices do not support chromaticity"
        );
        assert!(Radio::require(Capability::RawSamples, "samples").is_err());
    }

    #[test]
    fn test_general_instrument_has_richest_layout() {
        let general = GeneralInstrument::SCRATCH;
        for layout in [
            Radio::SCRATCH,
            RadioExtended::SCRATCH,
            Spectro::SCRATCH,
            SpectroAdaptive::SCRATCH,
        ] {
            assert!(layout.ints <= general.ints);
            assert!(layout.floats <= general.floats);
            assert!(layout.doubles <= general.doubles);
        }
        assert_eq!(general.ints, 8);
        assert_eq!(general.floats, 8);
    }
}
