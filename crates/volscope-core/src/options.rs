//! Configuration options for volscope.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};

/// Scene-wide configuration for building volume objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Scale applied to uniform `[0, 1)` noise when filling the jitter texture.
    pub jitter_multiplier: f32,

    /// Side length of the square jitter texture.
    pub jitter_size: u32,

    /// Horizontal resolution of synthesized transfer-function textures.
    pub transfer_function_width: u32,

    /// Whether the volume shader computes specular highlights.
    pub specular: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            jitter_multiplier: 255.0,
            jitter_size: 64,
            transfer_function_width: 1024,
            specular: false,
        }
    }
}

impl Options {
    /// Parses options from JSON; missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Checks that the texture sizes are positive and the jitter scale is a
    /// finite, non-negative number.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.jitter_size == 0 {
            return Err(ValidationError::InvalidOption {
                name: "jitter_size",
                expected: "at least 1",
                value: f64::from(self.jitter_size),
            });
        }
        if self.transfer_function_width == 0 {
            return Err(ValidationError::InvalidOption {
                name: "transfer_function_width",
                expected: "at least 1",
                value: f64::from(self.transfer_function_width),
            });
        }
        if !self.jitter_multiplier.is_finite() || self.jitter_multiplier < 0.0 {
            return Err(ValidationError::InvalidOption {
                name: "jitter_multiplier",
                expected: "finite and non-negative",
                value: f64::from(self.jitter_multiplier),
            });
        }
        Ok(())
    }
}
