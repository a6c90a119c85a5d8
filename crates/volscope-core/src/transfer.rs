//! Piecewise-linear color maps and opacity functions.
//!
//! Both are ordered lists of control points over the normalized scalar axis
//! `[0, 1]`. On the wire they are flat float lists: `[p, r, g, b, ...]` for
//! color maps and `[p, a, ...]` for opacity functions.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A color map control point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorPoint {
    pub position: f32,
    pub color: Vec3,
}

/// An opacity function control point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpacityPoint {
    pub position: f32,
    pub opacity: f32,
}

/// Ordered color control points, monotonic in position.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct ColorMapDescriptor {
    pub points: Vec<ColorPoint>,
}

/// Ordered opacity control points, monotonic in position.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct OpacityFunctionDescriptor {
    pub points: Vec<OpacityPoint>,
}

fn check_stride(what: &str, flat: &[f32], stride: usize) -> Result<(), ValidationError> {
    if flat.len() % stride == 0 {
        Ok(())
    } else {
        Err(ValidationError::RaggedControlPoints {
            what: what.to_string(),
            len: flat.len(),
            stride,
        })
    }
}

fn check_monotonic(
    what: &str,
    positions: impl Iterator<Item = f32>,
) -> Result<(), ValidationError> {
    let mut previous = f32::NEG_INFINITY;
    for (index, position) in positions.enumerate() {
        if position.is_nan() || position < previous {
            return Err(ValidationError::NonMonotonic {
                what: what.to_string(),
                index,
            });
        }
        previous = position;
    }
    Ok(())
}

impl ColorMapDescriptor {
    /// Creates a color map from control points.
    pub fn new(points: Vec<ColorPoint>) -> Self {
        Self { points }
    }

    /// Parses the flat `[p, r, g, b, ...]` form.
    pub fn from_flat(flat: &[f32]) -> Result<Self, ValidationError> {
        check_stride("color map", flat, 4)?;
        Ok(Self {
            points: flat
                .chunks_exact(4)
                .map(|c| ColorPoint {
                    position: c[0],
                    color: Vec3::new(c[1], c[2], c[3]),
                })
                .collect(),
        })
    }

    /// Flattens back to `[p, r, g, b, ...]`.
    pub fn to_flat(&self) -> Vec<f32> {
        self.points
            .iter()
            .flat_map(|p| [p.position, p.color.x, p.color.y, p.color.z])
            .collect()
    }

    /// Checks that positions never decrease.
    pub fn validate(&self, what: &str) -> Result<(), ValidationError> {
        check_monotonic(what, self.points.iter().map(|p| p.position))
    }
}

impl OpacityFunctionDescriptor {
    /// Creates an opacity function from control points.
    pub fn new(points: Vec<OpacityPoint>) -> Self {
        Self { points }
    }

    /// Parses the flat `[p, a, ...]` form.
    pub fn from_flat(flat: &[f32]) -> Result<Self, ValidationError> {
        check_stride("opacity function", flat, 2)?;
        Ok(Self {
            points: flat
                .chunks_exact(2)
                .map(|c| OpacityPoint {
                    position: c[0],
                    opacity: c[1],
                })
                .collect(),
        })
    }

    /// Flattens back to `[p, a, ...]`.
    pub fn to_flat(&self) -> Vec<f32> {
        self.points
            .iter()
            .flat_map(|p| [p.position, p.opacity])
            .collect()
    }

    /// Checks that positions never decrease.
    pub fn validate(&self, what: &str) -> Result<(), ValidationError> {
        check_monotonic(what, self.points.iter().map(|p| p.position))
    }
}

impl TryFrom<Vec<f32>> for ColorMapDescriptor {
    type Error = ValidationError;

    fn try_from(flat: Vec<f32>) -> Result<Self, Self::Error> {
        Self::from_flat(&flat)
    }
}

impl From<ColorMapDescriptor> for Vec<f32> {
    fn from(map: ColorMapDescriptor) -> Self {
        map.to_flat()
    }
}

impl TryFrom<Vec<f32>> for OpacityFunctionDescriptor {
    type Error = ValidationError;

    fn try_from(flat: Vec<f32>) -> Result<Self, Self::Error> {
        Self::from_flat(&flat)
    }
}

impl From<OpacityFunctionDescriptor> for Vec<f32> {
    fn from(function: OpacityFunctionDescriptor) -> Self {
        function.to_flat()
    }
}

/// Scalar bounds used to normalize samples before the transfer function lookup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 2]", into = "[f32; 2]")]
pub struct ColorRange {
    pub low: f32,
    pub high: f32,
}

impl ColorRange {
    pub fn new(low: f32, high: f32) -> Self {
        Self { low, high }
    }
}

impl Default for ColorRange {
    fn default() -> Self {
        Self::new(0.0, 1.0)
    }
}

impl From<[f32; 2]> for ColorRange {
    fn from([low, high]: [f32; 2]) -> Self {
        Self { low, high }
    }
}

impl From<ColorRange> for [f32; 2] {
    fn from(range: ColorRange) -> Self {
        [range.low, range.high]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_map_from_flat() {
        let map = ColorMapDescriptor::from_flat(&[0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0]).unwrap();
        assert_eq!(map.points.len(), 2);
        assert_eq!(map.points[1].color, Vec3::Z);
        assert_eq!(map.to_flat().len(), 8);

        assert!(matches!(
            ColorMapDescriptor::from_flat(&[0.0, 1.0, 0.0]),
            Err(ValidationError::RaggedControlPoints { stride: 4, .. })
        ));
    }

    #[test]
    fn test_monotonic_validation() {
        let ok = OpacityFunctionDescriptor::from_flat(&[0.0, 0.0, 0.5, 0.2, 0.5, 0.4, 1.0, 1.0])
            .unwrap();
        assert!(ok.validate("opacity function 0").is_ok());

        let bad = OpacityFunctionDescriptor::from_flat(&[0.0, 0.0, 0.8, 0.2, 0.3, 1.0]).unwrap();
        assert_eq!(
            bad.validate("opacity function 1"),
            Err(ValidationError::NonMonotonic {
                what: "opacity function 1".to_string(),
                index: 2,
            })
        );
    }

    #[test]
    fn test_color_range_json() {
        let range: ColorRange = serde_json::from_str("[0.5, 1.5]").unwrap();
        assert_eq!(range, ColorRange::new(0.5, 1.5));
        assert_eq!(ColorRange::default(), ColorRange::new(0.0, 1.0));
    }

    proptest::proptest! {
        #[test]
        fn sorted_positions_validate(mut positions in proptest::collection::vec(-10.0f32..10.0, 0..16)) {
            positions.sort_by(f32::total_cmp);
            let flat: Vec<f32> = positions.iter().flat_map(|&p| [p, 0.5]).collect();
            let function = OpacityFunctionDescriptor::from_flat(&flat).unwrap();
            proptest::prop_assert!(function.validate("opacity function").is_ok());

            if positions.len() > 1 && positions[0] < positions[positions.len() - 1] {
                positions.reverse();
                let flat: Vec<f32> = positions.iter().flat_map(|&p| [p, 0.5]).collect();
                let function = OpacityFunctionDescriptor::from_flat(&flat).unwrap();
                proptest::prop_assert!(function.validate("opacity function").is_err());
            }
        }
    }
}
