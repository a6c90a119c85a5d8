//! Sparse field-level change sets and their resolution.
//!
//! A [`ChangeSet`] maps descriptor fields to new values. Applying it to a live
//! object yields a [`Resolution`] that says, per field, whether the change was
//! applied in place or needs the object to be rebuilt.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Deserialize;

use crate::array::VolumeDescriptor;
use crate::descriptor::ModelMatrix;
use crate::error::{Result, VolscopeError};
use crate::transfer::{ColorMapDescriptor, ColorRange, OpacityFunctionDescriptor};

/// A descriptor field addressed by a change.
///
/// Per-volume fields carry the slot index. On the wire the bare name
/// (`color_range`) addresses slot 0 and `color_range[2]` addresses slot 2.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    VolumeList,
    ColorMapList,
    OpacityFunctionList,
    ColorRangeList,
    Volume(usize),
    ColorMap(usize),
    OpacityFunction(usize),
    ColorRange(usize),
    Mask,
    MaskOpacities,
    ModelMatrix,
    Samples,
    GradientStep,
    Interpolation,
    AlphaBlending,
    /// Any field this crate does not know about.
    Other(String),
}

impl Field {
    /// Parses a wire field name.
    pub fn parse(name: &str) -> Self {
        let (base, slot) = match name.strip_suffix(']').and_then(|s| s.split_once('[')) {
            Some((base, index)) => match index.parse::<usize>() {
                Ok(slot) => (base, slot),
                Err(_) => return Self::Other(name.to_string()),
            },
            None => (name, 0),
        };
        let indexed = base != name;

        match base {
            "volume" => Self::Volume(slot),
            "color_map" => Self::ColorMap(slot),
            "opacity_function" => Self::OpacityFunction(slot),
            "color_range" => Self::ColorRange(slot),
            _ if indexed => Self::Other(name.to_string()),
            "volume_list" => Self::VolumeList,
            "color_map_list" => Self::ColorMapList,
            "opacity_function_list" => Self::OpacityFunctionList,
            "color_range_list" => Self::ColorRangeList,
            "mask" => Self::Mask,
            "mask_opacities" => Self::MaskOpacities,
            "model_matrix" => Self::ModelMatrix,
            "samples" => Self::Samples,
            "gradient_step" => Self::GradientStep,
            "interpolation" => Self::Interpolation,
            "alpha_blending" => Self::AlphaBlending,
            _ => Self::Other(name.to_string()),
        }
    }

    /// Returns the slot a per-volume field targets.
    pub fn slot(&self) -> Option<usize> {
        match self {
            Self::Volume(i) | Self::ColorMap(i) | Self::OpacityFunction(i) | Self::ColorRange(i) => {
                Some(*i)
            }
            _ => None,
        }
    }
}

impl From<&str> for Field {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VolumeList => f.write_str("volume_list"),
            Self::ColorMapList => f.write_str("color_map_list"),
            Self::OpacityFunctionList => f.write_str("opacity_function_list"),
            Self::ColorRangeList => f.write_str("color_range_list"),
            Self::Volume(i) => write!(f, "volume[{i}]"),
            Self::ColorMap(i) => write!(f, "color_map[{i}]"),
            Self::OpacityFunction(i) => write!(f, "opacity_function[{i}]"),
            Self::ColorRange(i) => write!(f, "color_range[{i}]"),
            Self::Mask => f.write_str("mask"),
            Self::MaskOpacities => f.write_str("mask_opacities"),
            Self::ModelMatrix => f.write_str("model_matrix"),
            Self::Samples => f.write_str("samples"),
            Self::GradientStep => f.write_str("gradient_step"),
            Self::Interpolation => f.write_str("interpolation"),
            Self::AlphaBlending => f.write_str("alpha_blending"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// The new value carried by a change.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Volumes(Vec<VolumeDescriptor>),
    ColorMaps(Vec<ColorMapDescriptor>),
    OpacityFunctions(Vec<OpacityFunctionDescriptor>),
    ColorRanges(Vec<ColorRange>),
    Volume(VolumeDescriptor),
    ColorMap(ColorMapDescriptor),
    OpacityFunction(OpacityFunctionDescriptor),
    ColorRange(ColorRange),
    /// `None` removes the mask.
    Mask(Option<VolumeDescriptor>),
    MaskOpacities(Vec<f32>),
    ModelMatrix(ModelMatrix),
    Samples(u32),
    GradientStep(f32),
    Flag(bool),
    /// Opaque payload of an unknown field.
    Json(serde_json::Value),
}

impl FieldValue {
    /// Decodes the JSON payload for `field`.
    pub fn from_json(field: &Field, value: serde_json::Value) -> Result<Self> {
        let decoded = match field {
            Field::VolumeList => serde_json::from_value(value).map(Self::Volumes),
            Field::ColorMapList => serde_json::from_value(value).map(Self::ColorMaps),
            Field::OpacityFunctionList => serde_json::from_value(value).map(Self::OpacityFunctions),
            Field::ColorRangeList => serde_json::from_value(value).map(Self::ColorRanges),
            Field::Volume(_) => serde_json::from_value(value).map(Self::Volume),
            Field::ColorMap(_) => serde_json::from_value(value).map(Self::ColorMap),
            Field::OpacityFunction(_) => serde_json::from_value(value).map(Self::OpacityFunction),
            Field::ColorRange(_) => serde_json::from_value(value).map(Self::ColorRange),
            Field::Mask => serde_json::from_value(value).map(Self::Mask),
            Field::MaskOpacities => serde_json::from_value(value).map(Self::MaskOpacities),
            Field::ModelMatrix => serde_json::from_value(value).map(Self::ModelMatrix),
            Field::Samples => serde_json::from_value(value).map(Self::Samples),
            Field::GradientStep => serde_json::from_value(value).map(Self::GradientStep),
            Field::Interpolation | Field::AlphaBlending => {
                serde_json::from_value(value).map(Self::Flag)
            }
            Field::Other(_) => Ok(Self::Json(value)),
        };
        decoded.map_err(|e| VolscopeError::InvalidField {
            field: field.to_string(),
            reason: e.to_string(),
        })
    }
}

/// One field-level change.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub value: FieldValue,
    /// The field is animated by an external time-series interpolator and must
    /// not be resolved in place.
    pub time_series: bool,
}

impl Change {
    pub fn new(value: FieldValue) -> Self {
        Self {
            value,
            time_series: false,
        }
    }

    pub fn time_series(value: FieldValue) -> Self {
        Self {
            value,
            time_series: true,
        }
    }
}

#[derive(Deserialize)]
struct RawChange {
    value: serde_json::Value,
    #[serde(default)]
    time_series: bool,
}

/// A sparse mapping from field to new value.
///
/// Inserting a field twice keeps the later value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    changes: BTreeMap<Field, Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes `{ "<field>": { "value": ..., "time_series": bool }, ... }`.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, RawChange> = serde_json::from_str(json)?;
        let mut changes = Self::new();
        for (name, raw) in raw {
            let field = Field::parse(&name);
            let value = FieldValue::from_json(&field, raw.value)?;
            changes.insert(
                field,
                Change {
                    value,
                    time_series: raw.time_series,
                },
            );
        }
        Ok(changes)
    }

    /// Inserts or replaces the change for `field`.
    pub fn insert(&mut self, field: Field, change: Change) -> &mut Self {
        self.changes.insert(field, change);
        self
    }

    /// Inserts a change that is not time-series driven.
    pub fn set(&mut self, field: Field, value: FieldValue) -> &mut Self {
        self.insert(field, Change::new(value))
    }

    pub fn set_color_range(&mut self, slot: usize, range: ColorRange) -> &mut Self {
        self.set(Field::ColorRange(slot), FieldValue::ColorRange(range))
    }

    pub fn set_volume(&mut self, slot: usize, volume: VolumeDescriptor) -> &mut Self {
        self.set(Field::Volume(slot), FieldValue::Volume(volume))
    }

    pub fn set_color_map(&mut self, slot: usize, map: ColorMapDescriptor) -> &mut Self {
        self.set(Field::ColorMap(slot), FieldValue::ColorMap(map))
    }

    pub fn set_opacity_function(
        &mut self,
        slot: usize,
        function: OpacityFunctionDescriptor,
    ) -> &mut Self {
        self.set(Field::OpacityFunction(slot), FieldValue::OpacityFunction(function))
    }

    pub fn set_mask(&mut self, mask: Option<VolumeDescriptor>) -> &mut Self {
        self.set(Field::Mask, FieldValue::Mask(mask))
    }

    pub fn set_mask_opacities(&mut self, opacities: Vec<f32>) -> &mut Self {
        self.set(Field::MaskOpacities, FieldValue::MaskOpacities(opacities))
    }

    pub fn set_samples(&mut self, samples: u32) -> &mut Self {
        self.set(Field::Samples, FieldValue::Samples(samples))
    }

    pub fn set_gradient_step(&mut self, step: f32) -> &mut Self {
        self.set(Field::GradientStep, FieldValue::GradientStep(step))
    }

    /// Folds a later change set into this one; its values win.
    pub fn merge(&mut self, later: ChangeSet) {
        self.changes.extend(later.changes);
    }

    pub fn get(&self, field: &Field) -> Option<&Change> {
        self.changes.get(field)
    }

    pub fn contains(&self, field: &Field) -> bool {
        self.changes.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Field, &Change)> {
        self.changes.iter()
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.changes.keys()
    }
}

/// Outcome of applying a change set in place.
///
/// Every field of the input lands in exactly one of the two sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub resolved: BTreeSet<Field>,
    pub unresolved: BTreeSet<Field>,
}

impl Resolution {
    /// Starts with every field of `changes` unresolved.
    pub fn pending(changes: &ChangeSet) -> Self {
        Self {
            resolved: BTreeSet::new(),
            unresolved: changes.fields().cloned().collect(),
        }
    }

    /// Moves `field` to the resolved set.
    pub fn resolve(&mut self, field: &Field) {
        if self.unresolved.remove(field) {
            self.resolved.insert(field.clone());
        }
    }

    /// True when nothing needs the object to be rebuilt.
    pub fn is_fully_resolved(&self) -> bool {
        self.unresolved.is_empty()
    }

    pub fn is_resolved(&self, field: &Field) -> bool {
        self.resolved.contains(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_parse() {
        assert_eq!(Field::parse("color_range"), Field::ColorRange(0));
        assert_eq!(Field::parse("color_range[3]"), Field::ColorRange(3));
        assert_eq!(Field::parse("volume[1]"), Field::Volume(1));
        assert_eq!(Field::parse("samples"), Field::Samples);
        assert_eq!(Field::parse("samples[1]"), Field::Other("samples[1]".into()));
        assert_eq!(Field::parse("volume[x]"), Field::Other("volume[x]".into()));
        assert_eq!(Field::parse("visible"), Field::Other("visible".into()));
    }

    #[test]
    fn test_field_display_round_trips_through_parse() {
        for field in [
            Field::ColorMap(2),
            Field::MaskOpacities,
            Field::ModelMatrix,
            Field::Other("opacity".into()),
        ] {
            assert_eq!(Field::parse(&field.to_string()), field);
        }
    }

    #[test]
    fn test_change_set_later_wins() {
        let mut first = ChangeSet::new();
        first.set_samples(128).set_gradient_step(0.01);

        let mut second = ChangeSet::new();
        second.set_samples(256);

        first.merge(second);
        assert_eq!(first.len(), 2);
        assert_eq!(
            first.get(&Field::Samples).map(|c| &c.value),
            Some(&FieldValue::Samples(256))
        );
    }

    #[test]
    fn test_change_set_from_json() {
        let json = r#"{
            "color_range": {"value": [0.5, 1.5]},
            "samples": {"value": 64, "time_series": true},
            "visible": {"value": false}
        }"#;
        let changes = ChangeSet::from_json(json).unwrap();
        assert_eq!(changes.len(), 3);

        let range = changes.get(&Field::ColorRange(0)).unwrap();
        assert_eq!(range.value, FieldValue::ColorRange(ColorRange::new(0.5, 1.5)));
        assert!(!range.time_series);
        assert!(changes.get(&Field::Samples).unwrap().time_series);
        assert!(changes.contains(&Field::Other("visible".into())));
    }

    #[test]
    fn test_change_set_from_json_rejects_bad_payload() {
        let err = ChangeSet::from_json(r#"{"samples": {"value": "many"}}"#).unwrap_err();
        assert!(matches!(err, VolscopeError::InvalidField { ref field, .. } if field == "samples"));
    }

    #[test]
    fn test_resolution_partitions_fields() {
        let mut changes = ChangeSet::new();
        changes.set_samples(10).set_gradient_step(0.1);

        let mut resolution = Resolution::pending(&changes);
        assert!(!resolution.is_fully_resolved());

        resolution.resolve(&Field::Samples);
        // Resolving a field that was never requested is a no-op.
        resolution.resolve(&Field::Mask);

        assert!(resolution.is_resolved(&Field::Samples));
        assert!(!resolution.is_resolved(&Field::Mask));
        assert_eq!(resolution.unresolved.len(), 1);
        assert!(resolution.unresolved.contains(&Field::GradientStep));
    }
}
