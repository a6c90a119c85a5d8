//! Declarative description of a multi-volume object.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::array::{ElementKind, VolumeDescriptor};
use crate::change::{ChangeSet, Field, FieldValue};
use crate::error::{Result, ValidationError, VolscopeError, MAX_VOLUMES};
use crate::transfer::{ColorMapDescriptor, ColorRange, OpacityFunctionDescriptor};

/// Default number of ray samples.
pub const DEFAULT_SAMPLES: u32 = 512;

/// Default gradient step used for shading.
pub const DEFAULT_GRADIENT_STEP: f32 = 0.005;

/// A 4x4 affine transform, stored row-major as sent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelMatrix(pub [f32; 16]);

/// Translation, rotation and scale of a [`ModelMatrix`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decomposed {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl ModelMatrix {
    pub const IDENTITY: Self = Self([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]);

    /// Builds a row-major matrix from a glam matrix.
    pub fn from_mat4(m: Mat4) -> Self {
        Self(m.transpose().to_cols_array())
    }

    /// Converts to a glam (column-major) matrix.
    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_cols_array(&self.0).transpose()
    }

    /// Splits the transform into translation, rotation and scale.
    pub fn decompose(&self) -> Decomposed {
        let (scale, rotation, translation) = self.to_mat4().to_scale_rotation_translation();
        Decomposed {
            translation,
            rotation,
            scale,
        }
    }
}

impl Default for ModelMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

fn default_samples() -> u32 {
    DEFAULT_SAMPLES
}

fn default_gradient_step() -> f32 {
    DEFAULT_GRADIENT_STEP
}

fn default_true() -> bool {
    true
}

/// Full description of a multi-volume object.
///
/// `color_map_list`, `opacity_function_list` and `color_range_list` are
/// aligned by index with `volume_list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiVolumeDescriptor {
    pub volume_list: Vec<VolumeDescriptor>,
    #[serde(default)]
    pub color_map_list: Vec<ColorMapDescriptor>,
    #[serde(default)]
    pub opacity_function_list: Vec<OpacityFunctionDescriptor>,
    #[serde(default)]
    pub color_range_list: Vec<ColorRange>,
    #[serde(default)]
    pub mask: Option<VolumeDescriptor>,
    #[serde(default)]
    pub mask_opacities: Vec<f32>,
    #[serde(default)]
    pub model_matrix: ModelMatrix,
    #[serde(default = "default_samples")]
    pub samples: u32,
    #[serde(default = "default_gradient_step")]
    pub gradient_step: f32,
    #[serde(default = "default_true")]
    pub interpolation: bool,
    #[serde(default)]
    pub alpha_blending: bool,
}

impl Default for MultiVolumeDescriptor {
    fn default() -> Self {
        Self {
            volume_list: Vec::new(),
            color_map_list: Vec::new(),
            opacity_function_list: Vec::new(),
            color_range_list: Vec::new(),
            mask: None,
            mask_opacities: Vec::new(),
            model_matrix: ModelMatrix::IDENTITY,
            samples: DEFAULT_SAMPLES,
            gradient_step: DEFAULT_GRADIENT_STEP,
            interpolation: true,
            alpha_blending: false,
        }
    }
}

impl MultiVolumeDescriptor {
    /// An object with no volumes.
    pub fn new() -> Self {
        Self::default()
    }

    /// A single-volume object, the `n = 1` case of the general form.
    pub fn single(
        volume: VolumeDescriptor,
        color_map: ColorMapDescriptor,
        opacity_function: OpacityFunctionDescriptor,
        color_range: ColorRange,
    ) -> Self {
        Self::new().with_volume(volume, color_map, opacity_function, color_range)
    }

    /// Appends a volume together with its transfer function and color range.
    #[must_use]
    pub fn with_volume(
        mut self,
        volume: VolumeDescriptor,
        color_map: ColorMapDescriptor,
        opacity_function: OpacityFunctionDescriptor,
        color_range: ColorRange,
    ) -> Self {
        self.volume_list.push(volume);
        self.color_map_list.push(color_map);
        self.opacity_function_list.push(opacity_function);
        self.color_range_list.push(color_range);
        self
    }

    /// Sets the label mask and its per-label opacity multipliers.
    #[must_use]
    pub fn with_mask(mut self, mask: VolumeDescriptor, opacities: Vec<f32>) -> Self {
        self.mask = Some(mask);
        self.mask_opacities = opacities;
        self
    }

    #[must_use]
    pub fn with_model_matrix(mut self, model_matrix: ModelMatrix) -> Self {
        self.model_matrix = model_matrix;
        self
    }

    /// Number of volumes (active slots).
    pub fn volume_count(&self) -> usize {
        self.volume_list.len()
    }

    /// Masking is on when both the mask and its opacity table carry data.
    pub fn mask_enabled(&self) -> bool {
        self.mask.as_ref().is_some_and(|m| !m.data.is_empty()) && !self.mask_opacities.is_empty()
    }

    /// Checks everything object creation relies on.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        let count = self.volume_count();
        if count > MAX_VOLUMES {
            return Err(ValidationError::TooManyVolumes { count });
        }

        for (index, volume) in self.volume_list.iter().enumerate() {
            volume.validate(&format!("volume {index}"))?;

            let color_map = self
                .color_map_list
                .get(index)
                .ok_or(ValidationError::MissingListEntry {
                    list: "color_map_list",
                    index,
                })?;
            color_map.validate(&format!("color map {index}"))?;

            let opacity = self.opacity_function_list.get(index).ok_or(
                ValidationError::MissingListEntry {
                    list: "opacity_function_list",
                    index,
                },
            )?;
            opacity.validate(&format!("opacity function {index}"))?;

            if index >= self.color_range_list.len() {
                return Err(ValidationError::MissingListEntry {
                    list: "color_range_list",
                    index,
                });
            }
        }

        if let Some(mask) = self.mask.as_ref().filter(|m| !m.data.is_empty()) {
            if mask.element_kind() != ElementKind::Uint8 {
                return Err(ValidationError::MaskElementKind(mask.element_kind()));
            }
            mask.validate("mask")?;
        }

        if self.samples == 0 {
            return Err(ValidationError::InvalidSamples(self.samples));
        }
        if !(self.gradient_step.is_finite() && self.gradient_step > 0.0) {
            return Err(ValidationError::InvalidGradientStep(self.gradient_step));
        }

        Ok(())
    }

    /// Folds a change set into this descriptor, producing the revision an
    /// object is rebuilt from.
    ///
    /// Values are copied regardless of whether they were resolved in place or
    /// are time-series driven; the merged descriptor is the single source of
    /// truth for recreation.
    pub fn apply(&mut self, changes: &ChangeSet) -> Result<()> {
        for (field, change) in changes.iter() {
            self.apply_value(field, &change.value)?;
        }
        Ok(())
    }

    fn apply_value(&mut self, field: &Field, value: &FieldValue) -> Result<()> {
        let mismatch = || VolscopeError::InvalidField {
            field: field.to_string(),
            reason: "value does not match the field type".to_string(),
        };

        match (field, value) {
            (Field::VolumeList, FieldValue::Volumes(v)) => self.volume_list.clone_from(v),
            (Field::ColorMapList, FieldValue::ColorMaps(v)) => self.color_map_list.clone_from(v),
            (Field::OpacityFunctionList, FieldValue::OpacityFunctions(v)) => {
                self.opacity_function_list.clone_from(v);
            }
            (Field::ColorRangeList, FieldValue::ColorRanges(v)) => {
                self.color_range_list.clone_from(v);
            }
            (Field::Volume(i), FieldValue::Volume(v)) => {
                *slot_mut(&mut self.volume_list, field, *i)? = v.clone();
            }
            (Field::ColorMap(i), FieldValue::ColorMap(v)) => {
                *slot_mut(&mut self.color_map_list, field, *i)? = v.clone();
            }
            (Field::OpacityFunction(i), FieldValue::OpacityFunction(v)) => {
                *slot_mut(&mut self.opacity_function_list, field, *i)? = v.clone();
            }
            (Field::ColorRange(i), FieldValue::ColorRange(v)) => {
                *slot_mut(&mut self.color_range_list, field, *i)? = *v;
            }
            (Field::Mask, FieldValue::Mask(v)) => self.mask.clone_from(v),
            (Field::MaskOpacities, FieldValue::MaskOpacities(v)) => {
                self.mask_opacities.clone_from(v);
            }
            (Field::ModelMatrix, FieldValue::ModelMatrix(v)) => self.model_matrix = *v,
            (Field::Samples, FieldValue::Samples(v)) => self.samples = *v,
            (Field::GradientStep, FieldValue::GradientStep(v)) => self.gradient_step = *v,
            (Field::Interpolation, FieldValue::Flag(v)) => self.interpolation = *v,
            (Field::AlphaBlending, FieldValue::Flag(v)) => self.alpha_blending = *v,
            (Field::Other(name), _) => {
                log::debug!("ignoring unknown field '{name}' while merging descriptor");
            }
            _ => return Err(mismatch()),
        }
        Ok(())
    }
}

fn slot_mut<'a, T>(list: &'a mut [T], field: &Field, index: usize) -> Result<&'a mut T> {
    let len = list.len();
    list.get_mut(index)
        .ok_or_else(|| VolscopeError::InvalidField {
            field: field.to_string(),
            reason: format!("slot {index} out of range for {len} volumes"),
        })
}
