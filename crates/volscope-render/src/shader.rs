//! Shader program sources and static feature flags.
//!
//! WGSL has no preprocessor, so boolean flags are prepended to the module as
//! `const` declarations. Branches on a `const` are folded by the compiler,
//! which removes the disabled path from the final pipeline.
//!
//! Bind group layouts are part of the program source. Folding a flag away
//! never changes the layout, so objects bind the same resources whatever
//! their flags.

use std::collections::BTreeMap;

use crate::binding::{BindGroupLayout, BindingSlot, SampleKind};
use crate::error::{RenderError, RenderResult};
use crate::texture::TextureDimension;
use crate::uniforms::VOLUME_SLOTS;

/// Ray-marching shader for up to four volumes.
pub const MULTI_VOLUME_WGSL: &str = include_str!("shaders/multi_volume.wgsl");

/// Static flag enabling specular highlights.
pub const USE_SPECULAR: &str = "USE_SPECULAR";

/// Static flag enabling the mask path.
pub const USE_MASK: &str = "USE_MASK";

/// Bind group holding an object's own resources.
pub const OBJECT_GROUP: u32 = 0;

/// Bind group holding the scene uniforms, owned by the host.
pub const SCENE_GROUP: u32 = 1;

/// Binding numbers inside [`OBJECT_GROUP`] of the multi-volume program.
pub mod bindings {
    pub const UNIFORMS: u32 = 0;
    /// Volume textures use `FIRST_VOLUME..FIRST_VOLUME + 4`.
    pub const FIRST_VOLUME: u32 = 1;
    /// Transfer function textures use `FIRST_TRANSFER..FIRST_TRANSFER + 4`.
    pub const FIRST_TRANSFER: u32 = 5;
    pub const JITTER_TEXTURE: u32 = 9;
    pub const JITTER_SAMPLER: u32 = 10;
    pub const MASK_TEXTURE: u32 = 11;
}

/// Bytes of the `SceneUniforms` block in [`SCENE_GROUP`].
pub const SCENE_UNIFORMS_SIZE: usize = 112;

/// A shader module ready to be compiled by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSource {
    pub label: String,
    pub source: String,
    pub vertex_entry: String,
    pub fragment_entry: String,
    pub defines: BTreeMap<String, bool>,
    /// Layout of each bind group, indexed by group number.
    pub bind_groups: Vec<BindGroupLayout>,
}

impl ProgramSource {
    pub fn define(&self, name: &str) -> Option<bool> {
        self.defines.get(name).copied()
    }

    pub fn bind_group(&self, group: u32) -> Option<&[BindingSlot]> {
        self.bind_groups.get(group as usize).map(Vec::as_slice)
    }

    /// The WGSL text with every flag declared ahead of the body.
    pub fn compose(&self) -> String {
        let mut out = String::with_capacity(self.source.len() + 64 * self.defines.len());
        for (name, value) in &self.defines {
            out.push_str(&format!("const {name}: bool = {value};\n"));
        }
        out.push('\n');
        out.push_str(&self.source);
        out
    }
}

/// Builder for shader program sources.
pub struct ShaderBuilder {
    source: Option<String>,
    vertex_entry: String,
    fragment_entry: String,
    label: Option<String>,
    defines: BTreeMap<String, bool>,
    bind_groups: Vec<BindGroupLayout>,
}

impl ShaderBuilder {
    /// Creates a new shader builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            source: None,
            vertex_entry: "vs_main".to_string(),
            fragment_entry: "fs_main".to_string(),
            label: None,
            defines: BTreeMap::new(),
            bind_groups: Vec::new(),
        }
    }

    /// Sets the WGSL module source.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets the vertex shader entry point.
    pub fn with_vertex_entry(mut self, entry: impl Into<String>) -> Self {
        self.vertex_entry = entry.into();
        self
    }

    /// Sets the fragment shader entry point.
    pub fn with_fragment_entry(mut self, entry: impl Into<String>) -> Self {
        self.fragment_entry = entry.into();
        self
    }

    /// Sets the shader label for debugging.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Declares a static boolean flag.
    pub fn with_define(mut self, name: impl Into<String>, value: bool) -> Self {
        self.defines.insert(name.into(), value);
        self
    }

    /// Appends the layout of the next bind group.
    pub fn with_bind_group(mut self, layout: BindGroupLayout) -> Self {
        self.bind_groups.push(layout);
        self
    }

    pub fn build(self) -> RenderResult<ProgramSource> {
        let source = self
            .source
            .ok_or_else(|| RenderError::ShaderCompilationFailed("missing shader source".into()))?;

        for name in self.defines.keys() {
            let valid = name.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !valid {
                return Err(RenderError::ShaderCompilationFailed(format!(
                    "invalid define name '{name}'"
                )));
            }
        }

        Ok(ProgramSource {
            label: self.label.unwrap_or_else(|| "shader".to_string()),
            source,
            vertex_entry: self.vertex_entry,
            fragment_entry: self.fragment_entry,
            defines: self.defines,
            bind_groups: self.bind_groups,
        })
    }
}

impl Default for ShaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Layout of [`OBJECT_GROUP`] in the multi-volume program.
pub fn multi_volume_layout() -> BindGroupLayout {
    let texels = SampleKind::Float { filterable: false };
    let mut layout = vec![BindingSlot::uniform(bindings::UNIFORMS)];
    for slot in (0u32..).take(VOLUME_SLOTS) {
        layout.push(BindingSlot::texture(
            bindings::FIRST_VOLUME + slot,
            TextureDimension::D3,
            texels,
        ));
    }
    for slot in (0u32..).take(VOLUME_SLOTS) {
        layout.push(BindingSlot::texture(
            bindings::FIRST_TRANSFER + slot,
            TextureDimension::D1,
            texels,
        ));
    }
    layout.push(BindingSlot::texture(
        bindings::JITTER_TEXTURE,
        TextureDimension::D2,
        SampleKind::Float { filterable: true },
    ));
    layout.push(BindingSlot::sampler(bindings::JITTER_SAMPLER, true));
    layout.push(BindingSlot::texture(
        bindings::MASK_TEXTURE,
        TextureDimension::D3,
        SampleKind::Uint,
    ));
    layout
}

/// Layout of [`SCENE_GROUP`]: the camera and light uniforms.
pub fn scene_layout() -> BindGroupLayout {
    vec![BindingSlot::uniform(0)]
}

/// The multi-volume program with its two static flags.
pub fn multi_volume_program(specular: bool, mask: bool) -> RenderResult<ProgramSource> {
    ShaderBuilder::new()
        .with_label("multi volume shader")
        .with_source(MULTI_VOLUME_WGSL)
        .with_define(USE_SPECULAR, specular)
        .with_define(USE_MASK, mask)
        .with_bind_group(multi_volume_layout())
        .with_bind_group(scene_layout())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defines_are_prepended() {
        let program = multi_volume_program(false, true).unwrap();
        assert_eq!(program.define(USE_MASK), Some(true));
        assert_eq!(program.define(USE_SPECULAR), Some(false));

        let text = program.compose();
        assert!(text.starts_with("const USE_MASK: bool = true;\nconst USE_SPECULAR: bool = false;\n"));
        assert!(text.contains("fn fs_main"));
    }

    #[test]
    fn test_layout_does_not_depend_on_flags() {
        let plain = multi_volume_program(false, false).unwrap();
        let masked = multi_volume_program(true, true).unwrap();
        assert_eq!(plain.bind_groups, masked.bind_groups);
        assert_eq!(plain.bind_groups.len(), 2);

        let object = plain.bind_group(OBJECT_GROUP).unwrap();
        assert_eq!(object.len(), 12);
        let mut numbers: Vec<u32> = object.iter().map(|slot| slot.binding).collect();
        numbers.dedup();
        assert_eq!(numbers, (0..12).collect::<Vec<_>>());
        assert!(object.contains(&BindingSlot::texture(
            bindings::MASK_TEXTURE,
            TextureDimension::D3,
            SampleKind::Uint
        )));
        assert_eq!(plain.bind_group(SCENE_GROUP), Some(&[BindingSlot::uniform(0)][..]));
        assert!(plain.bind_group(2).is_none());
    }

    #[test]
    fn test_layout_matches_shader_declarations() {
        let program = multi_volume_program(false, false).unwrap();
        for slot in program.bind_group(OBJECT_GROUP).unwrap() {
            let declaration = format!("@group(0) @binding({})", slot.binding);
            assert!(program.source.contains(&declaration), "{declaration} missing");
        }
        assert!(program.source.contains("var mask_texture: texture_3d<u32>"));
        assert!(!program.source.contains("textureSampleLevel(volume_"));
    }

    #[test]
    fn test_missing_source_fails() {
        assert!(ShaderBuilder::new().build().is_err());
    }

    #[test]
    fn test_invalid_define_name() {
        let result = ShaderBuilder::new()
            .with_source("")
            .with_define("bad name", true)
            .build();
        assert!(matches!(result, Err(RenderError::ShaderCompilationFailed(_))));
    }
}
