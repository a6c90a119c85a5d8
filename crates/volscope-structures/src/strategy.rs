//! Render strategies and the registry that selects them.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use rand::rngs::StdRng;
use rand::SeedableRng;
use volscope_core::{ChangeSet, MultiVolumeDescriptor, Options, Resolution, Result};
use volscope_render::{GpuBackend, TextureHandle};

use crate::multi_volume::MultiVolumeObject;

/// The kinds of renderable object a scene can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// One to four volumes composited by maximum intensity projection.
    /// A single volume is the one-slot case.
    MultiVolume,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultiVolume => f.write_str("multi-volume"),
        }
    }
}

/// A live object built by a [`RenderStrategy`].
pub trait RenderObject: Any {
    fn kind(&self) -> ObjectKind;

    /// Returns a reference to this object as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns a mutable reference to this object as `Any` for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Applies what can be applied in place.
    fn update(&mut self, changes: &ChangeSet) -> Resolution;

    /// Sends deferred uploads. Returns how many resources were written.
    fn flush(&mut self, backend: &mut dyn GpuBackend) -> Result<usize>;

    /// Releases every GPU resource.
    fn dispose(self: Box<Self>, backend: &mut dyn GpuBackend) -> Result<()>;

    fn texture_handles(&self) -> Vec<TextureHandle>;
}

impl RenderObject for MultiVolumeObject {
    fn kind(&self) -> ObjectKind {
        ObjectKind::MultiVolume
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn update(&mut self, changes: &ChangeSet) -> Resolution {
        MultiVolumeObject::update(self, changes)
    }

    fn flush(&mut self, backend: &mut dyn GpuBackend) -> Result<usize> {
        Ok(MultiVolumeObject::flush(self, backend)?)
    }

    fn dispose(self: Box<Self>, backend: &mut dyn GpuBackend) -> Result<()> {
        Ok(MultiVolumeObject::dispose(*self, backend)?)
    }

    fn texture_handles(&self) -> Vec<TextureHandle> {
        MultiVolumeObject::texture_handles(self)
    }
}

/// Builds and maintains one kind of renderable object.
///
/// `update`, `flush` and `dispose` forward to the object by default; a
/// strategy only has to know how to build.
pub trait RenderStrategy {
    fn kind(&self) -> ObjectKind;

    fn create(
        &mut self,
        descriptor: &MultiVolumeDescriptor,
        backend: &mut dyn GpuBackend,
    ) -> Result<Box<dyn RenderObject>>;

    fn update(&self, object: &mut dyn RenderObject, changes: &ChangeSet) -> Resolution {
        object.update(changes)
    }

    fn flush(&self, object: &mut dyn RenderObject, backend: &mut dyn GpuBackend) -> Result<usize> {
        object.flush(backend)
    }

    fn dispose(&self, object: Box<dyn RenderObject>, backend: &mut dyn GpuBackend) -> Result<()> {
        object.dispose(backend)
    }
}

/// Strategy for [`MultiVolumeObject`]s.
///
/// Owns the random source for jitter noise so that seeded strategies build
/// reproducible objects.
pub struct MultiVolumeStrategy {
    options: Options,
    rng: StdRng,
}

impl MultiVolumeStrategy {
    pub fn new(options: Options) -> Self {
        Self {
            options,
            rng: StdRng::from_entropy(),
        }
    }

    /// A strategy whose jitter textures are reproducible.
    pub fn with_seed(options: Options, seed: u64) -> Self {
        Self {
            options,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }
}

impl RenderStrategy for MultiVolumeStrategy {
    fn kind(&self) -> ObjectKind {
        ObjectKind::MultiVolume
    }

    fn create(
        &mut self,
        descriptor: &MultiVolumeDescriptor,
        backend: &mut dyn GpuBackend,
    ) -> Result<Box<dyn RenderObject>> {
        let object = MultiVolumeObject::create(descriptor, &self.options, &mut self.rng, backend)?;
        Ok(Box::new(object))
    }
}

/// Maps each [`ObjectKind`] to the strategy that handles it.
#[derive(Default)]
pub struct StrategyRegistry {
    strategies: HashMap<ObjectKind, Box<dyn RenderStrategy>>,
}

impl StrategyRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in strategy.
    pub fn with_defaults(options: &Options) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(MultiVolumeStrategy::new(options.clone())));
        registry
    }

    /// Registers a strategy, replacing any previous one for the same kind.
    pub fn register(&mut self, strategy: Box<dyn RenderStrategy>) -> Option<Box<dyn RenderStrategy>> {
        self.strategies.insert(strategy.kind(), strategy)
    }

    pub fn get(&self, kind: ObjectKind) -> Option<&dyn RenderStrategy> {
        self.strategies.get(&kind).map(AsRef::as_ref)
    }

    pub fn get_mut(&mut self, kind: ObjectKind) -> Option<&mut (dyn RenderStrategy + 'static)> {
        self.strategies.get_mut(&kind).map(AsMut::as_mut)
    }

    pub fn contains(&self, kind: ObjectKind) -> bool {
        self.strategies.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}
