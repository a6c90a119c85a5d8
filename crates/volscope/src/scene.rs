//! The scene: live objects, their descriptors and queued changes.

use std::collections::HashMap;
use std::fmt;

use volscope_core::{ChangeSet, MultiVolumeDescriptor, Options, Resolution, Result, VolscopeError};
use volscope_render::GpuBackend;
use volscope_structures::{ObjectKind, RenderObject, StrategyRegistry};

/// Identifies an object within a [`Scene`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ObjectId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ObjectId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a change set was applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// The in-place resolution against the object that existed before.
    pub resolution: Resolution,
    /// The object was rebuilt from the merged descriptor.
    pub recreated: bool,
}

/// Totals for one [`Scene::prepare_frame`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub applied: usize,
    pub recreated: usize,
    pub uploads: usize,
}

struct SceneEntry {
    kind: ObjectKind,
    descriptor: MultiVolumeDescriptor,
    object: Box<dyn RenderObject>,
    pending: ChangeSet,
}

/// Owns a backend and every object built on it.
///
/// Objects are created through the strategy registered for their kind.
/// Change sets are queued per object and applied before the next frame:
/// in place when every field resolves, otherwise by rebuilding the object
/// from the merged descriptor. Dropping the scene disposes every object.
pub struct Scene<B: GpuBackend> {
    backend: B,
    registry: StrategyRegistry,
    options: Options,
    objects: HashMap<ObjectId, SceneEntry>,
}

impl<B: GpuBackend> Scene<B> {
    /// Creates a scene with the built-in strategies.
    pub fn new(backend: B, options: Options) -> Self {
        let registry = StrategyRegistry::with_defaults(&options);
        Self::with_registry(backend, options, registry)
    }

    pub fn with_registry(backend: B, options: Options, registry: StrategyRegistry) -> Self {
        Self {
            backend,
            registry,
            options,
            objects: HashMap::new(),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn registry_mut(&mut self) -> &mut StrategyRegistry {
        &mut self.registry
    }

    /// Builds an object and adds it to the scene.
    pub fn insert(
        &mut self,
        id: impl Into<ObjectId>,
        kind: ObjectKind,
        descriptor: MultiVolumeDescriptor,
    ) -> Result<()> {
        let id = id.into();
        if self.objects.contains_key(&id) {
            return Err(VolscopeError::ObjectExists(id.to_string()));
        }

        let strategy = self
            .registry
            .get_mut(kind)
            .ok_or_else(|| VolscopeError::NoStrategy(kind.to_string()))?;
        let object = strategy.create(&descriptor, &mut self.backend)?;

        log::info!("inserted {kind} object '{id}'");
        self.objects.insert(
            id,
            SceneEntry {
                kind,
                descriptor,
                object,
                pending: ChangeSet::new(),
            },
        );
        Ok(())
    }

    /// Queues a change set; later values win over earlier queued ones.
    pub fn queue_changes(&mut self, id: &ObjectId, changes: ChangeSet) -> Result<()> {
        let entry = self
            .objects
            .get_mut(id)
            .ok_or_else(|| VolscopeError::ObjectNotFound(id.to_string()))?;
        entry.pending.merge(changes);
        Ok(())
    }

    /// Applies the queued changes of one object.
    ///
    /// Changes are first resolved in place. If anything is left unresolved
    /// the object is rebuilt from the merged descriptor; the old object is
    /// disposed only after the new one was built. If the rebuild fails the
    /// old object stays, with its in-place changes kept, and the error is
    /// returned. A failure to dispose the replaced object is only logged.
    pub fn apply_changes(&mut self, id: &ObjectId) -> Result<ApplyOutcome> {
        let entry = self
            .objects
            .get_mut(id)
            .ok_or_else(|| VolscopeError::ObjectNotFound(id.to_string()))?;
        let pending = std::mem::take(&mut entry.pending);
        if pending.is_empty() {
            return Ok(ApplyOutcome::default());
        }

        let strategy = self
            .registry
            .get_mut(entry.kind)
            .ok_or_else(|| VolscopeError::NoStrategy(entry.kind.to_string()))?;
        let resolution = strategy.update(&mut *entry.object, &pending);

        let mut in_place = ChangeSet::new();
        for (field, change) in pending.iter() {
            if resolution.is_resolved(field) {
                in_place.insert(field.clone(), change.clone());
            }
        }
        entry.descriptor.apply(&in_place)?;

        if resolution.is_fully_resolved() {
            log::debug!("'{id}': {} change(s) applied in place", resolution.resolved.len());
            return Ok(ApplyOutcome {
                resolution,
                recreated: false,
            });
        }

        let mut merged = entry.descriptor.clone();
        merged.apply(&pending)?;
        log::info!(
            "'{id}': rebuilding for {} unresolved field(s)",
            resolution.unresolved.len()
        );

        let object = strategy.create(&merged, &mut self.backend)?;
        let old = std::mem::replace(&mut entry.object, object);
        entry.descriptor = merged;
        // The replacement is live either way.
        if let Err(e) = strategy.dispose(old, &mut self.backend) {
            log::warn!("'{id}': failed to dispose the replaced object: {e}");
        }

        Ok(ApplyOutcome {
            resolution,
            recreated: true,
        })
    }

    /// Applies all queued changes, then sends every pending upload.
    ///
    /// Every object is processed even if one fails; the first error is
    /// returned after the rest of the frame was prepared.
    pub fn prepare_frame(&mut self) -> Result<FrameStats> {
        let mut stats = FrameStats::default();
        let mut first_error = None;

        let mut queued: Vec<ObjectId> = self
            .objects
            .iter()
            .filter(|(_, entry)| !entry.pending.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        queued.sort();

        for id in queued {
            match self.apply_changes(&id) {
                Ok(outcome) => {
                    stats.applied += 1;
                    stats.recreated += usize::from(outcome.recreated);
                }
                Err(e) => {
                    log::warn!("'{id}': failed to apply changes: {e}");
                    first_error.get_or_insert(e);
                }
            }
        }

        for (id, entry) in &mut self.objects {
            match entry.object.flush(&mut self.backend) {
                Ok(uploads) => stats.uploads += uploads,
                Err(e) => {
                    log::warn!("'{id}': flush failed: {e}");
                    first_error.get_or_insert(e);
                }
            }
        }

        first_error.map_or(Ok(stats), Err)
    }

    /// Removes an object and releases its resources.
    pub fn remove(&mut self, id: &ObjectId) -> Result<()> {
        let entry = self
            .objects
            .remove(id)
            .ok_or_else(|| VolscopeError::ObjectNotFound(id.to_string()))?;
        log::info!("removed {} object '{id}'", entry.kind);
        self.dispose_entry(entry)
    }

    /// Removes every object. All are disposed even if one fails.
    pub fn clear(&mut self) -> Result<()> {
        let mut first_error = None;
        let entries: Vec<_> = self.objects.drain().collect();
        for (id, entry) in entries {
            if let Err(e) = self.dispose_entry(entry) {
                log::warn!("'{id}': dispose failed: {e}");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn dispose_entry(&mut self, entry: SceneEntry) -> Result<()> {
        match self.registry.get(entry.kind) {
            Some(strategy) => strategy.dispose(entry.object, &mut self.backend),
            None => entry.object.dispose(&mut self.backend),
        }
    }

    pub fn get(&self, id: &ObjectId) -> Option<&dyn RenderObject> {
        self.objects.get(id).map(|entry| &*entry.object)
    }

    /// Downcasts an object to its concrete type.
    pub fn get_as<T: RenderObject>(&self, id: &ObjectId) -> Option<&T> {
        self.get(id)?.as_any().downcast_ref::<T>()
    }

    /// The descriptor the object currently reflects.
    pub fn descriptor(&self, id: &ObjectId) -> Option<&MultiVolumeDescriptor> {
        self.objects.get(id).map(|entry| &entry.descriptor)
    }

    /// Changes queued for the next frame.
    pub fn pending(&self, id: &ObjectId) -> Option<&ChangeSet> {
        self.objects.get(id).map(|entry| &entry.pending)
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &ObjectId> {
        self.objects.keys()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl<B: GpuBackend> Drop for Scene<B> {
    fn drop(&mut self) {
        if let Err(e) = self.clear() {
            log::warn!("scene teardown: {e}");
        }
    }
}
