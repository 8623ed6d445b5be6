//! Bookkeeping for explicit GPU resource teardown.
//!
//! Every GPU handle the renderer creates is registered in a [`ResourceLedger`]
//! and released through it exactly once. Releasing consumes the owning value
//! (see [`GpuResource::destroy`]), so a released handle cannot be used again.

use std::collections::BTreeMap;

use crate::error::RenderError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Mesh,
    Texture,
    Program,
    ShadowTarget,
    Cubemap,
    DepthTarget,
    UniformBuffer,
}

/// Opaque handle into a [`ResourceLedger`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(u64);

#[derive(Debug)]
struct Entry {
    kind: ResourceKind,
    label: String,
    released: bool,
}

#[derive(Debug, Default)]
pub struct ResourceLedger {
    next: u64,
    entries: BTreeMap<ResourceId, Entry>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, kind: ResourceKind, label: impl Into<String>) -> ResourceId {
        let id = ResourceId(self.next);
        self.next += 1;
        let label = label.into();
        log::debug!("created {:?} `{}`", kind, label);
        self.entries.insert(
            id,
            Entry {
                kind,
                label,
                released: false,
            },
        );
        id
    }

    pub fn release(&mut self, id: ResourceId) -> Result<(), RenderError> {
        match self.entries.get_mut(&id) {
            Some(entry) if !entry.released => {
                entry.released = true;
                log::debug!("released {:?} `{}`", entry.kind, entry.label);
                Ok(())
            }
            Some(entry) => Err(RenderError::DoubleRelease {
                what: format!("{:?} `{}`", entry.kind, entry.label),
            }),
            None => Err(RenderError::DoubleRelease {
                what: format!("unknown resource {:?}", id),
            }),
        }
    }

    pub fn is_live(&self, id: ResourceId) -> bool {
        self.entries.get(&id).is_some_and(|entry| !entry.released)
    }

    pub fn created(&self) -> usize {
        self.entries.len()
    }

    pub fn released(&self) -> usize {
        self.entries.values().filter(|entry| entry.released).count()
    }

    /// Resources that were created but never released.
    pub fn outstanding(&self) -> Vec<(ResourceKind, &str)> {
        self.entries
            .values()
            .filter(|entry| !entry.released)
            .map(|entry| (entry.kind, entry.label.as_str()))
            .collect()
    }

    pub fn count(&self, kind: ResourceKind) -> usize {
        self.entries.values().filter(|entry| entry.kind == kind).count()
    }
}

/// A GPU-owning value that must be torn down through the ledger.
pub trait GpuResource {
    fn resource_id(&self) -> ResourceId;

    /// Frees the GPU memory and records the release.
    fn destroy(self, ledger: &mut ResourceLedger) -> Result<(), RenderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tracked_resource_is_released_once() {
        let mut ledger = ResourceLedger::new();
        let mesh = ledger.track(ResourceKind::Mesh, "cube.obj");
        let texture = ledger.track(ResourceKind::Texture, "wood.png");
        assert_eq!(ledger.outstanding().len(), 2);

        ledger.release(mesh).unwrap();
        assert!(!ledger.is_live(mesh));
        assert!(ledger.is_live(texture));
        assert_eq!(ledger.outstanding(), vec![(ResourceKind::Texture, "wood.png")]);

        ledger.release(texture).unwrap();
        assert!(ledger.outstanding().is_empty());
        assert_eq!(ledger.created(), ledger.released());
    }

    #[test]
    fn second_release_is_an_error() {
        let mut ledger = ResourceLedger::new();
        let program = ledger.track(ResourceKind::Program, "shadow");
        ledger.release(program).unwrap();
        let err = ledger.release(program).unwrap_err();
        assert!(matches!(err, RenderError::DoubleRelease { .. }));
        assert!(err.to_string().contains("shadow"));
    }

    #[test]
    fn ids_are_unique() {
        let mut ledger = ResourceLedger::new();
        let a = ledger.track(ResourceKind::UniformBuffer, "a");
        let b = ledger.track(ResourceKind::UniformBuffer, "a");
        assert_ne!(a, b);
        assert_eq!(ledger.count(ResourceKind::UniformBuffer), 2);
    }
}
