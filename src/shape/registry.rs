#![forbid(unsafe_code)]

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::{GraphShape, ShapeDescriptor};
use crate::error::MetadataValidationError;

type Slot<T> = OnceLock<Result<Arc<ShapeDescriptor<T>>, MetadataValidationError>>;

/// Cache of validated shape descriptors, keyed by type.
///
/// Each type's declaration is validated at most once per registry, even when several
/// threads ask for it concurrently; the outcome (descriptor or error) is kept for the
/// registry's lifetime and shared by every later lookup.
#[derive(Default)]
pub struct ShapeRegistry {
    slots: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
    metrics: RegistryMetrics,
}

#[derive(Default)]
struct RegistryMetrics {
    lookups: AtomicU64,
    builds: AtomicU64,
    rejections: AtomicU64,
}

/// Point-in-time copy of registry counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegistryMetricsSnapshot {
    /// Descriptor lookups served.
    pub lookups: u64,
    /// Declarations validated.
    pub builds: u64,
    /// Declarations that failed validation.
    pub rejections: u64,
}

impl ShapeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `T`'s descriptor, validating its declaration on first use.
    pub fn descriptor<T: GraphShape>(
        &self,
    ) -> Result<Arc<ShapeDescriptor<T>>, MetadataValidationError> {
        self.metrics.lookups.fetch_add(1, Ordering::Relaxed);
        let slot = self.slot::<T>();
        slot.get_or_init(|| {
            self.metrics.builds.fetch_add(1, Ordering::Relaxed);
            match ShapeDescriptor::<T>::build() {
                Ok(descriptor) => {
                    debug!(
                        type_name = descriptor.type_name(),
                        kind = descriptor.kind().as_str(),
                        "shape.registry.built"
                    );
                    Ok(Arc::new(descriptor))
                }
                Err(err) => {
                    self.metrics.rejections.fetch_add(1, Ordering::Relaxed);
                    warn!(error = %err, "shape.registry.rejected");
                    Err(err)
                }
            }
        })
        .clone()
    }

    /// Number of types with a cached outcome.
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// True when no type has been looked up yet.
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    /// Snapshot of the registry counters.
    pub fn metrics_snapshot(&self) -> RegistryMetricsSnapshot {
        RegistryMetricsSnapshot {
            lookups: self.metrics.lookups.load(Ordering::Relaxed),
            builds: self.metrics.builds.load(Ordering::Relaxed),
            rejections: self.metrics.rejections.load(Ordering::Relaxed),
        }
    }

    fn slot<T: GraphShape>(&self) -> Arc<Slot<T>> {
        let key = TypeId::of::<T>();
        if let Some(existing) = self.slots.read().get(&key) {
            if let Ok(slot) = Arc::clone(existing).downcast::<Slot<T>>() {
                return slot;
            }
        }
        let mut slots = self.slots.write();
        let entry = slots
            .entry(key)
            .or_insert_with(|| Arc::new(Slot::<T>::new()) as Arc<dyn Any + Send + Sync>);
        // Entries are keyed by `TypeId::of::<T>()`, so the downcast cannot miss.
        Arc::clone(entry)
            .downcast::<Slot<T>>()
            .unwrap_or_else(|_| Arc::new(Slot::<T>::new()))
    }
}
