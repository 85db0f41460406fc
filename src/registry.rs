//! Singleton registry
//!
//! Maps each known type to at most one constructed instance. The registry is
//! plain storage: it never constructs anything and never decides which
//! instance wins, except through [`Registry::publish`].

use crate::provider::ClassId;
use ahash::RandomState;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::any::{Any, TypeId};
use std::sync::Arc;

/// A type-erased, shared instance
pub type Instance = Arc<dyn Any + Send + Sync>;

/// One registry entry: a type that is known, and maybe already built
struct Slot {
    class: ClassId,
    instance: OnceCell<Instance>,
}

impl Slot {
    fn unset(class: ClassId) -> Self {
        Self {
            class,
            instance: OnceCell::new(),
        }
    }

    fn with(class: ClassId, instance: Option<Instance>) -> Self {
        let slot = Self::unset(class);
        if let Some(instance) = instance {
            // a fresh cell cannot already be set
            let _ = slot.instance.set(instance);
        }
        slot
    }
}

/// Thread-safe map from type identity to its singleton instance.
///
/// Three states are distinguishable for any type: absent (never
/// registered), registered but unset, and set.
pub struct Registry {
    slots: DashMap<TypeId, Slot, RandomState>,
}

impl Registry {
    /// Create an empty registry.
    ///
    /// Uses 8 shards; a container rarely holds more than a few dozen types.
    #[inline]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create with pre-allocated capacity.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        let shard_amount = if capacity <= 16 { 8 } else { 16 };
        Self {
            slots: DashMap::with_capacity_and_hasher_and_shard_amount(
                capacity,
                RandomState::new(),
                shard_amount,
            ),
        }
    }

    /// True iff the type was ever registered, with or without an instance
    #[inline]
    pub fn has(&self, class: &ClassId) -> bool {
        self.slots.contains_key(&class.type_id())
    }

    /// The stored instance, if any.
    ///
    /// `None` both for unset and for never-registered types; use
    /// [`has`](Self::has) to tell them apart.
    #[inline]
    pub fn get(&self, class: &ClassId) -> Option<Instance> {
        self.slots
            .get(&class.type_id())
            .and_then(|slot| slot.instance.get().cloned())
    }

    /// Store or overwrite the entry for `class`
    #[inline]
    pub fn set(&self, class: ClassId, instance: Option<Instance>) {
        self.slots
            .insert(class.type_id(), Slot::with(class, instance));
    }

    /// Register `class` with no instance unless it is already present.
    ///
    /// Returns true if the entry was created.
    pub fn mark(&self, class: ClassId) -> bool {
        let mut created = false;
        self.slots.entry(class.type_id()).or_insert_with(|| {
            created = true;
            Slot::unset(class)
        });
        created
    }

    /// Set the instance for `class` unless one is already set.
    ///
    /// Returns the instance stored after the call: `instance` if this call
    /// won, the earlier one otherwise.
    pub fn publish(&self, class: ClassId, instance: Instance) -> Instance {
        let slot = self
            .slots
            .entry(class.type_id())
            .or_insert_with(|| Slot::unset(class));
        Arc::clone(slot.instance.get_or_init(|| instance))
    }

    /// Get number of registered types
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of types that already have an instance
    pub fn resolved_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.instance.get().is_some())
            .count()
    }

    /// All registered type identities
    pub fn class_ids(&self) -> Vec<ClassId> {
        self.slots.iter().map(|slot| slot.class).collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("count", &self.len())
            .field("resolved", &self.resolved_count())
            .finish()
    }
}
