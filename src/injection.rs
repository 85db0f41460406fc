//! Injection metadata
//!
//! Each declaring type owns an ordered, append-only list of descriptors. A
//! descriptor names a field, the type whose singleton goes into it, and how
//! to get that singleton there.
//!
//! ## Type erasure
//!
//! Descriptors for every declaring type live in one table, so the typed
//! parts are erased at declaration time:
//! - `resolve` is the monomorphized resolver of the dependency type
//! - `assign` downcasts both sides and calls the user's typed setter

use crate::container::{Container, ResolutionPath};
use crate::provider::{ClassId, Injectable};
use crate::registry::Instance;
use crate::{DiError, Result};
use ahash::RandomState;
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::sync::Arc;

/// Resolves a dependency into its shared instance
pub(crate) type ResolveFn = fn(&Container, &mut ResolutionPath) -> Result<Instance>;

/// Assigns a resolved dependency into a field of the declaring type
type AssignFn = Box<dyn Fn(&mut dyn Any, Instance) -> Result<()> + Send + Sync>;

/// "Field `field_name` receives the singleton of `dependency`"
pub struct InjectionDescriptor {
    field_name: &'static str,
    owner: ClassId,
    dependency: ClassId,
    resolve: ResolveFn,
    assign: AssignFn,
}

impl InjectionDescriptor {
    /// Describe field `field_name` of `T`, filled by `setter` with `D`'s singleton
    pub(crate) fn new<T, D, F>(field_name: &'static str, setter: F) -> Result<Self>
    where
        T: Injectable,
        D: Injectable,
        F: Fn(&mut T, Arc<D>) + Send + Sync + 'static,
    {
        check_field_name::<T>(field_name)?;

        Ok(Self {
            field_name,
            owner: ClassId::of::<T>(),
            dependency: ClassId::of::<D>(),
            resolve: Container::resolve_erased::<D>,
            assign: Box::new(move |target: &mut dyn Any, dependency: Instance| {
                let target = target.downcast_mut::<T>().ok_or_else(|| {
                    DiError::Internal(format!(
                        "injection target for `{field_name}` is not {}",
                        std::any::type_name::<T>()
                    ))
                })?;
                let dependency = dependency.downcast::<D>().map_err(|_| {
                    DiError::Internal(format!(
                        "instance for `{field_name}` is not {}",
                        std::any::type_name::<D>()
                    ))
                })?;
                setter(target, dependency);
                Ok(())
            }),
        })
    }

    #[inline]
    pub fn field_name(&self) -> &'static str {
        self.field_name
    }

    /// The declaring type
    #[inline]
    pub fn owner(&self) -> ClassId {
        self.owner
    }

    /// The type whose singleton fills the field
    #[inline]
    pub fn dependency(&self) -> ClassId {
        self.dependency
    }

    /// Resolve the dependency and assign it into `target`
    pub(crate) fn wire(
        &self,
        container: &Container,
        path: &mut ResolutionPath,
        target: &mut dyn Any,
    ) -> Result<()> {
        let dependency = (self.resolve)(container, path)?;
        (self.assign)(target, dependency)
    }
}

impl std::fmt::Debug for InjectionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InjectionDescriptor")
            .field("field_name", &self.field_name)
            .field("owner", &self.owner)
            .field("dependency", &self.dependency)
            .finish()
    }
}

/// Per-type descriptor lists, keyed by the declaring type
pub(crate) struct InjectionTable {
    entries: DashMap<TypeId, Vec<Arc<InjectionDescriptor>>, RandomState>,
}

impl InjectionTable {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: DashMap::with_capacity_and_hasher_and_shard_amount(
                capacity,
                RandomState::new(),
                8,
            ),
        }
    }

    /// Append to the owner's list, creating it on first use.
    ///
    /// Returns the list length after the append.
    pub fn append(&self, descriptor: InjectionDescriptor) -> Result<usize> {
        let owner = descriptor.owner;
        let mut list = self.entries.entry(owner.type_id()).or_default();

        if list.iter().any(|d| d.field_name == descriptor.field_name) {
            return Err(DiError::InvalidDeclaration {
                type_name: owner.type_name(),
                field: descriptor.field_name.to_string(),
                reason: "field is already injected".into(),
            });
        }

        list.push(Arc::new(descriptor));
        Ok(list.len())
    }

    /// Copy of the owner's list; empty if nothing was declared.
    ///
    /// The copy lets resolution recurse without holding a shard lock.
    pub fn snapshot(&self, owner: &TypeId) -> Vec<Arc<InjectionDescriptor>> {
        self.entries
            .get(owner)
            .map(|list| list.value().clone())
            .unwrap_or_default()
    }

    pub fn field_names(&self, owner: &TypeId) -> Vec<&'static str> {
        self.entries
            .get(owner)
            .map(|list| list.iter().map(|d| d.field_name).collect())
            .unwrap_or_default()
    }

    /// Number of types with at least one declaration
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Reject names that cannot be a Rust field of `T`
pub(crate) fn check_field_name<T: 'static>(field: &str) -> Result<()> {
    let reason = if field.is_empty() {
        "field name is empty"
    } else if field == "_" {
        "`_` is not a field name"
    } else if !field.starts_with(|c: char| c == '_' || c.is_alphabetic()) {
        "field name must start with a letter or `_`"
    } else if !field.chars().all(|c| c == '_' || c.is_alphanumeric()) {
        "field name must be a Rust identifier"
    } else {
        return Ok(());
    };
    Err(DiError::invalid_declaration::<T>(field, reason))
}
