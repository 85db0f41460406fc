//! Injectable types and their identities
//!
//! A type takes part in resolution by implementing [`Injectable`], which
//! tells the container how to build an empty instance before its injected
//! fields are wired.

use crate::Result;
use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A type the container can construct and share as a singleton.
///
/// `construct` is the default constructor: it takes no arguments, because
/// dependencies are assigned to fields after construction. An error returned
/// here is handed back to the caller of [`Container::resolve`] unchanged.
///
/// Most types implement this through the [`injectable!`](crate::injectable)
/// macro, which delegates to `Default`.
///
/// # Examples
///
/// ```rust
/// use fieldwire::{DiError, Injectable, Result};
///
/// struct Pool {
///     size: usize,
/// }
///
/// impl Injectable for Pool {
///     fn construct() -> Result<Self> {
///         match std::env::var("POOL_SIZE").ok().map(|s| s.parse()) {
///             Some(Ok(size)) => Ok(Pool { size }),
///             Some(Err(_)) => Err(DiError::creation_failed::<Pool>("POOL_SIZE is not a number")),
///             None => Ok(Pool { size: 4 }),
///         }
///     }
/// }
/// ```
///
/// [`Container::resolve`]: crate::Container::resolve
pub trait Injectable: Send + Sync + Sized + 'static {
    /// Build an instance with no injected fields set
    fn construct() -> Result<Self>;

    /// Returns the type name for debugging
    #[inline]
    fn type_name_of() -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Identity of an injectable type.
///
/// Equality and hashing only look at the `TypeId`; the name is carried for
/// error messages and logs.
#[derive(Clone, Copy)]
pub struct ClassId {
    type_id: TypeId,
    type_name: &'static str,
}

impl ClassId {
    /// Identity of `T`
    #[inline]
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Last path segment of the type name, e.g. `Engine` for `app::car::Engine`
    pub fn short_name(&self) -> &'static str {
        let base = self.type_name.split('<').next().unwrap_or(self.type_name);
        let start = base.rfind("::").map(|i| i + 2).unwrap_or(0);
        &self.type_name[start..]
    }
}

impl PartialEq for ClassId {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ClassId {}

impl Hash for ClassId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClassId").field(&self.type_name).finish()
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Implement [`Injectable`] for one or more types.
///
/// The plain form uses `Default::default()` as the constructor. The
/// `Type => expr` form uses `expr`, which must evaluate to `Result<Type>`.
///
/// ```rust
/// use fieldwire::{injectable, Injectable};
///
/// #[derive(Default)]
/// struct Engine;
///
/// #[derive(Default)]
/// struct Wheel;
///
/// struct Clock(u64);
///
/// injectable!(Engine, Wheel);
/// injectable!(Clock => Ok(Clock(0)));
///
/// assert_eq!(Clock::construct().unwrap().0, 0);
/// ```
#[macro_export]
macro_rules! injectable {
    ($type:ty => $ctor:expr) => {
        impl $crate::Injectable for $type {
            fn construct() -> $crate::Result<Self> {
                $ctor
            }
        }
    };
    ($($type:ty),+ $(,)?) => {
        $(
            impl $crate::Injectable for $type {
                fn construct() -> $crate::Result<Self> {
                    Ok(<$type as ::core::default::Default>::default())
                }
            }
        )+
    };
}
