//! # fieldwire - Field Injection Container for Rust
//!
//! A small dependency injection container: declare which fields of a type
//! receive which other type's singleton, then resolve a root type and get a
//! fully wired object graph.
//!
//! ## Features
//!
//! - 🧩 **Field injection** - typed setters, declared once at bootstrap
//! - 🏭 **Lazy singletons** - each type is built on first resolution, then shared
//! - 🔁 **Cycle detection** - circular graphs fail with the offending path
//! - 🧵 **Thread-safe** - concurrent resolutions agree on one instance per type
//! - 📊 **Observable** - optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use fieldwire::{injectable, Container};
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Logger;
//!
//! #[derive(Default)]
//! struct ServiceA {
//!     log: Option<Arc<Logger>>,
//! }
//!
//! #[derive(Default)]
//! struct ServiceB {
//!     log: Option<Arc<Logger>>,
//! }
//!
//! injectable!(Logger, ServiceA, ServiceB);
//!
//! let container = Container::new();
//! container.injectable::<Logger>()?;
//! container.inject::<ServiceA, Logger, _>("log", |s, log| s.log = Some(log))?;
//! container.inject::<ServiceB, Logger, _>("log", |s, log| s.log = Some(log))?;
//!
//! let a = container.resolve::<ServiceA>()?;
//! let b = container.resolve::<ServiceB>()?;
//!
//! // Both services share the one Logger
//! assert!(Arc::ptr_eq(a.log.as_ref().unwrap(), b.log.as_ref().unwrap()));
//! # Ok::<(), fieldwire::DiError>(())
//! ```
//!
//! ## Cycles
//!
//! A type is registered only after all of its fields are wired, so a graph
//! that leads back to a type still being wired could never finish. The
//! resolver tracks the types in progress and returns
//! [`DiError::CircularDependency`] instead of recursing forever:
//!
//! ```rust
//! use fieldwire::{injectable, Container, DiError};
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct X { y: Option<Arc<Y>> }
//! #[derive(Default)]
//! struct Y { x: Option<Arc<X>> }
//!
//! injectable!(X, Y);
//!
//! let container = Container::new();
//! container.inject::<X, Y, _>("y", |x, y| x.y = Some(y))?;
//! container.inject::<Y, X, _>("x", |y, x| y.x = Some(x))?;
//!
//! let result = container.resolve::<X>();
//! assert!(matches!(result, Err(DiError::CircularDependency { .. })));
//! # Ok::<(), DiError>(())
//! ```

mod builder;
mod container;
mod error;
mod injection;
#[cfg(feature = "logging")]
pub mod logging;
mod provider;
mod registry;
#[cfg(feature = "logging")]
pub mod trace;
mod validate;

pub use builder::*;
pub use container::*;
pub use error::*;
pub use injection::InjectionDescriptor;
pub use provider::*;
pub use registry::*;
pub use validate::*;

// Re-export for convenience
pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Builder, ClassId, Container, Declaration, DiError, Injectable, Registry, Result,
        Validators, injectable,
    };
    pub use std::sync::Arc;
}
