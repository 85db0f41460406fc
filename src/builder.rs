//! Staged builder
//!
//! Collects field assignments and applies them to an instance in one step.

use crate::{Injectable, Result};

/// A staged assignment
type Stage<T> = Box<dyn FnOnce(&mut T)>;

/// Stages field assignments for `T` and applies them on [`build`](Self::build).
///
/// # Examples
///
/// ```rust
/// use fieldwire::Builder;
///
/// #[derive(Default)]
/// struct Server {
///     host: String,
///     port: u16,
/// }
///
/// let server = Builder::new(Server::default())
///     .set(|s, host| s.host = host, "localhost".to_string())
///     .set(|s, port| s.port = port, 8080)
///     .build();
///
/// assert_eq!(server.host, "localhost");
/// assert_eq!(server.port, 8080);
/// ```
pub struct Builder<T> {
    instance: T,
    staged: Vec<Stage<T>>,
}

impl<T: 'static> Builder<T> {
    /// Start from an existing instance
    pub fn new(instance: T) -> Self {
        Self {
            instance,
            staged: Vec::new(),
        }
    }

    /// Start from `T::construct()`
    pub fn from_injectable() -> Result<Self>
    where
        T: Injectable,
    {
        Ok(Self::new(T::construct()?))
    }

    /// Stage `setter(instance, value)`; nothing is applied until `build`
    pub fn set<V: 'static>(mut self, setter: fn(&mut T, V), value: V) -> Self {
        self.staged.push(Box::new(move |instance| setter(instance, value)));
        self
    }

    /// Number of staged assignments
    pub fn staged(&self) -> usize {
        self.staged.len()
    }

    /// Apply the staged assignments in order and return the instance
    pub fn build(self) -> T {
        let Self {
            mut instance,
            staged,
        } = self;
        for stage in staged {
            stage(&mut instance);
        }
        instance
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Builder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("instance", &self.instance)
            .field("staged", &self.staged.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DiError, injectable};

    #[derive(Debug, Default, PartialEq)]
    struct Profile {
        name: String,
        age: u32,
    }

    injectable!(Profile);

    #[test]
    fn test_nothing_applied_before_build() {
        let builder = Builder::new(Profile::default()).set(|p, age| p.age = age, 40);

        assert_eq!(builder.staged(), 1);
        assert_eq!(builder.instance.age, 0);
        assert_eq!(builder.build().age, 40);
    }

    #[test]
    fn test_later_stages_win() {
        let profile = Builder::<Profile>::from_injectable()
            .unwrap()
            .set(|p, name| p.name = name, "ann".to_string())
            .set(|p, name| p.name = name, "bo".to_string())
            .build();

        assert_eq!(
            profile,
            Profile {
                name: "bo".into(),
                age: 0
            }
        );
    }

    #[test]
    fn test_from_injectable_propagates_failure() {
        struct Locked;
        injectable!(Locked => Err(DiError::creation_failed::<Locked>("sealed")));

        assert!(Builder::<Locked>::from_injectable().is_err());
    }
}
