//! Field validation guard
//!
//! Rules are declared per type and field, then checked against a value
//! before a guarded call runs. Validation never touches the container; it
//! only shares the error type and the declaration checks.

use crate::injection::check_field_name;
use crate::{DiError, Result};
use ahash::RandomState;
use dashmap::DashMap;
use regex::Regex;
use std::any::{Any, TypeId};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::debug;

/// Type-erased check over a value of the declaring type
type CheckFn = Box<dyn Fn(&dyn Any) -> bool + Send + Sync>;

struct Rule {
    field: &'static str,
    check: CheckFn,
}

/// Per-type field rules.
///
/// # Examples
///
/// ```rust
/// use fieldwire::{DiError, Validators};
///
/// struct SignUp {
///     email: String,
///     age: u32,
/// }
///
/// let rules = Validators::new();
/// rules.pattern::<SignUp, _>("email", |s| s.email.as_str(), r"^[^@\s]+@[^@\s]+$")?;
/// rules.predicate::<SignUp, u32, _, _>("age", |s| &s.age, |age| *age >= 18)?;
///
/// let ok = SignUp { email: "ann@example.com".into(), age: 30 };
/// assert_eq!(rules.guard(&ok, |s| s.age), Ok(30));
///
/// let young = SignUp { email: "bo@example.com".into(), age: 12 };
/// assert!(matches!(
///     rules.validate(&young),
///     Err(DiError::ValidationFailed { field: "age", .. })
/// ));
/// # Ok::<(), DiError>(())
/// ```
#[derive(Default)]
pub struct Validators {
    rules: DashMap<TypeId, Vec<Arc<Rule>>, RandomState>,
}

impl Validators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `check` to hold for the field `field` of `T`, read by `getter`
    pub fn predicate<T, V, G, P>(&self, field: &'static str, getter: G, check: P) -> Result<()>
    where
        T: 'static,
        V: ?Sized,
        G: Fn(&T) -> &V + Send + Sync + 'static,
        P: Fn(&V) -> bool + Send + Sync + 'static,
    {
        check_field_name::<T>(field)?;
        self.push::<T>(
            field,
            Box::new(move |value: &dyn Any| {
                value.downcast_ref::<T>().is_some_and(|v| check(getter(v)))
            }),
        );
        Ok(())
    }

    /// Require the string field `field` of `T` to match `pattern`.
    ///
    /// The match is unanchored, like [`Regex::is_match`]; use `^...$` to
    /// match the whole value.
    pub fn pattern<T, G>(&self, field: &'static str, getter: G, pattern: &str) -> Result<()>
    where
        T: 'static,
        G: Fn(&T) -> &str + Send + Sync + 'static,
    {
        check_field_name::<T>(field)?;
        let regex = Regex::new(pattern)
            .map_err(|err| DiError::invalid_declaration::<T>(field, err.to_string()))?;
        self.push::<T>(
            field,
            Box::new(move |value: &dyn Any| {
                value.downcast_ref::<T>().is_some_and(|v| regex.is_match(getter(v)))
            }),
        );
        Ok(())
    }

    fn push<T: 'static>(&self, field: &'static str, check: CheckFn) {
        #[cfg(feature = "logging")]
        debug!(
            target: "fieldwire",
            service = std::any::type_name::<T>(),
            field = field,
            "Declared validation rule"
        );

        self.rules
            .entry(TypeId::of::<T>())
            .or_default()
            .push(Arc::new(Rule { field, check }));
    }

    /// Check every rule declared for `T`, in declaration order.
    ///
    /// Types without rules always pass.
    pub fn validate<T: 'static>(&self, value: &T) -> Result<()> {
        let rules = self
            .rules
            .get(&TypeId::of::<T>())
            .map(|rules| rules.value().clone())
            .unwrap_or_default();

        for rule in rules {
            if !(rule.check)(value as &dyn Any) {
                #[cfg(feature = "logging")]
                debug!(
                    target: "fieldwire",
                    service = std::any::type_name::<T>(),
                    field = rule.field,
                    "Validation failed"
                );
                return Err(DiError::validation_failed::<T>(rule.field));
            }
        }
        Ok(())
    }

    /// Validate `value`, then run `call` with it.
    ///
    /// `call` does not run when validation fails.
    pub fn guard<T: 'static, R>(&self, value: &T, call: impl FnOnce(&T) -> R) -> Result<R> {
        self.validate(value)?;
        Ok(call(value))
    }

    /// Number of rules declared for `T`
    pub fn rule_count<T: 'static>(&self) -> usize {
        self.rules.get(&TypeId::of::<T>()).map_or(0, |rules| rules.len())
    }
}

impl std::fmt::Debug for Validators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validators")
            .field("types", &self.rules.len())
            .finish()
    }
}
