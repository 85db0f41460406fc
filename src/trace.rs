//! Call tracing wrapper
//!
//! Records a call's arguments before it runs and its result after, as
//! `tracing` events under the `fieldwire::trace` target.
//!
//! Only compiled with the `logging` feature (on by default).

use std::fmt::Debug;
use tracing::info;

/// Run `call` with `args`, logging both sides of the call.
///
/// The result is returned untouched.
///
/// ```rust
/// use fieldwire::trace::traced;
///
/// let sum = traced("add", (2, 3), |(a, b)| a + b);
/// assert_eq!(sum, 5);
/// ```
pub fn traced<A, R, F>(name: &str, args: A, call: F) -> R
where
    A: Debug,
    R: Debug,
    F: FnOnce(A) -> R,
{
    info!(target: "fieldwire::trace", call = name, args = ?args, "call started");

    let result = call(args);

    info!(target: "fieldwire::trace", call = name, result = ?result, "call returned");
    result
}
