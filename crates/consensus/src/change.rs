//! Ready-made change functions
//!
//! A change function receives the key and its current value (empty bytes
//! when nothing was accepted yet) and returns the value to accept. It runs at
//! most once per round, after the prepare phase reached a quorum.

use std::convert::Infallible;

use bytes::Bytes;

/// Keeps the current value. Running a round with it is a linearizable read.
pub fn read_only() -> impl FnOnce(&[u8], Bytes) -> Result<Bytes, Infallible> + Send {
    |_: &[u8], current: Bytes| Ok(current)
}

/// Replaces the current value with `value`.
pub fn set(
    value: impl Into<Bytes>,
) -> impl FnOnce(&[u8], Bytes) -> Result<Bytes, Infallible> + Send {
    let value = value.into();
    move |_: &[u8], _: Bytes| Ok(value)
}
