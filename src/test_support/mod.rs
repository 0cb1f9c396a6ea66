//! Shared helpers for socket-bound unit tests.

pub(crate) mod matchers;
pub(crate) mod socket_guard;
