#![allow(dead_code)]

pub mod fake_session;
pub mod matchers;
pub mod socket_guard;
