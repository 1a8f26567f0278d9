//! Integration test utilities for the gateway client
//!
//! This crate provides an in-memory transport that lets tests play the
//! server side of the gateway protocol, plus envelope fixtures.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
