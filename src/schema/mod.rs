//! dora.events.v1 input schema
//!
//! This module defines the input envelope for pull request, deployment and
//! incident events, plus the adapter that parses and validates it.

mod adapter;
mod raw_event;

pub use adapter::*;
pub use raw_event::*;
