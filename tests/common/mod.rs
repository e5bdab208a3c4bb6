//! Shared test utilities for chatpick integration harnesses.
//!
//! Import everything you need via `mod common; use common::*;` at the top of
//! each harness file.

pub mod builders;
pub mod fixtures;
pub mod relay;

pub use builders::*;
pub use fixtures::*;
pub use relay::*;
