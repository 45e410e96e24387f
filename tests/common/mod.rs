//! Common test utilities for o365-audit-dl integration tests

#[allow(dead_code)]
pub mod fixtures;
#[allow(dead_code)]
pub mod tenant;

#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use tenant::*;
