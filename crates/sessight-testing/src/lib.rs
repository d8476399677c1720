//! Testing infrastructure for sessight integration tests.
//!
//! - `TestWorld`: isolated log root, data directory and allow-list
//! - `fixtures`: builders for Claude Code session logs

pub mod fixtures;
pub mod world;

pub use fixtures::SessionLog;
pub use world::TestWorld;
