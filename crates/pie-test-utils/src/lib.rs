//! Test doubles for the engine side of the IPC transport, and tempdir
//! cache-layout fixtures shared across the workspace's integration tests.

pub mod cache_layout;
pub mod fake_engine;

pub use cache_layout::CacheLayout;
pub use fake_engine::FakeEngine;
