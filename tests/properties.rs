//! Property tests for archive-relay.
//!
//! Properties use randomized input generation to explore edge cases and
//! protect invariants like "never panics" and "patching is idempotent".
//!
//! Run with: `cargo test --test properties`

#[path = "properties/document.rs"]
mod document;

#[path = "properties/patcher.rs"]
mod patcher;

#[path = "properties/archive.rs"]
mod archive;
