//! Integration Tests
//!
//! Cross-crate tests organized by dimension:
//! - Backend: ephemeral vs file-backed, reopen behavior, config selection
//! - Sessions: the persistence operations end to end through the facade

#[path = "../common/mod.rs"]
mod common;

mod modes;
mod sessions;
