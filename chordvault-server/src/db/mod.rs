//! Database access for chordvault-server
//!
//! Thin sqlx wrappers over the tables created by
//! `chordvault_common::db::init`. Errors propagate here; the tier
//! accessors in `services` decide what to swallow.

pub mod artists;
pub mod chord_sheets;
pub mod search_cache;
