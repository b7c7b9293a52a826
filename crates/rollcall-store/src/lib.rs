//! rollcall-store — SQLite-backed identity gallery and attendance table.
//!
//! Owns the single database handle for the process. Callers treat both
//! tables as append-mostly: identities are inserted once and removed only
//! by a bulk clear; attendance rows are inserted once and updated once.

pub mod db;

pub use db::{Store, StoreError};
