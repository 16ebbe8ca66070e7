//! Persistence layer for the dashboard server.
//!
//! SQLite-backed storage for speed-test measurements and the BTS antenna
//! registry. Handlers read an immutable snapshot per request; the engine
//! never touches a connection.

pub mod antennas;
pub mod db;
pub mod measurements;

pub use antennas::{insert_antenna, list_antennas};
pub use db::{init_database, Database};
pub use measurements::{insert_measurement, latest_measurement_at, list_measurements};
