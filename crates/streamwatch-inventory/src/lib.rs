//! Streamwatch inventory: where the stream list comes from
//!
//! This crate owns the `Stream` record and every way of loading the list of
//! streams a health-check cycle should probe.
//!
//! ## Key Components
//!
//! - `InventoryProvider`: async source of the per-cycle stream list
//! - `PostgresInventory`: `cameras` table, configured from `POSTGRES_*` env vars
//! - `JsonFileInventory`: JSON array on disk
//! - `fakes`: in-memory providers for tests

mod error;
pub mod fakes;
mod json_file;
mod postgres;
pub mod provider;
mod schema;

pub use error::InventoryError;
pub use json_file::JsonFileInventory;
pub use postgres::{validate_table_name, PgConfig, PostgresInventory, DEFAULT_TABLE};
pub use provider::{InventoryProvider, InventoryResult};
pub use schema::Stream;
