//! SQLite storage for the node key registry
//!
//! Provides a WAL-mode database with versioned migrations and a
//! [`SqliteGateway`] implementing [`nodekeys_core::PersistenceGateway`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod database;
pub mod error;
pub mod gateway;
pub mod migrations;
pub mod models;
pub mod repository;

pub use database::Database;
pub use error::{Error, Result};
pub use gateway::SqliteGateway;
pub use models::*;
pub use repository::Repository;
