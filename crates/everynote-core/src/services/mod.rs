//! Client-facing services built on the repositories.

mod database;

pub use database::DatabaseService;
