//! Database layer for EveryNote

mod connection;
mod migrations;
mod repository;

pub use connection::{Database, DEFAULT_DATABASE_FILE};
pub use repository::{LibSqlNoteRepository, NoteRepository};
