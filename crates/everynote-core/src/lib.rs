//! everynote-core - Core library for EveryNote
//!
//! This crate contains the note models, the local note store, and the
//! session store shared by EveryNote front ends.

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use error::{Error, Result};
pub use models::{Note, NoteId, User};
