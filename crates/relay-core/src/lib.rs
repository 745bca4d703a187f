//! Shared seams between the Relay crates
//!
//! Holds the traits that cross crate boundaries: HTTP error mapping for
//! domain errors and the persistence capability adapters log usage through.

#![allow(clippy::must_use_candidate)]

mod dao;
mod error;

pub use dao::{Dao, DaoError, MemoryDao, UsageRecord};
pub use error::HttpError;
