//! symscout-core — bulk symbol collection against the Yahoo Finance lookup API.
//!
//! This crate contains the domain layer on top of the request engine:
//! - Query combination generation over the lookup alphabet
//! - The symbol lookup service (search, chunked bulk lookup)
//! - The symbol validation pass
//! - Result table assembly and deduplication
//! - Persistence sinks (partitioned parquet dataset, csv tree, sqlite)
//! - A circuit breaker guarding the vendor host

pub mod breaker;
pub mod combinations;
pub mod error;
pub mod lookup;
pub mod sink;
pub mod table;
pub mod validate;

pub use breaker::RequestBreaker;
pub use combinations::{combinations, combinations_up_to, ALPHABET};
pub use error::ScoutError;
pub use lookup::{parse_types, SymbolLookup, SymbolRow, ASSET_TYPES, LOOKUP_URL};
pub use sink::{save, OutputFormat};
pub use table::SymbolTable;
pub use validate::{SymbolValidator, VALIDATE_URL};
