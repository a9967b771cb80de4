//! Result table assembly: dedup, filtering, validation joins, frame export.

use crate::error::ScoutError;
use crate::lookup::SymbolRow;
use polars::prelude::*;
use std::collections::{HashMap, HashSet};

/// Accumulated symbol rows, deduplicated on (symbol, exchange).
///
/// The first occurrence of a pair wins; later duplicates from overlapping
/// queries are dropped on insert.
#[derive(Debug, Default)]
pub struct SymbolTable {
    rows: Vec<SymbolRow>,
    seen: HashSet<(String, String)>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert rows, skipping (symbol, exchange) pairs already present.
    pub fn extend(&mut self, rows: impl IntoIterator<Item = SymbolRow>) {
        for row in rows {
            let pair = (
                row.symbol.clone(),
                row.exchange.clone().unwrap_or_default(),
            );
            if self.seen.insert(pair) {
                self.rows.push(row);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[SymbolRow] {
        &self.rows
    }

    /// Distinct symbols, in table order.
    pub fn symbols(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .filter(|row| seen.insert(row.symbol.as_str()))
            .map(|row| row.symbol.clone())
            .collect()
    }

    /// Drop rows with a missing or blank name.
    pub fn drop_empty_names(&mut self) {
        self.rows
            .retain(|row| row.name.as_deref().is_some_and(|name| !name.trim().is_empty()));
    }

    /// Mark each row's validity from the validation map; rows whose symbol
    /// the map does not cover stay unmarked.
    pub fn apply_validation(&mut self, flags: &HashMap<String, bool>) {
        for row in &mut self.rows {
            if let Some(flag) = flags.get(&row.symbol) {
                row.valid = Some(*flag);
            }
        }
    }

    /// Export to a dataframe with columns symbol, name, exchange, type,
    /// industry, query, and valid once the validation pass has run.
    pub fn to_frame(&self) -> Result<DataFrame, ScoutError> {
        rows_to_frame(&self.rows)
    }
}

/// Build the canonical frame for a row slice.
pub fn rows_to_frame(rows: &[SymbolRow]) -> Result<DataFrame, ScoutError> {
    let symbols: Vec<&str> = rows.iter().map(|r| r.symbol.as_str()).collect();
    let names: Vec<Option<&str>> = rows.iter().map(|r| r.name.as_deref()).collect();
    let exchanges: Vec<Option<&str>> = rows.iter().map(|r| r.exchange.as_deref()).collect();
    let types: Vec<Option<&str>> = rows.iter().map(|r| r.asset_type.as_deref()).collect();
    let industries: Vec<Option<&str>> = rows.iter().map(|r| r.industry.as_deref()).collect();
    let queries: Vec<&str> = rows.iter().map(|r| r.query.as_str()).collect();

    let mut columns = vec![
        Column::new("symbol".into(), symbols),
        Column::new("name".into(), names),
        Column::new("exchange".into(), exchanges),
        Column::new("type".into(), types),
        Column::new("industry".into(), industries),
        Column::new("query".into(), queries),
    ];
    if rows.iter().any(|r| r.valid.is_some()) {
        let valid: Vec<Option<bool>> = rows.iter().map(|r| r.valid).collect();
        columns.push(Column::new("valid".into(), valid));
    }

    DataFrame::new(columns).map_err(|e| ScoutError::Frame(format!("frame creation: {e}")))
}
