//! Persistence sinks for the symbol table.
//!
//! Parquet and csv write a Hive-style dataset partitioned by asset type then
//! exchange (`type=X/exchange=Y/data_<date>_part-0.<ext>`); the partition
//! columns live in the path, not the files. Sqlite writes a single `symbols`
//! table, replaced on rewrite. File writes go to a `.tmp` sibling first and
//! rename into place.

use crate::error::ScoutError;
use crate::lookup::SymbolRow;
use crate::table::SymbolTable;
use polars::prelude::*;
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Parquet,
    Csv,
    Sqlite,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Parquet => "parquet",
            OutputFormat::Csv => "csv",
            OutputFormat::Sqlite => "sqlite",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ScoutError;

    fn from_str(s: &str) -> Result<Self, ScoutError> {
        match s.to_lowercase().as_str() {
            "parquet" => Ok(OutputFormat::Parquet),
            "csv" => Ok(OutputFormat::Csv),
            "sqlite" | "sqlite3" | "sql" => Ok(OutputFormat::Sqlite),
            other => Err(ScoutError::UnknownFormat(other.to_string())),
        }
    }
}

/// Write the table under `path` in the requested format.
pub fn save(table: &SymbolTable, path: &Path, format: OutputFormat) -> Result<(), ScoutError> {
    info!(rows = table.len(), format = format.extension(), path = %path.display(), "saving symbols");
    fs::create_dir_all(path)
        .map_err(|e| ScoutError::Persistence(format!("create output dir: {e}")))?;
    match format {
        OutputFormat::Parquet | OutputFormat::Csv => save_dataset(table, path, format),
        OutputFormat::Sqlite => save_sqlite(table, path),
    }
}

/// Hive-partitioned dataset: one file per (type, exchange) pair.
fn save_dataset(table: &SymbolTable, path: &Path, format: OutputFormat) -> Result<(), ScoutError> {
    let mut partitions: BTreeMap<(String, String), Vec<&SymbolRow>> = BTreeMap::new();
    for row in table.rows() {
        let key = (
            partition_value(row.asset_type.as_deref()),
            partition_value(row.exchange.as_deref()),
        );
        partitions.entry(key).or_default().push(row);
    }

    let date = chrono::Local::now().date_naive().format("%Y-%m-%d");
    let basename = format!("data_{date}_part-0.{}", format.extension());

    for ((asset_type, exchange), rows) in partitions {
        let dir = path
            .join(format!("type={asset_type}"))
            .join(format!("exchange={exchange}"));
        fs::create_dir_all(&dir)
            .map_err(|e| ScoutError::Persistence(format!("create partition dir: {e}")))?;

        let mut df = partition_frame(&rows)?;
        let target = dir.join(&basename);
        let tmp = dir.join(format!("{basename}.tmp"));

        let file = fs::File::create(&tmp)
            .map_err(|e| ScoutError::Persistence(format!("create file: {e}")))?;
        let write_result = match format {
            OutputFormat::Parquet => ParquetWriter::new(file)
                .finish(&mut df)
                .map(|_| ())
                .map_err(|e| ScoutError::Persistence(format!("write parquet: {e}"))),
            OutputFormat::Csv => CsvWriter::new(file)
                .finish(&mut df)
                .map_err(|e| ScoutError::Persistence(format!("write csv: {e}"))),
            OutputFormat::Sqlite => unreachable!("sqlite is not a dataset format"),
        };
        if let Err(err) = write_result {
            let _ = fs::remove_file(&tmp);
            return Err(err);
        }

        fs::rename(&tmp, &target).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            ScoutError::Persistence(format!("atomic rename failed: {e}"))
        })?;
    }
    Ok(())
}

/// Replace the `symbols` table in `<path>/symbols.sqlite`.
fn save_sqlite(table: &SymbolTable, path: &Path) -> Result<(), ScoutError> {
    let mut conn = Connection::open(path.join("symbols.sqlite"))
        .map_err(|e| ScoutError::Persistence(format!("open sqlite: {e}")))?;
    conn.execute_batch(
        "DROP TABLE IF EXISTS symbols;
         CREATE TABLE symbols (
             symbol TEXT NOT NULL,
             name TEXT,
             exchange TEXT,
             type TEXT,
             industry TEXT,
             query TEXT NOT NULL,
             valid INTEGER
         );",
    )
    .map_err(|e| ScoutError::Persistence(format!("create table: {e}")))?;

    let tx = conn
        .transaction()
        .map_err(|e| ScoutError::Persistence(format!("begin transaction: {e}")))?;
    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO symbols (symbol, name, exchange, type, industry, query, valid)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .map_err(|e| ScoutError::Persistence(format!("prepare insert: {e}")))?;
        for row in table.rows() {
            stmt.execute(rusqlite::params![
                row.symbol,
                row.name,
                row.exchange,
                row.asset_type,
                row.industry,
                row.query,
                row.valid,
            ])
            .map_err(|e| ScoutError::Persistence(format!("insert row: {e}")))?;
        }
    }
    tx.commit()
        .map_err(|e| ScoutError::Persistence(format!("commit: {e}")))?;
    Ok(())
}

/// Missing or path-hostile partition values collapse to a safe directory name.
fn partition_value(value: Option<&str>) -> String {
    let value = value.unwrap_or("").trim();
    if value.is_empty() {
        return "unknown".to_string();
    }
    value
        .chars()
        .map(|c| if c == '/' || c == '\\' || c == '=' { '_' } else { c })
        .collect()
}

/// Frame for one partition: the partition columns live in the path.
fn partition_frame(rows: &[&SymbolRow]) -> Result<DataFrame, ScoutError> {
    let symbols: Vec<&str> = rows.iter().map(|r| r.symbol.as_str()).collect();
    let names: Vec<Option<&str>> = rows.iter().map(|r| r.name.as_deref()).collect();
    let industries: Vec<Option<&str>> = rows.iter().map(|r| r.industry.as_deref()).collect();
    let queries: Vec<&str> = rows.iter().map(|r| r.query.as_str()).collect();

    let mut columns = vec![
        Column::new("symbol".into(), symbols),
        Column::new("name".into(), names),
        Column::new("industry".into(), industries),
        Column::new("query".into(), queries),
    ];
    if rows.iter().any(|r| r.valid.is_some()) {
        let valid: Vec<Option<bool>> = rows.iter().map(|r| r.valid).collect();
        columns.push(Column::new("valid".into(), valid));
    }
    DataFrame::new(columns).map_err(|e| ScoutError::Frame(format!("partition frame: {e}")))
}
