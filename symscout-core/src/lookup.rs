//! Symbol lookup against the Yahoo Finance lookup endpoint.
//!
//! One keyed descriptor per query string; each response page's documents are
//! flattened into [`SymbolRow`]s tagged with the originating query. Bulk
//! lookups run the query universe in fixed-size chunks so a single run never
//! holds tens of thousands of descriptors at once.

use crate::breaker::RequestBreaker;
use crate::error::ScoutError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use symscout_requests::{
    BatchProgress, BatchSpec, Params, Payload, RequestClient, RequestError, ResponseParser,
    ResultCollection,
};
use tracing::{info, warn};

pub const LOOKUP_URL: &str = "https://query1.finance.yahoo.com/v1/finance/lookup";

/// Asset types the endpoint understands.
pub const ASSET_TYPES: [&str; 7] = [
    "equity",
    "mutualfund",
    "etf",
    "index",
    "future",
    "currency",
    "cryptocurrency",
];

/// Queries per orchestrated run.
const LOOKUP_CHUNK: usize = 500;

/// Split a comma-separated type list and reject unknown entries.
pub fn parse_types(list: &str) -> Result<Vec<String>, ScoutError> {
    let mut types = Vec::new();
    for raw in list.split(',') {
        let t = raw.trim().to_lowercase();
        if t.is_empty() {
            continue;
        }
        if !ASSET_TYPES.contains(&t.as_str()) {
            return Err(ScoutError::UnknownAssetType(t));
        }
        types.push(t);
    }
    if types.is_empty() {
        return Err(ScoutError::UnknownAssetType(list.to_string()));
    }
    Ok(types)
}

/// One symbol search hit, tagged with the query that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolRow {
    pub symbol: String,
    pub name: Option<String>,
    pub exchange: Option<String>,
    /// Upstream `quoteType`.
    pub asset_type: Option<String>,
    /// Upstream `industryName`.
    pub industry: Option<String>,
    pub query: String,
    /// Set by the validation pass; `None` until it runs.
    pub valid: Option<bool>,
}

/// Lookup endpoint response shape.
#[derive(Debug, Deserialize)]
struct LookupResponse {
    finance: LookupFinance,
}

#[derive(Debug, Deserialize)]
struct LookupFinance {
    result: Option<Vec<LookupPage>>,
}

#[derive(Debug, Deserialize)]
struct LookupPage {
    #[serde(default)]
    documents: Vec<LookupDocument>,
}

#[derive(Debug, Deserialize)]
struct LookupDocument {
    symbol: String,
    #[serde(rename = "shortName")]
    short_name: Option<String>,
    exchange: Option<String>,
    #[serde(rename = "quoteType")]
    quote_type: Option<String>,
    #[serde(rename = "industryName")]
    industry_name: Option<String>,
}

/// Flattens a lookup response page into rows tagged with the query key.
struct LookupParser;

impl LookupParser {
    fn rows(query: &str, payload: Payload) -> Result<Vec<SymbolRow>, RequestError> {
        let value = payload.into_json()?;
        let response: LookupResponse = serde_json::from_value(value)
            .map_err(|e| RequestError::Parse(format!("lookup response: {e}")))?;
        let documents = response
            .finance
            .result
            .unwrap_or_default()
            .into_iter()
            .flat_map(|page| page.documents);
        Ok(documents
            .map(|doc| SymbolRow {
                symbol: doc.symbol,
                name: doc.short_name,
                exchange: doc.exchange,
                asset_type: doc.quote_type,
                industry: doc.industry_name,
                query: query.to_string(),
                valid: None,
            })
            .collect())
    }
}

impl ResponseParser for LookupParser {
    type Output = Vec<SymbolRow>;

    fn parse(&self, payload: Payload) -> Result<Vec<SymbolRow>, RequestError> {
        Self::rows("", payload)
    }

    fn parse_keyed(&self, key: &str, payload: Payload) -> Result<Vec<SymbolRow>, RequestError> {
        Self::rows(key, payload)
    }
}

/// The symbol lookup service.
pub struct SymbolLookup {
    client: RequestClient,
    breaker: Arc<RequestBreaker>,
    base_url: String,
    chunk_size: usize,
}

impl SymbolLookup {
    pub fn new(client: RequestClient) -> Self {
        Self {
            client,
            breaker: Arc::new(RequestBreaker::default()),
            base_url: LOOKUP_URL.to_string(),
            chunk_size: LOOKUP_CHUNK,
        }
    }

    /// Point the service at a different endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Share a breaker across services hitting the same host.
    pub fn with_breaker(mut self, breaker: Arc<RequestBreaker>) -> Self {
        self.breaker = breaker;
        self
    }

    /// Queries per orchestrated run.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn breaker(&self) -> Arc<RequestBreaker> {
        Arc::clone(&self.breaker)
    }

    /// Search the endpoint once per query. Per-item failures are logged and
    /// skipped; the run still completes and returns every flattened hit.
    pub async fn search(
        &self,
        queries: &[String],
        types: &[String],
        progress: &dyn BatchProgress,
    ) -> Result<Vec<SymbolRow>, ScoutError> {
        self.breaker.check()?;
        if queries.is_empty() {
            return Ok(Vec::new());
        }

        let type_param = types.join(",");
        let params: Vec<Params> = queries
            .iter()
            .map(|query| {
                let mut p = Params::new();
                p.insert("formatted".into(), "false".into());
                p.insert("query".into(), query.clone());
                p.insert("type".into(), type_param.clone());
                p.insert("count".into(), "10000".into());
                p.insert("start".into(), "0".into());
                p
            })
            .collect();

        let batch = BatchSpec::get(self.base_url.clone())
            .params(params)
            .keys(queries.to_vec())
            .build()
            .map_err(ScoutError::Request)?;

        let results = self
            .client
            .run_with(batch, Arc::new(LookupParser), progress)
            .await;

        let mut rows = Vec::new();
        match results {
            ResultCollection::Keyed(map) => {
                for (query, item) in map {
                    match item {
                        Ok(page_rows) => {
                            self.breaker.observe(None, true);
                            rows.extend(page_rows);
                        }
                        Err(failure) => {
                            self.breaker.observe(failure.error.status(), false);
                            warn!(query, error = %failure.error, "lookup query failed");
                        }
                    }
                }
            }
            // every descriptor carries its query as key
            other => {
                return Err(ScoutError::ResponseShape(format!(
                    "expected keyed lookup results, got {} items unkeyed",
                    other.len()
                )));
            }
        }
        Ok(rows)
    }

    /// Probe every alphabet combination of length 1..=`max_len`, running
    /// fixed-size chunks so failures stay contained and memory stays flat.
    ///
    /// A breaker trip ends the run early but keeps the rows already
    /// collected, so partial results can still be validated and saved.
    pub async fn lookup(
        &self,
        max_len: usize,
        types: &[String],
        progress: &dyn BatchProgress,
    ) -> Result<Vec<SymbolRow>, ScoutError> {
        let queries = crate::combinations::combinations_up_to(max_len);
        let mut rows = Vec::new();
        for chunk in queries.chunks(self.chunk_size) {
            let (first, last) = (chunk.first(), chunk.last());
            info!(
                from = first.map(String::as_str).unwrap_or(""),
                to = last.map(String::as_str).unwrap_or(""),
                types = types.join(","),
                "searching query chunk"
            );
            let chunk_rows = match self.search(chunk, types, progress).await {
                Ok(chunk_rows) => chunk_rows,
                Err(ScoutError::BreakerOpen { remaining_secs }) => {
                    warn!(
                        remaining_secs,
                        collected = rows.len(),
                        "provider blocked requests, stopping with partial results"
                    );
                    break;
                }
                Err(err) => return Err(err),
            };
            info!(hits = chunk_rows.len(), "chunk complete");
            rows.extend(chunk_rows);
        }
        Ok(rows)
    }
}
