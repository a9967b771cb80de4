//! Symbol validation against the Yahoo Finance quote validation endpoint.
//!
//! One request covers up to 750 symbols; the response maps each symbol to a
//! boolean. Failed chunks are logged and skipped, leaving their symbols
//! unmarked.

use crate::breaker::RequestBreaker;
use crate::error::ScoutError;
use std::collections::HashMap;
use std::sync::Arc;
use symscout_requests::{
    BatchProgress, BatchSpec, Params, Payload, RequestClient, RequestError, ResponseParser,
};
use tracing::{info, warn};

pub const VALIDATE_URL: &str = "https://query1.finance.yahoo.com/v6/finance/quote/validate";

/// Symbols per validation request.
const VALIDATE_CHUNK: usize = 750;

/// Parses `symbolsValidation.result[0]` into a symbol→bool map.
struct ValidationParser;

impl ResponseParser for ValidationParser {
    type Output = HashMap<String, bool>;

    fn parse(&self, payload: Payload) -> Result<HashMap<String, bool>, RequestError> {
        let value = payload.into_json()?;
        let result = value
            .pointer("/symbolsValidation/result/0")
            .and_then(|v| v.as_object())
            .ok_or_else(|| {
                RequestError::Parse("validation response missing symbolsValidation.result".into())
            })?;
        Ok(result
            .iter()
            .map(|(symbol, flag)| (symbol.clone(), flag.as_bool().unwrap_or(false)))
            .collect())
    }
}

/// The symbol validation pass.
pub struct SymbolValidator {
    client: RequestClient,
    breaker: Arc<RequestBreaker>,
    base_url: String,
}

impl SymbolValidator {
    pub fn new(client: RequestClient) -> Self {
        Self {
            client,
            breaker: Arc::new(RequestBreaker::default()),
            base_url: VALIDATE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_breaker(mut self, breaker: Arc<RequestBreaker>) -> Self {
        self.breaker = breaker;
        self
    }

    /// Validate symbols in chunks; the returned map covers every symbol whose
    /// chunk succeeded.
    pub async fn validate(
        &self,
        symbols: &[String],
        progress: &dyn BatchProgress,
    ) -> Result<HashMap<String, bool>, ScoutError> {
        self.breaker.check()?;
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }

        let params: Vec<Params> = symbols
            .chunks(VALIDATE_CHUNK)
            .map(|chunk| {
                let mut p = Params::new();
                p.insert("formatted".into(), "false".into());
                p.insert("symbols".into(), chunk.join(","));
                p
            })
            .collect();
        let keys: Vec<String> = (0..params.len()).map(|i| format!("chunk-{i}")).collect();

        info!(
            symbols = symbols.len(),
            chunks = params.len(),
            "validating symbols"
        );

        let batch = BatchSpec::get(self.base_url.clone())
            .params(params)
            .keys(keys)
            .build()
            .map_err(ScoutError::Request)?;

        let results = self
            .client
            .run_with(batch, Arc::new(ValidationParser), progress)
            .await;

        let mut flags = HashMap::new();
        for failure in results.failures() {
            self.breaker.observe(failure.error.status(), false);
            warn!(
                key = failure.key.as_deref().unwrap_or(""),
                error = %failure.error,
                "validation chunk failed"
            );
        }
        for chunk in results.into_ok() {
            self.breaker.observe(None, true);
            flags.extend(chunk);
        }
        Ok(flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parser_reads_the_validation_map() {
        let payload = Payload::Json(json!({
            "symbolsValidation": {
                "result": [{"AAA": true, "ZZZT": false}],
                "error": null
            }
        }));
        let flags = ValidationParser.parse(payload).unwrap();
        assert_eq!(flags.get("AAA"), Some(&true));
        assert_eq!(flags.get("ZZZT"), Some(&false));
    }

    #[test]
    fn parser_rejects_missing_result() {
        let err = ValidationParser
            .parse(Payload::Json(json!({"symbolsValidation": {}})))
            .unwrap_err();
        assert!(matches!(err, RequestError::Parse(_)));
    }
}
