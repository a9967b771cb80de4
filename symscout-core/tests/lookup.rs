//! Lookup and validation service tests against a mock endpoint.

use std::sync::Arc;
use std::time::Duration;

use symscout_core::{RequestBreaker, ScoutError, SymbolLookup, SymbolTable, SymbolValidator};
use symscout_requests::{AgentPool, ClientConfig, NoProgress, RequestClient, RetryPolicy};

fn no_retry_client() -> RequestClient {
    RequestClient::new(
        ClientConfig {
            retry: RetryPolicy {
                max_attempts: 1,
                ..RetryPolicy::default()
            },
            ..ClientConfig::default()
        },
        AgentPool::builtin(),
        None,
    )
    .unwrap()
}

fn lookup_body(documents: &str) -> String {
    format!(r#"{{"finance": {{"result": [{{"documents": {documents}}}], "error": null}}}}"#)
}

#[tokio::test]
async fn search_flattens_hits_and_skips_empty_queries() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v1/finance/lookup")
        .match_query(mockito::Matcher::UrlEncoded("query".into(), "a".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(lookup_body(
            r#"[{"symbol": "AAA", "shortName": "Alpha Architect U.S. Quantitative Value ETF",
                "exchange": "PCX", "quoteType": "equity", "industryName": "Funds"}]"#,
        ))
        .create_async()
        .await;
    server
        .mock("GET", "/v1/finance/lookup")
        .match_query(mockito::Matcher::UrlEncoded("query".into(), "b".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(lookup_body("[]"))
        .create_async()
        .await;

    let service = SymbolLookup::new(no_retry_client())
        .with_base_url(format!("{}/v1/finance/lookup", server.url()));
    let rows = service
        .search(
            &["a".to_string(), "b".to_string()],
            &["equity".to_string()],
            &NoProgress,
        )
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].symbol, "AAA");
    assert_eq!(rows[0].query, "a");
    assert_eq!(rows[0].asset_type.as_deref(), Some("equity"));
}

#[tokio::test]
async fn failed_queries_are_skipped_not_fatal() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v1/finance/lookup")
        .match_query(mockito::Matcher::UrlEncoded("query".into(), "a".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(lookup_body(r#"[{"symbol": "AAA", "shortName": "Alpha"}]"#))
        .create_async()
        .await;
    server
        .mock("GET", "/v1/finance/lookup")
        .match_query(mockito::Matcher::UrlEncoded("query".into(), "b".into()))
        .with_status(404)
        .create_async()
        .await;

    let service = SymbolLookup::new(no_retry_client())
        .with_base_url(format!("{}/v1/finance/lookup", server.url()));
    let rows = service
        .search(
            &["a".to_string(), "b".to_string()],
            &["equity".to_string()],
            &NoProgress,
        )
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].symbol, "AAA");
}

#[tokio::test]
async fn forbidden_response_trips_the_breaker() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v1/finance/lookup")
        .match_query(mockito::Matcher::Any)
        .with_status(403)
        .create_async()
        .await;

    let breaker = Arc::new(RequestBreaker::new(Duration::from_secs(60), 5));
    let service = SymbolLookup::new(no_retry_client())
        .with_base_url(format!("{}/v1/finance/lookup", server.url()))
        .with_breaker(Arc::clone(&breaker));

    let rows = service
        .search(&["a".to_string()], &["equity".to_string()], &NoProgress)
        .await
        .unwrap();
    assert!(rows.is_empty());

    // the next run fails fast while the cooldown lasts
    let err = service
        .search(&["b".to_string()], &["equity".to_string()], &NoProgress)
        .await
        .unwrap_err();
    assert!(matches!(err, ScoutError::BreakerOpen { .. }));
}

#[tokio::test]
async fn breaker_trip_mid_run_keeps_rows_already_collected() {
    let mut server = mockito::Server::new_async().await;
    // catch-all first: later, more specific mocks take precedence
    // (expect_at_least(0) keeps mockito from prioritizing this mock as
    // "missing hits" over the more specific one below)
    server
        .mock("GET", "/v1/finance/lookup")
        .match_query(mockito::Matcher::Any)
        .with_status(403)
        .expect_at_least(0)
        .create_async()
        .await;
    server
        .mock("GET", "/v1/finance/lookup")
        .match_query(mockito::Matcher::UrlEncoded("query".into(), "a".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(lookup_body(r#"[{"symbol": "AAA", "shortName": "Alpha"}]"#))
        .create_async()
        .await;

    let breaker = Arc::new(RequestBreaker::new(Duration::from_secs(60), 5));
    let service = SymbolLookup::new(no_retry_client())
        .with_base_url(format!("{}/v1/finance/lookup", server.url()))
        .with_breaker(Arc::clone(&breaker))
        .with_chunk_size(1);

    // chunk "a" succeeds, chunk "b" trips the breaker, chunk "c" fails fast;
    // the run still returns what it collected
    let rows = service
        .lookup(1, &["equity".to_string()], &NoProgress)
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].symbol, "AAA");
    assert!(matches!(
        breaker.check(),
        Err(ScoutError::BreakerOpen { .. })
    ));
}

#[tokio::test]
async fn validation_marks_rows_through_the_table() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v6/finance/quote/validate")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"symbolsValidation": {"result": [{"AAA": true, "JUNK": false}], "error": null}}"#,
        )
        .create_async()
        .await;

    let validator = SymbolValidator::new(no_retry_client())
        .with_base_url(format!("{}/v6/finance/quote/validate", server.url()));

    let mut table = SymbolTable::new();
    table.extend(vec![
        symscout_core::SymbolRow {
            symbol: "AAA".into(),
            name: Some("Alpha".into()),
            exchange: Some("PCX".into()),
            asset_type: Some("equity".into()),
            industry: None,
            query: "a".into(),
            valid: None,
        },
        symscout_core::SymbolRow {
            symbol: "JUNK".into(),
            name: Some("Junk Co".into()),
            exchange: Some("PNK".into()),
            asset_type: Some("equity".into()),
            industry: None,
            query: "j".into(),
            valid: None,
        },
    ]);

    let flags = validator
        .validate(&table.symbols(), &NoProgress)
        .await
        .unwrap();
    table.apply_validation(&flags);

    assert_eq!(table.rows()[0].valid, Some(true));
    assert_eq!(table.rows()[1].valid, Some(false));
}
