//! Single-request execution and batch orchestration.
//!
//! One request client drives a whole batch: a global semaphore caps in-flight
//! requests, per-host semaphores cap simultaneous connections to any one
//! destination, and each item retries transient failures with exponential
//! backoff until it settles. Item failures never abort siblings; the run
//! completes once every task has settled. Dropping the returned future
//! cancels the whole run; both permits are held by RAII guards and release on
//! every exit path.

use crate::collection::ResultCollection;
use crate::descriptor::{Batch, RequestDescriptor, ResponseKind};
use crate::error::RequestError;
use crate::parse::{Payload, PayloadParser, ResponseParser};
use crate::pools::{AgentPool, ProxyPool};
use crate::retry::{Disposition, RetryPolicy};
use futures::stream::{FuturesUnordered, StreamExt};
use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

/// Observer notified as batch items complete, in completion order.
pub trait BatchProgress: Send + Sync {
    /// A run of `total` items is starting.
    fn on_start(&self, _total: usize) {}
    /// `completed` of `total` items have settled.
    fn on_item(&self, _completed: usize, _total: usize) {}
    /// The run finished with the given item counts.
    fn on_finished(&self, _succeeded: usize, _failed: usize, _total: usize) {}
}

/// Progress sink that reports nothing.
pub struct NoProgress;

impl BatchProgress for NoProgress {}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Global cap on simultaneously in-flight requests.
    pub concurrency: usize,
    /// Cap on simultaneous connections to a single host.
    pub limits_per_host: usize,
    /// Total per-request timeout.
    pub timeout: Duration,
    /// Explicit headers; when set they win over random user-agent selection.
    pub headers: Option<HeaderMap>,
    /// Draw a random proxy from the proxy pool for every request.
    pub use_random_proxy: bool,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            limits_per_host: 10,
            timeout: Duration::from_secs(120),
            headers: None,
            use_random_proxy: false,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug)]
struct Inner {
    config: ClientConfig,
    agents: AgentPool,
    transport: reqwest::Client,
    proxied: Vec<reqwest::Client>,
}

/// Asynchronous HTTP client executing descriptor batches.
///
/// Cheap to clone; clones share the underlying transports.
#[derive(Debug, Clone)]
pub struct RequestClient {
    inner: Arc<Inner>,
}

impl RequestClient {
    /// Build the client and its transports. Proxied transports are prebuilt
    /// one per pool entry, since a proxy binds at client construction.
    pub fn new(
        config: ClientConfig,
        agents: AgentPool,
        proxies: Option<&ProxyPool>,
    ) -> Result<Self, RequestError> {
        let build = |proxy: Option<&str>| -> Result<reqwest::Client, RequestError> {
            let mut builder = reqwest::Client::builder()
                .timeout(config.timeout)
                .pool_max_idle_per_host(config.limits_per_host);
            if let Some(uri) = proxy {
                let proxy = reqwest::Proxy::all(uri).map_err(|e| {
                    RequestError::Configuration(format!("proxy '{uri}': {e}"))
                })?;
                builder = builder.proxy(proxy);
            }
            builder
                .build()
                .map_err(|e| RequestError::Configuration(format!("http client: {e}")))
        };

        let transport = build(None)?;
        let mut proxied = Vec::new();
        if let Some(pool) = proxies {
            for uri in pool.uris() {
                proxied.push(build(Some(uri))?);
            }
        }
        if config.use_random_proxy && proxied.is_empty() {
            return Err(RequestError::Configuration(
                "random proxy mode requires a non-empty proxy pool".into(),
            ));
        }

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                agents,
                transport,
                proxied,
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Headers for one outbound request: explicit headers win, otherwise a
    /// user agent is drawn from the pool.
    fn request_headers(&self) -> HeaderMap {
        if let Some(explicit) = &self.inner.config.headers {
            return explicit.clone();
        }
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(self.inner.agents.pick()) {
            headers.insert(USER_AGENT, value);
        }
        headers
    }

    /// Transport for one outbound request: a random proxied client in random
    /// proxy mode, the shared direct client otherwise.
    fn request_transport(&self) -> &reqwest::Client {
        if self.inner.config.use_random_proxy {
            if let Some(client) = self.inner.proxied.choose(&mut rand::thread_rng()) {
                return client;
            }
        }
        &self.inner.transport
    }

    /// Run a batch with the identity parser: each slot holds the decoded
    /// payload.
    pub async fn run(
        &self,
        batch: Batch,
        progress: &dyn BatchProgress,
    ) -> ResultCollection<Payload> {
        self.run_with(batch, Arc::new(PayloadParser), progress).await
    }

    /// Run a batch through a parse strategy, reassembling outcomes per the
    /// keying rules on [`ResultCollection`].
    pub async fn run_with<P>(
        &self,
        batch: Batch,
        parser: Arc<P>,
        progress: &dyn BatchProgress,
    ) -> ResultCollection<P::Output>
    where
        P: ResponseParser + 'static,
    {
        let total = batch.len();
        let all_keyed = batch.all_keyed();
        progress.on_start(total);
        if total == 0 {
            progress.on_finished(0, 0, 0);
            return ResultCollection::Ordered(Vec::new());
        }

        debug!(
            total,
            concurrency = self.inner.config.concurrency,
            limits_per_host = self.inner.config.limits_per_host,
            "dispatching batch"
        );

        let global = Arc::new(Semaphore::new(self.inner.config.concurrency));
        let per_host = host_limiters(batch.descriptors(), self.inner.config.limits_per_host);

        let mut in_flight = FuturesUnordered::new();
        for (index, desc) in batch.into_iter().enumerate() {
            let client = self.clone();
            let parser = Arc::clone(&parser);
            let gate = Gate {
                global: Arc::clone(&global),
                host: host_of(&desc.url).and_then(|h| per_host.get(&h).cloned()),
            };
            in_flight.push(async move {
                let key = desc.key.clone();
                let outcome = client.execute(&desc, parser.as_ref(), &gate).await;
                (index, key, outcome)
            });
        }

        let mut completions = Vec::with_capacity(total);
        let mut failed = 0usize;
        while let Some((index, key, outcome)) = in_flight.next().await {
            if let Err(err) = &outcome {
                failed += 1;
                warn!(index, key = key.as_deref().unwrap_or(""), %err, "batch item failed");
            }
            completions.push((index, key, outcome));
            progress.on_item(completions.len(), total);
        }

        progress.on_finished(total - failed, failed, total);
        ResultCollection::assemble(completions, all_keyed, total)
    }

    /// Execute one descriptor to a terminal outcome, retrying transient
    /// failures under the policy's attempt and wall-clock budgets.
    ///
    /// The gate's permits guard each wire attempt only; they are released
    /// before a backoff sleep so a waiting sibling can run during the delay.
    async fn execute<P: ResponseParser>(
        &self,
        desc: &RequestDescriptor,
        parser: &P,
        gate: &Gate,
    ) -> Result<P::Output, RequestError> {
        let policy = &self.inner.config.retry;
        let mut backoff = policy.backoff();
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let outcome = {
                let _permits = gate.acquire().await?;
                self.attempt(desc).await
            };
            let failure = match outcome {
                Ok(payload) => {
                    return match desc.key.as_deref() {
                        Some(key) => parser.parse_keyed(key, payload),
                        None => parser.parse(payload),
                    };
                }
                Err(failure) => failure,
            };

            match failure {
                Attempt::Fatal(err) => return Err(err),
                Attempt::Transient { status, message } => {
                    let delay = backoff.next_delay();
                    let out_of_budget = attempt >= policy.max_attempts
                        || started.elapsed() + delay > policy.max_elapsed;
                    if out_of_budget {
                        return Err(RequestError::TransientRequestFailed {
                            attempts: attempt,
                            last_status: status,
                            message,
                        });
                    }
                    debug!(
                        url = %desc.url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "retrying transient failure"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// One wire attempt: send, classify, decode.
    async fn attempt(&self, desc: &RequestDescriptor) -> Result<Payload, Attempt> {
        let mut request = self
            .request_transport()
            .request(desc.method.clone(), &desc.url)
            .headers(self.request_headers());
        if let Some(params) = &desc.params {
            request = request.query(params);
        }
        if let Some(form) = &desc.form {
            request = request.form(form);
        }
        if let Some(json) = &desc.json {
            request = request.json(json);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                Attempt::Transient {
                    status: None,
                    message: e.to_string(),
                }
            } else {
                Attempt::Fatal(RequestError::Network(e.to_string()))
            }
        })?;

        let status = response.status();
        match self.inner.config.retry.classify(status) {
            Disposition::Success => {}
            Disposition::Retry => {
                return Err(Attempt::Transient {
                    status: Some(status.as_u16()),
                    message: format!("status {status}"),
                });
            }
            Disposition::Fail => {
                return Err(Attempt::Fatal(RequestError::Status {
                    status: status.as_u16(),
                }));
            }
        }

        match desc.kind {
            ResponseKind::Json => {
                let value = response.json::<serde_json::Value>().await.map_err(|e| {
                    Attempt::Fatal(RequestError::Parse(format!("json body: {e}")))
                })?;
                Ok(Payload::Json(value))
            }
            ResponseKind::Text => {
                let text = response.text().await.map_err(|e| {
                    Attempt::Fatal(RequestError::Parse(format!("text body: {e}")))
                })?;
                Ok(Payload::Text(text))
            }
            ResponseKind::Bytes => {
                let bytes = response.bytes().await.map_err(|e| {
                    Attempt::Fatal(RequestError::Parse(format!("byte body: {e}")))
                })?;
                Ok(Payload::Bytes(bytes.to_vec()))
            }
        }
    }
}

/// Concurrency permits for one batch item: the global in-flight cap plus the
/// item's per-host cap.
struct Gate {
    global: Arc<Semaphore>,
    host: Option<Arc<Semaphore>>,
}

impl Gate {
    /// Acquire both permits for one wire attempt. Dropping the returned
    /// guards releases them on every exit path.
    async fn acquire(
        &self,
    ) -> Result<(OwnedSemaphorePermit, Option<OwnedSemaphorePermit>), RequestError> {
        let global = Arc::clone(&self.global)
            .acquire_owned()
            .await
            .map_err(|_| RequestError::Configuration("concurrency limiter closed".into()))?;
        let host = match &self.host {
            Some(limiter) => Some(
                Arc::clone(limiter)
                    .acquire_owned()
                    .await
                    .map_err(|_| RequestError::Configuration("per-host limiter closed".into()))?,
            ),
            None => None,
        };
        Ok((global, host))
    }
}

/// Outcome of a single wire attempt.
enum Attempt {
    /// Worth retrying under the policy's budgets.
    Transient {
        status: Option<u16>,
        message: String,
    },
    Fatal(RequestError),
}

/// One counting permit per distinct host in the batch.
fn host_limiters(
    descriptors: &[RequestDescriptor],
    limit: usize,
) -> HashMap<String, Arc<Semaphore>> {
    let mut limiters = HashMap::new();
    for desc in descriptors {
        if let Some(host) = host_of(&desc.url) {
            limiters
                .entry(host)
                .or_insert_with(|| Arc::new(Semaphore::new(limit)));
        }
    }
    limiters
}

fn host_of(url: &str) -> Option<String> {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with(config: ClientConfig) -> RequestClient {
        RequestClient::new(config, AgentPool::builtin(), None).unwrap()
    }

    #[test]
    fn explicit_headers_disable_random_agent_selection() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("fixed-agent"));
        let client = client_with(ClientConfig {
            headers: Some(headers),
            ..ClientConfig::default()
        });

        for _ in 0..5 {
            assert_eq!(client.request_headers()[USER_AGENT], "fixed-agent");
        }
    }

    #[test]
    fn random_agent_comes_from_the_pool() {
        let client = client_with(ClientConfig::default());
        let picked = client.request_headers();
        let value = picked[USER_AGENT].to_str().unwrap().to_string();
        assert!(value.starts_with("Mozilla/5.0"));
    }

    #[test]
    fn random_proxy_mode_requires_proxies() {
        let err = RequestClient::new(
            ClientConfig {
                use_random_proxy: true,
                ..ClientConfig::default()
            },
            AgentPool::builtin(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, RequestError::Configuration(_)));
    }

    #[test]
    fn host_extraction_handles_ports_and_paths() {
        assert_eq!(
            host_of("https://query1.finance.yahoo.com/v1/finance/lookup?query=a"),
            Some("query1.finance.yahoo.com".to_string())
        );
        assert_eq!(
            host_of("http://127.0.0.1:8080/path"),
            Some("127.0.0.1".to_string())
        );
        assert_eq!(host_of("not a url"), None);
    }

    #[test]
    fn one_limiter_per_distinct_host() {
        let descriptors = vec![
            RequestDescriptor {
                method: reqwest::Method::GET,
                url: "https://a.example.com/x".into(),
                params: None,
                form: None,
                json: None,
                key: None,
                kind: ResponseKind::Json,
            },
            RequestDescriptor {
                method: reqwest::Method::GET,
                url: "https://a.example.com/y".into(),
                params: None,
                form: None,
                json: None,
                key: None,
                kind: ResponseKind::Json,
            },
            RequestDescriptor {
                method: reqwest::Method::GET,
                url: "https://b.example.com/z".into(),
                params: None,
                form: None,
                json: None,
                key: None,
                kind: ResponseKind::Json,
            },
        ];
        let limiters = host_limiters(&descriptors, 4);
        assert_eq!(limiters.len(), 2);
        assert_eq!(
            limiters["a.example.com"].available_permits(),
            4
        );
    }
}
