//! Retriever: reads documents back through public IPFS gateways.
//!
//! Gateways are independent mirrors, tried strictly in configured order.
//! Each attempt is bounded by the per-gateway timeout; a failed attempt moves
//! on to the next mirror immediately. The first JSON body wins.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use supplydna_core::error::{Result, SupplyDnaError};
use supplydna_core::traits::ContentRetriever;
use supplydna_core::types::ContentId;

use crate::config::StorageConfig;
use crate::integrity::{verify_content, Verification};

// ═══════════════════════════════════════════════════════════════════════════════
// STATE MACHINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Progress of a single retrieval.
///
/// Starts at `TryingGateway(0)`; `Succeeded` and `Failed` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetrievalState {
    /// Waiting on the gateway at this index.
    TryingGateway(usize),
    /// The gateway at this index returned the document.
    Succeeded {
        /// Index of the winning gateway
        gateway: usize,
    },
    /// Every gateway failed.
    Failed,
}

impl RetrievalState {
    /// Initial state of every retrieval.
    pub fn start() -> Self {
        RetrievalState::TryingGateway(0)
    }

    /// Applies the outcome of the current attempt.
    pub fn advance(self, succeeded: bool, gateway_count: usize) -> Self {
        match self {
            RetrievalState::TryingGateway(i) if succeeded => RetrievalState::Succeeded { gateway: i },
            RetrievalState::TryingGateway(i) if i + 1 < gateway_count => {
                RetrievalState::TryingGateway(i + 1)
            }
            RetrievalState::TryingGateway(_) => RetrievalState::Failed,
            terminal => terminal,
        }
    }

    /// Returns true for `Succeeded` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RetrievalState::TryingGateway(_))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ATTEMPTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Why one gateway attempt failed.
enum AttemptError {
    Timeout(Duration),
    Transport(String),
    Status(reqwest::StatusCode),
    Decode(String),
    Tampered,
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Timeout(t) => write!(f, "timed out after {}ms", t.as_millis()),
            AttemptError::Transport(e) => write!(f, "transport error: {}", e),
            AttemptError::Status(s) => write!(f, "HTTP {}", s),
            AttemptError::Decode(e) => write!(f, "body is not JSON: {}", e),
            AttemptError::Tampered => f.write_str("content does not match CID"),
        }
    }
}

/// Why the whole fan-out failed. Cloneable so one result can be shared.
#[derive(Clone, Debug)]
enum FanOutFailure {
    Exhausted,
    Tampered(Vec<String>),
    Cancelled,
}

impl FanOutFailure {
    fn into_error(self, cid: &ContentId, attempted: usize) -> SupplyDnaError {
        match self {
            FanOutFailure::Exhausted => SupplyDnaError::AllGatewaysFailed {
                cid: cid.to_string(),
                attempted,
            },
            FanOutFailure::Tampered(gateways) => SupplyDnaError::IntegrityMismatch {
                cid: cid.to_string(),
                gateways,
            },
            FanOutFailure::Cancelled => SupplyDnaError::Cancelled {
                operation: format!("retrieval of {}", cid),
            },
        }
    }
}

type FanOutResult = std::result::Result<Value, FanOutFailure>;
type SharedFetch = Shared<BoxFuture<'static, FanOutResult>>;

/// A fan-out shared by every concurrent retrieval of one CID.
struct InFlight {
    fetch: SharedFetch,
    waiters: usize,
}

/// Releases one waiter on drop; the last one out removes the entry, which
/// drops the shared fan-out if it is still running.
struct Waiter<'a> {
    table: &'a DashMap<ContentId, InFlight>,
    cid: &'a ContentId,
}

impl Drop for Waiter<'_> {
    fn drop(&mut self) {
        if let Entry::Occupied(mut entry) = self.table.entry(self.cid.clone()) {
            entry.get_mut().waiters -= 1;
            if entry.get().waiters == 0 {
                entry.remove();
            }
        }
    }
}

struct GatewayFanOut {
    gateways: Vec<String>,
    timeout: Duration,
    verify_integrity: bool,
    http_client: reqwest::Client,
}

impl GatewayFanOut {
    async fn run(&self, cid: &ContentId, cancel: &CancellationToken) -> FanOutResult {
        let mut tampered = Vec::new();
        let mut state = RetrievalState::start();

        while let RetrievalState::TryingGateway(index) = state {
            let Some(gateway) = self.gateways.get(index) else {
                break;
            };
            debug!(?state, gateway = %gateway, "Trying gateway");

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FanOutFailure::Cancelled),
                outcome = self.attempt(gateway, cid) => outcome,
            };

            match outcome {
                Ok(document) => {
                    state = state.advance(true, self.gateways.len());
                    info!(%cid, gateway = %gateway, ?state, "Fetched document from IPFS");
                    return Ok(document);
                }
                Err(e) => {
                    warn!(%cid, gateway = %gateway, error = %e, "Gateway failed, trying next");
                    if matches!(e, AttemptError::Tampered) {
                        tampered.push(gateway.clone());
                    }
                    state = state.advance(false, self.gateways.len());
                }
            }
        }

        debug!(%cid, ?state, "All gateways exhausted");
        if tampered.is_empty() {
            Err(FanOutFailure::Exhausted)
        } else {
            Err(FanOutFailure::Tampered(tampered))
        }
    }

    async fn attempt(&self, gateway: &str, cid: &ContentId) -> std::result::Result<Value, AttemptError> {
        let url = format!("{}{}", gateway, cid);

        let body = tokio::time::timeout(self.timeout, self.fetch_bytes(&url))
            .await
            .map_err(|_| AttemptError::Timeout(self.timeout))??;

        if self.verify_integrity {
            match verify_content(cid.as_str(), &body) {
                Verification::Verified => debug!(%cid, gateway, "Content matches CID"),
                Verification::Mismatch => return Err(AttemptError::Tampered),
                Verification::Unverifiable(reason) => {
                    warn!(%cid, gateway, %reason, "Accepting content without integrity check")
                }
            }
        }

        serde_json::from_slice(&body).map_err(|e| AttemptError::Decode(e.to_string()))
    }

    async fn fetch_bytes(&self, url: &str) -> std::result::Result<Bytes, AttemptError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| AttemptError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AttemptError::Status(response.status()));
        }

        response
            .bytes()
            .await
            .map_err(|e| AttemptError::Transport(e.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RETRIEVER
// ═══════════════════════════════════════════════════════════════════════════════

/// Fetches documents by CID from an ordered list of gateways.
pub struct Retriever {
    fan_out: Arc<GatewayFanOut>,
    in_flight: Option<Arc<DashMap<ContentId, InFlight>>>,
}

impl Retriever {
    /// Creates a retriever from the storage configuration.
    pub fn new(config: &StorageConfig) -> Result<Self> {
        config.validate_gateways()?;

        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| SupplyDnaError::ConfigError(format!("HTTP client: {}", e)))?;

        let fan_out = GatewayFanOut {
            gateways: config.gateway_prefixes(),
            timeout: config.gateway_timeout(),
            verify_integrity: config.verify_integrity,
            http_client,
        };

        Ok(Self {
            fan_out: Arc::new(fan_out),
            in_flight: config.collapse_in_flight.then(|| Arc::new(DashMap::new())),
        })
    }

    /// Gateway prefixes in the order they are tried.
    pub fn gateways(&self) -> &[String] {
        &self.fan_out.gateways
    }

    /// Parses `cid` and retrieves the document.
    pub async fn retrieve_str(&self, cid: &str) -> Result<Value> {
        let cid = ContentId::parse(cid)?;
        self.retrieve(&cid).await
    }

    /// Retrieves the document stored under `cid`.
    pub async fn retrieve(&self, cid: &ContentId) -> Result<Value> {
        self.retrieve_with_cancel(cid, &CancellationToken::new()).await
    }

    /// Retrieves the document, giving up early if `cancel` fires.
    #[instrument(skip_all, fields(cid = %cid))]
    pub async fn retrieve_with_cancel(
        &self,
        cid: &ContentId,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        let outcome = match &self.in_flight {
            None => self.fan_out.run(cid, cancel).await,
            Some(table) => {
                let shared = self.join_or_start(table, cid);
                let _waiter = Waiter { table: table.as_ref(), cid };
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(FanOutFailure::Cancelled),
                    outcome = shared => outcome,
                }
            }
        };

        outcome.map_err(|failure| failure.into_error(cid, self.fan_out.gateways.len()))
    }

    /// Registers a waiter on the in-flight fetch for `cid`, starting one if
    /// none is running.
    fn join_or_start(&self, table: &DashMap<ContentId, InFlight>, cid: &ContentId) -> SharedFetch {
        let mut entry = table.entry(cid.clone()).or_insert_with(|| {
            debug!(%cid, "Starting shared fetch");
            let fan_out = Arc::clone(&self.fan_out);
            let cid = cid.clone();
            // Callers cancel their own wait, never the shared fetch.
            let fetch = async move { fan_out.run(&cid, &CancellationToken::new()).await }
                .boxed()
                .shared();
            InFlight { fetch, waiters: 0 }
        });
        entry.waiters += 1;
        entry.fetch.clone()
    }
}

#[async_trait]
impl ContentRetriever for Retriever {
    async fn retrieve(&self, cid: &ContentId) -> Result<Value> {
        Retriever::retrieve(self, cid).await
    }
}
