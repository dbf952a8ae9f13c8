//! Multi-source aggregation cycle.
//!
//! One submission fans out one POST per configured source, all in flight
//! at once. Every source settles on its own: a transport failure, a bad
//! status or an unparsable body only ever marks that source's slot. The
//! consolidated [`ViewModel`] is published through a watch channel so a
//! renderer can observe slots landing while others are still pending.

use crate::aggregate::settle::settle_all;
use crate::aggregate::transport::{Transport, TransportError, TransportResponse};
use crate::models::{ErrorKind, Phase, Query, SkipReason, SourceResult, SubmitOutcome, ViewModel};
use crate::sources::{Projection, Source};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// When settled slots become visible to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishPolicy {
    /// Each slot is published as soon as its source settles.
    #[default]
    Streaming,
    /// All slots are published together once every source has settled.
    Atomic,
}

/// Configuration for the aggregator.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Base URL every source path is appended to.
    pub base_url: String,
    /// Sources requested on every cycle, in display order.
    pub sources: Vec<Source>,
    pub publish: PublishPolicy,
    /// Pause between the cycle settling and the ready signal.
    pub ready_delay: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            sources: crate::sources::default_catalog()
                .into_iter()
                .filter(|s| s.enabled)
                .collect(),
            publish: PublishPolicy::Streaming,
            ready_delay: Duration::from_millis(100),
        }
    }
}

/// Failure of the orchestration itself, before any source is requested.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("failed to encode request body: {0}")]
    Body(#[from] serde_json::Error),

    #[error("invalid API base URL '{url}': {reason}")]
    BaseUrl { url: String, reason: String },

    #[error("invalid endpoint for source '{name}' ({path}): {reason}")]
    Endpoint {
        name: String,
        path: String,
        reason: String,
    },
}

/// Shared request body.
#[derive(Debug, Serialize)]
struct CompanyRequest<'a> {
    company: &'a str,
}

/// Releases the in-flight flag when dropped.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Fans a query out to every configured source and publishes the results.
pub struct Aggregator {
    config: AggregatorConfig,
    transport: Arc<dyn Transport>,
    state: Arc<watch::Sender<ViewModel>>,
    busy: AtomicBool,
}

impl Aggregator {
    pub fn new(config: AggregatorConfig, transport: Arc<dyn Transport>) -> Self {
        let (state, _) = watch::channel(ViewModel::default());

        Self {
            config,
            transport,
            state: Arc::new(state),
            busy: AtomicBool::new(false),
        }
    }

    /// Receiver that observes every published view model.
    pub fn subscribe(&self) -> watch::Receiver<ViewModel> {
        self.state.subscribe()
    }

    /// Current view model.
    pub fn snapshot(&self) -> ViewModel {
        self.state.borrow().clone()
    }

    /// Whether a cycle is in flight.
    #[allow(dead_code)] // Inspection helper for embedders
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn sources(&self) -> &[Source] {
        &self.config.sources
    }

    /// Run one cycle for `raw`.
    ///
    /// A blank query or a call made while another cycle is in flight is a
    /// no-op and leaves the view model untouched. Otherwise the view model
    /// is cleared before any request starts and the call returns once every
    /// source has settled.
    pub async fn submit(&self, raw: &str) -> SubmitOutcome {
        let Some(query) = Query::parse(raw) else {
            debug!("Ignoring blank query");
            return SubmitOutcome::Skipped(SkipReason::EmptyQuery);
        };

        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            info!("Ignoring '{}': a cycle is already in flight", query);
            return SubmitOutcome::Skipped(SkipReason::Busy);
        };

        let started = Instant::now();
        let cycle = self.state.borrow().cycle + 1;
        self.state.send_replace(ViewModel::loading(query.clone(), cycle));

        info!(
            "Cycle {} started for '{}' ({} sources)",
            cycle,
            query,
            self.config.sources.len()
        );

        match self.run_cycle(&query).await {
            Ok(results) => {
                if self.config.publish == PublishPolicy::Atomic {
                    self.state.send_modify(|vm| {
                        let mut next = vm.clone();
                        for (name, outcome) in results {
                            next = next.with_result(&name, outcome.into());
                        }
                        *vm = next;
                    });
                }
            }
            Err(e) => {
                error!("Cycle {} failed: {}", cycle, e);
                self.state
                    .send_modify(|vm| *vm = vm.with_global_error(e.to_string()));
            }
        }

        self.state.send_modify(|vm| *vm = vm.with_phase(Phase::Settled));
        self.schedule_ready(cycle);

        let snapshot = self.snapshot();
        info!(
            "Cycle {} settled in {:.2}s: {} ok, {} failed",
            cycle,
            started.elapsed().as_secs_f64(),
            snapshot.ok_count(),
            snapshot.failed_count()
        );

        SubmitOutcome::Completed(snapshot)
    }

    /// Issue every request and wait for all of them to settle.
    async fn run_cycle(
        &self,
        query: &Query,
    ) -> Result<Vec<(String, Result<Value, ErrorKind>)>, CycleError> {
        let body = serde_json::to_vec(&CompanyRequest {
            company: query.as_str(),
        })?;
        let endpoints = self.endpoints()?;

        let body: &[u8] = &body;
        let transport: &dyn Transport = self.transport.as_ref();

        let tasks: Vec<_> = endpoints
            .into_iter()
            .map(|(source, url)| {
                let fut = async move {
                    let outcome = transport.post_json(&url, body).await;
                    resolve_outcome(&source.name, outcome, &source.projection)
                };
                (source.name.clone(), fut)
            })
            .collect();

        let streaming = self.config.publish == PublishPolicy::Streaming;

        let results = settle_all(tasks, |name, outcome| {
            match outcome {
                Ok(_) => debug!("Source {} settled ok", name),
                Err(kind) => debug!("Source {} settled with {}", name, kind),
            }
            if streaming {
                let slot = SourceResult::from(outcome.clone());
                self.state.send_modify(|vm| *vm = vm.with_result(name, slot));
            }
        })
        .await;

        Ok(results)
    }

    /// Resolve every source path against the base URL.
    fn endpoints(&self) -> Result<Vec<(&Source, Url)>, CycleError> {
        let base = self.config.base_url.trim();
        Url::parse(base).map_err(|e| CycleError::BaseUrl {
            url: base.to_string(),
            reason: e.to_string(),
        })?;

        let base = base.trim_end_matches('/');

        self.config
            .sources
            .iter()
            .map(|source| {
                let path = source.path.trim();
                let joined = if path.starts_with('/') {
                    format!("{}{}", base, path)
                } else {
                    format!("{}/{}", base, path)
                };

                Url::parse(&joined)
                    .map(|url| (source, url))
                    .map_err(|e| CycleError::Endpoint {
                        name: source.name.clone(),
                        path: source.path.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect()
    }

    /// Flip the phase to `Ready` after the configured delay, unless a newer
    /// cycle has started in the meantime.
    fn schedule_ready(&self, cycle: u64) {
        let state = Arc::clone(&self.state);
        let delay = self.config.ready_delay;

        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let fired = state.send_if_modified(|vm| {
                if vm.cycle == cycle && vm.phase == Phase::Settled {
                    *vm = vm.with_phase(Phase::Ready);
                    true
                } else {
                    false
                }
            });

            if fired {
                debug!("Cycle {} ready", cycle);
            }
        });
    }
}

/// Turn one settled request into a slot value.
///
/// Checked in order: transport failure, status, JSON parse, projection.
pub fn resolve_outcome(
    name: &str,
    outcome: Result<TransportResponse, TransportError>,
    projection: &Projection,
) -> Result<Value, ErrorKind> {
    let response = match outcome {
        Ok(response) => response,
        Err(e) => {
            warn!("Source {} failed: {}", name, e);
            return Err(ErrorKind::FetchFail);
        }
    };

    if !response.is_success() {
        warn!("Source {} returned HTTP {}", name, response.status);
        return Err(ErrorKind::Http(response.status));
    }

    match serde_json::from_slice::<Value>(&response.body) {
        // A literal `null` carries no data either.
        Ok(Value::Null) => {
            warn!("Source {} returned a null body", name);
            Err(ErrorKind::BadJson)
        }
        Ok(parsed) => Ok(projection.apply(parsed)),
        Err(e) => {
            warn!("Source {} returned invalid JSON: {}", name, e);
            Err(ErrorKind::BadJson)
        }
    }
}
