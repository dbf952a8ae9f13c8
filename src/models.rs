//! Data models for the intel aggregator.
//!
//! This module contains the core data structures shared by the
//! aggregator and the report layer: the query, per-source outcomes,
//! the view model and the report wrapper.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Key used for the orchestration-level error in the error map.
pub const GLOBAL_ERROR_KEY: &str = "global";

/// A validated company query (non-empty after trimming).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Query(String);

impl Query {
    /// Trim the raw input. Returns `None` if nothing is left.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a single source produced no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request never completed (connect error, timeout, broken body).
    FetchFail,
    /// The server answered with a non-2xx status.
    Http(u16),
    /// The body was not structured JSON.
    BadJson,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::FetchFail => write!(f, "fetch_fail"),
            ErrorKind::Http(status) => write!(f, "http_{}", status),
            ErrorKind::BadJson => write!(f, "bad_json"),
        }
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Settled outcome of one source within a cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceResult {
    Ok(Value),
    Error(ErrorKind),
}

impl SourceResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, SourceResult::Ok(_))
    }

    pub fn error(&self) -> Option<ErrorKind> {
        match self {
            SourceResult::Ok(_) => None,
            SourceResult::Error(kind) => Some(*kind),
        }
    }
}

impl From<Result<Value, ErrorKind>> for SourceResult {
    fn from(result: Result<Value, ErrorKind>) -> Self {
        match result {
            Ok(v) => SourceResult::Ok(v),
            Err(kind) => SourceResult::Error(kind),
        }
    }
}

/// Lifecycle of the current cycle as seen by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Nothing submitted yet.
    #[default]
    Idle,
    /// Requests are in flight.
    Loading,
    /// Every source has settled.
    Settled,
    /// The post-settle delay elapsed; renderers may present the result.
    Ready,
}

/// Consolidated state published to the rendering layer.
///
/// Treated as an immutable record: every change produces a new value that
/// replaces the previous one wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewModel {
    /// Query of the current cycle, `None` before the first submission.
    pub query: Option<Query>,
    /// Monotonic cycle counter; 0 before the first submission.
    pub cycle: u64,
    pub phase: Phase,
    /// Settled slots keyed by source name. Absent means still pending.
    pub sources: BTreeMap<String, SourceResult>,
    /// Orchestration failure not attributable to a single source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_error: Option<String>,
}

impl ViewModel {
    /// A cleared view model for a freshly accepted query.
    pub fn loading(query: Query, cycle: u64) -> Self {
        Self {
            query: Some(query),
            cycle,
            phase: Phase::Loading,
            sources: BTreeMap::new(),
            global_error: None,
        }
    }

    /// Returns a copy with one source slot replaced.
    pub fn with_result(&self, name: &str, result: SourceResult) -> Self {
        let mut next = self.clone();
        next.sources.insert(name.to_string(), result);
        next
    }

    /// Returns a copy with the orchestration error set.
    pub fn with_global_error(&self, message: impl Into<String>) -> Self {
        Self {
            global_error: Some(message.into()),
            ..self.clone()
        }
    }

    /// Returns a copy in the given phase.
    pub fn with_phase(&self, phase: Phase) -> Self {
        Self {
            phase,
            ..self.clone()
        }
    }

    pub fn get(&self, name: &str) -> Option<&SourceResult> {
        self.sources.get(name)
    }

    /// Error map: one code per failed source plus `global` if set.
    pub fn errors(&self) -> BTreeMap<String, String> {
        let mut errors: BTreeMap<String, String> = self
            .sources
            .iter()
            .filter_map(|(name, result)| result.error().map(|e| (name.clone(), e.to_string())))
            .collect();

        if let Some(ref global) = self.global_error {
            errors.insert(GLOBAL_ERROR_KEY.to_string(), global.clone());
        }

        errors
    }

    /// Number of settled sources holding a value.
    pub fn ok_count(&self) -> usize {
        self.sources.values().filter(|r| r.is_ok()).count()
    }

    /// Number of settled sources holding an error.
    pub fn failed_count(&self) -> usize {
        self.sources.values().filter(|r| !r.is_ok()).count()
    }
}

/// Why a submission did not start a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmptyQuery,
    Busy,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::EmptyQuery => write!(f, "query is empty"),
            SkipReason::Busy => write!(f, "a cycle is already in flight"),
        }
    }
}

/// Result of calling `Aggregator::submit`.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Skipped(SkipReason),
    Completed(ViewModel),
}

/// Panels the dashboard advertises but no backend serves yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnimplementedPanel {
    PeerCompare,
    Trends,
    RiskList,
    Timeline,
    AskAi,
}

impl UnimplementedPanel {
    pub const ALL: [UnimplementedPanel; 5] = [
        UnimplementedPanel::PeerCompare,
        UnimplementedPanel::Trends,
        UnimplementedPanel::RiskList,
        UnimplementedPanel::Timeline,
        UnimplementedPanel::AskAi,
    ];

    pub fn emoji(&self) -> &'static str {
        match self {
            UnimplementedPanel::PeerCompare => "⚖️",
            UnimplementedPanel::Trends => "📈",
            UnimplementedPanel::RiskList => "⚠️",
            UnimplementedPanel::Timeline => "🗓️",
            UnimplementedPanel::AskAi => "🤖",
        }
    }
}

impl fmt::Display for UnimplementedPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnimplementedPanel::PeerCompare => write!(f, "Peer Compare"),
            UnimplementedPanel::Trends => write!(f, "Trends"),
            UnimplementedPanel::RiskList => write!(f, "Risk List"),
            UnimplementedPanel::Timeline => write!(f, "Timeline"),
            UnimplementedPanel::AskAi => write!(f, "Ask AI"),
        }
    }
}

/// Metadata about one report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Company the cycle ran for.
    pub company: String,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Base URL the sources were fetched from.
    pub api_base: String,
    /// Sources requested in this cycle, in configured order.
    pub sources_requested: Vec<String>,
    /// Sources that settled with a value.
    pub sources_ok: usize,
    /// Sources that settled with an error.
    pub sources_failed: usize,
    /// Wall time of the cycle in seconds.
    pub duration_seconds: f64,
}

/// The complete report handed to the renderers.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub view: ViewModel,
    /// Placeholder panels shown as not yet implemented.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub placeholders: Vec<UnimplementedPanel>,
}
