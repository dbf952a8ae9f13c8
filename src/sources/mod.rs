//! Source definitions and the default catalog.
//!
//! A source is one backend endpoint providing one category of company
//! data. Each source is requested with the same JSON body and resolved
//! independently of its siblings.

pub mod projection;

pub use projection::{Fallback, Projection};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One backend endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Slot name in the view model (e.g. "intel").
    pub name: String,

    /// Path relative to the API base (e.g. "/companies/intel").
    pub path: String,

    /// Field extraction applied to the parsed body.
    #[serde(flatten)]
    pub projection: Projection,

    /// Whether the source is part of the default cycle.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Source {
    pub fn new(name: &str, path: &str, projection: Projection) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            projection,
            enabled: true,
        }
    }

    fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Built-in catalog. Roast and gossip are opt-in.
pub fn default_catalog() -> Vec<Source> {
    vec![
        Source::new(
            "intel",
            "/companies/intel",
            Projection::pick("what_they_cookin", Fallback::Null),
        ),
        Source::new("scorecard", "/companies/scorecard-real", Projection::identity()),
        Source::new("financials", "/companies/financials", Projection::identity()),
        Source::new("jobs", "/companies/jobs", Projection::identity()),
        Source::new(
            "news",
            "/companies/news",
            Projection::pick("news", Fallback::EmptyList),
        ),
        Source::new(
            "events",
            "/companies/events",
            Projection::pick("events", Fallback::EmptyList),
        ),
        Source::new("roast", "/roast", Projection::pick("roast.roast", Fallback::Null)).disabled(),
        Source::new(
            "gossip",
            "/gossip/gossip",
            Projection::pick("gossip", Fallback::Null),
        )
        .disabled(),
    ]
}

/// Reject catalogs with blank or duplicate names or blank paths.
pub fn validate_catalog(catalog: &[Source]) -> Result<()> {
    let mut seen = HashSet::new();

    for source in catalog {
        if source.name.trim().is_empty() {
            bail!("Source name must not be empty (path: {})", source.path);
        }
        if source.path.trim().is_empty() {
            bail!("Source '{}' has an empty path", source.name);
        }
        if !seen.insert(source.name.as_str()) {
            bail!("Duplicate source name: {}", source.name);
        }
    }

    Ok(())
}

/// Pick the sources for a cycle.
///
/// With no explicit selection the enabled sources are used. An explicit
/// selection may name disabled sources and keeps the requested order.
pub fn select_sources(catalog: &[Source], selection: Option<&[String]>) -> Result<Vec<Source>> {
    let Some(names) = selection else {
        return Ok(catalog.iter().filter(|s| s.enabled).cloned().collect());
    };

    let mut selected: Vec<Source> = Vec::with_capacity(names.len());
    for name in names {
        let name = name.trim();
        if name.is_empty() || selected.iter().any(|s| s.name == name) {
            continue;
        }
        match catalog.iter().find(|s| s.name == name) {
            Some(source) => selected.push(source.clone()),
            None => {
                let known: Vec<&str> = catalog.iter().map(|s| s.name.as_str()).collect();
                bail!("Unknown source '{}' (known: {})", name, known.join(", "));
            }
        }
    }

    if selected.is_empty() {
        bail!("Source selection is empty");
    }

    Ok(selected)
}
