//! View helpers for individual panels.
//!
//! Everything here is a pure function of a source value: stat formatting,
//! job listing filtering and the hiring history sparkline.

use crate::cli::JobsSort;
use serde_json::Value;
use std::cmp::Ordering;

/// Placeholder for a missing stat.
pub const MISSING: &str = "—";

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Format a loosely typed stat value for display.
pub fn stat(value: Option<&Value>) -> String {
    match value {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::Bool(b)) => if *b { "Yes" } else { "No" }.to_string(),
        _ => MISSING.to_string(),
    }
}

/// Read a string field, treating blanks as absent.
pub fn text<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// One job posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobListing {
    pub title: String,
    pub location: Option<String>,
}

impl JobListing {
    fn from_value(value: &Value) -> Option<Self> {
        Some(Self {
            title: text(value, "title")?.to_string(),
            location: text(value, "location").map(String::from),
        })
    }

    fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self
                .location
                .as_deref()
                .is_some_and(|l| l.to_lowercase().contains(needle))
    }
}

/// Parse postings, keep those matching `query` (title or location,
/// case-insensitive) and sort by title.
pub fn filter_listings(listings: &[Value], query: Option<&str>, sort: JobsSort) -> Vec<JobListing> {
    let needle = query.map(|q| q.trim().to_lowercase()).unwrap_or_default();

    let mut items: Vec<JobListing> = listings
        .iter()
        .filter_map(JobListing::from_value)
        .filter(|job| needle.is_empty() || job.matches(&needle))
        .collect();

    items.sort_by(|a, b| {
        let ord = a.title.to_lowercase().cmp(&b.title.to_lowercase());
        match sort {
            JobsSort::Az => ord,
            JobsSort::Za => ord.reverse(),
        }
    });

    items
}

/// Compact rendering of the hiring history.
#[derive(Debug, Clone, PartialEq)]
pub struct Sparkline {
    pub line: String,
    pub first_date: String,
    pub last_date: String,
    pub min: f64,
    pub max: f64,
}

/// Build a sparkline from `[{date, count}]` points, oldest first.
///
/// Points without a date or numeric count are skipped. Returns `None` when
/// nothing usable is left.
pub fn sparkline(history: &[Value]) -> Option<Sparkline> {
    let mut points: Vec<(&str, f64)> = history
        .iter()
        .filter_map(|p| Some((text(p, "date")?, p.get("count")?.as_f64()?)))
        .collect();

    if points.is_empty() {
        return None;
    }

    // ISO dates order lexicographically.
    points.sort_by(|a, b| a.0.cmp(b.0));

    let min = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let max = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    let range = if max - min > 0.0 { max - min } else { 1.0 };
    let top = (SPARK_LEVELS.len() - 1) as f64;

    let line = points
        .iter()
        .map(|(_, count)| {
            let level = (((count - min) / range) * top).round() as usize;
            SPARK_LEVELS[level.min(SPARK_LEVELS.len() - 1)]
        })
        .collect();

    Some(Sparkline {
        line,
        first_date: points[0].0.to_string(),
        last_date: points[points.len() - 1].0.to_string(),
        min,
        max,
    })
}

/// Score entries of a scorecard, highest first.
pub fn sorted_scores(scores: &Value) -> Vec<(String, f64)> {
    let Some(map) = scores.as_object() else {
        return Vec::new();
    };

    let mut entries: Vec<(String, f64)> = map
        .iter()
        .filter_map(|(k, v)| v.as_f64().map(|n| (k.clone(), n)))
        .collect();

    entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stat_formatting() {
        assert_eq!(stat(Some(&json!(12.5))), "12.5");
        assert_eq!(stat(Some(&json!("3.1T"))), "3.1T");
        assert_eq!(stat(Some(&json!(true))), "Yes");
        assert_eq!(stat(Some(&json!(null))), MISSING);
        assert_eq!(stat(Some(&json!(""))), MISSING);
        assert_eq!(stat(None), MISSING);
    }

    #[test]
    fn test_filter_listings_by_title_or_location() {
        let listings = vec![
            json!({"title": "Product Manager", "location": "NYC"}),
            json!({"title": "Data Analyst", "location": "Remote"}),
            json!({"title": "Backend Engineer", "location": "remote - US"}),
            json!({"location": "Nowhere"}),
        ];

        let remote = filter_listings(&listings, Some("REMOTE"), JobsSort::Az);
        let titles: Vec<_> = remote.iter().map(|j| j.title.as_str()).collect();
        assert_eq!(titles, vec!["Backend Engineer", "Data Analyst"]);

        let all = filter_listings(&listings, None, JobsSort::Za);
        let titles: Vec<_> = all.iter().map(|j| j.title.as_str()).collect();
        assert_eq!(titles, vec!["Product Manager", "Data Analyst", "Backend Engineer"]);
    }

    #[test]
    fn test_sparkline_sorts_by_date() {
        let history = vec![
            json!({"date": "2025-03-01", "count": 30}),
            json!({"date": "2025-01-01", "count": 10}),
            json!({"date": "2025-02-01", "count": 20}),
            json!({"date": "2025-04-01"}),
        ];

        let spark = sparkline(&history).unwrap();
        assert_eq!(spark.line, "▁▅█");
        assert_eq!(spark.first_date, "2025-01-01");
        assert_eq!(spark.last_date, "2025-03-01");
        assert_eq!(spark.min, 10.0);
        assert_eq!(spark.max, 30.0);
    }

    #[test]
    fn test_sparkline_flat_and_empty() {
        let flat = sparkline(&[json!({"date": "2025-01-01", "count": 4})]).unwrap();
        assert_eq!(flat.line, "▁");
        assert!(sparkline(&[]).is_none());
    }

    #[test]
    fn test_sorted_scores() {
        let scores = json!({"ethics": 55, "clout": 81, "innovation": 72, "note": "x"});
        let sorted = sorted_scores(&scores);
        assert_eq!(sorted.len(), 3);
        assert_eq!(sorted[0].0, "clout");
        assert_eq!(sorted[2].0, "ethics");
    }
}
