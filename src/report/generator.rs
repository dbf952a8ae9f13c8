//! Markdown and JSON report generation.
//!
//! The report is a pure function of the settled view model: one panel per
//! requested source, a muted line for sources that failed and a banner for
//! a global error.

use crate::cli::JobsSort;
use crate::models::{Report, ReportMetadata, SourceResult, UnimplementedPanel, ViewModel};
use crate::report::panels::{filter_listings, sorted_scores, sparkline, stat, text};
use anyhow::Result;
use serde_json::Value;

/// Rendering knobs that do not live on the view model.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub jobs_filter: Option<String>,
    pub jobs_sort: JobsSort,
    pub max_keywords: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            jobs_filter: None,
            jobs_sort: JobsSort::Az,
            max_keywords: 25,
        }
    }
}

/// Financial stats in display order.
const FINANCIAL_STATS: [(&str, &str); 10] = [
    ("price", "Price"),
    ("change_percent", "Δ %"),
    ("market_cap", "Mkt Cap"),
    ("pe", "P/E"),
    ("ps", "P/S"),
    ("pb", "P/B"),
    ("op_margin_pct", "Op Margin %"),
    ("net_margin_pct", "Net Margin %"),
    ("rev_growth_yoy", "Rev YoY %"),
    ("rev_ttm", "Rev TTM"),
];

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, options: &RenderOptions) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "# WhatchuCookin Report: {}\n\n",
        report.metadata.company
    ));

    if let Some(ref global) = report.view.global_error {
        output.push_str(&format!("> ⛔ **Error:** {}\n\n", global));
    }

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_status_section(
        &report.metadata.sources_requested,
        &report.view,
    ));

    for name in &report.metadata.sources_requested {
        output.push_str(&generate_source_section(name, &report.view, options));
    }

    output.push_str(&generate_placeholder_section(&report.placeholders));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Company:** {}\n", metadata.company));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **API:** `{}`\n", metadata.api_base));
    section.push_str(&format!(
        "- **Sources:** {} requested, {} ok",
        metadata.sources_requested.len(),
        metadata.sources_ok
    ));
    if metadata.sources_failed > 0 {
        section.push_str(&format!(", {} failed", metadata.sources_failed));
    }
    section.push('\n');
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n\n",
        metadata.duration_seconds
    ));

    section
}

/// Generate the per-source status table.
fn generate_status_section(names: &[String], view: &ViewModel) -> String {
    let mut section = String::new();

    section.push_str("## Sources\n\n");
    section.push_str("| Source | Status |\n");
    section.push_str("|:---|:---|\n");

    for name in names {
        let status = match view.get(name) {
            Some(SourceResult::Ok(_)) => "✅ ok".to_string(),
            Some(SourceResult::Error(kind)) => format!("❌ `{}`", kind),
            None => "⏳ no result".to_string(),
        };
        section.push_str(&format!("| {} | {} |\n", name, status));
    }
    section.push('\n');

    section
}

/// Section heading for a source.
fn source_heading(name: &str) -> String {
    let (emoji, title) = match name {
        "intel" => ("🔥", "What They're Cookin"),
        "scorecard" => ("🏅", "Scorecard"),
        "financials" => ("💵", "Financials"),
        "jobs" => ("💼", "Jobs"),
        "news" => ("📰", "News"),
        "events" => ("📅", "Events"),
        "roast" => ("🌶️", "Roast"),
        "gossip" => ("🤫", "Gossip"),
        _ => ("📦", name),
    };
    format!("## {} {}\n\n", emoji, title)
}

/// Generate the panel for one source.
fn generate_source_section(name: &str, view: &ViewModel, options: &RenderOptions) -> String {
    let mut section = source_heading(name);

    let body = match view.get(name) {
        Some(SourceResult::Ok(value)) => match name {
            "intel" => render_text(value, "No data"),
            "scorecard" => render_scorecard(value),
            "financials" => render_financials(value),
            "jobs" => render_jobs(value, options),
            "news" => render_news(value),
            "events" => render_events(value),
            "roast" | "gossip" => render_quote(value),
            _ => render_raw(value),
        },
        Some(SourceResult::Error(kind)) => format!("_No data ({})_\n\n", kind),
        None => "_No data_\n\n".to_string(),
    };

    section.push_str(&body);
    section
}

fn render_text(value: &Value, empty: &str) -> String {
    match value.as_str().map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => format!("{}\n\n", s),
        None => format!("_{}_\n\n", empty),
    }
}

fn render_quote(value: &Value) -> String {
    match value.as_str().map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => {
            let quoted: Vec<String> = s.lines().map(|l| format!("> {}", l)).collect();
            format!("{}\n\n", quoted.join("\n"))
        }
        None => "_Nothing to spill_\n\n".to_string(),
    }
}

fn render_raw(value: &Value) -> String {
    let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    format!("```json\n{}\n```\n\n", pretty)
}

fn render_scorecard(value: &Value) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "**Composite:** {}\n\n",
        stat(value.get("composite"))
    ));

    let scores = value.get("scores").map(sorted_scores).unwrap_or_default();
    if !scores.is_empty() {
        out.push_str("| Metric | Score |\n");
        out.push_str("|:---|:---:|\n");
        for (metric, score) in scores {
            out.push_str(&format!("| {} | {} |\n", metric, score));
        }
        out.push('\n');
    }

    if let Some(note) = text(value, "explanation").or_else(|| text(value, "summary")) {
        out.push_str(&format!("{}\n\n", note));
    }

    out
}

fn render_financials(value: &Value) -> String {
    if !value.is_object() {
        return "_No data_\n\n".to_string();
    }

    let mut out = String::new();
    let header: Vec<&str> = FINANCIAL_STATS.iter().map(|(_, label)| *label).collect();
    let cells: Vec<String> = FINANCIAL_STATS
        .iter()
        .map(|(key, _)| stat(value.get(*key)))
        .collect();

    out.push_str(&format!("| {} |\n", header.join(" | ")));
    out.push_str(&format!("|{}\n", ":---:|".repeat(header.len())));
    out.push_str(&format!("| {} |\n\n", cells.join(" | ")));

    out
}

fn render_jobs(value: &Value, options: &RenderOptions) -> String {
    if !value.is_object() {
        return "_No jobs_\n\n".to_string();
    }

    let mut out = String::new();

    let locations: Vec<&str> = value
        .get("locations")
        .and_then(Value::as_array)
        .map(|l| l.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let remote_only = value
        .get("remote_only")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    out.push_str("### Overview\n\n");
    out.push_str(&format!("- **Open Roles:** {}\n", stat(value.get("job_count"))));
    out.push_str(&format!("- **Locations:** {}\n", locations.len()));
    out.push_str(&format!(
        "- **Remote Only:** {}\n\n",
        if remote_only { "Yes" } else { "No" }
    ));

    let keywords: Vec<String> = value
        .get("sample_keywords")
        .and_then(Value::as_array)
        .map(|k| {
            k.iter()
                .filter_map(Value::as_str)
                .take(options.max_keywords)
                .map(|kw| format!("`{}`", kw))
                .collect()
        })
        .unwrap_or_default();
    if keywords.is_empty() {
        out.push_str("_No keyword signals yet._\n\n");
    } else {
        out.push_str(&format!("{}\n\n", keywords.join(" ")));
    }

    if !locations.is_empty() {
        let top: Vec<&str> = locations.iter().take(5).copied().collect();
        out.push_str(&format!("Top locations: {}\n\n", top.join(", ")));
    }

    if let Some(history) = value.get("history").and_then(Value::as_array) {
        match sparkline(history) {
            Some(spark) => out.push_str(&format!(
                "Hiring trend: `{}` {} → {} (min {}, max {})\n\n",
                spark.line, spark.first_date, spark.last_date, spark.min, spark.max
            )),
            None => out.push_str("_No history yet._\n\n"),
        }
    }

    let listings: &[Value] = value
        .get("listings")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    let shown = filter_listings(listings, options.jobs_filter.as_deref(), options.jobs_sort);

    out.push_str("### Listings\n\n");
    out.push_str(&format!("*{} / {} shown*\n\n", shown.len(), listings.len()));

    if shown.is_empty() {
        out.push_str("_No matching roles._\n\n");
    } else {
        for job in &shown {
            match job.location {
                Some(ref location) => out.push_str(&format!("- **{}** ({})\n", job.title, location)),
                None => out.push_str(&format!("- **{}**\n", job.title)),
            }
        }
        out.push('\n');
    }

    out
}

fn render_news(value: &Value) -> String {
    let items = value.as_array().map(Vec::as_slice).unwrap_or(&[]);
    if items.is_empty() {
        return "_No news_\n\n".to_string();
    }

    let mut out = String::new();
    for item in items {
        let title = text(item, "title").unwrap_or("Untitled");
        let headline = match text(item, "url").or_else(|| text(item, "link")) {
            Some(url) => format!("[{}]({})", title, url),
            None => title.to_string(),
        };
        let source = text(item, "source").unwrap_or("Source");

        out.push_str(&format!("- {}\n  *{}", headline, source));
        if let Some(published) = text(item, "published_at") {
            out.push_str(&format!(" • {}", published));
        }
        out.push_str("*\n");
    }
    out.push('\n');

    out
}

fn render_events(value: &Value) -> String {
    let items = value.as_array().map(Vec::as_slice).unwrap_or(&[]);
    if items.is_empty() {
        return "_No upcoming events_\n\n".to_string();
    }

    let mut out = String::new();
    for item in items {
        let name = text(item, "name").unwrap_or("Event");
        out.push_str(&format!("- **{}**", name));
        if let Some(date) = text(item, "date") {
            out.push_str(&format!(" {}", date));
        }
        if let Some(location) = text(item, "location") {
            out.push_str(&format!(" • {}", location));
        }
        out.push('\n');
    }
    out.push('\n');

    out
}

/// Generate the not-yet-implemented panels.
fn generate_placeholder_section(panels: &[UnimplementedPanel]) -> String {
    if panels.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Coming Soon\n\n");
    for panel in panels {
        section.push_str(&format!(
            "- {} **{}**: not yet implemented\n",
            panel.emoji(),
            panel
        ));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by WhatchuCookin*\n");

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ErrorKind, Query};
    use chrono::Utc;
    use serde_json::json;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn create_test_report(view: ViewModel, requested: &[&str]) -> Report {
        let metadata = ReportMetadata {
            company: "NVDA".to_string(),
            generated_at: Utc::now(),
            api_base: "http://localhost:8000".to_string(),
            sources_requested: names(requested),
            sources_ok: view.ok_count(),
            sources_failed: view.failed_count(),
            duration_seconds: 1.2,
        };

        Report {
            metadata,
            view,
            placeholders: UnimplementedPanel::ALL.to_vec(),
        }
    }

    fn settled_view() -> ViewModel {
        ViewModel::loading(Query::parse("NVDA").unwrap(), 1)
            .with_result("intel", SourceResult::Ok(json!("Shipping Blackwell at scale.")))
            .with_result(
                "scorecard",
                SourceResult::Ok(json!({
                    "composite": 71.5,
                    "scores": {"innovation": 72, "ethics": 55, "clout": 81},
                    "summary": "solid innovation momentum"
                })),
            )
            .with_result("financials", SourceResult::Ok(json!({"price": 120.5, "pe": null})))
            .with_result("jobs", SourceResult::Error(ErrorKind::Http(500)))
            .with_result(
                "news",
                SourceResult::Ok(json!([
                    {"title": "Earnings beat", "source": "Reuters", "url": "https://example.com/a"}
                ])),
            )
            .with_result("events", SourceResult::Ok(json!([])))
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report(
            settled_view(),
            &["intel", "scorecard", "financials", "jobs", "news", "events"],
        );
        let markdown = generate_markdown_report(&report, &RenderOptions::default());

        assert!(markdown.contains("# WhatchuCookin Report: NVDA"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("5 ok, 1 failed"));
        assert!(markdown.contains("Shipping Blackwell at scale."));
        assert!(markdown.contains("**Composite:** 71.5"));
        assert!(markdown.contains("| clout | 81 |"));
        assert!(markdown.contains("_No data (http_500)_"));
        assert!(markdown.contains("[Earnings beat](https://example.com/a)"));
        assert!(markdown.contains("_No upcoming events_"));
        assert!(markdown.contains("Ask AI"));
        assert!(!markdown.contains("⛔"));
    }

    #[test]
    fn test_global_error_banner() {
        let view = ViewModel::loading(Query::parse("NVDA").unwrap(), 1)
            .with_global_error("invalid API base URL");
        let report = create_test_report(view, &["intel"]);
        let markdown = generate_markdown_report(&report, &RenderOptions::default());

        assert!(markdown.contains("⛔ **Error:** invalid API base URL"));
        assert!(markdown.contains("⏳ no result"));
    }

    #[test]
    fn test_financials_missing_values() {
        let out = render_financials(&json!({"price": 120.5, "pe": null}));
        assert!(out.contains("Price"));
        assert!(out.contains("120.5"));
        assert!(out.contains("—"));
    }

    #[test]
    fn test_jobs_panel_filter_and_count() {
        let jobs = json!({
            "job_count": 3,
            "locations": ["NYC", "Remote"],
            "sample_keywords": ["cuda", "ml", "rust"],
            "listings": [
                {"title": "Product Manager", "location": "NYC"},
                {"title": "Data Analyst", "location": "Remote"},
                {"title": "ML Engineer", "location": "Remote"}
            ],
            "history": [
                {"date": "2025-01-01", "count": 1},
                {"date": "2025-02-01", "count": 3}
            ]
        });
        let options = RenderOptions {
            jobs_filter: Some("remote".to_string()),
            jobs_sort: JobsSort::Za,
            max_keywords: 2,
        };

        let out = render_jobs(&jobs, &options);

        assert!(out.contains("**Open Roles:** 3"));
        assert!(out.contains("*2 / 3 shown*"));
        assert!(out.contains("`cuda` `ml`"));
        assert!(!out.contains("`rust`"));
        assert!(!out.contains("Product Manager"));
        let ml = out.find("ML Engineer").unwrap();
        let analyst = out.find("Data Analyst").unwrap();
        assert!(ml < analyst);
        assert!(out.contains("Hiring trend: `▁█`"));
    }

    #[test]
    fn test_unknown_source_renders_raw_json() {
        let view = ViewModel::loading(Query::parse("NVDA").unwrap(), 1)
            .with_result("weather", SourceResult::Ok(json!({"sunny": true})));
        let section = generate_source_section("weather", &view, &RenderOptions::default());

        assert!(section.contains("## 📦 weather"));
        assert!(section.contains("```json"));
        assert!(section.contains("\"sunny\": true"));
    }

    #[test]
    fn test_roast_renders_as_quote() {
        let out = render_quote(&json!("line one\nline two"));
        assert_eq!(out, "> line one\n> line two\n\n");
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report(settled_view(), &["intel", "jobs"]);
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"metadata\""));
        assert!(json.contains("\"sources_requested\""));
        assert!(json.contains("\"error\": \"http_500\""));
        assert!(json.contains("\"peer_compare\""));
    }
}
