//! Report generation: one dashboard image plus one HTML document per
//! profile.
//!
//! Both templates read from the same `EngagementSummary`. The HTML is
//! built in memory and the chart is drawn into a staging file; nothing
//! lands under its final name until both exist.

use crate::{
    analysis::{summarize, EngagementSummary, GroupStats},
    chart::render_dashboard,
    config::{ReportProfile, ReportTemplate},
    dataset::Dataset,
    error::EngagementResult,
    store::OutputStore,
};
use std::{fmt::Write, path::PathBuf};

const TABLES_CSS: &str = "\
body { font-family: Arial, sans-serif; margin: 40px; }
.header { background: #2E86AB; color: white; padding: 20px; border-radius: 10px; }
.section { margin: 25px 0; padding: 20px; background: #f8f9fa; border-radius: 8px; }
.kpi-grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(200px, 1fr)); gap: 15px; margin: 20px 0; }
.kpi-card { background: white; padding: 15px; border-radius: 6px; text-align: center; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }
.kpi-value { font-size: 24px; font-weight: bold; color: #2E86AB; }
.alert { background: #ffeaa7; padding: 15px; border-radius: 6px; margin: 10px 0; }
table { width: 100%; border-collapse: collapse; margin: 15px 0; }
th, td { padding: 10px; text-align: left; border-bottom: 1px solid #ddd; }
th { background: #2E86AB; color: white; }
.footer { text-align: center; color: #7f8c8d; margin-top: 40px; padding-top: 20px; border-top: 1px solid #ecf0f1; }";

const CARDS_CSS: &str = "\
body { font-family: Arial, sans-serif; margin: 40px; line-height: 1.6; }
.header { background: linear-gradient(135deg, #2E86AB, #A23B72); color: white; padding: 30px; border-radius: 10px; text-align: center; }
.kpi-container { display: flex; justify-content: space-between; margin: 30px 0; flex-wrap: wrap; }
.kpi-box { background: #f8f9fa; padding: 20px; border-radius: 10px; text-align: center; flex: 1; margin: 10px; min-width: 200px; border-left: 4px solid #2E86AB; }
.kpi-value { font-size: 28px; font-weight: bold; color: #2E86AB; margin: 10px 0; }
.insight { background: #e8f5e8; padding: 20px; border-radius: 8px; margin: 20px 0; border-left: 4px solid #27ae60; }
.alert { background: #ffeaa7; padding: 20px; border-radius: 8px; margin: 20px 0; border-left: 4px solid #f39c12; }
.recommendation { background: #e3f2fd; padding: 20px; border-radius: 8px; margin: 20px 0; border-left: 4px solid #1976d2; }
.section { margin: 30px 0; }
h2 { color: #2c3e50; border-bottom: 2px solid #ecf0f1; padding-bottom: 10px; }
.metric-grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(250px, 1fr)); gap: 15px; }
.metric-card { background: white; padding: 15px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }
.footer { text-align: center; color: #7f8c8d; margin-top: 40px; padding-top: 20px; border-top: 1px solid #ecf0f1; }";

/// Result of one profile run.
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub profile: String,
    pub image_path: PathBuf,
    pub html_path: PathBuf,
    pub summary: EngagementSummary,
}

/// Summarize `dataset`, draw the dashboard and write the HTML page.
pub fn generate_report(
    dataset: &Dataset,
    profile: &ReportProfile,
    store: &OutputStore,
) -> EngagementResult<ReportOutcome> {
    profile.validate()?;
    let summary = summarize(dataset)?;
    let generated_at = chrono::Local::now().format("%Y-%m-%d %H:%M").to_string();
    let html = render_html(&summary, profile, &generated_at);

    let mut staging = store.begin();
    let image_stage = staging.reserve(&profile.image_file);
    render_dashboard(dataset, &summary, profile, &image_stage)?;
    staging.stage_bytes(&profile.html_file, html.as_bytes())?;
    staging.commit()?;

    log::info!(
        "report[{}]: {} records, retention {:.1}%",
        profile.name,
        summary.kpis.total_records,
        summary.kpis.retention_pct
    );
    Ok(ReportOutcome {
        profile: profile.name.clone(),
        image_path: store.path_for(&profile.image_file),
        html_path: store.path_for(&profile.html_file),
        summary,
    })
}

pub fn render_html(summary: &EngagementSummary, profile: &ReportProfile, generated_at: &str) -> String {
    match profile.template {
        ReportTemplate::Tables => render_tables(summary, profile, generated_at),
        ReportTemplate::Cards => render_cards(summary, profile, generated_at),
    }
}

// ── Formatting helpers ───────────────────────────────────────────────

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn pct(v: Option<f64>) -> String {
    v.map_or_else(|| "n/a".into(), |v| format!("{v:.1}%"))
}

fn signed_pct(v: Option<f64>) -> String {
    v.map_or_else(|| "n/a".into(), |v| format!("{v:+.1}%"))
}

fn secs(v: Option<f64>) -> String {
    v.map_or_else(|| "n/a".into(), |v| format!("{v:.0}s"))
}

fn signed_secs(v: Option<f64>) -> String {
    v.map_or_else(|| "n/a".into(), |v| format!("{v:+.0}s"))
}

fn one_dp(v: Option<f64>) -> String {
    v.map_or_else(|| "n/a".into(), |v| format!("{v:.1}"))
}

fn signed_one_dp(v: Option<f64>) -> String {
    v.map_or_else(|| "n/a".into(), |v| format!("{v:+.1}"))
}

fn group_name(g: &Option<GroupStats>) -> String {
    g.as_ref().map_or_else(|| "n/a".into(), |g| escape_html(&g.key))
}

fn group_pct(g: &Option<GroupStats>) -> String {
    pct(g.as_ref().map(|g| g.retention_pct))
}

/// The version to roll out. `None` unless both versions were observed.
fn winning_version(summary: &EngagementSummary) -> Option<(&'static str, &'static str, f64)> {
    summary.ab.retention_delta.map(|d| {
        if d >= 0.0 {
            ("A", "B", d)
        } else {
            ("B", "A", -d)
        }
    })
}

fn ab_headline(summary: &EngagementSummary) -> String {
    match winning_version(summary) {
        Some((win, lose, d)) => {
            format!("Feature {win} outperforms Feature {lose} by {d:.1}% in user retention")
        }
        None => "A/B comparison unavailable: only one feature version present".into(),
    }
}

fn recommendations(summary: &EngagementSummary) -> String {
    let rollout = match winning_version(summary) {
        Some((win, _, d)) => format!(
            "<li><strong>Immediate Rollout:</strong> Deploy Feature {win} to all users (+{d:.1}% retention gain)</li>"
        ),
        None => "<li><strong>Immediate Rollout:</strong> Collect data on both feature versions first</li>".into(),
    };
    format!(
        "{rollout}
<li><strong>Targeted Intervention:</strong> Create re-engagement campaign for {low} low-engagement records</li>
<li><strong>Network Optimization:</strong> Focus on improving {worst} network performance</li>
<li><strong>Device Strategy:</strong> Optimize experience for {device} users while addressing gaps in other platforms</li>
<li><strong>Demographic Focus:</strong> Develop content tailored for the {age} age group ({age_pct} retention)</li>",
        low = summary.segments.low.count,
        worst = group_name(&summary.worst_network),
        device = group_name(&summary.best_device),
        age = group_name(&summary.best_age_group),
        age_pct = group_pct(&summary.best_age_group),
    )
}

fn image_tag(profile: &ReportProfile) -> String {
    format!(
        r#"<img src="{}" alt="{} charts" style="width: 100%; border: 1px solid #ddd; border-radius: 8px;">"#,
        escape_html(&profile.image_file),
        escape_html(&profile.title)
    )
}

fn rows<F>(groups: &[GroupStats], row: F) -> String
where
    F: Fn(&GroupStats) -> String,
{
    groups.iter().fold(String::new(), |mut out, g| {
        let _ = writeln!(out, "{}", row(g));
        out
    })
}

fn count_rows(groups: &[GroupStats]) -> String {
    rows(groups, |g| {
        format!(
            "<tr><td>{}</td><td>{:.1}%</td><td>{}</td></tr>",
            escape_html(&g.key),
            g.retention_pct,
            g.records
        )
    })
}

fn version_stat(g: &Option<GroupStats>, f: fn(&GroupStats) -> f64) -> Option<f64> {
    g.as_ref().map(f)
}

// ── Templates ────────────────────────────────────────────────────────

fn render_tables(s: &EngagementSummary, profile: &ReportProfile, generated_at: &str) -> String {
    let k = &s.kpis;
    let ab = &s.ab;
    let seg = &s.segments;

    let network_rows = rows(&s.by_network, |g| {
        format!(
            "<tr><td>{}</td><td>{:.1}%</td><td>{:.0}s</td><td>{:.1}</td></tr>",
            escape_html(&g.key),
            g.retention_pct,
            g.avg_session,
            g.avg_clicks
        )
    });
    let device_rows = rows(&s.by_device, |g| {
        format!(
            "<tr><td>{}</td><td>{:.1}%</td><td>{:.0}s</td></tr>",
            escape_html(&g.key),
            g.retention_pct,
            g.avg_session
        )
    });
    let age_rows = count_rows(&s.by_age_group);
    let location_rows = count_rows(&s.top_locations);

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
{css}
</style>
</head>
<body>
<div class="header">
<h1>{title}</h1>
<p>Generated: {generated_at} | Users: {users} | Records: {records}</p>
</div>

<div class="section">
<h2>Executive Summary</h2>
<div class="kpi-grid">
<div class="kpi-card"><div class="kpi-value">{retention:.1}%</div><div>Overall Retention</div></div>
<div class="kpi-card"><div class="kpi-value">{session:.0}s</div><div>Avg Session</div></div>
<div class="kpi-card"><div class="kpi-value">{clicks:.1}</div><div>Avg Clicks</div></div>
<div class="kpi-card"><div class="kpi-value">{feedback}/5</div><div>Avg Feedback</div></div>
</div>
</div>

<div class="alert">
<h3>Critical Business Insight</h3>
<p><strong>{headline}</strong></p>
<p>Feature A: {a_ret} vs Feature B: {b_ret}</p>
</div>

<div class="section">
<h2>Performance Analysis</h2>
<h3>Feature A/B Test Results</h3>
<table>
<tr><th>Metric</th><th>Feature A</th><th>Feature B</th><th>Difference</th></tr>
<tr><td>Retention Rate</td><td>{a_ret}</td><td>{b_ret}</td><td>{d_ret}</td></tr>
<tr><td>Avg Session Duration</td><td>{a_ses}</td><td>{b_ses}</td><td>{d_ses}</td></tr>
<tr><td>Avg Clicks</td><td>{a_clk}</td><td>{b_clk}</td><td>{d_clk}</td></tr>
</table>
<h3>Network Performance</h3>
<table>
<tr><th>Network</th><th>Retention Rate</th><th>Avg Session</th><th>Avg Clicks</th></tr>
{network_rows}</table>
<h3>Device Performance</h3>
<table>
<tr><th>Device</th><th>Retention Rate</th><th>Avg Session</th></tr>
{device_rows}</table>
</div>

<div class="section">
<h2>User Segmentation</h2>
<h3>Age Group Performance</h3>
<table>
<tr><th>Age Group</th><th>Retention Rate</th><th>Records</th></tr>
{age_rows}</table>
<h3>Engagement Segments</h3>
<table>
<tr><th>Segment</th><th>Records</th><th>Retention Rate</th><th>Description</th></tr>
<tr><td>High Engagement</td><td>{high_n}</td><td>{high_ret}</td><td>5+ clicks and 300s+ sessions</td></tr>
<tr><td>Low Engagement</td><td>{low_n}</td><td>{low_ret}</td><td>Under 3 clicks or under 150s sessions</td></tr>
<tr><td>At Risk</td><td>{risk_n}</td><td>{risk_ret}</td><td>Low engagement and not retained</td></tr>
</table>
<h3>Top Performing Locations</h3>
<table>
<tr><th>Location</th><th>Retention Rate</th><th>Records</th></tr>
{location_rows}</table>
</div>

<div class="section">
<h3>Strategic Recommendations</h3>
<ol>
{recommendations}
</ol>
</div>

<div class="section">
<h2>Complete Analysis Visualization</h2>
{image}
</div>

<div class="footer">
<p>Complete analysis of {users} users across {records} engagement sessions</p>
</div>
</body>
</html>
"#,
        title = escape_html(&profile.title),
        css = TABLES_CSS,
        users = k.unique_users,
        records = k.total_records,
        retention = k.retention_pct,
        session = k.avg_session,
        clicks = k.avg_clicks,
        feedback = one_dp(k.avg_feedback),
        headline = ab_headline(s),
        a_ret = pct(version_stat(&ab.a, |g| g.retention_pct)),
        b_ret = pct(version_stat(&ab.b, |g| g.retention_pct)),
        d_ret = signed_pct(ab.retention_delta),
        a_ses = secs(version_stat(&ab.a, |g| g.avg_session)),
        b_ses = secs(version_stat(&ab.b, |g| g.avg_session)),
        d_ses = signed_secs(ab.session_delta),
        a_clk = one_dp(version_stat(&ab.a, |g| g.avg_clicks)),
        b_clk = one_dp(version_stat(&ab.b, |g| g.avg_clicks)),
        d_clk = signed_one_dp(ab.clicks_delta),
        high_n = seg.high.count,
        high_ret = pct(seg.high.retention_pct),
        low_n = seg.low.count,
        low_ret = pct(seg.low.retention_pct),
        risk_n = seg.at_risk.count,
        risk_ret = pct(seg.at_risk.retention_pct),
        recommendations = recommendations(s),
        image = image_tag(profile),
    )
}

fn render_cards(s: &EngagementSummary, profile: &ReportProfile, generated_at: &str) -> String {
    let k = &s.kpis;
    let ab = &s.ab;
    let seg = &s.segments;

    let all_networks = s
        .by_network
        .iter()
        .map(|g| format!("{}: {:.1}%", escape_html(&g.key), g.retention_pct))
        .collect::<Vec<_>>()
        .join(", ");
    let device_lines = rows(&s.by_device, |g| {
        format!("<p>{}: {:.1}%</p>", escape_html(&g.key), g.retention_pct)
    });

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
{css}
</style>
</head>
<body>
<div class="header">
<h1>{title}</h1>
<p>Comprehensive analysis of {users} users | Generated: {generated_at}</p>
</div>

<div class="kpi-container">
<div class="kpi-box"><div class="kpi-value">{retention:.1}%</div><div>Overall Retention Rate</div></div>
<div class="kpi-box"><div class="kpi-value">{session:.0}s</div><div>Average Session Duration</div></div>
<div class="kpi-box"><div class="kpi-value">{clicks:.1}</div><div>Average Clicks per Session</div></div>
<div class="kpi-box"><div class="kpi-value">{feedback}/5</div><div>Average Feedback Score</div></div>
</div>

<div class="alert">
<h3>Key Business Impact</h3>
<p><strong>{headline}</strong></p>
<p><strong>{low_n} records ({low_share:.1}%) show low engagement</strong>, a high risk of churn</p>
</div>

<div class="section">
<h2>Performance Metrics</h2>
<div class="metric-grid">
<div class="metric-card">
<h4>Feature A/B Test</h4>
<p>Version A: <strong>{a_ret}</strong> retention</p>
<p>Version B: <strong>{b_ret}</strong> retention</p>
<p>Difference: <strong>{d_ret}</strong></p>
</div>
<div class="metric-card">
<h4>Network Performance</h4>
<p>Best: <strong>{best_net}</strong> ({best_net_pct})</p>
<p>All networks: {all_networks}</p>
</div>
<div class="metric-card">
<h4>Device Performance</h4>
<p>Best: <strong>{best_dev}</strong> ({best_dev_pct})</p>
{device_lines}</div>
<div class="metric-card">
<h4>Engagement Segments</h4>
<p>High engagement: <strong>{high_ret}</strong> retention</p>
<p>Low engagement: <strong>{low_ret}</strong> retention</p>
<p>Engagement gap: <strong>{gap}</strong></p>
</div>
</div>
</div>

<div class="recommendation">
<h3>Strategic Recommendations</h3>
<ol>
{recommendations}
</ol>
</div>

<div class="insight">
<h3>Key Insights</h3>
<ul>
<li>High-engagement sessions (5+ clicks, 300s+) retain at {high_ret}</li>
<li>At-risk records (low engagement, not retained): {risk_n}</li>
<li>{best_net} network users show the highest retention</li>
</ul>
</div>

<h2>Analysis Visualization</h2>
{image}

<div class="footer">
<p>Report generated automatically from user engagement data | {users} users analyzed</p>
</div>
</body>
</html>
"#,
        title = escape_html(&profile.title),
        css = CARDS_CSS,
        users = k.unique_users,
        retention = k.retention_pct,
        session = k.avg_session,
        clicks = k.avg_clicks,
        feedback = one_dp(k.avg_feedback),
        headline = ab_headline(s),
        low_n = seg.low.count,
        low_share = seg.low_share_pct,
        a_ret = group_pct(&ab.a),
        b_ret = group_pct(&ab.b),
        d_ret = signed_pct(ab.retention_delta),
        best_net = group_name(&s.best_network),
        best_net_pct = group_pct(&s.best_network),
        best_dev = group_name(&s.best_device),
        best_dev_pct = group_pct(&s.best_device),
        high_ret = pct(seg.high.retention_pct),
        low_ret = pct(seg.low.retention_pct),
        gap = signed_pct(seg.retention_gap),
        risk_n = seg.at_risk.count,
        recommendations = recommendations(s),
        image = image_tag(profile),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_covers_markup_characters() {
        assert_eq!(escape_html("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn missing_values_render_as_na() {
        assert_eq!(pct(None), "n/a");
        assert_eq!(pct(Some(75.0)), "75.0%");
        assert_eq!(signed_pct(Some(-2.24)), "-2.2%");
        assert_eq!(signed_secs(Some(12.4)), "+12s");
    }
}
