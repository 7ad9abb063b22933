//! Plain-text rendering of aggregated data.

use std::fmt::Write;

use yapd_core::utils::{format_number, format_percent, format_timestamp};
use yapd_core::{Config, HistoryPoint, Session, SummaryMetrics};

pub fn render_summary(summary: &SummaryMetrics) -> String {
    let rows = [
        ("Total queries", format_number(summary.total)),
        ("Blocked", format_number(summary.blocked)),
        ("% Blocked", format_percent(summary.percent_blocked)),
        ("Unique domains", format_number(summary.unique_domains)),
    ];
    let mut out = String::new();
    for (label, value) in rows {
        let _ = writeln!(out, "{:<16}{:>14}", label, value);
    }
    out
}

pub fn render_history(history: &[HistoryPoint]) -> String {
    if history.is_empty() {
        return "No history data.\n".to_string();
    }
    let mut out = format!(
        "{:<18}{:>10}{:>10}{:>10}{:>10}\n",
        "Time (UTC)", "Total", "Cached", "Blocked", "Forwarded"
    );
    for point in history {
        let _ = writeln!(
            out,
            "{:<18}{:>10}{:>10}{:>10}{:>10}",
            format_timestamp(point.timestamp),
            format_number(point.total),
            format_number(point.cached),
            format_number(point.blocked),
            format_number(point.forwarded),
        );
    }
    out
}

/// One line per endpoint. Tokens are never shown.
pub fn render_sessions(sessions: &[Session]) -> String {
    let mut out = String::new();
    for session in sessions {
        let _ = writeln!(
            out,
            "{}  connected {}",
            session.endpoint_url,
            session.obtained_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    out
}

pub fn render_config(config: &Config) -> String {
    format!(
        "request_timeout_secs    {}\naccept_invalid_certs    {}\ndashboard_unlock_hours  {}\n",
        config.request_timeout_secs, config.accept_invalid_certs, config.dashboard_unlock_hours
    )
}
