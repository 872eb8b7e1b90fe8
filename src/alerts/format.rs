// Text and embed rendering for alerts.

use crate::models::{AlertEvent, RankedProcess, Ranking};
use chrono::{TimeZone, Utc};

const ALERT_COLOR: u32 = 0xE67E22;
const MAX_NAME_CHARS: usize = 32;

/// `▰▰▰▱▱…` bar of `length` cells for a 0..=100 percentage.
pub fn usage_bar(pct: f64, length: usize) -> String {
    let filled = ((length as f64 * pct / 100.0).round().max(0.0) as usize).min(length);
    "▰".repeat(filled) + &"▱".repeat(length - filled)
}

/// One markdown line of a ranked list, e.g. `` ` 1.` **stress**   48.2%  • PID `812` ``.
pub fn format_proc_line(index: usize, p: &RankedProcess) -> String {
    let name: String = p.name.chars().take(MAX_NAME_CHARS).collect();
    let pct = format!("{:.1}%", p.cpu_pct);
    format!("`{index:>2}.` **{name}**  {pct:>6}  • PID `{}`", p.pid)
}

/// Compact one-line form for logs: `stress(812) 48.2%, ...`.
pub fn top_summary(ranking: &Ranking) -> String {
    ranking
        .entries
        .iter()
        .map(|p| format!("{}({}) {:.1}%", p.name, p.pid, p.cpu_pct))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn iso_timestamp(ms: u64) -> String {
    Utc.timestamp_millis_opt(ms as i64)
        .single()
        .map(|t| t.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_default()
}

/// Webhook body: `{"embeds": [{title, description, color, footer}]}`.
pub fn alert_payload(event: &AlertEvent, footer: &str) -> serde_json::Value {
    let lines: Vec<String> = event
        .top
        .entries
        .iter()
        .enumerate()
        .map(|(i, p)| format_proc_line(i + 1, p))
        .collect();
    let description = format!(
        "**High CPU detected:** `{:.1}%`  [{}]\n**RAM:** `{:.1}%`\n\n**Top {} processes:**\n{}\n\nRequest a fresh top list to terminate one by index.",
        event.total_cpu_pct,
        usage_bar(event.total_cpu_pct, 20),
        event.total_mem_pct,
        lines.len(),
        lines.join("\n"),
    );
    serde_json::json!({
        "embeds": [{
            "title": "Host CPU Alert",
            "description": description,
            "color": ALERT_COLOR,
            "footer": { "text": format!("{} • {}", footer, iso_timestamp(event.timestamp)) },
        }]
    })
}
