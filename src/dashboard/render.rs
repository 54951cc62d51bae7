//! HTMX partial renderers.
//!
//! Every value that came from the upstream API is escaped before it is
//! interpolated.

use crate::log_groups::{CycleGroup, RunGroup};
use crate::log_queue::FeedSnapshot;
use crate::types::{LogEntry, LogTag, PerformanceMetrics, PoolSnapshot, Trade};
use chrono::{DateTime, NaiveDate};

/// Simple HTML escaping to prevent XSS
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Badge class for a log tag; unknown tags get the neutral fallback
pub fn tag_class(tag: &LogTag) -> &'static str {
    match tag {
        LogTag::BuyTxConfirmed => "tag tag-buy",
        LogTag::SellTxConfirmed => "tag tag-sell",
        LogTag::RugValidation => "tag tag-rug",
        LogTag::TelegramAiTokenAnalysis => "tag tag-telegram",
        LogTag::Other(_) => "tag tag-other",
    }
}

fn level_class(level: &str) -> &'static str {
    match level.to_lowercase().as_str() {
        "error" => "level-error",
        "warning" | "warn" => "level-warning",
        "success" => "level-success",
        _ => "level-info",
    }
}

fn render_tag(tag: Option<&LogTag>) -> String {
    match tag {
        Some(tag) => format!(
            r#"<span class="{}" title="{}">{}</span>"#,
            tag_class(tag),
            html_escape(tag.description()),
            html_escape(tag.as_str())
        ),
        None => String::new(),
    }
}

pub fn render_error_box(message: &str) -> String {
    format!(
        r#"<div class="error-box" role="alert">{}</div>"#,
        html_escape(message)
    )
}

// ============================================================================
// LIVE FEED
// ============================================================================

fn render_feed_entry(entry: &LogEntry, blinking: bool) -> String {
    let blink = if blinking { " blink" } else { "" };
    format!(
        r#"<li class="feed-entry {}{}" data-id="{}">
    <span class="feed-time">{} {}</span>
    <span class="feed-origin">{}</span>
    {}
    <span class="feed-message">{}</span>
</li>"#,
        level_class(&entry.level),
        blink,
        entry.id,
        html_escape(&entry.date),
        html_escape(&entry.time),
        html_escape(&entry.module),
        render_tag(entry.tag.as_ref()),
        html_escape(&entry.message)
    )
}

/// Live feed panel for one snapshot; only the newest entry can blink
pub fn render_feed(snapshot: &FeedSnapshot) -> String {
    let mut html = String::new();

    if let Some(error) = &snapshot.error {
        html.push_str(&render_error_box(error));
    }

    if snapshot.displayed.is_empty() {
        html.push_str(r#"<div class="empty">Connecting to agent...</div>"#);
        return html;
    }

    html.push_str(r#"<ul class="feed">"#);
    for (i, entry) in snapshot.displayed.iter().enumerate() {
        html.push_str(&render_feed_entry(entry, i == 0 && snapshot.blinking));
    }
    html.push_str("</ul>");

    if snapshot.queued > 0 {
        html.push_str(&format!(
            r#"<div class="feed-pending">{} more queued</div>"#,
            snapshot.queued
        ));
    }
    html
}

// ============================================================================
// DAY LOGS
// ============================================================================

fn render_log_line(entry: &LogEntry) -> String {
    let head = format!(
        r#"<span class="log-time">{}</span> <span class="{}">[{}]</span> {} <span class="log-origin">{}::{}</span> {}"#,
        html_escape(&entry.time),
        level_class(&entry.level),
        html_escape(&entry.level),
        render_tag(entry.tag.as_ref()),
        html_escape(&entry.module),
        html_escape(&entry.function),
        html_escape(&entry.message)
    );

    match entry.data_text() {
        Some(data) => format!(
            r#"<details class="log-line"><summary>{}</summary><pre class="log-data">{}</pre></details>"#,
            head,
            html_escape(&data)
        ),
        None => format!(r#"<div class="log-line">{}</div>"#, head),
    }
}

fn render_cycle(cycle: &CycleGroup) -> String {
    let label = match cycle.cycle {
        Some(n) => format!("Cycle {}", n),
        None => "Process".to_string(),
    };

    let mut badges = String::new();
    if cycle.error_count > 0 {
        badges.push_str(&format!(
            r#"<span class="badge badge-error">{} errors</span>"#,
            cycle.error_count
        ));
    }
    if cycle.warning_count > 0 {
        badges.push_str(&format!(
            r#"<span class="badge badge-warning">{} warnings</span>"#,
            cycle.warning_count
        ));
    }
    for (tag, count) in &cycle.tag_counts {
        badges.push_str(&format!(
            r#"<span class="{}">{} {}</span>"#,
            tag_class(&LogTag::from(tag.as_str())),
            count,
            html_escape(tag)
        ));
    }

    let lines: String = cycle.entries.iter().map(render_log_line).collect();

    format!(
        r#"<details class="cycle"><summary>{} <span class="muted">{} - {}</span> {}</summary>{}</details>"#,
        label,
        html_escape(cycle.first_time().unwrap_or("")),
        html_escape(cycle.last_time().unwrap_or("")),
        badges,
        lines
    )
}

/// Grouped logs of one bot and day
pub fn render_day_logs(groups: &[RunGroup]) -> String {
    if groups.is_empty() {
        return r#"<div class="empty">No logs for this day</div>"#.to_string();
    }

    let mut html = String::new();
    for run in groups {
        let cycles: String = run.cycles.iter().map(render_cycle).collect();
        html.push_str(&format!(
            r#"<details class="run"><summary>{} <span class="muted">{} total events</span></summary>{}</details>"#,
            html_escape(&run.run_prefix),
            run.total_entries(),
            cycles
        ));
    }
    html
}

/// Logs page body: one tab per bot, one lazily loaded section per day
pub fn render_logs_page(bots: &[String], dates: &[NaiveDate]) -> String {
    let mut inputs = String::new();
    let mut labels = String::new();
    let mut panels = String::new();
    let mut rules = String::new();

    for (i, bot) in bots.iter().enumerate() {
        let checked = if i == 0 { " checked" } else { "" };
        inputs.push_str(&format!(
            r#"<input type="radio" name="bot" id="bot-{i}" class="tab-input"{checked}>"#
        ));
        labels.push_str(&format!(
            r#"<label for="bot-{i}" class="tab">{}</label>"#,
            html_escape(&bot.replace('-', " "))
        ));
        // Radio-driven tabs; each input must precede the panel it shows
        rules.push_str(&format!(
            "#bot-{i}:checked ~ #panel-{i} {{ display: block; }}\n\
             #bot-{i}:checked ~ .tabs label[for=bot-{i}] {{ color: var(--blue); border-color: var(--blue); }}\n"
        ));

        let mut days = String::new();
        for date in dates {
            let day = date.format("%Y-%m-%d").to_string();
            days.push_str(&format!(
                r#"<details class="day"><summary hx-get="/partials/logs?module={}&amp;date={}" hx-target="next .day-body" hx-trigger="click once">{}</summary><div class="day-body"><div class="muted">Click to load logs</div></div></details>"#,
                html_escape(bot),
                day,
                day
            ));
        }
        panels.push_str(&format!(r#"<section class="tab-panel" id="panel-{i}">{days}</section>"#));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Agent Logs</title>
<link rel="stylesheet" href="/styles.css">
<style>
{rules}</style>
<script src="https://unpkg.com/htmx.org@1.9.12"></script>
</head>
<body>
<header><a href="/">Agent Dashboard</a> / Logs</header>
<main class="logs-page">
{inputs}
<nav class="tabs">{labels}</nav>
{panels}
</main>
</body>
</html>"#
    )
}

// ============================================================================
// TRADES, POOL, PERFORMANCE
// ============================================================================

/// Price with precision scaled to its magnitude
pub fn format_price(price: f64) -> String {
    if price < 0.0001 {
        format!("${:.8}", price)
    } else if price < 0.01 {
        format!("${:.6}", price)
    } else {
        format!("${:.2}", price)
    }
}

fn format_trade_time(unix_secs: i64) -> String {
    DateTime::from_timestamp(unix_secs, 0)
        .map(|t| t.format("%b %-d, %Y %H:%M").to_string())
        .unwrap_or_else(|| unix_secs.to_string())
}

fn render_trade_row(trade: &Trade) -> String {
    let side_class = if trade.is_buy() {
        "side-buy"
    } else if trade.is_sell() {
        "side-sell"
    } else {
        "side-other"
    };

    let pnl = match (trade.profit_loss_usdc, trade.roi_percentage) {
        (Some(pnl), Some(roi)) => {
            let class = if pnl >= 0.0 { "pnl-pos" } else { "pnl-neg" };
            let sign = if pnl >= 0.0 { "+" } else { "-" };
            format!(
                r#"<span class="{}">{}${:.2} ({}{:.1}%)</span>"#,
                class,
                sign,
                pnl.abs(),
                sign,
                roi.abs()
            )
        }
        (Some(pnl), None) => format!("${:.2}", pnl),
        (None, Some(roi)) => format!("{:.1}%", roi),
        (None, None) => String::new(),
    };

    format!(
        r#"<tr class="trade" data-id="{}">
    <td>{}</td>
    <td class="{}">{}</td>
    <td>{}</td>
    <td class="num">{:.4}</td>
    <td class="num">{}</td>
    <td class="num">${:.2}</td>
    <td>{}</td>
    <td class="num">{}</td>
</tr>"#,
        trade.id,
        format_trade_time(trade.time),
        side_class,
        html_escape(&trade.transaction_type),
        html_escape(if trade.token_name.is_empty() { &trade.token } else { &trade.token_name }),
        trade.token_amount,
        format_price(trade.price_per_token_usdc),
        trade.total_usdc,
        html_escape(&trade.program),
        pnl
    )
}

/// Rows of one trade page. A full page ends with a sentinel that loads the
/// next one when scrolled into view; a short page means the history is done.
///
/// The sentinel replaces itself (`outerHTML`) with the next page, so each one
/// issues at most one request and pages never overlap.
pub fn render_trade_rows(trades: &[Trade], offset: u32, limit: u32) -> String {
    if trades.is_empty() && offset == 0 {
        return r#"<tr><td colspan="8" class="empty">No trades yet</td></tr>"#.to_string();
    }

    let mut html: String = trades.iter().map(render_trade_row).collect();
    let full_page = trades.len() >= limit as usize;
    // No next page past the end of the offset range
    if let (true, Some(next)) = (full_page, offset.checked_add(limit)) {
        html.push_str(&format!(
            r#"<tr class="load-more" hx-get="/partials/trades?offset={}" hx-trigger="revealed" hx-swap="outerHTML"><td colspan="8">Loading...</td></tr>"#,
            next
        ));
    }
    html
}

/// Failed page: the error and a click-to-retry row for the same offset
pub fn render_trade_error(message: &str, offset: u32) -> String {
    format!(
        r#"<tr class="load-more" hx-get="/partials/trades?offset={}" hx-trigger="click" hx-swap="outerHTML"><td colspan="8">{}<button type="button">Retry</button></td></tr>"#,
        offset,
        render_error_box(message)
    )
}

pub fn render_pool(pool: &PoolSnapshot) -> String {
    let mut rows = String::new();
    for token in &pool.tokens {
        rows.push_str(&format!(
            r#"<tr><td>${}</td><td class="num">{:.4}</td><td class="num">${:.2}</td><td class="num">{:.1}%</td></tr>"#,
            html_escape(&token.token_symbol),
            token.balance,
            token.token_value_usdc,
            token.percentage
        ));
    }

    format!(
        r#"<div class="pool">
    <div class="pool-total">Pool size <strong>${:.2}</strong></div>
    <table class="table"><thead><tr><th>Token</th><th>Balance</th><th>Value</th><th>Share</th></tr></thead><tbody>{}</tbody></table>
</div>"#,
        pool.pool_size_total_value_usdc, rows
    )
}

fn render_metric(label: &str, value: &str, suffix: &str, change: f64) -> String {
    let class = if change >= 0.0 { "pnl-pos" } else { "pnl-neg" };
    let sign = if change > 0.0 { "+" } else { "" };
    let value = if value.is_empty() { "0" } else { value };
    format!(
        r#"<div class="metric"><div class="metric-label">{}</div><div class="metric-value">{}{}</div><div class="{}">{}{}%</div></div>"#,
        label,
        html_escape(value),
        suffix,
        class,
        sign,
        change
    )
}

pub fn render_performance(metrics: &PerformanceMetrics) -> String {
    format!(
        r#"<div class="metrics">{}{}{}{}</div>"#,
        render_metric("Win Rate", &metrics.win_rate.value, "%", metrics.win_rate.change),
        render_metric("Total Trades", &metrics.total_trades.value, "", metrics.total_trades.change),
        render_metric("Volume", &metrics.volume.value, "", metrics.volume.change),
        render_metric("Pool Size", &metrics.pool_size.value, "", metrics.pool_size.change)
    )
}
