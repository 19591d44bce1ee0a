//! Human-readable output.
//!
//! Plain text with optional ANSI colors via `colored`. Every function takes
//! `no_color` and returns a `String`; printing is the caller's job.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use colored::{ColoredString, Colorize};

use crate::core::budgets::BudgetAlert;
use crate::core::models::{
    AgentCost, BudgetStatus, DataSource, OAuthQuotaSnapshot, ProviderUsage, QuotaWindow,
    SessionState, Snapshot, SourceHealth,
};
use crate::core::plan::PlanSavings;
use crate::error::MeterError;
use crate::util::format::format_multiplier;
use crate::util::{
    format_context, format_cost, format_cost_fine, format_percent, format_relative_time,
    format_tokens,
};

/// Applies a style only when color is on.
#[derive(Clone, Copy)]
struct Paint {
    color: bool,
}

impl Paint {
    fn with(self, text: &str, style: impl Fn(ColoredString) -> ColoredString) -> String {
        if self.color {
            style(text.normal()).to_string()
        } else {
            text.to_string()
        }
    }

    fn heading(self, text: &str) -> String {
        self.with(text, |s| s.cyan().bold())
    }

    fn dim(self, text: &str) -> String {
        self.with(text, ColoredString::dimmed)
    }

    /// Green / yellow / red by how close a fraction is to its limit.
    fn level(self, text: &str, warning: bool, critical: bool) -> String {
        if critical {
            self.with(text, |s| s.red().bold())
        } else if warning {
            self.with(text, ColoredString::yellow)
        } else {
            self.with(text, ColoredString::green)
        }
    }
}

/// Render the full dashboard.
#[must_use]
pub fn render_snapshot(snapshot: &Snapshot, now: DateTime<Utc>, no_color: bool) -> String {
    let paint = Paint { color: !no_color };
    let mut out = String::new();

    let source = match snapshot.data_source {
        DataSource::Remote => "remote server",
        DataSource::Local => "local logs",
    };
    let _ = writeln!(
        out,
        "{}  {}",
        paint.heading("Agent Meter"),
        paint.dim(&format!(
            "{source}, updated {}",
            format_relative_time(snapshot.generated_at, now)
        ))
    );
    out.push('\n');

    let _ = writeln!(
        out,
        "Today {}   Week {}   Month {}",
        paint.with(&format_cost(snapshot.windows.today), ColoredString::bold),
        format_cost(snapshot.windows.week),
        format_cost(snapshot.windows.month),
    );
    out.push_str(&budget_line(&snapshot.budget, snapshot.windows.today, paint));

    if !snapshot.has_log_source && snapshot.data_source == DataSource::Local {
        out.push('\n');
        let _ = writeln!(out, "{}", paint.dim("No agent log directory found."));
    }

    if !snapshot.agent_costs.is_empty() {
        out.push('\n');
        let _ = writeln!(out, "{}", paint.heading("Agents (today)"));
        for agent in &snapshot.agent_costs {
            out.push_str(&agent_line(agent, "  "));
        }
    }

    out.push('\n');
    let _ = writeln!(out, "{}", paint.heading("Providers"));
    for provider in &snapshot.providers {
        out.push_str(&provider_lines(provider, paint));
    }

    if !snapshot.sessions.is_empty() {
        out.push('\n');
        out.push_str(&render_sessions(&snapshot.sessions, now, no_color));
    }

    if let Some(quota) = &snapshot.oauth_quota {
        out.push('\n');
        out.push_str(&quota_lines(quota, now, paint));
    }

    if let Some(savings) = &snapshot.plan_savings {
        out.push('\n');
        out.push_str(&plan_line(savings, paint));
    }

    let failed: Vec<&SourceHealth> = snapshot.sources.iter().filter(|s| !s.healthy).collect();
    if !failed.is_empty() {
        out.push('\n');
        for source in failed {
            let _ = writeln!(
                out,
                "{} {}",
                paint.with("!", ColoredString::yellow),
                paint.dim(&format!(
                    "{}: {}",
                    source.source,
                    source.error.as_deref().unwrap_or("unavailable")
                ))
            );
        }
    }

    out
}

/// Render active sessions, highest context fill first.
#[must_use]
pub fn render_sessions(sessions: &[SessionState], now: DateTime<Utc>, no_color: bool) -> String {
    let paint = Paint { color: !no_color };
    let mut out = String::new();
    let _ = writeln!(out, "{}", paint.heading("Sessions"));

    if sessions.is_empty() {
        let _ = writeln!(out, "  {}", paint.dim("No active sessions in the last 24h."));
        return out;
    }

    for session in sessions {
        let usage = session.context_usage();
        let percent = format!("{:>4}", format_percent(usage));
        let mut flags = Vec::new();
        if session.is_critical() {
            flags.push(paint.with("critical", |s| s.red().bold()));
        } else if session.is_near_compaction() {
            flags.push(paint.with("near compaction", ColoredString::yellow));
        }
        if session.compactions > 0 {
            flags.push(paint.dim(&format!("{} compactions", session.compactions)));
        }

        let _ = writeln!(
            out,
            "  {:<18} {:<22} {}  {}  {}{}",
            session.agent,
            session.display_model(),
            paint.level(&percent, session.is_near_compaction(), session.is_critical()),
            format_context(session.context_tokens, session.context_limit),
            paint.dim(&format!(
                "{} msgs, {}, {}",
                session.message_count,
                format_cost(session.session_cost),
                format_relative_time(session.last_activity, now)
            )),
            if flags.is_empty() {
                String::new()
            } else {
                format!("  {}", flags.join(", "))
            }
        );
    }
    out
}

/// One-line notice for a raised budget alert.
#[must_use]
pub fn render_alert(alert: &BudgetAlert, no_color: bool) -> String {
    let paint = Paint { color: !no_color };
    format!(
        "{} today's spend {} reached the daily budget of {}",
        paint.with("Budget alert:", |s| s.red().bold()),
        format_cost(alert.current),
        format_cost(alert.limit)
    )
}

/// Render a fatal CLI error.
#[must_use]
pub fn render_error(err: &MeterError, no_color: bool) -> String {
    let paint = Paint { color: !no_color };
    format!(
        "{} {} {}",
        paint.with("error:", |s| s.red().bold()),
        err,
        paint.dim(&format!("[{}]", err.error_code()))
    )
}

fn budget_line(budget: &BudgetStatus, today: f64, paint: Paint) -> String {
    let fraction = budget.percent_used / 100.0;
    let text = format!(
        "{} / {} ({})",
        format_cost(today),
        format_cost(budget.limit),
        format_percent(fraction)
    );
    format!(
        "Budget {}\n",
        paint.level(&text, budget.percent_used >= 75.0, budget.is_over())
    )
}

fn agent_line(agent: &AgentCost, indent: &str) -> String {
    format!(
        "{indent}{:<18} {:>8}  {:>4}  {} tokens\n",
        agent.agent,
        format_cost_fine(agent.cost),
        format!("{:.0}%", agent.percentage_of_total),
        format_tokens(agent.tokens)
    )
}

fn provider_lines(provider: &ProviderUsage, paint: Paint) -> String {
    let mut out = format!("  {:<18} {:>8}", provider.provider, format_cost(provider.total_cost));
    if let Some(remaining) = provider.remaining_credit {
        out.push_str(&format!("  {}", paint.dim(&format!("({} left)", format_cost(remaining)))));
    }
    out.push('\n');
    if provider.agents.len() > 1 {
        for agent in &provider.agents {
            out.push_str(&agent_line(agent, "    "));
        }
    }
    out
}

fn quota_lines(quota: &OAuthQuotaSnapshot, now: DateTime<Utc>, paint: Paint) -> String {
    let mut out = format!("{}\n", paint.heading("Subscription quota"));
    let mut window = |label: &str, w: &QuotaWindow| {
        let used = format!("{:>3.0}% used", w.utilization);
        let _ = writeln!(
            out,
            "  {:<10} {}  {}",
            label,
            paint.level(&used, w.is_warning(), w.is_critical()),
            paint.dim(&format!("resets in {}", w.time_left(now)))
        );
    };
    window("Session", &quota.session);
    window("Weekly", &quota.weekly);
    if let Some(model) = &quota.model_specific {
        window("Sonnet", model);
    }
    if let Some(extra) = quota.extra_usage.as_ref().filter(|e| e.enabled) {
        let _ = writeln!(
            out,
            "  {:<10} {} of {} ({:.0}%)",
            "Extra",
            format_cost(extra.used_credits),
            format_cost(extra.monthly_limit as f64),
            extra.utilization
        );
    }
    out
}

fn plan_line(savings: &PlanSavings, paint: Paint) -> String {
    let verdict = if savings.is_worth_it() {
        paint.with(
            &format!(
                "saves {} ({})",
                format_cost(savings.savings()),
                format_multiplier(savings.multiplier())
            ),
            ColoredString::green,
        )
    } else {
        paint.with("pay-as-you-go would be cheaper", ColoredString::yellow)
    };
    format!(
        "Plan   {}/mo vs {} at API prices, {}\n",
        format_cost(savings.plan_cost),
        format_cost(savings.theoretical_cost),
        verdict
    )
}
