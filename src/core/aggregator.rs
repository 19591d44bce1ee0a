//! Record aggregation into cost windows and breakdowns.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone};

use crate::core::models::{
    AgentCost, CostWindows, PRIMARY_PROVIDER, ProviderTotal, ProviderUsage, UsageRecord,
};
use crate::core::plan::{Plan, PlanSavings};
use crate::util::time::CalendarWindows;

/// Floor for the percentage denominator so negligible spend does not divide by zero.
const PERCENT_EPSILON: f64 = 0.001;

/// Everything derived from one cycle's records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregate {
    pub windows: CostWindows,
    pub agent_costs: Vec<AgentCost>,
    pub providers: Vec<ProviderUsage>,
    pub plan_savings: Option<PlanSavings>,
}

/// Aggregate records and out-of-band totals relative to `now`.
///
/// Windows follow `now`'s timezone, so pass local time for calendar-day
/// semantics.
#[must_use]
pub fn aggregate<Tz: TimeZone>(
    records: &[UsageRecord],
    totals: &[ProviderTotal],
    now: &DateTime<Tz>,
    plan: Plan,
) -> Aggregate {
    let calendar = CalendarWindows::around(now);
    let out_of_band: f64 = totals.iter().map(|t| t.total_cost).sum();

    let sum_in = |window: &crate::util::time::Window| -> f64 {
        records
            .iter()
            .filter(|r| window.contains(r.timestamp))
            .map(|r| r.cost)
            .sum::<f64>()
    };

    let windows = CostWindows {
        today: sum_in(&calendar.today) + out_of_band,
        week: sum_in(&calendar.week) + out_of_band,
        month: sum_in(&calendar.month) + out_of_band,
    };

    let today: Vec<&UsageRecord> = records
        .iter()
        .filter(|r| calendar.today.contains(r.timestamp))
        .collect();

    let agent_costs = agent_breakdown(today.iter().copied());
    let providers = provider_breakdown(&today, totals);

    let plan_cost = plan.monthly_cost();
    let plan_savings = (plan_cost > 0.0).then(|| PlanSavings::new(plan_cost, windows.month));

    Aggregate {
        windows,
        agent_costs,
        providers,
        plan_savings,
    }
}

/// Group records by agent, sorted by cost descending.
fn agent_breakdown<'a>(records: impl Iterator<Item = &'a UsageRecord>) -> Vec<AgentCost> {
    let mut by_agent: BTreeMap<&str, (f64, i64)> = BTreeMap::new();
    for record in records {
        let entry = by_agent.entry(record.agent.as_str()).or_default();
        entry.0 += record.cost;
        entry.1 += record.total_tokens();
    }

    let total: f64 = by_agent.values().map(|(cost, _)| cost).sum();
    let denominator = total.max(PERCENT_EPSILON);

    let mut costs: Vec<AgentCost> = by_agent
        .into_iter()
        .map(|(agent, (cost, tokens))| AgentCost {
            agent: agent.to_string(),
            cost,
            tokens,
            percentage_of_total: cost / denominator * 100.0,
        })
        .collect();

    costs.sort_by(|a, b| b.cost.total_cmp(&a.cost).then_with(|| a.agent.cmp(&b.agent)));
    costs
}

fn provider_breakdown(today: &[&UsageRecord], totals: &[ProviderTotal]) -> Vec<ProviderUsage> {
    let mut by_provider: BTreeMap<&str, Vec<&UsageRecord>> = BTreeMap::new();
    for record in today {
        by_provider.entry(record.provider.as_str()).or_default().push(record);
    }

    let mut providers: BTreeMap<String, ProviderUsage> = by_provider
        .into_iter()
        .map(|(provider, records)| {
            let usage = ProviderUsage {
                provider: provider.to_string(),
                total_cost: records.iter().map(|r| r.cost).sum(),
                remaining_credit: None,
                agents: agent_breakdown(records.into_iter()),
            };
            (provider.to_string(), usage)
        })
        .collect();

    for total in totals {
        let usage = providers
            .entry(total.provider.clone())
            .or_insert_with(|| ProviderUsage {
                provider: total.provider.clone(),
                total_cost: 0.0,
                remaining_credit: None,
                agents: Vec::new(),
            });
        usage.total_cost += total.total_cost;
        if total.remaining_credit.is_some() {
            usage.remaining_credit = total.remaining_credit;
        }
    }

    providers
        .entry(PRIMARY_PROVIDER.to_string())
        .or_insert_with(|| ProviderUsage {
            provider: PRIMARY_PROVIDER.to_string(),
            total_cost: 0.0,
            remaining_credit: None,
            agents: Vec::new(),
        });

    let mut list: Vec<ProviderUsage> = providers
        .into_values()
        .filter(|p| p.provider == PRIMARY_PROVIDER || p.total_cost > 0.0)
        .collect();

    list.sort_by(|a, b| {
        let a_primary = a.provider == PRIMARY_PROVIDER;
        let b_primary = b.provider == PRIMARY_PROVIDER;
        b_primary
            .cmp(&a_primary)
            .then_with(|| b.total_cost.total_cmp(&a.total_cost))
            .then_with(|| a.provider.cmp(&b.provider))
    });
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::make_record_at;
    use chrono::{Duration, FixedOffset};

    fn now() -> DateTime<FixedOffset> {
        // Friday afternoon, UTC+2
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 16, 15, 0, 0)
            .unwrap()
    }

    #[test]
    fn today_sums_only_records_in_local_day() {
        let now = now();
        let local_midnight = now.date_naive().and_hms_opt(0, 0, 0).unwrap();
        let start = now.timezone().from_local_datetime(&local_midnight).unwrap();

        let records = vec![
            make_record_at("Main", "Anthropic", 1.0, start.to_utc()),
            make_record_at("Main", "Anthropic", 2.0, (start - Duration::seconds(1)).to_utc()),
            make_record_at("Main", "Anthropic", 4.0, now.to_utc()),
        ];

        let result = aggregate(&records, &[], &now, Plan::None);
        assert!((result.windows.today - 5.0).abs() < 1e-9);
        assert!((result.windows.week - 7.0).abs() < 1e-9);
        assert!((result.windows.month - 7.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_band_totals_added_to_every_window() {
        let totals = vec![ProviderTotal {
            provider: "OpenRouter".to_string(),
            total_cost: 2.5,
            remaining_credit: Some(7.5),
        }];
        let result = aggregate(&[], &totals, &now(), Plan::None);
        assert!((result.windows.today - 2.5).abs() < 1e-9);
        assert!((result.windows.month - 2.5).abs() < 1e-9);

        assert_eq!(result.providers[0].provider, "Anthropic");
        assert_eq!(result.providers[1].provider, "OpenRouter");
        assert_eq!(result.providers[1].remaining_credit, Some(7.5));
    }

    #[test]
    fn agent_percentages() {
        let at = now().to_utc();
        let records = vec![
            make_record_at("Main", "Anthropic", 3.0, at),
            make_record_at("Coder", "Anthropic", 1.0, at),
        ];
        let result = aggregate(&records, &[], &now(), Plan::None);
        assert_eq!(result.agent_costs[0].agent, "Main");
        assert!((result.agent_costs[0].percentage_of_total - 75.0).abs() < 1e-9);
        assert!((result.agent_costs[1].percentage_of_total - 25.0).abs() < 1e-9);
    }

    #[test]
    fn negligible_spend_does_not_divide_by_zero() {
        let at = now().to_utc();
        let records = vec![make_record_at("Main", "Anthropic", 0.0, at)];
        let result = aggregate(&records, &[], &now(), Plan::None);
        assert!(result.agent_costs[0].percentage_of_total.is_finite());
        assert!(result.agent_costs[0].percentage_of_total.abs() < f64::EPSILON);
    }

    #[test]
    fn zero_cost_secondary_provider_is_dropped() {
        let at = now().to_utc();
        let records = vec![
            make_record_at("Main", "OpenAI", 1.20, at),
            make_record_at("ChatGPT", "Mistral", 0.0, at),
        ];
        let result = aggregate(&records, &[], &now(), Plan::None);

        assert!((result.windows.today - 1.20).abs() < 1e-9);
        let names: Vec<_> = result.providers.iter().map(|p| p.provider.as_str()).collect();
        assert_eq!(names, vec!["Anthropic", "OpenAI"]);
        assert!(result.providers[0].total_cost.abs() < f64::EPSILON);
    }

    #[test]
    fn providers_ordered_primary_then_cost() {
        let at = now().to_utc();
        let records = vec![
            make_record_at("A", "OpenAI", 1.0, at),
            make_record_at("B", "Google", 3.0, at),
            make_record_at("C", "Anthropic", 0.5, at),
        ];
        let result = aggregate(&records, &[], &now(), Plan::None);
        let names: Vec<_> = result.providers.iter().map(|p| p.provider.as_str()).collect();
        assert_eq!(names, vec!["Anthropic", "Google", "OpenAI"]);
        assert_eq!(result.providers[0].agents[0].agent, "C");
    }

    #[test]
    fn plan_savings_from_month_cost() {
        let at = now().to_utc();
        let records = vec![make_record_at("Main", "Anthropic", 85.0, at)];

        let result = aggregate(&records, &[], &now(), Plan::AnthropicPro);
        let savings = result.plan_savings.unwrap();
        assert!((savings.savings() - 65.0).abs() < 1e-9);
        assert!((savings.multiplier() - 4.25).abs() < 1e-9);
        assert!(savings.is_worth_it());

        assert!(aggregate(&records, &[], &now(), Plan::None).plan_savings.is_none());
    }
}
