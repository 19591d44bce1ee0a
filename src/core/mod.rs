//! Data models, normalization, aggregation and the refresh cycle.

pub mod aggregator;
pub mod budgets;
pub mod collector;
pub mod http;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod plan;
pub mod pricing;
pub mod refresh;
pub mod reverse_lines;
pub mod session_logs;

pub use aggregator::{Aggregate, aggregate};
pub use budgets::{BudgetAlert, BudgetMonitor, LimitChange};
pub use collector::{Collected, Collector};
pub use models::{
    AgentCost, BudgetStatus, CostWindows, DataSource, OAuthQuotaSnapshot, ProviderTotal,
    ProviderUsage, QuotaWindow, SessionState, Snapshot, SourceHealth, UsageRecord,
};
pub use plan::{Plan, PlanSavings};
pub use pricing::{ModelPricing, PricingTable};
pub use refresh::{Phase, RefreshController, Sources, Trigger};
pub use session_logs::{SessionLogFinder, SessionReader};
