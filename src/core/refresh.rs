//! Refresh controller: one fetch → aggregate → publish cycle at a time.
//!
//! A cycle either talks to a healthy remote server exclusively or runs the
//! local collectors (log scan plus configured vendor APIs) next to the
//! session reader. Results are never mixed across the two sides.
//!
//! Readers subscribe to a `watch` channel of `Arc<Snapshot>`; each published
//! snapshot replaces the previous one wholesale.

use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, Utc};
use tokio::sync::{broadcast, watch};
use tokio::time::MissedTickBehavior;

use crate::core::aggregator::aggregate;
use crate::core::budgets::{BudgetAlert, BudgetMonitor, LimitChange};
use crate::core::collector::{Collected, Collector, Outcome, run_all, run_with_timeout};
use crate::core::http::REMOTE_TIMEOUT;
use crate::core::models::{
    BudgetStatus, DataSource, OAuthQuotaSnapshot, ProviderTotal, SessionState, Snapshot,
    SourceHealth, UsageRecord,
};
use crate::core::plan::Plan;
use crate::core::session_logs::{SessionLogFinder, SessionReader, sort_by_context_usage};
use crate::error::Result;
use crate::providers::remote::{SOURCE_REMOTE_OAUTH, SOURCE_REMOTE_SESSIONS, SOURCE_REMOTE_USAGE};
use crate::providers::{LocalLogCollector, OpenAiCollector, OpenRouterCollector, RemoteCollector};
use crate::storage::ResolvedConfig;

const ALERT_CAPACITY: usize = 16;

/// Refresh lifecycle. Anything but `Idle` means a cycle owns the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    Idle = 0,
    Fetching = 1,
    Aggregating = 2,
    Published = 3,
}

impl Phase {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Fetching,
            2 => Self::Aggregating,
            3 => Self::Published,
            _ => Self::Idle,
        }
    }
}

/// What asked for a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Timer,
    Manual,
    AppOpen,
}

/// Everything a controller reads from.
pub struct Sources {
    pub remote: Option<RemoteCollector>,
    pub collectors: Vec<Box<dyn Collector>>,
    pub agents_dir: PathBuf,
}

impl Sources {
    /// Build sources from resolved config. Vendor collectors only exist when
    /// their key is configured.
    ///
    /// # Errors
    ///
    /// Returns error if an HTTP client cannot be built.
    pub fn from_config(config: &ResolvedConfig) -> Result<Self> {
        let remote = config
            .remote_url
            .as_deref()
            .map(RemoteCollector::new)
            .transpose()?;

        let mut collectors: Vec<Box<dyn Collector>> =
            vec![Box::new(LocalLogCollector::new(config.agents_dir.clone()))];
        if let Some(key) = &config.openai_api_key {
            collectors.push(Box::new(OpenAiCollector::with_base_url(
                key.clone(),
                &config.openai_base_url,
            )?));
        }
        if let Some(key) = &config.openrouter_api_key {
            collectors.push(Box::new(OpenRouterCollector::with_base_url(
                key.clone(),
                &config.openrouter_base_url,
            )?));
        }

        Ok(Self {
            remote,
            collectors,
            agents_dir: config.agents_dir.clone(),
        })
    }
}

/// Raw material of one cycle before aggregation.
#[derive(Debug, Default)]
struct Fetched {
    data_source: DataSource,
    has_log_source: bool,
    records: Vec<UsageRecord>,
    totals: Vec<ProviderTotal>,
    sessions: Vec<SessionState>,
    oauth_quota: Option<OAuthQuotaSnapshot>,
    sources: Vec<SourceHealth>,
}

pub struct RefreshController {
    sources: Sources,
    plan: Plan,
    phase: AtomicU8,
    budget: Mutex<BudgetMonitor>,
    snapshot_tx: watch::Sender<Arc<Snapshot>>,
    alert_tx: broadcast::Sender<BudgetAlert>,
    last_completed: Mutex<Option<DateTime<Utc>>>,
}

/// Returns the phase to `Idle` when a cycle ends, however it ends.
struct IdleOnDrop<'a>(&'a AtomicU8);

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(Phase::Idle as u8, Ordering::Release);
    }
}

impl RefreshController {
    #[must_use]
    pub fn new(sources: Sources, plan: Plan, daily_limit: f64) -> Self {
        let (snapshot_tx, _) = watch::channel(Arc::new(Snapshot::default()));
        let (alert_tx, _) = broadcast::channel(ALERT_CAPACITY);
        Self {
            sources,
            plan,
            phase: AtomicU8::new(Phase::Idle as u8),
            budget: Mutex::new(BudgetMonitor::new(daily_limit)),
            snapshot_tx,
            alert_tx,
            last_completed: Mutex::new(None),
        }
    }

    /// # Errors
    ///
    /// Returns error if an HTTP client cannot be built.
    pub fn from_config(config: &ResolvedConfig) -> Result<Self> {
        Ok(Self::new(
            Sources::from_config(config)?,
            config.plan,
            config.daily_limit,
        ))
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshot_tx.subscribe()
    }

    /// The most recently published snapshot (empty before the first cycle).
    #[must_use]
    pub fn latest(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot_tx.borrow())
    }

    #[must_use]
    pub fn alerts(&self) -> broadcast::Receiver<BudgetAlert> {
        self.alert_tx.subscribe()
    }

    #[must_use]
    pub fn last_completed(&self) -> Option<DateTime<Utc>> {
        *self
            .last_completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn budget_limit(&self) -> f64 {
        self.budget().limit()
    }

    pub fn set_budget_limit(&self, limit: f64) -> LimitChange {
        self.budget().set_limit(limit)
    }

    pub fn set_budget_limit_str(&self, raw: &str) -> LimitChange {
        self.budget().set_limit_str(raw)
    }

    fn budget(&self) -> MutexGuard<'_, BudgetMonitor> {
        self.budget.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase(&self, phase: Phase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    /// Run one cycle. Returns `false` without doing anything when another
    /// cycle is already in flight.
    pub async fn trigger(&self, trigger: Trigger) -> bool {
        if self
            .phase
            .compare_exchange(
                Phase::Idle as u8,
                Phase::Fetching as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            tracing::debug!(?trigger, phase = ?self.phase(), "refresh in flight, trigger coalesced");
            return false;
        }
        let _idle = IdleOnDrop(&self.phase);
        let start = Instant::now();
        tracing::debug!(?trigger, "refresh started");

        let fetched = self.fetch().await;

        self.set_phase(Phase::Aggregating);
        let snapshot = self.build_snapshot(fetched);

        let generated_at = snapshot.generated_at;
        let records = snapshot.agent_costs.len();
        let data_source = snapshot.data_source;
        self.snapshot_tx.send_replace(Arc::new(snapshot));
        self.set_phase(Phase::Published);
        *self
            .last_completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(generated_at);

        tracing::info!(
            ?trigger,
            data_source = data_source.label(),
            agents = records,
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "refresh published"
        );
        true
    }

    async fn fetch(&self) -> Fetched {
        if let Some(remote) = &self.sources.remote {
            if remote.check_health().await {
                return fetch_remote(remote).await;
            }
            tracing::warn!(url = remote.base_url(), "remote server unhealthy, using local sources");
        }
        self.fetch_local().await
    }

    async fn fetch_local(&self) -> Fetched {
        let reader = SessionReader::new(self.sources.agents_dir.clone());
        let now = Utc::now();
        let sessions_task = tokio::task::spawn_blocking(move || reader.read_sessions(now));

        let (outcomes, sessions) = tokio::join!(run_all(&self.sources.collectors), sessions_task);
        let sessions = sessions.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "session reader task failed");
            Vec::new()
        });

        let mut union = Collected::default();
        let mut sources = Vec::with_capacity(outcomes.len());
        for (collected, health) in outcomes {
            union.extend(collected);
            sources.push(health);
        }

        Fetched {
            data_source: DataSource::Local,
            has_log_source: SessionLogFinder::new(self.sources.agents_dir.clone()).exists(),
            records: union.records,
            totals: union.totals,
            sessions,
            sources,
            ..Fetched::default()
        }
    }

    fn build_snapshot(&self, fetched: Fetched) -> Snapshot {
        let aggregate = aggregate(&fetched.records, &fetched.totals, &Local::now(), self.plan);
        let today = aggregate.windows.today;

        let (alert, budget) = {
            let mut monitor = self.budget();
            let alert = monitor.evaluate(today);
            let status = BudgetStatus {
                limit: monitor.limit(),
                percent_used: monitor.percent_used(today),
                alert_raised: monitor.alert_raised(),
            };
            (alert, status)
        };
        if let Some(alert) = alert {
            tracing::warn!(
                limit = alert.limit,
                current = alert.current,
                percent_used = alert.percent_used,
                "daily budget reached"
            );
            let _ = self.alert_tx.send(alert);
        }

        Snapshot {
            generated_at: Utc::now(),
            data_source: fetched.data_source,
            has_log_source: fetched.has_log_source,
            windows: aggregate.windows,
            agent_costs: aggregate.agent_costs,
            providers: aggregate.providers,
            sessions: fetched.sessions,
            oauth_quota: fetched.oauth_quota,
            plan_savings: aggregate.plan_savings,
            budget,
            sources: fetched.sources,
        }
    }

    /// Refresh on app open, then on every tick until `shutdown` resolves.
    ///
    /// A cycle in progress when `shutdown` fires runs to completion.
    pub async fn run(&self, interval: Duration, shutdown: impl Future<Output = ()>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        self.trigger(Trigger::AppOpen).await;

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.trigger(Trigger::Timer).await;
                }
                () = &mut shutdown => {
                    tracing::debug!("refresh loop stopped");
                    break;
                }
            }
        }
    }
}

async fn fetch_remote(remote: &RemoteCollector) -> Fetched {
    let (usage, sessions, oauth) = tokio::join!(
        run_with_timeout(SOURCE_REMOTE_USAGE, REMOTE_TIMEOUT, remote.fetch_usage()),
        run_with_timeout(SOURCE_REMOTE_SESSIONS, REMOTE_TIMEOUT, remote.fetch_sessions()),
        run_with_timeout(SOURCE_REMOTE_OAUTH, REMOTE_TIMEOUT, remote.fetch_oauth()),
    );

    let usage_count = usage.value.as_ref().map_or(0, |u| u.records.len());
    let Outcome { value: usage, health: usage_health } = usage.with_records(usage_count);
    let session_count = sessions.value.as_ref().map_or(0, Vec::len);
    let Outcome { value: sessions, health: sessions_health } = sessions.with_records(session_count);
    let oauth_count = usize::from(matches!(oauth.value, Some(Some(_))));
    let Outcome { value: oauth, health: oauth_health } = oauth.with_records(oauth_count);

    let (records, has_log_source) = usage.map_or((Vec::new(), false), |u| (u.records, u.has_log_source));
    let mut sessions = sessions.unwrap_or_default();
    sort_by_context_usage(&mut sessions);

    Fetched {
        data_source: DataSource::Remote,
        has_log_source,
        records,
        totals: Vec::new(),
        sessions,
        oauth_quota: oauth.flatten(),
        sources: vec![usage_health, sessions_health, oauth_health],
    }
}
