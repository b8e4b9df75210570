// src/aggregator.rs
//! # Aggregation Manager
//! Owns the configured provider adapters and fans one logical search out to
//! all of them concurrently. Every provider's outcome is collected
//! independently; one provider failing can neither cancel nor block the
//! others. After all tasks settle the manager merges, deduplicates, ranks
//! and reports per-provider outcomes.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::config::{AggregatorConfig, ProviderConfig};
use crate::scoring::rank_jobs;
use crate::sources::{
    feedhire::FeedHireAdapter, jobwire::JobwireAdapter, SourceAdapter, SourceDetailOutcome,
    SourceSearchOutcome,
};
use crate::types::{
    AggregationResult, ConnectionStatus, ProviderStats, SearchCriteria, SearchMetadata,
    SourceOutcome,
};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "aggregate_searches_total",
            "Aggregated searches served by the manager."
        );
        describe_counter!(
            "aggregate_jobs_total",
            "Jobs returned after dedup and ranking."
        );
        describe_counter!(
            "aggregate_dedup_total",
            "Jobs collapsed by (title, company) deduplication."
        );
        describe_counter!("source_errors_total", "Provider fetch/parse errors.");
        describe_counter!("source_records_total", "Raw records parsed from providers.");
        describe_counter!(
            "source_dropped_total",
            "Raw records dropped by normalization."
        );
        describe_histogram!("source_parse_ms", "Provider parse time in milliseconds.");
        describe_histogram!("source_fetch_ms", "Provider end-to-end fetch time in ms.");
        describe_gauge!(
            "aggregate_last_search_ts",
            "Unix ts of the last aggregated search."
        );
    });
}

/// Static configuration + live counters for one provider, as exposed by
/// `source_stats`.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderSnapshot {
    pub stats: ProviderStats,
    pub config: ProviderConfig,
}

/// Explicitly constructed and injected wherever a process boundary needs it;
/// `initialize` is a one-time setup call, not an import-time side effect.
#[derive(Default)]
pub struct AggregationManager {
    // Registration order matters: dedup keeps the first occurrence in
    // provider-iteration order.
    adapters: Vec<Arc<dyn SourceAdapter>>,
    default_providers: Vec<String>,
}

impl AggregationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one adapter per configured provider. Idempotent: calling twice
    /// replaces the provider set.
    pub fn initialize(&mut self, config: &AggregatorConfig) -> Result<()> {
        let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::with_capacity(config.providers.len());
        for (name, entry) in &config.providers {
            let adapter: Arc<dyn SourceAdapter> = match name.as_str() {
                crate::sources::jobwire::PROVIDER_NAME => {
                    Arc::new(JobwireAdapter::from_entry(entry))
                }
                crate::sources::feedhire::PROVIDER_NAME => {
                    Arc::new(FeedHireAdapter::from_entry(entry))
                }
                other => bail!("unknown provider `{other}` in aggregator config"),
            };
            adapters.push(adapter);
        }
        for name in &config.default_providers {
            if !adapters.iter().any(|a| a.name() == name) {
                bail!("default provider `{name}` is not configured");
            }
        }
        self.adapters = adapters;
        self.default_providers = config.default_providers.clone();
        Ok(())
    }

    /// Inject pre-built adapters (tests, custom wiring). Same replace
    /// semantics as `initialize`.
    pub fn initialize_with(
        &mut self,
        adapters: Vec<Arc<dyn SourceAdapter>>,
        default_providers: Vec<String>,
    ) {
        self.adapters = adapters;
        self.default_providers = default_providers;
    }

    pub fn is_initialized(&self) -> bool {
        !self.adapters.is_empty()
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.adapters.iter().map(|a| a.name().to_string()).collect()
    }

    pub fn has_provider(&self, name: &str) -> bool {
        self.adapters.iter().any(|a| a.name() == name)
    }

    fn adapter(&self, name: &str) -> Option<&Arc<dyn SourceAdapter>> {
        self.adapters.iter().find(|a| a.name() == name)
    }

    /// Resolve the adapters a search will hit, in iteration order.
    /// Requesting an unconfigured provider is a programming error.
    fn select(&self, providers: Option<&[String]>) -> Vec<Arc<dyn SourceAdapter>> {
        assert!(
            self.is_initialized(),
            "AggregationManager::initialize must be called before searching"
        );
        let names: Vec<String> = match providers {
            Some(subset) => subset.to_vec(),
            None if !self.default_providers.is_empty() => self.default_providers.clone(),
            None => self.provider_names(),
        };
        names
            .iter()
            .map(|name| {
                self.adapter(name)
                    .unwrap_or_else(|| panic!("provider `{name}` is not configured"))
                    .clone()
            })
            .collect()
    }

    /// Fan a search out to the selected providers, settle every task, then
    /// merge, dedupe, rank. Never fails at the top level: with every
    /// provider down the job list is empty and `sources` shows the errors.
    pub async fn search_jobs(
        &self,
        criteria: &SearchCriteria,
        providers: Option<&[String]>,
    ) -> AggregationResult {
        ensure_metrics_described();
        let selected = self.select(providers);
        let queried: Vec<String> = selected.iter().map(|a| a.name().to_string()).collect();

        // One task per provider; handles are awaited in provider order, so
        // merging never depends on which provider finished first.
        let mut handles = Vec::with_capacity(selected.len());
        for adapter in &selected {
            let a = adapter.clone();
            let c = criteria.clone();
            handles.push(tokio::spawn(async move {
                let t0 = std::time::Instant::now();
                let outcome = a.search_jobs(&c).await;
                let ms = t0.elapsed().as_secs_f64() * 1_000.0;
                histogram!("source_fetch_ms", "provider" => a.name().to_string()).record(ms);
                outcome
            }));
        }

        let mut settled: Vec<(String, SourceSearchOutcome)> = Vec::with_capacity(handles.len());
        for (name, handle) in queried.iter().cloned().zip(handles) {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(provider = %name, error = %e, "provider task panicked");
                    counter!("source_errors_total", "provider" => name.clone()).increment(1);
                    SourceSearchOutcome::failed(format!("provider task failed: {e}"))
                }
            };
            settled.push((name, outcome));
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut merged = Vec::new();
        let mut sources = BTreeMap::new();
        let mut dedup_cnt = 0usize;

        for (name, outcome) in settled {
            let job_count = outcome.jobs.len();
            if outcome.success {
                for mut job in outcome.jobs {
                    if job.source.is_empty() {
                        job.source = name.clone();
                    }
                    if seen.insert(job.dedup_key()) {
                        merged.push(job);
                    } else {
                        dedup_cnt += 1;
                    }
                }
            } else {
                tracing::warn!(
                    provider = %name,
                    error = outcome.error.as_deref().unwrap_or("unknown"),
                    "provider returned no results"
                );
            }
            sources.insert(
                name,
                SourceOutcome {
                    success: outcome.success,
                    total: outcome.total,
                    job_count,
                    error: outcome.error,
                },
            );
        }

        rank_jobs(&mut merged, criteria);
        if criteria.limit > 0 && merged.len() > criteria.limit {
            merged.truncate(criteria.limit);
        }

        let now = Utc::now();
        counter!("aggregate_searches_total").increment(1);
        counter!("aggregate_jobs_total").increment(merged.len() as u64);
        counter!("aggregate_dedup_total").increment(dedup_cnt as u64);
        gauge!("aggregate_last_search_ts").set(now.timestamp() as f64);

        AggregationResult {
            success: true,
            total: merged.len(),
            jobs: merged,
            sources,
            metadata: SearchMetadata {
                criteria: criteria.clone(),
                providers_queried: queried,
                fetched_at: now,
            },
        }
    }

    /// Pass-through to the named adapter; the adapter's own success/error
    /// value propagates unchanged, with the provider identity tagged on.
    pub async fn get_job_details(&self, id: &str, provider: &str) -> SourceDetailOutcome {
        assert!(
            self.is_initialized(),
            "AggregationManager::initialize must be called before fetching details"
        );
        let adapter = self
            .adapter(provider)
            .unwrap_or_else(|| panic!("provider `{provider}` is not configured"));
        let mut outcome = adapter.job_details(id).await;
        if let Some(job) = outcome.job.as_mut() {
            if job.source.is_empty() {
                job.source = provider.to_string();
            }
        }
        outcome
    }

    /// Probe every configured provider concurrently; same isolation
    /// discipline as the search fan-out.
    pub async fn test_all_connections(&self) -> BTreeMap<String, ConnectionStatus> {
        let mut handles = Vec::with_capacity(self.adapters.len());
        for adapter in &self.adapters {
            let a = adapter.clone();
            handles.push((
                a.name().to_string(),
                tokio::spawn(async move { a.test_connection().await }),
            ));
        }

        let mut out = BTreeMap::new();
        for (name, handle) in handles {
            let probe = match handle.await {
                Ok(res) => res,
                Err(e) => Err(format!("probe task failed: {e}")),
            };
            out.insert(
                name,
                ConnectionStatus {
                    connected: probe.is_ok(),
                    checked_at: Utc::now(),
                    error: probe.err(),
                },
            );
        }
        out
    }

    /// Read-only snapshot of each provider's counters + static config.
    pub fn source_stats(&self) -> BTreeMap<String, ProviderSnapshot> {
        self.adapters
            .iter()
            .map(|a| {
                (
                    a.name().to_string(),
                    ProviderSnapshot {
                        stats: a.stats(),
                        config: a.config().clone(),
                    },
                )
            })
            .collect()
    }
}
