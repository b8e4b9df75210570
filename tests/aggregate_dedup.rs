// tests/aggregate_dedup.rs
//
// Merge/dedup/rank behavior of the aggregation manager with mock providers.

use std::sync::Arc;

use async_trait::async_trait;
use job_aggregator::aggregator::AggregationManager;
use job_aggregator::config::ProviderConfig;
use job_aggregator::sources::{SourceAdapter, SourceDetailOutcome, SourceSearchOutcome};
use job_aggregator::types::{CanonicalJob, ProviderStats, SearchCriteria};

struct MockAdapter {
    name: String,
    jobs: Vec<CanonicalJob>,
    config: ProviderConfig,
}

impl MockAdapter {
    fn with_jobs(name: &str, jobs: Vec<CanonicalJob>) -> Arc<dyn SourceAdapter> {
        Arc::new(Self {
            name: name.to_string(),
            jobs,
            config: ProviderConfig::default(),
        })
    }
}

#[async_trait]
impl SourceAdapter for MockAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search_jobs(&self, _criteria: &SearchCriteria) -> SourceSearchOutcome {
        SourceSearchOutcome::ok(self.jobs.clone(), self.jobs.len(), 0)
    }

    async fn job_details(&self, id: &str) -> SourceDetailOutcome {
        self.jobs
            .iter()
            .find(|j| j.id == id)
            .cloned()
            .map(SourceDetailOutcome::ok)
            .unwrap_or_else(|| SourceDetailOutcome::failed(format!("job {id} not found")))
    }

    async fn test_connection(&self) -> Result<(), String> {
        Ok(())
    }

    fn stats(&self) -> ProviderStats {
        ProviderStats::default()
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

fn job(id: &str, title: &str, company: &str, location: &str) -> CanonicalJob {
    CanonicalJob {
        id: id.into(),
        title: title.into(),
        company: company.into(),
        location: location.into(),
        description: String::new(),
        requirements: vec![],
        skills: vec![],
        salary: None,
        employment_type: None,
        experience_level: None,
        posted_at: None,
        url: None,
        remote: false,
        source: String::new(),
        raw: serde_json::Value::Null,
    }
}

fn two_provider_manager() -> AggregationManager {
    let a = MockAdapter::with_jobs(
        "providerA",
        vec![job("a-1", "Software Engineer", "Acme", "Austin, TX")],
    );
    let b = MockAdapter::with_jobs(
        "providerB",
        vec![
            job("b-1", "Software Engineer", "Acme", "Austin, TX"),
            job("b-2", "Sales Rep", "Beta", "Remote"),
        ],
    );
    let mut manager = AggregationManager::new();
    manager.initialize_with(vec![a, b], vec![]);
    manager
}

fn criteria() -> SearchCriteria {
    SearchCriteria {
        keywords: vec!["engineer".into()],
        location: "Austin".into(),
        ..SearchCriteria::default()
    }
}

#[tokio::test]
async fn duplicate_posting_collapses_and_engineer_ranks_first() {
    let manager = two_provider_manager();
    let result = manager.search_jobs(&criteria(), None).await;

    assert!(result.success);
    assert_eq!(result.total, 2, "Acme duplicate must collapse to one");
    assert_eq!(result.jobs[0].title, "Software Engineer");
    assert_eq!(result.jobs[1].title, "Sales Rep");
    // First occurrence in provider-iteration order wins.
    assert_eq!(result.jobs[0].source, "providerA");
    assert_eq!(result.jobs[0].id, "a-1");

    let a = &result.sources["providerA"];
    let b = &result.sources["providerB"];
    assert!(a.success && b.success);
    assert_eq!(a.job_count, 1);
    assert_eq!(b.job_count, 2);
}

#[tokio::test]
async fn dedup_is_idempotent_across_identical_searches() {
    let manager = two_provider_manager();
    let first = manager.search_jobs(&criteria(), None).await;
    let second = manager.search_jobs(&criteria(), None).await;

    assert_eq!(first.jobs, second.jobs);
    let mut keys: Vec<String> = first.jobs.iter().map(|j| j.dedup_key()).collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), first.jobs.len(), "no duplicate (title, company) pairs");
}

#[tokio::test]
async fn provider_subset_restricts_the_fan_out() {
    let manager = two_provider_manager();
    let subset = vec!["providerB".to_string()];
    let result = manager.search_jobs(&criteria(), Some(&subset)).await;

    assert_eq!(result.metadata.providers_queried, subset);
    assert_eq!(result.sources.len(), 1);
    assert_eq!(result.total, 2);
    assert!(result.jobs.iter().all(|j| j.source == "providerB"));
}

#[tokio::test]
async fn limit_truncates_after_ranking() {
    let manager = two_provider_manager();
    let c = SearchCriteria {
        limit: 1,
        ..criteria()
    };
    let result = manager.search_jobs(&c, None).await;
    assert_eq!(result.total, 1);
    assert_eq!(result.jobs[0].title, "Software Engineer");
}

#[tokio::test]
async fn details_pass_through_tags_provider() {
    let manager = two_provider_manager();
    let found = manager.get_job_details("b-2", "providerB").await;
    assert!(found.success);
    let job = found.job.unwrap();
    assert_eq!(job.title, "Sales Rep");
    assert_eq!(job.source, "providerB");

    let missing = manager.get_job_details("nope", "providerA").await;
    assert!(!missing.success);
    assert!(missing.error.unwrap().contains("not found"));
}
