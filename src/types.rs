// src/types.rs
//! Canonical, provider-agnostic data model shared by every adapter and the
//! aggregation manager.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable description of one logical search, shared by all providers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchCriteria {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub job_type: Option<JobType>,
    #[serde(default)]
    pub experience_level: Option<ExperienceLevel>,
    #[serde(default)]
    pub remote: bool,
    #[serde(default)]
    pub min_salary: Option<u32>,
    #[serde(default)]
    pub skills: Vec<String>,
    /// Maximum jobs in the final ranked list; 0 means unlimited.
    #[serde(default)]
    pub limit: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Internship,
    Temporary,
}

impl JobType {
    /// Best-effort mapping from free-form provider text. Total: unknown
    /// strings map to `None`, never to an error.
    pub fn parse_loose(s: &str) -> Option<Self> {
        let t = s.trim().to_ascii_lowercase();
        match t.as_str() {
            "full-time" | "full_time" | "fulltime" | "full time" | "permanent" => {
                Some(Self::FullTime)
            }
            "part-time" | "part_time" | "parttime" | "part time" => Some(Self::PartTime),
            "contract" | "contractor" | "freelance" | "b2b" => Some(Self::Contract),
            "internship" | "intern" => Some(Self::Internship),
            "temporary" | "temp" | "seasonal" => Some(Self::Temporary),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceLevel {
    Entry,
    Mid,
    Senior,
    Lead,
    Executive,
}

impl ExperienceLevel {
    pub fn parse_loose(s: &str) -> Option<Self> {
        let t = s.trim().to_ascii_lowercase();
        match t.as_str() {
            "entry" | "entry-level" | "entry level" | "junior" | "jr" | "graduate" => {
                Some(Self::Entry)
            }
            "mid" | "mid-level" | "mid level" | "intermediate" | "associate" => Some(Self::Mid),
            "senior" | "sr" | "senior-level" => Some(Self::Senior),
            "lead" | "staff" | "principal" => Some(Self::Lead),
            "executive" | "director" | "vp" | "c-level" => Some(Self::Executive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SalaryPeriod {
    Hourly,
    Monthly,
    Yearly,
}

/// Structured pay range. Every field that a provider may omit is optional.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Salary {
    pub min: Option<u32>,
    pub max: Option<u32>,
    pub currency: String,
    pub period: SalaryPeriod,
}

/// The normalized job record. Produced exclusively by a `SourceAdapter`'s
/// normalization step; nothing else constructs these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalJob {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub salary: Option<Salary>,
    pub employment_type: Option<JobType>,
    pub experience_level: Option<ExperienceLevel>,
    pub posted_at: Option<DateTime<Utc>>,
    pub url: Option<String>,
    #[serde(default)]
    pub remote: bool,
    /// Origin provider name; exactly one per job.
    pub source: String,
    /// Untouched provider payload, kept for audit.
    pub raw: serde_json::Value,
}

impl CanonicalJob {
    /// Dedup key: lowercased title + "_" + lowercased company.
    pub fn dedup_key(&self) -> String {
        format!(
            "{}_{}",
            self.title.to_lowercase(),
            self.company.to_lowercase()
        )
    }
}

/// Per-provider entry in the aggregated response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceOutcome {
    pub success: bool,
    /// Total the provider reported for the query (may exceed `job_count`).
    pub total: usize,
    /// Jobs this provider actually contributed before dedup.
    pub job_count: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchMetadata {
    pub criteria: SearchCriteria,
    pub providers_queried: Vec<String>,
    pub fetched_at: DateTime<Utc>,
}

/// The unified response for one aggregated search. `success` reflects that
/// the call completed; individual provider failures live under `sources`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationResult {
    pub success: bool,
    pub total: usize,
    pub jobs: Vec<CanonicalJob>,
    pub sources: BTreeMap<String, SourceOutcome>,
    pub metadata: SearchMetadata,
}

/// Rate-limiter counters, snapshotted for observability.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProviderStats {
    pub requests_total: u64,
    pub last_request_at: Option<DateTime<Utc>>,
    pub window_resets_at: Option<DateTime<Utc>>,
}

/// One provider's entry in the connection-probe map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub checked_at: DateTime<Utc>,
    pub error: Option<String>,
}
