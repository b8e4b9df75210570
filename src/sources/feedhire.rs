// src/sources/feedhire.rs
//! FeedHire: RSS/XML job-feed provider.
//!
//! Items carry a combined headline ("Senior Rust Engineer at Acme Corp
//! (Austin, TX)"), an RFC 2822 pubDate, a free-text description and
//! `<category>` tags. Normalization splits the headline into title, company
//! and location, and mines the description for a salary line.

use std::time::Duration;

use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use quick_xml::de::from_str;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc2822;
use time::{OffsetDateTime, UtcOffset};

use crate::config::{ProviderConfig, ProviderEntry};
use crate::ratelimit::RateLimiter;
use crate::retry::{FetchError, RetryExecutor};
use crate::sources::{
    fallback_job_id, normalize_text, parse_salary, SourceAdapter, SourceDetailOutcome,
    SourceSearchOutcome,
};
use crate::types::{CanonicalJob, ProviderStats, SearchCriteria};

pub const PROVIDER_NAME: &str = "feedhire";
const DEFAULT_BASE_URL: &str = "https://feedhire.example/jobs.rss";

#[derive(Debug, Serialize, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Serialize, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    guid: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    #[serde(rename = "category", default)]
    category: Vec<String>,
}

fn parse_rfc2822_utc(ts: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|x| chrono::DateTime::from_timestamp(x, 0))
}

pub struct FeedHireAdapter {
    mode: Mode,
    config: ProviderConfig,
    limiter: RateLimiter,
    retry: RetryExecutor,
}

enum Mode {
    Fixture(String),
    Http {
        url: String,
        client: reqwest::Client,
    },
}

impl FeedHireAdapter {
    pub fn from_entry(entry: &ProviderEntry) -> Self {
        let config = entry.config.clone();
        let client = reqwest::Client::builder()
            .user_agent("job-aggregator/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(config.timeout())
            .build()
            .expect("reqwest client");
        let url = entry
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            mode: Mode::Http { url, client },
            limiter: RateLimiter::new(config.request_budget, config.window()),
            retry: RetryExecutor::new(config.retry.clone()),
            config,
        }
    }

    pub fn from_fixture(body: &str, config: ProviderConfig) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
            limiter: RateLimiter::new(config.request_budget, config.window()),
            retry: RetryExecutor::new(config.retry.clone()),
            config,
        }
    }

    async fn fetch_feed(&self, criteria: &SearchCriteria) -> Result<String, FetchError> {
        match &self.mode {
            Mode::Fixture(body) => Ok(body.clone()),
            Mode::Http { url, client } => {
                let mut params: Vec<(&str, String)> = Vec::new();
                if !criteria.keywords.is_empty() {
                    params.push(("q", criteria.keywords.join(" ")));
                }
                if !criteria.location.is_empty() {
                    params.push(("l", criteria.location.clone()));
                }
                let resp = client.get(url).query(&params).send().await?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(FetchError::from_status(
                        status,
                        status.canonical_reason().unwrap_or("request failed"),
                    ));
                }
                Ok(resp.text().await?)
            }
        }
    }

    /// Parse a feed body; returns (jobs, dropped).
    fn parse_feed(body: &str) -> Result<(Vec<CanonicalJob>, usize), String> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(body);
        let rss: Rss = from_str(&xml_clean).map_err(|e| format!("feedhire rss xml: {e}"))?;

        let mut jobs = Vec::with_capacity(rss.channel.item.len());
        let mut dropped = 0usize;
        for it in rss.channel.item {
            match normalize_item(&it) {
                Some(job) => jobs.push(job),
                None => dropped += 1,
            }
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("source_parse_ms", "provider" => PROVIDER_NAME).record(ms);
        counter!("source_records_total", "provider" => PROVIDER_NAME)
            .increment((jobs.len() + dropped) as u64);
        if dropped > 0 {
            counter!("source_dropped_total", "provider" => PROVIDER_NAME)
                .increment(dropped as u64);
        }
        Ok((jobs, dropped))
    }
}

#[async_trait::async_trait]
impl SourceAdapter for FeedHireAdapter {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn search_jobs(&self, criteria: &SearchCriteria) -> SourceSearchOutcome {
        self.limiter.acquire().await;
        let body = match self.retry.run(|| self.fetch_feed(criteria)).await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(provider = PROVIDER_NAME, error = %e, "provider search failed");
                counter!("source_errors_total", "provider" => PROVIDER_NAME).increment(1);
                return SourceSearchOutcome::failed(e.to_string());
            }
        };
        match Self::parse_feed(&body) {
            Ok((jobs, dropped)) => {
                let total = jobs.len();
                SourceSearchOutcome::ok(jobs, total, dropped)
            }
            Err(e) => {
                tracing::warn!(provider = PROVIDER_NAME, error = %e, "provider parse failed");
                counter!("source_errors_total", "provider" => PROVIDER_NAME).increment(1);
                SourceSearchOutcome::failed(e)
            }
        }
    }

    async fn job_details(&self, id: &str) -> SourceDetailOutcome {
        // The feed has no detail endpoint; re-fetch and scan by id.
        self.limiter.acquire().await;
        let probe = SearchCriteria::default();
        let body = match self.retry.run(|| self.fetch_feed(&probe)).await {
            Ok(b) => b,
            Err(e) => return SourceDetailOutcome::failed(e.to_string()),
        };
        match Self::parse_feed(&body) {
            Ok((jobs, _)) => jobs
                .into_iter()
                .find(|j| j.id == id)
                .map(SourceDetailOutcome::ok)
                .unwrap_or_else(|| SourceDetailOutcome::failed(format!("job {id} not found"))),
            Err(e) => SourceDetailOutcome::failed(e),
        }
    }

    async fn test_connection(&self) -> Result<(), String> {
        // Probe traffic draws from the same budget as real requests.
        self.limiter.acquire().await;
        let probe = SearchCriteria::default();
        match self.fetch_feed(&probe).await {
            Ok(body) => Self::parse_feed(&body).map(|_| ()),
            Err(e) => Err(e.to_string()),
        }
    }

    fn stats(&self) -> ProviderStats {
        self.limiter.stats()
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

/// Map one feed item into the canonical schema. Returns `None` only when
/// the headline yields no title.
fn normalize_item(it: &Item) -> Option<CanonicalJob> {
    let headline = normalize_text(it.title.as_deref().unwrap_or_default());
    let (title, company, location) = split_headline(&headline);
    if title.is_empty() {
        return None;
    }

    let raw_desc = it.description.as_deref().unwrap_or_default();
    let description = normalize_text(raw_desc);
    let salary = salary_from_description(raw_desc);
    let url = it.link.clone();
    let id = it
        .guid
        .clone()
        .filter(|g| !g.trim().is_empty())
        .unwrap_or_else(|| fallback_job_id(PROVIDER_NAME, &title, &company, url.as_deref()));

    let haystack = format!("{} {}", headline, description).to_lowercase();
    let remote = haystack.contains("remote") || location.to_lowercase().contains("remote");

    Some(CanonicalJob {
        id,
        title,
        company,
        location,
        description,
        requirements: Vec::new(),
        skills: it
            .category
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect(),
        salary,
        employment_type: None,
        experience_level: None,
        posted_at: it.pub_date.as_deref().and_then(parse_rfc2822_utc),
        url,
        remote,
        source: PROVIDER_NAME.to_string(),
        raw: serde_json::to_value(it).unwrap_or(serde_json::Value::Null),
    })
}

/// "Senior Rust Engineer at Acme Corp (Austin, TX)" ->
/// ("Senior Rust Engineer", "Acme Corp", "Austin, TX").
/// Missing pieces come back empty; never errors.
fn split_headline(headline: &str) -> (String, String, String) {
    static RE_LOC: OnceCell<Regex> = OnceCell::new();
    let re_loc = RE_LOC.get_or_init(|| Regex::new(r"\s*\(([^()]+)\)\s*$").unwrap());

    let mut location = String::new();
    let mut rest = headline.to_string();
    if let Some(caps) = re_loc.captures(headline) {
        location = caps[1].trim().to_string();
        rest = re_loc.replace(headline, "").trim().to_string();
    }

    match rest.rsplit_once(" at ") {
        Some((title, company)) => (
            title.trim().to_string(),
            company.trim().to_string(),
            location,
        ),
        None => (rest, String::new(), location),
    }
}

/// Pull a salary out of a "Salary: ..." line, if the description has one.
fn salary_from_description(desc: &str) -> Option<crate::types::Salary> {
    static RE_SAL: OnceCell<Regex> = OnceCell::new();
    let re = RE_SAL.get_or_init(|| Regex::new(r"(?i)salary[:\s]+([^.<\n]+)").unwrap());
    let line = re.captures(desc)?.get(1)?.as_str();
    parse_salary(line)
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headline_splits_into_title_company_location() {
        let (t, c, l) = split_headline("Senior Rust Engineer at Acme Corp (Austin, TX)");
        assert_eq!(t, "Senior Rust Engineer");
        assert_eq!(c, "Acme Corp");
        assert_eq!(l, "Austin, TX");

        let (t2, c2, l2) = split_headline("Data Analyst");
        assert_eq!(t2, "Data Analyst");
        assert!(c2.is_empty());
        assert!(l2.is_empty());
    }

    #[test]
    fn salary_line_is_mined_from_description() {
        let desc = "Great team. Salary: $90,000 - $110,000 per year. Apply now.";
        let sal = salary_from_description(desc).unwrap();
        assert_eq!(sal.min, Some(90_000));
        assert_eq!(sal.max, Some(110_000));
        assert!(salary_from_description("No figures here").is_none());
    }

    #[test]
    fn fixture_feed_parses_items() {
        let xml = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>FeedHire Jobs</title>
  <item>
    <title>Backend Engineer at Beta Labs (Remote)</title>
    <link>https://feedhire.example/jobs/77</link>
    <guid>fh-77</guid>
    <pubDate>Thu, 20 Aug 2026 10:15:00 GMT</pubDate>
    <description>Salary: 120k-140k. Rust backend work.</description>
    <category>Rust</category>
    <category>PostgreSQL</category>
  </item>
  <item>
    <title></title>
    <description>no headline</description>
  </item>
</channel></rss>"#;
        let (jobs, dropped) = FeedHireAdapter::parse_feed(xml).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(dropped, 1);
        let job = &jobs[0];
        assert_eq!(job.id, "fh-77");
        assert_eq!(job.title, "Backend Engineer");
        assert_eq!(job.company, "Beta Labs");
        assert_eq!(job.location, "Remote");
        assert!(job.remote);
        assert_eq!(job.skills, vec!["Rust".to_string(), "PostgreSQL".into()]);
        assert_eq!(job.salary.as_ref().unwrap().max, Some(140_000));
        assert!(job.posted_at.is_some());
    }
}
