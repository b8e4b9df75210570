// src/sources/mod.rs
//! Provider adapters and the shared normalization toolkit.
//!
//! Every adapter maps its provider's raw response into [`CanonicalJob`]s and
//! reports failure as a value, never as a panic or an error escaping
//! `search_jobs` — the aggregation manager treats all providers uniformly.

pub mod feedhire;
pub mod jobwire;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::{OffsetDateTime, UtcOffset};

use crate::config::ProviderConfig;
use crate::types::{CanonicalJob, ProviderStats, Salary, SalaryPeriod, SearchCriteria};

/// Outcome of one provider search. `success == false` implies `jobs` is
/// empty and `error` explains why.
#[derive(Debug, Clone, Default)]
pub struct SourceSearchOutcome {
    pub success: bool,
    pub jobs: Vec<CanonicalJob>,
    /// Total the provider reported for the query, when it says so.
    pub total: usize,
    /// Raw records dropped because normalization failed.
    pub dropped: usize,
    pub error: Option<String>,
}

impl SourceSearchOutcome {
    pub fn ok(jobs: Vec<CanonicalJob>, total: usize, dropped: usize) -> Self {
        Self {
            success: true,
            jobs,
            total,
            dropped,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Outcome of a single-item detail fetch.
#[derive(Debug, Clone)]
pub struct SourceDetailOutcome {
    pub success: bool,
    pub job: Option<CanonicalJob>,
    pub error: Option<String>,
}

impl SourceDetailOutcome {
    pub fn ok(job: CanonicalJob) -> Self {
        Self {
            success: true,
            job: Some(job),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            job: None,
            error: Some(error.into()),
        }
    }
}

/// One external job-listing provider. Each implementation owns its own
/// rate limiter and retry executor; callers serialize through one instance
/// per provider.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &str;

    /// Provider-specific search. Rate-limited and retried internally.
    /// Failures come back as values; this never panics on provider trouble.
    async fn search_jobs(&self, criteria: &SearchCriteria) -> SourceSearchOutcome;

    /// Single-item fetch with the same isolation discipline.
    async fn job_details(&self, id: &str) -> SourceDetailOutcome;

    /// Minimal, low-cost reachability probe. `Err` carries the reason.
    async fn test_connection(&self) -> Result<(), String>;

    /// Rate-limiter counter snapshot.
    fn stats(&self) -> ProviderStats;

    fn config(&self) -> &ProviderConfig;
}

/// Normalize free text: decode HTML entities, strip tags, collapse
/// whitespace, cap length.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // Length cap: 4000 chars (descriptions can be huge)
    if out.chars().count() > 4000 {
        out = out.chars().take(4000).collect();
    }
    out
}

/// Split a free-form list field ("Rust, Tokio; SQL") into trimmed items.
pub fn split_list(s: &str) -> Vec<String> {
    s.split([',', ';', '\n', '|'])
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| p.to_string())
        .collect()
}

/// Parse a salary string ("$90,000 - $120,000 per year", "90k–120k USD",
/// "€35/hour") into a structured range. Returns `None` when no amount can
/// be extracted; never errors.
pub fn parse_salary(s: &str) -> Option<Salary> {
    static RE_MONEY: OnceCell<Regex> = OnceCell::new();
    let re = RE_MONEY.get_or_init(|| {
        Regex::new(r"(?i)(?P<cur>[$€£])?\s*(?P<num>\d[\d,]*(?:\.\d+)?)\s*(?P<k>k\b)?").unwrap()
    });

    let mut amounts = Vec::new();
    let mut symbol = None;
    for caps in re.captures_iter(s) {
        let num = caps.name("num")?.as_str().replace(',', "");
        let Ok(mut v) = num.parse::<f64>() else {
            continue;
        };
        if caps.name("k").is_some() {
            v *= 1000.0;
        }
        if symbol.is_none() {
            symbol = caps.name("cur").map(|m| m.as_str().to_string());
        }
        amounts.push(v.round() as u32);
        if amounts.len() == 2 {
            break;
        }
    }
    if amounts.is_empty() {
        return None;
    }

    let lower = s.to_ascii_lowercase();
    let currency = match symbol.as_deref() {
        Some("$") => "USD",
        Some("€") => "EUR",
        Some("£") => "GBP",
        _ if lower.contains("eur") => "EUR",
        _ if lower.contains("gbp") => "GBP",
        _ => "USD",
    }
    .to_string();

    let period = if lower.contains("hour") || lower.contains("/hr") || lower.contains(" hr") {
        SalaryPeriod::Hourly
    } else if lower.contains("month") || lower.contains("/mo") {
        SalaryPeriod::Monthly
    } else {
        SalaryPeriod::Yearly
    };

    let (min, max) = match amounts.as_slice() {
        [a] => (Some(*a), Some(*a)),
        [a, b] => (Some(*a.min(b)), Some(*a.max(b))),
        _ => (None, None),
    };

    Some(Salary {
        min,
        max,
        currency,
        period,
    })
}

/// Parse a posted-date string into an absolute timestamp. Tries RFC 3339,
/// RFC 2822 and plain `YYYY-MM-DD`; unparseable input yields `None`.
pub fn parse_posted_date(s: &str) -> Option<DateTime<Utc>> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    if let Ok(dt) = OffsetDateTime::parse(t, &Rfc3339) {
        return from_unix(dt.to_offset(UtcOffset::UTC).unix_timestamp());
    }
    if let Ok(dt) = OffsetDateTime::parse(t, &Rfc2822) {
        return from_unix(dt.to_offset(UtcOffset::UTC).unix_timestamp());
    }
    if let Ok(d) = NaiveDate::parse_from_str(t, "%Y-%m-%d") {
        let naive = d.and_hms_opt(0, 0, 0)?;
        return Some(Utc.from_utc_datetime(&naive));
    }
    None
}

fn from_unix(ts: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(ts, 0).single()
}

/// Stable short id for records whose provider ships no id of its own.
pub fn fallback_job_id(provider: &str, title: &str, company: &str, url: Option<&str>) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(provider.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(title.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(company.as_bytes());
    hasher.update(b"\x1f");
    hasher.update(url.unwrap_or_default().as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(16);
    for b in digest.iter().take(8) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
