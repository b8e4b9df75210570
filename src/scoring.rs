// src/scoring.rs
//! Relevance scoring for aggregated jobs.
//!
//! The score is a pure function of the job and the search criteria, in
//! [0, 100]. It exists only to order the merged result list; it is never
//! stored on the job record.

use std::cmp::Ordering;

use crate::types::{CanonicalJob, SearchCriteria};

const TITLE_WEIGHT: f64 = 40.0;
const DESCRIPTION_WEIGHT: f64 = 20.0;
const SKILLS_WEIGHT: f64 = 25.0;
const LOCATION_BONUS: f64 = 10.0;
const REMOTE_BONUS: f64 = 5.0;

/// Score one job against the criteria.
pub fn relevance_score(job: &CanonicalJob, criteria: &SearchCriteria) -> f64 {
    let mut score = 0.0;

    let title = job.title.to_lowercase();
    let description = job.description.to_lowercase();

    score += TITLE_WEIGHT * keyword_fraction(&criteria.keywords, &title);
    score += DESCRIPTION_WEIGHT * keyword_fraction(&criteria.keywords, &description);
    score += SKILLS_WEIGHT * skills_fraction(&criteria.skills, &job.skills);

    if !criteria.location.is_empty() && !job.location.is_empty() {
        let cl = criteria.location.to_lowercase();
        let jl = job.location.to_lowercase();
        if jl.contains(&cl) || cl.contains(&jl) {
            score += LOCATION_BONUS;
        }
    }

    if criteria.remote && job.remote {
        score += REMOTE_BONUS;
    }

    score.clamp(0.0, 100.0)
}

/// Fraction of keywords appearing as a case-insensitive substring of
/// `haystack` (already lowercased). No keywords means no contribution.
fn keyword_fraction(keywords: &[String], haystack: &str) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }
    let hits = keywords
        .iter()
        .filter(|k| !k.is_empty() && haystack.contains(k.to_lowercase().as_str()))
        .count();
    hits as f64 / keywords.len() as f64
}

/// Fraction of wanted skills present among the job's skills; substring
/// match in either direction ("postgres" matches "PostgreSQL").
fn skills_fraction(wanted: &[String], have: &[String]) -> f64 {
    if wanted.is_empty() || have.is_empty() {
        return 0.0;
    }
    let have_lower: Vec<String> = have.iter().map(|s| s.to_lowercase()).collect();
    let hits = wanted
        .iter()
        .map(|w| w.to_lowercase())
        .filter(|w| {
            !w.is_empty()
                && have_lower
                    .iter()
                    .any(|h| h.contains(w.as_str()) || w.contains(h.as_str()))
        })
        .count();
    hits as f64 / wanted.len() as f64
}

/// Order jobs by relevance: score descending, posted-date descending as the
/// tiebreak with unknown dates last. The sort is stable, so full ties keep
/// provider-iteration order.
pub fn rank_jobs(jobs: &mut Vec<CanonicalJob>, criteria: &SearchCriteria) {
    let mut scored: Vec<(f64, CanonicalJob)> = std::mem::take(jobs)
        .into_iter()
        .map(|j| (relevance_score(&j, criteria), j))
        .collect();

    scored.sort_by(|(sa, ja), (sb, jb)| {
        sb.partial_cmp(sa)
            .unwrap_or(Ordering::Equal)
            .then_with(|| match (ja.posted_at, jb.posted_at) {
                (Some(a), Some(b)) => b.cmp(&a),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
    });

    *jobs = scored.into_iter().map(|(_, j)| j).collect();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn job(title: &str, description: &str) -> CanonicalJob {
        CanonicalJob {
            id: title.to_lowercase().replace(' ', "-"),
            title: title.into(),
            company: "Acme".into(),
            location: "Austin, TX".into(),
            description: description.into(),
            requirements: vec![],
            skills: vec![],
            salary: None,
            employment_type: None,
            experience_level: None,
            posted_at: None,
            url: None,
            remote: false,
            source: "test".into(),
            raw: serde_json::Value::Null,
        }
    }

    fn criteria(keywords: &[&str]) -> SearchCriteria {
        SearchCriteria {
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            ..SearchCriteria::default()
        }
    }

    #[test]
    fn full_title_match_outranks_no_match() {
        let c = criteria(&["engineer"]);
        let hit = relevance_score(&job("Software Engineer", ""), &c);
        let miss = relevance_score(&job("Sales Rep", ""), &c);
        assert!(hit > miss);
        assert_eq!(hit, 40.0);
        assert_eq!(miss, 0.0);
    }

    #[test]
    fn partial_keyword_fractions_scale() {
        let c = criteria(&["rust", "engineer"]);
        let half = relevance_score(&job("Rust Developer", ""), &c);
        let full = relevance_score(&job("Rust Engineer", ""), &c);
        assert!(full > half);
        // half the keywords found in the title: 1/2 of 40
        assert_eq!(half, 20.0);
        assert_eq!(full, 40.0);
    }

    #[test]
    fn skills_match_either_direction() {
        let mut j = job("Engineer", "");
        j.skills = vec!["PostgreSQL".into(), "Rust".into()];
        let c = SearchCriteria {
            skills: vec!["postgres".into()],
            ..SearchCriteria::default()
        };
        assert_eq!(relevance_score(&j, &c), SKILLS_WEIGHT);
    }

    #[test]
    fn remote_bonus_requires_both_sides() {
        let mut j = job("Engineer", "");
        j.location = String::new();
        j.remote = true;
        let mut c = criteria(&[]);
        assert_eq!(relevance_score(&j, &c), 0.0);
        c.remote = true;
        assert_eq!(relevance_score(&j, &c), REMOTE_BONUS);
    }

    #[test]
    fn ranking_is_deterministic_and_date_breaks_ties() {
        let c = criteria(&["engineer"]);
        let mut older = job("Engineer", "");
        older.id = "older".into();
        older.posted_at = Some(Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap());
        let mut newer = job("Engineer", "");
        newer.id = "newer".into();
        newer.posted_at = Some(Utc.with_ymd_and_hms(2026, 8, 20, 0, 0, 0).unwrap());
        let mut undated = job("Engineer", "");
        undated.id = "undated".into();

        let mut jobs = vec![older.clone(), undated.clone(), newer.clone()];
        rank_jobs(&mut jobs, &c);
        let order: Vec<&str> = jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(order, vec!["newer", "older", "undated"]);

        // Repeated ranking yields the same order.
        let mut again = vec![older, undated, newer];
        rank_jobs(&mut again, &c);
        let order2: Vec<&str> = again.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(order, order2);
    }
}
