pub mod company;
pub mod location;
pub mod skills;
pub mod trust;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

use crate::{
    CanonicalCompany, JobSource, Location, RawPosting, SalaryRange, Seniority, WorkType,
};

pub use company::canonicalize_company;
pub use location::{canonicalize_location, location_key};
pub use skills::{extract_skills, normalize_skill, normalize_skills_vec};
pub use trust::{adjusted_trust, baseline_trust};

/// Canonicalized posting, ready for the deduplicator. Not yet a `Job`: the
/// merge decision determines whether it becomes a new record or lineage on an
/// existing one.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalDraft {
    pub source: JobSource,
    pub source_id: Option<String>,
    pub title: String,
    pub normalized_title: String,
    pub company: CanonicalCompany,
    pub location: Location,
    pub location_key: String,
    pub description: String,
    pub skills: Vec<String>,
    pub seniority: Option<Seniority>,
    pub work_type: Option<WorkType>,
    pub salary: Option<SalaryRange>,
    pub url: String,
    pub posted_at: Option<DateTime<Utc>>,
    pub trust_score: u8,
    pub out_of_scope: bool,
}

#[derive(Debug, Error, PartialEq)]
pub enum CanonicalizeError {
    #[error("posting is missing required field: {0}")]
    MissingField(&'static str),
}

static SENIORITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(intern(ship)?|junior|jr\.?|mid[- ]?level|senior|sr\.?|staff|principal|lead)\b")
        .unwrap()
});

static WORK_TYPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(remote|hybrid|on[- ]?site|in[- ]?office)\b").unwrap());

// Matches "$120,000 - $150,000", "$120k-$150k", "120000-150000 USD" and the
// single-value variants of each.
static SALARY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\$?\s*(\d{1,3}(?:,\d{3})+|\d+)\s*(k)?(?:\s*[-–~]\s*\$?\s*(\d{1,3}(?:,\d{3})+|\d+)\s*(k)?)?")
        .unwrap()
});

/// Title folded for fuzzy comparison: NFKC, lowercase, collapsed whitespace.
pub fn normalize_title(title: &str) -> String {
    let folded: String = title.nfkc().collect::<String>().to_lowercase();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_seniority(explicit: Option<&str>, title: &str) -> Option<Seniority> {
    let haystack = explicit.unwrap_or(title);
    let captured = SENIORITY_RE.captures(haystack)?;
    let token = captured.get(1)?.as_str().to_lowercase();
    match token.as_str() {
        t if t.starts_with("intern") => Some(Seniority::Intern),
        "junior" | "jr" | "jr." => Some(Seniority::Junior),
        t if t.starts_with("mid") => Some(Seniority::Mid),
        "senior" | "sr" | "sr." | "staff" => Some(Seniority::Senior),
        "principal" | "lead" => Some(Seniority::Lead),
        _ => None,
    }
}

fn parse_work_type(explicit: Option<&str>, description: &str) -> Option<WorkType> {
    let haystack = explicit.unwrap_or(description);
    let captured = WORK_TYPE_RE.captures(haystack)?;
    let token = captured.get(1)?.as_str().to_lowercase();
    match token.as_str() {
        "remote" => Some(WorkType::Remote),
        "hybrid" => Some(WorkType::Hybrid),
        _ => Some(WorkType::Onsite),
    }
}

fn parse_amount(digits: &str, k_suffix: bool) -> Option<u32> {
    let cleaned: String = digits.chars().filter(|c| c.is_ascii_digit()).collect();
    let mut value: u32 = cleaned.parse().ok()?;
    if k_suffix {
        value = value.checked_mul(1_000)?;
    }
    // Bare "120" in a salary context means 120k.
    if value < 1_000 {
        value = value.checked_mul(1_000)?;
    }
    Some(value)
}

fn parse_salary(text: Option<&str>) -> Option<SalaryRange> {
    let text = text?;
    let captured = SALARY_RE.captures(text)?;

    let min = parse_amount(captured.get(1)?.as_str(), captured.get(2).is_some())?;
    let max = captured
        .get(3)
        .and_then(|m| parse_amount(m.as_str(), captured.get(4).is_some()));

    Some(SalaryRange {
        min: Some(min),
        max,
        currency: Some("USD".into()),
    })
}

/// Turn a raw posting into a canonical draft. Malformed postings (missing
/// title, company or url) are rejected; the caller skips and logs them
/// without aborting the batch.
pub fn canonicalize_posting(
    raw: &RawPosting,
    us_only: bool,
) -> Result<CanonicalDraft, CanonicalizeError> {
    if raw.title.trim().is_empty() {
        return Err(CanonicalizeError::MissingField("title"));
    }
    if raw.company.trim().is_empty() {
        return Err(CanonicalizeError::MissingField("company"));
    }
    if raw.url.trim().is_empty() {
        return Err(CanonicalizeError::MissingField("url"));
    }

    let company = canonicalize_company(&raw.company);
    let mut location = canonicalize_location(&raw.location);
    location.latitude = raw.latitude;
    location.longitude = raw.longitude;

    let out_of_scope = us_only && location.country.as_deref() != Some("US");

    let mut skill_text = raw.title.clone();
    skill_text.push('\n');
    skill_text.push_str(&raw.description);
    let skills = extract_skills(&skill_text);

    Ok(CanonicalDraft {
        source: raw.source.clone(),
        source_id: raw.source_id.clone(),
        title: raw.title.trim().to_string(),
        normalized_title: normalize_title(&raw.title),
        location_key: location_key(&location),
        company,
        location,
        description: raw.description.clone(),
        skills,
        seniority: parse_seniority(raw.seniority_text.as_deref(), &raw.title),
        work_type: parse_work_type(raw.work_type_text.as_deref(), &raw.description),
        salary: parse_salary(raw.salary_text.as_deref()),
        url: raw.url.trim().to_string(),
        posted_at: raw.posted_at,
        trust_score: baseline_trust(&raw.source),
        out_of_scope,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_raw() -> RawPosting {
        RawPosting {
            source: JobSource::Aggregator("jobhub".into()),
            source_id: Some("jh-101".into()),
            title: "Senior Backend Engineer".into(),
            company: "Acme Robotics, Inc.".into(),
            location: "Portland, OR".into(),
            description: "We build Rust services on PostgreSQL. Hybrid schedule.".into(),
            url: "https://jobs.example.com/jh-101".into(),
            salary_text: Some("$150,000 - $180,000".into()),
            ..RawPosting::default()
        }
    }

    #[test]
    fn canonicalizes_a_complete_posting() {
        let draft = canonicalize_posting(&sample_raw(), true).unwrap();

        assert_eq!(draft.company.name, "Acme Robotics");
        assert_eq!(draft.company.id, "acme-robotics");
        assert_eq!(draft.location.region.as_deref(), Some("OR"));
        assert_eq!(draft.location.country.as_deref(), Some("US"));
        assert!(!draft.out_of_scope);
        assert_eq!(draft.seniority, Some(Seniority::Senior));
        assert_eq!(draft.work_type, Some(WorkType::Hybrid));
        assert_eq!(draft.trust_score, 60);
        assert!(draft.skills.contains(&"rust".to_string()));
        assert!(draft.skills.contains(&"postgresql".to_string()));
    }

    #[test]
    fn rejects_postings_without_required_fields() {
        let mut raw = sample_raw();
        raw.title = "  ".into();
        assert_eq!(
            canonicalize_posting(&raw, true),
            Err(CanonicalizeError::MissingField("title"))
        );

        let mut raw = sample_raw();
        raw.url = String::new();
        assert_eq!(
            canonicalize_posting(&raw, true),
            Err(CanonicalizeError::MissingField("url"))
        );
    }

    #[test]
    fn flags_undeterminable_country_as_out_of_scope() {
        let mut raw = sample_raw();
        raw.location = "Springfield".into();
        let draft = canonicalize_posting(&raw, true).unwrap();
        assert!(draft.out_of_scope);

        // Same posting without US-only filtering stays in scope.
        let draft = canonicalize_posting(&raw, false).unwrap();
        assert!(!draft.out_of_scope);
    }

    #[test]
    fn parses_salary_shorthand() {
        let salary = parse_salary(Some("$120k-$150k")).unwrap();
        assert_eq!(salary.min, Some(120_000));
        assert_eq!(salary.max, Some(150_000));

        let single = parse_salary(Some("up to $95,000")).unwrap();
        assert_eq!(single.min, Some(95_000));
        assert_eq!(single.max, None);
    }

    #[test]
    fn normalized_title_folds_case_and_whitespace() {
        assert_eq!(
            normalize_title("  Ｓｅｎｉｏｒ   Rust\tEngineer "),
            "senior rust engineer"
        );
    }
}
