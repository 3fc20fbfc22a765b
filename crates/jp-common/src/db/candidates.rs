use std::collections::HashSet;

use deadpool_postgres::PoolError;
use serde::Deserialize;
use serde_json::Value;
use tokio_postgres::Error as PgError;
use tracing::instrument;

use crate::canonical::normalize_skills_vec;
use crate::db::PgPool;
use crate::ranking::InteractionSignal;
use crate::{CandidateProfile, ExperienceEntry};

#[derive(Debug, thiserror::Error)]
pub enum CandidateFetchError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] PgError),
}

#[derive(Debug, Deserialize)]
struct ExperienceJson {
    #[serde(default)]
    title: String,
    #[serde(default)]
    company: String,
    years: Option<f32>,
}

fn parse_string_array(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect(),
        _ => vec![],
    }
}

fn parse_experience(value: Value) -> Vec<ExperienceEntry> {
    serde_json::from_value::<Vec<ExperienceJson>>(value)
        .unwrap_or_default()
        .into_iter()
        .map(|e| ExperienceEntry {
            title: e.title,
            company: e.company,
            years: e.years,
        })
        .collect()
}

/// Profile snapshot written by the profile subsystem; read-only here.
/// Declared skills are folded onto the internal taxonomy so profile and
/// job skills compare in the same vocabulary ("K8s" matches "kubernetes").
#[instrument(skip(pool))]
pub async fn fetch_profile(
    pool: &PgPool,
    candidate_id: &str,
) -> Result<Option<CandidateProfile>, CandidateFetchError> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            "SELECT candidate_id, skills, experience, education, \
                    location_preference, salary_expectation, seniority \
             FROM jp.candidate_profiles WHERE candidate_id = $1",
            &[&candidate_id],
        )
        .await?;

    Ok(row.map(|row| CandidateProfile {
        candidate_id: row.get("candidate_id"),
        skills: normalize_skills_vec(&parse_string_array(row.get("skills"))),
        experience: parse_experience(row.get("experience")),
        education: parse_string_array(row.get("education")),
        location_preference: row.get("location_preference"),
        salary_expectation: row
            .get::<_, Option<i32>>("salary_expectation")
            .map(|v| v.max(0) as u32),
        seniority: row
            .get::<_, Option<String>>("seniority")
            .and_then(|s| s.parse().ok()),
    }))
}

/// Everything the candidate already acted on, plus the personalization
/// signal derived from saves and applies.
#[derive(Debug, Default)]
pub struct CandidateActions {
    pub excluded_job_ids: HashSet<String>,
    pub signal: InteractionSignal,
}

#[instrument(skip(pool))]
pub async fn fetch_actions(
    pool: &PgPool,
    candidate_id: &str,
) -> Result<CandidateActions, CandidateFetchError> {
    let client = pool.get().await?;
    let rows = client
        .query(
            "SELECT a.job_id, a.action, j.company_id, j.skills \
             FROM jp.candidate_actions a \
             LEFT JOIN jp.jobs j ON j.canonical_id = a.job_id \
             WHERE a.candidate_id = $1",
            &[&candidate_id],
        )
        .await?;

    let mut actions = CandidateActions::default();
    for row in rows {
        let job_id: String = row.get("job_id");
        let action: String = row.get("action");
        actions.excluded_job_ids.insert(job_id);

        // Hiding a job excludes it but says nothing about taste.
        if action == "saved" || action == "applied" {
            if let Some(company_id) = row.get::<_, Option<String>>("company_id") {
                actions.signal.company_ids.insert(company_id);
            }
            if let Some(skills) = row.get::<_, Option<Value>>("skills") {
                for skill in parse_string_array(skills) {
                    actions.signal.skills.insert(skill.to_lowercase());
                }
            }
        }
    }

    Ok(actions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn experience_json_tolerates_missing_fields() {
        let parsed = parse_experience(json!([
            {"title": "Backend Engineer", "company": "Acme", "years": 3.5},
            {"title": "Intern"}
        ]));
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].years, Some(3.5));
        assert!(parsed[1].company.is_empty());
        assert!(parsed[1].years.is_none());
    }

    #[test]
    fn malformed_experience_degrades_to_empty() {
        assert!(parse_experience(json!("not an array")).is_empty());
    }

    #[test]
    fn string_arrays_drop_non_string_entries() {
        let parsed = parse_string_array(json!(["rust", 7, null, "aws"]));
        assert_eq!(parsed, vec!["rust".to_string(), "aws".to_string()]);
    }
}
