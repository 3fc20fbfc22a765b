use crate::canonical::{location_key, normalize_title};
use crate::{CandidateProfile, Job};

#[derive(Debug, Clone)]
pub struct WeightedToken {
    pub token: String,
    pub weight: f32,
}

impl WeightedToken {
    pub fn new(token: impl Into<String>, weight: f32) -> Self {
        Self {
            token: token.into(),
            weight,
        }
    }
}

/// Shared token scheme (jobs and candidates emit the same token names so
/// their vectors land in a common space):
/// - skill:<normalized>     required/possessed skills
/// - title:<word>           normalized title words
/// - seniority:<level>
/// - work:<type>            remote/hybrid/onsite
/// - loc:<location key>
/// - salary:<bucket>
/// - edu:<word>             candidate-side only
pub fn tokenize_job(job: &Job) -> Vec<WeightedToken> {
    let mut tokens = Vec::new();

    for skill in &job.skills {
        tokens.push(WeightedToken::new(format!("skill:{}", skill.to_lowercase()), 3.0));
    }

    for word in normalize_title(&job.title).split_whitespace() {
        tokens.push(WeightedToken::new(format!("title:{word}"), 2.0));
    }

    if let Some(seniority) = job.seniority {
        tokens.push(WeightedToken::new(format!("seniority:{seniority}"), 1.0));
    }

    if let Some(work_type) = job.work_type {
        tokens.push(WeightedToken::new(format!("work:{work_type}"), 1.5));
    }

    let loc_key = location_key(&job.location);
    if loc_key != "||" {
        tokens.push(WeightedToken::new(format!("loc:{loc_key}"), 1.5));
    }

    if let Some(ref salary) = job.salary {
        if let Some(anchor) = salary.max.or(salary.min) {
            tokens.push(WeightedToken::new(
                format!("salary:{}", salary_bucket(anchor)),
                1.0,
            ));
        }
    }

    tokens
}

pub fn tokenize_candidate(profile: &CandidateProfile) -> Vec<WeightedToken> {
    let mut tokens = Vec::new();

    for skill in &profile.skills {
        tokens.push(WeightedToken::new(format!("skill:{}", skill.to_lowercase()), 3.0));
    }

    for entry in &profile.experience {
        for word in normalize_title(&entry.title).split_whitespace() {
            tokens.push(WeightedToken::new(format!("title:{word}"), 2.0));
        }
    }

    for entry in &profile.education {
        for word in normalize_title(entry).split_whitespace() {
            tokens.push(WeightedToken::new(format!("edu:{word}"), 1.0));
        }
    }

    if let Some(seniority) = profile.seniority {
        tokens.push(WeightedToken::new(format!("seniority:{seniority}"), 1.0));
    }

    if let Some(ref preference) = profile.location_preference {
        let location = crate::canonical::canonicalize_location(preference);
        let loc_key = location_key(&location);
        if loc_key != "||" {
            tokens.push(WeightedToken::new(format!("loc:{loc_key}"), 1.5));
        }
    }

    if let Some(expectation) = profile.salary_expectation {
        tokens.push(WeightedToken::new(
            format!("salary:{}", salary_bucket(expectation)),
            1.0,
        ));
    }

    tokens
}

/// Annual USD buckets.
fn salary_bucket(amount: u32) -> &'static str {
    match amount {
        0..=79_999 => "under80",
        80_000..=119_999 => "80-120",
        120_000..=159_999 => "120-160",
        160_000..=199_999 => "160-200",
        _ => "200+",
    }
}
