/// Canonical job corpus. One row per real-world opening; raw duplicates
/// live in jp.job_lineage.
pub const JOBS_DDL: &str = r#"
CREATE TABLE jp.jobs (
    canonical_id VARCHAR(26) PRIMARY KEY,
    source_kind VARCHAR(20) NOT NULL,
    source_name TEXT NOT NULL,
    source_id TEXT NOT NULL,

    title TEXT NOT NULL,
    normalized_title TEXT NOT NULL,
    company_id TEXT NOT NULL,
    company_name TEXT NOT NULL,

    location_city TEXT,
    location_region TEXT,
    location_country TEXT,
    latitude DOUBLE PRECISION,
    longitude DOUBLE PRECISION,
    location_raw TEXT NOT NULL DEFAULT '',

    description TEXT NOT NULL DEFAULT '',
    skills JSONB NOT NULL DEFAULT '[]',
    seniority VARCHAR(20),
    work_type VARCHAR(20),
    salary_min INTEGER,
    salary_max INTEGER,
    salary_currency VARCHAR(8),
    url TEXT NOT NULL,

    trust_score INTEGER NOT NULL,
    liveness VARCHAR(10) NOT NULL DEFAULT 'unknown',
    first_seen_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    last_verified_at TIMESTAMPTZ,
    posted_at TIMESTAMPTZ,
    next_probe_at TIMESTAMPTZ,
    probe_failures INTEGER NOT NULL DEFAULT 0,
    out_of_scope BOOLEAN NOT NULL DEFAULT false,

    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_trust_score CHECK (trust_score >= 0 AND trust_score <= 100),
    CONSTRAINT chk_liveness CHECK (liveness IN ('unknown', 'active', 'stale')),
    CONSTRAINT chk_source_kind CHECK (source_kind IN ('internal', 'company', 'aggregator')),

    UNIQUE(source_kind, source_name, source_id)
);

CREATE INDEX idx_jobs_liveness ON jp.jobs(liveness);
CREATE INDEX idx_jobs_company ON jp.jobs(company_id);
CREATE INDEX idx_jobs_next_probe ON jp.jobs(next_probe_at) WHERE next_probe_at IS NOT NULL;
CREATE INDEX idx_jobs_feed ON jp.jobs(liveness, posted_at DESC)
    WHERE NOT out_of_scope;
"#;

/// Every raw record that contributed to a canonical job, including the one
/// it was created from. Nothing here is ever deleted.
pub const JOB_LINEAGE_DDL: &str = r#"
CREATE TABLE jp.job_lineage (
    id BIGSERIAL PRIMARY KEY,
    canonical_id VARCHAR(26) NOT NULL REFERENCES jp.jobs(canonical_id),
    source_kind VARCHAR(20) NOT NULL,
    source_name TEXT NOT NULL,
    source_id TEXT NOT NULL,
    trust_score INTEGER NOT NULL,
    first_seen_at TIMESTAMPTZ NOT NULL,
    last_seen_at TIMESTAMPTZ NOT NULL,

    UNIQUE(canonical_id, source_kind, source_name, source_id)
);

CREATE INDEX idx_job_lineage_canonical ON jp.job_lineage(canonical_id);
CREATE INDEX idx_job_lineage_source ON jp.job_lineage(source_kind, source_name, source_id);
"#;

/// One row per ingestion batch. corpus_version is assigned on completion
/// and increases monotonically; feed cache keys embed it.
pub const INGESTION_RUNS_DDL: &str = r#"
CREATE TABLE jp.ingestion_runs (
    id BIGSERIAL PRIMARY KEY,
    run_id VARCHAR(26) NOT NULL UNIQUE,
    corpus_version BIGINT,
    started_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    completed_at TIMESTAMPTZ,
    source_counts JSONB NOT NULL DEFAULT '{}',
    postings_fetched INTEGER NOT NULL DEFAULT 0,
    postings_inserted INTEGER NOT NULL DEFAULT 0,
    postings_updated INTEGER NOT NULL DEFAULT 0,
    postings_absorbed INTEGER NOT NULL DEFAULT 0,
    postings_skipped INTEGER NOT NULL DEFAULT 0,

    CONSTRAINT chk_corpus_version CHECK (corpus_version IS NULL OR corpus_version > 0)
);

CREATE UNIQUE INDEX idx_ingestion_runs_corpus_version ON jp.ingestion_runs(corpus_version)
    WHERE corpus_version IS NOT NULL;
CREATE INDEX idx_ingestion_runs_started ON jp.ingestion_runs(started_at DESC);
"#;

/// First-party postings published through our own board; the internal
/// adapter reads these.
pub const INTERNAL_POSTINGS_DDL: &str = r#"
CREATE TABLE jp.internal_postings (
    source_id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    company TEXT NOT NULL,
    location TEXT,
    description TEXT,
    url TEXT NOT NULL,
    posted_at TIMESTAMPTZ,
    salary_text TEXT,
    work_type_text TEXT,
    seniority_text TEXT,
    latitude DOUBLE PRECISION,
    longitude DOUBLE PRECISION,
    is_open BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_internal_postings_open ON jp.internal_postings(posted_at DESC) WHERE is_open;
"#;

/// Rolling probe outcome counters per source, folded into trust
/// adjustment on re-verification.
pub const SOURCE_HEALTH_DDL: &str = r#"
CREATE TABLE jp.source_health (
    source_kind VARCHAR(20) NOT NULL,
    source_name TEXT NOT NULL,
    successes BIGINT NOT NULL DEFAULT 0,
    failures BIGINT NOT NULL DEFAULT 0,
    success_rate DOUBLE PRECISION,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    PRIMARY KEY (source_kind, source_name),
    CONSTRAINT chk_success_rate CHECK (
        success_rate IS NULL OR (success_rate >= 0.0 AND success_rate <= 1.0)
    )
);
"#;

/// Candidate profile snapshots, written by the profile subsystem and read
/// here for ranking. profile_hash changes force feed recomputation.
pub const CANDIDATE_PROFILES_DDL: &str = r#"
CREATE TABLE jp.candidate_profiles (
    candidate_id TEXT PRIMARY KEY,
    skills JSONB NOT NULL DEFAULT '[]',
    experience JSONB NOT NULL DEFAULT '[]',
    education JSONB NOT NULL DEFAULT '[]',
    location_preference TEXT,
    salary_expectation INTEGER,
    seniority VARCHAR(20),
    profile_hash VARCHAR(16) NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#;

/// Candidate job actions, written by the actions subsystem. Saved, hidden
/// and applied jobs are excluded from future feeds; saves and applies also
/// feed the personalization signal.
pub const CANDIDATE_ACTIONS_DDL: &str = r#"
CREATE TABLE jp.candidate_actions (
    id BIGSERIAL PRIMARY KEY,
    candidate_id TEXT NOT NULL,
    job_id VARCHAR(26) NOT NULL,
    action VARCHAR(20) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_action CHECK (action IN ('saved', 'hidden', 'applied')),
    UNIQUE(candidate_id, job_id, action)
);

CREATE INDEX idx_candidate_actions_candidate ON jp.candidate_actions(candidate_id, created_at DESC);
"#;
