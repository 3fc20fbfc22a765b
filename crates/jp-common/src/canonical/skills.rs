use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use strsim::damerau_levenshtein;
use unicode_normalization::UnicodeNormalization;

/// Skill alias -> canonical taxonomy entry (O(1) lookup).
static ALIAS_TO_CANONICAL: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    let aliases: &[(&str, &[&str])] = &[
        // JavaScript ecosystem
        (
            "javascript",
            &["js", "javascript", "java script", "ecmascript", "es6", "es2015"],
        ),
        ("typescript", &["ts", "typescript", "type script"]),
        ("nodejs", &["node.js", "node js", "nodejs", "node"]),
        (
            "react",
            &["reactjs", "react.js", "react js", "react", "react18"],
        ),
        ("vue", &["vue.js", "vuejs", "vue js", "vue", "vue3"]),
        ("angular", &["angularjs", "angular.js", "angular", "angular2"]),
        ("svelte", &["sveltejs", "svelte.js", "svelte"]),
        ("nextjs", &["next.js", "nextjs", "next js"]),
        ("css", &["css", "css3", "cascading style sheets"]),
        ("sass", &["scss", "sass"]),
        ("tailwind", &["tailwindcss", "tailwind css", "tailwind"]),
        // Backend frameworks
        (
            "spring",
            &["spring boot", "springboot", "spring framework", "spring"],
        ),
        (
            "django",
            &["django rest framework", "drf", "django framework", "django"],
        ),
        ("flask", &["flask framework", "python flask", "flask"]),
        (
            "express",
            &["express.js", "expressjs", "express js", "express"],
        ),
        ("fastapi", &["fast api", "fastapi framework", "fastapi"]),
        ("rails", &["ruby on rails", "ror", "rails"]),
        ("laravel", &["laravel framework", "php laravel", "laravel"]),
        // Databases
        ("postgresql", &["postgres", "pg", "postgresql", "postgre sql"]),
        ("mysql", &["my sql", "mysql", "mariadb"]),
        ("mongodb", &["mongo", "mongo db", "mongodb"]),
        ("redis", &["redis cache", "redis db", "redis"]),
        ("elasticsearch", &["elastic search", "elasticsearch"]),
        ("sqlite", &["sqlite3", "sql lite", "sqlite"]),
        ("sql", &["sql", "structured query language", "tsql", "plsql"]),
        // Cloud platforms
        (
            "aws",
            &["amazon web services", "amazon aws", "aws cloud", "aws"],
        ),
        ("gcp", &["google cloud platform", "google cloud", "gcp"]),
        ("azure", &["microsoft azure", "ms azure", "azure cloud", "azure"]),
        // Programming languages
        ("python", &["python3", "python 3", "py", "python"]),
        ("java", &["java8", "java11", "java17", "openjdk", "java"]),
        ("csharp", &["c#", "c sharp", "csharp", ".net", "dotnet"]),
        ("cplusplus", &["c++", "cpp", "c plus plus"]),
        ("golang", &["go", "golang", "go lang"]),
        ("rust", &["rust lang", "rust language", "rust"]),
        ("php", &["php7", "php8", "php"]),
        ("ruby", &["ruby lang", "ruby language", "ruby"]),
        ("swift", &["swift lang", "ios swift", "swift"]),
        ("kotlin", &["kotlin lang", "kotlin jvm", "kotlin"]),
        ("scala", &["scala lang", "scala"]),
        // DevOps and tools
        ("docker", &["containerization", "docker container", "docker"]),
        (
            "kubernetes",
            &["k8s", "kube", "kubernetes orchestration", "kubernetes"],
        ),
        ("jenkins", &["jenkins ci", "jenkins ci/cd", "jenkins"]),
        ("git", &["git scm", "github", "gitlab", "git"]),
        ("terraform", &["infrastructure as code", "iac", "terraform"]),
        ("ansible", &["configuration management", "ansible"]),
        ("ci/cd", &["cicd", "ci/cd", "continuous integration"]),
        // Data and ML
        ("spark", &["apache spark", "pyspark", "spark"]),
        ("kafka", &["apache kafka", "kafka streams", "kafka"]),
        ("airflow", &["apache airflow", "airflow"]),
        ("pandas", &["python pandas", "pandas"]),
        ("numpy", &["numerical python", "numpy"]),
        ("tensorflow", &["tensor flow", "tf", "tensorflow"]),
        ("pytorch", &["torch", "py torch", "pytorch"]),
        (
            "machine learning",
            &["machine learning", "ml", "deep learning", "ai"],
        ),
        // Mobile
        (
            "react native",
            &["react native", "react-native", "reactnative"],
        ),
        ("flutter", &["flutter framework", "dart flutter", "flutter"]),
        ("android", &["android sdk", "android development", "android"]),
        ("ios", &["ios sdk", "ios development", "ios"]),
        // Testing
        ("jest", &["jest testing", "jest framework", "jest"]),
        ("cypress", &["cypress testing", "e2e testing", "cypress"]),
        ("selenium", &["selenium webdriver", "selenium"]),
        ("pytest", &["python testing", "py test", "pytest"]),
        // Messaging / APIs
        ("graphql", &["graph ql", "graphql"]),
        ("grpc", &["g rpc", "grpc"]),
        ("rest", &["rest api", "restful", "rest"]),
        ("rabbitmq", &["rabbit mq", "rabbitmq"]),
    ];

    let mut map = HashMap::new();
    for (canonical, alias_list) in aliases {
        map.insert(*canonical, *canonical);
        for alias in *alias_list {
            map.insert(*alias, *canonical);
        }
    }
    map
});

/// Skills a listing implies without naming: a Django shop is a Python shop.
/// Expansion is one level deep and applied after alias resolution.
static IMPLIED_SKILLS: LazyLock<HashMap<&'static str, &'static [&'static str]>> =
    LazyLock::new(|| {
        HashMap::from([
            ("django", &["python"][..]),
            ("flask", &["python"][..]),
            ("fastapi", &["python"][..]),
            ("pandas", &["python"][..]),
            ("numpy", &["python"][..]),
            ("pytest", &["python"][..]),
            ("pytorch", &["python", "machine learning"][..]),
            ("tensorflow", &["python", "machine learning"][..]),
            ("rails", &["ruby"][..]),
            ("laravel", &["php"][..]),
            ("spring", &["java"][..]),
            ("react", &["javascript"][..]),
            ("vue", &["javascript"][..]),
            ("angular", &["typescript"][..]),
            ("svelte", &["javascript"][..]),
            ("nextjs", &["react", "javascript"][..]),
            ("express", &["nodejs", "javascript"][..]),
            ("nodejs", &["javascript"][..]),
            ("react native", &["react", "javascript"][..]),
            ("jest", &["javascript"][..]),
            ("kubernetes", &["docker"][..]),
        ])
    });

/// Keys with separators removed, to absorb light spelling variation
/// ("react-js", "react.js", "ReactJS" all collapse to "reactjs").
static COMPACT_ALIAS_TO_CANONICAL: LazyLock<HashMap<String, &'static str>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    for (alias, canonical) in ALIAS_TO_CANONICAL.iter() {
        map.entry(compact_key(alias)).or_insert(*canonical);
    }
    map
});

fn nfkc_lower_trim(input: &str) -> String {
    input.nfkc().collect::<String>().trim().to_lowercase()
}

fn compact_key(input: &str) -> String {
    input
        .nfkc()
        .collect::<String>()
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, ' ' | '.' | '-' | '_' | '/' | ','))
        .collect()
}

fn match_canonical_token(token: &str) -> Option<String> {
    if token.is_empty() {
        return None;
    }

    if let Some(canonical) = ALIAS_TO_CANONICAL.get(token) {
        return Some(canonical.to_string());
    }

    let compact = compact_key(token);
    if let Some(canonical) = COMPACT_ALIAS_TO_CANONICAL.get(&compact) {
        return Some((*canonical).to_string());
    }

    fuzzy_match_canonical(&compact)
}

fn fuzzy_match_canonical(compact: &str) -> Option<String> {
    // Short tokens (go, ts, c#) are exact-match only; fuzzy matching them
    // produces too many false positives.
    if compact.len() < 5 {
        return None;
    }

    let mut best: Option<(&str, usize)> = None;
    for (alias, canonical) in COMPACT_ALIAS_TO_CANONICAL.iter() {
        if alias.len() < 5 || canonical.len() < 5 {
            continue;
        }

        let distance = damerau_levenshtein(compact, alias);
        if distance == 0 {
            return Some((*canonical).to_string());
        }

        let len = compact.len().max(alias.len());
        let acceptable = distance == 1 || (len >= 8 && distance == 2);
        if !acceptable {
            continue;
        }

        match best {
            None => best = Some((*canonical, distance)),
            Some((_, best_dist)) if distance < best_dist => best = Some((*canonical, distance)),
            _ => {}
        }
    }

    best.map(|(canonical, _)| canonical.to_string())
}

/// Map one skill string onto the taxonomy. Unknown skills come back
/// lowercased so profile-vs-job comparison stays case-insensitive.
pub fn normalize_skill(skill: &str) -> String {
    let normalized = nfkc_lower_trim(skill);
    if let Some(canonical) = match_canonical_token(&normalized) {
        return canonical;
    }

    for segment in skill
        .split(|c: char| matches!(c, ' ' | '/' | ',' | ';' | '|' | '+'))
        .map(nfkc_lower_trim)
        .filter(|s| !s.is_empty())
    {
        if let Some(canonical) = match_canonical_token(&segment) {
            return canonical;
        }
    }

    normalized
}

/// Normalize a skill list into a sorted, deduplicated Vec (storage shape).
pub fn normalize_skills_vec(skills: &[String]) -> Vec<String> {
    let mut result: Vec<String> = skills
        .iter()
        .map(|s| normalize_skill(s))
        .filter(|s| s.len() >= 2)
        .collect();
    result.sort();
    result.dedup();
    result
}

fn expand_implied(found: &mut HashSet<String>) {
    let seeds: Vec<String> = found.iter().cloned().collect();
    for skill in seeds {
        if let Some(implied) = IMPLIED_SKILLS.get(skill.as_str()) {
            for extra in *implied {
                found.insert((*extra).to_string());
            }
        }
    }
}

/// Aliases too ambiguous to trust inside prose ("on the go", "the rest of").
/// They still resolve through `normalize_skill`, where the input is a
/// declared skill rather than free text.
static PROSE_EXCLUDED: &[&str] = &["go", "rest", "py", "tf", "ts", "ml", "ai", "es", "pg"];

/// Extract taxonomy skills from free text (title + description). Only exact
/// and compact alias hits count here; fuzzy matching against arbitrary prose
/// would hallucinate skills. Implied skills are expanded afterwards.
pub fn extract_skills(text: &str) -> Vec<String> {
    let lowered = nfkc_lower_trim(text);
    let tokens: Vec<&str> = lowered
        .split(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '+' | '#' | '.' | '/')))
        .map(|t| t.trim_matches('.'))
        .filter(|t| !t.is_empty())
        .collect();

    let mut found: HashSet<String> = HashSet::new();

    for window in tokens.windows(2) {
        let bigram = format!("{} {}", window[0], window[1]);
        if let Some(canonical) = ALIAS_TO_CANONICAL.get(bigram.as_str()) {
            found.insert((*canonical).to_string());
        } else if let Some(canonical) = COMPACT_ALIAS_TO_CANONICAL.get(&compact_key(&bigram)) {
            found.insert((*canonical).to_string());
        }
    }

    for token in &tokens {
        if PROSE_EXCLUDED.contains(token) {
            continue;
        }
        if let Some(canonical) = ALIAS_TO_CANONICAL.get(*token) {
            found.insert((*canonical).to_string());
        } else if let Some(canonical) = COMPACT_ALIAS_TO_CANONICAL.get(&compact_key(token)) {
            found.insert((*canonical).to_string());
        }
    }

    expand_implied(&mut found);

    let mut result: Vec<String> = found.into_iter().collect();
    result.sort();
    result
}
