use std::collections::HashMap;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

use crate::CanonicalCompany;

/// Legal suffixes stripped from the tail of a company name, longest form
/// first so "incorporated" wins over "inc".
static LEGAL_SUFFIXES: &[&str] = &[
    "incorporated",
    "corporation",
    "company",
    "limited",
    "holdings",
    "l.l.c",
    "llc",
    "inc",
    "ltd",
    "corp",
    "gmbh",
    "plc",
    "pty",
    "s.a",
    "b.v",
    "ag",
    "co",
];

/// Brand aliases that survive suffix stripping. Keys are compact
/// (lowercased, separator-free) forms.
static ALIAS_TO_CANONICAL: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    let aliases: &[(&str, &[&str])] = &[
        ("google", &["google", "alphabet"]),
        ("meta", &["meta", "metaplatforms", "facebook"]),
        ("amazon", &["amazon", "amazoncom", "amazonwebservices", "aws"]),
        ("ibm", &["ibm", "internationalbusinessmachines"]),
        ("microsoft", &["microsoft", "msft"]),
        ("x", &["x", "twitter", "xcorp"]),
        ("jpmorgan chase", &["jpmorganchase", "jpmorgan", "chase"]),
    ];

    let mut map = HashMap::new();
    for (canonical, alias_list) in aliases {
        for alias in *alias_list {
            map.insert(*alias, *canonical);
        }
    }
    map
});

fn nfkc_fold(input: &str) -> String {
    input.nfkc().collect::<String>().trim().to_lowercase()
}

fn compact_key(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

fn strip_legal_suffixes(name: &str) -> String {
    let mut current = name.trim().trim_end_matches(['.', ',']).to_string();

    loop {
        let lowered = current.to_lowercase();
        let mut stripped = false;

        for suffix in LEGAL_SUFFIXES {
            let candidate = lowered.trim_end();
            if let Some(prefix) = candidate.strip_suffix(suffix) {
                // Only strip whole trailing tokens: "Cisco" must not lose "co".
                if prefix.ends_with([' ', ',', '.']) {
                    let cut = prefix.trim_end_matches([' ', ',', '.']);
                    if current.is_char_boundary(cut.len()) {
                        current.truncate(cut.len());
                        stripped = true;
                        break;
                    }
                }
            }
        }

        if !stripped {
            break;
        }
        current = current.trim_end_matches(['.', ',']).trim_end().to_string();
    }

    current
}

/// Slug id for a canonical company name ("Acme Robotics" -> "acme-robotics").
fn company_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in nfkc_fold(name).chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Canonicalize a raw company string: NFKC casefold, strip legal suffixes,
/// resolve brand aliases. Unresolved names become their own canonical entry.
pub fn canonicalize_company(raw: &str) -> CanonicalCompany {
    let stripped = strip_legal_suffixes(raw);
    let base = if stripped.is_empty() {
        raw.trim().to_string()
    } else {
        stripped
    };

    if let Some(canonical) = ALIAS_TO_CANONICAL.get(compact_key(&nfkc_fold(&base)).as_str()) {
        return CanonicalCompany {
            id: company_slug(canonical),
            name: title_case(canonical),
        };
    }

    CanonicalCompany {
        id: company_slug(&base),
        name: base,
    }
}

fn title_case(name: &str) -> String {
    name.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_legal_suffixes_and_punctuation() {
        assert_eq!(canonicalize_company("Acme Robotics, Inc.").name, "Acme Robotics");
        assert_eq!(canonicalize_company("Initech LLC").name, "Initech");
        assert_eq!(canonicalize_company("Globex Corporation").name, "Globex");
        assert_eq!(canonicalize_company("Stark Industries Co.").name, "Stark Industries");
    }

    #[test]
    fn strips_stacked_suffixes() {
        assert_eq!(
            canonicalize_company("Hooli Holdings, LLC").name,
            "Hooli"
        );
    }

    #[test]
    fn does_not_eat_suffix_lookalikes_inside_words() {
        assert_eq!(canonicalize_company("Cisco").name, "Cisco");
        assert_eq!(canonicalize_company("Wellco Labs").name, "Wellco Labs");
    }

    #[test]
    fn resolves_brand_aliases_to_one_entry() {
        let a = canonicalize_company("Facebook");
        let b = canonicalize_company("Meta Platforms, Inc.");
        assert_eq!(a.id, b.id);
        assert_eq!(a.name, "Meta");
    }

    #[test]
    fn unresolved_names_get_their_own_slug() {
        let company = canonicalize_company("Véloce Systèmes");
        assert_eq!(company.id, "v-loce-syst-mes");
        assert_eq!(company.name, "Véloce Systèmes");
    }

    #[test]
    fn same_company_different_spellings_share_id() {
        let a = canonicalize_company("ACME ROBOTICS INC");
        let b = canonicalize_company("Acme Robotics, Inc.");
        assert_eq!(a.id, b.id);
    }
}
