use std::collections::HashMap;
use std::sync::LazyLock;

use crate::Location;

/// US state names keyed by postal abbreviation. Used both to recognize a
/// region token and to infer `country = US` when the origin omits it.
static US_STATES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("AL", "Alabama"),
        ("AK", "Alaska"),
        ("AZ", "Arizona"),
        ("AR", "Arkansas"),
        ("CA", "California"),
        ("CO", "Colorado"),
        ("CT", "Connecticut"),
        ("DE", "Delaware"),
        ("DC", "District of Columbia"),
        ("FL", "Florida"),
        ("GA", "Georgia"),
        ("HI", "Hawaii"),
        ("ID", "Idaho"),
        ("IL", "Illinois"),
        ("IN", "Indiana"),
        ("IA", "Iowa"),
        ("KS", "Kansas"),
        ("KY", "Kentucky"),
        ("LA", "Louisiana"),
        ("ME", "Maine"),
        ("MD", "Maryland"),
        ("MA", "Massachusetts"),
        ("MI", "Michigan"),
        ("MN", "Minnesota"),
        ("MS", "Mississippi"),
        ("MO", "Missouri"),
        ("MT", "Montana"),
        ("NE", "Nebraska"),
        ("NV", "Nevada"),
        ("NH", "New Hampshire"),
        ("NJ", "New Jersey"),
        ("NM", "New Mexico"),
        ("NY", "New York"),
        ("NC", "North Carolina"),
        ("ND", "North Dakota"),
        ("OH", "Ohio"),
        ("OK", "Oklahoma"),
        ("OR", "Oregon"),
        ("PA", "Pennsylvania"),
        ("RI", "Rhode Island"),
        ("SC", "South Carolina"),
        ("SD", "South Dakota"),
        ("TN", "Tennessee"),
        ("TX", "Texas"),
        ("UT", "Utah"),
        ("VT", "Vermont"),
        ("VA", "Virginia"),
        ("WA", "Washington"),
        ("WV", "West Virginia"),
        ("WI", "Wisconsin"),
        ("WY", "Wyoming"),
    ])
});

static STATE_NAME_TO_ABBREV: LazyLock<HashMap<String, &'static str>> = LazyLock::new(|| {
    US_STATES
        .iter()
        .map(|(abbrev, name)| (name.to_lowercase(), *abbrev))
        .collect()
});

fn match_us_state(token: &str) -> Option<&'static str> {
    let trimmed = token.trim().trim_end_matches('.');
    if trimmed.len() == 2 {
        let upper = trimmed.to_uppercase();
        if let Some((abbrev, _)) = US_STATES.get_key_value(upper.as_str()) {
            return Some(abbrev);
        }
    }
    STATE_NAME_TO_ABBREV.get(&trimmed.to_lowercase()).copied()
}

fn match_country(token: &str) -> Option<&'static str> {
    match token
        .trim()
        .trim_end_matches('.')
        .to_lowercase()
        .replace('.', "")
        .as_str()
    {
        "us" | "usa" | "united states" | "united states of america" | "america" => Some("US"),
        "canada" | "ca" => Some("CA"),
        "united kingdom" | "uk" | "great britain" | "england" => Some("GB"),
        "germany" | "de" | "deutschland" => Some("DE"),
        "india" | "in" => Some("IN"),
        "australia" | "au" => Some("AU"),
        _ => None,
    }
}

/// Parse a raw location string into its canonical parts. Handles the common
/// "city, region, country" shapes; a recognized US state implies the country.
/// A location nobody can place keeps only `raw`, and the US-only filter will
/// flag the posting rather than guess.
pub fn canonicalize_location(raw: &str) -> Location {
    let mut location = Location {
        raw: raw.trim().to_string(),
        ..Location::default()
    };

    let parts: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    match parts.as_slice() {
        [] => {}
        [single] => {
            // State lookup first: "CA" is California here, not Canada.
            if let Some(state) = match_us_state(single) {
                location.region = Some(state.to_string());
                location.country = Some("US".into());
            } else if let Some(country) = match_country(single) {
                location.country = Some(country.to_string());
            } else if !single.eq_ignore_ascii_case("remote") {
                location.city = Some((*single).to_string());
            }
        }
        [city, second] => {
            location.city = Some((*city).to_string());
            if let Some(state) = match_us_state(second) {
                location.region = Some(state.to_string());
                location.country = Some("US".into());
            } else if let Some(country) = match_country(second) {
                location.country = Some(country.to_string());
            } else {
                location.region = Some((*second).to_string());
            }
        }
        [city, region, country, ..] => {
            location.city = Some((*city).to_string());
            if let Some(state) = match_us_state(region) {
                location.region = Some(state.to_string());
            } else {
                location.region = Some((*region).to_string());
            }
            if let Some(known) = match_country(country) {
                location.country = Some(known.to_string());
            } else {
                location.country = Some((*country).to_string());
            }
        }
    }

    location
}

/// Comparison key for dedup: lowercased "city|region|country". Two postings
/// with the same key count as the same place.
pub fn location_key(location: &Location) -> String {
    let part = |value: &Option<String>| {
        value
            .as_deref()
            .map(|v| v.to_lowercase())
            .unwrap_or_default()
    };
    format!(
        "{}|{}|{}",
        part(&location.city),
        part(&location.region),
        part(&location.country)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_city_state_and_infers_us() {
        let loc = canonicalize_location("Portland, OR");
        assert_eq!(loc.city.as_deref(), Some("Portland"));
        assert_eq!(loc.region.as_deref(), Some("OR"));
        assert_eq!(loc.country.as_deref(), Some("US"));
    }

    #[test]
    fn parses_full_state_names() {
        let loc = canonicalize_location("Austin, Texas");
        assert_eq!(loc.region.as_deref(), Some("TX"));
        assert_eq!(loc.country.as_deref(), Some("US"));
    }

    #[test]
    fn parses_three_part_locations() {
        let loc = canonicalize_location("Berlin, Berlin, Germany");
        assert_eq!(loc.city.as_deref(), Some("Berlin"));
        assert_eq!(loc.country.as_deref(), Some("DE"));
    }

    #[test]
    fn bare_remote_has_no_country() {
        let loc = canonicalize_location("Remote");
        assert_eq!(loc.city, None);
        assert_eq!(loc.country, None);
        assert_eq!(loc.raw, "Remote");
    }

    #[test]
    fn unknown_single_token_becomes_city() {
        let loc = canonicalize_location("Springfield");
        assert_eq!(loc.city.as_deref(), Some("Springfield"));
        assert_eq!(loc.country, None);
    }

    #[test]
    fn location_key_matches_for_equivalent_spellings() {
        let a = canonicalize_location("Portland, OR");
        let b = canonicalize_location("portland, Oregon");
        assert_eq!(location_key(&a), location_key(&b));
    }
}
