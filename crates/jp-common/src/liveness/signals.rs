use once_cell::sync::Lazy;
use regex::Regex;

/// What a completed probe observed about a posting URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeSignal {
    Alive,
    Gone { status_code: u16 },
    RedirectedAway { final_url: String },
    ClosedPhrase { phrase: String },
}

impl ProbeSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeSignal::Alive => "alive",
            ProbeSignal::Gone { .. } => "gone",
            ProbeSignal::RedirectedAway { .. } => "redirected_away",
            ProbeSignal::ClosedPhrase { .. } => "closed_phrase",
        }
    }
}

static CLOSED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(no longer accepting applications|this (?:position|job|role) (?:has been|is) (?:filled|closed)|position (?:has been )?filled|job (?:posting )?(?:has )?expired|posting (?:has been )?removed|応募受付を終了)",
    )
    .unwrap()
});

fn url_path(url: &str) -> &str {
    let after_scheme = url.find("://").map(|i| &url[i + 3..]).unwrap_or(url);
    let path = after_scheme.find('/').map(|i| &after_scheme[i..]).unwrap_or("/");
    path.split(['?', '#']).next().unwrap_or("/")
}

/// A redirect that lands on a careers landing page (rather than another
/// posting detail page) means the specific posting is gone. Detail pages
/// keep an identifier segment after the listing root; landing pages do not.
fn is_generic_careers_path(path: &str) -> bool {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return true;
    }
    const LISTING_ROOTS: [&str; 5] = ["careers", "jobs", "openings", "positions", "search"];
    let last = segments[segments.len() - 1].to_lowercase();
    segments.len() <= 2 && LISTING_ROOTS.contains(&last.as_str())
}

/// Classify a probe HTTP exchange into a liveness signal. Precedence:
/// hard 404/410 beats redirect analysis beats closed-phrase scanning.
/// Anything that survives all three checks counts as alive.
pub fn classify_response(
    status_code: u16,
    original_url: &str,
    final_url: &str,
    body_text: &str,
) -> ProbeSignal {
    if status_code == 404 || status_code == 410 {
        return ProbeSignal::Gone { status_code };
    }

    if url_path(final_url) != url_path(original_url) && is_generic_careers_path(url_path(final_url))
    {
        return ProbeSignal::RedirectedAway {
            final_url: final_url.to_string(),
        };
    }

    if let Some(found) = CLOSED_RE.find(body_text) {
        return ProbeSignal::ClosedPhrase {
            phrase: found.as_str().to_lowercase(),
        };
    }

    ProbeSignal::Alive
}

#[cfg(test)]
mod tests {
    use super::*;

    const POSTING: &str = "https://jobs.example.com/careers/eng-backend-4821";

    #[test]
    fn ok_response_is_alive() {
        let signal = classify_response(200, POSTING, POSTING, "<h1>Senior Backend Engineer</h1>");
        assert_eq!(signal, ProbeSignal::Alive);
    }

    #[test]
    fn hard_404_and_410_are_gone() {
        assert_eq!(
            classify_response(404, POSTING, POSTING, ""),
            ProbeSignal::Gone { status_code: 404 }
        );
        assert_eq!(
            classify_response(410, POSTING, POSTING, ""),
            ProbeSignal::Gone { status_code: 410 }
        );
    }

    #[test]
    fn redirect_to_careers_root_is_a_removal() {
        let signal = classify_response(
            200,
            POSTING,
            "https://jobs.example.com/careers",
            "<h1>Join us!</h1>",
        );
        assert_eq!(
            signal,
            ProbeSignal::RedirectedAway {
                final_url: "https://jobs.example.com/careers".into()
            }
        );
    }

    #[test]
    fn redirect_to_another_detail_page_is_not_a_removal() {
        // A posting moved to a new slug still resolves to a detail page.
        let signal = classify_response(
            200,
            POSTING,
            "https://jobs.example.com/careers/eng-backend-4821-v2",
            "<h1>Senior Backend Engineer</h1>",
        );
        assert_eq!(signal, ProbeSignal::Alive);
    }

    #[test]
    fn closed_phrase_in_body_marks_stale() {
        let signal = classify_response(
            200,
            POSTING,
            POSTING,
            "Sorry, this position has been filled.",
        );
        assert_eq!(
            signal,
            ProbeSignal::ClosedPhrase {
                phrase: "this position has been filled".into()
            }
        );
    }

    #[test]
    fn hard_404_beats_closed_phrase() {
        let signal = classify_response(404, POSTING, POSTING, "job posting expired");
        assert_eq!(signal, ProbeSignal::Gone { status_code: 404 });
    }

    #[test]
    fn query_string_changes_do_not_count_as_redirects() {
        let signal = classify_response(
            200,
            POSTING,
            "https://jobs.example.com/careers/eng-backend-4821?utm_source=probe",
            "details",
        );
        assert_eq!(signal, ProbeSignal::Alive);
    }
}
