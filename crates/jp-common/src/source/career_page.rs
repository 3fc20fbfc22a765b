use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use tokio::time::{Duration, sleep};
use tracing::instrument;

use crate::{JobSource, RawPosting};

use super::{AdapterError, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_REQUEST_DELAY_SECS, SourceAdapter};

/// Rendered text width for scraped descriptions.
const TEXT_WIDTH: usize = 80;

static JOB_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"href="([^"]*/(?:jobs?|careers?|positions?|openings?)/[^"\s]+)""#)
        .expect("valid job link regex")
});

static H1_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").expect("valid h1 regex"));

static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid title regex"));

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));

/// Direct-company listing page scrape: one fetch for the listing, one per
/// detail link, each separated by the politeness delay.
pub struct CareerPageAdapter {
    company: String,
    listing_url: String,
    client: reqwest::Client,
    request_delay: Duration,
}

impl CareerPageAdapter {
    pub fn new(
        company: impl Into<String>,
        listing_url: impl Into<String>,
    ) -> Result<Self, AdapterError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            company: company.into(),
            listing_url: listing_url.into(),
            client,
            request_delay: Duration::from_secs(DEFAULT_REQUEST_DELAY_SECS),
        })
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    async fn fetch_html(&self, url: &str) -> Result<String, AdapterError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }
}

/// Posting links from the listing page, resolved against it, deduplicated
/// in document order.
fn extract_links(listing_html: &str, listing_url: &str) -> Result<Vec<String>, AdapterError> {
    let base = Url::parse(listing_url).map_err(|e| AdapterError::InvalidUrl {
        url: listing_url.to_string(),
        reason: e.to_string(),
    })?;

    let mut seen = std::collections::HashSet::new();
    let mut links = Vec::new();
    for capture in JOB_LINK_RE.captures_iter(listing_html) {
        let href = &capture[1];
        let resolved = match base.join(href) {
            Ok(url) => url.to_string(),
            Err(e) => {
                tracing::debug!(href, error = %e, "skipping unresolvable posting link");
                continue;
            }
        };
        if seen.insert(resolved.clone()) {
            links.push(resolved);
        }
    }
    Ok(links)
}

/// First `<h1>` wins; the document `<title>` is the fallback.
fn extract_title(html: &str) -> Option<String> {
    let raw = H1_RE
        .captures(html)
        .or_else(|| TITLE_RE.captures(html))
        .map(|c| c[1].to_string())?;
    let text = TAG_RE.replace_all(&raw, " ");
    let title = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if title.is_empty() { None } else { Some(title) }
}

#[async_trait::async_trait]
impl SourceAdapter for CareerPageAdapter {
    fn source(&self) -> JobSource {
        JobSource::Company(self.company.clone())
    }

    #[instrument(skip(self), fields(company = %self.company))]
    async fn fetch(&self) -> Result<Vec<RawPosting>, AdapterError> {
        let listing = self.fetch_html(&self.listing_url).await?;
        let links = extract_links(&listing, &self.listing_url)?;
        tracing::debug!(count = links.len(), "found posting links");

        let mut postings = Vec::new();
        for url in links {
            sleep(self.request_delay).await;
            let html = match self.fetch_html(&url).await {
                Ok(html) => html,
                Err(e) => {
                    // One broken detail page should not sink the listing.
                    tracing::warn!(url, error = %e, "skipping unreachable posting page");
                    continue;
                }
            };

            let Some(title) = extract_title(&html) else {
                tracing::warn!(url, "skipping posting page without a title");
                continue;
            };
            let description = html2text::from_read(html.as_bytes(), TEXT_WIDTH)?;

            postings.push(RawPosting {
                source: JobSource::Company(self.company.clone()),
                source_id: None,
                title,
                company: self.company.clone(),
                location: String::new(),
                description,
                url,
                ..RawPosting::default()
            });
        }

        Ok(postings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
        <a href="/careers/backend-engineer">Backend Engineer</a>
        <a href="/careers/backend-engineer">Backend Engineer (again)</a>
        <a href="https://acme.example.com/jobs/platform-lead">Platform Lead</a>
        <a href="/about">About us</a>
        </body></html>
    "#;

    #[test]
    fn extracts_and_resolves_posting_links_once() {
        let links = extract_links(LISTING, "https://acme.example.com/careers").unwrap();
        assert_eq!(
            links,
            vec![
                "https://acme.example.com/careers/backend-engineer".to_string(),
                "https://acme.example.com/jobs/platform-lead".to_string(),
            ]
        );
    }

    #[test]
    fn non_posting_links_are_ignored() {
        let links = extract_links(LISTING, "https://acme.example.com/careers").unwrap();
        assert!(!links.iter().any(|l| l.contains("/about")));
    }

    #[test]
    fn title_prefers_h1_over_document_title() {
        let html = r#"<html><head><title>Careers at Acme</title></head>
            <body><h1>Senior <em>Backend</em> Engineer</h1></body></html>"#;
        assert_eq!(extract_title(html).as_deref(), Some("Senior Backend Engineer"));
    }

    #[test]
    fn title_falls_back_to_document_title() {
        let html = "<html><head><title>Platform Lead | Acme</title></head><body></body></html>";
        assert_eq!(extract_title(html).as_deref(), Some("Platform Lead | Acme"));
    }

    #[test]
    fn missing_title_yields_none() {
        assert!(extract_title("<html><body><p>nothing here</p></body></html>").is_none());
    }
}
