//! Best-effort fact harvesting for a tracked listing URL.
//!
//! The URL itself always yields a floor: whatever [`AddressExtractor`] can
//! parse out of it. A single polite fetch then tries to improve on that floor
//! with page metadata and a value estimate. Rate limiting and other
//! non-success statuses fall back to the floor; only transport failures
//! surface as [`HarvestFailure`].

mod fetcher;

pub use fetcher::{FetchError, FetchedPage, HttpPageFetcher, PageFetcher};

use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, warn};

use crate::address::AddressExtractor;
use crate::config::HarvestConfig;
use crate::models::PropertyPatch;

/// Facts observable for one listing: URL-derived location, optionally
/// improved by page metadata and a scanned value estimate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyFacts {
    pub address: Option<String>,
    pub suburb: Option<String>,
    pub state: Option<String>,
    pub postcode: Option<String>,
    pub image_url: Option<String>,
    pub estimated_value: Option<Decimal>,
}

impl From<PropertyFacts> for PropertyPatch {
    fn from(facts: PropertyFacts) -> Self {
        Self {
            address: facts.address.into(),
            suburb: facts.suburb.into(),
            state: facts.state.into(),
            postcode: facts.postcode.into(),
            image_url: facts.image_url.into(),
            current_value: facts.estimated_value.into(),
            ..Self::default()
        }
    }
}

/// Transport-level harvest failure: the fetch never produced a response.
/// Non-success statuses are not failures; they degrade to URL-derived facts.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("harvest failed: {reason}")]
pub struct HarvestFailure {
    pub reason: String,
}

impl From<FetchError> for HarvestFailure {
    fn from(err: FetchError) -> Self {
        Self {
            reason: err.to_string(),
        }
    }
}

/// Matches a `<meta property="og:..." content="...">` tag in either
/// attribute order.
struct MetaPattern {
    property_first: Regex,
    content_first: Regex,
}

impl MetaPattern {
    fn new(property: &str) -> Self {
        let escaped = regex::escape(property);
        Self {
            property_first: Regex::new(&format!(
                r#"(?is)<meta\b[^>]*?property\s*=\s*["']{escaped}["'][^>]*?content\s*=\s*["']([^"']*)["']"#
            ))
            .expect("Invalid regex pattern"),
            content_first: Regex::new(&format!(
                r#"(?is)<meta\b[^>]*?content\s*=\s*["']([^"']*)["'][^>]*?property\s*=\s*["']{escaped}["']"#
            ))
            .expect("Invalid regex pattern"),
        }
    }

    fn extract(&self, html: &str) -> Option<String> {
        self.property_first
            .captures(html)
            .or_else(|| self.content_first.captures(html))
            .map(|caps| caps[1].to_string())
    }
}

/// Harvests observable facts for a listing URL.
pub struct Harvester {
    fetcher: Arc<dyn PageFetcher>,
    extractor: AddressExtractor,
    request_delay: Duration,
    fetch_timeout: Duration,
    og_title: MetaPattern,
    og_image: MetaPattern,
    value_pattern: Regex,
}

impl Harvester {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        let defaults = HarvestConfig::default();
        Self {
            fetcher,
            extractor: AddressExtractor::new(),
            request_delay: defaults.request_delay,
            fetch_timeout: defaults.fetch_timeout,
            og_title: MetaPattern::new("og:title"),
            og_image: MetaPattern::new("og:image"),
            // Currency-like tokens: "$1,250,000" / "$659,000.00" or
            // "1.2 million" / "1.2m", matched in document order.
            value_pattern: Regex::new(r"(?i)\$[\d,]+(?:\.\d{2})?|[\d,]+(?:\.\d{2})?\s*(?:million|m)")
                .expect("Invalid regex pattern"),
        }
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_config(self, config: &HarvestConfig) -> Self {
        self.with_request_delay(config.request_delay)
            .with_fetch_timeout(config.fetch_timeout)
    }

    /// The floor: facts derivable from the URL alone, no fetch.
    pub fn url_facts(&self, url: &str) -> PropertyFacts {
        let location = self.extractor.extract(url);
        PropertyFacts {
            address: location.address,
            suburb: location.suburb,
            state: location.state,
            postcode: location.postcode,
            image_url: None,
            estimated_value: None,
        }
    }

    /// Fetch the listing page once (after the configured politeness delay)
    /// and return the best facts available.
    ///
    /// Outcome classification:
    /// - transport failure (timeout included) → `Err(HarvestFailure)`;
    /// - non-success status (rate limiting included) → `Ok` with the
    ///   URL-derived floor, identical to "nothing new learned";
    /// - success → floor improved by `og:title` (display address),
    ///   `og:image`, and the first currency-like token over 100,000.
    pub async fn harvest(&self, url: &str) -> Result<PropertyFacts, HarvestFailure> {
        let mut facts = self.url_facts(url);

        tokio::time::sleep(self.request_delay).await;

        let page = match self.fetcher.fetch(url, self.fetch_timeout).await {
            Ok(page) => page,
            Err(err) => {
                warn!(url, error = %err, "listing fetch failed");
                return Err(HarvestFailure::from(err));
            }
        };

        if !page.is_success() {
            warn!(url, status = page.status, "listing fetch refused, keeping url-derived facts");
            return Ok(facts);
        }

        if let Some(title) = self.og_title.extract(&page.body) {
            // Titles look like "46 Pratia Cres, Marsden Park | Property Value";
            // the first segment is the display address.
            let display = title.split('|').next().unwrap_or("").trim();
            if !display.is_empty() {
                facts.address = Some(display.to_string());
            }
        }

        if let Some(image) = self.og_image.extract(&page.body) {
            if !image.is_empty() {
                facts.image_url = Some(image);
            }
        }

        facts.estimated_value = self.scan_value(&page.body);

        debug!(
            url,
            address = facts.address.as_deref().unwrap_or(""),
            value = %facts.estimated_value.map(|v| v.to_string()).unwrap_or_default(),
            "harvest complete"
        );
        Ok(facts)
    }

    /// First currency-like token that normalizes to more than 100,000 wins;
    /// unparsable or too-small tokens are skipped and the scan continues.
    fn scan_value(&self, body: &str) -> Option<Decimal> {
        let threshold = Decimal::from(100_000);
        for token in self.value_pattern.find_iter(body) {
            if let Some(value) = parse_listed_value(token.as_str()) {
                if value > threshold {
                    return Some(value);
                }
            }
        }
        None
    }
}

/// Normalize a currency-like token to a plain number.
///
/// Strips the currency symbol, thousands separators and whitespace; an
/// `m`/`million` marker drops remaining letters and multiplies by 1,000,000.
/// Returns `None` for anything that still fails to parse.
fn parse_listed_value(token: &str) -> Option<Decimal> {
    let clean: String = token
        .to_lowercase()
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();

    if clean.contains('m') {
        let digits: String = clean.chars().filter(|c| !c.is_ascii_alphabetic()).collect();
        return digits
            .parse::<Decimal>()
            .ok()
            .map(|value| value * Decimal::from(1_000_000));
    }

    clean.parse::<Decimal>().ok()
}
