use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use propfolio::clock::FixedClock;
use propfolio::harvest::{FetchError, FetchedPage, Harvester, PageFetcher};
use propfolio::models::{PropertyRecord, PropertyStatus, Purpose};
use propfolio::storage::MemoryStorage;
use propfolio::tracker::PropertyTracker;
use rust_decimal::Decimal;

/// Listing URL in the structured shape the address extractor understands.
pub const LISTING_URL: &str =
    "https://www.property.com.au/nsw/marsden-park-2765/pratia-cres/46-pid-20583686/";

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
}

pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(fixed_time()))
}

/// Minimal listing page: og metadata plus one price-like token.
pub fn listing_page(display_address: &str, value_token: &str) -> String {
    format!(
        r#"<html><head>
<meta property="og:title" content="{display_address} | Property Profile" />
<meta property="og:image" content="https://cdn.example.com/photo.jpg" />
</head><body>
<div class="estimate">Estimated value: {value_token}</div>
</body></html>"#
    )
}

/// Fetcher that always answers with the same canned page.
#[derive(Debug, Clone)]
pub struct StubFetcher {
    pub status: u16,
    pub body: String,
}

impl StubFetcher {
    pub fn success(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(&self, _url: &str, _timeout: Duration) -> Result<FetchedPage, FetchError> {
        Ok(FetchedPage {
            status: self.status,
            body: self.body.clone(),
        })
    }
}

/// Fetcher whose every request times out.
#[derive(Debug, Clone)]
pub struct TimeoutFetcher;

#[async_trait]
impl PageFetcher for TimeoutFetcher {
    async fn fetch(&self, _url: &str, _timeout: Duration) -> Result<FetchedPage, FetchError> {
        Err(FetchError::Timeout)
    }
}

/// Tracker on in-memory storage with all pacing delays removed.
pub fn tracker(fetcher: impl PageFetcher + 'static, clock: Arc<FixedClock>) -> PropertyTracker {
    let harvester = Harvester::new(Arc::new(fetcher)).with_request_delay(Duration::ZERO);
    PropertyTracker::new(Arc::new(MemoryStorage::new()), harvester)
        .with_clock(clock)
        .with_sweep_delay(Duration::ZERO)
}

/// Active investment record with a nickname and a current value, created at
/// the fixed time.
pub fn manual_record(nickname: &str, value: Decimal) -> PropertyRecord {
    let mut record = PropertyRecord::new(Purpose::Investment, fixed_time());
    record.nickname = Some(nickname.to_string());
    record.current_value = Some(value);
    record.status = PropertyStatus::Active;
    record
}
