//! Property tracking service: creation, user edits, harvest refreshes and
//! portfolio reporting over the stored records.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{HarvestConfig, ReportConfig};
use crate::error::TrackerError;
use crate::harvest::Harvester;
use crate::models::{HistoryEntry, Id, PropertyPatch, PropertyRecord, PropertyStatus, Purpose};
use crate::portfolio::{self, PortfolioStats, ValuePoint};
use crate::reconcile::reconcile;
use crate::storage::{PropertyFilter, Storage};

/// Tally of one full-portfolio refresh pass.
#[derive(Debug, Default)]
pub struct SweepOutcome {
    pub refreshed: usize,
    pub errored: usize,
}

/// Orchestrates property tracking against the storage and fetch collaborators.
pub struct PropertyTracker {
    storage: Arc<dyn Storage>,
    harvester: Harvester,
    clock: Arc<dyn Clock>,
    sweep_delay: Duration,
    window_days: u32,
    /// One guard per property: reconciles of the same record serialize,
    /// distinct properties proceed independently.
    locks: StdMutex<HashMap<Id, Arc<tokio::sync::Mutex<()>>>>,
}

impl PropertyTracker {
    pub fn new(storage: Arc<dyn Storage>, harvester: Harvester) -> Self {
        Self {
            storage,
            harvester,
            clock: Arc::new(SystemClock),
            sweep_delay: HarvestConfig::default().sweep_delay,
            window_days: ReportConfig::default().window_days,
            locks: StdMutex::new(HashMap::new()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_sweep_delay(mut self, delay: Duration) -> Self {
        self.sweep_delay = delay;
        self
    }

    pub fn with_window_days(mut self, days: u32) -> Self {
        self.window_days = days;
        self
    }

    fn lock_for(&self, id: &Id) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().expect("property lock registry poisoned");
        locks.entry(id.clone()).or_default().clone()
    }

    fn drop_lock(&self, id: &Id) {
        let mut locks = self.locks.lock().expect("property lock registry poisoned");
        locks.remove(id);
    }

    async fn persist(
        &self,
        record: PropertyRecord,
        history: Option<HistoryEntry>,
    ) -> Result<PropertyRecord, TrackerError> {
        self.storage.put_property(&record).await?;
        if let Some(entry) = history {
            self.storage.append_history(&entry).await?;
            debug!(id = %record.id, value = %entry.value, "Recorded value history entry");
        }
        Ok(record)
    }

    /// Start tracking a listing URL.
    ///
    /// The record is persisted with status `pending` and whatever location
    /// facts the URL path itself yields; fetching the listing page is a
    /// separate `refresh` call.
    pub async fn track_url(
        &self,
        url: &str,
        purpose: Purpose,
        patch: PropertyPatch,
    ) -> Result<PropertyRecord, TrackerError> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(TrackerError::invalid_url(url, "expected an http(s) URL"));
        }
        if self.storage.find_by_url(url).await?.is_some() {
            return Err(TrackerError::AlreadyTracked(url.to_string()));
        }

        // Caller-supplied fields win over what the URL yields.
        let patch = patch.over(self.harvester.url_facts(url).into());

        let now = self.clock.now();
        let mut record = PropertyRecord::new(purpose, now);
        record.url = Some(url.to_string());

        let outcome = reconcile(record, &patch, now);
        info!(id = %outcome.record.id, url, "Tracking new listing");
        self.persist(outcome.record, outcome.history).await
    }

    /// Track a property from caller-supplied facts alone.
    ///
    /// There is nothing to harvest, so the record starts `active`.
    pub async fn track_manual(
        &self,
        purpose: Purpose,
        patch: PropertyPatch,
    ) -> Result<PropertyRecord, TrackerError> {
        let now = self.clock.now();
        let record = PropertyRecord::new(purpose, now);

        let mut outcome = reconcile(record, &patch, now);
        outcome.record.status = PropertyStatus::Active;
        info!(id = %outcome.record.id, "Tracking manual property");
        self.persist(outcome.record, outcome.history).await
    }

    pub async fn get(&self, id: &Id) -> Result<PropertyRecord, TrackerError> {
        self.storage
            .get_property(id)
            .await?
            .ok_or_else(|| TrackerError::NotFound(id.clone()))
    }

    /// Matching records, most recently created first.
    pub async fn list(&self, filter: &PropertyFilter) -> Result<Vec<PropertyRecord>, TrackerError> {
        let mut records = self.storage.list_properties(filter).await?;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    /// Fold caller-supplied facts into a tracked property.
    pub async fn update(
        &self,
        id: &Id,
        patch: PropertyPatch,
    ) -> Result<PropertyRecord, TrackerError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let record = self.get(id).await?;
        let now = self.clock.now();
        let mut outcome = reconcile(record, &patch, now);
        outcome.record.status = PropertyStatus::Active;
        self.persist(outcome.record, outcome.history).await
    }

    /// Harvest the listing page and fold the result into the record.
    ///
    /// A harvest failure marks the record `error` and bumps `last_updated`,
    /// leaving everything else untouched; it is not an error for the caller.
    /// Records without a URL just re-derive from their stored facts.
    pub async fn refresh(&self, id: &Id) -> Result<PropertyRecord, TrackerError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let record = self.get(id).await?;

        let Some(url) = record.url.clone() else {
            let now = self.clock.now();
            let mut outcome = reconcile(record, &PropertyPatch::default(), now);
            outcome.record.status = PropertyStatus::Active;
            return self.persist(outcome.record, outcome.history).await;
        };

        info!(id = %record.id, url = %url, "Refreshing property");

        match self.harvester.harvest(&url).await {
            Ok(facts) => {
                let now = self.clock.now();
                let mut outcome = reconcile(record, &facts.into(), now);
                outcome.record.status = PropertyStatus::Active;
                self.persist(outcome.record, outcome.history).await
            }
            Err(failure) => {
                let mut record = record;
                record.status = PropertyStatus::Error;
                record.last_updated = self.clock.now();
                warn!(id = %record.id, reason = %failure.reason, "Harvest failed; marking record");
                self.storage.put_property(&record).await?;
                Ok(record)
            }
        }
    }

    /// Stop tracking a property, removing its history with it.
    pub async fn remove(&self, id: &Id) -> Result<(), TrackerError> {
        let lock = self.lock_for(id);
        {
            let _guard = lock.lock().await;
            if !self.storage.delete_property(id).await? {
                return Err(TrackerError::NotFound(id.clone()));
            }
            self.storage.delete_history(id).await?;
        }
        self.drop_lock(id);
        info!(id = %id, "Stopped tracking property");
        Ok(())
    }

    /// History entries within the trailing window, oldest first.
    ///
    /// The property must exist, even when it has no entries yet.
    pub async fn history(
        &self,
        id: &Id,
        window_days: Option<u32>,
    ) -> Result<Vec<HistoryEntry>, TrackerError> {
        self.get(id).await?;
        let days = window_days.unwrap_or(self.window_days);
        let since = self.clock.now() - chrono::Duration::days(i64::from(days));
        Ok(self.storage.history_since(id, since).await?)
    }

    /// Refresh every tracked property in sequence, pausing between each.
    ///
    /// Harvest failures land in the records' `error` status and are tallied;
    /// the sweep itself only fails on storage errors.
    pub async fn sweep(&self) -> Result<SweepOutcome, TrackerError> {
        let records = self.list(&PropertyFilter::default()).await?;
        info!(properties = records.len(), "Starting portfolio sweep");

        let mut outcome = SweepOutcome::default();
        for (i, record) in records.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.sweep_delay).await;
            }
            match self.refresh(&record.id).await {
                Ok(refreshed) => match refreshed.status {
                    PropertyStatus::Error => outcome.errored += 1,
                    _ => outcome.refreshed += 1,
                },
                // Removed between listing and refreshing; skip it.
                Err(TrackerError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        info!(
            refreshed = outcome.refreshed,
            errored = outcome.errored,
            "Portfolio sweep complete"
        );
        Ok(outcome)
    }

    pub async fn portfolio_stats(&self) -> Result<PortfolioStats, TrackerError> {
        let records = self
            .storage
            .list_properties(&PropertyFilter::default())
            .await?;
        Ok(portfolio::summarize(&records))
    }

    /// Aggregate value series across every property's history.
    pub async fn portfolio_series(
        &self,
        window_days: Option<u32>,
    ) -> Result<Vec<ValuePoint>, TrackerError> {
        let days = window_days.unwrap_or(self.window_days);
        let now = self.clock.now();
        let since = now - chrono::Duration::days(i64::from(days));

        let records = self
            .storage
            .list_properties(&PropertyFilter::default())
            .await?;
        let mut entries = Vec::new();
        for record in &records {
            entries.extend(self.storage.history_since(&record.id, since).await?);
        }

        Ok(portfolio::timeseries(&entries, days, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::harvest::{FetchError, FetchedPage, PageFetcher};
    use crate::storage::MemoryStorage;
    use chrono::TimeZone;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::collections::VecDeque;

    /// Replays a queue of canned fetch results; 500s once the queue is empty.
    struct ScriptedFetcher {
        responses: StdMutex<VecDeque<Result<FetchedPage, FetchError>>>,
    }

    impl ScriptedFetcher {
        fn new(responses: Vec<Result<FetchedPage, FetchError>>) -> Self {
            Self {
                responses: StdMutex::new(responses.into()),
            }
        }
    }

    #[async_trait::async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch(&self, _url: &str, _timeout: Duration) -> Result<FetchedPage, FetchError> {
            self.responses
                .lock()
                .expect("script lock poisoned")
                .pop_front()
                .unwrap_or(Ok(FetchedPage {
                    status: 500,
                    body: String::new(),
                }))
        }
    }

    fn tracker_with(
        responses: Vec<Result<FetchedPage, FetchError>>,
        clock: Arc<FixedClock>,
    ) -> PropertyTracker {
        let harvester = Harvester::new(Arc::new(ScriptedFetcher::new(responses)))
            .with_request_delay(Duration::ZERO);
        PropertyTracker::new(Arc::new(MemoryStorage::new()), harvester)
            .with_clock(clock)
            .with_sweep_delay(Duration::ZERO)
    }

    fn fixed_clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
        ))
    }

    const LISTING: &str = "https://example.com/nsw/marsden-park-2765/pratia-cres/46-pid-1";

    #[tokio::test]
    async fn track_url_rejects_bad_schemes_and_duplicates() {
        let tracker = tracker_with(vec![], fixed_clock());

        let err = tracker
            .track_url("ftp://example.com/listing", Purpose::Investment, PropertyPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::InvalidUrl { .. }));

        tracker
            .track_url(LISTING, Purpose::Investment, PropertyPatch::default())
            .await
            .unwrap();
        let err = tracker
            .track_url(LISTING, Purpose::Investment, PropertyPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::AlreadyTracked(_)));
    }

    #[tokio::test]
    async fn track_url_seeds_location_and_stays_pending() {
        let tracker = tracker_with(vec![], fixed_clock());

        let record = tracker
            .track_url(LISTING, Purpose::Investment, PropertyPatch::default())
            .await
            .unwrap();

        assert_eq!(record.status, PropertyStatus::Pending);
        assert_eq!(record.suburb.as_deref(), Some("Marsden Park"));
        assert_eq!(record.state.as_deref(), Some("NSW"));
        assert_eq!(record.postcode.as_deref(), Some("2765"));
        assert_eq!(record.url.as_deref(), Some(LISTING));
    }

    #[tokio::test]
    async fn refresh_timeout_marks_error_and_changes_nothing_else() {
        let clock = fixed_clock();
        let tracker = tracker_with(vec![Err(FetchError::Timeout)], clock.clone());

        let created = tracker
            .track_url(
                LISTING,
                Purpose::Investment,
                PropertyPatch::value_only(dec!(1_000_000)),
            )
            .await
            .unwrap();
        clock.advance(chrono::Duration::hours(1));

        let refreshed = tracker.refresh(&created.id).await.unwrap();

        assert_eq!(refreshed.status, PropertyStatus::Error);
        assert!(refreshed.last_updated > created.last_updated);
        assert_eq!(refreshed.current_value, created.current_value);
        assert_eq!(refreshed.suburb, created.suburb);

        // The failed attempt leaves no trace in the history.
        let history = tracker.history(&created.id, None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].value, dec!(1_000_000));
    }

    #[tokio::test]
    async fn refresh_after_an_error_returns_the_record_to_active() {
        let clock = fixed_clock();
        // First refresh times out, the second gets a page with no value.
        let tracker = tracker_with(
            vec![
                Err(FetchError::Timeout),
                Ok(FetchedPage {
                    status: 429,
                    body: String::new(),
                }),
            ],
            clock.clone(),
        );

        let created = tracker
            .track_url(LISTING, Purpose::Investment, PropertyPatch::default())
            .await
            .unwrap();

        let errored = tracker.refresh(&created.id).await.unwrap();
        assert_eq!(errored.status, PropertyStatus::Error);

        let recovered = tracker.refresh(&created.id).await.unwrap();
        assert_eq!(recovered.status, PropertyStatus::Active);
    }

    #[tokio::test]
    async fn update_reconciles_and_activates() {
        let clock = fixed_clock();
        let tracker = tracker_with(vec![], clock.clone());

        let created = tracker
            .track_manual(
                Purpose::Investment,
                PropertyPatch::value_only(dec!(500_000)),
            )
            .await
            .unwrap();
        assert_eq!(created.status, PropertyStatus::Active);

        clock.advance(chrono::Duration::days(1));
        let updated = tracker
            .update(&created.id, PropertyPatch::value_only(dec!(550_000)))
            .await
            .unwrap();

        assert_eq!(updated.previous_value, Some(dec!(500_000)));
        assert_eq!(updated.daily_change, Some(dec!(50_000)));
        assert_eq!(updated.daily_change_percent, Some(dec!(10.00)));

        let history = tracker.history(&created.id, None).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].value, dec!(550_000));
    }

    #[tokio::test]
    async fn remove_takes_the_history_with_it() {
        let tracker = tracker_with(vec![], fixed_clock());

        let record = tracker
            .track_manual(
                Purpose::Investment,
                PropertyPatch::value_only(dec!(750_000)),
            )
            .await
            .unwrap();

        tracker.remove(&record.id).await.unwrap();

        let err = tracker.get(&record.id).await.unwrap_err();
        assert!(matches!(err, TrackerError::NotFound(_)));
        let err = tracker.remove(&record.id).await.unwrap_err();
        assert!(matches!(err, TrackerError::NotFound(_)));
    }

    #[tokio::test]
    async fn history_demands_a_known_property() {
        let tracker = tracker_with(vec![], fixed_clock());
        let err = tracker.history(&Id::new(), None).await.unwrap_err();
        assert!(matches!(err, TrackerError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_returns_newest_first() {
        let clock = fixed_clock();
        let tracker = tracker_with(vec![], clock.clone());

        let first = tracker
            .track_manual(Purpose::Investment, PropertyPatch::default())
            .await
            .unwrap();
        clock.advance(chrono::Duration::minutes(5));
        let second = tracker
            .track_manual(Purpose::Investment, PropertyPatch::default())
            .await
            .unwrap();

        let records = tracker.list(&PropertyFilter::default()).await.unwrap();
        assert_eq!(records[0].id, second.id);
        assert_eq!(records[1].id, first.id);
    }

    #[tokio::test]
    async fn sweep_tallies_errors_without_aborting() {
        let clock = fixed_clock();
        // list() returns newest first, so the most recently created property
        // consumes the first scripted response.
        let tracker = tracker_with(
            vec![
                Err(FetchError::Timeout),
                Ok(FetchedPage {
                    status: 200,
                    body: String::new(),
                }),
            ],
            clock.clone(),
        );

        tracker
            .track_url(LISTING, Purpose::Investment, PropertyPatch::default())
            .await
            .unwrap();
        clock.advance(chrono::Duration::minutes(1));
        tracker
            .track_url(
                "https://example.com/vic/fitzroy-3065/gertrude-st/12-pid-2",
                Purpose::Investment,
                PropertyPatch::default(),
            )
            .await
            .unwrap();

        let outcome = tracker.sweep().await.unwrap();
        assert_eq!(outcome.refreshed, 1);
        assert_eq!(outcome.errored, 1);
    }

    #[tokio::test]
    async fn manual_records_refresh_without_fetching() {
        let tracker = tracker_with(vec![], fixed_clock());

        let record = tracker
            .track_manual(
                Purpose::Investment,
                PropertyPatch::value_only(dec!(640_000)),
            )
            .await
            .unwrap();

        let refreshed = tracker.refresh(&record.id).await.unwrap();
        assert_eq!(refreshed.status, PropertyStatus::Active);
        assert_eq!(refreshed.current_value, Some(dec!(640_000)));

        // No new history entry from the no-op refresh.
        let history = tracker.history(&record.id, None).await.unwrap();
        assert_eq!(history.len(), 1);
    }
}
