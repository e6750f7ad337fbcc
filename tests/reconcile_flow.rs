mod support;

use anyhow::Result;
use chrono::Duration;
use propfolio::models::{Patch, PropertyPatch, PropertyStatus, Purpose, RentFrequency};
use propfolio::storage::PropertyFilter;
use rust_decimal_macros::dec;
use support::{fixed_clock, listing_page, tracker, StubFetcher, LISTING_URL};

#[tokio::test]
async fn tracked_listing_reconciles_through_its_first_refresh() -> Result<()> {
    let clock = fixed_clock();
    let page = listing_page("46 Pratia Cres, Marsden Park", "$1,250,000");
    let tracker = tracker(StubFetcher::success(page), clock.clone());

    let created = tracker
        .track_url(LISTING_URL, Purpose::Investment, PropertyPatch::default())
        .await?;
    assert_eq!(created.status, PropertyStatus::Pending);
    assert_eq!(created.current_value, None);
    assert_eq!(created.suburb.as_deref(), Some("Marsden Park"));

    let refreshed = tracker.refresh(&created.id).await?;
    assert_eq!(refreshed.status, PropertyStatus::Active);
    assert_eq!(refreshed.current_value, Some(dec!(1_250_000)));
    assert_eq!(
        refreshed.address.as_deref(),
        Some("46 Pratia Cres, Marsden Park")
    );
    assert_eq!(
        refreshed.image_url.as_deref(),
        Some("https://cdn.example.com/photo.jpg")
    );
    // No loan on record, so net equals the full value.
    assert_eq!(refreshed.net_value, Some(dec!(1_250_000)));

    let history = tracker.history(&created.id, None).await?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].value, dec!(1_250_000));
    assert_eq!(history[0].loan, None);
    assert_eq!(history[0].net_value, None);

    Ok(())
}

#[tokio::test]
async fn investment_derivation_flows_through_manual_tracking() -> Result<()> {
    let tracker = tracker(StubFetcher::status(500), fixed_clock());

    let record = tracker
        .track_manual(
            Purpose::Investment,
            PropertyPatch {
                current_value: Patch::Set(dec!(1_000_000)),
                outstanding_loan: Patch::Set(dec!(600_000)),
                monthly_loan_repayment: Patch::Set(dec!(3_000)),
                rent_amount: Patch::Set(dec!(500)),
                rent_frequency: Patch::Set(RentFrequency::Weekly),
                yearly_expenses: Patch::Set(dec!(5_000)),
                ..Default::default()
            },
        )
        .await?;

    assert_eq!(record.status, PropertyStatus::Active);
    assert_eq!(record.net_value, Some(dec!(400_000)));
    assert_eq!(record.monthly_rent.map(|r| r.round_dp(2)), Some(dec!(2166.67)));
    assert_eq!(record.annual_rental_income, Some(dec!(26_000)));
    assert_eq!(record.annual_loan_repayments, Some(dec!(36_000)));
    assert_eq!(record.yearly_cash_flow, Some(dec!(-15_000)));
    assert_eq!(record.yearly_shortage, Some(dec!(15_000)));

    Ok(())
}

#[tokio::test]
async fn rate_limited_refresh_still_activates_with_floor_facts() -> Result<()> {
    let clock = fixed_clock();
    let tracker = tracker(StubFetcher::status(429), clock.clone());

    let created = tracker
        .track_url(LISTING_URL, Purpose::Investment, PropertyPatch::default())
        .await?;
    let refreshed = tracker.refresh(&created.id).await?;

    assert_eq!(refreshed.status, PropertyStatus::Active);
    assert_eq!(refreshed.current_value, None);
    assert_eq!(refreshed.suburb.as_deref(), Some("Marsden Park"));
    assert!(tracker.history(&created.id, None).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn equal_value_refreshes_append_one_history_entry() -> Result<()> {
    let clock = fixed_clock();
    let page = listing_page("46 Pratia Cres, Marsden Park", "$1,250,000");
    let tracker = tracker(StubFetcher::success(page), clock.clone());

    let created = tracker
        .track_url(LISTING_URL, Purpose::Investment, PropertyPatch::default())
        .await?;

    tracker.refresh(&created.id).await?;
    clock.advance(Duration::days(1));
    let second = tracker.refresh(&created.id).await?;

    // An unchanged value is not a change: no previous value, no delta.
    assert_eq!(second.previous_value, None);
    assert_eq!(second.daily_change, None);

    let history = tracker.history(&created.id, None).await?;
    assert_eq!(history.len(), 1);

    Ok(())
}

#[tokio::test]
async fn concurrent_equal_updates_record_one_entry() -> Result<()> {
    let clock = fixed_clock();
    let tracker = tracker(StubFetcher::status(500), clock.clone());

    let created = tracker
        .track_manual(
            Purpose::Investment,
            PropertyPatch::value_only(dec!(500_000)),
        )
        .await?;

    clock.advance(Duration::days(1));
    let (first, second) = tokio::join!(
        tracker.update(&created.id, PropertyPatch::value_only(dec!(600_000))),
        tracker.update(&created.id, PropertyPatch::value_only(dec!(600_000)))
    );
    first?;
    second?;

    // Creation entry plus exactly one for the new value: whichever update ran
    // second saw 600k already stored and appended nothing.
    let history = tracker.history(&created.id, None).await?;
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].value, dec!(600_000));

    Ok(())
}

#[tokio::test]
async fn filters_narrow_the_listing() -> Result<()> {
    let tracker = tracker(StubFetcher::status(500), fixed_clock());

    tracker
        .track_manual(
            Purpose::Investment,
            PropertyPatch {
                nickname: Patch::Set("Beach flat".to_string()),
                suburb: Patch::Set("Bondi".to_string()),
                ..Default::default()
            },
        )
        .await?;
    tracker
        .track_manual(
            Purpose::PrimaryResidence,
            PropertyPatch {
                nickname: Patch::Set("Home".to_string()),
                suburb: Patch::Set("Marsden Park".to_string()),
                ..Default::default()
            },
        )
        .await?;
    tracker
        .track_manual(
            Purpose::Investment,
            PropertyPatch {
                nickname: Patch::Set("City unit".to_string()),
                suburb: Patch::Set("Melbourne".to_string()),
                ..Default::default()
            },
        )
        .await?;

    let bondi = tracker
        .list(&PropertyFilter {
            search: Some("BONDI".to_string()),
            ..Default::default()
        })
        .await?;
    assert_eq!(bondi.len(), 1);
    assert_eq!(bondi[0].nickname.as_deref(), Some("Beach flat"));

    let marsden = tracker
        .list(&PropertyFilter {
            suburb: Some("marsden".to_string()),
            ..Default::default()
        })
        .await?;
    assert_eq!(marsden.len(), 1);
    assert_eq!(marsden[0].nickname.as_deref(), Some("Home"));

    let investments = tracker
        .list(&PropertyFilter {
            purpose: Some(Purpose::Investment),
            ..Default::default()
        })
        .await?;
    assert_eq!(investments.len(), 2);

    Ok(())
}
