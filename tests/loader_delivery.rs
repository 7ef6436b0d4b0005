mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{DelayedContent, drain, png_bytes, test_config};
use thumbnail_loader::{
    Displayed, ImageLoader, LoadOutcome, MemoryTarget, Placeholder, RenderTarget, StaticBundle,
};

const SLOW: &str = "content://gallery/slow.png";
const FAST: &str = "content://gallery/fast.png";

fn delayed_loader() -> (ImageLoader, thumbnail_loader::DeliveryLoop) {
    let content = DelayedContent::default()
        .with(SLOW, Duration::from_millis(400), png_bytes(40, 40, [255, 0, 0, 255]))
        .with(FAST, Duration::from_millis(10), png_bytes(40, 40, [0, 0, 255, 255]));
    ImageLoader::builder()
        .config(test_config())
        .content_resolver(content)
        .build()
        .unwrap()
}

#[test]
fn test_cache_hit_is_synchronous_and_shares_buffer() {
    let (loader, delivery) = ImageLoader::builder()
        .config(test_config())
        .resource_bundle(StaticBundle::new().with_image("cover", png_bytes(64, 64, [9, 9, 9, 255])))
        .build()
        .unwrap();
    let target = MemoryTarget::new();
    let locator = Some("resource://app/drawable/cover.png");

    assert_eq!(
        loader.load_into(&target, locator, &Placeholder::Blank, Some(32), Some(32)),
        LoadOutcome::Scheduled
    );
    drain(&loader, &delivery);
    let first = target.current().image().cloned().expect("image applied");

    let scheduled_before = loader.stats().scheduled;
    assert_eq!(
        loader.load_into(&target, locator, &Placeholder::Blank, Some(32), Some(32)),
        LoadOutcome::AppliedFromCache
    );

    // Applied before load_into returned, with nothing new scheduled
    assert!(Arc::ptr_eq(target.current().image().unwrap(), &first));
    assert_eq!(loader.stats().scheduled, scheduled_before);
    assert_eq!(delivery.run_pending(), 0);

    // A different target asking for the same locator gets the same buffer
    let other = MemoryTarget::new();
    loader.load_into(&other, locator, &Placeholder::Blank, None, None);
    assert!(Arc::ptr_eq(other.current().image().unwrap(), &first));
}

#[test]
fn test_reused_target_never_shows_superseded_image() {
    let (loader, delivery) = delayed_loader();
    let target = MemoryTarget::measured(20, 20);

    assert_eq!(
        loader.load_into(&target, Some(SLOW), &Placeholder::named("row"), None, None),
        LoadOutcome::Scheduled
    );
    // The target is rebound to another row before the slow load finishes
    assert_eq!(
        loader.load_into(&target, Some(FAST), &Placeholder::named("row"), None, None),
        LoadOutcome::Scheduled
    );

    drain(&loader, &delivery);

    assert_eq!(target.current().locator().map(|l| l.as_str()), Some(FAST));
    assert!(!target.ever_showed(SLOW));

    // The superseded result was still decoded and cached
    assert!(loader.cache().contains(SLOW));
    let stats = loader.stats();
    assert_eq!(stats.applied, 1);
    assert_eq!(stats.discarded, 1);
}

#[test]
fn test_placeholder_shown_on_miss() {
    let (loader, delivery) = delayed_loader();
    let target = MemoryTarget::new();

    loader.load_into(&target, Some(FAST), &Placeholder::named("loading"), None, None);
    assert_eq!(
        target.current(),
        Displayed::Placeholder(Placeholder::named("loading"))
    );

    drain(&loader, &delivery);
    let image = target.current().image().cloned().unwrap();
    assert_eq!(image.pixel(0, 0), Some([0, 0, 255, 255]));
}

#[test]
fn test_pause_suppresses_new_work_not_in_flight_work() {
    let (loader, delivery) = delayed_loader();
    let busy = MemoryTarget::new();
    let idle = MemoryTarget::new();

    assert_eq!(
        loader.load_into(&busy, Some(SLOW), &Placeholder::Blank, None, None),
        LoadOutcome::Scheduled
    );
    loader.set_paused(true);

    assert_eq!(
        loader.load_into(&idle, Some(FAST), &Placeholder::Blank, None, None),
        LoadOutcome::Paused
    );

    drain(&loader, &delivery);

    // In-flight work finished and was delivered while paused
    assert_eq!(busy.current().locator().map(|l| l.as_str()), Some(SLOW));
    // Nothing was ever scheduled for the paused request
    assert!(idle.current().is_placeholder());
    assert!(!loader.cache().contains(FAST));
    assert_eq!(loader.stats().scheduled, 1);

    // Cache hits are still served while paused
    let again = MemoryTarget::new();
    assert_eq!(
        loader.load_into(&again, Some(SLOW), &Placeholder::Blank, None, None),
        LoadOutcome::AppliedFromCache
    );

    loader.set_paused(false);
    assert_eq!(
        loader.load_into(&idle, Some(FAST), &Placeholder::Blank, None, None),
        LoadOutcome::Scheduled
    );
    drain(&loader, &delivery);
    assert_eq!(idle.current().locator().map(|l| l.as_str()), Some(FAST));
}

#[test]
fn test_empty_locator_cancels_earlier_request() {
    let (loader, delivery) = delayed_loader();
    let target = MemoryTarget::new();

    loader.load_into(&target, Some(SLOW), &Placeholder::Blank, None, None);
    assert_eq!(
        loader.load_into(&target, None, &Placeholder::named("none"), None, None),
        LoadOutcome::NoLocator
    );
    assert!(loader.pending_for(target.id()).is_none());

    drain(&loader, &delivery);
    assert_eq!(
        target.current(),
        Displayed::Placeholder(Placeholder::named("none"))
    );
}

#[test]
fn test_detach_discards_in_flight_result() {
    let (loader, delivery) = delayed_loader();
    let target = MemoryTarget::new();

    loader.load_into(&target, Some(FAST), &Placeholder::Blank, None, None);
    assert!(loader.detach(target.id()).is_some());

    drain(&loader, &delivery);
    assert!(!target.ever_showed(FAST));
    assert_eq!(loader.stats().discarded, 1);
}

#[test]
fn test_dropped_target_is_not_kept_alive() {
    let (loader, delivery) = delayed_loader();
    let target = MemoryTarget::new();
    let weak = Arc::downgrade(&target);

    loader.load_into(&target, Some(SLOW), &Placeholder::Blank, None, None);
    drop(target);
    assert!(weak.upgrade().is_none());

    drain(&loader, &delivery);
    assert_eq!(loader.stats().discarded, 1);
}

#[test]
fn test_many_targets_bounded_by_pool() {
    let (loader, delivery) = delayed_loader();
    let targets: Vec<_> = (0..10).map(|_| MemoryTarget::new()).collect();

    for (i, target) in targets.iter().enumerate() {
        let locator = if i % 2 == 0 { FAST } else { SLOW };
        loader.load_into(target, Some(locator), &Placeholder::Blank, None, None);
        assert!(loader.pool().in_flight() <= loader.pool().pool_size());
    }

    drain(&loader, &delivery);
    for (i, target) in targets.iter().enumerate() {
        let expected = if i % 2 == 0 { FAST } else { SLOW };
        assert_eq!(target.current().locator().map(|l| l.as_str()), Some(expected));
    }
}
