mod common;

use std::collections::BTreeMap;

use common::{drain, png_bytes, test_config};
use rstest::rstest;
use thumbnail_loader::{ImageLoader, LoadOutcome, MemoryTarget, Placeholder};

fn default_loader() -> (ImageLoader, thumbnail_loader::DeliveryLoop) {
    ImageLoader::start(test_config()).unwrap()
}

#[test]
fn test_bundled_resource_loads() {
    let (loader, delivery) = default_loader();
    let target = MemoryTarget::new();

    loader.load_into(
        &target,
        Some("resource://com.example.app/drawable/App-Logo.png"),
        &Placeholder::Blank,
        Some(16),
        Some(12),
    );
    drain(&loader, &delivery);

    let image = target.current().image().cloned().expect("bundled logo applied");
    assert_eq!((image.width(), image.height()), (16, 12));
    assert_eq!(image.sample_factor(), 4);
    assert_eq!(image.pixel(0, 0), Some([200, 40, 40, 255]));
}

#[test]
fn test_missing_bundled_resource_keeps_placeholder() {
    let (loader, delivery) = default_loader();
    let target = MemoryTarget::new();

    let outcome = loader.load_into(
        &target,
        Some("resource://com.example.app/drawable/does_not_exist.png"),
        &Placeholder::named("fallback"),
        None,
        None,
    );
    assert_eq!(outcome, LoadOutcome::Scheduled);
    drain(&loader, &delivery);

    assert_eq!(
        target.current(),
        thumbnail_loader::Displayed::Placeholder(Placeholder::named("fallback"))
    );
    assert_eq!(loader.stats().failed, 1);
    assert!(loader.cache().is_empty());
}

#[rstest]
#[case("ftp://example.com/a.png")]
#[case("mailto:someone@example.com")]
#[case("relative/path.png")]
fn test_unknown_scheme_keeps_placeholder(#[case] locator: &str) {
    let (loader, delivery) = default_loader();
    let target = MemoryTarget::new();

    loader.load_into(&target, Some(locator), &Placeholder::Blank, None, None);
    drain(&loader, &delivery);

    assert!(target.current().is_placeholder());
    assert_eq!(loader.stats().applied, 0);
}

#[test]
fn test_content_root_and_file_paths() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("camera")).unwrap();
    let photo = dir.path().join("camera").join("IMG 0001.png");
    std::fs::write(&photo, png_bytes(120, 80, [0, 128, 0, 255])).unwrap();

    let mut config = test_config();
    config.content.roots = BTreeMap::from([("photos".to_string(), dir.path().to_path_buf())]);
    let (loader, delivery) = ImageLoader::start(config).unwrap();

    let via_content = MemoryTarget::new();
    let via_path = MemoryTarget::new();
    loader.load_into(
        &via_content,
        Some("content://photos/camera/IMG%200001.png"),
        &Placeholder::Blank,
        Some(30),
        Some(20),
    );
    loader.load_into(
        &via_path,
        photo.to_str(),
        &Placeholder::Blank,
        Some(60),
        Some(40),
    );
    drain(&loader, &delivery);

    let small = via_content.current().image().cloned().unwrap();
    assert_eq!(small.sample_factor(), 4);
    assert_eq!((small.width(), small.height()), (30, 20));

    let large = via_path.current().image().cloned().unwrap();
    assert_eq!(large.sample_factor(), 2);
    assert_eq!(large.pixel(1, 1), Some([0, 128, 0, 255]));
}

#[test]
fn test_corrupt_file_keeps_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.png");
    std::fs::write(&path, b"\x89PNG\r\n\x1a\nnot really").unwrap();

    let (loader, delivery) = default_loader();
    let target = MemoryTarget::new();
    loader.load_into(&target, path.to_str(), &Placeholder::Blank, None, None);
    drain(&loader, &delivery);

    assert!(target.current().is_placeholder());
    assert_eq!(loader.stats().failed, 1);
}

#[test]
fn test_unreachable_host_keeps_placeholder() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let (loader, delivery) = default_loader();
    let target = MemoryTarget::new();
    loader.load_into(
        &target,
        Some(&format!("http://127.0.0.1:{port}/thumb.png")),
        &Placeholder::Blank,
        None,
        None,
    );
    drain(&loader, &delivery);

    assert!(target.current().is_placeholder());
    assert_eq!(loader.stats().failed, 1);
}
