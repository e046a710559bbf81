use super::*;
use crate::services::files::format::ThumbnailFormat;
use crate::test_utils;
use tempfile::TempDir;

fn cache_with(tmp: &TempDir) -> ThumbnailCache {
    let config = CacheConfig::new(&tmp.path().join("cache")).unwrap();
    ThumbnailCache::new(config)
}

fn png_descriptor(tmp: &TempDir, name: &str, width: u32, height: u32) -> FileDescriptor {
    let path = tmp.path().join(name);
    test_utils::write_png(&path, width, height);
    FileDescriptor::from_file(&path)
}

fn raw_pixels(image: &DynamicImage) -> Vec<u8> {
    image.to_rgba8().into_raw()
}

#[test]
fn test_generation_writes_to_session_slot() {
    let tmp = TempDir::new().unwrap();
    let cache = cache_with(&tmp);
    let d = png_descriptor(&tmp, "a.png", 600, 400);

    let thumb = cache
        .thumbnail(&d, Some(ThumbnailSize::Medium), true)
        .unwrap();
    assert_eq!(thumb.width(), 128);
    assert_eq!(thumb.height(), 85);

    let slot = cache.slot_path(CacheTier::Session, ThumbnailSize::Medium, d.hash());
    assert!(slot.is_file());
    let persistent_slot = cache.slot_path(CacheTier::Persistent, ThumbnailSize::Medium, d.hash());
    assert!(!persistent_slot.is_file());
}

#[test]
fn test_repeated_reads_are_pixel_identical() {
    let tmp = TempDir::new().unwrap();
    let cache = cache_with(&tmp);
    let d = png_descriptor(&tmp, "a.png", 500, 300);

    let first = cache
        .thumbnail(&d, Some(ThumbnailSize::Small), true)
        .unwrap();
    let second = cache
        .thumbnail(&d, Some(ThumbnailSize::Small), true)
        .unwrap();
    assert_eq!(raw_pixels(&first), raw_pixels(&second));
}

#[test]
fn test_larger_size_is_downscaled_without_persisting() {
    let tmp = TempDir::new().unwrap();
    let cache = cache_with(&tmp);
    let d = png_descriptor(&tmp, "a.png", 800, 800);

    // Generate the huge rendition, then delete the source file: the small
    // request must be served from the cached huge one.
    cache
        .thumbnail(&d, Some(ThumbnailSize::Huge), true)
        .unwrap();
    std::fs::remove_file(tmp.path().join("a.png")).unwrap();

    let small = cache
        .thumbnail(&d, Some(ThumbnailSize::Small), true)
        .unwrap();
    assert_eq!(small.width(), 64);

    // The derived rendition was not persisted.
    let small_slot = cache.slot_path(CacheTier::Session, ThumbnailSize::Small, d.hash());
    assert!(!small_slot.is_file());
}

#[test]
fn test_no_cache_mode_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let cache = cache_with(&tmp);
    let d = png_descriptor(&tmp, "a.png", 256, 256);

    let thumb = cache
        .thumbnail(&d, Some(ThumbnailSize::Small), false)
        .unwrap();
    assert_eq!(thumb.width(), 64);
    let (count, _) = cache.tier_size(CacheTier::Session);
    assert_eq!(count, 0);
}

#[test]
fn test_kra_thumbnail_via_embedded_preview() {
    let tmp = TempDir::new().unwrap();
    let cache = cache_with(&tmp);
    let path = tmp.path().join("work.kra");
    test_utils::write_kra(&path, 1920, 1080);
    let d = FileDescriptor::from_file(&path);

    let thumb = cache
        .thumbnail(&d, Some(ThumbnailSize::Small), true)
        .unwrap();
    assert!(thumb.width() <= 64 && thumb.height() <= 64);
}

#[test]
fn test_set_persistent_round_trip_preserves_bytes() {
    let tmp = TempDir::new().unwrap();
    let cache = cache_with(&tmp);
    let d = png_descriptor(&tmp, "a.png", 300, 300);

    cache
        .thumbnail(&d, Some(ThumbnailSize::Medium), true)
        .unwrap();
    let (count_before, bytes_before) = cache.tier_size(CacheTier::Session);
    assert_eq!(count_before, 1);

    let moved = cache.set_persistent(d.hash(), true).unwrap();
    assert_eq!(moved, 1);
    assert_eq!(cache.tier_size(CacheTier::Session).0, 0);
    let (count, bytes) = cache.tier_size(CacheTier::Persistent);
    assert_eq!(count, 1);
    assert_eq!(bytes, bytes_before);

    let moved_back = cache.set_persistent(d.hash(), false).unwrap();
    assert_eq!(moved_back, 1);
    let (count, bytes) = cache.tier_size(CacheTier::Session);
    assert_eq!((count, bytes), (1, bytes_before));
}

#[test]
fn test_persistent_hit_serves_reads() {
    let tmp = TempDir::new().unwrap();
    let cache = cache_with(&tmp);
    let d = png_descriptor(&tmp, "a.png", 300, 300);

    cache
        .thumbnail(&d, Some(ThumbnailSize::Medium), true)
        .unwrap();
    cache.set_persistent(d.hash(), true).unwrap();
    std::fs::remove_file(tmp.path().join("a.png")).unwrap();

    // Source is gone; the persistent slot answers.
    let thumb = cache
        .thumbnail(&d, Some(ThumbnailSize::Medium), true)
        .unwrap();
    assert_eq!(thumb.width(), 128);
}

#[test]
fn test_flush_clears_one_tier_only() {
    let tmp = TempDir::new().unwrap();
    let cache = cache_with(&tmp);
    let a = png_descriptor(&tmp, "a.png", 100, 100);
    let b = png_descriptor(&tmp, "b.png", 120, 120);

    cache.thumbnail(&a, None, true).unwrap();
    cache.thumbnail(&b, None, true).unwrap();
    cache.set_persistent(a.hash(), true).unwrap();

    let removed = cache.flush(CacheTier::Session).unwrap();
    assert_eq!(removed, 1);
    assert_eq!(cache.tier_size(CacheTier::Session).0, 0);
    assert_eq!(cache.tier_size(CacheTier::Persistent).0, 1);
}

#[test]
fn test_session_eviction_removes_oldest_first() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("cache");

    // Seed the old entry through a cache with a roomy ceiling, then
    // backdate it.
    let roomy = ThumbnailCache::new(CacheConfig::new(&root).unwrap());
    let old = png_descriptor(&tmp, "old.png", 256, 256);
    roomy
        .thumbnail(&old, Some(ThumbnailSize::Medium), true)
        .unwrap();
    let old_slot = roomy.slot_path(CacheTier::Session, ThumbnailSize::Medium, old.hash());
    assert!(old_slot.is_file());
    test_utils::set_mtime(&old_slot, 1_000_000);

    // A one-byte ceiling forces eviction on the next generation; the
    // backdated entry goes first.
    let tight = ThumbnailCache::new(
        CacheConfig::new(&root).unwrap().with_session_max_bytes(1),
    );
    let fresh = png_descriptor(&tmp, "fresh.png", 256, 256);
    tight
        .thumbnail(&fresh, Some(ThumbnailSize::Medium), true)
        .unwrap();

    assert!(!old_slot.is_file());
}

#[test]
fn test_eviction_never_touches_persistent_tier() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("cache");

    let roomy = ThumbnailCache::new(CacheConfig::new(&root).unwrap());
    let keeper = png_descriptor(&tmp, "keeper.png", 256, 256);
    roomy.thumbnail(&keeper, None, true).unwrap();
    roomy.set_persistent(keeper.hash(), true).unwrap();

    let tight = ThumbnailCache::new(
        CacheConfig::new(&root).unwrap().with_session_max_bytes(1),
    );
    let filler = png_descriptor(&tmp, "filler.png", 256, 256);
    tight.thumbnail(&filler, None, true).unwrap();

    assert_eq!(tight.tier_size(CacheTier::Session).0, 0);
    assert_eq!(tight.tier_size(CacheTier::Persistent).0, 1);
}

#[test]
fn test_unreadable_descriptor_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let cache = cache_with(&tmp);
    let path = tmp.path().join("broken.kra");
    std::fs::write(&path, b"not a zip").unwrap();
    let d = FileDescriptor::from_file(&path);

    assert!(cache.thumbnail(&d, None, true).is_err());
}
