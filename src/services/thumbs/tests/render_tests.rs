use super::*;
use crate::test_utils;
use tempfile::TempDir;

fn descriptor(path: &std::path::Path) -> FileDescriptor {
    FileDescriptor::from_file(path)
}

#[test]
fn test_load_raster_source() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("a.png");
    test_utils::write_png(&path, 300, 200);

    let image = load_source_image(&descriptor(&path)).unwrap();
    assert_eq!((image.width(), image.height()), (300, 200));
}

#[test]
fn test_load_kra_uses_merged_image() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("work.kra");
    test_utils::write_kra(&path, 2000, 1000);

    // The fixture embeds a small merged preview; loading must succeed
    // without decoding the (non-existent) layer stack.
    let image = load_source_image(&descriptor(&path)).unwrap();
    assert!(image.width() > 0);
}

#[test]
fn test_load_ora_uses_embedded_thumbnail() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("painting.ora");
    test_utils::write_ora(&path, 4000, 4000);

    let image = load_source_image(&descriptor(&path)).unwrap();
    assert!(image.width() > 0);
}

#[test]
fn test_load_unknown_is_format_error() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("c.txt");
    std::fs::write(&path, b"text").unwrap();

    assert!(load_source_image(&descriptor(&path)).is_err());
}

#[test]
fn test_downscale_preserves_aspect_ratio() {
    let image = DynamicImage::new_rgb8(400, 200);
    let thumb = downscale(&image, ThumbnailSize::Small);
    assert_eq!((thumb.width(), thumb.height()), (64, 32));

    let tall = DynamicImage::new_rgb8(100, 400);
    let thumb = downscale(&tall, ThumbnailSize::Medium);
    assert_eq!((thumb.width(), thumb.height()), (32, 128));
}

#[test]
fn test_encode_decode_round_trip() {
    let image = DynamicImage::new_rgb8(64, 64);

    for format in [ThumbnailFormat::Png, ThumbnailFormat::Jpeg] {
        let bytes = encode(&image, format, ThumbnailSize::Small).unwrap();
        assert!(!bytes.is_empty());
        let decoded = decode(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 64));
    }
}
