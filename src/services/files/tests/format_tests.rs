use super::*;

#[test]
fn test_jpg_normalises_to_jpeg() {
    assert_eq!(FormatTag::parse("jpg").unwrap(), FormatTag::Jpeg);
    assert_eq!(FormatTag::parse("JPG").unwrap(), FormatTag::Jpeg);
    assert_eq!(FormatTag::parse("jpeg").unwrap(), FormatTag::Jpeg);
}

#[test]
fn test_unknown_format_is_rejected() {
    assert!(FormatTag::parse("webp").is_err());
    assert!(FormatTag::parse("").is_err());
}

#[test]
fn test_thumbnail_size_successor_order() {
    assert_eq!(ThumbnailSize::Small.larger(), Some(ThumbnailSize::Medium));
    assert_eq!(ThumbnailSize::Medium.larger(), Some(ThumbnailSize::Large));
    assert_eq!(ThumbnailSize::Large.larger(), Some(ThumbnailSize::Huge));
    assert_eq!(ThumbnailSize::Huge.larger(), None);
    assert_eq!(ThumbnailSize::Small.smaller(), None);
    assert_eq!(ThumbnailSize::Huge.smaller(), Some(ThumbnailSize::Large));
}

#[test]
fn test_thumbnail_size_pixels() {
    let px: Vec<u32> = ThumbnailSize::ALL.iter().map(|s| s.pixels()).collect();
    assert_eq!(px, vec![64, 128, 256, 512]);
}

#[test]
fn test_jpeg_quality_depends_on_size() {
    assert_eq!(ThumbnailFormat::Jpeg.quality(ThumbnailSize::Small), 95);
    assert_eq!(ThumbnailFormat::Jpeg.quality(ThumbnailSize::Medium), 95);
    assert_eq!(ThumbnailFormat::Jpeg.quality(ThumbnailSize::Large), 85);
    assert_eq!(ThumbnailFormat::Jpeg.quality(ThumbnailSize::Huge), 85);
    assert_eq!(ThumbnailFormat::Png.quality(ThumbnailSize::Huge), 100);
}

#[test]
fn test_managed_extension_backup_opt_in() {
    assert!(is_managed_extension("png", false));
    assert!(is_managed_extension("kra", false));
    assert!(!is_managed_extension("kra~", false));
    assert!(is_managed_extension("kra~", true));
    assert!(!is_managed_extension("txt", true));
}

#[test]
fn test_file_property_round_trip() {
    for property in [
        FileProperty::Path,
        FileProperty::FullPathname,
        FileProperty::FileName,
        FileProperty::FileFormat,
        FileProperty::FileSize,
        FileProperty::FileDate,
        FileProperty::ImageWidth,
        FileProperty::ImageHeight,
    ] {
        assert_eq!(FileProperty::parse(property.as_str()).unwrap(), property);
    }
}
