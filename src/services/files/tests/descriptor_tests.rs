use super::*;
use crate::services::files::format::FileProperty;
use crate::test_utils;
use tempfile::TempDir;

#[test]
fn test_file_descriptor_from_png() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("a.png");
    test_utils::write_png(&path, 512, 384);

    let d = FileDescriptor::from_file(&path);
    assert_eq!(d.format(), FormatTag::Png);
    assert_eq!(d.image_size(), (512, 384));
    assert!(d.readable());
    assert!(d.size() > 0);
    assert_eq!(d.hash().len(), 64);
    assert_eq!(d.name(), "a.png");
    assert_eq!(d.path(), tmp.path().to_string_lossy());
}

#[test]
fn test_unreadable_file_has_empty_hash() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("broken.kra");
    std::fs::write(&path, b"not a zip").unwrap();

    let d = FileDescriptor::from_file(&path);
    assert!(!d.readable());
    assert_eq!(d.format(), FormatTag::Unknown);
    assert_eq!(d.hash(), "");
}

#[test]
fn test_zero_byte_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("empty");
    std::fs::write(&path, b"").unwrap();

    let d = FileDescriptor::from_file(&path);
    assert!(d.readable());
    assert_eq!(d.size(), 0);
    assert_eq!(d.image_size(), (-1, -1));
    // No extension and no recognisable content: still a readable row
    // with an unknown format.
    assert_eq!(d.format(), FormatTag::Unknown);
    // The digest of empty content is a real digest.
    assert_eq!(d.hash().len(), 64);
    assert!(d.hash().chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_directory_descriptor_properties() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("artwork");
    std::fs::create_dir(&dir).unwrap();

    let d = FileDescriptor::directory(&dir);
    assert!(d.is_directory());
    assert_eq!(d.format(), FormatTag::Directory);
    assert_eq!(d.property(FileProperty::FileSize), None);
    assert_eq!(d.property(FileProperty::ImageWidth), None);
    assert_eq!(d.property(FileProperty::ImageHeight), None);
    assert!(matches!(
        d.property(FileProperty::FileName),
        Some(PropertyValue::Str(name)) if name == "artwork"
    ));
    assert!(matches!(
        d.property(FileProperty::FileDate),
        Some(PropertyValue::Date(_))
    ));
}

#[test]
fn test_property_accessor_for_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("b.png");
    test_utils::write_png(&path, 100, 50);

    let d = FileDescriptor::from_file(&path);
    assert_eq!(
        d.property(FileProperty::ImageWidth),
        Some(PropertyValue::Int(100))
    );
    assert_eq!(
        d.property(FileProperty::ImageHeight),
        Some(PropertyValue::Int(50))
    );
    assert!(matches!(
        d.property(FileProperty::FileSize),
        Some(PropertyValue::Int(size)) if size > 0
    ));
    assert!(matches!(
        d.property(FileProperty::FileFormat),
        Some(PropertyValue::Format(FormatTag::Png))
    ));
}

#[test]
fn test_image_ratio_and_pixels() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("wide.png");
    test_utils::write_png(&path, 200, 100);

    let d = FileDescriptor::from_file(&path);
    assert_eq!(d.image_ratio(), Some(2.0));
    assert_eq!(d.image_pixels(), Some(20_000));

    let dir = FileDescriptor::directory(tmp.path());
    assert_eq!(dir.image_ratio(), None);
    assert_eq!(dir.image_pixels(), None);
}

#[test]
fn test_kra_backup_gets_probed() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("work.kra~");
    test_utils::write_kra(&path, 320, 240);

    let d = FileDescriptor::from_file(&path);
    assert_eq!(d.format(), FormatTag::Kra);
    assert_eq!(d.image_size(), (320, 240));
}
