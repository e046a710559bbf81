//! Shared test fixtures: logger setup and synthetic image/container files.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Once;

use image::{DynamicImage, ImageFormat};
use zip::write::SimpleFileOptions;

static INIT: Once = Once::new();

/// Initialise the test logger once per process.
pub fn init_logging() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Write a real PNG of the given dimensions.
pub fn write_png(path: &Path, width: u32, height: u32) {
    let img = DynamicImage::new_rgb8(width, height);
    img.save_with_format(path, ImageFormat::Png)
        .expect("failed to write test png");
}

/// Write a real JPEG of the given dimensions.
pub fn write_jpeg(path: &Path, width: u32, height: u32) {
    let img = DynamicImage::new_rgb8(width, height);
    img.save_with_format(path, ImageFormat::Jpeg)
        .expect("failed to write test jpeg");
}

/// Write a minimal Krita document: a ZIP with a `maindoc.xml` declaring the
/// canvas size, plus a merged preview PNG.
pub fn write_kra(path: &Path, width: u32, height: u32) {
    let maindoc = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<DOC editor="Krita" syntaxVersion="2">
 <IMAGE mime="application/x-kra" width="{width}" height="{height}" name="canvas"/>
</DOC>"#
    );
    let mut merged = Vec::new();
    DynamicImage::new_rgb8(width.min(64).max(1), height.min(64).max(1))
        .write_to(&mut std::io::Cursor::new(&mut merged), ImageFormat::Png)
        .expect("failed to encode merged image");

    let file = File::create(path).expect("failed to create kra fixture");
    let mut writer = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    writer
        .start_file("maindoc.xml", options)
        .expect("failed to add maindoc.xml");
    writer
        .write_all(maindoc.as_bytes())
        .expect("failed to write maindoc.xml");
    writer
        .start_file("mergedimage.png", options)
        .expect("failed to add mergedimage.png");
    writer
        .write_all(&merged)
        .expect("failed to write mergedimage.png");
    writer.finish().expect("failed to finish kra fixture");
}

/// Write a Krita-like ZIP without the inner `maindoc.xml`.
pub fn write_kra_without_maindoc(path: &Path) {
    let file = File::create(path).expect("failed to create kra fixture");
    let mut writer = zip::ZipWriter::new(file);
    writer
        .start_file("something.txt", SimpleFileOptions::default())
        .expect("failed to add member");
    writer
        .write_all(b"not a krita document")
        .expect("failed to write member");
    writer.finish().expect("failed to finish fixture");
}

/// Write a minimal OpenRaster document: `stack.xml` with root `w`/`h` and
/// the embedded thumbnail.
pub fn write_ora(path: &Path, width: u32, height: u32) {
    let stack = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<image w="{width}" h="{height}" version="0.0.3">
 <stack/>
</image>"#
    );
    let mut thumb = Vec::new();
    DynamicImage::new_rgb8(width.min(256).max(1), height.min(256).max(1))
        .write_to(&mut std::io::Cursor::new(&mut thumb), ImageFormat::Png)
        .expect("failed to encode thumbnail");

    let file = File::create(path).expect("failed to create ora fixture");
    let mut writer = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    writer
        .start_file("stack.xml", options)
        .expect("failed to add stack.xml");
    writer
        .write_all(stack.as_bytes())
        .expect("failed to write stack.xml");
    writer
        .start_file("Thumbnail/thumbnail.png", options)
        .expect("failed to add thumbnail");
    writer
        .write_all(&thumb)
        .expect("failed to write thumbnail");
    writer.finish().expect("failed to finish ora fixture");
}

/// Write `len` bytes of a repeating pattern seeded by `seed`.
pub fn write_pattern(path: &Path, len: usize, seed: u8) {
    let data: Vec<u8> = (0..len).map(|i| (i as u8).wrapping_add(seed)).collect();
    std::fs::write(path, data).expect("failed to write pattern file");
}

/// Set a file's modification time to the given POSIX seconds.
pub fn set_mtime(path: &Path, seconds: i64) {
    let mtime = filetime::FileTime::from_unix_time(seconds, 0);
    filetime::set_file_mtime(path, mtime).expect("failed to set mtime");
}
