//! Format sniffing and image dimension extraction.
//!
//! Raster headers go through the generic `image` reader; KRA and ORA are
//! ZIP archives whose inner XML document carries the canvas size, so only
//! that small member is decompressed. The probe never fails: any container
//! or parse failure degrades to `Unknown` and flags the file unreadable
//! for metadata purposes (the file stays in the raw enumeration).

use std::fs::File;
use std::io::Read;
use std::path::Path;

use image::ImageFormat;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::services::files::format::FormatTag;

/// Extensions the probe will even look at (lowercase, with dot). An empty
/// extension triggers container sniffing.
const PROBE_EXTENSIONS: &[&str] = &[".png", ".jpeg", ".jpg", ".ora", ".svg", ".kra", ".kra~", ""];

/// Outcome of probing one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    pub format: FormatTag,
    /// `(width, height)`; `None` when unknown or not applicable.
    pub image_size: Option<(i32, i32)>,
    /// False when the file could not be interpreted at all; the descriptor
    /// then carries no quick hash.
    pub readable: bool,
}

impl ProbeResult {
    fn unreadable() -> Self {
        ProbeResult {
            format: FormatTag::Unknown,
            image_size: None,
            readable: false,
        }
    }

    fn unknown() -> Self {
        ProbeResult {
            format: FormatTag::Unknown,
            image_size: None,
            readable: true,
        }
    }
}

/// Probe the file at `path`, using its (lowercase, dot-prefixed) extension
/// as a hint. Never panics and never returns an error.
pub fn probe(path: &Path, extension_hint: &str) -> ProbeResult {
    if !PROBE_EXTENSIONS.contains(&extension_hint) {
        // Stat-ok but not a managed image: listed, readable, no format
        // identity.
        return ProbeResult::unknown();
    }

    if extension_hint.is_empty() {
        return probe_containers(path);
    }

    // Generic reader first: its detected format wins over the hint.
    if let Some((format, size)) = read_raster_header(path) {
        return ProbeResult {
            format,
            image_size: size,
            readable: true,
        };
    }

    match extension_hint {
        ".svg" => {
            let size = read_svg_size(path);
            ProbeResult {
                format: FormatTag::Svg,
                image_size: size,
                readable: true,
            }
        }
        ".kra" | ".kra~" => match read_kra_image_size(path) {
            Some(size) => ProbeResult {
                format: FormatTag::Kra,
                image_size: Some(size),
                readable: true,
            },
            None => ProbeResult::unreadable(),
        },
        ".ora" => match read_ora_image_size(path) {
            Some(size) => ProbeResult {
                format: FormatTag::Ora,
                image_size: Some(size),
                readable: true,
            },
            None => ProbeResult::unreadable(),
        },
        // Raster extension but undecodable header: keep the hinted format,
        // dimensions unknown.
        ".png" => ProbeResult {
            format: FormatTag::Png,
            image_size: None,
            readable: true,
        },
        ".jpg" | ".jpeg" => ProbeResult {
            format: FormatTag::Jpeg,
            image_size: None,
            readable: true,
        },
        _ => ProbeResult::unknown(),
    }
}

/// No extension to go by: raster header, then KRA, then ORA.
fn probe_containers(path: &Path) -> ProbeResult {
    if let Some((format, size)) = read_raster_header(path) {
        return ProbeResult {
            format,
            image_size: size,
            readable: true,
        };
    }
    if let Some(size) = read_kra_image_size(path) {
        return ProbeResult {
            format: FormatTag::Kra,
            image_size: Some(size),
            readable: true,
        };
    }
    if let Some(size) = read_ora_image_size(path) {
        return ProbeResult {
            format: FormatTag::Ora,
            image_size: Some(size),
            readable: true,
        };
    }
    // Nothing recognisable, but the content itself read fine.
    ProbeResult::unknown()
}

/// Header-only decode through the `image` reader. Returns `None` when the
/// content is not a raster format the reader understands.
fn read_raster_header(path: &Path) -> Option<(FormatTag, Option<(i32, i32)>)> {
    let reader = image::ImageReader::open(path)
        .ok()?
        .with_guessed_format()
        .ok()?;
    let format = match reader.format()? {
        ImageFormat::Png => FormatTag::Png,
        ImageFormat::Jpeg => FormatTag::Jpeg,
        _ => return None,
    };
    let size = reader
        .into_dimensions()
        .ok()
        .map(|(w, h)| (w as i32, h as i32));
    Some((format, size))
}

/// Canvas size of a Krita document: `maindoc.xml` carries `width`/`height`
/// on the root element, with the `IMAGE` child as fallback (the layout
/// Krita writes).
fn read_kra_image_size(path: &Path) -> Option<(i32, i32)> {
    let xml = read_zip_member(path, "maindoc.xml")?;
    let xml = String::from_utf8(xml).ok()?;
    read_dimension_attributes(&xml, "width", "height")
}

/// Canvas size of an OpenRaster document: root `w`/`h` of `stack.xml`.
fn read_ora_image_size(path: &Path) -> Option<(i32, i32)> {
    let xml = read_zip_member(path, "stack.xml")?;
    let xml = String::from_utf8(xml).ok()?;
    read_dimension_attributes(&xml, "w", "h")
}

/// Merged preview of a Krita document (`mergedimage.png`, falling back to
/// `preview.png`). Used by the thumbnail renderer's fast path.
pub fn read_kra_embedded_image(path: &Path) -> Option<Vec<u8>> {
    read_zip_member(path, "mergedimage.png").or_else(|| read_zip_member(path, "preview.png"))
}

/// Embedded thumbnail of an OpenRaster document. Note: this is a reduced
/// size image by the ORA spec.
pub fn read_ora_embedded_image(path: &Path) -> Option<Vec<u8>> {
    read_zip_member(path, "Thumbnail/thumbnail.png")
}

fn read_zip_member(path: &Path, member: &str) -> Option<Vec<u8>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            log::debug!("unable to open {}: {e}", path.display());
            return None;
        }
    };
    let mut archive = match zip::ZipArchive::new(file) {
        Ok(a) => a,
        Err(e) => {
            log::debug!("{} is not a zip archive: {e}", path.display());
            return None;
        }
    };
    let mut entry = match archive.by_name(member) {
        Ok(entry) => entry,
        Err(e) => {
            log::debug!("no {member} in {}: {e}", path.display());
            return None;
        }
    };
    let mut data = Vec::with_capacity(entry.size() as usize);
    if let Err(e) = entry.read_to_end(&mut data) {
        log::debug!("unable to read {member} in {}: {e}", path.display());
        return None;
    }
    Some(data)
}

/// Extract two integer attributes from the first element that carries both:
/// the document root, or its first child when the root delegates (KRA).
fn read_dimension_attributes(xml: &str, width_attr: &str, height_attr: &str) -> Option<(i32, i32)> {
    let mut reader = Reader::from_str(xml);
    let mut depth = 0usize;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let width = integer_attribute(&e, width_attr);
                let height = integer_attribute(&e, height_attr);
                if let (Some(w), Some(h)) = (width, height) {
                    return Some((w, h));
                }
                depth += 1;
                // Root and first-level children only; deeper elements are
                // layers, not the canvas.
                if depth > 8 {
                    return None;
                }
            }
            Ok(Event::Eof) => return None,
            Err(_) => return None,
            _ => {}
        }
    }
}

fn integer_attribute(element: &quick_xml::events::BytesStart<'_>, name: &str) -> Option<i32> {
    let attr = element.try_get_attribute(name).ok()??;
    let value = attr.unescape_value().ok()?;
    // SVG dimensions may carry a unit suffix (`px`); strip trailing
    // non-numeric characters before parsing.
    let numeric: String = value
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    numeric.parse::<f64>().ok().map(|v| v.round() as i32)
}

/// Pixel size of an SVG document, from the root element's `width`/`height`
/// attributes. Returns `None` when the root only declares relative sizes.
fn read_svg_size(path: &Path) -> Option<(i32, i32)> {
    let mut file = File::open(path).ok()?;
    // The root element sits at the head of the document; 64 KiB is enough.
    let mut head = vec![0u8; 65536];
    let read = file.read(&mut head).ok()?;
    head.truncate(read);
    let xml = String::from_utf8_lossy(&head);

    let mut reader = Reader::from_str(&xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.name().as_ref() != b"svg" {
                    return None;
                }
                let width = integer_attribute(&e, "width");
                let height = integer_attribute(&e, "height");
                if let (Some(w), Some(h)) = (width, height) {
                    if w > 0 && h > 0 {
                        return Some((w, h));
                    }
                }
                return read_view_box(&e);
            }
            Ok(Event::Eof) => return None,
            Err(_) => return None,
            _ => {}
        }
    }
}

fn read_view_box(element: &quick_xml::events::BytesStart<'_>) -> Option<(i32, i32)> {
    let attr = element.try_get_attribute("viewBox").ok()??;
    let value = attr.unescape_value().ok()?;
    let parts: Vec<f64> = value
        .split([' ', ','])
        .filter(|p| !p.is_empty())
        .filter_map(|p| p.parse().ok())
        .collect();
    if parts.len() == 4 && parts[2] > 0.0 && parts[3] > 0.0 {
        Some((parts[2].round() as i32, parts[3].round() as i32))
    } else {
        None
    }
}

#[cfg(test)]
#[path = "tests/probe_tests.rs"]
mod tests;
