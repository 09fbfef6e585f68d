// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Embedding an overlay raster into a page as an image XObject.
//
// The overlay becomes an RGB image with a DeviceGray soft mask. The page's
// existing content streams are kept as-is, bracketed by `q`/`Q`, and a new
// stream draws the image over the whole displayed page.

use lopdf::{Dictionary, Document, Object, Stream, dictionary};
use stempel_core::error::{Result, StempelError};

use super::reader::{PageGeometry, inherited, resolve};
use crate::composite::OverlayLayer;

/// Resource name prefix for embedded overlays.
const XOBJECT_PREFIX: &str = "StempelWm";

/// Compressed image and mask streams for one page, built off the document so
/// they can be produced in parallel.
pub(crate) struct EncodedOverlay {
    image: Stream,
    mask: Stream,
}

pub(crate) fn encode_overlay(layer: &OverlayLayer) -> Result<EncodedOverlay> {
    let (width, height) = (layer.width() as i64, layer.height() as i64);
    let pixel_count = layer.width() as usize * layer.height() as usize;

    let mut rgb = Vec::with_capacity(pixel_count * 3);
    let mut alpha = Vec::with_capacity(pixel_count);
    for pixel in layer.image().pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }

    let mut mask = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8i64,
        },
        alpha,
    );
    let mut image = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8i64,
        },
        rgb,
    );

    let page = layer.page_number();
    mask.compress().map_err(|err| compress_failure(page, err))?;
    image.compress().map_err(|err| compress_failure(page, err))?;
    Ok(EncodedOverlay { image, mask })
}

fn compress_failure(page: u32, err: lopdf::Error) -> StempelError {
    StempelError::CompositeFailure {
        page,
        reason: format!("overlay compression failed: {}", err),
    }
}

/// Register `overlay` on `page` and draw it over the existing content.
///
/// Only new objects are added and only the page dictionary's `/Resources`
/// and `/Contents` entries are replaced. Shared resource dictionaries are
/// copied onto the page rather than edited.
pub(crate) fn embed_overlay(
    document: &mut Document,
    page: &PageGeometry,
    overlay: EncodedOverlay,
) -> Result<()> {
    let media_box = page.media_box.ok_or_else(|| StempelError::CompositeFailure {
        page: page.number,
        reason: "page has no media box".into(),
    })?;

    let mut resources = page_resources(document, page);
    let mut xobjects = match resources.get(b"XObject") {
        Ok(object) => resolve(document, object)
            .as_dict()
            .cloned()
            .unwrap_or_else(|_| Dictionary::new()),
        Err(_) => Dictionary::new(),
    };
    let contents = page_contents(document, page)?;

    let mask_id = document.add_object(overlay.mask);
    let mut image = overlay.image;
    image.dict.set("SMask", mask_id);
    let image_id = document.add_object(image);

    let name = unused_name(&xobjects);
    xobjects.set(name.as_str(), image_id);
    resources.set("XObject", xobjects);

    let matrix = placement_matrix(page.rotation, media_box)
        .iter()
        .map(|value| format_number(*value))
        .collect::<Vec<_>>()
        .join(" ");
    let open_id = document.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let draw = format!("Q\nq {} cm /{} Do Q\n", matrix, name);
    let draw_id = document.add_object(Stream::new(Dictionary::new(), draw.into_bytes()));

    let mut new_contents: Vec<Object> = Vec::with_capacity(contents.len() + 2);
    new_contents.push(open_id.into());
    new_contents.extend(contents);
    new_contents.push(draw_id.into());

    let page_dict = document.get_dictionary_mut(page.id).map_err(|err| {
        StempelError::CompositeFailure {
            page: page.number,
            reason: format!("page dictionary not writable: {}", err),
        }
    })?;
    page_dict.set("Resources", resources);
    page_dict.set("Contents", new_contents);
    Ok(())
}

/// A private copy of the page's effective resources.
fn page_resources(document: &Document, page: &PageGeometry) -> Dictionary {
    inherited(document, page.id, b"Resources")
        .and_then(|object| object.as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new)
}

/// The page's content stream references, flattened into one list.
fn page_contents(document: &mut Document, page: &PageGeometry) -> Result<Vec<Object>> {
    let contents = document
        .get_dictionary(page.id)
        .ok()
        .and_then(|dict| dict.get(b"Contents").ok())
        .cloned();

    let list = match contents {
        None => Vec::new(),
        Some(Object::Reference(id)) => match document.get_object(id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(id)],
        },
        Some(Object::Array(items)) => items,
        // Direct streams are not valid here; promote to an indirect object.
        Some(Object::Stream(stream)) => vec![document.add_object(stream).into()],
        Some(other) => {
            return Err(StempelError::CompositeFailure {
                page: page.number,
                reason: format!("unexpected /Contents of type {}", other.enum_variant()),
            });
        }
    };
    Ok(list)
}

fn unused_name(xobjects: &Dictionary) -> String {
    (0u32..)
        .map(|n| format!("{}{}", XOBJECT_PREFIX, n))
        .find(|name| !xobjects.has(name.as_bytes()))
        .unwrap_or_else(|| XOBJECT_PREFIX.to_string())
}

/// Matrix mapping the unit image square onto the displayed page.
///
/// The viewer turns the page clockwise by `/Rotate`, so the image is turned
/// the other way in user space to come out upright.
pub(crate) fn placement_matrix(rotation: u16, media_box: [f32; 4]) -> [f32; 6] {
    let [llx, lly, urx, ury] = media_box;
    let (w, h) = (urx - llx, ury - lly);
    match rotation {
        90 => [0.0, h, -w, 0.0, llx + w, lly],
        180 => [-w, 0.0, 0.0, -h, llx + w, lly + h],
        270 => [0.0, -h, w, 0.0, llx, lly + h],
        _ => [w, 0.0, 0.0, h, llx, lly],
    }
}

/// Content-stream number: fixed point, trailing zeros trimmed.
fn format_number(value: f32) -> String {
    let value = if value == 0.0 { 0.0 } else { value };
    let text = format!("{:.4}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text.is_empty() || text == "-" {
        "0".into()
    } else {
        text.to_string()
    }
}
