//! "CERERE DE TRANSFER" — the enrollment-by-transfer form.
//!
//! Rendered at approval time with the administrative header filled in
//! and the patient's signature image embedded bottom-right. The layout
//! matches the paper form the portal simulates.

use std::io::Cursor;

use printpdf::image_crate;
use printpdf::*;

use super::{decode_data_url, fold_diacritics, save_to_bytes, wrap_text, DocumentError, RegistrationFields};
use crate::models::Request;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;

/// Printed signature box, matching the form's allotted space.
const SIGNATURE_WIDTH_MM: f32 = 80.0;
const SIGNATURE_HEIGHT_MM: f32 = 30.0;

pub(super) fn generate_enrollment_pdf(
    request: &Request,
    signature_data_url: &str,
    registration: &RegistrationFields,
) -> Result<Vec<u8>, DocumentError> {
    let signature = decode_signature(signature_data_url)?;

    let (doc, page1, layer1) = PdfDocument::new(
        "Cerere de transfer",
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );
    let layer = doc.get_page(page1).get_layer(layer1);
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| DocumentError::Render(format!("PDF font error: {e}")))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| DocumentError::Render(format!("PDF font error: {e}")))?;

    let mut y = Mm(277.0);

    // Title
    layer.use_text("CERERE DE TRANSFER", 14.0, Mm(MARGIN_MM), y, &bold);
    y -= Mm(12.0);

    // Registration line, filled in by the practice at approval
    layer.use_text(
        format!(
            "Nr. inregistrare VIZAT*), {} / {}",
            registration.registration_number, registration.registration_date
        ),
        10.0,
        Mm(MARGIN_MM),
        y,
        &font,
    );
    y -= Mm(10.0);

    // Practice fields print as bare labels on a draft and get their
    // values at approval time.
    for line in [
        labeled("Unitatea sanitara", &registration.practice_name),
        labeled("CUI", &registration.practice_cui),
        labeled("Sediu (localitate, str., nr.)", &registration.practice_address),
        labeled("Casa de Asigurari", &registration.insurance_house),
        labeled("Nr. contract / conventie", &registration.contract_number),
    ] {
        layer.use_text(fold_diacritics(&line), 10.0, Mm(MARGIN_MM), y, &font);
        y -= Mm(8.0);
    }
    y -= Mm(8.0);

    layer.use_text(
        fold_diacritics(&format!("Medic de familie: {}", request.doctor_name)),
        11.0,
        Mm(MARGIN_MM),
        y,
        &font,
    );
    y -= Mm(14.0);

    layer.use_text("Domnule / Doamna Doctor,", 11.0, Mm(MARGIN_MM), y, &font);
    y -= Mm(12.0);

    // Declaration paragraph
    for line in wrap_text(&fold_diacritics(&declaration_text(request)), 90) {
        layer.use_text(line, 10.0, Mm(MARGIN_MM), y, &font);
        y -= Mm(6.0);
    }
    y -= Mm(8.0);

    for line in wrap_text(
        "Declar pe propria raspundere ca nu solicit transferul mai devreme de \
         6 luni calendaristice de la ultima inscriere.",
        90,
    ) {
        layer.use_text(line, 10.0, Mm(MARGIN_MM), y, &font);
        y -= Mm(6.0);
    }
    y -= Mm(18.0);

    // Date on the left, signature image on the right, sharing a baseline
    layer.use_text(
        format!("Data: {}", registration.registration_date),
        10.0,
        Mm(MARGIN_MM),
        y,
        &font,
    );

    let signature_x = Mm(PAGE_WIDTH_MM - MARGIN_MM - SIGNATURE_WIDTH_MM - 10.0);
    place_signature(&layer, signature, signature_x, y - Mm(4.0))?;

    save_to_bytes(doc)
}

fn labeled(label: &str, value: &str) -> String {
    if value.is_empty() {
        label.to_string()
    } else {
        format!("{label}: {value}")
    }
}

fn declaration_text(request: &Request) -> String {
    let address = &request.address;
    let mut parts: Vec<String> = vec![address.street.clone()];
    if let Some(nr) = address.number.as_deref().filter(|s| !s.is_empty()) {
        parts.push(format!("nr.{nr}"));
    }
    if let Some(bl) = address.block.as_deref().filter(|s| !s.is_empty()) {
        parts.push(format!("bl.{bl}"));
    }
    if let Some(sc) = address.entrance.as_deref().filter(|s| !s.is_empty()) {
        parts.push(format!("sc.{sc}"));
    }
    if let Some(ap) = address.apartment.as_deref().filter(|s| !s.is_empty()) {
        parts.push(format!("ap.{ap}"));
    }

    let id = &request.identity_document;
    format!(
        "Subsemnatul (a) {}, cetatenie {}, C.N.P. {}, data nasterii {}, \
         domiciliat(a) in {}, jud./sector {}, act de identitate {}, seria {}, \
         nr {}, eliberat de {}, la data {}, solicit inscrierea mea pe lista \
         dumneavoastra prin transfer.",
        request.patient_name,
        request.patient_citizenship,
        request.patient_cnp.replace(' ', ""),
        request.patient_birth_date,
        parts.join(", "),
        address.sector,
        id.doc_type,
        id.series,
        id.number,
        id.issued_by,
        id.issue_date,
    )
}

/// Decode the signature-pad data URL into an opaque RGB PNG.
///
/// Signature pads emit RGBA PNGs with a transparent background; the
/// alpha channel is composited over white before embedding because the
/// page behind the image is white anyway.
fn decode_signature(data_url: &str) -> Result<Vec<u8>, DocumentError> {
    let (_mime, bytes) = decode_data_url(data_url)?;

    let decoded = image_crate::load_from_memory(&bytes)
        .map_err(|e| DocumentError::Signature(format!("cannot decode signature image: {e}")))?;

    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut rgb = image_crate::RgbImage::new(width, height);
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as u16;
        let over = |c: u8| ((c as u16 * alpha + 255 * (255 - alpha)) / 255) as u8;
        rgb.put_pixel(x, y, image_crate::Rgb([over(r), over(g), over(b)]));
    }

    let mut png = Vec::new();
    image_crate::ImageEncoder::write_image(
        image_crate::codecs::png::PngEncoder::new(&mut png),
        rgb.as_raw(),
        width,
        height,
        image_crate::ColorType::Rgb8,
    )
    .map_err(|e| DocumentError::Signature(format!("cannot re-encode signature: {e}")))?;
    Ok(png)
}

/// Embed the signature PNG scaled into the fixed signature box.
fn place_signature(
    layer: &PdfLayerReference,
    png_bytes: Vec<u8>,
    x: Mm,
    bottom_y: Mm,
) -> Result<(), DocumentError> {
    let decoder = image_crate::codecs::png::PngDecoder::new(Cursor::new(png_bytes))
        .map_err(|e| DocumentError::Signature(format!("cannot read signature PNG: {e}")))?;
    let img = Image::try_from(decoder)
        .map_err(|e| DocumentError::Signature(format!("cannot embed signature: {e}")))?;

    // At the default 300 dpi one pixel is 25.4/300 mm; scale the image
    // so it fills the signature box exactly.
    let dpi = 300.0f32;
    let native_w_mm = img.image.width.0 as f32 * 25.4 / dpi;
    let native_h_mm = img.image.height.0 as f32 * 25.4 / dpi;

    img.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(x),
            translate_y: Some(bottom_y),
            scale_x: Some(SIGNATURE_WIDTH_MM / native_w_mm),
            scale_y: Some(SIGNATURE_HEIGHT_MM / native_h_mm),
            ..Default::default()
        },
    );
    Ok(())
}
