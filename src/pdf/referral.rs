//! "BILET DE TRIMITERE" — the specialist referral letter.
//!
//! Issued when the doctor approves a referral request. Carries the
//! practice header, the referral body, and a drawn circular stamp in
//! place of a scanned one.

use printpdf::*;

use super::{fold_diacritics, save_to_bytes, wrap_text, DocumentError};
use crate::config;
use crate::models::Request;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;

const STAMP_RADIUS_MM: f32 = 16.0;

pub(super) fn generate_referral_pdf(
    request: &Request,
    specialty: &str,
    issue_date: &str,
) -> Result<Vec<u8>, DocumentError> {
    let (doc, page1, layer1) = PdfDocument::new(
        "Bilet de trimitere",
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

    // Practice header
    for line in [
        format!("Unitatea sanitara: {}", config::PRACTICE_NAME),
        format!("Sediu: {}", config::PRACTICE_ADDRESS),
        format!(
            "Casa de Asigurari: {} / contract {}",
            config::PRACTICE_INSURANCE_HOUSE,
            config::PRACTICE_CONTRACT_NUMBER
        ),
    ] {
        layer.use_text(fold_diacritics(&line), 9.0, Mm(MARGIN_MM), y, &font);
        y -= Mm(6.0);
    }
    y -= Mm(12.0);

    layer.use_text("BILET DE TRIMITERE", 14.0, Mm(70.0), y, &bold);
    y -= Mm(14.0);

    layer.use_text(
        fold_diacritics(&format!("Catre: {specialty}")),
        11.0,
        Mm(MARGIN_MM),
        y,
        &bold,
    );
    y -= Mm(12.0);

    for line in wrap_text(&fold_diacritics(&referral_body(request, specialty)), 90) {
        layer.use_text(line, 10.0, Mm(MARGIN_MM), y, &font);
        y -= Mm(6.0);
    }
    y -= Mm(12.0);

    let doctor_line = match request.doctor_specialty.as_deref().filter(|s| !s.is_empty()) {
        Some(doctor_specialty) => {
            format!("Medic de familie: {} ({doctor_specialty})", request.doctor_name)
        }
        None => format!("Medic de familie: {}", request.doctor_name),
    };
    layer.use_text(fold_diacritics(&doctor_line), 10.0, Mm(MARGIN_MM), y, &font);
    y -= Mm(8.0);

    layer.use_text(
        format!("Data emiterii: {issue_date}"),
        10.0,
        Mm(MARGIN_MM),
        y,
        &font,
    );

    draw_stamp(&layer, &font, Mm(155.0), Mm(50.0));

    save_to_bytes(doc)
}

fn referral_body(request: &Request, specialty: &str) -> String {
    format!(
        "Va trimitem pacientul {}, C.N.P. {}, pentru consult de specialitate \
         {}. Pacientul este inscris pe lista medicului de familie semnatar si \
         se prezinta la recomandarea acestuia.",
        request.patient_name,
        request.patient_cnp.replace(' ', ""),
        specialty,
    )
}

/// Round practice stamp: circle outline with the practice name inside
/// and the signature caption underneath.
fn draw_stamp(layer: &PdfLayerReference, font: &IndirectFontRef, center_x: Mm, center_y: Mm) {
    let points = calculate_points_for_circle(Mm(STAMP_RADIUS_MM), center_x, center_y);
    let circle = Line {
        points,
        is_closed: true,
    };
    layer.set_outline_color(Color::Rgb(Rgb::new(0.1, 0.2, 0.6, None)));
    layer.set_outline_thickness(1.2);
    layer.add_line(circle);

    layer.use_text(
        "CABINET MEDICAL",
        7.0,
        center_x - Mm(11.0),
        center_y + Mm(3.0),
        font,
    );
    layer.use_text(
        fold_diacritics(config::PRACTICE_CUI),
        7.0,
        center_x - Mm(9.0),
        center_y - Mm(2.0),
        font,
    );
    layer.use_text(
        "Semnatura si parafa",
        8.0,
        center_x - Mm(13.0),
        center_y - Mm(STAMP_RADIUS_MM) - Mm(6.0),
        font,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RequestType;
    use crate::pdf::tests::sample_request;

    #[test]
    fn body_names_patient_and_specialty() {
        let request = sample_request(RequestType::Trimitere);
        let body = referral_body(&request, "Cardiologie");
        assert!(body.contains("GEORGESCU ANDREI"));
        assert!(body.contains("C.N.P. 1901213254491"));
        assert!(body.contains("Cardiologie"));
    }

    #[test]
    fn referral_without_doctor_specialty_still_renders() {
        let mut request = sample_request(RequestType::Trimitere);
        request.doctor_specialty = None;
        let bytes = generate_referral_pdf(&request, "Dermatologie", "15.03.2024").unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
