// src/services/barcode_service.rs

use barcoders::{
    generators::svg::SVG,
    sym::{code128::Code128, ean13::EAN13},
};
use qrcode::{render::svg, QrCode};

use crate::common::error::AppError;

// GS1 reserves the "2" prefix for in-store numbering.
const INTERNAL_PREFIX: char = '2';
const SVG_HEIGHT: u32 = 80;

/// Check digit for the first 12 digits of an EAN-13.
pub fn ean13_check_digit(first12: &str) -> Option<u8> {
    if first12.len() != 12 || !first12.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let sum: u32 = first12
        .bytes()
        .enumerate()
        .map(|(i, b)| {
            let d = (b - b'0') as u32;
            if i % 2 == 0 { d } else { d * 3 }
        })
        .sum();
    Some(((10 - sum % 10) % 10) as u8)
}

pub fn is_valid_ean13(code: &str) -> bool {
    if code.len() != 13 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    match (ean13_check_digit(&code[..12]), code.as_bytes()[12]) {
        (Some(expected), last) if last.is_ascii_digit() => expected == last - b'0',
        _ => false,
    }
}

/// In-store EAN-13 for a sequence number: "2" + 11 digits + check digit.
pub fn generate_internal_ean13(seq: i64) -> Result<String, AppError> {
    if !(0..100_000_000_000).contains(&seq) {
        return Err(AppError::Conflict("Internal barcode range exhausted".into()));
    }
    let body = format!("{INTERNAL_PREFIX}{seq:011}");
    let check = ean13_check_digit(&body)
        .ok_or_else(|| AppError::InternalServerError(anyhow::anyhow!("bad barcode body {body}")))?;
    Ok(format!("{body}{check}"))
}

/// EAN-13 symbol for valid EAN-13 codes, Code128 (set B) for anything else.
pub fn barcode_svg(code: &str) -> Result<String, AppError> {
    if !code.is_ascii() {
        return Err(AppError::BadRequest("Barcode must be printable ASCII".into()));
    }
    let encoded = if is_valid_ean13(code) {
        EAN13::new(&code[..12])
            .map_err(|e| AppError::BadRequest(format!("Cannot encode barcode: {e}")))?
            .encode()
    } else {
        // 'Ɓ' selects character set B in barcoders.
        Code128::new(format!("\u{0181}{code}"))
            .map_err(|e| AppError::BadRequest(format!("Cannot encode barcode: {e}")))?
            .encode()
    };

    SVG::new(SVG_HEIGHT)
        .generate(&encoded[..])
        .map_err(|e| AppError::DocumentError(e.to_string()))
}

pub fn qr_svg(payload: &str) -> Result<String, AppError> {
    let code = QrCode::new(payload.as_bytes())
        .map_err(|e| AppError::BadRequest(format!("Cannot encode QR code: {e}")))?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(200, 200)
        .quiet_zone(true)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_digit_matches_known_codes() {
        // 4006381333931 is a published EAN-13 sample.
        assert_eq!(ean13_check_digit("400638133393"), Some(1));
        assert_eq!(ean13_check_digit("590123412345"), Some(7));
        assert_eq!(ean13_check_digit("12345"), None);
        assert_eq!(ean13_check_digit("40063813339a"), None);
    }

    #[test]
    fn validates_ean13() {
        assert!(is_valid_ean13("4006381333931"));
        assert!(is_valid_ean13("5901234123457"));
        assert!(!is_valid_ean13("4006381333932"));
        assert!(!is_valid_ean13("SKU-001"));
        assert!(!is_valid_ean13("400638133393x"));
    }

    #[test]
    fn multibyte_codes_are_rejected_without_panicking() {
        // 13 bytes, 7 chars.
        let code = "a\u{e9}\u{e9}\u{e9}\u{e9}\u{e9}\u{e9}";
        assert_eq!(code.len(), 13);
        assert!(!is_valid_ean13(code));
        assert!(matches!(barcode_svg(code), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn internal_codes_are_valid_and_prefixed() {
        let code = generate_internal_ean13(42).unwrap();
        assert_eq!(code.len(), 13);
        assert!(code.starts_with("200000000042"));
        assert!(is_valid_ean13(&code));
        assert!(generate_internal_ean13(100_000_000_000).is_err());
    }

    #[test]
    fn renders_svg_for_both_symbologies() {
        let ean = barcode_svg("4006381333931").unwrap();
        assert!(ean.contains("<svg"));
        let code128 = barcode_svg("SHIRT-XL-01").unwrap();
        assert!(code128.contains("<svg"));
    }

    #[test]
    fn renders_qr_svg() {
        let svg = qr_svg(r#"{"sku":"SH-01"}"#).unwrap();
        assert!(svg.contains("<svg"));
    }
}
