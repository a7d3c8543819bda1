use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};

use crate::error::GatewayError;
use crate::models::EncodedImage;

const DEFAULT_MIME_TYPE: &str = "image/jpeg";

// Browsers and mobile clients do not always pad their payloads
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Drops a `data:<mime>;base64,` style prefix: everything up to and including
/// the first comma.
pub fn strip_data_url_prefix(image: &str) -> &str {
    match image.split_once(',') {
        Some((_, payload)) => payload.trim(),
        None => image.trim(),
    }
}

/// MIME type declared in a data-URL prefix, if any.
fn declared_mime_type(image: &str) -> Option<&str> {
    let (prefix, _) = image.split_once(',')?;
    let mime = prefix.trim().strip_prefix("data:")?.split(';').next()?.trim();
    mime.starts_with("image/").then_some(mime)
}

fn sniff_mime_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

/// Normalizes the caller's `image` field into raw bytes.
pub fn decode_image(image: &str) -> Result<EncodedImage, GatewayError> {
    let payload: String = strip_data_url_prefix(image)
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    if payload.is_empty() {
        return Err(GatewayError::invalid("No image data provided"));
    }

    let bytes = LENIENT.decode(payload.as_bytes()).map_err(|e| {
        log::debug!("Rejecting image payload: {}", e);
        GatewayError::invalid("Invalid base64 image data")
    })?;

    let mime_type = sniff_mime_type(&bytes)
        .or_else(|| declared_mime_type(image))
        .unwrap_or(DEFAULT_MIME_TYPE)
        .to_string();

    log::debug!("Decoded image: {} bytes ({})", bytes.len(), mime_type);

    Ok(EncodedImage { bytes, mime_type })
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose;

    const JPEG_HEADER: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

    #[test]
    fn test_prefix_stripping_is_idempotent() {
        let encoded = general_purpose::STANDARD.encode(JPEG_HEADER);
        let with_prefix = format!("data:image/jpeg;base64,{}", encoded);

        let bare = decode_image(&encoded).unwrap();
        let prefixed = decode_image(&with_prefix).unwrap();

        assert_eq!(bare.bytes, JPEG_HEADER);
        assert_eq!(bare, prefixed);
        assert_eq!(strip_data_url_prefix(&with_prefix), encoded);
        assert_eq!(strip_data_url_prefix(&encoded), encoded);
    }

    #[test]
    fn test_mime_type_detection() {
        let png = general_purpose::STANDARD.encode(b"\x89PNG\r\n\x1a\nrest");
        assert_eq!(decode_image(&png).unwrap().mime_type, "image/png");

        // Unknown bytes: trust the declared type, else assume JPEG
        let unknown = general_purpose::STANDARD.encode(b"not really an image");
        let declared = format!("data:image/webp;base64,{}", unknown);
        assert_eq!(decode_image(&declared).unwrap().mime_type, "image/webp");
        assert_eq!(decode_image(&unknown).unwrap().mime_type, "image/jpeg");

        let not_image = format!("data:text/plain;base64,{}", unknown);
        assert_eq!(decode_image(&not_image).unwrap().mime_type, "image/jpeg");
    }

    #[test]
    fn test_lenient_padding_and_whitespace() {
        let encoded = general_purpose::STANDARD.encode(b"food!");
        let unpadded = encoded.trim_end_matches('=');
        let wrapped = format!("{}\n{}", &encoded[..4], &encoded[4..]);

        assert_eq!(decode_image(unpadded).unwrap().bytes, b"food!");
        assert_eq!(decode_image(&wrapped).unwrap().bytes, b"food!");
    }

    #[test]
    fn test_invalid_base64_is_input_error() {
        let err = decode_image("data:image/jpeg;base64,@@not-base64@@").unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(_)));
        assert_eq!(err.to_string(), "Invalid base64 image data");
    }

    #[test]
    fn test_empty_payload() {
        let err = decode_image("data:image/jpeg;base64,").unwrap_err();
        assert_eq!(err.to_string(), "No image data provided");
    }
}
