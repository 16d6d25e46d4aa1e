use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("failed to read image header: {0}")]
    Header(#[from] std::io::Error),
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),
    #[error("missing base64 payload after data url prefix")]
    MissingPayload,
    #[error("invalid base64 data: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("failed to encode annotated image: {0}")]
    ImageEncode(image::ImageError),
}

/// Decodes an encoded image buffer (JPEG, PNG, ...) into pixels.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, CodecError> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    Ok(reader.decode()?)
}

/// Strips a `data:<mime>;base64,` prefix and decodes the payload.
///
/// Anything before the first comma is treated as the scheme header, matching
/// what browser `canvas.toDataURL()` output looks like.
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>, CodecError> {
    let (_, payload) = data_url.split_once(',').ok_or(CodecError::MissingPayload)?;
    Ok(BASE64.decode(payload)?)
}

/// Re-encodes pixels as a JPEG data URL for the response envelope.
pub fn encode_jpeg_data_url(image: &DynamicImage) -> Result<String, CodecError> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .map_err(CodecError::ImageEncode)?;
    Ok(format!("data:image/jpeg;base64,{}", BASE64.encode(&buf)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(width, height, Rgb([0, 128, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_decode_image_roundtrip() {
        let decoded = decode_image(&png_bytes(32, 16)).unwrap();
        assert_eq!(decoded.width(), 32);
        assert_eq!(decoded.height(), 16);
    }

    #[test]
    fn test_decode_image_rejects_garbage() {
        assert!(decode_image(b"definitely not an image").is_err());
    }

    #[test]
    fn test_decode_data_url_strips_prefix() {
        let bytes = png_bytes(8, 8);
        let data_url = format!("data:image/png;base64,{}", BASE64.encode(&bytes));
        assert_eq!(decode_data_url(&data_url).unwrap(), bytes);
    }

    #[test]
    fn test_decode_data_url_requires_comma() {
        assert!(matches!(
            decode_data_url("aGVsbG8="),
            Err(CodecError::MissingPayload)
        ));
    }

    #[test]
    fn test_decode_data_url_rejects_invalid_base64() {
        assert!(matches!(
            decode_data_url("data:image/jpeg;base64,@@@not-base64@@@"),
            Err(CodecError::Base64(_))
        ));
    }

    #[test]
    fn test_encode_jpeg_data_url_is_decodable() {
        let image = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(24, 24, Rgb([10, 20, 30])));
        let data_url = encode_jpeg_data_url(&image).unwrap();
        assert!(data_url.starts_with("data:image/jpeg;base64,"));

        let bytes = decode_data_url(&data_url).unwrap();
        let reencoded = decode_image(&bytes).unwrap();
        assert_eq!(reencoded.width(), 24);
        assert_eq!(reencoded.height(), 24);
    }
}
