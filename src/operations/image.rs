//! Image decoding for `ValidImage`.

use std::sync::LazyLock;

use image::ImageFormat;
use regex::Regex;

use crate::error_handling::{ConfigError, ValidationFailure};

static MIN_SIZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+)\s*[xX]\s*(\d+)\s*$").expect("static regex is valid")
});

/// Formats `ValidImage` accepts in its `format` parameter.
const KNOWN_FORMATS: &[&str] = &["JPEG", "PNG", "GIF", "WEBP", "ICO", "BMP"];

/// Size and format requirements of `ValidImage`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageRule {
    /// Minimum `(width, height)`
    pub min_size: Option<(u32, u32)>,
    /// Expected format name, upper-case (`JPEG`, `PNG`...)
    pub format: Option<String>,
}

impl ImageRule {
    /// Parses a `WIDTHxHEIGHT` size such as `120x120`.
    pub fn parse_min_size(text: &str) -> Result<(u32, u32), ConfigError> {
        let invalid = || ConfigError::InvalidParameters {
            operation: "ValidImage".into(),
            message: format!("min_size must look like 100x100, got {text:?}"),
        };
        let caps = MIN_SIZE_RE.captures(text).ok_or_else(invalid)?;
        let width = caps[1].parse().map_err(|_| invalid())?;
        let height = caps[2].parse().map_err(|_| invalid())?;
        Ok((width, height))
    }

    pub fn parse_format(text: &str) -> Result<String, ConfigError> {
        let format = text.trim().to_ascii_uppercase();
        let format = if format == "JPG" { "JPEG".to_string() } else { format };
        if KNOWN_FORMATS.contains(&format.as_str()) {
            Ok(format)
        } else {
            Err(ConfigError::InvalidParameters {
                operation: "ValidImage".into(),
                message: format!(
                    "unknown image format {text:?}, expected one of {}",
                    KNOWN_FORMATS.join(", ")
                ),
            })
        }
    }

    /// Decodes `content` and checks it against the rule. The content type
    /// must be `image/*`.
    pub fn check(&self, content_type: &str, content: &[u8]) -> Result<(), ValidationFailure> {
        if !is_image_content_type(content_type) {
            return Err(ValidationFailure::new(format!(
                "Invalid content type: {content_type:?}"
            )));
        }

        let format = image::guess_format(content)
            .map_err(|e| ValidationFailure::new(format!("Unrecognized image data: {e}")))?;
        let decoded = image::load_from_memory_with_format(content, format)
            .map_err(|e| ValidationFailure::new(format!("Cannot decode image: {e}")))?;

        let name = format_name(format);
        if let Some(expected) = &self.format {
            if name != expected {
                return Err(ValidationFailure::new(format!(
                    "Invalid image format: {name}, expected {expected}"
                )));
            }
        }

        if let Some((min_width, min_height)) = self.min_size {
            let (width, height) = (decoded.width(), decoded.height());
            if width < min_width || height < min_height {
                return Err(ValidationFailure::new(format!(
                    "Image too small: {width}x{height}, expected at least {min_width}x{min_height}"
                )));
            }
        }

        Ok(())
    }
}

pub(crate) fn is_image_content_type(content_type: &str) -> bool {
    content_type
        .trim_start()
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
}

fn format_name(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "JPEG",
        ImageFormat::Png => "PNG",
        ImageFormat::Gif => "GIF",
        ImageFormat::WebP => "WEBP",
        ImageFormat::Ico => "ICO",
        ImageFormat::Bmp => "BMP",
        _ => "OTHER",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([20, 120, 200]));
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, format)
            .expect("encode test image");
        buf.into_inner()
    }

    #[test]
    fn test_parse_min_size() {
        assert_eq!(ImageRule::parse_min_size("120x80").unwrap(), (120, 80));
        assert_eq!(ImageRule::parse_min_size(" 16 X 16 ").unwrap(), (16, 16));
        assert!(ImageRule::parse_min_size("120").is_err());
        assert!(ImageRule::parse_min_size("ax10").is_err());
    }

    #[test]
    fn test_parse_format() {
        assert_eq!(ImageRule::parse_format("jpeg").unwrap(), "JPEG");
        assert_eq!(ImageRule::parse_format("jpg").unwrap(), "JPEG");
        assert_eq!(ImageRule::parse_format("Png").unwrap(), "PNG");
        assert!(ImageRule::parse_format("tiff").is_err());
    }

    #[test]
    fn test_size_and_format() {
        let jpeg = encode(120, 120, ImageFormat::Jpeg);
        let rule = ImageRule {
            min_size: Some((100, 100)),
            format: Some("JPEG".into()),
        };
        assert!(rule.check("image/jpeg", &jpeg).is_ok());

        let too_big = ImageRule {
            min_size: Some((200, 100)),
            format: None,
        };
        let failure = too_big.check("image/jpeg", &jpeg).unwrap_err();
        assert!(failure.message().contains("120x120"));

        let png_only = ImageRule {
            min_size: None,
            format: Some("PNG".into()),
        };
        assert!(png_only.check("image/jpeg", &jpeg).is_err());
    }

    #[test]
    fn test_content_type_and_garbage() {
        let png = encode(4, 4, ImageFormat::Png);
        let rule = ImageRule::default();
        assert!(rule.check("text/html", &png).is_err());
        assert!(rule.check("application/octet-stream", &png).is_err());
        assert!(rule.check("image/png", b"<html></html>").is_err());
    }
}
