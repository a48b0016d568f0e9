//! Encoding the flattened image

use crate::uploads::UploadedFile;
use base64::Engine;
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;

/// Prefix marking an attachment as redacted
pub const REDACTED_PREFIX: &str = "redacted_";

/// The flattened image, ready to replace the original attachment
#[derive(Debug, Clone)]
pub struct RedactedArtifact {
    pub name: String,
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
    pub data_url: String,
}

impl RedactedArtifact {
    pub(crate) fn encode(
        image: &RgbaImage,
        format: ImageFormat,
        original_name: &str,
    ) -> Result<Self, image::ImageError> {
        let (bytes, format) = encode_image(image, format)?;
        let mime = format.to_mime_type();
        let data_url = format!(
            "data:{};base64,{}",
            mime,
            base64::engine::general_purpose::STANDARD.encode(&bytes)
        );
        Ok(Self {
            name: format!("{}{}", REDACTED_PREFIX, original_name),
            format,
            bytes,
            data_url,
        })
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    pub fn into_upload(self) -> UploadedFile {
        UploadedFile {
            mime_type: self.mime_type().to_string(),
            name: self.name,
            bytes: self.bytes,
        }
    }
}

/// Encode in the source format; JPEG drops the alpha channel, anything the
/// crate cannot write falls back to PNG
fn encode_image(
    image: &RgbaImage,
    format: ImageFormat,
) -> Result<(Vec<u8>, ImageFormat), image::ImageError> {
    let mut bytes = Vec::new();
    let format = match format {
        ImageFormat::Jpeg => {
            DynamicImage::ImageRgba8(image.clone())
                .to_rgb8()
                .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)?;
            ImageFormat::Jpeg
        }
        _ => {
            image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
            ImageFormat::Png
        }
    };
    Ok((bytes, format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_png_artifact() {
        let img = RgbaImage::from_pixel(3, 3, Rgba([1, 2, 3, 255]));
        let artifact = RedactedArtifact::encode(&img, ImageFormat::Png, "lease.png").unwrap();
        assert_eq!(artifact.name, "redacted_lease.png");
        assert!(artifact.data_url.starts_with("data:image/png;base64,"));

        let decoded = image::load_from_memory(&artifact.bytes).unwrap().to_rgba8();
        assert_eq!(decoded, img);
    }

    #[test]
    fn test_jpeg_stays_jpeg() {
        let img = RgbaImage::from_pixel(8, 8, Rgba([200, 10, 10, 255]));
        let artifact = RedactedArtifact::encode(&img, ImageFormat::Jpeg, "id.jpg").unwrap();
        assert_eq!(artifact.format, ImageFormat::Jpeg);
        assert_eq!(image::guess_format(&artifact.bytes).unwrap(), ImageFormat::Jpeg);

        let upload = artifact.into_upload();
        assert_eq!(upload.mime_type, "image/jpeg");
        assert_eq!(upload.name, "redacted_id.jpg");
    }
}
