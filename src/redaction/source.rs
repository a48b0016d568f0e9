//! Loading the image to redact

use super::error::LoadError;
use crate::uploads::UploadedFile;
use base64::Engine;
use image::{ImageFormat, RgbaImage};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Origins an image may be loaded from, tried in field order
#[derive(Debug, Clone, Default)]
pub struct ImageSources {
    /// `data:` URL with base64 payload
    pub inline: Option<String>,
    /// Remote preview URL
    pub remote: Option<String>,
    pub local: Option<PathBuf>,
    /// File name to use for the artifact; derived from the origin if unset
    pub name: Option<String>,
}

impl ImageSources {
    /// Sort free-form locations into origins by their shape
    pub fn from_locations<I, S>(locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut sources = Self::default();
        for location in locations {
            let location = location.as_ref();
            if location.starts_with("data:") {
                sources.inline.get_or_insert_with(|| location.to_string());
            } else if location.starts_with("http://") || location.starts_with("https://") {
                sources.remote.get_or_insert_with(|| location.to_string());
            } else {
                sources.local.get_or_insert_with(|| PathBuf::from(location));
            }
        }
        sources
    }

    fn is_empty(&self) -> bool {
        self.inline.is_none() && self.remote.is_none() && self.local.is_none()
    }
}

/// A decoded source image and its encoded format
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub image: RgbaImage,
    pub format: ImageFormat,
    pub name: String,
    /// Encoded bytes as loaded
    pub bytes: Vec<u8>,
}

impl SourceImage {
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// The unredacted attachment
    pub fn to_upload(&self) -> UploadedFile {
        UploadedFile {
            name: self.name.clone(),
            mime_type: self.format.to_mime_type().to_string(),
            bytes: self.bytes.clone(),
        }
    }
}

/// Load the image from the first origin that yields a decodable image
pub async fn load(sources: &ImageSources, client: &reqwest::Client) -> Result<SourceImage, LoadError> {
    if sources.is_empty() {
        return Err(LoadError::NoSource);
    }
    let mut attempts = Vec::new();

    if let Some(url) = &sources.inline {
        match decode_data_url(url).and_then(decode) {
            Ok(decoded) => {
                return Ok(finish(sources, decoded, || None));
            }
            Err(e) => {
                warn!(error = %e, "Inline image unusable");
                attempts.push(format!("inline: {}", e));
            }
        }
    }

    if let Some(url) = &sources.remote {
        match fetch(client, url).await.and_then(decode) {
            Ok(decoded) => {
                return Ok(finish(sources, decoded, || name_from_url(url)));
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Remote image unusable");
                attempts.push(format!("remote: {}", e));
            }
        }
    }

    if let Some(path) = &sources.local {
        match std::fs::read(path).map_err(|e| e.to_string()).and_then(decode) {
            Ok(decoded) => {
                return Ok(finish(sources, decoded, || file_name(path)));
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Local image unusable");
                attempts.push(format!("local: {}", e));
            }
        }
    }

    Err(LoadError::AllOriginsFailed { attempts })
}

struct Decoded {
    image: RgbaImage,
    format: ImageFormat,
    bytes: Vec<u8>,
}

fn finish(
    sources: &ImageSources,
    decoded: Decoded,
    origin_name: impl FnOnce() -> Option<String>,
) -> SourceImage {
    let Decoded {
        image,
        format,
        bytes,
    } = decoded;
    let name = sources
        .name
        .clone()
        .or_else(origin_name)
        .unwrap_or_else(|| default_name(format));
    info!(
        name = %name,
        width = image.width(),
        height = image.height(),
        "Loaded image for redaction"
    );
    SourceImage {
        image,
        format,
        name,
        bytes,
    }
}

/// Decode the payload of a base64 `data:` URL
pub(crate) fn decode_data_url(url: &str) -> Result<Vec<u8>, String> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| "not a data URL".to_string())?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| "data URL has no payload".to_string())?;
    if !header.ends_with(";base64") {
        return Err("data URL is not base64 encoded".to_string());
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| format!("invalid base64: {}", e))
}

fn decode(bytes: Vec<u8>) -> Result<Decoded, String> {
    let format = image::guess_format(&bytes).map_err(|e| e.to_string())?;
    let image = image::load_from_memory_with_format(&bytes, format).map_err(|e| e.to_string())?;
    Ok(Decoded {
        image: image.to_rgba8(),
        format,
        bytes,
    })
}

async fn fetch(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, String> {
    debug!(url = %url, "Fetching remote image");
    let response = client.get(url).send().await.map_err(|e| e.to_string())?;
    let status = response.status();
    if !status.is_success() {
        return Err(format!("HTTP {}", status.as_u16()));
    }
    let bytes = response.bytes().await.map_err(|e| e.to_string())?;
    Ok(bytes.to_vec())
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().to_string())
}

fn name_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.last()?;
    (!segment.is_empty()).then(|| segment.to_string())
}

fn default_name(format: ImageFormat) -> String {
    let ext = format.extensions_str().first().copied().unwrap_or("png");
    format!("image.{}", ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn data_url(bytes: &[u8]) -> String {
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes)
        )
    }

    #[test]
    fn test_from_locations_classifies() {
        let sources = ImageSources::from_locations([
            "https://example.com/docs/lease.png",
            "./scan.jpg",
            "data:image/png;base64,AAAA",
        ]);
        assert_eq!(sources.inline.as_deref(), Some("data:image/png;base64,AAAA"));
        assert_eq!(
            sources.remote.as_deref(),
            Some("https://example.com/docs/lease.png")
        );
        assert_eq!(sources.local, Some(PathBuf::from("./scan.jpg")));
    }

    #[test]
    fn test_decode_data_url() {
        assert_eq!(decode_data_url("data:text/plain;base64,aGk=").unwrap(), b"hi");
        assert!(decode_data_url("data:text/plain,hi").is_err());
        assert!(decode_data_url("https://x").is_err());
    }

    #[test]
    fn test_name_from_url() {
        assert_eq!(
            name_from_url("https://example.com/files/id-card.jpg?sig=1"),
            Some("id-card.jpg".to_string())
        );
        assert_eq!(name_from_url("https://example.com/"), None);
    }

    #[tokio::test]
    async fn test_load_inline() {
        let sources = ImageSources {
            inline: Some(data_url(&png_bytes())),
            name: Some("evidence.png".into()),
            ..Default::default()
        };
        let source = load(&sources, &reqwest::Client::new()).await.unwrap();
        assert_eq!(source.dimensions(), (4, 3));
        assert_eq!(source.format, ImageFormat::Png);
        assert_eq!(source.name, "evidence.png");

        let upload = source.to_upload();
        assert_eq!(upload.mime_type, "image/png");
        assert_eq!(upload.bytes, png_bytes());
    }

    #[tokio::test]
    async fn test_falls_back_to_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        std::fs::write(&path, png_bytes()).unwrap();

        let sources = ImageSources {
            inline: Some("data:image/png;base64,!!!".into()),
            local: Some(path),
            ..Default::default()
        };
        let source = load(&sources, &reqwest::Client::new()).await.unwrap();
        assert_eq!(source.name, "scan.png");
    }

    #[tokio::test]
    async fn test_all_origins_failed() {
        let dir = tempfile::tempdir().unwrap();
        let sources = ImageSources {
            inline: Some(data_url(b"not an image")),
            local: Some(dir.path().join("missing.png")),
            ..Default::default()
        };
        match load(&sources, &reqwest::Client::new()).await {
            Err(LoadError::AllOriginsFailed { attempts }) => assert_eq!(attempts.len(), 2),
            other => panic!("unexpected result: {:?}", other.map(|s| s.name)),
        }
    }

    #[tokio::test]
    async fn test_no_source() {
        let result = load(&ImageSources::default(), &reqwest::Client::new()).await;
        assert!(matches!(result, Err(LoadError::NoSource)));
    }
}
