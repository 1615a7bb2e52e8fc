//! Loading a photo file into a `data:` URI.

use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::record::DataUri;

/// MIME type for an image file extension.
#[must_use]
pub fn mime_for_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        "ico" => "image/x-icon",
        _ => return None,
    };
    Some(mime)
}

/// MIME type recognized from the leading bytes of an image.
#[must_use]
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else if bytes.starts_with(b"BM") {
        Some("image/bmp")
    } else {
        None
    }
}

/// Read an image file and encode it as a base64 `data:` URI.
///
/// The MIME type comes from the file contents when recognizable, otherwise
/// from the extension.
///
/// # Errors
///
/// Returns [`Error::UnsupportedPhoto`] for files that are empty or not
/// images, and an I/O error if the file cannot be read.
pub async fn load_photo(path: impl AsRef<Path>) -> Result<DataUri> {
    let path = path.as_ref();
    let unsupported = |reason: &str| Error::UnsupportedPhoto {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let by_extension = mime_for_extension(path);
    let bytes = tokio::fs::read(path).await?;
    if bytes.is_empty() {
        return Err(unsupported("file is empty"));
    }

    let mime = sniff_mime(&bytes)
        .or(by_extension)
        .ok_or_else(|| unsupported("not a recognized image type"))?;

    debug!(path = %path.display(), mime, bytes = bytes.len(), "Loaded photo");
    Ok(DataUri::from_bytes(mime, &bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "studentcard_photo_{}_{name}",
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_mime_for_extension() {
        assert_eq!(mime_for_extension(Path::new("a.PNG")), Some("image/png"));
        assert_eq!(mime_for_extension(Path::new("a.jpeg")), Some("image/jpeg"));
        assert_eq!(mime_for_extension(Path::new("a.txt")), None);
        assert_eq!(mime_for_extension(Path::new("noext")), None);
    }

    #[test]
    fn test_sniff_mime() {
        assert_eq!(sniff_mime(PNG_HEADER), Some("image/png"));
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(sniff_mime(b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(sniff_mime(b"hello"), None);
    }

    #[tokio::test]
    async fn test_load_png() {
        let path = temp_file("face.png", PNG_HEADER);
        let uri = load_photo(&path).await.unwrap();
        assert_eq!(uri.mime_type(), "image/png");
        assert!(uri.is_base64());
        assert_eq!(uri.decode_payload().unwrap(), PNG_HEADER);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_contents_win_over_extension() {
        let path = temp_file("mislabeled.jpg", PNG_HEADER);
        let uri = load_photo(&path).await.unwrap();
        assert_eq!(uri.mime_type(), "image/png");
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_rejects_non_image() {
        let path = temp_file("notes.txt", b"just text");
        let err = load_photo(&path).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedPhoto { .. }));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_rejects_empty_file() {
        let path = temp_file("empty.png", b"");
        let err = load_photo(&path).await.unwrap_err();
        assert!(err.to_string().contains("empty"));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = load_photo("/nonexistent/studentcard/face.png")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
