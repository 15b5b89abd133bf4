//! Inline video attachment shared by every request of one run.

use std::{path::Path, sync::Arc};

use base64::{Engine, engine::general_purpose::STANDARD};
use tokio::fs;

use crate::error::{DashguardError, Result};

/// A video encoded once as a `data:` URL.
///
/// Cloning is cheap; all clones point at the same encoded string. A payload
/// belongs to one run and is dropped with it.
#[derive(Clone, Debug)]
pub struct VideoPayload {
    data_url: Arc<str>,
    mime: &'static str,
    byte_len: usize,
}

impl VideoPayload {
    pub fn encode(bytes: &[u8], mime: &'static str) -> Self {
        let mut data_url = String::with_capacity(bytes.len() * 4 / 3 + mime.len() + 16);
        data_url.push_str("data:");
        data_url.push_str(mime);
        data_url.push_str(";base64,");
        STANDARD.encode_string(bytes, &mut data_url);

        Self {
            data_url: Arc::from(data_url),
            mime,
            byte_len: bytes.len(),
        }
    }

    pub async fn from_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .await
            .map_err(|source| DashguardError::VideoRead {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::encode(&bytes, mime_from_path(path)))
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    pub fn mime(&self) -> &'static str {
        self.mime
    }

    /// Size of the raw video before encoding.
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    pub fn shares_encoding_with(&self, other: &VideoPayload) -> bool {
        Arc::ptr_eq(&self.data_url, &other.data_url)
    }
}

/// Guess the video MIME type from the file extension
pub fn mime_from_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        _ => "video/mp4",
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn encodes_as_data_url() {
        let payload = VideoPayload::encode(b"abc", "video/mp4");
        assert_eq!(payload.data_url(), "data:video/mp4;base64,YWJj");
        assert_eq!(payload.byte_len(), 3);
    }

    #[test]
    fn clones_share_one_encoding() {
        let payload = VideoPayload::encode(&[0u8; 64], "video/webm");
        let copy = payload.clone();
        assert!(copy.shares_encoding_with(&payload));

        let other = VideoPayload::encode(&[0u8; 64], "video/webm");
        assert!(!other.shares_encoding_with(&payload));
    }

    #[test]
    fn mime_follows_extension() {
        assert_eq!(mime_from_path(&PathBuf::from("clip.MOV")), "video/quicktime");
        assert_eq!(mime_from_path(&PathBuf::from("clip.webm")), "video/webm");
        assert_eq!(mime_from_path(&PathBuf::from("clip")), "video/mp4");
    }

    #[tokio::test]
    async fn missing_file_is_a_read_error() {
        let err = VideoPayload::from_file(Path::new("/nonexistent/dashcam.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, DashguardError::VideoRead { .. }));
    }
}
