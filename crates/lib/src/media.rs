//! Media resolver: fetch an inbound attachment, persist it to a transient
//! local path, and classify it as audio/image/unsupported.

use std::path::PathBuf;

/// Best-effort classification of an attachment from its declared content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Image,
    Unsupported,
}

impl MediaKind {
    /// Classify a declared content type by substring (e.g. "audio/ogg" => Audio).
    pub fn from_content_type(content_type: &str) -> Self {
        let ct = content_type.to_ascii_lowercase();
        if ct.contains("audio") {
            Self::Audio
        } else if ct.contains("image") {
            Self::Image
        } else {
            Self::Unsupported
        }
    }
}

/// A fetched attachment: local file path plus classification.
#[derive(Debug, Clone)]
pub struct ResolvedMedia {
    pub path: PathBuf,
    pub kind: MediaKind,
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("media credentials not configured")]
    MissingCredentials,
    #[error("media fetch failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("media fetch failed: {0}")]
    Status(String),
    #[error("media write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Fetches attachments from the gateway's media host with basic auth and
/// stores them under the download directory with collision-free names.
#[derive(Clone)]
pub struct MediaStore {
    account_sid: Option<String>,
    auth_token: Option<String>,
    download_dir: PathBuf,
    client: reqwest::Client,
}

impl MediaStore {
    pub fn new(
        account_sid: Option<String>,
        auth_token: Option<String>,
        download_dir: PathBuf,
    ) -> Self {
        Self {
            account_sid,
            auth_token,
            download_dir,
            client: reqwest::Client::new(),
        }
    }

    /// Single authenticated GET of the attachment URL. Writes the body to
    /// `media-<uuid>.<ext>` in the download dir; the extension comes from the
    /// response Content-Type header. Repeated URLs never overwrite each other.
    pub async fn fetch(
        &self,
        url: &str,
        declared_content_type: &str,
    ) -> Result<ResolvedMedia, MediaError> {
        let sid = self
            .account_sid
            .as_ref()
            .ok_or(MediaError::MissingCredentials)?;
        let token = self
            .auth_token
            .as_ref()
            .ok_or(MediaError::MissingCredentials)?;
        let res = self
            .client
            .get(url)
            .basic_auth(sid, Some(token))
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(MediaError::Status(format!("{} from {}", res.status(), url)));
        }
        let response_type = res
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let bytes = res.bytes().await?;
        let ext = extension_for(&response_type);
        let filename = format!("media-{}.{}", uuid::Uuid::new_v4(), ext);
        let path = self.download_dir.join(filename);
        tokio::fs::write(&path, &bytes).await?;
        log::debug!(
            "stored {} byte(s) of {} at {}",
            bytes.len(),
            response_type,
            path.display()
        );
        Ok(ResolvedMedia {
            path,
            kind: MediaKind::from_content_type(declared_content_type),
        })
    }
}

/// Map a MIME type to a filesystem extension; unknown types get "bin".
/// Any "; charset=..." suffix is ignored.
pub fn extension_for(content_type: &str) -> &'static str {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    match mime.as_str() {
        "audio/ogg" => "ogg",
        "audio/mpeg" => "mp3",
        "audio/wav" | "audio/x-wav" => "wav",
        "audio/amr" => "amr",
        "audio/mp4" => "m4a",
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "bin",
    }
}
