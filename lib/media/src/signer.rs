//! Signing individual object paths.

use async_trait::async_trait;
use coachdesk_core::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::instrument;
use url::Url;

use crate::error::MediaError;

/// A validated object key inside the media bucket.
///
/// Keys are relative, slash-separated, and never contain empty, `.` or `..`
/// segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectPath(String);

impl ObjectPath {
    /// Validates `raw` as an object key.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::InvalidPath`] for empty, absolute or traversing
    /// paths.
    pub fn parse(raw: &str) -> std::result::Result<Self, MediaError> {
        let invalid = |reason| MediaError::InvalidPath {
            path: raw.to_string(),
            reason,
        };

        if raw.trim().is_empty() {
            return Err(invalid("empty path"));
        }
        if raw.starts_with('/') {
            return Err(invalid("absolute path"));
        }
        if raw.contains('\\') {
            return Err(invalid("backslash in path"));
        }
        for segment in raw.split('/') {
            match segment {
                "" => return Err(invalid("empty segment")),
                "." | ".." => return Err(invalid("relative segment")),
                _ => {}
            }
        }
        Ok(Self(raw.to_string()))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Produces time-limited signed URLs for single objects.
#[async_trait]
pub trait ObjectSigner: Send + Sync {
    /// Signs `path` for `expires_in`.
    async fn sign(&self, path: &ObjectPath, expires_in: Duration) -> Result<String, MediaError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignRequest {
    expires_in: u64,
}

#[derive(Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

/// Signer backed by the storage service's REST API, called with the
/// service key. The key never leaves the server.
#[derive(Clone)]
pub struct HttpObjectSigner {
    http: reqwest::Client,
    storage_url: Url,
    service_key: String,
    bucket: String,
}

impl HttpObjectSigner {
    /// Creates a signer for `bucket` at `storage_url`
    /// (e.g. `https://xyz.example.co/storage/v1`).
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::Storage`] if `storage_url` is not a usable base
    /// URL.
    pub fn new(
        http: reqwest::Client,
        storage_url: &str,
        service_key: impl Into<String>,
        bucket: impl Into<String>,
    ) -> std::result::Result<Self, MediaError> {
        let storage_url = Url::parse(storage_url).map_err(|e| MediaError::Storage {
            reason: format!("invalid storage url: {e}"),
        })?;
        if storage_url.cannot_be_a_base() {
            return Err(MediaError::Storage {
                reason: "storage url cannot be a base".to_string(),
            });
        }
        Ok(Self {
            http,
            storage_url,
            service_key: service_key.into(),
            bucket: bucket.into(),
        })
    }

    fn sign_endpoint(&self, path: &ObjectPath) -> Url {
        let mut url = self.storage_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["object", "sign", self.bucket.as_str()])
                .extend(path.segments());
        }
        url
    }

    fn absolute(&self, signed_path: &str) -> String {
        if signed_path.starts_with("http://") || signed_path.starts_with("https://") {
            return signed_path.to_string();
        }
        let base = self.storage_url.as_str().trim_end_matches('/');
        if signed_path.starts_with('/') {
            format!("{base}{signed_path}")
        } else {
            format!("{base}/{signed_path}")
        }
    }
}

#[async_trait]
impl ObjectSigner for HttpObjectSigner {
    #[instrument(skip(self), fields(path = %path))]
    async fn sign(&self, path: &ObjectPath, expires_in: Duration) -> Result<String, MediaError> {
        let response = self
            .http
            .post(self.sign_endpoint(path))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .json(&SignRequest {
                expires_in: expires_in.as_secs(),
            })
            .send()
            .await
            .map_err(|e| MediaError::Storage {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(MediaError::NotFound {
                path: path.to_string(),
            }
            .into());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // The storage API reports missing objects as 400 with this text.
            if body.contains("Object not found") {
                return Err(MediaError::NotFound {
                    path: path.to_string(),
                }
                .into());
            }
            return Err(MediaError::Storage {
                reason: format!("status {status}: {body}"),
            }
            .into());
        }

        let signed: SignResponse = response.json().await.map_err(|e| MediaError::Storage {
            reason: format!("malformed sign response: {e}"),
        })?;
        Ok(self.absolute(&signed.signed_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> HttpObjectSigner {
        HttpObjectSigner::new(
            reqwest::Client::new(),
            "https://proj.example.co/storage/v1",
            "service-key",
            "progress-photos",
        )
        .expect("signer")
    }

    #[test]
    fn accepts_folder_scoped_paths() {
        let path = ObjectPath::parse("u1/2024/front.jpg").expect("valid");
        assert_eq!(path.as_str(), "u1/2024/front.jpg");
    }

    #[test]
    fn rejects_bad_paths() {
        for raw in ["", "  ", "/u1/a.jpg", "u1/../u2/a.jpg", "u1//a.jpg", "./a.jpg", "u1\\a.jpg"] {
            assert!(ObjectPath::parse(raw).is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn sign_endpoint_encodes_segments() {
        let path = ObjectPath::parse("u1/foto frente.jpg").expect("valid");
        assert_eq!(
            signer().sign_endpoint(&path).as_str(),
            "https://proj.example.co/storage/v1/object/sign/progress-photos/u1/foto%20frente.jpg"
        );
    }

    #[test]
    fn signed_paths_are_made_absolute() {
        let s = signer();
        assert_eq!(
            s.absolute("/object/sign/progress-photos/u1/a.jpg?token=abc"),
            "https://proj.example.co/storage/v1/object/sign/progress-photos/u1/a.jpg?token=abc"
        );
        assert_eq!(
            s.absolute("https://cdn.example.co/a.jpg?token=abc"),
            "https://cdn.example.co/a.jpg?token=abc"
        );
    }

    #[test]
    fn rejects_non_base_storage_url() {
        assert!(
            HttpObjectSigner::new(reqwest::Client::new(), "mailto:ops@example.co", "k", "b")
                .is_err()
        );
    }
}
