//! In-memory object signer.

use async_trait::async_trait;
use coachdesk_core::Result;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::MediaError;
use crate::signer::{ObjectPath, ObjectSigner};

/// Signs a fixed set of known objects with deterministic fake URLs.
#[derive(Debug, Default)]
pub struct InMemoryObjectSigner {
    objects: HashSet<String>,
    unavailable: bool,
    calls: AtomicUsize,
}

impl InMemoryObjectSigner {
    /// Creates a signer that knows no objects.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a signer that knows `objects`.
    #[must_use]
    pub fn with_objects<I, S>(objects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            objects: objects.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Creates a signer whose every call fails as a storage outage.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Number of sign calls received.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ObjectSigner for InMemoryObjectSigner {
    async fn sign(&self, path: &ObjectPath, expires_in: Duration) -> Result<String, MediaError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.unavailable {
            return Err(MediaError::Storage {
                reason: "storage unavailable".to_string(),
            }
            .into());
        }
        if !self.objects.contains(path.as_str()) {
            return Err(MediaError::NotFound {
                path: path.to_string(),
            }
            .into());
        }
        Ok(format!(
            "https://storage.example.com/signed/{path}?expires={}",
            expires_in.as_secs()
        ))
    }
}
