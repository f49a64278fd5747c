//! Batch signing.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::signer::{ObjectPath, ObjectSigner};

/// Map from each requested path to its signed URL, or `None` when that path
/// could not be signed. Serializes to a JSON object with `null` values.
pub type SignedUrls = BTreeMap<String, Option<String>>;

/// Turns batches of private object paths into signed URLs.
///
/// Every call signs again; nothing is cached.
#[derive(Clone)]
pub struct SignedMediaGateway {
    signer: Arc<dyn ObjectSigner>,
    expires_in: Duration,
}

impl SignedMediaGateway {
    /// Creates a gateway whose URLs stay valid for `expires_in`.
    #[must_use]
    pub fn new(signer: Arc<dyn ObjectSigner>, expires_in: Duration) -> Self {
        Self { signer, expires_in }
    }

    /// Signs every path in `paths`.
    ///
    /// The result has one entry per distinct input path. Failures are per
    /// item and logged; they never fail the batch.
    pub async fn sign_batch(&self, paths: &[String]) -> SignedUrls {
        let mut urls = SignedUrls::new();

        for raw in paths {
            if urls.contains_key(raw) {
                continue;
            }

            let signed = match ObjectPath::parse(raw) {
                Ok(path) => match self.signer.sign(&path, self.expires_in).await {
                    Ok(url) => Some(url),
                    Err(report) => {
                        warn!(path = %raw, error = %report, "Failed to sign media path");
                        None
                    }
                },
                Err(e) => {
                    warn!(path = %raw, error = %e, "Rejected media path");
                    None
                }
            };
            urls.insert(raw.clone(), signed);
        }

        debug!(
            requested = paths.len(),
            signed = urls.values().filter(|url| url.is_some()).count(),
            "Signed media batch"
        );
        urls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryObjectSigner;

    fn gateway(signer: Arc<InMemoryObjectSigner>) -> SignedMediaGateway {
        SignedMediaGateway::new(signer, Duration::from_secs(3600))
    }

    fn paths(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|p| (*p).to_string()).collect()
    }

    #[tokio::test]
    async fn one_bad_path_does_not_fail_the_batch() {
        let signer = Arc::new(InMemoryObjectSigner::with_objects([
            "u1/front.jpg",
            "u1/side.jpg",
            "u1/back.jpg",
        ]));
        let urls = gateway(signer)
            .sign_batch(&paths(&["u1/front.jpg", "u1/side.jpg", "u1/missing.jpg", "u1/back.jpg"]))
            .await;

        assert_eq!(urls.len(), 4);
        assert_eq!(urls["u1/missing.jpg"], None);
        for ok in ["u1/front.jpg", "u1/side.jpg", "u1/back.jpg"] {
            let url = urls[ok].as_deref().expect("signed");
            assert!(url.contains(ok));
            assert!(url.contains("expires=3600"));
        }
    }

    #[tokio::test]
    async fn invalid_paths_never_reach_the_signer() {
        let signer = Arc::new(InMemoryObjectSigner::with_objects(["u1/a.jpg"]));
        let urls = gateway(signer.clone())
            .sign_batch(&paths(&["", "/u1/a.jpg", "u1/../u2/a.jpg", "u1/a.jpg"]))
            .await;

        assert_eq!(urls.len(), 4);
        assert_eq!(urls.values().filter(|u| u.is_some()).count(), 1);
        assert_eq!(signer.calls(), 1);
    }

    #[tokio::test]
    async fn duplicates_collapse_and_every_call_resigns() {
        let signer = Arc::new(InMemoryObjectSigner::with_objects(["u1/a.jpg"]));
        let gateway = gateway(signer.clone());
        let batch = paths(&["u1/a.jpg", "u1/a.jpg"]);

        let first = gateway.sign_batch(&batch).await;
        let second = gateway.sign_batch(&batch).await;

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(signer.calls(), 2);
    }

    #[tokio::test]
    async fn storage_outage_maps_everything_to_none() {
        let signer = Arc::new(InMemoryObjectSigner::unavailable());
        let urls = gateway(signer)
            .sign_batch(&paths(&["u1/a.jpg", "u2/b.jpg"]))
            .await;
        assert_eq!(urls.len(), 2);
        assert!(urls.values().all(Option::is_none));
    }

    #[tokio::test]
    async fn empty_batch_is_empty() {
        let signer = Arc::new(InMemoryObjectSigner::new());
        assert!(gateway(signer).sign_batch(&[]).await.is_empty());
    }
}
