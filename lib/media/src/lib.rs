//! Private media access for coachdesk.
//!
//! Media objects live in a private bucket under the uploader's folder
//! (`{subject_id}/...`) and are never served directly. Pages ask the
//! [`SignedMediaGateway`] for short-lived signed URLs instead, one batch at a
//! time. A path that cannot be signed maps to `None`; it never fails the
//! rest of the batch.

pub mod error;
pub mod gateway;
pub mod memory;
pub mod signer;

pub use error::MediaError;
pub use gateway::{SignedMediaGateway, SignedUrls};
pub use memory::InMemoryObjectSigner;
pub use signer::{HttpObjectSigner, ObjectPath, ObjectSigner};
