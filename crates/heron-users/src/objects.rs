//! Blob storage for profile images.
//!
//! Library-only: no endpoint reads or writes images yet. [`ImageStore`] is
//! exported for callers that serve pictures themselves.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use heron::core::{Blob, ObjectStore, StoreResult};
use tracing::warn;

/// Key prefix for profile images.
pub const IMAGE_PREFIX: &str = "heron-images";

/// Media type assumed when a caller gives none.
pub const DEFAULT_IMAGE_TYPE: &str = "image/heic";

/// An [`ObjectStore`] kept in memory.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    blobs: DashMap<String, Blob>,
}

impl MemoryObjectStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored keys, unordered.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.blobs.iter().map(|e| e.key().clone()).collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, blob: Blob) -> StoreResult<()> {
        self.blobs.insert(key.to_string(), blob);
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Blob>> {
        Ok(self.blobs.get(key).map(|b| b.value().clone()))
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        Ok(self.blobs.remove(key).is_some())
    }
}

/// Profile images keyed by user id, one file per user.
///
/// Images are named `<prefix>/<uid>.<ext>` where the extension is the media
/// subtype. Reads try the HEIC name first, then PNG.
#[derive(Clone)]
pub struct ImageStore {
    objects: Arc<dyn ObjectStore>,
}

impl std::fmt::Debug for ImageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageStore").finish_non_exhaustive()
    }
}

impl ImageStore {
    /// Wraps an object store.
    #[must_use]
    pub fn new(objects: Arc<dyn ObjectStore>) -> Self {
        Self { objects }
    }

    /// Saves an image. Returns false if the backend refused it.
    pub async fn save(&self, uid: &str, bytes: Bytes, content_type: Option<&str>) -> bool {
        let content_type = content_type.unwrap_or(DEFAULT_IMAGE_TYPE);
        let key = image_key(uid, extension(content_type));
        let blob = Blob {
            bytes,
            content_type: content_type.to_string(),
        };
        match self.objects.put(&key, blob).await {
            Ok(()) => true,
            Err(e) => {
                warn!(%key, error = %e, "failed to save image");
                false
            }
        }
    }

    /// Fetches a user's image.
    pub async fn get(&self, uid: &str) -> StoreResult<Option<Blob>> {
        if let Some(blob) = self.objects.get(&image_key(uid, "heic")).await? {
            return Ok(Some(blob));
        }
        self.objects.get(&image_key(uid, "png")).await
    }

    /// Deletes a user's image. Returns whether one was removed.
    pub async fn delete(&self, uid: &str) -> bool {
        let mut removed = false;
        for ext in ["heic", "png"] {
            let key = image_key(uid, ext);
            match self.objects.delete(&key).await {
                Ok(found) => removed |= found,
                Err(e) => warn!(%key, error = %e, "failed to delete image"),
            }
        }
        removed
    }
}

fn image_key(uid: &str, ext: &str) -> String {
    format!("{IMAGE_PREFIX}/{uid}.{ext}")
}

fn extension(content_type: &str) -> &str {
    content_type
        .split_once('/')
        .map_or(content_type, |(_, subtype)| subtype)
}
