//! Read-only view of a bucket scoped to a prefix

use super::path::{join, normalize, normalize_object_path, relative};
use super::{ObjectInfo, ReadBucket, ReadObjectCloser};
use crate::error::{CacheError, CacheResult};
use async_trait::async_trait;
use std::sync::Arc;

/// Exposes the objects under `prefix` of a delegate bucket as if they were
/// at the root
pub struct MappedReadBucket<B: ReadBucket + ?Sized> {
    delegate: Arc<B>,
    prefix: String,
}

impl<B: ReadBucket + ?Sized> MappedReadBucket<B> {
    pub fn new(delegate: Arc<B>, prefix: &str) -> CacheResult<Self> {
        Ok(Self {
            delegate,
            prefix: normalize(prefix)?,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn unmap(&self, mut info: ObjectInfo) -> CacheResult<ObjectInfo> {
        info.path = relative(&info.path, &self.prefix)
            .ok_or_else(|| {
                CacheError::Internal(format!(
                    "object {} is outside of mapped prefix {}",
                    info.path, self.prefix
                ))
            })?
            .to_string();
        Ok(info)
    }
}

#[async_trait]
impl<B: ReadBucket + ?Sized> ReadBucket for MappedReadBucket<B> {
    async fn get(&self, path: &str) -> CacheResult<Box<dyn ReadObjectCloser>> {
        let path = normalize_object_path(path)?;
        self.delegate
            .get(&join(&self.prefix, &path))
            .await
            .map_err(|e| match e {
                CacheError::ObjectNotFound(_) => CacheError::ObjectNotFound(path),
                other => other,
            })
    }

    async fn stat(&self, path: &str) -> CacheResult<ObjectInfo> {
        let path = normalize_object_path(path)?;
        let info = self
            .delegate
            .stat(&join(&self.prefix, &path))
            .await
            .map_err(|e| match e {
                CacheError::ObjectNotFound(_) => CacheError::ObjectNotFound(path),
                other => other,
            })?;
        self.unmap(info)
    }

    async fn walk(
        &self,
        prefix: &str,
        visit: &mut (dyn FnMut(ObjectInfo) -> CacheResult<()> + Send),
    ) -> CacheResult<()> {
        let prefix = normalize(prefix)?;
        let mut mapped_visit = |info: ObjectInfo| visit(self.unmap(info)?);
        self.delegate
            .walk(&join(&self.prefix, &prefix), &mut mapped_visit)
            .await
    }
}
