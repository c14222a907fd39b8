//! Resolved module content

use super::digest::{module_digest, Digest};
use super::key::ModuleKey;
use super::lazy::Lazy;
use crate::error::{CacheError, CacheResult};
use crate::storage::ReadBucket;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// The resolved content for one [`ModuleKey`]
///
/// The file bucket and the declared dependencies are obtained lazily and
/// memoized; clones share the memoized values. When the content comes from
/// a trusted source (a cache entry written under the key's digest), the
/// actual digest is attached up front so integrity checks can use it
/// instead of hashing every file again.
#[derive(Clone)]
pub struct ModuleData {
    module_key: ModuleKey,
    bucket: Arc<Lazy<Arc<dyn ReadBucket>>>,
    declared_dep_module_keys: Arc<Lazy<Vec<ModuleKey>>>,
    actual_digest: Option<Digest>,
}

impl ModuleData {
    /// Create module data with deferred bucket and dependency accessors
    pub fn new<FB, FutB, FD, FutD>(module_key: ModuleKey, get_bucket: FB, get_deps: FD) -> Self
    where
        FB: Fn() -> FutB + Send + Sync + 'static,
        FutB: Future<Output = CacheResult<Arc<dyn ReadBucket>>> + Send + 'static,
        FD: Fn() -> FutD + Send + Sync + 'static,
        FutD: Future<Output = CacheResult<Vec<ModuleKey>>> + Send + 'static,
    {
        Self {
            module_key,
            bucket: Arc::new(Lazy::new(get_bucket)),
            declared_dep_module_keys: Arc::new(Lazy::new(get_deps)),
            actual_digest: None,
        }
    }

    /// Create module data from an already available bucket and dependencies
    pub fn from_parts(
        module_key: ModuleKey,
        bucket: Arc<dyn ReadBucket>,
        declared_dep_module_keys: Vec<ModuleKey>,
    ) -> Self {
        Self {
            module_key,
            bucket: Arc::new(Lazy::ready(bucket)),
            declared_dep_module_keys: Arc::new(Lazy::ready(declared_dep_module_keys)),
            actual_digest: None,
        }
    }

    /// Attach a digest known to match the content
    pub fn with_actual_digest(mut self, digest: Digest) -> Self {
        self.actual_digest = Some(digest);
        self
    }

    pub fn module_key(&self) -> &ModuleKey {
        &self.module_key
    }

    /// The module's files
    pub async fn bucket(&self) -> CacheResult<Arc<dyn ReadBucket>> {
        self.bucket.get().await
    }

    /// Keys of the modules this module declares as dependencies
    pub async fn declared_dep_module_keys(&self) -> CacheResult<Vec<ModuleKey>> {
        self.declared_dep_module_keys.get().await
    }

    /// The digest attached with [`with_actual_digest`](Self::with_actual_digest), if any
    pub fn known_actual_digest(&self) -> Option<&Digest> {
        self.actual_digest.as_ref()
    }

    /// The digest of the content, recomputed unless already known
    pub async fn actual_digest(&self) -> CacheResult<Digest> {
        if let Some(digest) = &self.actual_digest {
            return Ok(digest.clone());
        }

        let expected = self.module_key.digest().await?;
        let bucket = self.bucket().await?;
        let mut dep_digests = Vec::new();
        for dep in self.declared_dep_module_keys().await? {
            dep_digests.push(dep.digest().await?);
        }
        module_digest(expected.digest_type(), bucket.as_ref(), &dep_digests).await
    }

    /// Fail unless the content matches the key's digest
    pub async fn check_digest(&self) -> CacheResult<()> {
        let expected = self.module_key.digest().await?;
        let actual = self.actual_digest().await?;
        if expected != actual {
            return Err(CacheError::DigestMismatch {
                module: self.module_key.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for ModuleData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleData")
            .field("module_key", &self.module_key)
            .field("actual_digest", &self.actual_digest)
            .finish_non_exhaustive()
    }
}
