//! Module keys: one immutable version of a module

use super::digest::Digest;
use super::lazy::Lazy;
use super::name::ModuleFullName;
use crate::error::CacheResult;
use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use uuid::Uuid;

/// Identifies a specific, immutable version of a module
///
/// Identity is the full name plus the commit id. The digest is content
/// defining: two keys with equal digests refer to byte-identical modules.
/// It may be computed lazily, so reading it can fail.
#[derive(Clone)]
pub struct ModuleKey {
    full_name: ModuleFullName,
    commit_id: Uuid,
    digest: Arc<Lazy<Digest>>,
}

impl ModuleKey {
    /// Create a key with a known digest
    pub fn new(full_name: ModuleFullName, commit_id: Uuid, digest: Digest) -> Self {
        Self {
            full_name,
            commit_id,
            digest: Arc::new(Lazy::ready(digest)),
        }
    }

    /// Create a key whose digest is computed on first access
    pub fn new_lazy<F, Fut>(full_name: ModuleFullName, commit_id: Uuid, digest: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CacheResult<Digest>> + Send + 'static,
    {
        Self {
            full_name,
            commit_id,
            digest: Arc::new(Lazy::new(digest)),
        }
    }

    pub fn full_name(&self) -> &ModuleFullName {
        &self.full_name
    }

    pub fn commit_id(&self) -> Uuid {
        self.commit_id
    }

    /// The content digest of the module
    pub async fn digest(&self) -> CacheResult<Digest> {
        self.digest.get().await
    }
}

impl PartialEq for ModuleKey {
    fn eq(&self, other: &Self) -> bool {
        self.full_name == other.full_name && self.commit_id == other.commit_id
    }
}

impl Eq for ModuleKey {}

impl Hash for ModuleKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.full_name.hash(state);
        self.commit_id.hash(state);
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.full_name, self.commit_id.simple())
    }
}

impl fmt::Debug for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleKey")
            .field("full_name", &self.full_name.to_string())
            .field("commit_id", &self.commit_id.simple().to_string())
            .finish()
    }
}
