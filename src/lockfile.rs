//! `buf.lock` encoding
//!
//! A lock file lists the declared dependencies of a module, each pinned to
//! a commit and a digest. The cache writes one per entry; its presence marks
//! the entry as complete.

use crate::error::{CacheError, CacheResult};
use crate::module::{Digest, ModuleFullName, ModuleKey};
use crate::storage::path::join;
use crate::storage::{put_path, read_path, ReadBucket, WriteBucket};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// File name of lock files
pub const LOCK_FILE_NAME: &str = "buf.lock";

const HEADER: &str = "# Generated by buf. DO NOT EDIT.\n";

/// Lock file format version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileVersion {
    /// Entries split into remote/owner/repository
    V1,
    /// Entries keyed by full module name
    #[default]
    V2,
}

impl FileVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
        }
    }
}

impl FromStr for FileVersion {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "v1" => Ok(Self::V1),
            "v2" => Ok(Self::V2),
            other => Err(CacheError::lock_file_invalid(
                LOCK_FILE_NAME,
                format!("unknown version {:?}", other),
            )),
        }
    }
}

impl fmt::Display for FileVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Declared dependencies of a module, pinned by commit and digest
#[derive(Debug, Clone)]
pub struct LockFile {
    version: FileVersion,
    dep_module_keys: Vec<ModuleKey>,
}

#[derive(Deserialize)]
struct ExternalVersion {
    #[serde(default)]
    version: String,
}

#[derive(Serialize, Deserialize)]
struct ExternalLockFileV1 {
    version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    deps: Vec<ExternalDepV1>,
}

#[derive(Serialize, Deserialize)]
struct ExternalDepV1 {
    remote: String,
    owner: String,
    repository: String,
    commit: String,
    digest: String,
}

#[derive(Serialize, Deserialize)]
struct ExternalLockFileV2 {
    version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    deps: Vec<ExternalDepV2>,
}

#[derive(Serialize, Deserialize)]
struct ExternalDepV2 {
    name: String,
    commit: String,
    digest: String,
}

impl LockFile {
    /// Create a lock file, rejecting duplicate module names
    pub fn new(version: FileVersion, dep_module_keys: Vec<ModuleKey>) -> CacheResult<Self> {
        let mut seen = HashSet::new();
        for key in &dep_module_keys {
            if !seen.insert(key.full_name().clone()) {
                return Err(CacheError::lock_file_invalid(
                    LOCK_FILE_NAME,
                    format!("duplicate dependency {}", key.full_name()),
                ));
            }
        }
        Ok(Self {
            version,
            dep_module_keys,
        })
    }

    pub fn version(&self) -> FileVersion {
        self.version
    }

    pub fn dep_module_keys(&self) -> &[ModuleKey] {
        &self.dep_module_keys
    }

    pub fn into_dep_module_keys(self) -> Vec<ModuleKey> {
        self.dep_module_keys
    }

    /// Encode as YAML, keeping dependencies in declared order
    pub async fn encode(&self) -> CacheResult<Vec<u8>> {
        let mut entries = Vec::with_capacity(self.dep_module_keys.len());
        for key in &self.dep_module_keys {
            entries.push((key.full_name().clone(), key.commit_id(), key.digest().await?));
        }

        let body = match self.version {
            FileVersion::V1 => serde_yaml::to_string(&ExternalLockFileV1 {
                version: self.version.to_string(),
                deps: entries
                    .into_iter()
                    .map(|(name, commit, digest)| ExternalDepV1 {
                        remote: name.registry().to_string(),
                        owner: name.owner().to_string(),
                        repository: name.name().to_string(),
                        commit: commit.simple().to_string(),
                        digest: digest.to_string(),
                    })
                    .collect(),
            })?,
            FileVersion::V2 => serde_yaml::to_string(&ExternalLockFileV2 {
                version: self.version.to_string(),
                deps: entries
                    .into_iter()
                    .map(|(name, commit, digest)| ExternalDepV2 {
                        name: name.to_string(),
                        commit: commit.simple().to_string(),
                        digest: digest.to_string(),
                    })
                    .collect(),
            })?,
        };

        Ok(format!("{}{}", HEADER, body).into_bytes())
    }

    /// Decode a lock file read from `path`
    pub fn decode(path: &str, data: &[u8]) -> CacheResult<Self> {
        let invalid = |reason: String| CacheError::lock_file_invalid(path, reason);

        let text = std::str::from_utf8(data).map_err(|e| invalid(e.to_string()))?;
        let header: ExternalVersion =
            serde_yaml::from_str(text).map_err(|e| invalid(e.to_string()))?;
        let version: FileVersion = header
            .version
            .parse()
            .map_err(|_| invalid(format!("unknown version {:?}", header.version)))?;

        let mut keys = Vec::new();
        match version {
            FileVersion::V1 => {
                let file: ExternalLockFileV1 =
                    serde_yaml::from_str(text).map_err(|e| invalid(e.to_string()))?;
                for dep in file.deps {
                    let name = ModuleFullName::new(dep.remote, dep.owner, dep.repository)
                        .map_err(|e| invalid(e.to_string()))?;
                    let key = dep_key(name, &dep.commit, &dep.digest)
                        .map_err(|e| invalid(e.to_string()))?;
                    keys.push(key);
                }
            }
            FileVersion::V2 => {
                let file: ExternalLockFileV2 =
                    serde_yaml::from_str(text).map_err(|e| invalid(e.to_string()))?;
                for dep in file.deps {
                    let name: ModuleFullName =
                        dep.name.parse().map_err(|e: CacheError| invalid(e.to_string()))?;
                    let key = dep_key(name, &dep.commit, &dep.digest)
                        .map_err(|e| invalid(e.to_string()))?;
                    keys.push(key);
                }
            }
        }

        Self::new(version, keys).map_err(|e| invalid(e.to_string()))
    }
}

fn dep_key(name: ModuleFullName, commit: &str, digest: &str) -> CacheResult<ModuleKey> {
    let commit_id = Uuid::parse_str(commit).map_err(|e| {
        CacheError::lock_file_invalid(
            LOCK_FILE_NAME,
            format!("invalid commit {:?} for {}: {}", commit, name, e),
        )
    })?;
    let digest: Digest = digest.parse()?;
    Ok(ModuleKey::new(name, commit_id, digest))
}

/// Read the lock file at `prefix`, or `None` if there is none
pub async fn read_lock_file<B: ReadBucket + ?Sized>(
    bucket: &B,
    prefix: &str,
) -> CacheResult<Option<LockFile>> {
    let path = join(prefix, LOCK_FILE_NAME);
    match read_path(bucket, &path).await {
        Ok(data) => LockFile::decode(&path, &data).map(Some),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Atomically write `lock_file` at `prefix`
pub async fn write_lock_file<B: WriteBucket + ?Sized>(
    bucket: &B,
    prefix: &str,
    lock_file: &LockFile,
) -> CacheResult<()> {
    let data = lock_file.encode().await?;
    put_path(bucket, &join(prefix, LOCK_FILE_NAME), &data).await
}
