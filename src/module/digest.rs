//! Typed content digests
//!
//! A [`Digest`] is an algorithm tag plus raw hash bytes, rendered as
//! `<type>:<lowercase hex>`. Module digests hash a manifest of the module's
//! files and its declared dependency digests, so equal content always maps
//! to an equal digest.

use crate::error::{CacheError, CacheResult};
use crate::storage::{all_paths, read_path, ReadBucket};
use sha2::{Digest as _, Sha256, Sha512};
use std::fmt;
use std::str::FromStr;

/// Hash algorithm of a digest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum DigestType {
    #[default]
    Sha256,
    Sha512,
}

impl DigestType {
    /// Tag used in string and path forms
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Length of a digest value in bytes
    pub fn byte_len(&self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha512 => 64,
        }
    }

    /// Hash `data` with this algorithm
    pub fn hash(&self, data: &[u8]) -> Digest {
        let value = match self {
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        };
        Digest {
            digest_type: *self,
            value,
        }
    }
}

impl FromStr for DigestType {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            other => Err(CacheError::UnknownDigestType(other.to_string())),
        }
    }
}

impl fmt::Display for DigestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A hash value tagged with its algorithm
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest {
    digest_type: DigestType,
    value: Vec<u8>,
}

impl Digest {
    /// Create a digest from raw bytes, checking the length for the type
    pub fn new(digest_type: DigestType, value: Vec<u8>) -> CacheResult<Self> {
        if value.len() != digest_type.byte_len() {
            return Err(CacheError::InvalidDigest {
                value: hex::encode(&value),
                reason: format!(
                    "{} digests are {} bytes, got {}",
                    digest_type,
                    digest_type.byte_len(),
                    value.len()
                ),
            });
        }
        Ok(Self { digest_type, value })
    }

    pub fn digest_type(&self) -> DigestType {
        self.digest_type
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Lowercase hex encoding of the value
    pub fn hex(&self) -> String {
        hex::encode(&self.value)
    }
}

impl FromStr for Digest {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| CacheError::InvalidDigest {
            value: s.to_string(),
            reason,
        };

        let (tag, hex_value) = s
            .split_once(':')
            .ok_or_else(|| invalid("expected <type>:<hex>".to_string()))?;
        let digest_type: DigestType = tag.parse()?;
        if hex_value.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(invalid("hex must be lowercase".to_string()));
        }
        let value = hex::decode(hex_value).map_err(|e| invalid(e.to_string()))?;
        Self::new(digest_type, value)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.digest_type, self.hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self)
    }
}

/// Compute the digest of a module from its files and dependency digests
///
/// The hashed manifest has one `<file digest>  <path>` line per file in
/// path order, followed by the sorted dependency digests, one per line.
pub async fn module_digest<B: ReadBucket + ?Sized>(
    digest_type: DigestType,
    bucket: &B,
    dep_digests: &[Digest],
) -> CacheResult<Digest> {
    let mut manifest = String::new();
    for path in all_paths(bucket, "").await? {
        let data = read_path(bucket, &path).await?;
        manifest.push_str(&format!("{}  {}\n", digest_type.hash(&data), path));
    }

    let mut deps: Vec<String> = dep_digests.iter().map(Digest::to_string).collect();
    deps.sort();
    for dep in deps {
        manifest.push_str(&dep);
        manifest.push('\n');
    }

    Ok(digest_type.hash(manifest.as_bytes()))
}
