//! Module identity and content
//!
//! A module version is addressed by a [`ModuleKey`] (full name, commit id
//! and content digest). Its resolved content is a [`ModuleData`]: a lazily
//! loaded file bucket plus the keys of its declared dependencies.

pub mod data;
pub mod digest;
pub mod key;
pub mod lazy;
pub mod name;

pub use data::ModuleData;
pub use digest::{module_digest, Digest, DigestType};
pub use key::ModuleKey;
pub use lazy::Lazy;
pub use name::ModuleFullName;
