//! bufcache - Content-addressed module data cache
//!
//! Decorates a [`ModuleDataProvider`] with a persistent, digest-keyed cache
//! so that module content fetched once is served locally afterwards.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod lockfile;
pub mod module;
pub mod provider;
pub mod storage;

pub use cache::CachedModuleDataProvider;
pub use error::{CacheError, CacheResult};
pub use provider::ModuleDataProvider;
