//! Module data provider abstraction
//!
//! Anything that can turn module keys into module content implements
//! [`ModuleDataProvider`]: a remote registry client, a local store, or the
//! cache decorator in [`crate::cache`], which wraps another provider and
//! satisfies the same contract.

use crate::error::CacheResult;
use crate::module::{ModuleData, ModuleKey};
use async_trait::async_trait;
use std::sync::Arc;

/// Resolves module keys to module data
#[async_trait]
pub trait ModuleDataProvider: Send + Sync {
    /// Resolve every key in one batch
    ///
    /// The result has the same length and order as `module_keys`:
    /// `result[i]` is the data for `module_keys[i]`. Keys need not be
    /// unique or sorted. Dropping the returned future cancels any
    /// outstanding I/O.
    async fn get_module_datas_for_module_keys(
        &self,
        module_keys: &[ModuleKey],
    ) -> CacheResult<Vec<ModuleData>>;
}

#[async_trait]
impl<P: ModuleDataProvider + ?Sized> ModuleDataProvider for Arc<P> {
    async fn get_module_datas_for_module_keys(
        &self,
        module_keys: &[ModuleKey],
    ) -> CacheResult<Vec<ModuleData>> {
        (**self).get_module_datas_for_module_keys(module_keys).await
    }
}
