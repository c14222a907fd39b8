//! Cache-backed module data provider
//!
//! Wraps a delegate [`ModuleDataProvider`] and a writable bucket. Lookups
//! are served from the bucket when a complete entry exists; the remaining
//! keys go to the delegate in one batch, and whatever the delegate returns
//! is written back so the next lookup hits.

use super::path::{cache_prefix, files_prefix};
use super::report::{CacheErrorReporter, TracingReporter};
use crate::config::Config;
use crate::error::{CacheError, CacheResult, MultiError};
use crate::lockfile::{read_lock_file, write_lock_file, FileVersion, LockFile};
use crate::module::{ModuleData, ModuleKey};
use crate::provider::ModuleDataProvider;
use crate::storage::path::join;
use crate::storage::{
    all_paths, copy_read_object, MappedReadBucket, OsBucket, ReadBucket, ReadWriteBucket,
};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Module data provider that caches delegate results in a bucket
///
/// An entry only counts as present once its lock file exists. Entry files
/// are always written before the lock file, so an interrupted write leaves
/// an entry that is never served.
pub struct CachedModuleDataProvider {
    delegate: Arc<dyn ModuleDataProvider>,
    bucket: Arc<dyn ReadWriteBucket>,
    reporter: Arc<dyn CacheErrorReporter>,
    lock_file_version: FileVersion,
}

impl CachedModuleDataProvider {
    /// Create a provider caching `delegate` results in `bucket`
    pub fn new(delegate: Arc<dyn ModuleDataProvider>, bucket: Arc<dyn ReadWriteBucket>) -> Self {
        Self {
            delegate,
            bucket,
            reporter: Arc::new(TracingReporter),
            lock_file_version: FileVersion::default(),
        }
    }

    /// Create a provider over the module cache directory of `config`
    pub fn from_config(delegate: Arc<dyn ModuleDataProvider>, config: &Config) -> CacheResult<Self> {
        let bucket = OsBucket::new(config.module_cache_dir()?);
        Ok(Self::new(delegate, Arc::new(bucket))
            .with_lock_file_version(config.cache.lock_file_version))
    }

    /// Send cache write failures to `reporter` instead of the log
    pub fn with_reporter(mut self, reporter: Arc<dyn CacheErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Lock file version used for new entries
    pub fn with_lock_file_version(mut self, version: FileVersion) -> Self {
        self.lock_file_version = version;
        self
    }

    /// Look up a complete cache entry for `module_key`
    async fn get_cached(&self, module_key: &ModuleKey) -> CacheResult<Option<ModuleData>> {
        let digest = module_key.digest().await?;
        let prefix = cache_prefix(module_key.full_name(), &digest);

        let Some(lock_file) = read_lock_file(self.bucket.as_ref(), &prefix).await? else {
            return Ok(None);
        };
        let deps = lock_file.into_dep_module_keys();

        let bucket = Arc::clone(&self.bucket);
        let files = files_prefix(&prefix);
        let module_data = ModuleData::new(
            module_key.clone(),
            move || {
                let bucket = Arc::clone(&bucket);
                let files = files.clone();
                async move {
                    let mapped: Arc<dyn ReadBucket> =
                        Arc::new(MappedReadBucket::new(bucket, &files)?);
                    Ok(mapped)
                }
            },
            move || {
                let deps = deps.clone();
                async move { Ok(deps) }
            },
        )
        .with_actual_digest(digest);

        Ok(Some(module_data))
    }

    /// Write every module's entry, continuing past failures
    async fn put_module_datas(&self, module_datas: &[ModuleData]) -> CacheResult<()> {
        let mut errors = MultiError::new();
        let mut written = HashSet::new();

        for module_data in module_datas {
            let module_key = module_data.module_key();
            // Duplicate keys in one batch share an entry
            if !written.insert(module_key.clone()) {
                continue;
            }
            if let Err(e) = self.put_module_data(module_data).await {
                errors.push(CacheError::CacheWrite {
                    module: module_key.to_string(),
                    source: Box::new(e),
                });
            }
        }

        errors.into_result()
    }

    /// Write one entry: all files first, then the lock file
    async fn put_module_data(&self, module_data: &ModuleData) -> CacheResult<()> {
        let module_key = module_data.module_key();
        let digest = module_key.digest().await?;
        let prefix = cache_prefix(module_key.full_name(), &digest);

        let lock_file = LockFile::new(
            self.lock_file_version,
            module_data.declared_dep_module_keys().await?,
        )?;

        let module_bucket = module_data.bucket().await?;
        let files = files_prefix(&prefix);
        let paths = all_paths(module_bucket.as_ref(), "").await?;
        for path in &paths {
            let reader = module_bucket.get(path).await?;
            copy_read_object(self.bucket.as_ref(), &join(&files, path), reader).await?;
        }

        write_lock_file(self.bucket.as_ref(), &prefix, &lock_file).await?;
        debug!("Cached {} ({} files) at {}", module_key, paths.len(), prefix);
        Ok(())
    }
}

#[async_trait]
impl ModuleDataProvider for CachedModuleDataProvider {
    async fn get_module_datas_for_module_keys(
        &self,
        module_keys: &[ModuleKey],
    ) -> CacheResult<Vec<ModuleData>> {
        let mut results: Vec<Option<ModuleData>> = Vec::with_capacity(module_keys.len());
        // Original position of each missed key, parallel to missed_keys
        let mut missed_indexes = Vec::new();
        let mut missed_keys = Vec::new();

        for (index, module_key) in module_keys.iter().enumerate() {
            let cached = match self.get_cached(module_key).await {
                Ok(cached) => cached,
                Err(e) => {
                    debug!("Cache read for {} failed, treating as miss: {}", module_key, e);
                    None
                }
            };

            if cached.is_some() {
                debug!("Cache hit for {}", module_key);
            } else {
                debug!("Cache miss for {}", module_key);
                missed_indexes.push(index);
                missed_keys.push(module_key.clone());
            }
            results.push(cached);
        }

        if !missed_keys.is_empty() {
            let delegate_datas = self
                .delegate
                .get_module_datas_for_module_keys(&missed_keys)
                .await?;

            if delegate_datas.len() != missed_keys.len() {
                return Err(CacheError::DelegateResultMismatch {
                    expected: missed_keys.len(),
                    actual: delegate_datas.len(),
                });
            }

            for ((&index, requested), module_data) in
                missed_indexes.iter().zip(&missed_keys).zip(&delegate_datas)
            {
                if module_data.module_key() != requested {
                    return Err(CacheError::ModuleKeyMismatch {
                        expected: requested.to_string(),
                        actual: module_data.module_key().to_string(),
                    });
                }
                results[index] = Some(module_data.clone());
            }

            if let Err(e) = self.put_module_datas(&delegate_datas).await {
                self.reporter.report(&e);
            }
        }

        results
            .into_iter()
            .zip(module_keys)
            .map(|(result, module_key)| {
                result.ok_or_else(|| {
                    CacheError::Internal(format!("no module data resolved for {}", module_key))
                })
            })
            .collect()
    }
}
