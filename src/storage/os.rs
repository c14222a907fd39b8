//! Filesystem bucket
//!
//! Objects are regular files under a root directory. Atomic puts write into
//! a uniquely named file under the reserved staging directory and rename it
//! into place on close, so readers only ever observe complete files. The
//! staging directory lies outside the object namespace and is never walked.

use super::path::{normalize, normalize_object_path, STAGING_DIR};
use super::{ObjectInfo, PutOptions, ReadBucket, ReadObjectCloser, WriteBucket, WriteObjectCloser};
use crate::error::{CacheError, CacheResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::fs::{self, File};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tracing::debug;
use uuid::Uuid;

/// Bucket rooted at a local directory
#[derive(Debug, Clone)]
pub struct OsBucket {
    root: PathBuf,
}

impl OsBucket {
    /// Create a bucket rooted at `root`
    ///
    /// The directory does not need to exist yet; it is created on first put.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &str) -> PathBuf {
        path.split('/')
            .fold(self.root.clone(), |acc, component| acc.join(component))
    }

    fn staging_path(&self) -> PathBuf {
        self.root.join(STAGING_DIR)
    }

    fn relative_path(&self, full: &Path) -> Option<String> {
        let relative = full.strip_prefix(&self.root).ok()?;
        let mut components = Vec::new();
        for component in relative.components() {
            components.push(component.as_os_str().to_str()?);
        }
        Some(components.join("/"))
    }
}

fn modified_time(metadata: &std::fs::Metadata) -> Option<DateTime<Utc>> {
    metadata.modified().ok().map(DateTime::<Utc>::from)
}

fn not_found_or_io(path: &str, context: String, e: io::Error) -> CacheError {
    if e.kind() == io::ErrorKind::NotFound {
        CacheError::ObjectNotFound(path.to_string())
    } else {
        CacheError::io(context, e)
    }
}

#[async_trait]
impl ReadBucket for OsBucket {
    async fn get(&self, path: &str) -> CacheResult<Box<dyn ReadObjectCloser>> {
        let info = self.stat(path).await?;
        let full = self.full_path(&info.path);
        let file = File::open(&full)
            .await
            .map_err(|e| not_found_or_io(&info.path, format!("opening {}", full.display()), e))?;

        Ok(Box::new(OsReadObject {
            info,
            file: Some(file),
        }))
    }

    async fn stat(&self, path: &str) -> CacheResult<ObjectInfo> {
        let path = normalize_object_path(path)?;
        let full = self.full_path(&path);
        let metadata = fs::metadata(&full)
            .await
            .map_err(|e| not_found_or_io(&path, format!("reading metadata of {}", full.display()), e))?;

        if !metadata.is_file() {
            return Err(CacheError::ObjectNotFound(path));
        }

        Ok(ObjectInfo {
            path,
            size: metadata.len(),
            modified: modified_time(&metadata),
        })
    }

    async fn walk(
        &self,
        prefix: &str,
        visit: &mut (dyn FnMut(ObjectInfo) -> CacheResult<()> + Send),
    ) -> CacheResult<()> {
        let prefix = normalize(prefix)?;
        let start = if prefix.is_empty() {
            self.root.clone()
        } else {
            self.full_path(&prefix)
        };

        let start_metadata = match fs::metadata(&start).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(CacheError::io(format!("walking {}", start.display()), e)),
        };

        let mut infos = Vec::new();
        if start_metadata.is_file() {
            infos.push(ObjectInfo {
                path: prefix,
                size: start_metadata.len(),
                modified: modified_time(&start_metadata),
            });
        } else {
            let staging = self.staging_path();
            let mut pending = vec![start];
            while let Some(dir) = pending.pop() {
                let mut entries = match fs::read_dir(&dir).await {
                    Ok(entries) => entries,
                    // Removed concurrently
                    Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                    Err(e) => {
                        return Err(CacheError::io(format!("reading directory {}", dir.display()), e))
                    }
                };

                while let Some(entry) = entries
                    .next_entry()
                    .await
                    .map_err(|e| CacheError::io(format!("reading entry in {}", dir.display()), e))?
                {
                    let entry_path = entry.path();
                    let metadata = entry.metadata().await.map_err(|e| {
                        CacheError::io(format!("reading metadata of {}", entry_path.display()), e)
                    })?;

                    if metadata.is_dir() {
                        if entry_path != staging {
                            pending.push(entry_path);
                        }
                        continue;
                    }
                    if !metadata.is_file() {
                        continue;
                    }

                    match self.relative_path(&entry_path) {
                        Some(path) => infos.push(ObjectInfo {
                            path,
                            size: metadata.len(),
                            modified: modified_time(&metadata),
                        }),
                        None => debug!("Skipping non UTF-8 path {}", entry_path.display()),
                    }
                }
            }
        }

        infos.sort_by(|a, b| a.path.cmp(&b.path));
        for info in infos {
            visit(info)?;
        }
        Ok(())
    }
}

#[async_trait]
impl WriteBucket for OsBucket {
    async fn put(&self, path: &str, options: PutOptions) -> CacheResult<Box<dyn WriteObjectCloser>> {
        let path = normalize_object_path(path)?;
        let final_path = self.full_path(&path);

        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| CacheError::io(format!("creating directory {}", parent.display()), e))?;
        }

        let temp_path = if options.atomic {
            let staging = self.staging_path();
            fs::create_dir_all(&staging)
                .await
                .map_err(|e| CacheError::io(format!("creating directory {}", staging.display()), e))?;
            Some(staging.join(format!("{}.tmp", Uuid::new_v4().simple())))
        } else {
            None
        };

        let open_path = temp_path.as_deref().unwrap_or(&final_path);
        let file = File::create(open_path)
            .await
            .map_err(|e| CacheError::io(format!("creating {}", open_path.display()), e))?;

        Ok(Box::new(OsWriteObject {
            path,
            final_path,
            temp_path,
            file: Some(file),
        }))
    }
}

struct OsReadObject {
    info: ObjectInfo,
    file: Option<File>,
}

impl AsyncRead for OsReadObject {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.file.as_mut() {
            Some(file) => Pin::new(file).poll_read(cx, buf),
            None => Poll::Ready(Err(io::Error::other("read from closed object"))),
        }
    }
}

#[async_trait]
impl ReadObjectCloser for OsReadObject {
    fn info(&self) -> &ObjectInfo {
        &self.info
    }

    async fn close(&mut self) -> CacheResult<()> {
        self.file.take();
        Ok(())
    }
}

struct OsWriteObject {
    path: String,
    final_path: PathBuf,
    /// Set for atomic puts until the rename succeeds
    temp_path: Option<PathBuf>,
    file: Option<File>,
}

impl OsWriteObject {
    fn file_mut(&mut self) -> io::Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::other("write to closed object"))
    }
}

impl AsyncWrite for OsWriteObject {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.file_mut() {
            Ok(file) => Pin::new(file).poll_write(cx, buf),
            Err(e) => Poll::Ready(Err(e)),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.file_mut() {
            Ok(file) => Pin::new(file).poll_flush(cx),
            Err(e) => Poll::Ready(Err(e)),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.file_mut() {
            Ok(file) => Pin::new(file).poll_shutdown(cx),
            Err(e) => Poll::Ready(Err(e)),
        }
    }
}

#[async_trait]
impl WriteObjectCloser for OsWriteObject {
    fn path(&self) -> &str {
        &self.path
    }

    async fn close(&mut self) -> CacheResult<()> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| CacheError::WriterClosed(self.path.clone()))?;

        let written = self.final_path.display().to_string();
        file.flush()
            .await
            .map_err(|e| CacheError::io(format!("flushing {}", written), e))?;
        file.sync_all()
            .await
            .map_err(|e| CacheError::io(format!("syncing {}", written), e))?;
        drop(file);

        if let Some(temp) = self.temp_path.as_ref() {
            fs::rename(temp, &self.final_path).await.map_err(|e| {
                CacheError::io(
                    format!("moving {} into place at {}", temp.display(), written),
                    e,
                )
            })?;
            self.temp_path = None;
        }

        debug!("Wrote {}", written);
        Ok(())
    }

    async fn abort(&mut self) -> CacheResult<()> {
        self.file.take();
        let leftover = match self.temp_path.take() {
            Some(temp) => temp,
            // Non-atomic writes leave a partial file at the final path
            None => self.final_path.clone(),
        };

        match fs::remove_file(&leftover).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::io(format!("removing {}", leftover.display()), e)),
        }
    }
}

impl Drop for OsWriteObject {
    fn drop(&mut self) {
        // Dropped without close or abort: never publish the temp file
        if let Some(temp) = self.temp_path.take() {
            self.file.take();
            // Drop cannot await, so this removal blocks
            let _ = std::fs::remove_file(temp);
        }
    }
}
