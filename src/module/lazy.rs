//! Single-evaluation async values

use crate::error::{CacheError, CacheResult};
use futures_util::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

type Thunk<T> = Box<dyn Fn() -> BoxFuture<'static, CacheResult<T>> + Send + Sync>;

/// A value computed on first access and memoized afterwards
///
/// Failures are memoized as well; later calls return the same error wrapped
/// in `CacheError::Shared`. If the first evaluation is cancelled, the next
/// caller runs the thunk again.
pub struct Lazy<T> {
    cell: OnceCell<Result<T, Arc<CacheError>>>,
    init: Option<Thunk<T>>,
}

impl<T: Clone + Send + Sync + 'static> Lazy<T> {
    /// Defer computing the value until it is first requested
    pub fn new<F, Fut>(init: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CacheResult<T>> + Send + 'static,
    {
        Self {
            cell: OnceCell::new(),
            init: Some(Box::new(move || Box::pin(init()))),
        }
    }

    /// An already computed value
    pub fn ready(value: T) -> Self {
        Self {
            cell: OnceCell::new_with(Some(Ok(value))),
            init: None,
        }
    }

    /// Get the value, computing it if this is the first access
    pub async fn get(&self) -> CacheResult<T> {
        let result = self
            .cell
            .get_or_init(|| async {
                match &self.init {
                    Some(init) => init().await.map_err(Arc::new),
                    None => Err(Arc::new(CacheError::Internal(
                        "lazy value has no initializer".to_string(),
                    ))),
                }
            })
            .await;

        match result {
            Ok(value) => Ok(value.clone()),
            Err(e) => Err(CacheError::Shared(Arc::clone(e))),
        }
    }

    /// Whether the value has been computed (successfully or not)
    pub fn is_evaluated(&self) -> bool {
        self.cell.initialized()
    }
}

impl<T> fmt::Debug for Lazy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lazy")
            .field("evaluated", &self.cell.initialized())
            .finish()
    }
}
