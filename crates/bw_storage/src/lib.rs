use async_trait::async_trait;
use bw_core::{Error, Result, Storage};
use std::sync::Arc;
use tracing::info;

pub mod backends;

pub use backends::*;

#[async_trait]
pub trait StorageBackend: Storage + Sized {
    /// Short name used on the command line and in logs
    fn backend_name() -> &'static str;

    /// Open the backend. `url` is backend specific and optional.
    async fn connect(url: Option<&str>) -> Result<Self>;
}

/// Names accepted by [`create_storage`].
pub fn available_backends() -> Vec<&'static str> {
    let mut names = vec![MemoryStorage::backend_name()];
    #[cfg(feature = "sqlite")]
    names.push(SQLiteStorage::backend_name());
    names
}

pub async fn create_storage(kind: &str, url: Option<&str>) -> Result<Arc<dyn Storage>> {
    let storage: Arc<dyn Storage> = match kind {
        "memory" => Arc::new(MemoryStorage::connect(url).await?),
        #[cfg(feature = "sqlite")]
        "sqlite" => Arc::new(SQLiteStorage::connect(url).await?),
        other => {
            return Err(Error::Config(format!(
                "Unknown storage backend '{}' (available: {})",
                other,
                available_backends().join(", ")
            )))
        }
    };
    info!("💾 Storage backend ready (using {})", kind);
    Ok(storage)
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_storage, StorageBackend};
}
