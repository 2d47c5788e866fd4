use crate::domain::ports::LocalStore;
use crate::error::{CartError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;

/// Column Family holding device-local key/value pairs (cart snapshot, identity).
pub const CF_LOCAL: &str = "local";

/// A persistent `LocalStore` backed by RocksDB.
///
/// Lets the anonymous cart and the stored identity survive process restarts,
/// the way browser storage survives a page reload.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbLocalStore {
    db: Arc<DB>,
}

impl RocksDbLocalStore {
    /// Opens or creates a RocksDB instance at `path`, ensuring the local
    /// column family exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_local = ColumnFamilyDescriptor::new(CF_LOCAL, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_local]).map_err(storage_error)?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(CF_LOCAL)
            .ok_or_else(|| CartError::StorageError("Local column family not found".to_string()))
    }
}

fn storage_error(error: rocksdb::Error) -> CartError {
    CartError::StorageError(error.to_string())
}

#[async_trait]
impl LocalStore for RocksDbLocalStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let cf = self.cf()?;
        match self.db.get_cf(cf, key.as_bytes()).map_err(storage_error)? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| CartError::StorageError(format!("Value for {key} is not UTF-8: {e}"))),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let cf = self.cf()?;
        self.db
            .put_cf(cf, key.as_bytes(), value.as_bytes())
            .map_err(storage_error)
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let cf = self.cf()?;
        self.db.delete_cf(cf, key.as_bytes()).map_err(storage_error)
    }
}
