use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use redis::Commands;

use crate::config::AppConfig;
use crate::error::StoreError;
use crate::models::email_models::EmailRecord;

pub const EMAILS_KEY: &str = "emails";

pub type RedisPool = r2d2::Pool<redis::Client>;

/// Append-only list of captured emails.
#[cfg_attr(test, mockall::automock)]
pub trait EmailStore: Send + Sync {
    /// Returns the name of the store that kept the record.
    fn append(&self, record: &EmailRecord) -> Result<&'static str, StoreError>;
    fn list(&self) -> Result<Vec<EmailRecord>, StoreError>;
    fn name(&self) -> &'static str;
}

/// One JSON `{email, createdAt}` string per list entry.
pub fn encode_record(record: &EmailRecord) -> Result<String, StoreError> {
    Ok(serde_json::to_string(record)?)
}

/// Parses raw list entries, skipping anything that is not a full record.
pub fn decode_entries(raw: &[String]) -> Vec<EmailRecord> {
    raw.iter()
        .filter_map(|entry| match serde_json::from_str(entry) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Skipping malformed email entry: {}", e);
                None
            }
        })
        .collect()
}

/// A key found by pattern scan and its string value, if it has one.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValue {
    pub key: String,
    pub value: Option<String>,
}

/// Redis list under [`EMAILS_KEY`], one JSON record per entry.
pub struct RedisEmailStore {
    pool: RedisPool,
}

impl RedisEmailStore {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    /// Builds a lazily connecting pool; nothing touches the network until the first append.
    pub fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let pool = r2d2::Pool::builder()
            .max_size(4)
            .min_idle(Some(0))
            .connection_timeout(Duration::from_secs(3))
            .build_unchecked(client);
        Ok(Self::new(pool))
    }

    /// Every entry under [`EMAILS_KEY`] as stored, parseable or not.
    pub fn list_raw(&self) -> Result<Vec<String>, StoreError> {
        let mut conn = self.pool.get()?;
        let raw: Vec<String> = conn.lrange(EMAILS_KEY, 0, -1)?;
        Ok(raw)
    }

    /// Keys matching `pattern` with their `GET` values. Non-string keys get no value.
    pub fn scan_values(&self, pattern: &str) -> Result<Vec<KeyValue>, StoreError> {
        let mut conn = self.pool.get()?;
        let keys: Vec<String> = conn.scan_match::<_, String>(pattern)?.collect();
        let mut found = Vec::with_capacity(keys.len());
        for key in keys {
            let value = match conn.get::<_, Option<String>>(&key) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!("Could not GET {}: {}", key, e);
                    None
                }
            };
            found.push(KeyValue { key, value });
        }
        Ok(found)
    }
}

impl EmailStore for RedisEmailStore {
    fn append(&self, record: &EmailRecord) -> Result<&'static str, StoreError> {
        let mut conn = self.pool.get()?;
        let _: i64 = conn.rpush(EMAILS_KEY, encode_record(record)?)?;
        Ok(self.name())
    }

    fn list(&self) -> Result<Vec<EmailRecord>, StoreError> {
        Ok(decode_entries(&self.list_raw()?))
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

/// Pretty-printed JSON array on local disk.
///
/// Appends are read-modify-write. Two concurrent submissions can both read the
/// same array and the later write wins, losing one record.
pub struct FileEmailStore {
    path: PathBuf,
}

impl FileEmailStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries as stored. Missing, unreadable or non-array contents read as empty.
    pub fn read_entries(&self) -> Vec<serde_json::Value> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_str::<serde_json::Value>(&contents) {
            Ok(serde_json::Value::Array(entries)) => entries,
            Ok(_) => {
                tracing::warn!("{} does not hold a JSON array, starting over", self.path.display());
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("{} is not valid JSON ({}), starting over", self.path.display(), e);
                Vec::new()
            }
        }
    }
}

impl EmailStore for FileEmailStore {
    fn append(&self, record: &EmailRecord) -> Result<&'static str, StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let mut entries = self.read_entries();
        entries.push(serde_json::to_value(record)?);
        let body = serde_json::to_string_pretty(&entries)?;
        fs::write(&self.path, body)?;
        Ok(self.name())
    }

    fn list(&self) -> Result<Vec<EmailRecord>, StoreError> {
        Ok(self
            .read_entries()
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// Stands in for the file store on read-only deployments.
pub struct ReadOnlyEmailStore;

impl EmailStore for ReadOnlyEmailStore {
    fn append(&self, _record: &EmailRecord) -> Result<&'static str, StoreError> {
        Err(StoreError::ReadOnly)
    }

    fn list(&self) -> Result<Vec<EmailRecord>, StoreError> {
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        "read-only"
    }
}

/// Tries `primary` first and degrades to `fallback` when it fails.
pub struct FallbackEmailStore {
    primary: Box<dyn EmailStore>,
    fallback: Box<dyn EmailStore>,
}

impl FallbackEmailStore {
    pub fn new(primary: Box<dyn EmailStore>, fallback: Box<dyn EmailStore>) -> Self {
        Self { primary, fallback }
    }
}

impl EmailStore for FallbackEmailStore {
    fn append(&self, record: &EmailRecord) -> Result<&'static str, StoreError> {
        match self.primary.append(record) {
            Ok(name) => Ok(name),
            Err(e) => {
                tracing::warn!(
                    "{} store append failed ({}), trying {} store",
                    self.primary.name(),
                    e,
                    self.fallback.name()
                );
                // Report the primary failure if the fallback cannot take the record either
                self.fallback.append(record).map_err(|fallback_err| {
                    tracing::error!("{} store append failed too: {}", self.fallback.name(), fallback_err);
                    e
                })
            }
        }
    }

    // Records that degraded into the fallback are still listed while the primary is down
    fn list(&self) -> Result<Vec<EmailRecord>, StoreError> {
        match self.primary.list() {
            Ok(mut records) => {
                records.extend(self.fallback.list()?);
                Ok(records)
            }
            Err(e) => {
                tracing::warn!(
                    "{} store list failed ({}), listing {} store only",
                    self.primary.name(),
                    e,
                    self.fallback.name()
                );
                self.fallback.list().map_err(|fallback_err| {
                    tracing::error!("{} store list failed too: {}", self.fallback.name(), fallback_err);
                    e
                })
            }
        }
    }

    fn name(&self) -> &'static str {
        self.primary.name()
    }
}

/// Picks the store for this deployment: redis when configured, the local file otherwise.
pub fn build_email_store(config: &AppConfig) -> Result<Arc<dyn EmailStore>, StoreError> {
    let local: Box<dyn EmailStore> = if config.read_only_fs {
        Box::new(ReadOnlyEmailStore)
    } else {
        Box::new(FileEmailStore::new(config.emails_file.clone()))
    };

    match config.redis_url.as_deref() {
        Some(url) => {
            let redis = RedisEmailStore::connect(url)?;
            Ok(Arc::new(FallbackEmailStore::new(Box::new(redis), local)))
        }
        None => {
            if config.read_only_fs {
                tracing::warn!("Read-only filesystem and no REDIS_URL, email submissions will fail");
            }
            Ok(Arc::from(local))
        }
    }
}
