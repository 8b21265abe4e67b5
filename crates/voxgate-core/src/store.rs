// ── Persistent account store ─────────────────────────────────────────
//
// One versioned JSON document per account, written as
// `{dir}/akuvox_data` in the embedding platform's storage convention:
// an envelope of {version, minor_version, key, data} around a flat
// string-keyed mapping. Every write is load-modify-save through a
// sibling temp file and an atomic rename. A missing file, a missing
// key, or an unreadable document all mean "no prior value", never an
// error; only write failures surface.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

use crate::model::DeviceSnapshot;
use voxgate_api::models::DoorLogEntry;

/// Fixed document key; doubles as the file name.
pub const STORE_KEY: &str = "akuvox_data";

const STORE_VERSION: u32 = 1;
const STORE_MINOR_VERSION: u32 = 1;

/// Well-known keys inside the flat mapping.
pub mod keys {
    pub const SUBDOMAIN: &str = "subdomain";
    pub const WAIT_FOR_IMAGE_URL: &str = "wait_for_image_url";
    pub const LATEST_DOOR_LOG: &str = "latest_door_log";
    pub const LAST_POLLING_TIME: &str = "last_polling_time";
    pub const CAMERA_DATA: &str = "camera_data";
    pub const DOOR_RELAY_DATA: &str = "door_relay_data";
    pub const DOOR_KEYS_DATA: &str = "door_keys_data";
    pub const HOST: &str = "host";
    pub const TOKEN: &str = "token";
    pub const AUTH_TOKEN: &str = "auth_token";
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// On-disk envelope.
#[derive(Debug, Serialize, Deserialize)]
struct Document {
    version: u32,
    minor_version: u32,
    key: String,
    data: Map<String, Value>,
}

/// Flat key-value store persisted as one versioned JSON file.
///
/// Cloning is cheap; clones share the same path and therefore the same
/// document. Concurrent writers are not coordinated here: within one
/// account, writes come from the session setup path or from the single
/// watcher task, never both at once.
#[derive(Debug, Clone)]
pub struct AccountStore {
    path: PathBuf,
}

impl AccountStore {
    /// Store rooted in `dir`. The directory is created on first save.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(STORE_KEY),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the full mapping. Any failure to read or parse yields an
    /// empty mapping.
    pub async fn load(&self) -> Map<String, Value> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(_) => return Map::new(),
        };
        match serde_json::from_str::<Document>(&content) {
            Ok(doc) if doc.version == STORE_VERSION => doc.data,
            Ok(doc) => {
                warn!(version = doc.version, "unsupported store version, starting fresh");
                Map::new()
            }
            Err(err) => {
                warn!(error = %err, path = %self.path.display(), "unreadable store file, starting fresh");
                Map::new()
            }
        }
    }

    /// Replace the mapping on disk via a temp file and atomic rename.
    pub async fn save(&self, data: Map<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let document = Document {
            version: STORE_VERSION,
            minor_version: STORE_MINOR_VERSION,
            key: STORE_KEY.to_owned(),
            data,
        };
        let content = serde_json::to_string_pretty(&document)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), "account store saved");
        Ok(())
    }

    /// Read one key into `T`. Missing key or mismatched shape is `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let data = self.load().await;
        let value = data.get(key)?.clone();
        serde_json::from_value(value).ok()
    }

    /// Write one key, preserving all others (load-modify-save).
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let mut data = self.load().await;
        data.insert(key.to_owned(), serde_json::to_value(value)?);
        self.save(data).await
    }

    // ── Well-known keys ──────────────────────────────────────────────

    /// Persisted regional subdomain, if a previous run resolved one.
    pub async fn subdomain(&self) -> Option<String> {
        self.get(keys::SUBDOMAIN).await
    }

    /// Whether door events should wait for the snapshot URL.
    /// Missing means no waiting.
    pub async fn wait_for_image(&self) -> bool {
        self.get(keys::WAIT_FOR_IMAGE_URL).await.unwrap_or(false)
    }

    /// The last door-log entry the watcher saw.
    pub async fn latest_door_log(&self) -> Option<DoorLogEntry> {
        self.get(keys::LATEST_DOOR_LOG).await
    }

    pub async fn set_latest_door_log(&self, entry: &DoorLogEntry) -> Result<(), StoreError> {
        self.set(keys::LATEST_DOOR_LOG, entry).await
    }

    /// Epoch seconds of the watcher's last heartbeat.
    pub async fn last_polling_time(&self) -> Option<f64> {
        self.get(keys::LAST_POLLING_TIME).await
    }

    pub async fn record_polling_heartbeat(&self, epoch_secs: f64) -> Result<(), StoreError> {
        self.set(keys::LAST_POLLING_TIME, &epoch_secs).await
    }

    /// Write the whole device snapshot in one save.
    pub async fn persist_snapshot(&self, snapshot: &DeviceSnapshot) -> Result<(), StoreError> {
        let mut data = self.load().await;
        data.insert(keys::HOST.to_owned(), Value::String(snapshot.host.clone()));
        data.insert(keys::TOKEN.to_owned(), Value::String(snapshot.token.clone()));
        data.insert(
            keys::AUTH_TOKEN.to_owned(),
            Value::String(snapshot.auth_token.clone()),
        );
        data.insert(
            keys::CAMERA_DATA.to_owned(),
            serde_json::to_value(&snapshot.camera_data)?,
        );
        data.insert(
            keys::DOOR_RELAY_DATA.to_owned(),
            serde_json::to_value(&snapshot.door_relay_data)?,
        );
        data.insert(
            keys::DOOR_KEYS_DATA.to_owned(),
            serde_json::to_value(&snapshot.door_keys_data)?,
        );
        self.save(data).await
    }

    /// Read the device snapshot back, defaulting any missing piece.
    pub async fn device_snapshot(&self) -> DeviceSnapshot {
        let data = self.load().await;
        DeviceSnapshot {
            host: read_field(&data, keys::HOST),
            token: read_field(&data, keys::TOKEN),
            auth_token: read_field(&data, keys::AUTH_TOKEN),
            camera_data: read_field(&data, keys::CAMERA_DATA),
            door_relay_data: read_field(&data, keys::DOOR_RELAY_DATA),
            door_keys_data: read_field(&data, keys::DOOR_KEYS_DATA),
        }
    }
}

fn read_field<T: DeserializeOwned + Default>(data: &Map<String, Value>, key: &str) -> T {
    data.get(key)
        .cloned()
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default()
}
