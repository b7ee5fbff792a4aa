// ── On-disk stores ──
//
// `FileDeviceStore` keeps the single "last connected TV" record as JSON.
// `KeyringTokenStore` keeps pairing tokens in the OS credential store.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use tvremote_core::{CoreError, Device, DeviceId, PairingTokenStore, PersistenceGateway};

const KEYRING_SERVICE: &str = "tvremote";

fn persistence_error(context: &str, err: impl std::fmt::Display) -> CoreError {
    CoreError::Persistence {
        message: format!("{context}: {err}"),
    }
}

// ── Last connected device ───────────────────────────────────────────

/// JSON file holding the last connected TV. Last write wins.
#[derive(Debug, Clone)]
pub struct FileDeviceStore {
    path: PathBuf,
}

impl FileDeviceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the platform data directory.
    pub fn default_location() -> Self {
        Self::new(crate::device_record_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PersistenceGateway for FileDeviceStore {
    fn save_connected_device(&self, device: &Device) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| persistence_error("create data dir", e))?;
        }
        let json = serde_json::to_vec_pretty(device)
            .map_err(|e| persistence_error("encode device", e))?;

        // Write then rename so a crash never leaves half a record.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| persistence_error("write device record", e))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| persistence_error("replace device record", e))?;
        debug!(path = %self.path.display(), device = %device.id, "device record saved");
        Ok(())
    }

    fn restore_connected_device(&self) -> Result<Option<Device>, CoreError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(persistence_error("read device record", e)),
        };
        let device = serde_json::from_slice(&bytes)
            .map_err(|e| persistence_error("decode device record", e))?;
        Ok(Some(device))
    }

    fn clear_connected_device(&self) -> Result<(), CoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(persistence_error("remove device record", e)),
        }
    }
}

// ── Pairing tokens ──────────────────────────────────────────────────

/// Pairing tokens in the system keyring, one entry per TV.
#[derive(Debug, Clone)]
pub struct KeyringTokenStore {
    service: String,
}

impl Default for KeyringTokenStore {
    fn default() -> Self {
        Self::new(KEYRING_SERVICE)
    }
}

impl KeyringTokenStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, device: &DeviceId) -> Result<keyring::Entry, CoreError> {
        keyring::Entry::new(&self.service, &format!("{device}/token"))
            .map_err(|e| persistence_error("open keyring entry", e))
    }
}

impl PairingTokenStore for KeyringTokenStore {
    fn load(&self, device: &DeviceId) -> Result<Option<SecretString>, CoreError> {
        match self.entry(device)?.get_password() {
            Ok(token) => Ok(Some(SecretString::from(token))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(persistence_error("read pairing token", e)),
        }
    }

    fn save(&self, device: &DeviceId, token: &SecretString) -> Result<(), CoreError> {
        self.entry(device)?
            .set_password(token.expose_secret())
            .map_err(|e| persistence_error("store pairing token", e))
    }

    fn remove(&self, device: &DeviceId) -> Result<(), CoreError> {
        match self.entry(device)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(persistence_error("remove pairing token", e)),
        }
    }
}
