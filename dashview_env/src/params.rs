//! Persisted key-value settings.
//!
//! Values are stored as UTF-8 strings; booleans are `"1"`/`"0"`.

use crate::error::EnvError;
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use tracing::warn;

/// Settings read by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKey {
    /// Display speeds in km/h
    IsMetric,
    /// Preview mode: go onroad without ignition
    IsOpenpilotViewEnabled,
    EndToEndToggle,
    EnableWideCamera,
    HasPrime,
    /// Minutes of inactivity before the onroad screen dims (0 = disabled)
    AutoScreenOff,
    /// Brightness percentage used once the screen dims
    BrightnessOff,
}

impl ParamKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKey::IsMetric => "IsMetric",
            ParamKey::IsOpenpilotViewEnabled => "IsOpenpilotViewEnabled",
            ParamKey::EndToEndToggle => "EndToEndToggle",
            ParamKey::EnableWideCamera => "EnableWideCamera",
            ParamKey::HasPrime => "HasPrime",
            ParamKey::AutoScreenOff => "AutoScreenOff",
            ParamKey::BrightnessOff => "BrightnessOff",
        }
    }
}

/// Read/write access to persisted settings.
///
/// The UI only reads; `put` exists for provisioning and tests.
pub trait ParamStore: Send + Sync {
    /// Raw value for `key`, `None` if unset.
    fn get(&self, key: ParamKey) -> Result<Option<String>, EnvError>;

    /// Stores `value` under `key`.
    fn put(&self, key: ParamKey, value: &str) -> Result<(), EnvError>;

    /// Boolean view of `key`. Unset or unreadable values read as `false`.
    fn get_bool(&self, key: ParamKey) -> bool {
        match self.get(key) {
            Ok(value) => value.as_deref().map(str::trim) == Some("1"),
            Err(e) => {
                warn!("failed to read {}: {}", key.as_str(), e);
                false
            }
        }
    }

    /// Integer view of `key`. Unset, unparsable or unreadable values read as 0.
    fn get_int(&self, key: ParamKey) -> i32 {
        match self.get(key) {
            Ok(value) => value.and_then(|v| v.trim().parse().ok()).unwrap_or(0),
            Err(e) => {
                warn!("failed to read {}: {}", key.as_str(), e);
                0
            }
        }
    }

    fn put_bool(&self, key: ParamKey, value: bool) -> Result<(), EnvError> {
        self.put(key, if value { "1" } else { "0" })
    }
}

/// In-memory parameter store for simulation and tests.
#[derive(Default)]
pub struct MemoryParams {
    values: RwLock<HashMap<ParamKey, String>>,
}

impl MemoryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(self, key: ParamKey, value: impl Into<String>) -> Self {
        if let Ok(mut values) = self.values.write() {
            values.insert(key, value.into());
        }
        self
    }
}

impl ParamStore for MemoryParams {
    fn get(&self, key: ParamKey) -> Result<Option<String>, EnvError> {
        let values = self
            .values
            .read()
            .map_err(|_| EnvError::param("parameter map poisoned"))?;
        Ok(values.get(&key).cloned())
    }

    fn put(&self, key: ParamKey, value: &str) -> Result<(), EnvError> {
        let mut values = self
            .values
            .write()
            .map_err(|_| EnvError::param("parameter map poisoned"))?;
        values.insert(key, value.to_string());
        Ok(())
    }
}

/// Parameter store persisted in a sled database.
pub struct SledParams {
    db: sled::Db,
}

impl SledParams {
    /// Opens (or creates) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EnvError> {
        Ok(Self {
            db: sled::open(path)?,
        })
    }

    /// Opens a throwaway database that is removed on drop.
    pub fn temporary() -> Result<Self, EnvError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }
}

impl ParamStore for SledParams {
    fn get(&self, key: ParamKey) -> Result<Option<String>, EnvError> {
        let value = self.db.get(key.as_str())?;
        Ok(value.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    fn put(&self, key: ParamKey, value: &str) -> Result<(), EnvError> {
        self.db.insert(key.as_str(), value.as_bytes())?;
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_params_bool_and_int() {
        let params = MemoryParams::new()
            .with(ParamKey::IsMetric, "1")
            .with(ParamKey::AutoScreenOff, "3")
            .with(ParamKey::BrightnessOff, "not a number");

        assert!(params.get_bool(ParamKey::IsMetric));
        assert!(!params.get_bool(ParamKey::HasPrime));
        assert_eq!(params.get_int(ParamKey::AutoScreenOff), 3);
        assert_eq!(params.get_int(ParamKey::BrightnessOff), 0);
    }

    #[test]
    fn test_memory_params_put() {
        let params = MemoryParams::new();
        params.put_bool(ParamKey::EndToEndToggle, true).unwrap();
        assert!(params.get_bool(ParamKey::EndToEndToggle));

        params.put_bool(ParamKey::EndToEndToggle, false).unwrap();
        assert!(!params.get_bool(ParamKey::EndToEndToggle));
    }

    #[test]
    fn test_sled_params_roundtrip() {
        let params = SledParams::temporary().unwrap();

        assert_eq!(params.get(ParamKey::EnableWideCamera).unwrap(), None);
        params.put_bool(ParamKey::EnableWideCamera, true).unwrap();
        params.put(ParamKey::BrightnessOff, "40").unwrap();

        assert!(params.get_bool(ParamKey::EnableWideCamera));
        assert_eq!(params.get_int(ParamKey::BrightnessOff), 40);
    }
}
