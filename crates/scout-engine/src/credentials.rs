//! Local persistence for the Help Scout app credentials.
//!
//! Credentials live in the operating system keychain under a single
//! service name, never in config files or the HTTP surface.

use anyhow::Result;
use serde::{Deserialize, Serialize};

const SERVICE: &str = "scout-export";
const APP_ID_ACCOUNT: &str = "helpscout_app_id";
const APP_SECRET_ACCOUNT: &str = "helpscout_app_secret";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub app_id: String,
    pub app_secret: String,
}

pub trait CredentialStore: Send + Sync {
    fn save(&self, credentials: &Credentials) -> Result<()>;
    fn load(&self) -> Result<Option<Credentials>>;
    fn clear(&self) -> Result<()>;
}

/// Keychain-backed store. Both halves are written as separate entries so
/// a partial save is detectable as a missing pair on load.
pub struct KeyringStore;

impl KeyringStore {
    fn entry(account: &str) -> Result<keyring::Entry> {
        Ok(keyring::Entry::new(SERVICE, account)?)
    }

    fn read(account: &str) -> Result<Option<String>> {
        match Self::entry(account)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn delete(account: &str) -> Result<()> {
        match Self::entry(account)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl CredentialStore for KeyringStore {
    fn save(&self, credentials: &Credentials) -> Result<()> {
        Self::entry(APP_ID_ACCOUNT)?.set_password(&credentials.app_id)?;
        Self::entry(APP_SECRET_ACCOUNT)?.set_password(&credentials.app_secret)?;
        Ok(())
    }

    fn load(&self) -> Result<Option<Credentials>> {
        let app_id = Self::read(APP_ID_ACCOUNT)?;
        let app_secret = Self::read(APP_SECRET_ACCOUNT)?;
        Ok(match (app_id, app_secret) {
            (Some(app_id), Some(app_secret)) => Some(Credentials { app_id, app_secret }),
            _ => None,
        })
    }

    fn clear(&self) -> Result<()> {
        Self::delete(APP_ID_ACCOUNT)?;
        Self::delete(APP_SECRET_ACCOUNT)?;
        Ok(())
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStore {
    inner: std::sync::Mutex<Option<Credentials>>,
}

impl CredentialStore for MemoryStore {
    fn save(&self, credentials: &Credentials) -> Result<()> {
        *self.inner.lock().unwrap() = Some(credentials.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<Credentials>> {
        Ok(self.inner.lock().unwrap().clone())
    }

    fn clear(&self) -> Result<()> {
        *self.inner.lock().unwrap() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::default();
        assert!(store.load().unwrap().is_none());

        let credentials = Credentials {
            app_id: "abc".to_string(),
            app_secret: "shh".to_string(),
        };
        store.save(&credentials).unwrap();
        assert_eq!(store.load().unwrap(), Some(credentials));
    }

    #[test]
    fn test_memory_store_clear() {
        let store = MemoryStore::default();
        store
            .save(&Credentials {
                app_id: "abc".to_string(),
                app_secret: "shh".to_string(),
            })
            .unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }
}
