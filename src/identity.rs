use crate::app_dirs::AppDirs;
use crate::error::IdentityError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Result<Self, IdentityError> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(IdentityError::BlankUser);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    User(UserId),
    Anonymous,
}

impl Identity {
    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Identity::User(id) => Some(id),
            Identity::Anonymous => None,
        }
    }
}

/// Answers who is practicing right now
pub trait IdentityProvider {
    fn current_user(&self) -> Identity;
}

/// Fixed identity, for embedding and tests
#[derive(Debug, Clone)]
pub struct StaticIdentity(pub Identity);

impl StaticIdentity {
    pub fn user(id: &str) -> Result<Self, IdentityError> {
        Ok(Self(Identity::User(UserId::new(id)?)))
    }

    pub fn anonymous() -> Self {
        Self(Identity::Anonymous)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Identity {
        self.0.clone()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredIdentity {
    user_id: UserId,
}

/// Remembers the logged-in user between runs in a small JSON file
#[derive(Debug, Clone)]
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::identity_path().unwrap_or_else(|| PathBuf::from("tazza_identity.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn login(&self, user: &str) -> Result<UserId, IdentityError> {
        let user_id = UserId::new(user)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(&StoredIdentity {
            user_id: user_id.clone(),
        })?;
        fs::write(&self.path, data)?;
        info!(user = %user_id, "logged in");
        Ok(user_id)
    }

    pub fn logout(&self) -> Result<(), IdentityError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("logged out");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn read(&self) -> Result<Option<UserId>, IdentityError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let stored: StoredIdentity = serde_json::from_slice(&bytes)?;
        Ok(Some(stored.user_id))
    }
}

impl IdentityProvider for FileIdentityStore {
    fn current_user(&self) -> Identity {
        match self.read() {
            Ok(Some(user_id)) => Identity::User(user_id),
            Ok(None) => Identity::Anonymous,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable identity file");
                Identity::Anonymous
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn test_blank_user_rejected() {
        assert_matches!(UserId::new("   "), Err(IdentityError::BlankUser));
        assert_eq!(UserId::new(" neo ").unwrap().as_str(), "neo");
    }

    #[test]
    fn test_missing_file_is_anonymous() {
        let dir = tempdir().unwrap();
        let store = FileIdentityStore::with_path(dir.path().join("identity.json"));

        assert_eq!(store.current_user(), Identity::Anonymous);
    }

    #[test]
    fn test_login_then_logout() {
        let dir = tempdir().unwrap();
        let store = FileIdentityStore::with_path(dir.path().join("nested").join("identity.json"));

        let user = store.login("trinity").unwrap();
        assert_eq!(store.current_user(), Identity::User(user));

        store.logout().unwrap();
        assert_eq!(store.current_user(), Identity::Anonymous);

        // logging out twice is fine
        store.logout().unwrap();
    }

    #[test]
    fn test_corrupt_file_is_anonymous() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("identity.json");
        std::fs::write(&path, "{ broken").unwrap();

        let store = FileIdentityStore::with_path(&path);
        assert_eq!(store.current_user(), Identity::Anonymous);
    }

    #[test]
    fn test_static_identity() {
        let anon = StaticIdentity::anonymous();
        assert_eq!(anon.current_user().user_id(), None);

        let user = StaticIdentity::user("morpheus").unwrap();
        assert_eq!(user.current_user().user_id().unwrap().as_str(), "morpheus");
    }
}
