//! Credential store: durable mapping from identity identifier to enrollment
//! certificate.
//!
//! Safe for concurrent use across distinct identifiers; concurrent writes to
//! the same identifier are last-writer-wins, callers serialize updates to one
//! identity themselves. Entries are removed only by explicit [`UserStore::delete`],
//! never implicitly.

use crate::error::store::UserStoreError;
use crate::identity::{IdentityIdentifier, UserData};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::RwLock;

pub trait UserStore: Send + Sync {
    fn store(&self, user: &UserData) -> Result<(), UserStoreError>;

    /// Returns [`UserStoreError::UserNotFound`] when no credential exists
    /// under the identifier.
    fn load(&self, id: &IdentityIdentifier) -> Result<UserData, UserStoreError>;

    fn exists(&self, id: &IdentityIdentifier) -> Result<bool, UserStoreError>;

    fn delete(&self, id: &IdentityIdentifier) -> Result<(), UserStoreError>;
}

/// File-backed store: one `{name}@{msp_id}-cert.pem` per identity under the
/// configured directory.
pub struct CertFileUserStore {
    path: PathBuf,
}

impl CertFileUserStore {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, UserStoreError> {
        let path = path.into();
        crate::fs::create_dir_all(&path).map_err(UserStoreError::CreateStoreDirFailed)?;
        Ok(CertFileUserStore { path })
    }

    fn cert_path(&self, id: &IdentityIdentifier) -> PathBuf {
        self.path.join(format!("{}@{}-cert.pem", id.id, id.msp_id))
    }
}

impl UserStore for CertFileUserStore {
    fn store(&self, user: &UserData) -> Result<(), UserStoreError> {
        let path = self.cert_path(&user.id);
        crate::fs::write(&path, &user.enrollment_certificate).map_err(|err| {
            UserStoreError::WriteCredentialFailed {
                id: user.id.clone(),
                source: err,
            }
        })
    }

    fn load(&self, id: &IdentityIdentifier) -> Result<UserData, UserStoreError> {
        let path = self.cert_path(id);
        if !path.exists() {
            return Err(UserStoreError::UserNotFound(id.clone()));
        }
        let enrollment_certificate =
            crate::fs::read(&path).map_err(|err| UserStoreError::ReadCredentialFailed {
                id: id.clone(),
                source: err,
            })?;
        Ok(UserData {
            id: id.clone(),
            enrollment_certificate,
        })
    }

    fn exists(&self, id: &IdentityIdentifier) -> Result<bool, UserStoreError> {
        Ok(self.cert_path(id).exists())
    }

    fn delete(&self, id: &IdentityIdentifier) -> Result<(), UserStoreError> {
        let path = self.cert_path(id);
        if !path.exists() {
            return Err(UserStoreError::UserNotFound(id.clone()));
        }
        crate::fs::remove_file(&path).map_err(|err| UserStoreError::DeleteCredentialFailed {
            id: id.clone(),
            source: err,
        })
    }
}

/// In-memory store for tests and embedders that do not need durability.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<BTreeMap<IdentityIdentifier, Vec<u8>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for InMemoryUserStore {
    fn store(&self, user: &UserData) -> Result<(), UserStoreError> {
        self.users
            .write()
            .expect("user store lock poisoned")
            .insert(user.id.clone(), user.enrollment_certificate.clone());
        Ok(())
    }

    fn load(&self, id: &IdentityIdentifier) -> Result<UserData, UserStoreError> {
        self.users
            .read()
            .expect("user store lock poisoned")
            .get(id)
            .map(|cert| UserData {
                id: id.clone(),
                enrollment_certificate: cert.clone(),
            })
            .ok_or_else(|| UserStoreError::UserNotFound(id.clone()))
    }

    fn exists(&self, id: &IdentityIdentifier) -> Result<bool, UserStoreError> {
        Ok(self
            .users
            .read()
            .expect("user store lock poisoned")
            .contains_key(id))
    }

    fn delete(&self, id: &IdentityIdentifier) -> Result<(), UserStoreError> {
        self.users
            .write()
            .expect("user store lock poisoned")
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| UserStoreError::UserNotFound(id.clone()))
    }
}
