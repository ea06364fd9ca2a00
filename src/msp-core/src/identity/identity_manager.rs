//! Translates between stored credentials and usable signing identities.
//!
//! Construction of a [`User`] is separate from persisting one: the CA client
//! validates a freshly issued certificate through [`IdentityManager::new_user`]
//! *before* anything touches the credential store, so a malformed CA response
//! can never corrupt it.

use crate::crypto::CryptoSuite;
use crate::error::identity::IdentityError;
use crate::error::store::UserStoreError;
use crate::identity::{decode_enrollment_certificate, IdentityIdentifier, User, UserData};
use crate::identity::user_store::UserStore;
use slog::{debug, Logger};
use std::sync::Arc;

pub struct IdentityManager {
    msp_id: String,
    user_store: Arc<dyn UserStore>,
    crypto_suite: Arc<dyn CryptoSuite>,
    logger: Logger,
}

impl IdentityManager {
    pub fn new(
        msp_id: impl Into<String>,
        user_store: Arc<dyn UserStore>,
        crypto_suite: Arc<dyn CryptoSuite>,
        logger: Logger,
    ) -> Self {
        IdentityManager {
            msp_id: msp_id.into(),
            user_store,
            crypto_suite,
            logger,
        }
    }

    pub fn msp_id(&self) -> &str {
        &self.msp_id
    }

    /// Builds a `User` from a credential, checking that the certificate's
    /// public key matches the key the crypto suite resolves for its SKI.
    pub fn new_user(&self, user_data: &UserData) -> Result<User, IdentityError> {
        let decoded = decode_enrollment_certificate(&user_data.enrollment_certificate)?;

        let key = self
            .crypto_suite
            .get_key(&decoded.ski)
            .map_err(|err| IdentityError::ResolveKeyFailed {
                id: user_data.id.clone(),
                source: err,
            })?;
        let suite_point =
            self.crypto_suite
                .public_key(&key)
                .map_err(|err| IdentityError::ResolveKeyFailed {
                    id: user_data.id.clone(),
                    source: err,
                })?;
        if suite_point != decoded.public_point {
            return Err(IdentityError::CertKeyMismatch(user_data.id.clone()));
        }

        Ok(User::new(
            user_data.id.clone(),
            user_data.enrollment_certificate.clone(),
            key,
            Arc::clone(&self.crypto_suite),
        ))
    }

    /// Loads and validates a stored identity. Always re-reads the store; no
    /// identity cache is kept, so reenrollment or external revocation is
    /// never masked by stale state.
    pub fn get_signing_identity(&self, id: &IdentityIdentifier) -> Result<User, IdentityError> {
        let user_data = self.user_store.load(id).map_err(|err| match err {
            UserStoreError::UserNotFound(id) => IdentityError::UserNotFound(id),
            other => IdentityError::LoadCredentialFailed {
                id: id.clone(),
                source: other,
            },
        })?;
        self.new_user(&user_data)
    }

    /// Validates, then persists, a credential. The store is only written
    /// once `new_user` has accepted the certificate.
    pub fn create_identity(&self, user_data: &UserData) -> Result<User, IdentityError> {
        let user = self.new_user(user_data)?;
        self.user_store
            .store(user_data)
            .map_err(|err| IdentityError::StoreCredentialFailed {
                id: user_data.id.clone(),
                source: err,
            })?;
        debug!(self.logger, "stored identity '{}'", user_data.id);
        Ok(user)
    }
}
