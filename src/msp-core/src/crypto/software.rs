//! Software crypto suite backed by a directory of PKCS#8 PEM key files.
//!
//! Keys are filed by SKI as `{ski}_sk.pem` with owner-only permissions. A new
//! suite instance over the same directory resolves previously generated keys,
//! which is what lets a stored credential's key reference survive process
//! restarts.

use crate::crypto::{CryptoSuite, KeyRef, Ski};
use crate::error::crypto::CryptoError;
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use p256::SecretKey;
use rand_core::OsRng;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

pub struct SoftwareCryptoSuite {
    key_store_path: PathBuf,
}

impl SoftwareCryptoSuite {
    /// Fails if the key store directory cannot be created; this is the one
    /// construction-time fatal error in the subsystem.
    pub fn new(key_store_path: impl Into<PathBuf>) -> Result<Self, CryptoError> {
        let key_store_path = key_store_path.into();
        crate::fs::create_dir_all(&key_store_path)
            .map_err(|err| CryptoError::CreateKeyStoreFailed(key_store_path.clone(), err))?;
        Ok(SoftwareCryptoSuite { key_store_path })
    }

    fn key_path(&self, ski: &Ski) -> PathBuf {
        self.key_store_path.join(format!("{}_sk.pem", ski.to_hex()))
    }

    fn load_secret_key(&self, ski: &Ski) -> Result<SecretKey, CryptoError> {
        let path = self.key_path(ski);
        if !path.exists() {
            return Err(CryptoError::KeyNotFound(ski.to_hex()));
        }
        let pem = crate::fs::read_to_string(&path).map_err(CryptoError::ReadKeyStoreFailed)?;
        SecretKey::from_pkcs8_pem(&pem).map_err(|err| CryptoError::DecodePrivateKeyFailed(path, err))
    }

    fn key_pem(&self, ski: &Ski) -> Result<String, CryptoError> {
        let path = self.key_path(ski);
        if !path.exists() {
            return Err(CryptoError::KeyNotFound(ski.to_hex()));
        }
        crate::fs::read_to_string(&path).map_err(CryptoError::ReadKeyStoreFailed)
    }
}

/// SKI of a public key: SHA-256 over the uncompressed SEC1 point.
pub fn ski_from_public_point(point: &[u8]) -> Ski {
    let digest: [u8; 32] = Sha256::digest(point).into();
    Ski::from_bytes(digest)
}

fn write_key(path: &Path, pem: &str) -> Result<(), CryptoError> {
    crate::fs::write_secret(path, pem.as_bytes())
        .map_err(|err| CryptoError::PersistKeyFailed(path.to_path_buf(), err))
}

impl CryptoSuite for SoftwareCryptoSuite {
    fn key_gen(&self) -> Result<KeyRef, CryptoError> {
        let secret_key = SecretKey::random(&mut OsRng);
        let point = secret_key.public_key().to_encoded_point(false);
        let ski = ski_from_public_point(point.as_bytes());

        let pem = secret_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(CryptoError::EncodePrivateKeyFailed)?;
        write_key(&self.key_path(&ski), &pem)?;

        Ok(KeyRef::new(ski))
    }

    fn get_key(&self, ski: &Ski) -> Result<KeyRef, CryptoError> {
        if !self.key_path(ski).exists() {
            return Err(CryptoError::KeyNotFound(ski.to_hex()));
        }
        Ok(KeyRef::new(ski.clone()))
    }

    fn public_key(&self, key: &KeyRef) -> Result<Vec<u8>, CryptoError> {
        let secret_key = self.load_secret_key(key.ski())?;
        Ok(secret_key
            .public_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec())
    }

    fn sign(&self, key: &KeyRef, digest: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let secret_key = self.load_secret_key(key.ski())?;
        let signing_key = SigningKey::from(&secret_key);
        let signature: Signature = signing_key
            .sign_prehash(digest)
            .map_err(|err| CryptoError::SignFailed(key.ski().to_hex(), err))?;
        Ok(signature.to_der().as_bytes().to_vec())
    }

    fn verify(
        &self,
        public_key: &[u8],
        digest: &[u8],
        signature: &[u8],
    ) -> Result<bool, CryptoError> {
        let verifying_key =
            VerifyingKey::from_sec1_bytes(public_key).map_err(CryptoError::MalformedPublicKey)?;
        let signature = Signature::from_der(signature).map_err(CryptoError::MalformedSignature)?;
        Ok(verifying_key.verify_prehash(digest, &signature).is_ok())
    }

    fn hash(&self, message: &[u8]) -> [u8; 32] {
        Sha256::digest(message).into()
    }

    fn create_csr(&self, key: &KeyRef, common_name: &str) -> Result<String, CryptoError> {
        let pem = self.key_pem(key.ski())?;
        let key_pair = rcgen::KeyPair::from_pem(&pem).map_err(CryptoError::CsrGenerationFailed)?;

        let mut params = rcgen::CertificateParams::new(Vec::<String>::new())
            .map_err(CryptoError::CsrGenerationFailed)?;
        params
            .distinguished_name
            .push(rcgen::DnType::CommonName, common_name);

        let csr = params
            .serialize_request(&key_pair)
            .map_err(CryptoError::CsrGenerationFailed)?;
        csr.pem().map_err(CryptoError::CsrGenerationFailed)
    }
}
