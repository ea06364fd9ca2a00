//! Identity and credential lifecycle for a permissioned-ledger client SDK.
//!
//! The crate is organized around three collaborators:
//!
//! - [`ca::CaClient`] speaks the certificate authority's REST protocol
//!   (enroll, reenroll, register, revoke) over a pluggable
//!   [`ca::transport::CaTransport`].
//! - [`identity::IdentityManager`] turns stored credentials into validated
//!   signing identities, backed by a pluggable [`identity::UserStore`].
//! - [`crypto::CryptoSuite`] owns all private key material; everyone else
//!   holds opaque key references.

pub mod ca;
pub mod config;
pub mod crypto;
pub mod error;
pub mod fs;
pub mod identity;

#[cfg(test)]
pub(crate) mod test_fixture;
