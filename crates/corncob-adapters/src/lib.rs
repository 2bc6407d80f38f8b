//! Concrete `StorageAdapter` implementations for the CornCob sync protocol.
//!
//! ## Modules
//!
//! - [`local`] - local folder adapter, used for tests and single-machine demos
//! - [`s3`] - S3 (or S3-compatible) object storage, SigV4-signed
//! - [`gdrive`] - Google Drive `appDataFolder`
//! - [`dropbox`] - Dropbox app-folder
//! - [`smallsea`] - hub-relay zone for the SmallSea session-sharing backend
//! - [`oauth`] - shared OAuth2 PKCE flow + keyring token storage for the
//!   Drive/Dropbox adapters

pub mod dropbox;
pub mod gdrive;
pub mod local;
pub mod oauth;
pub mod s3;
pub mod sigv4;
pub mod smallsea;
