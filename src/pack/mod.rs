//! Bundle production: everything between a source directory and an
//! encrypted, manifested artifact
//!
//! - **locator**: find source files (extension pair, or `<key>_<index>` groups)
//! - **archive**: deterministic zip via the `zip` binary
//! - **digest**: SHA-256 and size of any file
//! - **cipher**: PBKDF2 passphrase encryption via `openssl enc`
//! - **manifest**: two-phase text record per bundle
//! - **passphrase**: ordered provider chain for the secret
//! - **tool**: isolated invocation of external binaries
//!
//! Nothing in here touches version control.

pub mod archive;
pub mod cipher;
pub mod digest;
pub mod locator;
pub mod manifest;
pub mod passphrase;
pub mod tool;
