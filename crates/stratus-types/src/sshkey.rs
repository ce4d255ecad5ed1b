// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! SSH key generation.

use base64::Engine;
use rand::rngs::OsRng;
use ssh_key::{Algorithm, PrivateKey};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyGenError {
    #[error("failed to generate an Ed25519 key pair: {0}")]
    Generate(#[source] ssh_key::Error),

    #[error("failed to encode the generated public key: {0}")]
    Encode(#[source] ssh_key::Error),
}

/// Generates a new Ed25519 key pair and returns the base64 encoding of its
/// OpenSSH authorized-keys line (including the trailing newline).
///
/// The private half is discarded; machines are expected to be reached
/// through other means unless the user supplies their own key.
pub fn generate_ssh_public_key() -> Result<String, KeyGenError> {
    let key = PrivateKey::random(&mut OsRng, Algorithm::Ed25519)
        .map_err(KeyGenError::Generate)?;
    let line =
        key.public_key().to_openssh().map_err(KeyGenError::Encode)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(format!("{line}\n")))
}
