//! Ed25519 message signing and verification.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};

use crate::keys::KeyPair;
use kestrel_types::{Account, Signature};

/// Sign a message with a key pair, returning the signature.
pub fn sign_message(keys: &KeyPair, message: &[u8]) -> Signature {
    let signing = SigningKey::from_bytes(keys.secret().as_bytes());
    Signature::from_bytes(signing.sign(message).to_bytes())
}

/// Verify a signature against a message and the account's public key.
///
/// Returns `true` when the signature is valid. An account whose bytes are
/// not a valid curve point never validates.
pub fn validate_message(account: &Account, message: &[u8], signature: &Signature) -> bool {
    let Ok(verifying) = VerifyingKey::from_bytes(account.as_bytes()) else {
        return false;
    };
    let sig = ed25519_dalek::Signature::from_bytes(signature.as_bytes());
    verifying.verify(message, &sig).is_ok()
}
