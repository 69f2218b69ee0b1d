//! Proof key for code exchange (RFC 7636, S256).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

const VERIFIER_BYTES: usize = 32;

/// Generate a fresh high-entropy code verifier.
pub fn generate_code_verifier() -> String {
    let mut bytes = [0u8; VERIFIER_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// S256 challenge for a verifier.
pub fn code_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}
