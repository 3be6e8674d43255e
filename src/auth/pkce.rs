//! Proof Key for Code Exchange ([RFC 7636](https://www.rfc-editor.org/rfc/rfc7636)).

use base64::{
    Engine,
    engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};

#[must_use]
#[derive(Clone, Debug)]
pub struct Pkce {
    pub verifier: String,
    pub challenge: String,
}

impl Pkce {
    pub const METHOD: &str = "S256";

    pub fn generate() -> Self {
        let mut bytes = [0_u8; 40];
        OsRng.fill_bytes(&mut bytes);
        let verifier = URL_SAFE.encode(bytes).replace(|c: char| !c.is_ascii_alphanumeric(), "");
        Self::from_verifier(verifier)
    }

    pub fn from_verifier(verifier: String) -> Self {
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self { verifier, challenge }
    }
}

/// Random alphanumeric token to match the authorization response against the request.
#[must_use]
pub fn generate_state() -> String {
    let mut bytes = [0_u8; 24];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes).replace(|c: char| !c.is_ascii_alphanumeric(), "")
}
