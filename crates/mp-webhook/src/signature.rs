//! Webhook request signatures
//!
//! The platform signs each request by sorting `[token, timestamp, nonce]`,
//! concatenating them without a separator and taking the lowercase hex SHA-1.

use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;

#[derive(Clone)]
pub struct SignatureVerifier {
    token: String,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier").finish_non_exhaustive()
    }
}

impl SignatureVerifier {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    /// Expected signature for the given timestamp and nonce
    pub fn sign(&self, timestamp: &str, nonce: &str) -> String {
        let mut parts = [self.token.as_str(), timestamp, nonce];
        parts.sort_unstable();

        let mut hasher = Sha1::new();
        for part in parts {
            hasher.update(part.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// Constant-time check of a supplied signature
    pub fn verify(&self, signature: &str, timestamp: &str, nonce: &str) -> bool {
        let expected = self.sign(timestamp, nonce);
        expected.as_bytes().ct_eq(signature.as_bytes()).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // sha1("12token")
    const KNOWN: &str = "6d7149e287208afb17c14861c125053fd80c0f86";

    #[test]
    fn test_known_signature() {
        let verifier = SignatureVerifier::new("token");
        assert_eq!(verifier.sign("1", "2"), KNOWN);
        assert!(verifier.verify(KNOWN, "1", "2"));
    }

    #[test]
    fn test_order_independent_of_argument_position() {
        let verifier = SignatureVerifier::new("token");
        // Sorted input is the same regardless of which value is the nonce
        assert_eq!(verifier.sign("2", "1"), KNOWN);
    }

    #[test]
    fn test_single_char_mutations_rejected() {
        let verifier = SignatureVerifier::new("token");
        for i in 0..KNOWN.len() {
            let mut bytes = KNOWN.as_bytes().to_vec();
            bytes[i] = if bytes[i] == b'0' { b'1' } else { b'0' };
            let mutated = String::from_utf8(bytes).unwrap();
            assert!(!verifier.verify(&mutated, "1", "2"), "mutation at {} accepted", i);
        }
    }

    #[test]
    fn test_uppercase_and_truncated_rejected() {
        let verifier = SignatureVerifier::new("token");
        assert!(!verifier.verify(&KNOWN.to_uppercase(), "1", "2"));
        assert!(!verifier.verify(&KNOWN[..39], "1", "2"));
        assert!(!verifier.verify("", "1", "2"));
    }

    #[test]
    fn test_wrong_token_or_params_rejected() {
        assert!(!SignatureVerifier::new("other").verify(KNOWN, "1", "2"));
        assert!(!SignatureVerifier::new("token").verify(KNOWN, "1", "3"));
    }

    #[test]
    fn test_debug_hides_token() {
        let debug = format!("{:?}", SignatureVerifier::new("super-secret"));
        assert!(!debug.contains("super-secret"));
    }
}
