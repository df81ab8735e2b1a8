//! Signed push certificates.
//!
//! A certificate records which ref updates a pusher asked for and is signed
//! with the pusher's key. It travels with the batch update that results from
//! the push so the ref database can keep it next to the reflog.

use notedb_crypto::{Signature, SignatureError, SigningKey, VerifyingKey};

/// A signed record of the ref updates a pusher requested.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PushCertificate {
    pusher: String,
    nonce: String,
    commands: Vec<String>,
    signature: Signature,
    key: VerifyingKey,
}

impl PushCertificate {
    /// Build and sign a certificate for the given command lines.
    pub fn sign(
        pusher: impl Into<String>,
        nonce: impl Into<String>,
        commands: Vec<String>,
        key: &SigningKey,
    ) -> Self {
        let pusher = pusher.into();
        let nonce = nonce.into();
        let signature = key.sign(&payload(&pusher, &nonce, &commands));
        Self {
            pusher,
            nonce,
            commands,
            signature,
            key: key.verifying_key(),
        }
    }

    pub fn pusher(&self) -> &str {
        &self.pusher
    }

    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// The ref updates the pusher signed for, one line per command.
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Key the certificate was signed with.
    pub fn key(&self) -> &VerifyingKey {
        &self.key
    }

    /// Check the signature over the canonical payload.
    pub fn verify(&self) -> Result<(), SignatureError> {
        self.key.verify(
            &payload(&self.pusher, &self.nonce, &self.commands),
            &self.signature,
        )
    }
}

fn payload(pusher: &str, nonce: &str, commands: &[String]) -> Vec<u8> {
    let mut text = format!("certificate version 0.1\npusher {pusher}\nnonce {nonce}\n\n");
    for cmd in commands {
        text.push_str(cmd);
        text.push('\n');
    }
    text.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_certificate_verifies() {
        let key = SigningKey::generate();
        let cert = PushCertificate::sign(
            "Alice <alice@example.com>",
            "1700000000-abc",
            vec!["0000 1111 refs/for/master".into()],
            &key,
        );
        assert!(cert.verify().is_ok());
        assert_eq!(cert.pusher(), "Alice <alice@example.com>");
        assert_eq!(cert.commands().len(), 1);
    }

    #[test]
    fn tampered_certificate_fails() {
        let key = SigningKey::generate();
        let mut cert = PushCertificate::sign("Alice", "n", vec!["a".into()], &key);
        cert.commands.push("extra".into());
        assert_eq!(cert.verify(), Err(SignatureError::InvalidSignature));
    }
}
