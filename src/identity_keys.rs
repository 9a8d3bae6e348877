use crate::Error;
use crate::pickle::{Cursor, PickleBuffer};
use crate::types::{Curve25519PublicKey, Curve25519Secret, random_seed};
use ed25519_dalek::{Signature, SignatureError, SigningKey, VerifyingKey};
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha512};

/// A device's long-term identity: an Ed25519 signing key and a Curve25519
/// key-agreement key.
///
/// Created exactly once per account and immutable afterwards. Signing uses
/// the Ed25519ph prehash scheme (SHA-512, empty context).
pub struct IdentityKeys {
    signing_key: SigningKey,
    dh_key: Curve25519Secret,
}

impl IdentityKeys {
    /// Generates a fresh identity from caller-supplied randomness.
    ///
    /// Both key pairs and both public keys are run through a validity
    /// self-check; a failed check surfaces as [`Error::KeyGeneration`] and
    /// is not retried here.
    pub fn generate(rng: &mut (impl RngCore + CryptoRng)) -> Result<Self, Error> {
        let signing_key = SigningKey::from_bytes(&random_seed(rng));
        let dh_key = Curve25519Secret::from(random_seed(rng));

        let keys = Self {
            signing_key,
            dh_key,
        };
        keys.check()?;
        Ok(keys)
    }

    fn check(&self) -> Result<(), Error> {
        // A weak (small-order) verifying key can never produce a signature
        // another party should accept.
        if self.signing_key.verifying_key().is_weak() {
            return Err(Error::KeyGeneration);
        }
        // An all-zero Curve25519 public point means the clamped secret
        // collapsed to the identity element.
        if self.dh_key.public_key().as_bytes().iter().all(|&b| b == 0) {
            return Err(Error::KeyGeneration);
        }
        Ok(())
    }

    /// Produces a detached Ed25519ph signature over `message`.
    pub fn sign(&self, message: &[u8]) -> Signature {
        let prehash = Sha512::new().chain_update(message);
        self.signing_key
            .sign_prehashed(prehash, None)
            .expect("empty Ed25519ph context is always valid")
    }

    /// Verifies an Ed25519ph signature produced by [`IdentityKeys::sign`].
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), SignatureError> {
        let prehash = Sha512::new().chain_update(message);
        self.signing_key
            .verifying_key()
            .verify_prehashed(prehash, None, signature)
    }

    /// The public Ed25519 verifying key.
    pub fn signing_key_public(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// The public Curve25519 key-agreement key.
    pub fn dh_key_public(&self) -> Curve25519PublicKey {
        self.dh_key.public_key()
    }

    /// Field order: public signing key, private signing key, public
    /// agreement key, private agreement key, each length-prefixed.
    pub(crate) fn pickle(&self, buf: &mut PickleBuffer) {
        buf.write_bytes(self.signing_key.verifying_key().as_bytes());
        buf.write_bytes(self.signing_key.as_bytes());
        buf.write_bytes(self.dh_key.public_key().as_bytes());
        buf.write_bytes(self.dh_key.as_bytes());
    }

    /// The public halves are re-derived from the private bytes rather than
    /// trusted from the buffer.
    pub(crate) fn unpickle(cur: &mut Cursor<'_>) -> Result<Self, Error> {
        let _signing_public = cur.read_bytes()?;
        let signing_private: [u8; 32] = cur
            .read_bytes()?
            .try_into()
            .map_err(|_| Error::CorruptedPickle)?;
        let _dh_public = cur.read_bytes()?;
        let dh_private: [u8; 32] = cur
            .read_bytes()?
            .try_into()
            .map_err(|_| Error::CorruptedPickle)?;

        Ok(Self {
            signing_key: SigningKey::from_bytes(&signing_private),
            dh_key: Curve25519Secret::from(dh_private),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_passes_self_check() {
        assert!(IdentityKeys::generate(&mut rand::rng()).is_ok());
    }

    #[test]
    fn test_sign_and_verify() {
        let keys = IdentityKeys::generate(&mut rand::rng()).unwrap();
        let message = b"an important announcement";

        let signature = keys.sign(message);
        assert!(keys.verify(message, &signature).is_ok());
    }

    #[test]
    fn test_verify_rejects_modified_message() {
        let keys = IdentityKeys::generate(&mut rand::rng()).unwrap();
        let signature = keys.sign(b"an important announcement");
        assert!(keys.verify(b"a doctored announcement", &signature).is_err());
    }

    #[test]
    fn test_verify_rejects_modified_signature() {
        let keys = IdentityKeys::generate(&mut rand::rng()).unwrap();
        let message = b"original";
        let mut bytes = keys.sign(message).to_bytes();
        bytes[3] ^= 0x40;
        let tampered = Signature::from_bytes(&bytes);
        assert!(keys.verify(message, &tampered).is_err());
    }

    #[test]
    fn test_pickle_round_trip() {
        let keys = IdentityKeys::generate(&mut rand::rng()).unwrap();

        let mut buf = PickleBuffer::new();
        keys.pickle(&mut buf);
        let data = buf.into_vec();

        let mut cur = Cursor::new(&data);
        let restored = IdentityKeys::unpickle(&mut cur).unwrap();
        assert!(cur.is_at_end());

        assert_eq!(
            keys.signing_key_public().as_bytes(),
            restored.signing_key_public().as_bytes()
        );
        assert_eq!(
            keys.dh_key_public().as_bytes(),
            restored.dh_key_public().as_bytes()
        );
    }

    #[test]
    fn test_unpickle_rejects_wrong_key_width() {
        let mut buf = PickleBuffer::new();
        buf.write_bytes(&[0u8; 32]);
        buf.write_bytes(&[0u8; 16]); // private signing key too short
        buf.write_bytes(&[0u8; 32]);
        buf.write_bytes(&[0u8; 32]);
        let data = buf.into_vec();

        let mut cur = Cursor::new(&data);
        assert_eq!(
            IdentityKeys::unpickle(&mut cur).err(),
            Some(Error::CorruptedPickle)
        );
    }

    #[test]
    fn test_unpickle_rejects_truncated_buffer() {
        let keys = IdentityKeys::generate(&mut rand::rng()).unwrap();
        let mut buf = PickleBuffer::new();
        keys.pickle(&mut buf);
        let data = buf.into_vec();

        let mut cur = Cursor::new(&data[..data.len() - 10]);
        assert_eq!(
            IdentityKeys::unpickle(&mut cur).err(),
            Some(Error::CorruptedPickle)
        );
    }
}
