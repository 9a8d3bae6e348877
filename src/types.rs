use rand::{CryptoRng, RngCore};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

/// Fill a 32-byte key seed from the caller's RNG.
///
/// Key material is always built from a seed rather than handed the RNG
/// directly, which keeps the dalek crates decoupled from the `rand_core`
/// version this crate uses.
pub fn random_seed(rng: &mut (impl RngCore + CryptoRng)) -> [u8; 32] {
    let mut seed = [0u8; 32];
    rng.fill_bytes(&mut seed);
    seed
}

/// Public half of a Curve25519 key-agreement key.
///
/// Raw-byte equality on this type is the matching criterion for key lookup
/// and removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Curve25519PublicKey(PublicKey);

impl Curve25519PublicKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }
}

impl From<[u8; 32]> for Curve25519PublicKey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(PublicKey::from(bytes))
    }
}

impl From<PublicKey> for Curve25519PublicKey {
    fn from(value: PublicKey) -> Self {
        Self(value)
    }
}

/// Private half of a Curve25519 key-agreement key.
#[derive(Clone)]
pub struct Curve25519Secret(StaticSecret);

impl Curve25519Secret {
    pub fn public_key(&self) -> Curve25519PublicKey {
        PublicKey::from(&self.0).into()
    }

    pub(crate) fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl From<[u8; 32]> for Curve25519Secret {
    fn from(bytes: [u8; 32]) -> Self {
        Self(StaticSecret::from(bytes))
    }
}

impl Zeroize for Curve25519Secret {
    fn zeroize(&mut self) {
        self.0.zeroize()
    }
}
