use crate::Error;
use crate::fallback::FallbackKeys;
use crate::identity_keys::IdentityKeys;
use crate::one_time_key::{MAX_ONE_TIME_KEYS, OneTimeKey, OneTimeKeyRing};
use crate::pickle::{Cursor, PickleBuffer};
use crate::types::Curve25519PublicKey;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use ed25519_dalek::Signature;
use rand::{CryptoRng, RngCore};
use serde_json::{Map, Value, json};

/// Current account pickle format version.
///
/// - Version 1 stored only 32 bytes of the ed25519 signing key; keys pickled
///   under it must be treated as compromised and are never decoded.
/// - Version 2 predates fallback keys.
/// - Version 3 stored both fallback slots unconditionally, with no count
///   field.
const ACCOUNT_PICKLE_VERSION: u32 = 4;

/// A device's key-lifecycle state: long-term identity keys, a bounded ring
/// of one-time keys, the current/previous fallback pair, and the monotonic
/// key-id allocator shared by all of them.
///
/// An account starts uninitialized and becomes active when
/// [`Account::new_account`] generates its identity keys; that transition is
/// irreversible. All operations are synchronous state transforms; callers
/// serialize concurrent access themselves.
#[derive(Default)]
pub struct Account {
    identity_keys: Option<IdentityKeys>,
    one_time_keys: OneTimeKeyRing,
    fallback_keys: FallbackKeys,
    next_one_time_key_id: u32,
}

impl Account {
    /// An uninitialized account with no key material.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates fresh identity keys from caller-supplied randomness.
    ///
    /// Fails with [`Error::KeyGeneration`] if the generated material does
    /// not pass its validity self-check; retrying with fresh randomness is
    /// the caller's decision. Calling this on an already-active account
    /// silently replaces the identity keys; there is deliberately no guard.
    pub fn new_account(&mut self, rng: &mut (impl RngCore + CryptoRng)) -> Result<(), Error> {
        self.identity_keys = Some(IdentityKeys::generate(rng)?);
        Ok(())
    }

    pub fn identity_keys(&self) -> Option<&IdentityKeys> {
        self.identity_keys.as_ref()
    }

    pub fn one_time_keys(&self) -> &OneTimeKeyRing {
        &self.one_time_keys
    }

    pub fn fallback_keys(&self) -> &FallbackKeys {
        &self.fallback_keys
    }

    pub fn next_one_time_key_id(&self) -> u32 {
        self.next_one_time_key_id
    }

    pub fn max_number_of_one_time_keys() -> usize {
        MAX_ONE_TIME_KEYS
    }

    /// Signs `message` with the identity signing key (Ed25519ph).
    pub fn sign(&self, message: &[u8]) -> Result<Signature, Error> {
        let identity_keys = self
            .identity_keys
            .as_ref()
            .ok_or(Error::MissingIdentityKeys)?;
        Ok(identity_keys.sign(message))
    }

    fn allocate_key_id(&mut self) -> u32 {
        self.next_one_time_key_id += 1;
        self.next_one_time_key_id
    }

    /// Generates `count` fresh one-time keys, each front-inserted into the
    /// ring. Once the ring is full the oldest keys are silently evicted;
    /// that is the intended rotation mechanism.
    pub fn generate_one_time_keys(
        &mut self,
        rng: &mut (impl RngCore + CryptoRng),
        count: usize,
    ) {
        for _ in 0..count {
            let id = self.allocate_key_id();
            self.one_time_keys.insert_front(OneTimeKey::generate(id, rng));
        }
    }

    /// Rotates the fallback slots: the current key (if any) becomes
    /// previous, and a fresh key with the next monotonic id becomes current.
    pub fn generate_fallback_key(&mut self, rng: &mut (impl RngCore + CryptoRng)) {
        let id = self.allocate_key_id();
        self.fallback_keys.rotate(OneTimeKey::generate(id, rng));
    }

    /// Drops the previous fallback key if both slots are occupied.
    pub fn forget_old_fallback_key(&mut self) {
        self.fallback_keys.forget_previous();
    }

    /// Marks every unpublished one-time key and the current fallback key
    /// (when one exists) as published. Returns how many one-time keys
    /// transitioned; the previous fallback key is never touched.
    pub fn mark_keys_as_published(&mut self) -> usize {
        let mut count = 0;
        for key in self.one_time_keys.iter_mut() {
            if key.mark_published() {
                count += 1;
            }
        }
        if let Some(current) = self.fallback_keys.current_mut() {
            current.mark_published();
        }
        count
    }

    /// Finds the key matching `public_key`: one-time keys front-to-back,
    /// then the current fallback key, then the previous one. Each slot
    /// returns its own record.
    pub fn lookup_key(&self, public_key: &Curve25519PublicKey) -> Option<&OneTimeKey> {
        if let Some(key) = self
            .one_time_keys
            .iter()
            .find(|key| key.public_key() == *public_key)
        {
            return Some(key);
        }
        if let Some(current) = self.fallback_keys.current() {
            if current.public_key() == *public_key {
                return Some(current);
            }
        }
        if let Some(previous) = self.fallback_keys.previous() {
            if previous.public_key() == *public_key {
                return Some(previous);
            }
        }
        None
    }

    /// Removes the first one-time key matching `public_key`. Fallback keys
    /// are never removed this way. No-op when nothing matches.
    pub fn remove_key(&mut self, public_key: &Curve25519PublicKey) {
        let _ = self.one_time_keys.erase_by_public_key(public_key);
    }

    /// The public identity keys as JSON, for publishing to a counterparty:
    /// `{"curve25519": "<base64>", "ed25519": "<base64>"}`.
    pub fn identity_keys_json(&self) -> Result<String, Error> {
        let identity_keys = self
            .identity_keys
            .as_ref()
            .ok_or(Error::MissingIdentityKeys)?;
        let value = json!({
            "curve25519": BASE64.encode(identity_keys.dh_key_public().as_bytes()),
            "ed25519": BASE64.encode(identity_keys.signing_key_public().as_bytes()),
        });
        Ok(value.to_string())
    }

    /// The not-yet-published one-time keys as JSON:
    /// `{"curve25519": {"<decimal id>": "<base64>", ...}}`.
    pub fn one_time_keys_json(&self) -> String {
        let mut keys = Map::new();
        for key in self.one_time_keys.iter() {
            if !key.published() {
                keys.insert(
                    key.id().to_string(),
                    Value::String(BASE64.encode(key.public_key().as_bytes())),
                );
            }
        }
        json!({ "curve25519": keys }).to_string()
    }

    /// The current fallback key as JSON if it has not been published yet,
    /// `{"curve25519": {}}` otherwise. The previous slot is never exposed.
    pub fn unpublished_fallback_key_json(&self) -> String {
        let mut keys = Map::new();
        if let Some(current) = self.fallback_keys.current() {
            if !current.published() {
                keys.insert(
                    current.id().to_string(),
                    Value::String(BASE64.encode(current.public_key().as_bytes())),
                );
            }
        }
        json!({ "curve25519": keys }).to_string()
    }

    /// Serializes the account in the current (v4) pickle format.
    ///
    /// The v4 layout has no representation for a missing identity-key
    /// section, so pickling an uninitialized account fails.
    pub fn pickle(&self) -> Result<Vec<u8>, Error> {
        let identity_keys = self
            .identity_keys
            .as_ref()
            .ok_or(Error::MissingIdentityKeys)?;

        let mut buf = PickleBuffer::with_capacity(1024);
        buf.write_u32(ACCOUNT_PICKLE_VERSION);
        identity_keys.pickle(&mut buf);
        self.one_time_keys.pickle(&mut buf);
        self.fallback_keys.pickle(&mut buf);
        buf.write_u32(self.next_one_time_key_id);
        Ok(buf.into_vec())
    }

    /// Restores an account from any supported pickle version.
    ///
    /// The whole aggregate is decoded into locals and only assembled on full
    /// success; a failure never yields a half-populated account. Re-pickling
    /// always writes v4 regardless of the version decoded here.
    pub fn unpickle(data: &[u8]) -> Result<Self, Error> {
        let mut cur = Cursor::new(data);
        let version = cur
            .read_u32()
            .map_err(|_| Error::PickleVersionNotFound)?;
        match version {
            2 | 3 | ACCOUNT_PICKLE_VERSION => {}
            1 => return Err(Error::BadLegacyPickle),
            _ => return Err(Error::UnknownPickleVersion),
        }

        let identity_keys = IdentityKeys::unpickle(&mut cur)?;
        let one_time_keys = OneTimeKeyRing::unpickle(&mut cur)?;
        let fallback_keys = match version {
            2 => FallbackKeys::None,
            3 => FallbackKeys::unpickle_v3(&mut cur)?,
            _ => FallbackKeys::unpickle_v4(&mut cur)?,
        };
        let next_one_time_key_id = cur.read_u32()?;

        Ok(Self {
            identity_keys: Some(identity_keys),
            one_time_keys,
            fallback_keys,
            next_one_time_key_id,
        })
    }
}
