use crate::Error;
use crate::pickle::{Cursor, PickleBuffer};
use crate::types::{Curve25519PublicKey, Curve25519Secret, random_seed};
use rand::{CryptoRng, RngCore};

/// Capacity of the one-time-key ring. Once full, generating another key
/// silently evicts the oldest entry; that eviction is the sanctioned
/// rotation path, not an error.
pub const MAX_ONE_TIME_KEYS: usize = 100;

/// An ephemeral Curve25519 key published for a single session establishment.
///
/// Ids come from the account's monotonic allocator and are never reused.
/// The only mutation a key ever sees is its `published` flag flipping to
/// true.
pub struct OneTimeKey {
    id: u32,
    published: bool,
    key: Curve25519Secret,
}

impl OneTimeKey {
    pub(crate) fn generate(id: u32, rng: &mut (impl RngCore + CryptoRng)) -> Self {
        Self {
            id,
            published: false,
            key: Curve25519Secret::from(random_seed(rng)),
        }
    }

    pub(crate) fn from_parts(id: u32, published: bool, key: Curve25519Secret) -> Self {
        Self {
            id,
            published,
            key,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn published(&self) -> bool {
        self.published
    }

    pub fn public_key(&self) -> Curve25519PublicKey {
        self.key.public_key()
    }

    /// Flips the published flag; returns whether this call transitioned it.
    pub(crate) fn mark_published(&mut self) -> bool {
        let transitioned = !self.published;
        self.published = true;
        transitioned
    }

    /// Layout: `u32` id, `bool` published, length-prefixed private key.
    pub(crate) fn pickle(&self, buf: &mut PickleBuffer) {
        buf.write_u32(self.id);
        buf.write_bool(self.published);
        buf.write_bytes(self.key.as_bytes());
    }

    pub(crate) fn unpickle(cur: &mut Cursor<'_>) -> Result<Self, Error> {
        let id = cur.read_u32()?;
        let published = cur.read_bool()?;
        let key: [u8; 32] = cur
            .read_bytes()?
            .try_into()
            .map_err(|_| Error::CorruptedPickle)?;
        Ok(Self::from_parts(id, published, Curve25519Secret::from(key)))
    }
}

/// Fixed-capacity, insertion-ordered one-time-key storage.
///
/// Insertion is always at the logical front; iteration runs front-to-back,
/// newest first. Lookups and removals are linear scans, which is deliberate
/// at this capacity.
#[derive(Default)]
pub struct OneTimeKeyRing {
    entries: Vec<OneTimeKey>,
}

impl OneTimeKeyRing {
    pub fn new() -> Self {
        Self {
            entries: Vec::with_capacity(MAX_ONE_TIME_KEYS),
        }
    }

    /// Inserts at the front, dropping the oldest entry first when the ring
    /// is at capacity. Never fails.
    pub fn insert_front(&mut self, key: OneTimeKey) {
        if self.entries.len() == MAX_ONE_TIME_KEYS {
            self.entries.pop();
        }
        self.entries.insert(0, key);
    }

    /// Removes the entry at `index`, counted from the front.
    pub fn erase_at(&mut self, index: usize) -> Result<(), Error> {
        if index >= self.entries.len() {
            return Err(Error::IndexOutOfRange);
        }
        self.entries.remove(index);
        Ok(())
    }

    /// Removes the first entry whose public key matches, scanning
    /// front-to-back. At most one entry is removed.
    pub fn erase_by_public_key(&mut self, public_key: &Curve25519PublicKey) -> Result<(), Error> {
        let index = self
            .entries
            .iter()
            .position(|key| key.public_key() == *public_key)
            .ok_or(Error::IndexOutOfRange)?;
        self.entries.remove(index);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OneTimeKey> {
        self.entries.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut OneTimeKey> {
        self.entries.iter_mut()
    }

    /// Layout: `u32` count, then the records in iteration order (newest
    /// first).
    pub(crate) fn pickle(&self, buf: &mut PickleBuffer) {
        buf.write_u32(self.entries.len() as u32);
        for key in &self.entries {
            key.pickle(buf);
        }
    }

    /// Records are appended in pickled order, so a round-trip preserves ring
    /// order. Legacy pickles may end the ring early with an id-0 sentinel
    /// record or by simply running out of buffer mid-count; both terminate
    /// the ring without error. Records beyond capacity are decoded (to keep
    /// the cursor aligned) but not retained.
    pub(crate) fn unpickle(cur: &mut Cursor<'_>) -> Result<Self, Error> {
        let count = cur.read_u32()?;
        let mut ring = Self::new();
        for _ in 0..count {
            if cur.is_at_end() {
                break;
            }
            let id = cur.read_u32()?;
            if id == 0 {
                break;
            }
            let published = cur.read_bool()?;
            let key: [u8; 32] = cur
                .read_bytes()?
                .try_into()
                .map_err(|_| Error::CorruptedPickle)?;
            if ring.entries.len() < MAX_ONE_TIME_KEYS {
                ring.entries
                    .push(OneTimeKey::from_parts(id, published, Curve25519Secret::from(key)));
            }
        }
        Ok(ring)
    }
}
