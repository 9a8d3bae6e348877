use crate::Error;
use crate::pickle::{Cursor, PickleBuffer};
use hmac::{Hmac, Mac};
use rand::{CryptoRng, RngCore};
use sha2::Sha256;
use zeroize::Zeroize;

type HmacSha256 = Hmac<Sha256>;

/// Number of chained parts in the ratchet. The advance implementations rely
/// on this being 4.
pub const MEGOLM_RATCHET_PARTS: usize = 4;

/// Bytes per part; equal to the HMAC-SHA-256 output length.
pub const MEGOLM_RATCHET_PART_LENGTH: usize = 32;

/// Per-part HMAC key seeds. Part `i` is always re-derived under seed `i`.
const HASH_KEY_SEEDS: [[u8; 1]; MEGOLM_RATCHET_PARTS] = [[0x00], [0x01], [0x02], [0x03]];

/// The Megolm hash ratchet: four chained 32-byte parts and a monotonic
/// counter.
///
/// Part 0 is the coarsest; it changes only when the counter's top byte
/// rolls. Most single steps re-derive just part 3, with progressively more
/// parts re-derived at each byte boundary of the counter, so advancing is
/// O(1) HMAC calls except every 2^8, 2^16 and 2^24 steps.
#[derive(Clone)]
pub struct Megolm {
    data: [[u8; MEGOLM_RATCHET_PART_LENGTH]; MEGOLM_RATCHET_PARTS],
    counter: u32,
}

impl Megolm {
    /// Seeds all four parts with random bytes at the given starting counter.
    pub fn new(rng: &mut (impl RngCore + CryptoRng), counter: u32) -> Self {
        let mut data = [[0u8; MEGOLM_RATCHET_PART_LENGTH]; MEGOLM_RATCHET_PARTS];
        for part in &mut data {
            rng.fill_bytes(part);
        }
        Self { data, counter }
    }

    /// Deterministic construction from existing part state, as when a group
    /// session imports a shared ratchet.
    pub fn from_parts(
        data: [[u8; MEGOLM_RATCHET_PART_LENGTH]; MEGOLM_RATCHET_PARTS],
        counter: u32,
    ) -> Self {
        Self { data, counter }
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// The raw part state, in part order. Message-key derivation by the
    /// group-session layer reads this.
    pub fn data(&self) -> &[[u8; MEGOLM_RATCHET_PART_LENGTH]; MEGOLM_RATCHET_PARTS] {
        &self.data
    }

    /// `R[to] = HMAC-SHA-256(key = seed[to], message = R[from])`.
    fn rehash_part(&mut self, from: usize, to: usize) {
        let mut mac = HmacSha256::new_from_slice(&HASH_KEY_SEEDS[to])
            .expect("HMAC accepts any key length");
        mac.update(&self.data[from]);
        self.data[to].copy_from_slice(&mac.finalize().into_bytes());
    }

    /// Advances the ratchet a single step.
    ///
    /// `h` counts how many leading parts survive the increment untouched:
    /// each low byte of the new counter that is non-zero leaves one more
    /// coarse part alone. Parts `h..=3` are then re-derived from `R[h]`,
    /// finest first so `R[h]` is read before it is overwritten.
    pub fn advance(&mut self) {
        self.counter = self.counter.wrapping_add(1);

        let mut mask: u32 = 0x00FF_FFFF;
        let mut h = 0;
        while h < MEGOLM_RATCHET_PARTS && (self.counter & mask) != 0 {
            h += 1;
            mask >>= 8;
        }

        for i in (h..MEGOLM_RATCHET_PARTS).rev() {
            self.rehash_part(h, i);
        }
    }

    /// Jumps the ratchet forward to `advance_to`, byte slice by byte slice.
    ///
    /// Produces bit-identical part state to calling [`Megolm::advance`]
    /// `advance_to - counter` (mod 2^32) times, in O(1) HMAC calls per part
    /// boundary instead of one call per step.
    pub fn advance_to(&mut self, advance_to: u32) {
        for j in 0..MEGOLM_RATCHET_PARTS {
            let shift = ((MEGOLM_RATCHET_PARTS - j - 1) * 8) as u32;
            let mask = u32::MAX << shift;

            // How many times this byte-level slice of the counter rolls
            // forward; the & 0xff handles integer wraparound.
            let mut steps = ((advance_to >> shift).wrapping_sub(self.counter >> shift)) & 0xff;

            if steps == 0 {
                // A slightly smaller target means the counter wrapped all
                // the way around, which can only happen for part 0 and
                // requires a full 256 rolls of this slice.
                if advance_to < self.counter {
                    steps = 0x100;
                } else {
                    continue;
                }
            }

            // All but the last roll bump R(j) in place without touching the
            // finer parts.
            while steps > 1 {
                self.rehash_part(j, j);
                steps -= 1;
            }

            // The last roll also cascades into R(j+1)..R(3).
            for k in (j..MEGOLM_RATCHET_PARTS).rev() {
                self.rehash_part(j, k);
            }
            self.counter = advance_to & mask;
        }
    }

    /// Layout: 128 raw part bytes, then the `u32` counter. Version fields
    /// belong to the owning group-session pickle, not to the ratchet.
    pub fn pickle(&self, buf: &mut PickleBuffer) {
        for part in &self.data {
            buf.write_raw(part);
        }
        buf.write_u32(self.counter);
    }

    pub fn unpickle(cur: &mut Cursor<'_>) -> Result<Self, Error> {
        let mut data = [[0u8; MEGOLM_RATCHET_PART_LENGTH]; MEGOLM_RATCHET_PARTS];
        for part in &mut data {
            part.copy_from_slice(cur.read_raw(MEGOLM_RATCHET_PART_LENGTH)?);
        }
        let counter = cur.read_u32()?;
        Ok(Self { data, counter })
    }
}

impl Drop for Megolm {
    fn drop(&mut self) {
        for part in &mut self.data {
            part.zeroize();
        }
    }
}
