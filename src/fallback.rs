use crate::Error;
use crate::one_time_key::OneTimeKey;
use crate::pickle::{Cursor, PickleBuffer};

/// Fallback-key slots as one tagged value.
///
/// A fallback key is shaped like a one-time key but is never evicted by the
/// ring and survives exactly one rotation. Modelling the two slots as a
/// single enum makes "previous present without current" unrepresentable.
#[derive(Default)]
pub enum FallbackKeys {
    #[default]
    None,
    CurrentOnly(OneTimeKey),
    CurrentAndPrevious(OneTimeKey, OneTimeKey),
}

impl FallbackKeys {
    /// The current key becomes previous (discarding any old previous) and
    /// `new_key` becomes current.
    pub(crate) fn rotate(&mut self, new_key: OneTimeKey) {
        *self = match std::mem::take(self) {
            FallbackKeys::None => FallbackKeys::CurrentOnly(new_key),
            FallbackKeys::CurrentOnly(current)
            | FallbackKeys::CurrentAndPrevious(current, _) => {
                FallbackKeys::CurrentAndPrevious(new_key, current)
            }
        };
    }

    /// Drops the previous slot if both are present; no-op otherwise.
    pub(crate) fn forget_previous(&mut self) {
        *self = match std::mem::take(self) {
            FallbackKeys::CurrentAndPrevious(current, _) => FallbackKeys::CurrentOnly(current),
            other => other,
        };
    }

    pub fn current(&self) -> Option<&OneTimeKey> {
        match self {
            FallbackKeys::None => None,
            FallbackKeys::CurrentOnly(current)
            | FallbackKeys::CurrentAndPrevious(current, _) => Some(current),
        }
    }

    pub(crate) fn current_mut(&mut self) -> Option<&mut OneTimeKey> {
        match self {
            FallbackKeys::None => None,
            FallbackKeys::CurrentOnly(current)
            | FallbackKeys::CurrentAndPrevious(current, _) => Some(current),
        }
    }

    pub fn previous(&self) -> Option<&OneTimeKey> {
        match self {
            FallbackKeys::CurrentAndPrevious(_, previous) => Some(previous),
            _ => None,
        }
    }

    /// v4 layout: `u8` slot count (0, 1 or 2), then that many records,
    /// current first.
    pub(crate) fn pickle(&self, buf: &mut PickleBuffer) {
        match self {
            FallbackKeys::None => buf.write_u8(0),
            FallbackKeys::CurrentOnly(current) => {
                buf.write_u8(1);
                current.pickle(buf);
            }
            FallbackKeys::CurrentAndPrevious(current, previous) => {
                buf.write_u8(2);
                current.pickle(buf);
                previous.pickle(buf);
            }
        }
    }

    pub(crate) fn unpickle_v4(cur: &mut Cursor<'_>) -> Result<Self, Error> {
        match cur.read_u8()? {
            0 => Ok(FallbackKeys::None),
            1 => Ok(FallbackKeys::CurrentOnly(OneTimeKey::unpickle(cur)?)),
            2 => {
                let current = OneTimeKey::unpickle(cur)?;
                let previous = OneTimeKey::unpickle(cur)?;
                Ok(FallbackKeys::CurrentAndPrevious(current, previous))
            }
            _ => Err(Error::CorruptedPickle),
        }
    }

    /// v3 pickles carry both slot records unconditionally and no count
    /// field; how many slots are actually live is reconstructed from the
    /// two `published` flags.
    pub(crate) fn unpickle_v3(cur: &mut Cursor<'_>) -> Result<Self, Error> {
        let current = OneTimeKey::unpickle(cur)?;
        let previous = OneTimeKey::unpickle(cur)?;

        Ok(if current.published() {
            if previous.published() {
                FallbackKeys::CurrentAndPrevious(current, previous)
            } else {
                FallbackKeys::CurrentOnly(current)
            }
        } else {
            FallbackKeys::None
        })
    }
}
