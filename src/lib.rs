mod error;
pub use error::Error;

mod types;
pub use types::*;

mod pickle;
pub use pickle::{Cursor, PickleBuffer};

mod identity_keys;
pub use identity_keys::IdentityKeys;

mod one_time_key;
pub use one_time_key::{MAX_ONE_TIME_KEYS, OneTimeKey, OneTimeKeyRing};

mod fallback;
pub use fallback::FallbackKeys;

mod account;
pub use account::Account;

mod megolm;
pub use megolm::Megolm;
