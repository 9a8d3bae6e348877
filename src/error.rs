/// Errors that can occur during account and ratchet operations.
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum Error {
    /// Key pair generation or the post-generation validity check failed.
    #[error("Key pair generation failed")]
    KeyGeneration,

    /// An operation that needs identity keys was called before `new_account`.
    #[error("Account has no identity keys")]
    MissingIdentityKeys,

    /// A key-ring index or lookup token matched nothing.
    #[error("Index out of range")]
    IndexOutOfRange,

    /// The buffer was too short to even read the pickle version.
    #[error("Version not found in pickle")]
    PickleVersionNotFound,

    /// Version 1 pickles carried truncated signing keys; such keys must be
    /// treated as compromised and are never decoded.
    #[error("Bad legacy account pickle")]
    BadLegacyPickle,

    /// The pickle version is newer than this library understands.
    #[error("Unknown pickle version")]
    UnknownPickleVersion,

    /// The pickle body failed to decode past the version field.
    #[error("Corrupted pickle")]
    CorruptedPickle,
}
