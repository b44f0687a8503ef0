use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Invalid entry kind tag {0}")]
    InvalidEntryKind(u8),

    #[error("Entry data of length {len} is not a multiple of the 9-byte entry size")]
    TruncatedEntry { len: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
