// ---------------------------------------------------------------------------
// SaveError: error type for session saves and brake snapshots
// ---------------------------------------------------------------------------

use std::fmt;

use simulation::brakes::PersistError;

/// Errors that can occur while writing or reading a save file.
#[derive(Debug)]
pub enum SaveError {
    /// I/O error (file not found, permission denied, disk full, etc.)
    Io(std::io::Error),
    /// Bitcode encoding failed.
    Encode(String),
    /// Bitcode decoding failed (corrupt or invalid payload).
    Decode(String),
    /// The file does not start with the expected magic bytes.
    BadMagic([u8; 4]),
    /// The file is shorter than its header.
    Truncated { len: usize, needed: usize },
    /// Header format is newer than this build supports.
    VersionMismatch { expected_max: u32, found: u32 },
    /// Payload checksum does not match the header.
    Checksum { expected: u32, found: u32 },
    /// The file holds a different kind of save than was asked for.
    WrongKind { expected: &'static str },
    /// LZ4 decompression failed or produced the wrong size.
    Decompress(String),
    /// The brake snapshot did not fit the trains it was restored into.
    Snapshot(PersistError),
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "I/O error: {e}"),
            SaveError::Encode(msg) => write!(f, "Encoding error: {msg}"),
            SaveError::Decode(msg) => write!(f, "Decoding error: {msg}"),
            SaveError::BadMagic(found) => {
                write!(f, "Not a brake save file (magic bytes {found:02X?})")
            }
            SaveError::Truncated { len, needed } => write!(
                f,
                "Save file is too short ({len} bytes, need at least {needed} for header)"
            ),
            SaveError::VersionMismatch {
                expected_max,
                found,
            } => write!(
                f,
                "Version mismatch: file is v{found}, but this build only supports up to v{expected_max}"
            ),
            SaveError::Checksum { expected, found } => write!(
                f,
                "Save file is corrupted: checksum mismatch (expected {expected:#010X}, got {found:#010X})"
            ),
            SaveError::WrongKind { expected } => write!(f, "Save file is not a {expected}"),
            SaveError::Decompress(msg) => write!(f, "Decompression failed: {msg}"),
            SaveError::Snapshot(e) => write!(f, "Brake snapshot rejected: {e}"),
        }
    }
}

impl std::error::Error for SaveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SaveError::Io(e) => Some(e),
            SaveError::Snapshot(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Io(e)
    }
}

impl From<bitcode::Error> for SaveError {
    fn from(e: bitcode::Error) -> Self {
        SaveError::Decode(e.to_string())
    }
}

impl From<PersistError> for SaveError {
    fn from(e: PersistError) -> Self {
        SaveError::Snapshot(e)
    }
}
