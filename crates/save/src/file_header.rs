// ---------------------------------------------------------------------------
// file_header – Save file header with magic bytes, version, and checksum
// ---------------------------------------------------------------------------
//
// Header format (28 bytes, fixed-size, little-endian):
//   [0..4]   Magic bytes: "RBRK"
//   [4..8]   Format version (u32)
//   [8..12]  Flags (u32: bit 0 = LZ4 compressed, bit 1 = brake snapshot)
//   [12..20] Simulation tick at save time (u64)
//   [20..24] Uncompressed payload size (u32)
//   [24..28] xxHash32 checksum of the stored payload (after compression)
//
// On save: encode payload -> optionally compress -> prepend header
// On load: check magic -> validate checksum -> strip header -> decompress

use xxhash_rust::xxh32::xxh32;

use crate::save_error::SaveError;

/// Magic bytes identifying a brake save file.
pub const MAGIC: [u8; 4] = *b"RBRK";

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 28;

/// Current header format version.
pub const HEADER_FORMAT_VERSION: u32 = 1;

pub const FLAG_COMPRESSED: u32 = 1 << 0;
pub const FLAG_BRAKE_SNAPSHOT: u32 = 1 << 1;

const XXHASH_SEED: u32 = 0;

/// What the payload after the header holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveKind {
    /// Bitcode-encoded extension map of every registered `Saveable`.
    Session,
    /// Fixed-order brake state of every train in the roster.
    BrakeSnapshot,
}

impl SaveKind {
    fn flag(self) -> u32 {
        match self {
            SaveKind::Session => 0,
            SaveKind::BrakeSnapshot => FLAG_BRAKE_SNAPSHOT,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SaveKind::Session => "session save",
            SaveKind::BrakeSnapshot => "brake snapshot",
        }
    }
}

/// Parsed file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub format_version: u32,
    pub flags: u32,
    pub tick: u64,
    pub uncompressed_size: u32,
    pub checksum: u32,
}

impl FileHeader {
    pub fn is_compressed(&self) -> bool {
        self.flags & FLAG_COMPRESSED != 0
    }

    pub fn kind(&self) -> SaveKind {
        if self.flags & FLAG_BRAKE_SNAPSHOT != 0 {
            SaveKind::BrakeSnapshot
        } else {
            SaveKind::Session
        }
    }
}

/// Wrap a payload with a file header, compressing it first if asked.
///
/// Returns bytes: [header (28 bytes)] ++ [stored payload].
pub fn wrap_with_header(data: &[u8], kind: SaveKind, tick: u64, compress: bool) -> Vec<u8> {
    let compressed;
    let (stored, mut flags) = if compress {
        compressed = lz4_flex::compress_prepend_size(data);
        (compressed.as_slice(), FLAG_COMPRESSED)
    } else {
        (data, 0)
    };
    flags |= kind.flag();

    let mut out = Vec::with_capacity(HEADER_SIZE + stored.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&HEADER_FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&flags.to_le_bytes());
    out.extend_from_slice(&tick.to_le_bytes());
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(&xxh32(stored, XXHASH_SEED).to_le_bytes());
    out.extend_from_slice(stored);
    out
}

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(buf)
}

/// Parse the header and verify the checksum. Returns the header and the
/// stored (possibly compressed) payload.
pub fn unwrap_header(bytes: &[u8]) -> Result<(FileHeader, &[u8]), SaveError> {
    if bytes.len() < 4 || bytes[..4] != MAGIC {
        let mut found = [0u8; 4];
        let n = bytes.len().min(4);
        found[..n].copy_from_slice(&bytes[..n]);
        return Err(SaveError::BadMagic(found));
    }
    if bytes.len() < HEADER_SIZE {
        return Err(SaveError::Truncated {
            len: bytes.len(),
            needed: HEADER_SIZE,
        });
    }

    let format_version = le_u32(bytes, 4);
    if format_version > HEADER_FORMAT_VERSION {
        return Err(SaveError::VersionMismatch {
            expected_max: HEADER_FORMAT_VERSION,
            found: format_version,
        });
    }
    let flags = le_u32(bytes, 8);
    let mut tick_bytes = [0u8; 8];
    tick_bytes.copy_from_slice(&bytes[12..20]);
    let tick = u64::from_le_bytes(tick_bytes);
    let uncompressed_size = le_u32(bytes, 20);
    let checksum = le_u32(bytes, 24);

    let payload = &bytes[HEADER_SIZE..];
    let computed = xxh32(payload, XXHASH_SEED);
    if computed != checksum {
        return Err(SaveError::Checksum {
            expected: checksum,
            found: computed,
        });
    }

    Ok((
        FileHeader {
            format_version,
            flags,
            tick,
            uncompressed_size,
            checksum,
        },
        payload,
    ))
}

/// Decompress an LZ4 payload and check it against the header's size.
pub fn decompress_payload(payload: &[u8], expected_size: u32) -> Result<Vec<u8>, SaveError> {
    let data = lz4_flex::decompress_size_prepended(payload)
        .map_err(|e| SaveError::Decompress(e.to_string()))?;
    if data.len() != expected_size as usize {
        return Err(SaveError::Decompress(format!(
            "expected {expected_size} bytes, got {}",
            data.len()
        )));
    }
    Ok(data)
}

/// Unwrap, check the save kind and decompress: the full load path.
pub fn read_payload(bytes: &[u8], expected: SaveKind) -> Result<(FileHeader, Vec<u8>), SaveError> {
    let (header, payload) = unwrap_header(bytes)?;
    if header.kind() != expected {
        return Err(SaveError::WrongKind {
            expected: expected.label(),
        });
    }
    let data = if header.is_compressed() {
        decompress_payload(payload, header.uncompressed_size)?
    } else {
        payload.to_vec()
    };
    Ok((header, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_and_unwrap_roundtrip() {
        let data = b"brake pipe payload";
        let wrapped = wrap_with_header(data, SaveKind::Session, 42, false);
        assert_eq!(&wrapped[..4], &MAGIC);
        assert_eq!(wrapped.len(), HEADER_SIZE + data.len());

        let (header, payload) = unwrap_header(&wrapped).expect("unwrap should succeed");
        assert_eq!(header.format_version, HEADER_FORMAT_VERSION);
        assert_eq!(header.tick, 42);
        assert!(!header.is_compressed());
        assert_eq!(header.kind(), SaveKind::Session);
        assert_eq!(payload, data);
    }

    #[test]
    fn test_compressed_roundtrip() {
        let data: Vec<u8> = (0..10_000).map(|i| (i % 7) as u8).collect();
        let wrapped = wrap_with_header(&data, SaveKind::BrakeSnapshot, 9, true);
        assert!(wrapped.len() < HEADER_SIZE + data.len());

        let (header, restored) =
            read_payload(&wrapped, SaveKind::BrakeSnapshot).expect("read should succeed");
        assert!(header.is_compressed());
        assert_eq!(header.uncompressed_size, 10_000);
        assert_eq!(restored, data);
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let wrapped = wrap_with_header(b"x", SaveKind::Session, 0, false);
        let err = read_payload(&wrapped, SaveKind::BrakeSnapshot).unwrap_err();
        assert!(matches!(err, SaveError::WrongKind { .. }), "{err}");
    }

    #[test]
    fn test_corrupted_checksum_detected() {
        let mut wrapped = wrap_with_header(b"test payload", SaveKind::Session, 0, false);
        let last = wrapped.len() - 1;
        wrapped[last] ^= 0xFF;
        let err = unwrap_header(&wrapped).unwrap_err();
        assert!(format!("{err}").contains("checksum mismatch"), "{err}");
    }

    #[test]
    fn test_future_header_version_rejected() {
        let mut wrapped = wrap_with_header(b"test payload", SaveKind::Session, 0, false);
        wrapped[4..8].copy_from_slice(&999u32.to_le_bytes());
        let err = unwrap_header(&wrapped).unwrap_err();
        assert!(matches!(
            err,
            SaveError::VersionMismatch {
                expected_max: HEADER_FORMAT_VERSION,
                found: 999
            }
        ));
    }

    #[test]
    fn test_truncated_header_detected() {
        let err = unwrap_header(b"RBRK\x01\x00").unwrap_err();
        assert!(format!("{err}").contains("too short"), "{err}");
    }

    #[test]
    fn test_foreign_file_rejected() {
        let err = unwrap_header(b"PK\x03\x04\x00\x00\x00\x00").unwrap_err();
        assert!(matches!(err, SaveError::BadMagic(m) if &m == b"PK\x03\x04"));
        assert!(matches!(unwrap_header(b""), Err(SaveError::BadMagic(_))));
    }

    #[test]
    fn test_garbage_lz4_payload_fails_cleanly() {
        let err = decompress_payload(&[10, 0, 0, 0, 0xFF], 10).unwrap_err();
        assert!(matches!(err, SaveError::Decompress(_)));
    }
}
