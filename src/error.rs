use thiserror::Error;

/// I/O errors that can occur when talking to the origin server
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Source URL could not be parsed or uses an unsupported scheme
    #[error("Invalid source URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Origin answered with a non-success status code
    #[error("Origin returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// Origin returned fewer bytes than the tile needs
    #[error("Short read from {url}: expected {expected} bytes at offset {offset}, got {actual}")]
    ShortRead {
        url: String,
        offset: u64,
        expected: u64,
        actual: u64,
    },

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Origin response lacks a header we need to record
    #[error("Origin response for {url} is missing the {header} header")]
    MissingHeader { url: String, header: &'static str },
}

/// Errors that can occur when parsing the TIFF header buffer
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// Invalid TIFF magic bytes (not II or MM)
    #[error("Invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("Invalid TIFF version: expected 42 (TIFF) or 43 (BigTIFF), got {0}")]
    InvalidVersion(u16),

    /// The file is a BigTIFF, which uses 64-bit directories
    #[error("BigTIFF is not supported")]
    UnsupportedBigTiff,

    /// A directory or value lies outside the fetched header prefix
    #[error("Truncated header: {len} bytes at offset {offset} exceed the {size}-byte buffer")]
    Truncated { offset: u64, len: u64, size: usize },

    /// Tile tag uses a field type outside the type table
    #[error("Unknown field type {field_type} for tag {tag}")]
    UnknownFieldType { tag: u16, field_type: u16 },

    /// Required tag is missing from IFD
    #[error("Missing required tag {tag} in IFD {ifd}")]
    MissingTag { ifd: usize, tag: &'static str },

    /// TileOffsets and TileByteCounts disagree on the number of tiles
    #[error("IFD {ifd} has {offsets} tile offsets but {byte_counts} tile byte counts")]
    CountMismatch {
        ifd: usize,
        offsets: usize,
        byte_counts: usize,
    },

    /// Tag value cannot be interpreted as a byte offset or length
    #[error("Invalid tag value for {tag}: {message}")]
    InvalidTagValue { tag: &'static str, message: String },

    /// The IFD chain points back to a directory that was already visited
    #[error("IFD chain loops back to offset {0}")]
    IfdCycle(u64),
}

/// Errors returned by a cache backend
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// The backend rejected the command or the connection failed
    #[error("Cache backend error: {0}")]
    Backend(String),

    /// A value could not be serialized before being stored
    #[error("Failed to encode cache value: {0}")]
    Encode(String),
}

/// Errors that abort an ingestion call
#[derive(Debug, Clone, Error)]
pub enum IngestError {
    /// Origin fetch failed
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Header buffer could not be parsed
    #[error("TIFF error: {0}")]
    Tiff(#[from] TiffError),

    /// Writing to the cache failed
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// A tile task panicked or was cancelled
    #[error("Tile task failed: {0}")]
    Task(String),
}

/// Errors that can occur when reading cached entries back out
#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    /// Reading from the cache failed
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Cached metadata blob is not the expected JSON document
    #[error("Cached metadata for {identifier} is corrupt: {message}")]
    CorruptMetadata { identifier: String, message: String },
}
