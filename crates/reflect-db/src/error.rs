//! Error types for the reflection database
//!
//! Recoverable failures only. Contract violations (out-of-range ids,
//! mismatched downcasts, queries before a successful load) panic instead.

use reflect_array::AllocError;
use reflect_model::{Kind, Profile};

/// Image construction errors
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Id does not name a record added to this builder
    #[error("unknown {kind} id {index}")]
    UnknownId {
        /// Kind the id was expected to name
        kind: Kind,
        /// Raw index
        index: u32,
    },

    /// Parent kind cannot own the child kind
    #[error("{child} cannot be owned by {parent}")]
    InvalidParent {
        /// Kind being added
        child: Kind,
        /// Kind of the requested parent
        parent: Kind,
    },

    /// Template instantiation with too many arguments
    #[error("template type '{name}' has {count} arguments, at most {max} are recorded")]
    TooManyTemplateArgs {
        /// Instantiation name
        name: String,
        /// Arguments supplied
        count: usize,
        /// Arguments a template type can hold
        max: usize,
    },

    /// Record kind not part of the builder's profile
    #[error("{kind} records are not allowed in the {profile} profile")]
    ProfileViolation {
        /// Rejected kind
        kind: Kind,
        /// Builder profile
        profile: Profile,
    },

    /// Function already has a return value
    #[error("function {function} already has a return value")]
    ReturnAlreadySet {
        /// Raw function id
        function: u32,
    },

    /// Count or offset does not fit in 32 bits
    #[error("too many {what} for 32-bit indices")]
    Overflow {
        /// What overflowed
        what: &'static str,
    },

    /// Allocator refused storage
    #[error("allocation failed: {0}")]
    Alloc(#[from] AllocError),

    /// Built image failed validation
    #[error("invalid image: {0}")]
    Invalid(#[from] ImageError),
}

/// Structural validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
    /// Array not ascending by name hash
    #[error("{array} not sorted by name hash at index {index}")]
    Unsorted {
        /// Array or list pool
        array: &'static str,
        /// First element out of order
        index: usize,
    },

    /// Id outside its arena
    #[error("dangling {array} id {index} (arena holds {len})")]
    DanglingId {
        /// Arena the id points into
        array: &'static str,
        /// Raw index
        index: u32,
        /// Arena length
        len: usize,
    },

    /// Id list span outside its pool
    #[error("{pool} list {start}..+{len} exceeds pool of {pool_len}")]
    ListOutOfBounds {
        /// Pool the list indexes
        pool: &'static str,
        /// First slot
        start: u32,
        /// Slot count
        len: u32,
        /// Pool length
        pool_len: usize,
    },

    /// Record stored in the wrong arena
    #[error("{array}[{index}] has kind {found}, expected {expected}")]
    KindMismatch {
        /// Arena holding the record
        array: &'static str,
        /// Record index
        index: usize,
        /// Kind of the arena
        expected: Kind,
        /// Kind stored in the record
        found: Kind,
    },

    /// Non-root record without a parent
    #[error("{kind} at index {index} has no parent")]
    MissingParent {
        /// Record kind
        kind: Kind,
        /// Record index
        index: usize,
    },

    /// Parent kind cannot own the child kind
    #[error("{child} at index {index} is owned by a {parent}")]
    InvalidParent {
        /// Record kind
        child: Kind,
        /// Record index
        index: usize,
        /// Kind of its parent
        parent: Kind,
    },

    /// Base class chain loops back on itself
    #[error("inheritance cycle through class at index {index}")]
    InheritanceCycle {
        /// Class index
        index: usize,
    },

    /// Parent chain never reaches the root namespace
    #[error("parent chain of {kind} at index {index} does not reach the root namespace")]
    ParentCycle {
        /// Record kind
        kind: Kind,
        /// Record index
        index: usize,
    },

    /// Member list names a record owned by someone else
    #[error("{owner} at index {owner_index} lists {array}[{index}], which it does not own")]
    ForeignMember {
        /// Kind of the list owner
        owner: Kind,
        /// Owner index, `u32::MAX` for the root namespace
        owner_index: u32,
        /// Arena of the listed record
        array: &'static str,
        /// Listed record index
        index: usize,
    },

    /// Return value is not a field owned by its function
    #[error("return value of function {function} is not owned by it")]
    ForeignReturn {
        /// Function index
        function: usize,
    },

    /// Root namespace has a parent or a name
    #[error("root namespace must have no parent and an empty name")]
    InvalidRoot,

    /// Name or text span outside its blob
    #[error("text span {start}..+{len} of {kind} outside blob of {blob_len} bytes")]
    TextOutOfBounds {
        /// Kind of the record holding the span
        kind: Kind,
        /// First byte
        start: u32,
        /// Byte count
        len: u32,
        /// Blob length
        blob_len: usize,
    },

    /// Record kind not allowed by the image's profile
    #[error("{kind} records present in a {profile} image")]
    ProfileViolation {
        /// Rejected kind
        kind: Kind,
        /// Image profile
        profile: Profile,
    },
}

/// Load errors
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Reading the input failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input is not a database file
    #[error("bad magic {found:02x?}")]
    BadMagic {
        /// First four bytes read
        found: [u8; 4],
    },

    /// Format version this build cannot read
    #[error("unsupported format version {found} (supported: {supported})")]
    UnsupportedVersion {
        /// Version in the header
        found: u16,
        /// Version this build reads
        supported: u16,
    },

    /// Unknown profile tag in the header
    #[error("unknown profile tag {0}")]
    UnknownProfile(u8),

    /// Reserved header byte is not zero
    #[error("reserved header byte is {0:#04x}, expected 0")]
    ReservedByte(u8),

    /// Payload larger than the configured limit
    #[error("payload of {len} bytes exceeds limit of {max}")]
    TooLarge {
        /// Declared payload length
        len: u64,
        /// Configured limit
        max: u64,
    },

    /// Fewer payload bytes than the header declares
    #[error("payload length mismatch: header declares {expected}, read {actual}")]
    LengthMismatch {
        /// Length in the header
        expected: u64,
        /// Bytes actually read
        actual: u64,
    },

    /// Payload bytes do not match the header checksum
    #[error("checksum mismatch: expected {expected}, computed {actual}")]
    ChecksumMismatch {
        /// Hex checksum from the header
        expected: String,
        /// Hex checksum of the payload read
        actual: String,
    },

    /// Payload is not a valid image encoding
    #[error("decode failed: {0}")]
    Decode(#[from] bincode::Error),

    /// Decoded image is structurally invalid
    #[error("invalid image: {0}")]
    Validation(#[from] ImageError),

    /// Image profile does not satisfy the configured profile
    #[error("image profile {found} does not satisfy required profile {required}")]
    ProfileMismatch {
        /// Profile the configuration demands
        required: Profile,
        /// Profile of the image
        found: Profile,
    },

    /// Allocator refused storage
    #[error("allocation failed: {0}")]
    Alloc(#[from] AllocError),

    /// Second load under the reject policy
    #[error("database already loaded")]
    AlreadyLoaded,
}

impl LoadError {
    /// True when the input bytes were at fault (as opposed to I/O or policy)
    #[inline]
    #[must_use]
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            Self::BadMagic { .. }
                | Self::UnknownProfile(_)
                | Self::ReservedByte(_)
                | Self::LengthMismatch { .. }
                | Self::ChecksumMismatch { .. }
                | Self::Decode(_)
                | Self::Validation(_)
        )
    }
}

/// Write errors
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// Writing the output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image could not be encoded
    #[error("encode failed: {0}")]
    Encode(#[from] bincode::Error),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading the file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML did not parse
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_error_display() {
        let err = BuildError::InvalidParent {
            child: Kind::Field,
            parent: Kind::Namespace,
        };
        assert_eq!(err.to_string(), "Field cannot be owned by Namespace");
    }

    #[test]
    fn image_error_converts_to_load_error() {
        let err: LoadError = ImageError::InvalidRoot.into();
        assert!(err.is_corrupt());
        assert!(err.to_string().contains("root namespace"));
    }

    #[test]
    fn already_loaded_is_not_corrupt() {
        assert!(!LoadError::AlreadyLoaded.is_corrupt());
        let io = LoadError::Io(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof"));
        assert!(!io.is_corrupt());
    }

    #[test]
    fn bad_magic_display() {
        let err = LoadError::BadMagic { found: *b"ABCD" };
        assert!(err.to_string().starts_with("bad magic"));
    }
}
