//! Wire format and loader
//!
//! A database file is a fixed header followed by a `bincode` payload:
//!
//! | offset | size | field                         |
//! |--------|------|-------------------------------|
//! | 0      | 4    | magic `b"RFDB"`               |
//! | 4      | 2    | format version, little-endian |
//! | 6      | 1    | profile tag                   |
//! | 7      | 1    | reserved, zero                |
//! | 8      | 8    | payload length, little-endian |
//! | 16     | 32   | blake3 of the payload         |
//!
//! The query layer only sees the decoded [`MemoryImage`]; the layout above is
//! private to [`BinaryLoader`] and [`write_image`].

use crate::config::DatabaseConfig;
use crate::error::{LoadError, WriteError};
use crate::image::MemoryImage;
use reflect_array::Allocator;
use reflect_model::Profile;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

/// File magic
pub const MAGIC: [u8; 4] = *b"RFDB";

/// Format version written by this build
pub const FORMAT_VERSION: u16 = 1;

/// Header size in bytes
pub const HEADER_LEN: usize = 48;

/// Largest read issued before the payload has proven its length
const READ_CHUNK: u64 = 1 << 20;

/// Decoded file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireHeader {
    /// Format version
    pub version: u16,
    /// Profile of the payload image
    pub profile: Profile,
    /// Payload length in bytes
    pub payload_len: u64,
    /// blake3 of the payload
    pub checksum: [u8; 32],
}

impl WireHeader {
    /// Header describing `payload`
    #[must_use]
    pub fn for_payload(profile: Profile, payload: &[u8]) -> Self {
        Self {
            version: FORMAT_VERSION,
            profile,
            payload_len: payload.len() as u64,
            checksum: *blake3::hash(payload).as_bytes(),
        }
    }

    /// Encode to bytes
    #[must_use]
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&MAGIC);
        bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
        bytes[6] = self.profile.to_u8();
        bytes[8..16].copy_from_slice(&self.payload_len.to_le_bytes());
        bytes[16..48].copy_from_slice(&self.checksum);
        bytes
    }

    /// Decode from bytes
    ///
    /// # Errors
    /// Returns error on bad magic, an unsupported version, an unknown profile
    /// tag or a nonzero reserved byte
    pub fn decode(bytes: &[u8; HEADER_LEN]) -> Result<Self, LoadError> {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        if magic != MAGIC {
            return Err(LoadError::BadMagic { found: magic });
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != FORMAT_VERSION {
            return Err(LoadError::UnsupportedVersion {
                found: version,
                supported: FORMAT_VERSION,
            });
        }

        let profile = Profile::from_u8(bytes[6]).ok_or(LoadError::UnknownProfile(bytes[6]))?;
        if bytes[7] != 0 {
            return Err(LoadError::ReservedByte(bytes[7]));
        }

        let mut len = [0u8; 8];
        len.copy_from_slice(&bytes[8..16]);
        let mut checksum = [0u8; 32];
        checksum.copy_from_slice(&bytes[16..48]);

        let header = Self {
            version,
            profile,
            payload_len: u64::from_le_bytes(len),
            checksum,
        };
        tracing::debug!(
            version,
            profile = %profile,
            payload_len = header.payload_len,
            "decoded wire header"
        );
        Ok(header)
    }

    /// First 16 hex digits of the checksum
    #[must_use]
    pub fn checksum_prefix(&self) -> String {
        hex::encode(&self.checksum[..8])
    }
}

/// Produces a memory image from a byte stream
///
/// The stream is read once and not retained. When an allocator is given,
/// every array of the returned image is charged to it.
pub trait ImageLoader {
    /// Load an image
    ///
    /// # Errors
    /// Returns error if the stream cannot be read or does not hold a valid image
    fn load(
        &self,
        input: &mut dyn Read,
        allocator: Option<&Arc<dyn Allocator>>,
    ) -> Result<MemoryImage, LoadError>;
}

/// Loader for the binary wire format
#[derive(Debug, Clone)]
pub struct BinaryLoader {
    profile: Profile,
    verify: bool,
    max_bytes: Option<u64>,
}

impl BinaryLoader {
    /// Loader with default settings: full profile, verification on, no size limit
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(&DatabaseConfig::default())
    }

    /// Loader using the load settings of `config`
    #[must_use]
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            profile: config.profile,
            verify: config.verify_on_load,
            max_bytes: config.max_image_bytes,
        }
    }

    /// Required profile
    #[inline]
    #[must_use]
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    /// Whether to validate the decoded image
    #[inline]
    #[must_use]
    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Reject payloads larger than `max` bytes
    #[inline]
    #[must_use]
    pub fn with_max_bytes(mut self, max: u64) -> Self {
        self.max_bytes = Some(max);
        self
    }

    /// Load from a file
    ///
    /// # Errors
    /// Returns error if the file cannot be opened or does not hold a valid image
    pub fn load_file(
        &self,
        path: impl AsRef<Path>,
        allocator: Option<&Arc<dyn Allocator>>,
    ) -> Result<MemoryImage, LoadError> {
        let mut reader = BufReader::new(File::open(path)?);
        self.load(&mut reader, allocator)
    }

    fn read_payload(&self, input: &mut dyn Read, header: &WireHeader) -> Result<Vec<u8>, LoadError> {
        if let Some(max) = self.max_bytes {
            if header.payload_len > max {
                return Err(LoadError::TooLarge {
                    len: header.payload_len,
                    max,
                });
            }
        }

        let capacity = usize::try_from(header.payload_len.min(READ_CHUNK)).unwrap_or(0);
        let mut payload = Vec::with_capacity(capacity);
        let read = input.take(header.payload_len).read_to_end(&mut payload)? as u64;
        if read != header.payload_len {
            return Err(LoadError::LengthMismatch {
                expected: header.payload_len,
                actual: read,
            });
        }

        let actual = blake3::hash(&payload);
        if actual.as_bytes() != &header.checksum {
            return Err(LoadError::ChecksumMismatch {
                expected: hex::encode(header.checksum),
                actual: actual.to_hex().to_string(),
            });
        }
        Ok(payload)
    }

    fn decode(
        &self,
        input: &mut dyn Read,
        allocator: Option<&Arc<dyn Allocator>>,
    ) -> Result<(WireHeader, MemoryImage), LoadError> {
        let mut bytes = [0u8; HEADER_LEN];
        input.read_exact(&mut bytes)?;
        let header = WireHeader::decode(&bytes)?;

        if !header.profile.satisfies(self.profile) {
            return Err(LoadError::ProfileMismatch {
                required: self.profile,
                found: header.profile,
            });
        }

        let payload = self.read_payload(input, &header)?;
        let image: MemoryImage = bincode::deserialize(&payload)?;
        drop(payload);

        if image.profile() != header.profile {
            return Err(LoadError::ProfileMismatch {
                required: header.profile,
                found: image.profile(),
            });
        }
        if self.verify {
            image.validate()?;
        }

        let image = match allocator {
            Some(allocator) => image.charge(allocator)?,
            None => image,
        };
        Ok((header, image))
    }
}

impl Default for BinaryLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageLoader for BinaryLoader {
    fn load(
        &self,
        input: &mut dyn Read,
        allocator: Option<&Arc<dyn Allocator>>,
    ) -> Result<MemoryImage, LoadError> {
        match self.decode(input, allocator) {
            Ok((header, image)) => {
                let stats = image.stats();
                tracing::info!(
                    profile = %header.profile,
                    records = stats.records(),
                    names = stats.names,
                    payload_bytes = header.payload_len,
                    charged_bytes = stats.charged_bytes,
                    checksum = %header.checksum_prefix(),
                    "loaded reflection database"
                );
                Ok(image)
            }
            Err(err) => {
                tracing::warn!(error = %err, corrupt = err.is_corrupt(), "failed to load reflection database");
                Err(err)
            }
        }
    }
}

/// Encode `image` into a complete database file
///
/// # Errors
/// Returns error if the image cannot be encoded
pub fn encode_image(image: &MemoryImage) -> Result<Vec<u8>, WriteError> {
    let payload = bincode::serialize(image)?;
    let header = WireHeader::for_payload(image.profile(), &payload);

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(&header.encode());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Write `image` to `output`, returning the number of bytes written
///
/// # Errors
/// Returns error if the image cannot be encoded or the write fails
pub fn write_image(image: &MemoryImage, output: &mut dyn Write) -> Result<u64, WriteError> {
    let bytes = encode_image(image)?;
    output.write_all(&bytes)?;
    output.flush()?;
    tracing::debug!(bytes = bytes.len(), profile = %image.profile(), "wrote reflection database");
    Ok(bytes.len() as u64)
}

/// Write `image` to a file, replacing any existing file
///
/// # Errors
/// Returns error if the image cannot be encoded or the file cannot be written
pub fn write_image_file(image: &MemoryImage, path: impl AsRef<Path>) -> Result<u64, WriteError> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_image(image, &mut writer)
}
