//! Metadata references
//!
//! A [`MetadataReference`] is a precompiled assembly a project references.
//! Its image is a bincode-encoded [`MetadataImage`]: the assembly name plus the
//! declaration trees it exports.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::error::{FinderError, Result, ResultExt};
use crate::core::symbols::Declaration;

/// Image format marker (bump to reject old images)
const IMAGE_FORMAT: u32 = 0x4D44_0001;

/// Decoded contents of a metadata image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataImage {
    format: u32,
    pub assembly_name: String,
    pub declarations: Vec<Declaration>,
}

impl MetadataImage {
    pub fn new(assembly_name: impl Into<String>, declarations: Vec<Declaration>) -> Self {
        Self {
            format: IMAGE_FORMAT,
            assembly_name: assembly_name.into(),
            declarations,
        }
    }

    /// Encode to image bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode image bytes, rejecting foreign formats
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let image: MetadataImage = bincode::deserialize(bytes)?;
        if image.format != IMAGE_FORMAT {
            return Err(FinderError::ImageFormat {
                found: image.format,
            });
        }
        Ok(image)
    }
}

/// A reference to a precompiled assembly
#[derive(Clone)]
pub struct MetadataReference {
    path: PathBuf,
    image: Arc<[u8]>,
    checksum: String,
}

impl MetadataReference {
    /// Wrap raw image bytes. The bytes are not validated until read.
    pub fn from_image(path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes: Vec<u8> = bytes.into();
        let checksum = format!("{:x}", Sha256::digest(&bytes));
        Self {
            path: path.into(),
            image: bytes.into(),
            checksum,
        }
    }

    /// Build a reference from declarations
    pub fn from_declarations(
        path: impl Into<PathBuf>,
        assembly_name: impl Into<String>,
        declarations: Vec<Declaration>,
    ) -> Result<Self> {
        let bytes = MetadataImage::new(assembly_name, declarations).encode()?;
        Ok(Self::from_image(path, bytes))
    }

    /// Load an image file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(FinderError::from)
            .context(format!("reading metadata reference {}", path.display()))?;
        Ok(Self::from_image(path, bytes))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hex SHA-256 of the image bytes
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn image_bytes(&self) -> &[u8] {
        &self.image
    }

    /// Decode the image
    pub fn read_image(&self) -> Result<MetadataImage> {
        MetadataImage::decode(&self.image)
            .context(format!("decoding metadata reference {}", self.path.display()))
    }
}

impl fmt::Debug for MetadataReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataReference")
            .field("path", &self.path)
            .field("checksum", &self.checksum)
            .field("len", &self.image.len())
            .finish()
    }
}

impl PartialEq for MetadataReference {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.checksum == other.checksum
    }
}

impl Eq for MetadataReference {}
