//! Core types for the Image Source capability.

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Size;

/// Error types for image source operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The referenced file does not exist.
    #[error("Image not found: {0}")]
    NotFound(String),

    /// I/O error while reading the image.
    #[error("I/O error: {0}")]
    Io(String),

    /// The bytes are not an image the decoder understands.
    #[error("Invalid or unsupported image format: {0}")]
    InvalidFormat(String),

    /// The image header reports a zero-sized image.
    #[error("Image has empty dimensions ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
}

impl SourceError {
    pub(crate) fn from_io(path: &Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            SourceError::NotFound(path.display().to_string())
        } else {
            SourceError::Io(format!("{}: {}", path.display(), err))
        }
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
enum HandleRepr {
    Path(PathBuf),
    Memory(Arc<[u8]>),
}

/// Opaque reference to a source image.
///
/// Owned by the caller and never mutated by the engine. Cloning is cheap:
/// in-memory handles share their buffer.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct RasterHandle(HandleRepr);

impl RasterHandle {
    /// Reference an image file on disk.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self(HandleRepr::Path(path.into()))
    }

    /// Reference an encoded image held in memory.
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(HandleRepr::Memory(bytes.into()))
    }

    /// Backing file path, if this handle refers to a file.
    pub fn path(&self) -> Option<&Path> {
        match &self.0 {
            HandleRepr::Path(p) => Some(p.as_path()),
            HandleRepr::Memory(_) => None,
        }
    }

    /// Read the encoded bytes behind this handle.
    pub fn read(&self) -> Result<Cow<'_, [u8]>, SourceError> {
        match &self.0 {
            HandleRepr::Path(p) => std::fs::read(p)
                .map(Cow::Owned)
                .map_err(|e| SourceError::from_io(p, e)),
            HandleRepr::Memory(bytes) => Ok(Cow::Borrowed(&bytes[..])),
        }
    }

    /// Size of the encoded bytes, without reading them.
    pub fn encoded_len(&self) -> Result<u64, SourceError> {
        match &self.0 {
            HandleRepr::Path(p) => std::fs::metadata(p)
                .map(|m| m.len())
                .map_err(|e| SourceError::from_io(p, e)),
            HandleRepr::Memory(bytes) => Ok(bytes.len() as u64),
        }
    }

    /// Format guessed from the file extension. Memory handles have none.
    pub fn format_hint(&self) -> Option<ImageFormatKind> {
        self.path().and_then(ImageFormatKind::from_path)
    }
}

impl fmt::Debug for RasterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            HandleRepr::Path(p) => f.debug_tuple("RasterHandle").field(p).finish(),
            HandleRepr::Memory(bytes) => write!(f, "RasterHandle(<{} bytes>)", bytes.len()),
        }
    }
}

impl fmt::Display for RasterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            HandleRepr::Path(p) => write!(f, "{}", p.display()),
            HandleRepr::Memory(bytes) => write!(f, "<memory:{} bytes>", bytes.len()),
        }
    }
}

/// Resolved metadata of a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    /// Intrinsic size, after orientation correction.
    pub size: Size,
    /// Encoded size in bytes, when it could be resolved.
    pub byte_size: Option<u64>,
}

impl ImageInfo {
    /// Size of the image as uncompressed RGB (3 bytes per pixel).
    pub fn estimated_raw_bytes(&self) -> u64 {
        self.size.area() * 3
    }
}

/// Input formats the engine accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageFormatKind {
    Jpeg,
    Png,
    Webp,
}

impl ImageFormatKind {
    /// Map a file extension (case-insensitive, without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageFormatKind::Jpeg),
            "png" => Some(ImageFormatKind::Png),
            "webp" => Some(ImageFormatKind::Webp),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Canonical extension; `jpeg` is normalized to `jpg`.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormatKind::Jpeg => "jpg",
            ImageFormatKind::Png => "png",
            ImageFormatKind::Webp => "webp",
        }
    }
}

/// Whether a format name or extension is accepted as input.
pub fn is_supported_format(format: &str) -> bool {
    ImageFormatKind::from_extension(format.trim_start_matches('.')).is_some()
}
