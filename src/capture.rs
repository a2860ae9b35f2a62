//! Capture surface boundary.
//!
//! The poller and the photo capture flow only ever see this trait: a
//! live source with native dimensions that can hand out JPEG-encoded
//! frames. The shipped implementation is backed by a still photo file
//! (the operator points the client at an image on disk); test doubles
//! implement the same trait.

use std::path::Path;

use anyhow::{Context, Result};

/// A frame source for the detection poller and the photo capture.
///
/// Encoding is the surface's concern: a live implementation renders and
/// compresses the current frame at the requested quality, a still
/// implementation hands out its already-encoded bytes. `None` means the
/// surface had no frame to give for this request.
pub trait CaptureSurface: Send + Sync {
    /// Whether a live stream is currently attached
    fn has_stream(&self) -> bool;

    /// Native frame width in pixels; zero while the stream is warming up
    fn width(&self) -> u32;

    /// Native frame height in pixels
    fn height(&self) -> u32;

    /// Encode the current frame as JPEG. Quality is in [0, 1].
    fn to_jpeg(&self, quality: f32) -> Option<Vec<u8>>;
}

/// Capture surface backed by a JPEG file on disk.
pub struct StillImageSurface {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
}

impl StillImageSurface {
    /// Load a photo file. Fails when the file cannot be read or is not
    /// a JPEG with a readable frame header.
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read photo file: {}", path.display()))?;
        let (width, height) = jpeg_dimensions(&bytes)
            .ok_or_else(|| anyhow::anyhow!("Not a readable JPEG file: {}", path.display()))?;

        Ok(Self {
            bytes,
            width,
            height,
        })
    }
}

impl CaptureSurface for StillImageSurface {
    fn has_stream(&self) -> bool {
        true
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    /// The file is already encoded; the quality only applies when a live
    /// surface compresses a raw frame.
    fn to_jpeg(&self, _quality: f32) -> Option<Vec<u8>> {
        Some(self.bytes.clone())
    }
}

/// Read the frame dimensions from a JPEG marker stream.
///
/// Walks the segments after SOI until a start-of-frame marker and reads
/// the two big-endian dimension fields. Returns None for anything that
/// is not a well-formed JPEG prefix.
pub fn jpeg_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.len() < 4 || bytes[0] != 0xFF || bytes[1] != 0xD8 {
        return None;
    }

    let mut i = 2;
    while i + 4 <= bytes.len() {
        if bytes[i] != 0xFF {
            return None;
        }
        let marker = bytes[i + 1];

        // TEM and RSTn are standalone markers without a length field
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            i += 2;
            continue;
        }

        let len = u16::from_be_bytes([bytes[i + 2], bytes[i + 3]]) as usize;
        if len < 2 {
            return None;
        }

        // SOF0..SOF15 carry the frame header, except DHT, JPG and DAC
        // which share the 0xC0 range
        let is_sof = (0xC0..=0xCF).contains(&marker)
            && marker != 0xC4
            && marker != 0xC8
            && marker != 0xCC;

        if is_sof {
            if bytes.len() < i + 9 {
                return None;
            }
            let height = u16::from_be_bytes([bytes[i + 5], bytes[i + 6]]) as u32;
            let width = u16::from_be_bytes([bytes[i + 7], bytes[i + 8]]) as u32;
            return Some((width, height));
        }

        i += 2 + len;
    }

    None
}
