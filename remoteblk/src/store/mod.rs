/// Authoritative holder of device contents.
///
/// One contiguous buffer of `sector_size * sector_count` bytes, addressed
/// by absolute sector index. The buffer length never changes after
/// creation; clients only ever receive transient copies of sector ranges.
use alloc::vec;
use alloc::vec::Vec;

use crate::geometry::Geometry;

mod service;
#[cfg(feature = "std")]
mod server;

pub use service::BlockService;
#[cfg(feature = "std")]
pub use server::serve;


/// Block store error kinds. The service renders these as HTTP 400.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// The requested sector range exceeds the device geometry.
    OutOfBounds,
    /// A write payload does not match the declared sector count.
    PayloadLengthMismatch,
}

impl core::fmt::Display for StoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StoreError::OutOfBounds => write!(f, "requested sector(s) out of bounds"),
            StoreError::PayloadLengthMismatch => {
                write!(f, "payload length does not match the sector count")
            }
        }
    }
}

/// A loaded image whose length disagrees with the configured geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSizeMismatch {
    pub expected: u64,
    pub actual: u64,
}

impl core::fmt::Display for ImageSizeMismatch {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "image is {} byte(s), geometry requires {}",
            self.actual, self.expected
        )
    }
}

/// The device contents.
#[derive(Debug)]
pub struct BlockStore {
    geometry: Geometry,
    data: Vec<u8>,
}

impl BlockStore {
    /// A zero-filled store for the given geometry.
    pub fn new(geometry: Geometry) -> Self {
        Self {
            data: vec![0u8; geometry.total_bytes() as usize],
            geometry,
        }
    }

    /// A store over an existing image. The image length must equal the
    /// geometry's byte length exactly — the buffer never grows or
    /// shrinks afterwards.
    pub fn from_image(geometry: Geometry, image: Vec<u8>) -> Result<Self, ImageSizeMismatch> {
        if image.len() as u64 != geometry.total_bytes() {
            return Err(ImageSizeMismatch {
                expected: geometry.total_bytes(),
                actual: image.len() as u64,
            });
        }
        Ok(Self {
            geometry,
            data: image,
        })
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Copy `sector_count` sectors starting at `start_sector` out of the
    /// buffer.
    pub fn read_sectors(
        &self,
        start_sector: u64,
        sector_count: u64,
    ) -> Result<Vec<u8>, StoreError> {
        let (offset, len) = self.sector_range(start_sector, sector_count)?;
        Ok(self.data[offset..offset + len].to_vec())
    }

    /// Copy `payload` over `sector_count` sectors starting at
    /// `start_sector`. All-or-nothing: on any error the buffer is left
    /// byte-for-byte unchanged.
    pub fn write_sectors(
        &mut self,
        start_sector: u64,
        sector_count: u64,
        payload: &[u8],
    ) -> Result<(), StoreError> {
        let (offset, len) = self.sector_range(start_sector, sector_count)?;
        if payload.len() != len {
            return Err(StoreError::PayloadLengthMismatch);
        }
        self.data[offset..offset + len].copy_from_slice(payload);
        Ok(())
    }

    /// The whole buffer, for the administrative snapshot paths
    /// (save/download/hexdump).
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn sector_range(&self, start_sector: u64, sector_count: u64) -> Result<(usize, usize), StoreError> {
        if !self.geometry.contains(start_sector, sector_count) {
            return Err(StoreError::OutOfBounds);
        }
        let sector_size = self.geometry.sector_size as u64;
        Ok((
            (start_sector * sector_size) as usize,
            (sector_count * sector_size) as usize,
        ))
    }
}
