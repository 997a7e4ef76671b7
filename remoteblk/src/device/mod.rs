/// Block-device capability contract and client-side error kinds.
///
/// A filesystem driver depends only on the [`BlockDevice`] trait; any
/// storage provider implementing it can back a mounted filesystem.
mod remote;
#[cfg(feature = "std")]
mod tcp;

pub use remote::{RemoteBlockDevice, Transport};
#[cfg(feature = "std")]
pub use tcp::{SocketError, TcpSocket, TcpTransport};

/// The operation set a filesystem driver requires from underlying
/// storage.
///
/// Callers supply transfer buffers whose length is a multiple of the
/// sector size and issue calls serially; implementations may assume no
/// overlapping calls. Dropping an implementation releases nothing
/// remote — the device contents outlive any one handle.
pub trait BlockDevice {
    /// Bytes per sector.
    fn sector_size(&self) -> u32;

    /// Total sectors on the device. Never performs I/O.
    fn capacity(&self) -> u64;

    /// Fill `buf` from the sectors starting at `start_sector`. `buf` is
    /// mutated in place, never replaced.
    fn read_blocks(&mut self, start_sector: u64, buf: &mut [u8]) -> Result<(), DeviceError>;

    /// Write `buf` over the sectors starting at `start_sector`.
    fn write_blocks(&mut self, start_sector: u64, buf: &[u8]) -> Result<(), DeviceError>;

    /// Commit any buffered writes to the device.
    fn sync(&mut self) -> Result<(), DeviceError>;
}

/// Client-side block device error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// Geometry negotiation with the server failed.
    InfoUnavailable,
    /// A transfer buffer length is not a multiple of the sector size.
    /// Raised before any network traffic.
    UnalignedBuffer { len: usize },
    /// The round trip for a sector range did not complete: transport
    /// failure, timeout, or a non-success response.
    TransferFailed {
        start_sector: u64,
        sector_count: u64,
    },
    /// The server answered a read with a payload of the wrong length.
    LengthMismatch { expected: usize, actual: usize },
}

impl core::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DeviceError::InfoUnavailable => {
                write!(f, "unable to fetch device geometry from the server")
            }
            DeviceError::UnalignedBuffer { len } => write!(
                f,
                "buffer of {} byte(s) is not a multiple of the sector size",
                len
            ),
            DeviceError::TransferFailed {
                start_sector,
                sector_count,
            } => write!(
                f,
                "unable to transfer {} sector(s) starting at sector #{}",
                sector_count, start_sector
            ),
            DeviceError::LengthMismatch { expected, actual } => {
                write!(f, "requested {} byte(s) of data, got {}", expected, actual)
            }
        }
    }
}
