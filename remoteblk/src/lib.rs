//! Remote block device over HTTP.
//!
//! A block-based filesystem driver needs a sector-addressable device; a
//! constrained client has none. This crate bridges the two over a network:
//! [`RemoteBlockDevice`] implements the block-device capability contract by
//! translating every sector read/write into exactly one HTTP round trip,
//! and [`BlockStore`]/[`BlockService`] are the matching server side — one
//! shared in-memory buffer, served sector range by sector range behind a
//! reader/writer lock.
//!
//! The core is `no_std` + `alloc` and speaks any transport that implements
//! the `embedded-io` traits. The `std` feature adds a TCP transport for
//! the adapter and a threaded serving loop for the store.
#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod device;
pub mod geometry;
pub mod proto;
pub mod store;

pub use device::{BlockDevice, DeviceError, RemoteBlockDevice, Transport};
pub use geometry::{Geometry, SECTOR_SIZE};
pub use store::{BlockService, BlockStore, StoreError};

#[cfg(feature = "std")]
pub use device::TcpTransport;
#[cfg(feature = "std")]
pub use store::serve;
