//! Userspace side of the KFD (AMD compute kernel driver) ioctl ABI, version 1.2.
//!
//! [`kfd::ioctl`] holds the byte-exact argument structures and command codes,
//! and [`kfd::device::KfdDevice`] issues them against `/dev/kfd`.

pub mod error;
pub mod kfd;
pub mod utils;

pub use error::{KfdError, KfdResult};
pub use kfd::device::{DeviceControl, KfdDevice, PmcAccess};
