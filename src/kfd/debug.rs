//! Variable-length debugger requests.
//!
//! Address-watch and wave-control requests are an 8-byte header followed by a
//! payload in the same allocation. The header's `buf_size_in_bytes` covers the
//! header too, and the driver copies that many bytes starting at the header.

use crate::error::{KfdError, KfdResult};
use crate::kfd::ioctl::{
    DbgAddressWatchArgs, DbgWaveControlArgs, KfdCommand, MAX_ALLOWED_AW_BUFF_SIZE,
    MAX_ALLOWED_WAC_BUFF_SIZE,
};
use std::mem::size_of;
use zerocopy::IntoBytes;

/// Size of the fixed `gpu_id` + `buf_size_in_bytes` header.
pub const DBG_HEADER_SIZE: usize = size_of::<DbgAddressWatchArgs>();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbgPayloadKind {
    AddressWatch,
    WaveControl,
}

impl DbgPayloadKind {
    /// Largest accepted `buf_size_in_bytes`, header included.
    #[must_use]
    pub const fn max_size(self) -> usize {
        match self {
            Self::AddressWatch => MAX_ALLOWED_AW_BUFF_SIZE,
            Self::WaveControl => MAX_ALLOWED_WAC_BUFF_SIZE,
        }
    }

    #[must_use]
    pub const fn command(self) -> KfdCommand {
        match self {
            Self::AddressWatch => KfdCommand::DbgAddressWatch,
            Self::WaveControl => KfdCommand::DbgWaveControl,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AddressWatch => "address watch",
            Self::WaveControl => "wave control",
        }
    }
}

/// A debugger request with its trailing content laid out contiguously.
#[derive(Debug, Clone)]
pub struct DbgPayload {
    kind: DbgPayloadKind,
    gpu_id: u32,
    buf: Vec<u8>,
}

impl DbgPayload {
    /// # Errors
    /// Returns `PayloadTooLarge` if the header plus `content` exceeds 4096 bytes.
    pub fn address_watch(gpu_id: u32, content: &[u8]) -> KfdResult<Self> {
        Self::new(DbgPayloadKind::AddressWatch, gpu_id, content)
    }

    /// # Errors
    /// Returns `PayloadTooLarge` if the header plus `content` exceeds 128 bytes.
    pub fn wave_control(gpu_id: u32, content: &[u8]) -> KfdResult<Self> {
        Self::new(DbgPayloadKind::WaveControl, gpu_id, content)
    }

    fn new(kind: DbgPayloadKind, gpu_id: u32, content: &[u8]) -> KfdResult<Self> {
        let total = DBG_HEADER_SIZE + content.len();
        if total > kind.max_size() {
            return Err(KfdError::PayloadTooLarge {
                kind: kind.name(),
                size: total,
                max: kind.max_size(),
            });
        }
        // Bounded by max_size above.
        #[allow(clippy::cast_possible_truncation)]
        let buf_size_in_bytes = total as u32;

        let mut buf = Vec::with_capacity(total);
        match kind {
            DbgPayloadKind::AddressWatch => buf.extend_from_slice(
                DbgAddressWatchArgs {
                    gpu_id,
                    buf_size_in_bytes,
                    content: [],
                }
                .as_bytes(),
            ),
            DbgPayloadKind::WaveControl => buf.extend_from_slice(
                DbgWaveControlArgs {
                    gpu_id,
                    buf_size_in_bytes,
                    content: [],
                }
                .as_bytes(),
            ),
        }
        buf.extend_from_slice(content);

        Ok(Self { kind, gpu_id, buf })
    }

    #[must_use]
    pub const fn kind(&self) -> DbgPayloadKind {
        self.kind
    }

    #[must_use]
    pub const fn gpu_id(&self) -> u32 {
        self.gpu_id
    }

    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.buf[DBG_HEADER_SIZE..]
    }

    /// The full request as the driver sees it, header first.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}
