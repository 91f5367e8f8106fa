//! Argument structures and command codes of the KFD ioctl interface, ABI 1.2.
//!
//! Every structure is `#[repr(C)]` with explicit padding members, so its byte
//! image is exactly what the driver reads and writes. Fields marked "from KFD"
//! are populated by the driver and are only meaningful after a successful call.

use crate::error::{KfdError, KfdResult};
use crate::utils::{IocDirection, ioc_dir, ioc_nr, ioc_size, ioc_type, ior, iow, iowr};
use static_assertions::const_assert_eq;
use std::mem::size_of;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

// ===============================================================================================
// Constants and Versioning
// ===============================================================================================

pub const KFD_IOCTL_BASE: u32 = 0x4B; // 'K'
pub const KFD_IOCTL_MAJOR_VERSION: u32 = 1;
pub const KFD_IOCTL_MINOR_VERSION: u32 = 2;

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct GetVersionArgs {
    pub major_version: u32, // from KFD
    pub minor_version: u32, // from KFD
}

/// Generates a typed view of an enum-like `u32` ABI field.
macro_rules! abi_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident : $field:literal {
            $($variant:ident = $value:path),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u32)]
        pub enum $name {
            $($variant = $value),+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];
        }

        impl TryFrom<u32> for $name {
            type Error = KfdError;

            fn try_from(value: u32) -> KfdResult<Self> {
                match value {
                    $($value => Ok(Self::$variant),)+
                    _ => Err(KfdError::InvalidValue { field: $field, value }),
                }
            }
        }

        impl From<$name> for u32 {
            fn from(value: $name) -> u32 {
                value as u32
            }
        }
    };
}

// ===============================================================================================
// Queue Management
// ===============================================================================================

pub const KFD_IOC_QUEUE_TYPE_COMPUTE: u32 = 0x0;
pub const KFD_IOC_QUEUE_TYPE_SDMA: u32 = 0x1;
pub const KFD_IOC_QUEUE_TYPE_COMPUTE_AQL: u32 = 0x2;

pub const KFD_MAX_QUEUE_PERCENTAGE: u32 = 100;
pub const KFD_MAX_QUEUE_PRIORITY: u32 = 15;

abi_enum! {
    pub enum QueueType: "queue_type" {
        Compute = KFD_IOC_QUEUE_TYPE_COMPUTE,
        Sdma = KFD_IOC_QUEUE_TYPE_SDMA,
        ComputeAql = KFD_IOC_QUEUE_TYPE_COMPUTE_AQL,
    }
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct CreateQueueArgs {
    pub ring_base_address: u64,     // to KFD
    pub write_pointer_address: u64, // from KFD
    pub read_pointer_address: u64,  // from KFD
    pub doorbell_offset: u64,       // from KFD

    pub ring_size: u32,        // to KFD
    pub gpu_id: u32,           // to KFD
    pub queue_type: u32,       // to KFD
    pub queue_percentage: u32, // to KFD
    pub queue_priority: u32,   // to KFD
    pub queue_id: u32,         // from KFD

    pub eop_buffer_address: u64,       // to KFD
    pub eop_buffer_size: u64,          // to KFD
    pub ctx_save_restore_address: u64, // to KFD
    pub ctx_save_restore_size: u64,    // to KFD
}

impl CreateQueueArgs {
    pub fn queue_type(&self) -> KfdResult<QueueType> {
        QueueType::try_from(self.queue_type)
    }
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct DestroyQueueArgs {
    pub queue_id: u32,
    pub pad: u32,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct UpdateQueueArgs {
    pub ring_base_address: u64,
    pub queue_id: u32,
    pub ring_size: u32,
    pub queue_percentage: u32,
    pub queue_priority: u32,
}

// ===============================================================================================
// Memory Policy
// ===============================================================================================

pub const KFD_IOC_CACHE_POLICY_COHERENT: u32 = 0;
pub const KFD_IOC_CACHE_POLICY_NONCOHERENT: u32 = 1;

abi_enum! {
    pub enum CachePolicy: "cache_policy" {
        Coherent = KFD_IOC_CACHE_POLICY_COHERENT,
        NonCoherent = KFD_IOC_CACHE_POLICY_NONCOHERENT,
    }
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct SetMemoryPolicyArgs {
    pub alternate_aperture_base: u64,
    pub alternate_aperture_size: u64,
    pub gpu_id: u32,
    pub default_policy: u32,
    pub alternate_policy: u32,
    pub pad: u32,
}

impl SetMemoryPolicyArgs {
    #[must_use]
    pub fn new(
        gpu_id: u32,
        default_policy: CachePolicy,
        alternate_policy: CachePolicy,
        alternate_aperture_base: u64,
        alternate_aperture_size: u64,
    ) -> Self {
        Self {
            alternate_aperture_base,
            alternate_aperture_size,
            gpu_id,
            default_policy: default_policy.into(),
            alternate_policy: alternate_policy.into(),
            pad: 0,
        }
    }
}

// ===============================================================================================
// Profiling
// ===============================================================================================

/// All counters are monotonic and unaffected by a GPU reset.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct GetClockCountersArgs {
    pub gpu_clock_counter: u64,    // from KFD
    pub cpu_clock_counter: u64,    // from KFD
    pub system_clock_counter: u64, // from KFD
    pub system_clock_freq: u64,    // from KFD
    pub gpu_id: u32,               // to KFD
    pub pad: u32,
}

// ===============================================================================================
// Process Apertures
// ===============================================================================================

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct ProcessDeviceApertures {
    pub lds_base: u64,
    pub lds_limit: u64,
    pub scratch_base: u64,
    pub scratch_limit: u64,
    pub gpuvm_base: u64,
    pub gpuvm_limit: u64,
    pub gpu_id: u32,
    pub pad: u32,
}

pub const NUM_OF_SUPPORTED_GPUS: usize = 7;

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct GetProcessAperturesArgs {
    pub process_apertures: [ProcessDeviceApertures; NUM_OF_SUPPORTED_GPUS],
    /// In the range `[1, NUM_OF_SUPPORTED_GPUS]` after a successful call.
    pub num_of_nodes: u32,
    pub pad: u32,
}

impl GetProcessAperturesArgs {
    /// The entries the driver filled in. The array is over-allocated; anything
    /// past `num_of_nodes` is left as the caller initialized it.
    #[must_use]
    pub fn apertures(&self) -> &[ProcessDeviceApertures] {
        let count = (self.num_of_nodes as usize).min(NUM_OF_SUPPORTED_GPUS);
        &self.process_apertures[..count]
    }

    #[must_use]
    pub fn find(&self, gpu_id: u32) -> Option<&ProcessDeviceApertures> {
        self.apertures().iter().find(|a| a.gpu_id == gpu_id)
    }
}

// ===============================================================================================
// Debugger
// ===============================================================================================

pub const MAX_ALLOWED_NUM_POINTS: usize = 100;
pub const MAX_ALLOWED_AW_BUFF_SIZE: usize = 4096;
pub const MAX_ALLOWED_WAC_BUFF_SIZE: usize = 128;

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct DbgRegisterArgs {
    pub gpu_id: u32,
    pub pad: u32,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct DbgUnregisterArgs {
    pub gpu_id: u32,
    pub pad: u32,
}

/// Fixed header of an address-watch request. `content` marks where the
/// caller's payload starts; see [`crate::kfd::debug::DbgPayload`].
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct DbgAddressWatchArgs {
    pub gpu_id: u32,
    /// Includes `gpu_id` and `buf_size_in_bytes` themselves.
    pub buf_size_in_bytes: u32,
    pub content: [u8; 0],
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct DbgWaveControlArgs {
    pub gpu_id: u32,
    /// Includes `gpu_id` and `buf_size_in_bytes` themselves.
    pub buf_size_in_bytes: u32,
    pub content: [u8; 0],
}

// ===============================================================================================
// Performance Counters
// ===============================================================================================

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct PmcAcquireAccessArgs {
    pub trace_id: u64,
    pub gpu_id: u32,
    pub pad: u32,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct PmcReleaseAccessArgs {
    pub trace_id: u64,
    pub gpu_id: u32,
    pub pad: u32,
}

// ===============================================================================================
// Events
// ===============================================================================================

// Matching HSA_EVENTTYPE
pub const KFD_IOC_EVENT_SIGNAL: u32 = 0;
pub const KFD_IOC_EVENT_NODECHANGE: u32 = 1;
pub const KFD_IOC_EVENT_DEVICESTATECHANGE: u32 = 2;
pub const KFD_IOC_EVENT_HW_EXCEPTION: u32 = 3;
pub const KFD_IOC_EVENT_SYSTEM_EVENT: u32 = 4;
pub const KFD_IOC_EVENT_DEBUG_EVENT: u32 = 5;
pub const KFD_IOC_EVENT_PROFILE_EVENT: u32 = 6;
pub const KFD_IOC_EVENT_QUEUE_EVENT: u32 = 7;
pub const KFD_IOC_EVENT_MEMORY: u32 = 8;

pub const KFD_IOC_WAIT_RESULT_COMPLETE: u32 = 0;
pub const KFD_IOC_WAIT_RESULT_TIMEOUT: u32 = 1;
pub const KFD_IOC_WAIT_RESULT_FAIL: u32 = 2;

abi_enum! {
    pub enum EventType: "event_type" {
        Signal = KFD_IOC_EVENT_SIGNAL,
        NodeChange = KFD_IOC_EVENT_NODECHANGE,
        DeviceStateChange = KFD_IOC_EVENT_DEVICESTATECHANGE,
        HwException = KFD_IOC_EVENT_HW_EXCEPTION,
        SystemEvent = KFD_IOC_EVENT_SYSTEM_EVENT,
        DebugEvent = KFD_IOC_EVENT_DEBUG_EVENT,
        ProfileEvent = KFD_IOC_EVENT_PROFILE_EVENT,
        QueueEvent = KFD_IOC_EVENT_QUEUE_EVENT,
        Memory = KFD_IOC_EVENT_MEMORY,
    }
}

abi_enum! {
    pub enum WaitResult: "wait_result" {
        Complete = KFD_IOC_WAIT_RESULT_COMPLETE,
        Timeout = KFD_IOC_WAIT_RESULT_TIMEOUT,
        Fail = KFD_IOC_WAIT_RESULT_FAIL,
    }
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct CreateEventArgs {
    pub event_trigger_address: u64, // from KFD - signal events only
    pub event_trigger_data: u32,    // from KFD - signal events only
    pub event_type: u32,            // to KFD
    pub auto_reset: u32,            // to KFD
    pub node_id: u32,               // to KFD - only valid for certain event types
    pub event_id: u32,              // from KFD
    pub pad: u32,
}

impl CreateEventArgs {
    #[must_use]
    pub fn new(event_type: EventType, auto_reset: bool, node_id: u32) -> Self {
        Self {
            event_type: event_type.into(),
            auto_reset: u32::from(auto_reset),
            node_id,
            ..Self::default()
        }
    }

    pub fn event_type(&self) -> KfdResult<EventType> {
        EventType::try_from(self.event_type)
    }
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct DestroyEventArgs {
    pub event_id: u32,
    pub pad: u32,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct SetEventArgs {
    pub event_id: u32,
    pub pad: u32,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct ResetEventArgs {
    pub event_id: u32,
    pub pad: u32,
}

/// `events_ptr` points at a caller-owned array of `num_events` event ids.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct WaitEventsArgs {
    pub events_ptr: u64,   // to KFD
    pub num_events: u32,   // to KFD
    pub wait_for_all: u32, // to KFD
    pub timeout: u32,      // to KFD, milliseconds
    pub wait_result: u32,  // from KFD
}

impl WaitEventsArgs {
    pub fn wait_result(&self) -> KfdResult<WaitResult> {
        WaitResult::try_from(self.wait_result)
    }
}

// ===============================================================================================
// Graphics Interop & GPU Mappings
// ===============================================================================================

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct OpenGraphicHandleArgs {
    pub va_addr: u64,           // to KFD
    pub handle: u64,            // from KFD
    pub gpu_id: u32,            // to KFD
    pub graphic_device_fd: i32, // to KFD
    pub graphic_handle: u32,    // to KFD
    pub pad: u32,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct MapMemoryToGpuArgs {
    pub va_addr: u64, // to KFD
    pub size: u64,    // to KFD
    pub handle: u64,  // from KFD
    pub gpu_id: u32,  // to KFD
    pub pad: u32,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct UnmapMemoryFromGpuArgs {
    pub handle: u64, // to KFD
}

// Sizes are part of the command codes below, so any drift changes the ABI.
const_assert_eq!(size_of::<GetVersionArgs>(), 8);
const_assert_eq!(size_of::<CreateQueueArgs>(), 88);
const_assert_eq!(size_of::<DestroyQueueArgs>(), 8);
const_assert_eq!(size_of::<UpdateQueueArgs>(), 24);
const_assert_eq!(size_of::<SetMemoryPolicyArgs>(), 32);
const_assert_eq!(size_of::<GetClockCountersArgs>(), 40);
const_assert_eq!(size_of::<ProcessDeviceApertures>(), 56);
const_assert_eq!(size_of::<GetProcessAperturesArgs>(), 400);
const_assert_eq!(size_of::<DbgRegisterArgs>(), 8);
const_assert_eq!(size_of::<DbgUnregisterArgs>(), 8);
const_assert_eq!(size_of::<DbgAddressWatchArgs>(), 8);
const_assert_eq!(size_of::<DbgWaveControlArgs>(), 8);
const_assert_eq!(size_of::<PmcAcquireAccessArgs>(), 16);
const_assert_eq!(size_of::<PmcReleaseAccessArgs>(), 16);
const_assert_eq!(size_of::<CreateEventArgs>(), 32);
const_assert_eq!(size_of::<DestroyEventArgs>(), 8);
const_assert_eq!(size_of::<SetEventArgs>(), 8);
const_assert_eq!(size_of::<ResetEventArgs>(), 8);
const_assert_eq!(size_of::<WaitEventsArgs>(), 24);
const_assert_eq!(size_of::<OpenGraphicHandleArgs>(), 32);
const_assert_eq!(size_of::<MapMemoryToGpuArgs>(), 32);
const_assert_eq!(size_of::<UnmapMemoryFromGpuArgs>(), 8);

// ===============================================================================================
// IOCTL Command Definitions
// ===============================================================================================

pub const AMDKFD_IOC_GET_VERSION: u32 = ior::<GetVersionArgs>(KFD_IOCTL_BASE, 1);
pub const AMDKFD_IOC_CREATE_QUEUE: u32 = iowr::<CreateQueueArgs>(KFD_IOCTL_BASE, 2);
pub const AMDKFD_IOC_DESTROY_QUEUE: u32 = iowr::<DestroyQueueArgs>(KFD_IOCTL_BASE, 3);
pub const AMDKFD_IOC_SET_MEMORY_POLICY: u32 = iow::<SetMemoryPolicyArgs>(KFD_IOCTL_BASE, 4);
pub const AMDKFD_IOC_GET_CLOCK_COUNTERS: u32 = iowr::<GetClockCountersArgs>(KFD_IOCTL_BASE, 5);
pub const AMDKFD_IOC_GET_PROCESS_APERTURES: u32 =
    ior::<GetProcessAperturesArgs>(KFD_IOCTL_BASE, 6);
pub const AMDKFD_IOC_UPDATE_QUEUE: u32 = iow::<UpdateQueueArgs>(KFD_IOCTL_BASE, 7);
pub const AMDKFD_IOC_DBG_REGISTER: u32 = iow::<DbgRegisterArgs>(KFD_IOCTL_BASE, 8);
pub const AMDKFD_IOC_DBG_UNREGISTER: u32 = iow::<DbgUnregisterArgs>(KFD_IOCTL_BASE, 9);
pub const AMDKFD_IOC_DBG_ADDRESS_WATCH: u32 = iow::<DbgAddressWatchArgs>(KFD_IOCTL_BASE, 10);
pub const AMDKFD_IOC_DBG_WAVE_CONTROL: u32 = iow::<DbgWaveControlArgs>(KFD_IOCTL_BASE, 11);
pub const AMDKFD_IOC_MAP_MEMORY_TO_GPU: u32 = iowr::<MapMemoryToGpuArgs>(KFD_IOCTL_BASE, 12);
pub const AMDKFD_IOC_UNMAP_MEMORY_FROM_GPU: u32 =
    iowr::<UnmapMemoryFromGpuArgs>(KFD_IOCTL_BASE, 13);
pub const AMDKFD_IOC_CREATE_EVENT: u32 = iowr::<CreateEventArgs>(KFD_IOCTL_BASE, 14);
pub const AMDKFD_IOC_DESTROY_EVENT: u32 = iow::<DestroyEventArgs>(KFD_IOCTL_BASE, 15);
pub const AMDKFD_IOC_SET_EVENT: u32 = iow::<SetEventArgs>(KFD_IOCTL_BASE, 16);
pub const AMDKFD_IOC_RESET_EVENT: u32 = iow::<ResetEventArgs>(KFD_IOCTL_BASE, 17);
pub const AMDKFD_IOC_WAIT_EVENTS: u32 = iowr::<WaitEventsArgs>(KFD_IOCTL_BASE, 18);
pub const AMDKFD_IOC_OPEN_GRAPHIC_HANDLE: u32 = iowr::<OpenGraphicHandleArgs>(KFD_IOCTL_BASE, 19);

pub const AMDKFD_IOC_PMC_ACQUIRE_ACCESS: u32 = iow::<PmcAcquireAccessArgs>(KFD_IOCTL_BASE, 98);
pub const AMDKFD_IOC_PMC_RELEASE_ACCESS: u32 = iow::<PmcReleaseAccessArgs>(KFD_IOCTL_BASE, 99);

/// Every command of the catalogue. Numbers 20 through 97 are unassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KfdCommand {
    GetVersion,
    CreateQueue,
    DestroyQueue,
    SetMemoryPolicy,
    GetClockCounters,
    GetProcessApertures,
    UpdateQueue,
    DbgRegister,
    DbgUnregister,
    DbgAddressWatch,
    DbgWaveControl,
    MapMemoryToGpu,
    UnmapMemoryFromGpu,
    CreateEvent,
    DestroyEvent,
    SetEvent,
    ResetEvent,
    WaitEvents,
    OpenGraphicHandle,
    PmcAcquireAccess,
    PmcReleaseAccess,
}

impl KfdCommand {
    pub const ALL: [Self; 21] = [
        Self::GetVersion,
        Self::CreateQueue,
        Self::DestroyQueue,
        Self::SetMemoryPolicy,
        Self::GetClockCounters,
        Self::GetProcessApertures,
        Self::UpdateQueue,
        Self::DbgRegister,
        Self::DbgUnregister,
        Self::DbgAddressWatch,
        Self::DbgWaveControl,
        Self::MapMemoryToGpu,
        Self::UnmapMemoryFromGpu,
        Self::CreateEvent,
        Self::DestroyEvent,
        Self::SetEvent,
        Self::ResetEvent,
        Self::WaitEvents,
        Self::OpenGraphicHandle,
        Self::PmcAcquireAccess,
        Self::PmcReleaseAccess,
    ];

    /// The full request code passed to `ioctl(2)`.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::GetVersion => AMDKFD_IOC_GET_VERSION,
            Self::CreateQueue => AMDKFD_IOC_CREATE_QUEUE,
            Self::DestroyQueue => AMDKFD_IOC_DESTROY_QUEUE,
            Self::SetMemoryPolicy => AMDKFD_IOC_SET_MEMORY_POLICY,
            Self::GetClockCounters => AMDKFD_IOC_GET_CLOCK_COUNTERS,
            Self::GetProcessApertures => AMDKFD_IOC_GET_PROCESS_APERTURES,
            Self::UpdateQueue => AMDKFD_IOC_UPDATE_QUEUE,
            Self::DbgRegister => AMDKFD_IOC_DBG_REGISTER,
            Self::DbgUnregister => AMDKFD_IOC_DBG_UNREGISTER,
            Self::DbgAddressWatch => AMDKFD_IOC_DBG_ADDRESS_WATCH,
            Self::DbgWaveControl => AMDKFD_IOC_DBG_WAVE_CONTROL,
            Self::MapMemoryToGpu => AMDKFD_IOC_MAP_MEMORY_TO_GPU,
            Self::UnmapMemoryFromGpu => AMDKFD_IOC_UNMAP_MEMORY_FROM_GPU,
            Self::CreateEvent => AMDKFD_IOC_CREATE_EVENT,
            Self::DestroyEvent => AMDKFD_IOC_DESTROY_EVENT,
            Self::SetEvent => AMDKFD_IOC_SET_EVENT,
            Self::ResetEvent => AMDKFD_IOC_RESET_EVENT,
            Self::WaitEvents => AMDKFD_IOC_WAIT_EVENTS,
            Self::OpenGraphicHandle => AMDKFD_IOC_OPEN_GRAPHIC_HANDLE,
            Self::PmcAcquireAccess => AMDKFD_IOC_PMC_ACQUIRE_ACCESS,
            Self::PmcReleaseAccess => AMDKFD_IOC_PMC_RELEASE_ACCESS,
        }
    }

    #[must_use]
    pub const fn nr(self) -> u32 {
        ioc_nr(self.code())
    }

    #[must_use]
    pub const fn direction(self) -> IocDirection {
        ioc_dir(self.code())
    }

    #[must_use]
    pub const fn arg_size(self) -> usize {
        ioc_size(self.code())
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::GetVersion => "GET_VERSION",
            Self::CreateQueue => "CREATE_QUEUE",
            Self::DestroyQueue => "DESTROY_QUEUE",
            Self::SetMemoryPolicy => "SET_MEMORY_POLICY",
            Self::GetClockCounters => "GET_CLOCK_COUNTERS",
            Self::GetProcessApertures => "GET_PROCESS_APERTURES",
            Self::UpdateQueue => "UPDATE_QUEUE",
            Self::DbgRegister => "DBG_REGISTER",
            Self::DbgUnregister => "DBG_UNREGISTER",
            Self::DbgAddressWatch => "DBG_ADDRESS_WATCH",
            Self::DbgWaveControl => "DBG_WAVE_CONTROL",
            Self::MapMemoryToGpu => "MAP_MEMORY_TO_GPU",
            Self::UnmapMemoryFromGpu => "UNMAP_MEMORY_FROM_GPU",
            Self::CreateEvent => "CREATE_EVENT",
            Self::DestroyEvent => "DESTROY_EVENT",
            Self::SetEvent => "SET_EVENT",
            Self::ResetEvent => "RESET_EVENT",
            Self::WaitEvents => "WAIT_EVENTS",
            Self::OpenGraphicHandle => "OPEN_GRAPHIC_HANDLE",
            Self::PmcAcquireAccess => "PMC_ACQUIRE_ACCESS",
            Self::PmcReleaseAccess => "PMC_RELEASE_ACCESS",
        }
    }

    /// Looks up the command a full request code belongs to.
    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        if ioc_type(code) != KFD_IOCTL_BASE {
            return None;
        }
        Self::ALL.into_iter().find(|cmd| cmd.code() == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::offset_of;

    #[test]
    fn command_codes_match_reference_literals() {
        assert_eq!(AMDKFD_IOC_GET_VERSION, 0x8008_4B01);
        assert_eq!(AMDKFD_IOC_CREATE_QUEUE, 0xC058_4B02);
        assert_eq!(AMDKFD_IOC_DESTROY_QUEUE, 0xC008_4B03);
        assert_eq!(AMDKFD_IOC_SET_MEMORY_POLICY, 0x4020_4B04);
        assert_eq!(AMDKFD_IOC_GET_CLOCK_COUNTERS, 0xC028_4B05);
        assert_eq!(AMDKFD_IOC_GET_PROCESS_APERTURES, 0x8190_4B06);
        assert_eq!(AMDKFD_IOC_UPDATE_QUEUE, 0x4018_4B07);
        assert_eq!(AMDKFD_IOC_DBG_REGISTER, 0x4008_4B08);
        assert_eq!(AMDKFD_IOC_DBG_UNREGISTER, 0x4008_4B09);
        assert_eq!(AMDKFD_IOC_DBG_ADDRESS_WATCH, 0x4008_4B0A);
        assert_eq!(AMDKFD_IOC_DBG_WAVE_CONTROL, 0x4008_4B0B);
        assert_eq!(AMDKFD_IOC_MAP_MEMORY_TO_GPU, 0xC020_4B0C);
        assert_eq!(AMDKFD_IOC_UNMAP_MEMORY_FROM_GPU, 0xC008_4B0D);
        assert_eq!(AMDKFD_IOC_CREATE_EVENT, 0xC020_4B0E);
        assert_eq!(AMDKFD_IOC_DESTROY_EVENT, 0x4008_4B0F);
        assert_eq!(AMDKFD_IOC_SET_EVENT, 0x4008_4B10);
        assert_eq!(AMDKFD_IOC_RESET_EVENT, 0x4008_4B11);
        assert_eq!(AMDKFD_IOC_WAIT_EVENTS, 0xC018_4B12);
        assert_eq!(AMDKFD_IOC_OPEN_GRAPHIC_HANDLE, 0xC020_4B13);
        assert_eq!(AMDKFD_IOC_PMC_ACQUIRE_ACCESS, 0x4010_4B62);
        assert_eq!(AMDKFD_IOC_PMC_RELEASE_ACCESS, 0x4010_4B63);
    }

    #[test]
    fn catalogue_numbers_and_directions() {
        let nrs: Vec<u32> = KfdCommand::ALL.iter().map(|c| c.nr()).collect();
        let mut expected: Vec<u32> = (1..=19).collect();
        expected.extend([98, 99]);
        assert_eq!(nrs, expected);

        assert_eq!(KfdCommand::GetVersion.direction(), IocDirection::Read);
        assert_eq!(KfdCommand::GetProcessApertures.direction(), IocDirection::Read);
        assert_eq!(KfdCommand::CreateQueue.direction(), IocDirection::ReadWrite);
        assert_eq!(KfdCommand::CreateEvent.direction(), IocDirection::ReadWrite);
        assert_eq!(KfdCommand::MapMemoryToGpu.direction(), IocDirection::ReadWrite);
        assert_eq!(KfdCommand::SetMemoryPolicy.direction(), IocDirection::Write);
        assert_eq!(KfdCommand::DbgRegister.direction(), IocDirection::Write);
        assert_eq!(KfdCommand::PmcReleaseAccess.direction(), IocDirection::Write);

        assert_eq!(KfdCommand::CreateQueue.arg_size(), size_of::<CreateQueueArgs>());
        assert_eq!(
            KfdCommand::GetProcessApertures.arg_size(),
            size_of::<GetProcessAperturesArgs>()
        );
    }

    #[test]
    fn from_code_finds_every_command() {
        for cmd in KfdCommand::ALL {
            assert_eq!(KfdCommand::from_code(cmd.code()), Some(cmd));
        }
        // Unassigned number, and a foreign magic with a valid number.
        assert_eq!(KfdCommand::from_code(iow::<SetEventArgs>(KFD_IOCTL_BASE, 20)), None);
        assert_eq!(KfdCommand::from_code(ior::<GetVersionArgs>(0x4C, 1)), None);
    }

    #[test]
    fn bound_constants() {
        assert_eq!(NUM_OF_SUPPORTED_GPUS, 7);
        assert_eq!(MAX_ALLOWED_NUM_POINTS, 100);
        assert_eq!(MAX_ALLOWED_AW_BUFF_SIZE, 4096);
        assert_eq!(MAX_ALLOWED_WAC_BUFF_SIZE, 128);
        assert_eq!(KFD_MAX_QUEUE_PERCENTAGE, 100);
        assert_eq!(KFD_MAX_QUEUE_PRIORITY, 15);
        assert_eq!((KFD_IOCTL_MAJOR_VERSION, KFD_IOCTL_MINOR_VERSION), (1, 2));
    }

    #[test]
    fn enum_value_sets() {
        assert_eq!(
            QueueType::ALL.iter().map(|&v| u32::from(v)).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(
            CachePolicy::ALL.iter().map(|&v| u32::from(v)).collect::<Vec<_>>(),
            vec![0, 1]
        );
        assert_eq!(
            EventType::ALL.iter().map(|&v| u32::from(v)).collect::<Vec<_>>(),
            (0..=8).collect::<Vec<_>>()
        );
        assert_eq!(
            WaitResult::ALL.iter().map(|&v| u32::from(v)).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );

        assert_eq!(EventType::try_from(8).unwrap(), EventType::Memory);
        assert!(matches!(
            EventType::try_from(9),
            Err(KfdError::InvalidValue { field: "event_type", value: 9 })
        ));
        assert!(QueueType::try_from(3).is_err());
        assert!(CachePolicy::try_from(2).is_err());
        assert!(WaitResult::try_from(3).is_err());
    }

    /// Asserts every field offset of a struct, in declaration order.
    macro_rules! assert_layout {
        ($ty:ty, size = $size:expr, { $($field:ident: $offset:expr),+ $(,)? }) => {
            assert_eq!(size_of::<$ty>(), $size, "size of {}", stringify!($ty));
            $(
                assert_eq!(
                    offset_of!($ty, $field),
                    $offset,
                    "{}::{}",
                    stringify!($ty),
                    stringify!($field)
                );
            )+
        };
    }

    #[test]
    fn version_and_queue_layout() {
        assert_layout!(GetVersionArgs, size = 8, {
            major_version: 0,
            minor_version: 4,
        });
        assert_layout!(CreateQueueArgs, size = 88, {
            ring_base_address: 0,
            write_pointer_address: 8,
            read_pointer_address: 16,
            doorbell_offset: 24,
            ring_size: 32,
            gpu_id: 36,
            queue_type: 40,
            queue_percentage: 44,
            queue_priority: 48,
            queue_id: 52,
            eop_buffer_address: 56,
            eop_buffer_size: 64,
            ctx_save_restore_address: 72,
            ctx_save_restore_size: 80,
        });
        assert_layout!(DestroyQueueArgs, size = 8, { queue_id: 0, pad: 4 });
        assert_layout!(UpdateQueueArgs, size = 24, {
            ring_base_address: 0,
            queue_id: 8,
            ring_size: 12,
            queue_percentage: 16,
            queue_priority: 20,
        });
    }

    #[test]
    fn memory_and_clock_layout() {
        assert_layout!(SetMemoryPolicyArgs, size = 32, {
            alternate_aperture_base: 0,
            alternate_aperture_size: 8,
            gpu_id: 16,
            default_policy: 20,
            alternate_policy: 24,
            pad: 28,
        });
        assert_layout!(GetClockCountersArgs, size = 40, {
            gpu_clock_counter: 0,
            cpu_clock_counter: 8,
            system_clock_counter: 16,
            system_clock_freq: 24,
            gpu_id: 32,
            pad: 36,
        });
        assert_layout!(OpenGraphicHandleArgs, size = 32, {
            va_addr: 0,
            handle: 8,
            gpu_id: 16,
            graphic_device_fd: 20,
            graphic_handle: 24,
            pad: 28,
        });
        assert_layout!(MapMemoryToGpuArgs, size = 32, {
            va_addr: 0,
            size: 8,
            handle: 16,
            gpu_id: 24,
            pad: 28,
        });
        assert_layout!(UnmapMemoryFromGpuArgs, size = 8, { handle: 0 });
    }

    #[test]
    fn aperture_layout() {
        assert_layout!(ProcessDeviceApertures, size = 56, {
            lds_base: 0,
            lds_limit: 8,
            scratch_base: 16,
            scratch_limit: 24,
            gpuvm_base: 32,
            gpuvm_limit: 40,
            gpu_id: 48,
            pad: 52,
        });
        assert_layout!(GetProcessAperturesArgs, size = 400, {
            process_apertures: 0,
            num_of_nodes: 392,
            pad: 396,
        });
    }

    #[test]
    fn debug_and_pmc_layout() {
        assert_layout!(DbgRegisterArgs, size = 8, { gpu_id: 0, pad: 4 });
        assert_layout!(DbgUnregisterArgs, size = 8, { gpu_id: 0, pad: 4 });
        assert_layout!(DbgAddressWatchArgs, size = 8, {
            gpu_id: 0,
            buf_size_in_bytes: 4,
            content: 8,
        });
        assert_layout!(DbgWaveControlArgs, size = 8, {
            gpu_id: 0,
            buf_size_in_bytes: 4,
            content: 8,
        });
        assert_layout!(PmcAcquireAccessArgs, size = 16, {
            trace_id: 0,
            gpu_id: 8,
            pad: 12,
        });
        assert_layout!(PmcReleaseAccessArgs, size = 16, {
            trace_id: 0,
            gpu_id: 8,
            pad: 12,
        });
    }

    #[test]
    fn event_layout() {
        assert_layout!(CreateEventArgs, size = 32, {
            event_trigger_address: 0,
            event_trigger_data: 8,
            event_type: 12,
            auto_reset: 16,
            node_id: 20,
            event_id: 24,
            pad: 28,
        });
        assert_layout!(DestroyEventArgs, size = 8, { event_id: 0, pad: 4 });
        assert_layout!(SetEventArgs, size = 8, { event_id: 0, pad: 4 });
        assert_layout!(ResetEventArgs, size = 8, { event_id: 0, pad: 4 });
        assert_layout!(WaitEventsArgs, size = 24, {
            events_ptr: 0,
            num_events: 8,
            wait_for_all: 12,
            timeout: 16,
            wait_result: 20,
        });
    }

    #[test]
    fn apertures_are_clamped_to_the_reported_count() {
        let mut args = GetProcessAperturesArgs::default();
        for (i, entry) in args.process_apertures.iter_mut().enumerate() {
            entry.gpu_id = 0x100 + i as u32;
        }

        args.num_of_nodes = 2;
        assert_eq!(args.apertures().len(), 2);
        assert!(args.find(0x101).is_some());
        assert!(args.find(0x102).is_none());

        args.num_of_nodes = 40;
        assert_eq!(args.apertures().len(), NUM_OF_SUPPORTED_GPUS);
    }

    #[test]
    fn bytes_are_native_field_order() {
        let args = DestroyEventArgs {
            event_id: 0x0102_0304,
            pad: 0,
        };
        assert_eq!(args.as_bytes()[..4], 0x0102_0304u32.to_ne_bytes());
        assert_eq!(args.as_bytes()[4..], [0; 4]);

        let event = CreateEventArgs::new(EventType::HwException, true, 3);
        assert_eq!(event.event_type().unwrap(), EventType::HwException);
        assert_eq!(event.auto_reset, 1);
        assert_eq!(event.node_id, 3);
    }
}
