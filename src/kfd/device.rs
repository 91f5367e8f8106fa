use crate::error::{KfdError, KfdResult};
use crate::kfd::debug::{DbgPayload, DbgPayloadKind};
use crate::kfd::ioctl::{
    CreateEventArgs, CreateQueueArgs, DbgRegisterArgs, DbgUnregisterArgs, DestroyEventArgs,
    DestroyQueueArgs, GetClockCountersArgs, GetProcessAperturesArgs, GetVersionArgs,
    KFD_IOCTL_MAJOR_VERSION, KFD_IOCTL_MINOR_VERSION, KfdCommand, MapMemoryToGpuArgs,
    OpenGraphicHandleArgs, PmcAcquireAccessArgs, PmcReleaseAccessArgs, ResetEventArgs,
    SetEventArgs, SetMemoryPolicyArgs, UnmapMemoryFromGpuArgs, UpdateQueueArgs, WaitEventsArgs,
    WaitResult,
};
use log::{debug, trace, warn};
use std::ffi::c_void;
use std::fs::{File, OpenOptions};
use std::io;
use std::mem::size_of;
use std::os::fd::RawFd;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::sync::Arc;

/// Character device the driver registers.
pub const KFD_DEVICE_PATH: &str = "/dev/kfd";

/// The operating system's device-control primitive.
///
/// [`File`] implements this with `ioctl(2)`. Anything else that can honour the
/// same contract (for example a test double) can stand in for it.
pub trait DeviceControl {
    /// Issues `request` with `arg` as its argument pointer.
    ///
    /// # Safety
    /// `arg` must point to writable memory laid out as `request` expects, at
    /// least as large as the size encoded in `request`, and valid for the
    /// duration of the call.
    unsafe fn device_control(&self, request: u32, arg: *mut c_void) -> io::Result<()>;
}

impl DeviceControl for File {
    unsafe fn device_control(&self, request: u32, arg: *mut c_void) -> io::Result<()> {
        let ret = unsafe { libc::ioctl(self.as_raw_fd(), request as _, arg) };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

/// A handle to the KFD driver.
///
/// Every method is a single synchronous call. On failure no output field is
/// returned, since the driver gives no guarantee about them.
///
/// The control handle sits behind an `Arc`, so the device is cheap to clone and
/// share with objects that must outlive the scope that opened it.
#[derive(Debug)]
pub struct KfdDevice<C: DeviceControl = File> {
    control: Arc<C>,
}

impl<C: DeviceControl> Clone for KfdDevice<C> {
    fn clone(&self) -> Self {
        Self {
            control: Arc::clone(&self.control),
        }
    }
}

impl KfdDevice<File> {
    /// Opens the KFD driver device at [`KFD_DEVICE_PATH`].
    ///
    /// # Errors
    /// Returns an error if `/dev/kfd` cannot be opened (e.g., driver not loaded, permissions).
    pub fn open() -> KfdResult<Self> {
        Self::open_path(KFD_DEVICE_PATH)
    }

    /// Opens the KFD device node at a non-default location.
    ///
    /// # Errors
    /// Returns an error if `path` cannot be opened read-write.
    pub fn open_path<P: AsRef<Path>>(path: P) -> KfdResult<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        debug!("Opened KFD device {}", path.display());

        Ok(Self::with_control(file))
    }
}

impl<C: DeviceControl> KfdDevice<C> {
    pub fn with_control(control: C) -> Self {
        Self {
            control: Arc::new(control),
        }
    }

    #[must_use]
    pub fn control(&self) -> &C {
        &self.control
    }

    /// # Safety
    /// `arg` must satisfy [`DeviceControl::device_control`] for `cmd`.
    unsafe fn ioctl_raw(&self, cmd: KfdCommand, arg: *mut c_void) -> KfdResult<()> {
        trace!("KFD ioctl {} ({:#010x})", cmd.name(), cmd.code());
        unsafe { self.control.device_control(cmd.code(), arg) }.map_err(|source| {
            debug!("KFD ioctl {} failed: {source}", cmd.name());
            KfdError::Ioctl {
                command: cmd.name(),
                source,
            }
        })
    }

    /// Generic unsafe helper to execute an IOCTL.
    ///
    /// # Safety
    /// `T` must be the argument structure of `cmd`.
    unsafe fn ioctl<T>(&self, cmd: KfdCommand, arg: &mut T) -> KfdResult<()> {
        debug_assert_eq!(size_of::<T>(), cmd.arg_size());
        unsafe { self.ioctl_raw(cmd, (arg as *mut T).cast()) }
    }

    // ===========================================================================================
    // Versioning
    // ===========================================================================================

    /// Get the KFD driver version.
    pub fn get_version(&self) -> KfdResult<GetVersionArgs> {
        let mut args = GetVersionArgs::default();
        unsafe {
            self.ioctl(KfdCommand::GetVersion, &mut args)?;
        }
        Ok(args)
    }

    /// Queries the driver version and rejects a different major version.
    ///
    /// An older minor version is accepted; commands added after it may then fail.
    pub fn check_version(&self) -> KfdResult<GetVersionArgs> {
        let version = self.get_version()?;

        if version.major_version != KFD_IOCTL_MAJOR_VERSION {
            warn!(
                "KFD reports ABI {}.{}, this client speaks {}.{}",
                version.major_version,
                version.minor_version,
                KFD_IOCTL_MAJOR_VERSION,
                KFD_IOCTL_MINOR_VERSION
            );
            return Err(KfdError::VersionMismatch {
                major: version.major_version,
                minor: version.minor_version,
                expected_major: KFD_IOCTL_MAJOR_VERSION,
            });
        }
        if version.minor_version < KFD_IOCTL_MINOR_VERSION {
            warn!(
                "KFD ABI minor version {} is older than {}",
                version.minor_version, KFD_IOCTL_MINOR_VERSION
            );
        }

        Ok(version)
    }

    // ===========================================================================================
    // Queue Management
    // ===========================================================================================

    /// Create a queue for a specific GPU.
    ///
    /// The `args` struct must be populated with the Ring Buffer address, size, and type.
    /// On success, `args.queue_id`, the read/write pointer addresses and
    /// `args.doorbell_offset` are populated by the driver.
    pub fn create_queue(&self, args: &mut CreateQueueArgs) -> KfdResult<()> {
        unsafe { self.ioctl(KfdCommand::CreateQueue, args) }
    }

    /// Destroy an existing queue.
    pub fn destroy_queue(&self, queue_id: u32) -> KfdResult<()> {
        let mut args = DestroyQueueArgs { queue_id, pad: 0 };
        unsafe { self.ioctl(KfdCommand::DestroyQueue, &mut args) }
    }

    /// Update an existing queue's ring, percentage or priority.
    pub fn update_queue(&self, args: &UpdateQueueArgs) -> KfdResult<()> {
        let mut args = *args;
        unsafe { self.ioctl(KfdCommand::UpdateQueue, &mut args) }
    }

    // ===========================================================================================
    // Memory
    // ===========================================================================================

    /// Set the default and alternate cache coherency policy of one GPU.
    pub fn set_memory_policy(&self, args: &SetMemoryPolicyArgs) -> KfdResult<()> {
        let mut args = *args;
        unsafe { self.ioctl(KfdCommand::SetMemoryPolicy, &mut args) }
    }

    /// Retrieve the process apertures (LDS, Scratch, GPUVM limits) of every GPU.
    ///
    /// Only [`GetProcessAperturesArgs::apertures`] of the result is meaningful.
    pub fn get_process_apertures(&self) -> KfdResult<GetProcessAperturesArgs> {
        let mut args = GetProcessAperturesArgs::default();
        unsafe {
            self.ioctl(KfdCommand::GetProcessApertures, &mut args)?;
        }
        Ok(args)
    }

    /// Map a buffer into a GPU's virtual address space. Returns the handle the
    /// driver assigned, which [`KfdDevice::unmap_memory_from_gpu`] consumes.
    pub fn map_memory_to_gpu(&self, args: &mut MapMemoryToGpuArgs) -> KfdResult<u64> {
        unsafe {
            self.ioctl(KfdCommand::MapMemoryToGpu, args)?;
        }
        Ok(args.handle)
    }

    pub fn unmap_memory_from_gpu(&self, handle: u64) -> KfdResult<()> {
        let mut args = UnmapMemoryFromGpuArgs { handle };
        unsafe { self.ioctl(KfdCommand::UnmapMemoryFromGpu, &mut args) }
    }

    /// Import a buffer shared by a graphics driver. Returns the KFD handle.
    pub fn open_graphic_handle(&self, args: &mut OpenGraphicHandleArgs) -> KfdResult<u64> {
        unsafe {
            self.ioctl(KfdCommand::OpenGraphicHandle, args)?;
        }
        Ok(args.handle)
    }

    // ===========================================================================================
    // Profiling
    // ===========================================================================================

    /// Retrieve GPU and System clock counters.
    pub fn get_clock_counters(&self, gpu_id: u32) -> KfdResult<GetClockCountersArgs> {
        let mut args = GetClockCountersArgs {
            gpu_id,
            ..GetClockCountersArgs::default()
        };
        unsafe {
            self.ioctl(KfdCommand::GetClockCounters, &mut args)?;
        }
        Ok(args)
    }

    pub fn pmc_acquire_access(&self, gpu_id: u32, trace_id: u64) -> KfdResult<()> {
        let mut args = PmcAcquireAccessArgs {
            trace_id,
            gpu_id,
            pad: 0,
        };
        unsafe { self.ioctl(KfdCommand::PmcAcquireAccess, &mut args) }
    }

    pub fn pmc_release_access(&self, gpu_id: u32, trace_id: u64) -> KfdResult<()> {
        let mut args = PmcReleaseAccessArgs {
            trace_id,
            gpu_id,
            pad: 0,
        };
        unsafe { self.ioctl(KfdCommand::PmcReleaseAccess, &mut args) }
    }

    /// Acquires exclusive performance counter access, released when the guard drops.
    pub fn pmc_access(&self, gpu_id: u32, trace_id: u64) -> KfdResult<PmcAccess<C>> {
        self.pmc_acquire_access(gpu_id, trace_id)?;
        Ok(PmcAccess {
            device: self.clone(),
            gpu_id,
            trace_id,
            held: true,
        })
    }

    // ===========================================================================================
    // Events & Synchronization
    // ===========================================================================================

    /// Create an event. On success `args.event_id` is populated, and for signal
    /// events so are the trigger address and data.
    pub fn create_event(&self, args: &mut CreateEventArgs) -> KfdResult<()> {
        unsafe { self.ioctl(KfdCommand::CreateEvent, args) }
    }

    /// Destroy an event.
    pub fn destroy_event(&self, event_id: u32) -> KfdResult<()> {
        let mut args = DestroyEventArgs { event_id, pad: 0 };
        unsafe { self.ioctl(KfdCommand::DestroyEvent, &mut args) }
    }

    /// Set an event to the signaled state.
    pub fn set_event(&self, event_id: u32) -> KfdResult<()> {
        let mut args = SetEventArgs { event_id, pad: 0 };
        unsafe { self.ioctl(KfdCommand::SetEvent, &mut args) }
    }

    /// Reset an event to the unsignaled state.
    pub fn reset_event(&self, event_id: u32) -> KfdResult<()> {
        let mut args = ResetEventArgs { event_id, pad: 0 };
        unsafe { self.ioctl(KfdCommand::ResetEvent, &mut args) }
    }

    /// Wait for one or all of `event_ids` to be signaled, for at most `timeout_ms`.
    ///
    /// Blocks the calling thread for as long as the driver does.
    pub fn wait_events(
        &self,
        event_ids: &[u32],
        wait_for_all: bool,
        timeout_ms: u32,
    ) -> KfdResult<WaitResult> {
        let num_events = u32::try_from(event_ids.len()).map_err(|_| {
            KfdError::InvalidArgument(format!("{} events in one wait", event_ids.len()))
        })?;

        let mut args = WaitEventsArgs {
            events_ptr: event_ids.as_ptr() as u64,
            num_events,
            wait_for_all: u32::from(wait_for_all),
            timeout: timeout_ms,
            wait_result: 0,
        };
        unsafe {
            self.ioctl(KfdCommand::WaitEvents, &mut args)?;
        }
        args.wait_result()
    }

    // ===========================================================================================
    // Debugging
    // ===========================================================================================

    pub fn dbg_register(&self, gpu_id: u32) -> KfdResult<()> {
        let mut args = DbgRegisterArgs { gpu_id, pad: 0 };
        unsafe { self.ioctl(KfdCommand::DbgRegister, &mut args) }
    }

    pub fn dbg_unregister(&self, gpu_id: u32) -> KfdResult<()> {
        let mut args = DbgUnregisterArgs { gpu_id, pad: 0 };
        unsafe { self.ioctl(KfdCommand::DbgUnregister, &mut args) }
    }

    pub fn dbg_address_watch(&self, payload: &DbgPayload) -> KfdResult<()> {
        self.dbg_payload(DbgPayloadKind::AddressWatch, payload)
    }

    pub fn dbg_wave_control(&self, payload: &DbgPayload) -> KfdResult<()> {
        self.dbg_payload(DbgPayloadKind::WaveControl, payload)
    }

    fn dbg_payload(&self, expected: DbgPayloadKind, payload: &DbgPayload) -> KfdResult<()> {
        if payload.kind() != expected {
            return Err(KfdError::InvalidArgument(format!(
                "{} payload passed as {}",
                payload.kind().name(),
                expected.name()
            )));
        }
        // The copy starts with the header and carries its declared length.
        let mut buf = payload.as_bytes().to_vec();
        unsafe { self.ioctl_raw(expected.command(), buf.as_mut_ptr().cast()) }
    }
}

impl AsRawFd for KfdDevice<File> {
    fn as_raw_fd(&self) -> RawFd {
        self.control.as_raw_fd()
    }
}

/// Exclusive performance counter access for one trace on one GPU.
///
/// Releases the access when dropped; use [`PmcAccess::release`] to observe the result.
#[derive(Debug)]
pub struct PmcAccess<C: DeviceControl = File> {
    device: KfdDevice<C>,
    gpu_id: u32,
    trace_id: u64,
    held: bool,
}

impl<C: DeviceControl> PmcAccess<C> {
    #[must_use]
    pub const fn gpu_id(&self) -> u32 {
        self.gpu_id
    }

    #[must_use]
    pub const fn trace_id(&self) -> u64 {
        self.trace_id
    }

    pub fn release(mut self) -> KfdResult<()> {
        self.held = false;
        self.device.pmc_release_access(self.gpu_id, self.trace_id)
    }
}

impl<C: DeviceControl> Drop for PmcAccess<C> {
    fn drop(&mut self) {
        if !self.held {
            return;
        }
        if let Err(e) = self.device.pmc_release_access(self.gpu_id, self.trace_id) {
            warn!(
                "Failed to release PMC access for trace {} on GPU {:#x}: {e}",
                self.trace_id, self.gpu_id
            );
        }
    }
}
