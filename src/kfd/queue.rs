use crate::error::{KfdError, KfdResult};
use crate::kfd::ioctl::{
    CreateQueueArgs, KFD_MAX_QUEUE_PERCENTAGE, KFD_MAX_QUEUE_PRIORITY, QueueType, UpdateQueueArgs,
};

/// Collects the caller-owned fields of a queue and checks them before they
/// reach the driver.
///
/// The driver enforces the same bounds; this only fails earlier with a clearer
/// error. Arguments handed straight to [`crate::kfd::device::KfdDevice`] are not
/// checked.
#[derive(Debug, Clone)]
pub struct QueueBuilder {
    gpu_id: u32,
    queue_type: QueueType,
    percentage: u32,
    priority: u32,
    ring_base: u64,
    ring_size: u32,
    eop_buffer: Option<(u64, u64)>,
    ctx_save_restore: Option<(u64, u64)>,
}

impl QueueBuilder {
    #[must_use]
    pub const fn new(gpu_id: u32, ring_base: u64, ring_size: u32) -> Self {
        Self {
            gpu_id,
            ring_base,
            ring_size,
            queue_type: QueueType::Compute,
            percentage: KFD_MAX_QUEUE_PERCENTAGE,
            priority: 7,
            eop_buffer: None,
            ctx_save_restore: None,
        }
    }

    #[must_use]
    pub const fn with_type(mut self, t: QueueType) -> Self {
        self.queue_type = t;
        self
    }

    #[must_use]
    pub const fn with_percentage(mut self, p: u32) -> Self {
        self.percentage = p;
        self
    }

    #[must_use]
    pub const fn with_priority(mut self, p: u32) -> Self {
        self.priority = p;
        self
    }

    #[must_use]
    pub const fn with_eop_buffer(mut self, address: u64, size: u64) -> Self {
        self.eop_buffer = Some((address, size));
        self
    }

    #[must_use]
    pub const fn with_ctx_save_restore(mut self, address: u64, size: u64) -> Self {
        self.ctx_save_restore = Some((address, size));
        self
    }

    fn validate(&self) -> KfdResult<()> {
        if self.percentage > KFD_MAX_QUEUE_PERCENTAGE {
            return Err(KfdError::InvalidArgument(format!(
                "queue percentage {} exceeds {KFD_MAX_QUEUE_PERCENTAGE}",
                self.percentage
            )));
        }
        if self.priority > KFD_MAX_QUEUE_PRIORITY {
            return Err(KfdError::InvalidArgument(format!(
                "queue priority {} exceeds {KFD_MAX_QUEUE_PRIORITY}",
                self.priority
            )));
        }
        // Zero deactivates a queue on update.
        if self.ring_size != 0 && !self.ring_size.is_power_of_two() {
            return Err(KfdError::InvalidArgument(format!(
                "ring size {:#x} is not a power of two",
                self.ring_size
            )));
        }
        Ok(())
    }

    /// Produces the argument for `CREATE_QUEUE`. Driver-owned fields are zeroed.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if percentage, priority or ring size are out of range.
    pub fn build(&self) -> KfdResult<CreateQueueArgs> {
        self.validate()?;

        let (eop_buffer_address, eop_buffer_size) = self.eop_buffer.unwrap_or_default();
        let (ctx_save_restore_address, ctx_save_restore_size) =
            self.ctx_save_restore.unwrap_or_default();

        Ok(CreateQueueArgs {
            ring_base_address: self.ring_base,
            ring_size: self.ring_size,
            gpu_id: self.gpu_id,
            queue_type: self.queue_type.into(),
            queue_percentage: self.percentage,
            queue_priority: self.priority,
            eop_buffer_address,
            eop_buffer_size,
            ctx_save_restore_address,
            ctx_save_restore_size,
            ..CreateQueueArgs::default()
        })
    }

    /// Produces the argument for `UPDATE_QUEUE` on a queue the driver already created.
    ///
    /// # Errors
    /// Same checks as [`QueueBuilder::build`].
    pub fn update_args(&self, queue_id: u32) -> KfdResult<UpdateQueueArgs> {
        self.validate()?;

        Ok(UpdateQueueArgs {
            ring_base_address: self.ring_base,
            queue_id,
            ring_size: self.ring_size,
            queue_percentage: self.percentage,
            queue_priority: self.priority,
        })
    }
}
