pub mod debug;
pub mod device;
pub mod ioctl;
pub mod queue;
