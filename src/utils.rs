#![allow(clippy::used_underscore_items, clippy::cast_possible_truncation)]

//! Linux `_IOC` request encoding, as laid out by `asm-generic/ioctl.h`.

const _IOC_NRBITS: u32 = 8;
const _IOC_TYPEBITS: u32 = 8;
const _IOC_SIZEBITS: u32 = 14;
const _IOC_DIRBITS: u32 = 2;

const _IOC_NRMASK: u32 = (1 << _IOC_NRBITS) - 1;
const _IOC_TYPEMASK: u32 = (1 << _IOC_TYPEBITS) - 1;
const _IOC_SIZEMASK: u32 = (1 << _IOC_SIZEBITS) - 1;
const _IOC_DIRMASK: u32 = (1 << _IOC_DIRBITS) - 1;

const _IOC_NRSHIFT: u32 = 0;
const _IOC_TYPESHIFT: u32 = _IOC_NRSHIFT + _IOC_NRBITS;
const _IOC_SIZESHIFT: u32 = _IOC_TYPESHIFT + _IOC_TYPEBITS;
const _IOC_DIRSHIFT: u32 = _IOC_SIZESHIFT + _IOC_SIZEBITS;

const _IOC_NONE: u32 = 0;
const _IOC_WRITE: u32 = 1;
const _IOC_READ: u32 = 2;

/// Data transfer direction of a request, seen from userspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IocDirection {
    None,
    /// Caller populates the argument (`_IOW`).
    Write,
    /// Driver populates the argument (`_IOR`).
    Read,
    /// Both sides populate fields of the same argument (`_IOWR`).
    ReadWrite,
}

impl IocDirection {
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::None => _IOC_NONE,
            Self::Write => _IOC_WRITE,
            Self::Read => _IOC_READ,
            Self::ReadWrite => _IOC_READ | _IOC_WRITE,
        }
    }

    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        match bits & _IOC_DIRMASK {
            _IOC_WRITE => Self::Write,
            _IOC_READ => Self::Read,
            3 => Self::ReadWrite,
            _ => Self::None,
        }
    }
}

#[must_use]
pub const fn _ioc(dir: u32, type_: u32, nr: u32, size: usize) -> u32 {
    (dir << _IOC_DIRSHIFT)
        | (type_ << _IOC_TYPESHIFT)
        | (nr << _IOC_NRSHIFT)
        | ((size as u32) << _IOC_SIZESHIFT)
}

#[must_use]
pub const fn io(type_: u32, nr: u32) -> u32 {
    _ioc(_IOC_NONE, type_, nr, 0)
}

#[must_use]
pub const fn ior<T>(type_: u32, nr: u32) -> u32 {
    _ioc(_IOC_READ, type_, nr, std::mem::size_of::<T>())
}

#[must_use]
pub const fn iow<T>(type_: u32, nr: u32) -> u32 {
    _ioc(_IOC_WRITE, type_, nr, std::mem::size_of::<T>())
}

#[must_use]
pub const fn iowr<T>(type_: u32, nr: u32) -> u32 {
    _ioc(_IOC_READ | _IOC_WRITE, type_, nr, std::mem::size_of::<T>())
}

#[must_use]
pub const fn ioc_dir(request: u32) -> IocDirection {
    IocDirection::from_bits(request >> _IOC_DIRSHIFT)
}

#[must_use]
pub const fn ioc_type(request: u32) -> u32 {
    (request >> _IOC_TYPESHIFT) & _IOC_TYPEMASK
}

#[must_use]
pub const fn ioc_nr(request: u32) -> u32 {
    (request >> _IOC_NRSHIFT) & _IOC_NRMASK
}

#[must_use]
pub const fn ioc_size(request: u32) -> usize {
    ((request >> _IOC_SIZESHIFT) & _IOC_SIZEMASK) as usize
}
