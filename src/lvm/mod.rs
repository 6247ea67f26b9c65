//! LVM2 on-disk format, restricted to what a freshly created single-PV volume
//! group with linear logical volumes needs.

pub mod context;
pub mod crc;
pub mod id;
pub mod label;
pub mod lv;
pub mod metadata;
pub mod pv;
mod record;

pub use context::BuildContext;
pub use id::Identifier;
pub use lv::LinearLv;
pub use pv::{ImageOptions, LvSource, PhysicalVolumeImage};

pub const SECTOR_SIZE: u64 = 512;

/// Label sectors written at the start of the image (LVM2 scans these four).
pub const LABEL_SECTORS: u64 = 4;

pub const PAGE_SIZE: u64 = 4096;

pub const DEFAULT_ALIGNMENT: u64 = 1024 * 1024;

/// Byte offset of the primary metadata area. The label sectors take 0x800
/// bytes and are followed by 0x800 bytes of zeros.
pub const PRIMARY_MDA_OFFSET: u64 = 0x1000;

/// Offset and size of an area on the PV, both in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskLocation {
    pub offset: u64,
    pub size: u64,
}

impl DiskLocation {
    pub fn new(offset: u64, size: u64) -> Self {
        Self { offset, size }
    }

    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Round `size` up to the next multiple of `alignment`.
pub fn align_up(size: u64, alignment: u64) -> u64 {
    size.div_ceil(alignment) * alignment
}
