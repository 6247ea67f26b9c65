use std::io::Write;

use crate::{
    error::{ImageError, Result},
    fs::copy::write_zeros,
};

use super::{crc::calc_crc, record::RecordWriter, DiskLocation, SECTOR_SIZE};

/// Magic identifying an LVM2 text-format metadata area header.
pub const FMTT_MAGIC: &[u8; 16] = b" LVM2 x[5A%r0N*>";
pub const FMTT_VERSION: u32 = 1;

/// The header occupies the whole first sector of the area, the VG text starts
/// right after it.
pub const MDA_HEADER_SIZE: u64 = SECTOR_SIZE;

/// The header checksum covers the header sector from this offset to its end.
pub const MDA_CRC_START: usize = 4;

/// One copy of the volume group metadata: header sector, VG text, zero fill.
#[derive(Debug)]
pub struct MetadataArea<'a> {
    location: DiskLocation,
    text: &'a str,
}

impl<'a> MetadataArea<'a> {
    /// Lay out `text` inside the area at `location`, failing if it does not fit.
    pub fn new(location: DiskLocation, text: &'a str) -> Result<Self> {
        let size = MDA_HEADER_SIZE + text.len() as u64;
        if size > location.size {
            return Err(ImageError::MetadataTooLarge {
                size,
                area_size: location.size,
            });
        }
        Ok(Self { location, text })
    }

    pub fn location(&self) -> DiskLocation {
        self.location
    }

    /// Location of the VG text, relative to the start of the area.
    pub fn text_location(&self) -> DiskLocation {
        DiskLocation::new(MDA_HEADER_SIZE, self.text.len() as u64)
    }

    pub fn header_bytes(&self) -> [u8; MDA_HEADER_SIZE as usize] {
        let mut buf = [0u8; MDA_HEADER_SIZE as usize];
        {
            let mut writer = RecordWriter::new(&mut buf);
            writer
                .put_u32(0) // checksum, filled in below
                .put(FMTT_MAGIC)
                .put_u32(FMTT_VERSION)
                .put_location(self.location)
                // First raw location: the current metadata text.
                .put_location(self.text_location())
                .put_u32(calc_crc(self.text.as_bytes()))
                .put_u32(0)
                // Second raw location stays zeroed, it terminates the list.
                .put_location(DiskLocation::default())
                .put_u32(0)
                .put_u32(0);
        }

        let crc = calc_crc(&buf[MDA_CRC_START..]);
        buf[..MDA_CRC_START].copy_from_slice(&crc.to_le_bytes());
        buf
    }

    /// Write the complete area, exactly `location.size` bytes.
    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W, step: &str) -> Result<()> {
        let padding = self.location.size - MDA_HEADER_SIZE - self.text.len() as u64;

        tracing::debug!(
            offset = self.location.offset,
            size = self.location.size,
            text_size = self.text.len(),
            "Writing {step}"
        );

        out.write_all(&self.header_bytes())
            .and_then(|_| out.write_all(self.text.as_bytes()))
            .and_then(|_| write_zeros(out, padding))
            .map_err(ImageError::write_failure(step))
    }
}

/// Quote a string for the LVM2 text format.
pub(crate) fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Prefix every non-empty line of `text` with `depth` tabs.
pub(crate) fn indent(text: &str, depth: usize) -> String {
    let prefix = "\t".repeat(depth);
    text.lines()
        .map(|line| {
            if line.is_empty() {
                "\n".to_owned()
            } else {
                format!("{prefix}{line}\n")
            }
        })
        .collect()
}
