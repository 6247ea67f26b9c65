use super::{crc::calc_crc, record::RecordWriter, DiskLocation, Identifier, SECTOR_SIZE};

pub const LABEL_ID: &[u8; 8] = b"LABELONE";
pub const LVM2_LABEL_TYPE: &[u8; 8] = b"LVM2 001";

/// Where the checksum lives inside a label sector.
pub const LABEL_CRC_OFFSET: usize = 16;
/// The label checksum covers the sector from this offset to its end.
pub const LABEL_CRC_START: usize = 20;

/// Offset of the PV header relative to the start of the label sector.
const PV_HEADER_OFFSET: u32 = 32;

pub type Sector = [u8; SECTOR_SIZE as usize];

/// Contents of an LVM2 label sector: the label header followed by the PV
/// header describing the single data area and the primary metadata area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSector {
    pub pv_id: Identifier,
    pub device_size: u64,
    pub data_area: DiskLocation,
    pub metadata_area: DiskLocation,
}

impl LabelSector {
    /// Serialize the label as it appears in sector `sector`.
    pub fn to_bytes(&self, sector: u64) -> Sector {
        let mut buf = [0u8; SECTOR_SIZE as usize];
        {
            let mut writer = RecordWriter::new(&mut buf);
            writer
                .put(LABEL_ID)
                .put_u64(sector)
                .put_u32(0) // checksum, filled in below
                .put_u32(PV_HEADER_OFFSET)
                .put(LVM2_LABEL_TYPE);
            debug_assert_eq!(writer.position(), PV_HEADER_OFFSET as usize);

            // Each area list is terminated by an all-zero entry.
            writer
                .put(self.pv_id.as_bytes())
                .put_u64(self.device_size)
                .put_location(self.data_area)
                .put_location(DiskLocation::default())
                .put_location(self.metadata_area)
                .put_location(DiskLocation::default());
        }

        let crc = calc_crc(&buf[LABEL_CRC_START..]);
        buf[LABEL_CRC_OFFSET..LABEL_CRC_START].copy_from_slice(&crc.to_le_bytes());
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn le_u32(buf: &[u8], at: usize) -> u32 {
        u32::from_le_bytes(buf[at..at + 4].try_into().unwrap())
    }

    fn le_u64(buf: &[u8], at: usize) -> u64 {
        u64::from_le_bytes(buf[at..at + 8].try_into().unwrap())
    }

    fn sample() -> LabelSector {
        LabelSector {
            pv_id: Identifier::generate(),
            device_size: 5 * 1024 * 1024,
            data_area: DiskLocation::new(1024 * 1024, 3 * 1024 * 1024),
            metadata_area: DiskLocation::new(0x1000, 1024 * 1024 - 0x1000),
        }
    }

    #[test]
    fn test_label_layout() {
        let label = sample();
        let buf = label.to_bytes(1);

        assert_eq!(&buf[0..8], LABEL_ID);
        assert_eq!(le_u64(&buf, 8), 1);
        assert_eq!(le_u32(&buf, 20), 32);
        assert_eq!(&buf[24..32], LVM2_LABEL_TYPE);
        assert_eq!(&buf[32..64], label.pv_id.as_bytes());
        assert_eq!(le_u64(&buf, 64), 5 * 1024 * 1024);
        assert_eq!(le_u64(&buf, 72), 1024 * 1024);
        assert_eq!(le_u64(&buf, 80), 3 * 1024 * 1024);
        assert!(buf[88..104].iter().all(|&b| b == 0));
        assert_eq!(le_u64(&buf, 104), 0x1000);
        assert_eq!(le_u64(&buf, 112), 1024 * 1024 - 0x1000);
        assert!(buf[120..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_label_checksum_verifies() {
        let buf = sample().to_bytes(0);
        assert_eq!(le_u32(&buf, LABEL_CRC_OFFSET), calc_crc(&buf[LABEL_CRC_START..]));
    }

    #[test]
    fn test_sectors_differ_only_in_number_and_checksum() {
        let label = sample();
        let first = label.to_bytes(0);
        for sector in 1..4u64 {
            let other = label.to_bytes(sector);
            let differing: Vec<usize> = (0..first.len())
                .filter(|&i| first[i] != other[i])
                .collect();
            assert!(differing.iter().all(|&i| (8..20).contains(&i)));
            assert_eq!(le_u64(&other, 8), sector);
            assert_eq!(
                le_u32(&other, LABEL_CRC_OFFSET),
                calc_crc(&other[LABEL_CRC_START..])
            );
        }
    }
}
