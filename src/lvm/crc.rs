//! The CRC32 flavour LVM2 uses for label sectors and metadata areas.
//!
//! It is the usual reflected CRC32 polynomial, but seeded with a fixed
//! non-standard value and returned without the final complement. A regular
//! CRC32 implementation will not produce checksums LVM2 accepts.

use crc::{Algorithm, Crc};

pub const INITIAL_CRC: u32 = 0xf597a6cf;

/// `crc` takes the seed in unreflected form and reflects it for `refin`
/// algorithms, so the register starts at [`INITIAL_CRC`].
const LVM2_CRC32: Algorithm<u32> = Algorithm {
    width: 32,
    poly: 0x04c11db7,
    init: INITIAL_CRC.reverse_bits(),
    refin: true,
    refout: true,
    xorout: 0,
    check: 0x4991cf02,
    residue: 0,
};

const CRC: Crc<u32> = Crc::<u32>::new(&LVM2_CRC32);

/// Checksum `data` starting from [`INITIAL_CRC`].
pub fn calc_crc(data: &[u8]) -> u32 {
    CRC.checksum(data)
}

/// Continue a checksum from `seed`. Feeding data in pieces yields the same
/// result as a single call over the concatenation.
pub fn calc_crc_with(seed: u32, data: &[u8]) -> u32 {
    let mut digest = CRC.digest_with_initial(seed.reverse_bits());
    digest.update(data);
    digest.finalize()
}
