use std::fmt::{Debug, Display};

use rand::{distributions::Alphanumeric, Rng};

pub const ID_LEN: usize = 32;

/// Group lengths of the dashed rendering, e.g. `abcdef-ghij-...-uvwxyz`.
const DASH_GROUPS: [usize; 7] = [6, 4, 4, 4, 4, 4, 6];

/// A PV, VG or LV identifier: 32 random ASCII letters and digits.
///
/// LVM2 stores the raw 32 bytes in the label sector and the dashed form in the
/// metadata text. Identifiers only have to be unique within a single image.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Identifier([u8; ID_LEN]);

impl Identifier {
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut id = [0u8; ID_LEN];
        id.iter_mut().for_each(|b| *b = rng.sample(Alphanumeric));
        Self(id)
    }

    pub fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.0
    }

    pub fn dashed(&self) -> String {
        let mut out = String::with_capacity(ID_LEN + DASH_GROUPS.len() - 1);
        let mut rest = &self.0[..];
        for (i, len) in DASH_GROUPS.iter().enumerate() {
            if i > 0 {
                out.push('-');
            }
            let (group, tail) = rest.split_at(*len);
            out.extend(group.iter().copied().map(char::from));
            rest = tail;
        }
        out
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.dashed())
    }
}

impl Debug for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Identifier").field(&self.dashed()).finish()
    }
}
