use std::path::PathBuf;

use clap::{Args, Parser};

use crate::{build::CLAP_LONG_VERSION, lvm::DEFAULT_ALIGNMENT};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[clap(long_version = CLAP_LONG_VERSION)]
pub struct Cli {
    #[command(flatten)]
    pub build: BuildOptions,
}

#[derive(Args, Debug, Clone)]
pub struct BuildOptions {
    /// Payload files, one logical volume each, laid out in the given order.
    #[arg()]
    pub inputs: Vec<PathBuf>,

    /// Where to write the image ("-" for stdout, which is also the default).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Extent size and metadata area size in bytes. Accepts K, M and G suffixes.
    #[arg(short, long, default_value_t = DEFAULT_ALIGNMENT, value_parser = parse_size)]
    pub alignment: u64,

    /// Name of the volume group.
    #[arg(long, default_value = "vg0")]
    pub vg_name: String,

    /// Device path recorded as a hint in the physical volume metadata.
    #[arg(long, default_value = "/dev/sda")]
    pub pv_device: String,

    /// Logical volume name, repeat for each input in order. Inputs without a
    /// name use their file stem.
    #[arg(short = 'n', long = "name")]
    pub names: Vec<String>,
}

/// Parse a byte count such as `4096`, `0x100000`, `64K`, `1M` or `1MiB`.
pub fn parse_size(value: &str) -> Result<u64, String> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix("0x") {
        return u64::from_str_radix(hex, 16).map_err(|e| format!("invalid size {value:?}: {e}"));
    }

    let (digits, multiplier) = match value.find(|c: char| c.is_ascii_alphabetic()) {
        Some(at) => {
            let multiplier = match value[at..].to_ascii_uppercase().as_str() {
                "B" => 1,
                "K" | "KB" | "KIB" => 1 << 10,
                "M" | "MB" | "MIB" => 1 << 20,
                "G" | "GB" | "GIB" => 1 << 30,
                suffix => return Err(format!("unknown size suffix {suffix:?}")),
            };
            (&value[..at], multiplier)
        }
        None => (value, 1),
    };

    digits
        .parse::<u64>()
        .map_err(|e| format!("invalid size {value:?}: {e}"))?
        .checked_mul(multiplier)
        .ok_or_else(|| format!("size {value:?} is too large"))
}
