use std::path::PathBuf;

use thiserror::Error;

use crate::lvm::{PAGE_SIZE, PRIMARY_MDA_OFFSET};

/// Failures while laying out or writing a physical volume image.
///
/// None of these are retried. Any of them aborts the build, and the caller is
/// expected to rerun the whole invocation.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Failed to open input file {path:?}")]
    MissingInputFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Short or failed copy from {path:?}: transferred {copied} of {expected} bytes")]
    ShortOrFailedCopy {
        path: PathBuf,
        copied: u64,
        expected: u64,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Failed to write {step} to output")]
    WriteFailure {
        step: String,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Invalid alignment {0:#x}: must be a multiple of {page:#x} and larger than {mda:#x}",
        page = PAGE_SIZE,
        mda = PRIMARY_MDA_OFFSET
    )]
    InvalidAlignment(u64),

    #[error("Volume group metadata of {size} bytes does not fit in a metadata area of {area_size} bytes")]
    MetadataTooLarge { size: u64, area_size: u64 },

    #[error("Refusing to write a disk image to a terminal")]
    OutputIsTerminal,
}

impl ImageError {
    pub(crate) fn write_failure(step: impl Into<String>) -> impl FnOnce(std::io::Error) -> Self {
        let step = step.into();
        move |source| ImageError::WriteFailure { step, source }
    }
}

pub type Result<T, E = ImageError> = std::result::Result<T, E>;
