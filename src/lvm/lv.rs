use std::{
    fs::File,
    io::{self, Write},
    os::fd::AsFd,
    path::{Path, PathBuf},
};

use crate::{
    error::{ImageError, Result},
    fs::copy::{copy_exact, write_zeros},
};

use super::{align_up, metadata::quote, BuildContext, Identifier};

/// LVM2 refuses names longer than this.
pub(crate) const LV_NAME_MAX: usize = 127;

/// LVM2 keeps these prefixes for its own volumes.
const RESERVED_PREFIXES: [&str; 2] = ["snapshot", "pvmove"];

/// Suffixes LVM2 uses for hidden sub-volumes, refused anywhere in a name.
const RESERVED_INFIXES: [&str; 14] = [
    "_cdata", "_cmeta", "_corig", "_cpool", "_cvol", "_iorig", "_mimage", "_mlog", "_pmspare",
    "_rimage", "_rmeta", "_tdata", "_tmeta", "_vorigin",
];

/// A logical volume backed by one payload file, mapped onto a single run of
/// extents on the PV.
#[derive(Debug, Clone)]
pub struct LinearLv {
    id: Identifier,
    name: String,
    source: PathBuf,
    start: u64,
    size: u64,
    aligned_size: u64,
    alignment: u64,
}

impl LinearLv {
    /// Place the payload at `source` at byte offset `start` of the data area.
    ///
    /// The file is opened and stat'ed here so that a missing input aborts the
    /// build before any output is produced. Without a `name` the sanitized file
    /// stem is used.
    pub fn new(
        start: u64,
        alignment: u64,
        source: impl Into<PathBuf>,
        name: Option<String>,
    ) -> Result<Self> {
        let source = source.into();
        debug_assert_eq!(start % alignment, 0);

        let size = File::open(&source)
            .and_then(|file| file.metadata())
            .and_then(|metadata| {
                if metadata.is_file() {
                    Ok(metadata.len())
                } else {
                    Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "not a regular file",
                    ))
                }
            })
            .map_err(|e| ImageError::MissingInputFile {
                path: source.clone(),
                source: e,
            })?;

        let name = match name {
            Some(name) => sanitize_name(&name),
            None => Self::default_name(&source),
        };

        Ok(Self {
            id: Identifier::generate(),
            name,
            source,
            start,
            size,
            aligned_size: align_up(size, alignment),
            alignment,
        })
    }

    pub fn default_name(source: &Path) -> String {
        let stem = source
            .file_stem()
            .map(|stem| stem.to_string_lossy())
            .unwrap_or_default();
        sanitize_name(&stem)
    }

    pub fn id(&self) -> &Identifier {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Offset of the first byte inside the data area.
    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn aligned_size(&self) -> u64 {
        self.aligned_size
    }

    pub fn extent_count(&self) -> u64 {
        self.aligned_size / self.alignment
    }

    /// First extent of this LV on the PV.
    pub fn start_extent(&self) -> u64 {
        self.start / self.alignment
    }

    /// Copy the payload verbatim to `into`, then zero-fill up to the aligned size.
    pub fn stream<W: Write + AsFd>(&self, into: &mut W) -> Result<()> {
        tracing::debug!(
            name = %self.name,
            size = self.size,
            padding = self.aligned_size - self.size,
            "Copying {:?}",
            self.source
        );

        let mut file = File::open(&self.source).map_err(|e| ImageError::MissingInputFile {
            path: self.source.clone(),
            source: e,
        })?;

        copy_exact(&mut file, into, self.size).map_err(|e| ImageError::ShortOrFailedCopy {
            path: self.source.clone(),
            copied: e.copied,
            expected: self.size,
            source: e.source,
        })?;

        write_zeros(into, self.aligned_size - self.size).map_err(ImageError::write_failure(
            format!("padding of logical volume {}", self.name),
        ))
    }

    /// The LV stanza for the `logical_volumes` section of the VG text.
    pub fn describe(&self, pv_alias: &str, ctx: &BuildContext) -> String {
        format!(
            concat!(
                "{name} {{\n",
                "\tid = \"{id}\"\n",
                "\tstatus = [\"READ\", \"WRITE\", \"VISIBLE\"]\n",
                "\tflags = []\n",
                "\tcreation_time = {time}\n",
                "\tcreation_host = {host}\n",
                "\tsegment_count = 1\n",
                "\n",
                "\tsegment1 {{\n",
                "\t\tstart_extent = 0\n",
                "\t\textent_count = {extents}\n",
                "\n",
                "\t\ttype = \"striped\"\n",
                "\t\tstripe_count = 1\t# linear\n",
                "\n",
                "\t\tstripes = [\n",
                "\t\t\t{pv}, {pv_extent}\n",
                "\t\t]\n",
                "\t}}\n",
                "}}\n",
            ),
            name = self.name,
            id = self.id.dashed(),
            time = ctx.creation_time,
            host = quote(&ctx.creation_host),
            extents = self.extent_count(),
            pv = quote(pv_alias),
            pv_extent = self.start_extent(),
        )
    }
}

/// Map `raw` onto the characters LVM2 accepts in object names.
pub fn sanitize_name(raw: &str) -> String {
    let mut name: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '+' | '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    for infix in RESERVED_INFIXES {
        name = name.replace(infix, &infix.replacen('_', "-", 1));
    }
    if name.is_empty()
        || name.starts_with('-')
        || name == "."
        || name == ".."
        || RESERVED_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
    {
        name.insert(0, '_');
    }
    name.truncate(LV_NAME_MAX);
    name
}
