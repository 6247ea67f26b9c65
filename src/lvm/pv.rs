use std::{collections::HashSet, io::Write, os::fd::AsFd, path::PathBuf};

use crate::{
    error::{ImageError, Result},
    fs::copy::write_zeros,
};

use super::{
    label::LabelSector,
    lv::{sanitize_name, LV_NAME_MAX},
    metadata::{indent, quote, MetadataArea},
    BuildContext, DiskLocation, Identifier, LinearLv, DEFAULT_ALIGNMENT, LABEL_SECTORS,
    PAGE_SIZE, PRIMARY_MDA_OFFSET, SECTOR_SIZE,
};

/// Name of the single PV inside the VG text.
const PV_ALIAS: &str = "pv0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageOptions {
    /// Extent size and metadata area size, in bytes.
    pub alignment: u64,
    pub vg_name: String,
    /// Device path recorded as a hint for the PV.
    pub pv_device: String,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            alignment: DEFAULT_ALIGNMENT,
            vg_name: "vg0".to_owned(),
            pv_device: "/dev/sda".to_owned(),
        }
    }
}

/// One payload file and the LV name requested for it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LvSource {
    pub path: PathBuf,
    pub name: Option<String>,
}

impl LvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            name: None,
        }
    }

    pub fn named(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: Some(name.into()),
        }
    }
}

/// A complete PV image: labels, primary metadata, the packed LV payloads and a
/// backup metadata copy at the very end.
///
/// ```text
/// 0x0000      label sectors 0..3
/// 0x0800      zeros
/// 0x1000      primary metadata area   (alignment - 0x1000 bytes)
/// alignment   LV payloads, each padded to a multiple of alignment
/// +dsize      backup metadata area    (alignment bytes)
/// ```
#[derive(Debug)]
pub struct PhysicalVolumeImage {
    pv_id: Identifier,
    vg_id: Identifier,
    options: ImageOptions,
    lvs: Vec<LinearLv>,
    dsize: u64,
}

impl PhysicalVolumeImage {
    /// Lay out one LV per source, back to back and in order.
    ///
    /// Every input is stat'ed here, so a missing file fails the build before a
    /// single byte of output exists.
    pub fn new<I>(sources: I, options: ImageOptions) -> Result<Self>
    where
        I: IntoIterator<Item = LvSource>,
    {
        validate_alignment(options.alignment)?;

        let pv_id = Identifier::generate();
        let vg_id = Identifier::generate();

        let mut lvs = Vec::new();
        let mut taken = HashSet::new();
        let mut dsize = 0;
        for source in sources {
            let base = match &source.name {
                Some(name) => sanitize_name(name),
                None => LinearLv::default_name(&source.path),
            };
            let name = unique_name(base, &mut taken);

            let lv = LinearLv::new(dsize, options.alignment, source.path, Some(name))?;
            if lv.size() == 0 {
                tracing::warn!(
                    "Payload {:?} is empty, logical volume {} gets no extents",
                    lv.source(),
                    lv.name()
                );
            }
            dsize += lv.aligned_size();
            lvs.push(lv);
        }

        let vg_name = sanitize_name(&options.vg_name);
        if vg_name != options.vg_name {
            tracing::warn!("Volume group name {:?} changed to {vg_name}", options.vg_name);
        }

        Ok(Self {
            pv_id,
            vg_id,
            options: ImageOptions { vg_name, ..options },
            lvs,
            dsize,
        })
    }

    pub fn pv_id(&self) -> &Identifier {
        &self.pv_id
    }

    pub fn vg_id(&self) -> &Identifier {
        &self.vg_id
    }

    pub fn vg_name(&self) -> &str {
        &self.options.vg_name
    }

    pub fn lvs(&self) -> &[LinearLv] {
        &self.lvs
    }

    pub fn alignment(&self) -> u64 {
        self.options.alignment
    }

    /// Size of the LV payload region.
    pub fn dsize(&self) -> u64 {
        self.dsize
    }

    pub fn total_size(&self) -> u64 {
        self.alignment() + self.dsize + self.alignment()
    }

    pub fn data_area(&self) -> DiskLocation {
        DiskLocation::new(self.alignment(), self.dsize)
    }

    pub fn primary_metadata_area(&self) -> DiskLocation {
        DiskLocation::new(PRIMARY_MDA_OFFSET, self.alignment() - PRIMARY_MDA_OFFSET)
    }

    pub fn backup_metadata_area(&self) -> DiskLocation {
        DiskLocation::new(self.data_area().end(), self.alignment())
    }

    pub fn label(&self) -> LabelSector {
        LabelSector {
            pv_id: self.pv_id.clone(),
            device_size: self.total_size(),
            data_area: self.data_area(),
            metadata_area: self.primary_metadata_area(),
        }
    }

    /// Render the VG text stored in both metadata areas.
    pub fn describe(&self, ctx: &BuildContext) -> String {
        let lvs: String = self
            .lvs
            .iter()
            .map(|lv| format!("\n{}", indent(&lv.describe(PV_ALIAS, ctx), 2)))
            .collect();

        format!(
            concat!(
                "{vg} {{\n",
                "\tid = \"{vg_id}\"\n",
                "\tseqno = 1\n",
                "\tformat = \"lvm2\"\n",
                "\tstatus = [\"RESIZEABLE\", \"READ\", \"WRITE\"]\n",
                "\tflags = []\n",
                "\textent_size = {extent_size}\n",
                "\tmax_lv = 0\n",
                "\tmax_pv = 0\n",
                "\tmetadata_copies = 0\n",
                "\n",
                "\tphysical_volumes {{\n",
                "\n",
                "\t\t{pv} {{\n",
                "\t\t\tid = \"{pv_id}\"\n",
                "\t\t\tdev = {device}\n",
                "\t\t\tdevice = {device}\t# Hint only\n",
                "\n",
                "\t\t\tstatus = [\"ALLOCATABLE\"]\n",
                "\t\t\tflags = []\n",
                "\t\t\tdev_size = {dev_size}\n",
                "\t\t\tpe_start = {pe_start}\n",
                "\t\t\tpe_count = {pe_count}\n",
                "\t\t}}\n",
                "\t}}\n",
                "\n",
                "\tlogical_volumes {{\n",
                "{lvs}",
                "\t}}\n",
                "}}\n",
                "# Generated by lvmimg {version}\n",
                "\n",
                "contents = \"Text Format Volume Group\"\n",
                "version = 1\n",
                "\n",
                "description = \"Created by lvmimg\"\n",
                "\n",
                "creation_host = {host}\n",
                "creation_time = {time}\n",
            ),
            vg = self.options.vg_name,
            vg_id = self.vg_id.dashed(),
            extent_size = self.alignment() / SECTOR_SIZE,
            pv = PV_ALIAS,
            pv_id = self.pv_id.dashed(),
            device = quote(&self.options.pv_device),
            dev_size = self.total_size() / SECTOR_SIZE,
            pe_start = self.alignment() / SECTOR_SIZE,
            pe_count = self.dsize / self.alignment(),
            lvs = lvs,
            version = env!("CARGO_PKG_VERSION"),
            host = quote(&ctx.creation_host),
            time = ctx.creation_time,
        )
    }

    /// Write the whole image to `output` in a single forward pass.
    pub fn write<W: Write + AsFd>(&self, output: &mut W, ctx: &BuildContext) -> Result<()> {
        let text = self.describe(ctx);
        let primary = MetadataArea::new(self.primary_metadata_area(), &text)?;
        let backup = MetadataArea::new(self.backup_metadata_area(), &text)?;

        tracing::info!(
            pv_id = %self.pv_id,
            vg = %self.options.vg_name,
            alignment = self.alignment(),
            lvs = self.lvs.len(),
            total_size = self.total_size(),
            "Writing physical volume image"
        );

        let label = self.label();
        for sector in 0..LABEL_SECTORS {
            output
                .write_all(&label.to_bytes(sector))
                .map_err(ImageError::write_failure(format!("label sector {sector}")))?;
        }
        write_zeros(output, PRIMARY_MDA_OFFSET - LABEL_SECTORS * SECTOR_SIZE)
            .map_err(ImageError::write_failure("label padding"))?;

        primary.write_to(output, "primary metadata area")?;

        for lv in &self.lvs {
            tracing::info!(
                name = lv.name(),
                offset = self.alignment() + lv.start(),
                size = lv.size(),
                extents = lv.extent_count(),
                "Writing logical volume"
            );
            lv.stream(output)?;
        }

        backup.write_to(output, "backup metadata area")?;

        output
            .flush()
            .map_err(ImageError::write_failure("physical volume image"))
    }
}

fn validate_alignment(alignment: u64) -> Result<()> {
    if alignment % PAGE_SIZE != 0 || alignment <= PRIMARY_MDA_OFFSET {
        return Err(ImageError::InvalidAlignment(alignment));
    }
    Ok(())
}

fn unique_name(base: String, taken: &mut HashSet<String>) -> String {
    let mut name = base.clone();
    let mut n = 1;
    while !taken.insert(name.clone()) {
        let suffix = format!("_{n}");
        // Sanitized names are ASCII, any byte index is a char boundary.
        let keep = base.len().min(LV_NAME_MAX - suffix.len());
        name = format!("{}{suffix}", &base[..keep]);
        n += 1;
    }
    if name != base {
        tracing::warn!("Logical volume name {base} is already used, renamed to {name}");
    }
    name
}
