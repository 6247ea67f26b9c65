use std::{
    fs::File,
    io::{self, IsTerminal as _},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context as _, Result};
use async_trait::async_trait;

use crate::{
    cmd::Command,
    error::ImageError,
    lvm::{BuildContext, ImageOptions, LvSource, PhysicalVolumeImage},
};

pub struct BuildCommand {
    pub options: crate::cli::BuildOptions,
}

#[async_trait]
impl Command for BuildCommand {
    async fn run(&self) -> Result<()> {
        let sources = self.lv_sources()?;
        let image_options = ImageOptions {
            alignment: self.options.alignment,
            vg_name: self.options.vg_name.clone(),
            pv_device: self.options.pv_device.clone(),
        };
        let output = self
            .options
            .output
            .clone()
            .filter(|path| path.as_os_str() != "-");

        tracing::info!(
            "Building physical volume image from {} payload file(s)",
            sources.len()
        );

        tokio::task::spawn_blocking(move || -> Result<()> {
            let ctx = BuildContext::capture();
            let image = PhysicalVolumeImage::new(sources, image_options)
                .context("Failed to lay out physical volume image")?;

            match output {
                Some(path) => write_to_file(&image, &path, &ctx),
                None => write_to_stdout(&image, &ctx),
            }
        })
        .await
        .context("background task failed")??;

        Ok(())
    }
}

impl BuildCommand {
    /// Pair the inputs with the `--name` values, in order.
    pub fn lv_sources(&self) -> Result<Vec<LvSource>> {
        let inputs = &self.options.inputs;
        let names = &self.options.names;
        if names.len() > inputs.len() {
            bail!(
                "Got {} logical volume names but only {} input files",
                names.len(),
                inputs.len()
            )
        }

        let mut names = names.iter().cloned();
        Ok(inputs
            .iter()
            .map(|path: &PathBuf| LvSource {
                path: path.clone(),
                name: names.next(),
            })
            .collect())
    }
}

fn write_to_file(image: &PhysicalVolumeImage, path: &Path, ctx: &BuildContext) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create output file {path:?}"))?;
    let is_regular_file = file
        .metadata()
        .with_context(|| format!("Failed to stat output file {path:?}"))?
        .is_file();

    let written = image.write(&mut file, ctx).and_then(|_| {
        file.sync_all()
            .map_err(ImageError::write_failure("physical volume image"))
    });

    if let Err(e) = written {
        // Drop the partial image. Block devices are left as they are.
        if is_regular_file {
            if let Err(remove_err) = std::fs::remove_file(path) {
                tracing::warn!("Failed to remove partial image {path:?}: {remove_err}");
            }
        }
        return Err(e).with_context(|| format!("Failed to write image to {path:?}"));
    }

    tracing::info!("Wrote {} bytes to {path:?}", image.total_size());
    Ok(())
}

fn write_to_stdout(image: &PhysicalVolumeImage, ctx: &BuildContext) -> Result<()> {
    let stdout = io::stdout();
    if stdout.is_terminal() {
        return Err(ImageError::OutputIsTerminal.into());
    }

    image
        .write(&mut stdout.lock(), ctx)
        .context("Failed to write image to stdout")?;

    tracing::info!("Wrote {} bytes to stdout", image.total_size());
    Ok(())
}
