//! Dataset download.
//!
//! Streams an archive over HTTP into `dest`, writing through a `.part` file
//! so an interrupted download never leaves a truncated final artifact.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

/// Download `url` to `dest`, returning the number of bytes written.
pub fn download(url: &str, dest: &Path) -> Result<u64> {
    let response = ureq::get(url)
        .call()
        .with_context(|| format!("request to {url} failed"))?;

    let total: Option<u64> = response
        .header("Content-Length")
        .and_then(|len| len.parse().ok());
    let progress = match total {
        Some(total) => {
            let bar = ProgressBar::new(total);
            bar.set_style(
                ProgressStyle::with_template("{bytes}/{total_bytes} [{bar:30}] {eta}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar
        }
        None => ProgressBar::new_spinner(),
    };

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let part_path = dest.with_extension("part");
    let mut part = fs::File::create(&part_path)
        .with_context(|| format!("failed to create {}", part_path.display()))?;

    let mut reader = progress.wrap_read(response.into_reader());
    let written = std::io::copy(&mut reader, &mut part).context("download interrupted")?;
    progress.finish_and_clear();

    if let Some(total) = total {
        if written != total {
            fs::remove_file(&part_path).ok();
            return Err(anyhow!(
                "short download: expected {total} bytes, received {written}"
            ));
        }
    }

    fs::rename(&part_path, dest)
        .with_context(|| format!("failed to move download into {}", dest.display()))?;
    Ok(written)
}
