//! download_dataset - fetch the VehiDE dataset archive

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use damage_scan::dataset;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Archive URL.
    #[arg(long)]
    url: String,
    /// Destination file.
    #[arg(long, default_value = "datasets/vehide.zip")]
    dest: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let written = dataset::download(&args.url, &args.dest)?;
    log::info!("downloaded {} bytes to {}", written, args.dest.display());
    log::info!("unpack the archive, then run convert_dataset");
    Ok(())
}
