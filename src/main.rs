use anyhow::{Context as AnyhowContext, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use indicatif::ProgressStyle;
use log::info;
use tracing::info_span;
use tracing::Span;
use tracing_indicatif::span_ext::IndicatifSpanExt;
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::filter::LevelFilter;

use track_io::config::*;
use track_io::json::*;
use track_io::{export, TrackRecord, Tracklet};

#[derive(Parser)]
#[clap(name = "trackio", about = "Convert tracking results between JSON, MATLAB and HDF5")]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,
    #[clap(flatten)]
    pub config: Config,
}

#[derive(Subcommand)]
pub enum Command {
    /// Re-export a JSON track collection, format taken from the output extension
    Convert {
        #[clap(short, long)]
        input: PathBuf,
        #[clap(short, long)]
        output: PathBuf,
    },
    /// Split a JSON track collection into per-track files with a manifest
    Pack {
        #[clap(short, long)]
        input: PathBuf,
        #[clap(short, long)]
        dir: PathBuf,
    },
    /// Load per-track files through their manifest and export them
    Unpack {
        #[clap(short, long)]
        dir: PathBuf,
        #[clap(short, long)]
        output: PathBuf,
    },
    /// Summarise the objects and tracks of an HDF5 file
    #[cfg(feature = "hdf5")]
    Inspect {
        #[clap(short, long)]
        file: PathBuf,
        /// Read the deprecated per-frame layout
        #[clap(long)]
        legacy: bool,
    },
}

fn progress_span(length: usize) -> Span {
    let span = info_span!("header");
    span.pb_set_style(&ProgressStyle::default_bar());
    span.pb_set_length(length as u64);
    span
}

fn load_collection(input: &Path) -> Result<Vec<Tracklet>> {
    import_json(input).with_context(|| format!("Failed to read tracks from {}", input.display()))
}

fn export_records(output: &Path, tracks: Vec<Tracklet>) -> Result<()> {
    let records: Vec<TrackRecord> = tracks.into_iter().map(TrackRecord::from).collect();
    let written = export(output, &records)
        .with_context(|| format!("Failed to export tracks to {}", output.display()))?;
    info!("Wrote {} tracks to {}", records.len(), written.display());
    Ok(())
}

#[cfg(feature = "hdf5")]
fn inspect(file: &Path, legacy: bool) -> Result<()> {
    use track_io::container::Hdf5Store;
    use track_io::hdf::{Hdf5FileHandler, LegacyHdf5FileHandler, TrackFileHandler};

    let mut handler: Box<dyn TrackFileHandler> = if legacy {
        Box::new(LegacyHdf5FileHandler::<Hdf5Store>::open(file)?)
    } else {
        Box::new(Hdf5FileHandler::<Hdf5Store>::open(file)?)
    };

    let objects = handler.read_objects()?;
    let mut types: Vec<i64> = objects.iter().map(|o| o.object_type).collect();
    types.sort();
    types.dedup();
    info!("{} objects of types {:?}", objects.len(), types);
    info!("{} dummies", handler.read_dummies()?.len());
    info!("{} tracks", handler.read_tracks()?.len());
    handler.close();
    Ok(())
}

fn main() -> Result<()> {
    // parse the config
    let args = Args::parse();
    let _ = CONFIG.set(args.config);
    let config = Config::get();

    // setup logging
    let indicatif_layer = IndicatifLayer::new();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(indicatif_layer.get_stderr_writer()))
        .with(indicatif_layer)
        .with(LevelFilter::INFO)
        .init();

    match args.command {
        Command::Convert { input, output } => {
            let tracks = load_collection(&input)?;
            export_records(&output, tracks)?;
        }
        Command::Pack { input, dir } => {
            let tracks = load_collection(&input)?;
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;

            let header_span = progress_span(tracks.len());
            let header_span_enter = header_span.enter();
            let entry = export_all_tracks_json(&dir, &tracks, config.cell_type, config.as_zip_archive())?;
            std::mem::drop(header_span_enter);
            std::mem::drop(header_span);

            info!("Packed {} tracks into {} (zipped: {})", entry.files.len(), entry.path, entry.zipped);
        }
        Command::Unpack { dir, output } => {
            let tracks = import_all_tracks_json(&dir, config.cell_type)
                .with_context(|| format!("Failed to load tracks from {}", dir.display()))?;
            export_records(&output, tracks)?;
        }
        #[cfg(feature = "hdf5")]
        Command::Inspect { file, legacy } => inspect(&file, legacy)?,
    }

    Ok(())
}
