use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use vacmap_builder::build::export;
use vacmap_core::snapshot::save_snapshot;

#[derive(Parser, Debug)]
#[command(name = "vacmap-builder", version, about = "Transcode robot vacuum map files (plain or .gz)")]
struct Args {
    /// Log filter used when RUST_LOG is unset
    #[arg(long = "log-level", value_name = "FILTER", default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sparse map package as JSON
    Package {
        #[arg(long, value_name = "PATH")]
        map: PathBuf,
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
    /// Path package as JSON
    Path {
        #[arg(long, value_name = "PATH")]
        slam: PathBuf,
        /// First kept point to include
        #[arg(long, value_name = "N", default_value_t = 0)]
        from: usize,
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
    /// Persist a full model
    Snapshot {
        #[command(flatten)]
        sources: Sources,
        #[arg(long, value_name = "PATH")]
        out: PathBuf,
        #[arg(long, value_name = "N", default_value_t = 1)]
        oversample: u32,
    },
    /// Composite image (map, start marker, path) as binary PPM
    Render {
        #[arg(long, value_name = "PATH", conflicts_with_all = ["map", "slam"])]
        snapshot: Option<PathBuf>,
        #[arg(long, value_name = "PATH", requires = "slam")]
        map: Option<PathBuf>,
        #[arg(long, value_name = "PATH", requires = "map")]
        slam: Option<PathBuf>,
        #[arg(long, value_name = "PATH")]
        out: PathBuf,
        #[arg(long, value_name = "N")]
        oversample: Option<u32>,
        /// Crop to the bounding box
        #[arg(long)]
        in_bounds: bool,
    },
    /// Summary of a snapshot file
    Inspect {
        #[arg(long, value_name = "PATH")]
        snapshot: PathBuf,
    },
}

#[derive(ClapArgs, Debug)]
struct Sources {
    #[arg(long, value_name = "PATH")]
    map: PathBuf,
    #[arg(long, value_name = "PATH")]
    slam: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let subscriber = FmtSubscriber::builder().with_ansi(false).with_env_filter(filter).with_writer(std::io::stderr).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
    info!(?args, "starting builder");

    match args.command {
        Command::Package { map, out } => export::write_json(&export::map_package(&map)?, out.as_deref()),
        Command::Path { slam, from, out } => export::write_json(&export::path_package(&slam, from)?, out.as_deref()),
        Command::Snapshot { sources, out, oversample } => {
            let model = export::load_model(&sources.map, &sources.slam, oversample)?;
            let res = save_snapshot(&out, &model).with_context(|| format!("failed to write {:?}", out))?;
            info!(bytes = res.bytes, points = res.manifest.path_points, "snapshot done");
            Ok(())
        }
        Command::Render { snapshot, map, slam, out, oversample, in_bounds } => {
            let model = match (snapshot, map, slam) {
                (Some(s), _, _) => export::load_snapshot_model(&s, oversample)?,
                (None, Some(m), Some(l)) => export::load_model(&m, &l, oversample.unwrap_or(1))?,
                _ => anyhow::bail!("render needs --snapshot or both --map and --slam"),
            };
            export::write_ppm(&export::render(&model, in_bounds), &out)
        }
        Command::Inspect { snapshot } => {
            let model = export::load_snapshot_model(&snapshot, None)?;
            let summary = export::summarize(&model);
            info!(?summary, "snapshot summary");
            export::write_json(&summary, None)
        }
    }
}
