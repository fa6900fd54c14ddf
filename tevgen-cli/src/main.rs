// CLI application
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tevgen_core::{ApiType, NumericMode, RenderMode};

mod commands;

use commands::{parse_numeric, TargetArgs};

#[derive(Parser)]
#[command(name = "tevgen")]
#[command(about = "TEV pixel shader generator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct Target {
    /// Shader dialect: d3d9-sm2, d3d9, d3d11, opengl or vulkan
    #[arg(short, long, default_value = "vulkan")]
    api: ApiType,

    /// TEV arithmetic: float or integer
    #[arg(short, long, default_value = "float", value_parser = parse_numeric)]
    numeric: NumericMode,

    /// Destination alpha mode: default, alpha-pass, dual-source or depth-only
    #[arg(short, long, default_value = "default")]
    mode: RenderMode,

    /// Host configuration JSON (defaults when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl From<Target> for TargetArgs {
    fn from(t: Target) -> Self {
        TargetArgs { api: t.api, numeric: t.numeric, render_mode: t.mode, config: t.config }
    }
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Generate pixel shader source from a snapshot
    Generate {
        /// Path to the snapshot JSON
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        target: Target,
    },
    /// Print the UID of a snapshot without generating text
    Uid {
        /// Path to the snapshot JSON
        #[arg(short, long)]
        snapshot: PathBuf,

        #[command(flatten)]
        target: Target,
    },
    /// Write a default snapshot (or host config) to start from
    Template {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Emit a host config instead of a snapshot
        #[arg(long)]
        config: bool,
    },
    /// Generate every snapshot in a directory, one file per distinct shader
    Batch {
        /// Directory of snapshot JSON files
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Output directory for generated shaders
        #[arg(short, long)]
        output_dir: PathBuf,

        #[command(flatten)]
        target: Target,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate { snapshot, output, target } => {
            commands::generate(&snapshot, &target.into(), output.as_deref())?;
        }
        Commands::Uid { snapshot, target } => {
            commands::uid(&snapshot, &target.into())?;
        }
        Commands::Template { output, config } => {
            commands::template(output.as_deref(), config)?;
        }
        Commands::Batch { input_dir, output_dir, target } => {
            let pb = create_progress_bar("Generating shaders...");
            commands::batch(&input_dir, &output_dir, &target.into(), &pb)?;
        }
    }

    Ok(())
}

fn create_progress_bar(message: &str) -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=> "),
    );
    pb.set_message(message.to_string());
    pb
}
