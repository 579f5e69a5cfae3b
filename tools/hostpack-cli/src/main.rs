//! hostpack - build and inspect HostPack containers
//!
//! Exit codes: 0 success, 1 usage error, 2 bad argument, 3 build/open failure.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind as ClapErrorKind;
use clap::{Args, Parser, Subcommand, ValueEnum};
use hostpack_common::Alignment;
use hostpack_core::{
    BuildConfig, ErrorKind, HostPackError, MetadataLocation, PackBuilder, PackReader, PixelFormat,
};

const EXIT_USAGE: u8 = 1;
const EXIT_BAD_ARGUMENT: u8 = 2;
const EXIT_FAILED: u8 = 3;

#[derive(Parser)]
#[command(name = "hostpack")]
#[command(about = "Build and inspect HostPack image containers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack a dataset directory into a .hpk container
    Build(BuildArgs),

    /// Print pack totals and scene bounds
    Info {
        /// Path to a .hpk file
        path: PathBuf,
    },

    /// Print one line per frame
    List {
        /// Path to a .hpk file
        path: PathBuf,
    },
}

#[derive(Args)]
struct BuildArgs {
    /// Directory containing the images
    dataset_root: PathBuf,

    /// Metadata document, or "auto" for transforms.json / transforms_train.json
    metadata: String,

    /// Output .hpk path
    out_path: PathBuf,

    /// Pixel format of the payload
    #[arg(long = "pf", value_enum)]
    pixel_format: Option<PixelFormatArg>,

    /// Decode workers (0 = all cores)
    #[arg(long)]
    threads: Option<u32>,

    /// Row stride alignment in bytes (power of two)
    #[arg(long, value_parser = parse_alignment)]
    row_align: Option<u32>,

    /// Section and frame alignment in bytes (power of two)
    #[arg(long, value_parser = parse_alignment)]
    block_align: Option<u32>,

    /// TOML build config; command-line options take precedence, and the
    /// positional dataset root and metadata always replace the file's keys
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum PixelFormatArg {
    Rgba8,
    Rgba32f,
}

impl From<PixelFormatArg> for PixelFormat {
    fn from(arg: PixelFormatArg) -> Self {
        match arg {
            PixelFormatArg::Rgba8 => PixelFormat::Rgba8,
            PixelFormatArg::Rgba32f => PixelFormat::Rgba32F,
        }
    }
}

/// Context marker for failures caused by the build options themselves
#[derive(Debug)]
struct InvalidOptions;

impl std::fmt::Display for InvalidOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("invalid build options")
    }
}

fn parse_alignment(s: &str) -> std::result::Result<u32, String> {
    let value: u32 = s.parse().map_err(|e| format!("{e}"))?;
    Alignment::new(value).map_err(|e| e.to_string())?;
    Ok(value)
}

fn main() -> ExitCode {
    // Initialize logging (stdout is reserved for command output)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => 0,
                ClapErrorKind::MissingRequiredArgument
                | ClapErrorKind::MissingSubcommand
                | ClapErrorKind::InvalidSubcommand
                | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => EXIT_USAGE,
                _ => EXIT_BAD_ARGUMENT,
            };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    match cli.command {
        Commands::Build(args) => report("build", build(args)),
        Commands::Info { path } => report("open", info(&path)),
        Commands::List { path } => report("open", list(&path)),
    }
}

/// Print a failure as `<what> failed error=<code>: <message>`
///
/// Option errors exit like bad arguments; everything else is a failure.
fn report(what: &str, result: Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = err
                .downcast_ref::<HostPackError>()
                .map_or(ErrorKind::Internal, HostPackError::kind)
                .code();
            eprintln!("{what} failed error={code}: {err:#}");
            if err.downcast_ref::<InvalidOptions>().is_some() {
                ExitCode::from(EXIT_BAD_ARGUMENT)
            } else {
                ExitCode::from(EXIT_FAILED)
            }
        }
    }
}

fn build(args: BuildArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => BuildConfig::from_toml_file(path)
            .with_context(|| format!("loading build config {}", path.display()))
            .context(InvalidOptions)?,
        None => BuildConfig::default(),
    };
    config.dataset_root = args.dataset_root;
    config.metadata = MetadataLocation::parse(&args.metadata);
    if let Some(pf) = args.pixel_format {
        config.pixel_format = pf.into();
    }
    if let Some(threads) = args.threads {
        config.threads = threads;
    }
    if let Some(row_align) = args.row_align {
        config.row_align = row_align;
    }
    if let Some(block_align) = args.block_align {
        config.block_align = block_align;
    }

    let builder = PackBuilder::new(&config).context(InvalidOptions)?;
    let summary = builder.build(&args.out_path)?;
    tracing::info!(
        "Built {} frames ({} bytes) -> {}",
        summary.frame_count,
        summary.bytes_total,
        args.out_path.display()
    );
    println!("ok");
    Ok(())
}

fn info(path: &Path) -> Result<()> {
    let reader = PackReader::open(path)?;
    println!(
        "frames={} cameras={} version={} pixel_format={} bytes={}",
        reader.frame_count(),
        reader.camera_count(),
        reader.version(),
        reader.pixel_format(),
        reader.total_bytes()
    );
    let aabb = reader.scene_aabb();
    println!(
        "aabb_min={},{},{} aabb_max={},{},{}",
        aabb.min[0], aabb.min[1], aabb.min[2], aabb.max[0], aabb.max[1], aabb.max[2]
    );
    reader.close();
    Ok(())
}

fn list(path: &Path) -> Result<()> {
    let reader = PackReader::open(path)?;
    let mut out = String::new();
    for i in 0..reader.frame_count() {
        let v = reader.image_view(i);
        out.push_str(&format!(
            "{i}: cam={} w={} h={} rs={} ps={} roi={},{},{},{}\n",
            reader.frame_camera_index(i),
            v.width,
            v.height,
            v.row_stride,
            v.pixel_stride,
            v.roi.x,
            v.roi.y,
            v.roi.w,
            v.roi.h
        ));
    }
    print!("{out}");
    reader.close();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_alignment() {
        assert_eq!(parse_alignment("4096"), Ok(4096));
        assert!(parse_alignment("3").is_err());
        assert!(parse_alignment("0").is_err());
        assert!(parse_alignment("-8").is_err());
    }

    #[test]
    fn test_cli_parses_build() {
        let cli = Cli::try_parse_from([
            "hostpack", "build", "data", "auto", "out.hpk", "--pf", "rgba32f", "--threads", "4",
        ])
        .unwrap();
        let Commands::Build(args) = cli.command else {
            panic!("expected build");
        };
        assert!(matches!(args.pixel_format, Some(PixelFormatArg::Rgba32f)));
        assert_eq!(args.threads, Some(4));
        assert_eq!(args.row_align, None);
    }

    #[test]
    fn test_cli_rejects_bad_alignment() {
        let err = Cli::try_parse_from([
            "hostpack", "build", "data", "auto", "out.hpk", "--block-align", "3",
        ])
        .err()
        .unwrap();
        assert_eq!(err.kind(), ClapErrorKind::ValueValidation);
    }
}
