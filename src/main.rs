use anyhow::Context;
use clap::{Parser, Subcommand};
use slm_rs::archive::{CompressionAlgo, PackOptions};
use slm_rs::{enumerate, ops};
use std::path::PathBuf;
use tracing::Level;

/// slm - password-authenticated encrypted archiver
#[derive(Parser)]
#[command(name = "slm", version)]
#[command(about = "Pack files into an encrypted, compressed, tamper-evident .slm archive")]
struct Cli {
    /// Print debug-level progress
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an archive from files and directories
    Pack {
        /// Output archive path
        archive: PathBuf,

        /// Files and directories to pack
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Archive password
        #[arg(short, long)]
        password: String,

        /// Compression algorithm (deflate or lzma)
        #[arg(long, default_value = "lzma", value_parser = parse_algo)]
        algo: CompressionAlgo,

        /// Compression level, 0-9
        #[arg(short, long, default_value_t = 1)]
        level: u8,

        /// Comment stored (encrypted) in the archive
        #[arg(long)]
        comment: Option<String>,

        /// Default extraction directory stored (encrypted) in the archive
        #[arg(long)]
        outdir: Option<String>,

        /// Glob patterns to exclude, matched against archive names
        #[arg(long = "exclude")]
        exclusions: Vec<String>,

        /// Replace an existing archive
        #[arg(long)]
        overwrite: bool,

        /// Go through all the motions without writing the archive
        #[arg(long)]
        dry_run: bool,

        /// Accept a password the strength policy would reject
        #[arg(long)]
        allow_weak: bool,
    },

    /// Extract an archive
    Unpack {
        /// Archive path
        archive: PathBuf,

        /// Archive password
        #[arg(short, long)]
        password: String,

        /// Extraction directory (defaults to the archive's stored
        /// directory, then the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Replace existing files
        #[arg(long)]
        overwrite: bool,
    },

    /// List archive contents without extracting
    List {
        /// Archive path
        archive: PathBuf,

        /// Archive password
        #[arg(short, long)]
        password: String,
    },

    /// Show the archive comment
    Comment {
        /// Archive path
        archive: PathBuf,

        /// Archive password
        #[arg(short, long)]
        password: String,
    },
}

fn parse_algo(value: &str) -> Result<CompressionAlgo, String> {
    match value {
        "deflate" | "zlib" => Ok(CompressionAlgo::Deflate),
        "lzma" | "xz" => Ok(CompressionAlgo::Lzma),
        other => Err(format!("unknown algorithm '{other}' (expected deflate or lzma)")),
    }
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let code = match cli.command {
        Commands::Pack {
            archive,
            inputs,
            password,
            algo,
            level,
            comment,
            outdir,
            exclusions,
            overwrite,
            dry_run,
            allow_weak,
        } => {
            let opts = PackOptions {
                algo,
                level,
                comment,
                outdir,
                overwrite,
                dry_run,
            };
            match enumerate::enumerate(&inputs, &exclusions).context("enumerating inputs") {
                Ok(entries) => ops::pack(&archive, &password, &entries, opts, allow_weak),
                Err(e) => {
                    eprintln!("error: {e:#}");
                    ops::EXIT_FAILURE
                }
            }
        }
        Commands::Unpack {
            archive,
            password,
            output,
            overwrite,
        } => ops::unpack(&archive, &password, output.as_deref(), overwrite),
        Commands::List { archive, password } => ops::list(&archive, &password),
        Commands::Comment { archive, password } => ops::view_comment(&archive, &password),
    };

    std::process::exit(code);
}
