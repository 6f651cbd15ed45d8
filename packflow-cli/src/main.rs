//! packflow - streaming compression filter.
//!
//! Reads standard input and writes standard output through one gzip, zstd
//! or xz session.

use clap::error::ErrorKind as ClapErrorKind;
use clap::{ArgAction, CommandFactory, Parser};
use packflow_cli::{CodecKind, SessionConfig, exit_code, transcode};
use packflow_core::{DEFAULT_BLOCK_SIZE, DriverConfig, Mode, Preset, PumpConfig, Result};
use packflow_xzembed::{DEFAULT_DICT_MAX, EmbeddedOptions};
use std::io;
use std::process::ExitCode;
use tracing::{Level, debug};

#[derive(Parser)]
#[command(name = "packflow")]
#[command(author, version, about = "Streaming gzip, zstd and xz filter")]
#[command(long_about = "
packflow reads standard input and writes standard output, compressing or
decompressing with a single codec session. Decompression is the default.

Examples:
  packflow < data.xz > data
  packflow -c -l 9 -e < data > data.xz
  packflow --codec zstd -c < data > data.zst
  packflow --codec xz-embedded --dict-max 4194304 < data.xz > data
")]
struct Cli {
    /// Codec to use
    #[arg(long, value_enum, default_value_t = CodecKind::Xz)]
    codec: CodecKind,

    /// Compress standard input
    #[arg(short, long, conflicts_with = "decompress")]
    compress: bool,

    /// Decompress standard input (default)
    #[arg(short, long)]
    decompress: bool,

    /// Compression level
    #[arg(short, long, default_value_t = 6, value_parser = clap::value_parser!(u8).range(0..=9))]
    level: u8,

    /// Use the slower, stronger variant of the level
    #[arg(short, long)]
    extreme: bool,

    /// Read and write block size in bytes
    #[arg(
        long,
        default_value_t = DEFAULT_BLOCK_SIZE,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    block_size: usize,

    /// Dictionary ceiling in bytes for xz-embedded
    #[arg(long, default_value_t = DEFAULT_DICT_MAX)]
    dict_max: usize,

    /// Decode back-to-back streams with xz-embedded
    #[arg(long)]
    concatenated: bool,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn mode(&self) -> Mode {
        if self.compress {
            Mode::Compress
        } else {
            Mode::Decompress
        }
    }

    fn session_config(&self) -> Result<SessionConfig> {
        let driver = DriverConfig {
            mode: self.mode(),
            preset: Preset::new(self.level, self.extreme)?,
            pump: PumpConfig::uniform(self.block_size)?,
        };
        Ok(SessionConfig::new(driver).with_embedded(EmbeddedOptions {
            dict_max: self.dict_max,
            concatenated: self.concatenated,
        }))
    }

    fn log_level(&self) -> Level {
        if self.quiet {
            return Level::ERROR;
        }
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.session_config()?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    let stats = transcode(cli.codec, &config, &mut stdin.lock(), &mut stdout.lock())?;
    debug!(
        bytes_in = stats.bytes_in,
        bytes_out = stats.bytes_out,
        engine_calls = stats.engine_calls,
        "done"
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    if cli.compress && !cli.codec.can_compress() {
        Cli::command()
            .error(
                ClapErrorKind::ArgumentConflict,
                format!("{} cannot compress", cli.codec),
            )
            .exit();
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(exit_code(&e))
        }
    }
}
