/// mpack command-line tool: inspect, validate, encode, decode, and analyse
/// streams of concatenated msgpack messages.
///
/// # Command overview
///
/// ```text
/// mpack <COMMAND> [OPTIONS]
///
/// Commands:
///   inspect    Print each message with its offset and size
///   validate   Decode every message under the given limits
///   encode     Create a msgpack stream from a JSON document
///   decode     Render each message as one line of JSON
///   stats      Print tag counts, nesting depth, and byte totals
///   help       Print help information
///
/// Global options:
///   -v, --verbose    Log decoder activity to stderr
///   -h, --help       Print help
///   -V, --version    Print version
/// ```
///
/// # Exit codes
///
/// | Code | Meaning                                      |
/// |------|----------------------------------------------|
/// | 0    | Success                                      |
/// | 1    | Error (I/O failure, malformed input, etc.)   |
///
/// All error details are written to stderr so stdout can be piped cleanly.
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use mpack_decoder::{DecoderConfig, UnpackLimits};
use tracing_subscriber::EnvFilter;

mod cmd_decode;
mod cmd_encode;
mod cmd_inspect;
mod cmd_stats;
mod cmd_validate;
mod json;
mod source;

// ── CLI root ──────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "mpack", version, about = "msgpack stream inspector and converter")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log decoder activity (buffer growth, limit violations) to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
}

// ── Sub-commands ──────────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum Commands {
    /// Print each message of a stream with its offset and size.
    Inspect(InspectArgs),
    /// Decode every message and report the first problem, if any.
    Validate(ValidateArgs),
    /// Create a msgpack stream from a JSON document.
    Encode(EncodeArgs),
    /// Render each message as one line of JSON.
    Decode(DecodeArgs),
    /// Print tag counts, nesting depth, and byte totals.
    Stats(StatsArgs),
}

// ── Argument structs ──────────────────────────────────────────────────────────

/// Decoder limits shared by every reading command.
///
/// ```text
/// ┌──────────────┬──────────────────────────────────────────┬────────────┐
/// │ Flag         │ Bounds                                   │ Default    │
/// ├──────────────┼──────────────────────────────────────────┼────────────┤
/// │ --max-array  │ elements in one array                    │ u32::MAX   │
/// │ --max-map    │ pairs in one map                         │ u32::MAX   │
/// │ --max-str    │ bytes in one str                         │ u32::MAX   │
/// │ --max-bin    │ bytes in one bin                         │ u32::MAX   │
/// │ --max-ext    │ bytes in one ext, type byte included     │ u32::MAX   │
/// │ --max-depth  │ nested non-empty containers              │ 1024       │
/// └──────────────┴──────────────────────────────────────────┴────────────┘
/// ```
#[derive(clap::Args, Clone, Copy)]
pub struct LimitArgs {
    #[arg(long)]
    pub max_array: Option<usize>,
    #[arg(long)]
    pub max_map: Option<usize>,
    #[arg(long)]
    pub max_str: Option<usize>,
    #[arg(long)]
    pub max_bin: Option<usize>,
    #[arg(long)]
    pub max_ext: Option<usize>,
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Copy every str/bin/ext payload into the zone instead of referencing
    /// the read buffer.
    #[arg(long)]
    pub copy_payloads: bool,
}

impl LimitArgs {
    pub fn config(&self) -> DecoderConfig {
        let defaults = UnpackLimits::default();
        let limits = UnpackLimits::new(
            self.max_array.unwrap_or(defaults.array),
            self.max_map.unwrap_or(defaults.map),
            self.max_str.unwrap_or(defaults.str),
            self.max_bin.unwrap_or(defaults.bin),
            self.max_ext.unwrap_or(defaults.ext),
            self.max_depth.unwrap_or(defaults.depth),
        );
        let config = DecoderConfig::default().with_limits(limits);
        if self.copy_payloads {
            config.with_reference(mpack_decoder::ReferencePolicy::Never)
        } else {
            config
        }
    }
}

/// Arguments for `mpack inspect`.
///
/// ```text
/// ┌─────────────┬────────────────────────────────────────────────────────┐
/// │ Flag        │ Effect                                                 │
/// ├─────────────┼────────────────────────────────────────────────────────┤
/// │ --show-hex  │ Include 16-byte-per-line hex dump of each message      │
/// │ --message N │ Show only the message at index N                       │
/// │ --width W   │ Truncate the rendered value to W characters (0 = none) │
/// └─────────────┴────────────────────────────────────────────────────────┘
/// ```
#[derive(clap::Args)]
pub struct InspectArgs {
    /// Path to the msgpack stream.
    pub file: PathBuf,

    /// Show a raw hex dump of every message (16 bytes per line).
    #[arg(long)]
    pub show_hex: bool,

    /// Inspect only the message at this zero-based index.
    #[arg(long)]
    pub message: Option<usize>,

    /// Maximum rendered width per message; 0 disables truncation.
    #[arg(long, default_value_t = 120)]
    pub width: usize,

    #[command(flatten)]
    pub limits: LimitArgs,
}

/// Arguments for `mpack validate`.
#[derive(clap::Args)]
pub struct ValidateArgs {
    /// Path to the msgpack stream.
    pub file: PathBuf,

    #[command(flatten)]
    pub limits: LimitArgs,
}

/// Arguments for `mpack encode`.
///
/// Reads one JSON document and writes it as msgpack. With `--each`, a
/// top-level JSON array becomes a stream of one message per element.
#[derive(clap::Args)]
pub struct EncodeArgs {
    /// Path to the JSON input file.
    pub input: PathBuf,

    /// Output file path.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Treat a top-level array as a sequence of messages.
    #[arg(long)]
    pub each: bool,
}

/// Arguments for `mpack decode`.
#[derive(clap::Args)]
pub struct DecodeArgs {
    /// Path to the msgpack stream.
    pub file: PathBuf,

    /// Pretty-print each message (multi-line JSON).
    #[arg(long)]
    pub pretty: bool,

    /// Write output to this file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub limits: LimitArgs,
}

/// Arguments for `mpack stats`.
#[derive(clap::Args)]
pub struct StatsArgs {
    /// Path to the msgpack stream.
    pub file: PathBuf,

    /// Emit the report as JSON.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub limits: LimitArgs,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Inspect(args) => cmd_inspect::run(&args),
        Commands::Validate(args) => cmd_validate::run(&args),
        Commands::Encode(args) => cmd_encode::run(&args),
        Commands::Decode(args) => cmd_decode::run(&args),
        Commands::Stats(args) => cmd_stats::run(&args),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}
