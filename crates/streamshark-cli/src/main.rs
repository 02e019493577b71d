use std::fs;
use std::io;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use glob::glob;
use streamshark_core::{
    CaptureSummary, DecodeError, DuplicatePolicy, MismatchPolicy, PaddingQuirk, ReassemblyConfig,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("STREAMSHARK_BUILD_COMMIT"),
    " ",
    env!("STREAMSHARK_BUILD_DATE"),
    ")\ncommit ",
    env!("STREAMSHARK_BUILD_COMMIT_FULL")
);

#[derive(Parser, Debug)]
#[command(name = "streamshark")]
#[command(version, long_version = LONG_VERSION)]
#[command(
    about = "Rebuild the TCP byte stream carried by an Ethernet/IPv4 capture.",
    long_about = None,
    after_help = "Examples:\n  streamshark capture extract net.cap -o image.jpeg\n  streamshark capture reassemble net.cap -o body.bin --dest 10.0.0.2 --summary summary.json"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Operations on capture files.
    Capture {
        #[command(subcommand)]
        command: CaptureCommands,
    },
}

#[derive(Subcommand, Debug)]
enum CaptureCommands {
    /// Reassemble the payload stream sent to one destination and write it to a file.
    #[command(alias = "reassemble")]
    Extract(ExtractArgs),
}

#[derive(clap::Args, Debug)]
struct ExtractArgs {
    /// Path to a .pcap or .cap file (a glob matching exactly one file is accepted)
    input: PathBuf,

    /// Output path for the reassembled bytes
    #[arg(short = 'o', long)]
    output: PathBuf,

    /// JSON file with a reassembly configuration; flags override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep only payloads addressed to this IPv4 address
    #[arg(long)]
    dest: Option<Ipv4Addr>,

    /// Captured frame length that carries padding filler (repeatable)
    #[arg(long = "padded-total", value_name = "BYTES")]
    padded_totals: Vec<u32>,

    /// Disable the padding table entirely
    #[arg(long, conflicts_with = "padded_totals")]
    no_padding: bool,

    /// Keep application header blocks instead of splitting on CRLF CRLF
    #[arg(long)]
    no_split: bool,

    /// Policy for repeated sequence numbers
    #[arg(long, value_enum)]
    duplicates: Option<DuplicateArg>,

    /// Policy for frames that are not Ethernet/IPv4/TCP
    #[arg(long, value_enum)]
    on_mismatch: Option<MismatchArg>,

    /// Write a JSON walk summary to this path
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Write the JSON walk summary to stdout
    #[arg(long, conflicts_with = "summary")]
    stdout_summary: bool,

    /// Pretty-print JSON summary output
    #[arg(long)]
    pretty: bool,

    /// Open the reassembled file with the system viewer
    #[arg(long)]
    open: bool,

    /// Suppress non-error output
    #[arg(long)]
    quiet: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DuplicateArg {
    KeepFirst,
    Overwrite,
    Reject,
}

impl From<DuplicateArg> for DuplicatePolicy {
    fn from(value: DuplicateArg) -> Self {
        match value {
            DuplicateArg::KeepFirst => DuplicatePolicy::KeepFirst,
            DuplicateArg::Overwrite => DuplicatePolicy::Overwrite,
            DuplicateArg::Reject => DuplicatePolicy::Reject,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MismatchArg {
    Abort,
    SkipFrame,
}

impl From<MismatchArg> for MismatchPolicy {
    fn from(value: MismatchArg) -> Self {
        match value {
            MismatchArg::Abort => MismatchPolicy::Abort,
            MismatchArg::SkipFrame => MismatchPolicy::SkipFrame,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Capture { command } => match command {
            CaptureCommands::Extract(args) => cmd_capture_extract(args),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{err:#}"), None)
    }
}

impl From<DecodeError> for CliError {
    fn from(err: DecodeError) -> Self {
        let hint = decode_hint(&err).map(str::to_string);
        CliError::new(format!("capture decoding failed: {err}"), hint)
    }
}

fn decode_hint(err: &DecodeError) -> Option<&'static str> {
    match err {
        DecodeError::InvalidCapture { .. } => {
            Some("expected a classic pcap capture recorded on an Ethernet link")
        }
        DecodeError::UnsupportedProtocol { .. } => {
            Some("use --on-mismatch skip-frame to step over frames that are not IPv4/TCP")
        }
        DecodeError::DuplicateSequence { .. } => {
            Some("use --duplicates keep-first or --duplicates overwrite to accept retransmissions")
        }
        DecodeError::TruncatedCapture { .. } | DecodeError::SnapshotTruncated { .. } => {
            Some("the capture looks cut short; record it again without a snapshot limit")
        }
        DecodeError::MalformedHeader { .. } | DecodeError::Io(_) => None,
    }
}

fn cmd_capture_extract(args: ExtractArgs) -> Result<(), CliError> {
    let input = resolve_input_path(&args.input)?;
    validate_input_file(&input)?;
    ensure_distinct_output(&input, &args.output)?;

    let config = build_config(&args)?;
    let result = streamshark_core::reassemble_capture_file(&input, &config)?;

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
    }
    fs::write(&args.output, result.stream.as_bytes())
        .with_context(|| format!("Failed to write output: {}", args.output.display()))?;

    if args.stdout_summary || args.summary.is_some() {
        let json = serialize_summary(&result.summary, args.pretty)?;
        match args.summary.as_ref() {
            Some(path) => fs::write(path, json)
                .with_context(|| format!("Failed to write summary: {}", path.display()))?,
            None => println!("{json}"),
        }
    }

    if !args.quiet {
        eprintln!(
            "OK: {} bytes from {} fragments -> {}",
            result.stream.len(),
            result.stream.fragment_count(),
            args.output.display()
        );
    }

    if args.open {
        if let Err(err) = open_in_viewer(&args.output) {
            warn!(path = %args.output.display(), error = %err, "failed to launch viewer");
        }
    }
    Ok(())
}

fn build_config(args: &ExtractArgs) -> Result<ReassemblyConfig, CliError> {
    let mut config = match args.config.as_ref() {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            serde_json::from_str(&raw).map_err(|err| {
                CliError::new(
                    format!("invalid config file {}: {err}", path.display()),
                    Some("see ReassemblyConfig for the accepted fields".to_string()),
                )
            })?
        }
        None => ReassemblyConfig::default(),
    };

    if let Some(dest) = args.dest {
        config = config.with_destination(dest);
    }
    if args.no_padding {
        config = config.with_padding(PaddingQuirk::none());
    } else if !args.padded_totals.is_empty() {
        let padding = PaddingQuirk {
            padded_totals: args.padded_totals.iter().copied().collect(),
            ..config.padding.clone()
        };
        config = config.with_padding(padding);
    }
    if args.no_split {
        config = config.with_delimiter(None);
    }
    if let Some(duplicates) = args.duplicates {
        config = config.with_duplicates(duplicates.into());
    }
    if let Some(on_mismatch) = args.on_mismatch {
        config = config.with_mismatch_policy(on_mismatch.into());
    }
    Ok(config)
}

fn serialize_summary(summary: &CaptureSummary, pretty: bool) -> Result<String, CliError> {
    let json = if pretty {
        serde_json::to_string_pretty(summary)
    } else {
        serde_json::to_string(summary)
    };
    json.context("JSON serialization failed").map_err(Into::into)
}

fn open_in_viewer(path: &Path) -> io::Result<()> {
    let opener = if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(windows) {
        "explorer"
    } else {
        "xdg-open"
    };
    let status = Command::new(opener).arg(path).status()?;
    if !status.success() {
        return Err(io::Error::other(format!("{opener} exited with {status}")));
    }
    Ok(())
}

fn ensure_distinct_output(input: &Path, output: &Path) -> Result<(), CliError> {
    let input_abs = fs::canonicalize(input)
        .with_context(|| format!("Failed to resolve input path: {}", input.display()))?;
    let output_dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let Ok(output_dir) = fs::canonicalize(output_dir) else {
        return Ok(());
    };
    let file_name = output
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Invalid output path: {}", output.display()))?;
    if output_dir.join(file_name) == input_abs {
        return Err(CliError::new(
            format!("output path must differ from input: {}", output.display()),
            Some("choose a different output path".to_string()),
        ));
    }
    Ok(())
}

fn validate_input_file(input: &Path) -> Result<(), CliError> {
    if !input.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", input.display()),
            Some("use a .pcap or .cap file".to_string()),
        ));
    }
    if !input.is_file() {
        return Err(CliError::new(
            format!("input is not a file: {}", input.display()),
            Some("use a .pcap or .cap file".to_string()),
        ));
    }
    let ext = input
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if ext == "pcapng" {
        return Err(CliError::new(
            format!("unsupported input format '{}'", input.display()),
            Some("convert pcapng to classic pcap first (editcap -F pcap)".to_string()),
        ));
    }
    if ext != "pcap" && ext != "cap" {
        return Err(CliError::new(
            format!("unsupported input format '{}'", input.display()),
            Some("expected a .pcap or .cap file".to_string()),
        ));
    }
    Ok(())
}

fn resolve_input_path(input: &Path) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(input.to_path_buf());
    }

    let mut matches = Vec::new();
    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    match matches.len() {
        0 => Err(CliError::new(
            format!("no files match pattern '{}'", pattern),
            Some("check the path or quote the pattern; expected .pcap or .cap".to_string()),
        )),
        1 => Ok(matches.remove(0)),
        count => {
            let listed = matches
                .iter()
                .take(3)
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            let more = if count > 3 { ", ..." } else { "" };
            Err(CliError::new(
                format!(
                    "multiple files match pattern '{}' ({} matches); matches: {}{}",
                    pattern, count, listed, more
                ),
                Some("pass a single capture file, or run once per file".to_string()),
            ))
        }
    }
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}
