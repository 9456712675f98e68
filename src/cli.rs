// Command-line front end for the delimited-text codec.
//
// Subcommands read one delimited file (plain, .gz or .xz, in any supported
// charset) and dump it as JSON lines, re-encode it with different output
// options, or summarise it.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};

use crate::charset::Charset;
use crate::dsv::config::{DEFAULT_DELIMITER, DEFAULT_LINE_SEPARATOR};
use crate::dsv::{CodecConfig, ConfigError, Dialect, StandardStrategy};
use crate::io as file_io;

const BUF_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Delimited text (CSV/TSV) decoder and encoder.
#[derive(Parser, Debug)]
#[command(
    name = "dsvcodec",
    version,
    about = "Delimited text (CSV/TSV) codec",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Emit summaries as JSON.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Decode a file and print each row as a JSON array.
    Parse(ParseArgs),
    /// Decode a file and re-encode it with different options.
    Convert(ConvertArgs),
    /// Print row and field counts for a file.
    Stats(StatsArgs),
    /// Print build/configuration details.
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LineEnding {
    Lf,
    Crlf,
}

impl LineEnding {
    fn separator(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::Crlf => "\r\n",
        }
    }
}

#[derive(Args, Debug)]
struct InputFormatArgs {
    /// Input dialect.
    #[arg(long, default_value_t = Dialect::Csv)]
    dialect: Dialect,

    /// Input delimiter (overrides the dialect's).
    #[arg(long)]
    delimiter: Option<String>,

    /// Input charset label (utf-8, shift_jis, ms932, euc-jp, ...).
    #[arg(long, default_value_t = Charset::default())]
    encoding: Charset,
}

#[derive(Args, Debug)]
struct ParseArgs {
    /// Input file (.gz / .xz are decompressed).
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Output file for the JSON lines (default: stdout).
    #[arg(value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    #[command(flatten)]
    format: InputFormatArgs,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Input file.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Output file (.gz / .xz are compressed).
    #[arg(value_hint = ValueHint::FilePath)]
    output: PathBuf,

    #[command(flatten)]
    format: InputFormatArgs,

    /// Output dialect (default: the input dialect).
    #[arg(long = "to-dialect")]
    to_dialect: Option<Dialect>,

    /// Output delimiter (overrides the output dialect's).
    #[arg(long = "to-delimiter")]
    to_delimiter: Option<String>,

    /// Quote every field.
    #[arg(long = "always-quote")]
    always_quote: bool,

    /// Placeholder written for absent fields. Without `--input-null`,
    /// empty input fields count as absent.
    #[arg(long = "null-string")]
    null_string: Option<String>,

    /// Input fields equal to this text count as absent.
    #[arg(long = "input-null")]
    input_null: Option<String>,

    /// Output charset label (default: the input charset).
    #[arg(long = "to-encoding")]
    to_encoding: Option<Charset>,

    /// Output line ending (default: platform newline).
    #[arg(long = "line-ending", value_enum)]
    line_ending: Option<LineEnding>,
}

#[derive(Args, Debug)]
struct StatsArgs {
    /// Input file.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    #[command(flatten)]
    format: InputFormatArgs,
}

// ---------------------------------------------------------------------------
// Resolved options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Parse,
    Convert,
    Stats,
    Config,
}

#[derive(Debug)]
struct Options {
    command: Command,
    force: bool,
    quiet: bool,
    verbose: u8,
    json_output: bool,
    input_file: PathBuf,
    output_file: Option<PathBuf>,
    dialect: Dialect,
    delimiter: Option<String>,
    encoding: Charset,
    to_dialect: Option<Dialect>,
    to_delimiter: Option<String>,
    to_encoding: Option<Charset>,
    always_quote: bool,
    null_string: Option<String>,
    input_null: Option<String>,
    line_ending: Option<LineEnding>,
}

impl Options {
    /// Log filter implied by `--quiet` / `--verbose`.
    fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }

    fn apply_format(&mut self, format: InputFormatArgs) {
        self.dialect = format.dialect;
        self.delimiter = format.delimiter;
        self.encoding = format.encoding;
    }

    fn output_charset(&self) -> Charset {
        self.to_encoding.unwrap_or(self.encoding)
    }

    /// Input text that `convert` treats as an absent field.
    fn null_marker(&self) -> Option<&str> {
        match (&self.input_null, &self.null_string) {
            (Some(marker), _) => Some(marker.as_str()),
            (None, Some(_)) => Some(""),
            (None, None) => None,
        }
    }
}

fn resolve_options(cli: Cli) -> Options {
    let mut opts = Options {
        command: Command::Config,
        force: cli.force,
        quiet: cli.quiet,
        verbose: cli.verbose.min(2),
        json_output: cli.json_output,
        input_file: PathBuf::new(),
        output_file: None,
        dialect: Dialect::Csv,
        delimiter: None,
        encoding: Charset::default(),
        to_dialect: None,
        to_delimiter: None,
        to_encoding: None,
        always_quote: false,
        null_string: None,
        input_null: None,
        line_ending: None,
    };

    match cli.command {
        Cmd::Parse(args) => {
            opts.command = Command::Parse;
            opts.input_file = args.input;
            opts.output_file = args.output;
            opts.apply_format(args.format);
        }
        Cmd::Convert(args) => {
            opts.command = Command::Convert;
            opts.input_file = args.input;
            opts.output_file = Some(args.output);
            opts.apply_format(args.format);
            opts.to_dialect = args.to_dialect;
            opts.to_delimiter = args.to_delimiter;
            opts.always_quote = args.always_quote;
            opts.null_string = args.null_string;
            opts.input_null = args.input_null;
            opts.to_encoding = args.to_encoding;
            opts.line_ending = args.line_ending;
        }
        Cmd::Stats(args) => {
            opts.command = Command::Stats;
            opts.input_file = args.input;
            opts.apply_format(args.format);
        }
        Cmd::Config => {}
    }
    opts
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("dsvcodec".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let opts = resolve_options(cli);
        let _ = input_config(&opts);
        let _ = output_config(&opts);
    }
}

// ---------------------------------------------------------------------------
// Codec configuration from CLI options
// ---------------------------------------------------------------------------

fn input_config(opts: &Options) -> Result<CodecConfig, ConfigError> {
    let mut builder = opts.dialect.config().to_builder();
    if let Some(delimiter) = &opts.delimiter {
        builder = builder.delimiter(delimiter.as_str());
    }
    builder.build()
}

/// Output options start from `--to-dialect`, or from the input format when
/// no output dialect is given.
fn output_config(opts: &Options) -> Result<CodecConfig, ConfigError> {
    let mut builder = match opts.to_dialect {
        Some(dialect) => dialect.config().to_builder(),
        None => input_config(opts)?.to_builder(),
    };
    if let Some(delimiter) = &opts.to_delimiter {
        builder = builder.delimiter(delimiter.as_str());
    }
    if let Some(null_string) = &opts.null_string {
        builder = builder.null_string(null_string.as_str());
    }
    if let Some(ending) = opts.line_ending {
        builder = builder.line_separator(ending.separator());
    }
    builder.always_quote(opts.always_quote).build()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn fail(context: impl std::fmt::Display, err: impl std::fmt::Display) -> i32 {
    eprintln!("dsvcodec: {context}: {err}");
    1
}

fn refuse_overwrite(path: &Path, force: bool) -> bool {
    if path.exists() && !force {
        eprintln!(
            "dsvcodec: output file exists, use -f to overwrite: {}",
            path.display()
        );
        return true;
    }
    false
}

fn hex(digest: &[u8; 32]) -> String {
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config() -> i32 {
    let version = env!("CARGO_PKG_VERSION");
    println!("dsvcodec version {version}");

    let gzip = cfg!(feature = "gzip") as u8;
    let xz = cfg!(feature = "xz") as u8;
    let file_io = cfg!(feature = "file-io") as u8;
    let parallel = cfg!(feature = "parallel") as u8;
    let dialects: Vec<&str> = Dialect::ALL.iter().map(|d| d.name()).collect();

    println!("GZIP={gzip}");
    println!("XZ={xz}");
    println!("FILE_IO={file_io}");
    println!("PARALLEL={parallel}");
    println!("DEFAULT_DELIMITER={DEFAULT_DELIMITER:?}");
    println!("DEFAULT_LINE_SEPARATOR={DEFAULT_LINE_SEPARATOR:?}");
    println!("DEFAULT_ENCODING={}", Charset::default());
    println!("DIALECTS={}", dialects.join(","));

    0
}

// ---------------------------------------------------------------------------
// Parse command
// ---------------------------------------------------------------------------

fn cmd_parse(opts: &Options) -> i32 {
    let config = match input_config(opts) {
        Ok(c) => c,
        Err(e) => return fail("input options", e),
    };
    let input = &opts.input_file;
    let strategy = StandardStrategy::new(config);
    let mut decoder = match file_io::open_rows_with(input, strategy, opts.encoding) {
        Ok(d) => d,
        Err(e) => return fail(input.display(), e),
    };

    let mut out: Box<dyn Write> = match &opts.output_file {
        Some(path) => {
            if refuse_overwrite(path, opts.force) {
                return 1;
            }
            match File::create(path) {
                Ok(f) => Box::new(BufWriter::with_capacity(BUF_SIZE, f)),
                Err(e) => return fail(path.display(), e),
            }
        }
        None => Box::new(BufWriter::with_capacity(BUF_SIZE, io::stdout().lock())),
    };

    let mut fields = 0u64;
    loop {
        let row = match decoder.next_row() {
            Ok(Some(row)) => row,
            Ok(None) => break,
            Err(e) => return fail(input.display(), e),
        };
        fields += row.len() as u64;
        if let Err(e) = serde_json::to_writer(&mut out, &row) {
            return fail("write error", e);
        }
        if let Err(e) = out.write_all(b"\n") {
            return fail("write error", e);
        }
    }
    if let Err(e) = out.flush() {
        return fail("write flush error", e);
    }

    let rows = decoder.rows_decoded();
    if opts.verbose > 0 && !opts.quiet {
        eprintln!("dsvcodec: parse: rows: {rows}, fields: {fields}");
    }
    if opts.json_output {
        let json = serde_json::json!({
            "command": "parse",
            "rows": rows,
            "fields": fields,
        });
        eprintln!("{json:#}");
    }
    0
}

// ---------------------------------------------------------------------------
// Convert command
// ---------------------------------------------------------------------------

fn cmd_convert(opts: &Options) -> i32 {
    let (in_config, out_config) = match (input_config(opts), output_config(opts)) {
        (Ok(i), Ok(o)) => (i, o),
        (Err(e), _) => return fail("input options", e),
        (_, Err(e)) => return fail("output options", e),
    };
    let Some(output) = opts.output_file.as_deref() else {
        return fail("convert", "no output file");
    };
    if refuse_overwrite(output, opts.force) {
        return 1;
    }

    let out_charset = opts.output_charset();
    if !out_charset.can_encode() {
        return fail("output options", out_charset.write_unsupported());
    }

    let input = &opts.input_file;
    let in_strategy = StandardStrategy::new(in_config);
    let (rows, read) = match file_io::read_file_with(input, in_strategy, opts.encoding) {
        Ok(r) => r,
        Err(e) => return fail(input.display(), e),
    };

    let out_strategy = StandardStrategy::new(out_config);
    let result = match opts.null_marker() {
        Some(marker) => {
            let cells: Vec<Vec<Option<&str>>> = rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|cell| (cell != marker).then_some(cell.as_str()))
                        .collect()
                })
                .collect();
            file_io::write_file_with(&cells, output, out_strategy, out_charset)
        }
        None => file_io::write_file_with(&rows, output, out_strategy, out_charset),
    };
    let written = match result {
        Ok(w) => w,
        Err(e) => return fail(output.display(), e),
    };

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "dsvcodec: convert: rows: {}, bytes in: {}, bytes out: {}",
            written.rows, read.bytes, written.bytes
        );
    }
    if opts.json_output {
        let json = serde_json::json!({
            "command": "convert",
            "rows": written.rows,
            "input_bytes": read.bytes,
            "output_bytes": written.bytes,
            "input_compression": read.compression.name(),
            "output_compression": written.compression.name(),
            "input_encoding": read.charset.name(),
            "output_encoding": written.charset.name(),
            "output_sha256": written.sha256.as_ref().map(hex),
        });
        eprintln!("{json:#}");
    }
    0
}

// ---------------------------------------------------------------------------
// Stats command
// ---------------------------------------------------------------------------

fn cmd_stats(opts: &Options) -> i32 {
    let config = match input_config(opts) {
        Ok(c) => c,
        Err(e) => return fail("input options", e),
    };
    let input = &opts.input_file;
    let stats = match file_io::scan_file(input, StandardStrategy::new(config), opts.encoding) {
        Ok(s) => s,
        Err(e) => return fail(input.display(), e),
    };

    if opts.json_output {
        let json = serde_json::json!({
            "rows": stats.rows,
            "fields": stats.fields,
            "max_width": stats.max_width,
            "bytes": stats.bytes,
            "compression": stats.compression.name(),
            "encoding": stats.charset.name(),
            "sha256": stats.sha256.as_ref().map(hex),
        });
        println!("{json:#}");
    } else {
        println!("rows: {}", stats.rows);
        println!("fields: {}", stats.fields);
        println!("max_width: {}", stats.max_width);
        println!("bytes: {}", stats.bytes);
        println!("compression: {}", stats.compression.name());
        println!("encoding: {}", stats.charset.name());
        if let Some(digest) = &stats.sha256 {
            println!("sha256: {}", hex(digest));
        }
    }
    0
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run() -> ! {
    let cli = Cli::parse();
    let opts = resolve_options(cli);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(opts.log_filter()))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let exit_code = match opts.command {
        Command::Parse => cmd_parse(&opts),
        Command::Convert => cmd_convert(&opts),
        Command::Stats => cmd_stats(&opts),
        Command::Config => cmd_config(),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
