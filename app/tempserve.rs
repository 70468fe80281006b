//! Command-line interface for tempserve.
//!
//! Serves a directory as a single browsable snapshot page until interrupted, or prints
//! the snapshot once with `--print`.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::exit;
use tempserve::output::{self, OutputFormat};
use tempserve::{
    BinaryDetection, CatalogBuilder, CatalogOptions, DEFAULT_HOST, DEFAULT_PORT,
    DEFAULT_TEXT_LIMIT, ServeBuilder, ServeError, ServeOptions, Session, snapshot,
};
use tracing_subscriber::EnvFilter;

/// tempserve — serve a project folder as one scrapeable page
#[derive(Parser)]
#[command(name = "tempserve", version, about, long_about = None)]
struct Cli {
    /// Directory to serve (default current dir)
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Host/IP to bind
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Port to bind (0 picks a free port)
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Open the default browser at the server URL
    #[arg(long)]
    open: bool,

    /// Write index.html into the served directory while running
    #[arg(long)]
    write_index: bool,

    /// Keep the generated index.html on exit
    #[arg(long)]
    keep_file: bool,

    /// Also write ai_report.txt under _logs/_temp-server/
    #[arg(long)]
    report: bool,

    /// Page template containing the meta-json and files-json placeholders
    #[arg(long)]
    template: Option<PathBuf>,

    /// Include hidden files
    #[arg(long)]
    hidden: bool,

    /// Follow symlinks
    #[arg(long)]
    follow_links: bool,

    /// Disable .gitignore handling
    #[arg(long)]
    no_gitignore: bool,

    /// Max depth (unlimited if not set)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Ignore patterns (can be repeated)
    #[arg(short = 'I', long = "ignore")]
    ignore_patterns: Vec<String>,

    /// Preview size cap in bytes
    #[arg(long, default_value_t = DEFAULT_TEXT_LIMIT)]
    text_limit: u64,

    /// Binary detection strategy
    #[arg(long, default_value = "simple", value_parser = parse_binary_detection)]
    binary_detection: BinaryDetection,

    /// Print the snapshot once and exit instead of serving
    #[arg(long, value_enum)]
    print: Option<PrintFormat>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum PrintFormat {
    Json,
    Report,
}

/// Parse string into BinaryDetection enum.
fn parse_binary_detection(s: &str) -> Result<BinaryDetection, String> {
    match s {
        "simple" => Ok(BinaryDetection::Simple),
        "accurate" => Ok(BinaryDetection::Accurate),
        "none" => Ok(BinaryDetection::None),
        _ => Err(format!("invalid binary detection method: {}", s)),
    }
}

impl Cli {
    fn catalog_options(&self) -> CatalogOptions {
        let builder = CatalogBuilder::new(&self.root)
            .respect_gitignore(!self.no_gitignore)
            .include_hidden(self.hidden)
            .follow_links(self.follow_links)
            .ignore_patterns(self.ignore_patterns.clone())
            .text_limit(self.text_limit)
            .binary_detection(self.binary_detection);
        let builder = if let Some(depth) = self.max_depth {
            builder.max_depth(depth)
        } else {
            builder.no_limit_depth()
        };
        builder.build()
    }

    fn into_options(self) -> (ServeOptions, Option<PrintFormat>) {
        let catalog = self.catalog_options();
        let options = ServeBuilder::new(&self.root)
            .catalog(catalog)
            .host(self.host)
            .port(self.port)
            .open_browser(self.open)
            .write_index(self.write_index)
            .keep_index(self.keep_file)
            .write_report(self.report)
            .template(self.template)
            .build();
        (options, self.print)
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tempserve=info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let (options, print) = cli.into_options();

    let result = match print {
        Some(format) => run_print(&options.catalog, format),
        None => run_server(options),
    };
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        exit(if e.is_config() { 2 } else { 1 });
    }
}

fn run_print(catalog: &CatalogOptions, format: PrintFormat) -> Result<(), ServeError> {
    let snapshot = snapshot(catalog)?;
    let format = match format {
        PrintFormat::Json => OutputFormat::Json,
        PrintFormat::Report => OutputFormat::Report,
    };
    println!("{}", output::format_snapshot(&snapshot, format)?);
    Ok(())
}

fn run_server(options: ServeOptions) -> Result<(), ServeError> {
    let mut session = Session::new(options)?;
    println!("Project folder: {}", session.root().display());
    println!("Logging to {}", session.log_path().display());
    println!("Press Ctrl+C to stop the server.");
    session.run_headless()
}
