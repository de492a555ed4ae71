// ABOUTME: CLI binary for the readlater extraction pipeline.
// ABOUTME: Extracts URLs or local HTML files and prints text, markdown or JSON.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use readlater_extract::{Client, ExtractionResult};
use tracing::debug;
use tracing_subscriber::{fmt as tfmt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Markdown,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "readlater")]
#[command(about = "Extract readable article content from web pages")]
struct Args {
    /// Output format
    #[arg(short = 'f', long = "format", value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Shorthand for --format json
    #[arg(long = "json")]
    json_output: bool,

    /// Output file path (default: stdout)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// HTML file to extract (requires --url)
    #[arg(long = "html")]
    html: Option<PathBuf>,

    /// URL context for HTML file extraction (required with --html)
    #[arg(long = "url")]
    url: Option<String>,

    /// Print elapsed time in ms to stderr
    #[arg(long = "timing")]
    timing: bool,

    /// Allow fetching from private/local networks
    #[arg(long = "allow-private-networks", env = "READLATER_ALLOW_PRIVATE_NETWORKS")]
    allow_private_networks: bool,

    /// Never launch a headless browser
    #[arg(long = "no-browser", env = "READLATER_NO_BROWSER")]
    no_browser: bool,

    /// Maximum number of concurrent browser processes
    #[arg(long = "max-browsers", env = "READLATER_MAX_BROWSERS", default_value_t = 2)]
    max_browsers: usize,

    /// Path to the Chrome/Chromium executable
    #[arg(long = "chrome", env = "READLATER_CHROME")]
    chrome: Option<PathBuf>,

    /// Static fetch timeout in seconds
    #[arg(long = "timeout", env = "READLATER_TIMEOUT", default_value_t = 15)]
    timeout: u64,

    /// Browser deadline in seconds
    #[arg(long = "browser-timeout", env = "READLATER_BROWSER_TIMEOUT", default_value_t = 30)]
    browser_timeout: u64,

    /// Extra host substring to render in the browser first (repeatable)
    #[arg(long = "browser-host")]
    browser_hosts: Vec<String>,

    /// URLs to extract (fetch mode)
    #[arg()]
    urls: Vec<String>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();
}

fn render(result: &ExtractionResult, format: Format) -> String {
    match format {
        Format::Text => {
            let mut out = String::new();
            if !result.title.is_empty() {
                out.push_str(&result.title);
                out.push_str("\n\n");
            }
            out.push_str(&result.content);
            out
        }
        Format::Markdown => result.format_markdown(),
        Format::Json => serde_json::to_string_pretty(result).unwrap_or_default(),
    }
}

fn format_output(results: &[ExtractionResult], format: Format) -> String {
    if format == Format::Json && results.len() > 1 {
        return serde_json::to_string_pretty(results).unwrap_or_default();
    }
    results
        .iter()
        .map(|r| render(r, format))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing();

    if args.html.is_some() && args.url.is_none() {
        eprintln!("error: --url is required when using --html");
        return ExitCode::from(1);
    }

    if args.html.is_none() && args.urls.is_empty() {
        eprintln!("error: at least one URL is required, or use --html with --url");
        return ExitCode::from(1);
    }

    if args.html.is_some() && !args.urls.is_empty() {
        eprintln!("error: cannot use both --html and positional URLs");
        return ExitCode::from(1);
    }

    let format = if args.json_output { Format::Json } else { args.format };

    let mut builder = Client::builder()
        .allow_private_networks(args.allow_private_networks)
        .browser_enabled(!args.no_browser)
        .max_browsers(args.max_browsers)
        .timeout(Duration::from_secs(args.timeout))
        .browser_timeout(Duration::from_secs(args.browser_timeout));
    if let Some(chrome) = &args.chrome {
        builder = builder.chrome_executable(chrome);
    }
    for host in &args.browser_hosts {
        builder = builder.browser_host(host);
    }
    let client = builder.build();
    debug!(?format, browser = !args.no_browser, "client ready");

    let start = Instant::now();
    let mut results: Vec<ExtractionResult> = Vec::new();
    let mut had_error = false;

    if let (Some(html_path), Some(url)) = (&args.html, &args.url) {
        match fs::read_to_string(html_path) {
            Ok(html) => match client.extract_html(&html, url).await {
                Ok(result) => results.push(result),
                Err(e) => {
                    eprintln!("error extracting HTML: {}", e);
                    had_error = true;
                }
            },
            Err(e) => {
                eprintln!("error reading file {:?}: {}", html_path, e);
                had_error = true;
            }
        }
    } else {
        for url in &args.urls {
            match client.extract(url).await {
                Ok(result) => results.push(result),
                Err(e) => {
                    eprintln!("error extracting {}: {}", url, e);
                    had_error = true;
                }
            }
        }
    }

    let elapsed = start.elapsed();

    if !results.is_empty() {
        let output_str = format_output(&results, format);

        if let Some(output_path) = &args.output {
            if let Err(e) = fs::write(output_path, &output_str) {
                eprintln!("error writing to {:?}: {}", output_path, e);
                had_error = true;
            }
        } else {
            println!("{}", output_str);
        }
    }

    if args.timing {
        let _ = writeln!(io::stderr(), "elapsed: {}ms", elapsed.as_millis());
    }

    if had_error {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
