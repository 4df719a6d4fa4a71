use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use owo_colors::OwoColorize;
use recital_core::{
    ArticleRecord, FetchConfig, Orchestrator, OutputFormat, PacedEngine, PlaybackState, RecitalConfig, RemoteBackend,
    RenderConfig, SpeechController, SpeechEngine, TextBuffer, WordTable, fetch_file, fetch_stdin, fetch_url,
    render_article,
};
use tracing_subscriber::EnvFilter;
use url::Url;

mod echo;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Output format for extracted articles
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Html,
    Text,
    Markdown,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => Self::Json,
            Format::Html => Self::Html,
            Format::Text => Self::Text,
            Format::Markdown => Self::Markdown,
        }
    }
}

/// Reader mode and read-aloud for web pages
#[derive(Parser, Debug)]
#[command(name = "recital")]
#[command(author = "Recital Contributors")]
#[command(version)]
#[command(about = "Extract readable articles from web pages and read them aloud", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract the article from a page
    Extract(ExtractArgs),
    /// Print the word position table of the article text
    Words(WordsArgs),
    /// Read the article aloud, highlighting the current word
    Read(ReadArgs),
    /// List the voices of the built-in speech engine
    Voices,
}

/// Where the page comes from and how extraction runs
#[derive(Args, Debug)]
struct InputArgs {
    /// URL to fetch, local HTML file, or "-" for stdin
    #[arg(value_name = "INPUT")]
    input: String,

    /// Page URL for file or stdin input (enables site rules and link resolution)
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Page title hint passed to the extractors
    #[arg(long, value_name = "TITLE")]
    title: Option<String>,

    /// Skip the remote LLM extraction method
    #[arg(long)]
    no_remote: bool,

    /// Stop at the first method that fails or comes back empty
    #[arg(long)]
    no_fallback: bool,

    /// Remote extraction service endpoint
    #[arg(long, value_name = "URL")]
    endpoint: Option<String>,

    /// Per-method extraction timeout in seconds
    #[arg(long, value_name = "SECS")]
    method_timeout: Option<u64>,

    /// Minimum article text length in characters
    #[arg(long, value_name = "NUM")]
    min_length: Option<usize>,

    /// HTTP timeout in seconds when fetching INPUT
    #[arg(long, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Json, value_name = "FORMAT")]
    format: Format,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Include a title block (text) or TOML frontmatter (markdown)
    #[arg(long)]
    header: bool,

    /// Wrap text output at this many columns
    #[arg(long, default_value = "0", value_name = "COLS")]
    width: usize,
}

#[derive(Args, Debug)]
struct WordsArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Print the table as JSON
    #[arg(long)]
    json: bool,

    /// Start at the word containing or following this char offset
    #[arg(long, value_name = "OFFSET")]
    from: Option<usize>,
}

#[derive(Args, Debug)]
struct ReadArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Speech rate multiplier (0.1 to 16)
    #[arg(long, value_name = "RATE")]
    rate: Option<f32>,

    /// Voice id (see `recital voices`)
    #[arg(long, value_name = "ID")]
    voice: Option<String>,

    /// Base speaking pace in words per minute
    #[arg(long, default_value = "180", value_name = "WPM")]
    wpm: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();

    if cli.verbose {
        echo::print_banner();
        echo::print_info("Debug logging enabled");
        eprintln!();
    }

    match cli.command {
        Command::Extract(args) => extract(args, cli.verbose).await,
        Command::Words(args) => words(args, cli.verbose).await,
        Command::Read(args) => read(args, cli.verbose).await,
        Command::Voices => voices().await,
    }
}

async fn extract(args: ExtractArgs, verbose: bool) -> anyhow::Result<()> {
    let article = load_article(&args.input, verbose).await?;

    let config = RenderConfig { include_header: args.header, line_width: args.width };
    let output = render_article(&article, args.format.into(), &config).context("Failed to render article")?;

    match args.output {
        Some(path) => {
            fs::write(&path, output).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            echo::print_success(&format!("Output written to {}", path.display().bright_white()));
        }
        None => println!("{}", output),
    }

    Ok(())
}

async fn words(args: WordsArgs, verbose: bool) -> anyhow::Result<()> {
    let article = load_article(&args.input, verbose).await?;
    let table = WordTable::build(&article.text_content);
    let first = match args.from {
        Some(offset) => table.index_at_or_after(offset).unwrap_or(table.len()),
        None => 0,
    };
    let entries = &table.entries()[first..];

    if args.json {
        println!("{}", serde_json::to_string_pretty(entries).context("Failed to serialize word table")?);
        return Ok(());
    }

    let mut stdout = io::stdout().lock();
    for (index, entry) in entries.iter().enumerate().map(|(i, e)| (first + i, e)) {
        writeln!(stdout, "{}\t{}\t{}\t{}", index, entry.start_offset, entry.length, entry.normalized_word)?;
    }
    Ok(())
}

async fn read(args: ReadArgs, verbose: bool) -> anyhow::Result<()> {
    let article = load_article(&args.input, verbose).await?;

    let mut speech = RecitalConfig::load().context("Failed to load configuration")?.speech;
    if let Some(rate) = args.rate {
        speech.rate = rate;
    }
    if args.voice.is_some() {
        speech.voice_id = args.voice;
    }

    let text = article.text_content.clone();
    let engine = Arc::new(PacedEngine::new(args.wpm));
    let mut controller = SpeechController::new(engine, TextBuffer::from_html(&article.content), &speech);
    controller.start(&text).await.context("Failed to start reading")?;

    if verbose {
        echo::print_info(&format!("Reading {} words", controller.session().table.len()));
    }

    let chars: Vec<char> = text.chars().collect();
    let interactive = io::stdout().is_terminal();
    let mut last_offset = None;

    while controller.state() == PlaybackState::Playing {
        if controller.next_event().await.is_none() {
            break;
        }
        let Some(handle) = controller.renderer().current() else {
            continue;
        };
        if last_offset == Some(handle.offset) {
            continue;
        }
        last_offset = Some(handle.offset);

        if interactive {
            let (before, word, after) = window(&chars, handle.offset, handle.length, 72);
            print!("\r\x1b[2K{}{}{}", before.dimmed(), word.reversed().bold(), after.dimmed());
            io::stdout().flush()?;
        } else if let Some(word) = controller.renderer().surface().marked_text() {
            println!("{}", word);
        }
    }

    if interactive {
        println!();
    }
    if let Some(error) = controller.last_error() {
        bail!("Speech stopped: {}", error);
    }
    Ok(())
}

async fn voices() -> anyhow::Result<()> {
    let voices = PacedEngine::default().voices().await.context("Failed to list voices")?;
    for voice in voices {
        println!("{}\t{}\t{}", voice.id, voice.lang, voice.name);
    }
    Ok(())
}

/// Reads INPUT and runs the extraction chain over it.
async fn load_article(args: &InputArgs, verbose: bool) -> anyhow::Result<ArticleRecord> {
    let is_url = args.input.starts_with("http://") || args.input.starts_with("https://");

    let html = if args.input == "-" {
        if verbose {
            echo::print_step(1, 2, "Reading from stdin");
        }
        fetch_stdin().context("Failed to read from stdin")?
    } else if is_url {
        if verbose {
            echo::print_step(1, 2, &format!("Fetching from {}", args.input.bright_white().underline()));
        }
        let mut config = FetchConfig { timeout: args.timeout, ..Default::default() };
        if let Some(user_agent) = &args.user_agent {
            config.user_agent = user_agent.clone();
        }
        fetch_url(&args.input, &config).await.context("Failed to fetch URL")?
    } else {
        if verbose {
            echo::print_step(1, 2, &format!("Reading from file {}", args.input.bright_white()));
        }
        fetch_file(&args.input).with_context(|| format!("Failed to read file: {}", args.input))?
    };

    if verbose {
        eprintln!("  {} {}\n", "Size:".dimmed(), echo::format_size(html.len()).bright_white());
    }

    let page_url = match &args.url {
        Some(url) => url.clone(),
        None if is_url => args.input.clone(),
        None if args.input == "-" => String::new(),
        None => fs::canonicalize(&args.input)
            .ok()
            .and_then(|path| Url::from_file_path(path).ok())
            .map(String::from)
            .unwrap_or_default(),
    };
    if page_url.is_empty() && verbose {
        echo::print_warning("No page URL given; site rules and link resolution are off");
    }
    tracing::debug!(input = %args.input, url = %page_url, "loading article");

    let config = extraction_config(args)?;
    if verbose {
        echo::print_step(2, 2, "Extracting article");
    }

    let started = Instant::now();
    let orchestrator = Orchestrator::new(&config);
    let (article, attempts) = orchestrator
        .extract_with_report(&page_url, &html, args.title.as_deref())
        .await
        .context("Failed to extract article")?;

    if verbose {
        echo::print_attempts(&attempts, started.elapsed());
    }
    Ok(article)
}

/// The user's config with command-line overrides applied.
fn extraction_config(args: &InputArgs) -> anyhow::Result<RecitalConfig> {
    let mut config = RecitalConfig::load().context("Failed to load configuration")?;

    if let Some(endpoint) = &args.endpoint {
        config.remote.backend = RemoteBackend::Service { endpoint: Some(endpoint.clone()) };
    }
    if args.no_remote {
        config.extraction.remote_enabled = false;
    }
    if args.no_fallback {
        config.extraction.fallback_enabled = false;
    }
    if let Some(secs) = args.method_timeout {
        config.extraction.method_timeout = Duration::from_secs(secs);
    }
    if let Some(min_length) = args.min_length {
        config.extraction.min_content_length = min_length;
    }

    Ok(config)
}

/// Splits up to `width` chars around `chars[start..start + len]` into the text
/// before the word, the word, and the text after. Newlines become spaces.
fn window(chars: &[char], start: usize, len: usize, width: usize) -> (String, String, String) {
    let start = start.min(chars.len());
    let end = (start + len).min(chars.len());
    let room = width.saturating_sub(end - start);
    let from = start.saturating_sub(room / 2);
    let to = (end + room - (start - from)).min(chars.len());

    let flat = |range: &[char]| range.iter().map(|&c| if c == '\n' { ' ' } else { c }).collect::<String>();
    (flat(&chars[from..start]), flat(&chars[start..end]), flat(&chars[end..to]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_centers_word() {
        let chars: Vec<char> = "one two three four five".chars().collect();
        let (before, word, after) = window(&chars, 8, 5, 13);
        assert_eq!(before, "two ");
        assert_eq!(word, "three");
        assert_eq!(after, " fou");
    }

    #[test]
    fn test_window_at_edges() {
        let chars: Vec<char> = "first\nsecond".chars().collect();
        let (before, word, after) = window(&chars, 0, 5, 8);
        assert_eq!((before.as_str(), word.as_str(), after.as_str()), ("", "first", " se"));

        let (before, word, after) = window(&chars, 6, 6, 100);
        assert_eq!((before.as_str(), word.as_str(), after.as_str()), ("first ", "second", ""));
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["recital", "extract", "-f", "markdown", "--no-remote", "page.html"]).unwrap();
        match cli.command {
            Command::Extract(args) => {
                assert_eq!(args.format, Format::Markdown);
                assert!(args.input.no_remote);
                assert_eq!(args.input.input, "page.html");
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(Cli::try_parse_from(["recital", "extract", "-f", "pdf", "page.html"]).is_err());
    }
}
