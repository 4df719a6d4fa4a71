use std::{env, fs, path::PathBuf};

fn input_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(clap::arg!(<INPUT> "URL to fetch, local HTML file, or '-' for stdin"))
        .arg(clap::arg!(--url <URL> "Page URL for file or stdin input"))
        .arg(clap::arg!(--title <TITLE> "Page title hint passed to the extractors"))
        .arg(clap::arg!(--"no-remote" "Skip the remote LLM extraction method"))
        .arg(clap::arg!(--"no-fallback" "Stop at the first method that fails or comes back empty"))
        .arg(clap::arg!(--endpoint <URL> "Remote extraction service endpoint"))
        .arg(clap::arg!(--"method-timeout" <SECS> "Per-method extraction timeout in seconds"))
        .arg(clap::arg!(--"min-length" <NUM> "Minimum article text length in characters"))
        .arg(clap::arg!(--timeout <SECS> "HTTP timeout in seconds when fetching INPUT").default_value("30"))
        .arg(clap::arg!(--"user-agent" <UA> "Custom User-Agent for HTTP requests"))
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let extract = input_args(clap::Command::new("extract").about("Extract the article from a page"))
        .arg(
            clap::arg!(-f --format <FORMAT> "Output format")
                .default_value("json")
                .value_parser(["json", "html", "text", "markdown"]),
        )
        .arg(
            clap::arg!(-o --output <FILE> "Output file (default: stdout)")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(--header "Include a title block (text) or TOML frontmatter (markdown)"))
        .arg(clap::arg!(--width <COLS> "Wrap text output at this many columns").default_value("0"));

    let words = input_args(clap::Command::new("words").about("Print the word position table of the article text"))
        .arg(clap::arg!(--json "Print the table as JSON"))
        .arg(clap::arg!(--from <OFFSET> "Start at the word containing or following this char offset"));

    let read = input_args(clap::Command::new("read").about("Read the article aloud, highlighting the current word"))
        .arg(clap::arg!(--rate <RATE> "Speech rate multiplier (0.1 to 16)"))
        .arg(clap::arg!(--voice <ID> "Voice id"))
        .arg(clap::arg!(--wpm <WPM> "Base speaking pace in words per minute").default_value("180"));

    let mut cmd = clap::Command::new("recital")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Recital Contributors")
        .about("Extract readable articles from web pages and read them aloud")
        .arg(clap::arg!(-v --verbose "Enable debug logging").global(true))
        .subcommand(extract)
        .subcommand(words)
        .subcommand(read)
        .subcommand(clap::Command::new("voices").about("List the voices of the built-in speech engine"));

    for shell in [
        clap_complete::Shell::Bash,
        clap_complete::Shell::Zsh,
        clap_complete::Shell::Fish,
        clap_complete::Shell::PowerShell,
    ] {
        clap_complete::generate_to(shell, &mut cmd, "recital", &completions_dir).unwrap();
    }

    println!("cargo:warning=Shell completions generated in: {}", completions_dir.display());
}
