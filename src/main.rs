//! Borg CLI: interactive self-learning chatbot.
//!
//! Thin wrapper over the `borg` library crate.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use borg::{Borg, DEFAULT_MAX_TOKENS, GenerationLimit, Settings, load_word_list};
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Borg: a self-learning chatbot that grows replies outward from a pivot word.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Corpus file, read at startup and rewritten on exit.
    #[arg(long, default_value = "lines.txt")]
    corpus: PathBuf,

    /// Freeze the model after loading the corpus and never rewrite it.
    #[arg(long)]
    no_learn: bool,

    /// File listing tokens to ignore (one per line, # comments).
    #[arg(long)]
    ignore_file: Option<PathBuf>,

    /// PRNG seed for reproducible output.
    #[arg(long)]
    seed: Option<u64>,

    /// Maximum tokens per expansion pass (0 = no limit).
    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    max_tokens: usize,

    /// Generation timeout in milliseconds (0 = no limit).
    #[arg(long, default_value_t = 0)]
    timeout_ms: u64,

    /// Log pivots, expansions and learned sentences.
    #[arg(long)]
    debug: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();

    let limit = match (args.max_tokens, args.timeout_ms) {
        (0, 0) => bail!("at least one of --max-tokens and --timeout-ms must be non-zero"),
        (n, 0) => GenerationLimit::Tokens(n),
        (0, ms) => GenerationLimit::Timeout(Duration::from_millis(ms)),
        (n, ms) => GenerationLimit::Both {
            timeout: Duration::from_millis(ms),
            max_tokens: n,
        },
    };

    let mut settings = Settings {
        learn: !args.no_learn,
        debug: args.debug,
        limit,
        ..Settings::default()
    };
    if let Some(ref path) = args.ignore_file {
        let words = load_word_list(path)
            .with_context(|| format!("failed to read ignore file {}", path.display()))?;
        settings.ignore = words.into_iter().collect();
    }

    let rng = match args.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    };
    let mut borg = Borg::with_settings(settings, rng);

    borg.load_corpus(&args.corpus)
        .with_context(|| format!("failed to load corpus {}", args.corpus.display()))?;

    // Conversation loop.
    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    let stdout = io::stdout();
    let mut stdout = stdout.lock();

    let mut input = stdin.lock();
    let mut buf = Vec::new();
    loop {
        if interactive {
            write!(stdout, "> ")?;
            stdout.flush()?;
        }

        buf.clear();
        match input.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "failed to read input, ending conversation");
                break;
            }
        }

        // Invalid UTF-8 is replaced, not rejected.
        let raw = String::from_utf8_lossy(&buf);
        let line: &str = &raw;
        let line = line.strip_suffix('\n').unwrap_or(line);
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() || line == "quit" {
            break;
        }

        let reply = borg.respond(line);
        writeln!(stdout, "{reply}")?;
        stdout.flush()?;
    }

    if borg
        .save_corpus(&args.corpus)
        .with_context(|| format!("failed to save corpus {}", args.corpus.display()))?
    {
        info!(sentences = borg.knowledge().sentence_count(), "corpus saved");
    }

    Ok(())
}
