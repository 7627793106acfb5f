//! Borg conversational engine: a self-learning chatbot that grows replies
//! outward from a pivot word.
//!
//! This is the facade crate that wires together the lower-level components:
//! - [`borg_text`]: normalization, sentence splitting and reply finalization
//! - [`borg_knowledge`]: the sentence/word occurrence index
//! - [`borg_gen`]: pivot selection, weighted choice and bidirectional expansion
//!
//! It also owns the corpus file format: one learned sentence per line, each
//! sentence repeated as many times as it has been learned.
//!
//! # Quick Start
//!
//! ```
//! use borg::Borg;
//! use rand::rngs::SmallRng;
//! use rand::SeedableRng;
//!
//! let mut borg = Borg::new(SmallRng::seed_from_u64(42));
//! for _ in 0..3 {
//!     borg.learn("The cat sat on the mat.");
//! }
//! let reply = borg.respond("Tell me about the cat.");
//! println!("{reply}");
//! ```

mod error;

use std::collections::HashSet;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::iter;
use std::path::Path;

use borg_gen::generate_reply;
use borg_text::{finalize, normalize, split_sentences};
use rand::Rng;
use tracing::{debug, info, warn};

pub use borg_gen::{DEFAULT_MAX_TOKENS, GenerationError, GenerationLimit, PIVOT_MIN_SEEN};
pub use borg_knowledge::{Fingerprint, KnowledgeBase, Occurrence, SentenceRecord, WordRecord};
pub use error::{BorgError, BorgResult};

/// Punctuation tokens that never anchor a reply and get fused with their
/// neighbour during expansion.
pub const DEFAULT_IGNORE: [&str; 5] = ["!.", "?.", "'", ",", ";"];

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Keep learning once the corpus is loaded, and write the corpus back on
    /// save. When false the model is frozen after [`Borg::load_corpus`].
    pub learn: bool,
    /// Tokens excluded from pivot selection and fused during expansion.
    pub ignore: HashSet<String>,
    /// Log every conversation turn (input and reply) at info level.
    pub debug: bool,
    /// Bound on reply growth.
    pub limit: GenerationLimit,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            learn: true,
            ignore: DEFAULT_IGNORE.iter().map(|s| s.to_string()).collect(),
            debug: false,
            limit: GenerationLimit::default(),
        }
    }
}

/// The borg conversational engine.
///
/// Generic over the PRNG type `R` for testability. Not internally
/// synchronized: learning and replying take `&mut self`.
pub struct Borg<R: Rng> {
    /// Everything learned so far.
    kb: KnowledgeBase,
    settings: Settings,
    /// Set once the initial corpus load completes. From then on
    /// `settings.learn == false` turns [`Borg::learn`] into a no-op.
    loaded: bool,
    rng: R,
}

impl<R: Rng> Borg<R> {
    /// Create an engine with default settings.
    pub fn new(rng: R) -> Self {
        Self::with_settings(Settings::default(), rng)
    }

    /// Create an engine with the given settings.
    pub fn with_settings(settings: Settings, rng: R) -> Self {
        Borg {
            kb: KnowledgeBase::new(),
            settings,
            loaded: false,
            rng,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Enable or disable learning. Only takes effect once loading finished.
    pub fn set_learning(&mut self, learn: bool) {
        self.settings.learn = learn;
    }

    /// Set the generation limit.
    pub fn set_limit(&mut self, limit: GenerationLimit) {
        self.settings.limit = limit;
    }

    /// Replace the ignore set.
    pub fn set_ignore(&mut self, ignore: HashSet<String>) {
        self.settings.ignore = ignore;
    }

    /// Mark the initial corpus load as complete.
    ///
    /// This is a one-way latch: afterwards, disabling learning freezes the
    /// model for every subsequent [`Borg::learn`] call.
    pub fn finish_loading(&mut self) {
        self.loaded = true;
    }

    /// Whether the initial corpus load has completed.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Learn every sentence in a raw line of text.
    ///
    /// Never fails: empty and single-word sentences are skipped.
    pub fn learn(&mut self, line: &str) {
        if self.loaded && !self.settings.learn {
            return;
        }

        let normalized = normalize(line);
        for fragment in split_sentences(&normalized) {
            if self.kb.learn_sentence(fragment).is_some() && self.loaded {
                debug!(sentence = fragment, "learning");
            }
        }
    }

    /// Generate a reply to a raw line of text without learning from it.
    ///
    /// An input with no usable pivot yields an empty string.
    pub fn build_reply(&mut self, input: &str) -> BorgResult<String> {
        let normalized = normalize(input);
        let tokens = generate_reply(
            &self.kb,
            &normalized,
            &self.settings.ignore,
            &self.settings.limit,
            &mut self.rng,
        )?;
        Ok(finalize(&tokens.join(" ")))
    }

    /// One conversation turn: reply to the input, then learn from it.
    ///
    /// A reply that hits the generation limit is returned as far as it got.
    pub fn respond(&mut self, input: &str) -> String {
        let reply = self.build_reply(input).unwrap_or_else(|err| {
            warn!(error = %err, "reply cut short");
            err.partial_reply().unwrap_or_default()
        });
        if self.settings.debug {
            info!(input, reply = %reply, "reply built");
        }
        self.learn(input);
        reply
    }

    /// Learn every line of the corpus file, then close the load latch.
    ///
    /// A missing file is created empty. Returns the number of distinct
    /// sentences known afterwards.
    pub fn load_corpus(&mut self, path: &Path) -> BorgResult<usize> {
        info!(path = %path.display(), "reading lines file");
        let lines = read_corpus(path)?;

        for line in &lines {
            self.learn(line);
        }
        self.finish_loading();

        let known = self.kb.sentence_count();
        info!(sentences = known, words = self.kb.word_count(), "corpus learned");
        Ok(known)
    }

    /// Rewrite the corpus file with everything learned.
    ///
    /// Does nothing and returns `false` when learning is disabled.
    pub fn save_corpus(&self, path: &Path) -> BorgResult<bool> {
        if !self.settings.learn {
            debug!(path = %path.display(), "learning disabled, corpus left untouched");
            return Ok(false);
        }

        info!(path = %path.display(), "writing lines file");
        write_corpus(path, self.corpus_lines())?;
        Ok(true)
    }

    /// The corpus as it would be saved: every sentence finalized, repeated
    /// once per time it was learned, in first-learned order.
    pub fn corpus_lines(&self) -> Vec<String> {
        self.kb
            .sentences()
            .flat_map(|record| iter::repeat_n(finalize(&record.text), record.seen as usize))
            .collect()
    }

    /// Get a reference to the knowledge base (for inspection/testing).
    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.kb
    }
}

/// Read a corpus file, one sentence per line.
///
/// A missing file is created empty and yields no lines.
pub fn read_corpus(path: &Path) -> io::Result<Vec<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content.lines().map(str::to_string).collect()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "lines file not found, creating it");
            fs::File::create(path)?;
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

/// Rewrite a corpus file with the given lines.
pub fn write_corpus<I>(path: &Path, lines: I) -> io::Result<()>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut out = BufWriter::new(fs::File::create(path)?);
    for line in lines {
        writeln!(out, "{}", line.as_ref())?;
    }
    out.flush()
}

/// Load a token list file (one token per line, comments with #).
pub fn load_word_list(path: &Path) -> io::Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| l.to_lowercase())
        .collect())
}
