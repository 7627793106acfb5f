//! Borg reply generation: pivot selection, weighted word choice, and
//! bidirectional expansion.
//!
//! A reply is grown from a single word:
//!
//! 1. **Filter** the request down to known, non-punctuation, non-numeric words.
//! 2. **Pick a pivot**: the least-seen word that has still been seen at least
//!    [`PIVOT_MIN_SEEN`] times.
//! 3. **Expand left** from the pivot, one word (or fused word + punctuation
//!    unit) at a time, following the learned sentences that contain the
//!    current leftmost word.
//! 4. **Expand right** from the last two tokens of the left side the same way.
//!
//! Every step draws from a frequency table with [`decide`]. A sentence
//! boundary competes as the empty entry, so replies end when the learned
//! sentences mostly end there. Expansion is an explicit loop bounded by a
//! [`GenerationLimit`].

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use borg_knowledge::KnowledgeBase;
use borg_text::split_sentences;
use rand::Rng;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

/// A word must have been seen at least this many times to anchor a reply.
pub const PIVOT_MIN_SEEN: u32 = 3;

/// Default token bound for each expansion pass.
pub const DEFAULT_MAX_TOKENS: usize = 64;

/// Tokens made only of digit characters: decimal digits of any script plus
/// the superscript, subscript, circled and other digit forms. Fractions and
/// numerals such as "½" or "ⅻ" are not digits.
static DIGITS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^[\p{Nd}",
        r"\x{00B2}\x{00B3}\x{00B9}\x{2070}\x{2074}-\x{2079}\x{2080}-\x{2089}",
        r"\x{2460}-\x{2468}\x{2474}-\x{247C}\x{2488}-\x{2490}\x{24EA}\x{24F5}-\x{24FD}\x{24FF}",
        r"\x{2776}-\x{277E}\x{2780}-\x{2788}\x{278A}-\x{2792}",
        r"\x{1369}-\x{1371}\x{19DA}\x{10A40}-\x{10A43}\x{10E60}-\x{10E68}\x{11052}-\x{1105A}",
        r"\x{1F100}-\x{1F10A}",
        r"]+$",
    ))
    .expect("digit pattern is valid")
});

/// Bounds how far a reply may grow before generation gives up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationLimit {
    /// Stop once a pass would hold more than this many tokens.
    Tokens(usize),
    /// Stop once generation has run for the given duration.
    Timeout(Duration),
    /// Stop when either limit is reached.
    Both {
        timeout: Duration,
        max_tokens: usize,
    },
}

impl GenerationLimit {
    /// The token bound, if any.
    pub fn max_tokens(&self) -> Option<usize> {
        match self {
            GenerationLimit::Tokens(n) => Some(*n),
            GenerationLimit::Timeout(_) => None,
            GenerationLimit::Both { max_tokens, .. } => Some(*max_tokens),
        }
    }

    /// The wall-clock bound, if any.
    pub fn timeout(&self) -> Option<Duration> {
        match self {
            GenerationLimit::Tokens(_) => None,
            GenerationLimit::Timeout(d) => Some(*d),
            GenerationLimit::Both { timeout, .. } => Some(*timeout),
        }
    }
}

impl Default for GenerationLimit {
    fn default() -> Self {
        GenerationLimit::Tokens(DEFAULT_MAX_TOKENS)
    }
}

/// Generation ran past its [`GenerationLimit`].
///
/// Both variants carry the longest reply built before the limit was hit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("reply grew past {limit} tokens")]
    TokenLimit { limit: usize, partial: Vec<String> },

    #[error("reply generation ran longer than {timeout:?}")]
    Timeout {
        timeout: Duration,
        partial: Vec<String>,
    },
}

impl GenerationError {
    /// Tokens of the reply built so far.
    pub fn partial(&self) -> &[String] {
        match self {
            GenerationError::TokenLimit { partial, .. } | GenerationError::Timeout { partial, .. } => {
                partial
            }
        }
    }

    /// Consume the error, keeping the partial reply.
    pub fn into_partial(self) -> Vec<String> {
        match self {
            GenerationError::TokenLimit { partial, .. } | GenerationError::Timeout { partial, .. } => {
                partial
            }
        }
    }

    fn with_prefix(mut self, prefix: &[String]) -> Self {
        let partial = match &mut self {
            GenerationError::TokenLimit { partial, .. } | GenerationError::Timeout { partial, .. } => {
                partial
            }
        };
        let mut joined = prefix.to_vec();
        joined.append(partial);
        *partial = joined;
        self
    }
}

/// Generate reply tokens for an already-normalized request.
///
/// Returns an empty list when the request contains no usable pivot.
pub fn generate_reply<R: Rng>(
    kb: &KnowledgeBase,
    normalized: &str,
    ignore: &HashSet<String>,
    limit: &GenerationLimit,
    rng: &mut R,
) -> Result<Vec<String>, GenerationError> {
    let candidates = filter_split(kb, normalized, ignore);

    let Some(pivot) = choose_pivot(kb, &candidates, rng) else {
        debug!(?candidates, "no usable pivot");
        return Ok(Vec::new());
    };
    debug!(%pivot, "pivot");

    let expander = Expander::new(kb, ignore, limit);

    let left = expander.left(vec![pivot], rng)?;
    debug!(left = %left.join(" "), "left side");

    // The last two tokens of the left side seed the right side.
    let (prefix, seed) = left.split_at(left.len().saturating_sub(2));
    let right = expander
        .right(seed.to_vec(), rng)
        .map_err(|e| e.with_prefix(prefix))?;
    debug!(right = %right.join(" "), "right side");

    let mut reply = prefix.to_vec();
    reply.extend(right);
    Ok(reply)
}

/// Flatten normalized text into pivot candidates.
///
/// Keeps tokens the knowledge base has seen, dropping ignored punctuation and
/// tokens made only of digits. Order and duplicates are preserved.
pub fn filter_split(kb: &KnowledgeBase, normalized: &str, ignore: &HashSet<String>) -> Vec<String> {
    split_sentences(normalized)
        .into_iter()
        .flat_map(str::split_whitespace)
        .filter(|word| kb.contains_word(word) && !ignore.contains(*word) && !is_digits(word))
        .map(str::to_string)
        .collect()
}

fn is_digits(word: &str) -> bool {
    DIGITS.is_match(word)
}

/// Pick the word to grow a reply from.
///
/// Prefers the least-seen candidate among those seen at least
/// [`PIVOT_MIN_SEEN`] times; candidates tied at that count (including repeats
/// of the same word) share the draw. Returns `None` if no candidate qualifies.
pub fn choose_pivot<R: Rng>(kb: &KnowledgeBase, candidates: &[String], rng: &mut R) -> Option<String> {
    // The empty sentinel stands for "no pivot" until a candidate qualifies.
    let mut choices: Vec<&str> = vec![""];
    let mut threshold: Option<u32> = None;

    for word in candidates {
        let Some(record) = kb.word(word) else {
            continue;
        };
        let seen = record.seen;

        if threshold == Some(seen) {
            choices.push(word.as_str());
        } else if threshold.is_none_or(|t| seen < t) && seen >= PIVOT_MIN_SEEN {
            choices = vec![word.as_str()];
            threshold = Some(seen);
        }
    }

    let pick = choices[rng.random_range(0..choices.len())];
    (!pick.is_empty()).then(|| pick.to_string())
}

/// Cumulative-distribution choice over `weighted`, skipping excluded entries.
///
/// `weighted` must be sorted by descending weight. A value is drawn uniformly
/// from `0..=total` and the first entry whose running total reaches it is
/// picked. If that entry is in `exclude`, the scan moves forward through the
/// sorted list to the next entry that is not; it does not draw again. Running
/// off the end, or picking the empty entry, yields an empty result.
///
/// The chosen entry is split on whitespace, since an entry may be a fused
/// two-token unit.
pub fn decide<R: Rng>(weighted: &[(String, u64)], exclude: &[String], rng: &mut R) -> Vec<String> {
    let mut cumulative = Vec::with_capacity(weighted.len());
    let mut total: u64 = 0;
    for (_, weight) in weighted {
        total += weight;
        cumulative.push(total);
    }

    let target = rng.random_range(0..=total);
    let Some(mut index) = cumulative.iter().position(|&c| c >= target) else {
        return Vec::new();
    };

    while exclude.contains(&weighted[index].0) {
        index += 1;
        if index >= weighted.len() {
            return Vec::new();
        }
    }

    weighted[index]
        .0
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Frequency table for one expansion step.
///
/// Keeps first-credited order so that the stable sort in [`Tally::into_sorted`]
/// breaks ties deterministically. Entry 0 is the empty "stop here" entry.
#[derive(Debug)]
struct Tally {
    entries: Vec<(String, u64)>,
    index: HashMap<String, usize>,
}

impl Tally {
    fn new() -> Self {
        Tally {
            entries: vec![(String::new(), 0)],
            index: HashMap::from([(String::new(), 0)]),
        }
    }

    fn credit(&mut self, unit: String, weight: u64) {
        match self.index.get(&unit) {
            Some(&i) => self.entries[i].1 += weight,
            None => {
                self.index.insert(unit.clone(), self.entries.len());
                self.entries.push((unit, weight));
            }
        }
    }

    fn stop(&mut self, weight: u64) {
        self.entries[0].1 += weight;
    }

    fn into_sorted(mut self) -> Vec<(String, u64)> {
        self.entries.sort_by(|a, b| b.1.cmp(&a.1));
        self.entries
    }
}

/// Grows a reply outward from its ends using the learned sentences.
pub struct Expander<'a> {
    kb: &'a KnowledgeBase,
    ignore: &'a HashSet<String>,
    limit: &'a GenerationLimit,
    started: Instant,
}

impl<'a> Expander<'a> {
    /// Create an expander; the timeout clock starts now.
    pub fn new(kb: &'a KnowledgeBase, ignore: &'a HashSet<String>, limit: &'a GenerationLimit) -> Self {
        Expander {
            kb,
            ignore,
            limit,
            started: Instant::now(),
        }
    }

    /// Prepend words until the sentence boundary wins the draw.
    pub fn left<R: Rng>(&self, mut tokens: Vec<String>, rng: &mut R) -> Result<Vec<String>, GenerationError> {
        loop {
            let Some(anchor) = tokens.first() else {
                return Ok(tokens);
            };
            let weighted = self.left_candidates(anchor, tokens.get(1).map(String::as_str));

            let unit = decide(&weighted, &tokens, rng);
            if unit.is_empty() {
                return Ok(tokens);
            }

            self.check(tokens.len() + unit.len(), &tokens)?;
            let mut grown = unit;
            grown.append(&mut tokens);
            tokens = grown;
        }
    }

    /// Append words until the sentence boundary wins the draw.
    pub fn right<R: Rng>(&self, mut tokens: Vec<String>, rng: &mut R) -> Result<Vec<String>, GenerationError> {
        loop {
            let Some(anchor) = tokens.last() else {
                return Ok(tokens);
            };
            let context = tokens.len().checked_sub(2).map(|i| tokens[i].as_str());
            let weighted = self.right_candidates(anchor, context);

            let unit = decide(&weighted, &tokens, rng);
            if unit.is_empty() {
                return Ok(tokens);
            }

            self.check(tokens.len() + unit.len(), &tokens)?;
            tokens.extend(unit);
        }
    }

    /// Words seen immediately before `anchor`, weighted by sentence count.
    ///
    /// `context` is the token currently to the right of the anchor; sentences
    /// where something else follows the anchor are skipped.
    fn left_candidates(&self, anchor: &str, context: Option<&str>) -> Vec<(String, u64)> {
        let mut tally = Tally::new();
        let Some(record) = self.kb.word(anchor) else {
            return tally.into_sorted();
        };

        for occurrence in &record.occurrences {
            let Some(sentence) = self.kb.sentence(occurrence.sentence) else {
                continue;
            };
            let words = sentence.tokens();
            let pos = occurrence.position;
            let seen = u64::from(sentence.seen);

            if pos == 0 {
                tally.stop(seen);
                continue;
            }

            if let Some(context) = context
                && let Some(&source) = words.get(pos + 1)
                && source != context
            {
                continue;
            }

            let Some(&previous) = words.get(pos - 1) else {
                continue;
            };
            let unit = if pos > 1 && self.ignore.contains(previous) {
                format!("{} {previous}", words[pos - 2])
            } else {
                previous.to_string()
            };
            tally.credit(unit, seen);
        }

        tally.into_sorted()
    }

    /// Words seen immediately after `anchor`, weighted by sentence count.
    ///
    /// `context` is the token currently to the left of the anchor; sentences
    /// where something else (or nothing) precedes the anchor are skipped. A
    /// sentence ending at the anchor adds one to the stop entry regardless of
    /// how often it was seen.
    fn right_candidates(&self, anchor: &str, context: Option<&str>) -> Vec<(String, u64)> {
        let mut tally = Tally::new();
        let Some(record) = self.kb.word(anchor) else {
            return tally.into_sorted();
        };

        for occurrence in &record.occurrences {
            let Some(sentence) = self.kb.sentence(occurrence.sentence) else {
                continue;
            };
            let words = sentence.tokens();
            let pos = occurrence.position;
            let seen = u64::from(sentence.seen);

            if let Some(context) = context
                && pos
                    .checked_sub(1)
                    .and_then(|p| words.get(p))
                    .is_none_or(|&source| source != context)
            {
                continue;
            }

            if pos + 1 >= words.len() {
                tally.stop(1);
                continue;
            }

            let next = words[pos + 1];
            let unit = if pos + 2 < words.len() && self.ignore.contains(next) {
                format!("{next} {}", words[pos + 2])
            } else {
                next.to_string()
            };
            tally.credit(unit, seen);
        }

        tally.into_sorted()
    }

    fn check(&self, len: usize, partial: &[String]) -> Result<(), GenerationError> {
        if let Some(limit) = self.limit.max_tokens()
            && len > limit
        {
            return Err(GenerationError::TokenLimit {
                limit,
                partial: partial.to_vec(),
            });
        }
        if let Some(timeout) = self.limit.timeout()
            && self.started.elapsed() >= timeout
        {
            return Err(GenerationError::Timeout {
                timeout,
                partial: partial.to_vec(),
            });
        }
        Ok(())
    }
}
