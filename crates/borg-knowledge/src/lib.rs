//! Sentence and word occurrence index backing the borg reply engine.
//!
//! The [`KnowledgeBase`] maintains two maps:
//! - `sentences`: [`Fingerprint`] → [`SentenceRecord`], one record per distinct
//!   canonical sentence, plus the order in which sentences were first learned
//! - `words`: token → [`WordRecord`], listing every `(sentence, position)` at
//!   which the token was seen
//!
//! Generation walks outward from a word by following its occurrences back into
//! the sentences that contain it, so both maps are read far more often than
//! they are written. Records are created lazily and never pruned.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

/// 128-bit digest identifying a canonical sentence.
///
/// Two sentences with the same fingerprint are treated as the same sentence.
/// With a 128-bit BLAKE3 prefix the chance of that happening by accident is
/// negligible, and collisions are not detected.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct Fingerprint(pub u128);

impl Fingerprint {
    /// Fingerprint a canonical sentence.
    pub fn of(text: &str) -> Self {
        let digest = blake3::hash(text.as_bytes());
        let mut prefix = [0u8; 16];
        prefix.copy_from_slice(&digest.as_bytes()[..16]);
        Fingerprint(u128::from_le_bytes(prefix))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// One appearance of a word: the sentence it belongs to and its token index.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct Occurrence {
    pub sentence: Fingerprint,
    pub position: usize,
}

/// A learned sentence in canonical (normalized) form.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SentenceRecord {
    pub fingerprint: Fingerprint,
    /// The fragment exactly as it was split out of the normalized line.
    pub text: String,
    /// How many times this sentence has been learned.
    pub seen: u32,
}

impl SentenceRecord {
    /// Whitespace-separated tokens of the sentence.
    pub fn tokens(&self) -> Vec<&str> {
        self.text.split_whitespace().collect()
    }
}

/// Everything known about one token.
///
/// `seen` always equals `occurrences.len()`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WordRecord {
    pub word: String,
    pub seen: u32,
    /// Appearances in learning order.
    pub occurrences: Vec<Occurrence>,
}

impl WordRecord {
    fn new(word: &str) -> Self {
        WordRecord {
            word: word.to_string(),
            seen: 0,
            occurrences: Vec::new(),
        }
    }
}

/// Sentence and word index, exclusively owning every record.
///
/// Reply generation only ever borrows the knowledge base immutably; the only
/// mutating entry point is [`KnowledgeBase::learn_sentence`].
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    sentences: HashMap<Fingerprint, SentenceRecord>,
    /// Fingerprints in the order their sentences were first learned.
    order: Vec<Fingerprint>,
    words: HashMap<String, WordRecord>,
}

impl KnowledgeBase {
    /// Create an empty knowledge base.
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn one sentence fragment produced by `borg_text::split_sentences`.
    ///
    /// Empty fragments and fragments of a single token carry no adjacency
    /// information and are ignored. Learning a sentence that is already known
    /// bumps its `seen` count and records its words again; it never creates a
    /// second [`SentenceRecord`].
    ///
    /// Returns the sentence's fingerprint if anything was learned.
    pub fn learn_sentence(&mut self, fragment: &str) -> Option<Fingerprint> {
        if fragment.is_empty() {
            return None;
        }

        let words: Vec<&str> = fragment.split_whitespace().collect();
        if words.len() <= 1 {
            return None;
        }

        let fingerprint = Fingerprint::of(fragment);

        for (position, word) in words.iter().enumerate() {
            let record = self.word_entry(word);
            record.seen += 1;
            record.occurrences.push(Occurrence {
                sentence: fingerprint,
                position,
            });
        }

        let record = self.sentence_entry(fingerprint, fragment);
        record.seen += 1;
        trace!(%fingerprint, seen = record.seen, "indexed sentence");

        Some(fingerprint)
    }

    /// Look up a sentence by fingerprint.
    pub fn sentence(&self, fingerprint: Fingerprint) -> Option<&SentenceRecord> {
        self.sentences.get(&fingerprint)
    }

    /// Look up a word.
    pub fn word(&self, word: &str) -> Option<&WordRecord> {
        self.words.get(word)
    }

    /// Whether the word has been learned.
    pub fn contains_word(&self, word: &str) -> bool {
        self.words.contains_key(word)
    }

    /// All sentences, in the order they were first learned.
    pub fn sentences(&self) -> impl Iterator<Item = &SentenceRecord> {
        self.order.iter().filter_map(|fp| self.sentences.get(fp))
    }

    /// Number of distinct sentences.
    pub fn sentence_count(&self) -> usize {
        self.sentences.len()
    }

    /// Number of distinct words.
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Whether nothing has been learned yet.
    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    fn word_entry(&mut self, word: &str) -> &mut WordRecord {
        self.words
            .entry(word.to_string())
            .or_insert_with(|| WordRecord::new(word))
    }

    fn sentence_entry(&mut self, fingerprint: Fingerprint, text: &str) -> &mut SentenceRecord {
        let order = &mut self.order;
        self.sentences.entry(fingerprint).or_insert_with(|| {
            order.push(fingerprint);
            SentenceRecord {
                fingerprint,
                text: text.to_string(),
                seen: 0,
            }
        })
    }
}
