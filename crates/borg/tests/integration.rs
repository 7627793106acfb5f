//! Integration tests for borg: corpus loading, persistence, and replies built
//! from the bundled `lines.txt`.

use std::fs;
use std::path::{Path, PathBuf};

use borg::{Borg, BorgError, Fingerprint, GenerationLimit, Settings, load_word_list};
use rand::SeedableRng;
use rand::rngs::SmallRng;

/// Path to the bundled data directory.
fn data_dir() -> PathBuf {
    // CARGO_MANIFEST_DIR = borg-rs/crates/borg
    // Data files are at borg-rs/data/
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest.join("../../data")
}

fn loaded_borg() -> Borg<SmallRng> {
    let mut borg = Borg::new(SmallRng::seed_from_u64(42));
    borg.load_corpus(&data_dir().join("lines.txt")).unwrap();
    borg
}

fn temp_path(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(name);
    fs::remove_file(&path).ok();
    path
}

// ---------------------------------------------------------------------------
// Corpus loading
// ---------------------------------------------------------------------------

#[test]
fn load_counts_distinct_sentences() {
    let mut borg = Borg::new(SmallRng::seed_from_u64(1));
    let known = borg.load_corpus(&data_dir().join("lines.txt")).unwrap();
    assert_eq!(known, 21);
    assert!(borg.is_loaded());
}

#[test]
fn repeated_lines_raise_seen() {
    let borg = loaded_borg();
    let fp = Fingerprint::of("the cat sat on the mat .");
    assert_eq!(borg.knowledge().sentence(fp).unwrap().seen, 3);
    assert_eq!(borg.knowledge().word("cat").unwrap().seen, 4);
}

#[test]
fn corpus_lines_match_file_length() {
    let borg = loaded_borg();
    let lines = borg.corpus_lines();
    assert_eq!(lines.len(), 23);
    assert_eq!(lines[0], "the cat sat on the mat.");
    assert_eq!(lines[2], "the cat sat on the mat.");
    assert_eq!(lines[3], "the dog chased the cat around the garden.");
}

#[test]
fn bundled_ignore_list_matches_defaults() {
    let words = load_word_list(&data_dir().join("ignore.txt")).unwrap();
    let defaults = Settings::default().ignore;
    assert_eq!(words.len(), defaults.len());
    for word in &words {
        assert!(defaults.contains(word), "unexpected ignore token {word:?}");
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[test]
fn save_and_reload_preserves_corpus() {
    let path = temp_path("borg_integration_save_reload.txt");
    let mut borg = loaded_borg();
    borg.learn("Borg likes to talk about cats.");
    assert!(borg.save_corpus(&path).unwrap());

    let mut reloaded = Borg::new(SmallRng::seed_from_u64(7));
    let known = reloaded.load_corpus(&path).unwrap();
    assert_eq!(known, 22);
    assert_eq!(reloaded.corpus_lines(), borg.corpus_lines());

    fs::remove_file(&path).ok();
}

#[test]
fn load_creates_missing_corpus() {
    let path = temp_path("borg_integration_missing.txt");
    let mut borg = Borg::new(SmallRng::seed_from_u64(1));
    assert_eq!(borg.load_corpus(&path).unwrap(), 0);
    assert!(path.exists());
    assert_eq!(fs::read_to_string(&path).unwrap(), "");
    fs::remove_file(&path).ok();
}

#[test]
fn save_with_learning_disabled_leaves_file_alone() {
    let path = temp_path("borg_integration_frozen.txt");
    fs::write(&path, "The cat sat on the mat.\n").unwrap();

    let settings = Settings {
        learn: false,
        ..Settings::default()
    };
    let mut borg = Borg::with_settings(settings, SmallRng::seed_from_u64(1));
    borg.load_corpus(&path).unwrap();
    borg.respond("Something completely new.");
    assert!(!borg.save_corpus(&path).unwrap());
    assert_eq!(fs::read_to_string(&path).unwrap(), "The cat sat on the mat.\n");

    fs::remove_file(&path).ok();
}

#[test]
fn load_from_directory_is_io_error() {
    let mut borg = Borg::new(SmallRng::seed_from_u64(1));
    let err = borg.load_corpus(&data_dir()).unwrap_err();
    assert!(matches!(err, BorgError::Io(_)));
}

// ---------------------------------------------------------------------------
// Learning after load
// ---------------------------------------------------------------------------

#[test]
fn frozen_model_ignores_new_lines_after_load() {
    let settings = Settings {
        learn: false,
        ..Settings::default()
    };
    let mut borg = Borg::with_settings(settings, SmallRng::seed_from_u64(1));
    borg.load_corpus(&data_dir().join("lines.txt")).unwrap();
    assert_eq!(borg.knowledge().sentence_count(), 21);

    borg.learn("A sentence nobody has seen before.");
    borg.learn("The cat sat on the mat.");
    assert_eq!(borg.knowledge().sentence_count(), 21);
    let fp = Fingerprint::of("the cat sat on the mat .");
    assert_eq!(borg.knowledge().sentence(fp).unwrap().seen, 3);
}

#[test]
fn respond_learns_input() {
    let mut borg = loaded_borg();
    borg.respond("My favourite colour is blue.");
    assert_eq!(borg.knowledge().sentence_count(), 22);
    assert!(borg.knowledge().contains_word("favourite"));
}

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

#[test]
fn reply_contains_pivot() {
    for seed in 0..20 {
        let mut borg = Borg::new(SmallRng::seed_from_u64(seed));
        borg.load_corpus(&data_dir().join("lines.txt")).unwrap();
        let reply = borg.respond("Tell me about the cat");
        assert!(reply.contains("cat"), "seed {seed}: {reply:?}");
    }
}

#[test]
fn rare_words_give_empty_reply() {
    let mut borg = Borg::new(SmallRng::seed_from_u64(42));
    borg.learn("the cat sat on the mat");
    borg.learn("the cat ran away");
    assert_eq!(borg.respond("cat"), "");
}

#[test]
fn unknown_words_give_empty_reply() {
    let mut borg = loaded_borg();
    assert_eq!(borg.build_reply("xylophone zeppelin").unwrap(), "");
}

#[test]
fn reply_restores_punctuation() {
    let mut borg = Borg::new(SmallRng::seed_from_u64(3));
    for _ in 0..3 {
        borg.learn("Hello, world is big.");
    }
    assert_eq!(borg.respond("world"), "hello, world is big.");
}

#[test]
fn reply_rejoins_contractions() {
    let mut borg = Borg::new(SmallRng::seed_from_u64(3));
    for _ in 0..3 {
        borg.learn("I don't know");
    }
    assert_eq!(borg.respond("know"), "i don't know");
}

#[test]
fn overflow_falls_back_to_partial_reply() {
    let mut borg = Borg::new(SmallRng::seed_from_u64(3));
    borg.set_limit(GenerationLimit::Tokens(2));
    for _ in 0..3 {
        borg.learn("a b c d e");
    }
    let err = borg.build_reply("c").unwrap_err();
    assert!(matches!(err, BorgError::Generation(_)));
    assert_eq!(err.partial_reply().as_deref(), Some("b c"));
    assert_eq!(borg.respond("c"), "b c");
}

#[test]
fn same_seed_same_replies() {
    let inputs = ["Tell me about the cat", "Do you like bacon?", "Where is the park?"];
    let run = |seed| {
        let mut borg = Borg::new(SmallRng::seed_from_u64(seed));
        borg.load_corpus(&data_dir().join("lines.txt")).unwrap();
        inputs.iter().map(|i| borg.respond(i)).collect::<Vec<_>>()
    };
    assert_eq!(run(99), run(99));
}
