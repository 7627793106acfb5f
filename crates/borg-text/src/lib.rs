//! Text canonicalization for the borg engine: punctuation padding, sentence
//! splitting, and the reverse transformation applied to generated replies.
//!
//! Learned text and reply requests both pass through [`normalize`], which
//! lower-cases the input and surrounds every mark in [`PUNCTUATION`] with
//! spaces so each mark becomes its own whitespace-separated token. A period
//! followed by a space marks a sentence boundary, which is what
//! [`split_sentences`] splits on.
//!
//! This crate has no dependencies on other borg crates; it is a pure text
//! processing utility.

/// Marks that are padded with spaces so they tokenize on their own.
pub const PUNCTUATION: [char; 8] = [';', '?', '!', '.', ',', '\'', ':', '*'];

/// Separator between sentences in normalized text.
pub const SENTENCE_BREAK: &str = ". ";

/// Canonicalize raw text into a tokenizable, punctuation-padded form.
///
/// 1. Lower-cases and strips line terminators and surrounding whitespace.
/// 2. Pads each mark in [`PUNCTUATION`] with a space on both sides.
/// 3. Doubles every period that precedes a space and rewrites `"? "` / `"! "`
///    as `"?. "` / `"!. "`, so `". "` uniformly ends a sentence while the
///    original mark survives as a token.
/// 4. Folds the run left behind by `"..."` into a single `"...."` token.
/// 5. Collapses whitespace and appends one trailing space.
///
/// # Examples
///
/// ```
/// use borg_text::normalize;
///
/// assert_eq!(normalize("Hi there?"), "hi there ?. ");
/// assert_eq!(normalize("Bacon, eggs and toast."), "bacon , eggs and toast .. ");
/// ```
pub fn normalize(raw: &str) -> String {
    let mut text = raw.to_lowercase().replace(['\n', '\r'], "");
    text = text.trim().to_string();

    for mark in PUNCTUATION {
        text = text.replace(mark, &format!(" {mark} "));
    }

    let text = text
        .replace(". ", ".. ")
        .replace("? ", "?. ")
        .replace("! ", "!. ")
        .replace("..  ..  .. ", ".... ");

    let mut collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.push(' ');
    collapsed
}

/// Split normalized text into sentence fragments on [`SENTENCE_BREAK`].
///
/// Fragments are returned verbatim; the trailing fragment is usually empty or
/// ends with the space appended by [`normalize`].
pub fn split_sentences(normalized: &str) -> Vec<&str> {
    normalized.split(SENTENCE_BREAK).collect()
}

/// Undo the padding added by [`normalize`] for human-readable output.
///
/// Removes the space before each padded mark. The apostrophe is special: both
/// of its surrounding spaces are removed, so `"don ' t"` reads `"don't"`.
/// Case is not restored.
pub fn finalize(reply: &str) -> String {
    reply
        .replace(" ?", "?")
        .replace(" !", "!")
        .replace(" .", ".")
        .replace(" ;", ";")
        .replace(" ,", ",")
        .replace(" ' ", "'")
        .replace(" :", ":")
        .replace(" *", "*")
}
