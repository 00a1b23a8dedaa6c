//! Utility functions to categorize a `char` for trigger decisions.

/// Determine whether a character is part of a word with the default
/// word-class table.
#[inline]
pub fn char_is_word(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Determine whether a character qualifies as whitespace for the purposes
/// of trigger suppression. Covers the blank characters an editor inserts
/// on indent in addition to plain ASCII space.
#[inline]
pub fn char_is_whitespace(ch: char) -> bool {
    ch.is_whitespace()
}

/// The word-character table of one buffer.
///
/// Buffers carry their own definition of "word" (for example `-` is a word
/// character in css). The trigger policy consults the table of the buffer
/// the session runs in rather than a fixed class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordSet {
    extra: Vec<char>,
}

impl WordSet {
    /// Table extended with buffer specific word characters.
    pub fn with_extra(extra: impl IntoIterator<Item = char>) -> WordSet {
        WordSet {
            extra: extra.into_iter().collect(),
        }
    }

    #[inline]
    pub fn is_word(&self, ch: char) -> bool {
        char_is_word(ch) || self.extra.contains(&ch)
    }

    /// The longest suffix of `text` made of word characters.
    pub fn word_suffix<'a>(&self, text: &'a str) -> &'a str {
        let start = text
            .char_indices()
            .rev()
            .take_while(|&(_, ch)| self.is_word(ch))
            .last()
            .map_or(text.len(), |(idx, _)| idx);
        &text[start..]
    }
}
