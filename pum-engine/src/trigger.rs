//! Whether a typed prefix should start a completion session.

use std::sync::Arc;

use pum_core::chars::char_is_whitespace;
use pum_core::{AutoTrigger, Config, WordSet};

use crate::source::Source;

/// The trigger policy. Deterministic in its arguments; rules apply in
/// order:
///
/// 1. an empty or whitespace-terminated prefix never triggers;
/// 2. `autoTrigger: none` never triggers;
/// 3. a source trigger match always triggers, restarting a live session;
/// 4. the word rule below only applies to `autoTrigger: always` and only
///    when no session is live;
/// 5. a prefix ending in a word character (per the buffer's word table,
///    with every code point above 255 included) triggers once the word
///    suffix reaches `minTriggerInputLength`.
pub(crate) fn should_trigger(
    pre: &str,
    filetype: &str,
    config: &Config,
    sources: &[Arc<dyn Source>],
    session_active: bool,
    words: &WordSet,
) -> bool {
    let Some(last) = pre.chars().last() else {
        return false;
    };
    if char_is_whitespace(last) {
        return false;
    }
    if config.auto_trigger == AutoTrigger::None {
        return false;
    }
    if sources
        .iter()
        .any(|source| source.matches_trigger(pre, filetype))
    {
        return true;
    }
    if config.auto_trigger != AutoTrigger::Always || session_active {
        return false;
    }
    if words.is_word(last) || last as u32 > 255 {
        let input = words.word_suffix(pre);
        input.chars().count() >= config.min_trigger_input_length as usize
    } else {
        false
    }
}
