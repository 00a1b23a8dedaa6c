//! Translation of ranked candidates into the rows the editor popup
//! renders. Stateless: ordering is the filter's business, this module
//! only applies the configured row filters and cosmetic transforms.

use pum_core::chars::char_is_word;
use pum_core::{CompleteOption, Config, Item};

use crate::filter::Candidate;

/// Whether number-select applies to this session. Typing digits while
/// the popup maps 1..9 would fight an input that itself starts with a
/// digit.
pub(crate) fn number_select_active(config: &Config, option: &CompleteOption) -> bool {
    config.number_select
        && !option
            .input
            .chars()
            .next()
            .is_some_and(|ch| ch.is_ascii_digit())
}

/// Apply config filters and transforms. Returns the rows to show, each
/// tagged with its source index, and the preselect row (-1 for none).
pub(crate) fn build_rows(
    candidates: Vec<Candidate>,
    priorities: &[i32],
    option: &CompleteOption,
    config: &Config,
) -> (Vec<(usize, Item)>, i64) {
    let number_select = number_select_active(config, option);
    let mut per_source = vec![0usize; priorities.len()];
    let mut seen_words: Vec<String> = Vec::new();
    let mut rows: Vec<(usize, Item)> = Vec::new();

    for Candidate { source, mut item } in candidates {
        if rows.len() >= config.max_item_count {
            break;
        }
        if item.word.is_empty() && !item.empty {
            continue;
        }
        if config.ascii_characters_only && !item.word.is_ascii() {
            continue;
        }
        let limit = if priorities.get(source).copied().unwrap_or(0) >= 90 {
            config.high_priority_source_limit
        } else {
            config.low_priority_source_limit
        };
        if limit.is_some_and(|limit| per_source[source] >= limit) {
            continue;
        }
        if config.remove_duplicate_items {
            if !item.dup && seen_words.iter().any(|word| *word == item.word) {
                continue;
            }
            seen_words.push(item.word.clone());
        }
        per_source[source] += 1;

        if config.fix_inserted_word {
            fix_inserted_word(&mut item, option);
        }
        if item.is_snippet {
            item.abbr.push_str(&config.snippet_indicator);
        }
        if item.abbr.chars().count() > config.label_max_length {
            item.abbr = item.abbr.chars().take(config.label_max_length).collect();
        }
        if config.disable_menu_shortcut {
            strip_menu_shortcut(&mut item.menu);
        }
        if config.disable_kind {
            item.kind.clear();
        }
        if config.disable_menu {
            item.menu.clear();
        }
        rows.push((source, item));
    }

    let preselect = if config.enable_preselect {
        rows.iter()
            .position(|(_, item)| item.preselect)
            .map_or(-1, |idx| idx as i64)
    } else {
        -1
    };

    if number_select {
        for (n, (_, item)) in rows.iter_mut().take(9).enumerate() {
            item.abbr = format!("{} {}", n + 1, item.abbr);
        }
    }

    (rows, preselect)
}

/// When the text right after the cursor already spells the tail of the
/// word, inserting the full word would duplicate it. Trim the overlap.
fn fix_inserted_word(item: &mut Item, option: &CompleteOption) {
    let following = option
        .line
        .get((option.colnr as usize).saturating_sub(1)..)
        .unwrap_or_default();
    let follow_word: String = following.chars().take_while(|&ch| char_is_word(ch)).collect();
    if follow_word.is_empty() || item.word == follow_word {
        return;
    }
    if let Some(trimmed) = item.word.strip_suffix(follow_word.as_str()) {
        item.word = trimmed.to_string();
    }
}

/// `menu` entries often carry a `[shortcut]` suffix naming the source.
fn strip_menu_shortcut(menu: &mut String) {
    if !menu.ends_with(']') {
        return;
    }
    if let Some(open) = menu.rfind('[') {
        menu.truncate(open);
        while menu.ends_with(' ') {
            menu.pop();
        }
    }
}
