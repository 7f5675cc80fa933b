//! Text normalization applied before a rule's pattern runs.
//!
//! Normalized text is only ever used for matching. Templates and the final
//! verdict always see the effective (original or rewritten) text.
//!
//! Two independent passes, selected per rule:
//!
//! - `STRIP_COLORS`: removes legacy `&x` / `§x` codes (`x` in `0-9a-fk-orx`,
//!   case-insensitive) and hex codes `&#rrggbb`. Removing a code can expose a
//!   new one (`&&cc` → `&c`), so the pass repeats until nothing changes.
//! - `STRIP_ACCENTS`: decomposes to NFD, drops combining diacritical marks
//!   (U+0300..U+036F) and recomposes. Stroked letters (ł, ø, đ) fold to their
//!   base letter.
//!
//! Both passes leave every other character untouched and are idempotent.

use std::borrow::Cow;
use unicode_normalization::UnicodeNormalization;

bitflags::bitflags! {
    /// Per-rule normalization switches (`strip colors`, `strip accents`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Normalization: u8 {
        const STRIP_COLORS  = 1 << 0;
        const STRIP_ACCENTS = 1 << 1;
    }
}

/// Normalize `text` for matching. Borrows when no pass changes anything.
pub fn normalize(text: &str, flags: Normalization) -> Cow<'_, str> {
    let mut out = Cow::Borrowed(text);

    if flags.contains(Normalization::STRIP_COLORS) {
        let stripped = match strip_colors(&out) {
            Cow::Owned(s) => Some(s),
            Cow::Borrowed(_) => None,
        };
        if let Some(s) = stripped {
            out = Cow::Owned(s);
        }
    }

    if flags.contains(Normalization::STRIP_ACCENTS) {
        let folded = match strip_accents(&out) {
            Cow::Owned(s) => Some(s),
            Cow::Borrowed(_) => None,
        };
        if let Some(s) = folded {
            out = Cow::Owned(s);
        }
    }

    out
}

pub(crate) fn strip_colors(text: &str) -> Cow<'_, str> {
    let re = regex!(r"(?i)[&§](?:#[0-9a-f]{6}|[0-9a-fk-orx])");

    if !re.is_match(text) {
        return Cow::Borrowed(text);
    }

    let mut current = re.replace_all(text, "").into_owned();
    while re.is_match(&current) {
        current = re.replace_all(&current, "").into_owned();
    }
    Cow::Owned(current)
}

pub(crate) fn strip_accents(text: &str) -> Cow<'_, str> {
    if text.is_ascii() {
        return Cow::Borrowed(text);
    }

    let stripped: String = text
        .nfd()
        .filter(|&ch| !is_combining_mark(ch))
        .map(|ch| fold_stroke(ch).unwrap_or(ch))
        .nfc()
        .collect();

    if stripped == text { Cow::Borrowed(text) } else { Cow::Owned(stripped) }
}

fn is_combining_mark(ch: char) -> bool {
    ('\u{0300}'..='\u{036F}').contains(&ch)
}

/// Base letter of a Latin letter whose diacritic has no decomposition.
fn fold_stroke(ch: char) -> Option<char> {
    let base = match ch {
        'Ø' => 'O',
        'ø' => 'o',
        'Đ' => 'D',
        'đ' => 'd',
        'Ħ' => 'H',
        'ħ' => 'h',
        'ı' => 'i',
        'Ŀ' | 'Ł' => 'L',
        'ŀ' | 'ł' => 'l',
        'Ŧ' => 'T',
        'ŧ' => 't',
        _ => return None,
    };
    Some(base)
}
