//! Text segmentation into alphabetic ranges and word/whitespace/symbol tokens.
//!
//! Every function here is lossless: concatenating the produced pieces in order
//! reconstructs the input exactly.

use core::ops::Range;

use smallvec::SmallVec;

/// Token category produced by [`segment`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// Text outside any qualifying alphabetic range.
    Plain,
    /// A single whitespace character inside a range.
    Whitespace,
    /// A single character or an all-symbol token inside a range.
    Special,
    /// An ordinary word token eligible for emphasis.
    Word,
}

/// Borrowed token with its category.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

/// Whitespace as understood by the word splitter.
pub fn is_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r')
}

/// Pictographic/punctuation blocks that split words.
pub fn is_symbol(ch: char) -> bool {
    matches!(
        ch as u32,
        0x2000..=0x206F
            | 0x2190..=0x21FF
            | 0x2300..=0x23FF
            | 0x2600..=0x26FF
            | 0x2700..=0x27BF
            | 0xFE00..=0xFE0F
            | 0x1F000..=0x1F9FF
    )
}

/// Tokens that are emitted verbatim: one character, or symbols only.
pub fn is_special_token(token: &str) -> bool {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (None, _) => true,
        (Some(_), None) => true,
        _ => token.chars().all(is_symbol),
    }
}

/// Byte ranges of alphabetic phrases containing at least two consecutive letters.
///
/// A phrase is a run of ASCII letters optionally continued across a single
/// whitespace character or apostrophe followed by more letters.
pub fn alphabetic_ranges(text: &str) -> SmallVec<[Range<usize>; 8]> {
    let mut ranges = SmallVec::new();
    let bytes = text.as_bytes();
    let mut idx = 0usize;

    while idx < bytes.len() {
        if !bytes[idx].is_ascii_alphabetic() {
            idx += 1;
            continue;
        }
        let start = idx;
        let mut end = idx;
        let mut longest_run = 0usize;
        loop {
            let run_start = end;
            while end < bytes.len() && bytes[end].is_ascii_alphabetic() {
                end += 1;
            }
            longest_run = longest_run.max(end - run_start);
            let Some(&joiner) = bytes.get(end) else {
                break;
            };
            let joins = joiner == b'\'' || is_whitespace(joiner as char);
            let continues = bytes
                .get(end + 1)
                .is_some_and(|next| next.is_ascii_alphabetic());
            if joins && continues {
                end += 1;
            } else {
                break;
            }
        }
        if longest_run >= 2 {
            ranges.push(start..end);
        }
        idx = end;
    }
    ranges
}

/// Split a phrase into word, whitespace and symbol tokens.
///
/// Each whitespace character is its own token. A symbol starts a new token
/// only when the previous non-whitespace character was not a symbol.
pub fn split_words(text: &str) -> SmallVec<[&str; 16]> {
    let mut words = SmallVec::new();
    let mut word_start: Option<usize> = None;
    let mut prev_symbol = false;

    for (idx, ch) in text.char_indices() {
        if is_whitespace(ch) {
            if let Some(start) = word_start.take() {
                words.push(&text[start..idx]);
            }
            words.push(&text[idx..idx + ch.len_utf8()]);
            continue;
        }
        let symbol = is_symbol(ch);
        if symbol && !prev_symbol {
            if let Some(start) = word_start.take() {
                words.push(&text[start..idx]);
            }
        }
        if word_start.is_none() {
            word_start = Some(idx);
        }
        prev_symbol = symbol;
    }
    if let Some(start) = word_start {
        words.push(&text[start..]);
    }
    words
}

/// Segment full text into classified tokens.
pub fn segment(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::with_capacity(16);
    let mut last_end = 0usize;
    for range in alphabetic_ranges(text) {
        if range.start > last_end {
            tokens.push(Token {
                kind: TokenKind::Plain,
                text: &text[last_end..range.start],
            });
        }
        for word in split_words(&text[range.clone()]) {
            let kind = if word.chars().all(is_whitespace) {
                TokenKind::Whitespace
            } else if is_special_token(word) {
                TokenKind::Special
            } else {
                TokenKind::Word
            };
            tokens.push(Token { kind, text: word });
        }
        last_end = range.end;
    }
    if last_end < text.len() {
        tokens.push(Token {
            kind: TokenKind::Plain,
            text: &text[last_end..],
        });
    }
    tokens
}
