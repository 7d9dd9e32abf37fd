//! Transform builder: text run to replacement fragment.

use crate::analyzer::WordAnalyzer;
use crate::error::ReadifyError;
use crate::segment::{segment, TokenKind};

/// Tag and class names hosts use when materializing a [`Fragment`].
///
/// The classifier ignores elements carrying these classes, so emitted output
/// is never scanned again even if its processing mark is lost.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputMarkers {
    /// Inline wrapper tag for the fragment container and word pieces.
    pub tag: &'static str,
    /// Class on the fragment container and plain remainders.
    pub plain_class: &'static str,
    /// Class on emphasized prefixes.
    pub emphasis_class: &'static str,
}

impl Default for OutputMarkers {
    fn default() -> Self {
        Self {
            tag: "readify-span",
            plain_class: "readify-text",
            emphasis_class: "readify-bold",
        }
    }
}

/// One piece of a replacement fragment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FragmentPiece {
    /// Verbatim text.
    Text(String),
    /// Word split into an emphasized prefix and an optional plain remainder.
    Word { emphasis: String, rest: String },
}

impl FragmentPiece {
    fn push_text(&self, out: &mut String) {
        match self {
            FragmentPiece::Text(text) => out.push_str(text),
            FragmentPiece::Word { emphasis, rest } => {
                out.push_str(emphasis);
                out.push_str(rest);
            }
        }
    }
}

/// Structured replacement for one text node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fragment {
    pieces: Vec<FragmentPiece>,
    markers: OutputMarkers,
}

impl Fragment {
    pub fn pieces(&self) -> &[FragmentPiece] {
        &self.pieces
    }

    pub fn markers(&self) -> OutputMarkers {
        self.markers
    }

    /// Number of emphasized words.
    pub fn emphasized_words(&self) -> usize {
        self.pieces
            .iter()
            .filter(|piece| matches!(piece, FragmentPiece::Word { .. }))
            .count()
    }

    /// Original text, reassembled from the pieces.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for piece in &self.pieces {
            piece.push_text(&mut out);
        }
        out
    }

    fn push_verbatim(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(FragmentPiece::Text(last)) = self.pieces.last_mut() {
            last.push_str(text);
            return;
        }
        self.pieces.push(FragmentPiece::Text(text.to_string()));
    }
}

/// Build the replacement fragment for `text`.
///
/// Fails with an `EmptyInput` error when the text is blank or holds no
/// alphabetic run of two or more letters; callers keep the original text.
pub fn build_fragment(
    text: &str,
    analyzer: &mut WordAnalyzer,
    markers: OutputMarkers,
) -> Result<Fragment, ReadifyError> {
    if text.trim().is_empty() {
        return Err(ReadifyError::empty_input());
    }
    let tokens = segment(text);
    if tokens.iter().all(|t| t.kind == TokenKind::Plain) {
        return Err(ReadifyError::empty_input());
    }

    let mut fragment = Fragment {
        pieces: Vec::with_capacity(tokens.len()),
        markers,
    };
    for token in tokens {
        if token.kind != TokenKind::Word {
            fragment.push_verbatim(token.text);
            continue;
        }
        let bold_length = analyzer.analyze(token.text).bold_length;
        if bold_length == 0 {
            fragment.push_verbatim(token.text);
            continue;
        }
        let split = token
            .text
            .char_indices()
            .nth(bold_length)
            .map_or(token.text.len(), |(idx, _)| idx);
        let (emphasis, rest) = token.text.split_at(split);
        fragment.pieces.push(FragmentPiece::Word {
            emphasis: emphasis.to_string(),
            rest: rest.to_string(),
        });
    }
    Ok(fragment)
}
