//! Built-in English vocabulary and syllable heuristics tables.

use std::sync::OnceLock;

use regex::Regex;

/// Frequent function/content words receiving the common-word ratio.
pub const COMMON_WORDS: &[&str] = &[
    "a", "about", "after", "again", "ago", "all", "almost", "already", "also", "always",
    "among", "and", "any", "anything", "area", "around", "as", "ask", "at", "away", "back",
    "bad", "be", "because", "before", "best", "between", "black", "body", "book", "both",
    "bring", "business", "but", "by", "call", "can", "car", "case", "change", "child", "city",
    "come", "community", "company", "continue", "could", "course", "create", "different", "do",
    "down", "during", "each", "end", "even", "ever", "example", "eye", "face", "fact", "far",
    "father", "feel", "find", "first", "five", "follow", "for", "four", "friend", "from",
    "game", "get", "give", "go", "good", "government", "great", "group", "have", "he", "head",
    "hear", "help", "here", "his", "hold", "home", "hour", "house", "however", "idea", "if",
    "important", "in", "include", "into", "issue", "it", "job", "just", "keep", "kid", "kind",
    "know", "large", "last", "late", "later", "law", "lead", "learn", "least", "leave", "less",
    "life", "like", "line", "little", "live", "long", "look", "lose", "lot", "make", "man",
    "many", "may", "mean", "meet", "member", "might", "million", "minute", "money", "month",
    "more", "mother", "move", "mr", "much", "must", "name", "national", "need", "new", "next",
    "night", "no", "not", "nothing", "now", "number", "of", "off", "office", "often", "on",
    "once", "one", "only", "or", "other", "others", "our", "out", "over", "own", "parent",
    "part", "pay", "people", "place", "play", "point", "political", "power", "president",
    "problem", "provide", "public", "question", "read", "real", "really", "right", "room",
    "run", "same", "say", "school", "see", "service", "set", "several", "she", "show", "side",
    "since", "sit", "small", "so", "social", "some", "speak", "stand", "start", "still",
    "stop", "story", "study", "such", "system", "take", "team", "tell", "than", "that", "the",
    "then", "there", "they", "thing", "think", "this", "though", "three", "through", "time",
    "to", "together", "too", "try", "turn", "under", "understand", "until", "up", "us", "use",
    "value", "very", "want", "war", "watch", "water", "way", "we", "well", "what", "when",
    "where", "whether", "which", "white", "who", "will", "with", "without", "word", "work",
    "world", "would", "write", "year", "yes", "yet", "you", "young",
];

/// Words whose heuristic syllable estimate is known to be wrong.
pub const SYLLABLE_EXCEPTIONS: &[(&str, u32)] = &[
    ("business", 2),
    ("camera", 3),
    ("chocolate", 3),
    ("comfortable", 3),
    ("different", 2),
    ("evening", 2),
    ("every", 2),
    ("family", 3),
    ("favorite", 3),
    ("general", 3),
    ("information", 4),
    ("interest", 3),
    ("interesting", 3),
    ("jewelry", 3),
    ("literature", 3),
    ("memory", 3),
    ("naturally", 3),
    ("restaurant", 3),
    ("science", 2),
    ("several", 3),
    ("temperature", 4),
    ("vegetable", 4),
    ("wednesday", 2),
];

const VOWELS: &str = r"[aeiouy]+";
const SUBTRACT: &str = r"(?:cial|tia|cius|cious|giu|ion|iou|sia$|[^aeiouy]eo|[aeiouy]ing$|[^aeiouy]y[aeiouy]|eous$|gue$|que$|[aeiou]{2}|[aeiou](?:re|le|les|ed|es|est|eth|ist|ism|ize|ous|ship|tion|tive|ture|ure|ward|wise|yer|ying)$)";
const ADD: &str = r"(?:ia|riet|dien|iu|io|ii|[aeiouy]ing|[^aeiouy]ying$|ui[aeiouy]|eo|[aeiou]{2}|[aeiou]y[aeiou]|[aeiou](?:le|les|ed|es|est|eth|ist|ism|ize|ous|ship|tion|tive|ture|ure|ward|wise|yer|ying)$)";
const PREFIX: &str = r"^(?:un|de|re|pre|pro|in|en|em|dis|mis|sub|inter|super|trans|non|over|under|out|up|down|anti|auto|bi|co|contra|counter|extra|hyper|i[lr]|im|mid|multi|post|semi|tele|tri|ultra|uni)";
const SILENT_E: &str = r"[^l]e$";
const SILENT_ED: &str = r"(?:[^td]|^)ed$";
const SILENT_ES: &str = r"[^sz]es$";

/// Compiled syllable heuristics.
pub(crate) struct SyllablePatterns {
    pub vowels: Regex,
    pub subtract: Regex,
    pub add: Regex,
    pub prefix: Regex,
    pub silent_e: Regex,
    pub silent_ed: Regex,
    pub silent_es: Regex,
}

impl SyllablePatterns {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            vowels: Regex::new(VOWELS)?,
            subtract: Regex::new(SUBTRACT)?,
            add: Regex::new(ADD)?,
            prefix: Regex::new(PREFIX)?,
            silent_e: Regex::new(SILENT_E)?,
            silent_ed: Regex::new(SILENT_ED)?,
            silent_es: Regex::new(SILENT_ES)?,
        })
    }
}

/// Lazily compiled pattern set, shared by every analyzer in the process.
pub(crate) fn syllable_patterns() -> Option<&'static SyllablePatterns> {
    static PATTERNS: OnceLock<Option<SyllablePatterns>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| match SyllablePatterns::compile() {
            Ok(patterns) => Some(patterns),
            Err(err) => {
                log::warn!("syllable patterns failed to compile: {}", err);
                None
            }
        })
        .as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_compile() {
        assert!(syllable_patterns().is_some());
    }

    #[test]
    fn common_words_are_lowercase() {
        for word in COMMON_WORDS {
            assert_eq!(*word, word.to_ascii_lowercase());
        }
    }

    #[test]
    fn exceptions_are_at_least_one_syllable() {
        assert!(SYLLABLE_EXCEPTIONS.iter().all(|(_, count)| *count >= 1));
    }
}
