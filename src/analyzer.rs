//! Word salience analysis: syllable estimation and emphasis length.

use core::borrow::Borrow;
use core::hash::Hash;
use std::collections::HashMap;

use crate::config::{BionicConfig, CacheLimits};
use crate::lexicon::syllable_patterns;

/// Capacity-capped map. Once full, new keys are dropped; existing entries stay.
#[derive(Clone, Debug)]
pub struct BoundedCache<K, V> {
    entries: HashMap<K, V>,
    capacity: usize,
}

impl<K: Eq + Hash, V> BoundedCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity.min(256)),
            capacity,
        }
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries.get(key)
    }

    /// Insert unless the cache is full. Returns whether the value was stored.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, value);
        true
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries.remove(key)
    }

    pub fn retain<F: FnMut(&K, &mut V) -> bool>(&mut self, keep: F) {
        self.entries.retain(keep);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Result of analyzing one word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WordAnalysis {
    /// Leading characters to emphasize (0 means leave the word untouched).
    pub bold_length: usize,
    /// Estimated syllable count, at least 1.
    pub syllables: u32,
    /// Word is in the common-word vocabulary.
    pub is_common: bool,
}

/// Cached word analyzer bound to one immutable [`BionicConfig`].
#[derive(Debug)]
pub struct WordAnalyzer {
    config: BionicConfig,
    syllables: BoundedCache<String, u32>,
    analyses: BoundedCache<String, WordAnalysis>,
}

impl WordAnalyzer {
    pub fn new(config: BionicConfig, limits: &CacheLimits) -> Self {
        Self {
            config,
            syllables: BoundedCache::new(limits.max_syllable_entries),
            analyses: BoundedCache::new(limits.max_analysis_entries),
        }
    }

    pub fn config(&self) -> &BionicConfig {
        &self.config
    }

    /// Number of memoized word analyses.
    pub fn cached_analyses(&self) -> usize {
        self.analyses.len()
    }

    /// Number of memoized syllable estimates.
    pub fn cached_syllables(&self) -> usize {
        self.syllables.len()
    }

    /// Analyze `word`, consulting the cache first.
    pub fn analyze(&mut self, word: &str) -> WordAnalysis {
        if word.is_empty() {
            return WordAnalysis {
                bold_length: 0,
                syllables: 1,
                is_common: false,
            };
        }
        if let Some(hit) = self.analyses.get(word) {
            return *hit;
        }

        let length = word.chars().count();
        let is_common = self.config.common_words.contains(&word.to_lowercase());
        let syllables = self.count_syllables(word);
        let cfg = &self.config;

        let raw = if is_common {
            if cfg.bold_common_words {
                ceil_len(length as f64 * cfg.ratios.common_words * cfg.bold_factor).max(1)
            } else {
                0
            }
        } else if syllables == 1 && !cfg.bold_single_syllables {
            0
        } else {
            dynamic_bold_length(length, syllables, cfg).max(1)
        };

        let bold_length = if raw == 0 {
            0
        } else {
            let upper = cfg.max_bold_length.min(length);
            raw.max(cfg.min_bold_length).min(upper)
        };

        let analysis = WordAnalysis {
            bold_length,
            syllables,
            is_common,
        };
        self.analyses.insert(word.to_string(), analysis);
        analysis
    }

    /// Heuristic syllable count of `word` (letters only, case-insensitive).
    pub fn count_syllables(&mut self, word: &str) -> u32 {
        let normalized: String = word
            .chars()
            .filter(char::is_ascii_alphabetic)
            .map(|ch| ch.to_ascii_lowercase())
            .collect();
        if normalized.len() <= 3 {
            return 1;
        }
        if let Some(&count) = self.config.syllable_exceptions.get(&normalized) {
            return count.max(1);
        }
        if let Some(&count) = self.syllables.get(normalized.as_str()) {
            return count;
        }
        let count = estimate_syllables(&normalized);
        self.syllables.insert(normalized, count);
        count
    }
}

fn estimate_syllables(word: &str) -> u32 {
    let Some(patterns) = syllable_patterns() else {
        return fallback_vowel_groups(word).max(1);
    };
    let vowel_groups = patterns.vowels.find_iter(word).count() as i64;
    if vowel_groups == 0 {
        return 1;
    }
    let mut count = vowel_groups;
    count -= patterns.subtract.find_iter(word).count() as i64;
    count += patterns.add.find_iter(word).count() as i64;
    if patterns.prefix.is_match(word) {
        count += 1;
    }
    for silent in [&patterns.silent_e, &patterns.silent_ed, &patterns.silent_es] {
        if silent.is_match(word) {
            count -= 1;
        }
    }
    count.max(1) as u32
}

fn fallback_vowel_groups(word: &str) -> u32 {
    let mut groups = 0u32;
    let mut in_group = false;
    for ch in word.chars() {
        let vowel = matches!(ch, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
        if vowel && !in_group {
            groups += 1;
        }
        in_group = vowel;
    }
    groups
}

fn dynamic_bold_length(length: usize, syllables: u32, cfg: &BionicConfig) -> usize {
    let ratios = &cfg.ratios;
    let len = length as f64;
    if length <= 4 {
        return ceil_len(len * ratios.single_short * cfg.bold_factor);
    }
    let base = match syllables {
        0 | 1 if length <= 7 => ratios.single_medium,
        0 | 1 => ratios.single_long,
        2 => ratios.two,
        3 => ratios.three,
        _ => ratios.four_plus,
    };
    let length_scale = if length > 8 {
        1.0 + (len - 8.0) * 0.005
    } else {
        1.0
    };
    let position_factor = if syllables > 2 { 1.1 } else { 1.0 };
    ceil_len(len * base * cfg.bold_factor * length_scale * position_factor)
}

fn ceil_len(value: f64) -> usize {
    if value.is_finite() && value > 0.0 {
        value.ceil() as usize
    } else {
        0
    }
}
