//! Engine configuration, viewport presets and caller overlays.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Deserialize;

use crate::classify::SelectorConfig;
use crate::error::{ErrorKind, ReadifyError};
use crate::fragment::OutputMarkers;
use crate::lexicon::{COMMON_WORDS, SYLLABLE_EXCEPTIONS};

/// Emphasis ratios per word bucket.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoldRatios {
    /// Ratio applied to recognized common words.
    pub common_words: f64,
    /// Single-syllable words of at most 4 letters (also every word of length <= 4).
    pub single_short: f64,
    /// Single-syllable words of 5..=7 letters.
    pub single_medium: f64,
    /// Single-syllable words longer than 7 letters.
    pub single_long: f64,
    /// Two-syllable words.
    pub two: f64,
    /// Three-syllable words.
    pub three: f64,
    /// Words with four or more syllables.
    pub four_plus: f64,
}

impl Default for BoldRatios {
    fn default() -> Self {
        Self {
            common_words: 0.35,
            single_short: 0.35,
            single_medium: 0.4,
            single_long: 0.45,
            two: 0.45,
            three: 0.55,
            four_plus: 0.65,
        }
    }
}

/// Word-level emphasis configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct BionicConfig {
    /// Multiplier on computed emphasis length.
    pub bold_factor: f64,
    /// Emphasize single-syllable words.
    pub bold_single_syllables: bool,
    /// Emphasize recognized common words.
    pub bold_common_words: bool,
    /// Lowercase common-word vocabulary.
    pub common_words: HashSet<String>,
    /// Lowercase word -> syllable count overrides.
    pub syllable_exceptions: HashMap<String, u32>,
    /// Ratio tables.
    pub ratios: BoldRatios,
    /// Lower clamp for non-zero emphasis length.
    pub min_bold_length: usize,
    /// Upper clamp for emphasis length.
    pub max_bold_length: usize,
}

impl Default for BionicConfig {
    fn default() -> Self {
        Self {
            bold_factor: 1.0,
            bold_single_syllables: false,
            bold_common_words: false,
            common_words: COMMON_WORDS.iter().map(|w| (*w).to_string()).collect(),
            syllable_exceptions: SYLLABLE_EXCEPTIONS
                .iter()
                .map(|(w, n)| ((*w).to_string(), *n))
                .collect(),
            ratios: BoldRatios::default(),
            min_bold_length: 1,
            max_bold_length: 5,
        }
    }
}

impl BionicConfig {
    /// Defaults with the emphasis cap derived from viewport width.
    pub fn for_viewport_width(width: f32) -> Self {
        Self {
            max_bold_length: max_bold_length_for_width(width),
            ..Self::default()
        }
    }

    /// Merge caller overrides. Vocabulary and exceptions are added, never replaced.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> Result<(), ReadifyError> {
        if let Some(factor) = overrides.bold_factor {
            if !factor.is_finite() || factor <= 0.0 {
                return Err(ReadifyError::new(
                    ErrorKind::Config,
                    "CONFIG_BOLD_FACTOR",
                    format!("boldFactor must be a positive finite number, got {}", factor),
                ));
            }
            self.bold_factor = factor;
        }
        if let Some(flag) = overrides.bold_single_syllables {
            self.bold_single_syllables = flag;
        }
        if let Some(flag) = overrides.bold_common_words {
            self.bold_common_words = flag;
        }
        for word in &overrides.common_words {
            let normalized = word.trim().to_lowercase();
            if !normalized.is_empty() {
                self.common_words.insert(normalized);
            }
        }
        for (word, count) in &overrides.syllable_exceptions {
            if *count == 0 {
                return Err(ReadifyError::new(
                    ErrorKind::Config,
                    "CONFIG_SYLLABLE_EXCEPTION",
                    format!("syllable exception for '{}' must be at least 1", word),
                ));
            }
            self.syllable_exceptions
                .insert(word.trim().to_lowercase(), *count);
        }
        Ok(())
    }
}

/// Caller-supplied overlay, merged once at engine construction.
///
/// Keys follow the public option names (`boldFactor`, `commonWords`, ...).
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigOverrides {
    pub bold_factor: Option<f64>,
    pub bold_single_syllables: Option<bool>,
    pub bold_common_words: Option<bool>,
    pub common_words: Vec<String>,
    pub syllable_exceptions: BTreeMap<String, u32>,
}

#[cfg(feature = "json")]
impl ConfigOverrides {
    /// Parse an overlay from a JSON object.
    pub fn from_json(json: &str) -> Result<Self, ReadifyError> {
        serde_json::from_str(json).map_err(|err| {
            ReadifyError::new(
                ErrorKind::Config,
                "CONFIG_JSON",
                format!("invalid overrides: {}", err),
            )
        })
    }
}

/// Capacity caps for the analyzer caches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheLimits {
    /// Max normalized words kept in the syllable cache.
    pub max_syllable_entries: usize,
    /// Max words kept in the analysis cache.
    pub max_analysis_entries: usize,
    /// Max (node, query) entries kept by the classifier.
    pub max_classification_entries: usize,
}

impl Default for CacheLimits {
    fn default() -> Self {
        Self {
            max_syllable_entries: 10_000,
            max_analysis_entries: 10_000,
            max_classification_entries: 50_000,
        }
    }
}

/// Frame-batch scheduling limits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SchedulerConfig {
    /// Wall-clock budget per frame callback.
    pub frame_budget_ms: f64,
    /// Hard cap on candidates transformed per frame callback.
    pub max_elements_per_frame: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            frame_budget_ms: 16.0,
            max_elements_per_frame: 50,
        }
    }
}

/// Visibility evaluation and subscription parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisibilityOptions {
    /// Vertical margin added around the viewport for subscriptions.
    pub root_margin_px: f32,
    /// Intersection ratio at which a subscribed node counts as revealed.
    pub threshold: f32,
    /// Margin used for synchronous visible/hidden partitioning.
    pub viewport_margin_px: f32,
}

impl Default for VisibilityOptions {
    fn default() -> Self {
        Self::for_viewport_height(800.0, false)
    }
}

impl VisibilityOptions {
    pub fn for_viewport_height(height: f32, mobile: bool) -> Self {
        Self {
            root_margin_px: (height * 0.2).floor(),
            threshold: if mobile { 0.1 } else { 0.05 },
            viewport_margin_px: (height * 0.5).floor().clamp(100.0, 400.0),
        }
    }
}

/// Attribute names whose changes trigger a re-scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeFilter {
    pub attributes: Vec<String>,
}

impl Default for ChangeFilter {
    fn default() -> Self {
        Self::for_selectors(&SelectorConfig::default())
    }
}

impl ChangeFilter {
    /// Filter accepting layout-affecting attributes plus every attribute the
    /// selector rules read.
    pub fn for_selectors(selectors: &SelectorConfig) -> Self {
        let mut attributes: Vec<String> = ["class", "style", "contenteditable", "role", "hidden"]
            .iter()
            .map(|name| (*name).to_string())
            .collect();
        for name in selectors.watched_attributes() {
            if !attributes.contains(&name) {
                attributes.push(name);
            }
        }
        Self { attributes }
    }

    pub fn accepts_attribute(&self, name: &str) -> bool {
        self.attributes
            .iter()
            .any(|attr| attr.eq_ignore_ascii_case(name))
    }
}

/// Complete engine options.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineOptions {
    /// Word analysis configuration.
    pub bionic: BionicConfig,
    /// Element classification rules.
    pub selectors: SelectorConfig,
    /// Tag/class names used for emitted fragments.
    pub markers: OutputMarkers,
    /// Frame scheduling limits.
    pub scheduler: SchedulerConfig,
    /// Visibility gate parameters.
    pub visibility: VisibilityOptions,
    /// Horizontal distance within which candidates share a reading column.
    pub column_threshold_px: f32,
    /// Cache capacity caps.
    pub cache: CacheLimits,
    /// Change-record attribute filter.
    pub changes: ChangeFilter,
}

impl Default for EngineOptions {
    fn default() -> Self {
        let viewport = crate::tree::Viewport::default();
        Self::for_viewport(viewport.width, viewport.height)
    }
}

impl EngineOptions {
    /// Options with screen-dependent constants derived from the viewport.
    pub fn for_viewport(width: f32, height: f32) -> Self {
        let markers = OutputMarkers::default();
        let selectors = SelectorConfig::with_markers(&markers);
        let changes = ChangeFilter::for_selectors(&selectors);
        Self {
            bionic: BionicConfig::for_viewport_width(width),
            selectors,
            markers,
            scheduler: SchedulerConfig::default(),
            visibility: VisibilityOptions::for_viewport_height(height, false),
            column_threshold_px: column_threshold_for_width(width),
            cache: CacheLimits::default(),
            changes,
        }
    }

    /// Touch-device preset: higher intersection threshold.
    pub fn mobile(width: f32, height: f32) -> Self {
        Self {
            visibility: VisibilityOptions::for_viewport_height(height, true),
            ..Self::for_viewport(width, height)
        }
    }

    /// Merge a caller overlay into these options.
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Result<Self, ReadifyError> {
        self.bionic.apply_overrides(overrides)?;
        Ok(self)
    }
}

fn max_bold_length_for_width(width: f32) -> usize {
    let by_width = (width.max(0.0) / 200.0).ceil() as usize;
    by_width.clamp(1, 5)
}

fn column_threshold_for_width(width: f32) -> f32 {
    (width * 0.1).floor().clamp(50.0, 200.0)
}
