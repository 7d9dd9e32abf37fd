//! Element eligibility rules and the ancestor-memoizing classifier.

use core::ops::BitOr;

use smallvec::SmallVec;

use crate::analyzer::BoundedCache;
use crate::error::{ErrorKind, ReadifyError};
use crate::fragment::OutputMarkers;
use crate::marks::MarkTable;
use crate::tree::{has_alphabetic_text, ContentTree, NodeId, NodeKind};

/// Set of element categories probed together.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CheckSet(u8);

impl CheckSet {
    pub const IGNORED: Self = Self(1);
    pub const HIDDEN: Self = Self(1 << 1);
    pub const EDITABLE: Self = Self(1 << 2);
    pub const PERFORMANCE: Self = Self(1 << 3);

    /// Categories that prune a subtree from scanning.
    pub const PRUNE: Self = Self(Self::IGNORED.0 | Self::EDITABLE.0 | Self::PERFORMANCE.0);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for CheckSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Match criteria for one element category. Any criterion matching is a hit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ElementRule {
    /// Lowercase tag names.
    pub tags: Vec<String>,
    /// Attributes whose mere presence matches.
    pub attributes: Vec<String>,
    /// Exact attribute values.
    pub attribute_values: Vec<(String, String)>,
    /// Class tokens.
    pub class_names: Vec<String>,
    /// Exact computed style values.
    pub styles: Vec<(String, String)>,
    /// ARIA roles, compared case-insensitively.
    pub roles: Vec<String>,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_string()).collect()
}

fn owned_pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

impl ElementRule {
    /// Attribute names whose value can change the outcome of [`Self::matches`].
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> + '_ {
        let derived = [
            (!self.class_names.is_empty()).then_some("class"),
            (!self.styles.is_empty()).then_some("style"),
            (!self.roles.is_empty()).then_some("role"),
        ];
        self.attributes
            .iter()
            .map(String::as_str)
            .chain(self.attribute_values.iter().map(|(name, _)| name.as_str()))
            .chain(derived.into_iter().flatten())
    }

    /// True when `node` itself (not its ancestors) matches.
    pub fn matches<T: ContentTree + ?Sized>(&self, tree: &T, node: NodeId) -> bool {
        if let Some(tag) = tree.tag_name(node) {
            if self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                return true;
            }
        }
        if self
            .attributes
            .iter()
            .any(|name| tree.attribute(node, name).is_some())
        {
            return true;
        }
        if self
            .attribute_values
            .iter()
            .any(|(name, value)| tree.attribute(node, name) == Some(value.as_str()))
        {
            return true;
        }
        if !self.class_names.is_empty() {
            if let Some(class) = tree.attribute(node, "class") {
                if class
                    .split_ascii_whitespace()
                    .any(|token| self.class_names.iter().any(|name| name == token))
                {
                    return true;
                }
            }
        }
        if self
            .styles
            .iter()
            .any(|(prop, value)| tree.computed_style(node, prop) == Some(value.as_str()))
        {
            return true;
        }
        if !self.roles.is_empty() {
            if let Some(role) = tree.attribute(node, "role") {
                let role = role.trim();
                if self.roles.iter().any(|r| r.eq_ignore_ascii_case(role)) {
                    return true;
                }
            }
        }
        false
    }
}

/// Rules for every element category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectorConfig {
    pub ignored: ElementRule,
    pub hidden: ElementRule,
    pub editable: ElementRule,
    pub performance: ElementRule,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            ignored: ElementRule {
                tags: owned(&[
                    "script", "style", "noscript", "template", "code", "pre", "kbd", "samp",
                    "var", "canvas", "svg", "math", "iframe", "object", "embed", "img",
                    "picture", "video", "audio", "source", "track", "map", "head", "title",
                    "meta", "link",
                ]),
                attributes: owned(&["data-readify-ignore"]),
                attribute_values: owned_pairs(&[("translate", "no")]),
                class_names: owned(&["readify-ignore"]),
                styles: Vec::new(),
                roles: owned(&["img", "math", "code", "figure", "presentation", "none"]),
            },
            hidden: ElementRule {
                attributes: owned(&["hidden"]),
                attribute_values: owned_pairs(&[("aria-hidden", "true")]),
                styles: owned_pairs(&[("display", "none"), ("visibility", "hidden")]),
                ..ElementRule::default()
            },
            editable: ElementRule {
                tags: owned(&["input", "textarea", "select", "option", "button"]),
                attribute_values: owned_pairs(&[
                    ("contenteditable", "true"),
                    ("contenteditable", ""),
                    ("contenteditable", "plaintext-only"),
                ]),
                roles: owned(&[
                    "textbox", "searchbox", "combobox", "button", "menuitem", "option",
                    "slider", "spinbutton", "switch", "tab", "checkbox", "radio",
                ]),
                ..ElementRule::default()
            },
            performance: ElementRule {
                tags: owned(&["marquee"]),
                class_names: owned(&["ticker", "carousel", "marquee"]),
                styles: owned_pairs(&[
                    ("position", "fixed"),
                    ("position", "sticky"),
                    ("will-change", "transform"),
                ]),
                roles: owned(&["marquee", "timer", "progressbar"]),
                ..ElementRule::default()
            },
        }
    }
}

impl SelectorConfig {
    /// Default rules plus the engine's own output markers as ignored.
    pub fn with_markers(markers: &OutputMarkers) -> Self {
        let mut config = Self::default();
        config.ignored.tags.push(markers.tag.to_string());
        config.ignored.class_names.push(markers.plain_class.to_string());
        config.ignored.class_names.push(markers.emphasis_class.to_string());
        config
    }

    /// Lowercase attribute names read by any rule, without duplicates.
    pub fn watched_attributes(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for rule in [&self.ignored, &self.hidden, &self.editable, &self.performance] {
            for name in rule.attribute_names() {
                let name = name.to_ascii_lowercase();
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// True when `node` itself matches any category in `checks`.
    pub fn matches_self<T: ContentTree + ?Sized>(
        &self,
        tree: &T,
        node: NodeId,
        checks: CheckSet,
    ) -> bool {
        (checks.contains(CheckSet::IGNORED) && self.ignored.matches(tree, node))
            || (checks.contains(CheckSet::EDITABLE) && self.editable.matches(tree, node))
            || (checks.contains(CheckSet::PERFORMANCE) && self.performance.matches(tree, node))
            || (checks.contains(CheckSet::HIDDEN) && self.hidden.matches(tree, node))
    }
}

/// Outcome of an eligibility check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    NotElement,
    Processed,
    Ignored,
    Editable,
    PerformanceSensitive,
    NoAlphabeticText,
}

/// Classifier with a bounded per-(node, checks) result table.
#[derive(Debug)]
pub struct Classifier {
    selectors: SelectorConfig,
    cache: BoundedCache<(NodeId, CheckSet), bool>,
}

impl Classifier {
    pub fn new(selectors: SelectorConfig, capacity: usize) -> Self {
        Self {
            selectors,
            cache: BoundedCache::new(capacity),
        }
    }

    pub fn selectors(&self) -> &SelectorConfig {
        &self.selectors
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    /// Fail when `node` is not a host element.
    pub fn require_element<T: ContentTree + ?Sized>(
        tree: &T,
        node: NodeId,
    ) -> Result<(), ReadifyError> {
        match tree.kind(node) {
            Some(NodeKind::Element) => Ok(()),
            Some(NodeKind::Text | NodeKind::Document) => Err(ReadifyError::new(
                ErrorKind::ClassificationAmbiguous,
                "CLASSIFY_NOT_ELEMENT",
                "node is not an element",
            )
            .with_node(node)),
            Some(NodeKind::Other) | None => Err(ReadifyError::new(
                ErrorKind::ClassificationAmbiguous,
                "CLASSIFY_UNKNOWN_NODE",
                "node type is unknown to the host",
            )
            .with_node(node)),
        }
    }

    /// True when `node` or any ancestor element matches a category in `checks`.
    ///
    /// Non-elements are tested through their parent element.
    pub fn matches<T: ContentTree + ?Sized>(
        &mut self,
        tree: &T,
        node: NodeId,
        checks: CheckSet,
    ) -> bool {
        if checks.is_empty() {
            return false;
        }
        let start = match tree.kind(node) {
            Some(NodeKind::Element) => Some(node),
            _ => tree
                .parent(node)
                .filter(|parent| tree.kind(*parent) == Some(NodeKind::Element)),
        };

        let mut chain: SmallVec<[NodeId; 16]> = SmallVec::new();
        let mut current = start;
        let mut result = false;
        while let Some(id) = current {
            if let Some(&hit) = self.cache.get(&(id, checks)) {
                result = hit;
                break;
            }
            chain.push(id);
            if self.selectors.matches_self(tree, id, checks) {
                result = true;
                break;
            }
            current = tree
                .parent(id)
                .filter(|parent| tree.kind(*parent) == Some(NodeKind::Element));
        }
        for id in chain {
            self.cache.insert((id, checks), result);
        }
        result
    }

    /// Full eligibility check.
    pub fn classify<T: ContentTree + ?Sized>(
        &mut self,
        tree: &T,
        node: NodeId,
        marks: &MarkTable,
    ) -> Eligibility {
        if let Err(err) = Self::require_element(tree, node) {
            log::trace!("ineligible: {}", err);
            return Eligibility::NotElement;
        }
        if marks.is_within_processed(tree, node) {
            return Eligibility::Processed;
        }
        if self.matches(tree, node, CheckSet::IGNORED) {
            return Eligibility::Ignored;
        }
        if self.matches(tree, node, CheckSet::EDITABLE) {
            return Eligibility::Editable;
        }
        if self.matches(tree, node, CheckSet::PERFORMANCE) {
            return Eligibility::PerformanceSensitive;
        }
        if !has_alphabetic_text(tree, node) {
            return Eligibility::NoAlphabeticText;
        }
        Eligibility::Eligible
    }

    pub fn is_eligible<T: ContentTree + ?Sized>(
        &mut self,
        tree: &T,
        node: NodeId,
        marks: &MarkTable,
    ) -> bool {
        self.classify(tree, node, marks) == Eligibility::Eligible
    }

    /// Drop cached results for `root` and everything below it.
    pub fn invalidate_subtree<T: ContentTree + ?Sized>(&mut self, tree: &T, root: NodeId) {
        if self.cache.is_empty() {
            return;
        }
        self.cache
            .retain(|(id, _), _| *id != root && !crate::tree::is_ancestor_of(tree, root, *id));
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}
