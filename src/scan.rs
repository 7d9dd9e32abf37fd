//! Tree scanner: finds containers that own eligible text.

use std::collections::HashSet;

use crate::classify::{CheckSet, Classifier};
use crate::marks::MarkTable;
use crate::tree::{children, is_meaningful_text, next_in_subtree, ContentTree, NodeId, NodeKind};
use crate::visibility::is_visible;

/// Candidates from one scan pass, partitioned by current visibility.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub visible: Vec<NodeId>,
    pub hidden: Vec<NodeId>,
}

impl ScanResult {
    pub fn is_empty(&self) -> bool {
        self.visible.is_empty() && self.hidden.is_empty()
    }

    pub fn len(&self) -> usize {
        self.visible.len() + self.hidden.len()
    }
}

/// True when `node` has a direct text child with readable content.
pub fn owns_meaningful_text<T: ContentTree + ?Sized>(tree: &T, node: NodeId) -> bool {
    children(tree, node).any(|child| {
        tree.kind(child) == Some(NodeKind::Text) && tree.text(child).is_some_and(is_meaningful_text)
    })
}

/// Collect candidate containers at or below `root`.
///
/// Subtrees that are ignored, editable, performance-sensitive or already
/// processed are skipped whole. A matching container is collected and not
/// descended into.
pub fn collect_candidates<T: ContentTree + ?Sized>(
    tree: &T,
    root: NodeId,
    classifier: &mut Classifier,
    marks: &MarkTable,
) -> Vec<NodeId> {
    let start = match tree.kind(root) {
        Some(NodeKind::Element | NodeKind::Document) => root,
        Some(NodeKind::Text) => match tree.parent(root) {
            Some(parent) => parent,
            None => return Vec::new(),
        },
        Some(NodeKind::Other) | None => return Vec::new(),
    };
    if marks.is_within_processed(tree, start) {
        return Vec::new();
    }

    let mut candidates = Vec::new();
    let mut current = Some(start);
    while let Some(node) = current {
        let descend = match tree.kind(node) {
            Some(NodeKind::Document) => true,
            Some(NodeKind::Element) => {
                if marks.is_processed(node) || classifier.matches(tree, node, CheckSet::PRUNE) {
                    log::trace!("scan: prune {}", node);
                    false
                } else if owns_meaningful_text(tree, node)
                    && classifier.is_eligible(tree, node, marks)
                {
                    candidates.push(node);
                    false
                } else {
                    true
                }
            }
            _ => false,
        };
        current = next_in_subtree(tree, start, node, descend);
    }
    drop_nested(tree, candidates)
}

/// Remove candidates that sit below another candidate. Order is preserved.
pub fn drop_nested<T: ContentTree + ?Sized>(tree: &T, candidates: Vec<NodeId>) -> Vec<NodeId> {
    if candidates.len() < 2 {
        return candidates;
    }
    let members: HashSet<NodeId> = candidates.iter().copied().collect();
    let mut seen = HashSet::with_capacity(candidates.len());
    candidates
        .into_iter()
        .filter(|node| {
            let mut ancestor = tree.parent(*node);
            while let Some(id) = ancestor {
                if members.contains(&id) {
                    return false;
                }
                ancestor = tree.parent(id);
            }
            seen.insert(*node)
        })
        .collect()
}

/// Scan `root` and split candidates into visible and hidden.
pub fn scan<T: ContentTree + ?Sized>(
    tree: &T,
    root: NodeId,
    classifier: &mut Classifier,
    marks: &MarkTable,
    viewport_margin_px: f32,
) -> ScanResult {
    let mut result = ScanResult::default();
    for node in collect_candidates(tree, root, classifier, marks) {
        if is_visible(tree, node, viewport_margin_px) {
            result.visible.push(node);
        } else {
            result.hidden.push(node);
        }
    }
    log::debug!(
        "scan {}: {} visible, {} hidden",
        root,
        result.visible.len(),
        result.hidden.len()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::SelectorConfig;
    use crate::dom::Document;
    use crate::fragment::OutputMarkers;
    use crate::marks::Mark;

    fn classifier() -> Classifier {
        Classifier::new(SelectorConfig::with_markers(&OutputMarkers::default()), 1024)
    }

    fn ids(doc: &Document, nodes: &[NodeId]) -> Vec<String> {
        nodes
            .iter()
            .map(|n| doc.attribute(*n, "id").unwrap_or("?").to_string())
            .collect()
    }

    #[test]
    fn stops_at_matched_containers_and_prunes_ignored_subtrees() {
        let doc = Document::parse(
            r#"<body>
                <div id="wrap">
                    <p id="a">First <em id="em">inner</em> words</p>
                    <script id="s">var x = "Hi!";</script>
                    <section id="sec"><p id="b">Second para</p></section>
                    <code id="c"><p id="d">Hi!</p></code>
                    <p id="blank">   </p>
                    <p id="dots">&#8230;</p>
                </div>
            </body>"#,
        )
        .expect("markup should parse");
        let mut c = classifier();
        let found = collect_candidates(&doc, doc.root(), &mut c, &MarkTable::new());
        assert_eq!(ids(&doc, &found), vec!["a", "b"]);
    }

    #[test]
    fn processed_subtrees_are_skipped() {
        let doc = Document::parse(
            r#"<div><p id="a">Alpha words</p><p id="b">Beta words</p></div>"#,
        )
        .expect("markup should parse");
        let a = doc.element_by_id("a").expect("a");
        let mut marks = MarkTable::new();
        marks.set(a, Mark::Processed);
        let mut c = classifier();
        let found = collect_candidates(&doc, doc.root(), &mut c, &marks);
        assert_eq!(ids(&doc, &found), vec!["b"]);
        assert!(collect_candidates(&doc, a, &mut c, &marks).is_empty());
    }

    #[test]
    fn nested_candidates_are_filtered() {
        let doc = Document::parse(
            r#"<div id="outer">Outer text<p id="inner">Inner text</p></div>"#,
        )
        .expect("markup should parse");
        let outer = doc.element_by_id("outer").expect("outer");
        let inner = doc.element_by_id("inner").expect("inner");
        assert_eq!(drop_nested(&doc, vec![inner, outer, inner]), vec![outer]);
    }

    #[test]
    fn partitions_by_viewport_with_margin() {
        let mut doc = Document::parse(
            r#"<body><p id="top">Top text</p><p id="near">Near text</p><p id="far">Far text</p><p id="none" style="display:none">Gone text</p></body>"#,
        )
        .expect("markup should parse");
        doc.set_viewport(crate::tree::Viewport {
            width: 800.0,
            height: 600.0,
        });
        let place = |doc: &mut Document, id: &str, y: f32| {
            let node = doc.element_by_id(id).expect("fixture id");
            doc.set_rect(node, crate::tree::Rect::new(0.0, y, 400.0, 20.0));
        };
        place(&mut doc, "top", 10.0);
        place(&mut doc, "near", 750.0);
        place(&mut doc, "far", 2000.0);
        place(&mut doc, "none", 20.0);

        let mut c = classifier();
        let result = scan(&doc, doc.root(), &mut c, &MarkTable::new(), 300.0);
        assert_eq!(ids(&doc, &result.visible), vec!["top", "near"]);
        assert_eq!(ids(&doc, &result.hidden), vec!["far", "none"]);
    }
}
