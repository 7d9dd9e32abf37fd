use readify::{ContentTree, Document, NodeId, Rect};

/// Row height used by [`laid_out`].
pub const LINE_HEIGHT: f32 = 40.0;

/// `<body><article id="article">` with `count` paragraphs `p0..`.
pub fn paragraphs(count: usize) -> String {
    let mut out = String::from("<body><article id=\"article\">");
    for idx in 0..count {
        out.push_str(&format!(
            "<p id=\"p{idx}\">Paragraph {idx} explains reading information patterns.</p>"
        ));
    }
    out.push_str("</article></body>");
    out
}

/// Parse and stack every text row [`LINE_HEIGHT`] apart.
pub fn laid_out(markup: &str) -> Document {
    let mut doc = Document::parse(markup).unwrap_or_else(|e| panic!("parse fixture: {}", e));
    doc.layout_blocks(LINE_HEIGHT);
    doc
}

/// Newspaper page whose right column comes first in document order.
pub fn two_column_page() -> Document {
    let mut doc = Document::parse(
        "<body>\
            <div id=\"right\"><p id=\"r1\">Right column opening line.</p><p id=\"r2\">Right column closing line.</p></div>\
            <div id=\"left\"><p id=\"l1\">Left column opening line.</p><p id=\"l2\">Left column closing line.</p></div>\
        </body>",
    )
    .unwrap_or_else(|e| panic!("parse fixture: {}", e));
    for (id, x, y) in [
        ("r1", 700.0, 50.0),
        ("r2", 700.0, 250.0),
        ("l1", 0.0, 100.0),
        ("l2", 0.0, 300.0),
    ] {
        let node = by_id(&doc, id);
        doc.set_rect(node, Rect::new(x, y, 500.0, LINE_HEIGHT));
    }
    doc
}

pub fn by_id(doc: &Document, id: &str) -> NodeId {
    doc.element_by_id(id)
        .unwrap_or_else(|| panic!("fixture has no #{}", id))
}

/// Emphasized word pieces currently attached to the document.
pub fn bold_count(doc: &Document) -> usize {
    doc.elements_with_class("readify-bold").len()
}

/// True when `node`'s subtree contains emphasized output.
pub fn has_emphasis(doc: &Document, node: NodeId) -> bool {
    doc.to_markup_of(node).contains("readify-bold")
}

/// Direct text of `node`, if its first child is a text node.
pub fn first_text(doc: &Document, node: NodeId) -> Option<String> {
    let child = doc.first_child(node)?;
    doc.text(child).map(str::to_string)
}
