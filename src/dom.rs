//! In-memory arena document implementing [`ContentTree`].
//!
//! Parsed from XHTML-ish markup with `quick-xml`, serializable back to markup,
//! with inline-style computed values, explicit layout boxes, a vertical
//! scroll offset and a mutation record log.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{ErrorKind, ReadifyError};
use crate::fragment::{Fragment, FragmentPiece};
use crate::tree::{
    children, descendants, ContentTree, NodeId, NodeKind, Rect, Viewport,
};
use crate::watch::ChangeRecord;

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "br", "cite", "code", "data", "dfn", "em", "i", "kbd",
    "mark", "q", "s", "samp", "small", "span", "strong", "sub", "sup", "time", "u", "var",
];

#[derive(Clone, Debug)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
    tag: String,
    attributes: Vec<(String, String)>,
    styles: Vec<(String, String)>,
    text: String,
    rect: Option<Rect>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            tag: String::new(),
            attributes: Vec::new(),
            styles: Vec::new(),
            text: String::new(),
            rect: None,
        }
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn style(&self, property: &str) -> Option<&str> {
        self.styles
            .iter()
            .rev()
            .find(|(key, _)| key == property)
            .map(|(_, value)| value.as_str())
    }
}

fn parse_inline_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let prop = prop.trim().to_ascii_lowercase();
            let value = value
                .trim()
                .trim_end_matches("!important")
                .trim()
                .to_ascii_lowercase();
            (!prop.is_empty() && !value.is_empty()).then_some((prop, value))
        })
        .collect()
}

/// Arena document. Node `#0` is the document root.
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<NodeData>,
    viewport: Viewport,
    scroll_y: f32,
    records: Vec<ChangeRecord>,
    recording: bool,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document with only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData::new(NodeKind::Document)],
            viewport: Viewport::default(),
            scroll_y: 0.0,
            records: Vec::new(),
            recording: true,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId::new(0)
    }

    /// Parse markup into a new document.
    ///
    /// Unknown HTML entities are kept verbatim, void elements need not be
    /// self-closed, and mismatched end tags close up to the nearest match.
    pub fn parse(markup: &str) -> Result<Self, ReadifyError> {
        let mut doc = Self::new();
        doc.recording = false;

        let mut reader = Reader::from_reader(markup.as_bytes());
        reader.config_mut().trim_text(false);
        reader.config_mut().check_end_names = false;
        let mut buf = Vec::with_capacity(64);
        let mut stack: Vec<NodeId> = vec![doc.root()];
        let mut entity_buf = String::with_capacity(16);

        loop {
            let parent = stack.last().copied().unwrap_or(NodeId::new(0));
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let node = doc.element_from_start(&reader, &e)?;
                    doc.append_child(parent, node);
                    let is_void = doc
                        .tag_name(node)
                        .is_some_and(|tag| VOID_TAGS.contains(&tag));
                    if !is_void {
                        stack.push(node);
                    }
                }
                Ok(Event::Empty(e)) => {
                    let node = doc.element_from_start(&reader, &e)?;
                    doc.append_child(parent, node);
                }
                Ok(Event::End(e)) => {
                    let tag = decode_tag_name(&reader, e.name().as_ref())?;
                    let open = stack
                        .iter()
                        .rposition(|id| doc.tag_name(*id) == Some(tag.as_str()));
                    match open {
                        Some(depth) if depth > 0 => stack.truncate(depth),
                        _ => log::trace!("markup: stray end tag </{}>", tag),
                    }
                }
                Ok(Event::Text(e)) => {
                    let text = e.decode().map_err(|err| markup_error(&reader, "text", err))?;
                    doc.push_parsed_text(parent, text.as_ref());
                }
                Ok(Event::CData(e)) => {
                    let text = reader
                        .decoder()
                        .decode(&e)
                        .map_err(|err| markup_error(&reader, "cdata", err))?;
                    doc.push_parsed_text(parent, text.as_ref());
                }
                Ok(Event::GeneralRef(e)) => {
                    let name = e
                        .decode()
                        .map_err(|err| markup_error(&reader, "entity", err))?;
                    entity_buf.clear();
                    entity_buf.push('&');
                    entity_buf.push_str(name.as_ref());
                    entity_buf.push(';');
                    match quick_xml::escape::unescape(&entity_buf) {
                        Ok(resolved) => doc.push_parsed_text(parent, resolved.as_ref()),
                        Err(_) => {
                            let raw = entity_buf.clone();
                            doc.push_parsed_text(parent, &raw);
                        }
                    }
                }
                Ok(Event::Comment(e)) => {
                    let text = reader
                        .decoder()
                        .decode(&e)
                        .map_err(|err| markup_error(&reader, "comment", err))?;
                    let mut data = NodeData::new(NodeKind::Other);
                    data.text = text.into_owned();
                    let node = doc.push_node(data);
                    doc.append_child(parent, node);
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => return Err(markup_error(&reader, "tokenizer", err)),
            }
            buf.clear();
        }

        doc.recording = true;
        Ok(doc)
    }

    fn element_from_start(
        &mut self,
        reader: &Reader<&[u8]>,
        e: &BytesStart<'_>,
    ) -> Result<NodeId, ReadifyError> {
        let tag = decode_tag_name(reader, e.name().as_ref())?;
        let node = self.create_element(&tag);
        for attr in e.html_attributes().flatten() {
            let key = match reader.decoder().decode(attr.key.as_ref()) {
                Ok(key) => key.to_ascii_lowercase(),
                Err(_) => continue,
            };
            let raw = match reader.decoder().decode(&attr.value) {
                Ok(value) => value.into_owned(),
                Err(_) => continue,
            };
            let value = match quick_xml::escape::unescape(&raw) {
                Ok(value) => value.into_owned(),
                Err(_) => raw,
            };
            self.set_attribute(node, &key, &value);
        }
        Ok(node)
    }

    fn push_parsed_text(&mut self, parent: NodeId, text: &str) {
        if text.is_empty() {
            return;
        }
        let last = self.node(parent).and_then(|data| data.last_child);
        if let Some(last) = last {
            if let Some(data) = self.node_mut(last) {
                if data.kind == NodeKind::Text {
                    data.text.push_str(text);
                    return;
                }
            }
        }
        let node = self.create_text(text);
        self.append_child(parent, node);
    }

    fn node(&self, node: NodeId) -> Option<&NodeData> {
        self.nodes.get(node.index())
    }

    fn node_mut(&mut self, node: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(node.index())
    }

    fn push_node(&mut self, data: NodeData) -> NodeId {
        let id = NodeId::new(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(data);
        id
    }

    fn record(&mut self, record: ChangeRecord) {
        if self.recording {
            self.records.push(record);
        }
    }

    /// Number of nodes ever created (including detached ones).
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Drain pending mutation records.
    pub fn take_records(&mut self) -> Vec<ChangeRecord> {
        core::mem::take(&mut self.records)
    }

    pub fn has_records(&self) -> bool {
        !self.records.is_empty()
    }

    /// Detached element with a lowercase tag.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let mut data = NodeData::new(NodeKind::Element);
        data.tag = tag.to_ascii_lowercase();
        self.push_node(data)
    }

    /// Detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        let mut data = NodeData::new(NodeKind::Text);
        data.text = text.to_string();
        self.push_node(data)
    }

    /// Append `child` as the last child of `parent`, moving it if attached.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` under `parent` before `reference` (or last when `None`).
    ///
    /// Fails on unknown ids, non-container parents, a reference that is not a
    /// child of `parent`, or when `child` is an ancestor of `parent`.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> bool {
        let parent_ok = matches!(
            self.node(parent).map(|d| d.kind),
            Some(NodeKind::Element | NodeKind::Document)
        );
        if !parent_ok || self.node(child).is_none() || child == parent || child == self.root() {
            return false;
        }
        if crate::tree::is_ancestor_of(&*self, child, parent) {
            return false;
        }
        if let Some(reference) = reference {
            if reference == child || self.parent(reference) != Some(parent) {
                return false;
            }
        }
        self.remove(child);

        let prev = match reference {
            Some(reference) => self.node(reference).and_then(|d| d.prev_sibling),
            None => self.node(parent).and_then(|d| d.last_child),
        };
        if let Some(data) = self.node_mut(child) {
            data.parent = Some(parent);
            data.prev_sibling = prev;
            data.next_sibling = reference;
        }
        match prev {
            Some(prev) => {
                if let Some(data) = self.node_mut(prev) {
                    data.next_sibling = Some(child);
                }
            }
            None => {
                if let Some(data) = self.node_mut(parent) {
                    data.first_child = Some(child);
                }
            }
        }
        match reference {
            Some(reference) => {
                if let Some(data) = self.node_mut(reference) {
                    data.prev_sibling = Some(child);
                }
            }
            None => {
                if let Some(data) = self.node_mut(parent) {
                    data.last_child = Some(child);
                }
            }
        }
        self.record(ChangeRecord::child_list(parent, vec![child], Vec::new()));
        true
    }

    /// Detach `node` from its parent. Its own subtree stays intact.
    pub fn remove(&mut self, node: NodeId) -> bool {
        let Some(data) = self.node(node) else {
            return false;
        };
        let (Some(parent), prev, next) = (data.parent, data.prev_sibling, data.next_sibling)
        else {
            return false;
        };
        match prev {
            Some(prev) => {
                if let Some(data) = self.node_mut(prev) {
                    data.next_sibling = next;
                }
            }
            None => {
                if let Some(data) = self.node_mut(parent) {
                    data.first_child = next;
                }
            }
        }
        match next {
            Some(next) => {
                if let Some(data) = self.node_mut(next) {
                    data.prev_sibling = prev;
                }
            }
            None => {
                if let Some(data) = self.node_mut(parent) {
                    data.last_child = prev;
                }
            }
        }
        if let Some(data) = self.node_mut(node) {
            data.parent = None;
            data.prev_sibling = None;
            data.next_sibling = None;
        }
        self.record(ChangeRecord::child_list(parent, Vec::new(), vec![node]));
        true
    }

    /// Set an attribute on an element. `style` also refreshes computed styles.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> bool {
        let name = name.to_ascii_lowercase();
        let Some(data) = self.node_mut(node) else {
            return false;
        };
        if data.kind != NodeKind::Element {
            return false;
        }
        match data.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => data.attributes.push((name.clone(), value.to_string())),
        }
        if name == "style" {
            data.styles = parse_inline_style(value);
        }
        self.record(ChangeRecord::attribute(node, name));
        true
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> bool {
        let Some(data) = self.node_mut(node) else {
            return false;
        };
        let before = data.attributes.len();
        data.attributes.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        if data.attributes.len() == before {
            return false;
        }
        if name.eq_ignore_ascii_case("style") {
            data.styles.clear();
        }
        self.record(ChangeRecord::attribute(node, name.to_ascii_lowercase()));
        true
    }

    /// Replace the character data of a text node.
    pub fn set_text(&mut self, node: NodeId, text: &str) -> bool {
        let Some(data) = self.node_mut(node) else {
            return false;
        };
        if data.kind != NodeKind::Text {
            return false;
        }
        data.text = text.to_string();
        self.record(ChangeRecord::character_data(node));
        true
    }

    /// Assign a layout box in document coordinates.
    pub fn set_rect(&mut self, node: NodeId, rect: Rect) -> bool {
        match self.node_mut(node) {
            Some(data) => {
                data.rect = Some(rect);
                true
            }
            None => false,
        }
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Scroll so document y-coordinate `y` is at the top of the viewport.
    pub fn scroll_to(&mut self, y: f32) {
        self.scroll_y = y.max(0.0);
    }

    pub fn scroll_y(&self) -> f32 {
        self.scroll_y
    }

    /// Stack every connected element vertically at full viewport width.
    ///
    /// Each element owning readable direct text takes one `line_height` row;
    /// an element spans the rows of its subtree. Elements under
    /// `display: none` get no box.
    pub fn layout_blocks(&mut self, line_height: f32) {
        let width = self.viewport.width;
        let mut cursor = 0.0f32;
        let root = self.root();
        let top_level: Vec<NodeId> = children(&*self, root).collect();
        for node in top_level {
            self.layout_node(node, width, line_height, &mut cursor);
        }
    }

    fn layout_node(&mut self, node: NodeId, width: f32, line_height: f32, cursor: &mut f32) {
        if self.kind(node) != Some(NodeKind::Element) {
            return;
        }
        if self.node(node).and_then(|d| d.style("display")) == Some("none") {
            for id in descendants(&*self, node).collect::<Vec<_>>() {
                if let Some(data) = self.node_mut(id) {
                    data.rect = None;
                }
            }
            return;
        }
        let top = *cursor;
        if crate::scan::owns_meaningful_text(&*self, node) {
            *cursor += line_height;
        }
        let kids: Vec<NodeId> = children(&*self, node).collect();
        for child in kids {
            self.layout_node(child, width, line_height, cursor);
        }
        let height = *cursor - top;
        self.set_rect(node, Rect::new(0.0, top, width, height));
    }

    /// First connected element with the given `id` attribute.
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        descendants(self, self.root()).find(|node| self.attribute(*node, "id") == Some(id))
    }

    /// First connected element with the given tag.
    pub fn element_by_tag(&self, tag: &str) -> Option<NodeId> {
        descendants(self, self.root())
            .find(|node| self.tag_name(*node).is_some_and(|t| t.eq_ignore_ascii_case(tag)))
    }

    /// Connected elements carrying `class` as a class token.
    pub fn elements_with_class(&self, class: &str) -> Vec<NodeId> {
        descendants(self, self.root())
            .filter(|node| {
                self.attribute(*node, "class")
                    .is_some_and(|value| value.split_ascii_whitespace().any(|c| c == class))
            })
            .collect()
    }

    /// Serialize the whole document.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        for child in children(self, self.root()) {
            self.write_markup(child, &mut out);
        }
        out
    }

    /// Serialize `node` and its subtree.
    pub fn to_markup_of(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_markup(node, &mut out);
        out
    }

    fn write_markup(&self, node: NodeId, out: &mut String) {
        let Some(data) = self.node(node) else {
            return;
        };
        match data.kind {
            NodeKind::Document => {
                for child in children(self, node) {
                    self.write_markup(child, out);
                }
            }
            NodeKind::Text => out.push_str(&quick_xml::escape::escape(data.text.as_str())),
            NodeKind::Other => {
                out.push_str("<!--");
                out.push_str(&data.text);
                out.push_str("-->");
            }
            NodeKind::Element => {
                out.push('<');
                out.push_str(&data.tag);
                for (key, value) in &data.attributes {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    out.push_str(&quick_xml::escape::escape(value.as_str()));
                    out.push('"');
                }
                if data.first_child.is_none() && VOID_TAGS.contains(&data.tag.as_str()) {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for child in children(self, node) {
                    self.write_markup(child, out);
                }
                out.push_str("</");
                out.push_str(&data.tag);
                out.push('>');
            }
        }
    }

    fn is_display_none_chain(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if self.computed_style(id, "display") == Some("none") {
                return true;
            }
            current = self.parent(id);
        }
        false
    }
}

fn decode_tag_name(reader: &Reader<&[u8]>, raw: &[u8]) -> Result<String, ReadifyError> {
    let decoded = reader
        .decoder()
        .decode(raw)
        .map_err(|err| markup_error(reader, "tag name", err))?;
    let local_name = decoded.rsplit(':').next().unwrap_or(decoded.as_ref());
    Ok(local_name.to_ascii_lowercase())
}

fn markup_error(
    reader: &Reader<&[u8]>,
    source: &str,
    err: impl core::fmt::Debug,
) -> ReadifyError {
    ReadifyError::new(
        ErrorKind::Markup,
        "MARKUP_PARSE",
        format!("{} error: {:?}", source, err),
    )
    .with_offset(usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX))
}

impl ContentTree for Document {
    fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.node(node).map(|data| data.kind)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent
    }

    fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.first_child
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.next_sibling
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        let data = self.node(node)?;
        (data.kind == NodeKind::Element).then_some(data.tag.as_str())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.node(node)?.attribute(name)
    }

    fn text(&self, node: NodeId) -> Option<&str> {
        let data = self.node(node)?;
        (data.kind == NodeKind::Text).then_some(data.text.as_str())
    }

    fn computed_style(&self, node: NodeId, property: &str) -> Option<&str> {
        let data = self.node(node)?;
        if data.kind != NodeKind::Element {
            return None;
        }
        if let Some(value) = data.style(property) {
            return Some(value);
        }
        match property {
            "display" => {
                if data.attribute("hidden").is_some() {
                    Some("none")
                } else if INLINE_TAGS.contains(&data.tag.as_str()) {
                    Some("inline")
                } else {
                    Some("block")
                }
            }
            "visibility" => {
                let mut ancestor = data.parent;
                while let Some(id) = ancestor {
                    let parent = self.node(id)?;
                    if let Some(value) = parent.style("visibility") {
                        return Some(value);
                    }
                    ancestor = parent.parent;
                }
                Some("visible")
            }
            "position" => Some("static"),
            _ => None,
        }
    }

    fn bounding_rect(&self, node: NodeId) -> Option<Rect> {
        let data = self.node(node)?;
        let owner = match data.kind {
            NodeKind::Element => node,
            NodeKind::Text => data.parent?,
            NodeKind::Document | NodeKind::Other => return None,
        };
        if self.is_display_none_chain(owner) {
            return None;
        }
        let rect = self.node(owner)?.rect?;
        Some(rect.translated_y(-self.scroll_y))
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn is_connected(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == self.root() {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    fn replace_text(&mut self, node: NodeId, fragment: &Fragment) -> Result<(), ReadifyError> {
        if self.kind(node) != Some(NodeKind::Text) {
            return Err(ReadifyError::new(
                ErrorKind::TreeMutation,
                "MUTATE_NOT_TEXT",
                "only text nodes can be replaced",
            )
            .with_node(node));
        }
        let Some(parent) = self.parent(node) else {
            return Err(ReadifyError::detached(node));
        };
        let markers = fragment.markers();
        let wrapper = self.create_element(markers.tag);
        let recording = core::mem::replace(&mut self.recording, false);
        self.set_attribute(wrapper, "class", markers.plain_class);
        for piece in fragment.pieces() {
            match piece {
                FragmentPiece::Text(text) => {
                    let text_node = self.create_text(text);
                    self.append_child(wrapper, text_node);
                }
                FragmentPiece::Word { emphasis, rest } => {
                    let bold = self.create_element(markers.tag);
                    self.set_attribute(bold, "class", markers.emphasis_class);
                    let bold_text = self.create_text(emphasis);
                    self.append_child(bold, bold_text);
                    self.append_child(wrapper, bold);
                    if !rest.is_empty() {
                        let rest_text = self.create_text(rest);
                        self.append_child(wrapper, rest_text);
                    }
                }
            }
        }
        let next = self.next_sibling(node);
        self.remove(node);
        self.insert_before(parent, wrapper, next);
        self.recording = recording;
        self.record(ChangeRecord::child_list(parent, vec![wrapper], vec![node]));
        Ok(())
    }
}
