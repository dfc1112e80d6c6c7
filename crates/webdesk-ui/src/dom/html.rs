use webdesk_markup::ast::{is_void, Node as MarkupNode};

use super::{Document, NodeId, NodeKind};

impl Document {
    /// Instantiates parsed markup under `parent` (or detached when `None`)
    /// and returns the created top-level nodes.
    pub fn append_markup(&mut self, parent: Option<NodeId>, nodes: &[MarkupNode]) -> Vec<NodeId> {
        let mut created = Vec::with_capacity(nodes.len());
        for node in nodes {
            let id = match node {
                MarkupNode::Text(t) => self.create_text(t.clone()),
                MarkupNode::Element(el) => {
                    let id = self.create_element(&el.tag);
                    for attr in &el.attrs {
                        self.set_attr(id, &attr.name, attr.value.clone());
                    }
                    self.append_markup(Some(id), &el.children);
                    id
                }
            };
            if let Some(p) = parent {
                self.append_child(p, id);
            }
            created.push(id);
        }
        created
    }

    /// Serializes `id` with its subtree.
    pub fn to_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    /// Serializes the children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &c in self.children(id) {
            self.write_html(c, &mut out);
        }
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            None => {}
            Some(NodeKind::Text(t)) => escape_into(t, false, out),
            Some(NodeKind::Element(el)) => {
                out.push('<');
                out.push_str(&el.tag);
                for (k, v) in self.attrs(id) {
                    push_attr(k, v, out);
                }
                if !self.classes(id).is_empty() {
                    push_attr("class", &self.classes(id).join(" "), out);
                }
                let style = self.style_text(id);
                if !style.is_empty() {
                    push_attr("style", &style, out);
                }
                out.push('>');
                if is_void(&el.tag) {
                    return;
                }
                for &c in self.children(id) {
                    self.write_html(c, out);
                }
                out.push_str("</");
                out.push_str(&el.tag);
                out.push('>');
            }
        }
    }
}

fn push_attr(name: &str, value: &str, out: &mut String) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    escape_into(value, true, out);
    out.push('"');
}

fn escape_into(src: &str, attr: bool, out: &mut String) {
    for c in src.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attr => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}
