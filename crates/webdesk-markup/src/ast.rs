/// A parsed markup document: the top-level node list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Markup {
    pub nodes: Vec<Node>,
}

impl Markup {
    /// Preorder iterator over every element in the document.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        let mut stack: Vec<&Node> = self.nodes.iter().rev().collect();
        std::iter::from_fn(move || {
            while let Some(node) = stack.pop() {
                if let Node::Element(el) = node {
                    stack.extend(el.children.iter().rev());
                    return Some(el);
                }
            }
            None
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// A single tag with its attributes and children.
///
/// Tag and attribute names are lower-cased by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<Attr>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into(), attrs: Vec::new(), children: Vec::new() }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.iter().find(|a| a.name == name).map(|a| a.value.as_str())
    }
}

/// `name="value"`. A valueless attribute carries an empty string.
#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    pub name: String,
    pub value: String,
}

/// Elements that never take an end tag.
pub const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "input", "meta", "link"];

pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}
