//! Lexer, parser, and AST for **webdesk scheme markup**.
//!
//! Schemes are HTML-like documents made of `application-window` and
//! `application-fragment` templates holding `gui-*` custom elements. This
//! crate turns that text into a plain tree; the runtime in `webdesk-ui`
//! imports the tree into its document and builds widgets from it.
//!
//! The crate has no dependencies so tooling can reuse it.
//!
//! # Structure
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`ast`] | `Markup`, `Node`, `Element`, `Attr` |
//! | [`error`] | `ParseError` |
//! | [`lexer`] | `Lexer`, `Token`, `decode_entities` |
//! | [`normalize`] | `normalize_self_closing` |
//! | [`parser`] | `parse_str` entry point |
//!
//! # Quick start
//!
//! ```rust
//! use webdesk_markup::{normalize_self_closing, parse_str};
//!
//! let src = r#"
//!     <application-window data-id="main" data-width="400">
//!         <gui-file-view data-id="files" data-path="home:///"/>
//!     </application-window>
//! "#;
//!
//! let doc = parse_str(&normalize_self_closing(src)).unwrap();
//! let win = doc.elements().next().unwrap();
//! assert_eq!(win.attr("data-id"), Some("main"));
//! ```

pub mod ast;
pub mod error;
pub mod lexer;
pub mod normalize;
pub mod parser;

pub use ast::{Attr, Element, Markup, Node};
pub use error::ParseError;
pub use normalize::normalize_self_closing;
pub use parser::parse_str;

#[cfg(test)]
mod parse_tests {
    use super::*;

    fn ok(src: &str) -> Markup { parse_str(src).unwrap() }
    fn err(src: &str) -> ParseError { parse_str(src).unwrap_err() }

    #[test] fn empty_document() { assert!(ok("").nodes.is_empty()); }
    #[test] fn single_element() { ok("<gui-vbox></gui-vbox>"); }
    #[test] fn nested_elements() {
        ok("<application-window><gui-vbox><gui-vbox-container><gui-label>Hi</gui-label></gui-vbox-container></gui-vbox></application-window>");
    }
    #[test] fn quoted_attrs() { ok(r#"<gui-button data-id="ok" data-label='OK'></gui-button>"#); }
    #[test] fn bare_and_valueless_attrs() { ok("<gui-checkbox data-value=true disabled></gui-checkbox>"); }
    #[test] fn comments_and_doctype() { ok("<!DOCTYPE html><!-- a --><div><!-- b --></div>"); }
    #[test] fn self_closing() { ok(r#"<gui-fragment data-fragment-id="x"/>"#); }
    #[test] fn void_elements() {
        let doc = ok("<div><input type=text><span>after</span></div>");
        let tags: Vec<_> = doc.elements().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, ["div", "input", "span"]);
    }
    #[test] fn tag_names_lowercased() {
        assert_eq!(ok("<GUI-Label></gui-label>").elements().next().unwrap().tag, "gui-label");
    }
    #[test] fn whitespace_text_dropped() {
        let doc = ok("<div>\n    <span>x</span>\n</div>");
        let Node::Element(div) = &doc.nodes[0] else { panic!() };
        assert_eq!(div.children.len(), 1);
    }
    #[test] fn entities_decoded() {
        let doc = ok(r#"<gui-label title="a &amp; b">1 &lt; 2 &#x41;</gui-label>"#);
        let Node::Element(el) = &doc.nodes[0] else { panic!() };
        assert_eq!(el.attr("title"), Some("a & b"));
        assert_eq!(el.children, vec![Node::Text("1 < 2 A".into())]);
    }
    #[test] fn unmatched_end_tag_ignored() { ok("<div></span></div>"); }
    #[test] fn unclosed_elements_closed_at_eof() {
        let doc = ok("<div><span>text");
        assert_eq!(doc.elements().count(), 2);
    }
    #[test] fn mismatched_end_closes_inner() {
        let doc = ok("<a><b><c></a><d></d>");
        assert_eq!(doc.nodes.len(), 2);
    }
    #[test] fn literal_lt_in_text() { ok("<p>a < b</p>"); }
    #[test] fn duplicate_attr_first_wins() {
        let doc = ok(r#"<div data-id="a" data-id="b"></div>"#);
        assert_eq!(doc.elements().next().unwrap().attr("data-id"), Some("a"));
    }
    #[test] fn err_unterminated_attr() {
        let e = err("<div title=\"oops></div>");
        assert_eq!((e.line, e.col), (1, 12));
    }
    #[test] fn err_unterminated_tag() { err("<div data-id=x"); }
    #[test] fn err_unterminated_comment() { err("<!-- never closed"); }
    #[test] fn err_bad_char_in_tag() { err("<div <span>"); }
    #[test] fn err_position_tracks_lines() {
        let e = err("<div>\n  <span title='x></span>");
        assert_eq!(e.line, 2);
    }
}
