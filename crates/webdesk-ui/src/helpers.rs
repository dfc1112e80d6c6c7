//! Small DOM helpers shared by the widget descriptors.

use serde_json::Value;

use crate::dom::{Document, NodeId};
use crate::gui::Gui;
use crate::registry::Params;
use crate::services::IconResolver;
use crate::window::AppContext;

/// Tags whose value lives on an inner native control.
const VALUE_INPUTS: &[&str] = &["gui-text", "gui-password", "gui-textarea", "gui-slider", "gui-select", "gui-select-list"];
const CHECK_INPUTS: &[&str] = &["gui-checkbox", "gui-radio", "gui-switch"];
/// Tags whose generic params are mirrored on the inner control.
const CONTROL_TAGS: &[&str] = &[
    "gui-slider", "gui-text", "gui-password", "gui-textarea", "gui-checkbox",
    "gui-radio", "gui-select", "gui-select-list", "gui-button",
];

pub fn is_data_view_tag(tag: &str) -> bool {
    matches!(tag, "gui-tree-view" | "gui-icon-view" | "gui-list-view" | "gui-file-view")
}

/// `"true"` / `"false"` attribute flag.
pub fn is_true(value: Option<&str>) -> bool {
    value == Some("true")
}

/// Attribute text for a JSON value: strings verbatim, `null` empty,
/// booleans and numbers printed, objects and arrays JSON-encoded.
pub fn value_to_attr(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Reverse of [`value_to_attr`] for values read back from `data-*`.
pub fn attr_to_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        s if s.starts_with('[') || s.starts_with('{') => serde_json::from_str(s).unwrap_or(Value::Null),
        s => Value::String(s.to_string()),
    }
}

/// Window id of the nearest `data-window-id` ancestor.
pub fn get_window_id(doc: &Document, node: NodeId) -> Option<u32> {
    let host = doc.closest(node, |d, n| d.has_attr(n, "data-window-id"))?;
    doc.attr(host, "data-window-id")?.parse().ok()
}

pub fn get_label(doc: &Document, node: NodeId) -> String {
    doc.attr(node, "data-label").unwrap_or_default().to_string()
}

/// Label given as leading text content, else `data-label` when
/// `use_attr`. Text children are removed once read.
pub fn get_value_label(doc: &mut Document, node: NodeId, use_attr: bool) -> String {
    let mut label = if use_attr { doc.attr(node, "data-label").map(str::to_string) } else { None };
    let text = doc.children(node).first().and_then(|&c| doc.text(c)).filter(|t| !t.is_empty()).map(str::to_string);
    if let Some(text) = text {
        label = Some(text);
        doc.empty(node);
    }
    label.unwrap_or_default()
}

/// `data-value` of a view entry, decoded when it holds JSON.
pub fn get_view_node_value(doc: &Document, node: NodeId) -> Value {
    match doc.attr(node, "data-value") {
        None => Value::Null,
        Some(raw) if raw.starts_with('[') || raw.starts_with('{') => serde_json::from_str(raw).unwrap_or(Value::Null),
        Some(raw) => Value::String(raw.to_string()),
    }
}

/// Resolves a `data-icon` value.
///
/// `stock://[WxH/]name` goes through the icon resolver (16x16 by default),
/// `app://path` through the owning application's resources, and anything
/// else is returned unchanged.
pub fn resolve_icon(icons: &dyn IconResolver, image: &str, app: Option<&AppContext>) -> Option<String> {
    if image.is_empty() || image == "undefined" {
        return None;
    }
    if let Some(rest) = image.strip_prefix("stock://") {
        let (size, name) = match rest.split_once('/') {
            Some((first, name)) if is_icon_size(first) => (first, name),
            _ => ("16x16", rest),
        };
        return Some(icons.resolve_icon(name, size, app));
    }
    if let Some(rest) = image.strip_prefix("app://") {
        return Some(match app {
            Some(app) => app.resource(rest),
            None => rest.to_string(),
        });
    }
    Some(image.to_string())
}

fn is_icon_size(s: &str) -> bool {
    s.split_once('x').is_some_and(|(w, h)| {
        !w.is_empty() && !h.is_empty() && w.bytes().all(|b| b.is_ascii_digit()) && h.bytes().all(|b| b.is_ascii_digit())
    })
}

/// The icon declared on `node`, resolved.
pub fn get_icon(gui: &Gui, node: NodeId, app: Option<&AppContext>) -> Option<String> {
    let image = gui.document.attr(node, "data-icon")?;
    resolve_icon(gui.services().icons.as_ref(), image, app)
}

fn inner_control(doc: &Document, node: NodeId) -> Option<NodeId> {
    doc.query_selector(node, "textarea, input, select, button")
}

/// Generic property reader.
pub fn get_property(gui: &Gui, node: NodeId, param: &str) -> Value {
    let doc = &gui.document;
    let tag = doc.tag(node).unwrap_or_default();
    let data_view = is_data_view_tag(tag);

    if param == "value" && !data_view {
        if VALUE_INPUTS.contains(&tag) {
            return inner_control(doc, node)
                .and_then(|c| doc.attr(c, "value"))
                .map(|v| Value::String(v.to_string()))
                .unwrap_or(Value::Null);
        }
        if CHECK_INPUTS.contains(&tag) {
            return Value::Bool(doc.query_selector(node, "input").is_some_and(|i| doc.has_attr(i, "checked")));
        }
        return Value::Null;
    }
    if data_view && (param == "value" || param == "selected") {
        return gui.descriptor(node).map(|d| d.values(gui, node)).unwrap_or(Value::Null);
    }
    match param {
        "_id" | "_class" | "_style" => {
            let name = &param[1..];
            match name {
                "class" => Value::String(doc.classes(node).join(" ")),
                "style" => Value::String(doc.style_text(node)),
                _ => doc.attr(node, name).map(|v| Value::String(v.to_string())).unwrap_or(Value::Null),
            }
        }
        _ => doc.attr(node, &format!("data-{param}")).map(attr_to_value).unwrap_or(Value::Null),
    }
}

/// Generic property writer.
///
/// Form widgets mirror `readonly`, `disabled`, `value` and `label` onto
/// their inner control. `_id`, `_class` and `_style` set the plain
/// attribute. Everything except `value` is also stored as `data-<param>`.
pub fn set_property(doc: &mut Document, node: NodeId, param: &str, value: &Value) {
    let tag = doc.tag(node).unwrap_or_default().to_string();

    if CONTROL_TAGS.contains(&tag.as_str()) {
        if let Some(control) = inner_control(doc, node) {
            match param {
                "readonly" | "disabled" => {
                    let on = is_truthy(value);
                    if on {
                        doc.set_attr(control, param, param);
                    } else {
                        doc.remove_attr(control, param);
                    }
                    doc.set_attr(node, &format!("aria-{param}"), on.to_string());
                }
                "value" => {
                    if tag == "gui-radio" || tag == "gui-checkbox" || tag == "gui-switch" {
                        if is_truthy(value) {
                            doc.set_attr(control, "checked", "checked");
                        } else {
                            doc.remove_attr(control, "checked");
                        }
                    } else {
                        doc.set_attr(control, "value", value_to_attr(value));
                    }
                }
                "label" => {
                    let kind = tag.trim_start_matches("gui-").to_string();
                    if let Some(old) = doc.query_selector(node, "label") {
                        doc.append_child(node, control);
                        doc.remove(old);
                    }
                    create_input_label(doc, node, &kind, control, Some(&value_to_attr(value)));
                }
                _ => doc.set_attr(control, param, value_to_attr(value)),
            }
        }
    }

    if let Some(name) = param.strip_prefix('_').filter(|n| matches!(*n, "id" | "class" | "style")) {
        doc.set_attr(node, name, value_to_attr(value));
        return;
    }
    if param != "value" {
        doc.set_attr(node, &format!("data-{param}"), value_to_attr(value));
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s == "true" || s == "checked",
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Null => false,
        _ => true,
    }
}

/// Wraps `input` in a `<label>` carrying the widget's label text, or
/// appends it bare when there is no label.
pub fn create_input_label(doc: &mut Document, node: NodeId, kind: &str, input: NodeId, label: Option<&str>) {
    let label = label.filter(|l| !l.is_empty()).map(str::to_string).unwrap_or_else(|| get_label(doc, node));
    if label.is_empty() {
        doc.append_child(node, input);
        return;
    }
    let lbl = doc.create_element("label");
    let span = doc.create_element("span");
    doc.set_text_content(span, label);
    if kind == "checkbox" || kind == "radio" {
        doc.append_child(lbl, input);
        doc.append_child(lbl, span);
    } else {
        doc.append_child(lbl, span);
        doc.append_child(lbl, input);
    }
    doc.append_child(node, lbl);
}

/// Generic element factory: `params` become `data-*` attributes.
pub fn create_element(doc: &mut Document, tag: &str, params: &Params) -> NodeId {
    let el = doc.create_element(tag);
    for (key, value) in params {
        match key.as_str() {
            _ if value.is_null() => {}
            "textalign" => doc.add_class(el, &format!("gui-align-{}", value_to_attr(value))),
            "className" => {
                for class in value_to_attr(value).split_whitespace() {
                    doc.add_class(el, class);
                }
            }
            _ => doc.set_attr(el, &format!("data-{key}"), value_to_attr(value)),
        }
    }
    el
}

/// Sets `flex` on a box container. Missing factors are read from
/// `data-grow`, `data-shrink` and `data-basis` of `source` (default `el`).
pub fn set_flexbox(doc: &mut Document, el: NodeId, grow: Option<&str>, shrink: Option<&str>, basis: Option<&str>, source: Option<NodeId>) {
    let source = source.unwrap_or(el);
    let read = |name: &str, default: &str| doc.attr(source, name).unwrap_or(default).to_string();
    let grow = grow.map(str::to_string).unwrap_or_else(|| read("data-grow", "0"));
    let shrink = shrink.map(str::to_string).unwrap_or_else(|| read("data-shrink", "0"));
    let basis = basis.map(str::to_string).unwrap_or_else(|| read("data-basis", "auto"));

    let flex = if basis.is_empty() { format!("{grow} {shrink}") } else { format!("{grow} {shrink} {basis}") };
    doc.set_style(el, "flex", flex);

    doc.remove_class(el, "gui-flex-align-start");
    doc.remove_class(el, "gui-flex-align-end");
    if let Some(align) = doc.attr(el, "data-align").map(str::to_string) {
        doc.add_class(el, &format!("gui-flex-align-{align}"));
    }
}

/// `1.5 KiB` style sizes; `si` switches to powers of 1000.
pub fn human_file_size(bytes: u64, si: bool) -> String {
    let thresh = if si { 1000.0 } else { 1024.0 };
    let units: &[&str] = if si {
        &["kB", "MB", "GB", "TB", "PB", "EB"]
    } else {
        &["KiB", "MiB", "GiB", "TiB", "PiB", "EiB"]
    };
    let mut size = bytes as f64;
    if size < thresh {
        return format!("{bytes} B");
    }
    let mut unit = 0;
    size /= thresh;
    while size >= thresh && unit < units.len() - 1 {
        size /= thresh;
        unit += 1;
    }
    format!("{:.1} {}", size, units[unit])
}

/// Display form of a listing timestamp. Unparseable input is shown raw.
pub fn format_date(raw: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::services::StockIcons;

    #[test]
    fn window_id_from_ancestor() {
        let mut doc = Document::new();
        let win = doc.create_element("application-window-content");
        doc.set_attr(win, "data-window-id", "7");
        let inner = doc.create_element("gui-button");
        doc.append_child(win, inner);
        assert_eq!(get_window_id(&doc, inner), Some(7));
        let loose = doc.create_element("div");
        assert_eq!(get_window_id(&doc, loose), None);
    }

    #[test]
    fn value_label_prefers_text() {
        let mut doc = Document::new();
        let b = doc.create_element("gui-button");
        doc.set_attr(b, "data-label", "attr");
        let t = doc.create_text("Text");
        doc.append_child(b, t);
        assert_eq!(get_value_label(&mut doc, b, true), "Text");
        assert!(doc.children(b).is_empty());
        assert_eq!(get_value_label(&mut doc, b, true), "attr");
        assert_eq!(get_value_label(&mut doc, b, false), "");
    }

    #[test]
    fn view_node_values_decode_json() {
        let mut doc = Document::new();
        let n = doc.create_element("div");
        doc.set_attr(n, "data-value", r#"{"path":"/a"}"#);
        assert_eq!(get_view_node_value(&doc, n), json!({"path": "/a"}));
        doc.set_attr(n, "data-value", "{broken");
        assert_eq!(get_view_node_value(&doc, n), Value::Null);
        doc.set_attr(n, "data-value", "plain");
        assert_eq!(get_view_node_value(&doc, n), json!("plain"));
    }

    #[test]
    fn icon_schemes() {
        let icons = StockIcons::default();
        let app = AppContext::new("Writer", "/packages/default/Writer");
        assert_eq!(
            resolve_icon(&icons, "stock://32x32/places/folder.png", None).as_deref(),
            Some("/themes/icons/default/32x32/places/folder.png")
        );
        assert_eq!(
            resolve_icon(&icons, "stock://actions/save.png", None).as_deref(),
            Some("/themes/icons/default/16x16/actions/save.png")
        );
        assert_eq!(
            resolve_icon(&icons, "app://icon.png", Some(&app)).as_deref(),
            Some("/packages/default/Writer/icon.png")
        );
        assert_eq!(resolve_icon(&icons, "undefined", None), None);
    }

    #[test]
    fn factory_maps_params() {
        let mut doc = Document::new();
        let params = json!({"textalign": "right", "className": "big", "grow": 1, "visible": true, "cols": ["a"]});
        let el = create_element(&mut doc, "gui-label", params.as_object().unwrap());
        assert!(doc.has_class(el, "gui-align-right"));
        assert!(doc.has_class(el, "big"));
        assert_eq!(doc.attr(el, "data-grow"), Some("1"));
        assert_eq!(doc.attr(el, "data-visible"), Some("true"));
        assert_eq!(doc.attr(el, "data-cols"), Some(r#"["a"]"#));
    }

    #[test]
    fn set_property_mirrors_controls() {
        let mut doc = Document::new();
        let el = doc.create_element("gui-checkbox");
        let input = doc.create_element("input");
        doc.append_child(el, input);

        set_property(&mut doc, el, "value", &json!(true));
        assert!(doc.has_attr(input, "checked"));
        assert_eq!(doc.attr(el, "data-value"), None);

        set_property(&mut doc, el, "disabled", &json!(true));
        assert_eq!(doc.attr(input, "disabled"), Some("disabled"));
        assert_eq!(doc.attr(el, "aria-disabled"), Some("true"));

        set_property(&mut doc, el, "_id", &json!("cb"));
        assert_eq!(doc.attr(el, "id"), Some("cb"));
    }

    #[test]
    fn flexbox_reads_defaults_from_attributes() {
        let mut doc = Document::new();
        let el = doc.create_element("gui-vbox-container");
        doc.set_attr(el, "data-grow", "1");
        doc.set_attr(el, "data-align", "end");
        set_flexbox(&mut doc, el, None, Some("1"), None, None);
        assert_eq!(doc.style(el, "flex"), Some("1 1 auto"));
        assert!(doc.has_class(el, "gui-flex-align-end"));
    }

    #[test]
    fn file_sizes() {
        assert_eq!(human_file_size(512, false), "512 B");
        assert_eq!(human_file_size(1536, false), "1.5 KiB");
        assert_eq!(human_file_size(5 * 1024 * 1024, false), "5.0 MiB");
        assert_eq!(human_file_size(1500, true), "1.5 kB");
    }

    #[test]
    fn dates_fall_back_to_raw() {
        assert_eq!(format_date("2024-03-01T10:20:30Z"), "2024-03-01 10:20");
        assert_eq!(format_date("yesterday"), "yesterday");
    }
}
