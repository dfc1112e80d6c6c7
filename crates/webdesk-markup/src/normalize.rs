/// Rewrites `<tag ... />` into `<tag ...></tag>`.
///
/// Custom `gui-*` tags are written self-closed in scheme files, but an
/// HTML tree builder treats the `/` as noise and leaves the element open.
/// Quoted attribute values and comments are copied through untouched.
pub fn normalize_self_closing(src: &str) -> String {
    let mut out = String::with_capacity(src.len() + src.len() / 8);
    let mut chars = src.char_indices().peekable();
    let mut tag: Option<String> = None;
    let mut quote: Option<char> = None;

    while let Some((i, c)) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        match (&tag, c) {
            (None, '<') if src[i..].starts_with("<!--") => {
                let end = src[i..].find("-->").map(|e| i + e + 3).unwrap_or(src.len());
                out.push_str(&src[i..end]);
                while matches!(chars.peek(), Some(&(j, _)) if j < end) {
                    chars.next();
                }
            }
            (None, '<') => {
                out.push(c);
                let name: String = src[i + 1..]
                    .chars()
                    .take_while(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | ':' | '.'))
                    .collect();
                if name.chars().next().is_some_and(|ch| ch.is_ascii_alphabetic()) {
                    tag = Some(name);
                }
            }
            (Some(_), '"' | '\'') => {
                quote = Some(c);
                out.push(c);
            }
            (Some(name), '/') if matches!(chars.peek(), Some(&(_, '>'))) => {
                chars.next();
                out.push_str("></");
                out.push_str(name);
                out.push('>');
                tag = None;
            }
            (Some(_), '>') => {
                out.push(c);
                tag = None;
            }
            _ => out.push(c),
        }
    }
    out
}
