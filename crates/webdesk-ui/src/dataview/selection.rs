//! Pure selection and cursor arithmetic.

use webdesk_engine::input::Key;

use super::ViewKind;

/// Applies a click (or keyboard) selection at `index`.
///
/// `None` clears. Without `extend` the result is just `[index]`; with it
/// the index is toggled within `selected`. The result is always sorted and
/// free of duplicates.
pub fn select_index(selected: &[usize], index: Option<usize>, extend: bool) -> Vec<usize> {
    let Some(index) = index else { return Vec::new() };
    let mut out = if extend { selected.to_vec() } else { Vec::new() };
    match out.iter().position(|&i| i == index) {
        Some(pos) => {
            out.remove(pos);
        }
        None => out.push(index),
    }
    out.sort_unstable();
    out.dedup();
    out
}

/// Where an arrow key moves the cursor, or `None` for keys that do not
/// navigate in this view family. The result may be `count`, which callers
/// treat as out of range.
pub fn cursor_for_key(kind: ViewKind, key: &Key, selected: &[usize], row_size: usize) -> Option<usize> {
    let first = selected.first().copied().unwrap_or(0);
    let last = if selected.len() > 1 { selected[selected.len() - 1] } else { first };
    let prev = first.saturating_sub(1);
    let next = last + 1;

    match (kind, key) {
        (ViewKind::List | ViewKind::Tree, Key::ArrowUp) => Some(prev),
        (ViewKind::List | ViewKind::Tree, Key::ArrowDown) => Some(next),
        (ViewKind::Icon, Key::ArrowUp) => Some(first.saturating_sub(row_size)),
        (ViewKind::Icon, Key::ArrowDown) => Some(last.max(last + row_size)),
        (ViewKind::Icon, Key::ArrowLeft) => Some(prev),
        (ViewKind::Icon, Key::ArrowRight) => Some(next),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_replaces_and_shift_toggles() {
        let s = select_index(&[], Some(4), false);
        assert_eq!(s, [4]);
        let s = select_index(&s, Some(2), true);
        assert_eq!(s, [2, 4]);
        let s = select_index(&s, Some(4), true);
        assert_eq!(s, [2]);
        let s = select_index(&s, Some(7), false);
        assert_eq!(s, [7]);
        assert!(select_index(&s, None, true).is_empty());
    }

    #[test]
    fn plain_click_on_selected_keeps_it() {
        assert_eq!(select_index(&[1, 3], Some(3), false), [3]);
    }

    #[test]
    fn selection_stays_sorted_under_any_sequence() {
        let mut s = Vec::new();
        for (i, extend) in [(5, false), (1, true), (9, true), (3, true), (1, true), (0, true), (9, true)] {
            s = select_index(&s, Some(i), extend);
            assert!(s.windows(2).all(|w| w[0] < w[1]), "{s:?}");
        }
        assert_eq!(s, [0, 3, 5]);
    }

    #[test]
    fn list_cursor() {
        assert_eq!(cursor_for_key(ViewKind::List, &Key::ArrowDown, &[2], 1), Some(3));
        assert_eq!(cursor_for_key(ViewKind::List, &Key::ArrowUp, &[2, 5], 1), Some(1));
        assert_eq!(cursor_for_key(ViewKind::List, &Key::ArrowDown, &[2, 5], 1), Some(6));
        assert_eq!(cursor_for_key(ViewKind::Tree, &Key::ArrowUp, &[], 1), Some(0));
        assert_eq!(cursor_for_key(ViewKind::List, &Key::ArrowLeft, &[2], 1), None);
    }

    #[test]
    fn icon_cursor_moves_by_rows() {
        assert_eq!(cursor_for_key(ViewKind::Icon, &Key::ArrowDown, &[1], 4), Some(5));
        assert_eq!(cursor_for_key(ViewKind::Icon, &Key::ArrowUp, &[5], 4), Some(1));
        assert_eq!(cursor_for_key(ViewKind::Icon, &Key::ArrowUp, &[2], 4), Some(0));
        assert_eq!(cursor_for_key(ViewKind::Icon, &Key::ArrowRight, &[2], 4), Some(3));
        assert_eq!(cursor_for_key(ViewKind::Icon, &Key::ArrowLeft, &[0], 4), Some(0));
    }
}
