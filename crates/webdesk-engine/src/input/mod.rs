//! Input vocabulary.
//!
//! Hosts translate whatever their platform delivers (browser key names,
//! terminal escapes, test scripts) into these types before handing events
//! to the GUI runtime.

mod types;

pub use types::{Key, Modifiers, MouseButton};
