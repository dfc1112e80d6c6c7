//! webdesk engine crate.
//!
//! Platform-level pieces shared by the GUI runtime and its hosts: logger
//! bootstrap, logical-pixel geometry, and the keyboard/pointer vocabulary
//! hosts translate their native events into.

pub mod coords;
pub mod input;
pub mod logging;
