//! Editor UI module
//!
//! - `state`: data model and events
//! - `components`: reusable widget builders
//! - `layout`: top-level layout and the polling timer

pub mod components;
pub mod layout;
pub mod state;

pub use layout::build_ui;
