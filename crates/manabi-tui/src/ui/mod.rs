//! Terminal UI module using ratatui.
//!
//! - `render`: frame layout, place list, quiz box, status bar
//! - `map`: the map pane and screen/coordinate conversion
//! - `input`: keyboard and mouse handling
//! - `styles`: color scheme and text styling

pub mod input;
pub mod map;
pub mod render;
pub mod styles;
