//! # Overlay Module
//!
//! The name card drawn over every output frame: four lines of text plus the
//! fixed "C H E Z" label, laid out inside a centered square.

pub mod font;
pub mod layout;
pub mod rasterizer;
pub mod text_parts;

pub use font::{load_font, load_system_font, system_font_database};
pub use layout::{Alignment, OverlayLayout, PixelBounds, Rect, TextBox, TextRole};
pub use rasterizer::{OverlayBitmap, OverlayRasterizer};
pub use text_parts::TextParts;
