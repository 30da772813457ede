use fontdue::layout::{
    CoordinateSystem, HorizontalAlign, Layout, LayoutSettings, TextStyle, VerticalAlign, WrapStyle,
};
use fontdue::Font;
use tracing::debug;

use crate::config::OverlayConfig;
use crate::error::Result;
use crate::overlay::font::load_font;
use crate::overlay::layout::{Alignment, OverlayLayout, PixelBounds, TextBox};
use crate::overlay::TextParts;
use crate::video::types::{Frame, FrameSize};

/// The pre-rendered name card, one RGBA image the size of the output frame
///
/// Text pixels carry the overlay color with glyph coverage as alpha; every
/// other pixel is fully transparent. Built once per export and shared
/// read-only between frames.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayBitmap {
    frame: Frame,
}

impl OverlayBitmap {
    /// A bitmap with no text at all
    pub fn transparent(size: FrameSize) -> Self {
        Self {
            frame: Frame::new_transparent(size.width, size.height),
        }
    }

    pub fn from_frame(frame: Frame) -> Self {
        Self { frame }
    }

    pub fn size(&self) -> FrameSize {
        self.frame.size()
    }

    pub fn as_frame(&self) -> &Frame {
        &self.frame
    }

    /// Number of pixels with non-zero alpha inside `bounds`
    pub fn covered_pixels(&self, bounds: PixelBounds) -> usize {
        let image = self.frame.as_image();
        let mut count = 0;
        for y in bounds.y0..bounds.y1.min(image.height()) {
            for x in bounds.x0..bounds.x1.min(image.width()) {
                if image.get_pixel(x, y)[3] > 0 {
                    count += 1;
                }
            }
        }
        count
    }

    /// Number of pixels with non-zero alpha in the whole bitmap
    pub fn total_covered_pixels(&self) -> usize {
        self.frame.as_rgba_bytes().chunks_exact(4).filter(|px| px[3] > 0).count()
    }
}

/// Draws the five text boxes of an [`OverlayLayout`] into an [`OverlayBitmap`]
pub struct OverlayRasterizer {
    font: Font,
    color: [u8; 4],
}

impl OverlayRasterizer {
    pub fn new(font: Font, color: [u8; 4]) -> Self {
        Self { font, color }
    }

    /// Build a rasterizer from configuration, loading the font
    pub fn from_config(config: &OverlayConfig) -> Result<Self> {
        let font = load_font(config.font_path.as_deref())?;
        Ok(Self::new(font, config.color))
    }

    /// Render every text box of `layout` onto a transparent canvas the size
    /// of the layout's frame
    pub fn rasterize(&self, layout: &OverlayLayout, text_parts: &TextParts) -> OverlayBitmap {
        let frame_size = layout.frame();
        let mut canvas = Frame::new_transparent(frame_size.width, frame_size.height);

        for text_box in layout.boxes() {
            let text = text_box.role.text(text_parts);
            self.draw_box(&mut canvas, text_box, text);
        }

        OverlayBitmap { frame: canvas }
    }

    fn draw_box(&self, canvas: &mut Frame, text_box: &TextBox, text: &str) {
        if text.is_empty() {
            return;
        }

        let size = canvas.size();
        let clip = text_box.rect.pixel_bounds(size);
        if clip.is_empty() {
            return;
        }

        // Layout constants use a bottom-left origin, fontdue lays out top-down
        let rect = text_box.rect.flipped(size.height);

        let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings {
            x: rect.x as f32,
            y: rect.y as f32,
            max_width: Some(rect.width as f32),
            max_height: Some(rect.height as f32),
            horizontal_align: match text_box.alignment {
                Alignment::Left => HorizontalAlign::Left,
                Alignment::Center => HorizontalAlign::Center,
            },
            vertical_align: VerticalAlign::Top,
            wrap_style: WrapStyle::Word,
            wrap_hard_breaks: true,
            ..LayoutSettings::default()
        });
        layout.append(&[&self.font], &TextStyle::new(text, text_box.font_size, 0));

        debug!(
            "Drawing {:?} '{}' at {}px into [{}..{}, {}..{}]",
            text_box.role, text, text_box.font_size, clip.x0, clip.x1, clip.y0, clip.y1
        );

        for glyph in layout.glyphs() {
            if glyph.width == 0 || glyph.height == 0 {
                continue;
            }
            let (_, coverage) = self.font.rasterize_config(glyph.key);
            let gx = glyph.x.round() as i64;
            let gy = glyph.y.round() as i64;

            for row in 0..glyph.height {
                for col in 0..glyph.width {
                    let value = coverage[row * glyph.width + col];
                    if value == 0 {
                        continue;
                    }
                    let px = gx + col as i64;
                    let py = gy + row as i64;
                    if px < 0 || py < 0 || !clip.contains(px as u32, py as u32) {
                        continue;
                    }
                    blend_coverage(canvas, px as u32, py as u32, self.color, value);
                }
            }
        }
    }
}

/// Source-over a glyph pixel of `color` at `coverage` onto the canvas
fn blend_coverage(canvas: &mut Frame, x: u32, y: u32, color: [u8; 4], coverage: u8) {
    let src_a = (coverage as f32 / 255.0) * (color[3] as f32 / 255.0);
    let dst = canvas.get_pixel(x, y);
    let dst_a = dst[3] as f32 / 255.0;

    let out_a = src_a + dst_a * (1.0 - src_a);
    if out_a <= 0.0 {
        return;
    }

    let mut out = [0u8; 4];
    for c in 0..3 {
        let value = (color[c] as f32 * src_a + dst[c] as f32 * dst_a * (1.0 - src_a)) / out_a;
        out[c] = value.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    canvas.set_pixel(x, y, out);
}
