//! Resolution-independent layout of the name card.
//!
//! All rectangles are in output-frame pixels with a bottom-left origin
//! (y grows upward). The rasterizer flips them into image coordinates.

use crate::error::{OverlayError, Result};
use crate::overlay::TextParts;
use crate::video::types::FrameSize;

/// Share of the shorter frame side taken by the overlay square
pub const OVERLAY_SCALE: f64 = 0.8;

/// Vertical share of the overlay for the person name band
pub const PERSON_NAME_BAND: f64 = 0.22;

/// Vertical share of the overlay for the first descriptor band
pub const PART_ONE_BAND: f64 = 0.22;

/// Vertical share of the overlay for the second descriptor band
pub const PART_TWO_BAND: f64 = 0.22;

/// Vertical share of the overlay for the bottom band
pub const BOTTOM_BAND: f64 = 0.34;

/// Horizontal share of the bottom band given to the workplace block
pub const BOTTOM_RIGHT_SHARE: f64 = 0.92;

/// Label drawn to the left of the workplace
pub const CHEZ_LABEL: &str = "C H E Z";

/// Which piece of text a box holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextRole {
    PersonName,
    PartOne,
    PartTwo,
    ChezLabel,
    WorkPlace,
}

impl TextRole {
    /// The string drawn for this role
    pub fn text<'a>(&self, parts: &'a TextParts) -> &'a str {
        match self {
            Self::PersonName => &parts.person_name,
            Self::PartOne => &parts.part_one,
            Self::PartTwo => &parts.part_two,
            Self::ChezLabel => CHEZ_LABEL,
            Self::WorkPlace => &parts.work_place,
        }
    }
}

/// Horizontal text alignment inside a box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Alignment {
    Left,
    Center,
}

/// Axis-aligned rectangle, bottom-left origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn top(&self) -> f64 {
        self.y + self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// The same rectangle in a top-left origin space of the given height
    pub fn flipped(&self, frame_height: u32) -> Rect {
        Rect::new(self.x, frame_height as f64 - self.top(), self.width, self.height)
    }

    /// Integer pixel span `[x0, x1) x [y0, y1)` of this rectangle once flipped
    /// to image coordinates, clamped to the frame
    pub fn pixel_bounds(&self, frame: FrameSize) -> PixelBounds {
        let flipped = self.flipped(frame.height);
        let clamp_x = |v: f64| v.round().clamp(0.0, frame.width as f64) as u32;
        let clamp_y = |v: f64| v.round().clamp(0.0, frame.height as f64) as u32;
        PixelBounds {
            x0: clamp_x(flipped.x),
            y0: clamp_y(flipped.y),
            x1: clamp_x(flipped.right()),
            y1: clamp_y(flipped.top()),
        }
    }
}

/// Half-open pixel span in image (top-left) coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelBounds {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelBounds {
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }

    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }
}

/// One text sublayer of the card
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextBox {
    pub role: TextRole,
    pub rect: Rect,
    pub font_size: f32,
    pub alignment: Alignment,
}

/// Positions of the overlay square and its five text boxes
///
/// The boxes are stored in draw order: the three upper bands, then the
/// "C H E Z" stub, then the workplace block on top of it.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLayout {
    frame: FrameSize,
    square: Rect,
    boxes: [TextBox; 5],
}

impl OverlayLayout {
    /// Compute the layout for an output frame
    ///
    /// The geometry depends only on the frame size; the text is looked up by
    /// role when the card is drawn.
    pub fn compute(frame: FrameSize) -> Result<Self> {
        if frame.is_empty() {
            return Err(OverlayError::InvalidFrameSize {
                width: frame.width,
                height: frame.height,
            }
            .into());
        }

        let (w, h) = (frame.width as f64, frame.height as f64);
        let side = OVERLAY_SCALE * w.min(h);
        let ox = (w - side) / 2.0;
        let oy = (h - side) / 2.0;

        let band = |y_frac: f64, h_frac: f64| {
            Rect::new(ox, oy + side * y_frac, side, side * h_frac)
        };

        let person_name = TextBox {
            role: TextRole::PersonName,
            rect: band(1.0 - PERSON_NAME_BAND, PERSON_NAME_BAND),
            font_size: 105.0,
            alignment: Alignment::Center,
        };

        let part_one = TextBox {
            role: TextRole::PartOne,
            rect: band(1.0 - PERSON_NAME_BAND - PART_ONE_BAND, PART_ONE_BAND),
            font_size: 90.0,
            alignment: Alignment::Center,
        };

        let part_two = TextBox {
            role: TextRole::PartTwo,
            rect: band(BOTTOM_BAND, PART_TWO_BAND),
            font_size: 105.0,
            alignment: Alignment::Center,
        };

        let chez = TextBox {
            role: TextRole::ChezLabel,
            rect: Rect::new(
                ox,
                oy,
                side * (1.0 - BOTTOM_RIGHT_SHARE * 1.03),
                side * BOTTOM_BAND,
            ),
            font_size: 40.0,
            alignment: Alignment::Left,
        };

        let work_place = TextBox {
            role: TextRole::WorkPlace,
            rect: Rect::new(
                ox + side * (1.0 - BOTTOM_RIGHT_SHARE),
                oy,
                side * BOTTOM_RIGHT_SHARE,
                side * BOTTOM_BAND * 0.8,
            ),
            font_size: 77.0,
            alignment: Alignment::Center,
        };

        Ok(Self {
            frame,
            square: Rect::new(ox, oy, side, side),
            boxes: [person_name, part_one, part_two, chez, work_place],
        })
    }

    pub fn frame(&self) -> FrameSize {
        self.frame
    }

    /// The overlay square in frame coordinates
    pub fn square(&self) -> Rect {
        self.square
    }

    /// Side length of the overlay square
    pub fn side(&self) -> f64 {
        self.square.width
    }

    /// Text boxes in draw order
    pub fn boxes(&self) -> &[TextBox] {
        &self.boxes
    }

    pub fn text_box(&self, role: TextRole) -> &TextBox {
        self.boxes
            .iter()
            .find(|b| b.role == role)
            .unwrap_or(&self.boxes[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < EPS
    }

    #[test]
    fn test_landscape_square_is_centered() {
        let layout = OverlayLayout::compute(FrameSize::new(1280, 720)).unwrap();
        let square = layout.square();
        assert!(approx(square.width, 576.0));
        assert!(approx(square.x, 352.0));
        assert!(approx(square.y, 72.0));
    }

    #[test]
    fn test_full_hd_side() {
        let layout = OverlayLayout::compute(FrameSize::new(1920, 1080)).unwrap();
        assert!(approx(layout.side(), 864.0));
    }

    #[test]
    fn test_portrait_square_is_centered() {
        let layout = OverlayLayout::compute(FrameSize::new(720, 1280)).unwrap();
        let square = layout.square();
        assert!(approx(square.width, 576.0));
        assert!(approx(square.x, 72.0));
        assert!(approx(square.y, 352.0));
    }

    #[test]
    fn test_bands_stack_top_to_bottom() {
        let layout = OverlayLayout::compute(FrameSize::new(1280, 720)).unwrap();
        let name = layout.text_box(TextRole::PersonName).rect;
        let one = layout.text_box(TextRole::PartOne).rect;
        let two = layout.text_box(TextRole::PartTwo).rect;
        let main = layout.text_box(TextRole::WorkPlace).rect;

        // Bottom-left origin: the person name band has the largest y
        assert!(name.y > one.y && one.y > two.y && two.y > main.y);
        assert!(approx(name.top(), 72.0 + 576.0));
        assert!(approx(one.top(), name.y));
        assert!(approx(two.top(), one.y));
        assert!(approx(two.y, 72.0 + 576.0 * 0.34));
        assert!(approx(name.height, 576.0 * 0.22));
    }

    #[test]
    fn test_bottom_band_split() {
        let layout = OverlayLayout::compute(FrameSize::new(1280, 720)).unwrap();
        let chez = layout.text_box(TextRole::ChezLabel);
        let main = layout.text_box(TextRole::WorkPlace);

        assert!(approx(chez.rect.x, 352.0));
        assert!(approx(chez.rect.width, 576.0 * (1.0 - 0.92 * 1.03)));
        assert!(approx(chez.rect.height, 576.0 * 0.34));
        assert_eq!(chez.alignment, Alignment::Left);
        assert_eq!(chez.font_size, 40.0);

        assert!(approx(main.rect.x, 352.0 + 576.0 * 0.08));
        assert!(approx(main.rect.width, 576.0 * 0.92));
        assert!(approx(main.rect.height, 576.0 * 0.34 * 0.8));
        assert_eq!(main.alignment, Alignment::Center);
        assert_eq!(main.font_size, 77.0);
    }

    #[test]
    fn test_draw_order_puts_workplace_last() {
        let layout = OverlayLayout::compute(FrameSize::new(640, 480)).unwrap();
        let roles: Vec<TextRole> = layout.boxes().iter().map(|b| b.role).collect();
        assert_eq!(
            roles,
            vec![
                TextRole::PersonName,
                TextRole::PartOne,
                TextRole::PartTwo,
                TextRole::ChezLabel,
                TextRole::WorkPlace
            ]
        );
    }

    #[test]
    fn test_font_sizes() {
        let layout = OverlayLayout::compute(FrameSize::new(640, 480)).unwrap();
        let sizes: Vec<f32> = layout.boxes().iter().map(|b| b.font_size).collect();
        assert_eq!(sizes, vec![105.0, 90.0, 105.0, 40.0, 77.0]);
    }

    #[test]
    fn test_flip_to_image_coordinates() {
        let frame = FrameSize::new(1280, 720);
        let layout = OverlayLayout::compute(frame).unwrap();

        // The top band sits at the top of the square in image space
        let name = layout.text_box(TextRole::PersonName).rect.pixel_bounds(frame);
        assert_eq!(name.y0, 72);
        assert_eq!(name.x0, 352);
        assert_eq!(name.x1, 928);

        // The workplace block touches the bottom of the square
        let main = layout.text_box(TextRole::WorkPlace).rect.pixel_bounds(frame);
        assert_eq!(main.y1, 648);
    }

    #[test]
    fn test_layout_is_deterministic() {
        let a = OverlayLayout::compute(FrameSize::new(1280, 720)).unwrap();
        let b = OverlayLayout::compute(FrameSize::new(1280, 720)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_frame_rejected() {
        assert!(OverlayLayout::compute(FrameSize::new(0, 720)).is_err());
    }

    #[test]
    fn test_role_text_lookup() {
        let parts = TextParts::new("A", "B", "C", "D");
        assert_eq!(TextRole::PersonName.text(&parts), "A");
        assert_eq!(TextRole::PartOne.text(&parts), "B");
        assert_eq!(TextRole::PartTwo.text(&parts), "C");
        assert_eq!(TextRole::ChezLabel.text(&parts), "C H E Z");
        assert_eq!(TextRole::WorkPlace.text(&parts), "D");
    }
}
