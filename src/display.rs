//! The rendering sink the tasks draw their traces and readouts on.
//!
//! Only the primitives needed by [`crate::plot`] are required, the panel driver is provided by the
//! board support.

use core::fmt::Debug;

/// RGB565.
pub type Color = u16;

pub mod color {
    use super::Color;

    pub const BLACK: Color = 0x0000;
    pub const WHITE: Color = 0xffff;
    pub const RED: Color = 0xf800;
    pub const GREEN: Color = 0x07e0;
    pub const BLUE: Color = 0x001f;
    pub const YELLOW: Color = 0xffe0;
    pub const CYAN: Color = 0x07ff;
    pub const GRAY: Color = 0x8410;
}

/// Pixel rectangle, origin in the upper left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub w: u16,
    pub h: u16,
}

impl Rect {
    pub const fn new(x: u16, y: u16, w: u16, h: u16) -> Rect {
        Rect { x, y, w, h }
    }

    /// Last pixel row inside the rectangle.
    pub fn bottom(&self) -> u16 {
        self.y + self.h.saturating_sub(1)
    }

    /// Last pixel column inside the rectangle.
    pub fn right(&self) -> u16 {
        self.x + self.w.saturating_sub(1)
    }

    pub fn contains(&self, x: u16, y: u16) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }
}

pub trait Display {
    type Error: Debug;

    fn clear(&mut self, color: Color) -> Result<(), Self::Error>;

    fn fill_rect(&mut self, area: Rect, color: Color) -> Result<(), Self::Error>;

    fn draw_line(
        &mut self,
        x0: u16,
        y0: u16,
        x1: u16,
        y1: u16,
        color: Color,
    ) -> Result<(), Self::Error>;

    fn draw_text(&mut self, x: u16, y: u16, text: &str, color: Color) -> Result<(), Self::Error>;

    /// Draw `value` with `decimals` digits after the decimal point.
    fn draw_number(
        &mut self,
        x: u16,
        y: u16,
        value: f32,
        decimals: u8,
        color: Color,
    ) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_edges() {
        let r = Rect::new(10, 20, 100, 50);
        assert_eq!(r.right(), 109);
        assert_eq!(r.bottom(), 69);
        assert!(r.contains(10, 20));
        assert!(r.contains(109, 69));
        assert!(!r.contains(110, 69));
        assert!(!r.contains(9, 30));
    }

    #[test]
    fn empty_rect() {
        let r = Rect::new(5, 5, 0, 0);
        assert_eq!(r.right(), 5);
        assert_eq!(r.bottom(), 5);
    }
}
