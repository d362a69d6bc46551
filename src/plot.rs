//! Line traces, spectra and labelled numbers drawn on a [`Display`].

use crate::display::{Color, Display, Rect};
use crate::spectrum::display_scale;

/// Glyph width of the display font [px].
pub const CHAR_W: u16 = 8;

/// Vertical pixel of `v` in `area` for values spanning `lo..hi`, clamped to the area.
fn row(area: Rect, v: f32, lo: f32, hi: f32) -> u16 {
    let span = if hi > lo { hi - lo } else { 1.0 };
    let h = area.h.saturating_sub(1) as f32;

    let y = libm::roundf((v - lo) / span * h).clamp(0., h) as u16;
    area.bottom() - y
}

/// Draw `n` samples as connected line segments across the width of `area`, `lo` at the bottom
/// and `hi` at the top.
pub fn trace<D: Display>(
    d: &mut D,
    area: Rect,
    n: usize,
    samples: impl Iterator<Item = f32>,
    lo: f32,
    hi: f32,
    color: Color,
) -> Result<(), D::Error> {
    if n < 2 || area.w == 0 || area.h == 0 {
        return Ok(());
    }

    let w = area.w as usize - 1;
    let mut prev: Option<(u16, u16)> = None;

    for (i, s) in samples.take(n).enumerate() {
        let x = area.x + (i * w / (n - 1)) as u16;
        let y = row(area, s, lo, hi);

        if let Some((px, py)) = prev {
            d.draw_line(px, py, x, y, color)?;
        }
        prev = Some((x, y));
    }

    Ok(())
}

/// Draw every `stride`th magnitude bin as a vertical bar, one pixel column per bar, scaled so
/// that the largest bin fills `area`. Bars past the width of `area` are not drawn.
pub fn spectrum<D: Display>(
    d: &mut D,
    area: Rect,
    magnitudes: &[f32],
    stride: usize,
    color: Color,
) -> Result<(), D::Error> {
    if area.w == 0 || area.h == 0 {
        return Ok(());
    }

    let scale = display_scale(magnitudes.iter().fold(0.0, |m, v| v.max(m)));
    let h = area.h.saturating_sub(1) as f32;

    for (col, m) in magnitudes
        .iter()
        .step_by(stride.max(1))
        .take(area.w as usize)
        .enumerate()
    {
        let x = area.x + col as u16;
        let bar = libm::roundf((m / scale).clamp(0., 1.) * h) as u16;

        d.draw_line(x, area.bottom(), x, area.bottom() - bar, color)?;
    }

    Ok(())
}

/// Draw `label` followed by `value`.
pub fn readout<D: Display>(
    d: &mut D,
    x: u16,
    y: u16,
    label: &str,
    value: f32,
    decimals: u8,
    color: Color,
) -> Result<(), D::Error> {
    d.draw_text(x, y, label, color)?;
    d.draw_number(x + label.len() as u16 * CHAR_W, y, value, decimals, color)
}
