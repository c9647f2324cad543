use vello_cpu::kurbo::{Affine, Rect};

use crate::adjust::model::{DateStamp, StampCorner};
use crate::foundation::core::Canvas;
use crate::foundation::error::{FilmError, FilmResult};

const LED_RGBA: [u8; 4] = [255, 146, 38, 232];
const MIN_DIGIT_PX: f64 = 8.0;
const MARGIN: f64 = 0.04;
const DIGIT_WIDTH: f64 = 0.55;
const STROKE: f64 = 0.13;
const SLANT: f64 = 0.12;
const PAD_PX: f64 = 2.0;

const SEG_A: u8 = 1;
const SEG_B: u8 = 2;
const SEG_C: u8 = 4;
const SEG_D: u8 = 8;
const SEG_E: u8 = 16;
const SEG_F: u8 = 32;
const SEG_G: u8 = 64;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Glyph {
    Segments(u8),
    Space,
    Tick,
    Dot,
    Colon,
}

impl Glyph {
    fn of(c: char) -> Option<Self> {
        let segs = match c {
            '0' => SEG_A | SEG_B | SEG_C | SEG_D | SEG_E | SEG_F,
            '1' => SEG_B | SEG_C,
            '2' => SEG_A | SEG_B | SEG_D | SEG_E | SEG_G,
            '3' => SEG_A | SEG_B | SEG_C | SEG_D | SEG_G,
            '4' => SEG_B | SEG_C | SEG_F | SEG_G,
            '5' => SEG_A | SEG_C | SEG_D | SEG_F | SEG_G,
            '6' => SEG_A | SEG_C | SEG_D | SEG_E | SEG_F | SEG_G,
            '7' => SEG_A | SEG_B | SEG_C,
            '8' => 0x7f,
            '9' => SEG_A | SEG_B | SEG_C | SEG_D | SEG_F | SEG_G,
            '-' => SEG_G,
            ' ' => return Some(Self::Space),
            '\'' => return Some(Self::Tick),
            '.' => return Some(Self::Dot),
            ':' => return Some(Self::Colon),
            _ => return None,
        };
        Some(Self::Segments(segs))
    }

    /// Horizontal advance in digit heights.
    fn advance(self) -> f64 {
        match self {
            Self::Segments(_) => DIGIT_WIDTH + 0.22,
            Self::Space => 0.45,
            Self::Tick | Self::Dot | Self::Colon => STROKE + 0.2,
        }
    }

    /// Rectangles in a unit-height cell.
    fn rects(self) -> Vec<Rect> {
        let t = STROKE;
        let w = DIGIT_WIDTH;
        let half = 0.5;
        match self {
            Self::Segments(segs) => {
                let all = [
                    (SEG_A, Rect::new(t * 0.6, 0.0, w - t * 0.6, t)),
                    (SEG_B, Rect::new(w - t, t * 0.6, w, half - t * 0.1)),
                    (SEG_C, Rect::new(w - t, half + t * 0.1, w, 1.0 - t * 0.6)),
                    (SEG_D, Rect::new(t * 0.6, 1.0 - t, w - t * 0.6, 1.0)),
                    (SEG_E, Rect::new(0.0, half + t * 0.1, t, 1.0 - t * 0.6)),
                    (SEG_F, Rect::new(0.0, t * 0.6, t, half - t * 0.1)),
                    (
                        SEG_G,
                        Rect::new(t * 0.6, half - t * 0.5, w - t * 0.6, half + t * 0.5),
                    ),
                ];
                all.into_iter()
                    .filter(|(bit, _)| segs & bit != 0)
                    .map(|(_, r)| r)
                    .collect()
            }
            Self::Space => Vec::new(),
            Self::Tick => vec![Rect::new(0.0, 0.0, t, 0.3)],
            Self::Dot => vec![Rect::new(0.0, 1.0 - t, t, 1.0)],
            Self::Colon => vec![
                Rect::new(0.0, 0.25, t, 0.25 + t),
                Rect::new(0.0, 0.75 - t, t, 0.75),
            ],
        }
    }
}

/// Draw a slanted seven-segment date imprint into `canvas` at the configured corner.
///
/// Unsupported characters are skipped. Pixels outside the canvas are clipped.
pub fn draw_date_stamp(canvas: &mut Canvas, stamp: &DateStamp) -> FilmResult<()> {
    let glyphs: Vec<Glyph> = stamp.text.chars().filter_map(Glyph::of).collect();
    if glyphs.is_empty() || canvas.width == 0 || canvas.height == 0 {
        return Ok(());
    }
    let short = f64::from(canvas.width.min(canvas.height));
    let h = (f64::from(stamp.scale) * short).max(MIN_DIGIT_PX);
    let text_w = glyphs.iter().map(|g| g.advance()).sum::<f64>() * h + SLANT * h;
    let region_w = (text_w + PAD_PX * 2.0).ceil();
    let region_h = (h + PAD_PX * 2.0).ceil();
    let to_u16 = |v: f64| {
        u16::try_from(v as u64)
            .map_err(|_| FilmError::validation(format!("date stamp too large: {v}px")))
    };
    let (pw, ph) = (to_u16(region_w)?, to_u16(region_h)?);

    let mut ctx = vello_cpu::RenderContext::new(pw, ph);
    let [r, g, b, a] = LED_RGBA;
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
    let mut pen_x = PAD_PX;
    for glyph in &glyphs {
        let cell = Affine::translate((pen_x, PAD_PX))
            * Affine::new([1.0, 0.0, -SLANT, 1.0, SLANT * h, 0.0])
            * Affine::scale(h);
        ctx.set_transform(cell);
        for rect in glyph.rects() {
            ctx.fill_rect(&rect);
        }
        pen_x += glyph.advance() * h;
    }
    ctx.flush();
    let mut pixmap = vello_cpu::Pixmap::new(pw, ph);
    ctx.render_to_pixmap(&mut pixmap);

    let margin = (MARGIN * short).round();
    let (cw, ch) = (f64::from(canvas.width), f64::from(canvas.height));
    let (ox, oy) = match stamp.corner {
        StampCorner::BottomRight => (cw - margin - region_w, ch - margin - region_h),
        StampCorner::BottomLeft => (margin, ch - margin - region_h),
        StampCorner::TopRight => (cw - margin - region_w, margin),
        StampCorner::TopLeft => (margin, margin),
    };
    blend_premul(
        canvas,
        pixmap.data_as_u8_slice(),
        u32::from(pw),
        u32::from(ph),
        ox as i64,
        oy as i64,
    );
    Ok(())
}

/// Source-over of a premultiplied RGBA8 region onto the straight-alpha canvas.
fn blend_premul(canvas: &mut Canvas, src: &[u8], sw: u32, sh: u32, ox: i64, oy: i64) {
    for sy in 0..sh {
        let y = oy + i64::from(sy);
        if y < 0 || y >= i64::from(canvas.height) {
            continue;
        }
        for sx in 0..sw {
            let x = ox + i64::from(sx);
            if x < 0 || x >= i64::from(canvas.width) {
                continue;
            }
            let si = (sy as usize * sw as usize + sx as usize) * 4;
            let sa = f32::from(src[si + 3]) / 255.0;
            if sa <= 0.0 {
                continue;
            }
            let di = (y as usize * canvas.width as usize + x as usize) * 4;
            let da = f32::from(canvas.data[di + 3]) / 255.0;
            let out_a = sa + da * (1.0 - sa);
            for c in 0..3 {
                let s = f32::from(src[si + c]) / 255.0;
                let d = f32::from(canvas.data[di + c]) / 255.0;
                let premul = s + d * da * (1.0 - sa);
                canvas.data[di + c] = to_u8(premul / out_a);
            }
            canvas.data[di + 3] = to_u8(out_a);
        }
    }
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}
