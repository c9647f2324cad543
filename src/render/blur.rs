use rayon::prelude::*;

use crate::foundation::error::{FilmError, FilmResult};

/// Separable box blur over an interleaved `f32` plane with `channels` values per pixel.
///
/// Both passes use a sliding-window running sum with edge clamping, so cost does not grow
/// with `radius`.
pub(crate) fn box_blur(
    src: &[f32],
    width: u32,
    height: u32,
    channels: usize,
    radius: u32,
) -> FilmResult<Vec<f32>> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(channels))
        .ok_or_else(|| FilmError::validation("blur buffer size overflow"))?;
    if src.len() != expected || channels == 0 {
        return Err(FilmError::validation(
            "box_blur expects src matching width*height*channels",
        ));
    }
    if radius == 0 || width == 0 || height == 0 {
        return Ok(src.to_vec());
    }
    let mut tmp = vec![0.0f32; expected];
    horizontal_pass(src, &mut tmp, width as usize, channels, radius as usize);
    let mut out = vec![0.0f32; expected];
    vertical_pass(&tmp, &mut out, width as usize, height as usize, channels, radius as usize);
    Ok(out)
}

/// Box blur applied `passes` times; three passes approximate a Gaussian.
pub(crate) fn box_blur_n(
    src: &[f32],
    width: u32,
    height: u32,
    channels: usize,
    radius: u32,
    passes: usize,
) -> FilmResult<Vec<f32>> {
    let mut cur = box_blur(src, width, height, channels, radius)?;
    for _ in 1..passes {
        cur = box_blur(&cur, width, height, channels, radius)?;
    }
    Ok(cur)
}

fn horizontal_pass(src: &[f32], dst: &mut [f32], w: usize, ch: usize, r: usize) {
    let norm = 1.0 / (2 * r + 1) as f32;
    let last = w - 1;
    dst.par_chunks_mut(w * ch)
        .zip(src.par_chunks(w * ch))
        .for_each(|(out, row)| {
            for c in 0..ch {
                let at = |x: usize| row[x.min(last) * ch + c];
                let mut acc = at(0) * (r + 1) as f32;
                for x in 1..=r {
                    acc += at(x);
                }
                for x in 0..w {
                    out[x * ch + c] = acc * norm;
                    let add = at(x + r + 1);
                    let sub = row[x.saturating_sub(r) * ch + c];
                    acc += add - sub;
                }
            }
        });
}

fn vertical_pass(src: &[f32], dst: &mut [f32], w: usize, h: usize, ch: usize, r: usize) {
    let stride = w * ch;
    let norm = 1.0 / (2 * r + 1) as f32;
    let row = |y: usize| &src[y.min(h - 1) * stride..y.min(h - 1) * stride + stride];
    let mut acc: Vec<f32> = row(0).iter().map(|v| v * (r + 1) as f32).collect();
    for y in 1..=r {
        for (a, v) in acc.iter_mut().zip(row(y)) {
            *a += v;
        }
    }
    for y in 0..h {
        let out = &mut dst[y * stride..(y + 1) * stride];
        for (o, a) in out.iter_mut().zip(acc.iter()) {
            *o = a * norm;
        }
        let add = row(y + r + 1);
        let sub = row(y.saturating_sub(r));
        for ((a, ad), s) in acc.iter_mut().zip(add).zip(sub) {
            *a += ad - s;
        }
    }
}
