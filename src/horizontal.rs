//! Horizontal filter variants (spec §4.5).
//!
//! Each variant consumes one unpacked internal-form row (`srcPx` pixels,
//! plus one padding pixel so bilinear's `off+1` and box's trailing partial
//! sample never read out of bounds) and emits one row at the placement
//! width. Kept as free functions over precalc tables rather than a trait
//! object per spec's Design Notes ("Do not attempt to unify the three
//! filter families into a single generic loop; their memory access
//! patterns differ materially").

use crate::internal::Wide;
use crate::precalc::{box_window, BilinearPrecalc, BoxPrecalc};

/// `memcpy` one row (spec §4.5 "copy").
pub fn copy(src: &[Wide], dst: &mut [Wide]) {
    dst.copy_from_slice(&src[..dst.len()]);
}

/// Broadcasts a single source pixel across the whole row (spec §4.5 "one").
pub fn one(src_pixel: Wide, dst: &mut [Wide]) {
    dst.fill(src_pixel);
}

/// Recursive-halving bilinear (spec §4.5 "bilinear k-halving"): for each
/// output pixel, average `2^halvings` `lerp(src[off], src[off+1], w)`
/// samples. `mask` clamps each lane to the internal form's channel range.
pub fn bilinear(src: &[Wide], precalc: &BilinearPrecalc, halvings: u32, mask: u32, dst: &mut [Wide]) {
    let sub = 1usize << halvings;
    debug_assert_eq!(precalc.pairs.len(), dst.len() * sub);
    for (i, out) in dst.iter_mut().enumerate() {
        let mut acc = [0i64; 4];
        for s in 0..sub {
            let pair = precalc.pairs[i * sub + s];
            let p = src[pair.off as usize];
            let q = src[pair.off as usize + 1];
            for c in 0..4 {
                let lerp = ((p.ch[c] as i64 - q.ch[c] as i64) * pair.w as i64 >> 8) + q.ch[c] as i64;
                acc[c] += lerp;
            }
        }
        let mut ch = [0u32; 4];
        for c in 0..4 {
            ch[c] = ((acc[c] >> halvings) as u32) & mask;
        }
        *out = Wide { ch };
    }
}

/// Area/box average (spec §4.5 "box"): accumulate the partially-covered
/// leading/trailing source pixels at their 8-bit coverage weight and the
/// fully-covered pixels in between at full weight, then normalize by
/// `span_mul`.
pub fn box_filter(src: &[Wide], precalc: &BoxPrecalc, src_px: u32, mask: u32, dst: &mut [Wide]) {
    use crate::fixed::{BOXES_MUL, BOXES_SHIFT};
    for (i, out) in dst.iter_mut().enumerate() {
        let w = box_window(precalc, i, src_px);
        let mut sum = [0i64; 4];
        for c in 0..4 {
            let mut s = (src[w.off0 as usize].ch[c] as i64 * w.f0 as i64) >> 8;
            for k in (w.off0 + 1)..(w.off0 + 1 + w.n) {
                s += src[k as usize].ch[c] as i64;
            }
            if w.f1 > 0 {
                s += (src[w.off1 as usize].ch[c] as i64 * w.f1 as i64) >> 8;
            }
            sum[c] = s;
        }
        let mut ch = [0u32; 4];
        for c in 0..4 {
            let v = (sum[c] * precalc.span_mul as i64 + (BOXES_MUL >> 1)) >> BOXES_SHIFT;
            ch[c] = (v.max(0) as u32) & mask;
        }
        *out = Wide { ch };
    }
}

/// Scales the first and/or last pixel of a filtered row by its sub-pixel
/// edge opacity (spec §4.5 "the runtime multiplies the first and last
/// output pixel by the horizontal edge opacities"). A no-op at opacity 256
/// (the common case: sub-pixel-aligned placement).
pub fn apply_edge_opacity(row: &mut [Wide], first: u32, last: u32, mask: u32) {
    if row.is_empty() {
        return;
    }
    if first != 256 {
        row[0] = scale_pixel(row[0], first, mask);
    }
    let n = row.len();
    if n > 1 && last != 256 {
        row[n - 1] = scale_pixel(row[n - 1], last, mask);
    } else if n == 1 && last != 256 && first == 256 {
        // Degenerate 1-pixel placement: both opacities apply to the same pixel.
        row[0] = scale_pixel(row[0], last, mask);
    }
}

fn scale_pixel(px: Wide, opacity: u32, mask: u32) -> Wide {
    let mut ch = [0u32; 4];
    for c in 0..4 {
        ch[c] = ((px.ch[c] * opacity) >> 8) & mask;
    }
    Wide { ch }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precalc::build_bilinear;

    #[test]
    fn bilinear_constant_row_is_unchanged() {
        let src = vec![Wide::new(10, 20, 30, 255); 10];
        let precalc = build_bilinear(9, 4, 1, 0);
        let mut dst = vec![Wide::ZERO; 4];
        bilinear(&src, &precalc, 1, 0xff, &mut dst);
        for px in &dst {
            assert_eq!(px.ch, [10, 20, 30, 255]);
        }
    }

    #[test]
    fn edge_opacity_halves_first_pixel() {
        let mut row = vec![Wide::new(255, 255, 255, 255), Wide::new(255, 255, 255, 255)];
        apply_edge_opacity(&mut row, 128, 256, 0xff);
        assert_eq!(row[0].ch[0], 127);
        assert_eq!(row[1].ch[0], 255);
    }
}
