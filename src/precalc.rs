//! Per-dimension filter selection, precalc tables and placement/edge-opacity
//! derivation (spec §3 "Invariants"/"Placement", §4.2).

use crate::fixed::{BILIN_MUL, BOXES_MUL};

/// Sub-pixel unit: 1 px = 256 spx (spec §4.1).
pub const SUBPIXEL: i64 = 256;

/// Which of the three filter families a dimension uses, and its parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterKind {
    /// Exact 1:1 sub-pixel-aligned copy.
    Copy,
    /// Single source pixel replicated across the whole dimension.
    One,
    /// Recursive-halving bilinear, `halvings` in `0..=6`.
    Bilinear { halvings: u32 },
    /// Area/box average.
    Box,
}

/// Chooses a filter family for one dimension per spec §3 "Invariants".
///
/// `src_spx`/`dst_spx` are the *placement* extents in sub-pixels (the size
/// actually being resampled into, after clipping — see `resolve_axis`), and
/// `offset_spx` is the placement's sub-pixel offset used only to test
/// copy-path alignment.
pub fn select_filter(src_px: u32, dst_px: u32, src_spx: i64, dst_spx: i64, offset_spx: i64) -> FilterKind {
    if src_px == 0 || dst_px == 0 {
        return FilterKind::One;
    }
    let src_spx_u = src_spx.max(1);
    let dst_spx_u = dst_spx.max(1);
    if src_spx_u > 255 * dst_spx_u {
        return FilterKind::Box;
    }
    if src_spx_u > 8 * dst_spx_u {
        return FilterKind::Box;
    }
    if src_px <= 1 {
        return FilterKind::One;
    }
    if src_px == dst_px && offset_spx % SUBPIXEL == 0 {
        return FilterKind::Copy;
    }
    // Smallest k such that dst_spx * 2^(k+1) >= src_spx (spec §3), capped at
    // 6; doubling from dst_spx itself (rather than from k=0) so magnifying
    // axes always land on k=0.
    let mut k = 0u32;
    let mut d = dst_spx_u;
    while k < 6 {
        d *= 2;
        if d >= src_spx_u {
            break;
        }
        k += 1;
    }
    FilterKind::Bilinear { halvings: k }
}

/// One (offset, weight) sample pair for the bilinear precalc (spec §4.2).
#[derive(Clone, Copy, Debug, Default)]
pub struct BilinearPair {
    /// Source pixel index; the implicit second sample is `off + 1`.
    pub off: u32,
    /// Weight of `off` in `[0, 256]`; `off + 1`'s weight is `256 - w`.
    pub w: u16,
}

/// Bilinear precalc table: `2^k * dest_px` sample pairs (spec §4.2
/// "Precalc tables are sized for the pre-halving destination dimension").
#[derive(Clone, Debug)]
pub struct BilinearPrecalc {
    pub halvings: u32,
    /// Row-major: `pairs[output_pixel * 2^k + sub_index]`.
    pub pairs: Vec<BilinearPair>,
}

/// Builds the bilinear precalc for one dimension.
///
/// `src_px` is the source pixel count, `dest_px` the *final* (post-halving)
/// placement pixel count, `k` the halving count chosen by `select_filter`.
/// Clip range `[clip_lo, clip_hi)` is in pre-halving output-pixel units;
/// pixels outside it are not generated (spec §4.2 "Output indices outside
/// the requested clip range are skipped") — in this crate the clip range is
/// always the full pre-halving range since placement clipping is handled by
/// the caller choosing `dest_px`/`offset` before precalc is built, but the
/// parameter is kept so partial-table regeneration stays possible.
pub fn build_bilinear(src_px: u32, dest_px: u32, k: u32, offset_spx: i64) -> BilinearPrecalc {
    let src_spx = (src_px as i64) * SUBPIXEL;
    let pre_halve_dest: u64 = (dest_px as u64) << k;
    // The sample step and starting offset are derived against the
    // *pre-halving* destination extent (`dest_px << k` pixels), not the
    // final one: each halving doubles the number of rows/columns actually
    // sampled before the adjacent-pair averaging pass collapses them back
    // down, so the sampling density — and therefore `step` — must scale
    // with it. Grounded on `init_dim` in `smolscale.c`, which threads
    // `placement_size_prehalving_spx` (not `placement_size_spx`) into
    // `precalc_bilinear_array`'s `dest_dim_spx` parameter.
    let pre_dest_spx = (pre_halve_dest as i64) * SUBPIXEL;

    let mut pairs = Vec::with_capacity(pre_halve_dest as usize);
    if pre_halve_dest == 0 || src_px == 0 {
        return BilinearPrecalc { halvings: k, pairs };
    }

    let magnify = src_spx <= pre_dest_spx;
    let (step, first_offset) = if !magnify {
        // Minification: step = (src_spx * bilinMul) / pre_dest_spx; first
        // sample offset = (step - bilinMul) / 2 (spec §4.2).
        let step = (src_spx as i128 * BILIN_MUL as i128) / (pre_dest_spx as i128).max(1);
        let first = (step - BILIN_MUL as i128) / 2;
        (step, first)
    } else {
        // Magnification: step = ((src_spx - subpixMul) * bilinMul) / max(pre_dest_spx - subpixMul, 1); start at 0.
        let denom = (pre_dest_spx - SUBPIXEL).max(1);
        let step = ((src_spx - SUBPIXEL) as i128 * BILIN_MUL as i128) / denom as i128;
        (step, 0i128)
    };

    // The tail fringe uses a symmetric offset derived from the total
    // source span so the last interpolation never reads past `src_px - 1`.
    // We derive it by running the main formula and then clamping/mirroring
    // the final samples so `off + 1 <= src_px - 1` always holds.
    let max_off = src_px.saturating_sub(2).max(0);

    // Sub-pixel placement offset contributes a constant shift to every
    // sample position, at the same BILIN_MUL precision as `step` (1 spx ==
    // BIG_MUL precalc units, since BILIN_MUL == SUBPIXEL * BIG_MUL).
    let offset_shift = (offset_spx.rem_euclid(SUBPIXEL) as i128) * crate::fixed::BIG_MUL as i128;

    for i in 0..pre_halve_dest {
        let pos_spx = first_offset + step * i as i128 + offset_shift;
        let pos = pos_spx.max(0);
        let off_full = pos / BILIN_MUL as i128;
        let off_clamped = off_full.clamp(0, max_off as i128);
        // When the ideal sample position falls outside the table's valid
        // `off` range, the clamp must also saturate the weight rather than
        // keep the in-range fractional weight computed against the
        // unclamped position — otherwise the last (or first) output pixel
        // would blend toward the wrong neighbor instead of reproducing the
        // source's last (or first) pixel exactly (spec §4.2 "the last
        // interpolation never reads past srcPx - 1").
        let w = if off_full > off_clamped {
            0u16
        } else if off_full < off_clamped {
            SUBPIXEL as u16
        } else {
            let frac = ((pos - off_full * BILIN_MUL as i128).clamp(0, BILIN_MUL as i128 - 1)) as i64;
            // frac is in [0, BILIN_MUL); weight is the *first* sample's
            // share, i.e. w = 256 - frac/BIG_MUL (off's share shrinks as
            // frac grows).
            let frac_small = (frac / crate::fixed::BIG_MUL) as i64; // in [0, 256)
            (SUBPIXEL - frac_small).clamp(0, SUBPIXEL) as u16
        };
        let off = off_clamped as u32;
        pairs.push(BilinearPair { off, w });
    }

    BilinearPrecalc { halvings: k, pairs }
}

/// Box-filter precalc for one dimension: per-output starting sub-pixel
/// offset plus the two per-dimension scalars `span_step`/`span_mul` (spec
/// §4.2). `starts`/`span_step` are plain sub-pixel (spx) units; the first
/// entry is always `0` and the last is pinned to `src_spx - span_step`, so
/// the window never reads past `src_px` and the first window never starts
/// before it, mirroring how chafa's `smolscale` pins its left/right
/// fringes instead of deriving them from the same per-pixel accumulator as
/// the main range (`precalc_boxes_array` in `smolscale-generic.c`).
#[derive(Clone, Debug)]
pub struct BoxPrecalc {
    /// Starting spx offset of output pixel `i`'s source window.
    pub starts: Vec<i64>,
    /// How far the source window advances per output pixel, spx units.
    pub span_step: i64,
    /// Reciprocal window area, fixed-point at `BOXES_MUL` precision.
    pub span_mul: u32,
}

pub fn build_box(src_px: u32, dest_px: u32, offset_spx: i64) -> BoxPrecalc {
    if dest_px == 0 || src_px == 0 {
        return BoxPrecalc { starts: Vec::new(), span_step: 0, span_mul: 0 };
    }
    let src_spx = src_px as i64 * SUBPIXEL;
    // A destination sample can't be smaller than a pixel; fringe opacity is
    // applied separately by the edge-opacity step (spec §4.2/§4.6).
    let dest_spx = (dest_px as i64 * SUBPIXEL).max(SUBPIXEL);
    let dest_ofs_spx = offset_spx.rem_euclid(SUBPIXEL);

    let frac_step_big = (src_spx as i128 * BIG_MUL as i128) / dest_spx as i128;
    let span_step = (frac_step_big / crate::fixed::SMALL_MUL as i128) as i64;

    // span_mul = (BOXES_MUL*255 + b/2) / (b+1); the +1 avoids accumulator
    // overflow in the 128bpp halving path downstream and is compensated by
    // 8-bit output rounding (spec §4.2 "the +1 in the denominator").
    let stride = frac_step_big / BIG_MUL as i128;
    let frac = span_step.rem_euclid(crate::fixed::SMALL_MUL);
    let a = BOXES_MUL as i128 * 255;
    let b = stride * 255 + (frac as i128 * 255) / 256;
    let span_mul = ((a + b / 2) / (b + 1)) as u32;

    let mut starts = vec![0i64; dest_px as usize];
    if dest_px > 1 {
        let mut frac_f = (frac_step_big * (SUBPIXEL as i128 - dest_ofs_spx as i128)) / SUBPIXEL as i128;
        for start in starts.iter_mut().take(dest_px as usize - 1).skip(1) {
            *start = (frac_f / crate::fixed::SMALL_MUL as i128) as i64;
            frac_f += frac_step_big;
        }
        starts[dest_px as usize - 1] = src_spx - span_step;
    }

    BoxPrecalc { starts, span_step, span_mul }
}

/// A fully-covered-pixel-count window derived from a box precalc entry at
/// render time (spec §4.5 "box"): `off0`/`off1` are the first and last
/// *source pixel* indices the window touches (the row's `+1` padding pixel
/// may be `off1` with `f1 == 0`, matching spec §4.5's padded input row),
/// `f0`/`f1` are their partial 8-bit coverage weights, and `n` is the count
/// of fully-covered pixels strictly between them.
#[derive(Clone, Copy, Debug, Default)]
pub struct BoxWindow {
    pub off0: u32,
    pub off1: u32,
    pub f0: u16,
    pub f1: u16,
    pub n: u32,
}

/// Resolves one box window from the precalc's stored start and span_step.
/// Grounded on `unpack_box_precalc` in `smolscale-generic.c`: `f0` is the
/// coverage of the *leading* partial pixel (`256 - start % 256`) and `f1`
/// is the coverage of the *trailing* one (`end % 256`) — not symmetric,
/// since a window that ends exactly on a pixel boundary contributes zero
/// weight to the pixel just past it rather than full weight to the last
/// pixel inside it.
pub fn box_window(precalc: &BoxPrecalc, i: usize, src_px: u32) -> BoxWindow {
    let start = precalc.starts[i].max(0);
    let end = start + precalc.span_step;

    let off0 = (start / SUBPIXEL) as u32;
    let off1 = (end / SUBPIXEL) as u32;
    let f0 = (256 - start % SUBPIXEL) as u16;
    let f1 = (end % SUBPIXEL) as u16;
    let n = off1.saturating_sub(off0 + 1);

    // The trailing sample may land on the row's padding pixel (off1 ==
    // src_px); clamp the index but keep f1 (already 0 in that exact case,
    // since `end` lands on a multiple of SUBPIXEL) so no extra weight leaks
    // onto the clamped-to pixel.
    let off1 = off1.min(src_px);

    BoxWindow { off0, off1, f0, f1, n }
}

/// Per-axis placement resolution (spec §3 "Placement"): each dimension
/// carries source size, canvas size, placement offset and placement size,
/// all sub-pixel, plus the integer clip/clear counts and edge opacities
/// derived from them.
#[derive(Clone, Copy, Debug)]
pub struct AxisLayout {
    /// Placement's leading pixels that fall entirely off-canvas and are not
    /// rendered at all (placement offset negative enough to run past the
    /// canvas start).
    pub clip_before_px: u32,
    /// Placement's trailing pixels that fall entirely off-canvas.
    pub clip_after_px: u32,
    /// Canvas margin pixels before the (clipped) placement that carry no
    /// placement content and must be filled with the backing color.
    pub clear_before_px: u32,
    /// Canvas margin pixels after the (clipped) placement.
    pub clear_after_px: u32,
    /// First canvas pixel index actually covered by rendered placement
    /// content (`clear_before_px`, equivalently).
    pub placement_start_px: u32,
    /// Number of canvas pixels actually covered by rendered placement
    /// content (placement size minus both clips).
    pub placement_px: u32,
    /// Fractional coverage, in `[0, 256]`, of the first *unclipped*
    /// placement pixel (spec §4.5/§4.6 "edge opacities"); applied even if
    /// that pixel itself is clipped away, since precalc tables are built
    /// over the full pre-clip placement extent.
    pub edge_opacity_first: u32,
    /// Fractional coverage, in `[0, 256]`, of the last unclipped placement
    /// pixel.
    pub edge_opacity_last: u32,
    /// Pixel count of the placement before clipping, used to size precalc
    /// tables (spec §4.2 "precalc tables are sized for the pre-halving
    /// destination dimension", here further "pre-clip").
    pub placement_size_px: u32,
}

fn floor_div_256(x: i64) -> i64 {
    if x < 0 {
        (x - (SUBPIXEL - 1)) / SUBPIXEL
    } else {
        x / SUBPIXEL
    }
}

/// Resolves clipping/clearing/edge-opacity for one axis.
///
/// `canvas_px` is the destination buffer's extent in that dimension,
/// `offset_spx`/`size_spx` the placement's sub-pixel offset (may be
/// negative) and extent (may be `<= 0`, meaning a degenerate placement per
/// spec §7 "Degenerate placements"). Grounded on chafa's
/// `smolscale`'s `pick_filter_params` and the dimension-init sequence in
/// `smolscale.c`, adapted from that code's pixel-count clip bookkeeping to
/// this crate's explicit-struct style.
pub fn resolve_axis(canvas_px: u32, offset_spx: i64, size_spx: i64) -> AxisLayout {
    if size_spx <= 0 {
        return AxisLayout {
            clip_before_px: 0,
            clip_after_px: 0,
            clear_before_px: canvas_px,
            clear_after_px: 0,
            placement_start_px: 0,
            placement_px: 0,
            edge_opacity_first: 256,
            edge_opacity_last: 256,
            placement_size_px: 0,
        };
    }

    // Edge opacities: the fractional coverage of the placement's first and
    // last sub-pixel-aligned pixel, independent of clipping.
    let (mut edge_opacity_first, mut edge_opacity_last) = (
        ((-offset_spx - 1).rem_euclid(SUBPIXEL) + 1) as u32,
        ((offset_spx + size_spx - 1).rem_euclid(SUBPIXEL) + 1) as u32,
    );

    let placement_ofs_px = floor_div_256(offset_spx);
    let placement_size_px = {
        let with_frac = size_spx + offset_spx.rem_euclid(SUBPIXEL);
        ((with_frac + SUBPIXEL - 1) / SUBPIXEL) as u32
    };

    if placement_size_px <= 1 {
        // A placement that fits within a single destination pixel has no
        // "first vs. last" distinction; the whole sub-pixel extent is one
        // partial-coverage pixel.
        edge_opacity_first = size_spx.clamp(0, SUBPIXEL) as u32;
        edge_opacity_last = 256;
    }

    let clip_before_px = (-placement_ofs_px).max(0) as u32;
    let placement_end_px = placement_ofs_px + placement_size_px as i64;
    let clip_after_px = (placement_end_px - canvas_px as i64).max(0) as u32;
    let clip_before_px = clip_before_px.min(placement_size_px);
    let clip_after_px = clip_after_px.min(placement_size_px - clip_before_px);

    let placement_start_px = placement_ofs_px.max(0).min(canvas_px as i64) as u32;
    let placement_px = placement_size_px - clip_before_px - clip_after_px;
    let placement_px = placement_px.min(canvas_px.saturating_sub(placement_start_px));

    let clear_before_px = placement_start_px;
    let clear_after_px = canvas_px - placement_start_px - placement_px;

    AxisLayout {
        clip_before_px,
        clip_after_px,
        clear_before_px,
        clear_after_px,
        placement_start_px,
        placement_px,
        edge_opacity_first,
        edge_opacity_last,
        placement_size_px,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_placement_has_full_edge_opacity() {
        let axis = resolve_axis(4, 0, 4 * SUBPIXEL);
        assert_eq!(axis.edge_opacity_first, 256);
        assert_eq!(axis.edge_opacity_last, 256);
        assert_eq!(axis.placement_px, 4);
    }

    #[test]
    fn subpixel_placement_matches_worked_example() {
        // src 2x2, canvas 4x4, placement offset (128,0) spx, size (512,512)
        // spx: columns 0 and 2 carry half opacity, column 1 is full, column
        // 3 is outside the placement entirely.
        let axis = resolve_axis(4, 128, 512);
        assert_eq!(axis.placement_start_px, 0);
        assert_eq!(axis.placement_px, 3);
        assert_eq!(axis.clip_before_px, 0);
        assert_eq!(axis.clip_after_px, 0);
        assert_eq!(axis.clear_before_px, 0);
        assert_eq!(axis.clear_after_px, 1);
        assert_eq!(axis.edge_opacity_first, 128);
        assert_eq!(axis.edge_opacity_last, 128);
    }

    #[test]
    fn negative_offset_clips_leading_pixels() {
        let axis = resolve_axis(4, -300, 4 * SUBPIXEL);
        assert_eq!(axis.clip_before_px, 2);
        assert_eq!(axis.clear_before_px, 0);
    }

    #[test]
    fn bilinear_offsets_are_monotone() {
        let pre = build_bilinear(100, 30, 0, 0);
        let mut last = 0u32;
        for p in &pre.pairs {
            assert!(p.off >= last);
            last = p.off;
        }
    }

    #[test]
    fn filter_selection_large_downscale_uses_box() {
        assert_eq!(select_filter(10_000, 10, 10_000 * SUBPIXEL, 10 * SUBPIXEL, 0), FilterKind::Box);
    }

    #[test]
    fn filter_selection_single_source_pixel_uses_one() {
        assert_eq!(select_filter(1, 10, SUBPIXEL, 10 * SUBPIXEL, 0), FilterKind::One);
    }

    #[test]
    fn filter_selection_exact_copy() {
        assert_eq!(select_filter(10, 10, 10 * SUBPIXEL, 10 * SUBPIXEL, 0), FilterKind::Copy);
    }
}
