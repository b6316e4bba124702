//! Vertical filter variants and the local-context slot-swap state machine
//! (spec §4.6, §4.8 "State machine").
//!
//! Rows are produced one at a time from the caller's perspective
//! (`render_row`); the heavy reuse opportunity is the bilinear path, where
//! consecutive output rows usually need one source row in common with the
//! previous one. `LocalCtx` is the mutable scratch state spec §5 says is
//! "owned by a single rendering call" — a fresh one per `render_rows`
//! invocation, never shared across concurrent calls.

use crate::fixed::{BOXES_MUL, BOXES_SHIFT};
use crate::internal::Wide;
use crate::precalc::{box_window, BilinearPrecalc, BoxPrecalc};

/// Per-call mutable scratch state: the two bilinear source-row slots, the
/// `one`-filter cache, a box accumulator wide enough to avoid overflow, and
/// the `src_ofs` cache described in spec §4.8's state machine.
pub struct LocalCtx {
    width: usize,
    /// `slots[0]`/`slots[1]` hold the horizontally-filtered source rows at
    /// `src_ofs`/`src_ofs + 1` respectively.
    slots: [Vec<Wide>; 2],
    /// Cached source row index backing `slots[0]`; `None` is the "none"
    /// sentinel (spec's `UINT_MAX - 1`, represented natively here).
    src_ofs: Option<u32>,
    /// Vertical-bilinear halving accumulator (k > 0 path).
    accum: Vec<Wide>,
    /// Vertical-box accumulator; wide to avoid overflow across a tall box
    /// window of 11-bit linear channels at 256-per-pixel weight.
    box_accum: Vec<[u64; 4]>,
    /// Scratch row reused by the box path so it never aliases `slots`.
    box_tmp: Vec<Wide>,
    /// `one`-filter result, computed once and reused for every row.
    one_cache: Option<Vec<Wide>>,
}

impl LocalCtx {
    pub fn new(width: usize) -> Self {
        LocalCtx {
            width,
            slots: [vec![Wide::ZERO; width], vec![Wide::ZERO; width]],
            src_ofs: None,
            accum: vec![Wide::ZERO; width],
            box_accum: vec![[0u64; 4]; width],
            box_tmp: vec![Wide::ZERO; width],
            one_cache: None,
        }
    }

    /// Ensures `slots[0]`/`slots[1]` hold source rows `off`/`off + 1`,
    /// horizontally filtering only what changed (spec §4.8 state machine).
    fn ensure_slots(&mut self, off: u32, horiz: &mut dyn FnMut(u32, &mut [Wide])) {
        match self.src_ofs {
            Some(cached) if cached == off => {}
            Some(cached) if cached + 1 == off => {
                self.slots.swap(0, 1);
                horiz(off + 1, &mut self.slots[1]);
            }
            _ => {
                horiz(off, &mut self.slots[0]);
                horiz(off + 1, &mut self.slots[1]);
            }
        }
        self.src_ofs = Some(off);
    }
}

/// Horizontally scales source row `row` straight into `dst` (spec §4.6
/// "copy": "horizontally scale source row `j` directly into the output").
pub fn copy_row(row: u32, horiz: &mut dyn FnMut(u32, &mut [Wide]), dst: &mut [Wide]) {
    horiz(row, dst);
}

/// Horizontally scales source row 0 exactly once and caches it (spec §4.6
/// "one"); every subsequent call for the same `LocalCtx` is a cheap copy.
pub fn one_row(ctx: &mut LocalCtx, horiz: &mut dyn FnMut(u32, &mut [Wide]), dst: &mut [Wide]) {
    if ctx.one_cache.is_none() {
        let mut row = vec![Wide::ZERO; ctx.width];
        horiz(0, &mut row);
        ctx.one_cache = Some(row);
    }
    dst.copy_from_slice(ctx.one_cache.as_ref().unwrap());
}

/// Recursive-halving vertical bilinear (spec §4.6 "bilinear k-halving"): for
/// `k = 0`, a single `lerp` between the two cached source rows; for `k > 0`,
/// `2^k` such lerps averaged by a right shift.
pub fn bilinear_row(ctx: &mut LocalCtx, row: usize, precalc: &BilinearPrecalc, mask: u32, horiz: &mut dyn FnMut(u32, &mut [Wide]), dst: &mut [Wide]) {
    let sub = 1usize << precalc.halvings;
    let pairs = &precalc.pairs[row * sub..row * sub + sub];

    if sub == 1 {
        let pair = pairs[0];
        ctx.ensure_slots(pair.off, horiz);
        for i in 0..ctx.width {
            for c in 0..4 {
                let p = ctx.slots[0][i].ch[c] as i64;
                let q = ctx.slots[1][i].ch[c] as i64;
                let lerp = ((p - q) * pair.w as i64 >> 8) + q;
                dst[i].ch[c] = (lerp as u32) & mask;
            }
        }
        return;
    }

    for a in ctx.accum.iter_mut() {
        *a = Wide::ZERO;
    }
    for &pair in pairs {
        ctx.ensure_slots(pair.off, horiz);
        for i in 0..ctx.width {
            for c in 0..4 {
                let p = ctx.slots[0][i].ch[c] as i64;
                let q = ctx.slots[1][i].ch[c] as i64;
                let lerp = ((p - q) * pair.w as i64 >> 8) + q;
                ctx.accum[i].ch[c] += lerp as u32;
            }
        }
    }
    let halvings = precalc.halvings;
    for i in 0..ctx.width {
        for c in 0..4 {
            dst[i].ch[c] = (ctx.accum[i].ch[c] >> halvings) & mask;
        }
    }
}

/// Vertical box average (spec §4.6 "box"): horizontally filter each source
/// row the window touches once, accumulate with the first/last rows
/// weighted by their partial coverage, normalize by the vertical `span_mul`.
pub fn box_row(ctx: &mut LocalCtx, row: usize, precalc: &BoxPrecalc, src_px: u32, mask: u32, horiz: &mut dyn FnMut(u32, &mut [Wide]), dst: &mut [Wide]) {
    let w = box_window(precalc, row, src_px);
    for a in ctx.box_accum.iter_mut() {
        *a = [0u64; 4];
    }

    horiz(w.off0, &mut ctx.box_tmp);
    for i in 0..ctx.width {
        for c in 0..4 {
            ctx.box_accum[i][c] += (ctx.box_tmp[i].ch[c] as u64 * w.f0 as u64) >> 8;
        }
    }
    for r in (w.off0 + 1)..(w.off0 + 1 + w.n) {
        horiz(r, &mut ctx.box_tmp);
        for i in 0..ctx.width {
            for c in 0..4 {
                ctx.box_accum[i][c] += ctx.box_tmp[i].ch[c] as u64;
            }
        }
    }
    if w.f1 > 0 {
        horiz(w.off1, &mut ctx.box_tmp);
        for i in 0..ctx.width {
            for c in 0..4 {
                ctx.box_accum[i][c] += (ctx.box_tmp[i].ch[c] as u64 * w.f1 as u64) >> 8;
            }
        }
    }

    for i in 0..ctx.width {
        for c in 0..4 {
            let v = (ctx.box_accum[i][c] as i128 * precalc.span_mul as i128 + (BOXES_MUL as i128 >> 1)) >> BOXES_SHIFT;
            dst[i].ch[c] = (v.max(0) as u32) & mask;
        }
    }
}

/// Applies the vertical edge opacity to a just-rendered row, scaling every
/// lane by `opacity / 256` (spec §4.6 "Boundary opacity"). This
/// implementation applies the multiplier as a distinct pass over the whole
/// row rather than folding it into each variant's final shift as the
/// reference's `scale_128bpp_half` macro does — observably identical, and
/// keeps the four filter variants above free of edge-opacity special cases.
pub fn apply_vertical_opacity(row: &mut [Wide], opacity: u32, mask: u32) {
    if opacity == 256 {
        return;
    }
    for px in row.iter_mut() {
        for c in 0..4 {
            px.ch[c] = ((px.ch[c] * opacity) >> 8) & mask;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precalc::build_bilinear;

    fn make_source(rows: usize, width: usize) -> Vec<Vec<Wide>> {
        (0..rows).map(|r| vec![Wide::new(r as u32, 0, 0, 255); width]).collect()
    }

    #[test]
    fn slot_swap_reuses_previous_row() {
        let width = 2;
        let src = make_source(8, width);
        let mut ctx = LocalCtx::new(width);
        let mut horiz_calls = 0u32;

        {
            let mut horiz = |r: u32, out: &mut [Wide]| {
                horiz_calls += 1;
                out.copy_from_slice(&src[r as usize]);
            };
            ctx.ensure_slots(2, &mut horiz);
        }
        assert_eq!(horiz_calls, 2);

        {
            let mut horiz = |r: u32, out: &mut [Wide]| {
                horiz_calls += 1;
                out.copy_from_slice(&src[r as usize]);
            };
            ctx.ensure_slots(3, &mut horiz);
        }
        // Consecutive offset: only the new row (index 4) should be refilled.
        assert_eq!(horiz_calls, 3);
    }

    #[test]
    fn bilinear_k0_matches_manual_lerp() {
        let width = 1;
        let src = make_source(4, width);
        let precalc = build_bilinear(4, 4, 0, 0);
        let mut ctx = LocalCtx::new(width);
        let mut horiz = |r: u32, out: &mut [Wide]| out.copy_from_slice(&src[r as usize]);
        let mut dst = vec![Wide::ZERO; width];
        bilinear_row(&mut ctx, 1, &precalc, 0xff, &mut horiz, &mut dst);
        let pair = precalc.pairs[1];
        let expected = ((pair.off as i64 - (pair.off + 1) as i64) * pair.w as i64 >> 8) + (pair.off + 1) as i64;
        assert_eq!(dst[0].ch[0] as i64, expected);
    }

    #[test]
    fn one_row_is_cached() {
        let width = 1;
        let src = make_source(4, width);
        let mut ctx = LocalCtx::new(width);
        let mut calls = 0u32;
        let mut dst = vec![Wide::ZERO; width];
        {
            let mut horiz = |r: u32, out: &mut [Wide]| {
                calls += 1;
                out.copy_from_slice(&src[r as usize]);
            };
            one_row(&mut ctx, &mut horiz, &mut dst);
            one_row(&mut ctx, &mut horiz, &mut dst);
        }
        assert_eq!(calls, 1);
        assert_eq!(dst[0].ch[0], 0);
    }
}
