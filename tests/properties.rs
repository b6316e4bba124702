//! End-to-end property and scenario tests against the public API (spec §8
//! "Testable properties" and "Concrete end-to-end scenarios").
//!
//! Fixed worked examples live alongside the `#[quickcheck]` fuzz-style
//! invariant checks in this one file, matching how the reference test suite
//! keeps fuzz and example coverage together rather than splitting them
//! across files.

use pixscale::{CompositeOp, Flags, Placement, PixelFormat, Rgba8, ScaleCtx};
use quickcheck_macros::quickcheck;

fn solid(w: u32, h: u32, bpp: usize, px: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; (w as usize) * (h as usize) * bpp];
    for chunk in buf.chunks_mut(bpp) {
        chunk.copy_from_slice(px);
    }
    buf
}

// --- Scenario 1: 1x1 -> 4x4, copy -------------------------------------------

#[test]
fn scenario_1_single_pixel_fills_canvas() {
    let src = [255u8, 0, 0, 255];
    let mut dst = vec![0u8; 4 * 4 * 4];
    let ctx = ScaleCtx::simple(PixelFormat::Rgba, 1, 1, 4, PixelFormat::Rgba, 4, 4, 16, Flags::NONE).unwrap();
    ctx.render_rows(&src, &mut dst, 0, 4);
    for px in dst.chunks(4) {
        assert_eq!(px, [255, 0, 0, 255]);
    }
}

// --- Scenario 2: 2x1 -> 4x1, bilinear magnify -------------------------------

#[test]
fn scenario_2_magnify_is_monotone_and_matches_endpoints() {
    let src = [0u8, 0, 0, 255, 255, 255, 255, 255];
    let mut dst = vec![0u8; 4 * 4];
    let ctx = ScaleCtx::simple(PixelFormat::Rgba, 2, 1, 8, PixelFormat::Rgba, 4, 1, 16, Flags::NONE).unwrap();
    ctx.render_rows(&src, &mut dst, 0, 1);
    let gray = |i: usize| dst[i * 4];
    assert_eq!(gray(0), 0, "dst[0] should match src[0]");
    assert_eq!(gray(3), 255, "dst[3] should match src[1]");
    assert!(gray(0) <= gray(1) && gray(1) <= gray(2) && gray(2) <= gray(3), "middle pixels must be monotone");
}

// --- Scenario 3: 4x1 -> 1x1, downscale average ------------------------------

#[test]
fn scenario_3_downscale_approximates_arithmetic_mean() {
    // A 4x ratio falls below the 8x box-filter threshold (spec §3
    // "Invariants"), so this takes one halving-bilinear step; the result is
    // within the 1 LSB rounding bound the spec allows for that path (§9
    // Open Question (a)) of the true mean 139 rather than exactly equal.
    let mut src = Vec::new();
    for v in [0u8, 100, 200, 255] {
        src.extend_from_slice(&[v, v, v, 255]);
    }
    let mut dst = vec![0u8; 4];
    let ctx = ScaleCtx::simple(PixelFormat::RgbaUnassoc, 4, 1, 16, PixelFormat::RgbaUnassoc, 1, 1, 4, Flags::NONE).unwrap();
    ctx.render_rows(&src, &mut dst, 0, 1);
    assert!((dst[0] as i32 - 139).abs() <= 1, "dst[0]={}", dst[0]);
    assert_eq!(dst[3], 255);
}

// --- True box-filter selection: ratio > 8x ----------------------------------

#[test]
fn box_downscale_beyond_eight_to_one_is_exact_mean() {
    // 20 source pixels -> 1 destination pixel is a 20x ratio, comfortably
    // past the 8x threshold that selects the box filter, so this is an
    // exact arithmetic mean rather than an approximation.
    let vals: Vec<u8> = (0..20).map(|i| (i * 255 / 19) as u8).collect();
    let mean = (vals.iter().map(|&v| v as u32).sum::<u32>() + 10) / 20;
    let mut src = Vec::new();
    for &v in &vals {
        src.extend_from_slice(&[v, v, v, 255]);
    }
    let mut dst = vec![0u8; 4];
    let ctx = ScaleCtx::simple(PixelFormat::RgbaUnassoc, 20, 1, 80, PixelFormat::RgbaUnassoc, 1, 1, 4, Flags::NONE).unwrap();
    ctx.render_rows(&src, &mut dst, 0, 1);
    assert!((dst[0] as i32 - mean as i32).abs() <= 1, "dst[0]={} mean={}", dst[0], mean);
    assert_eq!(dst[3], 255);
}

// --- Scenario 4: sub-pixel placement ----------------------------------------

#[test]
fn scenario_4_subpixel_placement_produces_edge_opacity() {
    let src = solid(2, 2, 4, &[255, 255, 255, 255]);
    let mut dst = vec![9u8; 4 * 4 * 4]; // poisoned, so untouched bytes would fail below
    let placement = Placement { x_spx: 128, y_spx: 0, w_spx: 512, h_spx: 512 };
    let ctx = ScaleCtx::new_full(
        PixelFormat::Rgba,
        2,
        2,
        8,
        PixelFormat::Rgba,
        4,
        4,
        16,
        placement,
        CompositeOp::SrcClearDest,
        Rgba8::default(),
        Flags::NONE,
        None,
    )
    .unwrap();
    ctx.render_rows(&src, &mut dst, 0, 1);

    let px = |col: usize| &dst[col * 4..col * 4 + 4];
    assert_eq!(px(1), [255, 255, 255, 255], "fully interior column is opaque white");
    assert_eq!(px(3), [0, 0, 0, 0], "column past the placement is cleared to backing color");
    let a0 = px(0)[3];
    let a2 = px(2)[3];
    assert!((120..=136).contains(&a0), "leading edge column carries partial coverage, got alpha {a0}");
    assert!((120..=136).contains(&a2), "trailing edge column carries partial coverage, got alpha {a2}");
}

// --- Scenario 5 / spec §8 "Round-trip alpha" --------------------------------

#[quickcheck]
fn round_trip_alpha_through_premul16_is_exact(r: u8, g: u8, b: u8, a: u8) -> bool {
    if a == 0 {
        return true; // covered separately by the transparent-preservation property
    }
    let src = [r, g, b, a];
    let mut dst = [0u8; 4];
    // RgbaUnassoc -> ArgbUnassoc forces the premul-16 internal form (both
    // ends unassociated, spec §4.3 step 2) and differs in channel order, so
    // the identity memcpy fast path never triggers.
    let ctx = ScaleCtx::simple(PixelFormat::RgbaUnassoc, 1, 1, 4, PixelFormat::ArgbUnassoc, 1, 1, 4, Flags::NONE).unwrap();
    ctx.render_rows(&src, &mut dst, 0, 1);
    dst == [a, r, g, b]
}

// --- spec §8 "Transparent preservation" -------------------------------------

#[quickcheck]
fn transparent_source_pixel_stays_transparent(r: u8, g: u8, b: u8) -> bool {
    let src = [r, g, b, 0];
    let mut dst = [9u8; 4];
    let ctx = ScaleCtx::simple(PixelFormat::RgbaUnassoc, 1, 1, 4, PixelFormat::Rgba, 1, 1, 4, Flags::NONE).unwrap();
    ctx.render_rows(&src, &mut dst, 0, 1);
    dst == [0, 0, 0, 0]
}

// --- spec §8 "sRGB reversibility" -------------------------------------------

#[test]
fn srgb_reversibility_holds_for_every_8_bit_level() {
    // Exercised indirectly through the public pipeline: enabling
    // linearization on an opaque identity-dimension scale must not move any
    // channel by more than the 1 LSB the reversibility bound allows (the
    // LUT-level exact round trip is unit-tested in `src/fixed.rs`).
    for v in 0..=255u8 {
        let src = [v, v, v, 255];
        let mut linear = [0u8; 4];
        let mut compressed = [0u8; 4];
        let ctx_linear = ScaleCtx::simple(PixelFormat::Rgba, 1, 1, 4, PixelFormat::Bgra, 1, 1, 4, Flags::NONE).unwrap();
        let ctx_compressed = ScaleCtx::simple(PixelFormat::Rgba, 1, 1, 4, PixelFormat::Bgra, 1, 1, 4, Flags::DISABLE_SRGB_LINEARIZATION).unwrap();
        ctx_linear.render_rows(&src, &mut linear, 0, 1);
        ctx_compressed.render_rows(&src, &mut compressed, 0, 1);
        for c in 0..3 {
            assert!((linear[c] as i32 - compressed[c] as i32).abs() <= 1, "channel {c} diverged by more than 1 LSB at v={v}");
        }
    }
}

// --- spec §8 "Constant image" -----------------------------------------------

#[quickcheck]
fn constant_image_box_downscale_is_unchanged(v: u8) -> bool {
    // 20x ratio clears the 8x box-filter threshold (spec §3 "Invariants");
    // box averaging a constant image reproduces it exactly, with no
    // halving-bilinear rounding slack to account for.
    let src = solid(20, 20, 4, &[v, v, v, 255]);
    let mut dst = vec![0u8; 2 * 2 * 4];
    let ctx = ScaleCtx::simple(PixelFormat::Rgba, 20, 20, 80, PixelFormat::Rgba, 2, 2, 8, Flags::NONE).unwrap();
    ctx.render_rows(&src, &mut dst, 0, 2);
    dst.chunks(4).all(|px| px == [v, v, v, 255])
}

#[quickcheck]
fn constant_image_halving_bilinear_within_one_lsb(v: u8) -> bool {
    let src = solid(16, 1, 4, &[v, v, v, 255]);
    let mut dst = vec![0u8; 3 * 4];
    let ctx = ScaleCtx::simple(PixelFormat::Rgba, 16, 1, 64, PixelFormat::Rgba, 3, 1, 12, Flags::NONE).unwrap();
    ctx.render_rows(&src, &mut dst, 0, 1);
    dst.chunks(4).all(|px| (px[0] as i32 - v as i32).abs() <= 1 && px[3] == 255)
}

// --- spec §8 "Edge opacity" --------------------------------------------------

#[test]
fn aligned_placement_has_full_edge_opacity() {
    let src = solid(4, 4, 4, &[10, 20, 30, 255]);
    let mut dst = vec![0u8; 4 * 4 * 4];
    let placement = Placement::full(4, 4);
    let ctx = ScaleCtx::new_full(
        PixelFormat::Rgba,
        4,
        4,
        16,
        PixelFormat::Rgba,
        4,
        4,
        16,
        placement,
        CompositeOp::Src,
        Rgba8::default(),
        Flags::NONE,
        None,
    )
    .unwrap();
    ctx.render_rows(&src, &mut dst, 0, 4);
    assert_eq!(src, dst);
}

// --- spec §8 "Separability" / "Commutativity over row sets" ----------------

#[quickcheck]
fn separability_split_rendering_matches_single_call(split: u8) -> bool {
    let (src_w, src_h) = (10u32, 7u32);
    let (dst_w, dst_h) = (6u32, 5u32);
    let src = gradient(src_w, src_h);
    let ctx = ScaleCtx::simple(PixelFormat::Rgba, src_w, src_h, src_w as usize * 4, PixelFormat::Rgba, dst_w, dst_h, dst_w as usize * 4, Flags::NONE).unwrap();

    let mut whole = vec![0u8; (dst_w * dst_h * 4) as usize];
    ctx.render_rows(&src, &mut whole, 0, dst_h);

    let split = (split % dst_h as u8) as u32;
    let mut parts = vec![0u8; (dst_w * dst_h * 4) as usize];
    ctx.render_rows(&src, &mut parts, 0, split);
    ctx.render_rows(&src, &mut parts, split, dst_h - split);

    whole == parts
}

#[quickcheck]
fn commutativity_row_order_does_not_affect_output(seed: u8) -> bool {
    let (src_w, src_h) = (9u32, 6u32);
    let (dst_w, dst_h) = (5u32, 4u32);
    let src = gradient(src_w, src_h);
    let ctx = ScaleCtx::simple(PixelFormat::Rgba, src_w, src_h, src_w as usize * 4, PixelFormat::Rgba, dst_w, dst_h, dst_w as usize * 4, Flags::NONE).unwrap();

    let mut forward = vec![0u8; (dst_w * dst_h * 4) as usize];
    ctx.render_rows(&src, &mut forward, 0, dst_h);

    // Render the same disjoint rows in reverse order into a fresh buffer.
    let mut backward = vec![0u8; (dst_w * dst_h * 4) as usize];
    let mut rows: Vec<u32> = (0..dst_h).collect();
    // Deterministic pseudo-shuffle keyed by `seed`, avoiding a `rand` dependency
    // for one reordering in a property test.
    for i in (1..rows.len()).rev() {
        let j = (seed as usize + i * 7) % (i + 1);
        rows.swap(i, j);
    }
    for row in rows {
        ctx.render_rows(&src, &mut backward, row, 1);
    }

    forward == backward
}

fn gradient(w: u32, h: u32) -> Vec<u8> {
    let mut buf = vec![0u8; (w * h * 4) as usize];
    for y in 0..h {
        for x in 0..w {
            let i = ((y * w + x) * 4) as usize;
            buf[i] = (x * 255 / w.max(1)) as u8;
            buf[i + 1] = (y * 255 / h.max(1)) as u8;
            buf[i + 2] = 128;
            buf[i + 3] = 255;
        }
    }
    buf
}
