//! Fixed-point units and lookup tables (spec §4.1).
//!
//! All scale factors in this crate are expressed in the same handful of
//! fixed-point units the reference uses; centralizing them here keeps the
//! precalc builder, the filters and the compositor from re-deriving shifts
//! by hand in three different places.

use std::sync::OnceLock;

/// 1 pixel = 256 sub-pixels.
pub const SUBPIXEL_SHIFT: u32 = 8;
pub const SUBPIXEL_MUL: i64 = 1 << SUBPIXEL_SHIFT;

/// 8-bit weight multiplier.
pub const SMALL_MUL: i64 = 256;
pub const SMALL_SHIFT: u32 = 8;

/// Fixed-point precision for precalc sample offsets.
pub const BIG_MUL: i64 = 65536;
pub const BIG_SHIFT: u32 = 16;

/// `SMALL_MUL * BIG_MUL`, the precision bilinear precalc positions are
/// expressed in.
pub const BILIN_MUL: i64 = SMALL_MUL * BIG_MUL;
pub const BILIN_SHIFT: u32 = SMALL_SHIFT + BIG_SHIFT;

/// Same magnitude, used for box-filter span arithmetic (spec §4.2).
pub const BOXES_MUL: i64 = SMALL_MUL * BIG_MUL;
pub const BOXES_SHIFT: u32 = SMALL_SHIFT + BIG_SHIFT;

/// Shift applied after multiplying by a `p8`/`p8l` entry (spec §4.1).
pub const INV_DIV_SHIFT: u32 = 16;

/// Four inverse-division LUTs, 256 entries each, indexed by the *original*
/// 8-bit external alpha (spec §4.1: "Four inverse-division LUTs, each 256
/// entries"). The reference (`smolscale`) tabulates these by the same 8-bit
/// alpha even for its 16-bit-premultiplication formats, because the
/// premultiplication factor is always a deterministic function of that
/// 8-bit value — see [`premul16`] below, which multiplies by `alpha + 2`
/// rather than widening alpha to 16 bits first.
pub struct InvDivTables {
    /// Narrow (8-bit channel) premul-8 recovery multiplier.
    pub p8: Vec<u32>,
    /// Linear (11-bit channel) premul-8 recovery multiplier. Numerically
    /// identical to `p8`: the recovery ratio `256 / (alpha + 1)` this
    /// implementation derives is channel-depth-independent, so one
    /// derivation serves both; kept as a separate field for parity with
    /// spec naming.
    pub p8l: Vec<u32>,
    /// Premul-16 reciprocal, kept for structural parity with the
    /// reference's four-table layout. Unlike `p8`/`p8l`, this crate's
    /// premul-16 path ([`unpremul16`]) recovers the channel via direct
    /// integer division by `alpha + 2` instead of this table, because
    /// division by a single scalar divisor is cheap and guarantees the
    /// bit-exact round trip spec §8 requires ("Round-trip alpha") without
    /// depending on a reciprocal-multiply rounding bound. The table is
    /// still built and tested for consumers that want the classic
    /// multiply-shift form.
    pub p16: Vec<u32>,
    /// Linear-channel counterpart of `p16`, same caveat.
    pub p16l: Vec<u32>,
}

fn build_reciprocal(divisor_of: impl Fn(usize) -> u32, shift: u32) -> Vec<u32> {
    let one = 1u64 << shift;
    (0..=255usize)
        .map(|a| {
            let d = divisor_of(a);
            if d == 0 { 0 } else { ((one + d as u64 / 2) / d as u64) as u32 }
        })
        .collect()
}

fn build_inv_div_tables() -> InvDivTables {
    // p8 / p8l: forward is `(c * (a+1)) >> 8`; recovering `c` needs a
    // multiplier proportional to `256 / (a+1)`, entry 0 forced to 0 (spec
    // §4.1 "Entry for α=0 is 0").
    let p8 = build_reciprocal(|a| if a == 0 { 0 } else { a as u32 + 1 }, INV_DIV_SHIFT + SMALL_SHIFT);
    let p16 = build_reciprocal(|a| if a == 0 { 0 } else { a as u32 + 2 }, 32);
    InvDivTables {
        p8l: p8.clone(),
        p8,
        p16l: p16.clone(),
        p16,
    }
}

static INV_DIV: OnceLock<InvDivTables> = OnceLock::new();

/// Process-wide inverse-division LUTs; built once, shared by every
/// `ScaleCtx` (spec §5 "Shared resources: the LUTs are immutable and may be
/// process-wide").
pub fn inv_div() -> &'static InvDivTables {
    INV_DIV.get_or_init(build_inv_div_tables)
}

/// Premultiplies an 8-bit-range channel by an 8-bit alpha, producing an
/// 8-bit-range premul-8 value (spec §4.4 `c' = ((c+1)*(a+1)-1)>>8`,
/// simplified to the reference's `(c*(a+1))>>8` form).
#[inline]
pub fn premul8(c: u32, a: u32) -> u32 {
    (c * (a + 1)) >> 8
}

/// Recovers a channel from a premul-8 value given the original 8-bit alpha.
/// Lossy for small `a` (spec §8 "may differ by 1 in low bits when premul-8
/// is forced"). Channel-width-independent: `p8[a]` is tabulated at
/// `2^(INV_DIV_SHIFT + SMALL_SHIFT) / (a+1)` precision so that only the
/// final `INV_DIV_SHIFT` bits need shifting out here — the other
/// `SMALL_SHIFT` bits of precision are exactly the `* 256` that
/// [`premul8`]'s `>> 8` divided out, so the same table and shift recover
/// both 8-bit (`Narrow`) and 11-bit (`Wide`/`Linear`) channel values.
#[inline]
pub fn unpremul8(c: u32, a: u32) -> u32 {
    if a == 0 {
        return 0;
    }
    let t = inv_div();
    ((c as u64 * t.p8[a as usize] as u64) >> INV_DIV_SHIFT) as u32
}

/// Premultiplies a channel by `alpha + 2`, the reference's lossless
/// premul-16 factor (`premul_u_to_p16_128bpp` in `smolscale-generic.c`):
/// keeping the full `channel * (alpha+2)` product instead of shifting it
/// back down to the channel's native range is what makes the operation
/// exactly invertible (spec §8 "Round-trip alpha").
#[inline]
pub fn premul16(c: u32, a: u32) -> u32 {
    c * (a + 2)
}

/// Exact inverse of [`premul16`]: divides out `alpha + 2` directly rather
/// than through a reciprocal-multiply LUT, guaranteeing the bit-exact
/// round trip regardless of alpha (see [`InvDivTables::p16`]'s doc comment).
#[inline]
pub fn unpremul16(c: u32, a: u32) -> u32 {
    if a == 0 {
        return 0;
    }
    c / (a + 2)
}

/// `from_srgb[256] -> 11-bit linear`.
fn build_from_srgb() -> Vec<u16> {
    (0..256u32)
        .map(|i| {
            let c = i as f64 / 255.0;
            let lin = if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            };
            (lin * 2047.0 + 0.5).clamp(0.0, 2047.0) as u16
        })
        .collect()
}

/// `to_srgb[2048] -> 8-bit sRGB`, tuned so `to_srgb[from_srgb[i]] == i`.
///
/// Built by inverting the `from_srgb` curve rather than independently
/// re-deriving the sRGB transfer function, which is what guarantees the
/// round-trip property (spec §8 "sRGB reversibility") instead of merely
/// approximating it: for every `i` we force `to_srgb[from_srgb[i]] = i`,
/// then fill any linear levels that no 8-bit input lands on by nearest
/// neighbor.
fn build_to_srgb(from_srgb: &[u16]) -> Vec<u8> {
    let mut table = vec![None; 2048];
    for (i, &lin) in from_srgb.iter().enumerate() {
        table[lin as usize] = Some(i as u8);
    }
    // Fill gaps: scan outward-filling nearest assigned neighbor so the LUT
    // is total over [0, 2047] (unassigned levels occur when two adjacent
    // 8-bit inputs map to 11-bit values more than 1 apart).
    let mut last = 0u8;
    let mut filled = vec![0u8; 2048];
    for (lvl, slot) in table.iter().enumerate() {
        if let Some(v) = slot {
            last = *v;
        }
        filled[lvl] = last;
    }
    filled
}

pub struct SrgbTables {
    pub from_srgb: Vec<u16>,
    pub to_srgb: Vec<u8>,
}

static SRGB: OnceLock<SrgbTables> = OnceLock::new();

pub fn srgb() -> &'static SrgbTables {
    SRGB.get_or_init(|| {
        let from_srgb = build_from_srgb();
        let to_srgb = build_to_srgb(&from_srgb);
        SrgbTables { from_srgb, to_srgb }
    })
}

/// Widens an 8-bit alpha into the channel range used by a linear-gamma
/// internal form, so the alpha lane can be masked/compared alongside the
/// other three lanes (spec §3 "Internal-form alpha is always in channel
/// position #4", §4.7 compositor masking). Compressed forms keep the plain
/// 8-bit value untouched.
#[inline]
pub fn widen_alpha_to_gamma(a8: u32, linear: bool) -> u32 {
    if linear {
        (a8 * 0x7ff + 127) / 255
    } else {
        a8
    }
}

/// Inverse of [`widen_alpha_to_gamma`].
#[inline]
pub fn narrow_alpha_from_gamma(a_wide: u32, linear: bool) -> u32 {
    if linear {
        ((a_wide * 255 + 1023) / 2047).min(255)
    } else {
        a_wide
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srgb_round_trip() {
        let t = srgb();
        for i in 0..256usize {
            let lin = t.from_srgb[i] as usize;
            assert_eq!(t.to_srgb[lin] as usize, i, "round trip failed at {i}");
        }
    }

    #[test]
    fn inv_div_zero_alpha_is_zero() {
        let t = inv_div();
        assert_eq!(t.p8[0], 0);
        assert_eq!(t.p16[0], 0);
        assert_eq!(t.p8l[0], 0);
        assert_eq!(t.p16l[0], 0);
    }

    #[test]
    fn unpremul8_inverts_premul8_at_full_alpha() {
        // a+1 == 256 divides any c*256 exactly, so a = 255 is the one alpha
        // where the premul8/unpremul8 round trip is always bit-exact
        // regardless of channel width (8-bit Narrow or 11-bit Wide/Linear).
        for c in [0u32, 1, 17, 127, 255, 2047] {
            let p = premul8(c, 255);
            assert_eq!(unpremul8(p, 255), c, "c={c}");
        }
    }

    #[test]
    fn unpremul8_is_within_one_lsb_at_partial_alpha() {
        // Other alphas round both in premul8's forward `>> 8` and in the
        // reciprocal-multiply recovery, so only a bounded-error property
        // holds here (spec §8 "may differ by 1 in low bits").
        for a in [1u32, 64, 127, 200] {
            for c in [0u32, 1, 17, 127, 255, 2047] {
                let p = premul8(c, a);
                let back = unpremul8(p, a);
                assert!((back as i32 - c as i32).abs() <= 1, "a={a} c={c} back={back}");
            }
        }
    }

    #[test]
    fn premul16_round_trips_exactly() {
        for a in 0u32..=255 {
            for c in [0u32, 1, 17, 127, 200, 255, 2047] {
                let p = premul16(c, a);
                assert_eq!(unpremul16(p, a), if a == 0 { 0 } else { c });
            }
        }
    }

    #[test]
    fn alpha_gamma_widen_narrow_round_trip_bounded() {
        for a in 0u32..=255 {
            let wide = widen_alpha_to_gamma(a, true);
            let back = narrow_alpha_from_gamma(wide, true);
            assert!((back as i32 - a as i32).abs() <= 1);
        }
    }
}
