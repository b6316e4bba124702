//! External → internal row unpacking (spec §4.4).
//!
//! One function handles every (external alpha convention × internal alpha ×
//! internal gamma) combination rather than the reference's one-function-per-
//! signature table, since the channel permutation is carried as data (see
//! `repack/mod.rs`). The three combinations spec §4.4 calls out by name are
//! each a reachable branch here: a pure premultiplied→premul8/compressed
//! reorder short-circuits to a copy; the unassociated→premul8 and
//! unassociated→premul16/linear paths fall through to the general
//! unpremultiply/linearize/premultiply pipeline.

use crate::fixed;
use crate::format::{ExternalAlpha, Reorder};
use crate::internal::{Gamma, InternalAlpha, InternalForm, Wide};

/// Unpacks one external pixel, already sliced to its `bytes_per_pixel` span,
/// into the wide internal form. `order` is the format's channel-order table
/// (spec §3 "Channel order"); a `0` entry means "no channel here" and reads
/// as a neutral value (255 for alpha, meaning fully opaque).
pub fn unpack_pixel(bytes: &[u8], order: &Reorder, alpha_conv: ExternalAlpha, form: InternalForm) -> Wide {
    let get = |pos: u8| -> u32 { if pos == 0 { 0 } else { bytes[(pos - 1) as usize] as u32 } };
    let c0 = get(order[0]);
    let c1 = get(order[1]);
    let c2 = get(order[2]);
    let ext_a = if order[3] == 0 { 255 } else { get(order[3]) };

    // Premultiplied (or alpha-absent) external data landing in the exact
    // internal convention it already is: a pure channel reorder, no
    // arithmetic (spec §4.4 "pure channel reorder").
    if alpha_conv != ExternalAlpha::Unassociated && form.alpha == InternalAlpha::Premul8 && form.gamma == Gamma::Compressed {
        return Wide::new(c0, c1, c2, ext_a);
    }

    // Otherwise, recover the unassociated (straight-alpha) channel values
    // regardless of what convention the source used, then re-derive the
    // internal representation from there. `Absent` and `Unassociated` are
    // already straight; `Premultiplied` needs `unpremul8` first (the
    // reference's byte formats are always 8-bit premultiplied).
    let (u0, u1, u2) = match alpha_conv {
        ExternalAlpha::Premultiplied => (fixed::unpremul8(c0, ext_a), fixed::unpremul8(c1, ext_a), fixed::unpremul8(c2, ext_a)),
        ExternalAlpha::Unassociated | ExternalAlpha::Absent => (c0, c1, c2),
    };

    let linear = form.gamma == Gamma::Linear;
    let (l0, l1, l2) = if linear {
        let srgb = fixed::srgb();
        (
            srgb.from_srgb[u0 as usize] as u32,
            srgb.from_srgb[u1 as usize] as u32,
            srgb.from_srgb[u2 as usize] as u32,
        )
    } else {
        (u0, u1, u2)
    };

    let (p0, p1, p2) = match form.alpha {
        InternalAlpha::Premul8 => (fixed::premul8(l0, ext_a), fixed::premul8(l1, ext_a), fixed::premul8(l2, ext_a)),
        InternalAlpha::Premul16 => (fixed::premul16(l0, ext_a), fixed::premul16(l1, ext_a), fixed::premul16(l2, ext_a)),
    };

    let a_stored = fixed::widen_alpha_to_gamma(ext_a, linear);
    Wide::new(p0, p1, p2, a_stored)
}

/// Unpacks `n` consecutive external pixels from `src` into `out`.
///
/// `src` must hold at least `n * bpp` bytes; `out` must have length `n`.
pub fn unpack_row(src: &[u8], n: usize, bpp: usize, order: &Reorder, alpha_conv: ExternalAlpha, form: InternalForm, out: &mut [Wide]) {
    debug_assert!(src.len() >= n * bpp);
    debug_assert_eq!(out.len(), n);
    for i in 0..n {
        let px = &src[i * bpp..i * bpp + bpp];
        out[i] = unpack_pixel(px, order, alpha_conv, form);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::PixelFormat;
    use crate::internal::Storage;

    #[test]
    fn premultiplied_to_premul8_compressed_is_pure_reorder() {
        let form = InternalForm { storage: Storage::Narrow, alpha: InternalAlpha::Premul8, gamma: Gamma::Compressed };
        let bytes = [10u8, 20, 30, 128];
        let w = unpack_pixel(&bytes, &PixelFormat::Rgba.byte_order(), ExternalAlpha::Premultiplied, form);
        assert_eq!(w.ch, [10, 20, 30, 128]);
    }

    #[test]
    fn unassociated_to_premul8_matches_formula() {
        let form = InternalForm { storage: Storage::Narrow, alpha: InternalAlpha::Premul8, gamma: Gamma::Compressed };
        let bytes = [200u8, 100, 50, 128];
        let w = unpack_pixel(&bytes, &PixelFormat::RgbaUnassoc.byte_order(), ExternalAlpha::Unassociated, form);
        assert_eq!(w.ch[3], 128);
        assert_eq!(w.ch[0], fixed::premul8(200, 128));
    }

    #[test]
    fn zero_alpha_produces_zero_channels_when_premultiplying() {
        let form = InternalForm { storage: Storage::Narrow, alpha: InternalAlpha::Premul8, gamma: Gamma::Compressed };
        let bytes = [200u8, 100, 50, 0];
        let w = unpack_pixel(&bytes, &PixelFormat::RgbaUnassoc.byte_order(), ExternalAlpha::Unassociated, form);
        assert_eq!(w.ch, [0, 0, 0, 0]);
    }

    #[test]
    fn rgb_absent_alpha_reads_as_opaque() {
        let form = InternalForm { storage: Storage::Narrow, alpha: InternalAlpha::Premul8, gamma: Gamma::Compressed };
        let bytes = [1u8, 2, 3];
        let w = unpack_pixel(&bytes, &PixelFormat::Rgb.byte_order(), ExternalAlpha::Absent, form);
        assert_eq!(w.ch, [1, 2, 3, 255]);
    }
}
