//! Internal → external row packing (spec §4.4).
//!
//! Inverse of `unpack.rs`: unpremultiply (if the destination is
//! unassociated or differs in premultiplication precision), delinearize (if
//! the internal form is linear), re-premultiply (if the destination is
//! premultiplied), then permute channels into destination byte order. Zero
//! alpha recovers all-zero channels via `inv_div_*`'s entry 0 (spec §4.4
//! "When alpha is zero the inverse-div entry is zero, producing all-zero
//! channels — the correct behavior").

use crate::fixed;
use crate::format::{ExternalAlpha, Reorder};
use crate::internal::{Gamma, InternalAlpha, InternalForm, Wide};

/// Packs one wide internal pixel into `bpp` destination bytes at `out`
/// (`out.len() == bpp`).
pub fn pack_pixel(px: Wide, order: &Reorder, alpha_conv: ExternalAlpha, form: InternalForm, out: &mut [u8]) {
    let linear = form.gamma == Gamma::Linear;
    let a8 = fixed::narrow_alpha_from_gamma(px.alpha(), linear);

    let pure_copy = alpha_conv != ExternalAlpha::Unassociated && form.alpha == InternalAlpha::Premul8 && form.gamma == Gamma::Compressed;

    let (c0, c1, c2) = if pure_copy {
        (px.ch[0], px.ch[1], px.ch[2])
    } else {
        let (u0, u1, u2) = match form.alpha {
            InternalAlpha::Premul8 => (fixed::unpremul8(px.ch[0], a8), fixed::unpremul8(px.ch[1], a8), fixed::unpremul8(px.ch[2], a8)),
            InternalAlpha::Premul16 => (fixed::unpremul16(px.ch[0], a8), fixed::unpremul16(px.ch[1], a8), fixed::unpremul16(px.ch[2], a8)),
        };
        let (d0, d1, d2) = if linear {
            let srgb = fixed::srgb();
            (srgb.to_srgb[u0 as usize] as u32, srgb.to_srgb[u1 as usize] as u32, srgb.to_srgb[u2 as usize] as u32)
        } else {
            (u0, u1, u2)
        };
        match alpha_conv {
            ExternalAlpha::Premultiplied => (fixed::premul8(d0, a8), fixed::premul8(d1, a8), fixed::premul8(d2, a8)),
            ExternalAlpha::Unassociated | ExternalAlpha::Absent => (d0, d1, d2),
        }
    };

    let chans = [c0.min(0xff) as u8, c1.min(0xff) as u8, c2.min(0xff) as u8, a8.min(0xff) as u8];
    for (slot, &pos) in order.iter().enumerate() {
        if pos != 0 {
            out[(pos - 1) as usize] = chans[slot];
        }
    }
}

/// Packs `n` consecutive internal pixels from `src` into `dst`.
pub fn pack_row(src: &[Wide], n: usize, bpp: usize, order: &Reorder, alpha_conv: ExternalAlpha, form: InternalForm, dst: &mut [u8]) {
    debug_assert!(dst.len() >= n * bpp);
    debug_assert_eq!(src.len(), n);
    for i in 0..n {
        pack_pixel(src[i], order, alpha_conv, form, &mut dst[i * bpp..i * bpp + bpp]);
    }
}
