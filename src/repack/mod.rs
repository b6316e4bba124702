//! Repack pipeline resolution (spec §4.3).
//!
//! The reference registers one function per concrete (src signature, dst
//! signature) pair and searches the table for a match. This crate collapses
//! that table along the channel-order axis: every external format shares the
//! same storage/alpha/gamma signature space, and the channel permutation
//! (`PixelFormat::byte_order`) is carried as data rather than compiled into a
//! distinct function per reorder, matching spec §4.4's note that "the
//! generic path computes the packed result by bit-shifting and masking the
//! four named channels... an SIMD path may use a byte-shuffle vector built
//! from the same permutation" — i.e. the permutation is a parameter of one
//! generic unpacker/packer, not a family of hand-written ones. What remains
//! a genuine signature match, as in the reference, is the (storage, alpha,
//! gamma) triple on each side.

pub mod pack;
pub mod unpack;

use crate::format::{ExternalAlpha, PixelFormat, Rgba8};
use crate::internal::{Gamma, InternalAlpha, InternalForm, Storage, Wide};

/// A resolved (src-form, dst-form) signature pair, spec §4.3's "signature"
/// made concrete for one scale context.
#[derive(Clone, Copy, Debug)]
pub struct Pipeline {
    pub internal_form: InternalForm,
    pub src_fmt: PixelFormat,
    pub dst_fmt: PixelFormat,
}

/// Step 1-2 of spec §4.3's pipeline resolution: choose internal storage and
/// alpha precision from the pair of external formats and the render options.
///
/// `extreme_downscale` is `src_px > 8191 * dst_px` in either dimension (spec
/// §9 "Precision headroom"); `want_linear` is the caller's sRGB
/// linearization request (spec §6 `Flags`), silently downgraded to
/// compressed when `extreme_downscale` holds since the 32-bit accumulator
/// cannot carry 13-bit pixel counts times 11-bit linear channels times 8-bit
/// weights (spec §9).
pub fn resolve_internal_form(src_fmt: PixelFormat, dst_fmt: PixelFormat, want_linear: bool, extreme_downscale: bool) -> InternalForm {
    let both_unassoc = src_fmt.alpha() == ExternalAlpha::Unassociated && dst_fmt.alpha() == ExternalAlpha::Unassociated;
    let linear = want_linear && !extreme_downscale;
    let storage = if both_unassoc || linear || extreme_downscale { Storage::Wide } else { Storage::Narrow };
    let alpha = if both_unassoc { InternalAlpha::Premul16 } else { InternalAlpha::Premul8 };
    let gamma = if linear { Gamma::Linear } else { Gamma::Compressed };
    InternalForm { storage, alpha, gamma }
}

/// Resolves the full src-to-dst pipeline, spec §4.3 steps 1-4. Step 3's
/// "src-unpacker that lands alpha in position #4" is an invariant of every
/// unpacker in `unpack.rs`, not a search; step 4's "compose permutation and
/// check final order" is trivially satisfied here since the packer applies
/// `dst_fmt.byte_order()` directly rather than composing two independently
/// chosen permutations, so there is always exactly one match.
pub fn resolve_pipeline(src_fmt: PixelFormat, dst_fmt: PixelFormat, want_linear: bool, extreme_downscale: bool) -> Pipeline {
    let internal_form = resolve_internal_form(src_fmt, dst_fmt, want_linear, extreme_downscale);
    Pipeline { internal_form, src_fmt, dst_fmt }
}

/// Converts the compositing color through the same two-step pipeline once,
/// at setup (spec §4.3 step 6): unpack as a single-pixel unassociated-RGBA
/// row, repack into the context's internal form.
pub fn resolve_color(color: Rgba8, form: InternalForm) -> Wide {
    let bytes = [color.r, color.g, color.b, color.a];
    unpack::unpack_pixel(&bytes, &[1, 2, 3, 4], ExternalAlpha::Unassociated, form)
}
