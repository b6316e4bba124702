//! High-throughput pixel-format-aware image scaler.
//!
//! Resamples a source pixel buffer into a destination pixel buffer of
//! arbitrary dimensions, simultaneously repacking between external pixel
//! formats (channel order, alpha convention) and internal wide working
//! forms, optionally compositing over a solid color or the existing
//! destination, and optionally placing the result at a sub-pixel-accurate
//! offset with fractional edge opacity.
//!
//! The engine is a two-pass separable filter (horizontal, then vertical)
//! built from three filter families — copy, one (replicate), and
//! bilinear/box resampling — driving per-row execution that holds only a
//! handful of scratch rows regardless of image size. See [`ScaleCtx`] for
//! the entry point.
//!
//! # Examples
//!
//! ```
//! use pixscale::{Flags, PixelFormat, ScaleCtx};
//!
//! let (w1, h1) = (4, 4);
//! let (w2, h2) = (2, 2);
//! let src = vec![255u8; w1 * h1 * 4];
//! let mut dst = vec![0u8; w2 * h2 * 4];
//! let ctx = ScaleCtx::simple(
//!     PixelFormat::Rgba, w1 as u32, h1 as u32, w1 * 4,
//!     PixelFormat::Rgba, w2 as u32, h2 as u32, w2 * 4,
//!     Flags::NONE,
//! ).unwrap();
//! ctx.render_rows(&src, &mut dst, 0, h2 as u32);
//! ```
#![deny(missing_docs)]

mod compositor;
mod context;
mod error;
mod fixed;
mod format;
mod horizontal;
mod internal;
mod precalc;
mod repack;
mod vertical;

pub use error::Error;
pub use format::{PixelFormat, Rgba8};
pub use context::ScaleCtx;

/// Compositing mode applied to the filtered row just before packing (spec
/// §6 `Composite op enum`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompositeOp {
    /// Overwrite the placement; margins are left untouched.
    Src,
    /// Blend the filtered row over the existing destination row (spec §4.7
    /// "Over destination").
    SrcOverDest,
    /// Overwrite the placement and clear margins to the backing color.
    SrcClearDest,
}

/// Construction-time option bitfield (spec §6 `Flags bitfield`).
///
/// Hand-rolled rather than pulled from a bitflags crate: the teacher
/// (`resize`) has no equivalent surface, and the only two flags named by
/// the spec don't justify a dependency — this mirrors how the pack's other
/// small pixel/codec leaf crates (`dcv-color-primitives`, `pix`) keep their
/// option surfaces as plain newtypes over an integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Flags(u32);

impl Flags {
    /// No flags set.
    pub const NONE: Flags = Flags(0);
    /// Disables the default-on sRGB linearization of the 128bpp internal
    /// path; filtering runs entirely in compressed (sRGB-like) space.
    pub const DISABLE_SRGB_LINEARIZATION: Flags = Flags(1 << 0);
    /// Requests the non-accelerated path. Accepted for interface fidelity
    /// with spec §6; this crate ships only the generic path (Design Notes:
    /// "SIMD variants ... are optional"), so it is a no-op — see
    /// `DESIGN.md`'s Open Question record.
    pub const DISABLE_ACCELERATION: Flags = Flags(1 << 1);

    /// Returns `true` if every bit set in `other` is also set in `self`.
    #[must_use]
    pub fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Flags {
    type Output = Flags;
    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Flags) {
        self.0 |= rhs.0;
    }
}

/// Sub-pixel (256ths) placement rectangle within the destination canvas
/// (spec §3 "Placement"). Offsets may be negative or push the placement
/// past the canvas edge; both are clipped at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    /// Horizontal placement offset, sub-pixels. May be negative.
    pub x_spx: i64,
    /// Vertical placement offset, sub-pixels. May be negative.
    pub y_spx: i64,
    /// Placement width, sub-pixels. `<= 0` is a degenerate placement (spec
    /// §7 "Degenerate placements").
    pub w_spx: i64,
    /// Placement height, sub-pixels.
    pub h_spx: i64,
}

impl Placement {
    /// A placement that exactly fills a `dst_w x dst_h` canvas at the
    /// origin, used by [`ScaleCtx::simple`]/[`scale_simple`].
    #[must_use]
    pub fn full(dst_w: u32, dst_h: u32) -> Placement {
        Placement {
            x_spx: 0,
            y_spx: 0,
            w_spx: dst_w as i64 * precalc::SUBPIXEL,
            h_spx: dst_h as i64 * precalc::SUBPIXEL,
        }
    }
}

/// Convenience one-shot entry point (spec §6 `scale_simple`): full-canvas
/// placement, `SRC` compositing, no backing color, no callback. Builds and
/// immediately discards a [`ScaleCtx`]; prefer [`ScaleCtx::new`] directly
/// when scaling the same dimensions/formats repeatedly (spec §F.1).
#[allow(clippy::too_many_arguments)]
pub fn scale_simple(
    src: &[u8],
    src_fmt: PixelFormat,
    src_w: u32,
    src_h: u32,
    src_stride: usize,
    dst: &mut [u8],
    dst_fmt: PixelFormat,
    dst_w: u32,
    dst_h: u32,
    dst_stride: usize,
    flags: Flags,
) -> Result<(), Error> {
    let ctx = ScaleCtx::simple(src_fmt, src_w, src_h, src_stride, dst_fmt, dst_w, dst_h, dst_stride, flags)?;
    ctx.render_rows(src, dst, 0, dst_h);
    Ok(())
}
