//! External pixel formats (spec §3 "Pixel formats (external)").
//!
//! Mirrors the shape of the teacher's `px` module (a closed enumeration of
//! concrete formats driving dispatch) but as a runtime `enum` rather than
//! compile-time marker types, since spec §6 requires the format to be a
//! constructor argument (`scale_new(src_fmt, dst_fmt, ...)`), not a type
//! parameter fixed at compile time.

/// One of the ten external pixel formats named in spec §3.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 32 bpp, premultiplied alpha, byte order R,G,B,A.
    Rgba,
    /// 32 bpp, premultiplied alpha, byte order B,G,R,A.
    Bgra,
    /// 32 bpp, premultiplied alpha, byte order A,R,G,B.
    Argb,
    /// 32 bpp, premultiplied alpha, byte order A,B,G,R.
    Abgr,
    /// 32 bpp, unassociated alpha, byte order R,G,B,A.
    RgbaUnassoc,
    /// 32 bpp, unassociated alpha, byte order B,G,R,A.
    BgraUnassoc,
    /// 32 bpp, unassociated alpha, byte order A,R,G,B.
    ArgbUnassoc,
    /// 32 bpp, unassociated alpha, byte order A,B,G,R.
    AbgrUnassoc,
    /// 24 bpp, no alpha, byte order R,G,B.
    Rgb,
    /// 24 bpp, no alpha, byte order B,G,R.
    Bgr,
}

/// Alpha convention of an external format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExternalAlpha {
    Premultiplied,
    Unassociated,
    Absent,
}

/// 1-based channel index, 0 meaning "no channel in this position".
pub type Reorder = [u8; 4];

impl PixelFormat {
    /// Storage width in bytes per pixel.
    #[inline]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb | PixelFormat::Bgr => 3,
            _ => 4,
        }
    }

    /// This format's alpha convention (spec §3 "Alpha convention").
    #[inline]
    pub fn alpha(self) -> ExternalAlpha {
        use PixelFormat::*;
        match self {
            Rgba | Bgra | Argb | Abgr => ExternalAlpha::Premultiplied,
            RgbaUnassoc | BgraUnassoc | ArgbUnassoc | AbgrUnassoc => ExternalAlpha::Unassociated,
            Rgb | Bgr => ExternalAlpha::Absent,
        }
    }

    /// Byte-order channel permutation: position `i` (0=R,1=G,2=B,3=A) holds
    /// the 1-based byte offset of that channel within the pixel, or 0 if
    /// the format has no such channel. Index 3 (alpha) is 0 for `Rgb`/`Bgr`.
    ///
    /// This is always expressed in *byte* order. Spec §6 "Byte order" notes
    /// that on little-endian hosts, addressing a 32-bit pixel as a dword
    /// reverses this; this crate accesses pixels byte-wise throughout its
    /// unpackers/packers (see `src/repack`), which spec §9 names as the
    /// alternative to host-form remapping and avoids mixing the two
    /// conventions (a "latent defect class" per the Design Notes).
    #[inline]
    pub fn byte_order(self) -> Reorder {
        use PixelFormat::*;
        match self {
            Rgba | RgbaUnassoc => [1, 2, 3, 4],
            Bgra | BgraUnassoc => [3, 2, 1, 4],
            Argb | ArgbUnassoc => [2, 3, 4, 1],
            Abgr | AbgrUnassoc => [4, 3, 2, 1],
            Rgb => [1, 2, 3, 0],
            Bgr => [3, 2, 1, 0],
        }
    }
}

/// Color-compositing and clearing pixel in external `Rgba`-unassociated
/// form; kept tiny and format-free so `ScaleCtx::new_full` can accept any
/// external format for the solid backing color and convert it once at
/// setup (spec §4.3 step 6).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rgba8 {
    /// Red channel, straight (unassociated) alpha.
    pub r: u8,
    /// Green channel, straight (unassociated) alpha.
    pub g: u8,
    /// Blue channel, straight (unassociated) alpha.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}
