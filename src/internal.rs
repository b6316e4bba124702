//! The wide internal pixel representation used between unpacking and packing.
//!
//! Spec §3 names three storages (64 bpp compact, 128 bpp compact, 128 bpp
//! linear); we represent all three with the same four-lane struct and carry
//! the storage/alpha/gamma distinction alongside it as plain enums, the way
//! the teacher crate carries an opaque `Format::Accumulator` associated type
//! rather than a hand-packed machine word (see `Resizer<Format>::tmp` in the
//! vendored `resize` crate). Lane 3 (0-based) is always alpha; unpackers are
//! responsible for landing alpha there regardless of external channel order.

/// A single wide pixel: four lanes, order fixed as (ch0, ch1, ch2, alpha).
///
/// Which external channel (R/G/B) occupies ch0..ch2 is irrelevant to the
/// filters — they operate identically on all four lanes — and is recovered
/// by the packer's channel permutation. Lane values are plain `u32` so the
/// same type serves 8-bit premultiplied factors, 16-bit premultiplied
/// factors and 11-bit linear channels without a second struct.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Wide {
    pub ch: [u32; 4],
}

impl Wide {
    pub const ZERO: Wide = Wide { ch: [0; 4] };

    #[inline]
    pub fn new(a: u32, b: u32, c: u32, alpha: u32) -> Self {
        Wide { ch: [a, b, c, alpha] }
    }

    #[inline]
    pub fn alpha(self) -> u32 {
        self.ch[3]
    }

    #[inline]
    pub fn map(self, f: impl Fn(u32) -> u32) -> Self {
        Wide {
            ch: [f(self.ch[0]), f(self.ch[1]), f(self.ch[2]), f(self.ch[3])],
        }
    }

    #[inline]
    pub fn zip_with(self, other: Wide, f: impl Fn(u32, u32) -> u32) -> Self {
        Wide {
            ch: [
                f(self.ch[0], other.ch[0]),
                f(self.ch[1], other.ch[1]),
                f(self.ch[2], other.ch[2]),
                f(self.ch[3], other.ch[3]),
            ],
        }
    }
}

/// Internal pixel storage width (spec §3 "Pixel formats (internal)").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Storage {
    /// 64 bpp compact: narrow, 8-bit-per-channel working range.
    Narrow,
    /// 128 bpp compact/linear: wide working range, needed for
    /// unassociated-to-unassociated widening, sRGB linearization, or
    /// extreme downscales.
    Wide,
}

/// Internal alpha convention: how many bits of precision the premultiply
/// factor carries (spec §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InternalAlpha {
    /// 8-bit premultiplication factor.
    Premul8,
    /// 16-bit premultiplication factor; required for a lossless
    /// unassociated round trip (spec §8 "Round-trip alpha").
    Premul16,
}

/// Internal gamma convention (spec §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gamma {
    /// sRGB-like compressed channels (8-bit range).
    Compressed,
    /// Linearized channels (11-bit range, via `from_srgb`).
    Linear,
}

/// The resolved internal pixel form for one side of a repack pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InternalForm {
    pub storage: Storage,
    pub alpha: InternalAlpha,
    pub gamma: Gamma,
}

impl InternalForm {
    /// Maximum alpha value representable by this form's channels, used by
    /// the compositor's `max_alpha - a` term (spec §4.7).
    #[inline]
    pub fn max_channel(self) -> u32 {
        match (self.storage, self.gamma) {
            (Storage::Narrow, _) => 0xff,
            (Storage::Wide, Gamma::Compressed) => 0xff,
            (Storage::Wide, Gamma::Linear) => 0x7ff,
        }
    }

    /// Channel mask used to prevent cross-channel bleed in masked
    /// arithmetic (spec §4.5, §4.7: "Mask the result so channels don't
    /// bleed into each other").
    #[inline]
    pub fn channel_mask(self) -> u32 {
        self.max_channel()
    }
}
