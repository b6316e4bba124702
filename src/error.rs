//! Construction-time error type (spec §7 "Construction errors").
//!
//! Runtime (`render_rows`) is infallible by construction once a `ScaleCtx`
//! exists; everything fallible happens at construction time, matching the
//! reference's "resolve everything up front, fail fast" design.

use std::fmt;

/// Failure modes for `ScaleCtx` construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// A source or destination dimension is zero.
    ZeroDimension,
    /// A dimension does not fit in 27 bits (spec §3 "Invariants").
    DimensionTooLarge,
    /// A row stride is smaller than `width * bytes_per_pixel`.
    StrideTooSmall,
    /// No repack pipeline matched the requested (src, dst) pair. Should be
    /// unreachable given a complete registry; kept so a registry bug
    /// surfaces as an `Err` rather than a panic.
    NoPipeline,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ZeroDimension => write!(f, "source or destination dimension is zero"),
            Error::DimensionTooLarge => write!(f, "dimension exceeds 27-bit limit"),
            Error::StrideTooSmall => write!(f, "stride is smaller than width * bytes per pixel"),
            Error::NoPipeline => write!(f, "no repack pipeline matches the requested formats"),
        }
    }
}

impl std::error::Error for Error {}
