//! # vfx-core
//!
//! Foundation types shared by the core color-processing pipeline:
//!
//! - [`BitDepth`] - the bit-depth enumeration used at the pipeline's input
//!   and output ends
//! - [`kernel`] - per-pixel scalar arithmetic primitives (clamp, power,
//!   luma dot product, Chebyshev fast-math) shared by every CPU renderer
//!
//! This crate has no internal dependencies; `vfx-ocio` depends on it for
//! `kernel` and the `BitDepth` enumeration.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod format;
pub mod kernel;

pub use format::BitDepth;
pub use kernel::{clamp, clamp01_4, fast_exp2, fast_log2, fast_pow, luma_dot, power, PowerMode, REC709_LUMA};

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```
/// use vfx_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::format::BitDepth;
    pub use crate::kernel::{clamp, clamp01_4, power, PowerMode, REC709_LUMA};
}
