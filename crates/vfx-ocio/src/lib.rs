//! OpenColorIO-compatible core color processing pipeline.
//!
//! This crate implements the OCIO core pipeline, independent of any
//! configuration file format or I/O layer:
//! - [`OpData`] — one immutable parameter block per transform kind
//! - [`Op`] — a directional, combinable wrapper around one `OpData`
//! - [`OpList`] — an ordered pipeline with a six-pass optimizer
//! - [`CPUProcessor`] — applies a finalized pipeline to packed/planar images
//!
//! # Quick Start
//!
//! ```
//! use vfx_ocio::{new_op_list, CPUProcessor, Direction, OptimizationFlags, PackedImageDesc};
//!
//! let mut list = new_op_list();
//! list.append_exponent([2.2, 2.2, 2.2, 1.0], Direction::Forward).unwrap();
//! list.finalize(OptimizationFlags::DEFAULT).unwrap();
//!
//! let processor = CPUProcessor::from(list).unwrap();
//! let mut pixels = [0.5_f32, 0.5, 0.5, 1.0];
//! let mut desc = PackedImageDesc::new(&mut pixels, 1, 1, 4);
//! processor.apply_packed(&mut desc).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod cpu;
mod error;
mod lut1d;
mod lut3d;
mod op;
mod opdata;
mod oplist;
mod processor;

pub use cpu::CpuRenderer;
pub use error::{Error, OpKind, Result};
pub use lut1d::{Lut1DInterpolation, Lut1DOpData, HueAdjust, HALF_DOMAIN_LENGTH, MAX_LUT1D_LENGTH};
pub use lut3d::{Lut3DInterpolation, Lut3DOpData, MAX_GRID_SIZE, MIN_GRID_SIZE};
pub use op::Op;
pub use opdata::{
    CdlData, CdlStyle, Direction, ExponentData, ExposureContrastData, ExposureContrastStyle, FixedFunctionData,
    FixedFunctionStyle, GradingPrimaryData, GradingRgbm, GradingStyle, LogData, MatrixData, OpData, RangeData,
};
pub use oplist::{new_op_list, OpList, OptimizationFlags};
pub use processor::{CPUProcessor, PackedImageDesc, PlanarImageDesc};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quick_start_pipeline_applies() {
        let mut list = new_op_list();
        list.append_exponent([2.0, 2.0, 2.0, 1.0], Direction::Forward).unwrap();
        list.finalize(OptimizationFlags::DEFAULT).unwrap();

        let processor = CPUProcessor::from(list).unwrap();
        let mut pixels = [0.5_f32, 0.5, 0.5, 1.0];
        let mut desc = PackedImageDesc::new(&mut pixels, 1, 1, 4);
        processor.apply_packed(&mut desc).unwrap();

        assert!((pixels[0] - 0.25).abs() < 1e-5);
    }

    #[test]
    fn empty_list_is_identity() {
        let mut list = new_op_list();
        list.finalize(OptimizationFlags::DEFAULT).unwrap();
        let processor = CPUProcessor::from(list).unwrap();
        assert!(processor.is_empty());
    }
}
