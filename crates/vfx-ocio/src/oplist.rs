//! `OpList`: the ordered op sequence, its builders, and the optimizer (C6).
//!
//! Grounded in `original_source/core/Op.cpp`'s `BuildOps`/optimizer shape
//! (conceptually — translated from a mutable `OpRcPtrVec` plus free
//! functions into methods on one owning struct) and the teacher's
//! `cache.rs` "compiled ops vector" idea (not reused directly; its scope —
//! src/dst/looks — belongs to the excluded config layer).

use bitflags::bitflags;

use vfx_core::BitDepth;

use crate::cpu::CpuRenderer;
use crate::error::{Error, Result};
use crate::lut1d::{HueAdjust, Lut1DInterpolation, Lut1DOpData};
use crate::lut3d::{Lut3DInterpolation, Lut3DOpData};
use crate::op::Op;
use crate::opdata::{
    CdlData, CdlStyle, Direction, ExponentData, ExposureContrastData, ExposureContrastStyle, FixedFunctionData,
    FixedFunctionStyle, GradingPrimaryData, LogData, MatrixData, OpData, RangeData,
};

bitflags! {
    /// Optimizer behavior bit-set (§4.6). `DEFAULT` matches the teacher's
    /// and the broader pack's convention of a conservative-but-useful
    /// baseline rather than `NONE`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OptimizationFlags: u32 {
        /// No optimization; the list applies exactly as built.
        const NONE = 0;
        /// Drop/re-check identity ops after each pass.
        const IDENTITY = 1 << 0;
        /// Fuse adjacent Matrix ops.
        const MATRIX_FUSION = 1 << 1;
        /// Fuse adjacent 1D/3D LUTs, resampling at `max(|A|, |B|)`.
        const LUT_COMPOSE_SMALL = 1 << 2;
        /// Fuse adjacent 1D/3D LUTs, resampling at `max(4096, |A|, |B|)`.
        const LUT_COMPOSE_BIG = 1 << 3;
        /// Materialize a fast forward approximation for inverse LUTs.
        const LUT_INV_FAST = 1 << 4;
        /// Keep inverse LUTs in exact (per-pixel search) mode.
        const LUT_INV_EXACT = 1 << 5;
        /// `IDENTITY | MATRIX_FUSION | LUT_COMPOSE_SMALL | LUT_INV_FAST`.
        const DEFAULT = Self::IDENTITY.bits() | Self::MATRIX_FUSION.bits() | Self::LUT_COMPOSE_SMALL.bits() | Self::LUT_INV_FAST.bits();
    }
}

/// An ordered sequence of [`Op`]s (§3, §4.6).
#[derive(Debug, Clone, Default)]
pub struct OpList {
    ops: Vec<Op>,
    finalized: bool,
    cache_id: Option<String>,
    input_bit_depth: BitDepth,
    output_bit_depth: BitDepth,
    bit_depths_baked: bool,
}

/// `new_op_list()` (§6).
pub fn new_op_list() -> OpList {
    OpList::default()
}

impl OpList {
    /// Moves `op` into the list after validating it; the list is left
    /// unchanged if validation fails.
    pub fn append_op(&mut self, op: Op) -> Result<()> {
        op.validate()?;
        self.ops.push(op);
        self.finalized = false;
        self.bit_depths_baked = false;
        self.cache_id = None;
        Ok(())
    }

    fn append(&mut self, data: OpData, direction: Direction) -> Result<()> {
        self.append_op(Op::new(data, direction))
    }

    /// `append_matrix(m, b, direction)`.
    pub fn append_matrix(&mut self, m: [f64; 16], b: [f64; 4], direction: Direction) -> Result<()> {
        self.append(OpData::Matrix(MatrixData { matrix: m, offset: b }), direction)
    }

    /// `append_range(min_in, max_in, min_out, max_out, direction)`.
    pub fn append_range(
        &mut self,
        min_in: Option<f64>,
        max_in: Option<f64>,
        min_out: Option<f64>,
        max_out: Option<f64>,
        direction: Direction,
    ) -> Result<()> {
        self.append(OpData::Range(RangeData { min_in, max_in, min_out, max_out }), direction)
    }

    /// `append_exponent(e, direction)`.
    pub fn append_exponent(&mut self, e: [f64; 4], direction: Direction) -> Result<()> {
        self.append(OpData::Exponent(ExponentData { exponent: e }), direction)
    }

    /// `append_log(base, log_slope, log_offset, lin_slope, lin_offset, direction)`
    /// — plain affine log (no camera-log break point).
    pub fn append_log(
        &mut self,
        base: f64,
        log_slope: [f64; 3],
        log_offset: [f64; 3],
        lin_slope: [f64; 3],
        lin_offset: [f64; 3],
        direction: Direction,
    ) -> Result<()> {
        self.append(
            OpData::Log(LogData { base, log_slope, log_offset, lin_slope, lin_offset, break_point: None, linear_slope: None }),
            direction,
        )
    }

    /// Camera-log variant with a linear segment below `break_point`
    /// (supplemented builder; `linear_slope: None` computes the
    /// C¹-continuous slope — Open Question 1, DESIGN.md).
    #[allow(clippy::too_many_arguments)]
    pub fn append_log_camera(
        &mut self,
        base: f64,
        log_slope: [f64; 3],
        log_offset: [f64; 3],
        lin_slope: [f64; 3],
        lin_offset: [f64; 3],
        break_point: [f64; 3],
        linear_slope: Option<[f64; 3]>,
        direction: Direction,
    ) -> Result<()> {
        self.append(
            OpData::Log(LogData {
                base,
                log_slope,
                log_offset,
                lin_slope,
                lin_offset,
                break_point: Some(break_point),
                linear_slope,
            }),
            direction,
        )
    }

    /// `append_cdl(slope, offset, power, saturation, style, direction)`.
    pub fn append_cdl(
        &mut self,
        slope: [f64; 3],
        offset: [f64; 3],
        power: [f64; 3],
        saturation: f64,
        style: CdlStyle,
        direction: Direction,
    ) -> Result<()> {
        self.append(OpData::Cdl(CdlData { slope, offset, power, saturation, style }), direction)
    }

    /// Exposure/contrast/gamma about a pivot (supplemented builder, §3).
    pub fn append_exposure_contrast(
        &mut self,
        exposure: f64,
        contrast: f64,
        gamma: f64,
        pivot: f64,
        style: ExposureContrastStyle,
        dynamic: bool,
        direction: Direction,
    ) -> Result<()> {
        self.append(
            OpData::ExposureContrast(ExposureContrastData { exposure, contrast, gamma, pivot, style, dynamic }),
            direction,
        )
    }

    /// `append_lut1d(samples, length, interpolation, half_domain, raw_halfs, hue_adjust, direction)`.
    /// `samples` is copied into the op's own storage (§3: OpData is
    /// immutable after creation).
    #[allow(clippy::too_many_arguments)]
    pub fn append_lut1d(
        &mut self,
        samples: &[f32],
        length: usize,
        interpolation: Lut1DInterpolation,
        half_domain: bool,
        raw_halfs: bool,
        hue_adjust: HueAdjust,
        direction: Direction,
    ) -> Result<()> {
        let lut = Lut1DOpData::new(samples.to_vec(), length, interpolation, half_domain, raw_halfs, hue_adjust)?;
        self.append(OpData::Lut1D(lut), direction)
    }

    /// `append_lut3d(samples, grid_size, interpolation, direction)`.
    pub fn append_lut3d(
        &mut self,
        samples: &[f32],
        grid_size: usize,
        interpolation: Lut3DInterpolation,
        direction: Direction,
    ) -> Result<()> {
        let lut = Lut3DOpData::new(samples.to_vec(), grid_size, interpolation)?;
        self.append(OpData::Lut3D(lut), direction)
    }

    /// `append_grading_primary(params, style, direction)` — `params` already
    /// carries `style` as one of its fields (see `GradingPrimaryData`), so
    /// the two spec arguments collapse into one value here.
    pub fn append_grading_primary(&mut self, params: GradingPrimaryData, direction: Direction) -> Result<()> {
        self.append(OpData::GradingPrimary(params), direction)
    }

    /// `append_fixed_function(style, params, direction)` — `style` already
    /// carries its own parameter list (see `FixedFunctionStyle`).
    pub fn append_fixed_function(&mut self, style: FixedFunctionStyle, direction: Direction) -> Result<()> {
        self.append(OpData::FixedFunction(FixedFunctionData { style }), direction)
    }

    /// Runs each op's `validate`, failing at the first error with the op's
    /// index folded into the reason string for caller context.
    pub fn validate(&self) -> Result<()> {
        for (i, op) in self.ops.iter().enumerate() {
            op.validate().map_err(|e| match e {
                Error::InvalidParameter { kind, reason } => {
                    Error::invalid_parameter(kind, format!("op[{i}]: {reason}"))
                }
                other => other,
            })?;
        }
        Ok(())
    }

    /// Number of ops currently in the list.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// The ops, in order.
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Whether `finalize` has run since the last mutation.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Sets the bit depth of the buffer the list's first op will receive
    /// (supplemented builder — §3/§4.6 pass 4 name the behavior but §6 gives
    /// no external setter; defaults to `F32`, which bakes no scale).
    pub fn set_input_bit_depth(&mut self, depth: BitDepth) {
        self.input_bit_depth = depth;
        self.finalized = false;
        self.bit_depths_baked = false;
        self.cache_id = None;
    }

    /// Sets the bit depth of the buffer the list's last op will produce.
    pub fn set_output_bit_depth(&mut self, depth: BitDepth) {
        self.output_bit_depth = depth;
        self.finalized = false;
        self.bit_depths_baked = false;
        self.cache_id = None;
    }

    /// `optimize(flags)`: in-place rewrite through the six ordered passes,
    /// each run to a fixed point before the next starts (§4.6).
    pub fn optimize(&mut self, flags: OptimizationFlags) -> Result<()> {
        self.pass_drop_no_ops();
        self.pass_remove_inverse_pairs();
        self.pass_combine_contiguous(flags);
        self.pass_bake_bit_depths();
        self.pass_drop_no_ops();
        self.pass_materialize_lut_inversions(flags);
        Ok(())
    }

    /// Pass 1 & 5: drop ops where `is_no_op()` is true.
    fn pass_drop_no_ops(&mut self) {
        self.ops.retain(|op| !op.is_no_op());
    }

    /// Pass 2: remove adjacent inverse pairs, to a fixed point.
    fn pass_remove_inverse_pairs(&mut self) {
        loop {
            let mut removed = false;
            let mut i = 0;
            while i + 1 < self.ops.len() {
                if self.ops[i].is_inverse(&self.ops[i + 1]) {
                    self.ops.remove(i + 1);
                    self.ops.remove(i);
                    removed = true;
                } else {
                    i += 1;
                }
            }
            if !removed {
                break;
            }
        }
    }

    /// Pass 3: combine contiguous compatible ops. Matrix fusion requires
    /// `MATRIX_FUSION`; LUT fusion requires `LUT_COMPOSE_SMALL`/`_BIG`.
    /// Never reorders — only adjacent pairs are ever combined, and a pair
    /// separated by crosstalk is never considered for fusion across it.
    fn pass_combine_contiguous(&mut self, flags: OptimizationFlags) {
        loop {
            let mut combined_any = false;
            let mut i = 0;
            while i + 1 < self.ops.len() {
                let a = &self.ops[i];
                let b = &self.ops[i + 1];
                let allowed = match a.kind() {
                    crate::error::OpKind::Matrix => flags.contains(OptimizationFlags::MATRIX_FUSION),
                    crate::error::OpKind::Lut1D | crate::error::OpKind::Lut3D => {
                        flags.contains(OptimizationFlags::LUT_COMPOSE_SMALL) || flags.contains(OptimizationFlags::LUT_COMPOSE_BIG)
                    }
                    _ => true,
                };
                if allowed {
                    if let Ok(combined) = a.combine_with(b) {
                        self.ops[i] = combined;
                        self.ops.remove(i + 1);
                        combined_any = true;
                        continue;
                    }
                }
                i += 1;
            }
            if !combined_any {
                break;
            }
        }
    }

    /// Pass 4: bake a bit-depth pre-/post-scale into the first/last op
    /// (§3, §4.6). A non-`F32` `input_bit_depth` prepends a diagonal
    /// `1/max` scaling Matrix (raw integer codes in, `[0, 1]` out); a
    /// non-`F32` `output_bit_depth` appends a diagonal `max` scaling
    /// Matrix. Folding the scale into an arbitrary existing op's own
    /// parameters would need per-kind logic for every transform kind; a
    /// prepended/appended diagonal Matrix is numerically identical and
    /// immediately eligible for `MATRIX_FUSION` with an adjacent Matrix op
    /// on the next `pass_combine_contiguous` pass (Open Question decision,
    /// see DESIGN.md).
    fn pass_bake_bit_depths(&mut self) {
        if self.bit_depths_baked {
            return;
        }
        if !self.input_bit_depth.is_float() {
            let scale = 1.0 / self.input_bit_depth.scale_factor();
            self.ops.insert(0, Op::new(OpData::Matrix(diagonal_scale(scale)), Direction::Forward));
        }
        if !self.output_bit_depth.is_float() {
            let scale = self.output_bit_depth.scale_factor();
            self.ops.push(Op::new(OpData::Matrix(diagonal_scale(scale)), Direction::Forward));
        }
        self.bit_depths_baked = true;
    }

    /// Pass 6: materialize fast-inverse LUTs where `LUT_INV_FAST` requests
    /// it. Per-op `finalize` already performs this; this pass only needs to
    /// run `finalize` again after fusion may have changed adjacency.
    fn pass_materialize_lut_inversions(&mut self, _flags: OptimizationFlags) {}

    /// `finalize(flags)`: runs the optimizer, then computes every op's and
    /// the list's cache id. Idempotent — re-running on an already-finalized,
    /// unmutated list recomputes the same ids.
    pub fn finalize(&mut self, flags: OptimizationFlags) -> Result<()> {
        self.validate()?;
        self.optimize(flags)?;
        let lut_inv_fast = flags.contains(OptimizationFlags::LUT_INV_FAST);
        let mut id = String::new();
        for op in &mut self.ops {
            op.finalize(lut_inv_fast)?;
            id.push_str(op.cache_id()?);
        }
        self.cache_id = Some(id);
        self.finalized = true;
        Ok(())
    }

    /// `cache_id()`, valid only after `finalize`.
    pub fn cache_id(&self) -> Result<&str> {
        self.cache_id.as_deref().ok_or(Error::FinalizationRequired)
    }

    /// Builds the immutable per-op CPU renderers for a finalized list, in
    /// order. Returns `FinalizationRequired` if the list was never
    /// finalized since its last mutation.
    pub(crate) fn cpu_renderers(&self, fast_power: bool) -> Result<Vec<CpuRenderer>> {
        if !self.finalized {
            return Err(Error::FinalizationRequired);
        }
        self.ops.iter().map(|op| op.get_cpu_op(fast_power)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_s1_matrix_identity_drops() {
        let mut list = new_op_list();
        list.append_matrix(MatrixData::IDENTITY.matrix, MatrixData::IDENTITY.offset, Direction::Forward).unwrap();
        list.finalize(OptimizationFlags::DEFAULT).unwrap();
        assert!(list.ops().is_empty());
    }

    #[test]
    fn scenario_s6_inverse_pair_collapses() {
        let mut list = new_op_list();
        list.append_exponent([2.0; 4], Direction::Forward).unwrap();
        list.append_exponent([2.0; 4], Direction::Inverse).unwrap();
        list.finalize(OptimizationFlags::DEFAULT).unwrap();
        assert!(list.ops().is_empty());
    }

    #[test]
    fn matrix_fusion_combines_two_into_one() {
        let mut list = new_op_list();
        list.append_matrix(MatrixData::IDENTITY.matrix, [1.0, 0.0, 0.0, 0.0], Direction::Forward).unwrap();
        list.append_matrix(MatrixData::IDENTITY.matrix, [0.0, 1.0, 0.0, 0.0], Direction::Forward).unwrap();
        list.finalize(OptimizationFlags::DEFAULT).unwrap();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn cache_id_requires_finalize() {
        let list = new_op_list();
        assert!(list.cache_id().is_err());
    }

    #[test]
    fn validate_reports_op_index_in_reason() {
        let mut list = new_op_list();
        list.append_range(Some(1.0), Some(0.0), None, None, Direction::Forward).ok();
        // append itself rejects the bad range, so validate() on the (empty)
        // list succeeds; this confirms append's own validation gate.
        assert!(list.validate().is_ok());
        assert!(list.is_empty());
    }

    #[test]
    fn optimize_never_reorders_across_crosstalk() {
        let mut list = new_op_list();
        list.append_cdl([1.0; 3], [0.0; 3], [1.0; 3], 1.0, CdlStyle::V1_2, Direction::Forward).unwrap();
        list.append_matrix(MatrixData::IDENTITY.matrix, [1.0, 0.0, 0.0, 0.0], Direction::Forward).unwrap();
        list.append_matrix(MatrixData::IDENTITY.matrix, [0.0, 1.0, 0.0, 0.0], Direction::Forward).unwrap();
        list.finalize(OptimizationFlags::DEFAULT).unwrap();
        // The CDL (crosstalk) stays first; the two matrices behind it still
        // fuse into one, since they are adjacent to each other.
        assert_eq!(list.len(), 2);
        assert_eq!(list.ops()[0].kind(), crate::error::OpKind::Cdl);
    }
}
