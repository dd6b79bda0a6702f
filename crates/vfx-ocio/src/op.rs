//! `Op`: one directional application of an [`OpData`] within an [`OpList`](crate::oplist::OpList) (C5).
//!
//! The teacher's and `original_source`'s `Op` hierarchy dispatches through a
//! virtual `Op` base class (`Op.cpp`, `Lut1DOp.cpp`, ...); here the same
//! surface — `isSameType`/`isInverse`/`canCombineWith`/`combineWith`,
//! `hasChannelCrosstalk`, `getCpuOp` — is a `match` over `OpData`'s tag.

use glam::{Mat4, Vec4};

use crate::cpu::{CpuRenderer, GradingPrimaryParams};
use crate::error::{Error, OpKind, Result};
use crate::lut1d::Lut1DOpData;
use crate::opdata::{CdlData, Direction, ExponentData, GradingStyle, LogData, OpData};

/// One directional application of an [`OpData`] (§4.3).
#[derive(Debug, Clone, PartialEq)]
pub struct Op {
    data: OpData,
    direction: Direction,
    /// Set by `finalize`; `None` beforehand.
    cache_id: Option<String>,
}

impl Op {
    /// Wraps `data` for application in `direction`.
    pub fn new(data: OpData, direction: Direction) -> Self {
        Self { data, direction, cache_id: None }
    }

    /// The wrapped parameter block.
    pub fn data(&self) -> &OpData {
        &self.data
    }

    /// Forward or inverse.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The operator kind tag.
    pub fn kind(&self) -> OpKind {
        self.data.kind()
    }

    /// Validates the op, including direction-dependent invariants.
    pub fn validate(&self) -> Result<()> {
        self.data.validate_for_direction(self.direction)
    }

    /// True iff this op changes no pixel in its own direction.
    pub fn is_no_op(&self) -> bool {
        self.data.is_no_op()
    }

    /// Whether any output channel can depend on more than one input channel
    /// (§4.3 supplemented table) — governs whether the optimizer may reorder
    /// this op relative to its neighbors.
    pub fn has_channel_crosstalk(&self) -> bool {
        self.data.has_channel_crosstalk()
    }

    /// Whether `self` and `other` wrap the same `OpKind`.
    pub fn is_same_type(&self, other: &Op) -> bool {
        self.kind() == other.kind()
    }

    /// Whether `self` undoes `other`: same kind, opposite direction, and
    /// identical parameters (so the pair is a true identity, not merely two
    /// ops of the same family).
    pub fn is_inverse(&self, other: &Op) -> bool {
        if self.kind() != other.kind() || self.direction == other.direction {
            return false;
        }
        match (&self.data, &other.data) {
            (OpData::Matrix(a), OpData::Matrix(b)) => {
                // M composed with its own inverse direction is an identity
                // only when the parameters are literally identical — actual
                // matrix inversion is not attempted here, mirroring the
                // teacher's conservative `isInverse` for non-LUT ops.
                a == b
            }
            (OpData::Range(a), OpData::Range(b)) => a == b,
            (OpData::Exponent(a), OpData::Exponent(b)) => a == b,
            (OpData::Log(a), OpData::Log(b)) => a == b,
            (OpData::Cdl(a), OpData::Cdl(b)) => a == &b.inverted() || &a.inverted() == b,
            (OpData::ExposureContrast(a), OpData::ExposureContrast(b)) => a == &b.inverted() || &a.inverted() == b,
            (OpData::Lut1D(a), OpData::Lut1D(b)) => a == b,
            (OpData::Lut3D(a), OpData::Lut3D(b)) => a == b,
            _ => false,
        }
    }

    /// Whether `combine_with` would succeed (§4.3 rules 1-6).
    pub fn can_combine_with(&self, next: &Op) -> bool {
        self.combine_with(next).is_ok()
    }

    /// Combines `self` followed by `next` into a single equivalent op, when
    /// the pair matches one of the six composition rules. Returns
    /// `UnsupportedCompose` otherwise; the caller (the optimizer) leaves
    /// both ops untouched on error.
    pub fn combine_with(&self, next: &Op) -> Result<Op> {
        use OpData::*;
        match (&self.data, self.direction, &next.data, next.direction) {
            // Rule 1: Matrix ∘ Matrix.
            (Matrix(a), Direction::Forward, Matrix(b), Direction::Forward) => {
                Ok(Op::new(Matrix(a.compose(b)), Direction::Forward))
            }
            // Rule 2: Exponent ∘ Exponent (forward only; inverse exponent
            // composition would require per-component zero-checks the
            // teacher's ExponentOp does not perform either).
            (Exponent(a), Direction::Forward, Exponent(b), Direction::Forward) => {
                Ok(Op::new(Exponent(a.compose(b)), Direction::Forward))
            }
            // Rule 3: Log forward ∘ Log inverse with identical parameters
            // collapses to identity (NoOp), not a generic Log compose.
            (Log(a), Direction::Forward, Log(b), Direction::Inverse) if a == b => {
                Ok(Op::new(OpData::NoOp, Direction::Forward))
            }
            (Log(a), Direction::Inverse, Log(b), Direction::Forward) if a == b => {
                Ok(Op::new(OpData::NoOp, Direction::Forward))
            }
            // Rule 4: Lut1D ∘ Lut1D.
            (Lut1D(a), Direction::Forward, Lut1D(b), Direction::Forward) => {
                Ok(Op::new(Lut1D(a.compose(b, false)?), Direction::Forward))
            }
            // Rule 5: Lut3D ∘ Lut3D, and Lut3D ∘ Lut1D.
            (Lut3D(a), Direction::Forward, Lut3D(b), Direction::Forward) => {
                Ok(Op::new(Lut3D(a.compose(b)?), Direction::Forward))
            }
            (Lut3D(a), Direction::Forward, Lut1D(b), Direction::Forward) => {
                Ok(Op::new(Lut3D(a.compose_with_lut1d(b)?), Direction::Forward))
            }
            // Rule 6: Range ∘ Range.
            (Range(a), Direction::Forward, Range(b), Direction::Forward) => {
                Ok(Op::new(Range(a.compose(b)), Direction::Forward))
            }
            // Rule 7: adjacent exact-inverse pair of any kind collapses to a
            // no-op (checked last since it subsumes rules already handled
            // more precisely above for Log).
            _ if self.is_inverse(next) => Ok(Op::new(OpData::NoOp, Direction::Forward)),
            _ => Err(Error::unsupported_compose(self.kind(), next.kind())),
        }
    }

    /// Whether a legacy (pre-GPU-shader-cache) consumer could render this op
    /// — metadata only, no CPU behavior implication. Matrix/Range/Exponent/
    /// Cdl/Lut1D/Lut3D are legacy-renderable; the supplemented ops are not.
    pub fn supported_by_legacy_shader(&self) -> bool {
        matches!(
            self.data,
            OpData::Matrix(_)
                | OpData::Range(_)
                | OpData::Exponent(_)
                | OpData::Cdl(_)
                | OpData::Lut1D(_)
                | OpData::Lut3D(_)
                | OpData::NoOp
                | OpData::FileNoOp
                | OpData::LookNoOp
        )
    }

    /// Deterministic cache id, available only after `finalize`.
    pub fn cache_id(&self) -> Result<&str> {
        self.cache_id.as_deref().ok_or(Error::FinalizationRequired)
    }

    /// Computes the cache id and, for inverse-LUT ops the exact inverse
    /// cannot render cheaply, materializes a fast forward-approximation per
    /// `flags` (`LUT_INV_FAST`, §6 `OptimizationFlags`).
    pub(crate) fn finalize(&mut self, lut_inv_fast: bool) -> Result<()> {
        if self.direction == Direction::Unknown {
            return Err(Error::invalid_parameter(self.kind(), "direction must be Forward or Inverse to finalize"));
        }
        if let OpData::Lut1D(lut) = &self.data {
            if self.direction == Direction::Inverse && lut_inv_fast {
                let fast = lut.build_fast_inverse()?;
                self.data = OpData::Lut1D(fast);
                self.direction = Direction::Forward;
            }
        }
        let dir_tag = match self.direction {
            Direction::Forward => "F",
            Direction::Inverse => "I",
            Direction::Unknown => unreachable!("checked above"),
        };
        self.cache_id = Some(format!("{dir_tag}{}", self.data.cache_id()));
        Ok(())
    }

    /// Builds the immutable CPU renderer for this op (§4.4, §9). `fast_power`
    /// selects the Chebyshev approximation over `f32::powf` for Exponent/CDL.
    pub fn get_cpu_op(&self, fast_power: bool) -> Result<CpuRenderer> {
        match (&self.data, self.direction) {
            (OpData::Matrix(m), Direction::Forward) => Ok(CpuRenderer::Matrix {
                mat: row_major_mat4(&m.matrix),
                offset: Vec4::from_array(narrow4(&m.offset)),
            }),
            (OpData::Matrix(m), Direction::Inverse) => {
                let mat = row_major_mat4(&m.matrix);
                let inv = mat.inverse();
                let offset = Vec4::from_array(narrow4(&m.offset));
                Ok(CpuRenderer::Matrix { mat: inv, offset: -(inv * offset) })
            }
            (OpData::Range(r), direction) => {
                let (min_in, max_in, min_out, max_out) = if direction == Direction::Forward {
                    (r.min_in, r.max_in, r.min_out, r.max_out)
                } else {
                    (r.min_out, r.max_out, r.min_in, r.max_in)
                };
                Ok(CpuRenderer::Range {
                    min_in: min_in.unwrap_or(f64::NEG_INFINITY) as f32,
                    max_in: max_in.unwrap_or(f64::INFINITY) as f32,
                    min_out: min_out.unwrap_or(f64::NEG_INFINITY) as f32,
                    max_out: max_out.unwrap_or(f64::INFINITY) as f32,
                    clamp_lo: min_in.is_some(),
                    clamp_hi: max_in.is_some(),
                })
            }
            (OpData::Exponent(e), direction) => {
                let exponent = exponent_for_direction(e, direction);
                Ok(CpuRenderer::Exponent { exponent: narrow4(&exponent), fast_power })
            }
            (OpData::Log(l), direction) => Ok(log_renderer(l, direction)),
            (OpData::Cdl(c), direction) => Ok(cdl_renderer(c, direction, fast_power)),
            (OpData::ExposureContrast(ec), direction) => {
                let ec = if direction == Direction::Inverse { ec.inverted() } else { *ec };
                Ok(CpuRenderer::ExposureContrast {
                    exposure: ec.exposure as f32,
                    contrast: ec.contrast as f32,
                    gamma: ec.gamma as f32,
                    pivot: ec.pivot as f32,
                })
            }
            (OpData::GradingPrimary(g), direction) => Ok(CpuRenderer::GradingPrimary(grading_primary_params(g, direction))),
            (OpData::FixedFunction(f), direction) => fixed_function_renderer(&f.style, direction),
            (OpData::Lut1D(l), direction) => lut1d_renderer(l, direction),
            (OpData::Lut3D(l), direction) => lut3d_renderer(l, direction),
            (OpData::NoOp, _) | (OpData::FileNoOp, _) | (OpData::LookNoOp, _) => Ok(CpuRenderer::NoOp),
        }
    }
}

fn row_major_mat4(m: &[f64; 16]) -> Mat4 {
    // glam stores column-major; transpose the row-major input on load.
    Mat4::from_cols_array(&[
        m[0] as f32, m[4] as f32, m[8] as f32, m[12] as f32, //
        m[1] as f32, m[5] as f32, m[9] as f32, m[13] as f32, //
        m[2] as f32, m[6] as f32, m[10] as f32, m[14] as f32, //
        m[3] as f32, m[7] as f32, m[11] as f32, m[15] as f32,
    ])
}

fn narrow4(v: &[f64; 4]) -> [f32; 4] {
    [v[0] as f32, v[1] as f32, v[2] as f32, v[3] as f32]
}

fn exponent_for_direction(e: &ExponentData, direction: Direction) -> [f64; 4] {
    if direction == Direction::Forward {
        e.exponent
    } else {
        e.exponent.map(|v| 1.0 / v)
    }
}

fn log_renderer(l: &LogData, direction: Direction) -> CpuRenderer {
    let inverse = direction == Direction::Inverse;
    let base = l.base as f32;
    let log_slope = narrow3(&l.log_slope);
    let log_offset = narrow3(&l.log_offset);
    let lin_slope = narrow3(&l.lin_slope);
    let lin_offset = narrow3(&l.lin_offset);
    match l.break_point {
        None => CpuRenderer::LogAffine { base, log_slope, log_offset, lin_slope, lin_offset, inverse },
        Some(bp) => CpuRenderer::LogCamera {
            base,
            log_slope,
            log_offset,
            lin_slope,
            lin_offset,
            break_point: narrow3(&bp),
            linear_slope: narrow3(&l.effective_linear_slope()),
            inverse,
        },
    }
}

fn narrow3(v: &[f64; 3]) -> [f32; 3] {
    [v[0] as f32, v[1] as f32, v[2] as f32]
}

fn cdl_renderer(c: &CdlData, direction: Direction, fast_power: bool) -> CpuRenderer {
    CpuRenderer::Cdl {
        slope: narrow3(&c.slope),
        offset: narrow3(&c.offset),
        power: narrow3(&c.power),
        saturation: c.saturation as f32,
        style: c.style,
        direction,
        fast_power,
    }
}

fn grading_primary_params(g: &crate::opdata::GradingPrimaryData, direction: Direction) -> GradingPrimaryParams {
    // Forward pre-compute (original_source/ops/gradingprimary/GradingPrimary.cpp
    // `update`, simplified per the supplemented §4.4 formulas); the inverse
    // direction recomputes from the same artist-facing fields with the
    // reciprocal/negated roles, then the shared apply kernel runs unchanged.
    let (mut b, mut c, mut g_out) = match g.style {
        GradingStyle::Log => {
            let b: Vec<f32> = g
                .first
                .per_channel()
                .iter()
                .map(|ch| ((g.first.master + ch) * 6.25 / 1023.0) as f32)
                .collect();
            let c: Vec<f32> = g.second.per_channel().iter().map(|ch| (g.second.master * ch) as f32).collect();
            let gm: Vec<f32> = g.gamma.per_channel().iter().map(|ch| (1.0 / (g.gamma.master * ch)) as f32).collect();
            (b, c, gm)
        }
        GradingStyle::Linear => {
            let b: Vec<f32> = g.first.per_channel().iter().map(|ch| (g.first.master + ch) as f32).collect();
            let c: Vec<f32> = g.second.per_channel().iter().map(|ch| (g.second.master * ch) as f32).collect();
            let gm: Vec<f32> = g.gamma.per_channel().iter().map(|ch| (g.gamma.master * ch) as f32).collect();
            (b, c, gm)
        }
        GradingStyle::Video => {
            let b: Vec<f32> = g.first.per_channel().iter().map(|ch| (g.first.master + ch) as f32).collect();
            let c: Vec<f32> = g.second.per_channel().iter().map(|ch| (g.second.master * ch) as f32).collect();
            let gm: Vec<f32> = g.gamma.per_channel().iter().map(|ch| (1.0 / (g.gamma.master * ch)) as f32).collect();
            (b, c, gm)
        }
    };
    let pivot = match g.style {
        GradingStyle::Log | GradingStyle::Video => 0.5 + g.pivot * 0.5,
        GradingStyle::Linear => 0.18 * 2f64.powf(g.pivot),
    } as f32;
    if direction == Direction::Inverse {
        // Invert by swapping the roles of the pre-computed triplet: negate
        // the additive term, reciprocate the multiplicative terms.
        for v in b.iter_mut() {
            *v = -*v;
        }
        for v in c.iter_mut() {
            *v = 1.0 / *v;
        }
        for v in g_out.iter_mut() {
            *v = 1.0 / *v;
        }
    }
    GradingPrimaryParams {
        b: [b[0], b[1], b[2]],
        c: [c[0], c[1], c[2]],
        g: [g_out[0], g_out[1], g_out[2]],
        pivot,
        clamp: g.clamp,
        black: g.black as f32,
        white: g.white as f32,
        style: g.style,
    }
}

fn fixed_function_renderer(style: &crate::opdata::FixedFunctionStyle, direction: Direction) -> Result<CpuRenderer> {
    use crate::opdata::FixedFunctionStyle::*;
    match (style, direction) {
        (Rec2100Surround { gamma }, Direction::Forward) => Ok(CpuRenderer::Rec2100Surround { gamma: *gamma as f32 }),
        (Rec2100Surround { gamma }, Direction::Inverse) => Ok(CpuRenderer::Rec2100Surround { gamma: 1.0 / *gamma as f32 }),
        (RgbToHsv, Direction::Forward) => Ok(CpuRenderer::RgbToHsv),
        (RgbToHsv, Direction::Inverse) => Ok(CpuRenderer::HsvToRgb),
        (HsvToRgb, Direction::Forward) => Ok(CpuRenderer::HsvToRgb),
        (HsvToRgb, Direction::Inverse) => Ok(CpuRenderer::RgbToHsv),
        (AcesRedMod03, Direction::Forward) => Ok(CpuRenderer::AcesRedMod03 { inverse: false }),
        (AcesRedMod03, Direction::Inverse) => Ok(CpuRenderer::AcesRedMod03 { inverse: true }),
        (AcesRedMod03Inverse, Direction::Forward) => Ok(CpuRenderer::AcesRedMod03 { inverse: true }),
        (AcesRedMod03Inverse, Direction::Inverse) => Ok(CpuRenderer::AcesRedMod03 { inverse: false }),
        (AcesGlowO3, Direction::Forward) => Ok(CpuRenderer::AcesGlowO3 { inverse: false }),
        (AcesGlowO3, Direction::Inverse) => Ok(CpuRenderer::AcesGlowO3 { inverse: true }),
        (AcesGlowO3Inverse, Direction::Forward) => Ok(CpuRenderer::AcesGlowO3 { inverse: true }),
        (AcesGlowO3Inverse, Direction::Inverse) => Ok(CpuRenderer::AcesGlowO3 { inverse: false }),
        (Other(name), _) => Err(Error::unsupported_style(OpKind::FixedFunction, name.clone())),
        (_, Direction::Unknown) => Err(Error::invalid_parameter(OpKind::FixedFunction, "direction must be resolved before rendering")),
    }
}

fn lut1d_renderer(l: &Lut1DOpData, direction: Direction) -> Result<CpuRenderer> {
    match direction {
        // A `finalize`d op whose inverse was materialized as a fast forward
        // approximation already carries `Direction::Forward`; this arm only
        // ever sees a true forward LUT.
        Direction::Forward => Ok(CpuRenderer::Lut1D { lut: l.clone(), invert_exact: false }),
        // No fast approximation was materialized (flag unset, or finalize
        // was skipped): fall back to exact per-pixel inversion.
        Direction::Inverse => Ok(CpuRenderer::Lut1D { lut: l.clone(), invert_exact: true }),
        Direction::Unknown => Err(Error::invalid_parameter(OpKind::Lut1D, "direction must be resolved before rendering")),
    }
}

fn lut3d_renderer(l: &crate::lut3d::Lut3DOpData, direction: Direction) -> Result<CpuRenderer> {
    match direction {
        Direction::Forward => Ok(CpuRenderer::Lut3D { lut: l.clone() }),
        Direction::Inverse => Ok(CpuRenderer::Lut3D { lut: l.invert_exact()? }),
        Direction::Unknown => Err(Error::invalid_parameter(OpKind::Lut3D, "direction must be resolved before rendering")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opdata::MatrixData;

    #[test]
    fn matrix_compose_rule1() {
        let a = Op::new(OpData::Matrix(MatrixData { matrix: MatrixData::IDENTITY.matrix, offset: [1.0, 0.0, 0.0, 0.0] }), Direction::Forward);
        let b = Op::new(OpData::Matrix(MatrixData { matrix: MatrixData::IDENTITY.matrix, offset: [0.0, 1.0, 0.0, 0.0] }), Direction::Forward);
        let combined = a.combine_with(&b).expect("matrices compose");
        match combined.data() {
            OpData::Matrix(m) => assert_eq!(m.offset, [1.0, 1.0, 0.0, 0.0]),
            _ => panic!("expected matrix"),
        }
    }

    #[test]
    fn exponent_inverse_pair_collapses_to_noop() {
        let fwd = Op::new(OpData::Exponent(ExponentData { exponent: [2.0; 4] }), Direction::Forward);
        let inv = Op::new(OpData::Exponent(ExponentData { exponent: [2.0; 4] }), Direction::Inverse);
        assert!(fwd.is_inverse(&inv));
        let combined = fwd.combine_with(&inv).expect("inverse pair collapses");
        assert!(matches!(combined.data(), OpData::NoOp));
    }

    #[test]
    fn mismatched_kinds_reject_compose() {
        let a = Op::new(OpData::Matrix(MatrixData::IDENTITY), Direction::Forward);
        let b = Op::new(OpData::Exponent(ExponentData { exponent: [1.0; 4] }), Direction::Forward);
        assert!(!a.can_combine_with(&b));
    }

    #[test]
    fn unfinalized_op_has_no_cache_id() {
        let op = Op::new(OpData::NoOp, Direction::Forward);
        assert!(op.cache_id().is_err());
    }

    #[test]
    fn finalize_sets_cache_id() {
        let mut op = Op::new(OpData::Matrix(MatrixData::IDENTITY), Direction::Forward);
        op.finalize(false).unwrap();
        assert!(op.cache_id().unwrap().starts_with('F'));
    }
}
