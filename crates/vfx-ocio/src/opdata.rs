//! Immutable, value-typed parameter blocks for each operator kind (C2).
//!
//! `OpData` is a tagged variant over [`OpKind`](crate::error::OpKind) rather
//! than a class hierarchy with virtual dispatch, per §9's re-architecture
//! note: `validate`/`is_identity`/`is_no_op`/`cache_id` are inherent methods
//! matching over the variant. Each variant's parameter struct is immutable
//! once built; `OpData::clone()` is a plain deep `#[derive(Clone)]`.

use crate::error::{Error, OpKind, Result};
use crate::lut1d::Lut1DOpData;
use crate::lut3d::Lut3DOpData;

/// Forward or inverse application of an op. `Unknown` is a contract
/// violation at `finalize` (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Forward application.
    #[default]
    Forward,
    /// Inverse application.
    Inverse,
    /// Not yet assigned; rejected by `finalize`.
    Unknown,
}

impl Direction {
    /// The opposite direction; `Unknown` maps to itself.
    pub fn opposite(self) -> Self {
        match self {
            Self::Forward => Self::Inverse,
            Self::Inverse => Self::Forward,
            Self::Unknown => Self::Unknown,
        }
    }
}

/// 4x4 matrix + 4-vector offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixData {
    /// Row-major 4x4 matrix.
    pub matrix: [f64; 16],
    /// Per-channel additive offset, applied after the matrix multiply.
    pub offset: [f64; 4],
}

impl MatrixData {
    /// The 4x4 identity with zero offset.
    pub const IDENTITY: Self = Self {
        matrix: [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ],
        offset: [0.0, 0.0, 0.0, 0.0],
    };

    /// Non-singular is not required; identity is detected by exact
    /// equality to the 4x4 identity with zero offset.
    pub fn is_identity(&self) -> bool {
        self.matrix == Self::IDENTITY.matrix && self.offset == [0.0; 4]
    }

    /// True unless the matrix is diagonal (off-diagonal entries all zero) —
    /// a diagonal matrix cannot mix channels.
    pub fn has_channel_crosstalk(&self) -> bool {
        for r in 0..4 {
            for c in 0..4 {
                if r != c && self.matrix[r * 4 + c] != 0.0 {
                    return true;
                }
            }
        }
        false
    }

    /// 4x4 matrix multiply (`self` applied first, then `next`), offsets
    /// transformed accordingly: rule 1, Matrix ∘ Matrix.
    pub fn compose(&self, next: &MatrixData) -> MatrixData {
        let mut out = [0.0f64; 16];
        for r in 0..4 {
            for c in 0..4 {
                let mut sum = 0.0;
                for k in 0..4 {
                    sum += next.matrix[r * 4 + k] * self.matrix[k * 4 + c];
                }
                out[r * 4 + c] = sum;
            }
        }
        let mut offset = [0.0f64; 4];
        for r in 0..4 {
            let mut sum = next.offset[r];
            for k in 0..4 {
                sum += next.matrix[r * 4 + k] * self.offset[k];
            }
            offset[r] = sum;
        }
        MatrixData { matrix: out, offset }
    }

    fn cache_id(&self) -> String {
        let mut s = String::new();
        for v in self.matrix {
            s.push_str(&format!("{:.7e},", v));
        }
        for v in self.offset {
            s.push_str(&format!("{:.7e},", v));
        }
        s
    }
}

/// `(minIn, maxIn, minOut, maxOut)` with independent clamp flags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeData {
    /// Lower input bound; `None` disables the lower clamp.
    pub min_in: Option<f64>,
    /// Upper input bound; `None` disables the upper clamp.
    pub max_in: Option<f64>,
    /// Lower output bound; defaults to `min_in` when `None` but `min_in` set.
    pub min_out: Option<f64>,
    /// Upper output bound; defaults to `max_in` when `None` but `max_in` set.
    pub max_out: Option<f64>,
}

impl RangeData {
    pub(crate) fn validate(&self) -> Result<()> {
        if let (Some(lo), Some(hi)) = (self.min_in, self.max_in) {
            if lo > hi {
                return Err(Error::invalid_parameter(
                    OpKind::Range,
                    format!("minIn {lo} > maxIn {hi}"),
                ));
            }
        }
        if let (Some(lo), Some(hi)) = (self.min_out, self.max_out) {
            if lo > hi {
                return Err(Error::invalid_parameter(
                    OpKind::Range,
                    format!("minOut {lo} > maxOut {hi}"),
                ));
            }
        }
        Ok(())
    }

    pub(crate) fn is_identity(&self) -> bool {
        self.min_in.is_none() && self.max_in.is_none() && self.min_out.is_none() && self.max_out.is_none()
    }

    fn cache_id(&self) -> String {
        format!(
            "{:?},{:?},{:?},{:?}",
            self.min_in.map(|v| format!("{:.7e}", v)),
            self.max_in.map(|v| format!("{:.7e}", v)),
            self.min_out.map(|v| format!("{:.7e}", v)),
            self.max_out.map(|v| format!("{:.7e}", v)),
        )
    }

    /// Rule 6: intersect domain and range; `None` means the identity
    /// boundary on that side.
    pub fn compose(&self, next: &RangeData) -> RangeData {
        fn tighter_lo(a: Option<f64>, b: Option<f64>) -> Option<f64> {
            match (a, b) {
                (Some(x), Some(y)) => Some(x.max(y)),
                (Some(x), None) => Some(x),
                (None, y) => y,
            }
        }
        fn tighter_hi(a: Option<f64>, b: Option<f64>) -> Option<f64> {
            match (a, b) {
                (Some(x), Some(y)) => Some(x.min(y)),
                (Some(x), None) => Some(x),
                (None, y) => y,
            }
        }
        RangeData {
            min_in: tighter_lo(self.min_in, next.min_in),
            max_in: tighter_hi(self.max_in, next.max_in),
            min_out: tighter_lo(self.min_out, next.min_out),
            max_out: tighter_hi(self.max_out, next.max_out),
        }
    }
}

/// RGBA per-channel exponent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentData {
    /// Exponent applied to each of R, G, B, A.
    pub exponent: [f64; 4],
}

impl ExponentData {
    pub(crate) fn validate(&self, direction: Direction) -> Result<()> {
        if direction == Direction::Inverse && self.exponent.iter().any(|&e| e == 0.0) {
            return Err(Error::invalid_parameter(
                OpKind::Exponent,
                "inverse exponent requires all components nonzero",
            ));
        }
        Ok(())
    }

    pub(crate) fn is_identity(&self) -> bool {
        self.exponent == [1.0; 4]
    }

    fn cache_id(&self) -> String {
        self.exponent.iter().map(|v| format!("{:.7e}", v)).collect::<Vec<_>>().join(",")
    }

    /// Rule 2: component-wise multiply exponents.
    pub fn compose(&self, next: &ExponentData) -> ExponentData {
        let mut exponent = [0.0; 4];
        for i in 0..4 {
            exponent[i] = self.exponent[i] * next.exponent[i];
        }
        ExponentData { exponent }
    }
}

/// Affine or camera-style log curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogData {
    /// Logarithm base; must lie in `(1, ∞)`.
    pub base: f64,
    /// Per-channel multiplier applied to the log result.
    pub log_slope: [f64; 3],
    /// Per-channel additive offset applied to the log result.
    pub log_offset: [f64; 3],
    /// Per-channel multiplier applied to the input before the log.
    pub lin_slope: [f64; 3],
    /// Per-channel additive offset applied to the input before the log.
    pub lin_offset: [f64; 3],
    /// Camera-log linear segment below this break point, per channel.
    /// `None` for plain affine log.
    pub break_point: Option<[f64; 3]>,
    /// Explicit linear-segment slope. `None` means the slope is computed
    /// for C¹ continuity at `break_point` (Open Question, §9).
    pub linear_slope: Option<[f64; 3]>,
}

/// `tiny` epsilon floor inside the log, per §4.4.
pub const LOG_TINY: f64 = 1e-10;

impl LogData {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.base <= 1.0 {
            return Err(Error::invalid_parameter(OpKind::Log, format!("base {} must be > 1", self.base)));
        }
        Ok(())
    }

    pub(crate) fn is_identity(&self) -> bool {
        false
    }

    fn cache_id(&self) -> String {
        format!(
            "{:.7e}:{:?}:{:?}:{:?}:{:?}:{:?}:{:?}",
            self.base, self.log_slope, self.log_offset, self.lin_slope, self.lin_offset, self.break_point,
            self.linear_slope
        )
    }

    /// Computed C¹-continuous linear-segment slope at `break_point`, per
    /// channel, when `linear_slope` is not explicitly given.
    pub fn effective_linear_slope(&self) -> [f64; 3] {
        if let Some(s) = self.linear_slope {
            return s;
        }
        let bp = self.break_point.unwrap_or([0.0; 3]);
        let mut out = [0.0; 3];
        for c in 0..3 {
            let lin_to_log = self.lin_slope[c] * bp[c] + self.lin_offset[c];
            let denom = lin_to_log.max(LOG_TINY) * self.base.ln();
            out[c] = self.log_slope[c] * self.lin_slope[c] / denom;
        }
        out
    }
}

/// ASC CDL clamp style: whether intermediate/final values are clamped to
/// `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CdlStyle {
    /// ASC CDL v1.2: clamps after slope+offset and after saturation.
    #[default]
    V1_2,
    /// No-clamp variant used for scene-referred grading.
    NoClamp,
}

/// ASC Color Decision List parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CdlData {
    /// Per-channel multiplicative slope.
    pub slope: [f64; 3],
    /// Per-channel additive offset.
    pub offset: [f64; 3],
    /// Per-channel power.
    pub power: [f64; 3],
    /// Global saturation.
    pub saturation: f64,
    /// Clamp style.
    pub style: CdlStyle,
}

impl CdlData {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.style == CdlStyle::V1_2 && self.power.iter().any(|&p| p < 0.0) {
            return Err(Error::invalid_parameter(OpKind::Cdl, "power must be >= 0 in clamp styles"));
        }
        Ok(())
    }

    pub(crate) fn is_identity(&self) -> bool {
        self.slope == [1.0; 3] && self.offset == [0.0; 3] && self.power == [1.0; 3] && (self.saturation - 1.0).abs() < 1e-12
    }

    fn cache_id(&self) -> String {
        format!(
            "{:?}:{:?}:{:?}:{:.7e}:{:?}",
            self.slope, self.offset, self.power, self.saturation, self.style
        )
    }

    /// Reverses slope/offset/power/saturation for the inverse direction.
    pub fn inverted(&self) -> CdlData {
        CdlData {
            slope: self.slope.map(|s| 1.0 / s),
            offset: {
                let mut o = [0.0; 3];
                for i in 0..3 {
                    o[i] = -self.offset[i] / self.slope[i];
                }
                o
            },
            power: self.power.map(|p| 1.0 / p),
            saturation: 1.0 / self.saturation,
            style: self.style,
        }
    }
}

/// Exposure/contrast/gamma about a pivot (§3 supplemented).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExposureContrastStyle {
    /// Linear light.
    #[default]
    Linear,
    /// Video-referred (gamma-encoded).
    Video,
    /// Logarithmic with a configurable base.
    LogarithmicBase,
}

/// ExposureContrast operator parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureContrastData {
    /// Exposure, in stops.
    pub exposure: f64,
    /// Contrast about `pivot`.
    pub contrast: f64,
    /// Gamma applied after contrast.
    pub gamma: f64,
    /// Pivot point for the contrast/gamma stages.
    pub pivot: f64,
    /// Encoding style (provenance only — does not change the core formula).
    pub style: ExposureContrastStyle,
    /// Provenance flag: whether the three scalars are meant to be
    /// adjustable post-finalization by the caller. The core always reads
    /// the value present at `apply` time; no subscription mechanism exists.
    pub dynamic: bool,
}

impl ExposureContrastData {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.contrast <= 0.0 {
            return Err(Error::invalid_parameter(OpKind::ExposureContrast, "contrast must be > 0"));
        }
        if self.gamma <= 0.0 {
            return Err(Error::invalid_parameter(OpKind::ExposureContrast, "gamma must be > 0"));
        }
        Ok(())
    }

    pub(crate) fn is_identity(&self) -> bool {
        self.exposure == 0.0 && (self.contrast - 1.0).abs() < 1e-12 && (self.gamma - 1.0).abs() < 1e-12
    }

    fn cache_id(&self) -> String {
        format!(
            "{:.7e}:{:.7e}:{:.7e}:{:.7e}:{:?}",
            self.exposure, self.contrast, self.gamma, self.pivot, self.style
        )
    }

    /// Reverses exposure/contrast/gamma for the inverse direction.
    pub fn inverted(&self) -> ExposureContrastData {
        ExposureContrastData {
            exposure: -self.exposure,
            contrast: 1.0 / self.contrast,
            gamma: 1.0 / self.gamma,
            pivot: self.pivot,
            style: self.style,
            dynamic: self.dynamic,
        }
    }
}

/// Concrete, representative `FixedFunction` style set (§3 supplemented).
/// Any other style is accepted by the data model but rejected by the CPU
/// dispatcher with `UnsupportedStyle`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixedFunctionStyle {
    /// HDR surround adjustment; `gamma` is the sole parameter.
    Rec2100Surround {
        /// Surround gamma.
        gamma: f64,
    },
    /// RGB to HSV.
    RgbToHsv,
    /// HSV to RGB; exact inverse of `RgbToHsv`.
    HsvToRgb,
    /// Legacy ACES red-hue modifier.
    AcesRedMod03,
    /// Inverse of `AcesRedMod03`.
    AcesRedMod03Inverse,
    /// ACES glow compensation.
    AcesGlowO3,
    /// Inverse of `AcesGlowO3`.
    AcesGlowO3Inverse,
    /// An unrecognized style name, retained for provenance; always rejected
    /// at render dispatch with `UnsupportedStyle`.
    Other(String),
}

impl FixedFunctionStyle {
    fn name(&self) -> String {
        match self {
            Self::Rec2100Surround { .. } => "Rec2100Surround".to_string(),
            Self::RgbToHsv => "RgbToHsv".to_string(),
            Self::HsvToRgb => "HsvToRgb".to_string(),
            Self::AcesRedMod03 => "Aces_RedMod03".to_string(),
            Self::AcesRedMod03Inverse => "Aces_RedMod03Inverse".to_string(),
            Self::AcesGlowO3 => "Aces_GlowO3".to_string(),
            Self::AcesGlowO3Inverse => "Aces_GlowO3Inverse".to_string(),
            Self::Other(s) => s.clone(),
        }
    }
}

/// `FixedFunction` operator parameters: a style plus whatever parameter
/// list that style carries (folded into the style's own fields).
#[derive(Debug, Clone, PartialEq)]
pub struct FixedFunctionData {
    /// The style (and its parameters).
    pub style: FixedFunctionStyle,
}

impl FixedFunctionData {
    pub(crate) fn validate(&self) -> Result<()> {
        Ok(())
    }

    pub(crate) fn is_identity(&self) -> bool {
        false
    }

    fn cache_id(&self) -> String {
        self.style.name()
    }
}

/// Master + per-channel triplet shared by all three `GradingPrimary`
/// parameter families (brightness/offset/lift, contrast/exposure/gain,
/// gamma), matching `original_source`'s `GradingRGBM`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GradingRgbm {
    /// Master (applies to all channels).
    pub master: f64,
    /// Red channel value.
    pub red: f64,
    /// Green channel value.
    pub green: f64,
    /// Blue channel value.
    pub blue: f64,
}

impl GradingRgbm {
    /// Per-channel `master OP channel` triplet.
    pub fn per_channel(&self) -> [f64; 3] {
        [self.red, self.green, self.blue]
    }
}

/// Which artist-facing triplet feeds a `GradingPrimary` op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GradingStyle {
    /// `{brightness, contrast, gamma}`, log-encoded.
    #[default]
    Log,
    /// `{offset, exposure, contrast}`, linear light.
    Linear,
    /// `{lift, gain, gamma}`, video-referred.
    Video,
}

/// Artist-facing brightness/contrast/gamma triplet at a chosen pivot (§3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradingPrimaryData {
    /// Which triplet/pivot-formula family is active.
    pub style: GradingStyle,
    /// `brightness` (Log), `offset` (Linear), or `lift` (Video).
    pub first: GradingRgbm,
    /// `contrast` (Log), `exposure` (Linear), or `gain` (Video).
    pub second: GradingRgbm,
    /// `gamma` (Log), `contrast` (Linear — applied at the pivot, see
    /// `cpu::grading_primary_pixel`), or `gamma` (Video).
    pub gamma: GradingRgbm,
    /// Scalar pivot input to the per-style pivot formula.
    pub pivot: f64,
    /// Whether clamping is enabled at all; when `false`, `black`/`white`
    /// are ignored (see DESIGN.md Open Question 3).
    pub clamp: bool,
    /// Lower clamp bound.
    pub black: f64,
    /// Upper clamp bound.
    pub white: f64,
}

impl GradingPrimaryData {
    pub(crate) fn validate(&self) -> Result<()> {
        const LOWER: f64 = 0.01;
        // For Linear, `gamma` is the field that plays contrast's role (the
        // multiplicative term applied at the pivot, cpu::grading_primary_pixel);
        // `second` is the unbounded exposure-stop value there, not contrast, so
        // the 0.01 floor binds to `gamma` in every style, never to `second`.
        for g in [self.gamma.master, self.gamma.red, self.gamma.green, self.gamma.blue] {
            if g < LOWER {
                return Err(Error::invalid_parameter(
                    OpKind::GradingPrimary,
                    format!("contrast/gamma {g} below lower bound {LOWER}"),
                ));
            }
        }
        if self.white <= self.black {
            return Err(Error::invalid_parameter(OpKind::GradingPrimary, "pivotWhite must be > pivotBlack"));
        }
        if self.clamp && self.black > self.white {
            return Err(Error::invalid_parameter(OpKind::GradingPrimary, "clampBlack must be <= clampWhite"));
        }
        Ok(())
    }

    pub(crate) fn is_identity(&self) -> bool {
        let first_identity = self.first.master == 0.0 && self.first.red == 0.0 && self.first.green == 0.0 && self.first.blue == 0.0;
        // `second`'s identity value is style-dependent: Linear applies it as
        // `2^second` (cpu::grading_primary_pixel), so its identity is 0.0, not
        // the multiplicative identity 1.0 that Log/Video's `second` (contrast/
        // gain) share.
        let second_identity_value = if self.style == GradingStyle::Linear { 0.0 } else { 1.0 };
        let second_identity = self.second.master == second_identity_value
            && self.second.red == second_identity_value
            && self.second.green == second_identity_value
            && self.second.blue == second_identity_value;
        let gamma_identity = self.gamma.master == 1.0 && self.gamma.red == 1.0 && self.gamma.green == 1.0 && self.gamma.blue == 1.0;
        !self.clamp && gamma_identity && first_identity && second_identity
    }

    fn cache_id(&self) -> String {
        format!(
            "{:?}:{:?}:{:?}:{:?}:{:.7e}:{}:{:.7e}:{:.7e}",
            self.style, self.first, self.second, self.gamma, self.pivot, self.clamp, self.black, self.white
        )
    }
}

/// `OpData`: the tagged variant over every supported transform kind (§3, §4.2).
#[derive(Debug, Clone, PartialEq)]
pub enum OpData {
    /// 4x4 matrix + offset.
    Matrix(MatrixData),
    /// Domain/range remap.
    Range(RangeData),
    /// Per-channel power.
    Exponent(ExponentData),
    /// Affine or camera log curve.
    Log(LogData),
    /// ASC CDL.
    Cdl(CdlData),
    /// Exposure/contrast/gamma about a pivot.
    ExposureContrast(ExposureContrastData),
    /// Fixed-function style + parameters.
    FixedFunction(FixedFunctionData),
    /// Artist-facing grading primary triplet.
    GradingPrimary(GradingPrimaryData),
    /// 1D lookup table.
    Lut1D(Lut1DOpData),
    /// 3D lookup table.
    Lut3D(Lut3DOpData),
    /// Identity marker from a config/file-reading layer.
    NoOp,
    /// Identity marker recording that a file read produced no-op content.
    FileNoOp,
    /// Identity marker recording that a look evaluated to no-op content.
    LookNoOp,
}

impl OpData {
    /// The tag identifying which variant is active.
    pub fn kind(&self) -> OpKind {
        match self {
            Self::Matrix(_) => OpKind::Matrix,
            Self::Range(_) => OpKind::Range,
            Self::Exponent(_) => OpKind::Exponent,
            Self::Log(_) => OpKind::Log,
            Self::Cdl(_) => OpKind::Cdl,
            Self::ExposureContrast(_) => OpKind::ExposureContrast,
            Self::FixedFunction(_) => OpKind::FixedFunction,
            Self::GradingPrimary(_) => OpKind::GradingPrimary,
            Self::Lut1D(_) => OpKind::Lut1D,
            Self::Lut3D(_) => OpKind::Lut3D,
            Self::NoOp | Self::FileNoOp | Self::LookNoOp => OpKind::NoOp,
        }
    }

    /// Validates the op's own parameters, independent of direction.
    /// Direction-dependent checks (e.g. Exponent's zero-component rule)
    /// are validated via [`Self::validate_for_direction`].
    pub fn validate(&self) -> Result<()> {
        self.validate_for_direction(Direction::Forward)
    }

    /// Full validation including direction-dependent invariants.
    pub fn validate_for_direction(&self, direction: Direction) -> Result<()> {
        match self {
            Self::Matrix(_) => Ok(()),
            Self::Range(d) => d.validate(),
            Self::Exponent(d) => d.validate(direction),
            Self::Log(d) => d.validate(),
            Self::Cdl(d) => d.validate(),
            Self::ExposureContrast(d) => d.validate(),
            Self::FixedFunction(d) => d.validate(),
            Self::GradingPrimary(d) => d.validate(),
            Self::Lut1D(d) => d.validate(),
            Self::Lut3D(d) => d.validate(),
            Self::NoOp | Self::FileNoOp | Self::LookNoOp => Ok(()),
        }
    }

    /// Conservative identity check (§4.2): may return `false` for an
    /// identity encoded unusually, but never `true` for a non-identity.
    pub fn is_identity(&self) -> bool {
        match self {
            Self::Matrix(d) => d.is_identity(),
            Self::Range(d) => d.is_identity(),
            Self::Exponent(d) => d.is_identity(),
            Self::Log(d) => d.is_identity(),
            Self::Cdl(d) => d.is_identity(),
            Self::ExposureContrast(d) => d.is_identity(),
            Self::FixedFunction(d) => d.is_identity(),
            Self::GradingPrimary(d) => d.is_identity(),
            Self::Lut1D(d) => d.is_identity(),
            Self::Lut3D(d) => d.is_identity(),
            Self::NoOp | Self::FileNoOp | Self::LookNoOp => true,
        }
    }

    /// True iff removing the op changes no pixel; safe to call after
    /// `validate`.
    pub fn is_no_op(&self) -> bool {
        match self {
            Self::Lut1D(d) => d.is_no_op(),
            _ => self.is_identity(),
        }
    }

    /// Deterministic cache identifier at 7 significant digits (§3).
    pub fn cache_id(&self) -> String {
        let (tag, body) = match self {
            Self::Matrix(d) => ("Matrix", d.cache_id()),
            Self::Range(d) => ("Range", d.cache_id()),
            Self::Exponent(d) => ("Exponent", d.cache_id()),
            Self::Log(d) => ("Log", d.cache_id()),
            Self::Cdl(d) => ("Cdl", d.cache_id()),
            Self::ExposureContrast(d) => ("ExposureContrast", d.cache_id()),
            Self::FixedFunction(d) => ("FixedFunction", d.cache_id()),
            Self::GradingPrimary(d) => ("GradingPrimary", d.cache_id()),
            Self::Lut1D(d) => ("Lut1D", d.cache_id()),
            Self::Lut3D(d) => ("Lut3D", d.cache_id()),
            Self::NoOp => ("NoOp", String::new()),
            Self::FileNoOp => ("FileNoOp", String::new()),
            Self::LookNoOp => ("LookNoOp", String::new()),
        };
        format!("<{tag}{body}>")
    }

    /// Whether any output channel depends on more than one input channel
    /// (§4.3 supplemented table).
    pub fn has_channel_crosstalk(&self) -> bool {
        match self {
            Self::Matrix(d) => d.has_channel_crosstalk(),
            Self::Range(_) | Self::Exponent(_) | Self::Log(_) | Self::ExposureContrast(_) | Self::GradingPrimary(_) => false,
            Self::Lut1D(d) => d.hue_adjust() != crate::lut1d::HueAdjust::Off,
            Self::Cdl(_) | Self::FixedFunction(_) | Self::Lut3D(_) => true,
            Self::NoOp | Self::FileNoOp | Self::LookNoOp => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_identity_detected() {
        assert!(MatrixData::IDENTITY.is_identity());
        assert!(OpData::Matrix(MatrixData::IDENTITY).is_no_op());
    }

    #[test]
    fn matrix_crosstalk_only_for_nondiagonal() {
        assert!(!MatrixData::IDENTITY.has_channel_crosstalk());
        let mut m = MatrixData::IDENTITY;
        m.matrix[1] = 0.5;
        assert!(m.has_channel_crosstalk());
    }

    #[test]
    fn range_validate_rejects_inverted_bounds() {
        let r = RangeData {
            min_in: Some(1.0),
            max_in: Some(0.0),
            min_out: None,
            max_out: None,
        };
        assert!(r.validate().is_err());
    }

    #[test]
    fn exponent_inverse_rejects_zero_component() {
        let e = ExponentData { exponent: [1.0, 0.0, 1.0, 1.0] };
        assert!(e.validate(Direction::Inverse).is_err());
        assert!(e.validate(Direction::Forward).is_ok());
    }

    #[test]
    fn grading_primary_validates_pivot_ordering() {
        let mut g = GradingPrimaryData {
            style: GradingStyle::Log,
            first: GradingRgbm::default(),
            second: GradingRgbm {
                master: 1.0,
                red: 1.0,
                green: 1.0,
                blue: 1.0,
            },
            gamma: GradingRgbm {
                master: 1.0,
                red: 1.0,
                green: 1.0,
                blue: 1.0,
            },
            pivot: 0.0,
            clamp: false,
            black: 1.0,
            white: 0.0,
        };
        assert!(g.validate().is_err());
        g.white = 2.0;
        assert!(g.validate().is_ok());
    }

    #[test]
    fn cache_id_differs_on_parameter_change() {
        let a = OpData::Exponent(ExponentData { exponent: [2.0; 4] });
        let b = OpData::Exponent(ExponentData { exponent: [2.0000001; 4] });
        assert_ne!(a.cache_id(), b.cache_id());
    }
}
