//! Error taxonomy for the core color processing pipeline (§7).
//!
//! # Propagation policy
//!
//! Validation and finalization surface errors to the caller; no partial
//! state is left in an [`crate::oplist::OpList`]. The apply path only ever
//! reports [`Error::FinalizationRequired`] and [`Error::ImageDescError`] —
//! numeric issues (NaN, overflow) are handled by the kernels' documented NaN
//! policy and never raise an error. Optimizer fusion failures are non-fatal:
//! if a fusion fails mid-list, the list is left unchanged from before that
//! pass.

use thiserror::Error as ThisError;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Tag identifying which operator kind an error concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// 4x4 matrix + offset.
    Matrix,
    /// Min/max domain and range remap.
    Range,
    /// Per-channel power.
    Exponent,
    /// Affine or camera log curve.
    Log,
    /// ASC CDL (slope/offset/power/saturation).
    Cdl,
    /// Exposure/contrast/gamma about a pivot.
    ExposureContrast,
    /// Fixed-function style with a parameter list.
    FixedFunction,
    /// Artist-facing brightness/contrast/gamma triplet.
    GradingPrimary,
    /// 1D lookup table.
    Lut1D,
    /// 3D lookup table.
    Lut3D,
    /// Identity marker (NoOp/FileNoOp/LookNoOp).
    NoOp,
}

impl std::fmt::Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Matrix => "Matrix",
            Self::Range => "Range",
            Self::Exponent => "Exponent",
            Self::Log => "Log",
            Self::Cdl => "Cdl",
            Self::ExposureContrast => "ExposureContrast",
            Self::FixedFunction => "FixedFunction",
            Self::GradingPrimary => "GradingPrimary",
            Self::Lut1D => "Lut1D",
            Self::Lut3D => "Lut3D",
            Self::NoOp => "NoOp",
        };
        write!(f, "{s}")
    }
}

/// Errors produced by the core color processing pipeline.
#[derive(Debug, ThisError)]
pub enum Error {
    /// OpData validation, out-of-range grid size, zero exponent in
    /// inverse, non-monotone pivot. Caller-recoverable.
    #[error("invalid parameter for {kind}: {reason}")]
    InvalidParameter {
        /// Which operator kind rejected the parameter.
        kind: OpKind,
        /// Human-readable reason.
        reason: String,
    },

    /// Renderer dispatch has no implementation for this style.
    /// Caller-recoverable (select a different style).
    #[error("unsupported style for {kind}: {style}")]
    UnsupportedStyle {
        /// Operator kind.
        kind: OpKind,
        /// The unsupported style name.
        style: String,
    },

    /// 1D/3D LUT inversion cannot be constructed even in fast mode.
    /// Caller-recoverable (request exact inversion, or accept identity).
    #[error("inversion failed for {kind}: {reason}")]
    InversionFailed {
        /// Operator kind.
        kind: OpKind,
        /// Human-readable reason.
        reason: String,
    },

    /// Optimizer asked to compose incompatible ops. Non-fatal at the
    /// optimizer level — treated as "do not fuse".
    #[error("cannot compose {a_kind} with {b_kind}")]
    UnsupportedCompose {
        /// Kind of the first (earlier) op.
        a_kind: OpKind,
        /// Kind of the second (later) op.
        b_kind: OpKind,
    },

    /// `apply` was called before `finalize`. Caller fault.
    #[error("OpList::apply called before finalize")]
    FinalizationRequired,

    /// Strides or channel count violate the §6 image-description
    /// invariants. Caller fault.
    #[error("invalid image description: {reason}")]
    ImageDescError {
        /// Human-readable reason.
        reason: String,
    },

    /// Invariant violation in the core. Non-recoverable; aborts
    /// processing.
    #[error("internal error: {reason}")]
    Internal {
        /// Human-readable reason.
        reason: String,
    },
}

impl Error {
    /// Creates an [`Error::InvalidParameter`].
    #[inline]
    pub fn invalid_parameter(kind: OpKind, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            kind,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::UnsupportedStyle`].
    #[inline]
    pub fn unsupported_style(kind: OpKind, style: impl Into<String>) -> Self {
        Self::UnsupportedStyle {
            kind,
            style: style.into(),
        }
    }

    /// Creates an [`Error::InversionFailed`].
    #[inline]
    pub fn inversion_failed(kind: OpKind, reason: impl Into<String>) -> Self {
        Self::InversionFailed {
            kind,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::UnsupportedCompose`].
    #[inline]
    pub fn unsupported_compose(a_kind: OpKind, b_kind: OpKind) -> Self {
        Self::UnsupportedCompose { a_kind, b_kind }
    }

    /// Creates an [`Error::ImageDescError`].
    #[inline]
    pub fn image_desc(reason: impl Into<String>) -> Self {
        Self::ImageDescError {
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::Internal`].
    #[inline]
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }

    /// Whether the caller can plausibly recover by changing inputs and
    /// retrying, as opposed to a caller-fault or non-recoverable error.
    pub fn is_caller_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameter { .. } | Self::UnsupportedStyle { .. } | Self::InversionFailed { .. }
        )
    }

    /// Whether this is a caller-fault error (wrong call sequence or
    /// malformed image description), as opposed to a data problem.
    pub fn is_caller_fault(&self) -> bool {
        matches!(self, Self::FinalizationRequired | Self::ImageDescError { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_parameter_message_contains_kind_and_reason() {
        let err = Error::invalid_parameter(OpKind::Lut1D, "length out of range");
        assert!(err.to_string().contains("Lut1D"));
        assert!(err.to_string().contains("length out of range"));
        assert!(err.is_caller_recoverable());
    }

    #[test]
    fn finalization_required_is_caller_fault() {
        let err = Error::FinalizationRequired;
        assert!(err.is_caller_fault());
        assert!(!err.is_caller_recoverable());
    }

    #[test]
    fn unsupported_compose_is_not_caller_recoverable() {
        let err = Error::unsupported_compose(OpKind::Lut1D, OpKind::Lut3D);
        assert!(!err.is_caller_recoverable());
        assert!(!err.is_caller_fault());
    }
}
