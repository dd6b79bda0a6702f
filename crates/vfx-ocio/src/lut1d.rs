//! 1D LUT sample storage, evaluation, inversion and composition (C4).
//!
//! This is the spec-exact counterpart of `vfx_lut::Lut1D`: the teacher's
//! type is a general-purpose gamma/identity curve shared by several
//! file-format parsers, and its `invert()` has no monotonization pass. This
//! module adds the half-domain, hue-adjust and LUT-MONO-based exact
//! inversion semantics the core pipeline requires, grounded on the same
//! interpolate-then-clamp structure.

use half::f16;

use crate::error::{Error, OpKind, Result};

/// Interpolation for 1D LUT evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lut1DInterpolation {
    /// Round `t` to the nearest sample.
    Nearest,
    /// Linear interpolation between adjacent samples.
    #[default]
    Linear,
}

/// `DW3` hue-adjust mode for a 1D LUT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HueAdjust {
    /// No hue adjustment.
    #[default]
    Off,
    /// Rebuild chroma around the max-channel axis after the per-channel LUT.
    Dw3,
}

/// Maximum length accepted for a 1D LUT: `1 ≤ L ≤ 1,048,576`.
pub const MAX_LUT1D_LENGTH: usize = 1_048_576;
/// The only valid length for a half-domain LUT.
pub const HALF_DOMAIN_LENGTH: usize = 65_536;

/// Immutable 1D LUT parameter block (3 channels × `length` samples).
#[derive(Debug, Clone, PartialEq)]
pub struct Lut1DOpData {
    /// `3 * length` samples, channel-major: `[r_samples..., g_samples..., b_samples...]`.
    samples: Vec<f32>,
    length: usize,
    half_domain: bool,
    raw_halfs: bool,
    interpolation: Lut1DInterpolation,
    hue_adjust: HueAdjust,
}

impl Lut1DOpData {
    /// Builds and validates a new 1D LUT.
    pub fn new(
        samples: Vec<f32>,
        length: usize,
        interpolation: Lut1DInterpolation,
        half_domain: bool,
        raw_halfs: bool,
        hue_adjust: HueAdjust,
    ) -> Result<Self> {
        // `raw_halfs` samples arrive as half-float bit patterns stored in f32
        // lanes (e.g. a CLF/CTF `half` array read as integers); reinterpret
        // each one through its actual bits rather than truncating as a value.
        let samples = if raw_halfs {
            samples.into_iter().map(|bits| f16::from_bits(bits as u16).to_f32()).collect()
        } else {
            samples
        };
        let lut = Self {
            samples,
            length,
            half_domain,
            raw_halfs,
            interpolation,
            hue_adjust,
        };
        lut.validate()?;
        Ok(lut)
    }

    /// Number of samples per channel.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Whether this LUT operates in half-domain mode.
    pub fn is_half_domain(&self) -> bool {
        self.half_domain
    }

    /// Whether samples should be reinterpreted as raw half-float bit
    /// patterns rather than normalized floats.
    pub fn raw_halfs(&self) -> bool {
        self.raw_halfs
    }

    /// Current interpolation mode.
    pub fn interpolation(&self) -> Lut1DInterpolation {
        self.interpolation
    }

    /// Current hue-adjust mode.
    pub fn hue_adjust(&self) -> HueAdjust {
        self.hue_adjust
    }

    fn channel(&self, c: usize) -> &[f32] {
        &self.samples[c * self.length..(c + 1) * self.length]
    }

    /// `validate()` per §4.2: rejects contract violations.
    pub fn validate(&self) -> Result<()> {
        if self.length == 0 || self.length > MAX_LUT1D_LENGTH {
            return Err(Error::invalid_parameter(
                OpKind::Lut1D,
                format!("length {} out of range [1, {}]", self.length, MAX_LUT1D_LENGTH),
            ));
        }
        if self.half_domain && self.length != HALF_DOMAIN_LENGTH {
            return Err(Error::invalid_parameter(
                OpKind::Lut1D,
                format!("half-domain LUT requires length {}", HALF_DOMAIN_LENGTH),
            ));
        }
        if self.samples.len() != 3 * self.length {
            return Err(Error::invalid_parameter(
                OpKind::Lut1D,
                format!(
                    "expected {} samples (3 * length), got {}",
                    3 * self.length,
                    self.samples.len()
                ),
            ));
        }
        Ok(())
    }

    /// Conservative identity check: every sample equals its normalized
    /// domain position.
    pub fn is_identity(&self) -> bool {
        if self.half_domain || self.length < 2 {
            return false;
        }
        let n = (self.length - 1) as f32;
        for c in 0..3 {
            let ch = self.channel(c);
            for (i, &v) in ch.iter().enumerate() {
                if (v - i as f32 / n).abs() > 1e-6 {
                    return false;
                }
            }
        }
        true
    }

    /// A LUT is a no-op iff it is identity under the conservative check.
    pub fn is_no_op(&self) -> bool {
        self.is_identity()
    }

    /// Deterministic cache identifier at 7 significant digits.
    pub fn cache_id(&self) -> String {
        let mut parts = Vec::with_capacity(self.samples.len() + 4);
        parts.push(format!("L{}", self.length));
        parts.push(format!("H{}", self.half_domain as u8));
        parts.push(format!("R{}", self.raw_halfs as u8));
        parts.push(format!("I{:?}", self.interpolation));
        parts.push(format!("A{:?}", self.hue_adjust));
        for &s in &self.samples {
            parts.push(format!("{:.7e}", s));
        }
        parts.join(":")
    }

    /// Evaluates the LUT at a single normalized input, one channel.
    fn eval_channel(&self, c: usize, x: f32) -> f32 {
        let table = self.channel(c);
        if self.half_domain {
            // Input bit pattern (as a half-float code) is the lookup index.
            let idx = half_bits_index(x);
            return table[idx as usize];
        }
        let l = table.len();
        let t = x * (l - 1) as f32;
        match self.interpolation {
            Lut1DInterpolation::Nearest => {
                let i = t.round().clamp(0.0, (l - 1) as f32) as usize;
                table[i]
            }
            Lut1DInterpolation::Linear => {
                if t <= 0.0 {
                    return table[0];
                }
                if t >= (l - 1) as f32 {
                    return table[l - 1];
                }
                let i = t.floor() as usize;
                let f = t - i as f32;
                table[i] * (1.0 - f) + table[i + 1] * f
            }
        }
    }

    /// Applies the LUT to one RGBA pixel (alpha untouched).
    pub fn apply_pixel(&self, rgba: [f32; 4]) -> [f32; 4] {
        let out_r = self.eval_channel(0, rgba[0]);
        let out_g = self.eval_channel(1, rgba[1]);
        let out_b = self.eval_channel(2, rgba[2]);
        let mut out = [out_r, out_g, out_b, rgba[3]];

        if self.hue_adjust == HueAdjust::Dw3 {
            apply_hue_adjust(rgba, &mut out);
        }
        out
    }

    /// *Exact* inversion: monotonizes a copy of the forward table (the
    /// original is untouched) and binary-searches + linearly interpolates
    /// per channel, per Algorithm LUT-MONO.
    pub fn invert_exact_pixel(&self, rgba: [f32; 4]) -> [f32; 4] {
        let l = self.length;
        let n = (l - 1).max(1) as f32;
        let mut out = rgba;
        for c in 0..3 {
            let mono = monotonize(self.channel(c));
            let y = rgba[c];
            out[c] = invert_monotone(&mono, y) / n;
        }
        out
    }

    /// Builds a *fast* forward-approximation inverse LUT at `finalize` time.
    /// Default length 4096; half-domain LUTs build a half-domain inverse.
    pub fn build_fast_inverse(&self) -> Result<Lut1DOpData> {
        let out_len = if self.half_domain { HALF_DOMAIN_LENGTH } else { 4096 };
        let mut samples = vec![0.0f32; 3 * out_len];
        let n = (out_len - 1).max(1) as f32;
        for c in 0..3 {
            let mono = monotonize(self.channel(c));
            for i in 0..out_len {
                let y = if self.half_domain {
                    f16::from_bits(i as u16).to_f32()
                } else {
                    i as f32 / n
                };
                let x = invert_monotone(&mono, y) / (l_minus_one(self.length) as f32);
                samples[c * out_len + i] = x;
            }
        }
        Lut1DOpData::new(
            samples,
            out_len,
            Lut1DInterpolation::Linear,
            self.half_domain,
            false,
            HueAdjust::Off,
        )
    }

    /// Composes `B(A(x))`, §4.5. `self` is `A`.
    pub fn compose(&self, b: &Lut1DOpData, resample_big: bool) -> Result<Lut1DOpData> {
        if b.hue_adjust != HueAdjust::Off {
            return Err(Error::unsupported_compose(OpKind::Lut1D, OpKind::Lut1D));
        }
        let l_out = if resample_big {
            4096.max(self.length).max(b.length)
        } else {
            self.length.max(b.length)
        };
        let mut samples = vec![0.0f32; 3 * l_out];
        let n = (l_out - 1).max(1) as f32;
        for c in 0..3 {
            for i in 0..l_out {
                let x = i as f32 / n;
                let a_out = self.eval_channel(c, x);
                let b_out = b.eval_channel(c, a_out);
                samples[c * l_out + i] = b_out;
            }
        }
        Lut1DOpData::new(
            samples,
            l_out,
            b.interpolation,
            self.half_domain,
            false,
            self.hue_adjust,
        )
    }
}

#[inline]
fn l_minus_one(length: usize) -> usize {
    (length - 1).max(1)
}

/// Algorithm LUT-MONO: lift strictly-decreasing entries to the previous
/// value. Ties are preserved. Operates on a copy; never mutates `table`.
fn monotonize(table: &[f32]) -> Vec<f32> {
    let mut out = table.to_vec();
    for i in 1..out.len() {
        if out[i] < out[i - 1] {
            out[i] = out[i - 1];
        }
    }
    out
}

/// Binary search + linear interpolation on a non-decreasing table; returns
/// the interpolated *index* position (not yet normalized to `[0,1]`).
fn invert_monotone(table: &[f32], y: f32) -> f32 {
    let l = table.len();
    if y <= table[0] {
        return 0.0;
    }
    if y >= table[l - 1] {
        return (l - 1) as f32;
    }
    // Lower bound: first index whose value is >= y.
    let mut lo = 0usize;
    let mut hi = l - 1;
    while lo < hi {
        let mid = (lo + hi) / 2;
        if table[mid] < y {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    // table[lo] >= y; interpolate within [lo-1, lo] when possible (ties
    // preserved: at an exact tie `y == table[lo]` the search above already
    // lands on the lowest matching index).
    if lo == 0 {
        return 0.0;
    }
    let y0 = table[lo - 1];
    let y1 = table[lo];
    if (y1 - y0).abs() < 1e-12 {
        return (lo - 1) as f32;
    }
    let f = (y - y0) / (y1 - y0);
    (lo - 1) as f32 + f
}

/// Computes the half-float bit-pattern index for a half-domain LUT lookup,
/// as a pure function (no platform intrinsics required, per §9).
fn half_bits_index(x: f32) -> u16 {
    f16::from_f32(x).to_bits()
}

/// DW3 hue-adjust: rebuild chroma around the max-channel axis using
/// `minIn/maxIn` (input) and `minOut/maxOut` (output).
fn apply_hue_adjust(in_rgba: [f32; 4], out: &mut [f32; 4]) {
    let min_in = in_rgba[0].min(in_rgba[1]).min(in_rgba[2]);
    let max_in = in_rgba[0].max(in_rgba[1]).max(in_rgba[2]);
    let min_out = out[0].min(out[1]).min(out[2]);
    let max_out = out[0].max(out[1]).max(out[2]);
    let denom = (max_in - min_in).max(1e-10);
    let scale = (max_out - min_out) / denom;
    for c in 0..3 {
        out[c] = min_out + (in_rgba[c] - min_in) * scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(length: usize) -> Lut1DOpData {
        let n = (length - 1) as f32;
        let ch: Vec<f32> = (0..length).map(|i| i as f32 / n).collect();
        let samples = [ch.clone(), ch.clone(), ch].concat();
        Lut1DOpData::new(samples, length, Lut1DInterpolation::Linear, false, false, HueAdjust::Off).unwrap()
    }

    #[test]
    fn identity_round_trips() {
        let lut = identity(256);
        let out = lut.apply_pixel([0.3, 0.6, 0.9, 1.0]);
        assert!((out[0] - 0.3).abs() < 1e-3);
        assert!((out[1] - 0.6).abs() < 1e-3);
        assert!((out[2] - 0.9).abs() < 1e-3);
        assert_eq!(out[3], 1.0);
        assert!(lut.is_identity());
    }

    #[test]
    fn scenario_s5_inversion() {
        // S5: length 5, samples [0.0, 0.1, 0.2, 0.3, 1.0], inverse at 0.25.
        let ch = vec![0.0f32, 0.1, 0.2, 0.3, 1.0];
        let samples = [ch.clone(), ch.clone(), ch].concat();
        let lut =
            Lut1DOpData::new(samples, 5, Lut1DInterpolation::Linear, false, false, HueAdjust::Off).unwrap();
        let out = lut.invert_exact_pixel([0.25, 0.25, 0.25, 1.0]);
        // y=0.25 falls between table[2]=0.2 and table[3]=0.3 (position
        // 2 + 0.5 = 2.5 of 4), normalizing to 0.625.
        assert!((out[0] - 0.625).abs() < 1e-4, "got {}", out[0]);
    }

    #[test]
    fn monotonize_lifts_decreasing_entries() {
        let mono = monotonize(&[0.0, 0.5, 0.2, 0.6, 0.9]);
        for w in mono.windows(2) {
            assert!(w[1] >= w[0]);
        }
    }

    #[test]
    fn half_domain_requires_65536_length() {
        let samples = vec![0.0f32; 3 * 100];
        let err = Lut1DOpData::new(samples, 100, Lut1DInterpolation::Linear, true, false, HueAdjust::Off);
        assert!(err.is_err());
    }

    #[test]
    fn compose_matches_two_pass_application() {
        let a = identity(16);
        let b_ch: Vec<f32> = (0..16).map(|i| (i as f32 / 15.0).powf(2.0)).collect();
        let b_samples = [b_ch.clone(), b_ch.clone(), b_ch].concat();
        let b = Lut1DOpData::new(b_samples, 16, Lut1DInterpolation::Linear, false, false, HueAdjust::Off).unwrap();
        let composed = a.compose(&b, false).unwrap();

        let x = [0.4, 0.4, 0.4, 1.0];
        let direct = b.apply_pixel(a.apply_pixel(x));
        let fused = composed.apply_pixel(x);
        assert!((direct[0] - fused[0]).abs() < 1e-2);
    }
}
