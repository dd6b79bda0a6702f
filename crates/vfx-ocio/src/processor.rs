//! `CPUProcessor`: the public façade that applies a finalized [`OpList`] to
//! image buffers (C7).
//!
//! Grounded in the teacher's own `Processor` (which held a compiled `Vec<Op>`
//! and exposed a single `apply`) but reshaped around strided packed/planar
//! image descriptions rather than `[f32; 3]` pixel slices, per §4.7/§6 — the
//! row/stride iteration and the channels=3 gather/scatter scheme are new.

use crate::error::{Error, Result};
use crate::oplist::OpList;

/// Describes one packed (interleaved) image buffer for
/// [`CPUProcessor::apply_packed`] (§6: `apply_packed(data, width, height,
/// channels, x_stride, y_stride)`). Application is in place; `x_stride`/
/// `y_stride` are in units of `f32` elements, since this crate has no
/// byte-buffer/bit-depth boundary (§1 Non-goals).
#[derive(Debug)]
pub struct PackedImageDesc<'a> {
    data: &'a mut [f32],
    width: usize,
    height: usize,
    channels: usize,
    x_stride: usize,
    y_stride: usize,
}

impl<'a> PackedImageDesc<'a> {
    /// Builds a description with default strides: `x_stride = channels`,
    /// `y_stride = width * x_stride`.
    pub fn new(data: &'a mut [f32], width: usize, height: usize, channels: usize) -> Self {
        let x_stride = channels;
        let y_stride = width * x_stride;
        Self { data, width, height, channels, x_stride, y_stride }
    }

    /// Builds a description with explicit strides.
    pub fn with_strides(
        data: &'a mut [f32],
        width: usize,
        height: usize,
        channels: usize,
        x_stride: usize,
        y_stride: usize,
    ) -> Self {
        Self { data, width, height, channels, x_stride, y_stride }
    }

    fn validate(&self) -> Result<()> {
        if self.channels != 3 && self.channels != 4 {
            return Err(Error::image_desc(format!("channels must be 3 or 4, got {}", self.channels)));
        }
        if self.x_stride < self.channels {
            return Err(Error::image_desc(format!("x_stride {} must be >= channels {}", self.x_stride, self.channels)));
        }
        let row_span = self.width * self.x_stride;
        if self.y_stride < row_span {
            return Err(Error::image_desc(format!("y_stride {} must be >= width * x_stride {row_span}", self.y_stride)));
        }
        let required = if self.height == 0 { 0 } else { self.y_stride * (self.height - 1) + row_span };
        if self.data.len() < required {
            return Err(Error::image_desc(format!("buffer has {} elements, needs at least {required}", self.data.len())));
        }
        Ok(())
    }
}

/// Describes a planar (non-interleaved) image: one slice per channel, all
/// sharing `width`/`height`/`y_stride` (§4.7). A missing `a` plane implies
/// alpha = 1 on input and is left untouched on output.
#[derive(Debug)]
pub struct PlanarImageDesc<'a> {
    r: &'a mut [f32],
    g: &'a mut [f32],
    b: &'a mut [f32],
    a: Option<&'a mut [f32]>,
    width: usize,
    height: usize,
    y_stride: usize,
}

impl<'a> PlanarImageDesc<'a> {
    /// Builds a planar description over three or four same-shaped planes.
    pub fn new(
        r: &'a mut [f32],
        g: &'a mut [f32],
        b: &'a mut [f32],
        a: Option<&'a mut [f32]>,
        width: usize,
        height: usize,
        y_stride: usize,
    ) -> Self {
        Self { r, g, b, a, width, height, y_stride }
    }

    fn validate(&self) -> Result<()> {
        if self.y_stride < self.width {
            return Err(Error::image_desc(format!(
                "y_stride {} must be >= width {} for a single-channel plane",
                self.y_stride, self.width
            )));
        }
        let required = if self.height == 0 { 0 } else { self.y_stride * (self.height - 1) + self.width };
        for (name, len) in [("r", self.r.len()), ("g", self.g.len()), ("b", self.b.len())] {
            if len < required {
                return Err(Error::image_desc(format!("plane {name} has {len} elements, needs at least {required}")));
            }
        }
        if let Some(a) = &self.a {
            if a.len() < required {
                return Err(Error::image_desc(format!("plane a has {} elements, needs at least {required}", a.len())));
            }
        }
        Ok(())
    }
}

/// The applied, finalized pipeline (§4.7). Holds the per-op CPU renderers
/// compiled from an already-[`OpList::finalize`]d list.
///
/// `CPUProcessor` carries no interior mutability, so it is `Send + Sync`
/// automatically; multiple threads may call `apply_packed`/`apply_planar`
/// concurrently as long as each call targets a distinct image buffer (§5).
#[derive(Debug, Clone)]
pub struct CPUProcessor {
    renderers: Vec<crate::cpu::CpuRenderer>,
}

impl CPUProcessor {
    /// `CPUProcessor::from(op_list)` (§6). Takes ownership of an
    /// already-finalized `OpList`; returns [`Error::FinalizationRequired`]
    /// if it was never finalized since its last mutation.
    pub fn from(op_list: OpList) -> Result<Self> {
        let renderers = op_list.cpu_renderers(true)?;
        Ok(Self { renderers })
    }

    fn apply_row(&self, row: &mut [f32]) {
        for renderer in &self.renderers {
            renderer.apply_in_place(row);
        }
    }

    /// Applies the pipeline to a packed image in place. Rows are visited in
    /// row-major order (§5); within a row, `channels == 3` images are
    /// gathered into an RGBA scratch buffer (alpha = 1), processed, then
    /// scattered back, while `channels == 4` images are processed directly
    /// in the buffer — correct even when reading and writing the same
    /// pixels, since each pixel's result only depends on its own prior
    /// value.
    pub fn apply_packed(&self, desc: &mut PackedImageDesc<'_>) -> Result<()> {
        desc.validate()?;
        let (width, height, channels, x_stride, y_stride) =
            (desc.width, desc.height, desc.channels, desc.x_stride, desc.y_stride);

        match channels {
            4 => {
                for y in 0..height {
                    let row_start = y * y_stride;
                    for x in 0..width {
                        let p = row_start + x * x_stride;
                        let mut pixel = [desc.data[p], desc.data[p + 1], desc.data[p + 2], desc.data[p + 3]];
                        self.apply_row(&mut pixel);
                        desc.data[p] = pixel[0];
                        desc.data[p + 1] = pixel[1];
                        desc.data[p + 2] = pixel[2];
                        desc.data[p + 3] = pixel[3];
                    }
                }
            }
            3 => {
                let mut scratch = vec![0.0f32; width * 4];
                for y in 0..height {
                    let row_start = y * y_stride;
                    for x in 0..width {
                        let p = row_start + x * x_stride;
                        scratch[4 * x] = desc.data[p];
                        scratch[4 * x + 1] = desc.data[p + 1];
                        scratch[4 * x + 2] = desc.data[p + 2];
                        scratch[4 * x + 3] = 1.0;
                    }
                    self.apply_row(&mut scratch);
                    for x in 0..width {
                        let p = row_start + x * x_stride;
                        desc.data[p] = scratch[4 * x];
                        desc.data[p + 1] = scratch[4 * x + 1];
                        desc.data[p + 2] = scratch[4 * x + 2];
                    }
                }
            }
            _ => unreachable!("validate() rejects channels outside {{3, 4}}"),
        }
        Ok(())
    }

    /// Applies the pipeline to a planar image in place. Each row is gathered
    /// from the (up to four) planes into an RGBA scratch buffer, processed,
    /// then scattered back; a missing alpha plane is treated as 1 on input
    /// and is not written on output.
    pub fn apply_planar(&self, desc: &mut PlanarImageDesc<'_>) -> Result<()> {
        desc.validate()?;
        let mut scratch = vec![0.0f32; desc.width * 4];
        for y in 0..desc.height {
            let row = y * desc.y_stride;
            for x in 0..desc.width {
                scratch[4 * x] = desc.r[row + x];
                scratch[4 * x + 1] = desc.g[row + x];
                scratch[4 * x + 2] = desc.b[row + x];
                scratch[4 * x + 3] = desc.a.as_ref().map(|a| a[row + x]).unwrap_or(1.0);
            }
            self.apply_row(&mut scratch);
            for x in 0..desc.width {
                desc.r[row + x] = scratch[4 * x];
                desc.g[row + x] = scratch[4 * x + 1];
                desc.b[row + x] = scratch[4 * x + 2];
                if let Some(a) = desc.a.as_mut() {
                    a[row + x] = scratch[4 * x + 3];
                }
            }
        }
        Ok(())
    }

    /// Number of ops in the compiled pipeline.
    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    /// Whether the compiled pipeline has no ops (pure identity).
    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opdata::Direction;
    use crate::oplist::{new_op_list, OptimizationFlags};

    fn identity_processor() -> CPUProcessor {
        let mut list = new_op_list();
        list.finalize(OptimizationFlags::DEFAULT).unwrap();
        CPUProcessor::from(list).unwrap()
    }

    #[test]
    fn from_requires_finalize() {
        let list = new_op_list();
        assert!(CPUProcessor::from(list).is_err());
    }

    #[test]
    fn apply_packed_rgba_in_place_identity() {
        let processor = identity_processor();
        let mut data = vec![0.1, 0.2, 0.3, 1.0, 0.4, 0.5, 0.6, 1.0];
        let mut desc = PackedImageDesc::new(&mut data, 2, 1, 4);
        processor.apply_packed(&mut desc).unwrap();
        assert_eq!(data, vec![0.1, 0.2, 0.3, 1.0, 0.4, 0.5, 0.6, 1.0]);
    }

    #[test]
    fn apply_packed_rgb_gather_scatter_preserves_values() {
        let processor = identity_processor();
        let mut data = vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        let mut desc = PackedImageDesc::new(&mut data, 2, 1, 3);
        processor.apply_packed(&mut desc).unwrap();
        assert_eq!(data, vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
    }

    #[test]
    fn apply_planar_round_trip() {
        let processor = identity_processor();
        let mut r = vec![0.1, 0.4];
        let mut g = vec![0.2, 0.5];
        let mut b = vec![0.3, 0.6];
        let mut desc = PlanarImageDesc::new(&mut r, &mut g, &mut b, None, 2, 1, 2);
        processor.apply_planar(&mut desc).unwrap();
        assert_eq!(r, vec![0.1, 0.4]);
        assert_eq!(g, vec![0.2, 0.5]);
        assert_eq!(b, vec![0.3, 0.6]);
    }

    #[test]
    fn bad_channels_rejected() {
        let mut data = vec![0.0; 8];
        let mut desc = PackedImageDesc::new(&mut data, 2, 1, 2);
        let processor = identity_processor();
        assert!(processor.apply_packed(&mut desc).is_err());
    }

    #[test]
    fn y_stride_too_small_rejected() {
        let mut data = vec![0.0; 8];
        let mut desc = PackedImageDesc::with_strides(&mut data, 2, 2, 4, 4, 2);
        let processor = identity_processor();
        assert!(processor.apply_packed(&mut desc).is_err());
    }

    #[test]
    fn concurrent_apply_on_distinct_buffers() {
        use std::sync::Arc;
        use std::thread;

        let mut list = new_op_list();
        list.append_exponent([2.0; 4], Direction::Forward).unwrap();
        list.finalize(OptimizationFlags::DEFAULT).unwrap();
        let processor = Arc::new(CPUProcessor::from(list).unwrap());

        let mut handles = Vec::new();
        for i in 0..4 {
            let processor = Arc::clone(&processor);
            handles.push(thread::spawn(move || {
                let mut data = vec![0.5f32; 4];
                data[3] = 1.0;
                let mut desc = PackedImageDesc::new(&mut data, 1, 1, 4);
                processor.apply_packed(&mut desc).unwrap();
                (i, data[0])
            }));
        }
        for h in handles {
            let (_, r) = h.join().unwrap();
            assert!((r - 0.25).abs() < 1e-5);
        }
    }
}
