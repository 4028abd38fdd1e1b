//! Frame type and pixel plumbing — YUYV conversion and downscaling.

/// A captured grayscale camera frame.
#[derive(Clone)]
pub struct Frame {
    /// Grayscale pixel data (width * height bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub sequence: u32,
}

impl Frame {
    /// Average pixel brightness (0.0–255.0). Used by camera diagnostics.
    pub fn avg_brightness(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().map(|&b| b as f32).sum::<f32>() / self.data.len() as f32
    }

    /// Downscale by an integer factor via box averaging, for cheaper
    /// face extraction. Factor 0 or 1 returns a plain clone.
    pub fn downscaled(&self, factor: u32) -> Frame {
        if factor <= 1 {
            return self.clone();
        }
        let w = (self.width / factor) as usize;
        let h = (self.height / factor) as usize;
        let src_w = self.width as usize;
        let f = factor as usize;

        let mut data = Vec::with_capacity(w * h);
        for y in 0..h {
            for x in 0..w {
                let mut sum = 0u32;
                for dy in 0..f {
                    for dx in 0..f {
                        sum += self.data[(y * f + dy) * src_w + x * f + dx] as u32;
                    }
                }
                data.push((sum / (f * f) as u32) as u8);
            }
        }

        Frame {
            data,
            width: w as u32,
            height: h as u32,
            sequence: self.sequence,
        }
    }
}

/// Convert packed YUYV (4:2:2) to grayscale by extracting the Y channel.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V].
/// Grayscale = every even-indexed byte.
pub fn yuyv_to_grayscale(yuyv: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = (width * height * 2) as usize;
    if yuyv.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: yuyv.len(),
        });
    }
    Ok(yuyv[..expected].iter().step_by(2).copied().collect())
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid YUYV length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}
