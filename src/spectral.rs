use std::f64::consts::PI;
use std::sync::Arc;

use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

use crate::tensor::{Mat3, Mat3c};

/// Three-axis forward DFT of a rank-2 tensor field on an N^3 grid.
///
/// The transform is unnormalized with an `e^{-2 pi i k r / N}` phase, the
/// same convention as `numpy.fft.fftn`. One plan serves the whole run; the
/// line buffers make repeated transforms allocation-free.
pub struct SpectralPlan {
    side: usize,
    fft: Arc<dyn Fft<f64>>,
    line: Vec<Complex64>,
    scratch: Vec<Complex64>,
}

impl SpectralPlan {
    pub fn new(side: usize) -> Self {
        let fft = FftPlanner::new().plan_fft_forward(side);
        let scratch = vec![Complex64::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        Self {
            side,
            fft,
            line: vec![Complex64::new(0.0, 0.0); side],
            scratch,
        }
    }

    pub fn side(&self) -> usize {
        self.side
    }

    /// Transform `field` (row-major, length `side^3`) into `spectrum`,
    /// component by component along all three axes.
    pub fn forward(&mut self, field: &[Mat3], spectrum: &mut [Mat3c]) {
        let n = self.side;
        debug_assert_eq!(field.len(), n * n * n);
        debug_assert_eq!(spectrum.len(), field.len());

        for (site, strain) in field.iter().enumerate() {
            for a in 0..3 {
                for b in 0..3 {
                    spectrum[site][a][b] = Complex64::new(strain[a][b], 0.0);
                }
            }
        }

        // axis strides in the row-major layout [n^2, n, 1]
        for (stride, s_outer, s_inner) in [(n * n, n, 1), (n, n * n, 1), (1, n * n, n)] {
            for outer in 0..n {
                for inner in 0..n {
                    let base = outer * s_outer + inner * s_inner;
                    for a in 0..3 {
                        for b in 0..3 {
                            for m in 0..n {
                                self.line[m] = spectrum[base + m * stride][a][b];
                            }
                            self.fft
                                .process_with_scratch(&mut self.line, &mut self.scratch);
                            for m in 0..n {
                                spectrum[base + m * stride][a][b] = self.line[m];
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Unit phases `w[k] = e^{-2 pi i k / n}` for `k` in `0..n`, the single-site
/// update factors of the forward transform.
pub fn phase_table(n: usize) -> Vec<Complex64> {
    (0..n)
        .map(|k| Complex64::from_polar(1.0, -2.0 * PI * k as f64 / n as f64))
        .collect()
}
