use std::f64::consts::PI;

use rayon::prelude::*;

use crate::tensor::{inverse3, Mat3, Tensor4, MAT3_ZERO, TENSOR4_ZERO};

/// Standard FFT frequency set scaled by 2*pi: index `m` maps to
/// `2*pi * m / n` for `m <= (n - 1) / 2` and wraps negative above that.
pub fn wavevector_components(n: usize) -> Vec<f64> {
    (0..n)
        .map(|m| {
            let signed = if m <= (n - 1) / 2 {
                m as isize
            } else {
                m as isize - n as isize
            };
            2.0 * PI * signed as f64 / n as f64
        })
        .collect()
}

/// Non-local elastic interaction kernel B(q) over the N^3 reciprocal grid.
///
/// Each entry is a rank-4 tensor derived from the stiffness tensor and the
/// wavevector direction; the q = 0 entry is the zero tensor (no
/// self-interaction). Built once per run, redundantly on every worker, and
/// read-only afterwards.
pub struct ReciprocalKernel {
    pub side: usize,
    entries: Vec<Tensor4>,
}

impl ReciprocalKernel {
    /// Assemble the kernel for an `side^3` grid.
    ///
    /// For every nonzero wavevector: normalize to a unit direction `n`, form
    /// the acoustic tensor `A_ij = C_imjn n_m n_n`, invert it (zero Green
    /// operator when singular), and store
    /// `B = C - (n . C) G (C . n)` symmetrized across the (ij) <-> (kl)
    /// index-pair swap. The symmetrization leaves every energy contraction
    /// unchanged and makes the stored entries honor the pair symmetry that
    /// the stiffness tensor itself satisfies.
    pub fn build(side: usize, stiffness: &Tensor4) -> Self {
        let freqs = wavevector_components(side);
        let mut entries = vec![TENSOR4_ZERO; side * side * side];

        entries
            .par_chunks_mut(side * side)
            .enumerate()
            .for_each(|(qx, slab)| {
                for qy in 0..side {
                    for qz in 0..side {
                        let k = [freqs[qx], freqs[qy], freqs[qz]];
                        let norm = (k[0] * k[0] + k[1] * k[1] + k[2] * k[2]).sqrt();
                        if norm == 0.0 {
                            continue;
                        }
                        let n = [k[0] / norm, k[1] / norm, k[2] / norm];
                        slab[qy * side + qz] = kernel_entry(stiffness, &n);
                    }
                }
            });

        Self { side, entries }
    }

    #[inline]
    pub fn at(&self, qx: usize, qy: usize, qz: usize) -> &Tensor4 {
        &self.entries[(qx * self.side + qy) * self.side + qz]
    }
}

/// Acoustic (Christoffel) tensor `A_ij = C_imjn n_m n_n`.
fn acoustic_tensor(stiffness: &Tensor4, n: &[f64; 3]) -> Mat3 {
    let mut a = MAT3_ZERO;
    for i in 0..3 {
        for j in 0..3 {
            let mut s = 0.0;
            for m in 0..3 {
                for p in 0..3 {
                    s += stiffness[i][m][j][p] * n[m] * n[p];
                }
            }
            a[i][j] = s;
        }
    }
    a
}

fn kernel_entry(stiffness: &Tensor4, n: &[f64; 3]) -> Tensor4 {
    let acoustic = acoustic_tensor(stiffness, n);
    // Singular directions carry no elastic restoring force in this model.
    let green = inverse3(&acoustic).unwrap_or(MAT3_ZERO);

    // left[q][i][j] = n_p C_pqij
    let mut left = [MAT3_ZERO; 3];
    for q in 0..3 {
        for i in 0..3 {
            for j in 0..3 {
                let mut s = 0.0;
                for p in 0..3 {
                    s += n[p] * stiffness[p][q][i][j];
                }
                left[q][i][j] = s;
            }
        }
    }

    // right[r][k][l] = C_rskl n_s
    let mut right = [MAT3_ZERO; 3];
    for r in 0..3 {
        for k in 0..3 {
            for l in 0..3 {
                let mut s = 0.0;
                for q in 0..3 {
                    s += stiffness[r][q][k][l] * n[q];
                }
                right[r][k][l] = s;
            }
        }
    }

    let mut b = TENSOR4_ZERO;
    for i in 0..3 {
        for j in 0..3 {
            for k in 0..3 {
                for l in 0..3 {
                    // projection = left_qij G_qr right_rkl
                    let mut proj = 0.0;
                    for q in 0..3 {
                        for r in 0..3 {
                            proj += left[q][i][j] * green[q][r] * right[r][k][l];
                        }
                    }
                    b[i][j][k][l] = stiffness[i][j][k][l] - proj;
                }
            }
        }
    }

    let mut sym = TENSOR4_ZERO;
    for i in 0..3 {
        for j in 0..3 {
            for k in 0..3 {
                for l in 0..3 {
                    sym[i][j][k][l] = 0.5 * (b[i][j][k][l] + b[k][l][i][j]);
                }
            }
        }
    }
    sym
}
