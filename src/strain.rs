use num_complex::Complex64;

use crate::lattice::SpinLattice;
use crate::material::Material;
use crate::spectral::SpectralPlan;
use crate::tensor::{Mat3, Mat3c, MAT3_ZERO};

/// Real-space strain field and its spectrum for one spin configuration.
///
/// The two views must agree at every Monte Carlo checkpoint: the spectrum is
/// always the forward DFT of the field. Full recomputation rebuilds both from
/// the lattice; the incremental path keeps them consistent through a
/// single-site update.
#[derive(Clone, PartialEq)]
pub struct StrainState {
    /// One strain tensor per site, row-major.
    pub field: Vec<Mat3>,
    /// Forward DFT of `field`, same grid shape.
    pub spectrum: Vec<Mat3c>,
}

impl StrainState {
    pub fn from_lattice(
        lattice: &SpinLattice,
        material: &Material,
        plan: &mut SpectralPlan,
    ) -> Self {
        let mut state = Self {
            field: vec![MAT3_ZERO; lattice.n_sites],
            spectrum: vec![[[Complex64::new(0.0, 0.0); 3]; 3]; lattice.n_sites],
        };
        state.recompute(lattice, material, plan);
        state
    }

    /// Full-field recomputation: per-site eigenstrain lookup plus a fresh
    /// three-axis transform. The reference behavior for every proposal.
    pub fn recompute(
        &mut self,
        lattice: &SpinLattice,
        material: &Material,
        plan: &mut SpectralPlan,
    ) {
        for (site, &spin) in lattice.spins.iter().enumerate() {
            self.field[site] = material.strain_for(spin);
        }
        plan.forward(&self.field, &mut self.spectrum);
    }

    /// Single-site update: replace the strain at `site` and fold the
    /// difference into every spectral coefficient through the unit-phase
    /// table (`phases[k] = e^{-2 pi i k / side}`). O(N^3) per call, no FFT.
    pub fn apply_site(
        &mut self,
        lattice: &SpinLattice,
        site: usize,
        new_strain: Mat3,
        phases: &[Complex64],
    ) {
        let side = lattice.side;
        let (x, y, z) = lattice.coords(site);

        let mut delta = MAT3_ZERO;
        for a in 0..3 {
            for b in 0..3 {
                delta[a][b] = new_strain[a][b] - self.field[site][a][b];
            }
        }
        self.field[site] = new_strain;

        let mut q = 0;
        for qx in 0..side {
            let px = phases[qx * x % side];
            for qy in 0..side {
                let pxy = px * phases[qy * y % side];
                for qz in 0..side {
                    let phase = pxy * phases[qz * z % side];
                    let entry = &mut self.spectrum[q];
                    for a in 0..3 {
                        for b in 0..3 {
                            if delta[a][b] != 0.0 {
                                entry[a][b] += delta[a][b] * phase;
                            }
                        }
                    }
                    q += 1;
                }
            }
        }
    }

    /// Mean strain tensor over all sites, the macroscopic observable logged
    /// per sweep.
    pub fn macro_strain(&self) -> Mat3 {
        let mut mean = MAT3_ZERO;
        for strain in self.field.iter() {
            for a in 0..3 {
                for b in 0..3 {
                    mean[a][b] += strain[a][b];
                }
            }
        }
        let inv = 1.0 / self.field.len() as f64;
        for row in mean.iter_mut() {
            for v in row.iter_mut() {
                *v *= inv;
            }
        }
        mean
    }
}
