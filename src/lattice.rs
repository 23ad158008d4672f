use rand::Rng;

use crate::error::SimError;

/// Periodic cubic lattice of three-state spins.
///
/// Sites are indexed in row-major (C) order: site `(x, y, z)` lives at flat
/// index `x * side^2 + y * side + z`. Spin values are 1, 2, or 3, each
/// selecting one variant eigenstrain.
///
/// Every worker holds a full copy; copies are bit-identical after each
/// collective exchange. Mutation goes through accepted Monte Carlo moves only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpinLattice {
    /// Extent along each axis.
    pub side: usize,
    /// Total number of sites (`side^3`).
    pub n_sites: usize,
    /// Row-major strides `[side^2, side, 1]`.
    pub strides: [usize; 3],
    /// Flat spin storage, length `n_sites`.
    pub spins: Vec<u8>,
}

impl SpinLattice {
    /// All sites set to one spin value.
    pub fn uniform(side: usize, spin: u8) -> Self {
        let n_sites = side * side * side;
        Self {
            side,
            n_sites,
            strides: [side * side, side, 1],
            spins: vec![spin; n_sites],
        }
    }

    /// Independent uniform draws from {1, 2, 3} at every site.
    pub fn random(side: usize, rng: &mut impl Rng) -> Self {
        let mut lattice = Self::uniform(side, 1);
        for s in lattice.spins.iter_mut() {
            *s = rng.gen_range(1..=3);
        }
        lattice
    }

    /// Adopt a persisted flat spin list (row-major, length `side^3`).
    pub fn from_spins(side: usize, spins: Vec<u8>) -> Result<Self, SimError> {
        let expected = side * side * side;
        if spins.len() != expected {
            return Err(SimError::SnapshotShapeMismatch {
                side,
                expected,
                found: spins.len(),
            });
        }
        if let Some(site) = spins.iter().position(|&s| !(1..=3).contains(&s)) {
            return Err(SimError::InvalidSpinValue {
                site,
                spin: spins[site] as i64,
            });
        }
        Ok(Self {
            side,
            n_sites: expected,
            strides: [side * side, side, 1],
            spins,
        })
    }

    #[inline]
    pub fn site_index(&self, x: usize, y: usize, z: usize) -> usize {
        x * self.strides[0] + y * self.strides[1] + z
    }

    /// Lattice coordinates of a flat site index.
    #[inline]
    pub fn coords(&self, site: usize) -> (usize, usize, usize) {
        (
            site / self.strides[0],
            (site / self.strides[1]) % self.side,
            site % self.side,
        )
    }
}
