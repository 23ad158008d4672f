use num_complex::Complex64;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;

use crate::comm::Comm;
use crate::energy;
use crate::kernel::ReciprocalKernel;
use crate::lattice::SpinLattice;
use crate::material::Material;
use crate::spectral::{phase_table, SpectralPlan};
use crate::strain::StrainState;

/// One worker's full replicated state for a temperature stage.
///
/// Every worker holds the whole lattice, strain state, and energy scalar;
/// the copies are bit-identical after each collective exchange. `trial` is
/// the staging buffer for tentative proposals, committed by swap on accept
/// and dropped on reject. Only the coordinator ever advances
/// `proposal_rng`, but all ranks construct it so stage setup is symmetric.
pub struct Replica {
    pub lattice: SpinLattice,
    pub strain: StrainState,
    pub trial: StrainState,
    pub plan: SpectralPlan,
    /// Unit phases for the incremental spectral update.
    pub phases: Vec<Complex64>,
    pub proposal_rng: Xoshiro256StarStar,
    /// Current global elastic energy, identical on every rank.
    pub energy: f64,
}

impl Replica {
    /// Stage-start construction: full strain/spectrum recomputation plus the
    /// initial energy reduction across the group.
    pub fn new(
        comm: &Comm,
        material: &Material,
        kernel: &ReciprocalKernel,
        lattice: SpinLattice,
        proposal_seed: u64,
    ) -> Self {
        let mut plan = SpectralPlan::new(lattice.side);
        let strain = StrainState::from_lattice(&lattice, material, &mut plan);
        let trial = strain.clone();
        let energy = energy::total_energy(comm, &strain.spectrum, kernel);
        let phases = phase_table(lattice.side);

        Self {
            lattice,
            strain,
            trial,
            plan,
            phases,
            proposal_rng: Xoshiro256StarStar::seed_from_u64(proposal_seed),
            energy,
        }
    }
}
