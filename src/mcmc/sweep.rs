use rand::Rng;

use crate::comm::Comm;
use crate::config::UpdateMode;
use crate::energy;
use crate::kernel::ReciprocalKernel;
use crate::material::Material;
use crate::simulation::Replica;

/// Clamp on the Metropolis exponent magnitude before exponentiation.
pub const MAX_EXP_ARG: f64 = 700.0;

/// One single-site flip, chosen by the coordinator and applied identically
/// everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Proposal {
    pub site: usize,
    /// Proposed spin, uniform over the two variants different from the
    /// current one.
    pub spin: u8,
}

/// Metropolis acceptance probability: 1 for downhill moves, else
/// `exp(-min(dE / T, 700))`. `T = 0` pushes the exponent to the clamp, so
/// uphill moves at zero temperature are effectively never accepted.
pub fn acceptance_probability(delta_e: f64, temperature: f64) -> f64 {
    if delta_e <= 0.0 {
        1.0
    } else {
        (-(delta_e / temperature).min(MAX_EXP_ARG)).exp()
    }
}

/// Decide a proposal from its energy delta and one uniform draw in [0, 1).
#[inline]
pub fn accept_move(delta_e: f64, temperature: f64, draw: f64) -> bool {
    if delta_e <= 0.0 {
        return true;
    }
    draw < acceptance_probability(delta_e, temperature)
}

fn draw_proposal(replica: &mut Replica) -> Proposal {
    let side = replica.lattice.side;
    let rng = &mut replica.proposal_rng;
    let x = rng.gen_range(0..side);
    let y = rng.gen_range(0..side);
    let z = rng.gen_range(0..side);
    let site = replica.lattice.site_index(x, y, z);

    let current = replica.lattice.spins[site];
    let others: [u8; 2] = match current {
        1 => [2, 3],
        2 => [1, 3],
        _ => [1, 2],
    };
    Proposal {
        site,
        spin: others[rng.gen_range(0..2)],
    }
}

/// Resolve exactly one spin-flip proposal across the whole group.
///
/// Protocol, in strict order on every rank:
/// 1. the coordinator draws the proposal and broadcasts it;
/// 2. every rank tentatively applies it and refreshes the trial
///    strain/spectrum locally from the identical inputs;
/// 3. the tentative global energy is reduced and broadcast;
/// 4. the coordinator decides via the Metropolis rule and broadcasts;
/// 5. accept commits the trial state, reject reverts the single lattice
///    site (the trial scratch is simply dropped).
pub fn metropolis_step(
    comm: &Comm,
    replica: &mut Replica,
    material: &Material,
    kernel: &ReciprocalKernel,
    temperature: f64,
    mode: UpdateMode,
) -> bool {
    let proposal = comm.broadcast(if comm.is_coordinator() {
        Some(draw_proposal(replica))
    } else {
        None
    });

    let previous_spin = replica.lattice.spins[proposal.site];
    replica.lattice.spins[proposal.site] = proposal.spin;

    match mode {
        UpdateMode::Full => {
            replica
                .trial
                .recompute(&replica.lattice, material, &mut replica.plan);
        }
        UpdateMode::Incremental => {
            replica.trial.clone_from(&replica.strain);
            replica.trial.apply_site(
                &replica.lattice,
                proposal.site,
                material.strain_for(proposal.spin),
                &replica.phases,
            );
        }
    }

    let energy_new = energy::total_energy(comm, &replica.trial.spectrum, kernel);

    let accepted = comm.broadcast(if comm.is_coordinator() {
        let delta_e = energy_new - replica.energy;
        let draw = replica.proposal_rng.gen::<f64>();
        Some(accept_move(delta_e, temperature, draw))
    } else {
        None
    });

    if accepted {
        std::mem::swap(&mut replica.strain, &mut replica.trial);
        replica.energy = energy_new;
    } else {
        replica.lattice.spins[proposal.site] = previous_spin;
    }
    accepted
}

/// One sweep: `n_sites / worker_count` collective proposals. Returns the
/// number of accepted moves.
pub fn metropolis_sweep(
    comm: &Comm,
    replica: &mut Replica,
    material: &Material,
    kernel: &ReciprocalKernel,
    temperature: f64,
    mode: UpdateMode,
) -> usize {
    let proposals = replica.lattice.n_sites / comm.size();
    let mut accepted = 0;
    for _ in 0..proposals {
        if metropolis_step(comm, replica, material, kernel, temperature, mode) {
            accepted += 1;
        }
    }
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::SpinLattice;

    #[test]
    fn test_downhill_always_accepts() {
        assert!(accept_move(-1.0, 0.5, 0.999999));
        assert!(accept_move(-1e-12, 0.5, 0.999999));
        assert!(accept_move(0.0, 0.5, 0.999999));
        assert_eq!(acceptance_probability(-3.0, 0.5), 1.0);
    }

    #[test]
    fn test_uphill_with_unit_draw_always_rejects() {
        for delta in [1e-9, 0.1, 1.0, 1e6] {
            assert!(!accept_move(delta, 1.0, 1.0));
        }
    }

    #[test]
    fn test_zero_temperature_kills_uphill_moves() {
        let p = acceptance_probability(0.1, 0.0);
        assert!(p < 1e-300);
        assert!(!p.is_nan());
    }

    #[test]
    fn test_acceptance_decays_with_temperature() {
        let delta = 0.5;
        let p_hot = acceptance_probability(delta, 2.0);
        let p_warm = acceptance_probability(delta, 0.5);
        let p_cold = acceptance_probability(delta, 0.01);
        assert!(p_hot > p_warm && p_warm > p_cold);
        assert!((p_warm - (-1.0f64).exp()).abs() < 1e-15);
    }

    #[test]
    fn test_exponent_clamp() {
        // dE/T far beyond 700 still yields a finite, positive probability
        let p = acceptance_probability(1e6, 1.0);
        assert_eq!(p, (-MAX_EXP_ARG).exp());
    }

    #[test]
    fn test_rejected_step_conserves_state() {
        // eigenstrain 0 on a uniform lattice: energy 0, every flip is uphill,
        // and T = 0 drives the acceptance probability below any draw
        let material = Material::new(1.0, 0.0, 0.4).unwrap();
        let kernel = ReciprocalKernel::build(4, &material.stiffness);
        let lattice = SpinLattice::uniform(4, 1);
        let comm = Comm::solo();
        let mut replica = Replica::new(&comm, &material, &kernel, lattice, 99);

        for mode in [UpdateMode::Full, UpdateMode::Incremental] {
            for _ in 0..10 {
                let spins_before = replica.lattice.spins.clone();
                let strain_before = replica.strain.clone();
                let energy_before = replica.energy;

                let accepted =
                    metropolis_step(&comm, &mut replica, &material, &kernel, 0.0, mode);

                assert!(!accepted);
                assert_eq!(replica.lattice.spins, spins_before);
                assert!(replica.strain == strain_before);
                assert_eq!(replica.energy, energy_before);
            }
        }
    }

    #[test]
    fn test_proposal_spin_differs_from_current() {
        let material = Material::new(1.0, 0.1, 0.4).unwrap();
        let kernel = ReciprocalKernel::build(2, &material.stiffness);
        let comm = Comm::solo();
        let lattice = SpinLattice::uniform(2, 2);
        let mut replica = Replica::new(&comm, &material, &kernel, lattice, 5);

        for _ in 0..50 {
            let proposal = draw_proposal(&mut replica);
            assert_ne!(proposal.spin, replica.lattice.spins[proposal.site]);
            assert!((1..=3).contains(&proposal.spin));
            assert!(proposal.site < replica.lattice.n_sites);
        }
    }

    #[test]
    fn test_replicas_stay_bitwise_identical() {
        // the single-source-of-truth protocol must leave every rank with the
        // same lattice, spectrum, and energy after any number of proposals
        use crate::comm::Comm;
        use rand::SeedableRng;
        use rand_xoshiro::Xoshiro256StarStar;
        use std::thread;

        let material = Material::new(1.0, 0.1, 0.4).unwrap();
        let kernel = ReciprocalKernel::build(3, &material.stiffness);
        let material = &material;
        let kernel = &kernel;

        for size in [2, 4] {
            let comms = Comm::group(size);
            let finals: Vec<(Vec<u8>, f64)> = thread::scope(|scope| {
                comms
                    .iter()
                    .map(|comm| {
                        scope.spawn(move || {
                            let mut rng = Xoshiro256StarStar::seed_from_u64(41);
                            let lattice = SpinLattice::random(3, &mut rng);
                            let mut replica =
                                Replica::new(comm, material, kernel, lattice, 77);
                            for _ in 0..30 {
                                metropolis_step(
                                    comm,
                                    &mut replica,
                                    material,
                                    kernel,
                                    0.5,
                                    UpdateMode::Full,
                                );
                            }
                            (replica.lattice.spins.clone(), replica.energy)
                        })
                    })
                    .collect::<Vec<_>>()
                    .into_iter()
                    .map(|h| h.join().unwrap())
                    .collect()
            });

            for state in &finals[1..] {
                assert_eq!(state.0, finals[0].0, "size {size}");
                assert_eq!(state.1, finals[0].1, "size {size}");
            }
        }
    }

    #[test]
    fn test_sweep_counts_accepted_moves() {
        // at a high temperature on a mixed lattice, some moves accept
        let material = Material::new(1.0, 0.1, 0.4).unwrap();
        let kernel = ReciprocalKernel::build(3, &material.stiffness);
        let comm = Comm::solo();
        let mut lattice = SpinLattice::uniform(3, 1);
        for (site, spin) in lattice.spins.iter_mut().enumerate() {
            *spin = (site % 3) as u8 + 1;
        }
        let mut replica = Replica::new(&comm, &material, &kernel, lattice, 17);

        let accepted = metropolis_sweep(
            &comm,
            &mut replica,
            &material,
            &kernel,
            10.0,
            UpdateMode::Full,
        );
        assert!(accepted > 0);
        assert!(accepted <= replica.lattice.n_sites);
    }
}
