pub mod replica;

pub use replica::Replica;

use std::thread;

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use validator::Validate;

use crate::comm::Comm;
use crate::config::RunConfig;
use crate::error::SimError;
use crate::kernel::ReciprocalKernel;
use crate::lattice::SpinLattice;
use crate::material::Material;
use crate::mcmc::sweep::metropolis_sweep;
use crate::output::{NullSink, StageSink};
use crate::stability::{StabilityTracker, StageOutcome};

/// Summary of one finished temperature stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageReport {
    pub temperature: f64,
    pub sweeps: usize,
    pub accepted_moves: usize,
    pub outcome: StageOutcome,
    pub final_energy: f64,
}

/// Run one temperature stage to termination.
///
/// Every sweep ends with the coordinator feeding the tracker and
/// broadcasting the stop flag, so all ranks leave the loop together.
fn run_stage(
    comm: &Comm,
    config: &RunConfig,
    material: &Material,
    kernel: &ReciprocalKernel,
    lattice: SpinLattice,
    temperature: f64,
    stage: usize,
    sink: &mut dyn StageSink,
    on_sweep: &(dyn Fn() + Sync),
) -> StageReport {
    let proposal_seed = config.seed + 2 * stage as u64 + 1;
    let mut replica = Replica::new(comm, material, kernel, lattice, proposal_seed);
    let mut tracker = StabilityTracker::new(config.energy_tolerance, config.stability_window);

    if comm.is_coordinator() {
        log::info!(
            "stage {stage}: T = {temperature}, initial energy = {}",
            replica.energy
        );
        sink.begin_stage(temperature);
    }

    let mut outcome = StageOutcome::Unstabilized;
    let mut sweeps = 0;
    let mut accepted_total = 0;

    for _ in 0..config.max_sweeps {
        if comm.is_coordinator() {
            on_sweep();
        }
        let accepted = metropolis_sweep(
            comm,
            &mut replica,
            material,
            kernel,
            temperature,
            config.update_mode,
        );
        sweeps += 1;
        accepted_total += accepted;

        let stop = comm.broadcast(if comm.is_coordinator() {
            sink.record_sweep(replica.energy, accepted, &replica.strain.macro_strain());
            Some(tracker.observe(replica.energy, accepted))
        } else {
            None
        });

        if stop {
            outcome = StageOutcome::Converged;
            break;
        }
    }

    if comm.is_coordinator() {
        match outcome {
            StageOutcome::Converged => log::info!(
                "stage {stage}: converged after {sweeps} sweeps, energy = {}",
                replica.energy
            ),
            StageOutcome::Unstabilized => log::warn!(
                "stage {stage}: sweep budget exhausted without stabilization"
            ),
        }
        sink.finish_stage(temperature, outcome, &replica.lattice);
    }

    StageReport {
        temperature,
        sweeps,
        accepted_moves: accepted_total,
        outcome,
        final_energy: replica.energy,
    }
}

/// Execute the whole temperature schedule on one worker of a group.
///
/// Material and kernel are built redundantly on every rank (deterministic
/// inputs, so no broadcast of bulk tensor data is needed). Each stage draws
/// a fresh random lattice from a per-stage seed; an optional persisted
/// lattice seeds the first stage only. The sink is driven only on the
/// coordinator, so other ranks normally pass a [`NullSink`]; `on_sweep` is
/// likewise invoked once per sweep on the coordinator (progress bars).
pub fn run_schedule(
    comm: &Comm,
    config: &RunConfig,
    initial: Option<SpinLattice>,
    sink: &mut dyn StageSink,
    on_sweep: &(dyn Fn() + Sync),
) -> Result<Vec<StageReport>, SimError> {
    config
        .validate()
        .map_err(|e| SimError::InvalidConfig(e.to_string()))?;
    let material = Material::new(config.anisotropy, config.eigenstrain, config.reference_shear)?;

    let side = config.lattice_side;
    if let Some(ref lattice) = initial {
        if lattice.side != side {
            return Err(SimError::SnapshotShapeMismatch {
                side,
                expected: side * side * side,
                found: lattice.n_sites,
            });
        }
    }

    if comm.is_coordinator() {
        log::info!("building reciprocal kernel, side = {side}");
    }
    let kernel = ReciprocalKernel::build(side, &material.stiffness);

    let mut reports = Vec::with_capacity(config.temperatures.len());
    for (stage, &temperature) in config.temperatures.iter().enumerate() {
        let lattice = match (&initial, stage) {
            (Some(lattice), 0) => lattice.clone(),
            _ => {
                let mut rng = Xoshiro256StarStar::seed_from_u64(config.seed + 2 * stage as u64);
                SpinLattice::random(side, &mut rng)
            }
        };
        reports.push(run_stage(
            comm,
            config,
            &material,
            &kernel,
            lattice,
            temperature,
            stage,
            sink,
            on_sweep,
        ));
    }
    Ok(reports)
}

/// Spawn a lock-step group of `n_workers` threads over the whole schedule.
///
/// Rank 0 drives `sink`; all other ranks run the identical control flow
/// against a [`NullSink`]. Returns the coordinator's stage reports together
/// with the sink for inspection or closing. Inputs are validated before any
/// thread starts, so all ranks see the same accept path.
pub fn run_replicated<S: StageSink + Send>(
    config: &RunConfig,
    n_workers: usize,
    initial: Option<SpinLattice>,
    mut sink: S,
    on_sweep: &(dyn Fn() + Sync),
) -> Result<(Vec<StageReport>, S), SimError> {
    config
        .validate()
        .map_err(|e| SimError::InvalidConfig(e.to_string()))?;
    Material::new(config.anisotropy, config.eigenstrain, config.reference_shear)?;
    if let Some(ref lattice) = initial {
        if lattice.side != config.lattice_side {
            let side = config.lattice_side;
            return Err(SimError::SnapshotShapeMismatch {
                side,
                expected: side * side * side,
                found: lattice.n_sites,
            });
        }
    }

    let mut comms = Comm::group(n_workers).into_iter();
    let coordinator = comms.next().expect("group has at least one rank");

    let reports = thread::scope(|scope| {
        let handles: Vec<_> = comms
            .map(|comm| {
                let init = initial.clone();
                scope.spawn(move || {
                    run_schedule(&comm, config, init, &mut NullSink, &|| {})
                        .expect("replica rank failed after shared validation")
                })
            })
            .collect();

        let reports = run_schedule(&coordinator, config, initial.clone(), &mut sink, on_sweep);
        for handle in handles {
            handle.join().expect("replica rank panicked");
        }
        reports
    })?;

    Ok((reports, sink))
}
