use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use strain_sim::{linear_schedule, run_replicated, MemorySink, RunConfig, StageOutcome};

const L: usize = 8;
const N_WORKERS: usize = 4;
const N_STAGES: usize = 10;

fn main() {
    let mut config = RunConfig::new(L, linear_schedule(1.0, 0.1, N_STAGES));
    config.anisotropy = 1.0;
    config.eigenstrain = 0.1;
    config.reference_shear = 0.4;
    config.max_sweeps = 200;

    println!(
        "Lattice: {L}x{L}x{L}  |  Workers: {N_WORKERS}  |  Stages: {N_STAGES}  |  Max sweeps: {}",
        config.max_sweeps
    );
    println!("{}", "-".repeat(70));

    let pb = ProgressBar::new((N_STAGES * config.max_sweeps) as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{msg} [{bar:40}] {pos}/{len} [{elapsed_precise} < {eta_precise}, {per_sec}]",
        )
        .unwrap()
        .progress_chars("=> "),
    );
    pb.set_message("sweeps");

    let t0 = Instant::now();
    let (reports, sink) =
        run_replicated(&config, N_WORKERS, None, MemorySink::default(), &|| pb.inc(1)).unwrap();
    let elapsed = t0.elapsed().as_secs_f64();
    pb.finish_and_clear();

    for report in &reports {
        let tag = match report.outcome {
            StageOutcome::Converged => "converged",
            StageOutcome::Unstabilized => "unstabilized",
        };
        println!(
            "T = {:.2}  sweeps = {:4}  accepted = {:6}  E = {:+.6e}  [{tag}]",
            report.temperature, report.sweeps, report.accepted_moves, report.final_energy
        );
    }

    let total_sweeps: usize = reports.iter().map(|r| r.sweeps).sum();
    println!("{}", "-".repeat(70));
    println!(
        "Total: {:.3} s  |  {:.3} ms/sweep  |  {} stages recorded",
        elapsed,
        elapsed / total_sweeps as f64 * 1000.0,
        sink.stages.len()
    );
}
