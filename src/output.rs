use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::SimError;
use crate::lattice::SpinLattice;
use crate::stability::StageOutcome;
use crate::tensor::Mat3;

/// Per-stage output stream, driven only by the coordinating worker.
///
/// Implementations must never fail mid-stage: a sink that hits an I/O
/// problem records it and reports it from [`StageSink::close`], so output
/// trouble cannot desynchronize the worker group.
pub trait StageSink {
    fn begin_stage(&mut self, temperature: f64);
    fn record_sweep(&mut self, energy: f64, accepted_moves: usize, macro_strain: &Mat3);
    fn finish_stage(&mut self, temperature: f64, outcome: StageOutcome, lattice: &SpinLattice);
    /// Flush and surface any deferred failure.
    fn close(&mut self) -> Result<(), SimError> {
        Ok(())
    }
}

/// Drops everything. The sink of every non-coordinating worker.
pub struct NullSink;

impl StageSink for NullSink {
    fn begin_stage(&mut self, _temperature: f64) {}
    fn record_sweep(&mut self, _energy: f64, _accepted_moves: usize, _macro_strain: &Mat3) {}
    fn finish_stage(&mut self, _temperature: f64, _outcome: StageOutcome, _lattice: &SpinLattice) {
    }
}

/// Full in-memory record of a run, for tests and demos.
#[derive(Default)]
pub struct MemorySink {
    pub stages: Vec<StageRecord>,
}

pub struct StageRecord {
    pub temperature: f64,
    pub energies: Vec<f64>,
    pub accepted_moves: Vec<usize>,
    pub macro_strains: Vec<Mat3>,
    pub outcome: Option<StageOutcome>,
    pub final_spins: Vec<u8>,
}

impl StageSink for MemorySink {
    fn begin_stage(&mut self, temperature: f64) {
        self.stages.push(StageRecord {
            temperature,
            energies: Vec::new(),
            accepted_moves: Vec::new(),
            macro_strains: Vec::new(),
            outcome: None,
            final_spins: Vec::new(),
        });
    }

    fn record_sweep(&mut self, energy: f64, accepted_moves: usize, macro_strain: &Mat3) {
        if let Some(stage) = self.stages.last_mut() {
            stage.energies.push(energy);
            stage.accepted_moves.push(accepted_moves);
            stage.macro_strains.push(*macro_strain);
        }
    }

    fn finish_stage(&mut self, _temperature: f64, outcome: StageOutcome, lattice: &SpinLattice) {
        if let Some(stage) = self.stages.last_mut() {
            stage.outcome = Some(outcome);
            stage.final_spins = lattice.spins.clone();
        }
    }
}

/// Plain numeric text files per temperature stage, in one directory:
/// `total_energy_T{T:.2}.txt` (one scalar per sweep),
/// `macro_strain_T{T:.2}.txt` (nine row-major numbers per sweep), and a
/// final snapshot named `final_spins_T{T:.2}.txt` on convergence or
/// `max_sweep_spins_T{T:.2}.txt` on budget exhaustion.
pub struct FileSink {
    dir: PathBuf,
    energy_file: Option<BufWriter<File>>,
    strain_file: Option<BufWriter<File>>,
    deferred: Option<SimError>,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, SimError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            energy_file: None,
            strain_file: None,
            deferred: None,
        })
    }

    fn defer(&mut self, result: std::io::Result<()>) {
        if let (Err(err), None) = (result, &self.deferred) {
            self.deferred = Some(SimError::Io(err));
        }
    }
}

impl StageSink for FileSink {
    fn begin_stage(&mut self, temperature: f64) {
        let dir = self.dir.clone();
        let open = move |name: String| -> std::io::Result<BufWriter<File>> {
            Ok(BufWriter::new(File::create(dir.join(name))?))
        };
        match open(format!("total_energy_T{temperature:.2}.txt")) {
            Ok(f) => self.energy_file = Some(f),
            Err(err) => self.defer(Err(err)),
        }
        match open(format!("macro_strain_T{temperature:.2}.txt")) {
            Ok(f) => self.strain_file = Some(f),
            Err(err) => self.defer(Err(err)),
        }
    }

    fn record_sweep(&mut self, energy: f64, _accepted_moves: usize, macro_strain: &Mat3) {
        if let Some(mut file) = self.energy_file.take() {
            self.defer(writeln!(file, "{energy}"));
            self.energy_file = Some(file);
        }
        if let Some(mut file) = self.strain_file.take() {
            let flat: Vec<String> = macro_strain
                .iter()
                .flatten()
                .map(|v| v.to_string())
                .collect();
            self.defer(writeln!(file, "{}", flat.join(" ")));
            self.strain_file = Some(file);
        }
    }

    fn finish_stage(&mut self, temperature: f64, outcome: StageOutcome, lattice: &SpinLattice) {
        for file in [self.energy_file.take(), self.strain_file.take()].iter_mut() {
            if let Some(mut f) = file.take() {
                self.defer(f.flush());
            }
        }

        let name = match outcome {
            StageOutcome::Converged => format!("final_spins_T{temperature:.2}.txt"),
            StageOutcome::Unstabilized => format!("max_sweep_spins_T{temperature:.2}.txt"),
        };
        let result = save_snapshot(self.dir.join(name), lattice);
        if let (Err(err), None) = (result, &self.deferred) {
            self.deferred = Some(err);
        }
    }

    fn close(&mut self) -> Result<(), SimError> {
        match self.deferred.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Write a lattice as a flat row-major list, one spin per line.
pub fn save_snapshot(path: impl AsRef<Path>, lattice: &SpinLattice) -> Result<(), SimError> {
    let mut file = BufWriter::new(File::create(path)?);
    for &spin in lattice.spins.iter() {
        writeln!(file, "{spin}")?;
    }
    file.flush()?;
    Ok(())
}

/// Read a persisted lattice, validating shape and values before the run
/// starts. Tokens may be separated by any whitespace.
pub fn load_snapshot(path: impl AsRef<Path>, side: usize) -> Result<SpinLattice, SimError> {
    let reader = BufReader::new(File::open(path)?);
    let mut spins = Vec::with_capacity(side * side * side);
    let mut position = 0usize;

    for line in reader.lines() {
        for token in line?.split_whitespace() {
            let value: i64 = token.parse().map_err(|_| SimError::SnapshotParse {
                position,
                token: token.to_string(),
            })?;
            if !(1..=3).contains(&value) {
                return Err(SimError::InvalidSpinValue {
                    site: position,
                    spin: value,
                });
            }
            spins.push(value as u8);
            position += 1;
        }
    }

    SpinLattice::from_spins(side, spins)
}
