pub mod comm;
pub mod config;
pub mod energy;
pub mod error;
pub mod kernel;
pub mod lattice;
pub mod material;
pub mod mcmc;
pub mod output;
pub mod simulation;
pub mod spectral;
pub mod stability;
pub mod strain;
pub mod tensor;

pub use comm::Comm;
pub use config::{linear_schedule, RunConfig, UpdateMode};
pub use error::SimError;
pub use kernel::ReciprocalKernel;
pub use lattice::SpinLattice;
pub use material::Material;
pub use output::{load_snapshot, save_snapshot, FileSink, MemorySink, NullSink, StageSink};
pub use simulation::{run_replicated, run_schedule, Replica, StageReport};
pub use stability::{StabilityTracker, StageOutcome};
