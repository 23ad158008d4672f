use thiserror::Error;

/// Fatal run errors. All of these surface before any simulation work begins;
/// recoverable numeric conditions (singular acoustic directions, zero energy
/// baselines) are handled in place and never reach this enum.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("anisotropy parameter must be positive, got {0}")]
    InvalidAnisotropy(f64),

    #[error("reference shear must be nonzero")]
    ZeroReferenceShear,

    #[error("invalid run configuration: {0}")]
    InvalidConfig(String),

    #[error("snapshot holds {found} spins, expected {expected} for lattice side {side}")]
    SnapshotShapeMismatch {
        side: usize,
        expected: usize,
        found: usize,
    },

    #[error("invalid spin value {spin} at site {site}, expected 1, 2, or 3")]
    InvalidSpinValue { site: usize, spin: i64 },

    #[error("unparsable token '{token}' at position {position} in snapshot")]
    SnapshotParse { position: usize, token: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
