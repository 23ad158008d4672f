use validator::{Validate, ValidationError};

/// How the strain spectrum is refreshed after a tentative flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Rebuild the whole field and transform it (reference behavior).
    Full,
    /// Fold the single-site difference into the spectrum via the phase
    /// table. Agrees with `Full` to floating-point tolerance.
    Incremental,
}

impl TryFrom<&str> for UpdateMode {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "full" => Ok(Self::Full),
            "incremental" => Ok(Self::Incremental),
            _ => Err(format!(
                "unknown update_mode '{s}', expected 'full' or 'incremental'"
            )),
        }
    }
}

fn validate_run_config(cfg: &RunConfig) -> Result<(), ValidationError> {
    if cfg.lattice_side < 2 {
        return Err(ValidationError::new("lattice_side must be >= 2"));
    }
    if cfg.temperatures.is_empty() {
        return Err(ValidationError::new("temperatures must be non-empty"));
    }
    if cfg.temperatures.iter().any(|&t| !t.is_finite() || t < 0.0) {
        return Err(ValidationError::new(
            "temperatures must be non-negative finite values",
        ));
    }
    if cfg.max_sweeps < 1 {
        return Err(ValidationError::new("max_sweeps must be >= 1"));
    }
    if !(cfg.energy_tolerance > 0.0) {
        return Err(ValidationError::new("energy_tolerance must be positive"));
    }
    if cfg.stability_window < 1 {
        return Err(ValidationError::new("stability_window must be >= 1"));
    }
    Ok(())
}

/// Scalar run parameters, as handed over by an external loader.
///
/// Material-parameter domain checks (positive anisotropy, nonzero reference
/// shear) live in `Material::new`; both surface before any simulation work.
#[derive(Debug, Clone, Validate)]
#[validate(schema(function = "validate_run_config"))]
pub struct RunConfig {
    pub lattice_side: usize,
    pub anisotropy: f64,
    pub eigenstrain: f64,
    pub reference_shear: f64,
    /// Ordered temperature schedule; each entry runs an independent stage.
    pub temperatures: Vec<f64>,
    pub max_sweeps: usize,
    pub energy_tolerance: f64,
    pub stability_window: usize,
    pub update_mode: UpdateMode,
    pub seed: u64,
}

impl RunConfig {
    /// Defaults matching the original production runs; callers override
    /// fields as needed.
    pub fn new(lattice_side: usize, temperatures: Vec<f64>) -> Self {
        Self {
            lattice_side,
            anisotropy: 1.0,
            eigenstrain: 0.1,
            reference_shear: 0.4,
            temperatures,
            max_sweeps: 5000,
            energy_tolerance: 1e-10,
            stability_window: 50,
            update_mode: UpdateMode::Full,
            seed: 42,
        }
    }
}

/// Evenly spaced temperature ladder, endpoints included.
pub fn linear_schedule(start: f64, end: f64, count: usize) -> Vec<f64> {
    if count == 1 {
        return vec![start];
    }
    (0..count)
        .map(|i| start + (end - start) * i as f64 / (count - 1) as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let cfg = RunConfig::new(8, vec![1.0, 0.5, 0.1]);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_invalid_configs() {
        let mut cfg = RunConfig::new(1, vec![1.0]);
        assert!(cfg.validate().is_err());

        cfg = RunConfig::new(8, vec![]);
        assert!(cfg.validate().is_err());

        cfg = RunConfig::new(8, vec![-0.5]);
        assert!(cfg.validate().is_err());

        cfg = RunConfig::new(8, vec![1.0]);
        cfg.max_sweeps = 0;
        assert!(cfg.validate().is_err());

        cfg = RunConfig::new(8, vec![1.0]);
        cfg.energy_tolerance = 0.0;
        assert!(cfg.validate().is_err());

        cfg = RunConfig::new(8, vec![1.0]);
        cfg.stability_window = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_update_mode_parsing() {
        assert_eq!(UpdateMode::try_from("full").unwrap(), UpdateMode::Full);
        assert_eq!(
            UpdateMode::try_from("incremental").unwrap(),
            UpdateMode::Incremental
        );
        assert!(UpdateMode::try_from("partial").is_err());
    }

    #[test]
    fn test_linear_schedule() {
        let temps = linear_schedule(1.0, 0.1, 10);
        assert_eq!(temps.len(), 10);
        assert_eq!(temps[0], 1.0);
        assert!((temps[9] - 0.1).abs() < 1e-15);
        assert!((temps[1] - 0.9).abs() < 1e-15);
        for pair in temps.windows(2) {
            assert!(pair[1] < pair[0]);
        }

        assert_eq!(linear_schedule(2.0, 0.5, 1), vec![2.0]);
    }
}
