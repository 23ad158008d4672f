use crate::error::SimError;
use crate::tensor::{Mat3, Tensor4, MAT3_ZERO, TENSOR4_ZERO};

/// Elastic material data for one run: the cubic stiffness tensor and the
/// three dimensionless variant eigenstrains.
///
/// Everything here is a pure function of three scalars and stays constant
/// for the whole run, so every worker builds its own copy at startup.
pub struct Material {
    /// Rank-4 stiffness tensor, cubic symmetry. Two independent constants:
    /// `C11 = 4 / a`, `C12 = C11 / 2`, `C44 = 1`.
    pub stiffness: Tensor4,
    /// Reference strain per spin variant. Variant `v` puts `1 + factor` on
    /// diagonal entry `v` and `factor` on the other two, with
    /// `factor = eigenstrain / reference_shear`.
    pub variant_strains: [Mat3; 3],
}

impl Material {
    pub fn new(
        anisotropy: f64,
        eigenstrain: f64,
        reference_shear: f64,
    ) -> Result<Self, SimError> {
        if !(anisotropy > 0.0) {
            return Err(SimError::InvalidAnisotropy(anisotropy));
        }
        if reference_shear == 0.0 {
            return Err(SimError::ZeroReferenceShear);
        }

        let c11 = 4.0 / anisotropy;
        let c12 = c11 / 2.0;
        let c44 = 1.0;

        let mut stiffness = TENSOR4_ZERO;
        for i in 0..3 {
            for j in 0..3 {
                for k in 0..3 {
                    for l in 0..3 {
                        if i == j && k == l {
                            stiffness[i][j][k][l] = if i == k { c11 } else { c12 };
                        } else if i == k && j == l {
                            stiffness[i][j][k][l] = c44;
                        }
                    }
                }
            }
        }

        let factor = eigenstrain / reference_shear;
        let mut variant_strains = [MAT3_ZERO; 3];
        for (v, strain) in variant_strains.iter_mut().enumerate() {
            for d in 0..3 {
                strain[d][d] = if d == v { 1.0 + factor } else { factor };
            }
        }

        Ok(Self {
            stiffness,
            variant_strains,
        })
    }

    /// Reference strain for a spin value. Spins 1..=3 select the matching
    /// variant; anything else maps to the zero tensor.
    #[inline]
    pub fn strain_for(&self, spin: u8) -> Mat3 {
        match spin {
            1..=3 => self.variant_strains[spin as usize - 1],
            _ => MAT3_ZERO,
        }
    }
}
