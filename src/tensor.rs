use num_complex::Complex64;

/// Real 3x3 matrix (rank-2 tensor).
pub type Mat3 = [[f64; 3]; 3];

/// Complex 3x3 matrix, used for spectral strain components.
pub type Mat3c = [[Complex64; 3]; 3];

/// Real rank-4 tensor with all four indices running over 0..3.
pub type Tensor4 = [[[[f64; 3]; 3]; 3]; 3];

pub const MAT3_ZERO: Mat3 = [[0.0; 3]; 3];
pub const TENSOR4_ZERO: Tensor4 = [[[[0.0; 3]; 3]; 3]; 3];

/// Determinant by cofactor expansion along the first row.
pub fn det3(m: &Mat3) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Inverse via the adjugate. Returns `None` when the determinant is exactly
/// zero; callers decide what a singular matrix means for them.
pub fn inverse3(m: &Mat3) -> Option<Mat3> {
    let c00 = m[1][1] * m[2][2] - m[1][2] * m[2][1];
    let c01 = m[1][2] * m[2][0] - m[1][0] * m[2][2];
    let c02 = m[1][0] * m[2][1] - m[1][1] * m[2][0];

    let det = m[0][0] * c00 + m[0][1] * c01 + m[0][2] * c02;
    if det == 0.0 {
        return None;
    }
    let inv_det = 1.0 / det;

    let c10 = m[0][2] * m[2][1] - m[0][1] * m[2][2];
    let c11 = m[0][0] * m[2][2] - m[0][2] * m[2][0];
    let c12 = m[0][1] * m[2][0] - m[0][0] * m[2][1];

    let c20 = m[0][1] * m[1][2] - m[0][2] * m[1][1];
    let c21 = m[0][2] * m[1][0] - m[0][0] * m[1][2];
    let c22 = m[0][0] * m[1][1] - m[0][1] * m[1][0];

    Some([
        [c00 * inv_det, c10 * inv_det, c20 * inv_det],
        [c01 * inv_det, c11 * inv_det, c21 * inv_det],
        [c02 * inv_det, c12 * inv_det, c22 * inv_det],
    ])
}
