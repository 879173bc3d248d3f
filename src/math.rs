//! Minimal 4x4 matrix for projection data handed over by the camera session

use std::ops::Mul;

/// Row-major 4x4 matrix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat4(pub [[f32; 4]; 4]);

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4([
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]);

    /// Rotation about the Z axis, in quarter turns counter-clockwise
    pub fn rotation_z_quarters(quarters: u8) -> Mat4 {
        let (s, c) = match quarters % 4 {
            0 => (0.0, 1.0),
            1 => (1.0, 0.0),
            2 => (0.0, -1.0),
            _ => (-1.0, 0.0),
        };
        Mat4([
            [c, -s, 0.0, 0.0],
            [s, c, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    pub fn transpose(&self) -> Mat4 {
        let mut out = [[0.0; 4]; 4];
        for (r, row) in self.0.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                out[c][r] = *value;
            }
        }
        Mat4(out)
    }

    /// Inverse of a pure rotation. Only valid for orthonormal matrices.
    pub fn inverse_rotation(&self) -> Mat4 {
        self.transpose()
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Mat4::IDENTITY
    }
}

impl Mul for Mat4 {
    type Output = Mat4;

    fn mul(self, rhs: Mat4) -> Mat4 {
        let mut out = [[0.0; 4]; 4];
        for (r, out_row) in out.iter_mut().enumerate() {
            for (c, cell) in out_row.iter_mut().enumerate() {
                *cell = (0..4).map(|k| self.0[r][k] * rhs.0[k][c]).sum();
            }
        }
        Mat4(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_times_inverse_is_identity() {
        for q in 0..4 {
            let r = Mat4::rotation_z_quarters(q);
            assert_eq!(r * r.inverse_rotation(), Mat4::IDENTITY);
        }
    }

    #[test]
    fn identity_is_neutral() {
        let r = Mat4::rotation_z_quarters(1);
        assert_eq!(Mat4::IDENTITY * r, r);
        assert_eq!(r * Mat4::IDENTITY, r);
    }
}
