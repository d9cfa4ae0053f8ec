use std::fmt;

/// A 3D affine transform stored as the top three rows of a 4×4 matrix.
///
/// Rows are `[m00 m01 m02 tx]`, `[m10 m11 m12 ty]`, `[m20 m21 m22 tz]`,
/// which is the row-major layout BigDataViewer expects in `<affine>`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    rows: [[f64; 4]; 3],
}

impl AffineTransform {
    /// The identity transform.
    pub const fn identity() -> Self {
        Self {
            rows: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
            ],
        }
    }

    /// A pure translation.
    pub fn translation(tx: f64, ty: f64, tz: f64) -> Self {
        let mut affine = Self::identity();
        affine.rows[0][3] = tx;
        affine.rows[1][3] = ty;
        affine.rows[2][3] = tz;
        affine
    }

    /// A pure axis-aligned scaling.
    pub fn scale(sx: f64, sy: f64, sz: f64) -> Self {
        let mut affine = Self::identity();
        affine.rows[0][0] = sx;
        affine.rows[1][1] = sy;
        affine.rows[2][2] = sz;
        affine
    }

    /// Translation part `(tx, ty, tz)`.
    pub fn translation_part(&self) -> [f64; 3] {
        [self.rows[0][3], self.rows[1][3], self.rows[2][3]]
    }

    /// Matrix element at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.rows[row][col]
    }

    /// The twelve coefficients in row-major order.
    pub fn row_major(&self) -> [f64; 12] {
        let mut out = [0.0; 12];
        for (i, row) in self.rows.iter().enumerate() {
            out[i * 4..i * 4 + 4].copy_from_slice(row);
        }
        out
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Display for AffineTransform {
    /// Space separated row-major coefficients, as written in `<affine>`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<String> = self.row_major().iter().map(|v| format!("{:?}", v)).collect();
        f.write_str(&values.join(" "))
    }
}
