//! Least-squares polynomial fitting for the reference path
//!
//! The reference is modelled as y = c0 + c1 x + c2 x^2 + c3 x^3 in the
//! vehicle frame. The fit solves the Vandermonde system with a Householder
//! QR factorisation of the column-equilibrated design matrix, and refuses
//! rank-deficient inputs instead of returning a meaningless curve.

use nalgebra::{DMatrix, DVector, Vector4};

use crate::common::{MpcError, MpcResult, Path2D};

/// Degree of the reference polynomial
pub const FIT_DEGREE: usize = 3;

/// Smallest admissible |R_ii| after scaling the design columns to unit norm
const RANK_TOLERANCE: f64 = 1e-10;

/// Evaluate a polynomial given ascending-order coefficients (Horner's rule).
pub fn polyeval(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

/// Fit a polynomial of `degree` to the points by least squares.
///
/// Returns the `degree + 1` coefficients in ascending order.
pub fn polyfit(xs: &[f64], ys: &[f64], degree: usize) -> MpcResult<DVector<f64>> {
    if xs.len() != ys.len() {
        return Err(MpcError::InvalidInput(format!(
            "cannot fit {} x values against {} y values",
            xs.len(),
            ys.len()
        )));
    }
    if degree == 0 {
        return Err(MpcError::InvalidInput("polynomial degree must be at least 1".to_string()));
    }
    let cols = degree + 1;
    if xs.len() < cols {
        return Err(MpcError::DegenerateFit(format!(
            "a degree {} fit needs at least {} points, got {}",
            degree,
            cols,
            xs.len()
        )));
    }
    if xs.iter().chain(ys.iter()).any(|v| !v.is_finite()) {
        return Err(MpcError::InvalidInput("waypoints contain non-finite values".to_string()));
    }

    let mut design = DMatrix::from_fn(xs.len(), cols, |i, j| xs[i].powi(j as i32));

    // Equilibrate so the rank test is independent of the coordinate scale
    let mut scales = DVector::zeros(cols);
    for j in 0..cols {
        let norm = design.column(j).norm();
        if norm == 0.0 {
            return Err(MpcError::DegenerateFit(format!("design column {} is zero", j)));
        }
        scales[j] = norm;
        design.column_mut(j).unscale_mut(norm);
    }

    let qr = design.qr();
    let r = qr.r();
    if let Some(j) = (0..cols).find(|&j| r[(j, j)].abs() <= RANK_TOLERANCE) {
        return Err(MpcError::DegenerateFit(format!(
            "design matrix is rank deficient (|R[{0},{0}]| = {1:.3e}); waypoints are too close to collinear in x",
            j,
            r[(j, j)].abs()
        )));
    }

    let rhs = qr.q().transpose() * DVector::from_column_slice(ys);
    let scaled = r
        .solve_upper_triangular(&rhs)
        .ok_or_else(|| MpcError::DegenerateFit("triangular solve failed".to_string()))?;

    Ok(scaled.component_div(&scales))
}

/// Cubic reference curve in the vehicle frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicPolynomial {
    /// Ascending-order coefficients
    pub coeffs: Vector4<f64>,
}

impl CubicPolynomial {
    pub fn new(c0: f64, c1: f64, c2: f64, c3: f64) -> Self {
        Self { coeffs: Vector4::new(c0, c1, c2, c3) }
    }

    /// Least-squares fit through vehicle-frame points.
    pub fn fit(points: &Path2D) -> MpcResult<Self> {
        let coeffs = polyfit(&points.x_coords(), &points.y_coords(), FIT_DEGREE)?;
        Ok(Self { coeffs: Vector4::from_iterator(coeffs.iter().copied()) })
    }

    pub fn eval(&self, x: f64) -> f64 {
        polyeval(self.coeffs.as_slice(), x)
    }

    /// First derivative dy/dx
    pub fn derivative(&self, x: f64) -> f64 {
        let c = &self.coeffs;
        c[1] + x * (2.0 * c[2] + x * 3.0 * c[3])
    }

    pub fn second_derivative(&self, x: f64) -> f64 {
        let c = &self.coeffs;
        2.0 * c[2] + 6.0 * c[3] * x
    }

    /// Desired heading at `x`: the tangent direction of the curve
    pub fn tangent_angle(&self, x: f64) -> f64 {
        self.derivative(x).atan()
    }

    /// Cross-track error of a vehicle sitting at the frame origin
    pub fn cte_at_origin(&self) -> f64 {
        self.coeffs[0]
    }

    /// Heading error of a vehicle at the frame origin with zero heading
    pub fn epsi_at_origin(&self) -> f64 {
        -self.coeffs[1].atan()
    }

    pub fn is_finite(&self) -> bool {
        self.coeffs.iter().all(|c| c.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_polyeval() {
        // 1 + 2x + 3x^2 at x = 2
        assert_abs_diff_eq!(polyeval(&[1.0, 2.0, 3.0], 2.0), 17.0, epsilon = 1e-12);
        assert_eq!(polyeval(&[], 3.0), 0.0);
    }

    #[test]
    fn test_fit_recovers_known_cubic() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let truth = CubicPolynomial::new(
                rng.gen_range(-5.0..5.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-0.05..0.05),
                rng.gen_range(-0.001..0.001),
            );
            let xs: Vec<f64> = (0..6).map(|i| -5.0 + 12.0 * i as f64 + rng.gen_range(0.0..2.0)).collect();
            let ys: Vec<f64> = xs.iter().map(|&x| truth.eval(x)).collect();
            let path = Path2D::from_xy(&xs, &ys).unwrap();

            let fitted = CubicPolynomial::fit(&path).unwrap();
            for k in 0..4 {
                assert_abs_diff_eq!(fitted.coeffs[k], truth.coeffs[k], epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_fit_straight_line_along_x() {
        let xs = [0.0, 10.0, 20.0, 30.0, 40.0, 50.0];
        let ys = [0.0; 6];
        let fitted = CubicPolynomial::fit(&Path2D::from_xy(&xs, &ys).unwrap()).unwrap();
        assert!(fitted.coeffs.norm() < 1e-12);
        assert_eq!(fitted.cte_at_origin(), fitted.coeffs[0]);
    }

    #[test]
    fn test_fit_rejects_too_few_points() {
        let result = polyfit(&[0.0, 1.0, 2.0], &[0.0, 1.0, 4.0], 3);
        assert!(matches!(result, Err(MpcError::DegenerateFit(_))));
    }

    #[test]
    fn test_fit_rejects_repeated_abscissae() {
        // Six points but only three distinct x values
        let xs = [1.0, 1.0, 2.0, 2.0, 3.0, 3.0];
        let ys = [0.0, 0.1, 0.2, 0.3, 0.4, 0.5];
        let result = polyfit(&xs, &ys, 3);
        assert!(matches!(result, Err(MpcError::DegenerateFit(_))));
    }

    #[test]
    fn test_fit_rejects_vertical_line() {
        let xs = [5.0; 6];
        let ys = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(matches!(polyfit(&xs, &ys, 3), Err(MpcError::DegenerateFit(_))));
    }

    #[test]
    fn test_fit_rejects_mismatched_lengths() {
        assert!(matches!(polyfit(&[0.0, 1.0], &[0.0], 1), Err(MpcError::InvalidInput(_))));
    }

    #[test]
    fn test_derivatives_and_origin_errors() {
        let p = CubicPolynomial::new(1.5, 0.2, -0.01, 0.001);
        assert_abs_diff_eq!(p.derivative(2.0), 0.2 - 0.04 + 0.012, epsilon = 1e-12);
        assert_abs_diff_eq!(p.second_derivative(2.0), -0.02 + 0.012, epsilon = 1e-12);
        assert_abs_diff_eq!(p.cte_at_origin(), 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(p.epsi_at_origin(), -(0.2_f64).atan(), epsilon = 1e-12);
    }
}
