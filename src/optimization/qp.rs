// Convex step QP solved with Clarabel
//
//   minimize    1/2 d'Hd + g'd
//   subject to  J d = -c
//               lower <= d <= upper
//
// Equality rows go to a zero cone, finite bounds to nonnegative-cone rows
// (d <= upper as  d + s = upper, d >= lower as -d + s = -lower). H must be
// positive semidefinite.

use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus,
    SupportedConeT::{self, NonnegativeConeT, ZeroConeT},
};
use nalgebra::{DMatrix, DVector};
use thiserror::Error;

const MAX_QP_ITERATIONS: u32 = 200;
/// Entries below this magnitude are left out of the sparse matrices
const SPARSITY_THRESHOLD: f64 = 1e-14;
/// Relative distance at which an interior-point step is snapped onto its bound
const BOUND_SNAP: f64 = 1e-7;

/// Borrowed QP data. `residual` is c, so the equality rows read J d = -c.
#[derive(Debug, Clone, Copy)]
pub struct QpProblem<'a> {
    pub hessian: &'a DMatrix<f64>,
    pub gradient: &'a DVector<f64>,
    pub jacobian: &'a DMatrix<f64>,
    pub residual: &'a DVector<f64>,
    pub lower: &'a DVector<f64>,
    pub upper: &'a DVector<f64>,
}

#[derive(Debug, Clone)]
pub struct QpSolution {
    pub step: DVector<f64>,
    /// Equality multipliers, with Hd + g + J'multipliers balanced by the bound duals
    pub multipliers: DVector<f64>,
    /// Variables whose step ends on a bound
    pub active: Vec<bool>,
    pub iterations: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QpError {
    #[error("invalid QP data: {0}")]
    Setup(String),
    #[error("linearised constraints admit no step inside the bounds")]
    Infeasible,
    #[error("QP solver stopped with status {0}")]
    Failed(String),
}

/// Solve the QP to interior-point accuracy.
pub fn solve(problem: &QpProblem<'_>) -> Result<QpSolution, QpError> {
    let n = problem.gradient.len();
    let m = problem.residual.len();
    let upper_rows: Vec<usize> = (0..n).filter(|&i| problem.upper[i].is_finite()).collect();
    let lower_rows: Vec<usize> = (0..n).filter(|&i| problem.lower[i].is_finite()).collect();
    let bound_rows = upper_rows.len() + lower_rows.len();

    let mut a = DMatrix::zeros(m + bound_rows, n);
    let mut b = Vec::with_capacity(m + bound_rows);
    a.rows_mut(0, m).copy_from(problem.jacobian);
    b.extend(problem.residual.iter().map(|c| -c));
    for (k, &i) in upper_rows.iter().enumerate() {
        a[(m + k, i)] = 1.0;
        b.push(problem.upper[i]);
    }
    for (k, &i) in lower_rows.iter().enumerate() {
        a[(m + upper_rows.len() + k, i)] = -1.0;
        b.push(-problem.lower[i]);
    }

    let mut cones: Vec<SupportedConeT<f64>> = Vec::new();
    if m > 0 {
        cones.push(ZeroConeT(m));
    }
    if bound_rows > 0 {
        cones.push(NonnegativeConeT(bound_rows));
    }

    let settings = DefaultSettingsBuilder::default()
        .max_iter(MAX_QP_ITERATIONS)
        .verbose(false)
        .build()
        .map_err(|e| QpError::Setup(e.to_string()))?;

    let p = to_csc(problem.hessian, true);
    let q: Vec<f64> = problem.gradient.iter().copied().collect();
    let mut solver = DefaultSolver::new(&p, &q, &to_csc(&a, false), &b, &cones, settings)
        .map_err(|e| QpError::Setup(format!("{:?}", e)))?;
    solver.solve();

    let solution = &solver.solution;
    match solution.status {
        SolverStatus::Solved | SolverStatus::AlmostSolved => {}
        SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => return Err(QpError::Infeasible),
        status => return Err(QpError::Failed(format!("{:?}", status))),
    }

    let mut step = DVector::from_column_slice(&solution.x);
    if step.iter().any(|v| !v.is_finite()) {
        return Err(QpError::Failed("non-finite step".to_string()));
    }
    let mut active = vec![false; n];
    for i in 0..n {
        let (lo, hi) = (problem.lower[i], problem.upper[i]);
        if hi.is_finite() && step[i] >= hi - BOUND_SNAP * hi.abs().max(1.0) {
            step[i] = hi;
            active[i] = true;
        } else if lo.is_finite() && step[i] <= lo + BOUND_SNAP * lo.abs().max(1.0) {
            step[i] = lo;
            active[i] = true;
        }
    }

    Ok(QpSolution {
        step,
        multipliers: DVector::from_column_slice(&solution.z[..m]),
        active,
        iterations: solution.iterations,
    })
}

/// Dense to compressed-column conversion; `upper_only` keeps the upper triangle.
fn to_csc(matrix: &DMatrix<f64>, upper_only: bool) -> CscMatrix<f64> {
    let (nrows, ncols) = matrix.shape();
    let mut colptr = vec![0usize; ncols + 1];
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();

    for j in 0..ncols {
        let last = if upper_only { (j + 1).min(nrows) } else { nrows };
        for i in 0..last {
            let v = matrix[(i, j)];
            if v.abs() > SPARSITY_THRESHOLD {
                rowval.push(i);
                nzval.push(v);
            }
        }
        colptr[j + 1] = rowval.len();
    }

    CscMatrix::new(nrows, ncols, colptr, rowval, nzval)
}

pub(crate) fn max_abs(v: &DVector<f64>) -> f64 {
    v.iter().fold(0.0, |acc: f64, x| acc.max(x.abs()))
}
