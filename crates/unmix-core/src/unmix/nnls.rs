//! Non-negative least squares for a fixed reference matrix.
//!
//! Lawson–Hanson active-set method on the normal equations. The Gram matrix
//! `AᵀA` depends only on the reference, so it is computed once per solver and
//! shared read-only by every worker; a pixel only pays for `Aᵀb` and the
//! small passive-set factorisations.
//!
//! Convergence: the solve stops when every component of the dual vector
//! `w = Aᵀb − AᵀA·x` outside the passive set is `<= tol`, where
//! `tol = 10 · ε · max(bands, channels) · ‖A‖₁ · ‖b‖∞`. Each feasibility
//! check counts as one iteration; the cap defaults to `3 · channels`.

use std::fmt;

use ndarray::{Array1, Array2, ArrayView1};

use crate::consts::{CHOLESKY_RELATIVE_PIVOT, NNLS_MAX_ITER_FACTOR, NNLS_TOLERANCE_FACTOR};
use crate::error::{Result, UnmixError};
use crate::spectral::ReferenceMatrix;

/// Why a single pixel could not be solved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolveFailure {
    /// The observed vector contains NaN or infinity.
    NonFiniteInput,
    /// The active-set iteration cap was reached.
    IterationLimit { iterations: usize },
    /// The passive-set normal equations could not be factorised.
    SingularSubproblem,
}

impl fmt::Display for SolveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFiniteInput => write!(f, "observed vector is not finite"),
            Self::IterationLimit { iterations } => {
                write!(f, "iteration limit ({iterations}) reached")
            }
            Self::SingularSubproblem => write!(f, "singular passive-set subproblem"),
        }
    }
}

/// Outcome of one pixel solve: fatal errors in the outer `Result`,
/// per-pixel data failures in the inner one.
pub type PixelSolve = std::result::Result<(), SolveFailure>;

/// Reusable NNLS solver bound to one reference matrix.
pub struct NnlsSolver {
    reference: Array2<f64>,
    gram: Array2<f64>,
    norm1: f64,
    max_iterations: usize,
}

/// Scratch buffers for one worker; sized for the solver's channel count.
pub struct NnlsWorkspace {
    atb: Vec<f64>,
    w: Vec<f64>,
    z: Vec<f64>,
    passive: Vec<bool>,
    index: Vec<usize>,
    chol: Vec<f64>,
    rhs: Vec<f64>,
}

impl NnlsWorkspace {
    pub fn new(channels: usize) -> Self {
        Self {
            atb: vec![0.0; channels],
            w: vec![0.0; channels],
            z: vec![0.0; channels],
            passive: vec![false; channels],
            index: Vec::with_capacity(channels),
            chol: vec![0.0; channels * channels],
            rhs: vec![0.0; channels],
        }
    }
}

impl NnlsSolver {
    pub fn new(reference: &ReferenceMatrix, max_iterations: Option<usize>) -> Self {
        let a = reference.data().to_owned();
        let gram = a.t().dot(&a);
        let norm1 = a
            .columns()
            .into_iter()
            .map(|col| col.iter().map(|v| v.abs()).sum::<f64>())
            .fold(0.0f64, f64::max);
        let max_iterations =
            max_iterations.unwrap_or(NNLS_MAX_ITER_FACTOR * reference.channels());
        Self {
            reference: a,
            gram,
            norm1,
            max_iterations,
        }
    }

    pub fn bands(&self) -> usize {
        self.reference.nrows()
    }

    pub fn channels(&self) -> usize {
        self.reference.ncols()
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Solve for one observed band vector, allocating the result.
    pub fn solve(&self, observed: ArrayView1<f64>) -> Result<Array1<f64>> {
        let mut ws = NnlsWorkspace::new(self.channels());
        let mut x = vec![0.0; self.channels()];
        match self.solve_into(observed, &mut ws, &mut x)? {
            Ok(()) => Ok(Array1::from(x)),
            Err(reason) => Err(UnmixError::SolverNonConvergence {
                pixel: 0,
                x: 0,
                y: 0,
                reason,
            }),
        }
    }

    /// Solve for one observed band vector, writing weights into `x`.
    ///
    /// On a per-pixel failure `x` is left all-zero.
    pub fn solve_into(
        &self,
        observed: ArrayView1<f64>,
        ws: &mut NnlsWorkspace,
        x: &mut [f64],
    ) -> Result<PixelSolve> {
        let (m, n) = self.reference.dim();
        if observed.len() != m {
            return Err(UnmixError::shape("observed band vector", m, observed.len()));
        }
        if x.len() != n {
            return Err(UnmixError::shape("weight vector", n, x.len()));
        }
        x.fill(0.0);

        if observed.iter().any(|v| !v.is_finite()) {
            return Ok(Err(SolveFailure::NonFiniteInput));
        }
        let b_max = observed.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
        if b_max == 0.0 {
            return Ok(Ok(()));
        }

        for (j, col) in self.reference.columns().into_iter().enumerate() {
            ws.atb[j] = col.dot(&observed);
        }
        ws.passive.fill(false);

        let tol = NNLS_TOLERANCE_FACTOR * f64::EPSILON * m.max(n) as f64 * self.norm1 * b_max;
        let mut iterations = 0usize;

        'outer: loop {
            self.dual(ws, x);

            // Bring in the most promising variable; skip any whose
            // unconstrained solve comes back non-positive.
            loop {
                let Some(j) = entering_index(&ws.w, &ws.passive, tol) else {
                    break 'outer;
                };
                ws.passive[j] = true;
                if !self.solve_passive(ws) {
                    x.fill(0.0);
                    return Ok(Err(SolveFailure::SingularSubproblem));
                }
                if ws.z[j] > 0.0 {
                    break;
                }
                ws.passive[j] = false;
                ws.w[j] = 0.0;
            }

            loop {
                iterations += 1;
                if iterations > self.max_iterations {
                    x.fill(0.0);
                    return Ok(Err(SolveFailure::IterationLimit {
                        iterations: self.max_iterations,
                    }));
                }

                let feasible = (0..n).all(|i| !ws.passive[i] || ws.z[i] > 0.0);
                if feasible {
                    x.copy_from_slice(&ws.z);
                    break;
                }

                // Step from x toward z until the first passive variable hits zero.
                let mut alpha = f64::INFINITY;
                let mut blocking = 0;
                for i in (0..n).filter(|&i| ws.passive[i] && ws.z[i] <= 0.0) {
                    let denom = x[i] - ws.z[i];
                    let ratio = if denom > 0.0 { x[i] / denom } else { 0.0 };
                    if ratio < alpha {
                        alpha = ratio;
                        blocking = i;
                    }
                }
                for i in (0..n).filter(|&i| ws.passive[i]) {
                    x[i] += alpha * (ws.z[i] - x[i]);
                }
                for i in 0..n {
                    if ws.passive[i] && (i == blocking || x[i] <= 0.0) {
                        ws.passive[i] = false;
                        x[i] = 0.0;
                    }
                }

                if !self.solve_passive(ws) {
                    x.fill(0.0);
                    return Ok(Err(SolveFailure::SingularSubproblem));
                }
            }
        }

        if let Some((channel, v)) = x
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(UnmixError::InvariantViolation(format!(
                "NNLS produced weight {v} for channel {channel}"
            )));
        }
        Ok(Ok(()))
    }

    /// w = Aᵀb − AᵀA·x
    fn dual(&self, ws: &mut NnlsWorkspace, x: &[f64]) {
        for (j, row) in self.gram.rows().into_iter().enumerate() {
            let gx: f64 = row.iter().zip(x).map(|(g, xi)| g * xi).sum();
            ws.w[j] = ws.atb[j] - gx;
        }
    }

    /// Solve the normal equations restricted to the passive set into `ws.z`
    /// (zero outside it). Returns false if the subproblem is singular.
    fn solve_passive(&self, ws: &mut NnlsWorkspace) -> bool {
        ws.index.clear();
        ws.index.extend((0..ws.passive.len()).filter(|&i| ws.passive[i]));
        ws.z.fill(0.0);

        let k = ws.index.len();
        if k == 0 {
            return true;
        }

        for (r, &i) in ws.index.iter().enumerate() {
            for (c, &j) in ws.index.iter().enumerate() {
                ws.chol[r * k + c] = self.gram[[i, j]];
            }
            ws.rhs[r] = ws.atb[i];
        }

        if !cholesky_in_place(&mut ws.chol[..k * k], k) {
            return false;
        }
        cholesky_substitute(&ws.chol[..k * k], k, &mut ws.rhs[..k]);

        for (r, &i) in ws.index.iter().enumerate() {
            ws.z[i] = ws.rhs[r];
        }
        true
    }
}

/// Solve a single NNLS problem against `reference`.
///
/// Without pixel context a failure is reported as pixel 0 of a 1x1 image.
pub fn solve(reference: &ReferenceMatrix, observed: ArrayView1<f64>) -> Result<Array1<f64>> {
    NnlsSolver::new(reference, None).solve(observed)
}

fn entering_index(w: &[f64], passive: &[bool], tol: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (j, &wj) in w.iter().enumerate() {
        if passive[j] || wj <= tol {
            continue;
        }
        if best.map_or(true, |(_, bw)| wj > bw) {
            best = Some((j, wj));
        }
    }
    best.map(|(j, _)| j)
}

/// Lower-triangular Cholesky factor of a row-major `k x k` SPD matrix, in place.
fn cholesky_in_place(m: &mut [f64], k: usize) -> bool {
    let max_diag = (0..k).map(|i| m[i * k + i]).fold(0.0f64, f64::max);
    let min_pivot = CHOLESKY_RELATIVE_PIVOT * max_diag;
    for j in 0..k {
        let mut d = m[j * k + j];
        for p in 0..j {
            d -= m[j * k + p] * m[j * k + p];
        }
        if d.is_nan() || d <= min_pivot {
            return false;
        }
        let d = d.sqrt();
        m[j * k + j] = d;
        for i in (j + 1)..k {
            let mut s = m[i * k + j];
            for p in 0..j {
                s -= m[i * k + p] * m[j * k + p];
            }
            m[i * k + j] = s / d;
        }
    }
    true
}

/// Solve `L·Lᵀ·v = rhs` in place given the factor from `cholesky_in_place`.
fn cholesky_substitute(l: &[f64], k: usize, rhs: &mut [f64]) {
    for i in 0..k {
        let mut s = rhs[i];
        for p in 0..i {
            s -= l[i * k + p] * rhs[p];
        }
        rhs[i] = s / l[i * k + i];
    }
    for i in (0..k).rev() {
        let mut s = rhs[i];
        for p in (i + 1)..k {
            s -= l[p * k + i] * rhs[p];
        }
        rhs[i] = s / l[i * k + i];
    }
}
