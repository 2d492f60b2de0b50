use crate::errors::{Error, Result};
use crate::math::linear;
use crate::math::matrix::Matrix;
use crate::symbols::variable::VariablePool;
use crate::system::gma::GmaSystem;
use std::sync::Arc;

/// The dominant S-system of one case: a single positive and a single
/// negative term per equation, retained from the parent GMA according to
/// the case signature.
///
/// In log10 coordinates the steady state is affine,
/// `log Xd = M * log Xi + b`, provided `A = Gd - Hd` is invertible. A
/// singular `A` leaves the system without a solution and marks the case
/// as a cyclical candidate.
#[derive(Debug, Clone)]
pub struct SSystem {
    xd: Arc<VariablePool>,
    xi: Arc<VariablePool>,
    alpha: Matrix,
    beta: Matrix,
    gd: Matrix,
    gi: Matrix,
    hd: Matrix,
    hi: Matrix,
    solution: Option<(Matrix, Matrix)>,
}

impl SSystem {
    /// Extracts the dominant S-system for `signature` from `gma`.
    pub fn from_gma(gma: &GmaSystem, signature: &[u32]) -> Result<SSystem> {
        let equations = gma.number_of_equations();
        if signature.len() != 2 * equations {
            return Err(Error::WrongShapeOrDomain(format!(
                "signature of length {} does not fit {} equations",
                signature.len(),
                equations
            )));
        }
        for (j, &digit) in signature.iter().enumerate() {
            if digit == 0 || digit > gma.signature()[j] {
                return Err(Error::WrongShapeOrDomain(format!(
                    "signature digit {digit} out of range at position {j}"
                )));
            }
        }

        let xd_count = gma.xd().number_of_variables();
        let xi_count = gma.xi().number_of_variables();
        let mut alpha = Matrix::new(equations, 1);
        let mut beta = Matrix::new(equations, 1);
        let mut gd = Matrix::new(equations, xd_count);
        let mut gi = Matrix::new(equations, xi_count);
        let mut hd = Matrix::new(equations, xd_count);
        let mut hi = Matrix::new(equations, xi_count);

        for i in 0..equations {
            let p = (signature[2 * i] - 1) as usize;
            let n = (signature[2 * i + 1] - 1) as usize;
            alpha.set(i, 0, gma.alpha().value(i, p));
            beta.set(i, 0, gma.beta().value(i, n));
            for k in 0..xd_count {
                gd.set(i, k, gma.gd().value(i, p, k));
                hd.set(i, k, gma.hd().value(i, n, k));
            }
            for k in 0..xi_count {
                gi.set(i, k, gma.gi().value(i, p, k));
                hi.set(i, k, gma.hi().value(i, n, k));
            }
        }

        let solution = Self::solve_steady_state(&alpha, &beta, &gd, &gi, &hd, &hi);
        Ok(SSystem {
            xd: Arc::clone(gma.xd()),
            xi: Arc::clone(gma.xi()),
            alpha,
            beta,
            gd,
            gi,
            hd,
            hi,
            solution,
        })
    }

    /// Solves `(Gd - Hd) * log Xd = (Hi - Gi) * log Xi + log(beta/alpha)`
    /// for the affine map `(M, b)`.
    fn solve_steady_state(
        alpha: &Matrix,
        beta: &Matrix,
        gd: &Matrix,
        gi: &Matrix,
        hd: &Matrix,
        hi: &Matrix,
    ) -> Option<(Matrix, Matrix)> {
        let equations = alpha.rows();
        let mut a = gd.clone();
        for i in 0..equations {
            for k in 0..a.cols() {
                a.set(i, k, gd.value(i, k) - hd.value(i, k));
            }
        }
        let inverse = linear::invert(&a)?;

        let mut rhs_xi = hi.clone();
        for i in 0..equations {
            for k in 0..rhs_xi.cols() {
                rhs_xi.set(i, k, hi.value(i, k) - gi.value(i, k));
            }
        }
        let mut rhs_const = Matrix::new(equations, 1);
        for i in 0..equations {
            rhs_const.set(i, 0, (beta.value(i, 0) / alpha.value(i, 0)).log10());
        }

        let m = inverse.times(&rhs_xi).ok()?;
        let b = inverse.times(&rhs_const).ok()?;
        Some((m, b))
    }

    /// Rebuilds an S-system from its matrices, re-deriving the steady
    /// state; used by the decoder.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        xd: Arc<VariablePool>,
        xi: Arc<VariablePool>,
        alpha: Matrix,
        beta: Matrix,
        gd: Matrix,
        gi: Matrix,
        hd: Matrix,
        hi: Matrix,
    ) -> SSystem {
        let solution = Self::solve_steady_state(&alpha, &beta, &gd, &gi, &hd, &hi);
        SSystem {
            xd,
            xi,
            alpha,
            beta,
            gd,
            gi,
            hd,
            hi,
            solution,
        }
    }

    pub fn has_solution(&self) -> bool {
        self.solution.is_some()
    }

    /// The affine steady-state map `(M, b)` with
    /// `log Xd = M * log Xi + b`.
    pub fn steady_state(&self) -> Option<(&Matrix, &Matrix)> {
        self.solution.as_ref().map(|(m, b)| (m, b))
    }

    /// Evaluates `log Xd` at a column of `log Xi` values.
    pub fn steady_state_at(&self, log_xi: &Matrix) -> Option<Matrix> {
        let (m, b) = self.solution.as_ref()?;
        let mut out = m.times(log_xi).ok()?;
        out.add_assign_matrix(b).ok()?;
        Some(out)
    }

    pub fn xd(&self) -> &Arc<VariablePool> {
        &self.xd
    }

    pub fn xi(&self) -> &Arc<VariablePool> {
        &self.xi
    }

    pub fn alpha(&self) -> &Matrix {
        &self.alpha
    }

    pub fn beta(&self) -> &Matrix {
        &self.beta
    }

    pub fn gd(&self) -> &Matrix {
        &self.gd
    }

    pub fn gi(&self) -> &Matrix {
        &self.gi
    }

    pub fn hd(&self) -> &Matrix {
        &self.hd
    }

    pub fn hi(&self) -> &Matrix {
        &self.hi
    }

    /// `Gd - Hd`, the kinetic-order difference whose invertibility decides
    /// `has_solution`.
    pub fn dependent_difference(&self) -> Matrix {
        let mut a = self.gd.clone();
        for i in 0..a.rows() {
            for k in 0..a.cols() {
                a.set(i, k, self.gd.value(i, k) - self.hd.value(i, k));
            }
        }
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::gma::GmaSystem;

    #[test]
    fn solves_a_simple_relaxation() {
        // dX1/dt = a1 - b1*X1 steadies at X1 = a1/b1, i.e.
        // log X1 = log a1 - log b1.
        let gma =
            GmaSystem::by_parsing_strings(&["dX1/dt = a1 - b1*X1"], None).unwrap();
        let ssys = SSystem::from_gma(&gma, &[1, 1]).unwrap();
        assert!(ssys.has_solution());
        let (m, b) = ssys.steady_state().unwrap();
        assert_eq!(m.rows(), 1);
        assert_eq!(m.cols(), 2);
        // Xi order is [a1, b1].
        assert!((m.value(0, 0) - 1.0).abs() < 1e-12);
        assert!((m.value(0, 1) + 1.0).abs() < 1e-12);
        assert!(b.value(0, 0).abs() < 1e-12);
    }

    #[test]
    fn equal_fluxes_make_the_system_singular() {
        // A closed two-species interconversion: the dominant terms cancel
        // and Gd - Hd is singular.
        let gma = GmaSystem::by_parsing_strings(
            &["dX1/dt = k*X2 - k*X1", "dX2/dt = k*X1 - k*X2"],
            None,
        )
        .unwrap();
        let ssys = SSystem::from_gma(&gma, &[1, 1, 1, 1]).unwrap();
        assert!(!ssys.has_solution());
        assert!(ssys.steady_state().is_none());
    }

    #[test]
    fn signature_digits_are_validated() {
        let gma = GmaSystem::by_parsing_strings(
            &["dX1/dt = a + X1^0.5 - b*X1"],
            None,
        )
        .unwrap();
        assert!(SSystem::from_gma(&gma, &[3, 1]).is_err());
        assert!(SSystem::from_gma(&gma, &[0, 1]).is_err());
        assert!(SSystem::from_gma(&gma, &[1, 1, 1, 1]).is_err());
    }

    #[test]
    fn steady_state_evaluates_at_a_point() {
        let gma =
            GmaSystem::by_parsing_strings(&["dX1/dt = a1 - b1*X1"], None).unwrap();
        let ssys = SSystem::from_gma(&gma, &[1, 1]).unwrap();
        // a1 = 100, b1 = 10 in log10 coordinates.
        let log_xi = Matrix::column(&[2.0, 1.0]);
        let log_xd = ssys.steady_state_at(&log_xi).unwrap();
        assert!((log_xd.value(0, 0) - 1.0).abs() < 1e-12);
    }
}
