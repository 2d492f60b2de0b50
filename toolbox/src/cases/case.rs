use crate::cases::signature::{case_number_for_signature, signature_to_string};
use crate::errors::{Error, Result};
use crate::math::matrix::Matrix;
use crate::primitives::consts::ZERO_TOLERANCE;
use crate::symbols::variable::VariablePool;
use crate::system::gma::GmaSystem;
use crate::system::ssystem::SSystem;
use std::sync::Arc;

/// The boundary system of a case, reduced to the independent variables:
/// the feasible region is `{ y : U.y + zeta >= 0 }` in log10 coordinates.
///
/// A block is a value; composites (intersections) build their own block
/// from borrowed case blocks instead of aliasing matrices.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintBlock {
    pub u: Matrix,
    pub zeta: Matrix,
}

impl ConstraintBlock {
    /// Boundary residuals `U.y + zeta` at a column of log10 values.
    pub fn residuals(&self, log_values: &Matrix) -> Result<Matrix> {
        let mut out = self.u.times(log_values)?;
        out.add_assign_matrix(&self.zeta)?;
        Ok(out)
    }

    /// Row indices of `[U | zeta]` that vanish entirely.
    pub fn zero_rows(&self) -> Vec<usize> {
        (0..self.u.rows())
            .filter(|&i| {
                self.u.row_is_zero(i, ZERO_TOLERANCE)
                    && self.zeta.value(i, 0).abs() <= ZERO_TOLERANCE
            })
            .collect()
    }
}

/// One case of a design space: a choice of dominant terms, its dominant
/// S-system, and the linear conditions under which that choice holds.
#[derive(Debug, Clone)]
pub struct Case {
    name: String,
    xd: Arc<VariablePool>,
    xi: Arc<VariablePool>,
    ssys: SSystem,
    cd: Matrix,
    ci: Matrix,
    delta: Matrix,
    block: Option<ConstraintBlock>,
    signature: Vec<u32>,
    case_number: u64,
}

impl Case {
    /// Builds the case for `signature`, appending the design space's extra
    /// condition rows when given.
    pub fn from_gma(
        gma: &GmaSystem,
        signature: &[u32],
        extra: Option<(&Matrix, &Matrix, &Matrix)>,
        prefix: Option<&str>,
    ) -> Result<Case> {
        let case_number = case_number_for_signature(signature, gma.signature())?;
        let ssys = SSystem::from_gma(gma, signature)?;

        let xd_count = gma.xd().number_of_variables();
        let xi_count = gma.xi().number_of_variables();
        let subdominance_rows: u32 = gma.signature().iter().map(|&s| s - 1).sum();
        let extra_rows = extra.map_or(0, |(cd, _, _)| cd.rows());
        let total_rows = subdominance_rows as usize + extra_rows;

        let mut cd = Matrix::new(total_rows, xd_count);
        let mut ci = Matrix::new(total_rows, xi_count);
        let mut delta = Matrix::new(total_rows, 1);

        // One row per non-chosen term, grouped by signature position:
        // chosen dominance over term q reads
        // (Kd_p - Kd_q).log Xd + (Ki_p - Ki_q).log Xi + log(c_p/c_q) >= 0.
        let mut row = 0usize;
        for position in 0..signature.len() {
            let equation = position / 2;
            let chosen = (signature[position] - 1) as usize;
            let terms = gma.signature()[position] as usize;
            let (coefficients, kd, ki) = if position % 2 == 0 {
                (gma.alpha(), gma.gd(), gma.gi())
            } else {
                (gma.beta(), gma.hd(), gma.hi())
            };
            for term in 0..terms {
                if term == chosen {
                    continue;
                }
                delta.set(
                    row,
                    0,
                    (coefficients.value(equation, chosen) / coefficients.value(equation, term))
                        .log10(),
                );
                for k in 0..xd_count {
                    cd.set(
                        row,
                        k,
                        kd.value(equation, chosen, k) - kd.value(equation, term, k),
                    );
                }
                for k in 0..xi_count {
                    ci.set(
                        row,
                        k,
                        ki.value(equation, chosen, k) - ki.value(equation, term, k),
                    );
                }
                row += 1;
            }
        }

        if let Some((extra_cd, extra_ci, extra_delta)) = extra {
            if extra_cd.cols() != xd_count
                || extra_ci.cols() != xi_count
                || extra_cd.rows() != extra_delta.rows()
            {
                return Err(Error::WrongShapeOrDomain(
                    "extra condition matrices do not fit the system".into(),
                ));
            }
            for i in 0..extra_cd.rows() {
                for k in 0..xd_count {
                    cd.set(row, k, extra_cd.value(i, k));
                }
                for k in 0..xi_count {
                    ci.set(row, k, extra_ci.value(i, k));
                }
                delta.set(row, 0, extra_delta.value(i, 0));
                row += 1;
            }
        }

        let name = match prefix {
            Some(prefix) => format!("{prefix}: Case {case_number}"),
            None => format!("Case {case_number}"),
        };
        let mut case = Case {
            name,
            xd: Arc::clone(gma.xd()),
            xi: Arc::clone(gma.xi()),
            ssys,
            cd,
            ci,
            delta,
            block: None,
            signature: signature.to_vec(),
            case_number,
        };
        case.recalculate_boundaries();
        Ok(case)
    }

    /// Rebuilds a case from stored matrices; used by the decoder.
    pub(crate) fn from_parts(
        name: String,
        ssys: SSystem,
        cd: Matrix,
        ci: Matrix,
        delta: Matrix,
        signature: Vec<u32>,
        case_number: u64,
    ) -> Case {
        let mut case = Case {
            name,
            xd: Arc::clone(ssys.xd()),
            xi: Arc::clone(ssys.xi()),
            ssys,
            cd,
            ci,
            delta,
            block: None,
            signature,
            case_number,
        };
        case.recalculate_boundaries();
        case
    }

    /// Rebuilds `(U, zeta)` from the condition matrices and the S-system
    /// solution: `U = Cd.M + Ci`, `zeta = Cd.b + delta`.
    pub(crate) fn recalculate_boundaries(&mut self) {
        self.block = self.ssys.steady_state().map(|(m, b)| {
            let mut u = self.cd.times(m).expect("condition shapes");
            u.add_assign_matrix(&self.ci).expect("condition shapes");
            let mut zeta = self.cd.times(b).expect("condition shapes");
            zeta.add_assign_matrix(&self.delta).expect("condition shapes");
            ConstraintBlock { u, zeta }
        });
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn case_number(&self) -> u64 {
        self.case_number
    }

    pub fn signature(&self) -> &[u32] {
        &self.signature
    }

    pub fn signature_string(&self) -> String {
        signature_to_string(&self.signature)
    }

    pub fn xd(&self) -> &Arc<VariablePool> {
        &self.xd
    }

    pub fn xi(&self) -> &Arc<VariablePool> {
        &self.xi
    }

    pub fn ssystem(&self) -> &SSystem {
        &self.ssys
    }

    /// True when the dominant S-system admits a log-linear steady state.
    pub fn has_solution(&self) -> bool {
        self.ssys.has_solution()
    }

    pub fn number_of_equations(&self) -> usize {
        self.ssys.alpha().rows()
    }

    pub fn number_of_conditions(&self) -> usize {
        self.cd.rows()
    }

    pub fn number_of_boundaries(&self) -> usize {
        self.block.as_ref().map_or(0, |b| b.u.rows())
    }

    pub fn cd(&self) -> &Matrix {
        &self.cd
    }

    pub fn ci(&self) -> &Matrix {
        &self.ci
    }

    pub fn delta(&self) -> &Matrix {
        &self.delta
    }

    pub(crate) fn delta_mut(&mut self) -> &mut Matrix {
        &mut self.delta
    }

    /// The reduced boundary system, absent when the S-system is singular.
    pub fn boundaries(&self) -> Option<&ConstraintBlock> {
        self.block.as_ref()
    }

    /// Indices of boundary rows that vanish within tolerance; `None` when
    /// there is no boundary system.
    pub fn zero_boundary_indices(&self) -> Option<Vec<usize>> {
        self.block.as_ref().map(ConstraintBlock::zero_rows)
    }

    /// Boundary residuals at a fully pinned point, the variables read from
    /// `values` by name and mapped through log10.
    pub fn boundaries_at_point(&self, values: &VariablePool) -> Result<Matrix> {
        let block = self
            .block
            .as_ref()
            .ok_or(Error::SingularSystem)?;
        let log_values = self.log_values_for_pool(values)?;
        block.residuals(&log_values)
    }

    /// A column of `log10` values for every independent variable, read
    /// from `values` by name.
    pub(crate) fn log_values_for_pool(&self, values: &VariablePool) -> Result<Matrix> {
        let mut out = Matrix::new(self.xi.number_of_variables(), 1);
        for variable in self.xi.variables() {
            let value = values
                .value_for_variable_with_name(variable.name())
                .ok_or_else(|| Error::NotFound(format!("variable `{}`", variable.name())))?;
            out.set(
                self.xi
                    .index_of_variable_with_name(variable.name())
                    .expect("own pool"),
                0,
                value.log10(),
            );
        }
        Ok(out)
    }
}

impl std::fmt::Display for Case {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.name, self.signature_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::gma::GmaSystem;

    fn bistable() -> GmaSystem {
        GmaSystem::by_parsing_strings(
            &["dX1/dt = a + X2^2 - X1", "dX2/dt = a + X1^2 - X2"],
            None,
        )
        .unwrap()
    }

    #[test]
    fn condition_counts_follow_the_signature() {
        let gma = bistable();
        let case = Case::from_gma(&gma, &[1, 1, 1, 1], None, None).unwrap();
        // Two non-chosen terms overall, one per equation.
        assert_eq!(case.number_of_conditions(), 2);
        assert_eq!(case.number_of_boundaries(), 2);
        let block = case.boundaries().unwrap();
        assert_eq!(block.u.cols(), 1);
        assert_eq!(block.zeta.cols(), 1);
    }

    #[test]
    fn extra_conditions_append_rows() {
        let gma = bistable();
        let cd = Matrix::new(1, 2);
        let mut ci = Matrix::new(1, 1);
        ci.set(0, 0, 1.0);
        let mut delta = Matrix::new(1, 1);
        delta.set(0, 0, 3.0);
        let case = Case::from_gma(&gma, &[1, 1, 1, 1], Some((&cd, &ci, &delta)), None).unwrap();
        assert_eq!(case.number_of_conditions(), 3);
        let block = case.boundaries().unwrap();
        assert_eq!(block.u.value(2, 0), 1.0);
        assert_eq!(block.zeta.value(2, 0), 3.0);
    }

    #[test]
    fn subdominance_rows_match_the_hand_derivation() {
        // Case 1 of the bistable pair keeps the constant inflow a in both
        // equations, steadying at X1 = X2 = a. Dominance of a over X2^2
        // then reads log a - 2 log X2 = -log a >= 0, one such row per
        // equation.
        let gma = bistable();
        let case = Case::from_gma(&gma, &[1, 1, 1, 1], None, None).unwrap();
        let block = case.boundaries().unwrap();
        for i in 0..2 {
            assert!((block.u.value(i, 0) + 1.0).abs() < 1e-9);
            assert!(block.zeta.value(i, 0).abs() < 1e-9);
        }
    }

    #[test]
    fn names_carry_the_prefix() {
        let gma = bistable();
        let case = Case::from_gma(&gma, &[2, 1, 1, 1], None, Some("outer")).unwrap();
        assert_eq!(case.name(), "outer: Case 2");
        assert_eq!(case.signature_string(), "2111");
    }
}
