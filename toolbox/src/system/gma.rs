use crate::compiler::terms::{parse_gma_equation, EquationLhs, GmaEquation};
use crate::errors::{Error, Result};
use crate::math::matrix::Matrix;
use crate::math::matrix_array::MatrixArray;
use crate::symbols::variable::VariablePool;
use std::sync::Arc;
use tracing::warn;

/// A generalized mass action system in matrix form.
///
/// Fixed after construction. Each equation `i` is
/// `sum_p alpha[i,p] * prod Xd^Gd[i][p,.] * prod Xi^Gi[i][p,.]
///  - sum_n beta[i,n] * prod Xd^Hd[i][n,.] * prod Xi^Hi[i][n,.]`,
/// with every coefficient positive. Matrix rows and columns are indexed
/// by pool order.
#[derive(Debug, Clone)]
pub struct GmaSystem {
    xd: Arc<VariablePool>,
    xd_a: Arc<VariablePool>,
    xd_t: Arc<VariablePool>,
    xi: Arc<VariablePool>,
    alpha: Matrix,
    beta: Matrix,
    gd: MatrixArray,
    gi: MatrixArray,
    hd: MatrixArray,
    hi: MatrixArray,
    signature: Vec<u32>,
    equations: Vec<String>,
    lhs_forms: Vec<EquationLhs>,
}

impl GmaSystem {
    /// Parses equation strings into a GMA system. Dependent variables come
    /// from `dX/dt` left-hand sides; `0 = ...` equations take theirs from
    /// the algebraic pool `xd_a`. Everything else is independent.
    pub fn by_parsing_strings(
        strings: &[&str],
        xd_a: Option<&VariablePool>,
    ) -> Result<GmaSystem> {
        Self::build(strings, xd_a, None)
    }

    /// Like [`GmaSystem::by_parsing_strings`], with an explicit independent
    /// pool fixing the ordering (and admitting unused entries).
    pub fn by_parsing_strings_with_xi(
        strings: &[&str],
        xd_a: Option<&VariablePool>,
        xi: &VariablePool,
    ) -> Result<GmaSystem> {
        Self::build(strings, xd_a, Some(xi))
    }

    fn build(
        strings: &[&str],
        xd_a: Option<&VariablePool>,
        explicit_xi: Option<&VariablePool>,
    ) -> Result<GmaSystem> {
        if strings.is_empty() {
            return Err(Error::NullArgument("equations"));
        }
        let parsed: Vec<GmaEquation> = strings
            .iter()
            .map(|s| parse_gma_equation(s))
            .collect::<Result<_>>()?;

        let mut xd = VariablePool::new();
        let mut xd_t_pool = VariablePool::new();
        let mut xd_a_pool = VariablePool::new();
        let mut lhs_forms = Vec::with_capacity(parsed.len());

        for equation in &parsed {
            let dependent = match &equation.lhs {
                EquationLhs::Derivative(name) => {
                    xd_t_pool.add(name, 1.0)?;
                    name.clone()
                }
                EquationLhs::Algebraic(name) => {
                    xd_a_pool.add(name, 1.0)?;
                    name.clone()
                }
                EquationLhs::Zero => {
                    let pool = xd_a.ok_or_else(|| {
                        Error::WrongShapeOrDomain(
                            "a `0 = ...` equation needs an algebraic pool".into(),
                        )
                    })?;
                    let assigned = equation
                        .positive
                        .iter()
                        .chain(&equation.negative)
                        .flat_map(|term| term.factors.iter())
                        .map(|(name, _)| name)
                        .find(|name| {
                            pool.has_variable_with_name(name)
                                && !xd_a_pool.has_variable_with_name(name)
                                && !xd.has_variable_with_name(name)
                        })
                        .cloned()
                        .ok_or_else(|| {
                            Error::WrongShapeOrDomain(
                                "no unassigned algebraic variable in a `0 = ...` equation"
                                    .into(),
                            )
                        })?;
                    xd_a_pool.add(&assigned, 1.0)?;
                    assigned
                }
            };
            if xd.has_variable_with_name(&dependent) {
                return Err(Error::WrongShapeOrDomain(format!(
                    "variable `{dependent}` is dependent in two equations"
                )));
            }
            xd.add(&dependent, 1.0)?;
            lhs_forms.push(equation.lhs.clone());
        }

        if let Some(pool) = xd_a {
            for variable in pool.variables() {
                if !xd_a_pool.has_variable_with_name(variable.name()) {
                    warn!(name = variable.name(), "algebraic variable never assigned");
                }
            }
        }

        let mut xi = VariablePool::new();
        match explicit_xi {
            Some(pool) => {
                for equation in &parsed {
                    for term in equation.positive.iter().chain(&equation.negative) {
                        for (name, _) in &term.factors {
                            if !xd.has_variable_with_name(name)
                                && !pool.has_variable_with_name(name)
                            {
                                return Err(Error::NotFound(format!(
                                    "independent variable `{name}` missing from the given pool"
                                )));
                            }
                        }
                    }
                }
                xi.copy_variables_from(pool)?;
            }
            None => {
                for equation in &parsed {
                    for term in equation.positive.iter().chain(&equation.negative) {
                        for (name, _) in &term.factors {
                            if !xd.has_variable_with_name(name)
                                && !xi.has_variable_with_name(name)
                            {
                                xi.add(name, 1.0)?;
                            }
                        }
                    }
                }
            }
        }

        let equations_count = parsed.len();
        let max_positive = parsed.iter().map(|e| e.positive.len()).max().unwrap_or(0);
        let max_negative = parsed.iter().map(|e| e.negative.len()).max().unwrap_or(0);

        let mut alpha = Matrix::new(equations_count, max_positive);
        let mut beta = Matrix::new(equations_count, max_negative);
        let mut gd = MatrixArray::new();
        let mut gi = MatrixArray::new();
        let mut hd = MatrixArray::new();
        let mut hi = MatrixArray::new();
        let mut signature = Vec::with_capacity(2 * equations_count);

        for (i, equation) in parsed.iter().enumerate() {
            signature.push(equation.positive.len() as u32);
            signature.push(equation.negative.len() as u32);
            let (gd_i, gi_i) =
                exponent_matrices(&equation.positive, &xd, &xi, &mut alpha, i);
            let (hd_i, hi_i) =
                exponent_matrices(&equation.negative, &xd, &xi, &mut beta, i);
            gd.push(gd_i);
            gi.push(gi_i);
            hd.push(hd_i);
            hi.push(hi_i);
        }

        xd.set_read_only();
        xd_t_pool.set_read_only();
        xd_a_pool.set_read_only();
        xi.set_read_write();

        Ok(GmaSystem {
            xd: Arc::new(xd),
            xd_a: Arc::new(xd_a_pool),
            xd_t: Arc::new(xd_t_pool),
            xi: Arc::new(xi),
            alpha,
            beta,
            gd,
            gi,
            hd,
            hi,
            signature,
            equations: strings.iter().map(|s| s.trim().to_string()).collect(),
            lhs_forms,
        })
    }

    /// Rebuilds a system from its matrix form; used by the decoder.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        xd: VariablePool,
        xd_a: VariablePool,
        xd_t: VariablePool,
        xi: VariablePool,
        alpha: Matrix,
        beta: Matrix,
        gd: MatrixArray,
        gi: MatrixArray,
        hd: MatrixArray,
        hi: MatrixArray,
        signature: Vec<u32>,
        equations: Vec<String>,
        lhs_forms: Vec<EquationLhs>,
    ) -> GmaSystem {
        GmaSystem {
            xd: Arc::new(xd),
            xd_a: Arc::new(xd_a),
            xd_t: Arc::new(xd_t),
            xi: Arc::new(xi),
            alpha,
            beta,
            gd,
            gi,
            hd,
            hi,
            signature,
            equations,
            lhs_forms,
        }
    }

    pub fn number_of_equations(&self) -> usize {
        self.equations.len()
    }

    /// Total case count `prod_j signature[j]`.
    pub fn number_of_cases(&self) -> u64 {
        self.signature.iter().map(|&s| s as u64).product()
    }

    /// `[P_0, N_0, P_1, N_1, ...]`.
    pub fn signature(&self) -> &[u32] {
        &self.signature
    }

    pub fn xd(&self) -> &Arc<VariablePool> {
        &self.xd
    }

    pub fn xd_a(&self) -> &Arc<VariablePool> {
        &self.xd_a
    }

    pub fn xd_t(&self) -> &Arc<VariablePool> {
        &self.xd_t
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

    pub fn gd(&self) -> &MatrixArray {
        &self.gd
    }

    pub fn gi(&self) -> &MatrixArray {
        &self.gi
    }

    pub fn hd(&self) -> &MatrixArray {
        &self.hd
    }

    pub fn hi(&self) -> &MatrixArray {
        &self.hi
    }

    pub fn equations(&self) -> &[String] {
        &self.equations
    }

    pub fn lhs_forms(&self) -> &[EquationLhs] {
        &self.lhs_forms
    }

    /// Positive term `p` of equation `i` rendered as a source fragment.
    pub fn positive_term_source(&self, i: usize, p: usize) -> String {
        term_source(
            self.alpha.value(i, p),
            self.gd.matrix(i),
            self.gi.matrix(i),
            p,
            &self.xd,
            &self.xi,
        )
    }

    /// Negative term `n` of equation `i` rendered as a source fragment,
    /// without its sign.
    pub fn negative_term_source(&self, i: usize, n: usize) -> String {
        term_source(
            self.beta.value(i, n),
            self.hd.matrix(i),
            self.hi.matrix(i),
            n,
            &self.xd,
            &self.xi,
        )
    }
}

fn exponent_matrices(
    terms: &[crate::compiler::terms::PowerLawTerm],
    xd: &VariablePool,
    xi: &VariablePool,
    coefficients: &mut Matrix,
    equation: usize,
) -> (Matrix, Matrix) {
    let mut dependent = Matrix::new(terms.len(), xd.number_of_variables());
    let mut independent = Matrix::new(terms.len(), xi.number_of_variables());
    for (t, term) in terms.iter().enumerate() {
        coefficients.set(equation, t, term.coefficient);
        for (name, exponent) in &term.factors {
            if let Some(k) = xd.index_of_variable_with_name(name) {
                dependent.set(t, k, *exponent);
            } else if let Some(k) = xi.index_of_variable_with_name(name) {
                independent.set(t, k, *exponent);
            }
        }
    }
    (dependent, independent)
}

fn term_source(
    coefficient: f64,
    dependent: &Matrix,
    independent: &Matrix,
    row: usize,
    xd: &VariablePool,
    xi: &VariablePool,
) -> String {
    let mut pieces = Vec::new();
    if coefficient != 1.0 {
        pieces.push(format!("{coefficient}"));
    }
    for (pool, matrix) in [(xd, dependent), (xi, independent)] {
        for (k, variable) in pool.variables().iter().enumerate() {
            let exponent = matrix.value(row, k);
            if exponent == 0.0 {
                continue;
            }
            if exponent == 1.0 {
                pieces.push(variable.name().to_string());
            } else {
                pieces.push(format!("{}^{}", variable.name(), exponent));
            }
        }
    }
    if pieces.is_empty() {
        pieces.push(format!("{coefficient}"));
    }
    pieces.join("*")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_two_equation_system() {
        let gma = GmaSystem::by_parsing_strings(
            &["dX1/dt = a + X2^2 - X1", "dX2/dt = a + X1^2 - X2"],
            None,
        )
        .unwrap();
        assert_eq!(gma.number_of_equations(), 2);
        assert_eq!(gma.signature(), &[2, 1, 2, 1]);
        assert_eq!(gma.number_of_cases(), 4);
        assert_eq!(gma.xd().all_variable_names(), vec!["X1", "X2"]);
        assert_eq!(gma.xi().all_variable_names(), vec!["a"]);
        assert_eq!(gma.alpha().value(0, 0), 1.0);
        // first positive term of equation 0 is the constant a.
        assert_eq!(gma.gi().value(0, 0, 0), 1.0);
        // second positive term of equation 0 carries X2^2.
        assert_eq!(gma.gd().value(0, 1, 1), 2.0);
    }

    #[test]
    fn algebraic_equations_use_the_given_pool() {
        let xd_a = VariablePool::by_parsing_string("X3").unwrap();
        let gma = GmaSystem::by_parsing_strings(
            &["dX1/dt = X3 - X1", "0 = k*X1 - X3"],
            Some(&xd_a),
        )
        .unwrap();
        assert_eq!(gma.xd().all_variable_names(), vec!["X1", "X3"]);
        assert_eq!(gma.xd_a().all_variable_names(), vec!["X3"]);
        assert_eq!(gma.xd_t().all_variable_names(), vec!["X1"]);
        assert_eq!(gma.xi().all_variable_names(), vec!["k"]);
    }

    #[test]
    fn explicit_independent_pool_fixes_ordering() {
        let xi = VariablePool::by_parsing_string("b1 : 1, a1 : 1, extra : 1").unwrap();
        let gma = GmaSystem::by_parsing_strings_with_xi(
            &["dX1/dt = a1 - b1*X1"],
            None,
            &xi,
        )
        .unwrap();
        assert_eq!(gma.xi().all_variable_names(), vec!["b1", "a1", "extra"]);

        let missing = VariablePool::by_parsing_string("a1").unwrap();
        assert!(GmaSystem::by_parsing_strings_with_xi(
            &["dX1/dt = a1 - b1*X1"],
            None,
            &missing
        )
        .is_err());
    }

    #[test]
    fn term_sources_reparse_to_the_same_term() {
        let gma = GmaSystem::by_parsing_strings(&["dX1/dt = 2.5*a*X1^-1 - X1"], None).unwrap();
        assert_eq!(gma.positive_term_source(0, 0), "2.5*X1^-1*a");
        assert_eq!(gma.negative_term_source(0, 0), "X1");
    }

    #[test]
    fn zero_equation_without_pool_fails() {
        assert!(GmaSystem::by_parsing_strings(&["0 = a - b"], None).is_err());
    }
}
