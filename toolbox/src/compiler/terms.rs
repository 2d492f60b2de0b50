use crate::compiler::expression::{Expression, Operator};
use crate::compiler::parser::parse_expression;
use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};

/// One monomial `coefficient * prod(v_j ^ e_j)` with a positive coefficient.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerLawTerm {
    pub coefficient: f64,
    /// `(variable, exponent)` factors in appearance order; names unique.
    pub factors: Vec<(String, f64)>,
}

impl PowerLawTerm {
    /// The exponent of `name` in this term, zero when absent.
    pub fn exponent_of(&self, name: &str) -> f64 {
        self.factors
            .iter()
            .find(|(n, _)| n == name)
            .map_or(0.0, |(_, e)| *e)
    }
}

/// The left-hand side of a GMA equation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EquationLhs {
    /// `dX/dt = ...`; carries the state variable name.
    Derivative(String),
    /// `0 = ...`; the dependent variable is supplied by the algebraic pool.
    Zero,
    /// `X = ...`; an algebraic constraint solved for the named variable.
    Algebraic(String),
}

impl EquationLhs {
    pub fn to_source(&self) -> String {
        match self {
            EquationLhs::Derivative(name) => format!("d{name}/dt"),
            EquationLhs::Zero => "0".to_string(),
            EquationLhs::Algebraic(name) => name.clone(),
        }
    }
}

/// A parsed GMA equation: a left-hand side plus signed power-law terms.
#[derive(Debug, Clone, PartialEq)]
pub struct GmaEquation {
    pub lhs: EquationLhs,
    pub positive: Vec<PowerLawTerm>,
    pub negative: Vec<PowerLawTerm>,
}

/// A parsed dominance constraint `dominant > subordinate`, each side one
/// power-law term.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedConstraint {
    pub dominant: PowerLawTerm,
    pub subordinate: PowerLawTerm,
}

/// Parses one equation string into its GMA term decomposition.
pub fn parse_gma_equation(source: &str) -> Result<GmaEquation> {
    let expr = parse_expression(source)?;
    let (lhs_expr, rhs_expr) = match &expr {
        Expression::Operation {
            op: Operator::Equals,
            branches,
        } => (&branches[0], &branches[1]),
        _ => {
            return Err(Error::ParseFail(format!(
                "`{source}` is not an equation"
            )))
        }
    };

    let lhs = recognize_lhs(lhs_expr)
        .ok_or_else(|| Error::ParseFail(format!("unsupported left-hand side in `{source}`")))?;

    let mut positive = Vec::new();
    let mut negative = Vec::new();
    for (coefficient, factors) in flatten_terms(rhs_expr)? {
        if coefficient == 0.0 {
            continue;
        }
        let term = PowerLawTerm {
            coefficient: coefficient.abs(),
            factors,
        };
        if coefficient > 0.0 {
            positive.push(term);
        } else {
            negative.push(term);
        }
    }
    if positive.is_empty() || negative.is_empty() {
        return Err(Error::ParseFail(format!(
            "`{source}` needs at least one positive and one negative term"
        )));
    }
    Ok(GmaEquation {
        lhs,
        positive,
        negative,
    })
}

/// Parses a constraint string `lhs > rhs` or `lhs < rhs`, each side one
/// power-law term; the dominant side is the greater one.
pub fn parse_constraint(source: &str) -> Result<ParsedConstraint> {
    let expr = parse_expression(source)?;
    let (op, lhs_expr, rhs_expr) = match &expr {
        Expression::Operation { op, branches }
            if matches!(op, Operator::Less | Operator::Greater) =>
        {
            (*op, &branches[0], &branches[1])
        }
        _ => {
            return Err(Error::ParseFail(format!(
                "`{source}` is not an inequality"
            )))
        }
    };
    let lhs = single_term(lhs_expr, source)?;
    let rhs = single_term(rhs_expr, source)?;
    let (dominant, subordinate) = match op {
        Operator::Greater => (lhs, rhs),
        _ => (rhs, lhs),
    };
    Ok(ParsedConstraint {
        dominant,
        subordinate,
    })
}

fn single_term(expr: &Expression, source: &str) -> Result<PowerLawTerm> {
    let mut terms = flatten_terms(expr)?;
    if terms.len() != 1 {
        return Err(Error::ParseFail(format!(
            "each side of `{source}` must be a single term"
        )));
    }
    let (coefficient, factors) = terms.remove(0);
    if coefficient <= 0.0 {
        return Err(Error::ParseFail(format!(
            "constraint terms need positive coefficients in `{source}`"
        )));
    }
    Ok(PowerLawTerm {
        coefficient,
        factors,
    })
}

fn recognize_lhs(expr: &Expression) -> Option<EquationLhs> {
    match expr {
        Expression::Constant(c) if *c == 0.0 => Some(EquationLhs::Zero),
        Expression::Variable(name) => Some(EquationLhs::Algebraic(name.clone())),
        Expression::Operation {
            op: Operator::Times,
            branches,
        } if branches.len() == 2 => {
            // `dX/dt` arrives as dX * dt^-1.
            let state = match &branches[0] {
                Expression::Variable(name) if name.len() > 1 && name.starts_with('d') => {
                    name[1..].to_string()
                }
                _ => return None,
            };
            match &branches[1] {
                Expression::Operation {
                    op: Operator::Power,
                    branches: power,
                } => match (&power[0], &power[1]) {
                    (Expression::Variable(dt), Expression::Constant(e))
                        if dt == "dt" && *e == -1.0 =>
                    {
                        Some(EquationLhs::Derivative(state))
                    }
                    _ => None,
                },
                _ => None,
            }
        }
        _ => None,
    }
}

/// Flattens an additive expression into `(signed coefficient, factors)`
/// monomials, rejecting anything that is not a product of powers.
fn flatten_terms(expr: &Expression) -> Result<Vec<(f64, Vec<(String, f64)>)>> {
    let branches: Vec<&Expression> = match expr {
        Expression::Operation {
            op: Operator::Add,
            branches,
        } => branches.iter().collect(),
        other => vec![other],
    };
    let mut terms = Vec::with_capacity(branches.len());
    for branch in branches {
        let mut coefficient = 1.0f64;
        let mut factors: Vec<(String, f64)> = Vec::new();
        collect_factors(branch, 1.0, &mut coefficient, &mut factors)?;
        factors.retain(|(_, e)| *e != 0.0);
        terms.push((coefficient, factors));
    }
    Ok(terms)
}

fn collect_factors(
    expr: &Expression,
    exponent: f64,
    coefficient: &mut f64,
    factors: &mut Vec<(String, f64)>,
) -> Result<()> {
    match expr {
        Expression::Constant(c) => {
            *coefficient *= c.powf(exponent);
            Ok(())
        }
        Expression::Variable(name) => {
            match factors.iter_mut().find(|(n, _)| n == name) {
                Some((_, e)) => *e += exponent,
                None => factors.push((name.clone(), exponent)),
            }
            Ok(())
        }
        Expression::Operation {
            op: Operator::Times,
            branches,
        } => {
            for branch in branches {
                collect_factors(branch, exponent, coefficient, factors)?;
            }
            Ok(())
        }
        Expression::Operation {
            op: Operator::Power,
            branches,
        } => match &branches[1] {
            Expression::Constant(e) => {
                collect_factors(&branches[0], exponent * e, coefficient, factors)
            }
            _ => Err(Error::ParseFail(
                "exponents must be numeric constants".into(),
            )),
        },
        Expression::Operation {
            op: Operator::Add, ..
        } => Err(Error::ParseFail(
            "sums inside products are not in mass action form".into(),
        )),
        Expression::Function { .. } => Err(Error::ParseFail(
            "functions cannot appear in mass action terms".into(),
        )),
        _ => Err(Error::ParseFail("not in mass action form".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decomposes_a_kinetic_equation() {
        let eq = parse_gma_equation("dX1/dt = 2*a*X2^2 - b1*X1").unwrap();
        assert_eq!(eq.lhs, EquationLhs::Derivative("X1".into()));
        assert_eq!(eq.positive.len(), 1);
        assert_eq!(eq.negative.len(), 1);
        assert_eq!(eq.positive[0].coefficient, 2.0);
        assert_eq!(eq.positive[0].exponent_of("X2"), 2.0);
        assert_eq!(eq.negative[0].coefficient, 1.0);
        assert_eq!(eq.negative[0].exponent_of("X1"), 1.0);
    }

    #[test]
    fn zero_lhs_marks_an_algebraic_constraint() {
        let eq = parse_gma_equation("0 = k*S - X3*X1^-1").unwrap();
        assert_eq!(eq.lhs, EquationLhs::Zero);
        assert_eq!(eq.negative[0].exponent_of("X1"), -1.0);
    }

    #[test]
    fn division_folds_into_exponents() {
        let eq = parse_gma_equation("dX/dt = a/X - b*X").unwrap();
        assert_eq!(eq.positive[0].exponent_of("X"), -1.0);
    }

    #[test]
    fn repeated_factors_merge() {
        let eq = parse_gma_equation("dX/dt = a*X*X^2 - b*X").unwrap();
        assert_eq!(eq.positive[0].exponent_of("X"), 3.0);
    }

    #[test]
    fn rejects_non_gma_structure() {
        assert!(parse_gma_equation("dX/dt = (a + b)*X - c*X").is_err());
        assert!(parse_gma_equation("dX/dt = log(a) - b*X").is_err());
        assert!(parse_gma_equation("dX/dt = a*X^b - c*X").is_err());
        assert!(parse_gma_equation("dX/dt = a*X").is_err());
        assert!(parse_gma_equation("a + b").is_err());
    }

    #[test]
    fn constraints_split_into_dominant_and_subordinate() {
        let c = parse_constraint("2*a*X1 > b").unwrap();
        assert_eq!(c.dominant.coefficient, 2.0);
        assert_eq!(c.subordinate.coefficient, 1.0);

        let flipped = parse_constraint("b < 2*a*X1").unwrap();
        assert_eq!(flipped.dominant.coefficient, 2.0);

        assert!(parse_constraint("a + b > c").is_err());
        assert!(parse_constraint("a = b").is_err());
    }
}
