use crate::errors::{Error, Result};
use crate::symbols::variable::VariablePool;
use std::fmt;
use strum_macros::{Display, EnumString};

/// Operators of the expression tree. Addition and multiplication are
/// n-ary; the rest are binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Times,
    Power,
    Equals,
    Less,
    Greater,
}

/// Functions recognized by the grammar. They are legal in printing and
/// evaluation paths only; mass action terms must stay products of powers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum BuiltinFunction {
    Log,
    Ln,
    Log10,
    Cos,
    Sin,
    Abs,
    Sign,
    Sqrt,
    Real,
    Imag,
}

/// A parsed algebraic expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Constant(f64),
    Variable(String),
    Operation {
        op: Operator,
        branches: Vec<Expression>,
    },
    Function {
        function: BuiltinFunction,
        argument: Box<Expression>,
    },
}

impl Expression {
    pub fn operation(op: Operator, branches: Vec<Expression>) -> Self {
        Expression::Operation { op, branches }
    }

    /// `lhs + rhs`, merging n-ary addition branches.
    pub fn add(lhs: Expression, rhs: Expression) -> Self {
        let mut branches = Vec::new();
        for e in [lhs, rhs] {
            match e {
                Expression::Operation {
                    op: Operator::Add,
                    branches: inner,
                } => branches.extend(inner),
                other => branches.push(other),
            }
        }
        Expression::operation(Operator::Add, branches)
    }

    /// `lhs * rhs`, merging n-ary multiplication branches.
    pub fn multiply(lhs: Expression, rhs: Expression) -> Self {
        let mut branches = Vec::new();
        for e in [lhs, rhs] {
            match e {
                Expression::Operation {
                    op: Operator::Times,
                    branches: inner,
                } => branches.extend(inner),
                other => branches.push(other),
            }
        }
        Expression::operation(Operator::Times, branches)
    }

    pub fn power(base: Expression, exponent: Expression) -> Self {
        Expression::operation(Operator::Power, vec![base, exponent])
    }

    pub fn negate(expr: Expression) -> Self {
        match expr {
            Expression::Constant(c) => Expression::Constant(-c),
            other => Expression::multiply(Expression::Constant(-1.0), other),
        }
    }

    /// True for `=`, `<`, and `>` roots.
    pub fn is_relation(&self) -> bool {
        matches!(
            self,
            Expression::Operation {
                op: Operator::Equals | Operator::Less | Operator::Greater,
                ..
            }
        )
    }

    /// Left side of a relational root.
    pub fn lhs(&self) -> Option<&Expression> {
        match self {
            Expression::Operation { op, branches }
                if matches!(op, Operator::Equals | Operator::Less | Operator::Greater) =>
            {
                branches.first()
            }
            _ => None,
        }
    }

    /// Right side of a relational root.
    pub fn rhs(&self) -> Option<&Expression> {
        match self {
            Expression::Operation { op, branches }
                if matches!(op, Operator::Equals | Operator::Less | Operator::Greater) =>
            {
                branches.get(1)
            }
            _ => None,
        }
    }

    /// Variable names in first-appearance order, without duplicates.
    pub fn variables(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables(&self, names: &mut Vec<String>) {
        match self {
            Expression::Constant(_) => {}
            Expression::Variable(name) => {
                if !names.iter().any(|n| n == name) {
                    names.push(name.clone());
                }
            }
            Expression::Operation { branches, .. } => {
                for branch in branches {
                    branch.collect_variables(names);
                }
            }
            Expression::Function { argument, .. } => argument.collect_variables(names),
        }
    }

    /// Evaluates the expression with variable values taken from `pool`.
    ///
    /// Relational roots do not evaluate; the imaginary unit `i` is only a
    /// variable like any other and must be bound by the pool.
    pub fn evaluate(&self, pool: &VariablePool) -> Result<f64> {
        match self {
            Expression::Constant(c) => Ok(*c),
            Expression::Variable(name) => pool
                .value_for_variable_with_name(name)
                .ok_or_else(|| Error::NotFound(format!("variable `{name}`"))),
            Expression::Operation { op, branches } => match op {
                Operator::Add => {
                    let mut total = 0.0;
                    for branch in branches {
                        total += branch.evaluate(pool)?;
                    }
                    Ok(total)
                }
                Operator::Times => {
                    let mut total = 1.0;
                    for branch in branches {
                        total *= branch.evaluate(pool)?;
                    }
                    Ok(total)
                }
                Operator::Power => {
                    let base = branches[0].evaluate(pool)?;
                    let exponent = branches[1].evaluate(pool)?;
                    Ok(base.powf(exponent))
                }
                Operator::Equals | Operator::Less | Operator::Greater => Err(
                    Error::WrongShapeOrDomain("relations do not evaluate to a scalar".into()),
                ),
            },
            Expression::Function { function, argument } => {
                let x = argument.evaluate(pool)?;
                Ok(match function {
                    BuiltinFunction::Log | BuiltinFunction::Log10 => x.log10(),
                    BuiltinFunction::Ln => x.ln(),
                    BuiltinFunction::Cos => x.cos(),
                    BuiltinFunction::Sin => x.sin(),
                    BuiltinFunction::Abs => x.abs(),
                    BuiltinFunction::Sign => {
                        if x > 0.0 {
                            1.0
                        } else if x < 0.0 {
                            -1.0
                        } else {
                            0.0
                        }
                    }
                    BuiltinFunction::Sqrt => x.sqrt(),
                    BuiltinFunction::Real => x,
                    BuiltinFunction::Imag => 0.0,
                })
            }
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expression::Operation { op, .. } => match op {
                Operator::Equals | Operator::Less | Operator::Greater => 0,
                Operator::Add => 1,
                Operator::Times => 2,
                Operator::Power => 3,
            },
            Expression::Constant(c) if *c < 0.0 => 2,
            _ => 4,
        }
    }

    fn fmt_branch(&self, f: &mut fmt::Formatter<'_>, parent: u8) -> fmt::Result {
        if self.precedence() < parent {
            write!(f, "(")?;
            self.fmt_inner(f)?;
            write!(f, ")")
        } else {
            self.fmt_inner(f)
        }
    }

    fn fmt_inner(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Constant(c) => write!(f, "{c}"),
            Expression::Variable(name) => write!(f, "{name}"),
            Expression::Function { function, argument } => {
                write!(f, "{function}(")?;
                argument.fmt_inner(f)?;
                write!(f, ")")
            }
            Expression::Operation { op, branches } => match op {
                Operator::Add => {
                    for (k, branch) in branches.iter().enumerate() {
                        if k == 0 {
                            branch.fmt_branch(f, 1)?;
                            continue;
                        }
                        if let Some(positive) = branch.without_leading_minus() {
                            write!(f, " - ")?;
                            positive.fmt_branch(f, 2)?;
                        } else {
                            write!(f, " + ")?;
                            branch.fmt_branch(f, 1)?;
                        }
                    }
                    Ok(())
                }
                Operator::Times => {
                    let mut rest = branches.as_slice();
                    if let Some(Expression::Constant(c)) = branches.first() {
                        if *c == -1.0 && branches.len() > 1 {
                            write!(f, "-")?;
                            rest = &branches[1..];
                        }
                    }
                    for (k, branch) in rest.iter().enumerate() {
                        if k > 0 {
                            write!(f, "*")?;
                        }
                        branch.fmt_branch(f, 3)?;
                    }
                    Ok(())
                }
                Operator::Power => {
                    branches[0].fmt_branch(f, 4)?;
                    write!(f, "^")?;
                    branches[1].fmt_branch(f, 4)
                }
                Operator::Equals => {
                    branches[0].fmt_branch(f, 1)?;
                    write!(f, " = ")?;
                    branches[1].fmt_branch(f, 1)
                }
                Operator::Less => {
                    branches[0].fmt_branch(f, 1)?;
                    write!(f, " < ")?;
                    branches[1].fmt_branch(f, 1)
                }
                Operator::Greater => {
                    branches[0].fmt_branch(f, 1)?;
                    write!(f, " > ")?;
                    branches[1].fmt_branch(f, 1)
                }
            },
        }
    }

    /// When this expression is a negated product or constant, returns its
    /// positive counterpart for `a - b` style printing.
    fn without_leading_minus(&self) -> Option<Expression> {
        match self {
            Expression::Constant(c) if *c < 0.0 => Some(Expression::Constant(-c)),
            Expression::Operation {
                op: Operator::Times,
                branches,
            } => match branches.first() {
                Some(Expression::Constant(c)) if *c < 0.0 => {
                    let mut rest: Vec<Expression> = branches[1..].to_vec();
                    if *c != -1.0 {
                        rest.insert(0, Expression::Constant(-c));
                    }
                    Some(match rest.len() {
                        0 => Expression::Constant(1.0),
                        1 => rest.into_iter().next().expect("one branch"),
                        _ => Expression::operation(Operator::Times, rest),
                    })
                }
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_inner(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::parser::parse_expression;

    #[test]
    fn evaluates_with_a_pool() {
        let pool = VariablePool::by_parsing_string("x : 2, y : 3").unwrap();
        let expr = parse_expression("2*x^2 + y").unwrap();
        assert_eq!(expr.evaluate(&pool).unwrap(), 11.0);
    }

    #[test]
    fn evaluates_functions() {
        let pool = VariablePool::by_parsing_string("x : 100").unwrap();
        let expr = parse_expression("log(x) + sign(x) + imag(x)").unwrap();
        assert_eq!(expr.evaluate(&pool).unwrap(), 3.0);
    }

    #[test]
    fn unknown_variable_is_not_found() {
        let pool = VariablePool::new();
        let expr = parse_expression("q + 1").unwrap();
        assert!(matches!(expr.evaluate(&pool), Err(Error::NotFound(_))));
    }

    #[test]
    fn printing_round_trips_through_the_parser() {
        for source in ["a + 2*x^2", "a - b*x", "(a + b)*x", "a*x^-1"] {
            let expr = parse_expression(source).unwrap();
            let printed = expr.to_string();
            let reparsed = parse_expression(&printed).unwrap();
            let pool = VariablePool::by_parsing_string("a : 5, b : 7, x : 2").unwrap();
            assert_eq!(
                expr.evaluate(&pool).unwrap(),
                reparsed.evaluate(&pool).unwrap(),
                "printing `{source}` as `{printed}` changed its value"
            );
        }
    }

    #[test]
    fn variable_collection_keeps_first_appearance_order() {
        let expr = parse_expression("b*a + a*c").unwrap();
        assert_eq!(expr.variables(), vec!["b", "a", "c"]);
    }
}
