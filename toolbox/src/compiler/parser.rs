use crate::compiler::expression::{BuiltinFunction, Expression, Operator};
use crate::compiler::token::{tokenize, Token};
use crate::errors::{Error, Result};
use std::str::FromStr;

/// Parses one expression, equation, or constraint string.
///
/// Precedence, loosest first: relations (`=`, `<`, `>`), addition and
/// subtraction, multiplication and division, unary minus, `^` (right
/// associative, binding tighter than unary minus on its base).
pub fn parse_expression(input: &str) -> Result<Expression> {
    if input.trim().is_empty() {
        return Err(Error::ParseFail("empty input".into()));
    }
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.relation()?;
    if parser.pos != parser.tokens.len() {
        return Err(Error::ParseFail(format!(
            "trailing tokens after position {}",
            parser.pos
        )));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, token: Token) -> Result<()> {
        match self.advance() {
            Some(t) if t == token => Ok(()),
            other => Err(Error::ParseFail(format!(
                "expected {token:?}, found {other:?}"
            ))),
        }
    }

    fn relation(&mut self) -> Result<Expression> {
        let lhs = self.sum()?;
        let op = match self.peek() {
            Some(Token::Equals) => Operator::Equals,
            Some(Token::Less) => Operator::Less,
            Some(Token::Greater) => Operator::Greater,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.sum()?;
        if matches!(
            self.peek(),
            Some(Token::Equals) | Some(Token::Less) | Some(Token::Greater)
        ) {
            return Err(Error::ParseFail("chained relations".into()));
        }
        Ok(Expression::operation(op, vec![lhs, rhs]))
    }

    fn sum(&mut self) -> Result<Expression> {
        let mut expr = self.product()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.advance();
                    let rhs = self.product()?;
                    expr = Expression::add(expr, rhs);
                }
                Some(Token::Minus) => {
                    self.advance();
                    let rhs = self.product()?;
                    expr = Expression::add(expr, Expression::negate(rhs));
                }
                _ => return Ok(expr),
            }
        }
    }

    fn product(&mut self) -> Result<Expression> {
        let mut expr = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Times) => {
                    self.advance();
                    let rhs = self.unary()?;
                    expr = Expression::multiply(expr, rhs);
                }
                Some(Token::Divide) => {
                    self.advance();
                    let rhs = self.unary()?;
                    expr = Expression::multiply(
                        expr,
                        Expression::power(rhs, Expression::Constant(-1.0)),
                    );
                }
                _ => return Ok(expr),
            }
        }
    }

    fn unary(&mut self) -> Result<Expression> {
        if matches!(self.peek(), Some(Token::Minus)) {
            self.advance();
            let inner = self.unary()?;
            return Ok(Expression::negate(inner));
        }
        self.exponent()
    }

    fn exponent(&mut self) -> Result<Expression> {
        let base = self.primary()?;
        if matches!(self.peek(), Some(Token::Power)) {
            self.advance();
            // The exponent may carry its own sign, as in `x^-2`.
            let exponent = self.unary()?;
            return Ok(Expression::power(base, exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expression> {
        match self.advance() {
            Some(Token::Number(value)) => Ok(Expression::Constant(value)),
            Some(Token::Identifier(name)) => {
                if matches!(self.peek(), Some(Token::LParen)) {
                    self.advance();
                    let argument = self.sum()?;
                    self.expect(Token::RParen)?;
                    let function = BuiltinFunction::from_str(&name.to_ascii_lowercase())
                        .map_err(|_| {
                            Error::ParseFail(format!("unknown function `{name}`"))
                        })?;
                    Ok(Expression::Function {
                        function,
                        argument: Box::new(argument),
                    })
                } else {
                    Ok(Expression::Variable(name))
                }
            }
            Some(Token::LParen) => {
                let expr = self.sum()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            other => Err(Error::ParseFail(format!(
                "expected a value, found {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::variable::VariablePool;

    fn eval(source: &str, pool: &str) -> f64 {
        let pool = VariablePool::by_parsing_string(pool).unwrap();
        parse_expression(source).unwrap().evaluate(&pool).unwrap()
    }

    #[test]
    fn precedence_is_standard() {
        assert_eq!(eval("1 + 2*3", ""), 7.0);
        assert_eq!(eval("2*3^2", ""), 18.0);
        assert_eq!(eval("(1 + 2)*3", ""), 9.0);
        assert_eq!(eval("8/2/2", ""), 2.0);
    }

    #[test]
    fn unary_minus_binds_looser_than_power() {
        assert_eq!(eval("-2^2", ""), -4.0);
        assert_eq!(eval("2^-1", ""), 0.5);
        assert_eq!(eval("-x^2", "x : 3"), -9.0);
    }

    #[test]
    fn power_is_right_associative() {
        assert_eq!(eval("2^3^2", ""), 512.0);
    }

    #[test]
    fn equations_parse_as_relations() {
        let expr = parse_expression("dX1/dt = a - b*X1").unwrap();
        assert!(expr.is_relation());
        assert!(expr.lhs().is_some());
        assert!(expr.rhs().is_some());
    }

    #[test]
    fn failures_are_parse_errors() {
        assert!(parse_expression("").is_err());
        assert!(parse_expression("a + ").is_err());
        assert!(parse_expression("foo(2)").is_err());
        assert!(parse_expression("(a + b").is_err());
        assert!(parse_expression("a = b = c").is_err());
    }
}
