//! Recursive-descent parser for discovered equations
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('-' | '+') unary | power
//! power   := primary ('^' unary)?
//! primary := NUMBER | FUNC '(' expr ')' | PARAM | '(' expr ')'
//! ```
//!
//! `^` is right-associative and its exponent may carry a sign (`x^-1`),
//! so `-x^2` reads as `-(x^2)`.

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::lexer::{tokenize, Spanned, Token};
use crate::{Error, Result};

/// Parse `equation` with identifiers resolved against `parameters`
///
/// # Errors
/// Returns `Error::EquationParse` for malformed text, unknown identifiers,
/// unknown functions, or trailing input
pub fn parse(equation: &str, parameters: &[String]) -> Result<Expr> {
    let tokens = tokenize(equation)?;
    let mut parser = Parser {
        equation,
        parameters,
        tokens,
        pos: 0,
    };

    let expr = parser.expr()?;
    if let Some((token, offset)) = parser.tokens.get(parser.pos) {
        return Err(parser.error_at(*offset, format!("unexpected '{token}' after expression")));
    }
    Ok(expr)
}

struct Parser<'a> {
    equation: &'a str,
    parameters: &'a [String],
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.equation.len(), |(_, offset)| *offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token) -> Result<()> {
        match self.peek() {
            Some(token) if token == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(token) => {
                let message = format!("expected '{expected}', found '{token}'");
                Err(self.error_at(self.offset(), message))
            }
            None => Err(self.error_at(
                self.offset(),
                format!("expected '{expected}', found end of input"),
            )),
        }
    }

    fn error_at(&self, position: usize, message: String) -> Error {
        Error::EquationParse {
            equation: self.equation.to_string(),
            message,
            position,
        }
    }

    fn expr(&mut self) -> Result<Expr> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn term(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn unary(&mut self) -> Result<Expr> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                let operand = self.unary()?;
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                })
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Expr> {
        let base = self.primary()?;
        if self.peek() == Some(&Token::Caret) {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr> {
        let offset = self.offset();
        match self.advance() {
            Some(Token::Number(value)) => Ok(Expr::Constant(value)),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    let op = UnaryOp::from_function_name(&name).ok_or_else(|| {
                        self.error_at(offset, format!("unknown function '{name}'"))
                    })?;
                    self.pos += 1;
                    let argument = self.expr()?;
                    self.expect(&Token::RParen)?;
                    return Ok(Expr::Unary {
                        op,
                        operand: Box::new(argument),
                    });
                }

                let index = self
                    .parameters
                    .iter()
                    .position(|p| *p == name)
                    .ok_or_else(|| self.error_at(offset, format!("unknown identifier '{name}'")))?;
                Ok(Expr::Variable { index, name })
            }
            Some(token) => Err(self.error_at(offset, format!("unexpected '{token}'"))),
            None => Err(self.error_at(offset, "unexpected end of input".to_string())),
        }
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    fn params(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    fn eval(src: &str, names: &[&str], args: &[f64]) -> f64 {
        parse(src, &params(names)).unwrap().eval(args)
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("1 + 2 * 3", &[], &[]), 7.0);
        assert_eq!(eval("(1 + 2) * 3", &[], &[]), 9.0);
        assert_eq!(eval("8 / 4 / 2", &[], &[]), 1.0);
        assert_eq!(eval("10 - 4 - 3", &[], &[]), 3.0);
    }

    #[test]
    fn test_power_binds_tighter_than_negation() {
        assert_eq!(eval("-x^2", &["x"], &[3.0]), -9.0);
        assert_eq!(eval("(-x)^2", &["x"], &[3.0]), 9.0);
    }

    #[test]
    fn test_power_right_associative_with_signed_exponent() {
        assert_eq!(eval("2^3^2", &[], &[]), 512.0);
        assert_eq!(eval("x^-1", &["x"], &[4.0]), 0.25);
        assert_eq!(eval("2*x^2", &["x"], &[3.0]), 18.0);
    }

    #[test]
    fn test_functions() {
        assert_eq!(eval("exp(0)", &[], &[]), 1.0);
        assert!((eval("log(exp(x))", &["x"], &[2.0]) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_identifier_fails() {
        let err = parse("x + z", &params(&["x"])).unwrap_err();
        match err {
            Error::EquationParse { message, position, .. } => {
                assert!(message.contains("unknown identifier 'z'"));
                assert_eq!(position, 4);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_function_fails() {
        assert!(parse("sin(x)", &params(&["x"])).is_err());
    }

    #[test]
    fn test_malformed_inputs_fail() {
        for src in ["", "x +", "(x", "x)", "x y", "exp x", "log()", "2 ** ** 3", "exp(x, x)"] {
            assert!(
                parse(src, &params(&["x"])).is_err(),
                "expected parse failure for {src:?}"
            );
        }
    }
}
