//! Equation compiler
//!
//! Turns discovered equation text into a function of the declared
//! parameters, bound positionally in declared order.
//!
//! Supported syntax: `+ - * / ^` (or `**`), `exp(..)`, `log(..)`, numeric
//! literals and the declared parameter names. Anything else fails to compile
//! with `Error::EquationParse`, which is distinct from numeric domain errors:
//! those evaluate to NaN or infinity.
//!
//! ## Example
//!
//! ```rust
//! use med_sweep::equation::compile;
//!
//! # fn main() -> med_sweep::Result<()> {
//! let f = compile("x^2 + y", &["x", "y"])?;
//! assert_eq!(f.evaluate(&[3.0, 1.0])?, 10.0);
//!
//! let g = compile("log(x)", &["x"])?;
//! assert!(!g.evaluate(&[0.0])?.is_finite());
//! # Ok(())
//! # }
//! ```

mod ast;
mod lexer;
mod parser;

pub use ast::{BinaryOp, Expr, UnaryOp};
pub use lexer::{tokenize, Token};

use crate::{Error, Result};
use std::collections::HashSet;
use std::fmt;

/// Equation compiled against a fixed parameter order
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledEquation {
    text: String,
    parameters: Vec<String>,
    expr: Expr,
}

/// Compile `equation` into a function of `parameters`, in that order
///
/// # Errors
/// Returns `Error::EquationParse` for malformed text or unknown identifiers,
/// and `Error::InvalidInput` if a parameter name is declared twice
pub fn compile<S: AsRef<str>>(equation: &str, parameters: &[S]) -> Result<CompiledEquation> {
    let parameters: Vec<String> = parameters.iter().map(|p| p.as_ref().to_string()).collect();

    let mut seen = HashSet::with_capacity(parameters.len());
    if let Some(dup) = parameters.iter().find(|p| !seen.insert(p.as_str())) {
        return Err(Error::InvalidInput(format!(
            "parameter '{dup}' declared more than once"
        )));
    }

    let expr = parser::parse(equation, &parameters)?;
    Ok(CompiledEquation {
        text: equation.to_string(),
        parameters,
        expr,
    })
}

impl CompiledEquation {
    /// Source text as given to `compile`
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Parameter names in binding order
    #[must_use]
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Number of positional arguments
    #[must_use]
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    /// Parsed expression tree
    #[must_use]
    pub const fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Evaluate at one point
    ///
    /// # Errors
    /// Returns `Error::Arity` if `args.len()` differs from the parameter count
    pub fn evaluate(&self, args: &[f64]) -> Result<f64> {
        self.check_arity(args.len())?;
        Ok(self.expr.eval(args))
    }

    /// Evaluate row-wise over equal-length parameter columns
    ///
    /// `columns[i]` holds the values of parameter `i`. Returns one value per row.
    ///
    /// # Errors
    /// Returns `Error::Arity` for the wrong column count and
    /// `Error::InvalidInput` if the columns differ in length
    pub fn evaluate_columns(&self, columns: &[&[f64]]) -> Result<Vec<f64>> {
        self.check_arity(columns.len())?;

        let rows = columns.first().map_or(0, |c| c.len());
        if let Some(bad) = columns.iter().position(|c| c.len() != rows) {
            return Err(Error::InvalidInput(format!(
                "column for '{}' has {} rows, expected {rows}",
                self.parameters[bad],
                columns[bad].len()
            )));
        }

        let mut args = vec![0.0; columns.len()];
        Ok((0..rows)
            .map(|row| {
                for (arg, column) in args.iter_mut().zip(columns) {
                    *arg = column[row];
                }
                self.expr.eval(&args)
            })
            .collect())
    }

    fn check_arity(&self, actual: usize) -> Result<()> {
        if actual == self.parameters.len() {
            Ok(())
        } else {
            Err(Error::Arity {
                expected: self.parameters.len(),
                actual,
            })
        }
    }
}

impl fmt::Display for CompiledEquation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) -> {}", self.parameters.join(", "), self.expr)
    }
}
