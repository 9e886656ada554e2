//! Expression tree and its evaluation
//!
//! Evaluation follows IEEE-754 without traps: `log(0)` is `-inf`, `log(-1)`
//! and `0/0` are NaN. Domain errors surface as non-finite results.

use std::fmt;

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `^`
    Pow,
}

/// Unary operators and functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Negation
    Neg,
    /// Natural exponential
    Exp,
    /// Natural logarithm
    Log,
}

impl UnaryOp {
    /// Function recognised by name in equation text
    #[must_use]
    pub fn from_function_name(name: &str) -> Option<Self> {
        match name {
            "exp" => Some(Self::Exp),
            "log" => Some(Self::Log),
            _ => None,
        }
    }
}

/// Expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal
    Constant(f64),
    /// Parameter bound to a positional argument
    Variable {
        /// Position in the declared parameter order
        index: usize,
        /// Parameter name, for display
        name: String,
    },
    /// Unary operator or function application
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: Box<Expr>,
    },
    /// Binary operator
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
    },
}

impl Expr {
    /// Evaluate with `args` bound positionally
    ///
    /// `args` must cover every variable index in the tree.
    #[must_use]
    pub fn eval(&self, args: &[f64]) -> f64 {
        match self {
            Self::Constant(value) => *value,
            Self::Variable { index, .. } => args[*index],
            Self::Unary { op, operand } => {
                let x = operand.eval(args);
                match op {
                    UnaryOp::Neg => -x,
                    UnaryOp::Exp => x.exp(),
                    UnaryOp::Log => x.ln(),
                }
            }
            Self::Binary { op, lhs, rhs } => {
                let l = lhs.eval(args);
                let r = rhs.eval(args);
                match op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Sub => l - r,
                    BinaryOp::Mul => l * r,
                    BinaryOp::Div => l / r,
                    BinaryOp::Pow => pow(l, r),
                }
            }
        }
    }

    /// Number of nodes in the tree
    #[must_use]
    pub fn node_count(&self) -> usize {
        match self {
            Self::Constant(_) | Self::Variable { .. } => 1,
            Self::Unary { operand, .. } => 1 + operand.node_count(),
            Self::Binary { lhs, rhs, .. } => 1 + lhs.node_count() + rhs.node_count(),
        }
    }
}

// Integral exponents go through powi so small integer powers stay exact.
#[allow(clippy::cast_possible_truncation)]
fn pow(base: f64, exponent: f64) -> f64 {
    if exponent.fract() == 0.0 && exponent.abs() <= f64::from(i32::MAX) {
        base.powi(exponent as i32)
    } else {
        base.powf(exponent)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => write!(f, "{value}"),
            Self::Variable { name, .. } => write!(f, "{name}"),
            Self::Unary { op, operand } => match op {
                UnaryOp::Neg => write!(f, "(-{operand})"),
                UnaryOp::Exp => write!(f, "exp({operand})"),
                UnaryOp::Log => write!(f, "log({operand})"),
            },
            Self::Binary { op, lhs, rhs } => {
                let symbol = match op {
                    BinaryOp::Add => "+",
                    BinaryOp::Sub => "-",
                    BinaryOp::Mul => "*",
                    BinaryOp::Div => "/",
                    BinaryOp::Pow => "^",
                };
                write!(f, "({lhs} {symbol} {rhs})")
            }
        }
    }
}
