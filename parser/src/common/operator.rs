use std::fmt;

use serde::{Deserialize, Serialize};

/// Binary operators as they appear between two operands of a [`crate::ast::BinaryExpr`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Add,
    And,
    Atan2,
    Default,
    Div,
    Eql,
    Gt,
    Gte,
    If,
    IfNot,
    Lt,
    Lte,
    Mod,
    Mul,
    NotEq,
    Or,
    Pow,
    Sub,
    Unless,
}

impl Operator {
    /// Comparison operators are the only ones accepting the `bool` modifier.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Operator::Eql
                | Operator::NotEq
                | Operator::Gt
                | Operator::Gte
                | Operator::Lt
                | Operator::Lte
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::And => "and",
            Operator::Atan2 => "atan2",
            Operator::Default => "default",
            Operator::Div => "/",
            Operator::Eql => "==",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::If => "if",
            Operator::IfNot => "ifnot",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Mod => "%",
            Operator::Mul => "*",
            Operator::NotEq => "!=",
            Operator::Or => "or",
            Operator::Pow => "^",
            Operator::Sub => "-",
            Operator::Unless => "unless",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
