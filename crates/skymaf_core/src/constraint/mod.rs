//! Row selection by constraint strings.
//!
//! The engine only depends on [`ConstraintEvaluator`]; [`PredicateEvaluator`]
//! is the built-in implementation for a small SQL-like predicate language
//! (`filter = "r" and (night < 365 or airmass <= 1.2)`).

mod lexer;
mod parser;

use crate::error::{MafError, Result};
use crate::table::{Column, Table};

pub use parser::{CompareOp, Literal, ParseError, Parser, Predicate};

/// Turns a constraint into the sorted indices of matching rows.
///
/// An empty (or all-whitespace) constraint selects every row.
pub trait ConstraintEvaluator: Send + Sync {
    fn select(&self, table: &Table, constraint: &str) -> Result<Vec<usize>>;
}

/// Parse a constraint; `None` when it is empty
pub fn parse_constraint(constraint: &str) -> Result<Option<Predicate>> {
    Parser::new(constraint)
        .parse()
        .map_err(|e| MafError::Constraint {
            constraint: constraint.to_string(),
            message: e.message,
        })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PredicateEvaluator;

impl PredicateEvaluator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn mask(&self, table: &Table, predicate: &Predicate, constraint: &str) -> Result<Vec<bool>> {
        match predicate {
            Predicate::Compare { column, op, value } => {
                match (table.column(column)?, value) {
                    (Column::Float(data), Literal::Number(n)) => {
                        Ok(data.iter().map(|v| op.test(v, n)).collect())
                    }
                    (Column::Text(data), Literal::Text(s)) => {
                        Ok(data.iter().map(|v| op.test(v.as_str(), s.as_str())).collect())
                    }
                    (col, lit) => Err(MafError::Constraint {
                        constraint: constraint.to_string(),
                        message: format!(
                            "column `{column}` is {} but is compared with {}",
                            col.type_name(),
                            match lit {
                                Literal::Number(_) => "a number",
                                Literal::Text(_) => "a string",
                            }
                        ),
                    }),
                }
            }
            Predicate::And(a, b) => {
                let mut left = self.mask(table, a, constraint)?;
                let right = self.mask(table, b, constraint)?;
                left.iter_mut().zip(right).for_each(|(l, r)| *l &= r);
                Ok(left)
            }
            Predicate::Or(a, b) => {
                let mut left = self.mask(table, a, constraint)?;
                let right = self.mask(table, b, constraint)?;
                left.iter_mut().zip(right).for_each(|(l, r)| *l |= r);
                Ok(left)
            }
            Predicate::Not(inner) => {
                let mut mask = self.mask(table, inner, constraint)?;
                mask.iter_mut().for_each(|m| *m = !*m);
                Ok(mask)
            }
        }
    }
}

impl ConstraintEvaluator for PredicateEvaluator {
    fn select(&self, table: &Table, constraint: &str) -> Result<Vec<usize>> {
        let Some(predicate) = parse_constraint(constraint)? else {
            return Ok(table.all_rows());
        };
        let mask = self.mask(table, &predicate, constraint)?;
        Ok(mask
            .iter()
            .enumerate()
            .filter_map(|(row, &keep)| keep.then_some(row))
            .collect())
    }
}
