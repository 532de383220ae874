use crate::error::{EvalError, Result};
use crate::lexer::{self, LexingError, Token, TokenKind};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One of the four supported binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
}

impl Operator {
    pub fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Sub => '-',
            Operator::Mul => '*',
            Operator::Div => '/',
        }
    }
}

impl FromStr for Operator {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "+" => Ok(Operator::Add),
            "-" => Ok(Operator::Sub),
            "*" => Ok(Operator::Mul),
            "/" => Ok(Operator::Div),
            other => Err(EvalError::InvalidOperator(other.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A single `(operator, number)` pair following the leading number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub op: Operator,
    pub operand: i64,
    /// Byte offset of the operator in the source line.
    pub offset: usize,
}

/// A parsed flat expression: `first (op operand)*`, evaluated left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    pub first: i64,
    pub steps: Vec<Step>,
}

impl Expression {
    /// Tokenize and parse a whole line.
    pub fn parse(line: &str) -> Result<Self> {
        let tokens = lexer::split_into_tokens(line).map_err(ParsingError::from)?;
        construct_expression(tokens)
    }

    /// Number of operators, which is also the number of workers needed.
    pub fn operator_count(&self) -> usize {
        self.steps.len()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.first)?;
        for step in &self.steps {
            write!(f, " {} {}", step.op, step.operand)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParsingError {
    #[error(transparent)]
    Lexing(#[from] LexingError),
    #[error("empty expression")]
    EmptyExpression,
    #[error("expected a number at offset {offset}, found {found}")]
    ExpectedNumber { offset: usize, found: String },
    #[error("expected an operator at offset {offset}, found {found}")]
    ExpectedOperator { offset: usize, found: String },
    #[error("operator {op} at offset {offset} has no right-hand operand")]
    MissingOperand { op: char, offset: usize },
}

struct ExpressionBuilder {
    tokens: Vec<Token>,
    pos: usize,
}

impl ExpressionBuilder {
    fn from(tokens: Vec<Token>) -> Self {
        ExpressionBuilder { tokens, pos: 0 }
    }

    fn build(mut self) -> Result<Expression> {
        let first = match self.consume() {
            Some(token) => expect_number(token)?,
            None => return Err(ParsingError::EmptyExpression.into()),
        };

        let mut steps = Vec::new();
        while let Some(token) = self.consume() {
            let offset = token.offset;
            let op = match token.kind {
                TokenKind::Symbol(text) => text.parse::<Operator>()?,
                TokenKind::Number(n) => {
                    return Err(ParsingError::ExpectedOperator {
                        offset,
                        found: n.to_string(),
                    }
                    .into());
                }
            };
            let operand = match self.consume() {
                Some(token) => expect_number(token)?,
                None => {
                    return Err(ParsingError::MissingOperand {
                        op: op.symbol(),
                        offset,
                    }
                    .into());
                }
            };
            steps.push(Step {
                op,
                operand,
                offset,
            });
        }

        Ok(Expression { first, steps })
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }
}

fn expect_number(token: Token) -> std::result::Result<i64, ParsingError> {
    match token.kind {
        TokenKind::Number(n) => Ok(n),
        TokenKind::Symbol(found) => Err(ParsingError::ExpectedNumber {
            offset: token.offset,
            found,
        }),
    }
}

/// Build an [`Expression`] from a token stream.
///
/// The whole stream is validated here, so a malformed line is rejected
/// before any work is scheduled for it.
pub fn construct_expression(tokens: Vec<Token>) -> Result<Expression> {
    ExpressionBuilder::from(tokens).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_err(line: &str) -> ParsingError {
        match Expression::parse(line) {
            Err(EvalError::Parse(e)) => e,
            other => panic!("expected a parse error for {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_single_number() {
        let expr = Expression::parse("42").unwrap();
        assert_eq!(expr.first, 42);
        assert_eq!(expr.operator_count(), 0);
    }

    #[test]
    fn test_steps_keep_order_and_offsets() {
        let expr = Expression::parse("10 - 2 * 3").unwrap();
        assert_eq!(expr.first, 10);
        assert_eq!(
            expr.steps,
            vec![
                Step {
                    op: Operator::Sub,
                    operand: 2,
                    offset: 3
                },
                Step {
                    op: Operator::Mul,
                    operand: 3,
                    offset: 7
                },
            ]
        );
    }

    #[test]
    fn test_zero_and_negative_operands() {
        let expr = Expression::parse("0 + 5 / -3").unwrap();
        assert_eq!(expr.first, 0);
        assert_eq!(expr.steps[0].operand, 5);
        assert_eq!(expr.steps[1].op, Operator::Div);
        assert_eq!(expr.steps[1].operand, -3);
    }

    #[test]
    fn test_display_is_canonical() {
        let expr = Expression::parse("  1 +\t2   * 3 \n").unwrap();
        assert_eq!(expr.to_string(), "1 + 2 * 3");
    }

    #[test]
    fn test_invalid_operator() {
        match Expression::parse("5 ? 3") {
            Err(EvalError::InvalidOperator(op)) => assert_eq!(op, "?"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_empty_expression() {
        assert_eq!(parse_err(""), ParsingError::EmptyExpression);
        assert_eq!(parse_err("  \n"), ParsingError::EmptyExpression);
    }

    #[test]
    fn test_missing_operand() {
        assert_eq!(
            parse_err("5 +"),
            ParsingError::MissingOperand { op: '+', offset: 2 }
        );
    }

    #[test]
    fn test_two_numbers_in_a_row() {
        assert_eq!(
            parse_err("5 3"),
            ParsingError::ExpectedOperator {
                offset: 2,
                found: "3".to_string()
            }
        );
    }

    #[test]
    fn test_operator_where_number_expected() {
        assert_eq!(
            parse_err("5 + *"),
            ParsingError::ExpectedNumber {
                offset: 4,
                found: "*".to_string()
            }
        );
        assert_eq!(
            parse_err("x + 1"),
            ParsingError::ExpectedNumber {
                offset: 0,
                found: "x".to_string()
            }
        );
    }

    #[test]
    fn test_lexing_error_is_wrapped() {
        assert!(matches!(
            parse_err("99999999999999999999"),
            ParsingError::Lexing(LexingError::IntegerOutOfRange { .. })
        ));
    }

    #[test]
    fn test_operator_round_trips_through_symbol() {
        for op in [Operator::Add, Operator::Sub, Operator::Mul, Operator::Div] {
            assert_eq!(op.symbol().to_string().parse::<Operator>().unwrap(), op);
        }
    }
}
