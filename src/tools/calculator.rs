//! Arithmetic tool.
//!
//! Evaluates expressions with `+ - * / % ^`, parentheses and unary signs.
//! `^` (also written `**`) binds tighter than unary minus and is
//! right-associative, so `-2^2` is `-4` and `2^3^2` is `512`.

use serde_json::{json, Value};

use crate::error::{ParleyError, Result};
use crate::tool::{ToolArguments, ToolDescriptor, ToolHandler};

pub const NAME: &str = "calculator";

/// Largest magnitude at which every integer is exactly representable in f64.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Combined limit on signs, exponents and parentheses open at one time.
const MAX_DEPTH: usize = 256;

pub struct CalculatorTool;

impl CalculatorTool {
    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(NAME, "Perform a mathematical calculation").with_required_parameter(
            "expression",
            "The mathematical expression to evaluate (e.g., '2 + 2')",
        )
    }
}

impl ToolHandler for CalculatorTool {
    fn call(&self, arguments: &ToolArguments) -> Result<Value> {
        let expression = match arguments.get("expression") {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Number(number)) => number.to_string(),
            _ => {
                return Err(ParleyError::InvalidArgument(
                    "`expression` must be a string".into(),
                ))
            }
        };
        let result = evaluate(&expression)?;
        Ok(json!({ "expression": expression.trim(), "result": number_value(result) }))
    }
}

/// Evaluate an arithmetic expression.
pub fn evaluate(expression: &str) -> Result<f64> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err(ParleyError::InvalidArgument("empty expression".into()));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expression()?;
    if let Some(token) = parser.peek() {
        return Err(ParleyError::InvalidArgument(format!(
            "unexpected `{token}` in expression"
        )));
    }
    if !value.is_finite() {
        return Err(ParleyError::InvalidArgument(
            "expression does not evaluate to a finite number".into(),
        ));
    }
    Ok(value)
}

/// Integral results are reported as JSON integers.
fn number_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() <= MAX_EXACT_INTEGER {
        json!(value as i64)
    } else {
        json!(value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    LParen,
    RParen,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{n}"),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Star => f.write_str("*"),
            Token::Slash => f.write_str("/"),
            Token::Percent => f.write_str("%"),
            Token::Caret => f.write_str("^"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((pos, ch)) = chars.next() {
        let token = match ch {
            c if c.is_whitespace() => continue,
            '0'..='9' | '.' => {
                let mut end = pos + ch.len_utf8();
                while let Some(&(next_pos, next)) = chars.peek() {
                    if next.is_ascii_digit() || next == '.' {
                        end = next_pos + next.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let literal = &input[pos..end];
                let number = literal.parse::<f64>().map_err(|_| {
                    ParleyError::InvalidArgument(format!("invalid number `{literal}`"))
                })?;
                Token::Number(number)
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => {
                if matches!(chars.peek(), Some((_, '*'))) {
                    chars.next();
                    Token::Caret
                } else {
                    Token::Star
                }
            }
            '/' => Token::Slash,
            '%' => Token::Percent,
            '^' => Token::Caret,
            '(' => Token::LParen,
            ')' => Token::RParen,
            other => {
                return Err(ParleyError::InvalidArgument(format!(
                    "unexpected character `{other}` at position {pos}"
                )))
            }
        };
        tokens.push(token);
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn descend(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParleyError::InvalidArgument(
                "expression nested too deeply".into(),
            ));
        }
        Ok(())
    }

    fn expression(&mut self) -> Result<f64> {
        let mut value = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == Token::Plus {
                value + rhs
            } else {
                value - rhs
            };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64> {
        let mut value = self.unary()?;
        while let Some(op @ (Token::Star | Token::Slash | Token::Percent)) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = match op {
                Token::Star => value * rhs,
                _ if rhs == 0.0 => {
                    return Err(ParleyError::InvalidArgument("division by zero".into()))
                }
                Token::Slash => value / rhs,
                _ => value % rhs,
            };
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<f64> {
        self.descend()?;
        let value = match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                -self.unary()?
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()?
            }
            _ => self.power()?,
        };
        self.depth -= 1;
        Ok(value)
    }

    fn power(&mut self) -> Result<f64> {
        let base = self.primary()?;
        if self.peek() == Some(Token::Caret) {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<f64> {
        match self.advance() {
            Some(Token::Number(value)) => Ok(value),
            Some(Token::LParen) => {
                self.descend()?;
                let value = self.expression()?;
                self.depth -= 1;
                match self.advance() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(ParleyError::InvalidArgument(
                        "unbalanced parentheses".into(),
                    )),
                }
            }
            Some(token) => Err(ParleyError::InvalidArgument(format!(
                "unexpected `{token}` in expression"
            ))),
            None => Err(ParleyError::InvalidArgument(
                "expression ended unexpectedly".into(),
            )),
        }
    }
}
