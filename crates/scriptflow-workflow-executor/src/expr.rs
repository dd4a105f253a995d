//! Boolean expression evaluator for edge and condition nodes.
//!
//! Expressions are evaluated against a read-only JSON context of prior node
//! outputs. Supported surface, kept deliberately small:
//!
//! - Dotted field access: `build.output.status`
//! - Comparisons: `==`, `!=`, `>`, `<`, `>=`, `<=`
//! - Logical: `&&`, `||`, `!`
//! - Literals: single or double quoted strings, numbers, `true`, `false`,
//!   `null`
//!
//! Missing fields resolve to null, and comparisons against null are false
//! (except `== null` / `!= null`), so a condition over a node that never
//! produced output quietly evaluates false instead of erroring. Numbers
//! compare as f64, so integer and float spellings of the same value are
//! equal.

use serde_json::Value;
use thiserror::Error;

/// Errors from parsing an expression. Callers treat these as "condition not
/// met" rather than aborting the run.
#[derive(Debug, Error)]
pub enum ExprError {
  #[error("expression parse error: {0}")]
  Parse(String),
}

/// Evaluate an expression against a context of prior node outputs.
pub fn evaluate(expression: &str, context: &Value) -> Result<bool, ExprError> {
  let tokens = lex(expression)?;
  if tokens.is_empty() {
    return Err(ExprError::Parse("empty expression".to_string()));
  }

  let mut parser = Parser {
    tokens: &tokens,
    pos: 0,
    context,
  };
  let value = parser.or_expr()?;
  if parser.pos != tokens.len() {
    return Err(ExprError::Parse(format!(
      "unexpected trailing token: {:?}",
      tokens[parser.pos]
    )));
  }
  Ok(value.truthy())
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
  Path(String),
  Str(String),
  Num(f64),
  Bool(bool),
  Null,
  Eq,
  Ne,
  Gt,
  Lt,
  Ge,
  Le,
  And,
  Or,
  Not,
}

fn lex(input: &str) -> Result<Vec<Token>, ExprError> {
  let chars: Vec<char> = input.chars().collect();
  let mut tokens = Vec::new();
  let mut i = 0;

  while i < chars.len() {
    let c = chars[i];
    let next = chars.get(i + 1).copied();
    match c {
      c if c.is_whitespace() => i += 1,
      '=' if next == Some('=') => {
        tokens.push(Token::Eq);
        i += 2;
      }
      '!' if next == Some('=') => {
        tokens.push(Token::Ne);
        i += 2;
      }
      '!' => {
        tokens.push(Token::Not);
        i += 1;
      }
      '>' | '<' => {
        let ge = next == Some('=');
        tokens.push(match (c, ge) {
          ('>', true) => Token::Ge,
          ('>', false) => Token::Gt,
          ('<', true) => Token::Le,
          _ => Token::Lt,
        });
        i += if ge { 2 } else { 1 };
      }
      '&' if next == Some('&') => {
        tokens.push(Token::And);
        i += 2;
      }
      '|' if next == Some('|') => {
        tokens.push(Token::Or);
        i += 2;
      }
      '"' | '\'' => {
        let quote = c;
        i += 1;
        let start = i;
        while i < chars.len() && chars[i] != quote {
          i += 1;
        }
        if i == chars.len() {
          return Err(ExprError::Parse("unterminated string literal".to_string()));
        }
        tokens.push(Token::Str(chars[start..i].iter().collect()));
        i += 1;
      }
      c if c.is_ascii_digit() || (c == '-' && next.is_some_and(|n| n.is_ascii_digit())) => {
        let start = i;
        i += 1;
        while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
          i += 1;
        }
        let text: String = chars[start..i].iter().collect();
        let num = text
          .parse::<f64>()
          .map_err(|_| ExprError::Parse(format!("invalid number: {text}")))?;
        tokens.push(Token::Num(num));
      }
      c if c.is_ascii_alphabetic() || c == '_' => {
        let start = i;
        while i < chars.len()
          && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.')
        {
          i += 1;
        }
        let word: String = chars[start..i].iter().collect();
        tokens.push(match word.as_str() {
          "true" => Token::Bool(true),
          "false" => Token::Bool(false),
          "null" => Token::Null,
          _ => Token::Path(word),
        });
      }
      other => {
        return Err(ExprError::Parse(format!("unexpected character: {other}")));
      }
    }
  }

  Ok(tokens)
}

/// A resolved operand: either a literal from the expression or a value
/// pulled out of the context.
#[derive(Debug, Clone)]
enum Operand {
  Bool(bool),
  Num(f64),
  Str(String),
  Null,
  Json(Value),
}

impl Operand {
  fn truthy(&self) -> bool {
    match self {
      Self::Bool(b) => *b,
      Self::Num(n) => *n != 0.0,
      Self::Str(s) => !s.is_empty(),
      Self::Null => false,
      Self::Json(Value::Bool(b)) => *b,
      Self::Json(Value::Null) => false,
      Self::Json(_) => true,
    }
  }

  fn as_num(&self) -> Option<f64> {
    match self {
      Self::Num(n) => Some(*n),
      Self::Json(Value::Number(n)) => n.as_f64(),
      _ => None,
    }
  }

  fn as_str(&self) -> Option<&str> {
    match self {
      Self::Str(s) => Some(s),
      Self::Json(Value::String(s)) => Some(s),
      _ => None,
    }
  }

  fn is_null(&self) -> bool {
    matches!(self, Self::Null | Self::Json(Value::Null))
  }
}

/// Recursive descent over the token stream.
/// Precedence, tightest first: `!`, comparison, `&&`, `||`.
struct Parser<'a> {
  tokens: &'a [Token],
  pos: usize,
  context: &'a Value,
}

impl Parser<'_> {
  fn or_expr(&mut self) -> Result<Operand, ExprError> {
    let mut left = self.and_expr()?;
    while self.eat(&Token::Or) {
      let right = self.and_expr()?;
      left = Operand::Bool(left.truthy() || right.truthy());
    }
    Ok(left)
  }

  fn and_expr(&mut self) -> Result<Operand, ExprError> {
    let mut left = self.not_expr()?;
    while self.eat(&Token::And) {
      let right = self.not_expr()?;
      left = Operand::Bool(left.truthy() && right.truthy());
    }
    Ok(left)
  }

  fn not_expr(&mut self) -> Result<Operand, ExprError> {
    if self.eat(&Token::Not) {
      let value = self.not_expr()?;
      return Ok(Operand::Bool(!value.truthy()));
    }
    self.comparison()
  }

  fn comparison(&mut self) -> Result<Operand, ExprError> {
    let left = self.operand()?;
    let op = match self.tokens.get(self.pos) {
      Some(Token::Eq) => Cmp::Eq,
      Some(Token::Ne) => Cmp::Ne,
      Some(Token::Gt) => Cmp::Gt,
      Some(Token::Lt) => Cmp::Lt,
      Some(Token::Ge) => Cmp::Ge,
      Some(Token::Le) => Cmp::Le,
      _ => return Ok(left),
    };
    self.pos += 1;
    let right = self.operand()?;
    Ok(Operand::Bool(compare(&left, &right, op)))
  }

  fn operand(&mut self) -> Result<Operand, ExprError> {
    let token = self
      .tokens
      .get(self.pos)
      .ok_or_else(|| ExprError::Parse("unexpected end of expression".to_string()))?;
    self.pos += 1;
    match token {
      Token::Str(s) => Ok(Operand::Str(s.clone())),
      Token::Num(n) => Ok(Operand::Num(*n)),
      Token::Bool(b) => Ok(Operand::Bool(*b)),
      Token::Null => Ok(Operand::Null),
      Token::Path(path) => Ok(self.resolve(path)),
      other => Err(ExprError::Parse(format!("expected value, got {other:?}"))),
    }
  }

  fn eat(&mut self, token: &Token) -> bool {
    if self.tokens.get(self.pos) == Some(token) {
      self.pos += 1;
      true
    } else {
      false
    }
  }

  fn resolve(&self, path: &str) -> Operand {
    let mut current = self.context;
    for segment in path.split('.') {
      match current.get(segment) {
        Some(v) => current = v,
        None => return Operand::Null,
      }
    }
    match current {
      Value::Null => Operand::Null,
      Value::Bool(b) => Operand::Bool(*b),
      Value::Number(n) => Operand::Num(n.as_f64().unwrap_or(0.0)),
      Value::String(s) => Operand::Str(s.clone()),
      other => Operand::Json(other.clone()),
    }
  }
}

enum Cmp {
  Eq,
  Ne,
  Gt,
  Lt,
  Ge,
  Le,
}

fn compare(left: &Operand, right: &Operand, op: Cmp) -> bool {
  if left.is_null() || right.is_null() {
    let both = left.is_null() && right.is_null();
    return match op {
      Cmp::Eq => both,
      Cmp::Ne => !both,
      _ => false,
    };
  }

  if let (Some(l), Some(r)) = (left.as_num(), right.as_num()) {
    return match op {
      Cmp::Eq => (l - r).abs() < f64::EPSILON,
      Cmp::Ne => (l - r).abs() >= f64::EPSILON,
      Cmp::Gt => l > r,
      Cmp::Lt => l < r,
      Cmp::Ge => l >= r,
      Cmp::Le => l <= r,
    };
  }

  if let (Some(l), Some(r)) = (left.as_str(), right.as_str()) {
    return match op {
      Cmp::Eq => l == r,
      Cmp::Ne => l != r,
      Cmp::Gt => l > r,
      Cmp::Lt => l < r,
      Cmp::Ge => l >= r,
      Cmp::Le => l <= r,
    };
  }

  if let (Operand::Bool(l), Operand::Bool(r)) = (left, right) {
    return match op {
      Cmp::Eq => l == r,
      Cmp::Ne => l != r,
      _ => false,
    };
  }

  // Mismatched types never compare equal or ordered.
  false
}
