//! Constant table and `$...$` expression evaluation.
//!
//! Expressions are evaluated while they are scanned. Operands are pushed on a
//! small stack; `+` either folds the two topmost operands (`$a 5 +$`) or, with
//! a single pending operand, reads the next one and adds it (`$a + 5$`).
//! Both forms accumulate strictly left to right.

use indexmap::IndexMap;
use phf::phf_map;
use tracing::trace;

use crate::error::{ConstantErrorKind, ParseError, SyntaxErrorCode};
use crate::parser::{Parser, EXPR_DELIM};
use crate::scanner::is_ident_start;
use crate::span::Location;
use crate::value::Value;

/// Nullary builtins recognized inside expressions, by literal token.
///
/// A builtin discards whatever the expression accumulated so far.
static BUILTINS: phf::Map<&'static str, i64> = phf_map! {
    "рок()" => 42,
};

const PLUS: char = '+';

/// Named constants bound by `define` statements.
///
/// Lives for a single parse; later definitions overwrite earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Constants {
    entries: IndexMap<String, Value>,
}

impl Constants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `value`, silently replacing an existing binding.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.entries.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<'a> Parser<'a> {
    /// Read and evaluate `$ ... $`. The cursor must be on the opening `$`.
    pub(crate) fn read_expression(&mut self) -> Result<Value, ParseError> {
        let open = self.scanner.location();
        self.scanner.bump();

        let mut operands: Vec<Value> = Vec::new();
        loop {
            self.scanner.skip_trivia()?;
            let Some(ch) = self.scanner.peek() else {
                return Err(self.scanner.error(SyntaxErrorCode::UnclosedExpression));
            };

            if ch == EXPR_DELIM {
                break;
            }

            if ch == PLUS {
                let at = self.scanner.location();
                self.scanner.bump();
                let sum = match (operands.pop(), operands.pop()) {
                    (Some(right), Some(left)) => add(left, right, at)?,
                    (Some(left), None) => {
                        self.scanner.skip_trivia()?;
                        // A builtin replaces the sum here too, as in `$a 1 + рок()$`.
                        match self.eat_builtin() {
                            Some(value) => value,
                            None => {
                                let right = self.read_operand()?;
                                add(left, right, at)?
                            }
                        }
                    }
                    _ => return Err(ParseError::syntax(SyntaxErrorCode::MissingOperand, at)),
                };
                operands.push(sum);
                continue;
            }

            if let Some(value) = self.eat_builtin() {
                operands.clear();
                operands.push(value);
                continue;
            }

            let operand = self.read_operand()?;
            operands.push(operand);
        }

        let result = match operands.len() {
            0 => Err(ParseError::syntax(SyntaxErrorCode::EmptyExpression, open)),
            1 => Ok(operands.remove(0)),
            _ => Err(self.scanner.error(SyntaxErrorCode::DanglingOperands)),
        };
        self.scanner.bump();
        result
    }

    /// An integer literal or a reference to a defined constant.
    fn read_operand(&mut self) -> Result<Value, ParseError> {
        match self.scanner.peek() {
            Some(c) if c.is_ascii_digit() => self.read_integer(),
            Some(c) if is_ident_start(c) => {
                let at = self.scanner.location();
                let name = self
                    .scanner
                    .scan_identifier()
                    .ok_or_else(|| self.scanner.error(SyntaxErrorCode::ExpectedIdentifier))?;
                self.resolve(name, at)
            }
            Some(c) => Err(self.scanner.error(SyntaxErrorCode::UnknownOperator(c))),
            None => Err(self.scanner.error(SyntaxErrorCode::UnclosedExpression)),
        }
    }

    fn resolve(&self, name: &str, at: Location) -> Result<Value, ParseError> {
        match self.constants.get(name) {
            Some(value) => {
                trace!(name, "resolved constant");
                Ok(value.clone())
            }
            None => Err(ParseError::constant(
                ConstantErrorKind::Undefined(name.to_owned()),
                at,
            )),
        }
    }

    fn eat_builtin(&mut self) -> Option<Value> {
        let (token, value) = BUILTINS
            .entries()
            .find(|(token, _)| self.scanner.starts_with(token))?;
        self.scanner.eat_str(token);
        trace!(builtin = *token, "applied builtin");
        Some(Value::Integer(*value))
    }
}

fn add(left: Value, right: Value, at: Location) -> Result<Value, ParseError> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => a
            .checked_add(b)
            .map(Value::Integer)
            .ok_or_else(|| ParseError::constant(ConstantErrorKind::Overflow, at)),
        (Value::String(mut a), Value::String(b)) => {
            a.push_str(&b);
            Ok(Value::String(a))
        }
        (left, right) => Err(ParseError::constant(
            ConstantErrorKind::TypeMismatch {
                left: left.type_name(),
                right: right.type_name(),
            },
            at,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(defines: &str, expr: &str) -> Result<Value, ParseError> {
        let src = format!("{}\n(v: {};)", defines, expr);
        let mut parser = Parser::new(&src);
        parser.parse().map(|doc| doc.get("v").cloned().unwrap())
    }

    #[test]
    fn test_constants_define_overwrites() {
        let mut c = Constants::new();
        c.define("a", Value::Integer(1));
        c.define("a", Value::Integer(2));
        assert_eq!(c.len(), 1);
        assert_eq!(c.get("a"), Some(&Value::Integer(2)));
        assert_eq!(c.get("b"), None);
    }

    #[test]
    fn test_single_constant() {
        assert_eq!(eval("define base_value 10", "$base_value$"), Ok(Value::Integer(10)));
    }

    #[test]
    fn test_postfix_addition() {
        assert_eq!(eval("define base 10", "$base 5 +$"), Ok(Value::Integer(15)));
    }

    #[test]
    fn test_chained_postfix_addition() {
        assert_eq!(
            eval("define a 5\ndefine b 10", "$a b + 3 +$"),
            Ok(Value::Integer(18))
        );
    }

    #[test]
    fn test_infix_addition() {
        assert_eq!(eval("define base 10", "$base + 5$"), Ok(Value::Integer(15)));
        assert_eq!(eval("", "$ 1 + 2 + 3 $"), Ok(Value::Integer(6)));
    }

    #[test]
    fn test_builtin_resets_accumulator() {
        assert_eq!(eval("", "$рок()$"), Ok(Value::Integer(42)));
        assert_eq!(eval("define a 5", "$a 1 + рок()$"), Ok(Value::Integer(42)));
        assert_eq!(eval("", "$рок() 1 +$"), Ok(Value::Integer(43)));
    }

    #[test]
    fn test_builtin_after_infix_plus() {
        assert_eq!(eval("", "$1 + рок()$"), Ok(Value::Integer(42)));
        assert_eq!(eval("define a 5", "$a + рок()$"), Ok(Value::Integer(42)));
        assert_eq!(eval("", "$1 + рок() + 1$"), Ok(Value::Integer(43)));
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(
            eval("define host q(local) define suffix q(host)", "$host suffix +$"),
            Ok(Value::from("localhost"))
        );
    }

    #[test]
    fn test_mapping_constant_is_copied() {
        let value = eval("define db (port: 5432;)", "$db$").unwrap();
        assert_eq!(value.as_mapping().unwrap().get("port"), Some(&Value::Integer(5432)));
    }

    #[test]
    fn test_undefined_constant() {
        let err = eval("", "$unknown$").unwrap_err();
        assert_eq!(
            err,
            ParseError::constant(
                ConstantErrorKind::Undefined("unknown".into()),
                Location::new(2, 6)
            )
        );
    }

    #[test]
    fn test_type_mismatch() {
        let err = eval("define s q(x)", "$s 1 +$").unwrap_err();
        assert!(matches!(
            err,
            ParseError::Constant { kind: ConstantErrorKind::TypeMismatch { left: "string", right: "integer" }, .. }
        ));
    }

    #[test]
    fn test_overflow() {
        let err = eval("define big 9223372036854775807", "$big 1 +$").unwrap_err();
        assert!(matches!(err, ParseError::Constant { kind: ConstantErrorKind::Overflow, .. }));
    }

    #[test]
    fn test_syntax_errors() {
        let code = |expr: &str| match eval("define a 1", expr) {
            Err(ParseError::Syntax { code, .. }) => Some(code),
            _ => None,
        };
        assert_eq!(code("$$"), Some(SyntaxErrorCode::EmptyExpression));
        assert_eq!(code("$+ 1$"), Some(SyntaxErrorCode::MissingOperand));
        assert_eq!(code("$a 1$"), Some(SyntaxErrorCode::DanglingOperands));
        assert_eq!(code("$a * 2$"), Some(SyntaxErrorCode::UnknownOperator('*')));
        assert_eq!(code("$a + $"), Some(SyntaxErrorCode::UnknownOperator('$')));
    }

    #[test]
    fn test_unclosed_expression() {
        let mut parser = Parser::new("(v: $1 + 2");
        let err = parser.parse().unwrap_err();
        assert!(matches!(
            err,
            ParseError::Syntax { code: SyntaxErrorCode::UnclosedExpression, .. }
        ));
    }

    #[test]
    fn test_comments_inside_expression() {
        assert_eq!(eval("", "$1 /# one #/ 2 + // two\n$"), Ok(Value::Integer(3)));
    }
}
