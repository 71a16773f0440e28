// src/expression/interpreter.rs
use serde_json::Value as Json;
use std::borrow::Cow;
use std::cmp::Ordering;

use super::ExpressionError;
use super::parser::{BinaryOp, Expr, Literal, Stmt, UnaryOp};
use super::value::Value;

/// Name the parsed response is bound to inside the body.
pub const RESPONSE_BINDING: &str = "response";

/// Total bytes of string data one run may allocate through concatenation,
/// string methods and copies of built strings.
pub const MAX_STRING_BYTES: usize = 4 * 1024 * 1024;

enum Flow<'a> {
    Next,
    Return(Value<'a>),
}

/// Runs a parsed body against one response.
pub fn run<'a>(body: &[Stmt], response: &'a Json) -> Result<Value<'a>, ExpressionError> {
    let mut scope = Scope {
        bindings: vec![(RESPONSE_BINDING.to_string(), Value::from_json(response))],
        string_budget: MAX_STRING_BYTES,
    };
    match scope.block(body)? {
        Flow::Return(value) => Ok(value),
        Flow::Next => Ok(Value::Undefined),
    }
}

struct Scope<'a> {
    /// Innermost binding last; block exit truncates back.
    bindings: Vec<(String, Value<'a>)>,
    string_budget: usize,
}

impl<'a> Scope<'a> {
    fn block(&mut self, body: &[Stmt]) -> Result<Flow<'a>, ExpressionError> {
        let mark = self.bindings.len();
        let mut flow = Flow::Next;
        for stmt in body {
            flow = self.statement(stmt)?;
            if matches!(flow, Flow::Return(_)) {
                break;
            }
        }
        self.bindings.truncate(mark);
        Ok(flow)
    }

    fn statement(&mut self, stmt: &Stmt) -> Result<Flow<'a>, ExpressionError> {
        match stmt {
            Stmt::Return(None) => Ok(Flow::Return(Value::Undefined)),
            Stmt::Return(Some(expr)) => Ok(Flow::Return(self.eval(expr)?)),
            Stmt::Declare { name, init } => {
                let value = self.eval(init)?;
                self.bindings.push((name.clone(), value));
                Ok(Flow::Next)
            }
            Stmt::If { condition, then, otherwise } => {
                if self.eval(condition)?.truthy() {
                    self.branch(then)
                } else if let Some(otherwise) = otherwise {
                    self.branch(otherwise)
                } else {
                    Ok(Flow::Next)
                }
            }
            Stmt::Block(body) => self.block(body),
            Stmt::Expr(expr) => {
                self.eval(expr)?;
                Ok(Flow::Next)
            }
            Stmt::Empty => Ok(Flow::Next),
        }
    }

    /// A single-statement branch still gets its own scope.
    fn branch(&mut self, stmt: &Stmt) -> Result<Flow<'a>, ExpressionError> {
        self.block(std::slice::from_ref(stmt))
    }

    fn charge_bytes(&mut self, bytes: usize) -> Result<(), ExpressionError> {
        self.string_budget = self.string_budget.checked_sub(bytes).ok_or_else(|| {
            runtime(format!("string results exceed the {} byte limit", MAX_STRING_BYTES))
        })?;
        Ok(())
    }

    /// Counts an allocated string against the run's budget.
    fn charge(&mut self, value: &Value<'a>) -> Result<(), ExpressionError> {
        match value {
            Value::Str(Cow::Owned(built)) => self.charge_bytes(built.len()),
            _ => Ok(()),
        }
    }

    fn lookup(&self, name: &str) -> Option<&Value<'a>> {
        self.bindings
            .iter()
            .rev()
            .find(|(bound, _)| bound == name)
            .map(|(_, value)| value)
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value<'a>, ExpressionError> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                Literal::Number(n) => Value::Number(*n),
                Literal::Str(s) => Value::Str(Cow::Owned(s.clone())),
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Null => Value::Null,
                Literal::Undefined => Value::Undefined,
            }),
            Expr::Ident(name) => {
                let value = self
                    .lookup(name)
                    .cloned()
                    .ok_or_else(|| runtime(format!("{} is not defined", name)))?;
                self.charge(&value)?;
                Ok(value)
            }
            Expr::Member { .. } | Expr::Index { .. } | Expr::MethodCall { .. } => {
                Ok(self.chain(expr)?.unwrap_or(Value::Undefined))
            }
            Expr::Unary(UnaryOp::TypeOf, operand) => {
                if let Expr::Ident(name) = operand.as_ref() {
                    if self.lookup(name).is_none() {
                        return Ok(Value::Str(Cow::Borrowed("undefined")));
                    }
                }
                let value = self.eval(operand)?;
                Ok(Value::Str(Cow::Borrowed(value.type_of())))
            }
            Expr::Unary(op, operand) => {
                let value = self.eval(operand)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.truthy()),
                    UnaryOp::Neg => Value::Number(-value.to_number()),
                    UnaryOp::Plus | UnaryOp::TypeOf => Value::Number(value.to_number()),
                })
            }
            Expr::Binary(op, left, right) => self.binary(*op, left, right),
            Expr::Conditional { condition, then, otherwise } => {
                if self.eval(condition)?.truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
        }
    }

    /// Evaluates a member/index/call chain. `None` means an optional link
    /// short-circuited, which makes the rest of the chain undefined too.
    fn chain(&mut self, expr: &Expr) -> Result<Option<Value<'a>>, ExpressionError> {
        let (object, optional) = match expr {
            Expr::Member { object, optional, .. }
            | Expr::Index { object, optional, .. }
            | Expr::MethodCall { object, optional, .. } => (object, *optional),
            other => return self.eval(other).map(Some),
        };

        let Some(target) = self.chain(object)? else {
            return Ok(None);
        };
        if optional && target.is_nullish() {
            return Ok(None);
        }

        let value = match expr {
            Expr::Member { property, .. } => get_property(&target, property)?,
            Expr::Index { index, .. } => {
                let key = property_key(&self.eval(index)?);
                get_property(&target, &key)?
            }
            Expr::MethodCall { method, args, .. } => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                let result = call_method(&target, method, &args)?;
                self.charge(&result)?;
                result
            }
            _ => unreachable!("chain() only recurses on member, index and call nodes"),
        };
        Ok(Some(value))
    }

    fn binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> Result<Value<'a>, ExpressionError> {
        let lhs = self.eval(left)?;
        match op {
            BinaryOp::And => return if lhs.truthy() { self.eval(right) } else { Ok(lhs) },
            BinaryOp::Or => return if lhs.truthy() { Ok(lhs) } else { self.eval(right) },
            BinaryOp::Nullish => return if lhs.is_nullish() { self.eval(right) } else { Ok(lhs) },
            _ => {}
        }

        let rhs = self.eval(right)?;
        let value = match op {
            BinaryOp::Add => {
                let (l, r) = (lhs.to_primitive(), rhs.to_primitive());
                if matches!(l, Value::Str(_)) || matches!(r, Value::Str(_)) {
                    let (mut joined, r) = (l.to_display(), r.to_display());
                    self.charge_bytes(joined.len() + r.len())?;
                    joined.push_str(&r);
                    Value::Str(Cow::Owned(joined))
                } else {
                    Value::Number(l.to_number() + r.to_number())
                }
            }
            BinaryOp::Sub => Value::Number(lhs.to_number() - rhs.to_number()),
            BinaryOp::Mul => Value::Number(lhs.to_number() * rhs.to_number()),
            BinaryOp::Div => Value::Number(lhs.to_number() / rhs.to_number()),
            BinaryOp::Rem => Value::Number(lhs.to_number() % rhs.to_number()),
            BinaryOp::StrictEq => Value::Bool(lhs.strict_eq(&rhs)),
            BinaryOp::StrictNe => Value::Bool(!lhs.strict_eq(&rhs)),
            BinaryOp::LooseEq => Value::Bool(lhs.loose_eq(&rhs)),
            BinaryOp::LooseNe => Value::Bool(!lhs.loose_eq(&rhs)),
            BinaryOp::Lt => Value::Bool(lhs.compare(&rhs) == Some(Ordering::Less)),
            BinaryOp::Le => Value::Bool(matches!(lhs.compare(&rhs), Some(Ordering::Less | Ordering::Equal))),
            BinaryOp::Gt => Value::Bool(lhs.compare(&rhs) == Some(Ordering::Greater)),
            BinaryOp::Ge => Value::Bool(matches!(lhs.compare(&rhs), Some(Ordering::Greater | Ordering::Equal))),
            BinaryOp::And | BinaryOp::Or | BinaryOp::Nullish => unreachable!("short-circuit operators return early"),
        };
        Ok(value)
    }
}

fn runtime(message: impl Into<String>) -> ExpressionError {
    ExpressionError::Runtime(message.into())
}

/// Integral numbers index arrays; everything else is stringified.
fn property_key(value: &Value<'_>) -> String {
    match value {
        // Zero, including -0, falls through to "0".
        Value::Number(n) if n.fract() == 0.0 && *n > 0.0 => format!("{:.0}", n),
        other => other.to_display(),
    }
}

fn array_index(key: &str) -> Option<usize> {
    let index: usize = key.parse().ok()?;
    // "01" and "+1" are plain keys, not indices.
    (index.to_string() == key).then_some(index)
}

fn get_property<'a>(target: &Value<'a>, key: &str) -> Result<Value<'a>, ExpressionError> {
    let value = match target {
        Value::Undefined | Value::Null => {
            return Err(runtime(format!(
                "cannot read properties of {} (reading '{}')",
                target.to_display(),
                key
            )));
        }
        Value::Object(map) => map.get(key).map(Value::from_json).unwrap_or(Value::Undefined),
        Value::Array(items) => {
            if key == "length" {
                Value::Number(items.len() as f64)
            } else {
                array_index(key)
                    .and_then(|index| items.get(index))
                    .map(Value::from_json)
                    .unwrap_or(Value::Undefined)
            }
        }
        Value::Str(s) => {
            if key == "length" {
                Value::Number(s.encode_utf16().count() as f64)
            } else {
                array_index(key)
                    .and_then(|index| s.encode_utf16().nth(index))
                    .map(|unit| Value::Str(Cow::Owned(String::from_utf16_lossy(&[unit]))))
                    .unwrap_or(Value::Undefined)
            }
        }
        Value::Bool(_) | Value::Number(_) => Value::Undefined,
    };
    Ok(value)
}

fn call_method<'a>(target: &Value<'a>, method: &str, args: &[Value<'a>]) -> Result<Value<'a>, ExpressionError> {
    let first = args.first().cloned().unwrap_or(Value::Undefined);
    match (target, method) {
        (Value::Str(s), "includes") => Ok(Value::Bool(s.contains(first.to_display().as_str()))),
        (Value::Str(s), "startsWith") => Ok(Value::Bool(s.starts_with(first.to_display().as_str()))),
        (Value::Str(s), "endsWith") => Ok(Value::Bool(s.ends_with(first.to_display().as_str()))),
        (Value::Str(s), "toLowerCase") => Ok(Value::Str(Cow::Owned(s.to_lowercase()))),
        (Value::Str(s), "toUpperCase") => Ok(Value::Str(Cow::Owned(s.to_uppercase()))),
        (Value::Str(s), "trim") => Ok(Value::Str(Cow::Owned(s.trim().to_string()))),
        (Value::Array(items), "includes") => Ok(Value::Bool(items.iter().any(|item| {
            let item = Value::from_json(item);
            // SameValueZero: NaN finds NaN.
            item.strict_eq(&first) || (is_nan(&item) && is_nan(&first))
        }))),
        (Value::Array(items), "indexOf") => {
            let position = items
                .iter()
                .position(|item| Value::from_json(item).strict_eq(&first))
                .map(|p| p as f64)
                .unwrap_or(-1.0);
            Ok(Value::Number(position))
        }
        (Value::Undefined | Value::Null, _) => Err(runtime(format!(
            "cannot read properties of {} (reading '{}')",
            target.to_display(),
            method
        ))),
        _ => Err(runtime(format!("{}.{} is not a function", target.type_of(), method))),
    }
}

fn is_nan(value: &Value<'_>) -> bool {
    matches!(value, Value::Number(n) if n.is_nan())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::parser::parse;
    use serde_json::json;

    fn eval(source: &str, response: &Json) -> Result<Option<Json>, ExpressionError> {
        let body = parse(source)?;
        run(&body, response).map(|value| value.to_json())
    }

    #[test]
    fn test_campaign_style_rule() {
        let source = "return response.status === true && response.data === 1 ? 1 : 0;";
        assert_eq!(eval(source, &json!({"status": true, "data": 1})), Ok(Some(json!(1))));
        assert_eq!(eval(source, &json!({"status": false, "data": 1})), Ok(Some(json!(0))));
        assert_eq!(eval(source, &json!({"status": true, "data": "1"})), Ok(Some(json!(0))));
    }

    #[test]
    fn test_if_statements_and_locals() {
        let source = r#"
            const claimed = response.result.claimed;
            if (claimed >= 3) {
                const bonus = 1
                return bonus
            }
            return 0
        "#;
        assert_eq!(eval(source, &json!({"result": {"claimed": 5}})), Ok(Some(json!(1))));
        assert_eq!(eval(source, &json!({"result": {"claimed": 2}})), Ok(Some(json!(0))));
    }

    #[test]
    fn test_block_scoped_bindings_do_not_leak() {
        let source = "if (true) { const inner = 1; } return inner;";
        assert_eq!(
            eval(source, &json!({})),
            Err(ExpressionError::Runtime("inner is not defined".to_string()))
        );
    }

    #[test]
    fn test_reading_through_undefined_fails() {
        assert_eq!(
            eval("return response.nonexistent.field;", &json!({"ok": true})),
            Err(ExpressionError::Runtime(
                "cannot read properties of undefined (reading 'field')".to_string()
            ))
        );
        assert_eq!(eval("return response.nonexistent;", &json!({})), Ok(None));
    }

    #[test]
    fn test_optional_chaining_short_circuits() {
        assert_eq!(eval("return response.a?.b.c;", &json!({})), Ok(None));
        assert_eq!(eval("return response.a?.b ?? 7;", &json!({})), Ok(Some(json!(7))));
        assert_eq!(eval("return response.a?.[0];", &json!({"a": [9]})), Ok(Some(json!(9))));
    }

    #[test]
    fn test_arrays_strings_and_methods() {
        let response = json!({
            "wallets": ["0xabc", "0xdef"],
            "name": "Bandit",
            "items": [1, 2, 3]
        });
        assert_eq!(eval("return response.wallets.includes('0xdef') ? 1 : 0", &response), Ok(Some(json!(1))));
        assert_eq!(eval("return response.wallets.indexOf('0xzzz')", &response), Ok(Some(json!(-1))));
        assert_eq!(eval("return response.items.length", &response), Ok(Some(json!(3))));
        assert_eq!(eval("return response.items[1] + response.items['2']", &response), Ok(Some(json!(5))));
        assert_eq!(eval("return response.name.toLowerCase().startsWith('ban')", &response), Ok(Some(json!(true))));
        assert_eq!(eval("return response.name[0] + response.name.length", &response), Ok(Some(json!("B6"))));
        assert!(matches!(
            eval("return response.items.map(1)", &response),
            Err(ExpressionError::Runtime(message)) if message == "object.map is not a function"
        ));
    }

    #[test]
    fn test_string_growth_is_capped() {
        let mut source = String::from("const a0 = 'xxxxxxxxxxxxxxxx';\n");
        for i in 1..=40 {
            source.push_str(&format!("const a{} = a{} + a{};\n", i, i - 1, i - 1));
        }
        source.push_str("return a40.length;");
        assert!(source.len() < crate::expression::DEFAULT_MAX_SOURCE_LEN);

        assert!(matches!(
            eval(&source, &json!({})),
            Err(ExpressionError::Runtime(message)) if message.contains("byte limit")
        ));
        assert_eq!(crate::expression::verdict(&source, &json!({})), 0);

        let copies = format!("const a = 'x' + '{}'; {} return 1;", "y".repeat(1000), "const b = a; ".repeat(200));
        assert!(copies.len() < crate::expression::DEFAULT_MAX_SOURCE_LEN);
        assert!(eval(&copies, &json!({})).is_ok());

        assert_eq!(eval("const a = 'ab' + 'cd'; return (a + a).length", &json!({})), Ok(Some(json!(8))));
    }

    #[test]
    fn test_negative_zero_index_reads_first_item() {
        let response = json!({"items": ["first", "second"], "name": "ab"});
        assert_eq!(eval("return response.items[-0]", &response), Ok(Some(json!("first"))));
        assert_eq!(eval("return response.name[-0] + response.name[1]", &response), Ok(Some(json!("ab"))));
        assert_eq!(eval("return response.items[0x1]", &response), Ok(Some(json!("second"))));
    }

    #[test]
    fn test_operators() {
        let response = json!({"n": "4", "m": 3});
        assert_eq!(eval("return response.n * response.m", &response), Ok(Some(json!(12))));
        assert_eq!(eval("return response.n + response.m", &response), Ok(Some(json!("43"))));
        assert_eq!(eval("return response.n == 4 && response.n !== 4", &response), Ok(Some(json!(true))));
        assert_eq!(eval("return -response.m % 2", &response), Ok(Some(json!(-1))));
        assert_eq!(eval("return 1 / 0 > 1e300", &response), Ok(Some(json!(true))));
        assert_eq!(eval("return 7 / 2", &response), Ok(Some(json!(3.5))));
        assert_eq!(eval("return typeof response.m + typeof missing", &response), Ok(Some(json!("numberundefined"))));
        assert_eq!(eval("return response.missing || 'fallback'", &response), Ok(Some(json!("fallback"))));
        assert_eq!(eval("return !response.m", &response), Ok(Some(json!(false))));
    }

    #[test]
    fn test_falling_off_the_end_returns_undefined() {
        assert_eq!(eval("response.ok;", &json!({"ok": true})), Ok(None));
        assert_eq!(eval("", &json!({})), Ok(None));
        assert_eq!(eval("return;", &json!({})), Ok(None));
    }

    #[test]
    fn test_returning_structures_copies_them() {
        assert_eq!(
            eval("return response.data", &json!({"data": {"x": [1, 2]}})),
            Ok(Some(json!({"x": [1, 2]})))
        );
    }
}
