//! Tree-walking evaluator.
//!
//! Numeric operands coerce int→float when mixed; `+` also concatenates
//! strings and lists. `&&`/`||` short-circuit on truthiness. Errors are a
//! distinct result kind, never conflated with typed null, so `has()` keeps
//! its meaning.

use crate::ast::{BinOp, Expr, Literal, UnaryOp};
use crate::error::ExprError;
use crate::scope::Scope;
use chrono::{DateTime, Duration, Utc};
use hudl_schema::Value;
use regex::Regex;

/// The result of evaluating one expression. `pre_escaped` is set when the
/// expression was a top-level `raw(...)` call; the interpreter inserts such
/// values verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluated {
    pub value: Value,
    pub pre_escaped: bool,
}

/// Evaluate an expression against a scope.
pub fn evaluate(expr: &Expr, scope: &Scope) -> Result<Evaluated, ExprError> {
    if let Expr::Call(name, args) = expr {
        if name == "raw" {
            if args.len() != 1 {
                return Err(ExprError::eval("raw() takes exactly one argument"));
            }
            let value = eval(&args[0], scope)?;
            return Ok(Evaluated {
                value,
                pre_escaped: true,
            });
        }
    }
    Ok(Evaluated {
        value: eval(expr, scope)?,
        pre_escaped: false,
    })
}

fn eval(expr: &Expr, scope: &Scope) -> Result<Value, ExprError> {
    match expr {
        Expr::Literal(lit) => Ok(literal(lit)),
        Expr::Ident(name) => scope
            .lookup(name)
            .cloned()
            .ok_or_else(|| ExprError::eval(format!("unknown variable '{name}'"))),
        Expr::Field(receiver, name) => {
            let value = eval(receiver, scope)?;
            match &value {
                Value::Message(_) | Value::Map(_) => {
                    // Dynamic maps degrade to null on a missing key;
                    // messages always carry all schema fields.
                    Ok(value.field(name).cloned().unwrap_or(Value::Null))
                }
                Value::Null => Ok(Value::Null),
                other => Err(ExprError::eval(format!(
                    "cannot access field '{name}' on {}",
                    other.type_name()
                ))),
            }
        }
        Expr::Index(receiver, index) => {
            let value = eval(receiver, scope)?;
            let key = eval(index, scope)?;
            match (&value, &key) {
                (Value::List(items), Value::Int(i)) => {
                    let i = *i;
                    if i < 0 || i as usize >= items.len() {
                        Err(ExprError::eval(format!(
                            "index {i} out of bounds for list of {}",
                            items.len()
                        )))
                    } else {
                        Ok(items[i as usize].clone())
                    }
                }
                (Value::Map(map), Value::String(k)) => {
                    Ok(map.get(k).cloned().unwrap_or(Value::Null))
                }
                (Value::Message(msg), Value::String(k)) => {
                    Ok(msg.get(k).cloned().unwrap_or(Value::Null))
                }
                (Value::String(s), Value::Int(i)) => {
                    let i = *i;
                    s.chars()
                        .nth(i.max(0) as usize)
                        .map(|c| Value::String(c.to_string()))
                        .ok_or_else(|| ExprError::eval(format!("index {i} out of string bounds")))
                }
                (recv, key) => Err(ExprError::eval(format!(
                    "cannot index {} with {}",
                    recv.type_name(),
                    key.type_name()
                ))),
            }
        }
        Expr::Unary(op, inner) => {
            let value = eval(inner, scope)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                UnaryOp::Neg => match value {
                    Value::Int(i) => Ok(Value::Int(-i)),
                    Value::Float(f) => Ok(Value::Float(-f)),
                    other => Err(ExprError::eval(format!(
                        "cannot negate {}",
                        other.type_name()
                    ))),
                },
            }
        }
        Expr::Binary(left, op, right) => binary(left, *op, right, scope),
        Expr::Ternary(cond, then, otherwise) => {
            if eval(cond, scope)?.is_truthy() {
                eval(then, scope)
            } else {
                eval(otherwise, scope)
            }
        }
        Expr::Call(name, args) => call(name, args, scope),
        Expr::Method(receiver, name, args) => method(receiver, name, args, scope),
    }
}

fn literal(lit: &Literal) -> Value {
    match lit {
        Literal::Int(n) => Value::Int(*n),
        Literal::Float(f) => Value::Float(*f),
        Literal::String(s) => Value::String(s.clone()),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Null => Value::Null,
    }
}

fn binary(left: &Expr, op: BinOp, right: &Expr, scope: &Scope) -> Result<Value, ExprError> {
    // Short-circuit logic first.
    match op {
        BinOp::And => {
            let l = eval(left, scope)?;
            if !l.is_truthy() {
                return Ok(Value::Bool(false));
            }
            return Ok(Value::Bool(eval(right, scope)?.is_truthy()));
        }
        BinOp::Or => {
            let l = eval(left, scope)?;
            if l.is_truthy() {
                return Ok(Value::Bool(true));
            }
            return Ok(Value::Bool(eval(right, scope)?.is_truthy()));
        }
        _ => {}
    }

    let l = eval(left, scope)?;
    let r = eval(right, scope)?;

    match op {
        BinOp::Eq => Ok(Value::Bool(values_equal(&l, &r))),
        BinOp::Ne => Ok(Value::Bool(!values_equal(&l, &r))),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let ord = compare(&l, &r).ok_or_else(|| {
                ExprError::eval(format!(
                    "cannot compare {} with {}",
                    l.type_name(),
                    r.type_name()
                ))
            })?;
            Ok(Value::Bool(match op {
                BinOp::Lt => ord.is_lt(),
                BinOp::Le => ord.is_le(),
                BinOp::Gt => ord.is_gt(),
                _ => ord.is_ge(),
            }))
        }
        BinOp::In => match &r {
            Value::List(items) => Ok(Value::Bool(items.iter().any(|v| values_equal(v, &l)))),
            Value::Map(map) => match &l {
                Value::String(k) => Ok(Value::Bool(map.contains_key(k))),
                other => Err(ExprError::eval(format!(
                    "map membership needs a string key, got {}",
                    other.type_name()
                ))),
            },
            Value::String(s) => match &l {
                Value::String(needle) => Ok(Value::Bool(s.contains(needle.as_str()))),
                other => Err(ExprError::eval(format!(
                    "string membership needs a string, got {}",
                    other.type_name()
                ))),
            },
            other => Err(ExprError::eval(format!(
                "'in' needs a list, map, or string, got {}",
                other.type_name()
            ))),
        },
        BinOp::Add => add(&l, &r),
        BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => arithmetic(&l, op, &r),
        BinOp::And | BinOp::Or => unreachable!("handled above"),
    }
}

/// Equality with numeric coercion; enums compare against their symbol
/// (string) or number (int) as well as other enums.
pub fn values_equal(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
        (Value::Enum(e), Value::String(s)) | (Value::String(s), Value::Enum(e)) => e.symbol == *s,
        (Value::Enum(e), Value::Int(n)) | (Value::Int(n), Value::Enum(e)) => i64::from(e.number) == *n,
        _ => l == r,
    }
}

fn compare(l: &Value, r: &Value) -> Option<std::cmp::Ordering> {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
        (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        (Value::Duration(a), Value::Duration(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn add(l: &Value, r: &Value) -> Result<Value, ExprError> {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_add(*b)
            .map(Value::Int)
            .ok_or_else(|| ExprError::eval("integer overflow in addition")),
        (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{a}{b}"))),
        (Value::String(a), b) => Ok(Value::String(format!("{a}{}", b.to_display()))),
        (a, Value::String(b)) => Ok(Value::String(format!("{}{b}", a.to_display()))),
        (Value::List(a), Value::List(b)) => {
            let mut out = a.clone();
            out.extend(b.iter().cloned());
            Ok(Value::List(out))
        }
        (Value::Timestamp(t), Value::Duration(d)) | (Value::Duration(d), Value::Timestamp(t)) => {
            Ok(Value::Timestamp(*t + *d))
        }
        (Value::Duration(a), Value::Duration(b)) => Ok(Value::Duration(*a + *b)),
        _ => numeric(l, r, |a, b| a + b).map(Value::Float).or_else(|_| {
            Err(ExprError::eval(format!(
                "cannot add {} and {}",
                l.type_name(),
                r.type_name()
            )))
        }),
    }
}

fn arithmetic(l: &Value, op: BinOp, r: &Value) -> Result<Value, ExprError> {
    if let (Value::Int(a), Value::Int(b)) = (l, r) {
        let out = match op {
            BinOp::Sub => a.checked_sub(*b),
            BinOp::Mul => a.checked_mul(*b),
            BinOp::Div => {
                if *b == 0 {
                    return Err(ExprError::eval("division by zero"));
                }
                a.checked_div(*b)
            }
            BinOp::Rem => {
                if *b == 0 {
                    return Err(ExprError::eval("remainder by zero"));
                }
                a.checked_rem(*b)
            }
            _ => unreachable!(),
        };
        return out.map(Value::Int).ok_or_else(|| ExprError::eval("integer overflow"));
    }

    let (a, b) = float_pair(l, r).ok_or_else(|| {
        ExprError::eval(format!(
            "cannot apply '{}' to {} and {}",
            op.symbol(),
            l.type_name(),
            r.type_name()
        ))
    })?;
    let out = match op {
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => {
            if b == 0.0 {
                return Err(ExprError::eval("division by zero"));
            }
            a / b
        }
        BinOp::Rem => {
            if b == 0.0 {
                return Err(ExprError::eval("remainder by zero"));
            }
            a % b
        }
        _ => unreachable!(),
    };
    Ok(Value::Float(out))
}

fn numeric(l: &Value, r: &Value, f: impl Fn(f64, f64) -> f64) -> Result<f64, ()> {
    float_pair(l, r).map(|(a, b)| f(a, b)).ok_or(())
}

fn float_pair(l: &Value, r: &Value) -> Option<(f64, f64)> {
    let to_f = |v: &Value| match v {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    };
    Some((to_f(l)?, to_f(r)?))
}

fn call(name: &str, args: &[Expr], scope: &Scope) -> Result<Value, ExprError> {
    match name {
        "list" => {
            let mut items = Vec::with_capacity(args.len());
            for arg in args {
                items.push(eval(arg, scope)?);
            }
            Ok(Value::List(items))
        }
        "size" => {
            let value = eval(one_arg(name, args)?, scope)?;
            value
                .size()
                .map(|n| Value::Int(n as i64))
                .ok_or_else(|| {
                    ExprError::eval(format!("size() is undefined for {}", value.type_name()))
                })
        }
        "has" => {
            // Special form: the argument must be a field access, and the
            // answer is about presence, not value.
            let Some(Expr::Field(receiver, field)) = args.first() else {
                return Err(ExprError::eval("has() takes a field access like has(x.y)"));
            };
            if args.len() != 1 {
                return Err(ExprError::eval("has() takes exactly one argument"));
            }
            let value = eval(receiver, scope)?;
            Ok(Value::Bool(match &value {
                Value::Message(msg) => msg.is_set(field),
                Value::Map(map) => map.contains_key(field.as_str()),
                _ => false,
            }))
        }
        "type" => {
            let value = eval(one_arg(name, args)?, scope)?;
            Ok(Value::String(value.type_name().to_string()))
        }
        "int" => {
            let value = eval(one_arg(name, args)?, scope)?;
            match &value {
                Value::Int(i) => Ok(Value::Int(*i)),
                Value::Float(f) => Ok(Value::Int(*f as i64)),
                Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| ExprError::eval(format!("cannot parse '{s}' as int"))),
                Value::Enum(e) => Ok(Value::Int(i64::from(e.number))),
                other => Err(ExprError::eval(format!(
                    "cannot convert {} to int",
                    other.type_name()
                ))),
            }
        }
        "string" => {
            let value = eval(one_arg(name, args)?, scope)?;
            Ok(Value::String(value.to_display()))
        }
        "timestamp" => {
            let value = eval(one_arg(name, args)?, scope)?;
            match &value {
                Value::String(s) => DateTime::parse_from_rfc3339(s)
                    .map(|t| Value::Timestamp(t.with_timezone(&Utc)))
                    .map_err(|e| ExprError::eval(format!("invalid timestamp '{s}': {e}"))),
                Value::Int(secs) => DateTime::<Utc>::from_timestamp(*secs, 0)
                    .map(Value::Timestamp)
                    .ok_or_else(|| ExprError::eval(format!("timestamp {secs} out of range"))),
                other => Err(ExprError::eval(format!(
                    "timestamp() needs a string or int, got {}",
                    other.type_name()
                ))),
            }
        }
        "duration" => {
            let value = eval(one_arg(name, args)?, scope)?;
            match &value {
                Value::String(s) => parse_duration(s)
                    .map(Value::Duration)
                    .ok_or_else(|| ExprError::eval(format!("invalid duration '{s}'"))),
                Value::Int(secs) => Ok(Value::Duration(Duration::seconds(*secs))),
                other => Err(ExprError::eval(format!(
                    "duration() needs a string or int, got {}",
                    other.type_name()
                ))),
            }
        }
        "raw" => {
            // Nested raw() has no marker to attach; it passes the value
            // through and the top-level call applies the escape exemption.
            eval(one_arg(name, args)?, scope)
        }
        "filter" => comprehension(name, args, scope, |items, pred, scope| {
            let mut out = Vec::new();
            for item in items {
                if eval_with_it(pred, scope, item.clone())?.is_truthy() {
                    out.push(item.clone());
                }
            }
            Ok(Value::List(out))
        }),
        "map" => comprehension(name, args, scope, |items, body, scope| {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(eval_with_it(body, scope, item.clone())?);
            }
            Ok(Value::List(out))
        }),
        other => Err(ExprError::eval(format!("unknown function '{other}'"))),
    }
}

fn method(receiver: &Expr, name: &str, args: &[Expr], scope: &Scope) -> Result<Value, ExprError> {
    match name {
        "matches" => {
            let value = eval(receiver, scope)?;
            let pattern = eval(one_arg(name, args)?, scope)?;
            match (&value, &pattern) {
                (Value::String(s), Value::String(p)) => {
                    let re = Regex::new(p)
                        .map_err(|e| ExprError::eval(format!("invalid pattern '{p}': {e}")))?;
                    Ok(Value::Bool(re.is_match(s)))
                }
                _ => Err(ExprError::eval("matches() is a method on strings")),
            }
        }
        "size" if args.is_empty() => {
            let value = eval(receiver, scope)?;
            value
                .size()
                .map(|n| Value::Int(n as i64))
                .ok_or_else(|| {
                    ExprError::eval(format!("size() is undefined for {}", value.type_name()))
                })
        }
        "filter" | "map" => {
            // Method form: list.filter(pred) == filter(list, pred).
            let mut full = Vec::with_capacity(args.len() + 1);
            full.push(receiver.clone());
            full.extend(args.iter().cloned());
            call(name, &full, scope)
        }
        other => Err(ExprError::eval(format!("unknown method '{other}'"))),
    }
}

type Comprehend = fn(&[Value], &Expr, &Scope) -> Result<Value, ExprError>;

fn comprehension(
    name: &str,
    args: &[Expr],
    scope: &Scope,
    run: Comprehend,
) -> Result<Value, ExprError> {
    if args.len() != 2 {
        return Err(ExprError::eval(format!(
            "{name}() takes a list and an expression"
        )));
    }
    let subject = eval(&args[0], scope)?;
    let items = match subject {
        Value::List(items) => items,
        other => {
            return Err(ExprError::eval(format!(
                "{name}() needs a list, got {}",
                other.type_name()
            )));
        }
    };
    run(&items, &args[1], scope)
}

/// Evaluate `expr` with the element bound as `it` in a child frame.
fn eval_with_it(expr: &Expr, scope: &Scope, item: Value) -> Result<Value, ExprError> {
    let mut child = scope.clone();
    child.push_frame();
    child.bind("it", item);
    eval(expr, &child)
}

fn one_arg<'e>(name: &str, args: &'e [Expr]) -> Result<&'e Expr, ExprError> {
    if args.len() == 1 {
        Ok(&args[0])
    } else {
        Err(ExprError::eval(format!(
            "{name}() takes exactly one argument"
        )))
    }
}

/// Durations like `300ms`, `5s`, `1h30m`.
fn parse_duration(s: &str) -> Option<Duration> {
    let mut total = Duration::zero();
    let mut digits = String::new();
    let mut chars = s.chars().peekable();
    let mut any = false;

    while let Some(c) = chars.next() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let amount: i64 = digits.parse().ok()?;
        digits.clear();
        let unit = match c {
            'h' => Duration::hours(amount),
            's' => Duration::seconds(amount),
            'm' => {
                if chars.peek() == Some(&'s') {
                    chars.next();
                    Duration::milliseconds(amount)
                } else {
                    Duration::minutes(amount)
                }
            }
            _ => return None,
        };
        total = total + unit;
        any = true;
    }

    if digits.is_empty() && any {
        Some(total)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval_value;
    use hudl_schema::{EnumValue, MessageValue};
    use indexmap::IndexMap;
    use rstest::rstest;

    fn scope() -> Scope {
        let mut scope = Scope::new();
        scope.bind("count", Value::Int(5));
        scope.bind("name", Value::String("Ada".into()));
        scope.bind("active", Value::Bool(true));
        scope.bind(
            "items",
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
        );
        let mut map = IndexMap::new();
        map.insert("k".to_string(), Value::String("v".into()));
        scope.bind("m", Value::Map(map));

        let mut user = MessageValue::new("User");
        user.fields.insert("name".into(), Value::String("Bob".into()));
        user.explicit.insert("name".into());
        user.fields.insert("email".into(), Value::String(String::new()));
        scope.bind("user", Value::Message(user));
        scope
    }

    #[rstest]
    #[case("1 + 2", Value::Int(3))]
    #[case("2 * 3 + 1", Value::Int(7))]
    #[case("7 / 2", Value::Int(3))]
    #[case("7 % 2", Value::Int(1))]
    #[case("1 + 2.5", Value::Float(3.5))]
    #[case("-count", Value::Int(-5))]
    #[case("count > 0", Value::Bool(true))]
    #[case("count >= 5", Value::Bool(true))]
    #[case("count != 5", Value::Bool(false))]
    #[case("'a' + 'b'", Value::String("ab".into()))]
    #[case("name + '!'", Value::String("Ada!".into()))]
    #[case("'n=' + count", Value::String("n=5".into()))]
    #[case("!active", Value::Bool(false))]
    #[case("active ? 'yes' : 'no'", Value::String("yes".into()))]
    #[case("count > 10 ? 'big' : 'small'", Value::String("small".into()))]
    #[case("size(items)", Value::Int(3))]
    #[case("size(name)", Value::Int(3))]
    #[case("items[1]", Value::Int(2))]
    #[case("m['k']", Value::String("v".into()))]
    #[case("m['missing']", Value::Null)]
    #[case("user.name", Value::String("Bob".into()))]
    #[case("2 in items", Value::Bool(true))]
    #[case("9 in items", Value::Bool(false))]
    #[case("'k' in m", Value::Bool(true))]
    #[case("type(count)", Value::String("int".into()))]
    #[case("int('42')", Value::Int(42))]
    #[case("string(count)", Value::String("5".into()))]
    #[case("null == null", Value::Bool(true))]
    fn evaluates(#[case] source: &str, #[case] expected: Value) {
        assert_eq!(eval_value(source, &scope()).unwrap(), expected);
    }

    #[test]
    fn unknown_variable_is_error_not_null() {
        let err = eval_value("missing", &scope()).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn short_circuit_skips_right_side() {
        // `missing` would error if evaluated.
        assert_eq!(
            eval_value("false && missing", &scope()).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            eval_value("true || missing", &scope()).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn division_by_zero_is_error() {
        assert!(eval_value("1 / 0", &scope()).is_err());
    }

    #[test]
    fn has_checks_presence_not_value() {
        assert_eq!(
            eval_value("has(user.name)", &scope()).unwrap(),
            Value::Bool(true)
        );
        // email exists with its default but was never set
        assert_eq!(
            eval_value("has(user.email)", &scope()).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn has_on_map_checks_keys() {
        assert_eq!(eval_value("has(m.k)", &scope()).unwrap(), Value::Bool(true));
        assert_eq!(
            eval_value("has(m.nope)", &scope()).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn matches_method() {
        assert_eq!(
            eval_value("name.matches('^A')", &scope()).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            eval_value("name.matches('^B')", &scope()).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn filter_and_map_bind_it() {
        assert_eq!(
            eval_value("filter(items, it > 1)", &scope()).unwrap(),
            Value::List(vec![Value::Int(2), Value::Int(3)])
        );
        assert_eq!(
            eval_value("map(items, it * 10)", &scope()).unwrap(),
            Value::List(vec![Value::Int(10), Value::Int(20), Value::Int(30)])
        );
        assert_eq!(
            eval_value("items.filter(it > 2)", &scope()).unwrap(),
            Value::List(vec![Value::Int(3)])
        );
    }

    #[test]
    fn raw_marks_pre_escaped() {
        let out = crate::eval_str("raw('<b>hi</b>')", &scope()).unwrap();
        assert!(out.pre_escaped);
        assert_eq!(out.value, Value::String("<b>hi</b>".into()));

        let out = crate::eval_str("'<b>hi</b>'", &scope()).unwrap();
        assert!(!out.pre_escaped);
    }

    #[test]
    fn enum_equality_with_symbol_and_number() {
        let mut scope = scope();
        scope.bind(
            "status",
            Value::Enum(EnumValue {
                symbol: "S_PENDING".into(),
                number: 1,
            }),
        );
        scope.bind(
            "S_PENDING",
            Value::Enum(EnumValue {
                symbol: "S_PENDING".into(),
                number: 1,
            }),
        );
        assert_eq!(
            eval_value("status == S_PENDING", &scope).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            eval_value("status == 'S_PENDING'", &scope).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(eval_value("status == 1", &scope).unwrap(), Value::Bool(true));
    }

    #[test]
    fn timestamps_and_durations() {
        let t = eval_value("timestamp('2026-01-01T00:00:00Z')", &scope()).unwrap();
        assert!(matches!(t, Value::Timestamp(_)));

        assert_eq!(
            eval_value("duration('1h30m')", &scope()).unwrap(),
            Value::Duration(Duration::minutes(90))
        );
        assert_eq!(
            eval_value("duration('300ms')", &scope()).unwrap(),
            Value::Duration(Duration::milliseconds(300))
        );
        assert_eq!(
            eval_value(
                "timestamp('2026-01-01T00:00:00Z') < timestamp('2026-01-02T00:00:00Z')",
                &scope()
            )
            .unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn field_access_on_null_degrades_to_null() {
        let mut scope = scope();
        scope.bind("nothing", Value::Null);
        assert_eq!(eval_value("nothing.field", &scope).unwrap(), Value::Null);
    }

    #[test]
    fn field_access_on_scalar_is_error() {
        assert!(eval_value("count.field", &scope()).is_err());
    }

    #[test]
    fn index_out_of_bounds_is_error() {
        assert!(eval_value("items[9]", &scope()).is_err());
        assert!(eval_value("items[-1]", &scope()).is_err());
    }

    #[test]
    fn list_literal_evaluates_members() {
        assert_eq!(
            eval_value("[count, 1 + 1]", &scope()).unwrap(),
            Value::List(vec![Value::Int(5), Value::Int(2)])
        );
    }
}
