//! The process-wide builtin registry: arithmetic, comparison, boolean,
//! string, numeric-conversion, JSON, and effectful I/O primitives. Each
//! builtin is a first-class [`Value::Builtin`] so it can be passed around
//! and called exactly like a user-defined function; dispatch on name mirrors
//! the teacher's single big match over builtin names, just keyed into a
//! registry of closures instead of inline VM opcodes.

use std::cell::RefCell;
use std::io::BufRead;
use std::rc::Rc;

use ailang_core::Span;

use crate::effects::EffectContext;
use crate::error::RuntimeError;
use crate::value::{Value, show};

fn builtin(
    name: &str,
    arity: usize,
    effect: Option<&'static str>,
    func: impl Fn(&[Value], &EffectContext) -> Result<Value, RuntimeError> + 'static,
) -> (String, Value) {
    let value = Value::Builtin(Rc::new(crate::value::BuiltinValue {
        name: name.to_string(),
        arity,
        effect,
        func: Box::new(func),
    }));
    (name.to_string(), value)
}

fn mismatch(name: &str, hint: Option<&str>) -> RuntimeError {
    RuntimeError::TypeMismatchBuiltin {
        span: Span::dummy(),
        builtin: name.to_string(),
        hint: hint.map(str::to_string),
    }
}

macro_rules! int_arith {
    ($name:literal, $op:expr) => {
        builtin($name, 2, None, |args, _| match (&args[0], &args[1]) {
            (Value::Int(a), Value::Int(b)) => $op(*a, *b),
            _ => Err(mismatch($name, Some("expects two Int arguments"))),
        })
    };
}

macro_rules! float_arith {
    ($name:literal, $op:expr) => {
        builtin($name, 2, None, |args, _| match (&args[0], &args[1]) {
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float($op(*a, *b))),
            _ => Err(mismatch($name, Some("expects two Float arguments"))),
        })
    };
}

macro_rules! cmp {
    ($name:literal, $variant:path, $op:tt) => {
        builtin($name, 2, None, |args, _| match (&args[0], &args[1]) {
            ($variant(a), $variant(b)) => Ok(Value::Bool(a $op b)),
            _ => Err(mismatch($name, Some("operands must be the same primitive type"))),
        })
    };
}

/// Every builtin binding to install into the evaluator's root environment.
pub fn prelude() -> Vec<(String, Value)> {
    let mut out = Vec::new();
    out.extend(arithmetic());
    out.extend(comparison());
    out.extend(boolean());
    out.extend(strings());
    out.extend(conversions());
    out.extend(json());
    out.extend(io());
    out
}

fn arithmetic() -> Vec<(String, Value)> {
    vec![
        int_arith!("add_Int", |a: i64, b: i64| Ok(Value::Int(a.wrapping_add(b)))),
        int_arith!("sub_Int", |a: i64, b: i64| Ok(Value::Int(a.wrapping_sub(b)))),
        int_arith!("mul_Int", |a: i64, b: i64| Ok(Value::Int(a.wrapping_mul(b)))),
        int_arith!("div_Int", |a: i64, b: i64| if b == 0 {
            Err(RuntimeError::DivisionByZero { span: Span::dummy() })
        } else {
            Ok(Value::Int(a.wrapping_div(b)))
        }),
        int_arith!("mod_Int", |a: i64, b: i64| if b == 0 {
            Err(RuntimeError::DivisionByZero { span: Span::dummy() })
        } else {
            Ok(Value::Int(a.rem_euclid(b)))
        }),
        float_arith!("add_Float", |a: f64, b: f64| a + b),
        float_arith!("sub_Float", |a: f64, b: f64| a - b),
        float_arith!("mul_Float", |a: f64, b: f64| a * b),
        float_arith!("div_Float", |a: f64, b: f64| a / b),
        float_arith!("mod_Float", |a: f64, b: f64| a % b),
        builtin("neg_Int", 1, None, |args, _| match &args[0] {
            Value::Int(a) => Ok(Value::Int(a.wrapping_neg())),
            _ => Err(mismatch("neg_Int", Some("expects an Int argument"))),
        }),
        builtin("neg_Float", 1, None, |args, _| match &args[0] {
            Value::Float(a) => Ok(Value::Float(-a)),
            _ => Err(mismatch("neg_Float", Some("expects a Float argument"))),
        }),
    ]
}

fn comparison() -> Vec<(String, Value)> {
    vec![
        cmp!("eq_Int", Value::Int, ==),
        cmp!("ne_Int", Value::Int, !=),
        cmp!("lt_Int", Value::Int, <),
        cmp!("le_Int", Value::Int, <=),
        cmp!("gt_Int", Value::Int, >),
        cmp!("ge_Int", Value::Int, >=),
        cmp!("eq_Float", Value::Float, ==),
        cmp!("ne_Float", Value::Float, !=),
        cmp!("lt_Float", Value::Float, <),
        cmp!("le_Float", Value::Float, <=),
        cmp!("gt_Float", Value::Float, >),
        cmp!("ge_Float", Value::Float, >=),
        cmp!("eq_String", Value::Str, ==),
        cmp!("ne_String", Value::Str, !=),
        cmp!("lt_String", Value::Str, <),
        cmp!("le_String", Value::Str, <=),
        cmp!("gt_String", Value::Str, >),
        cmp!("ge_String", Value::Str, >=),
        cmp!("eq_Bool", Value::Bool, ==),
        cmp!("ne_Bool", Value::Bool, !=),
        builtin("_str_compare", 2, None, |args, _| match (&args[0], &args[1]) {
            (Value::Str(a), Value::Str(b)) => Ok(Value::Int(match a.as_str().cmp(b.as_str()) {
                std::cmp::Ordering::Less => -1,
                std::cmp::Ordering::Equal => 0,
                std::cmp::Ordering::Greater => 1,
            })),
            _ => Err(mismatch("_str_compare", Some("expects two String arguments"))),
        }),
    ]
}

fn boolean() -> Vec<(String, Value)> {
    vec![
        builtin("and_Bool", 2, None, |args, _| match (&args[0], &args[1]) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(*a && *b)),
            _ => Err(mismatch("and_Bool", Some("expects two Bool arguments"))),
        }),
        builtin("or_Bool", 2, None, |args, _| match (&args[0], &args[1]) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(*a || *b)),
            _ => Err(mismatch("or_Bool", Some("expects two Bool arguments"))),
        }),
        builtin("not_Bool", 1, None, |args, _| match &args[0] {
            Value::Bool(a) => Ok(Value::Bool(!a)),
            _ => Err(mismatch("not_Bool", Some("expects a Bool argument"))),
        }),
    ]
}

fn strings() -> Vec<(String, Value)> {
    vec![
        builtin("_str_len", 1, None, |args, _| match &args[0] {
            Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
            _ => Err(mismatch("_str_len", Some("expects a String argument"))),
        }),
        builtin("_str_slice", 3, None, |args, _| match (&args[0], &args[1], &args[2]) {
            (Value::Str(s), Value::Int(start), Value::Int(end)) => {
                let chars: Vec<char> = s.chars().collect();
                let len = chars.len() as i64;
                let start = start.clamp(0, len) as usize;
                let end = (*end).clamp(start as i64, len) as usize;
                Ok(Value::str(chars[start..end].iter().collect::<String>()))
            }
            _ => Err(mismatch("_str_slice", Some("expects (String, Int, Int)"))),
        }),
        builtin("_str_find", 2, None, |args, _| match (&args[0], &args[1]) {
            (Value::Str(haystack), Value::Str(needle)) => {
                let chars: Vec<char> = haystack.chars().collect();
                let needle_chars: Vec<char> = needle.chars().collect();
                if needle_chars.is_empty() {
                    return Ok(Value::Int(0));
                }
                for i in 0..chars.len() {
                    if chars[i..].starts_with(needle_chars.as_slice()) {
                        return Ok(Value::Int(i as i64));
                    }
                }
                Ok(Value::Int(-1))
            }
            _ => Err(mismatch("_str_find", Some("expects two String arguments"))),
        }),
        builtin("_str_upper", 1, None, |args, _| match &args[0] {
            Value::Str(s) => Ok(Value::str(s.to_uppercase())),
            _ => Err(mismatch("_str_upper", Some("expects a String argument"))),
        }),
        builtin("_str_lower", 1, None, |args, _| match &args[0] {
            Value::Str(s) => Ok(Value::str(s.to_lowercase())),
            _ => Err(mismatch("_str_lower", Some("expects a String argument"))),
        }),
        builtin("_str_trim", 1, None, |args, _| match &args[0] {
            Value::Str(s) => Ok(Value::str(s.trim().to_string())),
            _ => Err(mismatch("_str_trim", Some("expects a String argument"))),
        }),
    ]
}

fn conversions() -> Vec<(String, Value)> {
    vec![
        builtin("intToFloat", 1, None, |args, _| match &args[0] {
            Value::Int(n) => Ok(Value::Float(*n as f64)),
            _ => Err(mismatch("intToFloat", Some("expects an Int argument"))),
        }),
        builtin("floatToInt", 1, None, |args, _| match &args[0] {
            Value::Float(f) => Ok(Value::Int(f.trunc() as i64)),
            _ => Err(mismatch("floatToInt", Some("expects a Float argument"))),
        }),
    ]
}

fn json() -> Vec<(String, Value)> {
    vec![
        builtin("_json_encode", 1, None, |args, _| {
            Ok(Value::str(encode_json(&args[0])?))
        }),
        builtin("_json_decode", 1, None, |args, _| match &args[0] {
            Value::Str(s) => Ok(match serde_json::from_str::<serde_json::Value>(s) {
                Ok(v) => Value::ok(decode_json(&v)),
                Err(e) => Value::err(Value::str(e.to_string())),
            }),
            _ => Err(mismatch("_json_decode", Some("expects a String argument"))),
        }),
    ]
}

/// `Json` constructor names, per SPEC_FULL.md §4.8: `JNull`, `JBool(Bool)`,
/// `JNumber(Float)`, `JString(String)`, `JArray(List[Json])`,
/// `JObject(List[{key, value}])`.
fn encode_json(v: &Value) -> Result<String, RuntimeError> {
    let Value::Tagged(t) = v else {
        return Err(mismatch("_json_encode", Some("expects a Json value")));
    };
    Ok(match t.ctor.as_str() {
        "JNull" => "null".to_string(),
        "JBool" => match &t.fields[0] {
            Value::Bool(b) => b.to_string(),
            _ => return Err(mismatch("_json_encode", Some("JBool expects a Bool field"))),
        },
        "JNumber" => match &t.fields[0] {
            Value::Float(f) => encode_json_number(*f),
            Value::Int(n) => n.to_string(),
            _ => return Err(mismatch("_json_encode", Some("JNumber expects a Float field"))),
        },
        "JString" => match &t.fields[0] {
            Value::Str(s) => encode_json_string(s),
            _ => return Err(mismatch("_json_encode", Some("JString expects a String field"))),
        },
        "JArray" => match &t.fields[0] {
            Value::List(items) => {
                let parts: Result<Vec<String>, RuntimeError> =
                    items.iter().map(encode_json).collect();
                format!("[{}]", parts?.join(","))
            }
            _ => return Err(mismatch("_json_encode", Some("JArray expects a List field"))),
        },
        "JObject" => match &t.fields[0] {
            Value::List(entries) => {
                let mut parts = Vec::with_capacity(entries.len());
                for entry in entries.iter() {
                    let Value::Record(fields) = entry else {
                        return Err(mismatch("_json_encode", Some("JObject entries must be records")));
                    };
                    let key = match fields.get("key") {
                        Some(Value::Str(k)) => k.as_str().to_string(),
                        _ => return Err(mismatch("_json_encode", Some("JObject entry missing 'key'"))),
                    };
                    let value = fields
                        .get("value")
                        .ok_or_else(|| mismatch("_json_encode", Some("JObject entry missing 'value'")))?;
                    parts.push(format!("{}:{}", encode_json_string(&key), encode_json(value)?));
                }
                format!("{{{}}}", parts.join(","))
            }
            _ => return Err(mismatch("_json_encode", Some("JObject expects a List field"))),
        },
        other => {
            return Err(mismatch(
                "_json_encode",
                Some(&format!("unknown Json constructor '{other}'")),
            ))
        }
    })
}

fn encode_json_number(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

/// Canonical JSON string encoding: control characters below U+0020 escaped
/// as `\u00XX`, characters above U+FFFF encoded as UTF-16 surrogate pairs.
fn encode_json_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c if (c as u32) > 0xFFFF => {
                let cp = c as u32 - 0x10000;
                let high = 0xD800 + (cp >> 10);
                let low = 0xDC00 + (cp & 0x3FF);
                out.push_str(&format!("\\u{high:04x}\\u{low:04x}"));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn decode_json(v: &serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::tagged("Json", "JNull", vec![]),
        serde_json::Value::Bool(b) => Value::tagged("Json", "JBool", vec![Value::Bool(*b)]),
        serde_json::Value::Number(n) => {
            Value::tagged("Json", "JNumber", vec![Value::Float(n.as_f64().unwrap_or(f64::NAN))])
        }
        serde_json::Value::String(s) => Value::tagged("Json", "JString", vec![Value::str(s.clone())]),
        serde_json::Value::Array(items) => Value::tagged(
            "Json",
            "JArray",
            vec![Value::list(items.iter().map(decode_json).collect())],
        ),
        serde_json::Value::Object(map) => {
            let entries = map
                .iter()
                .map(|(k, v)| {
                    let mut fields = std::collections::BTreeMap::new();
                    fields.insert("key".to_string(), Value::str(k.clone()));
                    fields.insert("value".to_string(), decode_json(v));
                    Value::record(fields)
                })
                .collect();
            Value::tagged("Json", "JObject", vec![Value::list(entries)])
        }
    }
}

/// Installs `_io_print`/`_io_println`/`_io_readLine`, each gated on the `IO`
/// capability. `_io_readLine` reads from an injected [`std::io::BufRead`]
/// rather than always touching real stdin, so tests can supply a fixture.
fn io() -> Vec<(String, Value)> {
    io_with_stdin(Rc::new(RefCell::new(std::io::stdin().lock())))
}

/// Builds the I/O builtins over an explicit stdin handle; used by tests and
/// by evaluator construction to swap in a fixture `BufRead`.
pub fn io_with_stdin(stdin: Rc<RefCell<dyn BufRead>>) -> Vec<(String, Value)> {
    vec![
        builtin("_io_print", 1, Some("IO"), |args, ctx| {
            require_capability("_io_print", "IO", ctx)?;
            print!("{}", display_for_print(&args[0]));
            Ok(Value::Unit)
        }),
        builtin("_io_println", 1, Some("IO"), |args, ctx| {
            require_capability("_io_println", "IO", ctx)?;
            println!("{}", display_for_print(&args[0]));
            Ok(Value::Unit)
        }),
        {
            let stdin = stdin.clone();
            builtin("_io_readLine", 0, Some("IO"), move |_args, ctx| {
                require_capability("_io_readLine", "IO", ctx)?;
                let mut line = String::new();
                let n = stdin
                    .borrow_mut()
                    .read_line(&mut line)
                    .map_err(|e| RuntimeError::internal(Span::dummy(), e.to_string()))?;
                if n == 0 {
                    return Ok(Value::err(Value::str("eof")));
                }
                if line.ends_with('\n') {
                    line.pop();
                    if line.ends_with('\r') {
                        line.pop();
                    }
                }
                Ok(Value::ok(Value::str(line)))
            })
        },
    ]
}

fn require_capability(name: &str, label: &str, ctx: &EffectContext) -> Result<(), RuntimeError> {
    if ctx.has(label) {
        Ok(())
    } else {
        tracing::debug!(builtin = name, label, "missing effect capability");
        Err(RuntimeError::MissingCapability {
            span: Span::dummy(),
            label: label.to_string(),
        })
    }
}

fn display_for_print(v: &Value) -> String {
    match v {
        Value::Str(s) => s.as_str().to_string(),
        other => show(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
        let (_, value) = prelude().into_iter().find(|(n, _)| n == name).unwrap();
        let Value::Builtin(b) = value else { unreachable!() };
        (b.func)(args, &EffectContext::all())
    }

    #[test]
    fn int_division_by_zero_is_an_error() {
        let err = call("div_Int", &[Value::Int(1), Value::Int(0)]).unwrap_err();
        assert_eq!(err.code(), "RT_DIV0");
    }

    #[test]
    fn float_division_by_zero_is_infinity() {
        let result = call("div_Float", &[Value::Float(1.0), Value::Float(0.0)]).unwrap();
        assert_eq!(result, Value::Float(f64::INFINITY));
    }

    #[test]
    fn float_modulo_by_zero_is_nan() {
        let result = call("mod_Float", &[Value::Float(1.0), Value::Float(0.0)]).unwrap();
        match result {
            Value::Float(f) => assert!(f.is_nan()),
            other => panic!("expected Float, got {other:?}"),
        }
    }

    #[test]
    fn eq_float_is_false_for_nan() {
        let result = call("eq_Float", &[Value::Float(f64::NAN), Value::Float(f64::NAN)]).unwrap();
        assert_eq!(result, Value::Bool(false));
    }

    #[test]
    fn ne_float_is_true_for_nan() {
        let result = call("ne_Float", &[Value::Float(f64::NAN), Value::Float(f64::NAN)]).unwrap();
        assert_eq!(result, Value::Bool(true));
    }

    #[test]
    fn str_find_returns_negative_one_when_absent() {
        let result = call("_str_find", &[Value::str("hello"), Value::str("xyz")]).unwrap();
        assert_eq!(result, Value::Int(-1));
    }

    #[test]
    fn json_round_trips_an_object() {
        let mut fields = std::collections::BTreeMap::new();
        fields.insert("key".to_string(), Value::str("name"));
        fields.insert("value".to_string(), Value::tagged("Json", "JString", vec![Value::str("Bob")]));
        let obj = Value::tagged("Json", "JObject", vec![Value::list(vec![Value::record(fields)])]);
        let encoded = call("_json_encode", &[obj.clone()]).unwrap();
        assert_eq!(encoded, Value::str("{\"name\":\"Bob\"}"));
        let decoded = call("_json_decode", &[encoded]).unwrap();
        assert_eq!(decoded, Value::ok(obj));
    }

    #[test]
    fn json_decode_preserves_non_alphabetical_key_order() {
        let decoded = call("_json_decode", &[Value::str("{\"z\":1,\"a\":2,\"m\":3}")]).unwrap();
        let Value::Tagged(ok) = decoded else { unreachable!() };
        assert_eq!(ok.ctor, "Ok");
        let Value::Tagged(obj) = &ok.fields[0] else { unreachable!() };
        assert_eq!(obj.ctor, "JObject");
        let Value::List(entries) = &obj.fields[0] else { unreachable!() };
        let keys: Vec<String> = entries
            .iter()
            .map(|e| {
                let Value::Record(fields) = e else { unreachable!() };
                let Value::Str(k) = fields.get("key").unwrap() else { unreachable!() };
                k.as_str().to_string()
            })
            .collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn io_print_without_capability_is_rejected() {
        let (_, value) = prelude().into_iter().find(|(n, _)| n == "_io_print").unwrap();
        let Value::Builtin(b) = value else { unreachable!() };
        let err = (b.func)(&[Value::str("x")], &EffectContext::none()).unwrap_err();
        assert_eq!(err.code(), "EFF_CAP_MISSING");
    }
}
