//! Named operations available on values through `MethodCall` expressions
//!
//! Dispatch is on the receiver's variant. A method the variant does not
//! provide fails with `UnsupportedOperation`.

use crate::common::error::{FlowError, FlowResult};
use crate::types::Value;
use crate::unsupported_err;

/// Invoke `method` on `receiver` with already-evaluated arguments
pub fn call_method(receiver: &Value, method: &str, args: &[Value]) -> FlowResult<Value> {
    match receiver {
        Value::Blob(data) => blob_method(data, method, args),
        Value::Varchar(s) => string_method(s, method, args),
        Value::List(values) => list_method(values, method, args),
        Value::Struct(row) => match method {
            "get" => {
                check_arity(method, args, 1, 1)?;
                let name = args[0].try_as_str()?;
                Ok(row.get(name).cloned().unwrap_or(Value::Null))
            }
            "keys" => {
                check_arity(method, args, 0, 0)?;
                Ok(Value::List(row.field_names().map(Value::varchar).collect()))
            }
            "len" => {
                check_arity(method, args, 0, 0)?;
                Ok(Value::Integer(row.len() as i64))
            }
            _ => Err(no_such_method(receiver, method)),
        },
        _ => Err(no_such_method(receiver, method)),
    }
}

fn no_such_method(receiver: &Value, method: &str) -> FlowError {
    unsupported_err!("{} has no method '{}'", receiver.type_name(), method)
}

fn check_arity(method: &str, args: &[Value], min: usize, max: usize) -> FlowResult<()> {
    if args.len() < min || args.len() > max {
        return Err(FlowError::InvalidArgument(format!(
            "{}() takes {}..={} arguments, got {}",
            method,
            min,
            max,
            args.len()
        )));
    }
    Ok(())
}

fn blob_method(data: &[u8], method: &str, args: &[Value]) -> FlowResult<Value> {
    match method {
        "decode" => {
            check_arity(method, args, 0, 1)?;
            if let Some(encoding) = args.first() {
                let encoding = encoding.try_as_str()?.to_ascii_lowercase();
                if encoding != "utf-8" && encoding != "utf8" {
                    return Err(unsupported_err!("decode with encoding '{}'", encoding));
                }
            }
            String::from_utf8(data.to_vec())
                .map(Value::Varchar)
                .map_err(|e| FlowError::InvalidValue(format!("Blob is not valid UTF-8: {}", e)))
        }
        "len" => {
            check_arity(method, args, 0, 0)?;
            Ok(Value::Integer(data.len() as i64))
        }
        _ => Err(unsupported_err!("Blob has no method '{}'", method)),
    }
}

fn string_method(s: &str, method: &str, args: &[Value]) -> FlowResult<Value> {
    match method {
        "lower" => {
            check_arity(method, args, 0, 0)?;
            Ok(Value::Varchar(s.to_lowercase()))
        }
        "upper" => {
            check_arity(method, args, 0, 0)?;
            Ok(Value::Varchar(s.to_uppercase()))
        }
        "strip" => {
            check_arity(method, args, 0, 0)?;
            Ok(Value::varchar(s.trim()))
        }
        "len" => {
            check_arity(method, args, 0, 0)?;
            Ok(Value::Integer(s.chars().count() as i64))
        }
        "split" => {
            check_arity(method, args, 0, 1)?;
            let parts: Vec<Value> = match args.first() {
                Some(sep) => s.split(sep.try_as_str()?).map(Value::varchar).collect(),
                None => s.split_whitespace().map(Value::varchar).collect(),
            };
            Ok(Value::List(parts))
        }
        "startswith" => {
            check_arity(method, args, 1, 1)?;
            Ok(Value::Boolean(s.starts_with(args[0].try_as_str()?)))
        }
        "endswith" => {
            check_arity(method, args, 1, 1)?;
            Ok(Value::Boolean(s.ends_with(args[0].try_as_str()?)))
        }
        "contains" => {
            check_arity(method, args, 1, 1)?;
            Ok(Value::Boolean(s.contains(args[0].try_as_str()?)))
        }
        "replace" => {
            check_arity(method, args, 2, 2)?;
            let from = args[0].try_as_str()?;
            let to = args[1].try_as_str()?;
            Ok(Value::Varchar(s.replace(from, to)))
        }
        "encode" => {
            check_arity(method, args, 0, 0)?;
            Ok(Value::Blob(s.as_bytes().to_vec()))
        }
        _ => Err(unsupported_err!("Varchar has no method '{}'", method)),
    }
}

fn list_method(values: &[Value], method: &str, args: &[Value]) -> FlowResult<Value> {
    match method {
        "len" => {
            check_arity(method, args, 0, 0)?;
            Ok(Value::Integer(values.len() as i64))
        }
        "get" => {
            check_arity(method, args, 1, 1)?;
            let idx = args[0].try_as_i64()?;
            let len = values.len() as i64;
            // Negative indices count from the end
            let idx = if idx < 0 { len + idx } else { idx };
            if idx < 0 || idx >= len {
                return Ok(Value::Null);
            }
            Ok(values[idx as usize].clone())
        }
        "contains" => {
            check_arity(method, args, 1, 1)?;
            Ok(Value::Boolean(values.contains(&args[0])))
        }
        "join" => {
            check_arity(method, args, 1, 1)?;
            let sep = args[0].try_as_str()?;
            let parts = values
                .iter()
                .map(Value::try_as_str)
                .collect::<FlowResult<Vec<_>>>()?;
            Ok(Value::Varchar(parts.join(sep)))
        }
        _ => Err(unsupported_err!("List has no method '{}'", method)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Row;

    #[test]
    fn test_blob_decode() {
        let blob = Value::Blob("héllo".as_bytes().to_vec());
        assert_eq!(
            call_method(&blob, "decode", &[]).unwrap(),
            Value::varchar("héllo")
        );
        assert_eq!(
            call_method(&blob, "decode", &[Value::varchar("UTF-8")]).unwrap(),
            Value::varchar("héllo")
        );
        assert!(matches!(
            call_method(&Value::Blob(vec![0xff, 0xfe]), "decode", &[]),
            Err(FlowError::InvalidValue(_))
        ));
        assert!(matches!(
            call_method(&blob, "decode", &[Value::varchar("latin-1")]),
            Err(FlowError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_string_methods() {
        let s = Value::varchar("  Story_01_backstory.txt ");
        let stripped = call_method(&s, "strip", &[]).unwrap();
        assert_eq!(stripped, Value::varchar("Story_01_backstory.txt"));

        let replaced = call_method(
            &stripped,
            "replace",
            &[Value::varchar("_backstory"), Value::varchar("")],
        )
        .unwrap();
        assert_eq!(replaced, Value::varchar("Story_01.txt"));

        assert_eq!(
            call_method(&Value::varchar("a b  c"), "split", &[]).unwrap(),
            Value::List(vec![
                Value::varchar("a"),
                Value::varchar("b"),
                Value::varchar("c")
            ])
        );
        assert_eq!(
            call_method(&Value::varchar("AbC"), "lower", &[]).unwrap(),
            Value::varchar("abc")
        );
    }

    #[test]
    fn test_list_get_and_join() {
        let list = Value::List(vec![Value::varchar("x"), Value::varchar("y")]);
        assert_eq!(
            call_method(&list, "get", &[Value::Integer(-1)]).unwrap(),
            Value::varchar("y")
        );
        assert_eq!(
            call_method(&list, "get", &[Value::Integer(5)]).unwrap(),
            Value::Null
        );
        assert_eq!(
            call_method(&list, "join", &[Value::varchar("-")]).unwrap(),
            Value::varchar("x-y")
        );
    }

    #[test]
    fn test_struct_get() {
        let row = Value::Struct(Row::new().with("status", "neutral"));
        assert_eq!(
            call_method(&row, "get", &[Value::varchar("status")]).unwrap(),
            Value::varchar("neutral")
        );
        assert_eq!(
            call_method(&row, "get", &[Value::varchar("nope")]).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_unsupported_operation() {
        let err = call_method(&Value::Integer(3), "decode", &[]).unwrap_err();
        assert!(matches!(err, FlowError::UnsupportedOperation(_)));
        assert!(err.to_string().contains("Integer has no method 'decode'"));

        let err = call_method(&Value::Null, "lower", &[]).unwrap_err();
        assert!(matches!(err, FlowError::UnsupportedOperation(_)));
    }

    #[test]
    fn test_wrong_arity() {
        let err = call_method(&Value::varchar("x"), "lower", &[Value::Null]).unwrap_err();
        assert!(matches!(err, FlowError::InvalidArgument(_)));
    }
}
