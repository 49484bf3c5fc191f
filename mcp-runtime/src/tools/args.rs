use serde_json::{Map, Value};
use trainercentral_core::TcError;

pub(crate) type Args = Map<String, Value>;

pub(crate) fn required_string(args: &Args, key: &str) -> Result<String, TcError> {
    let value = args
        .get(key)
        .ok_or_else(|| TcError::invalid_field(key, format!("Missing required field '{key}'")))?;
    match value {
        Value::String(v) if !v.trim().is_empty() => Ok(v.clone()),
        Value::String(_) => Err(TcError::invalid_field(key, format!("'{key}' must not be empty"))),
        // Agents frequently send numeric ids unquoted.
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(TcError::invalid_field(key, format!("'{key}' must be a string"))),
    }
}

pub(crate) fn arg_string(args: &Args, key: &str, default: &str) -> Result<String, TcError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(default.to_string()),
        Some(Value::String(v)) => Ok(v.clone()),
        Some(_) => Err(TcError::invalid_field(key, format!("'{key}' must be a string"))),
    }
}

pub(crate) fn arg_optional_string(args: &Args, key: &str) -> Result<Option<String>, TcError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(v)) if v.trim().is_empty() => Ok(None),
        Some(Value::String(v)) => Ok(Some(v.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(TcError::invalid_field(key, format!("'{key}' must be a string"))),
    }
}

pub(crate) fn required_object(args: &Args, key: &str) -> Result<Value, TcError> {
    match args.get(key) {
        Some(value @ Value::Object(_)) => Ok(value.clone()),
        Some(Value::String(raw)) => {
            // Some clients send nested objects as JSON text.
            match serde_json::from_str::<Value>(raw) {
                Ok(value @ Value::Object(_)) => Ok(value),
                _ => Err(TcError::invalid_field(key, format!("'{key}' must be an object"))),
            }
        }
        Some(_) => Err(TcError::invalid_field(key, format!("'{key}' must be an object"))),
        None => Err(TcError::invalid_field(key, format!("Missing required field '{key}'"))),
    }
}

pub(crate) fn arg_bool(args: &Args, key: &str, default: bool) -> Result<bool, TcError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(v)) => Ok(*v),
        Some(_) => Err(TcError::invalid_field(key, format!("'{key}' must be a boolean"))),
    }
}

pub(crate) fn arg_optional_u64(args: &Args, key: &str) -> Result<Option<u64>, TcError> {
    let invalid = || TcError::invalid_field(key, format!("'{key}' must be an unsigned integer"));
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_u64().map(Some).ok_or_else(invalid),
        Some(Value::String(raw)) => raw.trim().parse::<u64>().map(Some).map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

pub(crate) fn arg_u64(args: &Args, key: &str, default: u64) -> Result<u64, TcError> {
    Ok(arg_optional_u64(args, key)?.unwrap_or(default))
}
