//! Literal conversion applied while populating declared property kinds.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{ContainerError, ContainerResult};
use crate::value::{Value, ValueKind};

/// Converts literals between value kinds.
///
/// The container only consults the service when a property declares a kind
/// and the literal is of a different one; literals the service cannot
/// convert are passed to the bean unchanged.
pub trait ConversionService: Send + Sync {
    fn can_convert(&self, from: ValueKind, to: ValueKind) -> bool;

    fn convert(&self, value: Value, to: ValueKind) -> ContainerResult<Value>;
}

type Converter = Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;

/// Registry of converters keyed by `(from, to)`.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{ConversionService, DefaultConversionService, Value, ValueKind};
///
/// let service = DefaultConversionService::new();
/// assert!(service.can_convert(ValueKind::Str, ValueKind::Int));
/// assert_eq!(service.convert(Value::from("42"), ValueKind::Int).unwrap(), Value::Int(42));
///
/// service.add_converter(ValueKind::Int, ValueKind::Bool, |v| {
///     Ok(Value::Bool(v.as_int() != Some(0)))
/// });
/// assert_eq!(service.convert(Value::Int(0), ValueKind::Bool).unwrap(), Value::Bool(false));
/// ```
pub struct DefaultConversionService {
    converters: RwLock<HashMap<(ValueKind, ValueKind), Converter>>,
}

impl DefaultConversionService {
    /// Service with the built-in string and numeric converters.
    pub fn new() -> Self {
        let service = Self::empty();
        service.add_converter(ValueKind::Str, ValueKind::Int, |v| match v {
            Value::Str(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|e| e.to_string()),
            other => Err(format!("not a string: {:?}", other)),
        });
        service.add_converter(ValueKind::Str, ValueKind::Float, |v| match v {
            Value::Str(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|e| e.to_string()),
            other => Err(format!("not a string: {:?}", other)),
        });
        service.add_converter(ValueKind::Str, ValueKind::Bool, |v| match v {
            Value::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
                "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
                other => Err(format!("'{}' is not a boolean", other)),
            },
            other => Err(format!("not a string: {:?}", other)),
        });
        service.add_converter(ValueKind::Int, ValueKind::Float, |v| match v {
            Value::Int(i) => Ok(Value::Float(i as f64)),
            other => Err(format!("not an int: {:?}", other)),
        });
        for from in [ValueKind::Int, ValueKind::Float, ValueKind::Bool] {
            service.add_converter(from, ValueKind::Str, |v| match v {
                Value::Int(i) => Ok(Value::Str(i.to_string())),
                Value::Float(f) => Ok(Value::Str(f.to_string())),
                Value::Bool(b) => Ok(Value::Str(b.to_string())),
                other => Err(format!("not a scalar: {:?}", other)),
            });
        }
        service
    }

    /// Service with no converters.
    pub fn empty() -> Self {
        DefaultConversionService {
            converters: RwLock::new(HashMap::new()),
        }
    }

    /// Registers (or replaces) the converter for `(from, to)`.
    pub fn add_converter<F>(&self, from: ValueKind, to: ValueKind, converter: F)
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.converters.write().insert((from, to), Arc::new(converter));
    }
}

impl Default for DefaultConversionService {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DefaultConversionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<_> = self.converters.read().keys().copied().collect();
        f.debug_struct("DefaultConversionService")
            .field("converters", &pairs)
            .finish()
    }
}

impl ConversionService for DefaultConversionService {
    fn can_convert(&self, from: ValueKind, to: ValueKind) -> bool {
        to.accepts(from) || self.converters.read().contains_key(&(from, to))
    }

    fn convert(&self, value: Value, to: ValueKind) -> ContainerResult<Value> {
        let from = value.kind();
        if to.accepts(from) {
            return Ok(value);
        }
        let converter = self.converters.read().get(&(from, to)).cloned();
        match converter {
            Some(converter) => converter(value).map_err(|reason| ContainerError::ConversionFailed {
                from: from.name(),
                to: to.name(),
                reason,
            }),
            None => Err(ContainerError::ConversionFailed {
                from: from.name(),
                to: to.name(),
                reason: "no converter registered".into(),
            }),
        }
    }
}
