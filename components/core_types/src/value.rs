//! Tagged runtime values.
//!
//! Primitive values are stored inline. Collector-owned objects (tables,
//! functions, userdata) are referenced by an id into storage the collector
//! owns; a `Value` never decides an object's lifetime.

use std::fmt;
use std::rc::Rc;

/// Represents any runtime value.
///
/// # Examples
///
/// ```
/// use core_types::Value;
///
/// let nil = Value::Nil;
/// let number = Value::Integer(42);
/// let float = Value::Float(2.5);
///
/// assert!(!nil.is_truthy());
/// assert!(number.is_truthy());
/// assert_eq!(float.type_name(), "number");
/// ```
#[derive(Clone, Default)]
pub enum Value {
    /// The absent value
    #[default]
    Nil,
    /// true or false
    Boolean(bool),
    /// 64-bit signed integer
    Integer(i64),
    /// IEEE 754 double-precision float
    Float(f64),
    /// Immutable string
    String(Rc<str>),
    /// Table object (referenced by ID)
    Table(usize),
    /// Function object, interpreted or native (referenced by ID)
    Function(usize),
    /// Userdata object (referenced by ID)
    Userdata(usize),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Boolean(b) => f.debug_tuple("Boolean").field(b).finish(),
            Value::Integer(n) => f.debug_tuple("Integer").field(n).finish(),
            Value::Float(n) => f.debug_tuple("Float").field(n).finish(),
            Value::String(s) => f.debug_tuple("String").field(&&**s).finish(),
            Value::Table(id) => f.debug_tuple("Table").field(id).finish(),
            Value::Function(id) => f.debug_tuple("Function").field(id).finish(),
            Value::Userdata(id) => f.debug_tuple("Userdata").field(id).finish(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
                (*a as f64) == *b && b.fract() == 0.0
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Table(a), Value::Table(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            (Value::Userdata(a), Value::Userdata(b)) => a == b,
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl Value {
    /// Only `nil` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Boolean(false))
    }

    /// Returns the basic type name used in error messages.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_types::Value;
    ///
    /// assert_eq!(Value::Nil.type_name(), "nil");
    /// assert_eq!(Value::Integer(1).type_name(), "number");
    /// assert_eq!(Value::from("x").type_name(), "string");
    /// assert_eq!(Value::Function(0).type_name(), "function");
    /// ```
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) | Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Table(_) => "table",
            Value::Function(_) => "function",
            Value::Userdata(_) => "userdata",
        }
    }

    /// Whether this is an integer or a float.
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    /// Whether this is a string.
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    /// Whether concatenation accepts this value (strings and numbers).
    pub fn converts_to_string(&self) -> bool {
        self.is_string() || self.is_number()
    }

    /// Returns the string contents, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to an integer without rounding.
    ///
    /// Integers convert as-is, floats only when they hold an exact integral
    /// value in range, and strings when they spell such a number.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_types::Value;
    ///
    /// assert_eq!(Value::Float(3.0).to_integer_exact(), Some(3));
    /// assert_eq!(Value::Float(3.5).to_integer_exact(), None);
    /// assert_eq!(Value::from("10").to_integer_exact(), Some(10));
    /// assert_eq!(Value::from("0x10").to_integer_exact(), Some(16));
    /// assert_eq!(Value::Nil.to_integer_exact(), None);
    /// ```
    pub fn to_integer_exact(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::Float(f) => float_to_integer(*f),
            Value::String(s) => {
                let text = s.trim();
                hex_to_integer(text)
                    .or_else(|| text.parse::<i64>().ok())
                    .or_else(|| text.parse::<f64>().ok().and_then(float_to_integer))
            }
            _ => None,
        }
    }
}

/// Hexadecimal integer numerals (`0x1F`, `-0XfF`). Digits past 64 bits wrap
/// around instead of overflowing.
fn hex_to_integer(text: &str) -> Option<i64> {
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let digits = rest
        .strip_prefix("0x")
        .or_else(|| rest.strip_prefix("0X"))?;
    if digits.is_empty() {
        return None;
    }
    let mut n: u64 = 0;
    for c in digits.chars() {
        n = n.wrapping_mul(16).wrapping_add(u64::from(c.to_digit(16)?));
    }
    let n = n as i64;
    Some(if negative { n.wrapping_neg() } else { n })
}

fn float_to_integer(f: f64) -> Option<i64> {
    // 2^63 is exactly representable; anything at or past it does not fit
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if f.fract() == 0.0 && f >= -LIMIT && f < LIMIT {
        Some(f as i64)
    } else {
        None
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(n) => {
                if n.is_nan() {
                    write!(f, "{}", if n.is_sign_negative() { "-nan" } else { "nan" })
                } else if n.is_infinite() {
                    write!(f, "{}", if *n > 0.0 { "inf" } else { "-inf" })
                } else if n.fract() == 0.0 && n.abs() < 1e16 {
                    write!(f, "{:.1}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => write!(f, "{}", s),
            Value::Table(id) => write!(f, "table: {:#x}", id),
            Value::Function(id) => write!(f, "function: {:#x}", id),
            Value::Userdata(id) => write!(f, "userdata: {:#x}", id),
        }
    }
}
