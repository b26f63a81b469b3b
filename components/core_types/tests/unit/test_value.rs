//! Unit tests for Value

use core_types::Value;

#[cfg(test)]
mod value_tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Nil.type_name(), "nil");
        assert_eq!(Value::Boolean(true).type_name(), "boolean");
        assert_eq!(Value::Integer(1).type_name(), "number");
        assert_eq!(Value::Float(1.5).type_name(), "number");
        assert_eq!(Value::from("s").type_name(), "string");
        assert_eq!(Value::Table(1).type_name(), "table");
        assert_eq!(Value::Function(1).type_name(), "function");
        assert_eq!(Value::Userdata(1).type_name(), "userdata");
    }

    #[test]
    fn test_converts_to_string() {
        assert!(Value::Integer(1).converts_to_string());
        assert!(Value::from("x").converts_to_string());
        assert!(!Value::Table(0).converts_to_string());
        assert!(!Value::Nil.converts_to_string());
    }

    #[test]
    fn test_to_integer_exact() {
        assert_eq!(Value::Integer(-4).to_integer_exact(), Some(-4));
        assert_eq!(Value::Float(-4.0).to_integer_exact(), Some(-4));
        assert_eq!(Value::Float(0.1).to_integer_exact(), None);
        assert_eq!(Value::from(" 7 ").to_integer_exact(), Some(7));
        assert_eq!(Value::from("7.0").to_integer_exact(), Some(7));
        assert_eq!(Value::from("seven").to_integer_exact(), None);
        assert_eq!(Value::Boolean(true).to_integer_exact(), None);
    }

    #[test]
    fn test_to_integer_exact_hex_strings() {
        assert_eq!(Value::from("0x10").to_integer_exact(), Some(16));
        assert_eq!(Value::from(" 0XfF ").to_integer_exact(), Some(255));
        assert_eq!(Value::from("-0x10").to_integer_exact(), Some(-16));
        assert_eq!(Value::from("0xffffffffffffffff").to_integer_exact(), Some(-1));
        assert_eq!(Value::from("0x").to_integer_exact(), None);
        assert_eq!(Value::from("0x1g").to_integer_exact(), None);
    }

    #[test]
    fn test_default_is_nil() {
        assert_eq!(Value::default(), Value::Nil);
    }

    #[test]
    fn test_object_identity() {
        assert_eq!(Value::Table(3), Value::Table(3));
        assert_ne!(Value::Table(3), Value::Userdata(3));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Nil.to_string(), "nil");
        assert_eq!(Value::Boolean(false).to_string(), "false");
        assert_eq!(Value::Integer(42).to_string(), "42");
        assert_eq!(Value::from("hi").to_string(), "hi");
    }
}
