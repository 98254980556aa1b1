//! Система типов IcedCoffee.
//!
//! Пять скалярных типов сравниваются по варианту, массивы структурно
//! по базовому типу.

use serde::{Deserialize, Serialize};

/// Тип значения.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Bool,
    Int,
    Double,
    String,
    Void,
    /// `array[T]`
    Array(Box<Type>),
}

impl Type {
    /// Создать тип массива.
    pub fn array(base: Type) -> Type {
        Type::Array(Box::new(base))
    }

    /// int или double.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Double)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(_))
    }

    /// Базовый тип массива.
    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::Array(base) => Some(base),
            _ => None,
        }
    }

    /// Можно ли значение типа `source` положить в место типа `self`.
    ///
    /// Числа взаимозаменяемы; для массивов базовый тип не сверяется.
    pub fn accepts(&self, source: &Type) -> bool {
        match (self, source) {
            (target, source) if target.is_numeric() && source.is_numeric() => true,
            (Type::Array(_), Type::Array(_)) => true,
            (target, source) => target == source,
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Bool => write!(f, "bool"),
            Type::Int => write!(f, "int"),
            Type::Double => write!(f, "double"),
            Type::String => write!(f, "string"),
            Type::Void => write!(f, "void"),
            Type::Array(base) => write!(f, "array[{}]", base),
        }
    }
}
