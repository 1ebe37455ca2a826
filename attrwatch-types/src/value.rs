//! Typed attribute values extracted from managed components.

use std::collections::BTreeMap;
use std::fmt;

/// The declared value type of a managed attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueKind {
    Bool,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Char,
    Text,
}

impl ValueKind {
    /// Whether values of this kind can participate in counter deltas
    /// and ratio arithmetic.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ValueKind::Byte
                | ValueKind::Short
                | ValueKind::Int
                | ValueKind::Long
                | ValueKind::Float
                | ValueKind::Double
        )
    }
}

/// One extracted attribute value.
///
/// Composite attributes carry a record of named sub-fields; everything else
/// is a scalar. Values are owned and detached from the component they were
/// read from.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttrValue {
    Bool(bool),
    Byte(u8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    Text(String),
    /// A nested record of named sub-fields.
    Composite(BTreeMap<String, AttrValue>),
}

impl AttrValue {
    /// The scalar kind of this value. Composite values have no scalar kind.
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            AttrValue::Bool(_) => Some(ValueKind::Bool),
            AttrValue::Byte(_) => Some(ValueKind::Byte),
            AttrValue::Short(_) => Some(ValueKind::Short),
            AttrValue::Int(_) => Some(ValueKind::Int),
            AttrValue::Long(_) => Some(ValueKind::Long),
            AttrValue::Float(_) => Some(ValueKind::Float),
            AttrValue::Double(_) => Some(ValueKind::Double),
            AttrValue::Char(_) => Some(ValueKind::Char),
            AttrValue::Text(_) => Some(ValueKind::Text),
            AttrValue::Composite(_) => None,
        }
    }

    /// Widen a numeric value to f64 for delta and ratio arithmetic.
    ///
    /// Non-numeric values (bool, char, text, composite) return `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Byte(v) => Some(f64::from(*v)),
            AttrValue::Short(v) => Some(f64::from(*v)),
            AttrValue::Int(v) => Some(f64::from(*v)),
            AttrValue::Long(v) => Some(*v as f64),
            AttrValue::Float(v) => Some(f64::from(*v)),
            AttrValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Look up a sub-field of a composite value by exact name.
    pub fn field(&self, name: &str) -> Option<&AttrValue> {
        match self {
            AttrValue::Composite(fields) => fields.get(name),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(v) => write!(f, "{v}"),
            AttrValue::Byte(v) => write!(f, "{v}"),
            AttrValue::Short(v) => write!(f, "{v}"),
            AttrValue::Int(v) => write!(f, "{v}"),
            AttrValue::Long(v) => write!(f, "{v}"),
            AttrValue::Float(v) => write!(f, "{v}"),
            AttrValue::Double(v) => write!(f, "{v}"),
            AttrValue::Char(v) => write!(f, "{v}"),
            AttrValue::Text(v) => write!(f, "{v}"),
            AttrValue::Composite(fields) => {
                write!(f, "{{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}={value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for AttrValue {
            fn from(v: $ty) -> Self {
                AttrValue::$variant(v)
            }
        })*
    };
}

impl_from! {
    bool => Bool,
    u8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    char => Char,
    String => Text,
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Text(v.to_string())
    }
}
