//! Typed attribute values.
//!
use paste::paste;

use crate::{
    datatype::Datatype,
    errors::{Error, Result},
};

/// A Rust type that can be carried by an `Attribute`.
///
/// Every implementation corresponds to exactly one `Datatype`.
///
pub trait AttributeType: Sized {
    const DATATYPE: Datatype;

    /// Extract a copy of the value if the attribute holds this type.
    fn extract(attribute: &Attribute) -> Option<Self>;
}

macro_rules! Attribute {
    ($($variant:ident => $type:ty),* ; $($other:ident => $otype:ty),*) => {
        paste! {
            /// A named metadata value: one case per `Datatype`.
            ///
            /// The case is fixed at construction. Use `get` to extract a typed value.
            ///
            #[derive(Clone, Debug, PartialEq)]
            pub enum Attribute {
                $(
                    $variant($type),
                    [<Vec $variant>](Vec<$type>),
                )*
                $(
                    $other($otype),
                )*
            }

            impl Attribute {
                /// The tag of the value held by this attribute.
                pub fn dtype(&self) -> Datatype {
                    match self {
                        $(
                            Attribute::$variant(_) => Datatype::$variant,
                            Attribute::[<Vec $variant>](_) => Datatype::[<Vec $variant>],
                        )*
                        $(
                            Attribute::$other(_) => Datatype::$other,
                        )*
                    }
                }
            }

            $(
                impl AttributeType for $type {
                    const DATATYPE: Datatype = Datatype::$variant;

                    fn extract(attribute: &Attribute) -> Option<Self> {
                        match attribute {
                            Attribute::$variant(value) => Some(value.clone()),
                            _ => None,
                        }
                    }
                }

                impl AttributeType for Vec<$type> {
                    const DATATYPE: Datatype = Datatype::[<Vec $variant>];

                    fn extract(attribute: &Attribute) -> Option<Self> {
                        match attribute {
                            Attribute::[<Vec $variant>](value) => Some(value.clone()),
                            _ => None,
                        }
                    }
                }

                impl From<$type> for Attribute {
                    fn from(value: $type) -> Self {
                        Attribute::$variant(value)
                    }
                }

                impl From<Vec<$type>> for Attribute {
                    fn from(value: Vec<$type>) -> Self {
                        Attribute::[<Vec $variant>](value)
                    }
                }
            )*

            $(
                impl AttributeType for $otype {
                    const DATATYPE: Datatype = Datatype::$other;

                    fn extract(attribute: &Attribute) -> Option<Self> {
                        match attribute {
                            Attribute::$other(value) => Some(value.clone()),
                            _ => None,
                        }
                    }
                }

                impl From<$otype> for Attribute {
                    fn from(value: $otype) -> Self {
                        Attribute::$other(value)
                    }
                }
            )*
        }
    };
}

Attribute!(
    Char => char,
    Int16 => i16,
    Int32 => i32,
    Int64 => i64,
    UInt16 => u16,
    UInt32 => u32,
    UInt64 => u64,
    Float => f32,
    Double => f64,
    String => String;
    ArrDbl7 => [f64; 7],
    Bool => bool
);

impl Attribute {
    /// Get the value as `T`.
    ///
    /// Fails with `Error::TypeMismatch` if the attribute holds anything other than `T`. Values are
    /// never converted between types.
    ///
    pub fn get<T>(&self) -> Result<T>
    where
        T: AttributeType,
    {
        T::extract(self).ok_or(Error::TypeMismatch {
            expected: T::DATATYPE,
            found: self.dtype(),
        })
    }
}

impl From<&str> for Attribute {
    fn from(value: &str) -> Self {
        Attribute::String(value.to_string())
    }
}
