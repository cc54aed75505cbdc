use std::fmt;

/// Tag identifying which concrete kind an attribute value or a dataset element holds.
///
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Datatype {
    Char,
    Int16,
    Int32,
    Int64,
    UInt16,
    UInt32,
    UInt64,
    Float,
    Double,
    String,

    VecChar,
    VecInt16,
    VecInt32,
    VecInt64,
    VecUInt16,
    VecUInt32,
    VecUInt64,
    VecFloat,
    VecDouble,
    VecString,

    ArrDbl7,
    Bool,
}

impl Datatype {
    /// Whether values of this type are variable length sequences.
    ///
    pub fn is_vector(self) -> bool {
        matches!(
            self,
            Datatype::VecChar
                | Datatype::VecInt16
                | Datatype::VecInt32
                | Datatype::VecInt64
                | Datatype::VecUInt16
                | Datatype::VecUInt32
                | Datatype::VecUInt64
                | Datatype::VecFloat
                | Datatype::VecDouble
                | Datatype::VecString
        )
    }

    /// Whether this type, or the element type of this vector type, is floating point.
    ///
    pub fn is_floating_point(self) -> bool {
        matches!(
            self,
            Datatype::Float | Datatype::Double | Datatype::VecFloat | Datatype::VecDouble
        )
    }

    /// Size in bytes of one element, for types that can be stored in a dataset.
    ///
    /// Returns `None` for types that only exist as attributes.
    ///
    pub fn element_size(self) -> Option<usize> {
        match self {
            Datatype::Int16 | Datatype::UInt16 => Some(2),
            Datatype::Int32 | Datatype::UInt32 | Datatype::Float => Some(4),
            Datatype::Int64 | Datatype::UInt64 | Datatype::Double => Some(8),
            _ => None,
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            Datatype::Char => "CHAR",
            Datatype::Int16 => "INT16",
            Datatype::Int32 => "INT32",
            Datatype::Int64 => "INT64",
            Datatype::UInt16 => "UINT16",
            Datatype::UInt32 => "UINT32",
            Datatype::UInt64 => "UINT64",
            Datatype::Float => "FLOAT",
            Datatype::Double => "DOUBLE",
            Datatype::String => "STRING",
            Datatype::VecChar => "VEC_CHAR",
            Datatype::VecInt16 => "VEC_INT16",
            Datatype::VecInt32 => "VEC_INT32",
            Datatype::VecInt64 => "VEC_INT64",
            Datatype::VecUInt16 => "VEC_UINT16",
            Datatype::VecUInt32 => "VEC_UINT32",
            Datatype::VecUInt64 => "VEC_UINT64",
            Datatype::VecFloat => "VEC_FLOAT",
            Datatype::VecDouble => "VEC_DOUBLE",
            Datatype::VecString => "VEC_STRING",
            Datatype::ArrDbl7 => "ARR_DBL_7",
            Datatype::Bool => "BOOL",
        };

        f.write_str(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_vector() {
        assert!(Datatype::VecString.is_vector());
        assert!(Datatype::VecUInt64.is_vector());
        assert!(!Datatype::String.is_vector());
        assert!(!Datatype::ArrDbl7.is_vector());
    }

    #[test]
    fn test_is_floating_point() {
        assert!(Datatype::Float.is_floating_point());
        assert!(Datatype::VecDouble.is_floating_point());
        assert!(!Datatype::Int64.is_floating_point());
        assert!(!Datatype::ArrDbl7.is_floating_point());
    }

    #[test]
    fn test_element_size() {
        assert_eq!(Datatype::Int16.element_size(), Some(2));
        assert_eq!(Datatype::Float.element_size(), Some(4));
        assert_eq!(Datatype::UInt64.element_size(), Some(8));
        assert_eq!(Datatype::String.element_size(), None);
        assert_eq!(Datatype::VecDouble.element_size(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Datatype::Double.to_string(), "DOUBLE");
        assert_eq!(Datatype::VecString.to_string(), "VEC_STRING");
    }
}
