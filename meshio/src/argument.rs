//! The uniform argument mapping seen by executors.
//!
use std::{collections::BTreeMap, ops::Deref};

use bytes::Bytes;

use crate::{
    attribute::Attribute,
    cell::ResultCell,
    dataset::Extent,
    datatype::Datatype,
    errors::{Error, Result},
};

/// A single command argument.
///
/// The first five cases are values supplied by the caller. The `*Cell` cases are output slots the
/// executor fills while flushing.
///
#[derive(Clone, Debug)]
pub enum Argument {
    String(String),
    VecUInt64(Vec<u64>),
    Buffer(Bytes),
    Datatype(Datatype),
    Resource(Attribute),

    DatatypeCell(ResultCell<Datatype>),
    ExtentCell(ResultCell<Extent>),
    ResourceCell(ResultCell<Attribute>),
    NamesCell(ResultCell<Vec<String>>),
    BufferCell(ResultCell<Bytes>),
}

impl Argument {
    /// Name of the case held by this argument.
    pub fn kind(&self) -> &'static str {
        match self {
            Argument::String(_) => "String",
            Argument::VecUInt64(_) => "VecUInt64",
            Argument::Buffer(_) => "Buffer",
            Argument::Datatype(_) => "Datatype",
            Argument::Resource(_) => "Resource",
            Argument::DatatypeCell(_) => "DatatypeCell",
            Argument::ExtentCell(_) => "ExtentCell",
            Argument::ResourceCell(_) => "ResourceCell",
            Argument::NamesCell(_) => "NamesCell",
            Argument::BufferCell(_) => "BufferCell",
        }
    }
}

macro_rules! accessor {
    ($method:ident, $variant:ident, $type:ty) => {
        pub fn $method(&self, field: &str) -> Result<&$type> {
            match self.get(field)? {
                Argument::$variant(value) => Ok(value),
                other => Err(Error::ArgumentMismatch {
                    field: field.to_string(),
                    expected: stringify!($variant),
                    found: other.kind(),
                }),
            }
        }
    };
}

/// Ordered mapping from stable field name to argument.
///
#[derive(Clone, Debug, Default)]
pub struct Arguments(BTreeMap<String, Argument>);

impl Arguments {
    pub(crate) fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub(crate) fn with(mut self, field: &str, argument: Argument) -> Self {
        self.0.insert(field.to_string(), argument);
        self
    }

    /// Get an argument by field name.
    ///
    /// A missing field is an error, never a default.
    ///
    pub fn get(&self, field: &str) -> Result<&Argument> {
        self.0
            .get(field)
            .ok_or_else(|| Error::MissingArgument(field.to_string()))
    }

    accessor!(string, String, String);
    accessor!(vec_u64, VecUInt64, Vec<u64>);
    accessor!(buffer, Buffer, Bytes);
    accessor!(datatype, Datatype, Datatype);
    accessor!(resource, Resource, Attribute);
    accessor!(datatype_cell, DatatypeCell, ResultCell<Datatype>);
    accessor!(extent_cell, ExtentCell, ResultCell<Extent>);
    accessor!(resource_cell, ResourceCell, ResultCell<Attribute>);
    accessor!(names_cell, NamesCell, ResultCell<Vec<String>>);
    accessor!(buffer_cell, BufferCell, ResultCell<Bytes>);
}

impl Deref for Arguments {
    type Target = BTreeMap<String, Argument>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arguments() -> Arguments {
        Arguments::new()
            .with("name", Argument::String(String::from("E")))
            .with("extent", Argument::VecUInt64(vec![2, 3]))
            .with("dtype", Argument::Datatype(Datatype::Double))
    }

    #[test]
    fn test_accessors() {
        let arguments = arguments();
        assert_eq!(arguments.string("name").unwrap(), "E");
        assert_eq!(arguments.vec_u64("extent").unwrap(), &vec![2, 3]);
        assert_eq!(*arguments.datatype("dtype").unwrap(), Datatype::Double);
    }

    #[test]
    fn test_ordered() {
        let arguments = arguments();
        let keys: Vec<&String> = arguments.keys().collect();
        assert_eq!(keys, vec!["dtype", "extent", "name"]);
    }

    #[test]
    fn test_string_as_vec_u64() {
        match arguments().vec_u64("name") {
            Err(Error::ArgumentMismatch {
                field,
                expected,
                found,
            }) => {
                assert_eq!(field, "name");
                assert_eq!(expected, "VecUInt64");
                assert_eq!(found, "String");
            }
            other => panic!("Expected argument mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_missing() {
        assert!(matches!(
            arguments().string("path"),
            Err(Error::MissingArgument(field)) if field == "path"
        ));
    }
}
