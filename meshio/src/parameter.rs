//! The catalog of I/O operations and the parameters each one takes.
//!
//! Every `Operation` has exactly one parameter record. `Parameter` is the sum of all records and
//! `Parameter::to_arguments` erases any of them into the uniform `Arguments` mapping an executor
//! consumes. Both matches are exhaustive, so an operation can't be added without its record and
//! its erasure.
//!
use std::fmt;

use bytes::Bytes;

use crate::{
    argument::{Argument, Arguments},
    attribute::Attribute,
    cell::ResultCell,
    dataset::{Extent, Offset},
    datatype::Datatype,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    WriteAtt,
    ReadAtt,
    DeleteAtt,
    ListAtts,

    CreateDataset,
    OpenDataset,
    WriteDataset,
    ReadDataset,
    DeleteDataset,
    ListDatasets,

    CreateFile,
    OpenFile,
    DeleteFile,

    CreatePath,
    OpenPath,
    DeletePath,
    ListPaths,
}

impl Operation {
    /// Whether the operation modifies storage.
    ///
    pub fn is_write(self) -> bool {
        matches!(
            self,
            Operation::WriteAtt
                | Operation::DeleteAtt
                | Operation::CreateDataset
                | Operation::WriteDataset
                | Operation::DeleteDataset
                | Operation::CreateFile
                | Operation::DeleteFile
                | Operation::CreatePath
                | Operation::DeletePath
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            Operation::WriteAtt => "WRITE_ATT",
            Operation::ReadAtt => "READ_ATT",
            Operation::DeleteAtt => "DELETE_ATT",
            Operation::ListAtts => "LIST_ATTS",
            Operation::CreateDataset => "CREATE_DATASET",
            Operation::OpenDataset => "OPEN_DATASET",
            Operation::WriteDataset => "WRITE_DATASET",
            Operation::ReadDataset => "READ_DATASET",
            Operation::DeleteDataset => "DELETE_DATASET",
            Operation::ListDatasets => "LIST_DATASETS",
            Operation::CreateFile => "CREATE_FILE",
            Operation::OpenFile => "OPEN_FILE",
            Operation::DeleteFile => "DELETE_FILE",
            Operation::CreatePath => "CREATE_PATH",
            Operation::OpenPath => "OPEN_PATH",
            Operation::DeletePath => "DELETE_PATH",
            Operation::ListPaths => "LIST_PATHS",
        };

        f.write_str(token)
    }
}

#[derive(Clone, Debug)]
pub struct WriteAtt {
    pub name: String,
    pub dtype: Datatype,
    pub resource: Attribute,
}

impl WriteAtt {
    pub fn new<S, A>(name: S, value: A) -> Self
    where
        S: Into<String>,
        A: Into<Attribute>,
    {
        let resource = value.into();
        Self {
            name: name.into(),
            dtype: resource.dtype(),
            resource,
        }
    }
}

/// Read an attribute. `dtype` and `resource` are filled by the executor.
///
#[derive(Clone, Debug)]
pub struct ReadAtt {
    pub name: String,
    pub dtype: ResultCell<Datatype>,
    pub resource: ResultCell<Attribute>,
}

impl ReadAtt {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            dtype: ResultCell::new("dtype"),
            resource: ResultCell::new("resource"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DeleteAtt {
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct ListAtts {
    pub attributes: ResultCell<Vec<String>>,
}

impl ListAtts {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for ListAtts {
    fn default() -> Self {
        Self {
            attributes: ResultCell::new("attributes"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CreateDataset {
    pub name: String,
    pub extent: Extent,
    pub dtype: Datatype,
}

/// Open an existing dataset. `dtype` and `extent` are filled by the executor.
///
#[derive(Clone, Debug)]
pub struct OpenDataset {
    pub name: String,
    pub dtype: ResultCell<Datatype>,
    pub extent: ResultCell<Extent>,
}

impl OpenDataset {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            dtype: ResultCell::new("dtype"),
            extent: ResultCell::new("extent"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct WriteDataset {
    pub extent: Extent,
    pub offset: Offset,
    pub dtype: Datatype,
    pub data: Bytes,
}

#[derive(Clone, Debug)]
pub struct ReadDataset {
    pub extent: Extent,
    pub offset: Offset,
    pub dtype: Datatype,
    pub data: ResultCell<Bytes>,
}

impl ReadDataset {
    pub fn new(extent: Extent, offset: Offset, dtype: Datatype) -> Self {
        Self {
            extent,
            offset,
            dtype,
            data: ResultCell::new("data"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DeleteDataset {
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct ListDatasets {
    pub datasets: ResultCell<Vec<String>>,
}

impl ListDatasets {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for ListDatasets {
    fn default() -> Self {
        Self {
            datasets: ResultCell::new("datasets"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CreateFile {
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct OpenFile {
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct DeleteFile {
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct CreatePath {
    pub path: String,
}

#[derive(Clone, Debug)]
pub struct OpenPath {
    pub path: String,
}

#[derive(Clone, Debug)]
pub struct DeletePath {
    pub path: String,
}

#[derive(Clone, Debug)]
pub struct ListPaths {
    pub paths: ResultCell<Vec<String>>,
}

impl ListPaths {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for ListPaths {
    fn default() -> Self {
        Self {
            paths: ResultCell::new("paths"),
        }
    }
}

/// Any operation's parameters.
///
#[derive(Clone, Debug)]
pub enum Parameter {
    WriteAtt(WriteAtt),
    ReadAtt(ReadAtt),
    DeleteAtt(DeleteAtt),
    ListAtts(ListAtts),

    CreateDataset(CreateDataset),
    OpenDataset(OpenDataset),
    WriteDataset(WriteDataset),
    ReadDataset(ReadDataset),
    DeleteDataset(DeleteDataset),
    ListDatasets(ListDatasets),

    CreateFile(CreateFile),
    OpenFile(OpenFile),
    DeleteFile(DeleteFile),

    CreatePath(CreatePath),
    OpenPath(OpenPath),
    DeletePath(DeletePath),
    ListPaths(ListPaths),
}

macro_rules! Parameter {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Parameter {
                fn from(parameter: $variant) -> Self {
                    Parameter::$variant(parameter)
                }
            }
        )*
    };
}

Parameter!(
    WriteAtt,
    ReadAtt,
    DeleteAtt,
    ListAtts,
    CreateDataset,
    OpenDataset,
    WriteDataset,
    ReadDataset,
    DeleteDataset,
    ListDatasets,
    CreateFile,
    OpenFile,
    DeleteFile,
    CreatePath,
    OpenPath,
    DeletePath,
    ListPaths
);

impl Parameter {
    pub fn operation(&self) -> Operation {
        match self {
            Parameter::WriteAtt(_) => Operation::WriteAtt,
            Parameter::ReadAtt(_) => Operation::ReadAtt,
            Parameter::DeleteAtt(_) => Operation::DeleteAtt,
            Parameter::ListAtts(_) => Operation::ListAtts,
            Parameter::CreateDataset(_) => Operation::CreateDataset,
            Parameter::OpenDataset(_) => Operation::OpenDataset,
            Parameter::WriteDataset(_) => Operation::WriteDataset,
            Parameter::ReadDataset(_) => Operation::ReadDataset,
            Parameter::DeleteDataset(_) => Operation::DeleteDataset,
            Parameter::ListDatasets(_) => Operation::ListDatasets,
            Parameter::CreateFile(_) => Operation::CreateFile,
            Parameter::OpenFile(_) => Operation::OpenFile,
            Parameter::DeleteFile(_) => Operation::DeleteFile,
            Parameter::CreatePath(_) => Operation::CreatePath,
            Parameter::OpenPath(_) => Operation::OpenPath,
            Parameter::DeletePath(_) => Operation::DeletePath,
            Parameter::ListPaths(_) => Operation::ListPaths,
        }
    }

    /// Erase the parameters into the uniform argument mapping.
    ///
    /// Output cells are shared, not copied, so results written by the executor are visible
    /// through the caller's parameter value.
    ///
    pub fn to_arguments(&self) -> Arguments {
        let arguments = Arguments::new();
        match self {
            Parameter::WriteAtt(p) => arguments
                .with("name", Argument::String(p.name.clone()))
                .with("dtype", Argument::Datatype(p.dtype))
                .with("resource", Argument::Resource(p.resource.clone())),
            Parameter::ReadAtt(p) => arguments
                .with("name", Argument::String(p.name.clone()))
                .with("dtype", Argument::DatatypeCell(p.dtype.clone()))
                .with("resource", Argument::ResourceCell(p.resource.clone())),
            Parameter::DeleteAtt(p) => arguments.with("name", Argument::String(p.name.clone())),
            Parameter::ListAtts(p) => {
                arguments.with("attributes", Argument::NamesCell(p.attributes.clone()))
            }
            Parameter::CreateDataset(p) => arguments
                .with("name", Argument::String(p.name.clone()))
                .with("extent", Argument::VecUInt64(p.extent.clone()))
                .with("dtype", Argument::Datatype(p.dtype)),
            Parameter::OpenDataset(p) => arguments
                .with("name", Argument::String(p.name.clone()))
                .with("dtype", Argument::DatatypeCell(p.dtype.clone()))
                .with("extent", Argument::ExtentCell(p.extent.clone())),
            Parameter::WriteDataset(p) => arguments
                .with("extent", Argument::VecUInt64(p.extent.clone()))
                .with("offset", Argument::VecUInt64(p.offset.clone()))
                .with("dtype", Argument::Datatype(p.dtype))
                .with("data", Argument::Buffer(p.data.clone())),
            Parameter::ReadDataset(p) => arguments
                .with("extent", Argument::VecUInt64(p.extent.clone()))
                .with("offset", Argument::VecUInt64(p.offset.clone()))
                .with("dtype", Argument::Datatype(p.dtype))
                .with("data", Argument::BufferCell(p.data.clone())),
            Parameter::DeleteDataset(p) => {
                arguments.with("name", Argument::String(p.name.clone()))
            }
            Parameter::ListDatasets(p) => {
                arguments.with("datasets", Argument::NamesCell(p.datasets.clone()))
            }
            Parameter::CreateFile(p) => arguments.with("name", Argument::String(p.name.clone())),
            Parameter::OpenFile(p) => arguments.with("name", Argument::String(p.name.clone())),
            Parameter::DeleteFile(p) => arguments.with("name", Argument::String(p.name.clone())),
            Parameter::CreatePath(p) => arguments.with("path", Argument::String(p.path.clone())),
            Parameter::OpenPath(p) => arguments.with("path", Argument::String(p.path.clone())),
            Parameter::DeletePath(p) => arguments.with("path", Argument::String(p.path.clone())),
            Parameter::ListPaths(p) => {
                arguments.with("paths", Argument::NamesCell(p.paths.clone()))
            }
        }
    }
}
