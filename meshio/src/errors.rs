use std::result;

use thiserror::Error;

use crate::{datatype::Datatype, parameter::Operation};

#[derive(Debug, Error)]
pub enum Error {
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: Datatype, found: Datatype },

    #[error("argument '{field}' is {found}, expected {expected}")]
    ArgumentMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("missing argument '{0}'")]
    MissingArgument(String),

    #[error("unrecognized value for '{attribute}': {value}")]
    UnrecognizedValue { attribute: String, value: String },

    #[error("unexpected attribute datatype {dtype} for '{attribute}'")]
    UnexpectedDatatype { attribute: String, dtype: Datatype },

    #[error("operation {0} is not supported by this backend")]
    UnsupportedOperation(Operation),

    #[error("datatype {0} can not be stored in a dataset")]
    UnsupportedDatatype(Datatype),

    #[error("read-only access: {0}")]
    ReadOnly(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("no attribute named '{0}'")]
    NoSuchAttribute(String),

    #[error("{0} requires a persisted target")]
    NotWritten(Operation),

    #[error("file position was produced by a different backend")]
    ForeignPosition,

    #[error("result cell '{0}' read before it was filled")]
    CellEmpty(&'static str),

    #[error("result cell '{0}' already filled")]
    CellAlreadyFilled(&'static str),

    #[error("region at offset {offset:?} with extent {extent:?} exceeds dataset extent {bounds:?}")]
    OutOfBounds {
        offset: Vec<u64>,
        extent: Vec<u64>,
        bounds: Vec<u64>,
    },

    #[error("an array of extent {extent:?} does not fit in memory")]
    TooLarge { extent: Vec<u64> },

    #[error("buffer holds {got} bytes, region needs {expected}")]
    BufferSize { expected: usize, got: usize },

    #[error("dimension mismatch: expected {expected} dimensions, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("component has neither a dataset nor a constant value")]
    NoDataset,

    #[error("a dataset can not be changed after it has been written")]
    DatasetWritten,

    #[error("constant components hold no chunks")]
    ConstantComponent,

    #[error("a scalar component can not be mixed with named components")]
    ScalarConflict,

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

pub type Result<T> = result::Result<T, Error>;
