//! Backend agnostic core for reading and writing meshes of scientific data.
//!
//! Domain objects (`MeshFile`, `Mesh`, `MeshComponent`) never touch storage directly. Every change
//! becomes an `IOTask` queued on an `IOHandler`, which runs the queue in order against a `Backend`
//! when flushed. Results of reads are delivered through `ResultCell`s shared between the task and
//! the caller.
//!
mod argument;
mod attributable;
mod attribute;
mod cell;
mod component;
mod dataset;
mod datatype;
mod errors;
mod file;
mod handler;
mod memory;
mod mesh;
mod parameter;
mod task;
mod writable;

#[cfg(test)]
mod testing;

pub use argument::Argument;
pub use argument::Arguments;
pub use attributable::Attributable;
pub use attribute::Attribute;
pub use attribute::AttributeType;
pub use cell::ResultCell;
pub use component::MeshComponent;
pub use dataset::DatasetDescriptor;
pub use dataset::Element;
pub use dataset::Extent;
pub use dataset::Offset;
pub use datatype::Datatype;
pub use errors::Error;
pub use errors::Result;
pub use file::MeshFile;
pub use handler::AccessMode;
pub use handler::Backend;
pub use handler::IOHandler;
pub use handler::QueueHandler;
pub use memory::MemoryBackend;
pub use memory::MemoryHandler;
pub use memory::MemoryPosition;
pub use mesh::DataOrder;
pub use mesh::Geometry;
pub use mesh::Mesh;
pub use mesh::SCALAR;
pub use parameter::{
    CreateDataset, CreateFile, CreatePath, DeleteAtt, DeleteDataset, DeleteFile, DeletePath,
    ListAtts, ListDatasets, ListPaths, OpenDataset, OpenFile, OpenPath, Operation, Parameter,
    ReadAtt, ReadDataset, WriteAtt, WriteDataset,
};
pub use task::IOTask;
pub use writable::FilePosition;
pub use writable::Writable;
