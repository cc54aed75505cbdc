use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
};

use ndarray::{ArrayD, ArrayViewD};
use num_traits::Float;

use crate::{
    attributable::Attributable,
    attribute::Attribute,
    dataset::{self, DatasetDescriptor, Element, Extent, Offset},
    datatype::Datatype,
    errors::{Error, Result},
    handler::IOHandler,
    parameter::{
        CreateDataset, CreatePath, OpenDataset, OpenPath, Operation, ReadDataset, WriteDataset,
    },
    writable::Writable,
};

/// Attributes read explicitly by `MeshComponent::read`
pub(crate) const COMPONENT_ATTRIBUTES: [&str; 4] = ["position", "unitSI", "value", "shape"];

/// One component of a mesh, e.g. the `x` component of an electric field.
///
/// A component is either backed by a dataset, written chunk by chunk, or is constant, in which case
/// only its value and shape are stored.
///
pub struct MeshComponent {
    attributable: Attributable,
    dataset: Option<DatasetDescriptor>,
    constant: bool,

    /// Chunks stored since the last flush
    chunks: Vec<WriteDataset>,
}

impl MeshComponent {
    pub fn new(handler: Arc<dyn IOHandler>) -> Self {
        let mut attributable = Attributable::new(handler);
        attributable.init_attribute("position", vec![0.0_f64]);
        attributable.init_attribute("unitSI", 1.0_f64);

        Self {
            attributable,
            dataset: None,
            constant: false,
            chunks: vec![],
        }
    }

    pub fn dataset(&self) -> Option<&DatasetDescriptor> {
        self.dataset.as_ref()
    }

    /// Declare the shape and element type of the dataset backing this component.
    ///
    /// Can't be changed once the dataset has been written.
    ///
    pub fn reset_dataset(&mut self, descriptor: DatasetDescriptor) -> Result<&mut Self> {
        if self.written() {
            return Err(Error::DatasetWritten);
        }
        self.dataset = Some(descriptor);
        self.constant = false;

        Ok(self)
    }

    /// Make this a constant component: every element of an array of `extent` is `value`.
    ///
    pub fn make_constant<A>(&mut self, value: A, extent: Extent) -> Result<&mut Self>
    where
        A: Into<Attribute>,
    {
        if self.written() {
            return Err(Error::DatasetWritten);
        }
        let value = value.into();
        self.dataset = Some(DatasetDescriptor::new(value.dtype(), extent.clone()));
        self.constant = true;
        self.attributable.set_attribute("value", value)?;
        self.attributable.set_attribute("shape", extent)?;

        Ok(self)
    }

    pub fn is_constant(&self) -> bool {
        self.constant
    }

    pub fn constant_value(&self) -> Option<&Attribute> {
        if self.constant {
            self.attributable.get_attribute("value").ok()
        } else {
            None
        }
    }

    /// Position of the component within a grid cell, relative to the cell size.
    ///
    pub fn position(&self) -> Result<Vec<f64>> {
        match self.get_attribute("position")? {
            Attribute::VecFloat(position) => Ok(position.iter().map(|&p| p as f64).collect()),
            Attribute::VecDouble(position) => Ok(position.clone()),
            other => Err(Error::TypeMismatch {
                expected: Datatype::VecDouble,
                found: other.dtype(),
            }),
        }
    }

    pub fn set_position<T>(&mut self, position: Vec<T>) -> Result<&mut Self>
    where
        T: Float,
        Vec<T>: Into<Attribute>,
    {
        self.set_attribute("position", position)?;

        Ok(self)
    }

    pub fn unit_si(&self) -> Result<f64> {
        self.attribute("unitSI")
    }

    pub fn set_unit_si(&mut self, unit_si: f64) -> Result<&mut Self> {
        self.set_attribute("unitSI", unit_si)?;

        Ok(self)
    }

    /// Queue a chunk of data to be written at `offset` on the next flush.
    ///
    pub fn store_chunk<T>(&mut self, data: ArrayViewD<'_, T>, offset: Offset) -> Result<()>
    where
        T: Element,
    {
        if self.constant {
            return Err(Error::ConstantComponent);
        }
        let descriptor = self.dataset.as_ref().ok_or(Error::NoDataset)?;
        if descriptor.dtype != T::DATATYPE {
            return Err(Error::TypeMismatch {
                expected: descriptor.dtype,
                found: T::DATATYPE,
            });
        }

        let extent: Extent = data.shape().iter().map(|&n| n as u64).collect();
        dataset::check_rank(descriptor.rank(), &offset, &extent)?;

        self.chunks.push(WriteDataset {
            extent,
            offset,
            dtype: T::DATATYPE,
            data: dataset::encode(&data),
        });

        Ok(())
    }

    /// Read a region of the dataset from storage.
    ///
    /// Only sees chunks that have already been flushed.
    ///
    pub fn load_chunk<T>(&self, offset: Offset, extent: Extent) -> Result<ArrayD<T>>
    where
        T: Element,
    {
        if self.constant {
            return Err(Error::ConstantComponent);
        }
        if !self.written() {
            return Err(Error::NotWritten(Operation::ReadDataset));
        }
        let descriptor = self.dataset.as_ref().ok_or(Error::NoDataset)?;
        if descriptor.dtype != T::DATATYPE {
            return Err(Error::TypeMismatch {
                expected: descriptor.dtype,
                found: T::DATATYPE,
            });
        }
        dataset::check_rank(descriptor.rank(), &offset, &extent)?;

        let read = ReadDataset::new(extent.clone(), offset, T::DATATYPE);
        self.enqueue(&read);
        self.handler().flush()?;

        dataset::decode(&read.data.get()?, &extent)
    }

    /// Write this component under `name` in its parent.
    ///
    pub(crate) fn flush(&mut self, name: &str) -> Result<()> {
        if !self.written() {
            let descriptor = self.dataset.as_ref().ok_or(Error::NoDataset)?;
            if self.constant {
                self.enqueue(&CreatePath {
                    path: name.to_string(),
                });
            } else {
                self.enqueue(&CreateDataset {
                    name: name.to_string(),
                    extent: descriptor.extent.clone(),
                    dtype: descriptor.dtype,
                });
            }
            self.handler().flush()?;
        }

        if !self.chunks.is_empty() {
            for chunk in self.chunks.drain(..) {
                self.attributable.enqueue(&chunk);
            }
            self.attributable.handler().flush()?;
        }

        self.attributable.flush_attributes()
    }

    /// Open a constant component stored as a path under its parent.
    ///
    pub(crate) fn open_path(&mut self, path: &str) -> Result<()> {
        self.enqueue(&OpenPath {
            path: path.to_string(),
        });
        self.handler().flush()?;
        self.constant = true;

        Ok(())
    }

    /// Open a component stored as a dataset under its parent and take on its shape.
    ///
    pub(crate) fn open_dataset(&mut self, name: &str) -> Result<()> {
        let open = OpenDataset::new(name);
        self.enqueue(&open);
        self.handler().flush()?;

        // The dataset exists already, so allow resetting it just this once
        let descriptor = DatasetDescriptor::new(open.dtype.get()?, open.extent.get()?);
        self.writable().set_written(false);
        let reset = self.reset_dataset(descriptor).map(|_| ());
        self.writable().set_written(true);

        reset
    }

    /// Open the constant component of a scalar mesh, stored in the mesh's own group.
    ///
    pub(crate) fn open_shared(&mut self, mesh: &Writable) {
        if let Some(parent) = mesh.parent() {
            self.writable().set_parent(&parent);
        }
        self.writable().set_position(mesh.position());
        self.writable().set_written(true);
        self.constant = true;
    }

    /// Reconstruct this component from storage.
    ///
    pub(crate) fn read(&mut self) -> Result<()> {
        self.read_with(true)
    }

    /// Reconstruct the component of a scalar mesh. Only the component's own attributes are read,
    /// everything else in the shared attribute set belongs to the mesh.
    ///
    pub(crate) fn read_shared(&mut self) -> Result<()> {
        self.read_with(false)
    }

    fn read_with(&mut self, generic: bool) -> Result<()> {
        self.writable().set_written(false);
        let result = self.read_contents(generic);
        self.writable().set_written(true);
        result?;
        self.attributable.mark_clean();

        Ok(())
    }

    fn read_contents(&mut self, generic: bool) -> Result<()> {
        let (dtype, position) = self.read_attribute("position")?;
        match dtype {
            Datatype::VecFloat | Datatype::VecDouble => self.set_attribute("position", position)?,
            dtype => return Err(unexpected("position", dtype)),
        }

        let (dtype, unit_si) = self.read_attribute("unitSI")?;
        match dtype {
            Datatype::Double => self.set_attribute("unitSI", unit_si)?,
            dtype => return Err(unexpected("unitSI", dtype)),
        }

        if self.constant {
            let (_, value) = self.read_attribute("value")?;
            let (dtype, shape) = self.read_attribute("shape")?;
            let shape: Extent = match dtype {
                Datatype::VecUInt64 => shape.get()?,
                dtype => return Err(unexpected("shape", dtype)),
            };
            self.dataset = Some(DatasetDescriptor::new(value.dtype(), shape.clone()));
            self.set_attribute("value", value)?;
            self.set_attribute("shape", shape)?;
        }

        if generic {
            self.attributable.read_attributes(&COMPONENT_ATTRIBUTES)?;
        }

        Ok(())
    }
}

pub(crate) fn unexpected(attribute: &str, dtype: Datatype) -> Error {
    Error::UnexpectedDatatype {
        attribute: attribute.to_string(),
        dtype,
    }
}

impl Deref for MeshComponent {
    type Target = Attributable;

    fn deref(&self) -> &Self::Target {
        &self.attributable
    }
}

impl DerefMut for MeshComponent {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.attributable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::{array, s, Ix2};

    use crate::{
        handler::AccessMode,
        parameter::{CreateFile, WriteAtt},
        testing,
    };

    fn root(handler: &Arc<dyn IOHandler>) -> Writable {
        let root = Writable::new();
        handler.enqueue(crate::task::IOTask::new(
            &root,
            &CreateFile {
                name: String::from("data"),
            },
        ));
        handler.flush().unwrap();

        root
    }

    fn component(handler: &Arc<dyn IOHandler>, root: &Writable) -> MeshComponent {
        let component = MeshComponent::new(Arc::clone(handler));
        component.writable().set_parent(root);

        component
    }

    #[test]
    fn test_defaults() {
        let (_, handler) = testing::handler(AccessMode::Create);
        let component = MeshComponent::new(handler);
        assert_eq!(component.position().unwrap(), vec![0.0]);
        assert_eq!(component.unit_si().unwrap(), 1.0);
        assert!(component.dataset().is_none());
        assert!(!component.is_constant());
    }

    #[test]
    fn test_flush_without_dataset() {
        let (_, handler) = testing::handler(AccessMode::Create);
        let root = root(&handler);
        let mut component = component(&handler, &root);
        assert!(matches!(component.flush("x"), Err(Error::NoDataset)));
    }

    #[test]
    fn test_store_and_load_chunks() {
        let (recorder, handler) = testing::handler(AccessMode::Create);
        let root = root(&handler);
        let mut component = component(&handler, &root);
        component
            .reset_dataset(DatasetDescriptor::new(Datatype::Double, vec![4, 3]))
            .unwrap();

        let top = array![[1.0_f64, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let bottom = array![[7.0_f64, 8.0, 9.0], [10.0, 11.0, 12.0]];
        component.store_chunk(top.view().into_dyn(), vec![0, 0]).unwrap();
        component.store_chunk(bottom.view().into_dyn(), vec![2, 0]).unwrap();
        assert_eq!(recorder.backend().count(Operation::WriteDataset), 0);

        component.flush("x").unwrap();
        assert!(component.written());
        assert_eq!(recorder.backend().count(Operation::CreateDataset), 1);
        assert_eq!(recorder.backend().count(Operation::WriteDataset), 2);

        let all: ArrayD<f64> = component.load_chunk(vec![0, 0], vec![4, 3]).unwrap();
        let all = all.into_dimensionality::<Ix2>().unwrap();
        assert_eq!(all.slice(s![0..2, ..]), top);
        assert_eq!(all.slice(s![2..4, ..]), bottom);

        let column: ArrayD<f64> = component.load_chunk(vec![1, 1], vec![3, 1]).unwrap();
        assert_eq!(column, array![[5.0], [8.0], [11.0]].into_dyn());

        // Chunks are only written once
        component.flush("x").unwrap();
        assert_eq!(recorder.backend().count(Operation::CreateDataset), 1);
        assert_eq!(recorder.backend().count(Operation::WriteDataset), 2);
    }

    #[test]
    fn test_store_chunk_checks() {
        let (_, handler) = testing::handler(AccessMode::Create);
        let root = root(&handler);
        let mut component = component(&handler, &root);
        let data = array![1_i32, 2].into_dyn();
        assert!(matches!(
            component.store_chunk(data.view(), vec![0]),
            Err(Error::NoDataset)
        ));

        component
            .reset_dataset(DatasetDescriptor::new(Datatype::Int64, vec![4]))
            .unwrap();
        assert!(matches!(
            component.store_chunk(data.view(), vec![0]),
            Err(Error::TypeMismatch {
                expected: Datatype::Int64,
                found: Datatype::Int32
            })
        ));

        let data = array![1_i64, 2].into_dyn();
        assert!(matches!(
            component.store_chunk(data.view(), vec![0, 0]),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_out_of_bounds_chunk_fails_flush() {
        let (_, handler) = testing::handler(AccessMode::Create);
        let root = root(&handler);
        let mut component = component(&handler, &root);
        component
            .reset_dataset(DatasetDescriptor::new(Datatype::UInt16, vec![4]))
            .unwrap();
        let data = array![1_u16, 2, 3].into_dyn();
        component.store_chunk(data.view(), vec![2]).unwrap();

        assert!(matches!(
            component.flush("x"),
            Err(Error::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_load_before_flush() {
        let (_, handler) = testing::handler(AccessMode::Create);
        let mut component = MeshComponent::new(handler);
        component
            .reset_dataset(DatasetDescriptor::new(Datatype::Float, vec![4]))
            .unwrap();
        assert!(matches!(
            component.load_chunk::<f32>(vec![0], vec![4]),
            Err(Error::NotWritten(Operation::ReadDataset))
        ));
    }

    #[test]
    fn test_reset_after_write() {
        let (_, handler) = testing::handler(AccessMode::Create);
        let root = root(&handler);
        let mut component = component(&handler, &root);
        component
            .reset_dataset(DatasetDescriptor::new(Datatype::Float, vec![4]))
            .unwrap();
        component.flush("x").unwrap();

        assert!(matches!(
            component.reset_dataset(DatasetDescriptor::new(Datatype::Float, vec![8])),
            Err(Error::DatasetWritten)
        ));
    }

    #[test]
    fn test_constant_round_trip() {
        let (recorder, handler) = testing::handler(AccessMode::Create);
        let root = root(&handler);
        let mut component = component(&handler, &root);
        component.make_constant(3.5_f64, vec![10, 10]).unwrap();
        component.set_position(vec![0.5_f32, 0.0]).unwrap();
        component.flush("rho").unwrap();

        assert_eq!(recorder.backend().count(Operation::CreatePath), 1);
        assert_eq!(recorder.backend().count(Operation::CreateDataset), 0);

        let mut read = MeshComponent::new(Arc::clone(&handler));
        read.writable().set_parent(&root);
        read.open_path("rho").unwrap();
        read.read().unwrap();

        assert!(read.is_constant());
        assert!(read.written());
        assert!(!read.is_dirty());
        assert_eq!(read.constant_value(), Some(&Attribute::Double(3.5)));
        assert_eq!(
            read.dataset(),
            Some(&DatasetDescriptor::new(Datatype::Double, vec![10, 10]))
        );
        assert_eq!(read.position().unwrap(), vec![0.5, 0.0]);
        assert!(matches!(
            read.store_chunk(array![1.0_f64].into_dyn().view(), vec![0, 0]),
            Err(Error::ConstantComponent)
        ));
    }

    #[test]
    fn test_open_dataset() {
        let (_, handler) = testing::handler(AccessMode::Create);
        let root = root(&handler);
        let mut component = component(&handler, &root);
        component
            .reset_dataset(DatasetDescriptor::new(Datatype::Int16, vec![2, 2]))
            .unwrap();
        component.set_attribute("comment", "fine").unwrap();
        component.flush("x").unwrap();

        let mut read = MeshComponent::new(Arc::clone(&handler));
        read.writable().set_parent(&root);
        read.open_dataset("x").unwrap();
        read.read().unwrap();

        assert!(!read.is_constant());
        assert_eq!(
            read.dataset(),
            Some(&DatasetDescriptor::new(Datatype::Int16, vec![2, 2]))
        );
        assert_eq!(read.attribute::<String>("comment").unwrap(), "fine");
    }

    #[test]
    fn test_read_unexpected_unit_si() {
        let (_, handler) = testing::handler(AccessMode::Create);
        let root = root(&handler);
        let mut component = component(&handler, &root);
        component
            .reset_dataset(DatasetDescriptor::new(Datatype::Int16, vec![2]))
            .unwrap();
        component.flush("x").unwrap();
        component.enqueue(&WriteAtt::new("unitSI", "metre"));
        handler.flush().unwrap();

        match component.read() {
            Err(Error::UnexpectedDatatype { attribute, dtype }) => {
                assert_eq!(attribute, "unitSI");
                assert_eq!(dtype, Datatype::String);
            }
            other => panic!("Expected unexpected datatype, got {other:?}"),
        }
        assert!(component.written());
        assert_eq!(component.unit_si().unwrap(), 1.0);
    }
}
