use std::{
    collections::{btree_map::Entry, BTreeMap},
    ops::{Deref, DerefMut},
    sync::Arc,
};

use log::info;

use crate::{
    attributable::Attributable,
    errors::Result,
    handler::IOHandler,
    mesh::Mesh,
    parameter::{
        CreateFile, DeleteDataset, DeleteFile, DeletePath, ListDatasets, ListPaths, OpenFile,
    },
};

/// Root of a storage file: file level attributes and the meshes stored directly under it.
///
/// Meshes stored as groups are read back as regular meshes, meshes stored as bare datasets are
/// read back as scalar meshes.
///
pub struct MeshFile {
    attributable: Attributable,
    name: String,
    meshes: BTreeMap<String, Mesh>,
}

impl MeshFile {
    fn new(handler: Arc<dyn IOHandler>, name: &str) -> Self {
        Self {
            attributable: Attributable::new(handler),
            name: name.to_string(),
            meshes: BTreeMap::new(),
        }
    }

    /// Create a new, empty file, replacing any file of the same name.
    ///
    pub fn create(handler: Arc<dyn IOHandler>, name: &str) -> Result<Self> {
        let file = Self::new(handler, name);
        file.enqueue(&CreateFile {
            name: name.to_string(),
        });
        file.handler().flush()?;
        info!("created file '{name}'");

        Ok(file)
    }

    /// Open an existing file and read everything in it.
    ///
    pub fn open(handler: Arc<dyn IOHandler>, name: &str) -> Result<Self> {
        let mut file = Self::new(handler, name);
        file.enqueue(&OpenFile {
            name: name.to_string(),
        });
        file.handler().flush()?;
        file.read()?;
        info!("opened file '{name}' with {} meshes", file.meshes.len());

        Ok(file)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn meshes(&self) -> &BTreeMap<String, Mesh> {
        &self.meshes
    }

    /// Get a mesh by name, creating it if it doesn't exist.
    ///
    pub fn mesh(&mut self, name: &str) -> &mut Mesh {
        match self.meshes.entry(name.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let mesh = Mesh::new(Arc::clone(self.attributable.handler()));
                mesh.writable().set_parent(self.attributable.writable());
                entry.insert(mesh)
            }
        }
    }

    /// Remove a mesh, also from storage if it has been written.
    ///
    /// Returns whether the mesh existed.
    ///
    pub fn remove_mesh(&mut self, name: &str) -> Result<bool> {
        let mesh = match self.meshes.get(name) {
            Some(mesh) => mesh,
            None => return Ok(false),
        };

        if mesh.written() {
            if mesh.stored_as_dataset() {
                mesh.enqueue(&DeleteDataset {
                    name: name.to_string(),
                });
            } else {
                mesh.enqueue(&DeletePath {
                    path: name.to_string(),
                });
            }
            self.attributable.handler().flush()?;
        }
        self.meshes.remove(name);

        Ok(true)
    }

    /// Write every mesh, then the file's own attributes.
    ///
    pub fn flush(&mut self) -> Result<()> {
        for (name, mesh) in self.meshes.iter_mut() {
            mesh.flush(name)?;
        }

        self.attributable.flush_attributes()
    }

    /// Replace attributes and meshes with whatever storage holds.
    ///
    pub fn read(&mut self) -> Result<()> {
        self.attributable.writable().set_written(false);
        let result = self.read_contents();
        self.attributable.writable().set_written(true);
        result?;
        self.attributable.mark_clean();

        Ok(())
    }

    fn read_contents(&mut self) -> Result<()> {
        self.attributable.read_attributes(&[])?;
        self.meshes.clear();

        let paths = ListPaths::new();
        self.enqueue(&paths);
        self.handler().flush()?;
        for path in paths.paths.get()? {
            let mesh = self.mesh(&path);
            mesh.open_path(&path)?;
            mesh.read()?;
        }

        let datasets = ListDatasets::new();
        self.enqueue(&datasets);
        self.handler().flush()?;
        for name in datasets.datasets.get()? {
            let mesh = self.mesh(&name);
            mesh.open_scalar(&name)?;
            mesh.read()?;
        }

        Ok(())
    }

    /// Delete the file and everything in it from storage.
    ///
    pub fn delete(self) -> Result<()> {
        self.enqueue(&DeleteFile {
            name: self.name.clone(),
        });
        self.handler().flush()?;
        info!("deleted file '{}'", self.name);

        Ok(())
    }
}

impl Deref for MeshFile {
    type Target = Attributable;

    fn deref(&self) -> &Self::Target {
        &self.attributable
    }
}

impl DerefMut for MeshFile {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.attributable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::{array, ArrayD};

    use crate::{
        attribute::Attribute,
        dataset::DatasetDescriptor,
        datatype::Datatype,
        errors::Error,
        handler::AccessMode,
        mesh::{Geometry, SCALAR},
        parameter::Operation,
        testing,
    };

    fn populated(handler: &Arc<dyn IOHandler>) -> MeshFile {
        let mut file = MeshFile::create(Arc::clone(handler), "data").unwrap();
        file.set_attribute("author", "somebody").unwrap();

        let e = file.mesh("E");
        e.set_geometry(Geometry::Cylindrical).unwrap();
        for axis in ["r", "z"] {
            let component = e.component(axis).unwrap();
            component
                .reset_dataset(DatasetDescriptor::new(Datatype::Float, vec![2, 2]))
                .unwrap();
            component
                .store_chunk(array![[1.0_f32, 2.0], [3.0, 4.0]].view().into_dyn(), vec![0, 0])
                .unwrap();
        }

        let rho = file.mesh("rho").component(SCALAR).unwrap();
        rho.reset_dataset(DatasetDescriptor::new(Datatype::Int64, vec![3]))
            .unwrap();
        rho.store_chunk(array![7_i64, 8, 9].view().into_dyn(), vec![0])
            .unwrap();
        rho.set_unit_si(2.5).unwrap();

        file.flush().unwrap();

        file
    }

    #[test]
    fn test_round_trip() {
        let (_, handler) = testing::handler(AccessMode::Create);
        populated(&handler);

        let file = MeshFile::open(Arc::clone(&handler), "data").unwrap();
        assert_eq!(file.name(), "data");
        assert!(file.written());
        assert!(!file.is_dirty());
        assert_eq!(file.attribute::<String>("author").unwrap(), "somebody");

        let names: Vec<&String> = file.meshes().keys().collect();
        assert_eq!(names, vec!["E", "rho"]);

        let e = &file.meshes()["E"];
        assert!(!e.contains_scalar());
        assert_eq!(e.geometry().unwrap(), Geometry::Cylindrical);
        let r: ArrayD<f32> = e.components()["r"].load_chunk(vec![1, 0], vec![1, 2]).unwrap();
        assert_eq!(r, array![[3.0_f32, 4.0]].into_dyn());

        let rho = &file.meshes()["rho"];
        assert!(rho.contains_scalar());
        assert_eq!(rho.geometry().unwrap(), Geometry::Cartesian);
        let scalar = &rho.components()[SCALAR];
        assert_eq!(scalar.unit_si().unwrap(), 2.5);
        let values: ArrayD<i64> = scalar.load_chunk(vec![0], vec![3]).unwrap();
        assert_eq!(values, array![7_i64, 8, 9].into_dyn());
    }

    #[test]
    fn test_flush_is_idempotent() {
        let (recorder, handler) = testing::handler(AccessMode::Create);
        let mut file = populated(&handler);
        let before = recorder.backend().operations().len();

        file.flush().unwrap();
        assert_eq!(recorder.backend().operations().len(), before);
    }

    #[test]
    fn test_remove_mesh() {
        let (recorder, handler) = testing::handler(AccessMode::Create);
        let mut file = populated(&handler);

        assert!(file.remove_mesh("E").unwrap());
        assert!(file.remove_mesh("rho").unwrap());
        assert!(!file.remove_mesh("B").unwrap());
        assert!(file.meshes().is_empty());
        assert_eq!(recorder.backend().count(Operation::DeletePath), 1);
        assert_eq!(recorder.backend().count(Operation::DeleteDataset), 1);

        let file = MeshFile::open(Arc::clone(&handler), "data").unwrap();
        assert!(file.meshes().is_empty());
    }

    fn constant_scalar(handler: &Arc<dyn IOHandler>) -> MeshFile {
        let mut file = MeshFile::create(Arc::clone(handler), "data").unwrap();
        file.mesh("c")
            .component(SCALAR)
            .unwrap()
            .make_constant(3.5_f64, vec![4])
            .unwrap();
        file.flush().unwrap();

        file
    }

    #[test]
    fn test_constant_scalar_round_trip() {
        let (_, handler) = testing::handler(AccessMode::Create);
        constant_scalar(&handler);

        let file = MeshFile::open(Arc::clone(&handler), "data").unwrap();
        let c = &file.meshes()["c"];
        assert!(c.contains_scalar());
        assert!(c.written());
        let names: Vec<&String> = c.components().keys().collect();
        assert_eq!(names, vec![SCALAR]);

        let scalar = &c.components()[SCALAR];
        assert!(scalar.is_constant());
        assert!(scalar.written());
        assert_eq!(scalar.constant_value(), Some(&Attribute::Double(3.5)));
        assert_eq!(
            scalar.dataset(),
            Some(&DatasetDescriptor::new(Datatype::Double, vec![4]))
        );
        assert_eq!(
            scalar.attribute_names(),
            vec!["position", "shape", "unitSI", "value"]
        );
        assert_eq!(
            c.attribute_names(),
            vec![
                "axisLabels",
                "dataOrder",
                "geometry",
                "gridGlobalOffset",
                "gridSpacing",
                "gridUnitSI",
                "timeOffset"
            ]
        );
    }

    #[test]
    fn test_scalar_attributes_stay_apart() {
        let (_, handler) = testing::handler(AccessMode::Create);
        populated(&handler);

        let mut file = MeshFile::open(Arc::clone(&handler), "data").unwrap();
        let rho = &file.meshes()["rho"];
        assert!(!rho.contains_attribute("unitSI"));
        assert!(!rho.contains_attribute("position"));
        assert_eq!(
            rho.components()[SCALAR].attribute_names(),
            vec!["position", "unitSI"]
        );

        // Flushing either side must not clobber the other's attributes
        file.mesh("rho").set_grid_unit_si(4.0).unwrap();
        file.flush().unwrap();

        let file = MeshFile::open(Arc::clone(&handler), "data").unwrap();
        let rho = &file.meshes()["rho"];
        assert_eq!(rho.grid_unit_si().unwrap(), 4.0);
        assert_eq!(rho.components()[SCALAR].unit_si().unwrap(), 2.5);
    }

    #[test]
    fn test_remove_constant_scalar_mesh() {
        let (recorder, handler) = testing::handler(AccessMode::Create);
        let mut file = constant_scalar(&handler);

        assert!(file.remove_mesh("c").unwrap());
        assert_eq!(recorder.backend().count(Operation::DeletePath), 1);
        assert_eq!(recorder.backend().count(Operation::DeleteDataset), 0);

        let file = MeshFile::open(Arc::clone(&handler), "data").unwrap();
        assert!(file.meshes().is_empty());
    }

    #[test]
    fn test_remove_unwritten_mesh() {
        let (recorder, handler) = testing::handler(AccessMode::Create);
        let mut file = MeshFile::create(Arc::clone(&handler), "data").unwrap();
        file.mesh("E");

        assert!(file.remove_mesh("E").unwrap());
        assert_eq!(recorder.backend().operations(), vec![Operation::CreateFile]);
    }

    #[test]
    fn test_delete() {
        let (recorder, handler) = testing::handler(AccessMode::Create);
        populated(&handler).delete().unwrap();

        assert_eq!(recorder.backend().count(Operation::DeleteFile), 1);
        assert!(matches!(
            MeshFile::open(Arc::clone(&handler), "data"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_open_missing() {
        let (recorder, handler) = testing::handler(AccessMode::ReadOnly);
        assert!(matches!(
            MeshFile::open(handler, "nope"),
            Err(Error::NotFound(_))
        ));
        assert_eq!(recorder.queued(), 0);
    }

    #[test]
    fn test_create_read_only() {
        let (_, handler) = testing::handler(AccessMode::ReadOnly);
        assert!(matches!(
            MeshFile::create(handler, "data"),
            Err(Error::ReadOnly(_))
        ));
    }
}
