use std::{
    collections::{btree_map::Entry, BTreeMap},
    fmt,
    ops::{Deref, DerefMut},
    str::FromStr,
    sync::Arc,
};

use num_traits::Float;

use crate::{
    attributable::Attributable,
    attribute::{Attribute, AttributeType},
    component::{unexpected, MeshComponent, COMPONENT_ATTRIBUTES},
    datatype::Datatype,
    errors::{Error, Result},
    handler::IOHandler,
    parameter::{CreatePath, ListDatasets, ListPaths, OpenPath},
};

/// Key of the single component of a scalar mesh.
pub const SCALAR: &str = "\u{b}Scalar";

/// Attributes read explicitly by `Mesh::read`
const MESH_ATTRIBUTES: [&str; 6] = [
    "geometry",
    "dataOrder",
    "axisLabels",
    "gridSpacing",
    "gridGlobalOffset",
    "gridUnitSI",
];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Geometry {
    Cartesian,
    ThetaMode,
    Cylindrical,
    Spherical,
}

impl Geometry {
    pub const ALL: [Geometry; 4] = [
        Geometry::Cartesian,
        Geometry::ThetaMode,
        Geometry::Cylindrical,
        Geometry::Spherical,
    ];

    fn token(self) -> &'static str {
        match self {
            Geometry::Cartesian => "cartesian",
            Geometry::ThetaMode => "thetaMode",
            Geometry::Cylindrical => "cylindrical",
            Geometry::Spherical => "spherical",
        }
    }
}

impl FromStr for Geometry {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self> {
        Geometry::ALL
            .into_iter()
            .find(|geometry| geometry.token() == token)
            .ok_or_else(|| Error::UnrecognizedValue {
                attribute: String::from("geometry"),
                value: token.to_string(),
            })
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Memory layout of the datasets of a mesh: row major (C) or column major (Fortran).
///
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DataOrder {
    C,
    F,
}

impl TryFrom<char> for DataOrder {
    type Error = Error;

    fn try_from(value: char) -> Result<Self> {
        match value {
            'C' => Ok(DataOrder::C),
            'F' => Ok(DataOrder::F),
            _ => Err(Error::UnrecognizedValue {
                attribute: String::from("dataOrder"),
                value: value.to_string(),
            }),
        }
    }
}

impl From<DataOrder> for char {
    fn from(order: DataOrder) -> Self {
        match order {
            DataOrder::C => 'C',
            DataOrder::F => 'F',
        }
    }
}

impl fmt::Display for DataOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", char::from(*self))
    }
}

/// A physical field sampled on a regular grid, made of one or more components.
///
/// A mesh with a single `SCALAR` component is stored without a group of its own: the component's
/// dataset stands in for the whole mesh.
///
pub struct Mesh {
    attributable: Attributable,
    components: BTreeMap<String, MeshComponent>,
    contains_scalar: bool,
}

impl Mesh {
    pub fn new(handler: Arc<dyn IOHandler>) -> Self {
        let mut attributable = Attributable::new(handler);
        attributable.init_attribute("timeOffset", 0.0_f32);
        attributable.init_attribute("geometry", Geometry::Cartesian.token());
        attributable.init_attribute("dataOrder", char::from(DataOrder::C));
        attributable.init_attribute("axisLabels", vec![String::new()]);
        attributable.init_attribute("gridSpacing", vec![1.0_f64]);
        attributable.init_attribute("gridGlobalOffset", vec![0.0_f64]);
        attributable.init_attribute("gridUnitSI", 1.0_f64);

        Self {
            attributable,
            components: BTreeMap::new(),
            contains_scalar: false,
        }
    }

    pub fn geometry(&self) -> Result<Geometry> {
        self.attribute::<String>("geometry")?.parse()
    }

    pub fn set_geometry(&mut self, geometry: Geometry) -> Result<&mut Self> {
        self.set_attribute("geometry", geometry.token())?;

        Ok(self)
    }

    pub fn geometry_parameters(&self) -> Result<String> {
        self.attribute("geometryParameters")
    }

    pub fn set_geometry_parameters(&mut self, parameters: &str) -> Result<&mut Self> {
        self.set_attribute("geometryParameters", parameters)?;

        Ok(self)
    }

    pub fn data_order(&self) -> Result<DataOrder> {
        DataOrder::try_from(self.attribute::<char>("dataOrder")?)
    }

    pub fn set_data_order(&mut self, order: DataOrder) -> Result<&mut Self> {
        self.set_attribute("dataOrder", char::from(order))?;

        Ok(self)
    }

    pub fn axis_labels(&self) -> Result<Vec<String>> {
        self.attribute("axisLabels")
    }

    pub fn set_axis_labels<S>(&mut self, labels: Vec<S>) -> Result<&mut Self>
    where
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        self.set_attribute("axisLabels", labels)?;

        Ok(self)
    }

    /// Grid spacing per axis, widened to `f64` if stored as `f32`.
    ///
    pub fn grid_spacing(&self) -> Result<Vec<f64>> {
        match self.get_attribute("gridSpacing")? {
            Attribute::VecFloat(spacing) => Ok(spacing.iter().map(|&s| s as f64).collect()),
            Attribute::VecDouble(spacing) => Ok(spacing.clone()),
            other => Err(Error::TypeMismatch {
                expected: Datatype::VecDouble,
                found: other.dtype(),
            }),
        }
    }

    pub fn set_grid_spacing<T>(&mut self, spacing: Vec<T>) -> Result<&mut Self>
    where
        T: Float,
        Vec<T>: Into<Attribute>,
    {
        self.set_attribute("gridSpacing", spacing)?;

        Ok(self)
    }

    pub fn grid_global_offset(&self) -> Result<Vec<f64>> {
        self.attribute("gridGlobalOffset")
    }

    pub fn set_grid_global_offset(&mut self, offset: Vec<f64>) -> Result<&mut Self> {
        self.set_attribute("gridGlobalOffset", offset)?;

        Ok(self)
    }

    pub fn grid_unit_si(&self) -> Result<f64> {
        self.attribute("gridUnitSI")
    }

    pub fn set_grid_unit_si(&mut self, unit_si: f64) -> Result<&mut Self> {
        self.set_attribute("gridUnitSI", unit_si)?;

        Ok(self)
    }

    pub fn time_offset<T>(&self) -> Result<T>
    where
        T: Float + AttributeType,
    {
        self.attribute("timeOffset")
    }

    pub fn set_time_offset<T>(&mut self, offset: T) -> Result<&mut Self>
    where
        T: Float + Into<Attribute>,
    {
        self.set_attribute("timeOffset", offset)?;

        Ok(self)
    }

    /// Whether this mesh consists of the single `SCALAR` component.
    pub fn contains_scalar(&self) -> bool {
        self.contains_scalar
    }

    /// Whether this mesh is stored as a bare dataset rather than a group.
    ///
    pub(crate) fn stored_as_dataset(&self) -> bool {
        self.contains_scalar
            && self
                .components
                .get(SCALAR)
                .map_or(false, |component| !component.is_constant())
    }

    pub fn components(&self) -> &BTreeMap<String, MeshComponent> {
        &self.components
    }

    /// Get a component by name, creating it if it doesn't exist.
    ///
    /// `SCALAR` can only be used on a mesh with no other components and makes the mesh a scalar
    /// mesh.
    ///
    pub fn component(&mut self, name: &str) -> Result<&mut MeshComponent> {
        let scalar = name == SCALAR;
        if !self.components.contains_key(name)
            && (self.contains_scalar || (scalar && !self.components.is_empty()))
        {
            return Err(Error::ScalarConflict);
        }
        self.contains_scalar = scalar;

        let component = match self.components.entry(name.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let component = MeshComponent::new(Arc::clone(self.attributable.handler()));
                component.writable().set_parent(self.attributable.writable());
                entry.insert(component)
            }
        };

        Ok(component)
    }

    /// Write this mesh, its components and its attributes under `name` in its parent.
    ///
    pub fn flush(&mut self, name: &str) -> Result<()> {
        let writable = self.attributable.writable().clone();
        if !writable.written() {
            if self.contains_scalar {
                let component = self.components.get_mut(SCALAR).ok_or(Error::NoDataset)?;
                if let Some(parent) = writable.parent() {
                    component.writable().set_parent(&parent);
                }
                component.flush(name)?;
                writable.set_position(component.writable().position());
                writable.set_written(true);
            } else {
                self.attributable.enqueue(&CreatePath {
                    path: name.to_string(),
                });
                self.attributable.handler().flush()?;
                writable.set_written(true);
                for component in self.components.values() {
                    component.writable().set_parent(&writable);
                }
            }
        }

        for (name, component) in self.components.iter_mut() {
            component.flush(name)?;
        }

        self.attributable.flush_attributes()
    }

    /// Open the mesh stored as path `name` under its parent.
    ///
    pub(crate) fn open_path(&mut self, name: &str) -> Result<()> {
        self.attributable.enqueue(&OpenPath {
            path: name.to_string(),
        });
        self.attributable.handler().flush()
    }

    /// Open the scalar mesh stored as dataset `name` under its parent.
    ///
    pub(crate) fn open_scalar(&mut self, name: &str) -> Result<()> {
        let writable = self.attributable.writable().clone();
        let component = self.component(SCALAR)?;
        if let Some(parent) = writable.parent() {
            component.writable().set_parent(&parent);
        }
        component.open_dataset(name)?;
        writable.set_position(component.writable().position());
        writable.set_written(true);

        Ok(())
    }

    /// Reconstruct this mesh from storage.
    ///
    /// The mesh must already be opened, i.e. have a position in storage. Components are replaced
    /// wholesale by whatever storage holds.
    ///
    pub fn read(&mut self) -> Result<()> {
        // Allow setters while reconstructing, even on a read only handler
        self.attributable.writable().set_written(false);
        let result = self.read_contents();
        self.attributable.writable().set_written(true);
        result?;
        self.attributable.mark_clean();

        Ok(())
    }

    fn read_contents(&mut self) -> Result<()> {
        let (dtype, geometry) = self.read_attribute("geometry")?;
        match dtype {
            Datatype::String => {
                let geometry: Geometry = geometry.get::<String>()?.parse()?;
                self.set_geometry(geometry)?;
            }
            dtype => return Err(unexpected("geometry", dtype)),
        }

        let (dtype, order) = self.read_attribute("dataOrder")?;
        let order = match dtype {
            Datatype::Char => order.get::<char>()?,
            Datatype::String => {
                let order = order.get::<String>()?;
                let mut chars = order.chars();
                match (chars.next(), chars.next()) {
                    (Some(order), None) => order,
                    _ => {
                        return Err(Error::UnrecognizedValue {
                            attribute: String::from("dataOrder"),
                            value: order,
                        })
                    }
                }
            }
            dtype => return Err(unexpected("dataOrder", dtype)),
        };
        self.set_data_order(DataOrder::try_from(order)?)?;

        let (dtype, labels) = self.read_attribute("axisLabels")?;
        match dtype {
            Datatype::VecString => self.set_axis_labels(labels.get::<Vec<String>>()?)?,
            dtype => return Err(unexpected("axisLabels", dtype)),
        };

        let (dtype, spacing) = self.read_attribute("gridSpacing")?;
        match dtype {
            Datatype::VecFloat => self.set_grid_spacing(spacing.get::<Vec<f32>>()?)?,
            Datatype::VecDouble => self.set_grid_spacing(spacing.get::<Vec<f64>>()?)?,
            dtype => return Err(unexpected("gridSpacing", dtype)),
        };

        let (dtype, offset) = self.read_attribute("gridGlobalOffset")?;
        match dtype {
            Datatype::VecDouble => self.set_grid_global_offset(offset.get()?)?,
            dtype => return Err(unexpected("gridGlobalOffset", dtype)),
        };

        let (dtype, unit_si) = self.read_attribute("gridUnitSI")?;
        let unit_si = match dtype {
            Datatype::Float => unit_si.get::<f32>()? as f64,
            Datatype::Double => unit_si.get::<f64>()?,
            dtype => return Err(unexpected("gridUnitSI", dtype)),
        };
        self.set_grid_unit_si(unit_si)?;

        if !self.contains_scalar {
            self.read_components()?;
        }

        if self.contains_scalar {
            if let Some(component) = self.components.get_mut(SCALAR) {
                component.read_shared()?;
            }
            // Mesh and scalar component share one set of attributes in storage
            let skip: Vec<&str> = MESH_ATTRIBUTES
                .iter()
                .chain(COMPONENT_ATTRIBUTES.iter())
                .copied()
                .collect();
            self.attributable.read_attributes(&skip)
        } else {
            self.attributable.read_attributes(&MESH_ATTRIBUTES)
        }
    }

    /// Replace the components with the paths and datasets stored under this mesh.
    ///
    /// A mesh with neither, whose own group holds a `value` and a `shape`, is a constant scalar
    /// mesh.
    ///
    fn read_components(&mut self) -> Result<()> {
        self.components.clear();

        let paths = ListPaths::new();
        self.attributable.enqueue(&paths);
        self.attributable.handler().flush()?;
        let paths = paths.paths.get()?;
        for path in &paths {
            let component = self.component(path)?;
            component.open_path(path)?;
            component.read()?;
        }

        let datasets = ListDatasets::new();
        self.attributable.enqueue(&datasets);
        self.attributable.handler().flush()?;
        let datasets = datasets.datasets.get()?;
        for name in &datasets {
            let component = self.component(name)?;
            component.open_dataset(name)?;
            component.read()?;
        }

        if paths.is_empty() && datasets.is_empty() {
            let stored = self.attributable.stored_attribute_names()?;
            let constant = ["value", "shape"]
                .iter()
                .all(|key| stored.iter().any(|name| name == key));
            if constant {
                let writable = self.attributable.writable().clone();
                self.component(SCALAR)?.open_shared(&writable);
            }
        }

        Ok(())
    }
}

impl Deref for Mesh {
    type Target = Attributable;

    fn deref(&self) -> &Self::Target {
        &self.attributable
    }
}

impl DerefMut for Mesh {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.attributable
    }
}
