//! A `Backend` that stores everything in RAM.
//!
//! Each file is a tree of groups. Groups hold attributes, child groups and datasets; datasets hold
//! attributes and a row major byte buffer.
//!
use std::{any::Any, collections::BTreeMap, sync::Arc};

use bytes::Bytes;
use log::debug;

use crate::{
    attribute::Attribute,
    dataset::{check_rank, Extent},
    datatype::Datatype,
    errors::{Error, Result},
    handler::{AccessMode, Backend, QueueHandler},
    task::IOTask,
    writable::{FilePosition, Writable},
};

pub type MemoryHandler = QueueHandler<MemoryBackend>;

/// Location of a group or dataset in a `MemoryBackend`.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryPosition {
    pub file: String,
    pub path: Vec<String>,
}

impl MemoryPosition {
    fn join(&self, segments: &[String]) -> Self {
        let mut path = self.path.clone();
        path.extend_from_slice(segments);

        Self {
            file: self.file.clone(),
            path,
        }
    }
}

impl FilePosition for MemoryPosition {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Default)]
struct Group {
    attributes: BTreeMap<String, Attribute>,
    groups: BTreeMap<String, Group>,
    datasets: BTreeMap<String, StoredDataset>,
}

#[derive(Debug)]
struct StoredDataset {
    attributes: BTreeMap<String, Attribute>,
    dtype: Datatype,
    extent: Extent,
    data: Vec<u8>,
}

/// In memory storage engine.
///
#[derive(Debug, Default)]
pub struct MemoryBackend {
    files: BTreeMap<String, Group>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A queueing handler over a fresh, empty `MemoryBackend`.
    ///
    pub fn handler(access: AccessMode) -> MemoryHandler {
        QueueHandler::new(Self::new(), access)
    }

    /// Names of the files currently stored.
    pub fn files(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    fn group(&self, position: &MemoryPosition) -> Result<&Group> {
        let mut group = self
            .files
            .get(&position.file)
            .ok_or_else(|| Error::NotFound(format!("file '{}'", position.file)))?;
        for segment in &position.path {
            group = group
                .groups
                .get(segment)
                .ok_or_else(|| not_found("path", position))?;
        }

        Ok(group)
    }

    fn group_mut(&mut self, position: &MemoryPosition) -> Result<&mut Group> {
        let mut group = self
            .files
            .get_mut(&position.file)
            .ok_or_else(|| Error::NotFound(format!("file '{}'", position.file)))?;
        for segment in &position.path {
            group = group
                .groups
                .get_mut(segment)
                .ok_or_else(|| not_found("path", position))?;
        }

        Ok(group)
    }

    /// The group holding the object at `position`, and the object's name within it.
    ///
    fn container_mut<'a>(
        &mut self,
        position: &'a MemoryPosition,
    ) -> Result<(&mut Group, Option<&'a String>)> {
        let (name, parent) = match position.path.split_last() {
            Some((name, parent)) => (Some(name), parent.to_vec()),
            None => (None, vec![]),
        };
        let parent = MemoryPosition {
            file: position.file.clone(),
            path: parent,
        };

        Ok((self.group_mut(&parent)?, name))
    }

    fn dataset_mut(&mut self, position: &MemoryPosition) -> Result<&mut StoredDataset> {
        match self.container_mut(position)? {
            (group, Some(name)) => group
                .datasets
                .get_mut(name)
                .ok_or_else(|| not_found("dataset", position)),
            (_, None) => Err(not_found("dataset", position)),
        }
    }

    /// Attributes of the group or dataset at `position`.
    ///
    fn attributes_mut(
        &mut self,
        position: &MemoryPosition,
    ) -> Result<&mut BTreeMap<String, Attribute>> {
        match self.container_mut(position)? {
            (group, None) => Ok(&mut group.attributes),
            (group, Some(name)) => {
                if let Some(child) = group.groups.get_mut(name) {
                    Ok(&mut child.attributes)
                } else if let Some(dataset) = group.datasets.get_mut(name) {
                    Ok(&mut dataset.attributes)
                } else {
                    Err(not_found("object", position))
                }
            }
        }
    }
}

fn not_found(kind: &str, position: &MemoryPosition) -> Error {
    Error::NotFound(format!(
        "{kind} '/{}' in file '{}'",
        position.path.join("/"),
        position.file
    ))
}

fn segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(String::from)
        .collect()
}

fn position_of(writable: &Writable) -> Option<MemoryPosition> {
    writable
        .position()
        .and_then(|position| position.as_any().downcast_ref::<MemoryPosition>().cloned())
}

/// Position of the task's target. The target must already be persisted.
///
fn own_position(task: &IOTask) -> Result<MemoryPosition> {
    match task.writable().position() {
        None => Err(Error::NotWritten(task.operation())),
        Some(position) => position
            .as_any()
            .downcast_ref::<MemoryPosition>()
            .cloned()
            .ok_or(Error::ForeignPosition),
    }
}

/// Position of the task target's parent, under which paths and datasets are created or opened.
///
fn parent_position(task: &IOTask) -> Result<MemoryPosition> {
    let parent = task
        .writable()
        .parent()
        .ok_or(Error::NotWritten(task.operation()))?;
    if parent.position().is_none() {
        return Err(Error::NotWritten(task.operation()));
    }

    position_of(&parent).ok_or(Error::ForeignPosition)
}

fn persist(writable: &Writable, position: MemoryPosition) {
    writable.set_position(Some(Arc::new(position)));
    writable.set_written(true);
}

fn forget(writable: &Writable) {
    writable.set_position(None);
    writable.set_written(false);
}

/// Call `copy(array_start, region_start, count)` for every contiguous run of elements of a region
/// within a row major array with extent `bounds`.
///
fn for_each_run<F>(bounds: &[u64], offset: &[u64], extent: &[u64], mut copy: F)
where
    F: FnMut(usize, usize, usize),
{
    let rank = bounds.len();
    if rank == 0 {
        copy(0, 0, 1);
        return;
    }
    if extent.iter().any(|&n| n == 0) {
        return;
    }

    let mut strides = vec![1_u64; rank];
    for d in (0..rank - 1).rev() {
        strides[d] = strides[d + 1] * bounds[d + 1];
    }

    let run = extent[rank - 1];
    let mut index = vec![0_u64; rank - 1];
    let mut region = 0_u64;
    loop {
        let start = index
            .iter()
            .enumerate()
            .map(|(d, &i)| (offset[d] + i) * strides[d])
            .sum::<u64>()
            + offset[rank - 1];
        copy(start as usize, region as usize, run as usize);
        region += run;

        // Odometer increment over all but the innermost dimension
        let mut d = rank - 1;
        loop {
            if d == 0 {
                return;
            }
            d -= 1;
            index[d] += 1;
            if index[d] < extent[d] {
                break;
            }
            index[d] = 0;
        }
    }
}

/// Size in bytes of a row major array of `extent`, if it can be held in memory.
///
fn byte_len(extent: &[u64], size: usize) -> Result<usize> {
    extent
        .iter()
        .try_fold(size as u64, |len, &n| len.checked_mul(n))
        .and_then(|len| usize::try_from(len).ok())
        .ok_or_else(|| Error::TooLarge {
            extent: extent.to_vec(),
        })
}

/// Check that a region lies within a dataset and return the element size.
///
fn check_region(dataset: &StoredDataset, task: &IOTask) -> Result<usize> {
    let arguments = task.arguments();
    let dtype = *arguments.datatype("dtype")?;
    let offset = arguments.vec_u64("offset")?;
    let extent = arguments.vec_u64("extent")?;

    if dtype != dataset.dtype {
        return Err(Error::TypeMismatch {
            expected: dataset.dtype,
            found: dtype,
        });
    }
    check_rank(dataset.extent.len(), offset, extent)?;

    let fits = offset
        .iter()
        .zip(extent)
        .zip(&dataset.extent)
        .all(|((o, e), b)| o.checked_add(*e).map_or(false, |end| end <= *b));
    if !fits {
        return Err(Error::OutOfBounds {
            offset: offset.clone(),
            extent: extent.clone(),
            bounds: dataset.extent.clone(),
        });
    }

    dataset
        .dtype
        .element_size()
        .ok_or(Error::UnsupportedDatatype(dataset.dtype))
}

impl Backend for MemoryBackend {
    fn create_file(&mut self, task: &IOTask) -> Result<()> {
        let name = task.arguments().string("name")?;
        debug!("creating file '{name}'");
        self.files.insert(name.clone(), Group::default());
        persist(
            task.writable(),
            MemoryPosition {
                file: name.clone(),
                path: vec![],
            },
        );

        Ok(())
    }

    fn open_file(&mut self, task: &IOTask) -> Result<()> {
        let name = task.arguments().string("name")?;
        if !self.files.contains_key(name) {
            return Err(Error::NotFound(format!("file '{name}'")));
        }
        persist(
            task.writable(),
            MemoryPosition {
                file: name.clone(),
                path: vec![],
            },
        );

        Ok(())
    }

    fn delete_file(&mut self, task: &IOTask) -> Result<()> {
        let name = task.arguments().string("name")?;
        debug!("deleting file '{name}'");
        self.files
            .remove(name)
            .ok_or_else(|| Error::NotFound(format!("file '{name}'")))?;
        forget(task.writable());

        Ok(())
    }

    fn create_path(&mut self, task: &IOTask) -> Result<()> {
        let path = segments(task.arguments().string("path")?);
        let parent = parent_position(task)?;
        let mut group = self.group_mut(&parent)?;
        for segment in &path {
            group = group.groups.entry(segment.clone()).or_default();
        }

        let position = parent.join(&path);
        debug!("created path {position:?}");
        persist(task.writable(), position);

        Ok(())
    }

    fn open_path(&mut self, task: &IOTask) -> Result<()> {
        let path = segments(task.arguments().string("path")?);
        let position = parent_position(task)?.join(&path);
        self.group(&position)?;
        persist(task.writable(), position);

        Ok(())
    }

    fn delete_path(&mut self, task: &IOTask) -> Result<()> {
        let path = segments(task.arguments().string("path")?);
        let position = parent_position(task)?.join(&path);
        match self.container_mut(&position)? {
            (group, Some(name)) => group
                .groups
                .remove(name)
                .ok_or_else(|| not_found("path", &position))?,
            (_, None) => return Err(not_found("path", &position)),
        };
        debug!("deleted path {position:?}");
        forget(task.writable());

        Ok(())
    }

    fn list_paths(&mut self, task: &IOTask) -> Result<()> {
        let group = self.group(&own_position(task)?)?;
        let paths = group.groups.keys().cloned().collect();

        task.arguments().names_cell("paths")?.fill(paths)
    }

    fn create_dataset(&mut self, task: &IOTask) -> Result<()> {
        let arguments = task.arguments();
        let name = arguments.string("name")?;
        let extent = arguments.vec_u64("extent")?;
        let dtype = *arguments.datatype("dtype")?;
        let size = dtype
            .element_size()
            .ok_or(Error::UnsupportedDatatype(dtype))?;

        let parent = parent_position(task)?;
        let dataset = StoredDataset {
            attributes: BTreeMap::new(),
            dtype,
            extent: extent.clone(),
            data: vec![0; byte_len(extent, size)?],
        };
        self.group_mut(&parent)?
            .datasets
            .insert(name.clone(), dataset);

        let position = parent.join(&[name.clone()]);
        debug!("created dataset {position:?} {dtype} {extent:?}");
        persist(task.writable(), position);

        Ok(())
    }

    fn open_dataset(&mut self, task: &IOTask) -> Result<()> {
        let arguments = task.arguments();
        let name = arguments.string("name")?;
        let position = parent_position(task)?.join(&[name.clone()]);
        let dataset = self.dataset_mut(&position)?;

        arguments.datatype_cell("dtype")?.fill(dataset.dtype)?;
        arguments
            .extent_cell("extent")?
            .fill(dataset.extent.clone())?;
        persist(task.writable(), position);

        Ok(())
    }

    fn write_dataset(&mut self, task: &IOTask) -> Result<()> {
        let arguments = task.arguments();
        let dataset = self.dataset_mut(&own_position(task)?)?;
        let size = check_region(dataset, task)?;
        let offset = arguments.vec_u64("offset")?;
        let extent = arguments.vec_u64("extent")?;
        let data = arguments.buffer("data")?;

        let expected = byte_len(extent, size)?;
        if data.len() != expected {
            return Err(Error::BufferSize {
                expected,
                got: data.len(),
            });
        }

        let bounds = dataset.extent.clone();
        for_each_run(&bounds, offset, extent, |start, region, count| {
            let (start, region, count) = (start * size, region * size, count * size);
            dataset.data[start..start + count].copy_from_slice(&data[region..region + count]);
        });

        Ok(())
    }

    fn read_dataset(&mut self, task: &IOTask) -> Result<()> {
        let arguments = task.arguments();
        let dataset = self.dataset_mut(&own_position(task)?)?;
        let size = check_region(dataset, task)?;
        let offset = arguments.vec_u64("offset")?;
        let extent = arguments.vec_u64("extent")?;

        let mut data = vec![0; byte_len(extent, size)?];
        for_each_run(&dataset.extent, offset, extent, |start, region, count| {
            let (start, region, count) = (start * size, region * size, count * size);
            data[region..region + count].copy_from_slice(&dataset.data[start..start + count]);
        });

        arguments.buffer_cell("data")?.fill(Bytes::from(data))
    }

    fn delete_dataset(&mut self, task: &IOTask) -> Result<()> {
        let name = task.arguments().string("name")?;
        let parent = parent_position(task)?;
        self.group_mut(&parent)?
            .datasets
            .remove(name)
            .ok_or_else(|| not_found("dataset", &parent.join(&[name.clone()])))?;
        forget(task.writable());

        Ok(())
    }

    fn list_datasets(&mut self, task: &IOTask) -> Result<()> {
        let group = self.group(&own_position(task)?)?;
        let datasets = group.datasets.keys().cloned().collect();

        task.arguments().names_cell("datasets")?.fill(datasets)
    }

    fn write_att(&mut self, task: &IOTask) -> Result<()> {
        let arguments = task.arguments();
        let name = arguments.string("name")?;
        let dtype = *arguments.datatype("dtype")?;
        let resource = arguments.resource("resource")?;
        if dtype != resource.dtype() {
            return Err(Error::TypeMismatch {
                expected: dtype,
                found: resource.dtype(),
            });
        }

        self.attributes_mut(&own_position(task)?)?
            .insert(name.clone(), resource.clone());

        Ok(())
    }

    fn read_att(&mut self, task: &IOTask) -> Result<()> {
        let arguments = task.arguments();
        let name = arguments.string("name")?;
        let attribute = self
            .attributes_mut(&own_position(task)?)?
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("attribute '{name}'")))?;

        arguments.datatype_cell("dtype")?.fill(attribute.dtype())?;
        arguments.resource_cell("resource")?.fill(attribute)
    }

    fn delete_att(&mut self, task: &IOTask) -> Result<()> {
        let name = task.arguments().string("name")?;
        self.attributes_mut(&own_position(task)?)?
            .remove(name)
            .ok_or_else(|| Error::NotFound(format!("attribute '{name}'")))?;

        Ok(())
    }

    fn list_atts(&mut self, task: &IOTask) -> Result<()> {
        let names = self
            .attributes_mut(&own_position(task)?)?
            .keys()
            .cloned()
            .collect();

        task.arguments().names_cell("attributes")?.fill(names)
    }
}
