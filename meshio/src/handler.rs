//! The executor contract.
//!
//! Domain objects talk to storage only through `IOHandler`: they `enqueue` tasks and later `flush`
//! them. `QueueHandler` implements the queueing discipline once and hands each task to a `Backend`,
//! which only has to implement the operations themselves.
//!
use std::collections::VecDeque;

use log::{debug, trace, warn};
use parking_lot::{Mutex, MutexGuard};

use crate::{
    errors::{Error, Result},
    parameter::Operation,
    task::IOTask,
};

/// How a handler may access storage.
///
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AccessMode {
    /// Only read operations are allowed.
    ReadOnly,

    /// Open existing storage for reading and writing.
    ReadWrite,

    /// Create new storage, replacing anything already there.
    Create,
}

/// Accepts tasks and executes them in order on `flush`.
///
pub trait IOHandler: Send + Sync {
    /// Append a task to the queue. Nothing is executed until the next `flush`.
    ///
    fn enqueue(&self, task: IOTask);

    /// Execute every queued task in the order it was enqueued and empty the queue.
    ///
    /// When this returns `Ok`, every output cell of every executed task is filled. When it returns
    /// an error, an unknown prefix of the queue was executed and the rest was discarded.
    ///
    fn flush(&self) -> Result<()>;

    fn access_mode(&self) -> AccessMode;
}

/// A storage engine, one method per operation.
///
/// Every method defaults to failing with `Error::UnsupportedOperation`, so a backend only
/// implements what it can actually do and never silently ignores a task.
///
pub trait Backend: Send {
    fn create_file(&mut self, task: &IOTask) -> Result<()> {
        unsupported(task)
    }

    fn open_file(&mut self, task: &IOTask) -> Result<()> {
        unsupported(task)
    }

    fn delete_file(&mut self, task: &IOTask) -> Result<()> {
        unsupported(task)
    }

    fn create_path(&mut self, task: &IOTask) -> Result<()> {
        unsupported(task)
    }

    fn open_path(&mut self, task: &IOTask) -> Result<()> {
        unsupported(task)
    }

    fn delete_path(&mut self, task: &IOTask) -> Result<()> {
        unsupported(task)
    }

    fn list_paths(&mut self, task: &IOTask) -> Result<()> {
        unsupported(task)
    }

    fn create_dataset(&mut self, task: &IOTask) -> Result<()> {
        unsupported(task)
    }

    fn open_dataset(&mut self, task: &IOTask) -> Result<()> {
        unsupported(task)
    }

    fn write_dataset(&mut self, task: &IOTask) -> Result<()> {
        unsupported(task)
    }

    fn read_dataset(&mut self, task: &IOTask) -> Result<()> {
        unsupported(task)
    }

    fn delete_dataset(&mut self, task: &IOTask) -> Result<()> {
        unsupported(task)
    }

    fn list_datasets(&mut self, task: &IOTask) -> Result<()> {
        unsupported(task)
    }

    fn write_att(&mut self, task: &IOTask) -> Result<()> {
        unsupported(task)
    }

    fn read_att(&mut self, task: &IOTask) -> Result<()> {
        unsupported(task)
    }

    fn delete_att(&mut self, task: &IOTask) -> Result<()> {
        unsupported(task)
    }

    fn list_atts(&mut self, task: &IOTask) -> Result<()> {
        unsupported(task)
    }
}

fn unsupported(task: &IOTask) -> Result<()> {
    Err(Error::UnsupportedOperation(task.operation()))
}

/// An `IOHandler` that keeps a FIFO queue of tasks and runs them on a `Backend`.
///
pub struct QueueHandler<B>
where
    B: Backend,
{
    access: AccessMode,
    queue: Mutex<VecDeque<IOTask>>,
    backend: Mutex<B>,
}

impl<B> QueueHandler<B>
where
    B: Backend,
{
    /// Create a new `QueueHandler`
    ///
    /// # Arguments
    ///
    /// * `backend` - The storage engine that executes tasks.
    /// * `access` - What the handler is allowed to do. Write operations fail with
    ///   `Error::ReadOnly` when this is `AccessMode::ReadOnly`.
    ///
    pub fn new(backend: B, access: AccessMode) -> Self {
        Self {
            access,
            queue: Mutex::new(VecDeque::new()),
            backend: Mutex::new(backend),
        }
    }

    /// Number of tasks waiting for the next flush.
    pub fn queued(&self) -> usize {
        self.queue.lock().len()
    }

    /// Direct access to the backend, bypassing the queue.
    pub fn backend(&self) -> MutexGuard<'_, B> {
        self.backend.lock()
    }

    fn run(&self, backend: &mut B, task: &IOTask) -> Result<()> {
        let operation = task.operation();
        if operation.is_write() && self.access == AccessMode::ReadOnly {
            return Err(Error::ReadOnly(format!("{operation} is a write operation")));
        }

        trace!("running {operation}");
        match operation {
            Operation::CreateFile => backend.create_file(task),
            Operation::OpenFile => backend.open_file(task),
            Operation::DeleteFile => backend.delete_file(task),
            Operation::CreatePath => backend.create_path(task),
            Operation::OpenPath => backend.open_path(task),
            Operation::DeletePath => backend.delete_path(task),
            Operation::ListPaths => backend.list_paths(task),
            Operation::CreateDataset => backend.create_dataset(task),
            Operation::OpenDataset => backend.open_dataset(task),
            Operation::WriteDataset => backend.write_dataset(task),
            Operation::ReadDataset => backend.read_dataset(task),
            Operation::DeleteDataset => backend.delete_dataset(task),
            Operation::ListDatasets => backend.list_datasets(task),
            Operation::WriteAtt => backend.write_att(task),
            Operation::ReadAtt => backend.read_att(task),
            Operation::DeleteAtt => backend.delete_att(task),
            Operation::ListAtts => backend.list_atts(task),
        }
    }
}

impl<B> IOHandler for QueueHandler<B>
where
    B: Backend,
{
    fn enqueue(&self, task: IOTask) {
        let mut queue = self.queue.lock();
        debug!("enqueue {} ({} queued)", task.operation(), queue.len() + 1);
        queue.push_back(task);
    }

    fn flush(&self) -> Result<()> {
        // Take the whole queue up front so tasks enqueued while flushing wait for the next flush
        let tasks: Vec<IOTask> = self.queue.lock().drain(..).collect();
        if tasks.is_empty() {
            return Ok(());
        }

        debug!("flushing {} tasks", tasks.len());
        let mut backend = self.backend.lock();
        for (index, task) in tasks.iter().enumerate() {
            if let Err(err) = self.run(&mut backend, task) {
                warn!(
                    "{} failed: {err}; discarding {} queued tasks",
                    task.operation(),
                    tasks.len() - index - 1
                );
                return Err(err);
            }
        }

        Ok(())
    }

    fn access_mode(&self) -> AccessMode {
        self.access
    }
}
