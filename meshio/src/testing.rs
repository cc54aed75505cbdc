use std::sync::Arc;

use crate::{
    errors::Result,
    handler::{AccessMode, Backend, IOHandler, QueueHandler},
    memory::MemoryBackend,
    parameter::Operation,
    task::IOTask,
    writable::Writable,
};

pub(crate) type Handler = QueueHandler<Recording>;

/// A `MemoryBackend` that remembers every task it ran.
///
#[derive(Default)]
pub(crate) struct Recording {
    inner: MemoryBackend,
    ran: Vec<(Operation, Writable)>,
}

impl Recording {
    pub(crate) fn operations(&self) -> Vec<Operation> {
        self.ran.iter().map(|(operation, _)| *operation).collect()
    }

    /// Targets of every task with the given operation, in the order they ran.
    pub(crate) fn targets(&self, operation: Operation) -> Vec<Writable> {
        self.ran
            .iter()
            .filter(|(op, _)| *op == operation)
            .map(|(_, writable)| writable.clone())
            .collect()
    }

    pub(crate) fn count(&self, operation: Operation) -> usize {
        self.targets(operation).len()
    }
}

macro_rules! record {
    ($($method:ident),*) => {
        $(
            fn $method(&mut self, task: &IOTask) -> Result<()> {
                self.ran.push((task.operation(), task.writable().clone()));
                self.inner.$method(task)
            }
        )*
    };
}

impl Backend for Recording {
    record!(
        create_file,
        open_file,
        delete_file,
        create_path,
        open_path,
        delete_path,
        list_paths,
        create_dataset,
        open_dataset,
        write_dataset,
        read_dataset,
        delete_dataset,
        list_datasets,
        write_att,
        read_att,
        delete_att,
        list_atts
    );
}

/// A recording memory handler, both as itself and as the trait object domain objects take.
///
pub(crate) fn handler(access: AccessMode) -> (Arc<Handler>, Arc<dyn IOHandler>) {
    let recorder = Arc::new(QueueHandler::new(Recording::default(), access));
    let handler: Arc<dyn IOHandler> = Arc::clone(&recorder) as Arc<dyn IOHandler>;

    (recorder, handler)
}
