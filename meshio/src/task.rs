use crate::{
    argument::Arguments,
    parameter::{Operation, Parameter},
    writable::Writable,
};

/// A unit of work for an executor: what to do, to which object, with which arguments.
///
/// Built once from a concrete parameter value and never modified afterwards.
///
#[derive(Clone, Debug)]
pub struct IOTask {
    writable: Writable,
    operation: Operation,
    arguments: Arguments,
}

impl IOTask {
    /// Bind `parameter` to `writable`.
    ///
    /// The task holds a handle to the writable, not a copy, and shares every output cell of
    /// `parameter`. Keep `parameter` around until after the next flush to read its results.
    ///
    pub fn new<P>(writable: &Writable, parameter: &P) -> Self
    where
        P: Clone + Into<Parameter>,
    {
        let parameter: Parameter = parameter.clone().into();
        Self {
            writable: writable.clone(),
            operation: parameter.operation(),
            arguments: parameter.to_arguments(),
        }
    }

    pub fn writable(&self) -> &Writable {
        &self.writable
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }
}
