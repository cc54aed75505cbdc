use std::{collections::BTreeMap, sync::Arc};

use crate::{
    attribute::{Attribute, AttributeType},
    datatype::Datatype,
    errors::{Error, Result},
    handler::{AccessMode, IOHandler},
    parameter::{DeleteAtt, ListAtts, Parameter, ReadAtt, WriteAtt},
    task::IOTask,
    writable::Writable,
};

/// Attribute storage and persistence state shared by every domain object.
///
pub struct Attributable {
    writable: Writable,
    handler: Arc<dyn IOHandler>,
    attributes: BTreeMap<String, Attribute>,

    /// Whether attributes changed since they were last flushed or read
    dirty: bool,
}

impl Attributable {
    pub fn new(handler: Arc<dyn IOHandler>) -> Self {
        Self {
            writable: Writable::new(),
            handler,
            attributes: BTreeMap::new(),
            dirty: false,
        }
    }

    pub fn writable(&self) -> &Writable {
        &self.writable
    }

    pub fn handler(&self) -> &Arc<dyn IOHandler> {
        &self.handler
    }

    /// Whether the persistent counterpart of this object exists.
    pub fn written(&self) -> bool {
        self.writable.written()
    }

    /// Store `value` under `name`, replacing any previous value.
    ///
    /// Fails with `Error::ReadOnly` if the object is persisted and the handler is read only.
    ///
    pub fn set_attribute<A>(&mut self, name: &str, value: A) -> Result<()>
    where
        A: Into<Attribute>,
    {
        self.check_mutable(name)?;
        self.attributes.insert(name.to_string(), value.into());
        self.dirty = true;

        Ok(())
    }

    /// Set an attribute without the read only check, for constructor defaults.
    pub(crate) fn init_attribute<A>(&mut self, name: &str, value: A)
    where
        A: Into<Attribute>,
    {
        self.attributes.insert(name.to_string(), value.into());
        self.dirty = true;
    }

    pub fn get_attribute(&self, name: &str) -> Result<&Attribute> {
        self.attributes
            .get(name)
            .ok_or_else(|| Error::NoSuchAttribute(name.to_string()))
    }

    /// Get an attribute's value as `T`.
    pub fn attribute<T>(&self, name: &str) -> Result<T>
    where
        T: AttributeType,
    {
        self.get_attribute(name)?.get()
    }

    pub fn contains_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn attribute_names(&self) -> Vec<&str> {
        self.attributes.keys().map(String::as_str).collect()
    }

    /// Remove an attribute, also from storage if the object is persisted.
    ///
    /// Returns whether the attribute existed.
    ///
    pub fn delete_attribute(&mut self, name: &str) -> Result<bool> {
        self.check_mutable(name)?;
        if self.attributes.remove(name).is_none() {
            return Ok(false);
        }

        if self.written() {
            self.enqueue(&DeleteAtt {
                name: name.to_string(),
            });
            self.handler.flush()?;
        }

        Ok(true)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn check_mutable(&self, name: &str) -> Result<()> {
        if self.written() && self.handler.access_mode() == AccessMode::ReadOnly {
            return Err(Error::ReadOnly(format!("can not change attribute '{name}'")));
        }

        Ok(())
    }

    pub(crate) fn enqueue<P>(&self, parameter: &P)
    where
        P: Clone + Into<Parameter>,
    {
        self.handler.enqueue(IOTask::new(&self.writable, parameter));
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Write every attribute, as one batch, if any changed.
    ///
    pub(crate) fn flush_attributes(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        for (name, value) in &self.attributes {
            self.enqueue(&WriteAtt::new(name.as_str(), value.clone()));
        }
        self.handler.flush()?;
        self.dirty = false;

        Ok(())
    }

    /// Read a single attribute from storage, without storing it locally.
    ///
    pub(crate) fn read_attribute(&self, name: &str) -> Result<(Datatype, Attribute)> {
        let read = ReadAtt::new(name);
        self.enqueue(&read);
        self.handler.flush()?;

        Ok((read.dtype.get()?, read.resource.get()?))
    }

    /// Names of the attributes in storage, which may differ from the local ones.
    ///
    pub(crate) fn stored_attribute_names(&self) -> Result<Vec<String>> {
        let list = ListAtts::new();
        self.enqueue(&list);
        self.handler.flush()?;

        list.attributes.get()
    }

    /// Read every stored attribute not named in `skip`.
    ///
    pub(crate) fn read_attributes(&mut self, skip: &[&str]) -> Result<()> {
        for name in self.stored_attribute_names()? {
            if skip.contains(&name.as_str()) {
                continue;
            }
            let (_, value) = self.read_attribute(&name)?;
            self.set_attribute(&name, value)?;
        }

        Ok(())
    }
}
