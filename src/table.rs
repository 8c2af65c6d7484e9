//! Conceptual tables (RFC 2578 §7.1.12) served through a session.
//!
//! Each row is a [`TableEntry`]. Its index OID is derived once from the
//! index variables when the row is added, and the row's columns are served
//! at `<entry OID>.<column>.<index>`.

use std::{collections::BTreeMap, sync::Arc};

use crate::{
    error::{Error, Result},
    oid::Oid,
    session::Session,
    variable::{lock, SharedVariable},
};

/// One row of a table.
pub trait TableEntry: Send + Sync {
    /// Variables forming the row index, in index order.
    fn index_variables(&self) -> Vec<SharedVariable>;

    /// Columnar objects of the row, keyed by column number.
    fn variables(&self) -> BTreeMap<u32, SharedVariable>;
}

/// A table rooted at its entry OID (e.g. `ifEntry`).
pub struct Table {
    oid: Oid,
    entries: Vec<(Arc<dyn TableEntry>, Oid)>,
}

impl Table {
    pub fn new(oid: Oid) -> Self {
        Table {
            oid,
            entries: Vec::new(),
        }
    }

    pub fn oid(&self) -> &Oid {
        &self.oid
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The index captured when `entry` was added.
    pub fn index_of(&self, entry: &Arc<dyn TableEntry>) -> Option<&Oid> {
        self.position(entry).map(|i| &self.entries[i].1)
    }

    fn position(&self, entry: &Arc<dyn TableEntry>) -> Option<usize> {
        self.entries
            .iter()
            .position(|(known, _)| Arc::ptr_eq(known, entry))
    }

    fn instance(&self, column: u32, index: &Oid) -> Oid {
        self.oid.child(column).join(index)
    }

    /// Adds a row and serves its columns through `session`.
    ///
    /// Fails if the row is already present, if an index variable cannot be
    /// used as an index, or if the table is outside every registration.
    pub fn add_entry(&mut self, session: &mut Session, entry: Arc<dyn TableEntry>) -> Result<()> {
        if self.position(&entry).is_some() {
            return Err(Error::InvalidParameter(format!(
                "entry already present in table {}",
                self.oid
            )));
        }

        let mut index = Oid::null();
        for variable in entry.index_variables() {
            let part = lock(&variable).to_oid();
            if part.is_null() {
                return Err(Error::InvalidParameter(format!(
                    "index variable of table {} cannot be converted to an OID",
                    self.oid
                )));
            }
            index.extend(&part);
        }

        let columns = entry
            .variables()
            .into_iter()
            .map(|(column, variable)| (self.instance(column, &index), variable))
            .collect();
        session.add_variables(columns)?;

        log::debug!("Added row {} to table {}", index, self.oid);
        self.entries.push((entry, index));
        Ok(())
    }

    /// Removes a row, using the index captured by [`Table::add_entry`].
    ///
    /// Returns false if the row is not in the table.
    pub fn remove_entry(&mut self, session: &mut Session, entry: &Arc<dyn TableEntry>) -> bool {
        let Some(position) = self.position(entry) else {
            return false;
        };
        let (entry, index) = self.entries.remove(position);
        let oids: Vec<Oid> = entry
            .variables()
            .keys()
            .map(|&column| self.instance(column, &index))
            .collect();
        session.remove_variables(&oids);
        log::debug!("Removed row {} from table {}", index, self.oid);
        true
    }
}
