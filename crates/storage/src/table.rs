//! Table set shared by the memory and file backends

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tether_core::{Error, Identity, IdentitySequence, Record, Result};

/// One table: its identity sequence and rows
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Table {
    sequence: IdentitySequence,
    rows: BTreeMap<Identity, Record>,
}

/// All tables of a store, keyed by table name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Tables {
    tables: BTreeMap<String, Table>,
}

impl Tables {
    pub(crate) fn insert(&mut self, record: &Record) -> Identity {
        let table = self.tables.entry(record.table().to_string()).or_default();
        let identity = table.sequence.allocate();
        table.rows.insert(identity, record.clone());
        identity
    }

    pub(crate) fn read(&self, table: &str, identity: Identity) -> Result<Record> {
        self.tables
            .get(table)
            .and_then(|t| t.rows.get(&identity))
            .cloned()
            .ok_or_else(|| Error::not_found(table, identity))
    }

    pub(crate) fn update(&mut self, identity: Identity, record: &Record) -> Result<()> {
        let row = self
            .tables
            .get_mut(record.table())
            .and_then(|t| t.rows.get_mut(&identity))
            .ok_or_else(|| Error::not_found(record.table(), identity))?;
        *row = record.clone();
        Ok(())
    }

    pub(crate) fn delete(&mut self, table: &str, identity: Identity) -> Result<()> {
        self.tables
            .get_mut(table)
            .and_then(|t| t.rows.remove(&identity))
            .map(|_| ())
            .ok_or_else(|| Error::not_found(table, identity))
    }

    pub(crate) fn len(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, |t| t.rows.len())
    }
}
