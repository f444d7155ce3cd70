//! The demonstration entity: a person with a name and a date of birth

use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::record::Record;
use crate::types::Identity;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Maximum length of `name`, mirroring a `VARCHAR(255)` column
pub const MAX_NAME_LENGTH: usize = 255;

const NAME: &str = "name";
const DOB: &str = "dob";

/// A person row in table `person`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Person {
    id: Identity,
    name: String,
    dob: Option<NaiveDate>,
}

impl Person {
    /// Create a transient person
    pub fn new(name: impl Into<String>, dob: Option<NaiveDate>) -> Self {
        Self {
            id: Identity::TRANSIENT,
            name: name.into(),
            dob,
        }
    }

    /// Create a person that claims an existing identity (a detached copy)
    pub fn with_identity(id: Identity, name: impl Into<String>, dob: Option<NaiveDate>) -> Self {
        Self {
            id,
            name: name.into(),
            dob,
        }
    }

    /// Identity (TRANSIENT until persisted)
    pub fn id(&self) -> Identity {
        self.id
    }

    /// Name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the name
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Date of birth
    pub fn dob(&self) -> Option<NaiveDate> {
        self.dob
    }

    /// Set the date of birth
    pub fn set_dob(&mut self, dob: Option<NaiveDate>) {
        self.dob = dob;
    }
}

impl Entity for Person {
    const TABLE: &'static str = "person";

    fn identity(&self) -> Identity {
        self.id
    }

    fn set_identity(&mut self, identity: Identity) {
        self.id = identity;
    }

    fn to_record(&self) -> Record {
        Record::new(Self::TABLE)
            .with(NAME, self.name.as_str())
            .with(DOB, self.dob)
    }

    fn from_record(identity: Identity, record: &Record) -> Result<Self> {
        if record.table() != Self::TABLE {
            return Err(Error::Serialization(format!(
                "expected a {} record, got {}",
                Self::TABLE,
                record.table()
            )));
        }
        Ok(Self {
            id: identity,
            name: record.text(NAME)?.to_string(),
            dob: record.date_opt(DOB)?,
        })
    }

    fn copy_fields_from(&mut self, other: &Self) -> Result<()> {
        self.name.clone_from(&other.name);
        self.dob = other.dob;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_input("person.name must not be empty"));
        }
        if self.name.chars().count() > MAX_NAME_LENGTH {
            return Err(Error::invalid_input(format!(
                "person.name exceeds {} characters",
                MAX_NAME_LENGTH
            )));
        }
        Ok(())
    }
}
