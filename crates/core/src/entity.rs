//! Entity trait: maps a Rust type onto a table

use crate::error::Result;
use crate::record::Record;
use crate::types::Identity;

/// A type persisted as one row of `TABLE`
///
/// Implementors carry their own identity field. Identity is
/// `Identity::TRANSIENT` until the store assigns one, and must not change
/// after that; the session enforces this on writes through a handle.
pub trait Entity: Clone + 'static {
    /// Table name, also used as the entity's type key in the identity map
    const TABLE: &'static str;

    /// Current identity
    fn identity(&self) -> Identity;

    /// Assign the identity (called by the session on insert)
    fn set_identity(&mut self, identity: Identity);

    /// Convert the non-identity fields into a record
    fn to_record(&self) -> Record;

    /// Rebuild an entity from its identity and stored record
    fn from_record(identity: Identity, record: &Record) -> Result<Self>;

    /// Copy every field except identity from `other`
    ///
    /// Used by merge. The default round-trips through the record form.
    fn copy_fields_from(&mut self, other: &Self) -> Result<()> {
        let identity = self.identity();
        *self = Self::from_record(identity, &other.to_record())?;
        Ok(())
    }

    /// Field constraints checked before a commit applies any write
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}
