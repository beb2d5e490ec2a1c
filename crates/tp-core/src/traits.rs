//! Traits shared by every stored record

/// Primary key of every table
pub type Id = i64;

/// A record that may or may not have been stored yet
pub trait Identifiable {
    /// `None` until the store assigns a key
    fn id(&self) -> Option<Id>;
}

/// A stored record type
pub trait Entity: Identifiable + Send + Sync {
    const TABLE_NAME: &'static str;

    /// Name used in not-found and internal error messages
    const TYPE_NAME: &'static str;
}
