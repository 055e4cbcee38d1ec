//! Storage implementations behind the domain fetch adapter

pub mod in_memory;

pub use in_memory::{
    DirectorySeed, InMemoryDirectory, StoredField, StoredFieldGroup, StoredFieldValue,
    StoredGroup, StoredMember,
};
