//! Memory model: entries, frameworks and the in-process store.

pub mod entry;
pub mod store;

pub use entry::{
    clamp_unit, Framework, MemoryEntry, MemoryEntryBuilder, MemoryType, Provenance,
};
pub use store::MemoryStore;
