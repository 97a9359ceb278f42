//! Rule and node persistence

mod memory;

pub use memory::MemoryStore;
