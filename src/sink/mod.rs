pub mod live_table;
pub mod memory;

pub use live_table::{LiveTable, LiveTableSink, TableHost};
pub use memory::{MemoryHost, MemoryTable};
