// FAT32 contiguous-file allocator for a freshly formatted volume

mod context;
pub mod directory;
mod file_ops;
pub mod filename;
pub mod types;

pub use context::Fat32Volume;
pub use directory::{find_entry, for_each_entry, DirSlot};
pub use file_ops::{create_contiguous_file, write_contiguous_file, CreatedFile};
pub use filename::ShortName;
pub use types::{Clock, DirEntry, DosTimestamp, FixedClock, NoClock};
