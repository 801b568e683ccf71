// Raw disk access, geometry and partition table

pub mod layout;
pub mod mbr;
pub mod partition;
pub mod sector;
pub mod system;

pub use layout::{DiskLayout, MIN_DEVICE_SECTORS};
pub use mbr::{MasterBootRecord, PartitionEntry};
pub use partition::{PartitionInfo, PartitionType};
pub use sector::{SectorBuf, SECTOR_SIZE};
pub use system::SystemPartitionHeader;
