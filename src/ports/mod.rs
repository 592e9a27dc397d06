//! Port traits (the seams between domain logic and the host platform).

pub mod config_port;
pub mod data_port;
pub mod indicator_port;
pub mod allocation_port;
