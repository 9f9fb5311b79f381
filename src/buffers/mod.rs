pub mod memory_manager;
pub mod memory_pointer;
pub mod owned_buf;
pub mod pooled_buf;
