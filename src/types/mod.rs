pub mod events;
pub mod opportunity;
pub mod path;
pub mod pool;
pub mod sync_event;
