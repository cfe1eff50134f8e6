pub mod size;
pub mod time;
