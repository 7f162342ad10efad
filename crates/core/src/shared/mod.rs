pub mod constants;
pub mod frame;
pub mod region;
pub mod timestamp;
