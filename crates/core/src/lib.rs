pub mod access;
pub mod notification;
pub mod pipeline;
pub mod recognition;
pub mod shared;
