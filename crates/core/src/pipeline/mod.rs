pub mod access_loop;
pub mod loop_logger;
