//! Crawling layer: bounded concurrent execution of extraction tasks

pub mod runner;
pub mod scheduler;

pub use runner::TaskRunner;
pub use scheduler::{TaskExecutor, TaskScheduler};
