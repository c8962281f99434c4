pub mod config;
pub mod error;
pub mod job;
pub mod results;
pub mod task;
pub mod worker;

pub use config::*;
pub use error::*;
pub use job::*;
pub use results::*;
pub use task::*;
pub use worker::*;
