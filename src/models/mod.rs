mod job_log;
mod outcome;

pub use job_log::*;
pub use outcome::*;
