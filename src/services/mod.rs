pub mod result_logger;

pub use result_logger::{PersistenceError, PgResultLogger, ResultSink};
