pub mod pool;
pub mod projects;
pub mod source;

pub use pool::create_pool;
pub use projects::{PgProjectWriter, ProjectWriter};
pub use source::{extraction_query, MssqlSource, SourceReader};
