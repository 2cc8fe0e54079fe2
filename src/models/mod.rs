pub mod language;
pub mod project;
pub mod source_row;

pub use language::*;
pub use project::*;
pub use source_row::*;
