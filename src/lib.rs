pub mod build_tasks;
pub mod codegen;
pub mod description;
pub mod error;
pub mod includes;
pub mod model;
pub mod parser;
pub mod preprocessor;
pub mod scanner;
pub mod util;

pub use error::{ParseError, ParseErrorKind};
pub use model::ParseResult;
pub use parser::{parse_source, parse_source_with};
