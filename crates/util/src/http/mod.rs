pub mod parser;
pub mod url_join;

pub use parser::*;
pub use url_join::*;
