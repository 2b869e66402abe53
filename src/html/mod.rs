pub mod token;
pub mod tokenize;

pub use token::{find_attr, Token};
pub use tokenize::tokenize;
