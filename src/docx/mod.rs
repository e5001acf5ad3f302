pub mod package;
pub mod source;
pub mod xml;
