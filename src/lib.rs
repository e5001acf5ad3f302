pub mod docx;
pub mod error;
pub mod pipeline;
pub mod progress;

pub use error::ConvertError;
