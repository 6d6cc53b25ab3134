pub mod format;
pub mod json;
pub mod progress;
pub mod table;
