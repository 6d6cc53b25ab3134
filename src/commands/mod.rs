pub mod db;
pub mod drive;
pub mod ingest;
pub mod reset;
pub mod run;
pub mod status;
pub mod sync;
