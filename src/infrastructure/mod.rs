pub mod db;
pub mod engine;
pub mod queue;
pub mod storage;
