pub mod conversion;
pub mod documents;
pub mod storage;
