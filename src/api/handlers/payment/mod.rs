pub mod confirm;
pub mod orders;
pub mod storage;
