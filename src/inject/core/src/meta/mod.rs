pub mod cache;
pub mod describe;
pub mod extract;
