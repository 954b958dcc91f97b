pub mod error;
pub mod hash;
pub mod type_id;
