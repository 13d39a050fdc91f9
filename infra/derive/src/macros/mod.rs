pub mod error;
pub mod interface;
pub mod property_enum;
pub mod runtime;
