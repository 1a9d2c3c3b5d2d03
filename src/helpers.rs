pub mod cache;
pub mod converters;
pub mod errors;
pub mod nullable;
