pub mod plan;
pub mod validate;
pub mod version;
