pub mod org;
pub mod repos;
pub mod version;
