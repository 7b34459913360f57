pub mod failure;
pub mod notification;
pub mod policy;
pub mod repository;
pub mod token;
pub mod types;
