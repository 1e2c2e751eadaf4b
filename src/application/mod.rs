//! Application services layer.

pub mod error;
pub mod items;
pub mod pagination;
pub mod repos;
