//! Domain layer: files, statuses, parameters, repositories and results

pub mod entities;
pub mod value_objects;
