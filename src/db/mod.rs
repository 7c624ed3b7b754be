pub mod connectors;
pub mod dialect;
pub mod foreign_keys;
pub mod model;
pub mod naming;
pub mod schema;
pub mod type_mapper;
