pub mod batch;
pub mod bridge_table;
pub mod bridgedb;
pub mod config;
pub mod domain;
pub mod enrich;
pub mod error;
pub mod http;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod sparql;
pub mod staging;
pub mod svg;
pub mod tools;
