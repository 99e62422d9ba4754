//! AIS message store
//!
//! Ingests AIS position reports and static data into SQLite and answers
//! vessel, port and map tile queries with JSON documents.

pub mod config;
pub mod database;
pub mod documents;
pub mod errors;
pub mod models;
pub mod mqtt;
pub mod service;
pub mod tile_store;
pub mod tiles;
