// Core crate: configuration, upstream data model, caches, and the HTTP
// clients for the fantasy stats provider and the video platform.

pub mod cache;
pub mod config;
pub mod model;
pub mod roster;
pub mod sources;
pub mod store;
