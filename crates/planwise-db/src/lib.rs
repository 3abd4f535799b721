//! Persistence layer for planwise: row models, connection pooling,
//! embedded migrations, and the query functions the engine reads through.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
