//! Tubely metadata store
//!
//! The ingestion pipeline only needs two operations from the store: fetch a
//! video record and write it back. [`VideoRepository`] captures that contract;
//! [`PostgresVideoRepository`] backs the service and [`InMemoryVideoRepository`]
//! backs tests and local experiments.

pub mod db;

pub use db::{
    run_migrations, InMemoryVideoRepository, PostgresVideoRepository, VideoRepository,
};
