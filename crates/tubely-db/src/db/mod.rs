//! Video record repositories

mod memory;
mod video;

pub use memory::InMemoryVideoRepository;
pub use video::{run_migrations, PostgresVideoRepository, VideoRepository};
