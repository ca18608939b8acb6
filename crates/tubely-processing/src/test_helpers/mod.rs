//! In-memory doubles for the pipeline's collaborators.

pub mod fake_toolkit;
pub mod mock_storage;

pub use fake_toolkit::FakeToolkit;
pub use mock_storage::MockStorage;
