//! Persistence trait for users and their generations.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::generation::{Generation, NewGeneration, User};

/// Storage backend for users and generation records.
///
/// Upserts must be atomic per call; handlers take no locks of their own.
#[async_trait]
pub trait GenerationStore: Send + Sync {
    /// Backend name for logs (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Fetch or create the user with this identity-provider subject id.
    async fn upsert_user_by_external_id(&self, external_id: &str) -> Result<User, StoreError>;

    /// Fetch or create the user with this username. `external_id` is only
    /// used when the row has to be created.
    async fn upsert_user_by_username(
        &self,
        username: &str,
        external_id: &str,
    ) -> Result<User, StoreError>;

    async fn find_user_by_external_id(&self, external_id: &str)
    -> Result<Option<User>, StoreError>;

    async fn create_generation(&self, generation: NewGeneration) -> Result<Generation, StoreError>;

    /// A user's generations, newest first.
    async fn list_generations(
        &self,
        user_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Generation>, StoreError>;

    async fn count_generations(&self, user_id: &str) -> Result<usize, StoreError>;
}
