//! In-memory store for tests and throwaway local runs.

use async_trait::async_trait;
use chrono::Utc;
use codeweaver_core::error::StoreError;
use codeweaver_core::generation::{Generation, NewGeneration, User};
use codeweaver_core::store::GenerationStore;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    /// Insertion order is creation order.
    generations: Vec<Generation>,
}

/// A store that keeps everything in two `Vec`s behind one lock.
/// Nothing survives a restart.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn new_user(external_id: &str, username: Option<&str>) -> User {
        User {
            id: Uuid::new_v4().to_string(),
            external_id: external_id.to_string(),
            username: username.map(String::from),
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
impl GenerationStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn upsert_user_by_external_id(&self, external_id: &str) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.users.iter().find(|u| u.external_id == external_id) {
            return Ok(user.clone());
        }
        let user = Self::new_user(external_id, None);
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn upsert_user_by_username(
        &self,
        username: &str,
        external_id: &str,
    ) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables
            .users
            .iter()
            .find(|u| u.username.as_deref() == Some(username))
        {
            return Ok(user.clone());
        }
        if tables.users.iter().any(|u| u.external_id == external_id) {
            return Err(StoreError::Query(format!(
                "external id '{external_id}' already belongs to another user"
            )));
        }
        let user = Self::new_user(external_id, Some(username));
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.external_id == external_id)
            .cloned())
    }

    async fn create_generation(&self, generation: NewGeneration) -> Result<Generation, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.users.iter().any(|u| u.id == generation.user_id) {
            return Err(StoreError::Query(format!(
                "no user with id '{}'",
                generation.user_id
            )));
        }
        let record = Generation {
            id: Uuid::new_v4().to_string(),
            user_id: generation.user_id,
            prompt: generation.prompt,
            language: generation.language,
            code: generation.code,
            created_at: Utc::now(),
        };
        tables.generations.push(record.clone());
        Ok(record)
    }

    async fn list_generations(
        &self,
        user_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Generation>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .generations
            .iter()
            .rev()
            .filter(|g| g.user_id == user_id)
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_generations(&self, user_id: &str) -> Result<usize, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .generations
            .iter()
            .filter(|g| g.user_id == user_id)
            .count())
    }
}
