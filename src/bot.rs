use std::sync::Arc;

use crate::config::Config;
use crate::conversation::{ConversationStore, Session};
use crate::dispatch::{self, HandlerContext, Incoming};
use crate::error::Result;
use crate::presentation::{Catalog, Reply};
use crate::store::JournalStore;

/// Owns everything a chat event needs: the record store, the per-user
/// sessions and the button catalog.
pub struct JournalBot {
    store: Arc<JournalStore>,
    sessions: ConversationStore,
    catalog: Catalog,
}

impl JournalBot {
    pub fn new(store: Arc<JournalStore>, catalog: Catalog) -> Self {
        Self {
            store,
            sessions: ConversationStore::new(),
            catalog,
        }
    }

    pub async fn from_config(config: &Config) -> Result<Self> {
        let db_path = config.resolve_db_path();
        tracing::info!(db_path = %db_path, "Opening journal store");
        let store = JournalStore::new(&db_path).await?;
        Ok(Self::new(Arc::new(store), config.catalog()))
    }

    pub async fn handle(&self, event: &Incoming) -> Result<Vec<Reply>> {
        let ctx = HandlerContext {
            store: &self.store,
            catalog: &self.catalog,
        };
        dispatch::dispatch(&ctx, &self.sessions, event).await
    }

    pub fn session(&self, user: i64) -> Session {
        self.sessions.get(user)
    }

    pub fn store(&self) -> &JournalStore {
        &self.store
    }
}
