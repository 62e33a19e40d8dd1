//! Connection lifecycle: `suggested -> accepted`

use tracing::info;
use uuid::Uuid;

use crate::error::{MatchError, Result};
use crate::models::Connection;
use crate::services::stores::ConnectionStore;

/// Accept a suggested connection.
///
/// Accepting an already accepted connection returns it unchanged.
pub async fn accept(store: &dyn ConnectionStore, id: Uuid) -> Result<Connection> {
  let mut connection =
    store.get(id).await.map_err(MatchError::store)?.ok_or(MatchError::ConnectionNotFound { id })?;

  if connection.accept() {
    store.mark_accepted(id).await.map_err(MatchError::store)?;
    info!(connection = %id, user_id = connection.user_id, "Connection accepted");
  }

  Ok(connection)
}

pub async fn fetch(store: &dyn ConnectionStore, id: Uuid) -> Result<Connection> {
  store.get(id).await.map_err(MatchError::store)?.ok_or(MatchError::ConnectionNotFound { id })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{Candidate, ConnectionState, NewConnection};
  use crate::services::memory::MemoryStore;

  async fn suggested(store: &MemoryStore) -> Connection {
    let proposal = NewConnection::pair(1, &Candidate::new(2, "theirs", 0.2), "user2", "mine");
    store.insert(proposal).await.unwrap()
  }

  #[tokio::test]
  async fn test_accept_moves_to_accepted() {
    let store = MemoryStore::new();
    let connection = suggested(&store).await;

    let accepted = accept(&store, connection.id).await.unwrap();
    assert_eq!(accepted.state, ConnectionState::Accepted);
    assert_eq!(fetch(&store, connection.id).await.unwrap().state, ConnectionState::Accepted);
  }

  #[tokio::test]
  async fn test_accept_twice_is_idempotent() {
    let store = MemoryStore::new();
    let connection = suggested(&store).await;

    accept(&store, connection.id).await.unwrap();
    let again = accept(&store, connection.id).await.unwrap();
    assert_eq!(again.state, ConnectionState::Accepted);
    assert_eq!(store.connections().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn test_accept_unknown_connection() {
    let store = MemoryStore::new();
    let id = Uuid::new_v4();
    assert!(matches!(accept(&store, id).await.unwrap_err(), MatchError::ConnectionNotFound { id: missing } if missing == id));
  }
}
