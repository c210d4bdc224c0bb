//! Redis-backed [`TaskStore`].
//!
//! Each task is a JSON document at `task:{id}`. Insertion order lives in the
//! `tasks:index` list, since `KEYS` gives no ordering. Writes that race a
//! delete never recreate a document: updates use `SET XX` and clearing runs
//! as a single script.

use std::sync::Arc;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, Script};
use todo_shared::{Task, UpdateTaskRequest};
use tokio::sync::OnceCell;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::StoreResult;
use crate::store::TaskStore;

const INDEX_KEY: &str = "tasks:index";
const TASK_PREFIX: &str = "task:";

/// Deletes every indexed document and the index itself in one step, so a
/// concurrent create either lands before (and is removed) or after.
const DELETE_ALL_SCRIPT: &str = r"
local ids = redis.call('LRANGE', KEYS[1], 0, -1)
for _, id in ipairs(ids) do
    redis.call('DEL', ARGV[1] .. id)
end
redis.call('DEL', KEYS[1])
return #ids
";

fn task_key(id: &str) -> String {
    format!("{TASK_PREFIX}{id}")
}

#[derive(Clone)]
pub struct RedisTaskStore {
    client: Client,
    manager: Arc<OnceCell<ConnectionManager>>,
}

impl RedisTaskStore {
    /// Parses the connection string. No connection is made until first use.
    pub fn open(url: &str) -> StoreResult<Self> {
        Ok(Self {
            client: Client::open(url)?,
            manager: Default::default(),
        })
    }

    /// Round-trips a PING so startup can report an unreachable server early.
    pub async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    /// Shared connection, established on first use and reconnected by the
    /// manager afterwards.
    async fn connection(&self) -> StoreResult<ConnectionManager> {
        let manager = self
            .manager
            .get_or_try_init(|| self.client.get_connection_manager())
            .await?;
        Ok(manager.clone())
    }

    async fn read(&self, conn: &mut ConnectionManager, id: Uuid) -> StoreResult<Option<Task>> {
        let task_json: Option<String> = conn.get(task_key(&id.to_string())).await?;
        match task_json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Overwrites the document only if it still exists. Returns `false` when
    /// the task was deleted in the meantime.
    async fn write_existing(&self, conn: &mut ConnectionManager, task: &Task) -> StoreResult<bool> {
        let task_json = serde_json::to_string(task)?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(task_key(&task.id.to_string()))
            .arg(task_json)
            .arg("XX")
            .query_async(conn)
            .await?;
        Ok(reply.is_some())
    }
}

#[async_trait]
impl TaskStore for RedisTaskStore {
    async fn list_all(&self) -> StoreResult<Vec<Task>> {
        let mut conn = self.connection().await?;

        let ids: Vec<String> = conn.lrange(INDEX_KEY, 0, -1).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = ids.iter().map(|id| task_key(id)).collect();
        let docs: Vec<Option<String>> = redis::cmd("MGET").arg(&keys).query_async(&mut conn).await?;

        let mut tasks = Vec::with_capacity(docs.len());
        for (id, doc) in ids.iter().zip(docs) {
            match doc {
                Some(json) => tasks.push(serde_json::from_str::<Task>(&json)?),
                None => warn!(task_id = %id, "index entry without document, skipping"),
            }
        }
        Ok(tasks)
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Task>> {
        let mut conn = self.connection().await?;
        self.read(&mut conn, id).await
    }

    async fn create(&self, text: String, completed: bool) -> StoreResult<Task> {
        let task = Task::new(text, completed);
        let task_json = serde_json::to_string(&task)?;
        let id = task.id.to_string();

        let mut conn = self.connection().await?;
        let _: () = redis::pipe()
            .atomic()
            .set(task_key(&id), &task_json)
            .ignore()
            .rpush(INDEX_KEY, &id)
            .ignore()
            .query_async(&mut conn)
            .await?;

        debug!(task_id = %id, "task stored");
        Ok(task)
    }

    async fn update_by_id(&self, id: Uuid, patch: UpdateTaskRequest) -> StoreResult<Option<Task>> {
        let mut conn = self.connection().await?;

        let Some(mut task) = self.read(&mut conn, id).await? else {
            return Ok(None);
        };
        patch.apply_to(&mut task);

        if !self.write_existing(&mut conn, &task).await? {
            debug!(task_id = %id, "task deleted during update");
            return Ok(None);
        }
        Ok(Some(task))
    }

    async fn delete_by_id(&self, id: Uuid) -> StoreResult<bool> {
        let id = id.to_string();
        let mut conn = self.connection().await?;

        let (deleted, _): (usize, isize) = redis::pipe()
            .atomic()
            .del(task_key(&id))
            .lrem(INDEX_KEY, 0, &id)
            .query_async(&mut conn)
            .await?;
        Ok(deleted > 0)
    }

    async fn delete_all(&self) -> StoreResult<()> {
        let mut conn = self.connection().await?;

        let script = Script::new(DELETE_ALL_SCRIPT);
        let count: usize = script
            .key(INDEX_KEY)
            .arg(TASK_PREFIX)
            .invoke_async(&mut conn)
            .await?;

        debug!(count, "all tasks deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_layout() {
        assert_eq!(task_key("abc"), "task:abc");
    }

    #[test]
    fn open_rejects_bad_url() {
        assert!(RedisTaskStore::open("not a url").is_err());
    }

    fn live_store() -> RedisTaskStore {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        RedisTaskStore::open(&url).unwrap()
    }

    #[tokio::test]
    #[ignore = "needs a running Redis at REDIS_URL"]
    async fn round_trip_against_server() {
        let store = live_store();
        store.delete_all().await.unwrap();

        let a = store.create("a".into(), false).await.unwrap();
        let b = store.create("b".into(), false).await.unwrap();
        assert_eq!(store.list_all().await.unwrap(), vec![a.clone(), b.clone()]);

        let a2 = store
            .update_by_id(a.id, UpdateTaskRequest::completed(true))
            .await
            .unwrap()
            .unwrap();
        assert!(a2.completed);

        assert!(store.delete_by_id(a.id).await.unwrap());
        assert!(!store.delete_by_id(a.id).await.unwrap());
        assert_eq!(store.list_all().await.unwrap(), vec![b]);

        store.delete_all().await.unwrap();
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    #[ignore = "needs a running Redis at REDIS_URL"]
    async fn write_after_delete_does_not_resurrect_task() {
        let store = live_store();
        let task = store.create("gone".into(), false).await.unwrap();
        let mut conn = store.connection().await.unwrap();

        // Delete lands between the read and the write of an update.
        let mut stale = store.read(&mut conn, task.id).await.unwrap().unwrap();
        assert!(store.delete_by_id(task.id).await.unwrap());
        stale.completed = true;

        assert!(!store.write_existing(&mut conn, &stale).await.unwrap());
        assert_eq!(store.get_by_id(task.id).await.unwrap(), None);
        assert_eq!(
            store
                .update_by_id(task.id, UpdateTaskRequest::completed(true))
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    #[ignore = "needs a running Redis at REDIS_URL"]
    async fn delete_all_leaves_no_documents() {
        let store = live_store();
        let mut ids = Vec::new();
        for text in ["a", "b", "c"] {
            ids.push(store.create(text.into(), false).await.unwrap().id);
        }

        store.delete_all().await.unwrap();

        let mut conn = store.connection().await.unwrap();
        for id in ids {
            let exists: bool = conn.exists(task_key(&id.to_string())).await.unwrap();
            assert!(!exists, "task {id} survived delete_all");
        }
        let index: bool = conn.exists(INDEX_KEY).await.unwrap();
        assert!(!index);
    }

    #[tokio::test]
    async fn shares_one_lazy_connection_across_clones() {
        let store = RedisTaskStore::open("redis://127.0.0.1:1").unwrap();
        let clone = store.clone();
        assert!(Arc::ptr_eq(&store.manager, &clone.manager));
        assert!(store.manager.get().is_none());
    }
}
