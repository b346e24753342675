//! In-process store
//!
//! Keeps users and tasks in hash maps behind a single tokio `RwLock`. Each
//! operation holds the lock for its whole duration, which gives the same
//! atomicity the PostgreSQL store gets from single statements and
//! transactions. Clones share state.

use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::models::{
    CreateTask, CreateUser, SortField, Task, TaskPatch, TaskQuery, UpdateUser, User,
};

#[derive(Debug)]
struct UserRecord {
    user: User,
    avatar: Option<Vec<u8>>,
}

#[derive(Debug)]
struct TaskRecord {
    task: Task,
    // insertion order, used to break sort ties
    seq: u64,
}

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, UserRecord>,
    tasks: HashMap<Uuid, TaskRecord>,
    next_seq: u64,
}

impl State {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|r| r.user.email == email && Some(r.user.id) != except)
    }
}

/// [`Store`] that lives in process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn insert_user(&self, user: CreateUser) -> StoreResult<User> {
        let mut state = self.state.write().await;

        if state.email_taken(&user.email, None) {
            return Err(StoreError::DuplicateEmail);
        }

        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            age: user.age,
            tokens: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        state.users.insert(
            created.id,
            UserRecord {
                user: created.clone(),
                avatar: None,
            },
        );
        Ok(created)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).map(|r| r.user.clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|r| r.user.email == email)
            .map(|r| r.user.clone()))
    }

    async fn update_user(&self, id: Uuid, changes: UpdateUser) -> StoreResult<Option<User>> {
        let mut state = self.state.write().await;

        if let Some(email) = &changes.email {
            if state.email_taken(email, Some(id)) {
                return Err(StoreError::DuplicateEmail);
            }
        }

        let Some(record) = state.users.get_mut(&id) else {
            return Ok(None);
        };
        let user = &mut record.user;

        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(password_hash) = changes.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(age) = changes.age {
            user.age = age;
        }
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }

    async fn set_tokens(&self, id: Uuid, tokens: &[String]) -> StoreResult<bool> {
        let mut state = self.state.write().await;

        match state.users.get_mut(&id) {
            Some(record) => {
                record.user.tokens = tokens.to_vec();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_avatar(&self, id: Uuid, avatar: Option<Vec<u8>>) -> StoreResult<bool> {
        let mut state = self.state.write().await;

        match state.users.get_mut(&id) {
            Some(record) => {
                record.avatar = avatar;
                record.user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_avatar(&self, id: Uuid) -> StoreResult<Option<Vec<u8>>> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).and_then(|r| r.avatar.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;

        if !state.users.contains_key(&id) {
            return Ok(false);
        }

        state.tasks.retain(|_, r| r.task.owner != id);
        state.users.remove(&id);
        Ok(true)
    }

    async fn insert_task(&self, owner: Uuid, task: CreateTask) -> StoreResult<Task> {
        let mut state = self.state.write().await;

        if !state.users.contains_key(&owner) {
            return Err(StoreError::Database(format!("owner {} does not exist", owner)));
        }

        let now = Utc::now();
        let created = Task {
            id: Uuid::new_v4(),
            description: task.description,
            completed: task.completed,
            owner,
            created_at: now,
            updated_at: now,
        };

        let seq = state.next_seq;
        state.next_seq += 1;
        state.tasks.insert(
            created.id,
            TaskRecord {
                task: created.clone(),
                seq,
            },
        );
        Ok(created)
    }

    async fn find_task(&self, id: Uuid, owner: Uuid) -> StoreResult<Option<Task>> {
        let state = self.state.read().await;
        Ok(state
            .tasks
            .get(&id)
            .filter(|r| r.task.owner == owner)
            .map(|r| r.task.clone()))
    }

    async fn list_tasks(&self, owner: Uuid, query: &TaskQuery) -> StoreResult<Vec<Task>> {
        let state = self.state.read().await;

        let mut records: Vec<&TaskRecord> = state
            .tasks
            .values()
            .filter(|r| r.task.owner == owner)
            .filter(|r| query.completed.map_or(true, |c| r.task.completed == c))
            .collect();

        records.sort_by(|a, b| compare_records(a, b, query));

        let skip = query.skip.unwrap_or(0).max(0) as usize;
        let limit = query.limit.map_or(usize::MAX, |l| l.max(0) as usize);

        Ok(records
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|r| r.task.clone())
            .collect())
    }

    async fn update_task(
        &self,
        id: Uuid,
        owner: Uuid,
        patch: TaskPatch,
    ) -> StoreResult<Option<Task>> {
        let mut state = self.state.write().await;

        let Some(record) = state.tasks.get_mut(&id).filter(|r| r.task.owner == owner) else {
            return Ok(None);
        };
        let task = &mut record.task;

        if let Some(description) = patch.description {
            task.description = description;
        }
        if let Some(completed) = patch.completed {
            task.completed = completed;
        }
        task.updated_at = Utc::now();

        Ok(Some(task.clone()))
    }

    async fn delete_task(&self, id: Uuid, owner: Uuid) -> StoreResult<Option<Task>> {
        let mut state = self.state.write().await;

        let owned = state.tasks.get(&id).map_or(false, |r| r.task.owner == owner);
        if !owned {
            return Ok(None);
        }

        Ok(state.tasks.remove(&id).map(|r| r.task))
    }

    async fn count_tasks(&self, owner: Uuid) -> StoreResult<i64> {
        let state = self.state.read().await;
        Ok(state.tasks.values().filter(|r| r.task.owner == owner).count() as i64)
    }
}

/// Mirrors `PgStore`'s ORDER BY: requested field first, then creation order
fn compare_records(a: &TaskRecord, b: &TaskRecord, query: &TaskQuery) -> Ordering {
    match query.sort {
        None => a.seq.cmp(&b.seq),
        Some((SortField::CreatedAt, order)) => order.apply(
            a.task
                .created_at
                .cmp(&b.task.created_at)
                .then(a.seq.cmp(&b.seq)),
        ),
        Some((field, order)) => order
            .apply(field.compare(&a.task, &b.task))
            .then(a.seq.cmp(&b.seq)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SortOrder;

    fn new_user(email: &str) -> CreateUser {
        CreateUser {
            name: "Mike".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            age: 0,
        }
    }

    fn new_task(description: &str, completed: bool) -> CreateTask {
        CreateTask {
            description: description.to_string(),
            completed,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        store.insert_user(new_user("mike@example.com")).await.unwrap();

        let result = store.insert_user(new_user("mike@example.com")).await;
        assert!(matches!(result, Err(StoreError::DuplicateEmail)));
    }

    #[tokio::test]
    async fn test_update_to_taken_email_is_rejected() {
        let store = MemoryStore::new();
        let mike = store.insert_user(new_user("mike@example.com")).await.unwrap();
        store.insert_user(new_user("jess@example.com")).await.unwrap();

        let changes = UpdateUser {
            email: Some("jess@example.com".to_string()),
            ..Default::default()
        };
        let result = store.update_user(mike.id, changes).await;
        assert!(matches!(result, Err(StoreError::DuplicateEmail)));

        // keeping your own email is fine
        let changes = UpdateUser {
            email: Some("mike@example.com".to_string()),
            age: Some(30),
            ..Default::default()
        };
        let updated = store.update_user(mike.id, changes).await.unwrap().unwrap();
        assert_eq!(updated.age, 30);
    }

    #[tokio::test]
    async fn test_tasks_are_scoped_to_owner() {
        let store = MemoryStore::new();
        let one = store.insert_user(new_user("one@example.com")).await.unwrap();
        let two = store.insert_user(new_user("two@example.com")).await.unwrap();

        let task = store.insert_task(one.id, new_task("First task", false)).await.unwrap();

        assert!(store.find_task(task.id, two.id).await.unwrap().is_none());
        assert!(store.delete_task(task.id, two.id).await.unwrap().is_none());
        let patch = TaskPatch {
            completed: Some(true),
            ..Default::default()
        };
        assert!(store.update_task(task.id, two.id, patch).await.unwrap().is_none());

        let found = store.find_task(task.id, one.id).await.unwrap().unwrap();
        assert!(!found.completed);
        assert_eq!(store.count_tasks(one.id).await.unwrap(), 1);
        assert_eq!(store.count_tasks(two.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_user_cascades() {
        let store = MemoryStore::new();
        let one = store.insert_user(new_user("one@example.com")).await.unwrap();
        let two = store.insert_user(new_user("two@example.com")).await.unwrap();

        store.insert_task(one.id, new_task("a", false)).await.unwrap();
        store.insert_task(one.id, new_task("b", true)).await.unwrap();
        store.insert_task(two.id, new_task("c", false)).await.unwrap();

        assert!(store.delete_user(one.id).await.unwrap());
        assert!(store.find_user(one.id).await.unwrap().is_none());
        assert_eq!(store.count_tasks(one.id).await.unwrap(), 0);
        assert_eq!(store.count_tasks(two.id).await.unwrap(), 1);

        assert!(!store.delete_user(one.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_filter_sort_paginate() {
        let store = MemoryStore::new();
        let owner = store.insert_user(new_user("one@example.com")).await.unwrap();

        store.insert_task(owner.id, new_task("b", false)).await.unwrap();
        store.insert_task(owner.id, new_task("a", true)).await.unwrap();
        store.insert_task(owner.id, new_task("c", false)).await.unwrap();

        let all = store.list_tasks(owner.id, &TaskQuery::default()).await.unwrap();
        let names: Vec<&str> = all.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);

        let query = TaskQuery {
            completed: Some(false),
            ..Default::default()
        };
        assert_eq!(store.list_tasks(owner.id, &query).await.unwrap().len(), 2);

        let query = TaskQuery {
            sort: Some((SortField::Description, SortOrder::Desc)),
            ..Default::default()
        };
        let sorted = store.list_tasks(owner.id, &query).await.unwrap();
        let names: Vec<&str> = sorted.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(names, vec!["c", "b", "a"]);

        let query = TaskQuery {
            sort: Some((SortField::CreatedAt, SortOrder::Desc)),
            limit: Some(1),
            skip: Some(1),
            ..Default::default()
        };
        let page = store.list_tasks(owner.id, &query).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].description, "a");
    }

    #[tokio::test]
    async fn test_avatar_roundtrip_and_clear() {
        let store = MemoryStore::new();
        let user = store.insert_user(new_user("one@example.com")).await.unwrap();

        assert!(store.find_avatar(user.id).await.unwrap().is_none());
        assert!(store.set_avatar(user.id, Some(vec![1, 2, 3])).await.unwrap());
        assert_eq!(store.find_avatar(user.id).await.unwrap(), Some(vec![1, 2, 3]));

        assert!(store.set_avatar(user.id, None).await.unwrap());
        assert!(store.find_avatar(user.id).await.unwrap().is_none());
        assert!(!store.set_avatar(Uuid::new_v4(), None).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_tokens_overwrites_list() {
        let store = MemoryStore::new();
        let user = store.insert_user(new_user("one@example.com")).await.unwrap();

        store
            .set_tokens(user.id, &["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        store.set_tokens(user.id, &["c".to_string()]).await.unwrap();

        let user = store.find_user(user.id).await.unwrap().unwrap();
        assert_eq!(user.tokens, vec!["c".to_string()]);
    }
}
