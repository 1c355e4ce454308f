//! In-memory task store.
//!
//! Tasks live for the process lifetime only. Besides the id map the store
//! keeps the creation order, which drives FIFO admission and listing.

use std::collections::HashMap;

use tokio::sync::RwLock;
use vidgen_core::{CoreError, Task, TaskId, TaskStatus};

#[derive(Default)]
struct Tasks {
    by_id: HashMap<TaskId, Task>,
    /// Ids in insertion order.
    order: Vec<TaskId>,
}

impl Tasks {
    fn insert(&mut self, task: Task) {
        let id = task.id();
        if self.by_id.insert(id, task).is_none() {
            self.order.push(id);
        }
    }

    fn ordered(&self) -> impl DoubleEndedIterator<Item = &Task> + '_ {
        self.order.iter().filter_map(|id| self.by_id.get(id))
    }
}

#[derive(Default)]
pub struct TaskStore {
    tasks: RwLock<Tasks>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a task. A replaced task keeps its position.
    pub async fn put(&self, task: Task) {
        self.tasks.write().await.insert(task);
    }

    /// Insert several tasks under a single write lock, preserving their order.
    pub async fn put_all(&self, tasks: impl IntoIterator<Item = Task>) {
        let mut guard = self.tasks.write().await;
        for task in tasks {
            guard.insert(task);
        }
    }

    pub async fn get(&self, id: TaskId) -> Result<Task, CoreError> {
        self.tasks
            .read()
            .await
            .by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::task_not_found(id))
    }

    /// All tasks, oldest first.
    pub async fn list(&self) -> Vec<Task> {
        self.tasks.read().await.ordered().cloned().collect()
    }

    /// All tasks, newest first.
    pub async fn list_newest_first(&self) -> Vec<Task> {
        self.tasks.read().await.ordered().rev().cloned().collect()
    }

    /// Tasks currently in `status`, oldest first.
    pub async fn list_by_status(&self, status: TaskStatus) -> Vec<Task> {
        self.tasks
            .read()
            .await
            .ordered()
            .filter(|t| t.status() == status)
            .cloned()
            .collect()
    }

    /// Look up a task by the identifier the generation API assigned to it.
    pub async fn find_by_external_id(&self, external_job_id: &str) -> Option<Task> {
        self.tasks
            .read()
            .await
            .by_id
            .values()
            .find(|t| t.external_job_id() == Some(external_job_id))
            .cloned()
    }

    pub async fn delete(&self, id: TaskId) -> Option<Task> {
        let mut guard = self.tasks.write().await;
        let removed = guard.by_id.remove(&id)?;
        guard.order.retain(|other| *other != id);
        Some(removed)
    }

    /// Remove every task matching `predicate`. Returns how many were removed.
    pub async fn delete_where<F>(&self, mut predicate: F) -> usize
    where
        F: FnMut(&Task) -> bool,
    {
        let mut guard = self.tasks.write().await;
        let before = guard.by_id.len();
        guard.by_id.retain(|_, task| !predicate(task));

        let Tasks { by_id, order } = &mut *guard;
        order.retain(|id| by_id.contains_key(id));
        before - by_id.len()
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.by_id.len()
    }

    /// Run `f` against a task while holding the write lock.
    ///
    /// This is the only way to mutate a stored task, so a status check made
    /// inside `f` cannot be raced by another writer.
    pub async fn update<F, R>(&self, id: TaskId, f: F) -> Result<R, CoreError>
    where
        F: FnOnce(&mut Task) -> R,
    {
        let mut guard = self.tasks.write().await;
        let task = guard
            .by_id
            .get_mut(&id)
            .ok_or_else(|| CoreError::task_not_found(id))?;
        Ok(f(task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use vidgen_core::TaskOptions;

    fn task(prompt: &str) -> Task {
        Task::new(TaskId::now_v7(), prompt, TaskOptions::default(), Utc::now())
    }

    #[tokio::test]
    async fn get_unknown_is_not_found() {
        let store = TaskStore::new();
        assert_matches!(
            store.get(TaskId::now_v7()).await,
            Err(CoreError::NotFound { entity: "Task", .. })
        );
    }

    #[tokio::test]
    async fn list_orders_by_insertion() {
        let store = TaskStore::new();
        let (a, b, c) = (task("a"), task("b"), task("c"));
        store.put(a.clone()).await;
        store.put_all([b.clone(), c.clone()]).await;

        let oldest: Vec<_> = store.list().await.iter().map(Task::id).collect();
        assert_eq!(oldest, vec![a.id(), b.id(), c.id()]);

        let newest: Vec<_> = store.list_newest_first().await.iter().map(Task::id).collect();
        assert_eq!(newest, vec![c.id(), b.id(), a.id()]);
    }

    #[tokio::test]
    async fn delete_keeps_remaining_order() {
        let store = TaskStore::new();
        let (a, b, c) = (task("a"), task("b"), task("c"));
        store.put_all([a.clone(), b.clone(), c.clone()]).await;

        assert!(store.delete(b.id()).await.is_some());
        assert!(store.delete(b.id()).await.is_none());

        let ids: Vec<_> = store.list().await.iter().map(Task::id).collect();
        assert_eq!(ids, vec![a.id(), c.id()]);
    }

    #[tokio::test]
    async fn update_mutates_in_place() {
        let store = TaskStore::new();
        let t = task("a");
        store.put(t.clone()).await;

        let now = Utc::now();
        store
            .update(t.id(), |task| task.begin_processing(now))
            .await
            .unwrap()
            .unwrap();
        store
            .update(t.id(), |task| task.begin_generating("ext-1", now))
            .await
            .unwrap()
            .unwrap();

        let found = store.find_by_external_id("ext-1").await.unwrap();
        assert_eq!(found.id(), t.id());
        assert_eq!(found.status(), TaskStatus::Generating);
        assert_eq!(store.list_by_status(TaskStatus::Pending).await.len(), 0);
    }

    #[tokio::test]
    async fn update_unknown_is_not_found() {
        let store = TaskStore::new();
        let result = store.update(TaskId::now_v7(), |_| ()).await;
        assert_matches!(result, Err(CoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_where_counts_removed() {
        let store = TaskStore::new();
        store.put_all([task("keep"), task("drop"), task("drop")]).await;

        let removed = store.delete_where(|t| t.prompt() == "drop").await;
        assert_eq!(removed, 2);
        assert_eq!(store.len().await, 1);
    }
}
