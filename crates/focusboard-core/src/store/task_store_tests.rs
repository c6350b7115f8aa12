//! Tests for task_store module.

#[cfg(test)]
mod tests {
    use super::super::task_store::*;
    use crate::error::{Recovery, TaskSyncError};
    use crate::repository::{MemoryBackend, RepoOp, TaskRepository};
    use crate::task::{NewTask, OrderUpdate, Subtask, Task, TaskPatch, TaskStatus};
    use std::sync::Arc;

    async fn signed_in() -> (Arc<MemoryBackend>, Arc<TaskStore>) {
        let backend = Arc::new(MemoryBackend::new());
        let store = Arc::new(TaskStore::new(backend.clone()));
        store.load("u1").await.unwrap();
        (backend, store)
    }

    fn ids(tasks: &[Task]) -> Vec<String> {
        tasks.iter().map(|t| t.id.clone()).collect()
    }

    #[tokio::test]
    async fn create_replaces_temporary_entry_with_confirmed_one() {
        let (backend, store) = signed_in().await;
        let task = store.create(NewTask::new("Write intro")).await.unwrap();

        let tasks = store.tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, task.id);
        assert!(!tasks[0].is_provisional());
        assert_eq!(tasks[0].completed_pomodoros, 0);
        assert_eq!(backend.stored_tasks("u1").await.len(), 1);
    }

    #[tokio::test]
    async fn temporary_entry_is_visible_while_create_is_in_flight() {
        let (backend, store) = signed_in().await;
        backend.hold(RepoOp::CreateTask);
        let pending = tokio::spawn({
            let store = store.clone();
            async move { store.create(NewTask::new("Draft")).await }
        });
        tokio::task::yield_now().await;

        let tasks = store.tasks();
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0].id.starts_with("opt-"));
        assert_eq!(tasks[0].title, "Draft");

        backend.release(RepoOp::CreateTask);
        let confirmed = pending.await.unwrap().unwrap();
        assert_eq!(ids(&store.tasks()), vec![confirmed.id]);
    }

    #[tokio::test]
    async fn failed_create_removes_temporary_entry() {
        let (backend, store) = signed_in().await;
        store.create(NewTask::new("keep")).await.unwrap();
        backend.fail(RepoOp::CreateTask);

        let err = store.create(NewTask::new("lost")).await.unwrap_err();
        assert_eq!(err.recovery(), Some(Recovery::RolledBack));
        assert!(err.is_user_facing());
        let tasks = store.tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "keep");
    }

    #[tokio::test]
    async fn create_requires_a_user_and_a_title() {
        let store = TaskStore::new(Arc::new(MemoryBackend::new()));
        assert!(matches!(
            store.create(NewTask::new("x")).await,
            Err(TaskSyncError::NotSignedIn)
        ));

        let (backend, store) = signed_in().await;
        assert!(matches!(
            store.create(NewTask::new("   ")).await,
            Err(TaskSyncError::Validation(_))
        ));
        assert_eq!(backend.calls(RepoOp::CreateTask), 0);
        assert!(store.tasks().is_empty());
    }

    #[tokio::test]
    async fn move_appends_to_destination_column() {
        let (backend, store) = signed_in().await;
        let a = store.create(NewTask::new("a")).await.unwrap();
        for title in ["b", "c"] {
            let mut t = NewTask::new(title);
            t.status = TaskStatus::Doing;
            store.create(t).await.unwrap();
        }

        store.move_task(&a.id, TaskStatus::Doing).await.unwrap();
        let moved = store.task(&a.id).unwrap();
        assert_eq!(moved.status, TaskStatus::Doing);
        assert_eq!(moved.order, 2);
        let stored = backend.stored_task(&a.id).await.unwrap();
        assert_eq!((stored.status, stored.order), (TaskStatus::Doing, 2));
    }

    #[tokio::test]
    async fn failed_move_reloads_server_truth() {
        let (backend, store) = signed_in().await;
        let a = store.create(NewTask::new("a")).await.unwrap();
        backend.fail(RepoOp::UpdateTask);
        let loads_before = backend.calls(RepoOp::ListTasks);

        let err = store.move_task(&a.id, TaskStatus::Done).await.unwrap_err();
        assert_eq!(err.recovery(), Some(Recovery::Reloaded));
        assert!(!err.is_user_facing());
        assert_eq!(backend.calls(RepoOp::ListTasks), loads_before + 1);
        assert_eq!(store.task(&a.id).unwrap().status, TaskStatus::Todo);
    }

    #[tokio::test]
    async fn failed_reload_keeps_optimistic_state() {
        let (backend, store) = signed_in().await;
        let a = store.create(NewTask::new("a")).await.unwrap();
        backend.fail(RepoOp::UpdateTask);
        backend.fail(RepoOp::ListTasks);

        let err = store.move_task(&a.id, TaskStatus::Done).await.unwrap_err();
        assert_eq!(err.recovery(), Some(Recovery::ReloadFailed));
        assert_eq!(store.task(&a.id).unwrap().status, TaskStatus::Done);
    }

    #[tokio::test]
    async fn unknown_task_makes_no_remote_call() {
        let (backend, store) = signed_in().await;
        assert!(matches!(
            store.move_task("ghost", TaskStatus::Done).await,
            Err(TaskSyncError::UnknownTask(_))
        ));
        assert!(matches!(
            store.delete("ghost").await,
            Err(TaskSyncError::UnknownTask(_))
        ));
        assert!(matches!(
            store.increment_pomodoro("ghost").await,
            Err(TaskSyncError::UnknownTask(_))
        ));
        assert_eq!(backend.calls(RepoOp::UpdateTask), 0);
        assert_eq!(backend.calls(RepoOp::DeleteTask), 0);
    }

    #[tokio::test]
    async fn edit_is_visible_before_the_remote_answers() {
        let (backend, store) = signed_in().await;
        let a = store.create(NewTask::new("a")).await.unwrap();
        backend.hold(RepoOp::UpdateTask);
        let pending = tokio::spawn({
            let store = store.clone();
            let id = a.id.clone();
            async move {
                store
                    .edit(
                        &id,
                        TaskPatch {
                            title: Some("renamed".into()),
                            ..TaskPatch::default()
                        },
                    )
                    .await
            }
        });
        tokio::task::yield_now().await;
        assert_eq!(store.task(&a.id).unwrap().title, "renamed");

        backend.release(RepoOp::UpdateTask);
        pending.await.unwrap().unwrap();
        assert_eq!(backend.stored_task(&a.id).await.unwrap().title, "renamed");
    }

    #[tokio::test]
    async fn failed_delete_restores_snapshot_in_order() {
        let (backend, store) = signed_in().await;
        for title in ["a", "b", "c"] {
            store.create(NewTask::new(title)).await.unwrap();
        }
        let before = store.tasks();
        backend.fail(RepoOp::DeleteTask);

        let err = store.delete(&before[1].id).await.unwrap_err();
        assert_eq!(err.recovery(), Some(Recovery::RolledBack));
        assert!(err.is_user_facing());
        assert_eq!(store.tasks(), before);
    }

    #[tokio::test]
    async fn delete_removes_locally_and_remotely() {
        let (backend, store) = signed_in().await;
        let a = store.create(NewTask::new("a")).await.unwrap();
        store.delete(&a.id).await.unwrap();
        assert!(store.tasks().is_empty());
        assert!(backend.stored_task(&a.id).await.is_none());
    }

    #[tokio::test]
    async fn reorder_validates_ids_before_touching_anything() {
        let (backend, store) = signed_in().await;
        let a = store.create(NewTask::new("a")).await.unwrap();
        let err = store
            .reorder(vec![
                OrderUpdate { id: a.id.clone(), order: 4 },
                OrderUpdate { id: "ghost".into(), order: 1 },
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, TaskSyncError::UnknownTask(id) if id == "ghost"));
        assert_eq!(store.task(&a.id).unwrap().order, 0);
        assert_eq!(backend.calls(RepoOp::BatchOrder), 0);
    }

    #[tokio::test]
    async fn reorder_applies_batch() {
        let (backend, store) = signed_in().await;
        let a = store.create(NewTask::new("a")).await.unwrap();
        let b = store.create(NewTask::new("b")).await.unwrap();
        store
            .reorder(vec![
                OrderUpdate { id: a.id.clone(), order: 1 },
                OrderUpdate { id: b.id.clone(), order: 0 },
            ])
            .await
            .unwrap();
        assert_eq!(store.task(&a.id).unwrap().order, 1);
        assert_eq!(backend.stored_task(&b.id).await.unwrap().order, 0);
    }

    #[tokio::test]
    async fn increment_sends_pre_increment_value() {
        let (backend, store) = signed_in().await;
        let a = store.create(NewTask::new("a")).await.unwrap();
        store.increment_pomodoro(&a.id).await.unwrap();
        store.increment_pomodoro(&a.id).await.unwrap();
        assert_eq!(store.task(&a.id).unwrap().completed_pomodoros, 2);
        assert_eq!(backend.stored_task(&a.id).await.unwrap().completed_pomodoros, 2);
    }

    #[tokio::test]
    async fn edit_cannot_set_completed_pomodoros() {
        let (backend, store) = signed_in().await;
        let a = store.create(NewTask::new("a")).await.unwrap();
        let patch = TaskPatch {
            completed_pomodoros: Some(7),
            ..TaskPatch::default()
        };

        let err = store.edit(&a.id, patch).await.unwrap_err();
        assert!(matches!(err, TaskSyncError::Validation(_)));
        assert_eq!(store.task(&a.id).unwrap().completed_pomodoros, 0);
        assert_eq!(backend.calls(RepoOp::UpdateTask), 0);
    }

    #[tokio::test]
    async fn failed_reorder_reloads_server_truth() {
        let (backend, store) = signed_in().await;
        let a = store.create(NewTask::new("a")).await.unwrap();
        let b = store.create(NewTask::new("b")).await.unwrap();
        backend.fail(RepoOp::BatchOrder);
        let loads_before = backend.calls(RepoOp::ListTasks);

        let err = store
            .reorder(vec![
                OrderUpdate { id: a.id.clone(), order: 9 },
                OrderUpdate { id: b.id.clone(), order: 8 },
            ])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TaskSyncError::Reorder {
                recovery: Recovery::Reloaded,
                ..
            }
        ));
        assert!(!err.is_user_facing());
        assert_eq!(backend.calls(RepoOp::ListTasks), loads_before + 1);
        assert_eq!(store.task(&a.id).unwrap().order, 0);
        assert_eq!(store.task(&b.id).unwrap().order, 0);
    }

    #[tokio::test]
    async fn failed_increment_reloads_server_truth() {
        let (backend, store) = signed_in().await;
        let a = store.create(NewTask::new("a")).await.unwrap();
        store.increment_pomodoro(&a.id).await.unwrap();
        backend.fail(RepoOp::UpdateTask);
        let loads_before = backend.calls(RepoOp::ListTasks);

        let err = store.increment_pomodoro(&a.id).await.unwrap_err();
        assert!(matches!(
            err,
            TaskSyncError::Increment {
                recovery: Recovery::Reloaded,
                ..
            }
        ));
        assert!(!err.is_user_facing());
        assert_eq!(backend.calls(RepoOp::ListTasks), loads_before + 1);
        assert_eq!(store.task(&a.id).unwrap().completed_pomodoros, 1);
    }

    #[tokio::test]
    async fn failed_subtask_update_reloads_server_truth() {
        let (backend, store) = signed_in().await;
        let a = store.create(NewTask::new("a")).await.unwrap();
        store.add_subtask(&a.id, "outline").await.unwrap();
        backend.fail(RepoOp::UpdateTask);
        let loads_before = backend.calls(RepoOp::ListTasks);

        let err = store
            .set_subtasks(&a.id, vec![Subtask::new("other").unwrap()])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TaskSyncError::Subtasks {
                recovery: Recovery::Reloaded,
                ..
            }
        ));
        assert!(!err.is_user_facing());
        assert_eq!(backend.calls(RepoOp::ListTasks), loads_before + 1);
        let subtasks = store.task(&a.id).unwrap().subtasks;
        assert_eq!(subtasks.len(), 1);
        assert_eq!(subtasks[0].title, "outline");
    }

    #[tokio::test]
    async fn subtasks_are_replaced_and_toggled() {
        let (backend, store) = signed_in().await;
        let a = store.create(NewTask::new("a")).await.unwrap();
        let sub = store.add_subtask(&a.id, " outline ").await.unwrap();
        store.toggle_subtask(&a.id, &sub.id).await.unwrap();

        let local = store.task(&a.id).unwrap();
        assert_eq!(local.subtasks.len(), 1);
        assert!(local.subtasks[0].completed);
        assert_eq!(backend.stored_task(&a.id).await.unwrap().subtasks, local.subtasks);

        assert!(store.toggle_subtask(&a.id, "nope").await.is_err());
        store
            .set_subtasks(&a.id, vec![Subtask::new("fresh").unwrap()])
            .await
            .unwrap();
        assert_eq!(store.task(&a.id).unwrap().subtasks[0].title, "fresh");
    }

    #[tokio::test]
    async fn load_sorts_by_status_then_order() {
        let backend = Arc::new(MemoryBackend::new());
        for (title, status, order) in [
            ("done", TaskStatus::Done, 0),
            ("todo-1", TaskStatus::Todo, 1),
            ("doing", TaskStatus::Doing, 0),
            ("todo-0", TaskStatus::Todo, 0),
        ] {
            let mut t = NewTask::new(title);
            t.status = status;
            t.order = order;
            backend.create("u1", t).await.unwrap();
        }
        let store = TaskStore::new(backend.clone());
        store.load("u1").await.unwrap();
        let titles: Vec<_> = store.tasks().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, ["todo-0", "todo-1", "doing", "done"]);
    }

    #[tokio::test]
    async fn failed_load_leaves_list_untouched() {
        let (backend, store) = signed_in().await;
        store.create(NewTask::new("a")).await.unwrap();
        backend.fail(RepoOp::ListTasks);
        assert!(matches!(
            store.load("u1").await,
            Err(TaskSyncError::Load { .. })
        ));
        assert_eq!(store.tasks().len(), 1);
    }

    #[tokio::test]
    async fn late_load_for_previous_user_is_discarded() {
        let (backend, store) = signed_in().await;
        backend.hold(RepoOp::ListTasks);
        let pending = tokio::spawn({
            let store = store.clone();
            async move { store.load("u2").await }
        });
        tokio::task::yield_now().await;
        store.sign_out();
        backend.release(RepoOp::ListTasks);
        pending.await.unwrap().unwrap();
        assert_eq!(store.user_id(), None);
        assert!(store.tasks().is_empty());
    }

    #[tokio::test]
    async fn rollback_after_sign_out_is_discarded() {
        let (backend, store) = signed_in().await;
        let a = store.create(NewTask::new("a")).await.unwrap();
        backend.fail(RepoOp::DeleteTask);
        backend.hold(RepoOp::DeleteTask);
        let pending = tokio::spawn({
            let store = store.clone();
            async move { store.delete(&a.id).await }
        });
        tokio::task::yield_now().await;
        store.sign_out();
        backend.release(RepoOp::DeleteTask);

        let err = pending.await.unwrap().unwrap_err();
        assert_eq!(err.recovery(), Some(Recovery::Discarded));
        assert!(store.tasks().is_empty());
    }
}
