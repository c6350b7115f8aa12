//! Property tests for the optimistic task list.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use focusboard_core::repository::RepoOp;
use focusboard_core::{MemoryBackend, NewTask, Task, TaskStatus, TaskStore};
use proptest::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

fn status_strategy() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::Todo),
        Just(TaskStatus::Doing),
        Just(TaskStatus::Done),
    ]
}

#[derive(Debug, Clone)]
enum Op {
    Create { fail: bool },
    Delete { pick: usize, fail: bool },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<bool>().prop_map(|fail| Op::Create { fail }),
        (any::<usize>(), any::<bool>()).prop_map(|(pick, fail)| Op::Delete { pick, fail }),
    ]
}

fn ids(tasks: &[Task]) -> Vec<String> {
    tasks.iter().map(|t| t.id.clone()).collect()
}

proptest! {
    /// Loading sorts by status rank, then ascending order.
    #[test]
    fn load_sorts_by_status_then_order(
        entries in prop::collection::vec((status_strategy(), -50i64..50), 0..30)
    ) {
        let rt = runtime();
        let tasks = rt.block_on(async {
            let backend = Arc::new(MemoryBackend::new());
            for (i, (status, order)) in entries.iter().enumerate() {
                let mut t = NewTask::new(format!("t{i}"));
                t.status = *status;
                t.order = *order;
                backend
                    .seed_task(t.into_task(format!("seed-{i}"), "u1".into(), Utc::now()))
                    .await;
            }
            let store = TaskStore::new(backend);
            store.load("u1").await.unwrap();
            store.tasks()
        });

        prop_assert_eq!(tasks.len(), entries.len());
        for pair in tasks.windows(2) {
            let a = (pair[0].status.rank(), pair[0].order);
            let b = (pair[1].status.rank(), pair[1].order);
            prop_assert!(a <= b, "{:?} before {:?}", a, b);
        }
    }

    /// Ids stay unique under any create/delete sequence, failed creates
    /// leave nothing behind and failed deletes restore the list exactly.
    #[test]
    fn create_delete_sequences_keep_the_list_consistent(
        ops in prop::collection::vec(op_strategy(), 1..25)
    ) {
        let rt = runtime();
        rt.block_on(async {
            let backend = Arc::new(MemoryBackend::new());
            let store = TaskStore::new(backend.clone());
            store.load("u1").await.unwrap();

            for op in ops {
                match op {
                    Op::Create { fail } => {
                        if fail {
                            backend.fail(RepoOp::CreateTask);
                        }
                        let before = ids(&store.tasks());
                        let result = store.create(NewTask::new("task")).await;
                        backend.heal(RepoOp::CreateTask);
                        if fail {
                            assert!(result.is_err());
                            assert_eq!(ids(&store.tasks()), before);
                        } else {
                            assert!(result.is_ok());
                        }
                        assert!(store.tasks().iter().all(|t| !t.is_provisional()));
                    }
                    Op::Delete { pick, fail } => {
                        let before = store.tasks();
                        if before.is_empty() {
                            continue;
                        }
                        let id = before[pick % before.len()].id.clone();
                        if fail {
                            backend.fail(RepoOp::DeleteTask);
                        }
                        let result = store.delete(&id).await;
                        backend.heal(RepoOp::DeleteTask);
                        if fail {
                            assert!(result.is_err());
                            assert_eq!(store.tasks(), before);
                        } else {
                            assert!(store.task(&id).is_none());
                        }
                    }
                }

                let tasks = store.tasks();
                let unique: HashSet<_> = tasks.iter().map(|t| t.id.as_str()).collect();
                assert_eq!(unique.len(), tasks.len());
            }
        });
    }
}
