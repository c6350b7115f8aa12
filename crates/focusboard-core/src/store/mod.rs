//! Shared optimistic state: the task list of the signed-in user.

mod task_store;

#[cfg(test)]
mod task_store_tests;

pub use task_store::TaskStore;
