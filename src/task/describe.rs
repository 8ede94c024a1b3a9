// src/task/describe.rs

//! Human-readable diagnostics for tasks and their dependent subtrees.

use std::fmt::Write as _;

use crate::task::Task;

impl Task {
    /// One-line description: label, uid, state, and what the cell holds.
    ///
    /// ```text
    /// compile [#7] executing
    /// link [#8] finished (result set, completed 2026-08-30T12:01:05Z)
    /// ```
    pub fn describe(&self) -> String {
        let snap = self.snapshot();
        let mut out = format!("{} [{}] {}", snap.label, snap.uid, snap.state);

        let mut details: Vec<String> = Vec::new();
        if snap.has_result {
            details.push("result set".to_string());
        }
        if snap.has_error {
            details.push("error set".to_string());
        }
        if let Some(at) = snap.completed_at {
            details.push(format!("completed {}", at.format("%Y-%m-%dT%H:%M:%SZ")));
        }
        if !details.is_empty() {
            let _ = write!(out, " ({})", details.join(", "));
        }
        out
    }

    /// Recursive description of this task and its dependents, indented two
    /// spaces per graph depth. Dependents are listed in the order the
    /// graph returns them; a detached task describes only itself.
    ///
    /// The dependent relation is acyclic (a graph contract), so recursion
    /// terminates; diamonds are printed once per path, which is the useful
    /// view when debugging why a branch is stuck.
    pub fn describe_tree(&self) -> String {
        let mut out = String::new();
        self.describe_into(&mut out, 0);
        out
    }

    fn describe_into(&self, out: &mut String, depth: usize) {
        for _ in 0..depth {
            out.push_str("  ");
        }
        out.push_str(&self.describe());
        out.push('\n');
        if let Some(graph) = self.graph() {
            for dependent in graph.dependents(self) {
                dependent.describe_into(out, depth + 1);
            }
        }
    }
}
