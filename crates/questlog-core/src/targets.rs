use serde::{Deserialize, Serialize};

use crate::task::{new_id, non_empty, resolve_prefix};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeeklyTarget {
    pub id: String,
    pub text: String,
    pub completed: bool,
}

/// Weekly checklist, kept in the order items were added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetList {
    targets: Vec<WeeklyTarget>,
}

impl TargetList {
    pub fn new(targets: Vec<WeeklyTarget>) -> Self {
        Self { targets }
    }

    /// Checklist a fresh install starts with.
    pub fn seeded() -> Self {
        Self::new(vec![
            WeeklyTarget {
                id: "w1".to_string(),
                text: "Daily Meditation".to_string(),
                completed: false,
            },
            WeeklyTarget {
                id: "w2".to_string(),
                text: "Workout Session".to_string(),
                completed: false,
            },
        ])
    }

    pub fn as_slice(&self) -> &[WeeklyTarget] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&WeeklyTarget> {
        self.targets.iter().find(|t| t.id == id)
    }

    pub fn resolve_prefix(&self, prefix: &str) -> anyhow::Result<Option<String>> {
        resolve_prefix(self.targets.iter().map(|t| t.id.as_str()), prefix, "target")
    }

    pub fn completed_count(&self) -> usize {
        self.targets.iter().filter(|t| t.completed).count()
    }

    pub fn add(&mut self, text: &str) -> Option<String> {
        let text = non_empty(text)?;
        let id = new_id();
        self.targets.push(WeeklyTarget {
            id: id.clone(),
            text,
            completed: false,
        });
        Some(id)
    }

    pub fn toggle(&mut self, id: &str) -> bool {
        match self.targets.iter_mut().find(|t| t.id == id) {
            Some(target) => {
                target.completed = !target.completed;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.targets.len();
        self.targets.retain(|t| t.id != id);
        self.targets.len() != before
    }
}
