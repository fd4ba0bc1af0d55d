//! Counters over run results.
//!
//! `AttemptStats` summarizes attempt records with a success percentage and
//! `ObjectTally` counts classified directory objects per category.
use crate::finding::AttemptRecord;
use crate::ldap::ObjectKind;

fn pct(n: usize, d: usize) -> String {
    if d == 0 {
        return "0.0%".to_string();
    }
    format!("{:.1}%", (n as f64) / (d as f64) * 100.0)
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AttemptStats {
    pub total: usize,
    pub succeeded: usize,
    pub success_percentage: String,
}

pub fn attempt_stats(attempts: &[AttemptRecord]) -> AttemptStats {
    let succeeded = attempts.iter().filter(|a| a.succeeded).count();
    AttemptStats {
        total: attempts.len(),
        succeeded,
        success_percentage: pct(succeeded, attempts.len()),
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ObjectTally {
    pub users: usize,
    pub computers: usize,
    pub groups: usize,
    pub other: usize,
}

impl ObjectTally {
    pub fn record(&mut self, kind: ObjectKind) {
        match kind {
            ObjectKind::User => self.users += 1,
            ObjectKind::Computer => self.computers += 1,
            ObjectKind::Group => self.groups += 1,
            ObjectKind::Other => self.other += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.users + self.computers + self.groups + self.other
    }
}
