//! Per-run reconciliation tally.

use std::fmt::{self, Write};

/// Outcome of one reconciliation run.
///
/// Each list holds one human-readable entry per entity and action. The
/// tally is the structured sync outcome; verbose logging augments it but
/// never replaces it, so it stays machine-parseable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStat {
    pub success_users: Vec<String>,
    pub failed_users: Vec<String>,
    pub success_groups: Vec<String>,
    pub failed_groups: Vec<String>,
    pub success_membership: Vec<String>,
    pub failed_membership: Vec<String>,
}

impl SyncStat {
    /// True when no entry landed in a failure list.
    pub fn is_clean(&self) -> bool {
        self.failed_users.is_empty()
            && self.failed_groups.is_empty()
            && self.failed_membership.is_empty()
    }

    /// True when the run produced no entries at all.
    pub fn is_empty(&self) -> bool {
        self.is_clean()
            && self.success_users.is_empty()
            && self.success_groups.is_empty()
            && self.success_membership.is_empty()
    }

    /// Render the six labelled sections, one tab-indented line per entry.
    /// Empty sections are omitted.
    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_to(&mut out);
        out
    }

    pub fn write_to(&self, w: &mut impl Write) -> fmt::Result {
        write_section(w, "Group Success", &self.success_groups)?;
        write_section(w, "Group Failure", &self.failed_groups)?;
        write_section(w, "User Success", &self.success_users)?;
        write_section(w, "User Failure", &self.failed_users)?;
        write_section(w, "Membership Success", &self.success_membership)?;
        write_section(w, "Membership Failure", &self.failed_membership)?;
        Ok(())
    }
}

fn write_section(w: &mut impl Write, title: &str, entries: &[String]) -> fmt::Result {
    if entries.is_empty() {
        return Ok(());
    }
    writeln!(w, "{title}:")?;
    for entry in entries {
        writeln!(w, "\t{entry}")?;
    }
    Ok(())
}
