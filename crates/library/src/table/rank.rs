use super::{RecordTable, cell};
use crate::error::{ErrorKind, Result};
use std::collections::{BTreeSet, HashMap};
use tracing::instrument;

impl RecordTable {
    /// Adds a column numbering the distinct values of `order_by` within each
    /// group of `group_by`, starting at 0 in sorted order.
    ///
    /// This turns session labels into timepoints per participant: with
    /// sessions `ses-pre` and `ses-post` for one subject, records of
    /// `ses-post` get `0` and records of `ses-pre` get `1`. Records sharing a
    /// value share a rank. A null in either column gives a null rank.
    ///
    /// # Errors
    /// - [`ErrorKind::UnknownColumn`] if either source column does not exist.
    /// - [`ErrorKind::DuplicateColumn`] if `name` is already taken.
    #[instrument(skip(self), fields(rows = self.len()))]
    pub fn add_rank_column(&mut self, name: &str, group_by: &str, order_by: &str) -> Result<()> {
        for column in [group_by, order_by] {
            if !self.has_column(column) {
                exn::bail!(ErrorKind::UnknownColumn(column.to_string()));
            }
        }
        self.check_new_column(name)?;

        let pairs: Vec<Option<(String, String)>> =
            self.records.iter().map(|r| cell(r, group_by).zip(cell(r, order_by))).collect();
        let mut groups: HashMap<&str, BTreeSet<&str>> = HashMap::new();
        for (group, value) in pairs.iter().flatten() {
            groups.entry(group.as_str()).or_default().insert(value.as_str());
        }
        let values = pairs
            .iter()
            .map(|pair| {
                let (group, value) = pair.as_ref()?;
                let rank = groups.get(group.as_str())?.iter().position(|v| *v == value.as_str())?;
                Some(rank.to_string())
            })
            .collect();
        tracing::debug!(groups = groups.len(), "Ranked values within groups");
        self.add_column(name, values)
    }
}
