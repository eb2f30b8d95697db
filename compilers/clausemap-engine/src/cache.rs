use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use clausemap_protocol::SlotMap;

use crate::order::{Assignment, OrderTable};
use crate::population::{GroupPopulationSource, PopulationError};

/// Order tables per V-group, built on first use from a population source.
pub struct OrderTableCache {
    tables: Mutex<HashMap<String, OrderTable>>,
    tolerance: f64,
}

impl OrderTableCache {
    pub fn new(tolerance: f64) -> Self {
        Self { tables: Mutex::new(HashMap::new()), tolerance }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, OrderTable>> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The cached table for `v_group`. A table flagged by an earlier
    /// assignment is rebuilt first.
    pub fn get_or_build(&self, v_group: &str, source: &dyn GroupPopulationSource) -> Result<OrderTable, PopulationError> {
        let mut tables = self.lock();
        Self::ensure(&mut tables, v_group, source, self.tolerance).map(|t| t.clone())
    }

    /// Re-reads the population and rebuilds, keeping columns stable within
    /// the cache's tolerance.
    pub fn rebuild(&self, v_group: &str, source: &dyn GroupPopulationSource) -> Result<OrderTable, PopulationError> {
        let population = source.group_population(v_group)?;
        let mut tables = self.lock();
        let table = match tables.get(v_group) {
            Some(previous) => previous.rebuild_stable(&population, self.tolerance),
            None => OrderTable::build(v_group, &population),
        };
        tables.insert(v_group.to_string(), table.clone());
        Ok(table)
    }

    pub fn invalidate(&self, v_group: &str) -> bool {
        self.lock().remove(v_group).is_some()
    }

    /// Installs a table loaded elsewhere, e.g. from a snapshot.
    pub fn insert(&self, table: OrderTable) {
        self.lock().insert(table.v_group.clone(), table);
    }

    pub fn contains(&self, v_group: &str) -> bool {
        self.lock().contains_key(v_group)
    }

    /// Positions `slots` against the group's table. Unknown keys extend the
    /// cached table and flag it for rebuild on next access.
    pub fn assign(
        &self,
        v_group: &str,
        source: &dyn GroupPopulationSource,
        slots: &SlotMap,
    ) -> Result<Assignment, PopulationError> {
        let mut tables = self.lock();
        let table = Self::ensure(&mut tables, v_group, source, self.tolerance)?;
        Ok(table.assign(slots))
    }

    /// Like [`assign`](Self::assign) for tables installed with
    /// [`insert`](Self::insert); `None` when the group has no table.
    pub fn assign_loaded(&self, v_group: &str, slots: &SlotMap) -> Option<Assignment> {
        self.lock().get_mut(v_group).map(|table| table.assign(slots))
    }

    fn ensure<'t>(
        tables: &'t mut HashMap<String, OrderTable>,
        v_group: &str,
        source: &dyn GroupPopulationSource,
        tolerance: f64,
    ) -> Result<&'t mut OrderTable, PopulationError> {
        let stale = tables.get(v_group).map(|t| t.needs_rebuild);
        match stale {
            Some(false) => {}
            Some(true) => {
                let population = source.group_population(v_group)?;
                if let Some(table) = tables.get_mut(v_group) {
                    tracing::debug!(v_group, "rebuilding flagged order table");
                    *table = table.rebuild_stable(&population, tolerance);
                }
            }
            None => {
                let population = source.group_population(v_group)?;
                tables.insert(v_group.to_string(), OrderTable::build(v_group, &population));
            }
        }
        tables
            .get_mut(v_group)
            .ok_or_else(|| PopulationError::UnknownGroup(v_group.to_string()))
    }
}

impl Default for OrderTableCache {
    fn default() -> Self {
        Self::new(0.5)
    }
}
