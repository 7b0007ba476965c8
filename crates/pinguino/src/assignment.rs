//! Region and player bookkeeping owned by the coordinator.
//!
//! The table holds two mappings:
//!
//! - `region -> worker`: dense over `0..num_regions`, every region mapped.
//!   One worker may own several regions.
//! - `player -> region`: filled the first time a player is assigned and never
//!   changed afterwards.
//!
//! Every region referenced by `player -> region` exists in `region -> worker`
//! because regions are only ever added.

use crate::{Assignment, Error, PlayerId, Region, RegionPolicy, Result, WorkerIndex};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct AssignmentTable {
    region_to_worker: Vec<WorkerIndex>,
    player_to_region: HashMap<PlayerId, Region>,
    // Players per region, indexed like `region_to_worker`.
    load: Vec<usize>,
}

impl AssignmentTable {
    /// Builds a table with `num_regions` regions spread over `num_workers`
    /// workers. Region `r` is owned by worker `r % num_workers`, so with equal
    /// counts the mapping is the identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if regions are requested without any
    /// worker to own them.
    pub fn new(num_regions: u32, num_workers: usize) -> Result<Self> {
        if num_regions > 0 && num_workers == 0 {
            return Err(Error::InvalidConfig {
                reason: format!("{num_regions} regions requested but no workers exist"),
            });
        }

        let region_to_worker = (0..num_regions as usize)
            .map(|slot| WorkerIndex::new((slot % num_workers) as u32))
            .collect();

        Ok(Self {
            region_to_worker,
            player_to_region: HashMap::new(),
            load: vec![0; num_regions as usize],
        })
    }

    /// Number of regions in the table.
    pub fn num_regions(&self) -> usize {
        self.region_to_worker.len()
    }

    /// Number of players with an assignment.
    pub fn player_count(&self) -> usize {
        self.player_to_region.len()
    }

    /// Players currently assigned to each region.
    pub fn region_load(&self) -> &[usize] {
        &self.load
    }

    /// Worker owning `region`, or `None` past the last region.
    pub fn worker_for(&self, region: Region) -> Option<WorkerIndex> {
        self.region_to_worker.get(region.slot()).copied()
    }

    /// Returns the existing assignment for `player`, if any.
    pub fn lookup(&self, player: &PlayerId) -> Option<Assignment> {
        let region = *self.player_to_region.get(player)?;
        let worker = self.worker_for(region)?;
        Some(Assignment::new(region, worker))
    }

    /// Assigns `player` to a region chosen by `policy`, or returns the
    /// assignment it already has.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRegions`] when the table is empty.
    pub fn assign(&mut self, player: &PlayerId, policy: &dyn RegionPolicy) -> Result<Assignment> {
        if let Some(existing) = self.lookup(player) {
            return Ok(existing);
        }

        let region = policy
            .choose_region(&self.load)
            .filter(|region| region.slot() < self.region_to_worker.len())
            .ok_or(Error::NoRegions)?;
        let worker = self.region_to_worker[region.slot()];

        self.player_to_region.insert(player.clone(), region);
        self.load[region.slot()] += 1;

        Ok(Assignment::new(region, worker))
    }

    /// Adds one region per new worker, numbered after the existing regions.
    /// The `i`-th new region is owned by worker `first_worker + i`.
    ///
    /// Returns the new `(region, worker)` pairs in order.
    pub fn add_regions(&mut self, first_worker: WorkerIndex, count: usize) -> Vec<Assignment> {
        let first_region = self.region_to_worker.len();
        let mut added = Vec::with_capacity(count);

        for i in 0..count {
            let region = Region::new((first_region + i) as u32);
            let worker = WorkerIndex::new(first_worker.get() + i as u32);
            self.region_to_worker.push(worker);
            self.load.push(0);
            added.push(Assignment::new(region, worker));
        }

        added
    }
}
