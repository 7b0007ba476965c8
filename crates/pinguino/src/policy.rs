//! Region selection for newly connecting players.
//!
//! [`RegionPolicy`] is the seam; [`UniformRandomPolicy`] draws from the
//! thread-local RNG and [`LeastLoadedPolicy`] fills the emptiest region.

use crate::Region;
use rand::{Rng, rng};

/// Chooses the region a newly connecting player is placed in.
///
/// `load[r]` is the number of players currently assigned to region `r`; its
/// length is the number of regions. Implementations return `None` only when
/// `load` is empty.
///
/// The choice is made once per player. Players are never rebalanced when the
/// load changes later.
///
/// # Example
///
/// ```
/// use pinguino::{Region, RegionPolicy};
///
/// struct AlwaysFirst;
/// impl RegionPolicy for AlwaysFirst {
///     fn choose_region(&self, load: &[usize]) -> Option<Region> {
///         (!load.is_empty()).then(|| Region::new(0))
///     }
/// }
///
/// assert_eq!(AlwaysFirst.choose_region(&[4, 0]), Some(Region::new(0)));
/// assert_eq!(AlwaysFirst.choose_region(&[]), None);
/// ```
pub trait RegionPolicy: Send + Sync {
    fn choose_region(&self, load: &[usize]) -> Option<Region>;
}

/// Picks a region uniformly at random, ignoring load.
#[derive(Default, Clone, Copy, Debug)]
pub struct UniformRandomPolicy;

impl RegionPolicy for UniformRandomPolicy {
    fn choose_region(&self, load: &[usize]) -> Option<Region> {
        if load.is_empty() {
            return None;
        }
        let slot = rng().random_range(0..load.len());
        Some(Region::new(slot as u32))
    }
}

/// Picks the region with the fewest players, preferring the lowest region on
/// ties.
#[derive(Default, Clone, Copy, Debug)]
pub struct LeastLoadedPolicy;

impl RegionPolicy for LeastLoadedPolicy {
    fn choose_region(&self, load: &[usize]) -> Option<Region> {
        load.iter()
            .enumerate()
            .min_by_key(|&(slot, players)| (*players, slot))
            .map(|(slot, _)| Region::new(slot as u32))
    }
}
