//! Partitioning of a catalog into normal clusters and super-cluster bins.

use crate::catalog::ClusterCatalog;
use spall_core::{ClusterId, GroupId, NetworkError, Species};

/// Which clusters to coarse-grain and how wide each bin is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupingConfig {
    /// Species whose pure clusters are grouped.
    pub species: Species,
    /// Smallest grouped size. Must be at least 2 so single-atom emitters
    /// stay individually resolved.
    pub threshold: u32,
    /// Number of consecutive sizes per bin.
    pub width: u32,
}

impl GroupingConfig {
    /// Check the configuration itself, independent of any catalog.
    pub fn validate(&self) -> Result<(), NetworkError> {
        if self.threshold < 2 {
            return Err(NetworkError::InvalidGrouping {
                reason: format!("threshold must be >= 2, got {}", self.threshold),
            });
        }
        if self.width == 0 {
            return Err(NetworkError::InvalidGrouping {
                reason: "width must be >= 1".into(),
            });
        }
        Ok(())
    }
}

/// Where a catalog entry ends up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Individually resolved cluster.
    Normal(ClusterId),
    /// Member of a super-cluster bin.
    Grouped(GroupId),
}

/// A contiguous size range of the grouped species.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bin {
    /// Grouped species.
    pub species: Species,
    /// Smallest size (inclusive).
    pub low: u32,
    /// Largest size (inclusive).
    pub high: u32,
    /// Catalog indices of the members, ascending in size.
    pub members: Vec<usize>,
}

/// Result of partitioning a catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partition {
    /// Grouped species, if grouping was requested.
    pub species: Option<Species>,
    /// Catalog indices of normal clusters, in slot order.
    pub normal: Vec<usize>,
    /// Bins in ascending size order.
    pub bins: Vec<Bin>,
    /// Placement of every catalog entry, indexed by catalog index.
    pub placement: Vec<Placement>,
}

/// Split `catalog` into normal clusters and fixed-width bins.
///
/// Bins run contiguously from the threshold to the largest pure size of
/// the grouped species; only the last may be narrower than the
/// configured width. A bin containing no catalog entry is an error.
pub fn partition(
    catalog: &ClusterCatalog,
    config: Option<&GroupingConfig>,
) -> Result<Partition, NetworkError> {
    let entries = catalog.entries();
    let grouped = |i: usize| -> Option<u32> {
        let cfg = config?;
        let comp = &entries[i].composition;
        (comp.pure_species() == Some(cfg.species) && comp.size() >= cfg.threshold)
            .then(|| comp.size())
    };

    let mut bins = Vec::new();
    if let Some(cfg) = config {
        cfg.validate()?;
        let max = (0..entries.len()).filter_map(grouped).max();
        if let Some(max) = max {
            let mut low = cfg.threshold;
            while low <= max {
                let high = low.saturating_add(cfg.width - 1).min(max);
                let mut members: Vec<usize> = (0..entries.len())
                    .filter(|&i| grouped(i).is_some_and(|s| s >= low && s <= high))
                    .collect();
                if members.is_empty() {
                    return Err(NetworkError::EmptySuperCluster {
                        species: cfg.species,
                        low,
                        high,
                    });
                }
                members.sort_by_key(|&i| entries[i].composition.size());
                if high - low + 1 < cfg.width {
                    log::warn!(
                        "last {} bin [{low}..={high}] is narrower than width {}",
                        cfg.species,
                        cfg.width
                    );
                }
                bins.push(Bin {
                    species: cfg.species,
                    low,
                    high,
                    members,
                });
                match high.checked_add(1) {
                    Some(next) => low = next,
                    None => break,
                }
            }
        } else {
            log::warn!(
                "grouping requested for {} but no catalog entry reaches size {}",
                cfg.species,
                cfg.threshold
            );
        }
    }

    let mut placement = vec![Placement::Normal(ClusterId(0)); entries.len()];
    let mut normal = Vec::new();
    for i in 0..entries.len() {
        if grouped(i).is_none() {
            placement[i] = Placement::Normal(ClusterId(normal.len() as u32));
            normal.push(i);
        }
    }
    for (g, bin) in bins.iter().enumerate() {
        for &i in &bin.members {
            placement[i] = Placement::Grouped(GroupId(g as u32));
        }
    }

    Ok(Partition {
        species: config.map(|c| c.species),
        normal,
        bins,
        placement,
    })
}
