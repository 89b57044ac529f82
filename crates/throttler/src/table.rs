//! Validated, immutable tier table

use std::collections::HashMap;

use crate::error::TableError;
use crate::tier::RateLimitTier;

/// Units one reservation takes from one tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Debit {
    /// Index into the table
    pub tier: usize,
    pub units: u32,
}

/// A tier resolved against the rest of the table
#[derive(Debug)]
pub(crate) struct ResolvedTier {
    pub id: String,
    pub capacity: u32,
    pub window: chrono::Duration,
    /// Everything reserving this tier debits: itself plus its linked tiers,
    /// aggregated per tier and sorted by index (the lock order)
    pub debits: Vec<Debit>,
}

/// Static set of tiers, validated once at startup
///
/// Construction rejects duplicate ids, empty capacities or windows, links to
/// unknown tiers, zero weights, weights that could never be admitted and any
/// cycle in the link graph.
#[derive(Debug)]
pub struct TierTable {
    tiers: Vec<ResolvedTier>,
    index: HashMap<String, usize>,
}

impl TierTable {
    pub fn new(tiers: Vec<RateLimitTier>) -> Result<Self, TableError> {
        let mut index = HashMap::with_capacity(tiers.len());
        for (i, tier) in tiers.iter().enumerate() {
            if index.insert(tier.id.clone(), i).is_some() {
                return Err(TableError::DuplicateTier(tier.id.clone()));
            }
            if tier.capacity == 0 {
                return Err(TableError::ZeroCapacity(tier.id.clone()));
            }
            if tier.window.is_zero() {
                return Err(TableError::ZeroWindow(tier.id.clone()));
            }
        }

        for tier in &tiers {
            for link in &tier.linked {
                let Some(&target) = index.get(&link.tier_id) else {
                    return Err(TableError::UnknownLinkedTier {
                        tier_id: tier.id.clone(),
                        linked: link.tier_id.clone(),
                    });
                };
                if link.weight == 0 {
                    return Err(TableError::ZeroWeight {
                        tier_id: tier.id.clone(),
                        linked: link.tier_id.clone(),
                    });
                }
                let capacity = tiers[target].capacity;
                if link.weight > capacity {
                    return Err(TableError::WeightExceedsCapacity {
                        tier_id: tier.id.clone(),
                        linked: link.tier_id.clone(),
                        weight: link.weight,
                        capacity,
                    });
                }
            }
        }

        check_acyclic(&tiers, &index)?;

        let mut resolved = Vec::with_capacity(tiers.len());
        for (i, tier) in tiers.iter().enumerate() {
            let window = chrono::Duration::from_std(tier.window)
                .map_err(|_| TableError::WindowOutOfRange(tier.id.clone()))?;

            let mut units: HashMap<usize, u32> = HashMap::new();
            units.insert(i, 1);
            for link in &tier.linked {
                *units.entry(index[&link.tier_id]).or_insert(0) += link.weight;
            }
            let mut debits: Vec<Debit> = units
                .into_iter()
                .map(|(tier, units)| Debit { tier, units })
                .collect();
            debits.sort_by_key(|d| d.tier);

            resolved.push(ResolvedTier {
                id: tier.id.clone(),
                capacity: tier.capacity,
                window,
                debits,
            });
        }

        Ok(Self {
            tiers: resolved,
            index,
        })
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn contains(&self, tier_id: &str) -> bool {
        self.index.contains_key(tier_id)
    }

    /// Tier ids in table order
    pub fn tier_ids(&self) -> impl Iterator<Item = &str> {
        self.tiers.iter().map(|t| t.id.as_str())
    }

    /// `(tier_id, units)` debited by reserving `tier_id`
    pub fn debits_for(&self, tier_id: &str) -> Option<Vec<(&str, u32)>> {
        let tier = self.get(self.index_of(tier_id)?);
        Some(
            tier.debits
                .iter()
                .map(|d| (self.tiers[d.tier].id.as_str(), d.units))
                .collect(),
        )
    }

    pub(crate) fn index_of(&self, tier_id: &str) -> Option<usize> {
        self.index.get(tier_id).copied()
    }

    pub(crate) fn get(&self, index: usize) -> &ResolvedTier {
        &self.tiers[index]
    }
}

/// Depth-first search over the link graph; a back edge is a cycle
fn check_acyclic(
    tiers: &[RateLimitTier],
    index: &HashMap<String, usize>,
) -> Result<(), TableError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        InProgress,
        Done,
    }

    fn visit(
        node: usize,
        tiers: &[RateLimitTier],
        index: &HashMap<String, usize>,
        marks: &mut [Mark],
        path: &mut Vec<usize>,
    ) -> Result<(), TableError> {
        marks[node] = Mark::InProgress;
        path.push(node);

        for link in &tiers[node].linked {
            let next = index[&link.tier_id];
            match marks[next] {
                Mark::InProgress => {
                    let start = path.iter().position(|&n| n == next).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        path[start..].iter().map(|&n| tiers[n].id.clone()).collect();
                    cycle.push(tiers[next].id.clone());
                    return Err(TableError::CyclicLinkage(cycle));
                }
                Mark::Unvisited => visit(next, tiers, index, marks, path)?,
                Mark::Done => {}
            }
        }

        path.pop();
        marks[node] = Mark::Done;
        Ok(())
    }

    let mut marks = vec![Mark::Unvisited; tiers.len()];
    let mut path = Vec::new();
    for node in 0..tiers.len() {
        if marks[node] == Mark::Unvisited {
            visit(node, tiers, index, &mut marks, &mut path)?;
        }
    }
    Ok(())
}
