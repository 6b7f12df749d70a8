//! Hop-distance views and their merge algebra.

use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

/// Per-node membership view: every known address mapped to an estimated
/// hop-distance (self = 0). Keyed by address so iteration, rendering, and
/// encoding are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct View(BTreeMap<Ipv4Addr, u32>);

impl View {
    pub fn new() -> Self {
        View(BTreeMap::new())
    }

    pub fn insert(&mut self, addr: Ipv4Addr, hops: u32) {
        self.0.insert(addr, hops);
    }

    pub fn get(&self, addr: &Ipv4Addr) -> Option<u32> {
        self.0.get(addr).copied()
    }

    pub fn contains(&self, addr: &Ipv4Addr) -> bool {
        self.0.contains_key(addr)
    }

    /// Delete an address if present. Idempotent.
    pub fn remove(&mut self, addr: &Ipv4Addr) {
        self.0.remove(addr);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Ipv4Addr, &u32)> {
        self.0.iter()
    }

    /// Pointwise minimum over the union of both key sets; an address absent
    /// from one side keeps the other side's distance. Commutative,
    /// idempotent, and associative, so repeated exchanges converge no matter
    /// the order or duplication of gossip.
    pub fn merge(&self, other: &View) -> View {
        let mut merged = self.0.clone();
        for (&addr, &hops) in &other.0 {
            match merged.get(&addr) {
                Some(&current) if current <= hops => {}
                _ => {
                    merged.insert(addr, hops);
                }
            }
        }
        View(merged)
    }

    /// One more relay between each entry's origin and us. Applied to a push
    /// payload before it is merged.
    pub fn increase_hops(&self) -> View {
        View(
            self.0
                .iter()
                .map(|(&addr, &hops)| (addr, hops.saturating_add(1)))
                .collect(),
        )
    }
}

impl FromIterator<(Ipv4Addr, u32)> for View {
    fn from_iter<T: IntoIterator<Item = (Ipv4Addr, u32)>>(iter: T) -> Self {
        View(iter.into_iter().collect())
    }
}

impl fmt::Display for View {
    /// `{10.0.0.1: 0, 10.0.0.2: 1}`; parsed downstream, keep stable.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (addr, hops)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", addr, hops)?;
        }
        write!(f, "}}")
    }
}
