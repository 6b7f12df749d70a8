//! Shared node state: the view, the peer directory, and the removed set,
//! mutated only through the protocol events defined here.
//!
//! The daemon wraps one `NodeState` in a single mutex; every cross-task read
//! or write of the three structures happens inside one critical section, so a
//! concurrent remove and merge cannot leave them inconsistent.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use crate::view::View;

pub struct NodeState {
    self_addr: Ipv4Addr,
    view: View,
    peers: BTreeSet<Ipv4Addr>,
    removed: BTreeSet<Ipv4Addr>,
}

impl NodeState {
    /// A node starts knowing only itself, at distance zero.
    pub fn new(self_addr: Ipv4Addr) -> Self {
        let mut view = View::new();
        view.insert(self_addr, 0);
        Self {
            self_addr,
            view,
            peers: BTreeSet::new(),
            removed: BTreeSet::new(),
        }
    }

    pub fn self_addr(&self) -> Ipv4Addr {
        self.self_addr
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    /// Directory contents for the prober, in address order.
    pub fn peers(&self) -> Vec<Ipv4Addr> {
        self.peers.iter().copied().collect()
    }

    pub fn is_peer(&self, addr: &Ipv4Addr) -> bool {
        self.peers.contains(addr)
    }

    pub fn is_removed(&self, addr: &Ipv4Addr) -> bool {
        self.removed.contains(addr)
    }

    /// An announce (re)admits the address to the directory; this is the only
    /// path out of the removed set. Returns whether the directory grew.
    pub fn on_announce(&mut self, addr: Ipv4Addr) -> bool {
        if addr == self.self_addr {
            return false;
        }
        self.removed.remove(&addr);
        self.peers.insert(addr)
    }

    /// Fold a received push payload into the view: one hop further from every
    /// origin, then pointwise minimum against what we already believe. The
    /// sole path by which remote distances enter the view.
    pub fn on_push(&mut self, incoming: &View) -> &View {
        self.view = self.view.merge(&incoming.increase_hops());
        &self.view
    }

    /// Copy of the current view with self re-asserted at distance zero, used
    /// for every outgoing push and every pull reply.
    pub fn snapshot(&mut self) -> View {
        self.view.insert(self.self_addr, 0);
        self.view.clone()
    }

    /// Evict an unreachable peer from both the view and the directory and
    /// record it in the removed set. Self is never evicted; evicting an
    /// address that is already absent everywhere is a no-op. Returns whether
    /// anything changed.
    pub fn evict(&mut self, addr: Ipv4Addr) -> bool {
        if addr == self.self_addr {
            return false;
        }
        let known = self.view.contains(&addr) || self.peers.contains(&addr);
        if !known {
            return false;
        }
        self.view.remove(&addr);
        self.peers.remove(&addr);
        self.removed.insert(addr);
        true
    }
}
