//! # Domain Topology
//!
//! Parent/child edges between power domains. A child may only be on while
//! its parent is on, so the edges must form a DAG and power-on walks them in
//! topological order:
//!
//! ```text
//!        mm_core            vpu_vcore ──────────────┐
//!       ┌───┼───┐               │                   │ (SRAM retention)
//!       ▼   ▼   ▼               ▼                   ▼
//!      cam isp  dp           vpu_conn ──────▶ vpu_core0..2
//! ```
//!
//! ## Topological Sort Algorithm
//!
//! Kahn's algorithm, lowest index first within a layer so the order is
//! stable with respect to the SoC table:
//!
//! 1. Compute in-degree for each domain
//! 2. Queue every domain with in-degree zero
//! 3. Pop the lowest index, emit it, decrement its children
//! 4. Repeat until the queue is empty
//! 5. If not every domain was emitted → cycle

use alloc::collections::BTreeSet;
use alloc::vec;
use alloc::vec::Vec;

use scpsys_hal::{Error, Result};

/// Graph statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphStats {
    /// Number of domains
    pub total_nodes: usize,
    /// Number of parent/child edges
    pub total_edges: usize,
    /// Domains without a parent
    pub root_nodes: usize,
    /// Longest parent chain (edges)
    pub max_depth: usize,
}

/// Parent/child relation over domain indices
#[derive(Debug, Clone, Default)]
pub struct DomainGraph {
    parents: Vec<Vec<usize>>,
    children: Vec<Vec<usize>>,
}

impl DomainGraph {
    /// Graph of `len` unconnected domains
    pub fn new(len: usize) -> Self {
        Self {
            parents: vec![Vec::new(); len],
            children: vec![Vec::new(); len],
        }
    }

    /// Number of domains
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    /// Whether the graph has no domains
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Add `parent → child`; duplicate edges are ignored
    pub fn add_edge(&mut self, parent: usize, child: usize) -> Result<()> {
        if parent >= self.len() || child >= self.len() || parent == child {
            return Err(Error::InvalidConfig);
        }
        if !self.children[parent].contains(&child) {
            self.children[parent].push(child);
            self.parents[child].push(parent);
        }
        Ok(())
    }

    /// Direct parents of `index`
    pub fn parents(&self, index: usize) -> &[usize] {
        self.parents.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Direct children of `index`
    pub fn children(&self, index: usize) -> &[usize] {
        self.children.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All edges as `(parent, child)`
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.children
            .iter()
            .enumerate()
            .flat_map(|(parent, children)| {
                children.iter().map(move |&child| (parent, child))
            })
    }

    /// Parents before children; `InvalidConfig` if the edges contain a cycle
    pub fn topological_order(&self) -> Result<Vec<usize>> {
        let mut result = Vec::with_capacity(self.len());
        let mut in_degree: Vec<usize> = self.parents.iter().map(Vec::len).collect();
        let mut ready: BTreeSet<usize> = (0..self.len()).filter(|&i| in_degree[i] == 0).collect();

        while let Some(current) = ready.pop_first() {
            result.push(current);
            for &child in &self.children[current] {
                in_degree[child] -= 1;
                if in_degree[child] == 0 {
                    ready.insert(child);
                }
            }
        }

        if result.len() != self.len() {
            let stuck: Vec<usize> = (0..self.len()).filter(|i| !result.contains(i)).collect();
            log::error!("power domain cycle through {:?}", stuck);
            return Err(Error::InvalidConfig);
        }

        Ok(result)
    }

    /// Compute graph statistics
    pub fn stats(&self) -> Result<GraphStats> {
        let order = self.topological_order()?;
        let mut depth = vec![0usize; self.len()];
        for &node in &order {
            for &child in self.children(node) {
                depth[child] = depth[child].max(depth[node] + 1);
            }
        }

        Ok(GraphStats {
            total_nodes: self.len(),
            total_edges: self.edges().count(),
            root_nodes: self.parents.iter().filter(|p| p.is_empty()).count(),
            max_depth: depth.into_iter().max().unwrap_or(0),
        })
    }
}
