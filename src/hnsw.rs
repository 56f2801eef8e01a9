//! Hierarchical proximity graph over individual vectors.
//!
//! This module provides:
//! - `HnswBuilder`: insertion with geometric level sampling, bounded
//!   ef-beam search, and RNG-style dominance pruning
//! - `HnswGraph`: the finished multi-layer graph in CSR (Compressed
//!   Sparse Row) format, queried read-only
//! - `GraphMetrics`: hop and distance-computation counters
//!
//! # Algorithm Overview
//!
//! Every base vector becomes one node. A node's top layer is drawn
//! geometrically with factor `1/ln(M)`; layer 0 contains all nodes with
//! up to `2M` neighbors, higher layers up to `M`. Search greedily
//! descends from the entry point through the upper layers, then runs a
//! bounded best-first search at layer 0 with beam width `ef`.
//!
//! Index variants hook into construction through a link filter, a
//! predicate consulted at neighbor-selection time ("may I link a to b?").
//! The sequence-graph index uses it to keep vectors of the same sequence
//! unlinked so that graph edges and within-sequence edges stay disjoint.
//!
//! # CSR Layout
//!
//! The finished graph packs each layer's adjacency contiguously:
//! `layer_neighbors[l]` holds all neighbor ids for layer `l`, and node
//! i's slice is `layer_neighbors[l][layer_offsets[l][i]..layer_offsets[l][i+1]]`.

use crate::distance::{DistFn, VectorDistance};
use crate::error::{Error, Result};
use crate::mapping::Vid;
use crate::visited::VisitedList;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Hard cap on layer indices; with `mL = 1/ln(16)` even billion-point
/// graphs stay well below this.
const MAX_LEVEL: usize = 16;

/// Graph construction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HnswParams {
    /// Target out-degree per node (M in the paper). Layer 0 allows `2M`.
    pub m: usize,
    /// Size of the dynamic candidate list during construction.
    pub ef_construction: usize,
    /// Probability factor for level generation (1/ln(M)).
    pub level_factor: f32,
    /// Seed for the level-sampling PRNG. `None` draws from entropy;
    /// fixing it makes builds reproducible.
    pub seed: Option<u64>,
}

impl Default for HnswParams {
    fn default() -> Self {
        let m = 16;
        Self {
            m,
            ef_construction: 200,
            level_factor: 1.0 / (m as f32).ln(),
            seed: None,
        }
    }
}

impl HnswParams {
    /// Create parameters with a specific M value.
    pub fn with_m(m: usize) -> Self {
        Self {
            m,
            ef_construction: 200,
            level_factor: 1.0 / (m as f32).ln(),
            seed: None,
        }
    }

    /// Set ef_construction.
    pub fn with_ef_construction(mut self, ef: usize) -> Self {
        self.ef_construction = ef;
        self
    }

    /// Fix the PRNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Query-time counters. Monotonic, best-effort; never fail a query.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphMetrics {
    /// Nodes expanded during search.
    pub hops: u64,
    /// Pointwise distance computations.
    pub dist_comps: u64,
}

impl GraphMetrics {
    /// Zero all counters.
    pub fn reset(&mut self) {
        *self = GraphMetrics::default();
    }
}

/// A candidate node ordered by distance.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    /// Node (vector) id.
    pub id: Vid,
    /// Distance to the query (lower is closer).
    pub dist: f32,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.dist == other.dist && self.id == other.id
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Closer = greater, so a BinaryHeap<Candidate> pops the nearest
        // and BinaryHeap<Reverse<Candidate>> pops the farthest. Ties break
        // toward the lower id for determinism.
        self.dist
            .partial_cmp(&other.dist)
            .unwrap_or(Ordering::Equal)
            .reverse()
            .then_with(|| other.id.cmp(&self.id))
    }
}

fn sort_ascending(cands: &mut Vec<Candidate>) {
    cands.sort_by(|a, b| {
        a.dist
            .partial_cmp(&b.dist)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Builder for the hierarchical proximity graph.
///
/// Holds a borrow of the caller's flat vector buffer; vectors are never
/// copied. Insert every vector id exactly once (any order), then call
/// `build` to freeze the graph into CSR form.
pub struct HnswBuilder<'a> {
    params: HnswParams,
    dim: usize,
    dist: DistFn,
    data: &'a [f32],
    levels: Vec<u8>,
    links: Vec<Vec<Vec<Vid>>>,
    entry_point: Option<Vid>,
    max_level: usize,
    rng: fastrand::Rng,
    visited: VisitedList,
    link_filter: Option<Box<dyn Fn(Vid, Vid) -> bool + 'a>>,
}

impl<'a> HnswBuilder<'a> {
    /// Create a builder over `data`, a flat buffer of `data.len() / dim`
    /// vectors.
    pub fn new(dim: usize, distance: VectorDistance, data: &'a [f32], params: HnswParams) -> Result<Self> {
        if dim == 0 {
            return Err(Error::invalid_arg("dim", "dimension must be at least 1"));
        }
        if params.m < 2 {
            return Err(Error::invalid_arg("m", "out-degree must be at least 2"));
        }
        if data.len() % dim != 0 {
            return Err(Error::WrongDimension {
                expected: dim,
                got: data.len() % dim,
            });
        }

        let n = data.len() / dim;
        let rng = match params.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };

        Ok(Self {
            params,
            dim,
            dist: distance.dist_fn(),
            data,
            levels: vec![0; n],
            links: vec![Vec::new(); n],
            entry_point: None,
            max_level: 0,
            rng,
            visited: VisitedList::new(n),
            link_filter: None,
        })
    }

    /// Install a link predicate consulted at neighbor-selection time.
    /// Candidates for which `filter(inserted, candidate)` is false are
    /// never linked. The predicate must be symmetric.
    pub fn with_link_filter(mut self, filter: impl Fn(Vid, Vid) -> bool + 'a) -> Self {
        self.link_filter = Some(Box::new(filter));
        self
    }

    /// The builder's PRNG, exposed so callers can derive a reproducible
    /// insertion-order shuffle from the same seed.
    pub fn rng(&mut self) -> &mut fastrand::Rng {
        &mut self.rng
    }

    #[inline]
    fn vector(&self, id: Vid) -> &'a [f32] {
        &self.data[id as usize * self.dim..(id as usize + 1) * self.dim]
    }

    #[inline]
    fn distance(&self, a: Vid, b: Vid) -> f32 {
        (self.dist)(self.vector(a), self.vector(b))
    }

    #[inline]
    fn max_links(&self, layer: usize) -> usize {
        if layer == 0 {
            self.params.m * 2
        } else {
            self.params.m
        }
    }

    /// Sample a top layer: floor(-ln(U(0,1)) * level_factor).
    fn random_level(&mut self) -> usize {
        let r: f32 = self.rng.f32();
        if r <= 0.0 {
            return 0;
        }
        let level = (-r.ln() * self.params.level_factor) as usize;
        level.min(MAX_LEVEL)
    }

    /// Insert one vector into the graph.
    pub fn insert(&mut self, id: Vid) {
        let level = self.random_level();
        self.levels[id as usize] = level as u8;
        self.links[id as usize] = (0..=level)
            .map(|l| Vec::with_capacity(self.max_links(l) + 1))
            .collect();

        let Some(mut ep) = self.entry_point else {
            self.entry_point = Some(id);
            self.max_level = level;
            return;
        };

        let q = self.vector(id);
        let mut ep_dist = (self.dist)(q, self.vector(ep));

        // Greedy descent through layers the new node does not occupy
        for layer in (level + 1..=self.max_level).rev() {
            (ep, ep_dist) = self.greedy_search(q, ep, ep_dist, layer);
        }

        // Beam search, select, and cross-link on each occupied layer
        for layer in (0..=level.min(self.max_level)).rev() {
            let candidates = self.search_layer(q, ep, ep_dist, self.params.ef_construction, layer);
            let chosen = self.select_neighbors(id, &candidates, self.max_links(layer));

            for &n in &chosen {
                self.links[id as usize][layer].push(n);
                self.links[n as usize][layer].push(id);
                if self.links[n as usize][layer].len() > self.max_links(layer) {
                    self.prune(n, layer);
                }
            }

            if let Some(best) = candidates.first() {
                ep = best.id;
                ep_dist = best.dist;
            }
        }

        if level > self.max_level {
            self.max_level = level;
            self.entry_point = Some(id);
        }
    }

    /// 1-nearest greedy walk at one layer: move to any improving neighbor
    /// until none improves.
    fn greedy_search(&self, q: &[f32], mut ep: Vid, mut ep_dist: f32, layer: usize) -> (Vid, f32) {
        loop {
            let mut improved = false;
            for &n in &self.links[ep as usize][layer] {
                let d = (self.dist)(q, self.vector(n));
                if d < ep_dist {
                    ep = n;
                    ep_dist = d;
                    improved = true;
                }
            }
            if !improved {
                return (ep, ep_dist);
            }
        }
    }

    /// Bounded best-first search at one layer; returns up to `ef`
    /// candidates sorted by ascending distance.
    fn search_layer(&mut self, q: &[f32], ep: Vid, ep_dist: f32, ef: usize, layer: usize) -> Vec<Candidate> {
        let dist = self.dist;
        let data = self.data;
        let dim = self.dim;
        let vec = |id: Vid| &data[id as usize * dim..(id as usize + 1) * dim];

        self.visited.next_epoch();
        self.visited.visit(ep);

        let seed = Candidate { id: ep, dist: ep_dist };
        let mut results: BinaryHeap<Reverse<Candidate>> = BinaryHeap::with_capacity(ef + 1);
        let mut frontier: BinaryHeap<Candidate> = BinaryHeap::new();
        results.push(Reverse(seed));
        frontier.push(seed);

        while let Some(current) = frontier.pop() {
            let worst = results.peek().map(|r| r.0.dist).unwrap_or(f32::INFINITY);
            if results.len() >= ef && current.dist > worst {
                break;
            }

            for &n in &self.links[current.id as usize][layer] {
                if self.visited.is_visited(n) {
                    continue;
                }
                self.visited.visit(n);

                let d = dist(q, vec(n));
                let worst = results.peek().map(|r| r.0.dist).unwrap_or(f32::INFINITY);
                if results.len() < ef || d < worst {
                    let cand = Candidate { id: n, dist: d };
                    frontier.push(cand);
                    results.push(Reverse(cand));
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        let mut out: Vec<Candidate> = results.into_iter().map(|r| r.0).collect();
        sort_ascending(&mut out);
        out
    }

    /// Dominance pruning: walk candidates by ascending distance to `p`,
    /// accept c unless some accepted c' satisfies d(c, c') <= d(c, p).
    fn select_neighbors(&self, p: Vid, candidates: &[Candidate], cap: usize) -> Vec<Vid> {
        let mut chosen: Vec<Candidate> = Vec::with_capacity(cap);
        for &c in candidates {
            if chosen.len() >= cap {
                break;
            }
            if let Some(filter) = &self.link_filter {
                if !filter(p, c.id) {
                    continue;
                }
            }
            let dominated = chosen.iter().any(|s| self.distance(c.id, s.id) <= c.dist);
            if !dominated {
                chosen.push(c);
            }
        }
        chosen.into_iter().map(|c| c.id).collect()
    }

    /// Re-run the selection heuristic over an overfull neighbor list.
    fn prune(&mut self, node: Vid, layer: usize) {
        let mut candidates: Vec<Candidate> = self.links[node as usize][layer]
            .iter()
            .map(|&n| Candidate {
                id: n,
                dist: self.distance(node, n),
            })
            .collect();
        sort_ascending(&mut candidates);

        let chosen = self.select_neighbors(node, &candidates, self.max_links(layer));
        self.links[node as usize][layer] = chosen;
    }

    /// Freeze the graph into its immutable CSR form.
    pub fn build(self) -> Result<HnswGraph> {
        let num_nodes = self.levels.len();
        let entry_point = self
            .entry_point
            .ok_or_else(|| Error::invalid_arg("data", "cannot build an empty graph"))?;

        let num_layers = self.max_level + 1;
        let mut layer_neighbors = Vec::with_capacity(num_layers);
        let mut layer_offsets = Vec::with_capacity(num_layers);

        for layer in 0..num_layers {
            let mut neighbors = Vec::new();
            let mut offsets = Vec::with_capacity(num_nodes + 1);
            offsets.push(0);
            for node in 0..num_nodes {
                if let Some(list) = self.links[node].get(layer) {
                    neighbors.extend_from_slice(list);
                }
                offsets.push(neighbors.len());
            }
            layer_neighbors.push(neighbors);
            layer_offsets.push(offsets);
        }

        Ok(HnswGraph {
            dim: self.dim,
            dist: self.dist,
            num_nodes,
            entry_point,
            num_layers,
            levels: self.levels,
            layer_neighbors,
            layer_offsets,
        })
    }
}

/// The finished proximity graph in CSR format. Immutable; query scratch
/// (visited lists, metrics) is owned by the caller.
#[derive(Debug, Clone)]
pub struct HnswGraph {
    dim: usize,
    dist: DistFn,
    num_nodes: usize,
    entry_point: Vid,
    num_layers: usize,
    levels: Vec<u8>,
    layer_neighbors: Vec<Vec<Vid>>,
    layer_offsets: Vec<Vec<usize>>,
}

impl HnswGraph {
    /// Number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Number of layers.
    pub fn num_layers(&self) -> usize {
        self.num_layers
    }

    /// Entry point node id.
    pub fn entry_point(&self) -> Vid {
        self.entry_point
    }

    /// Top layer of a node.
    pub fn level_of(&self, id: Vid) -> usize {
        self.levels[id as usize] as usize
    }

    /// Neighbor slice of `node` at `layer`.
    #[inline]
    pub fn neighbors(&self, layer: usize, node: Vid) -> &[Vid] {
        let offsets = &self.layer_offsets[layer];
        let start = offsets[node as usize];
        let end = offsets[node as usize + 1];
        &self.layer_neighbors[layer][start..end]
    }

    /// Greedy descent from the entry point through all layers above 0.
    /// Returns the layer-0 entry and its distance to `q`.
    pub fn descend(&self, q: &[f32], data: &[f32], metrics: &mut GraphMetrics) -> (Vid, f32) {
        let vec = |id: Vid| &data[id as usize * self.dim..(id as usize + 1) * self.dim];

        let mut ep = self.entry_point;
        let mut ep_dist = (self.dist)(q, vec(ep));
        metrics.dist_comps += 1;

        for layer in (1..self.num_layers).rev() {
            loop {
                let mut improved = false;
                for &n in self.neighbors(layer, ep) {
                    let d = (self.dist)(q, vec(n));
                    metrics.dist_comps += 1;
                    if d < ep_dist {
                        ep = n;
                        ep_dist = d;
                        improved = true;
                    }
                }
                if !improved {
                    break;
                }
                metrics.hops += 1;
            }
        }

        (ep, ep_dist)
    }

    /// Bounded best-first search at layer 0 with beam width `ef`.
    /// Returns up to `ef` candidates sorted by ascending distance.
    pub fn search_layer0(
        &self,
        q: &[f32],
        data: &[f32],
        ep: Vid,
        ep_dist: f32,
        ef: usize,
        visited: &mut VisitedList,
        metrics: &mut GraphMetrics,
    ) -> Vec<Candidate> {
        let vec = |id: Vid| &data[id as usize * self.dim..(id as usize + 1) * self.dim];

        visited.next_epoch();
        visited.visit(ep);

        let seed = Candidate { id: ep, dist: ep_dist };
        let mut results: BinaryHeap<Reverse<Candidate>> = BinaryHeap::with_capacity(ef + 1);
        let mut frontier: BinaryHeap<Candidate> = BinaryHeap::new();
        results.push(Reverse(seed));
        frontier.push(seed);

        while let Some(current) = frontier.pop() {
            let worst = results.peek().map(|r| r.0.dist).unwrap_or(f32::INFINITY);
            if results.len() >= ef && current.dist > worst {
                break;
            }
            metrics.hops += 1;

            for &n in self.neighbors(0, current.id) {
                if visited.is_visited(n) {
                    continue;
                }
                visited.visit(n);

                let d = (self.dist)(q, vec(n));
                metrics.dist_comps += 1;

                let worst = results.peek().map(|r| r.0.dist).unwrap_or(f32::INFINITY);
                if results.len() < ef || d < worst {
                    let cand = Candidate { id: n, dist: d };
                    frontier.push(cand);
                    results.push(Reverse(cand));
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        let mut out: Vec<Candidate> = results.into_iter().map(|r| r.0).collect();
        sort_ascending(&mut out);
        out
    }
}
