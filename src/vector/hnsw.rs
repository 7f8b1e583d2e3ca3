//! From-scratch HNSW (Hierarchical Navigable Small World) index.
//!
//! A multi-layer proximity graph built incrementally over inserted
//! vectors. Layer assignment mirrors skip-list levels: each node draws a
//! random maximum layer with probability `1/ln(m)` per level, so higher
//! layers hold exponentially fewer nodes. Search descends greedily from
//! the entry point through the sparse upper layers, then runs a bounded
//! beam search at layer 0.
//!
//! # Thread Safety
//!
//! All mutable graph state (nodes, entry point, maximum layer, RNG) lives
//! behind a single `std::sync::RwLock`. Insert takes the write lock for
//! the entire linkage, so a search never observes a partially-linked
//! node; searches share the read lock. A search that begins after an
//! insert returns is guaranteed to see it.
//!
//! # Determinism
//!
//! The layer RNG is injectable via `HnswConfig::level_seed`. With a fixed
//! seed and a fixed insertion order, graph construction is fully
//! deterministic, and search ties are broken by smaller id, so repeated
//! searches over an unmodified index return identical ordered results.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::RwLock;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::distance::cosine_distance;
use crate::config::HnswConfig;
use crate::error::{ProximaError, Result, ValidationError};
use crate::types::RecordId;

/// A scored candidate during traversal.
///
/// Ordered by distance, with ties broken by smaller id so that ranking
/// is deterministic and reproducible.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Candidate {
    distance: f32,
    id: RecordId,
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Distances are never NaN: degenerate vectors are rejected before
        // any distance is computed
        self.distance
            .partial_cmp(&other.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// A node in the graph: its vector plus per-layer neighbor lists.
#[derive(Debug)]
struct Node {
    vector: Vec<f32>,
    /// Neighbor ids for each layer from 0 up to this node's top layer.
    /// Lists never contain the node's own id or duplicates.
    neighbors: Vec<Vec<RecordId>>,
}

impl Node {
    fn new(vector: Vec<f32>, top_layer: usize) -> Self {
        Self {
            vector,
            neighbors: vec![Vec::new(); top_layer + 1],
        }
    }

    #[inline]
    fn top_layer(&self) -> usize {
        self.neighbors.len() - 1
    }

    fn neighbors_at(&self, layer: usize) -> &[RecordId] {
        self.neighbors.get(layer).map_or(&[], Vec::as_slice)
    }
}

/// Mutable graph state guarded by the index's writer lock.
#[derive(Debug)]
struct Graph {
    nodes: HashMap<RecordId, Node>,
    /// Start node for every traversal: the most recently inserted node
    /// whose layer equals `max_layer`.
    entry_point: Option<RecordId>,
    /// Highest populated layer across the graph.
    max_layer: usize,
    /// Layer-assignment RNG, seedable for deterministic construction.
    rng: SmallRng,
}

/// HNSW vector index.
///
/// A derived structure over the record store: it holds a copy of each
/// vector for distance computation and is rebuilt from the store on
/// open. Mutating methods take `&self` and serialize internally.
pub struct HnswIndex {
    graph: RwLock<Graph>,
    config: HnswConfig,
    dimension: usize,
}

impl HnswIndex {
    /// Creates a new empty index.
    ///
    /// # Arguments
    ///
    /// * `dimension` - Expected vector dimension (validated on insert)
    /// * `config` - HNSW tuning parameters
    pub fn new(dimension: usize, config: &HnswConfig) -> Self {
        let rng = match config.level_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };

        Self {
            graph: RwLock::new(Graph {
                nodes: HashMap::new(),
                entry_point: None,
                max_layer: 0,
                rng,
            }),
            config: config.clone(),
            dimension,
        }
    }

    /// Rebuilds an index from stored vectors.
    ///
    /// Used on open to reconstruct the graph from the record store (the
    /// source of truth). Vectors must be supplied in ascending id order
    /// for the rebuilt graph to match the original construction.
    pub fn rebuild(
        dimension: usize,
        config: &HnswConfig,
        vectors: impl IntoIterator<Item = (RecordId, Vec<f32>)>,
    ) -> Result<Self> {
        let index = Self::new(dimension, config);
        for (id, vector) in vectors {
            index.insert(id, &vector)?;
        }
        Ok(index)
    }

    /// Inserts a vector into the graph.
    ///
    /// Draws a random top layer, descends greedily from the entry point,
    /// then links the node layer by layer with a beam of width
    /// `ef_construction`, selecting up to `m` diverse neighbors per
    /// layer and pruning any neighbor list that exceeds its capacity.
    /// Re-inserting an existing id is a no-op.
    pub fn insert(&self, id: RecordId, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(ValidationError::dimension_mismatch(self.dimension, vector.len()).into());
        }

        let mut graph = self
            .graph
            .write()
            .map_err(|_| ProximaError::index("Graph lock poisoned"))?;

        // Idempotent: the store guarantees unique ids, so a repeat is a
        // rebuild replay
        if graph.nodes.contains_key(&id) {
            return Ok(());
        }

        let top_layer = self.draw_layer(&mut graph.rng);

        let entry = match graph.entry_point {
            Some(entry) => entry,
            None => {
                // First node: becomes the entry point at its own layer
                graph.nodes.insert(id, Node::new(vector.to_vec(), top_layer));
                graph.entry_point = Some(id);
                graph.max_layer = top_layer;
                debug!(id = %id, layer = top_layer, "First node inserted as entry point");
                return Ok(());
            }
        };

        let graph_max = graph.max_layer;

        // Greedy single-path descent through layers above the new node's top
        let mut current = Candidate {
            distance: distance_to(&graph, entry, vector)?,
            id: entry,
        };
        if graph_max > top_layer {
            current = greedy_descend(&graph, vector, current, graph_max, top_layer + 1)?;
        }

        // Collect neighbors layer by layer from min(top_layer, graph_max)
        // down to 0. The new node is not in the map yet, so this phase is
        // read-only; an error here leaves the graph untouched.
        let mut entry_points = vec![current];
        let mut selected_per_layer = Vec::new();
        for layer in (0..=top_layer.min(graph_max)).rev() {
            let candidates = search_layer(
                &graph,
                vector,
                &entry_points,
                self.config.ef_construction,
                layer,
                usize::MAX,
            )?;

            let selected = select_diverse_neighbors(&graph, &candidates, self.config.m)?;
            selected_per_layer.push((layer, selected));

            entry_points = candidates;
        }

        // All distance work succeeded; now mutate the graph
        graph.nodes.insert(id, Node::new(vector.to_vec(), top_layer));
        for (layer, selected) in selected_per_layer {
            for neighbor in selected {
                link(&mut graph, id, neighbor.id, layer);
                self.prune_if_over_capacity(&mut graph, neighbor.id, layer)?;
            }
        }

        // A new highest layer promotes this node to entry point
        if top_layer > graph_max {
            graph.max_layer = top_layer;
            graph.entry_point = Some(id);
            debug!(id = %id, layer = top_layer, "Entry point promoted");
        }

        Ok(())
    }

    /// Searches for the `k` approximate nearest neighbors of `query`.
    ///
    /// Returns `(id, distance)` pairs sorted by ascending distance, ties
    /// broken by smaller id. An empty index returns an empty result. An
    /// index with fewer than `k` nodes returns all of them ranked.
    ///
    /// # Arguments
    ///
    /// * `k` - Number of results; must be greater than 0
    /// * `ef` - Layer-0 beam width; widened to `k` if smaller
    ///
    /// # Errors
    ///
    /// - `ValidationError::InvalidArgument` if `k == 0`
    /// - `ValidationError::DimensionMismatch` on wrong query length
    /// - `ValidationError::DegenerateVector` on a zero-magnitude query
    pub fn search(&self, query: &[f32], k: usize, ef: usize) -> Result<Vec<(RecordId, f32)>> {
        if k == 0 {
            return Err(
                ValidationError::invalid_argument("k", "must be greater than 0").into(),
            );
        }
        if query.len() != self.dimension {
            return Err(ValidationError::dimension_mismatch(self.dimension, query.len()).into());
        }
        if super::distance::is_degenerate(query) {
            return Err(ValidationError::DegenerateVector.into());
        }

        let graph = self
            .graph
            .read()
            .map_err(|_| ProximaError::index("Graph lock poisoned"))?;

        let entry = match graph.entry_point {
            Some(entry) => entry,
            None => return Ok(Vec::new()),
        };

        // Greedy descent through the upper layers
        let mut current = Candidate {
            distance: distance_to(&graph, entry, query)?,
            id: entry,
        };
        if graph.max_layer > 0 {
            current = greedy_descend(&graph, query, current, graph.max_layer, 1)?;
        }

        // Beam search at layer 0, bounded by the visit budget
        let beam = ef.max(k);
        let mut results =
            search_layer(&graph, query, &[current], beam, 0, self.config.max_visited)?;

        results.truncate(k);
        Ok(results.into_iter().map(|c| (c.id, c.distance)).collect())
    }

    /// Returns the number of indexed vectors.
    pub fn len(&self) -> usize {
        self.graph.read().map_or(0, |g| g.nodes.len())
    }

    /// Returns true if the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the given id is indexed.
    pub fn contains(&self, id: RecordId) -> bool {
        self.graph.read().is_ok_and(|g| g.nodes.contains_key(&id))
    }

    /// Draws a random top layer with exponentially decaying probability.
    fn draw_layer(&self, rng: &mut SmallRng) -> usize {
        let p = self.config.level_probability();
        let mut layer = 0;
        while layer < self.config.max_layer && rng.gen::<f64>() < p {
            layer += 1;
        }
        layer
    }

    /// Prunes a node's neighbor list to its layer capacity, keeping the
    /// closest by distance and discarding the farthest.
    fn prune_if_over_capacity(
        &self,
        graph: &mut Graph,
        id: RecordId,
        layer: usize,
    ) -> Result<()> {
        let capacity = self.config.max_neighbors(layer);

        let (vector, neighbors) = match graph.nodes.get(&id) {
            Some(node) if node.neighbors_at(layer).len() > capacity => {
                (node.vector.clone(), node.neighbors_at(layer).to_vec())
            }
            _ => return Ok(()),
        };

        let mut scored = Vec::with_capacity(neighbors.len());
        for n in neighbors {
            scored.push(Candidate {
                distance: distance_to(graph, n, &vector)?,
                id: n,
            });
        }
        scored.sort();
        scored.truncate(capacity);

        if let Some(node) = graph.nodes.get_mut(&id) {
            node.neighbors[layer] = scored.into_iter().map(|c| c.id).collect();
        }
        Ok(())
    }
}

impl std::fmt::Debug for HnswIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HnswIndex")
            .field("dimension", &self.dimension)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

// ==========================================================================
// Traversal helpers
// ==========================================================================

/// Distance from an indexed node to an arbitrary vector.
fn distance_to(graph: &Graph, id: RecordId, query: &[f32]) -> Result<f32> {
    let node = graph
        .nodes
        .get(&id)
        .ok_or_else(|| ProximaError::index(format!("Node {} missing from graph", id)))?;
    cosine_distance(&node.vector, query)
}

/// Greedy single-path walk from `from_layer` down to `to_layer`.
///
/// At each layer, moves to whichever neighbor is closest to the query
/// until no neighbor improves, then drops a layer.
fn greedy_descend(
    graph: &Graph,
    query: &[f32],
    mut current: Candidate,
    from_layer: usize,
    to_layer: usize,
) -> Result<Candidate> {
    for layer in (to_layer..=from_layer).rev() {
        loop {
            let mut improved = false;
            let neighbors = graph
                .nodes
                .get(&current.id)
                .map_or(&[][..], |n| n.neighbors_at(layer));
            for &neighbor in neighbors {
                let d = distance_to(graph, neighbor, query)?;
                if d < current.distance {
                    current = Candidate {
                        distance: d,
                        id: neighbor,
                    };
                    improved = true;
                }
            }
            if !improved {
                break;
            }
        }
    }
    Ok(current)
}

/// Beam search within a single layer.
///
/// Best-first expansion keeping the `ef` closest candidates seen so far.
/// Stops when the closest unexpanded candidate cannot improve the worst
/// retained result, or when `max_visited` nodes have been scored.
/// Returns candidates sorted ascending by (distance, id).
fn search_layer(
    graph: &Graph,
    query: &[f32],
    entry_points: &[Candidate],
    ef: usize,
    layer: usize,
    max_visited: usize,
) -> Result<Vec<Candidate>> {
    let mut visited: HashSet<RecordId> = HashSet::new();
    // Min-heap of candidates to expand
    let mut frontier: BinaryHeap<Reverse<Candidate>> = BinaryHeap::new();
    // Max-heap of the best `ef` results seen
    let mut best: BinaryHeap<Candidate> = BinaryHeap::new();

    for &entry in entry_points {
        if visited.insert(entry.id) {
            frontier.push(Reverse(entry));
            best.push(entry);
        }
    }
    let mut budget = max_visited.saturating_sub(visited.len());

    while let Some(Reverse(current)) = frontier.pop() {
        // The frontier is sorted: once its closest entry is worse than the
        // worst retained result, no expansion can improve the beam
        if best.len() >= ef {
            if let Some(worst) = best.peek() {
                if current.distance > worst.distance {
                    break;
                }
            }
        }

        let neighbors = graph
            .nodes
            .get(&current.id)
            .map_or(&[][..], |n| n.neighbors_at(layer));

        for &neighbor in neighbors {
            if !visited.insert(neighbor) {
                continue;
            }
            if budget == 0 {
                break;
            }
            budget -= 1;

            let candidate = Candidate {
                distance: distance_to(graph, neighbor, query)?,
                id: neighbor,
            };

            let worth_keeping = best.len() < ef
                || best.peek().is_some_and(|worst| candidate < *worst);
            if worth_keeping {
                frontier.push(Reverse(candidate));
                best.push(candidate);
                if best.len() > ef {
                    best.pop();
                }
            }
        }
    }

    Ok(best.into_sorted_vec())
}

/// Diversity-aware neighbor selection.
///
/// Walks candidates in ascending distance order and keeps one only if it
/// is closer to the query than to every neighbor already selected. This
/// spreads edges across directions instead of clustering them, which
/// preserves graph navigability. Falls back to plain closest-first fill
/// if the heuristic selects fewer than `m`.
fn select_diverse_neighbors(
    graph: &Graph,
    candidates: &[Candidate],
    m: usize,
) -> Result<Vec<Candidate>> {
    let mut selected: Vec<Candidate> = Vec::with_capacity(m);
    let mut skipped: Vec<Candidate> = Vec::new();

    for &candidate in candidates {
        if selected.len() >= m {
            break;
        }
        let candidate_vector = &graph
            .nodes
            .get(&candidate.id)
            .ok_or_else(|| ProximaError::index(format!("Node {} missing from graph", candidate.id)))?
            .vector;

        let mut diverse = true;
        for chosen in &selected {
            let d = distance_to(graph, chosen.id, candidate_vector)?;
            if d < candidate.distance {
                diverse = false;
                break;
            }
        }

        if diverse {
            selected.push(candidate);
        } else {
            skipped.push(candidate);
        }
    }

    // Backfill with the closest skipped candidates to keep connectivity
    for candidate in skipped {
        if selected.len() >= m {
            break;
        }
        selected.push(candidate);
    }

    Ok(selected)
}

/// Adds a bidirectional edge at the given layer.
///
/// Skips self-loops and duplicates, and respects each endpoint's top
/// layer (a node has no list above its own layer).
fn link(graph: &mut Graph, a: RecordId, b: RecordId, layer: usize) {
    if a == b {
        return;
    }
    if let Some(node) = graph.nodes.get_mut(&a) {
        if layer <= node.top_layer() && !node.neighbors[layer].contains(&b) {
            node.neighbors[layer].push(b);
        }
    }
    if let Some(node) = graph.nodes.get_mut(&b) {
        if layer <= node.top_layer() && !node.neighbors[layer].contains(&a) {
            node.neighbors[layer].push(a);
        }
    }
}
