use crate::network::graph::Junctions;
use crate::network::{Location, RoadNetwork};

use indexmap::map::Entry;
use indexmap::IndexMap;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use rustc_hash::{FxHashMap, FxHashSet, FxHasher};

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::hash::BuildHasherDefault;

type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Route costs are accumulated in whole centimeters.
type Cost = u64;

const CENTIMETERS_PER_METER: f64 = 100.0;

#[inline]
pub(crate) fn to_centimeters(meters: f64) -> Cost {
    (meters.max(0.0) * CENTIMETERS_PER_METER).round() as Cost
}

#[inline]
fn to_meters(centimeters: Cost) -> f64 {
    centimeters as f64 / CENTIMETERS_PER_METER
}

#[derive(Debug)]
struct SmallestHolder {
    cost: Cost,
    index: usize,
}

impl PartialEq for SmallestHolder {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost && self.index == other.index
    }
}

impl Eq for SmallestHolder {}

impl PartialOrd for SmallestHolder {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SmallestHolder {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.index.cmp(&self.index))
    }
}

/// A junction reached by [`BoundedDijkstra`] and its total cost from the seeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReachedJunction {
    pub node: NodeIndex,
    pub total_cost: Cost,
}

/// A multi-source Dijkstra over the junction graph. Junctions are
/// visited in order of cost, with the closest junctions first.
pub(crate) struct BoundedDijkstra<FN> {
    to_see: BinaryHeap<SmallestHolder>,
    seen: FxHashSet<usize>,
    costs: FxIndexMap<NodeIndex, Cost>,
    successors: FN,
}

impl<FN> BoundedDijkstra<FN> {
    /// Seeds the search with each `(junction, initial cost)` pair.
    pub fn new(seeds: impl IntoIterator<Item = (NodeIndex, Cost)>, successors: FN) -> Self {
        let mut to_see = BinaryHeap::with_capacity(64);
        let mut costs: FxIndexMap<NodeIndex, Cost> =
            FxIndexMap::with_capacity_and_hasher(64, BuildHasherDefault::<FxHasher>::default());

        for (node, cost) in seeds {
            let index = match costs.entry(node) {
                Entry::Vacant(e) => {
                    let index = e.index();
                    e.insert(cost);
                    index
                }
                Entry::Occupied(mut e) => {
                    if *e.get() <= cost {
                        continue;
                    }
                    e.insert(cost);
                    e.index()
                }
            };

            to_see.push(SmallestHolder { cost, index });
        }

        BoundedDijkstra {
            to_see,
            seen: FxHashSet::default(),
            costs,
            successors,
        }
    }
}

impl<FN, IN> Iterator for BoundedDijkstra<FN>
where
    FN: FnMut(NodeIndex) -> IN,
    IN: IntoIterator<Item = (NodeIndex, Cost)>,
{
    type Item = ReachedJunction;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(SmallestHolder { cost, index }) = self.to_see.pop() {
            if !self.seen.insert(index) {
                continue;
            }

            let Some((node, _)) = self.costs.get_index(index) else {
                continue;
            };
            let node = *node;

            for (successor, move_cost) in (self.successors)(node) {
                let new_cost = cost.saturating_add(move_cost);

                let index = match self.costs.entry(successor) {
                    Entry::Vacant(e) => {
                        let n = e.index();
                        e.insert(new_cost);
                        n
                    }
                    Entry::Occupied(mut e) => {
                        if *e.get() > new_cost {
                            e.insert(new_cost);
                            e.index()
                        } else {
                            continue;
                        }
                    }
                };

                self.to_see.push(SmallestHolder {
                    cost: new_cost,
                    index,
                });
            }

            return Some(ReachedJunction {
                node,
                total_cost: cost,
            });
        }

        None
    }
}

fn neighbours(junctions: &Junctions, node: NodeIndex) -> impl Iterator<Item = (NodeIndex, Cost)> + '_ {
    junctions.edges(node).map(move |edge| {
        let other = if edge.source() == node {
            edge.target()
        } else {
            edge.source()
        };

        (other, edge.weight().length)
    })
}

/// The junctions reachable from a [`Location`] within a bounded route distance.
///
/// Computing a `Reach` once per source allows the route distance to every
/// target to be resolved without repeating the search.
#[derive(Debug, Clone)]
pub struct Reach {
    origin: Location,
    bound: f64,
    costs: FxHashMap<NodeIndex, Cost>,
}

impl Reach {
    /// The route distance (meters) from the origin to `target`, or `None`
    /// if the target cannot be reached within the bound.
    ///
    /// On the same segment this is the along-segment difference. Otherwise,
    /// it is the cheapest of entering the target segment from either end.
    pub fn distance_to(&self, network: &RoadNetwork, target: &Location) -> Option<f64> {
        let distance = if target.segment == self.origin.segment {
            (target.along - self.origin.along).abs()
        } else {
            let entry = network.segments.get(target.segment)?;
            let (start, end) = entry.ends;

            let via_start = self
                .costs
                .get(&start)
                .map(|cost| to_meters(*cost) + target.along);
            let via_end = self
                .costs
                .get(&end)
                .map(|cost| to_meters(*cost) + (entry.length - target.along).max(0.0));

            match (via_start, via_end) {
                (Some(a), Some(b)) => a.min(b),
                (a, b) => a.or(b)?,
            }
        };

        (distance <= self.bound).then_some(distance)
    }

    /// Number of junctions reached.
    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }
}

impl RoadNetwork {
    /// Runs a bounded search from both ends of the origin's segment, seeded
    /// with the distance from the origin to each end.
    pub fn reach(&self, origin: &Location, bound: f64) -> Reach {
        let limit = to_centimeters(bound);

        let costs = match self.segments.get(origin.segment) {
            Some(entry) => {
                let (start, end) = entry.ends;
                let seeds = [
                    (start, to_centimeters(origin.along)),
                    (end, to_centimeters(entry.length - origin.along)),
                ];

                BoundedDijkstra::new(seeds, |node| neighbours(&self.junctions, node))
                    .take_while(|reached| reached.total_cost <= limit)
                    .map(|reached| (reached.node, reached.total_cost))
                    .collect::<FxHashMap<_, _>>()
            }
            None => FxHashMap::default(),
        };

        Reach {
            origin: *origin,
            bound,
            costs,
        }
    }

    /// The route distance (meters) between two locations, bounded by `bound`.
    pub fn route_distance(&self, from: &Location, to: &Location, bound: f64) -> Option<f64> {
        self.reach(from, bound).distance_to(self, to)
    }
}
