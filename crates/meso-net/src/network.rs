//! Road network representation and builder.
//!
//! # Data layout
//!
//! Edges, lanes and links live in three flat `Vec`s indexed by their typed
//! ids.  An [`Edge`] owns the ordered list of its [`Lane`]s (index 0 =
//! rightmost) and its successor edges; a [`Lane`] owns the list of [`Link`]s
//! leaving it.  The per-successor lane-permission map is resolved once at
//! [`RoadNetworkBuilder::build`] time so `allowed_lanes` is a plain slice
//! lookup on the hot path.
//!
//! The network is immutable after `build()` with one exception: links record
//! approaching leader vehicles, which is why [`RoadNetwork::link_mut`]
//! exists.

use std::collections::HashMap;

use meso_core::{EdgeId, LaneId, LinkId};

use crate::error::{NetError, NetResult};
use crate::link::{Link, OpenRule};

// ── Edge / Lane ───────────────────────────────────────────────────────────────

/// A directed road edge.
pub struct Edge {
    /// Geometric length in metres.
    pub length: f64,
    /// Speed limit in m/s.
    pub speed_limit: f64,
    /// Ratio of visual (curved) length to routing length, used to scale
    /// segment geometry.  1.0 for straight edges.
    pub length_geometry_factor: f64,
    /// Lanes of this edge, rightmost first.  Never empty.
    pub lanes: Vec<LaneId>,
    /// Edges reachable from the downstream end, in registration order.
    pub successors: Vec<EdgeId>,
    /// For each successor, the lanes allowed to continue onto it.
    allowed: HashMap<EdgeId, Vec<LaneId>>,
}

impl Edge {
    #[inline]
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Position of `lane` within this edge, or `None` for foreign lanes.
    pub fn lane_index(&self, lane: LaneId) -> Option<usize> {
        self.lanes.iter().position(|&l| l == lane)
    }
}

/// A single lane of an edge.
pub struct Lane {
    /// Owning edge.
    pub edge: EdgeId,
    /// Links leaving this lane at the downstream junction.
    pub links: Vec<LinkId>,
}

// ── RoadNetwork ───────────────────────────────────────────────────────────────

/// The built, read-only road graph.
///
/// Construct via [`RoadNetworkBuilder`].
pub struct RoadNetwork {
    edges: Vec<Edge>,
    lanes: Vec<Lane>,
    links: Vec<Link>,
}

impl RoadNetwork {
    /// A network with no edges, for engine tests that never route.
    pub fn empty() -> Self {
        RoadNetworkBuilder::new().build().expect("empty network is valid")
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    #[inline]
    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.index()]
    }

    #[inline]
    pub fn lane(&self, id: LaneId) -> &Lane {
        &self.lanes[id.index()]
    }

    #[inline]
    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id.index()]
    }

    /// Mutable link access, used for approach (de)registration only.
    #[inline]
    pub fn link_mut(&mut self, id: LinkId) -> &mut Link {
        &mut self.links[id.index()]
    }

    /// `true` if `to` directly follows `from`.
    pub fn connected(&self, from: EdgeId, to: EdgeId) -> bool {
        self.edge(from).successors.contains(&to)
    }

    /// Lanes of `edge` that are allowed to continue onto `to`.
    ///
    /// `None` when `to` is not a successor of `edge`.  For successors the
    /// slice is non-empty by construction (see [`RoadNetworkBuilder::build`]).
    pub fn allowed_lanes(&self, edge: EdgeId, to: EdgeId) -> Option<&[LaneId]> {
        self.edge(edge).allowed.get(&to).map(Vec::as_slice)
    }
}

// ── RoadNetworkBuilder ────────────────────────────────────────────────────────

/// Construct a [`RoadNetwork`] incrementally, then call [`build`](Self::build).
///
/// # Example
///
/// ```
/// use meso_net::RoadNetworkBuilder;
///
/// let mut b = RoadNetworkBuilder::new();
/// let a = b.add_edge(200.0, 13.9, 2); // 200 m, 50 km/h, 2 lanes
/// let c = b.add_edge(150.0, 13.9, 1);
/// b.connect(a, c);
/// let net = b.build().unwrap();
/// assert_eq!(net.edge(a).lane_count(), 2);
/// assert!(net.connected(a, c));
/// ```
pub struct RoadNetworkBuilder {
    edges: Vec<Edge>,
    lanes: Vec<Lane>,
    links: Vec<Link>,
    /// Explicit lane permissions: (edge, successor) → lanes.
    explicit_allowed: HashMap<(EdgeId, EdgeId), Vec<LaneId>>,
}

impl RoadNetworkBuilder {
    pub fn new() -> Self {
        Self {
            edges:            Vec::new(),
            lanes:            Vec::new(),
            links:            Vec::new(),
            explicit_allowed: HashMap::new(),
        }
    }

    /// Add an edge with `lane_count` fresh lanes and return its id.
    pub fn add_edge(&mut self, length: f64, speed_limit: f64, lane_count: usize) -> EdgeId {
        let edge_id = EdgeId(self.edges.len() as u32);
        let lanes: Vec<LaneId> = (0..lane_count.max(1))
            .map(|_| {
                let lane_id = LaneId(self.lanes.len() as u32);
                self.lanes.push(Lane { edge: edge_id, links: Vec::new() });
                lane_id
            })
            .collect();
        self.edges.push(Edge {
            length,
            speed_limit,
            length_geometry_factor: 1.0,
            lanes,
            successors: Vec::new(),
            allowed: HashMap::new(),
        });
        edge_id
    }

    /// Override the visual-to-routing length ratio of an edge.
    pub fn set_length_geometry_factor(&mut self, edge: EdgeId, factor: f64) {
        self.edges[edge.index()].length_geometry_factor = factor;
    }

    /// Register `to` as a successor of `from` without any junction link.
    ///
    /// Used for uncontrolled connections; `add_link` records the successor
    /// automatically.
    pub fn connect(&mut self, from: EdgeId, to: EdgeId) {
        let succ = &mut self.edges[from.index()].successors;
        if !succ.contains(&to) {
            succ.push(to);
        }
    }

    /// Add a junction link from `from_lane` to `dest_lane` and return its id.
    pub fn add_link(
        &mut self,
        from_lane: LaneId,
        dest_lane: LaneId,
        priority: bool,
    ) -> NetResult<LinkId> {
        let from = self
            .lanes
            .get(from_lane.index())
            .ok_or(NetError::UnknownLane(from_lane))?
            .edge;
        let dest_edge = self
            .lanes
            .get(dest_lane.index())
            .ok_or(NetError::UnknownLane(dest_lane))?
            .edge;
        let id = LinkId(self.links.len() as u32);
        self.links.push(Link::new(from_lane, dest_edge, dest_lane, priority));
        self.lanes[from_lane.index()].links.push(id);
        self.connect(from, dest_edge);
        Ok(id)
    }

    /// Attach a controller predicate to a link (traffic light, gap model).
    pub fn set_open_rule(&mut self, link: LinkId, rule: Box<dyn OpenRule>) -> NetResult<()> {
        self.links
            .get_mut(link.index())
            .ok_or(NetError::UnknownLink(link))?
            .set_rule(rule);
        Ok(())
    }

    /// Restrict which lanes of `edge` may continue onto `to`.
    ///
    /// Without an explicit restriction, `build()` derives the set from links
    /// and falls back to "all lanes".
    pub fn allow_lanes(&mut self, edge: EdgeId, to: EdgeId, lanes: Vec<LaneId>) {
        self.explicit_allowed.insert((edge, to), lanes);
    }

    /// Resolve lane permissions and produce the immutable network.
    ///
    /// For every (edge, successor) pair the allowed-lane list is, in order of
    /// preference: the explicit `allow_lanes` entry, the lanes that carry a
    /// link to the successor, or all lanes of the edge.  An explicit empty
    /// entry violates the topology contract and fails the build.
    pub fn build(mut self) -> NetResult<RoadNetwork> {
        for edge_idx in 0..self.edges.len() {
            let edge_id = EdgeId(edge_idx as u32);
            let successors = self.edges[edge_idx].successors.clone();
            for to in successors {
                let allowed = match self.explicit_allowed.get(&(edge_id, to)) {
                    Some(lanes) => lanes.clone(),
                    None => {
                        let linked: Vec<LaneId> = self.edges[edge_idx]
                            .lanes
                            .iter()
                            .copied()
                            .filter(|&l| {
                                self.lanes[l.index()]
                                    .links
                                    .iter()
                                    .any(|&k| self.links[k.index()].dest_edge == to)
                            })
                            .collect();
                        if linked.is_empty() {
                            self.edges[edge_idx].lanes.clone()
                        } else {
                            linked
                        }
                    }
                };
                if allowed.is_empty() {
                    return Err(NetError::NoAllowedLanes { edge: edge_id, to });
                }
                self.edges[edge_idx].allowed.insert(to, allowed);
            }
        }
        Ok(RoadNetwork {
            edges: self.edges,
            lanes: self.lanes,
            links: self.links,
        })
    }
}

impl Default for RoadNetworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}
