use std::{cell::Cell, cmp::Ordering, collections::VecDeque, rc::Rc};

use petgraph::{Graph, graph::NodeIndex, visit::EdgeRef};
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
use unicase::UniCase;

use crate::{
    EdgeType, Plugin, Vertex, logging,
    metadata::{File, PluginMetadata},
    plugin::error::PluginDataError,
    sorting::error::{CyclicInteractionError, SortingError},
};

#[derive(Debug)]
pub(crate) struct PluginSortingData<'a, T: SortingPlugin> {
    plugin: &'a T,
    pub(super) is_master: bool,
    override_record_count: usize,

    /// The plugin's position in the current load order, if it has one.
    load_order_index: Option<usize>,

    /// The local priority can be raised during the hard-edges pass by
    /// priority inheritance, hence the interior mutability.
    local_priority: Cell<i8>,
    global_priority: i8,
    requirements: Box<[String]>,
    load_after: Box<[String]>,
}

impl<'a, T: SortingPlugin> PluginSortingData<'a, T> {
    pub(crate) fn new(
        plugin: &'a T,
        metadata: Option<&PluginMetadata>,
        load_order_index: Option<usize>,
    ) -> Result<Self, PluginDataError> {
        let override_record_count = plugin.override_record_count()?;

        Ok(Self {
            plugin,
            is_master: plugin.is_master(),
            override_record_count,
            load_order_index,
            local_priority: Cell::new(
                metadata.map(|m| m.local_priority().value()).unwrap_or(0),
            ),
            global_priority: metadata.map(|m| m.global_priority().value()).unwrap_or(0),
            requirements: metadata
                .map(|m| to_filenames(m.requirements()))
                .unwrap_or_default(),
            load_after: metadata
                .map(|m| to_filenames(m.load_after_files()))
                .unwrap_or_default(),
        })
    }

    pub(super) fn name(&self) -> &str {
        self.plugin.name()
    }

    fn masters(&self) -> Result<Vec<String>, PluginDataError> {
        self.plugin.masters()
    }

    fn do_records_overlap(&self, other: &Self) -> Result<bool, PluginDataError> {
        self.plugin.do_records_overlap(other.plugin)
    }
}

/// The plugin data that sorting needs, abstracted so that sorting logic can be
/// exercised without binary plugin files.
pub(crate) trait SortingPlugin {
    fn name(&self) -> &str;
    fn is_master(&self) -> bool;
    fn masters(&self) -> Result<Vec<String>, PluginDataError>;
    fn override_record_count(&self) -> Result<usize, PluginDataError>;
    fn do_records_overlap(&self, other: &Self) -> Result<bool, PluginDataError>;
}

impl SortingPlugin for Plugin {
    fn name(&self) -> &str {
        self.name()
    }

    fn is_master(&self) -> bool {
        self.is_master()
    }

    fn masters(&self) -> Result<Vec<String>, PluginDataError> {
        self.masters()
    }

    fn override_record_count(&self) -> Result<usize, PluginDataError> {
        self.override_record_count()
    }

    fn do_records_overlap(&self, other: &Self) -> Result<bool, PluginDataError> {
        self.do_records_overlap(other)
    }
}

fn to_filenames(files: &[File]) -> Box<[String]> {
    files.iter().map(|f| f.name().as_str().to_owned()).collect()
}

/// A directed graph of "loads before" relationships between the installed
/// plugins.
///
/// Two lookaside structures ride along with the graph itself: a map from
/// case-insensitive plugin names to their nodes, filled as nodes are added,
/// and the set of (source, target) pairs already known to be joined by a
/// path. The pair set is seeded by every added edge and topped up by the
/// searches that [is_reachable][Self::is_reachable] runs, so repeated
/// reachability questions about a pair don't repeat the search.
#[derive(Debug)]
struct PluginsGraph<'a, T: SortingPlugin> {
    // The sorting data is held in Rc so that it can be kept alive across
    // mutations of the graph.
    inner: Graph<Rc<PluginSortingData<'a, T>>, EdgeType>,
    node_indices_by_name: HashMap<UniCase<String>, NodeIndex>,
    known_paths: HashSet<(NodeIndex, NodeIndex)>,
}

impl<'a, T: SortingPlugin> PluginsGraph<'a, T> {
    fn new() -> Self {
        PluginsGraph {
            inner: Graph::new(),
            node_indices_by_name: HashMap::default(),
            known_paths: HashSet::default(),
        }
    }

    fn add_node(&mut self, plugin: PluginSortingData<'a, T>) {
        let name = UniCase::new(plugin.name().to_owned());
        let node_index = self.inner.add_node(Rc::new(plugin));
        self.node_indices_by_name.insert(name, node_index);
    }

    fn plugin(&self, node_index: NodeIndex) -> &Rc<PluginSortingData<'a, T>> {
        &self.inner[node_index]
    }

    fn node_index_by_name(&self, name: &str) -> Option<NodeIndex> {
        self.node_indices_by_name
            .get(&UniCase::new(name.to_owned()))
            .copied()
    }

    /// Add an edge, unless the two nodes are already known to be joined in
    /// that direction, whether directly or transitively.
    fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, edge_type: EdgeType) {
        if !self.known_paths.insert((from, to)) {
            return;
        }

        logging::debug!(
            "Adding {} edge from \"{}\" to \"{}\".",
            edge_type,
            self.plugin(from).name(),
            self.plugin(to).name()
        );

        self.inner.add_edge(from, to, edge_type);
    }

    /// Add edges for all relationships that aren't overlaps or priority
    /// differences: master-flag grouping, masters, requirements and explicit
    /// load-after entries.
    ///
    /// As edges are added, each plugin inherits the highest local priority of
    /// the plugins it is forced to load after, so that priorities propagate
    /// through dependencies.
    fn add_hard_edges(&mut self) -> Result<(), SortingError> {
        logging::trace!("Adding edges based on plugin data and non-priority metadata...");

        let mut node_index_iter = self.inner.node_indices();
        while let Some(node_index) = node_index_iter.next() {
            let plugin = Rc::clone(self.plugin(node_index));

            for other_node_index in node_index_iter.clone() {
                let other_plugin = self.plugin(other_node_index);

                if plugin.is_master == other_plugin.is_master {
                    continue;
                }

                if other_plugin.is_master {
                    self.add_edge(other_node_index, node_index, EdgeType::MasterFlag);
                } else {
                    self.add_edge(node_index, other_node_index, EdgeType::MasterFlag);
                }
            }

            let mut parent_priority = plugin.local_priority.get();

            for master in plugin.masters()? {
                if let Some(other_node_index) = self.node_index_by_name(&master) {
                    self.add_edge(other_node_index, node_index, EdgeType::Master);

                    parent_priority =
                        parent_priority.max(self.plugin(other_node_index).local_priority.get());
                }
            }

            for file in &plugin.requirements {
                if let Some(other_node_index) = self.node_index_by_name(file) {
                    self.add_edge(other_node_index, node_index, EdgeType::Requirement);

                    parent_priority =
                        parent_priority.max(self.plugin(other_node_index).local_priority.get());
                }
            }

            for file in &plugin.load_after {
                if let Some(other_node_index) = self.node_index_by_name(file) {
                    self.add_edge(other_node_index, node_index, EdgeType::LoadAfter);

                    parent_priority =
                        parent_priority.max(self.plugin(other_node_index).local_priority.get());
                }
            }

            if parent_priority > 0 && plugin.local_priority.get() < parent_priority {
                logging::debug!(
                    "Inheriting local priority {} for \"{}\" from the plugins it loads after.",
                    parent_priority,
                    plugin.name()
                );
                plugin.local_priority.set(parent_priority);
            }
        }

        Ok(())
    }

    /// Add edges between plugins with different priorities.
    ///
    /// Global priority differences order any two plugins. Local priority
    /// differences only order plugins that conflict, i.e. either has a
    /// non-zero global priority or their records overlap.
    fn add_priority_edges(&mut self) -> Result<(), SortingError> {
        logging::trace!("Adding priority difference edges...");

        let mut node_index_iter = self.inner.node_indices();
        while let Some(node_index) = node_index_iter.next() {
            let plugin = Rc::clone(self.plugin(node_index));

            for other_node_index in node_index_iter.clone() {
                let other_plugin = Rc::clone(self.plugin(other_node_index));

                let ordering = if plugin.global_priority != other_plugin.global_priority {
                    plugin.global_priority.cmp(&other_plugin.global_priority)
                } else if plugin.local_priority != other_plugin.local_priority {
                    let conflict = plugin.global_priority != 0
                        || other_plugin.global_priority != 0
                        || plugin.do_records_overlap(&other_plugin)?;

                    if !conflict {
                        continue;
                    }

                    plugin.local_priority.cmp(&other_plugin.local_priority)
                } else {
                    continue;
                };

                let (from_index, to_index) = if ordering == Ordering::Less {
                    (node_index, other_node_index)
                } else {
                    (other_node_index, node_index)
                };

                if self.inner.contains_edge(from_index, to_index)
                    || self.inner.contains_edge(to_index, from_index)
                {
                    continue;
                }

                if self.is_reachable(to_index, from_index) {
                    logging::debug!(
                        "Skipping {} edge from \"{}\" to \"{}\" as it would create a cycle.",
                        EdgeType::Priority,
                        self.plugin(from_index).name(),
                        self.plugin(to_index).name()
                    );
                } else {
                    self.add_edge(from_index, to_index, EdgeType::Priority);
                }
            }
        }

        Ok(())
    }

    /// Add edges between unconnected plugins whose records overlap, ordering
    /// the plugin that overrides more records earlier.
    fn add_overlap_edges(&mut self) -> Result<(), SortingError> {
        logging::trace!("Adding edges for overlapping plugins...");

        let mut node_index_iter = self.inner.node_indices();
        while let Some(node_index) = node_index_iter.next() {
            let plugin = Rc::clone(self.plugin(node_index));

            if plugin.override_record_count == 0 {
                logging::debug!(
                    "Skipping vertex for \"{}\": the plugin contains no override records.",
                    plugin.name()
                );
                continue;
            }

            for other_node_index in node_index_iter.clone() {
                let other_plugin = Rc::clone(self.plugin(other_node_index));

                // Don't add an edge between these two plugins if one already
                // exists (only check direct edges and not paths for
                // efficiency).
                if self.inner.contains_edge(node_index, other_node_index)
                    || self.inner.contains_edge(other_node_index, node_index)
                {
                    continue;
                }

                if plugin.override_record_count == other_plugin.override_record_count
                    || !plugin.do_records_overlap(&other_plugin)?
                {
                    // There's no way to order the two, so leave them to be
                    // treated like any two unlinked, non-conflicting plugins
                    // in the tie-break pass.
                    continue;
                }

                let (from_index, to_index) =
                    if plugin.override_record_count > other_plugin.override_record_count {
                        (node_index, other_node_index)
                    } else {
                        (other_node_index, node_index)
                    };

                if self.is_reachable(to_index, from_index) {
                    logging::debug!(
                        "Skipping {} edge from \"{}\" to \"{}\" as it would create a cycle.",
                        EdgeType::RecordOverlap,
                        self.plugin(from_index).name(),
                        self.plugin(to_index).name()
                    );
                } else {
                    self.add_edge(from_index, to_index, EdgeType::RecordOverlap);
                }
            }
        }

        Ok(())
    }

    /// Add edges between all remaining unconnected plugins so that there is
    /// only one possible topological sort result. The current load order
    /// decides the direction of each edge, falling back to filename
    /// comparisons for plugins that have no load order position.
    ///
    /// Pairs involving the latest-sorting plugins are processed first, so
    /// that a plugin that existing edges force to load late is discovered as
    /// such before any edge is added that would drag its natural neighbours
    /// late along with it.
    fn add_tie_break_edges(&mut self) {
        logging::trace!("Adding edges to break ties between plugins...");

        let mut nodes: Vec<_> = self.inner.node_indices().collect();
        nodes.sort_by(|a, b| tie_break_cmp(self.plugin(*a), self.plugin(*b)));

        for (position, &to_index) in nodes.iter().enumerate().rev() {
            for &from_index in nodes.get(..position).unwrap_or_default() {
                if self.inner.contains_edge(from_index, to_index)
                    || self.inner.contains_edge(to_index, from_index)
                {
                    continue;
                }

                if self.is_reachable(to_index, from_index) {
                    logging::debug!(
                        "Skipping {} edge from \"{}\" to \"{}\" as it would create a cycle.",
                        EdgeType::TieBreak,
                        self.plugin(from_index).name(),
                        self.plugin(to_index).name()
                    );
                } else {
                    self.add_edge(from_index, to_index, EdgeType::TieBreak);
                }
            }
        }
    }

    fn check_for_cycles(&self) -> Result<(), CyclicInteractionError> {
        match self.find_cycle() {
            Some(cycle) => Err(CyclicInteractionError::new(cycle)),
            None => Ok(()),
        }
    }

    /// Search for a cycle using an iterative depth-first traversal.
    ///
    /// Returns the vertices along the first cycle found, each annotated with
    /// the type of the edge leading to the next vertex, and the last with the
    /// type of the edge that closes the loop.
    fn find_cycle(&self) -> Option<Vec<Vertex>> {
        let mut visits: HashMap<NodeIndex, Visit> = HashMap::default();

        for start in self.inner.node_indices() {
            if visits.contains_key(&start) {
                continue;
            }

            visits.insert(start, Visit::InProgress);
            let mut stack = vec![self.new_frame(start, None)];

            while let Some(top) = stack.last_mut() {
                let Some((target, edge_type)) = top.unfollowed_edges.pop() else {
                    visits.insert(top.node, Visit::Finished);
                    stack.pop();
                    continue;
                };

                match visits.get(&target) {
                    None => {
                        visits.insert(target, Visit::InProgress);
                        let frame = self.new_frame(target, Some(edge_type));
                        stack.push(frame);
                    }
                    Some(Visit::InProgress) => {
                        // The edge leads back to an ancestor on the current
                        // path, so the path from that ancestor loops.
                        return Some(self.cycle_from_stack(&stack, target, edge_type));
                    }
                    Some(Visit::Finished) => {}
                }
            }
        }

        None
    }

    fn new_frame(&self, node: NodeIndex, entered_by: Option<EdgeType>) -> Frame {
        // Petgraph iterates a node's edges most-recently-added first, so
        // popping from the buffered Vec follows them in the order they were
        // added, which keeps cycle reports stable.
        let unfollowed_edges = self
            .inner
            .edges(node)
            .map(|edge| (edge.target(), *edge.weight()))
            .collect();

        Frame {
            node,
            entered_by,
            unfollowed_edges,
        }
    }

    /// Turn the traversal stack's suffix from `cycle_start` down into the
    /// cycle's vertices. Each frame records the edge it was entered by, which
    /// is the previous frame's out edge.
    fn cycle_from_stack(
        &self,
        stack: &[Frame],
        cycle_start: NodeIndex,
        closing_edge: EdgeType,
    ) -> Vec<Vertex> {
        let position = match stack.iter().position(|frame| frame.node == cycle_start) {
            Some(position) => position,
            None => {
                logging::error!("The start of a cycle is not on the current traversal path");
                0
            }
        };

        let frames = stack.get(position..).unwrap_or(stack);

        let mut cycle = Vec::new();
        for pair in frames.windows(2) {
            if let [from, to] = pair {
                let mut vertex = Vertex::new(self.plugin(from.node).name().to_owned());
                if let Some(edge_type) = to.entered_by {
                    vertex.set_out_edge_type(edge_type);
                }
                cycle.push(vertex);
            }
        }

        if let Some(last) = frames.last() {
            cycle.push(
                Vertex::new(self.plugin(last.node).name().to_owned())
                    .with_out_edge_type(closing_edge),
            );
        }

        cycle
    }

    /// Check whether a path leads from one node to another, breadth-first.
    ///
    /// Every node the search reaches is recorded in the known-paths set, so
    /// later questions about the same source can often be answered without
    /// searching at all.
    fn is_reachable(&mut self, from: NodeIndex, to: NodeIndex) -> bool {
        if self.known_paths.contains(&(from, to)) {
            return true;
        }

        let mut queue = VecDeque::from([from]);
        let mut visited = HashSet::default();
        visited.insert(from);

        while let Some(current) = queue.pop_front() {
            for target in self.inner.neighbors(current) {
                if visited.insert(target) {
                    self.known_paths.insert((from, target));

                    if target == to {
                        return true;
                    }

                    queue.push_back(target);
                }
            }
        }

        false
    }

    fn topological_sort(&self) -> Result<Vec<NodeIndex>, SortingError> {
        petgraph::algo::toposort(&self.inner, None)
            .map_err(|e| SortingError::CycleInvolving(self.plugin(e.node_id()).name().to_owned()))
    }

    /// Find the first pair of consecutive nodes in the sorted path that have
    /// no edge joining them, if any. A gap means more than one load order
    /// satisfies the graph, which the tie-break pass should have made
    /// impossible.
    fn first_unlinked_consecutive_pair(
        &self,
        path: &[NodeIndex],
    ) -> Option<(NodeIndex, NodeIndex)> {
        logging::trace!("Checking uniqueness of the path through the plugin graph...");

        path.windows(2).find_map(|pair| match *pair {
            [from, to] if !self.inner.contains_edge(from, to) => Some((from, to)),
            _ => None,
        })
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Visit {
    InProgress,
    Finished,
}

/// One step of the depth-first traversal: a node, the edge it was reached
/// through, and the out edges that have yet to be followed.
#[derive(Debug)]
struct Frame {
    node: NodeIndex,
    entered_by: Option<EdgeType>,
    unfollowed_edges: Vec<(NodeIndex, EdgeType)>,
}

/// Compare two plugins by their current load order positions. A plugin with a
/// position loads before one without; two plugins without positions compare
/// by lowercased basename and then by full filename, so that an .esp and .esm
/// pair with the same basename still get a strict order.
fn tie_break_cmp<T: SortingPlugin>(
    lhs: &PluginSortingData<T>,
    rhs: &PluginSortingData<T>,
) -> Ordering {
    match (lhs.load_order_index, rhs.load_order_index) {
        (Some(lhs_index), Some(rhs_index)) => lhs_index.cmp(&rhs_index),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => {
            let lhs_basename = basename(lhs.name()).to_lowercase();
            let rhs_basename = basename(rhs.name()).to_lowercase();

            lhs_basename
                .cmp(&rhs_basename)
                .then_with(|| lhs.name().cmp(rhs.name()))
        }
    }
}

fn basename(plugin_name: &str) -> &str {
    plugin_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(plugin_name)
}

pub(crate) fn sort_plugins<T: SortingPlugin>(
    mut plugins_sorting_data: Vec<PluginSortingData<T>>,
) -> Result<Vec<String>, SortingError> {
    if plugins_sorting_data.is_empty() {
        return Ok(Vec::new());
    }

    // Sort the plugins according to the lexicographical order of their names.
    // This ensures a consistent iteration order for vertices given the same
    // input data. The vertex iteration order can affect what edges get added
    // and so the final sorting result, so consistency is important.
    plugins_sorting_data.sort_by(|a, b| a.name().cmp(b.name()));

    let mut graph = PluginsGraph::new();

    for plugin in plugins_sorting_data {
        graph.add_node(plugin);
    }

    graph.add_hard_edges()?;

    // Check for cycles now because a cycle at this point is a metadata or
    // plugin data error that the user needs to see, while the later passes
    // only add edges that cannot introduce a cycle.
    graph.check_for_cycles()?;

    graph.add_priority_edges()?;
    graph.add_overlap_edges()?;
    graph.add_tie_break_edges();

    // Check for cycles again, just in case there's a bug that lets some occur.
    // The check doesn't take a significant amount of time.
    graph.check_for_cycles()?;

    let sorted_nodes = graph.topological_sort()?;

    if let Some((first, second)) = graph.first_unlinked_consecutive_pair(&sorted_nodes) {
        logging::warn!(
            "The path is not unique. No edge exists between {} and {}.",
            graph.plugin(first).name(),
            graph.plugin(second).name()
        );
    }

    let sorted_plugin_names = sorted_nodes
        .into_iter()
        .map(|i| graph.plugin(i).name().to_owned())
        .collect();

    Ok(sorted_plugin_names)
}
