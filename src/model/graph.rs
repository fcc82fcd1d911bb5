use std::collections::HashMap;

use petgraph::Graph;
use petgraph::prelude::*;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::NODE_BASE_WEIGHT;
use crate::model::transaction::Transaction;
use crate::utils::shorten_address;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub display_label: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source_id: String,
    pub target_id: String,
    pub value: f64,
}

/// Nodes and edges in first-seen order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphData {
    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }
}

/// Directed transfer graph keyed by address. Repeated addresses and repeated
/// (source, target) pairs accumulate into the existing node or edge.
#[derive(Debug, Clone, Default)]
pub struct TransferGraph {
    graph: Graph<GraphNode, GraphEdge>,
    node_indices: HashMap<String, NodeIndex>,
}

impl TransferGraph {
    pub fn new() -> Self {
        Self {
            graph: Graph::new(),
            node_indices: HashMap::new(),
        }
    }

    /// Creates the node at base weight, or bumps an existing one by 1.
    pub fn upsert_node(
        &mut self,
        address: &str,
    ) -> NodeIndex {
        if let Some(&idx) = self.node_indices.get(address) {
            if let Some(node) = self.graph.node_weight_mut(idx) {
                node.weight += 1.0;
            }
            return idx;
        }

        let node = GraphNode {
            id: address.to_string(),
            display_label: shorten_address(address),
            weight: NODE_BASE_WEIGHT,
        };

        let idx = self.graph.add_node(node);
        self.node_indices.insert(address.to_string(), idx);

        idx
    }

    pub fn upsert_edge(
        &mut self,
        from: &str,
        to: &str,
        amount: f64,
    ) {
        let from_idx = self.upsert_node(from);
        let to_idx = self.upsert_node(to);

        if let Some(edge_idx) = self.graph.find_edge(from_idx, to_idx) {
            if let Some(edge) = self.graph.edge_weight_mut(edge_idx) {
                edge.value += amount;
            }
            return;
        }

        let edge = GraphEdge {
            source_id: from.to_string(),
            target_id: to.to_string(),
            value: amount,
        };

        self.graph.add_edge(from_idx, to_idx, edge);
    }

    pub fn get_node_count(&self) -> usize { self.graph.node_count() }

    pub fn get_edge_count(&self) -> usize { self.graph.edge_count() }

    pub fn get_nodes(&self) -> Vec<GraphNode> { self.graph.node_weights().cloned().collect() }

    pub fn get_edges(&self) -> Vec<GraphEdge> { self.graph.edge_weights().cloned().collect() }

    pub fn into_graph_data(self) -> GraphData {
        let (nodes, edges) = self.graph.into_nodes_edges();
        GraphData {
            nodes: nodes.into_iter().map(|node| node.weight).collect(),
            edges: edges.into_iter().map(|edge| edge.weight).collect(),
        }
    }
}

/// Folds a transaction list into graph data. Transactions without both a
/// source and a destination contribute nothing. The graph is rebuilt from
/// scratch on every call.
pub fn aggregate(transactions: &[Transaction]) -> GraphData {
    let mut graph = TransferGraph::new();

    for tx in transactions.iter().filter(|tx| tx.is_transfer()) {
        graph.upsert_edge(&tx.from_address, &tx.to_address, tx.amount);
    }

    graph.into_graph_data()
}
