//! Network topology — the directed connection lists per agent.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tangle_types::AgentId;

/// A directed connection from one agent to another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    pub from: AgentId,
    pub to: AgentId,
}

impl Connection {
    pub fn new(from: AgentId, to: AgentId) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}→{}", self.from, self.to)
    }
}

/// The wiring of the simulated network.
///
/// Built from undirected neighbor pairs; every pair yields two directed
/// connections, one per gossip direction.
#[derive(Clone, Debug, Default)]
pub struct Topology {
    agents: u32,
    connections: Vec<Connection>,
    inbound: HashMap<AgentId, Vec<Connection>>,
    outbound: HashMap<AgentId, Vec<Connection>>,
}

impl Topology {
    /// Build a topology for agents `0..agents` from undirected edges.
    pub fn from_edges(agents: u32, edges: &[(AgentId, AgentId)]) -> Self {
        let mut topology = Topology {
            agents,
            ..Default::default()
        };
        for &(a, b) in edges {
            topology.push_connection(Connection::new(a, b));
            topology.push_connection(Connection::new(b, a));
        }
        topology
    }

    fn push_connection(&mut self, conn: Connection) {
        if self.connections.contains(&conn) {
            return;
        }
        self.connections.push(conn);
        self.outbound.entry(conn.from).or_default().push(conn);
        self.inbound.entry(conn.to).or_default().push(conn);
    }

    /// Connections on which `agent` receives gossip.
    pub fn inbound(&self, agent: AgentId) -> &[Connection] {
        self.inbound.get(&agent).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Connections on which `agent` sends gossip.
    pub fn outbound(&self, agent: AgentId) -> &[Connection] {
        self.outbound.get(&agent).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every directed connection in the network.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Number of agents this topology spans.
    pub fn agent_count(&self) -> u32 {
        self.agents
    }

    /// Undirected neighbor count of `agent`.
    pub fn degree(&self, agent: AgentId) -> usize {
        self.outbound(agent).len()
    }

    /// Whether every agent can reach every other agent.
    pub fn is_connected(&self) -> bool {
        if self.agents == 0 {
            return true;
        }
        let mut visited: HashSet<AgentId> = HashSet::new();
        let start = AgentId::new(0);
        let mut stack = vec![start];
        visited.insert(start);
        while let Some(agent) = stack.pop() {
            for conn in self.outbound(agent) {
                if visited.insert(conn.to) {
                    stack.push(conn.to);
                }
            }
        }
        visited.len() == self.agents as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a(id: u32) -> AgentId {
        AgentId::new(id)
    }

    #[test]
    fn edges_become_directed_pairs() {
        let topology = Topology::from_edges(3, &[(a(0), a(1)), (a(1), a(2))]);

        assert_eq!(topology.connections().len(), 4);
        assert_eq!(topology.outbound(a(1)).len(), 2);
        assert_eq!(topology.inbound(a(1)).len(), 2);
        assert_eq!(topology.inbound(a(0)), &[Connection::new(a(1), a(0))]);
    }

    #[test]
    fn duplicate_edges_are_ignored() {
        let topology = Topology::from_edges(2, &[(a(0), a(1)), (a(0), a(1))]);
        assert_eq!(topology.connections().len(), 2);
        assert_eq!(topology.degree(a(0)), 1);
    }

    #[test]
    fn connectivity_detects_partitions() {
        let connected = Topology::from_edges(3, &[(a(0), a(1)), (a(1), a(2))]);
        assert!(connected.is_connected());

        let split = Topology::from_edges(4, &[(a(0), a(1)), (a(2), a(3))]);
        assert!(!split.is_connected());
    }

    #[test]
    fn isolated_agent_has_no_connections() {
        let topology = Topology::from_edges(3, &[(a(0), a(1))]);
        assert!(topology.inbound(a(2)).is_empty());
        assert!(topology.outbound(a(2)).is_empty());
        assert!(!topology.is_connected());
    }
}
