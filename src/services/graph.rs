use crate::domain::models::{DeadLink, DependencyEdge, DependencyNode, GraphAnalysis, Severity};
use std::collections::HashSet;

/// Edges, dead links and critical services of a declared dependency graph.
///
/// An edge whose target is not a declared node is a dead link. Its severity
/// follows the criticality of the node that declared it. No cycle detection.
pub fn analyze(nodes: &[DependencyNode]) -> GraphAnalysis {
    let known: HashSet<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
    let mut edges = Vec::new();
    let mut dead_links = Vec::new();

    for node in nodes {
        for dep in &node.depends_on {
            edges.push(DependencyEdge {
                from_service: node.name.clone(),
                to_service: dep.clone(),
                critical: node.critical,
            });
            if !known.contains(dep.as_str()) {
                dead_links.push(DeadLink {
                    service: node.name.clone(),
                    missing_dependency: dep.clone(),
                    severity: if node.critical {
                        Severity::Critical
                    } else {
                        Severity::Warning
                    },
                });
            }
        }
    }

    GraphAnalysis {
        total_services: nodes.len(),
        total_edges: edges.len(),
        edges,
        dead_links,
        critical_services: nodes
            .iter()
            .filter(|n| n.critical)
            .map(|n| n.name.clone())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, deps: &[&str], critical: bool) -> DependencyNode {
        DependencyNode {
            name: name.to_string(),
            depends_on: deps.iter().map(|s| s.to_string()).collect(),
            critical,
            ..DependencyNode::default()
        }
    }

    #[test]
    fn missing_target_is_one_dead_link_with_source_severity() {
        let g = analyze(&[node("A", &["B"], true)]);
        assert_eq!(g.dead_links.len(), 1);
        assert_eq!(g.dead_links[0].service, "A");
        assert_eq!(g.dead_links[0].missing_dependency, "B");
        assert_eq!(g.dead_links[0].severity, Severity::Critical);

        let g = analyze(&[node("A", &["B"], false)]);
        assert_eq!(g.dead_links[0].severity, Severity::Warning);
    }

    #[test]
    fn declared_targets_are_edges_only() {
        let g = analyze(&[
            node("Backend API", &["Database", "Auth"], true),
            node("Database", &[], true),
            node("Auth", &["Database"], false),
        ]);
        assert_eq!(g.total_services, 3);
        assert_eq!(g.total_edges, 3);
        assert!(g.dead_links.is_empty());
        assert_eq!(g.critical_services, vec!["Backend API", "Database"]);
    }

    #[test]
    fn cycles_are_not_an_error() {
        let g = analyze(&[node("A", &["B"], false), node("B", &["A"], false)]);
        assert_eq!(g.total_edges, 2);
        assert!(g.dead_links.is_empty());
    }

    #[test]
    fn empty_graph() {
        let g = analyze(&[]);
        assert_eq!(g, GraphAnalysis::default());
    }
}
