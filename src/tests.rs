use super::*;

mod events_dispatch;

/// Walks the whole arena and checks the parent/children relation is mutually
/// consistent and acyclic.
pub(crate) fn assert_tree_consistent(rt: &Runtime) {
    let node_count = rt.node_count();
    for index in 0..node_count {
        let node = NodeId(index);
        if let Some(parent) = rt.parent(node) {
            assert!(
                rt.children(parent).contains(&node),
                "{node} names {parent} as parent but is missing from its children"
            );
        }
        for child in rt.children(node) {
            assert_eq!(
                rt.parent(child),
                Some(node),
                "{child} is listed under {node} but points elsewhere"
            );
        }
        let mut seen = std::collections::HashSet::new();
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            assert!(seen.insert(current), "ancestor chain of {node} cycles");
            cursor = rt.parent(current);
        }
    }
}
