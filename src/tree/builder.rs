//! Forest construction: from requested names to root nodes.
//!
//! Each requested name's ancestor chain is resolved up to a root; every name
//! is visited at most once (the visited map doubles as cycle protection),
//! child→parent edges are threaded in first-visit order, and the roots come
//! out in first-discovery order — deterministic for deterministic input.

use indexmap::{IndexMap, IndexSet};
use tracing::trace;

use super::node::Node;
use crate::component::{Component, Registry};

/// Structural failures while building a forest.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TreeError {
    /// No names requested (after deduplication).
    #[error("no component names requested")]
    EmptyInput,
    /// A requested or ancestor name is not registered.
    #[error("unknown component in tree build: {0:?}")]
    UnknownComponent(String),
    /// Two siblings under one parent declare the same container.
    #[error("components under {parent:?} share container {container:?}")]
    DuplicateContainer { parent: String, container: String },
    /// Resolution produced no root nodes.
    #[error("tree build produced no roots")]
    EmptyTree,
    /// A root component carries a container.
    #[error("root component {0:?} must not declare a container")]
    RootHasContainer(String),
}

struct Draft {
    component: Component,
    children: Vec<String>,
}

/// Build the forest for `names`.
///
/// Output: root nodes in first-discovery order, each carrying its resolved
/// children in first-visit order.
pub fn build_forest<S: AsRef<str>>(registry: &Registry, names: &[S]) -> Result<Vec<Node>, TreeError> {
    let requested: IndexSet<&str> = names.iter().map(AsRef::as_ref).collect();
    if requested.is_empty() {
        return Err(TreeError::EmptyInput);
    }

    // Resolve every requested name's ancestor chain. A name already in the
    // visited map stops the walk, so an accidental parent cycle cannot loop.
    let mut visited: IndexMap<String, Draft> = IndexMap::new();
    for name in &requested {
        let mut current = (*name).to_owned();
        while !visited.contains_key(&current) {
            let component = match registry.get(&current) {
                Ok(component) => component,
                Err(_) => return Err(TreeError::UnknownComponent(current)),
            };
            let parent = component.parent().map(str::to_owned);
            visited.insert(
                current.clone(),
                Draft {
                    component: component.clone(),
                    children: Vec::new(),
                },
            );
            match parent {
                Some(p) => current = p,
                None => break,
            }
        }
    }

    // Thread child→parent edges, rejecting sibling container conflicts.
    let order: Vec<String> = visited.keys().cloned().collect();
    for name in &order {
        let (parent, container) = {
            let draft = &visited[name];
            (
                draft.component.parent().map(str::to_owned),
                draft.component.container().map(str::to_owned),
            )
        };
        let Some(parent) = parent else { continue };
        let siblings = &visited[&parent].children;
        for sibling in siblings {
            if visited[sibling].component.container().map(str::to_owned) == container {
                return Err(TreeError::DuplicateContainer {
                    parent,
                    container: container.unwrap_or_default(),
                });
            }
        }
        visited
            .get_mut(&parent)
            .expect("ancestor chains always include the parent")
            .children
            .push(name.clone());
    }

    // Roots, in first-discovery order.
    let roots: Vec<String> = visited
        .iter()
        .filter(|(_, draft)| draft.component.parent().is_none())
        .map(|(name, _)| name.clone())
        .collect();
    if roots.is_empty() {
        return Err(TreeError::EmptyTree);
    }
    for root in &roots {
        if visited[root].component.container().is_some() {
            return Err(TreeError::RootHasContainer(root.clone()));
        }
    }

    let forest: Vec<Node> = roots.iter().map(|root| assemble(root, &visited)).collect();
    trace!(
        roots = forest.len(),
        nodes = forest.iter().map(Node::subtree_len).sum::<usize>(),
        "built forest"
    );
    Ok(forest)
}

fn assemble(name: &str, visited: &IndexMap<String, Draft>) -> Node {
    let draft = &visited[name];
    let mut node = Node::new(draft.component.clone());
    node.children = draft
        .children
        .iter()
        .map(|child| assemble(child, visited))
        .collect();
    node
}
