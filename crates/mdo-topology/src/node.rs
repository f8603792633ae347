//! Named group tree produced by the assembler.

use std::fmt::Write as _;

use mdo_core::{ErrorInfo, MdoError, SubsystemHandle};
use serde::{Deserialize, Serialize};

use crate::strategy::SolverStrategy;

/// Named leaf wrapping an externally supplied subsystem.
#[derive(Debug, Clone)]
pub struct Leaf {
    name: String,
    handle: SubsystemHandle,
}

impl Leaf {
    /// Name of the leaf within its parent.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The wrapped subsystem.
    pub fn handle(&self) -> &SubsystemHandle {
        &self.handle
    }
}

/// Child of a [`GroupNode`].
#[derive(Debug, Clone)]
pub enum Child {
    /// Nested group.
    Group(GroupNode),
    /// Subsystem leaf.
    Leaf(Leaf),
}

impl Child {
    /// Name of the child within its parent.
    pub fn name(&self) -> &str {
        match self {
            Child::Group(group) => group.name(),
            Child::Leaf(leaf) => leaf.name(),
        }
    }

    /// Returns the nested group, if any.
    pub fn as_group(&self) -> Option<&GroupNode> {
        match self {
            Child::Group(group) => Some(group),
            Child::Leaf(_) => None,
        }
    }

    /// Returns the leaf, if any.
    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Child::Group(_) => None,
            Child::Leaf(leaf) => Some(leaf),
        }
    }
}

/// Named tree node with ordered children and an optional solver strategy.
///
/// A node without a strategy is a pass-through container. Nodes are only
/// mutated while the assembler builds them; consumers see shared references.
#[derive(Debug, Clone)]
pub struct GroupNode {
    name: String,
    children: Vec<Child>,
    strategy: Option<SolverStrategy>,
}

impl GroupNode {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            strategy: None,
        }
    }

    /// Name of the node.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Children in execution order.
    pub fn children(&self) -> &[Child] {
        &self.children
    }

    /// Attached solver strategy, `None` for pass-through containers.
    pub fn strategy(&self) -> Option<&SolverStrategy> {
        self.strategy.as_ref()
    }

    pub(crate) fn set_strategy(&mut self, strategy: Option<SolverStrategy>) {
        self.strategy = strategy;
    }

    pub(crate) fn push_leaf(
        &mut self,
        name: impl Into<String>,
        handle: SubsystemHandle,
    ) -> Result<(), MdoError> {
        let name = name.into();
        self.ensure_free(&name)?;
        tracing::debug!(group = %self.name, leaf = %name, label = handle.label(), "placed subsystem");
        self.children.push(Child::Leaf(Leaf { name, handle }));
        Ok(())
    }

    pub(crate) fn push_group(&mut self, group: GroupNode) -> Result<(), MdoError> {
        self.ensure_free(&group.name)?;
        tracing::debug!(
            group = %self.name,
            child = %group.name,
            strategy = group.strategy.as_ref().map(SolverStrategy::tag).unwrap_or("none"),
            "placed group"
        );
        self.children.push(Child::Group(group));
        Ok(())
    }

    fn ensure_free(&self, name: &str) -> Result<(), MdoError> {
        if self.child(name).is_some() {
            return Err(MdoError::Topology(
                ErrorInfo::new("duplicate-subsystem", "subsystem name already used in group")
                    .with_context("group", self.name.clone())
                    .with_context("name", name),
            ));
        }
        Ok(())
    }

    /// Direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&Child> {
        self.children.iter().find(|child| child.name() == name)
    }

    /// Resolves a dotted path relative to this node.
    pub fn find(&self, path: &str) -> Option<&Child> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.child(first)?;
        for segment in segments {
            current = current.as_group()?.child(segment)?;
        }
        Some(current)
    }

    /// Resolves a dotted path to a nested group.
    pub fn find_group(&self, path: &str) -> Option<&GroupNode> {
        self.find(path).and_then(Child::as_group)
    }

    /// Number of leaves in the subtree.
    pub fn leaf_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| match child {
                Child::Group(group) => group.leaf_count(),
                Child::Leaf(_) => 1,
            })
            .sum()
    }

    /// Leaves in depth-first order, keyed by their dotted path.
    pub fn leaves(&self) -> Vec<(String, &Leaf)> {
        let mut out = Vec::new();
        self.collect_leaves("", &mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a Leaf)>) {
        for child in &self.children {
            let path = join_path(prefix, child.name());
            match child {
                Child::Group(group) => group.collect_leaves(&path, out),
                Child::Leaf(leaf) => out.push((path, leaf)),
            }
        }
    }

    /// Nested groups (excluding `self`) in depth-first order, keyed by dotted path.
    pub fn descendants(&self) -> Vec<(String, &GroupNode)> {
        let mut out = Vec::new();
        self.collect_groups("", &mut out);
        out
    }

    fn collect_groups<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a GroupNode)>) {
        for child in &self.children {
            if let Child::Group(group) = child {
                let path = join_path(prefix, group.name());
                out.push((path.clone(), group));
                group.collect_groups(&path, out);
            }
        }
    }

    /// Whether any nested group carries a solver strategy.
    pub fn has_strategy_below(&self) -> bool {
        self.descendants()
            .iter()
            .any(|(_, group)| group.strategy.is_some())
    }

    /// Number of nodes in the subtree (including `self`) whose strategy matches.
    pub fn count_strategies(&self, predicate: impl Fn(&SolverStrategy) -> bool) -> usize {
        let own = usize::from(self.strategy.as_ref().is_some_and(&predicate));
        own + self
            .descendants()
            .iter()
            .filter(|(_, group)| group.strategy.as_ref().is_some_and(&predicate))
            .count()
    }

    /// Serializable structural outline of the subtree.
    pub fn outline(&self) -> NodeOutline {
        NodeOutline::Group {
            name: self.name.clone(),
            strategy: self.strategy.clone(),
            children: self
                .children
                .iter()
                .map(|child| match child {
                    Child::Group(group) => group.outline(),
                    Child::Leaf(leaf) => NodeOutline::Leaf {
                        name: leaf.name.clone(),
                        label: leaf.handle.label().to_string(),
                    },
                })
                .collect(),
        }
    }

    /// Indented text rendering, one node per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(0, &mut out);
        out
    }

    fn render_into(&self, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        match &self.strategy {
            Some(strategy) => {
                let _ = writeln!(
                    out,
                    "{indent}{} [{} / {}]",
                    self.name,
                    strategy.nonlinear_solver_name(),
                    strategy.linear_solver_name()
                );
            }
            None => {
                let _ = writeln!(out, "{indent}{}", self.name);
            }
        }
        for child in &self.children {
            match child {
                Child::Group(group) => group.render_into(depth + 1, out),
                Child::Leaf(leaf) => {
                    let _ = writeln!(out, "{indent}  {} <{}>", leaf.name, leaf.handle.label());
                }
            }
        }
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// Structural outline of a group tree, used for hashing and reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum NodeOutline {
    /// Group with its strategy and children.
    Group {
        /// Node name.
        name: String,
        /// Attached strategy, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        strategy: Option<SolverStrategy>,
        /// Children in order.
        children: Vec<NodeOutline>,
    },
    /// Leaf with its subsystem label.
    Leaf {
        /// Leaf name.
        name: String,
        /// Label of the wrapped subsystem.
        label: String,
    },
}

impl NodeOutline {
    /// Name of the outlined node.
    pub fn name(&self) -> &str {
        match self {
            NodeOutline::Group { name, .. } | NodeOutline::Leaf { name, .. } => name,
        }
    }

    /// Names of the direct children; empty for leaves.
    pub fn child_names(&self) -> Vec<&str> {
        match self {
            NodeOutline::Group { children, .. } => children.iter().map(NodeOutline::name).collect(),
            NodeOutline::Leaf { .. } => Vec::new(),
        }
    }
}
