//! Dependency tree rendering: indented text or Graphviz DOT.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use anyhow::Result;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};

use crate::core::descriptor::{Descriptor, DEFAULT_CONFIG};
use crate::core::package::Package;
use crate::env::{IncludeBacktrace, PackageStore};
use crate::sources::Repository;

/// Indented dependency tree rooted at `base`, one `name/version:config`
/// per line, two spaces per depth. Repeated subtrees are marked and
/// not expanded again.
pub fn dependency_tree(
    repository: &Repository,
    base: &Rc<Package>,
    config: Option<&str>,
) -> Result<String> {
    let mut out = String::new();
    let mut seen = HashSet::new();
    walk_text(repository, base, config, 0, &mut seen, &mut out)?;
    Ok(out)
}

fn walk_text(
    repository: &Repository,
    package: &Rc<Package>,
    config: Option<&str>,
    depth: usize,
    seen: &mut HashSet<String>,
    out: &mut String,
) -> Result<()> {
    let label = label_for(package, config);

    out.push_str(&"  ".repeat(depth));
    out.push_str(&label);

    let first_visit = seen.insert(label);
    if !first_visit {
        out.push_str(" (*)\n");
        return Ok(());
    }
    out.push('\n');

    for (dependency, target) in dependencies_of(repository, package, config)? {
        walk_text(
            repository,
            &target,
            dependency.config.as_deref(),
            depth + 1,
            seen,
            out,
        )?;
    }
    Ok(())
}

/// The same graph in Graphviz DOT form, deduplicated by node label.
pub fn dependency_dot(
    repository: &Repository,
    base: &Rc<Package>,
    config: Option<&str>,
) -> Result<String> {
    let mut graph: DiGraph<String, ()> = DiGraph::new();
    let mut nodes: HashMap<String, NodeIndex> = HashMap::new();
    let mut expanded: HashSet<NodeIndex> = HashSet::new();

    add_node_and_edges(
        repository,
        base,
        config,
        &mut graph,
        &mut nodes,
        &mut expanded,
    )?;

    Ok(format!(
        "{:?}",
        Dot::with_config(&graph, &[Config::EdgeNoLabel])
    ))
}

fn add_node_and_edges(
    repository: &Repository,
    package: &Rc<Package>,
    config: Option<&str>,
    graph: &mut DiGraph<String, ()>,
    nodes: &mut HashMap<String, NodeIndex>,
    expanded: &mut HashSet<NodeIndex>,
) -> Result<NodeIndex> {
    let label = label_for(package, config);

    let index = *nodes
        .entry(label.clone())
        .or_insert_with(|| graph.add_node(label));
    if !expanded.insert(index) {
        return Ok(index);
    }

    for (dependency, target) in dependencies_of(repository, package, config)? {
        let child = add_node_and_edges(
            repository,
            &target,
            dependency.config.as_deref(),
            graph,
            nodes,
            expanded,
        )?;
        graph.update_edge(index, child, ());
    }
    Ok(index)
}

/// `name/version:config`, with the config always shown so that two
/// configs of one package stay distinct nodes.
fn label_for(package: &Package, config: Option<&str>) -> String {
    Descriptor::format(
        Some(&package.name_or_file_or_description()),
        package.version(),
        Some(config.unwrap_or(DEFAULT_CONFIG)),
    )
}

/// Resolve one package's direct dependencies to loaded packages.
/// Each call gets a fresh root backtrace; overrides still apply in
/// statement order within the walk.
fn dependencies_of(
    repository: &Repository,
    package: &Rc<Package>,
    config: Option<&str>,
) -> Result<Vec<(Descriptor, Rc<Package>)>> {
    let backtrace = Rc::new(IncludeBacktrace::root(package.descriptor()));
    let descriptors = package.package_dependencies(config, &backtrace)?;

    let mut resolved = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        let target = if let Some(path) = &descriptor.file_path {
            repository.package_for_file(path)?
        } else if descriptor.name.as_deref() == package.name()
            && descriptor.version.as_deref() == package.version()
        {
            package.clone()
        } else {
            repository.package_for(&descriptor)?
        };
        resolved.push((descriptor, target));
    }
    Ok(resolved)
}
