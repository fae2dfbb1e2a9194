//! Stack of applied include statements.
//!
//! Keeps track of version overrides and can produce package definition
//! stack traces. Pushing and popping happens via nodes being held and
//! let go by the recursive calls in the runtime environment: each node
//! holds an immutable shared reference to its parent and is only ever
//! walked root-ward, so the structure is a tree by construction.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::rc::Rc;

use crate::core::descriptor::Descriptor;
use crate::core::statement::{Statement, StatementKind, UsageFlags};
use crate::error::RepositoryError;

pub struct IncludeBacktrace {
    parent: Option<Rc<IncludeBacktrace>>,
    descriptor: Descriptor,
    overrides: std::cell::RefCell<HashMap<String, OverrideRecord>>,
}

struct OverrideRecord {
    version: String,
    usage: UsageFlags,
}

impl IncludeBacktrace {
    pub fn root(descriptor: Descriptor) -> Self {
        IncludeBacktrace {
            parent: None,
            descriptor,
            overrides: Default::default(),
        }
    }

    pub fn child(parent: &Rc<IncludeBacktrace>, descriptor: Descriptor) -> Rc<Self> {
        Rc::new(IncludeBacktrace {
            parent: Some(Rc::clone(parent)),
            descriptor,
            overrides: Default::default(),
        })
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Record an override at this node. An override already declared by
    /// an ancestor wins and the statement is silently ignored: ancestors
    /// were established earlier in the walk and represent root-level
    /// intent. Two different versions declared at the same node are a
    /// fatal conflict.
    pub fn add_override(&self, statement: &Statement) -> Result<(), RepositoryError> {
        let StatementKind::Override {
            package_name,
            version,
        } = &statement.kind
        else {
            return Ok(());
        };

        // Don't replace an existing override on the stack.
        if let Some(parent) = &self.parent {
            if parent.get_override(package_name).is_some() {
                return Ok(());
            }
        }

        let mut overrides = self.overrides.borrow_mut();
        if let Some(existing) = overrides.get(package_name) {
            if existing.version != *version {
                let mut message = format!(
                    "Override {} version conflict ({} vs {}){}.",
                    package_name,
                    existing.version,
                    version,
                    statement.position_string(),
                );
                let stacktrace = self.dump_to_string();
                if !stacktrace.is_empty() {
                    message.push('\n');
                    message.push_str(&stacktrace);
                }
                return Err(RepositoryError(message));
            }
        }

        overrides.insert(
            package_name.clone(),
            OverrideRecord {
                version: version.clone(),
                usage: statement.usage.clone(),
            },
        );
        statement.usage.mark_added_to_environment();

        Ok(())
    }

    /// The version pinned for a package by this node or any ancestor.
    /// Marks the resolving override statement as referenced.
    pub fn get_override(&self, package_name: &str) -> Option<String> {
        if let Some(record) = self.overrides.borrow().get(package_name) {
            record.usage.mark_referenced();
            return Some(record.version.clone());
        }

        self.parent
            .as_ref()
            .and_then(|parent| parent.get_override(package_name))
    }

    /// Render the ancestor chain root-first, indented two spaces per
    /// depth.
    pub fn dump(&self, out: &mut dyn std::io::Write) -> std::io::Result<()> {
        write!(out, "{}", self.dump_to_string())
    }

    pub fn dump_to_string(&self) -> String {
        let mut stack = Vec::new();
        self.collect(&mut stack);

        let mut out = String::new();
        for (depth, descriptor) in stack.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}{}",
                "  ".repeat(depth),
                descriptor.to_descriptive_string()
            );
        }
        out
    }

    fn collect<'a>(&'a self, stack: &mut Vec<&'a Descriptor>) {
        if let Some(parent) = &self.parent {
            parent.collect(stack);
        }
        stack.push(&self.descriptor);
    }
}
