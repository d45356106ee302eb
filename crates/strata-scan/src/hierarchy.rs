use std::collections::{btree_map::Entry, BTreeMap, BTreeSet, VecDeque};

use serde::Serialize;

use strata_classfile::ClassfileRecord;

use crate::error::ScanError;
use crate::result::ScanResult;

/// One class in the resolved graph. Nodes reference each other by name, never
/// by pointer; lookups go through the name-keyed tables in [`ScanResult`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClassNode {
    pub name: String,
    /// False for a placeholder that exists only because some parsed class
    /// named it as a superclass.
    pub encountered: bool,
    pub direct_superclass: Option<String>,
    /// In first-encounter order, each subclass exactly once.
    pub direct_subclasses: Vec<String>,
    pub all_superclasses: BTreeSet<String>,
    pub all_subclasses: BTreeSet<String>,
    /// Directly declared interfaces.
    pub interfaces: BTreeSet<String>,
    /// Runtime-visible annotation types.
    pub annotations: BTreeSet<String>,
    /// Declared fields; empty unless field info was enabled for the scan.
    pub fields: Vec<FieldSummary>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldSummary {
    pub name: String,
    pub descriptor: String,
    pub access_flags: u16,
}

impl ClassNode {
    fn placeholder(name: &str) -> Self {
        Self {
            name: name.to_string(),
            encountered: false,
            direct_superclass: None,
            direct_subclasses: Vec::new(),
            all_superclasses: BTreeSet::new(),
            all_subclasses: BTreeSet::new(),
            interfaces: BTreeSet::new(),
            annotations: BTreeSet::new(),
            fields: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InterfaceNode {
    pub name: String,
    /// Declared super-interfaces in source order.
    pub super_interfaces: Vec<String>,
    pub all_super_interfaces: BTreeSet<String>,
}

/// Accumulates classfile records over a scan and resolves them into the
/// global tables. Mutation stops at [`HierarchyBuilder::finalize`]; the
/// returned result is frozen.
#[derive(Debug, Default)]
pub struct HierarchyBuilder {
    classes: BTreeMap<String, ClassNode>,
    interfaces: BTreeMap<String, InterfaceNode>,
    /// Parsed (non-placeholder) classes in scan order; reverse-index
    /// sequences follow it.
    class_order: Vec<String>,
}

impl HierarchyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one record into the graph. Duplicate records for a name are
    /// discarded (the first definition wins), but a duplicate naming a
    /// different direct superclass is a contradiction between classfiles and
    /// fails the scan.
    pub fn add_record(&mut self, record: &ClassfileRecord) -> Result<(), ScanError> {
        if record.is_interface {
            self.add_interface(record);
            return Ok(());
        }

        {
            let node = self
                .classes
                .entry(record.fqn.clone())
                .or_insert_with(|| ClassNode::placeholder(&record.fqn));
            // A class gets exactly one direct superclass over its lifetime,
            // shadowed or not.
            if let (Some(existing), Some(proposed)) =
                (&node.direct_superclass, &record.superclass_fqn)
            {
                if existing != proposed {
                    return Err(ScanError::SuperclassConflict {
                        class: record.fqn.clone(),
                        existing: existing.clone(),
                        proposed: proposed.clone(),
                    });
                }
            }
            if node.encountered {
                return Ok(());
            }
            node.direct_superclass = record.superclass_fqn.clone();
            node.encountered = true;
            node.interfaces.extend(record.interface_fqns.iter().cloned());
            node.annotations.extend(record.annotation_fqns.iter().cloned());
            node.fields = record
                .fields
                .iter()
                .map(|f| FieldSummary {
                    name: f.name.clone(),
                    descriptor: f.descriptor.clone(),
                    access_flags: f.access_flags,
                })
                .collect();
        }
        self.class_order.push(record.fqn.clone());

        if let Some(superclass) = &record.superclass_fqn {
            let parent = self
                .classes
                .entry(superclass.clone())
                .or_insert_with(|| ClassNode::placeholder(superclass));
            if !parent.direct_subclasses.iter().any(|c| c == &record.fqn) {
                parent.direct_subclasses.push(record.fqn.clone());
            }
        }
        Ok(())
    }

    fn add_interface(&mut self, record: &ClassfileRecord) {
        match self.interfaces.entry(record.fqn.clone()) {
            // Already defined by an earlier classpath element.
            Entry::Occupied(_) => {}
            Entry::Vacant(slot) => {
                slot.insert(InterfaceNode {
                    name: record.fqn.clone(),
                    super_interfaces: record.interface_fqns.clone(),
                    all_super_interfaces: BTreeSet::new(),
                });
            }
        }
    }

    /// Resolve the accumulated records into the frozen tables. Does not
    /// consume the builder: resolving the same graph twice produces the same
    /// result.
    pub fn finalize(&self, last_modified_ms: u64) -> ScanResult {
        let mut classes = self.classes.clone();
        let mut interfaces = self.interfaces.clone();

        let roots: Vec<String> = classes
            .values()
            .filter(|n| n.direct_superclass.is_none())
            .map(|n| n.name.clone())
            .collect();

        // Superclass closure, top-down from the roots.
        let mut queue: VecDeque<String> = roots.iter().cloned().collect();
        while let Some(name) = queue.pop_front() {
            let (inherited, children) = match classes.get(&name) {
                Some(node) => {
                    let mut inherited = node.all_superclasses.clone();
                    inherited.insert(name.clone());
                    (inherited, node.direct_subclasses.clone())
                }
                None => continue,
            };
            for child in children {
                if let Some(child_node) = classes.get_mut(&child) {
                    child_node.all_superclasses.extend(inherited.iter().cloned());
                }
                queue.push_back(child);
            }
        }

        // Subclass closure, postorder from the roots.
        for root in &roots {
            let mut stack: Vec<(String, bool)> = vec![(root.clone(), false)];
            while let Some((name, children_done)) = stack.pop() {
                let Some(node) = classes.get(&name) else { continue };
                if children_done {
                    let children = node.direct_subclasses.clone();
                    let mut all = BTreeSet::new();
                    for child in &children {
                        if let Some(child_node) = classes.get(child) {
                            all.extend(child_node.all_subclasses.iter().cloned());
                        }
                        all.insert(child.clone());
                    }
                    if let Some(node) = classes.get_mut(&name) {
                        node.all_subclasses = all;
                    }
                } else {
                    stack.push((name.clone(), true));
                    for child in node.direct_subclasses.clone() {
                        stack.push((child, false));
                    }
                }
            }
        }

        // Super-interface closure over the interface DAG.
        let definitions: BTreeMap<String, Vec<String>> = interfaces
            .iter()
            .map(|(name, node)| (name.clone(), node.super_interfaces.clone()))
            .collect();
        let mut closures: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for name in definitions.keys() {
            superinterface_closure(name, &definitions, &mut closures, &mut BTreeSet::new());
        }
        for (name, node) in interfaces.iter_mut() {
            if let Some(closure) = closures.get(name) {
                node.all_super_interfaces = closure.clone();
            }
        }

        // Annotation reverse index, ordered by first encounter.
        let mut classes_by_annotation: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for name in &self.class_order {
            let Some(node) = classes.get(name) else { continue };
            for annotation in &node.annotations {
                let sequence = classes_by_annotation.entry(annotation.clone()).or_default();
                if !sequence.contains(name) {
                    sequence.push(name.clone());
                }
            }
        }

        // Interface reverse index: declared interfaces plus their transitive
        // super-interfaces...
        let mut members: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for name in &self.class_order {
            let Some(node) = classes.get(name) else { continue };
            for interface in &node.interfaces {
                members
                    .entry(interface.clone())
                    .or_default()
                    .insert(name.clone());
                if let Some(closure) = closures.get(interface) {
                    for super_interface in closure {
                        members
                            .entry(super_interface.clone())
                            .or_default()
                            .insert(name.clone());
                    }
                }
            }
        }
        // ...then implementation is inherited by every transitive subclass.
        for set in members.values_mut() {
            let mut expanded = set.clone();
            for class in set.iter() {
                if let Some(node) = classes.get(class) {
                    expanded.extend(node.all_subclasses.iter().cloned());
                }
            }
            *set = expanded;
        }
        let mut classes_by_interface: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (interface, set) in members {
            let sequence = self
                .class_order
                .iter()
                .filter(|name| set.contains(*name))
                .cloned()
                .collect();
            classes_by_interface.insert(interface, sequence);
        }

        ScanResult::from_parts(
            classes,
            interfaces,
            classes_by_annotation,
            classes_by_interface,
            last_modified_ms,
        )
    }
}

/// Transitive super-interfaces of `name`. The interface graph is a DAG in a
/// well-formed classpath; the `visiting` set keeps a malformed cycle from
/// recursing forever.
fn superinterface_closure(
    name: &str,
    definitions: &BTreeMap<String, Vec<String>>,
    closures: &mut BTreeMap<String, BTreeSet<String>>,
    visiting: &mut BTreeSet<String>,
) -> BTreeSet<String> {
    if let Some(done) = closures.get(name) {
        return done.clone();
    }
    if !visiting.insert(name.to_string()) {
        return BTreeSet::new();
    }
    let mut closure = BTreeSet::new();
    if let Some(supers) = definitions.get(name) {
        for super_interface in supers {
            closure.insert(super_interface.clone());
            closure.extend(superinterface_closure(
                super_interface,
                definitions,
                closures,
                visiting,
            ));
        }
    }
    visiting.remove(name);
    closures.insert(name.to_string(), closure.clone());
    closure
}
