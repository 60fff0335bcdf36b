use std::collections::HashSet;

use crate::tuple::{OperationKind, TupleKey, TupleOperation};

/// Ordered, duplicate-free set of tuple operations.
///
/// No two operations share a [`TupleKey`]. Surviving writes keep the order of
/// their first occurrence and are followed by deletes in the order of their
/// first occurrence. A key that is both written and deleted appears once, as
/// a delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationSet {
    operations: Vec<TupleOperation>,
    input_count: usize,
    overridden_writes: usize,
}

impl OperationSet {
    /// Builds a set from operations of mixed kind, scanning writes before deletes.
    pub fn from_operations(operations: impl IntoIterator<Item = TupleOperation>) -> Self {
        let (writes, deletes): (Vec<_>, Vec<_>) =
            operations.into_iter().partition(TupleOperation::is_write);
        deduplicate(
            writes.into_iter().map(|op| op.key),
            deletes.into_iter().map(|op| op.key),
        )
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn operations(&self) -> &[TupleOperation] {
        &self.operations
    }

    pub fn into_operations(self) -> Vec<TupleOperation> {
        self.operations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TupleOperation> {
        self.operations.iter()
    }

    pub fn write_count(&self) -> usize {
        self.operations.iter().filter(|op| op.is_write()).count()
    }

    pub fn delete_count(&self) -> usize {
        self.operations.iter().filter(|op| op.is_delete()).count()
    }

    /// Number of raw operations the set was built from.
    pub fn input_count(&self) -> usize {
        self.input_count
    }

    /// Raw operations that did not survive as their own element.
    pub fn duplicates_removed(&self) -> usize {
        self.input_count - self.operations.len()
    }

    /// Distinct write keys that were superseded by a delete of the same key.
    pub fn overridden_writes(&self) -> usize {
        self.overridden_writes
    }
}

impl<'a> IntoIterator for &'a OperationSet {
    type Item = &'a TupleOperation;
    type IntoIter = std::slice::Iter<'a, TupleOperation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.iter()
    }
}

impl IntoIterator for OperationSet {
    type Item = TupleOperation;
    type IntoIter = std::vec::IntoIter<TupleOperation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.into_iter()
    }
}

/// Collapses duplicate keys and resolves write/delete conflicts in favour of delete.
pub fn deduplicate<W, D>(writes: W, deletes: D) -> OperationSet
where
    W: IntoIterator<Item = TupleKey>,
    D: IntoIterator<Item = TupleKey>,
{
    let writes: Vec<TupleKey> = writes.into_iter().collect();
    let mut input_count = writes.len();

    let mut deleted: HashSet<TupleKey> = HashSet::new();
    let mut delete_order: Vec<TupleKey> = Vec::new();
    for key in deletes {
        input_count += 1;
        if deleted.insert(key.clone()) {
            delete_order.push(key);
        }
    }

    let mut seen: HashSet<TupleKey> = HashSet::with_capacity(writes.len());
    let mut operations = Vec::with_capacity(writes.len() + delete_order.len());
    let mut overridden_writes = 0;

    for key in writes {
        if !seen.insert(key.clone()) {
            continue;
        }
        if deleted.contains(&key) {
            overridden_writes += 1;
            continue;
        }
        operations.push(TupleOperation::new(OperationKind::Write, key));
    }

    operations.extend(
        delete_order
            .into_iter()
            .map(|key| TupleOperation::new(OperationKind::Delete, key)),
    );

    OperationSet {
        operations,
        input_count,
        overridden_writes,
    }
}
