use std::fmt;

/// Identity of a relationship tuple: `(user, relation, object)`.
///
/// Two operations with the same key address the same tuple on the remote
/// service regardless of whether they write or delete it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TupleKey {
    pub user: String,
    pub relation: String,
    pub object: String,
}

impl TupleKey {
    pub fn new(
        user: impl Into<String>,
        relation: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            relation: relation.into(),
            object: object.into(),
        }
    }
}

impl fmt::Display for TupleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}@{}", self.object, self.relation, self.user)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Write,
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Write => write!(f, "write"),
            OperationKind::Delete => write!(f, "delete"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TupleOperation {
    pub kind: OperationKind,
    pub key: TupleKey,
}

impl TupleOperation {
    pub fn new(kind: OperationKind, key: TupleKey) -> Self {
        Self { kind, key }
    }

    pub fn write(
        user: impl Into<String>,
        relation: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self::new(OperationKind::Write, TupleKey::new(user, relation, object))
    }

    pub fn delete(
        user: impl Into<String>,
        relation: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self::new(OperationKind::Delete, TupleKey::new(user, relation, object))
    }

    pub fn is_write(&self) -> bool {
        self.kind == OperationKind::Write
    }

    pub fn is_delete(&self) -> bool {
        self.kind == OperationKind::Delete
    }

    pub fn user(&self) -> &str {
        &self.key.user
    }

    pub fn relation(&self) -> &str {
        &self.key.relation
    }

    pub fn object(&self) -> &str {
        &self.key.object
    }
}

impl fmt::Display for TupleOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.key)
    }
}
