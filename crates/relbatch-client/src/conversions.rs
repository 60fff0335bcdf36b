use relbatch_core::{OperationKind, TupleKey, TupleOperation};

use crate::proto::relbatch::v1;
use crate::transport::WriteTarget;

pub fn domain_key_to_proto(key: &TupleKey) -> v1::TupleKey {
    v1::TupleKey {
        user: key.user.clone(),
        relation: key.relation.clone(),
        object: key.object.clone(),
    }
}

pub fn proto_key_to_domain(key: &v1::TupleKey) -> TupleKey {
    TupleKey::new(&key.user, &key.relation, &key.object)
}

pub fn operation_kind_to_proto(kind: OperationKind) -> v1::relationship_update::Operation {
    match kind {
        OperationKind::Write => v1::relationship_update::Operation::Touch,
        OperationKind::Delete => v1::relationship_update::Operation::Delete,
    }
}

pub fn domain_operation_to_proto(op: &TupleOperation) -> v1::RelationshipUpdate {
    v1::RelationshipUpdate {
        operation: operation_kind_to_proto(op.kind) as i32,
        tuple_key: Some(domain_key_to_proto(&op.key)),
    }
}

/// Decodes an update; `None` when the operation is unspecified or the key is missing.
pub fn proto_update_to_domain(update: &v1::RelationshipUpdate) -> Option<TupleOperation> {
    let kind = match v1::relationship_update::Operation::try_from(update.operation).ok()? {
        v1::relationship_update::Operation::Touch => OperationKind::Write,
        v1::relationship_update::Operation::Delete => OperationKind::Delete,
        v1::relationship_update::Operation::Unspecified => return None,
    };
    let key = update.tuple_key.as_ref().map(proto_key_to_domain)?;
    Some(TupleOperation::new(kind, key))
}

pub fn write_request<'a>(
    target: &WriteTarget,
    operations: impl IntoIterator<Item = &'a TupleOperation>,
) -> v1::WriteRelationshipsRequest {
    v1::WriteRelationshipsRequest {
        store_id: target.store_id.clone(),
        authorization_model_id: target.authorization_model_id.clone(),
        updates: operations
            .into_iter()
            .map(domain_operation_to_proto)
            .collect(),
    }
}
