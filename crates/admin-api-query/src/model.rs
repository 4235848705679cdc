//! Save and delete for objects that know their own primary key.
//!
//! [`save_model`] updates the row matching the object's primary key, or
//! creates a new row and adopts the primary key the server assigned.
//! [`delete_model`] removes the row matching the primary key.

use admin_api_core::{ApiError, ApiResult};
use serde_json::Value;

use crate::query::Record;
use crate::queryset::Manager;

/// A domain object stored in a remote collection.
pub trait ApiModel: Send + Sync + Sized + 'static {
    /// The name of the primary-key field.
    fn pk_field() -> &'static str {
        "id"
    }

    /// The primary key, or `None` for an unsaved object.
    fn pk(&self) -> Option<Value>;

    /// Stores a primary key assigned by the server.
    fn set_pk(&mut self, pk: Value);

    /// The object's fields as a wire record.
    fn to_record(&self) -> ApiResult<Record>;
}

/// Persists `object` through `objects`.
///
/// With a primary key this is an update filtered on it, restricted to
/// `update_fields` when given. Without one it is a create (primary key
/// omitted) and the returned primary key is copied onto `object`.
pub async fn save_model<M: ApiModel>(
    object: &mut M,
    objects: &Manager<M>,
    update_fields: Option<&[&str]>,
) -> ApiResult<()> {
    let mut fields = object.to_record()?;
    if let Some(only) = update_fields {
        fields.retain(|name, _| only.contains(&name.as_str()));
    }

    match object.pk() {
        Some(pk) => {
            let updated = objects
                .filter([(M::pk_field(), pk)])
                .update(fields)
                .await?;
            tracing::debug!(collection = objects.name(), updated, "saved existing object");
        }
        None => {
            fields.remove(M::pk_field());
            let created = objects.create(fields).await?;
            if let Some(pk) = created.pk() {
                object.set_pk(pk);
            }
            tracing::debug!(collection = objects.name(), "created object");
        }
    }
    Ok(())
}

/// Deletes the row matching `object`'s primary key and returns the count.
pub async fn delete_model<M: ApiModel>(object: &M, objects: &Manager<M>) -> ApiResult<u64> {
    let pk = object.pk().ok_or_else(|| {
        ApiError::MissingPrimaryKey(format!(
            "{} object can't be deleted because its {} is not set",
            objects.name(),
            M::pk_field()
        ))
    })?;
    objects.filter([(M::pk_field(), pk)]).delete().await
}
