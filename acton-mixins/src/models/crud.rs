//! Create, read, update and delete operations
//!
//! Every write ends with exactly one [`Session::commit`]; reads never commit.

use async_trait::async_trait;

use super::mixins::remove;
use super::{fill, persist, primary_key_of, Model, Record, Value};
use crate::error::MixinError;
use crate::session::{Select, Session};

/// Build an equality query over `M`'s table, ordered by primary key
fn select_for<M, I, K>(filters: I, limit: Option<u32>) -> Result<Select, MixinError>
where
    M: Model,
    I: IntoIterator<Item = (K, Value)>,
    K: AsRef<str>,
{
    let schema = M::schema()?;
    let filters = filters
        .into_iter()
        .map(|(name, value)| {
            let name = name.as_ref();
            if schema.column(name).is_none() {
                return Err(MixinError::unknown_attribute::<M>(name));
            }
            Ok((name.to_string(), value))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Select {
        table: schema.table_name().to_string(),
        columns: schema.columns().to_vec(),
        filters,
        order_by: Some(schema.primary_key().name().to_string()),
        limit,
    })
}

/// Persistence operations for a model, opted into with `impl CrudModel for T {}`
#[async_trait]
pub trait CrudModel: Model {
    /// Create, fill, persist and commit a new instance
    ///
    /// # Errors
    ///
    /// An unknown field fails with [`MixinError::UnknownAttribute`] before
    /// the session is touched. Session errors propagate.
    async fn create<I, K>(session: &mut dyn Session, fields: I) -> Result<Self, MixinError>
    where
        I: IntoIterator<Item = (K, Value)> + Send,
        K: AsRef<str> + Send,
    {
        let mut instance = Self::default();
        fill(&mut instance, fields)?;
        persist(&mut instance, session).await?;
        Ok(instance)
    }

    /// All instances matching every `(attribute, value)` filter, by primary key
    ///
    /// An empty filter list returns every row.
    ///
    /// # Errors
    ///
    /// Returns [`MixinError::UnknownAttribute`] for a filter on an undeclared
    /// column.
    async fn read<I, K>(session: &mut dyn Session, filters: I) -> Result<Vec<Self>, MixinError>
    where
        I: IntoIterator<Item = (K, Value)> + Send,
        K: AsRef<str> + Send,
    {
        let select = select_for::<Self, _, _>(filters, None)?;
        session
            .fetch(select)
            .await?
            .into_iter()
            .map(Record::into_model)
            .collect()
    }

    /// The first instance matching the filters, if any
    ///
    /// # Errors
    ///
    /// See [`CrudModel::read`].
    async fn read_one<I, K>(
        session: &mut dyn Session,
        filters: I,
    ) -> Result<Option<Self>, MixinError>
    where
        I: IntoIterator<Item = (K, Value)> + Send,
        K: AsRef<str> + Send,
    {
        let select = select_for::<Self, _, _>(filters, Some(1))?;
        session
            .fetch(select)
            .await?
            .into_iter()
            .next()
            .map(Record::into_model)
            .transpose()
    }

    /// Fill, persist and commit
    ///
    /// # Errors
    ///
    /// Naming the primary key of a persisted instance fails with
    /// [`MixinError::ImmutablePrimaryKey`]; otherwise as [`fill`]. The
    /// instance is unchanged on error.
    async fn update<I, K>(
        &mut self,
        session: &mut dyn Session,
        fields: I,
    ) -> Result<&mut Self, MixinError>
    where
        I: IntoIterator<Item = (K, Value)> + Send,
        K: AsRef<str> + Send,
    {
        let schema = Self::schema()?;
        let fields: Vec<(K, Value)> = fields.into_iter().collect();
        let key_column = schema.primary_key().name();
        if primary_key_of(self, &schema)?.is_some()
            && fields.iter().any(|(name, _)| name.as_ref() == key_column)
        {
            return Err(MixinError::ImmutablePrimaryKey {
                attribute: key_column.to_string(),
                type_name: schema.type_name().to_string(),
            });
        }

        fill(self, fields)?;
        persist(self, session).await?;
        Ok(self)
    }

    /// Delete the row and commit
    ///
    /// # Errors
    ///
    /// Session errors propagate.
    async fn delete(&self, session: &mut dyn Session) -> Result<(), MixinError> {
        remove(self, session).await
    }
}
