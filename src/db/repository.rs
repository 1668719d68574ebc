//! Generic CRUD repository.
//!
//! [`Repository`] reads and writes one [`Entity`] table through a [`Session`].
//! Writes commit immediately and return the row reloaded from the database.
//! Entity-specific rules plug in through [`RepositoryHooks`].

use std::marker::PhantomData;

use async_trait::async_trait;

use crate::core::{AppError, Result};
use crate::db::pagination::{Page, PageParams};
use crate::db::query::{self, ListQuery};
use crate::db::registry::{Entity, PRIMARY_KEY};
use crate::db::session::Session;
use crate::db::value::{Attributes, Filters};

/// Per-entity customization of the attributes written by a repository
#[async_trait]
pub trait RepositoryHooks<E: Entity>: Send + Sync {
    /// Transform attributes before insert
    async fn before_create(&self, attributes: Attributes) -> Result<Attributes> {
        Ok(attributes)
    }

    /// Transform attributes before updating `entity`
    async fn before_update(&self, _entity: &E, attributes: Attributes) -> Result<Attributes> {
        Ok(attributes)
    }
}

/// Hooks that pass attributes through unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl<E: Entity> RepositoryHooks<E> for NoHooks {}

/// Reads and writes for one entity type through a session
pub struct Repository<E: Entity, H: RepositoryHooks<E> = NoHooks> {
    session: Session,
    hooks: H,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Repository<E, NoHooks> {
    pub fn new(session: Session) -> Self {
        Self::with_hooks(session, NoHooks)
    }
}

impl<E: Entity, H: RepositoryHooks<E>> Repository<E, H> {
    pub fn with_hooks(session: Session, hooks: H) -> Self {
        Self {
            session,
            hooks,
            _entity: PhantomData,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Every match, newest first
    pub async fn list(&self, filters: Filters, search_fields: &[&str]) -> Result<Vec<E>> {
        let query = ListQuery::new(E::TABLE, filters, search_fields)?;
        tracing::debug!(table = E::TABLE.name, "Listing rows");

        self.session.fetch_all(&mut query.select()).await
    }

    pub async fn paginate(
        &self,
        params: PageParams,
        filters: Filters,
        search_fields: &[&str],
    ) -> Result<Page<E>> {
        params.validate()?;
        let query = ListQuery::new(E::TABLE, filters, search_fields)?;
        tracing::debug!(
            table = E::TABLE.name,
            page = params.page,
            size = params.size,
            "Paginating rows"
        );

        let total = self.session.fetch_scalar(&mut query.count()).await?;
        let items = self
            .session
            .fetch_all(&mut query.select_page(params.limit(), params.offset()))
            .await?;

        Ok(Page::new(items, total, params))
    }

    /// Match with the highest id, `None` when nothing matches
    pub async fn find_one(&self, filters: Filters) -> Result<Option<E>> {
        let query = ListQuery::new(E::TABLE, filters, &[])?;

        self.session.fetch_optional(&mut query.select_first()).await
    }

    /// Insert, commit, and return the row as stored
    pub async fn create(&self, attributes: Attributes) -> Result<E> {
        let attributes = self.hooks.before_create(attributes).await?;
        E::TABLE.check_fields(attributes.keys())?;

        let id = self
            .session
            .fetch_scalar(&mut query::insert(E::TABLE, &attributes))
            .await?;
        self.session.commit().await?;
        tracing::debug!(table = E::TABLE.name, id, "Row created");

        self.reload(id).await
    }

    /// Update by id, commit, and return the row as stored
    pub async fn update(&self, entity: &E, attributes: Attributes) -> Result<E> {
        let attributes = self.hooks.before_update(entity, attributes).await?;
        E::TABLE.check_fields(attributes.keys())?;

        if attributes.contains_key(PRIMARY_KEY) {
            return Err(AppError::validation(format!(
                "'{}' cannot be updated",
                PRIMARY_KEY
            )));
        }

        let id = entity.id();
        if !attributes.is_empty() {
            let affected = self
                .session
                .execute(&mut query::update(E::TABLE, id, &attributes))
                .await?;
            self.session.commit().await?;
            tracing::debug!(table = E::TABLE.name, id, affected, "Row updated");
        }

        self.reload(id).await
    }

    async fn reload(&self, id: i64) -> Result<E> {
        self.session
            .fetch_optional(&mut query::refresh(E::TABLE, id))
            .await?
            .ok_or_else(|| AppError::not_found(format!("{} {}", E::TABLE.name, id)))
    }
}
