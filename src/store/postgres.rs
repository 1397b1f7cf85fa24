//! PostgreSQL credential store.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use super::CredentialStore;
use crate::{
    db::DbPool,
    error::AppError,
    logger::Logger,
    models::credential::{Credential, CredentialFilter, NewCredential},
};

const TAG: &str = "PgCredentialStore";

const SELECT_CREDENTIALS: &str = "SELECT id, application_key, application_name, application_token, \
     is_active, created_at FROM credentials WHERE TRUE";

/// [`CredentialStore`] over the `credentials` table.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: DbPool,
    logger: Arc<dyn Logger>,
}

impl PgCredentialStore {
    pub fn new(pool: DbPool, logger: Arc<dyn Logger>) -> Self {
        Self { pool, logger }
    }
}

/// Appends one `AND column = $n` clause per set filter field.
///
/// Empty strings are treated as unset, matching [`CredentialFilter::matches`].
fn push_filter<'a>(query: &mut QueryBuilder<'a, Postgres>, filter: &'a CredentialFilter) {
    let text_fields = [
        ("application_key", &filter.application_key),
        ("application_name", &filter.application_name),
        ("application_token", &filter.application_token),
    ];
    for (column, value) in text_fields {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            query.push(format!(" AND {column} = ")).push_bind(value);
        }
    }

    if let Some(is_active) = filter.is_active {
        query.push(" AND is_active = ").push_bind(is_active);
    }
    if let Some(start) = filter.start_created_at {
        query.push(" AND created_at >= ").push_bind(start);
    }
    if let Some(end) = filter.end_created_at {
        query.push(" AND created_at <= ").push_bind(end);
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn get_by_filter(&self, filter: &CredentialFilter) -> Result<Vec<Credential>, AppError> {
        let mut query = QueryBuilder::<Postgres>::new(SELECT_CREDENTIALS);
        push_filter(&mut query, filter);
        query.push(" ORDER BY created_at, id");

        if let Some(limit) = filter.paging.limit {
            query.push(" LIMIT ").push_bind(limit);
        }
        if let Some(offset) = filter.paging.offset {
            query.push(" OFFSET ").push_bind(offset);
        }

        let credentials = query
            .build_query_as::<Credential>()
            .fetch_all(&self.pool)
            .await?;

        self.logger.debug(
            &format!("Fetched {} credential(s) by filter.", credentials.len()),
            &[TAG],
        );
        Ok(credentials)
    }

    async fn insert(&self, credential: NewCredential) -> Result<Credential, AppError> {
        let inserted = sqlx::query_as::<_, Credential>(
            r#"
            INSERT INTO credentials (
                application_key,
                application_name,
                application_token,
                is_active
            )
            VALUES ($1, $2, $3, $4)
            RETURNING id, application_key, application_name, application_token, is_active, created_at
            "#,
        )
        .bind(&credential.application_key)
        .bind(&credential.application_name)
        .bind(&credential.application_token)
        .bind(credential.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::DuplicateKey(credential.application_key.clone())
            }
            other => AppError::Database(other),
        })?;

        self.logger.info(
            &format!("Inserted credential for '{}'.", inserted.application_name),
            &[TAG],
        );
        Ok(inserted)
    }

    async fn update_activation(&self, application_key: &str, is_active: bool) -> Result<u64, AppError> {
        let affected = sqlx::query("UPDATE credentials SET is_active = $1 WHERE application_key = $2")
            .bind(is_active)
            .bind(application_key)
            .execute(&self.pool)
            .await?
            .rows_affected();

        self.logger.debug(
            &format!("Activation update touched {affected} credential(s)."),
            &[TAG],
        );
        Ok(affected)
    }
}
