use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{error, instrument};

use dnswatch_application::ports::{CheckResultUpdate, RequestStorePort, TerminalTransition};
use dnswatch_domain::{DomainError, RequestStatus, RequestType, VerificationRequest};

use super::retry::with_retry;

#[derive(Debug, sqlx::FromRow)]
struct RequestRow {
    id: i64,
    target: String,
    request_type: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    activated_at: Option<DateTime<Utc>>,
    last_checked_at: Option<DateTime<Utc>>,
    next_check_at: Option<DateTime<Utc>>,
    last_check_result_json: Option<String>,
    fail_reason: Option<String>,
    expires_at: DateTime<Utc>,
}

impl RequestRow {
    fn into_domain(self) -> VerificationRequest {
        VerificationRequest {
            id: self.id,
            target: self.target.into(),
            request_type: RequestType::from_str(&self.request_type).unwrap_or(RequestType::Email),
            status: RequestStatus::from_str(&self.status).unwrap_or(RequestStatus::Pending),
            created_at: self.created_at,
            updated_at: self.updated_at,
            activated_at: self.activated_at,
            last_checked_at: self.last_checked_at,
            next_check_at: self.next_check_at,
            last_check_result_json: self.last_check_result_json.map(Into::into),
            fail_reason: self.fail_reason.map(Into::into),
            expires_at: self.expires_at,
        }
    }
}

const REQUEST_COLUMNS: &str = "id, target, request_type, status, created_at, updated_at, \
    activated_at, last_checked_at, next_check_at, last_check_result_json, fail_reason, expires_at";

pub struct SqliteRequestStore {
    pool: SqlitePool,
    retry_count: u32,
    retry_delay_ms: u64,
}

impl SqliteRequestStore {
    pub fn new(pool: SqlitePool, retry_count: u32, retry_delay_ms: u64) -> Self {
        Self {
            pool,
            retry_count,
            retry_delay_ms,
        }
    }

    fn map_db_err(e: sqlx::Error) -> DomainError {
        error!(error = %e, "database operation failed");
        DomainError::DatabaseError(e.to_string())
    }
}

#[async_trait]
impl RequestStorePort for SqliteRequestStore {
    #[instrument(skip(self))]
    async fn insert_request(
        &self,
        target: &str,
        request_type: RequestType,
        expires_at: DateTime<Utc>,
    ) -> Result<VerificationRequest, DomainError> {
        let now = Utc::now();
        let result = with_retry(self.retry_count, self.retry_delay_ms, || {
            sqlx::query(
                "INSERT INTO dns_requests \
                 (target, request_type, status, created_at, updated_at, expires_at) \
                 VALUES (?, ?, 'PENDING', ?, ?, ?)",
            )
            .bind(target)
            .bind(request_type.as_str())
            .bind(now)
            .bind(now)
            .bind(expires_at)
            .execute(&self.pool)
        })
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint failed") {
                DomainError::DuplicateRequest(request_type.as_str(), target.to_string())
            } else {
                Self::map_db_err(e)
            }
        })?;

        let id = result.last_insert_rowid();
        self.find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::DatabaseError("inserted row vanished".to_string()))
    }

    #[instrument(skip(self))]
    async fn find_by_target(&self, target: &str) -> Result<Vec<VerificationRequest>, DomainError> {
        let rows: Vec<RequestRow> = with_retry(self.retry_count, self.retry_delay_ms, || {
            sqlx::query_as(&format!("SELECT {REQUEST_COLUMNS} FROM dns_requests WHERE target = ?"))
                .bind(target)
                .fetch_all(&self.pool)
        })
        .await
        .map_err(Self::map_db_err)?;

        Ok(rows.into_iter().map(RequestRow::into_domain).collect())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> Result<Option<VerificationRequest>, DomainError> {
        let row: Option<RequestRow> = with_retry(self.retry_count, self.retry_delay_ms, || {
            sqlx::query_as(&format!("SELECT {REQUEST_COLUMNS} FROM dns_requests WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
        })
        .await
        .map_err(Self::map_db_err)?;

        Ok(row.map(RequestRow::into_domain))
    }

    #[instrument(skip(self))]
    async fn find_pending_not_expired(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<VerificationRequest>, DomainError> {
        let rows: Vec<RequestRow> = with_retry(self.retry_count, self.retry_delay_ms, || {
            sqlx::query_as(&format!(
                "SELECT {REQUEST_COLUMNS} FROM dns_requests WHERE status = 'PENDING' AND expires_at > ?"
            ))
            .bind(now)
            .fetch_all(&self.pool)
        })
        .await
        .map_err(Self::map_db_err)?;

        Ok(rows.into_iter().map(RequestRow::into_domain).collect())
    }

    #[instrument(skip(self))]
    async fn find_last_created_by_target_type(
        &self,
        target: &str,
        request_type: RequestType,
    ) -> Result<Option<VerificationRequest>, DomainError> {
        let row: Option<RequestRow> = with_retry(self.retry_count, self.retry_delay_ms, || {
            sqlx::query_as(&format!(
                "SELECT {REQUEST_COLUMNS} FROM dns_requests \
                 WHERE target = ? AND request_type = ? \
                 ORDER BY created_at DESC LIMIT 1"
            ))
            .bind(target)
            .bind(request_type.as_str())
            .fetch_optional(&self.pool)
        })
        .await
        .map_err(Self::map_db_err)?;

        Ok(row.map(RequestRow::into_domain))
    }

    #[instrument(skip(self))]
    async fn update_check_result(
        &self,
        id: i64,
        update: CheckResultUpdate,
    ) -> Result<u64, DomainError> {
        let result = with_retry(self.retry_count, self.retry_delay_ms, || {
            sqlx::query(
                "UPDATE dns_requests \
                 SET updated_at = ?, last_checked_at = ?, next_check_at = ?, \
                     last_check_result_json = ?, fail_reason = NULL \
                 WHERE id = ? AND status = 'PENDING'",
            )
            .bind(update.now)
            .bind(update.now)
            .bind(update.next_check_at)
            .bind(&update.result_json)
            .bind(id)
            .execute(&self.pool)
        })
        .await
        .map_err(Self::map_db_err)?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn record_fail_reason(
        &self,
        id: i64,
        now: DateTime<Utc>,
        next_check_at: DateTime<Utc>,
        fail_reason: &str,
    ) -> Result<u64, DomainError> {
        let result = with_retry(self.retry_count, self.retry_delay_ms, || {
            sqlx::query(
                "UPDATE dns_requests \
                 SET updated_at = ?, last_checked_at = ?, next_check_at = ?, fail_reason = ? \
                 WHERE id = ? AND status = 'PENDING'",
            )
            .bind(now)
            .bind(now)
            .bind(next_check_at)
            .bind(fail_reason)
            .bind(id)
            .execute(&self.pool)
        })
        .await
        .map_err(Self::map_db_err)?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn conditional_transition(
        &self,
        id: i64,
        transition: TerminalTransition,
    ) -> Result<u64, DomainError> {
        let now = Utc::now();
        let result = with_retry(self.retry_count, self.retry_delay_ms, || match &transition {
            TerminalTransition::ToActive { activated_at } => {
                let pool = &self.pool;
                sqlx::query(
                    "UPDATE dns_requests SET status = 'ACTIVE', activated_at = ?, updated_at = ? \
                     WHERE id = ? AND status = 'PENDING'",
                )
                .bind(*activated_at)
                .bind(now)
                .bind(id)
                .execute(pool)
            }
            TerminalTransition::ToExpired { fail_reason } => {
                let pool = &self.pool;
                sqlx::query(
                    "UPDATE dns_requests SET status = 'EXPIRED', fail_reason = ?, updated_at = ? \
                     WHERE id = ? AND status = 'PENDING'",
                )
                .bind(fail_reason.clone())
                .bind(now)
                .bind(id)
                .execute(pool)
            }
        })
        .await
        .map_err(Self::map_db_err)?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn mark_domain_active(&self, target: &str) -> Result<(), DomainError> {
        with_retry(self.retry_count, self.retry_delay_ms, || {
            sqlx::query("INSERT OR IGNORE INTO domain (name, active, created_at) VALUES (?, 1, ?)")
                .bind(target)
                .bind(Utc::now())
                .execute(&self.pool)
        })
        .await
        .map_err(Self::map_db_err)?;

        Ok(())
    }
}
