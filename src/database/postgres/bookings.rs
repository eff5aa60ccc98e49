//! PostgreSQL booking repository
//!
//! Creation and cancellation touch the credit tables in the same
//! transaction so a booking never exists without its ledger rows.
use crate::core::credits::Deduction;
use crate::core::repository::{BookingFilter, BookingRepository, NewBooking, Page, Result, RepositoryError};
use crate::core::types::{Booking, BookingId, BookingStatus, Cents, CreditTransactionKind, PaymentStatus, UserId, WorkspaceId};
use crate::database::client::Database;
use crate::database::models::{BookingRow, convert_all};
use crate::database::postgres::not_found;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

const BOOKING_COLUMNS: &str = "id, user_id, workspace_id, booking_date, start_time, end_time, \
     base_price_cents, discount_cents, fee_cents, total_cents, credits_used, status, \
     payment_status, payment_intent_id, created_at, updated_at";

pub struct PostgresBookingRepository {
    db: Arc<Database>,
}

impl PostgresBookingRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BookingRepository for PostgresBookingRepository {
    async fn create_checked(
        &self,
        booking: NewBooking,
        concurrency: usize,
        deductions: &[Deduction],
    ) -> Result<Booking> {
        let mut tx = self.db.pool.begin().await?;

        // Serialize writers per workspace
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM workspaces WHERE id = $1 AND is_active FOR UPDATE")
                .bind(booking.workspace_id.value())
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(not_found("workspace", booking.workspace_id));
        }

        let overlapping: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM bookings
             WHERE workspace_id = $1 AND booking_date = $2
               AND status IN ('pending', 'confirmed')
               AND start_time < $4 AND end_time > $3",
        )
        .bind(booking.workspace_id.value())
        .bind(booking.booking_date)
        .bind(booking.start_time)
        .bind(booking.end_time)
        .fetch_one(&mut *tx)
        .await?;
        if overlapping as usize >= concurrency {
            return Err(RepositoryError::Conflict("time slot is no longer available".into()));
        }

        let sql = format!(
            "INSERT INTO bookings (id, user_id, workspace_id, booking_date, start_time, end_time,
                 base_price_cents, discount_cents, fee_cents, total_cents, credits_used,
                 status, payment_status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             RETURNING {BOOKING_COLUMNS}"
        );
        let row: BookingRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(booking.user_id.value())
            .bind(booking.workspace_id.value())
            .bind(booking.booking_date)
            .bind(booking.start_time)
            .bind(booking.end_time)
            .bind(booking.base_price_cents)
            .bind(booking.discount_cents)
            .bind(booking.fee_cents)
            .bind(booking.total_cents)
            .bind(booking.credits_used)
            .bind(booking.status.as_str())
            .bind(booking.payment_status.as_str())
            .fetch_one(&mut *tx)
            .await?;

        for deduction in deductions {
            let updated = sqlx::query(
                "UPDATE membership_credits SET remaining_hours = remaining_hours - $1
                 WHERE id = $2 AND remaining_hours >= $1",
            )
            .bind(deduction.hours)
            .bind(deduction.credit_id.value())
            .execute(&mut *tx)
            .await?;
            if updated.rows_affected() != 1 {
                // Dropping the transaction rolls back the insert
                return Err(RepositoryError::Conflict("credit balance changed".into()));
            }

            sqlx::query(
                "INSERT INTO credit_transactions
                     (id, credit_id, user_id, booking_id, amount_hours, kind, description)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(Uuid::new_v4())
            .bind(deduction.credit_id.value())
            .bind(booking.user_id.value())
            .bind(row.id)
            .bind(-deduction.hours)
            .bind(CreditTransactionKind::Usage.as_str())
            .bind("booking")
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(booking_id = %row.id, credits = booking.credits_used, "Booking inserted");
        row.try_into()
    }

    async fn get(&self, id: BookingId) -> Result<Option<Booking>> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");
        let row: Option<BookingRow> =
            sqlx::query_as(&sql).bind(id.value()).fetch_optional(&self.db.pool).await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn list_for_user(&self, user_id: UserId, page: Page) -> Result<Vec<Booking>> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = $1
             ORDER BY booking_date DESC, start_time DESC LIMIT $2 OFFSET $3"
        );
        let rows: Vec<BookingRow> = sqlx::query_as(&sql)
            .bind(user_id.value())
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.db.pool)
            .await?;
        convert_all(rows)
    }

    async fn list(&self, filter: BookingFilter, page: Page) -> Result<Vec<Booking>> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE ($1::TEXT IS NULL OR status = $1)
               AND ($2::DATE IS NULL OR booking_date = $2)
               AND ($3::UUID IS NULL OR workspace_id = $3)
             ORDER BY booking_date DESC, start_time DESC LIMIT $4 OFFSET $5"
        );
        let rows: Vec<BookingRow> = sqlx::query_as(&sql)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.date)
            .bind(filter.workspace_id.map(|w| w.value()))
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.db.pool)
            .await?;
        convert_all(rows)
    }

    async fn blocking_on(&self, workspace_id: WorkspaceId, date: NaiveDate) -> Result<Vec<Booking>> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE workspace_id = $1 AND booking_date = $2 AND status IN ('pending', 'confirmed')
             ORDER BY start_time"
        );
        let rows: Vec<BookingRow> = sqlx::query_as(&sql)
            .bind(workspace_id.value())
            .bind(date)
            .fetch_all(&self.db.pool)
            .await?;
        convert_all(rows)
    }

    async fn update_status(
        &self,
        id: BookingId,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> Result<Booking> {
        let sql = format!(
            "UPDATE bookings SET status = $3, updated_at = NOW()
             WHERE id = $1 AND status = $2
             RETURNING {BOOKING_COLUMNS}"
        );
        let row: Option<BookingRow> = sqlx::query_as(&sql)
            .bind(id.value())
            .bind(expected.as_str())
            .bind(next.as_str())
            .fetch_optional(&self.db.pool)
            .await?;
        match row {
            Some(row) => row.try_into(),
            None => Err(self.missing_or_moved(id).await),
        }
    }

    async fn cancel(&self, id: BookingId, expected: BookingStatus) -> Result<Booking> {
        let mut tx = self.db.pool.begin().await?;

        let sql = format!(
            "UPDATE bookings SET status = 'cancelled', updated_at = NOW()
             WHERE id = $1 AND status = $2
             RETURNING {BOOKING_COLUMNS}"
        );
        let row: Option<BookingRow> = sqlx::query_as(&sql)
            .bind(id.value())
            .bind(expected.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            drop(tx);
            return Err(self.missing_or_moved(id).await);
        };

        // Return each usage entry to the grant it came from
        let usages: Vec<(Uuid, i32)> = sqlx::query_as(
            "SELECT credit_id, SUM(amount_hours)::INT FROM credit_transactions
             WHERE booking_id = $1 GROUP BY credit_id",
        )
        .bind(id.value())
        .fetch_all(&mut *tx)
        .await?;

        for (credit_id, net) in usages {
            if net >= 0 {
                continue;
            }
            let hours = -net;
            sqlx::query(
                "UPDATE membership_credits
                 SET remaining_hours = LEAST(total_hours, remaining_hours + $1)
                 WHERE id = $2",
            )
            .bind(hours)
            .bind(credit_id)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO credit_transactions
                     (id, credit_id, user_id, booking_id, amount_hours, kind, description)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(Uuid::new_v4())
            .bind(credit_id)
            .bind(row.user_id)
            .bind(row.id)
            .bind(hours)
            .bind(CreditTransactionKind::Refund.as_str())
            .bind("booking cancelled")
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        row.try_into()
    }

    async fn set_payment(
        &self,
        id: BookingId,
        payment_status: PaymentStatus,
        payment_intent_id: Option<String>,
    ) -> Result<Booking> {
        let sql = format!(
            "UPDATE bookings
             SET payment_status = $2, payment_intent_id = COALESCE($3, payment_intent_id), updated_at = NOW()
             WHERE id = $1
             RETURNING {BOOKING_COLUMNS}"
        );
        let row: Option<BookingRow> = sqlx::query_as(&sql)
            .bind(id.value())
            .bind(payment_status.as_str())
            .bind(payment_intent_id)
            .fetch_optional(&self.db.pool)
            .await?;
        row.ok_or_else(|| not_found("booking", id))?.try_into()
    }

    async fn stale_pending(&self, created_before: DateTime<Utc>) -> Result<Vec<Booking>> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE status = 'pending' AND payment_status = 'unpaid' AND created_at < $1
             ORDER BY created_at"
        );
        let rows: Vec<BookingRow> =
            sqlx::query_as(&sql).bind(created_before).fetch_all(&self.db.pool).await?;
        convert_all(rows)
    }

    async fn complete_finished(&self, date: NaiveDate, time: NaiveTime) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE bookings SET status = 'completed', updated_at = NOW()
             WHERE status = 'confirmed'
               AND (booking_date < $1 OR (booking_date = $1 AND end_time <= $2))",
        )
        .bind(date)
        .bind(time)
        .execute(&self.db.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn count_on(&self, date: NaiveDate) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM bookings WHERE booking_date = $1 AND status <> 'cancelled'",
        )
        .bind(date)
        .fetch_one(&self.db.pool)
        .await?;
        Ok(count)
    }

    async fn revenue_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Cents> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(total_cents), 0)::BIGINT FROM bookings
             WHERE payment_status = 'paid' AND created_at >= $1 AND created_at < $2",
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.db.pool)
        .await?;
        Ok(total)
    }
}

impl PostgresBookingRepository {
    /// Distinguish a missing row from a lost status race
    async fn missing_or_moved(&self, id: BookingId) -> RepositoryError {
        match sqlx::query_scalar::<_, String>("SELECT status FROM bookings WHERE id = $1")
            .bind(id.value())
            .fetch_optional(&self.db.pool)
            .await
        {
            Ok(Some(status)) => {
                RepositoryError::Conflict(format!("booking {id} is already {status}"))
            },
            Ok(None) => not_found("booking", id),
            Err(e) => RepositoryError::Database(e),
        }
    }
}
