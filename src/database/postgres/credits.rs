//! PostgreSQL membership credit repository
use crate::core::repository::{CreditRepository, NewCredit, Page, Result};
use crate::core::types::{CreditKind, CreditTransaction, CreditTransactionKind, MembershipCredit, UserId};
use crate::database::client::Database;
use crate::database::models::{CreditRow, CreditTransactionRow, convert_all};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use uuid::Uuid;

const CREDIT_COLUMNS: &str =
    "id, user_id, kind, total_hours, remaining_hours, valid_from, valid_until, created_at";

pub struct PostgresCreditRepository {
    db: Arc<Database>,
}

impl PostgresCreditRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CreditRepository for PostgresCreditRepository {
    async fn active_for(
        &self,
        user_id: UserId,
        kind: CreditKind,
        on: NaiveDate,
    ) -> Result<Vec<MembershipCredit>> {
        let sql = format!(
            "SELECT {CREDIT_COLUMNS} FROM membership_credits
             WHERE user_id = $1 AND kind = $2 AND remaining_hours > 0
               AND valid_from <= $3 AND valid_until >= $3
             ORDER BY valid_until, created_at"
        );
        let rows: Vec<CreditRow> = sqlx::query_as(&sql)
            .bind(user_id.value())
            .bind(kind.as_str())
            .bind(on)
            .fetch_all(&self.db.pool)
            .await?;
        convert_all(rows)
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<MembershipCredit>> {
        let sql = format!(
            "SELECT {CREDIT_COLUMNS} FROM membership_credits WHERE user_id = $1
             ORDER BY valid_until DESC, created_at DESC"
        );
        let rows: Vec<CreditRow> =
            sqlx::query_as(&sql).bind(user_id.value()).fetch_all(&self.db.pool).await?;
        convert_all(rows)
    }

    async fn grant(&self, credit: NewCredit, description: &str) -> Result<MembershipCredit> {
        let mut tx = self.db.pool.begin().await?;

        let sql = format!(
            "INSERT INTO membership_credits
                 (id, user_id, kind, total_hours, remaining_hours, valid_from, valid_until)
             VALUES ($1, $2, $3, $4, $4, $5, $6)
             RETURNING {CREDIT_COLUMNS}"
        );
        let row: CreditRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(credit.user_id.value())
            .bind(credit.kind.as_str())
            .bind(credit.hours)
            .bind(credit.valid_from)
            .bind(credit.valid_until)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO credit_transactions (id, credit_id, user_id, amount_hours, kind, description)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::new_v4())
        .bind(row.id)
        .bind(credit.user_id.value())
        .bind(credit.hours)
        .bind(CreditTransactionKind::Allocation.as_str())
        .bind(description)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        row.try_into()
    }

    async fn transactions_for_user(
        &self,
        user_id: UserId,
        page: Page,
    ) -> Result<Vec<CreditTransaction>> {
        let rows: Vec<CreditTransactionRow> = sqlx::query_as(
            "SELECT id, credit_id, user_id, booking_id, amount_hours, kind, description, created_at
             FROM credit_transactions WHERE user_id = $1
             ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id.value())
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.db.pool)
        .await?;
        convert_all(rows)
    }
}
