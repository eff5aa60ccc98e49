//! Membership credit balances and grants
use crate::auth::normalize_email;
use crate::config::BookingConfig;
use crate::core::credits;
use crate::core::repository::{NewCredit, Page, Repositories};
use crate::core::types::*;
use crate::core::{DomainError, DomainResult};
use crate::services::{Actor, audit, local_now};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

const MAX_GRANT_HOURS: i32 = 10_000;
const MAX_VALID_DAYS: i64 = 3650;

fn default_valid_days() -> i64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreditGrant {
    pub user_id: UserId,
    pub kind: CreditKind,
    pub hours: i32,
    /// Defaults to today
    #[serde(default)]
    pub valid_from: Option<NaiveDate>,
    #[serde(default = "default_valid_days")]
    pub valid_days: i64,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreditBalances {
    pub meeting_room_hours: i32,
    pub desk_hours: i32,
    pub grants: Vec<MembershipCredit>,
}

pub struct CreditService {
    repos: Repositories,
    config: BookingConfig,
}

impl CreditService {
    pub fn new(repos: Repositories, config: BookingConfig) -> Self {
        Self { repos, config }
    }

    /// Usable hours per bucket today, plus every grant for display
    pub async fn balances(&self, user: &User) -> DomainResult<CreditBalances> {
        let today = local_now(&self.config).date();
        let grants = self.repos.credits.list_for_user(user.id).await?;
        let of_kind = |kind: CreditKind| {
            let rows: Vec<MembershipCredit> = grants.iter().filter(|c| c.kind == kind).cloned().collect();
            credits::balance(&rows, today)
        };
        Ok(CreditBalances {
            meeting_room_hours: of_kind(CreditKind::MeetingRoomHours),
            desk_hours: of_kind(CreditKind::DeskHours),
            grants,
        })
    }

    pub async fn transactions(&self, user: &User, page: Page) -> DomainResult<Vec<CreditTransaction>> {
        Ok(self.repos.credits.transactions_for_user(user.id, page.clamped()).await?)
    }

    pub async fn grant(&self, grant: CreditGrant, actor: &Actor) -> DomainResult<MembershipCredit> {
        if grant.hours < 1 || grant.hours > MAX_GRANT_HOURS {
            return Err(DomainError::Validation(format!(
                "hours must be between 1 and {MAX_GRANT_HOURS}"
            )));
        }
        if grant.valid_days < 1 || grant.valid_days > MAX_VALID_DAYS {
            return Err(DomainError::Validation(format!(
                "validity must be between 1 and {MAX_VALID_DAYS} days"
            )));
        }
        let user = self
            .repos
            .users
            .get(grant.user_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("user {}", grant.user_id)))?;

        let valid_from = grant.valid_from.unwrap_or_else(|| local_now(&self.config).date());
        let valid_until = valid_from
            .checked_add_signed(Duration::days(grant.valid_days - 1))
            .ok_or_else(|| DomainError::Validation("validity runs past the supported calendar".into()))?;
        let description = grant.description.unwrap_or_else(|| "membership allocation".to_string());

        let credit = self
            .repos
            .credits
            .grant(
                NewCredit { user_id: user.id, kind: grant.kind, hours: grant.hours, valid_from, valid_until },
                &description,
            )
            .await?;

        info!(user_id = %user.id, kind = %credit.kind, hours = credit.total_hours, %valid_until, "Credits granted");
        audit(
            self.repos.audit.as_ref(),
            actor,
            "credits.grant",
            "membership_credit",
            Some(credit.id.to_string()),
            json!({ "user_id": user.id, "kind": credit.kind, "hours": credit.total_hours }),
        )
        .await;
        Ok(credit)
    }

    /// Grant by account email, as used from the command line
    pub async fn grant_by_email(
        &self,
        email: &str,
        kind: CreditKind,
        hours: i32,
        valid_days: i64,
    ) -> DomainResult<MembershipCredit> {
        let email = normalize_email(email)
            .ok_or_else(|| DomainError::Validation("invalid email address".into()))?;
        let user = self
            .repos
            .users
            .get_by_email(&email)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("user {email}")))?;
        let grant = CreditGrant {
            user_id: user.id,
            kind,
            hours,
            valid_from: None,
            valid_days,
            description: Some("granted from the command line".into()),
        };
        self.grant(grant, &Actor::default()).await
    }
}
