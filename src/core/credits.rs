//! Membership credit balance and deduction planning
use crate::core::error::{DomainError, DomainResult};
use crate::core::types::{CreditId, MembershipCredit};
use chrono::NaiveDate;

/// Hours to take from one credit grant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deduction {
    pub credit_id: CreditId,
    pub hours: i32,
}

fn usable(credit: &MembershipCredit, on: NaiveDate) -> bool {
    credit.remaining_hours > 0 && credit.valid_from <= on && on <= credit.valid_until
}

/// Sum of remaining hours over grants valid on `on`
pub fn balance(credits: &[MembershipCredit], on: NaiveDate) -> i32 {
    credits.iter().filter(|c| usable(c, on)).map(|c| c.remaining_hours).sum()
}

/// Split `hours` across grants, soonest-expiring first.
///
/// Fails without side effects when the usable balance is short.
pub fn plan_deduction(
    credits: &[MembershipCredit],
    hours: i32,
    on: NaiveDate,
) -> DomainResult<Vec<Deduction>> {
    if hours <= 0 {
        return Ok(Vec::new());
    }

    let available = balance(credits, on);
    if available < hours {
        return Err(DomainError::InsufficientCredits { requested: hours, available });
    }

    let mut candidates: Vec<&MembershipCredit> = credits.iter().filter(|c| usable(c, on)).collect();
    candidates.sort_by_key(|c| (c.valid_until, c.created_at));

    let mut left = hours;
    let mut plan = Vec::new();
    for credit in candidates {
        if left == 0 {
            break;
        }
        let take = credit.remaining_hours.min(left);
        plan.push(Deduction { credit_id: credit.id, hours: take });
        left -= take;
    }
    Ok(plan)
}

/// Credit hours a booking consumes: its full hours, partial hours are billed
pub fn hours_for(duration_minutes: i64) -> i32 {
    (duration_minutes / 60).clamp(0, i32::MAX as i64) as i32
}
