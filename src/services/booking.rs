//! Workspace booking flows
use crate::config::{BookingConfig, PricingConfig};
use crate::core::availability::{self, SlotAvailability, TimeRange};
use crate::core::credits::{self, Deduction};
use crate::core::pricing::{self, Quote};
use crate::core::repository::{BookingFilter, NewBooking, Page, Repositories};
use crate::core::types::*;
use crate::core::{DomainError, DomainResult};
use crate::email::templates;
use crate::notify::{ADMIN_CHANNEL, user_channel};
use crate::payments::{PaymentIntent, PaymentTarget};
use crate::services::{Actor, Integrations, audit, local_now, send_email};
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub workspace_id: WorkspaceId,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default)]
    pub use_credits: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingQuote {
    pub workspace_id: WorkspaceId,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub duration_minutes: i64,
    pub credits_available: i32,
    pub available: bool,
    #[serde(flatten)]
    pub quote: Quote,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingCreated {
    pub booking: Booking,
    /// Present when the client still has to confirm a card payment
    pub payment: Option<PaymentIntent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayAvailability {
    pub workspace_id: WorkspaceId,
    pub date: NaiveDate,
    pub slots: Vec<SlotAvailability>,
}

/// Priced and checked request, ready to insert
struct Prepared {
    workspace: Workspace,
    range: TimeRange,
    quote: Quote,
    deductions: Vec<Deduction>,
    credits_available: i32,
    available: bool,
}

pub struct BookingService {
    repos: Repositories,
    integrations: Integrations,
    pricing: PricingConfig,
    config: BookingConfig,
}

impl BookingService {
    pub fn new(
        repos: Repositories,
        integrations: Integrations,
        pricing: PricingConfig,
        config: BookingConfig,
    ) -> Self {
        Self { repos, integrations, pricing, config }
    }

    async fn workspace(&self, id: WorkspaceId) -> DomainResult<Workspace> {
        self.repos
            .workspaces
            .get(id)
            .await?
            .filter(|w| w.is_active)
            .ok_or_else(|| DomainError::NotFound(format!("workspace {id}")))
    }

    pub async fn workspaces(&self) -> DomainResult<Vec<Workspace>> {
        Ok(self.repos.workspaces.list(true).await?)
    }

    /// Public lookup; inactive spaces read as missing
    pub async fn get_workspace(&self, id: WorkspaceId) -> DomainResult<Workspace> {
        self.workspace(id).await
    }

    async fn taken_ranges(&self, id: WorkspaceId, date: NaiveDate) -> DomainResult<Vec<TimeRange>> {
        let bookings = self.repos.bookings.blocking_on(id, date).await?;
        Ok(bookings.iter().map(|b| TimeRange::new(b.start_time, b.end_time)).collect())
    }

    async fn prepare(&self, user: &User, request: &BookingRequest) -> DomainResult<Prepared> {
        let range = TimeRange::new(request.start_time, request.end_time);
        availability::validate_request(request.date, &range, local_now(&self.config), &self.config)?;

        let workspace = self.workspace(request.workspace_id).await?;
        let taken = self.taken_ranges(workspace.id, request.date).await?;
        let available = availability::is_available(workspace.kind, workspace.capacity, &taken, &range);

        let grants = self
            .repos
            .credits
            .active_for(user.id, workspace.kind.credit_kind(), request.date)
            .await?;
        let credits_available = credits::balance(&grants, request.date);
        let deductions = if request.use_credits {
            let hours = credits::hours_for(range.minutes());
            if hours == 0 {
                return Err(DomainError::Validation(
                    "credits only cover whole hours of a booking".into(),
                ));
            }
            credits::plan_deduction(&grants, hours, request.date)?
        } else {
            Vec::new()
        };
        let credits_used = deductions.iter().map(|d| d.hours).sum();

        let quote = pricing::quote_workspace(
            workspace.hourly_rate_cents,
            workspace.daily_rate_cents,
            range.minutes(),
            credits_used,
            user.is_nft_holder,
            &self.pricing,
        );

        Ok(Prepared { workspace, range, quote, deductions, credits_available, available })
    }

    /// Price a prospective booking without reserving anything
    pub async fn quote(&self, user: &User, request: BookingRequest) -> DomainResult<BookingQuote> {
        let prepared = self.prepare(user, &request).await?;
        Ok(BookingQuote {
            workspace_id: prepared.workspace.id,
            date: request.date,
            start_time: request.start_time,
            end_time: request.end_time,
            duration_minutes: prepared.range.minutes(),
            credits_available: prepared.credits_available,
            available: prepared.available,
            quote: prepared.quote,
        })
    }

    /// Remaining capacity per slot for one day
    pub async fn availability(&self, id: WorkspaceId, date: NaiveDate) -> DomainResult<DayAvailability> {
        let workspace = self.workspace(id).await?;
        let taken = self.taken_ranges(id, date).await?;
        let slots = availability::free_slots(workspace.kind, workspace.capacity, &taken, &self.config);
        Ok(DayAvailability { workspace_id: id, date, slots })
    }

    pub async fn create(
        &self,
        user: &User,
        request: BookingRequest,
        actor: &Actor,
    ) -> DomainResult<BookingCreated> {
        let prepared = self.prepare(user, &request).await?;
        if !prepared.available {
            return Err(DomainError::Conflict("the requested slot is not available".into()));
        }

        let Prepared { workspace, range, quote, deductions, .. } = prepared;
        let free = quote.total_cents == 0;
        let new_booking = NewBooking {
            user_id: user.id,
            workspace_id: workspace.id,
            booking_date: request.date,
            start_time: range.start,
            end_time: range.end,
            base_price_cents: quote.base_cents,
            discount_cents: quote.discount_cents,
            fee_cents: quote.fee_cents,
            total_cents: quote.total_cents,
            credits_used: quote.credits_used,
            status: if free { BookingStatus::Confirmed } else { BookingStatus::Pending },
            payment_status: if free { PaymentStatus::NotRequired } else { PaymentStatus::Unpaid },
        };

        let mut booking = self
            .repos
            .bookings
            .create_checked(new_booking, workspace.kind.concurrency(workspace.capacity), &deductions)
            .await?;

        let mut payment = None;
        if !free {
            if let Some(gateway) = &self.integrations.payments {
                let intent = gateway
                    .create_intent(
                        booking.total_cents,
                        self.pricing.currency,
                        PaymentTarget::Booking(booking.id),
                        Some(user.email.clone()),
                    )
                    .await;
                match intent {
                    Ok(intent) => {
                        booking = self
                            .repos
                            .bookings
                            .set_payment(booking.id, PaymentStatus::Unpaid, Some(intent.id.clone()))
                            .await?;
                        payment = Some(intent);
                    },
                    Err(e) => {
                        warn!(booking_id = %booking.id, "Payment intent failed, releasing slot: {}", e);
                        if let Err(release) =
                            self.repos.bookings.cancel(booking.id, BookingStatus::Pending).await
                        {
                            warn!(booking_id = %booking.id, "Failed to release booking: {}", release);
                        }
                        return Err(e.into());
                    },
                }
            } else {
                debug!(booking_id = %booking.id, "No payment gateway, booking awaits manual confirmation");
            }
        }

        info!(
            booking_id = %booking.id,
            workspace_id = %workspace.id,
            status = %booking.status,
            total_cents = booking.total_cents,
            credits_used = booking.credits_used,
            "Booking created"
        );
        crate::metrics::incr("bookings.created");

        let payload = json!({ "booking": &booking, "workspace": workspace.name });
        self.integrations.notifier.publish(ADMIN_CHANNEL, "booking.created", payload).await;
        if booking.status == BookingStatus::Confirmed {
            self.announce_confirmed(user, &workspace, &booking).await;
        }
        audit(
            self.repos.audit.as_ref(),
            actor,
            "booking.create",
            "booking",
            Some(booking.id.to_string()),
            json!({ "total_cents": booking.total_cents, "credits_used": booking.credits_used }),
        )
        .await;

        Ok(BookingCreated { booking, payment })
    }

    async fn announce_confirmed(&self, user: &User, workspace: &Workspace, booking: &Booking) {
        self.integrations
            .notifier
            .publish(&user_channel(user.id), "booking.confirmed", json!({ "booking": booking }))
            .await;
        send_email(
            self.integrations.email.as_ref(),
            templates::booking_confirmation(user, workspace, booking, self.pricing.currency),
        )
        .await;
    }

    /// Booking visible to `user`: their own, or any for admins
    pub async fn get_for(&self, user: &User, id: BookingId) -> DomainResult<Booking> {
        let booking = self
            .repos
            .bookings
            .get(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("booking {id}")))?;
        if booking.user_id != user.id && !user.is_admin() {
            // Same answer as a missing booking so ids cannot be probed
            return Err(DomainError::NotFound(format!("booking {id}")));
        }
        Ok(booking)
    }

    pub async fn list_for_user(&self, user: &User, page: Page) -> DomainResult<Vec<Booking>> {
        Ok(self.repos.bookings.list_for_user(user.id, page.clamped()).await?)
    }

    pub async fn list(&self, filter: BookingFilter, page: Page) -> DomainResult<Vec<Booking>> {
        Ok(self.repos.bookings.list(filter, page.clamped()).await?)
    }

    /// Cancel as the owner or an admin; credits and card payments are refunded
    pub async fn cancel(&self, user: &User, id: BookingId, actor: &Actor) -> DomainResult<Booking> {
        let booking = self.get_for(user, id).await?;
        if !booking.status.can_transition_to(BookingStatus::Cancelled) {
            return Err(DomainError::InvalidTransition {
                from: booking.status.to_string(),
                to: BookingStatus::Cancelled.to_string(),
            });
        }
        self.cancel_booking(booking, actor, "booking.cancel").await
    }

    async fn cancel_booking(&self, booking: Booking, actor: &Actor, action: &str) -> DomainResult<Booking> {
        let mut cancelled = self.repos.bookings.cancel(booking.id, booking.status).await?;

        if cancelled.payment_status == PaymentStatus::Paid {
            // The cancellation is committed; a failed refund is left for an admin
            cancelled = match self.refund(cancelled.clone()).await {
                Ok(refunded) => refunded,
                Err(e) => {
                    error!(booking_id = %cancelled.id, "Refund failed for cancelled booking: {}", e);
                    crate::metrics::incr("bookings.refund_failed");
                    cancelled
                },
            };
        }

        info!(booking_id = %cancelled.id, credits_returned = cancelled.credits_used, "Booking cancelled");
        crate::metrics::incr("bookings.cancelled");

        let payload = json!({ "booking": &cancelled });
        self.integrations
            .notifier
            .publish(&user_channel(cancelled.user_id), "booking.cancelled", payload.clone())
            .await;
        self.integrations.notifier.publish(ADMIN_CHANNEL, "booking.cancelled", payload).await;

        if let (Some(owner), Some(workspace)) = (
            self.repos.users.get(cancelled.user_id).await?,
            self.repos.workspaces.get(cancelled.workspace_id).await?,
        ) {
            send_email(
                self.integrations.email.as_ref(),
                templates::booking_cancellation(&owner, &workspace, &cancelled, self.pricing.currency),
            )
            .await;
        }

        audit(
            self.repos.audit.as_ref(),
            actor,
            action,
            "booking",
            Some(cancelled.id.to_string()),
            json!({ "previous_status": booking.status }),
        )
        .await;
        Ok(cancelled)
    }

    async fn refund(&self, booking: Booking) -> DomainResult<Booking> {
        let Some(gateway) = &self.integrations.payments else {
            warn!(booking_id = %booking.id, "No payment gateway to refund through");
            return Ok(booking);
        };
        let Some(intent_id) = booking.payment_intent_id.clone() else {
            warn!(booking_id = %booking.id, "Paid booking has no payment intent to refund");
            return Ok(booking);
        };
        gateway.refund(&intent_id).await?;
        Ok(self.repos.bookings.set_payment(booking.id, PaymentStatus::Refunded, None).await?)
    }

    /// Admin status change following the booking transition table
    pub async fn update_status(
        &self,
        id: BookingId,
        next: BookingStatus,
        actor: &Actor,
    ) -> DomainResult<Booking> {
        let booking = self
            .repos
            .bookings
            .get(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("booking {id}")))?;
        if !booking.status.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                from: booking.status.to_string(),
                to: next.to_string(),
            });
        }
        if next == BookingStatus::Cancelled {
            return self.cancel_booking(booking, actor, "booking.admin_cancel").await;
        }

        let updated = self.repos.bookings.update_status(id, booking.status, next).await?;
        if next == BookingStatus::Confirmed {
            if let (Some(owner), Some(workspace)) = (
                self.repos.users.get(updated.user_id).await?,
                self.repos.workspaces.get(updated.workspace_id).await?,
            ) {
                self.announce_confirmed(&owner, &workspace, &updated).await;
            }
        }
        audit(
            self.repos.audit.as_ref(),
            actor,
            "booking.status",
            "booking",
            Some(id.to_string()),
            json!({ "from": booking.status, "to": next }),
        )
        .await;
        Ok(updated)
    }

    /// Settle a booking after the gateway reports success; replays are no-ops
    pub async fn mark_paid(&self, id: BookingId, intent_id: &str) -> DomainResult<Booking> {
        let booking = self
            .repos
            .bookings
            .get(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("booking {id}")))?;
        match (booking.payment_status, booking.status) {
            (PaymentStatus::Refunded, _) => {
                debug!(booking_id = %id, "Payment already refunded");
                return Ok(booking);
            },
            // A cancelled booking still holding money retries its refund
            (PaymentStatus::Paid, status) if status != BookingStatus::Cancelled => {
                debug!(booking_id = %id, "Payment already recorded");
                return Ok(booking);
            },
            _ => {},
        }

        let mut booking = if booking.payment_status == PaymentStatus::Paid {
            booking
        } else {
            self.repos
                .bookings
                .set_payment(id, PaymentStatus::Paid, Some(intent_id.to_string()))
                .await?
        };

        match booking.status {
            BookingStatus::Pending => {
                booking = self
                    .repos
                    .bookings
                    .update_status(id, BookingStatus::Pending, BookingStatus::Confirmed)
                    .await?;
                if let (Some(owner), Some(workspace)) = (
                    self.repos.users.get(booking.user_id).await?,
                    self.repos.workspaces.get(booking.workspace_id).await?,
                ) {
                    self.announce_confirmed(&owner, &workspace, &booking).await;
                }
            },
            BookingStatus::Cancelled => {
                // Paid after the hold expired: give the money back
                warn!(booking_id = %id, "Payment arrived for a cancelled booking, refunding");
                booking = self.refund(booking).await?;
            },
            _ => {},
        }

        info!(booking_id = %id, intent_id, "Booking paid");
        crate::metrics::incr("bookings.paid");
        Ok(booking)
    }

    /// Cancel unpaid holds older than the configured expiry
    pub async fn expire_stale(&self) -> DomainResult<usize> {
        let cutoff = Utc::now() - Duration::minutes(self.config.pending_expiry_minutes);
        let stale = self.repos.bookings.stale_pending(cutoff).await?;
        let mut expired = 0;
        for booking in stale {
            let id = booking.id;
            match self.cancel_booking(booking, &Actor::default(), "booking.expire").await {
                Ok(_) => expired += 1,
                // Paid or cancelled concurrently
                Err(DomainError::Conflict(_)) => debug!(booking_id = %id, "Skipped expiring booking"),
                Err(e) => warn!(booking_id = %id, "Failed to expire booking: {}", e),
            }
        }
        if expired > 0 {
            info!(expired, "Expired unpaid bookings");
            crate::metrics::count("bookings.expired", expired as u64);
        }
        Ok(expired)
    }

    /// Mark confirmed bookings that have ended as completed
    pub async fn complete_finished(&self) -> DomainResult<u64> {
        let now = local_now(&self.config);
        let completed = self.repos.bookings.complete_finished(now.date(), now.time()).await?;
        if completed > 0 {
            info!(completed, "Completed finished bookings");
        }
        Ok(completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::MemoryStore;
    use crate::core::repository::{BookingRepository, CreditRepository, NewCredit};
    use crate::payments::{MockPaymentGateway, PaymentError};
    use crate::services::testing::{member, quiet_integrations};
    use std::sync::Arc;

    fn tomorrow() -> NaiveDate {
        Utc::now().date_naive() + Duration::days(1)
    }

    fn t(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    fn request(workspace: &Workspace, start: u32, end: u32) -> BookingRequest {
        BookingRequest {
            workspace_id: workspace.id,
            date: tomorrow(),
            start_time: t(start),
            end_time: t(end),
            use_credits: false,
        }
    }

    fn service(store: &Arc<MemoryStore>, integrations: Integrations) -> BookingService {
        BookingService::new(
            store.repositories(),
            integrations,
            PricingConfig::default(),
            BookingConfig::default(),
        )
    }

    async fn grant(store: &Arc<MemoryStore>, user: &User, kind: CreditKind, hours: i32) {
        store
            .grant(
                NewCredit {
                    user_id: user.id,
                    kind,
                    hours,
                    valid_from: Utc::now().date_naive() - Duration::days(1),
                    valid_until: Utc::now().date_naive() + Duration::days(30),
                },
                "test",
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_quote_applies_holder_discount_and_fee() {
        let store = Arc::new(MemoryStore::default());
        let room = store.insert_workspace(WorkspaceKind::MeetingRoom, 6, 5_000);
        let mut user = member(&store, "holder@example.com").await;
        user.is_nft_holder = true;

        let quote = service(&store, quiet_integrations()).quote(&user, request(&room, 9, 11)).await.unwrap();
        assert_eq!(quote.quote.base_cents, 10_000);
        assert_eq!(quote.quote.discount_cents, 5_000);
        // 2.9% of 5000 = 145, plus 30
        assert_eq!(quote.quote.fee_cents, 175);
        assert_eq!(quote.quote.total_cents, 5_175);
        assert!(quote.available);
    }

    #[tokio::test]
    async fn test_overlapping_room_booking_conflicts() {
        let store = Arc::new(MemoryStore::default());
        let room = store.insert_workspace(WorkspaceKind::MeetingRoom, 6, 2_000);
        let user = member(&store, "a@example.com").await;
        let bookings = service(&store, quiet_integrations());

        let first = bookings.create(&user, request(&room, 9, 11), &Actor::default()).await.unwrap();
        assert_eq!(first.booking.status, BookingStatus::Pending);
        assert!(first.payment.is_none());

        let err = bookings.create(&user, request(&room, 10, 12), &Actor::default()).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        // Adjacent slot is fine
        bookings.create(&user, request(&room, 11, 12), &Actor::default()).await.unwrap();
    }

    #[tokio::test]
    async fn test_credits_cover_booking_and_return_on_cancel() {
        let store = Arc::new(MemoryStore::default());
        let room = store.insert_workspace(WorkspaceKind::MeetingRoom, 4, 3_000);
        let user = member(&store, "credits@example.com").await;
        grant(&store, &user, CreditKind::MeetingRoomHours, 5).await;
        let bookings = service(&store, quiet_integrations());

        let mut req = request(&room, 9, 11);
        req.use_credits = true;
        let created = bookings.create(&user, req, &Actor::default()).await.unwrap();
        assert_eq!(created.booking.credits_used, 2);
        assert_eq!(created.booking.total_cents, 0);
        assert_eq!(created.booking.status, BookingStatus::Confirmed);
        assert_eq!(created.booking.payment_status, PaymentStatus::NotRequired);
        assert_eq!(store.credits.lock()[0].remaining_hours, 3);

        let cancelled = bookings.cancel(&user, created.booking.id, &Actor::default()).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(store.credits.lock()[0].remaining_hours, 5);
    }

    #[tokio::test]
    async fn test_insufficient_credits_rejected() {
        let store = Arc::new(MemoryStore::default());
        let desk = store.insert_workspace(WorkspaceKind::HotDesk, 10, 800);
        let user = member(&store, "short@example.com").await;
        grant(&store, &user, CreditKind::DeskHours, 1).await;

        let mut req = request(&desk, 9, 12);
        req.use_credits = true;
        let err = service(&store, quiet_integrations())
            .create(&user, req, &Actor::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InsufficientCredits { requested: 3, available: 1 }));
        assert!(store.bookings.lock().is_empty());
        assert_eq!(store.credits.lock()[0].remaining_hours, 1);
    }

    #[tokio::test]
    async fn test_payment_intent_attached() {
        let store = Arc::new(MemoryStore::default());
        let desk = store.insert_workspace(WorkspaceKind::HotDesk, 10, 1_000);
        let user = member(&store, "card@example.com").await;

        let mut gateway = MockPaymentGateway::new();
        gateway.expect_create_intent().times(1).returning(|amount, currency, target, _| {
            Ok(PaymentIntent {
                id: format!("pi_{}", target.id()),
                client_secret: Some("secret".into()),
                amount_cents: amount,
                currency: currency.as_str().to_string(),
            })
        });
        let mut integrations = quiet_integrations();
        integrations.payments = Some(Arc::new(gateway));

        let created = service(&store, integrations)
            .create(&user, request(&desk, 9, 10), &Actor::default())
            .await
            .unwrap();
        let intent = created.payment.unwrap();
        assert_eq!(intent.amount_cents, created.booking.total_cents);
        assert_eq!(created.booking.payment_intent_id, Some(intent.id));
    }

    #[tokio::test]
    async fn test_failed_intent_releases_slot() {
        let store = Arc::new(MemoryStore::default());
        let room = store.insert_workspace(WorkspaceKind::MeetingRoom, 4, 1_000);
        let user = member(&store, "declined@example.com").await;

        let mut gateway = MockPaymentGateway::new();
        gateway.expect_create_intent().returning(|_, _, _, _| {
            Err(PaymentError::Api { status: 500, message: "down".into() })
        });
        let mut integrations = quiet_integrations();
        integrations.payments = Some(Arc::new(gateway));
        let bookings = service(&store, integrations);

        let err = bookings.create(&user, request(&room, 9, 10), &Actor::default()).await.unwrap_err();
        assert!(matches!(err, DomainError::Upstream(_)));
        assert_eq!(store.bookings.lock()[0].status, BookingStatus::Cancelled);
        let blocking = BookingRepository::blocking_on(store.as_ref(), room.id, tomorrow()).await.unwrap();
        assert!(blocking.is_empty());
    }

    #[tokio::test]
    async fn test_mark_paid_confirms_and_is_idempotent() {
        let store = Arc::new(MemoryStore::default());
        let room = store.insert_workspace(WorkspaceKind::MeetingRoom, 4, 1_000);
        let user = member(&store, "payer@example.com").await;
        let bookings = service(&store, quiet_integrations());

        let created = bookings.create(&user, request(&room, 14, 15), &Actor::default()).await.unwrap();
        let paid = bookings.mark_paid(created.booking.id, "pi_1").await.unwrap();
        assert_eq!(paid.status, BookingStatus::Confirmed);
        assert_eq!(paid.payment_status, PaymentStatus::Paid);

        let again = bookings.mark_paid(created.booking.id, "pi_1").await.unwrap();
        assert_eq!(again.status, BookingStatus::Confirmed);
    }

    fn card_gateway() -> MockPaymentGateway {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_create_intent().returning(|amount, currency, target, _| {
            Ok(PaymentIntent {
                id: format!("pi_{}", target.id()),
                client_secret: None,
                amount_cents: amount,
                currency: currency.as_str().to_string(),
            })
        });
        gateway
    }

    #[tokio::test]
    async fn test_late_payment_refund_retried_after_gateway_error() {
        let store = Arc::new(MemoryStore::default());
        let room = store.insert_workspace(WorkspaceKind::MeetingRoom, 4, 1_000);
        let user = member(&store, "late-payer@example.com").await;

        let mut gateway = card_gateway();
        let mut attempts = 0;
        gateway.expect_refund().times(2).returning(move |_| {
            attempts += 1;
            if attempts == 1 {
                Err(PaymentError::Api { status: 500, message: "down".into() })
            } else {
                Ok(())
            }
        });
        let mut integrations = quiet_integrations();
        integrations.payments = Some(Arc::new(gateway));
        let bookings = service(&store, integrations);

        let created = bookings.create(&user, request(&room, 9, 10), &Actor::default()).await.unwrap();
        let id = created.booking.id;
        bookings.cancel(&user, id, &Actor::default()).await.unwrap();

        // First delivery fails to refund so the gateway redelivers
        let err = bookings.mark_paid(id, "pi_late").await.unwrap_err();
        assert!(matches!(err, DomainError::Upstream(_)));
        assert_eq!(store.bookings.lock()[0].payment_status, PaymentStatus::Paid);

        let refunded = bookings.mark_paid(id, "pi_late").await.unwrap();
        assert_eq!(refunded.status, BookingStatus::Cancelled);
        assert_eq!(refunded.payment_status, PaymentStatus::Refunded);

        // Later replays leave the refund alone
        let replay = bookings.mark_paid(id, "pi_late").await.unwrap();
        assert_eq!(replay.payment_status, PaymentStatus::Refunded);
    }

    #[tokio::test]
    async fn test_cancel_completes_when_refund_fails() {
        let store = Arc::new(MemoryStore::default());
        let room = store.insert_workspace(WorkspaceKind::MeetingRoom, 4, 1_000);
        let user = member(&store, "paid@example.com").await;

        let mut gateway = card_gateway();
        gateway
            .expect_refund()
            .times(1)
            .returning(|_| Err(PaymentError::Api { status: 500, message: "down".into() }));
        let mut integrations = quiet_integrations();
        integrations.payments = Some(Arc::new(gateway));
        let bookings = service(&store, integrations);

        let created = bookings.create(&user, request(&room, 9, 10), &Actor::default()).await.unwrap();
        let intent = created.payment.unwrap();
        bookings.mark_paid(created.booking.id, &intent.id).await.unwrap();

        let cancelled = bookings.cancel(&user, created.booking.id, &Actor::default()).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(cancelled.payment_status, PaymentStatus::Paid);
        assert!(store.audit.lock().iter().any(|entry| entry.action == "booking.cancel"));
    }

    #[tokio::test]
    async fn test_other_members_cannot_see_or_cancel() {
        let store = Arc::new(MemoryStore::default());
        let room = store.insert_workspace(WorkspaceKind::MeetingRoom, 4, 1_000);
        let owner = member(&store, "owner@example.com").await;
        let other = member(&store, "other@example.com").await;
        let bookings = service(&store, quiet_integrations());

        let created = bookings.create(&owner, request(&room, 9, 10), &Actor::default()).await.unwrap();
        let err = bookings.cancel(&other, created.booking.id, &Actor::default()).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_admin_transition_rules() {
        let store = Arc::new(MemoryStore::default());
        let room = store.insert_workspace(WorkspaceKind::MeetingRoom, 4, 1_000);
        let user = member(&store, "flow@example.com").await;
        let bookings = service(&store, quiet_integrations());
        let created = bookings.create(&user, request(&room, 9, 10), &Actor::default()).await.unwrap();
        let id = created.booking.id;

        let err = bookings.update_status(id, BookingStatus::Completed, &Actor::default()).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));

        let confirmed = bookings.update_status(id, BookingStatus::Confirmed, &Actor::default()).await.unwrap();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);
        let completed = bookings.update_status(id, BookingStatus::Completed, &Actor::default()).await.unwrap();
        assert_eq!(completed.status, BookingStatus::Completed);
    }

    #[tokio::test]
    async fn test_expire_stale_cancels_old_holds() {
        let store = Arc::new(MemoryStore::default());
        let room = store.insert_workspace(WorkspaceKind::MeetingRoom, 4, 1_000);
        let user = member(&store, "slow@example.com").await;
        let bookings = service(&store, quiet_integrations());
        let created = bookings.create(&user, request(&room, 9, 10), &Actor::default()).await.unwrap();

        assert_eq!(bookings.expire_stale().await.unwrap(), 0);
        store.bookings.lock()[0].created_at = Utc::now() - Duration::hours(2);
        assert_eq!(bookings.expire_stale().await.unwrap(), 1);
        let booking = bookings.get_for(&user, created.booking.id).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_past_slot_rejected() {
        let store = Arc::new(MemoryStore::default());
        let room = store.insert_workspace(WorkspaceKind::MeetingRoom, 4, 1_000);
        let user = member(&store, "late@example.com").await;
        let mut req = request(&room, 9, 10);
        req.date = Utc::now().date_naive() - Duration::days(1);

        let err = service(&store, quiet_integrations()).quote(&user, req).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
