//! In-memory repositories backing service and router tests
use crate::core::availability::TimeRange;
use crate::core::credits::Deduction;
use crate::core::repository::*;
use crate::core::types::*;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    pub users: Mutex<Vec<User>>,
    pub workspaces: Mutex<Vec<Workspace>>,
    pub bookings: Mutex<Vec<Booking>>,
    pub menu: Mutex<Vec<MenuItem>>,
    pub orders: Mutex<Vec<Order>>,
    pub credits: Mutex<Vec<MembershipCredit>>,
    pub transactions: Mutex<Vec<CreditTransaction>>,
    pub contacts: Mutex<Vec<ContactSubmission>>,
    pub subscribers: Mutex<Vec<NewsletterSubscriber>>,
    pub audit: Mutex<Vec<AuditLog>>,
    pub posts: Mutex<Vec<BlogPost>>,
}

impl MemoryStore {
    pub fn repositories(self: &Arc<Self>) -> Repositories {
        Repositories {
            users: self.clone(),
            workspaces: self.clone(),
            bookings: self.clone(),
            menu: self.clone(),
            orders: self.clone(),
            credits: self.clone(),
            contacts: self.clone(),
            newsletter: self.clone(),
            audit: self.clone(),
            blog: self.clone(),
        }
    }

    pub fn insert_workspace(&self, kind: WorkspaceKind, capacity: i32, hourly: Cents) -> Workspace {
        let workspace = Workspace {
            id: WorkspaceId::new(),
            name: format!("{} space", kind),
            kind,
            description: String::new(),
            capacity,
            hourly_rate_cents: hourly,
            daily_rate_cents: None,
            is_active: true,
            created_at: Utc::now(),
        };
        self.workspaces.lock().push(workspace.clone());
        workspace
    }

    pub fn insert_menu_item(&self, name: &str, price_cents: Cents, available: bool) -> MenuItem {
        let item = MenuItem {
            id: MenuItemId::new(),
            name: name.to_string(),
            description: String::new(),
            category: "drinks".to_string(),
            price_cents,
            is_available: available,
        };
        self.menu.lock().push(item.clone());
        item
    }

    fn ledger(&self, credit_id: CreditId, user_id: UserId, booking_id: Option<BookingId>, amount: i32, kind: CreditTransactionKind, description: &str) {
        self.transactions.lock().push(CreditTransaction {
            id: Uuid::new_v4(),
            credit_id,
            user_id,
            booking_id,
            amount_hours: amount,
            kind,
            description: description.to_string(),
            created_at: Utc::now(),
        });
    }
}

fn page<T: Clone>(items: impl Iterator<Item = T>, page: Page) -> Vec<T> {
    items.skip(page.offset as usize).take(page.limit as usize).collect()
}

fn not_found(what: &str) -> RepositoryError {
    RepositoryError::NotFound(what.to_string())
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: NewUser) -> Result<User> {
        let mut users = self.users.lock();
        if users.iter().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict("email already registered".to_string()));
        }
        let row = User {
            id: UserId::new(),
            email: user.email,
            password_hash: user.password_hash,
            name: user.name,
            role: user.role,
            wallet_address: None,
            is_nft_holder: false,
            nft_verified_at: None,
            created_at: Utc::now(),
        };
        users.push(row.clone());
        Ok(row)
    }

    async fn get(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.users.lock().iter().find(|u| u.id == id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.users.lock().iter().find(|u| u.email == email).cloned())
    }

    async fn update_wallet(
        &self,
        id: UserId,
        wallet_address: Option<String>,
        is_nft_holder: bool,
        verified_at: DateTime<Utc>,
    ) -> Result<User> {
        let mut users = self.users.lock();
        let user = users.iter_mut().find(|u| u.id == id).ok_or_else(|| not_found("user"))?;
        user.wallet_address = wallet_address;
        user.is_nft_holder = is_nft_holder;
        user.nft_verified_at = Some(verified_at);
        Ok(user.clone())
    }

    async fn set_role(&self, id: UserId, role: Role) -> Result<User> {
        let mut users = self.users.lock();
        let user = users.iter_mut().find(|u| u.id == id).ok_or_else(|| not_found("user"))?;
        user.role = role;
        Ok(user.clone())
    }

    async fn list(&self, p: Page) -> Result<Vec<User>> {
        Ok(page(self.users.lock().iter().cloned(), p))
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.users.lock().len() as i64)
    }

    async fn stale_wallets(&self, before: DateTime<Utc>, limit: i64) -> Result<Vec<User>> {
        Ok(self
            .users
            .lock()
            .iter()
            .filter(|u| u.wallet_address.is_some() && u.nft_verified_at.is_none_or(|at| at < before))
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl WorkspaceRepository for MemoryStore {
    async fn list(&self, active_only: bool) -> Result<Vec<Workspace>> {
        Ok(self.workspaces.lock().iter().filter(|w| !active_only || w.is_active).cloned().collect())
    }

    async fn get(&self, id: WorkspaceId) -> Result<Option<Workspace>> {
        Ok(self.workspaces.lock().iter().find(|w| w.id == id).cloned())
    }

    async fn create(&self, workspace: NewWorkspace) -> Result<Workspace> {
        let row = Workspace {
            id: WorkspaceId::new(),
            name: workspace.name,
            kind: workspace.kind,
            description: workspace.description,
            capacity: workspace.capacity,
            hourly_rate_cents: workspace.hourly_rate_cents,
            daily_rate_cents: workspace.daily_rate_cents,
            is_active: true,
            created_at: Utc::now(),
        };
        self.workspaces.lock().push(row.clone());
        Ok(row)
    }

    async fn update(&self, id: WorkspaceId, update: WorkspaceUpdate) -> Result<Workspace> {
        let mut workspaces = self.workspaces.lock();
        let w = workspaces.iter_mut().find(|w| w.id == id).ok_or_else(|| not_found("workspace"))?;
        if let Some(name) = update.name {
            w.name = name;
        }
        if let Some(description) = update.description {
            w.description = description;
        }
        if let Some(capacity) = update.capacity {
            w.capacity = capacity;
        }
        if let Some(rate) = update.hourly_rate_cents {
            w.hourly_rate_cents = rate;
        }
        if update.daily_rate_cents.is_some() {
            w.daily_rate_cents = update.daily_rate_cents;
        }
        if let Some(active) = update.is_active {
            w.is_active = active;
        }
        Ok(w.clone())
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn create_checked(
        &self,
        booking: NewBooking,
        concurrency: usize,
        deductions: &[Deduction],
    ) -> Result<Booking> {
        let mut bookings = self.bookings.lock();
        let candidate = TimeRange::new(booking.start_time, booking.end_time);
        let taken = bookings
            .iter()
            .filter(|b| {
                b.workspace_id == booking.workspace_id
                    && b.booking_date == booking.booking_date
                    && b.status.is_blocking()
                    && TimeRange::new(b.start_time, b.end_time).overlaps(&candidate)
            })
            .count();
        if taken >= concurrency {
            return Err(RepositoryError::Conflict("slot is no longer available".to_string()));
        }

        {
            let mut credits = self.credits.lock();
            for d in deductions {
                let credit = credits
                    .iter()
                    .find(|c| c.id == d.credit_id)
                    .ok_or_else(|| not_found("credit"))?;
                if credit.remaining_hours < d.hours {
                    return Err(RepositoryError::Conflict("credit balance changed".to_string()));
                }
            }
            for d in deductions {
                if let Some(credit) = credits.iter_mut().find(|c| c.id == d.credit_id) {
                    credit.remaining_hours -= d.hours;
                }
            }
        }

        let now = Utc::now();
        let row = Booking {
            id: BookingId::new(),
            user_id: booking.user_id,
            workspace_id: booking.workspace_id,
            booking_date: booking.booking_date,
            start_time: booking.start_time,
            end_time: booking.end_time,
            base_price_cents: booking.base_price_cents,
            discount_cents: booking.discount_cents,
            fee_cents: booking.fee_cents,
            total_cents: booking.total_cents,
            credits_used: booking.credits_used,
            status: booking.status,
            payment_status: booking.payment_status,
            payment_intent_id: None,
            created_at: now,
            updated_at: now,
        };
        for d in deductions {
            self.ledger(d.credit_id, row.user_id, Some(row.id), -d.hours, CreditTransactionKind::Usage, "booking");
        }
        bookings.push(row.clone());
        Ok(row)
    }

    async fn get(&self, id: BookingId) -> Result<Option<Booking>> {
        Ok(self.bookings.lock().iter().find(|b| b.id == id).cloned())
    }

    async fn list_for_user(&self, user_id: UserId, p: Page) -> Result<Vec<Booking>> {
        Ok(page(self.bookings.lock().iter().filter(|b| b.user_id == user_id).cloned(), p))
    }

    async fn list(&self, filter: BookingFilter, p: Page) -> Result<Vec<Booking>> {
        Ok(page(
            self.bookings
                .lock()
                .iter()
                .filter(|b| filter.status.is_none_or(|s| b.status == s))
                .filter(|b| filter.date.is_none_or(|d| b.booking_date == d))
                .filter(|b| filter.workspace_id.is_none_or(|w| b.workspace_id == w))
                .cloned(),
            p,
        ))
    }

    async fn blocking_on(&self, workspace_id: WorkspaceId, date: NaiveDate) -> Result<Vec<Booking>> {
        Ok(self
            .bookings
            .lock()
            .iter()
            .filter(|b| b.workspace_id == workspace_id && b.booking_date == date && b.status.is_blocking())
            .cloned()
            .collect())
    }

    async fn update_status(&self, id: BookingId, expected: BookingStatus, next: BookingStatus) -> Result<Booking> {
        let mut bookings = self.bookings.lock();
        let b = bookings.iter_mut().find(|b| b.id == id).ok_or_else(|| not_found("booking"))?;
        if b.status != expected {
            return Err(RepositoryError::Conflict("booking status changed".to_string()));
        }
        b.status = next;
        b.updated_at = Utc::now();
        Ok(b.clone())
    }

    async fn cancel(&self, id: BookingId, expected: BookingStatus) -> Result<Booking> {
        let booking = BookingRepository::update_status(self, id, expected, BookingStatus::Cancelled).await?;
        let usages: Vec<CreditTransaction> = self
            .transactions
            .lock()
            .iter()
            .filter(|t| t.booking_id == Some(id) && t.kind == CreditTransactionKind::Usage)
            .cloned()
            .collect();
        for usage in usages {
            if let Some(credit) = self.credits.lock().iter_mut().find(|c| c.id == usage.credit_id) {
                credit.remaining_hours += -usage.amount_hours;
            }
            self.ledger(usage.credit_id, usage.user_id, Some(id), -usage.amount_hours, CreditTransactionKind::Refund, "booking cancelled");
        }
        Ok(booking)
    }

    async fn set_payment(&self, id: BookingId, payment_status: PaymentStatus, payment_intent_id: Option<String>) -> Result<Booking> {
        let mut bookings = self.bookings.lock();
        let b = bookings.iter_mut().find(|b| b.id == id).ok_or_else(|| not_found("booking"))?;
        b.payment_status = payment_status;
        if payment_intent_id.is_some() {
            b.payment_intent_id = payment_intent_id;
        }
        Ok(b.clone())
    }

    async fn stale_pending(&self, created_before: DateTime<Utc>) -> Result<Vec<Booking>> {
        Ok(self
            .bookings
            .lock()
            .iter()
            .filter(|b| b.status == BookingStatus::Pending && b.payment_status == PaymentStatus::Unpaid && b.created_at < created_before)
            .cloned()
            .collect())
    }

    async fn complete_finished(&self, date: NaiveDate, time: NaiveTime) -> Result<u64> {
        let mut done = 0;
        for b in self.bookings.lock().iter_mut() {
            let finished = b.booking_date < date || (b.booking_date == date && b.end_time <= time);
            if b.status == BookingStatus::Confirmed && finished {
                b.status = BookingStatus::Completed;
                done += 1;
            }
        }
        Ok(done)
    }

    async fn count_on(&self, date: NaiveDate) -> Result<i64> {
        Ok(self.bookings.lock().iter().filter(|b| b.booking_date == date && b.status != BookingStatus::Cancelled).count() as i64)
    }

    async fn revenue_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Cents> {
        Ok(self
            .bookings
            .lock()
            .iter()
            .filter(|b| b.payment_status == PaymentStatus::Paid && b.created_at >= from && b.created_at < to)
            .map(|b| b.total_cents)
            .sum())
    }
}

#[async_trait]
impl MenuRepository for MemoryStore {
    async fn list(&self, available_only: bool) -> Result<Vec<MenuItem>> {
        Ok(self.menu.lock().iter().filter(|m| !available_only || m.is_available).cloned().collect())
    }

    async fn get_many(&self, ids: &[MenuItemId]) -> Result<Vec<MenuItem>> {
        Ok(self.menu.lock().iter().filter(|m| ids.contains(&m.id)).cloned().collect())
    }

    async fn create(&self, item: NewMenuItem) -> Result<MenuItem> {
        let row = MenuItem {
            id: MenuItemId::new(),
            name: item.name,
            description: item.description,
            category: item.category,
            price_cents: item.price_cents,
            is_available: true,
        };
        self.menu.lock().push(row.clone());
        Ok(row)
    }

    async fn update(&self, id: MenuItemId, update: MenuItemUpdate) -> Result<MenuItem> {
        let mut menu = self.menu.lock();
        let item = menu.iter_mut().find(|m| m.id == id).ok_or_else(|| not_found("menu item"))?;
        if let Some(name) = update.name {
            item.name = name;
        }
        if let Some(description) = update.description {
            item.description = description;
        }
        if let Some(category) = update.category {
            item.category = category;
        }
        if let Some(price) = update.price_cents {
            item.price_cents = price;
        }
        if let Some(available) = update.is_available {
            item.is_available = available;
        }
        Ok(item.clone())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn create(&self, order: NewOrder) -> Result<Order> {
        let row = Order {
            id: OrderId::new(),
            user_id: order.user_id,
            status: OrderStatus::Pending,
            lines: order.lines,
            subtotal_cents: order.subtotal_cents,
            discount_cents: order.discount_cents,
            fee_cents: order.fee_cents,
            total_cents: order.total_cents,
            payment_status: order.payment_status,
            payment_intent_id: None,
            notes: order.notes,
            created_at: Utc::now(),
        };
        self.orders.lock().push(row.clone());
        Ok(row)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.lock().iter().find(|o| o.id == id).cloned())
    }

    async fn list_for_user(&self, user_id: UserId, p: Page) -> Result<Vec<Order>> {
        Ok(page(self.orders.lock().iter().filter(|o| o.user_id == user_id).cloned(), p))
    }

    async fn list(&self, status: Option<OrderStatus>, p: Page) -> Result<Vec<Order>> {
        Ok(page(self.orders.lock().iter().filter(|o| status.is_none_or(|s| o.status == s)).cloned(), p))
    }

    async fn update_status(&self, id: OrderId, expected: OrderStatus, next: OrderStatus) -> Result<Order> {
        let mut orders = self.orders.lock();
        let o = orders.iter_mut().find(|o| o.id == id).ok_or_else(|| not_found("order"))?;
        if o.status != expected {
            return Err(RepositoryError::Conflict("order status changed".to_string()));
        }
        o.status = next;
        Ok(o.clone())
    }

    async fn set_payment(&self, id: OrderId, payment_status: PaymentStatus, payment_intent_id: Option<String>) -> Result<Order> {
        let mut orders = self.orders.lock();
        let o = orders.iter_mut().find(|o| o.id == id).ok_or_else(|| not_found("order"))?;
        o.payment_status = payment_status;
        if payment_intent_id.is_some() {
            o.payment_intent_id = payment_intent_id;
        }
        Ok(o.clone())
    }

    async fn count_with_status(&self, status: OrderStatus) -> Result<i64> {
        Ok(self.orders.lock().iter().filter(|o| o.status == status).count() as i64)
    }

    async fn revenue_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Cents> {
        Ok(self
            .orders
            .lock()
            .iter()
            .filter(|o| o.payment_status == PaymentStatus::Paid && o.created_at >= from && o.created_at < to)
            .map(|o| o.total_cents)
            .sum())
    }
}

#[async_trait]
impl CreditRepository for MemoryStore {
    async fn active_for(&self, user_id: UserId, kind: CreditKind, on: NaiveDate) -> Result<Vec<MembershipCredit>> {
        Ok(self
            .credits
            .lock()
            .iter()
            .filter(|c| c.user_id == user_id && c.kind == kind && c.remaining_hours > 0 && c.valid_from <= on && on <= c.valid_until)
            .cloned()
            .collect())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<MembershipCredit>> {
        Ok(self.credits.lock().iter().filter(|c| c.user_id == user_id).cloned().collect())
    }

    async fn grant(&self, credit: NewCredit, description: &str) -> Result<MembershipCredit> {
        let row = MembershipCredit {
            id: CreditId::new(),
            user_id: credit.user_id,
            kind: credit.kind,
            total_hours: credit.hours,
            remaining_hours: credit.hours,
            valid_from: credit.valid_from,
            valid_until: credit.valid_until,
            created_at: Utc::now(),
        };
        self.credits.lock().push(row.clone());
        self.ledger(row.id, row.user_id, None, row.total_hours, CreditTransactionKind::Allocation, description);
        Ok(row)
    }

    async fn transactions_for_user(&self, user_id: UserId, p: Page) -> Result<Vec<CreditTransaction>> {
        Ok(page(self.transactions.lock().iter().filter(|t| t.user_id == user_id).cloned(), p))
    }
}

#[async_trait]
impl ContactRepository for MemoryStore {
    async fn create(&self, contact: NewContact) -> Result<ContactSubmission> {
        let row = ContactSubmission {
            id: Uuid::new_v4(),
            name: contact.name,
            email: contact.email,
            subject: contact.subject,
            message: contact.message,
            status: ContactStatus::New,
            created_at: Utc::now(),
        };
        self.contacts.lock().push(row.clone());
        Ok(row)
    }

    async fn list(&self, status: Option<ContactStatus>, p: Page) -> Result<Vec<ContactSubmission>> {
        Ok(page(self.contacts.lock().iter().filter(|c| status.is_none_or(|s| c.status == s)).cloned(), p))
    }

    async fn update_status(&self, id: Uuid, status: ContactStatus) -> Result<ContactSubmission> {
        let mut contacts = self.contacts.lock();
        let c = contacts.iter_mut().find(|c| c.id == id).ok_or_else(|| not_found("contact"))?;
        c.status = status;
        Ok(c.clone())
    }

    async fn count_with_status(&self, status: ContactStatus) -> Result<i64> {
        Ok(self.contacts.lock().iter().filter(|c| c.status == status).count() as i64)
    }
}

#[async_trait]
impl NewsletterRepository for MemoryStore {
    async fn subscribe(&self, email: &str) -> Result<(NewsletterSubscriber, bool)> {
        let mut subscribers = self.subscribers.lock();
        if let Some(existing) = subscribers.iter_mut().find(|s| s.email == email) {
            let newly = !existing.subscribed;
            if newly {
                existing.subscribed = true;
                existing.subscribed_at = Utc::now();
                existing.unsubscribed_at = None;
            }
            return Ok((existing.clone(), newly));
        }
        let row = NewsletterSubscriber {
            id: Uuid::new_v4(),
            email: email.to_string(),
            subscribed: true,
            subscribed_at: Utc::now(),
            unsubscribed_at: None,
        };
        subscribers.push(row.clone());
        Ok((row, true))
    }

    async fn unsubscribe(&self, email: &str) -> Result<bool> {
        let mut subscribers = self.subscribers.lock();
        match subscribers.iter_mut().find(|s| s.email == email && s.subscribed) {
            Some(s) => {
                s.subscribed = false;
                s.unsubscribed_at = Some(Utc::now());
                Ok(true)
            },
            None => Ok(false),
        }
    }

    async fn list_active(&self, p: Page) -> Result<Vec<NewsletterSubscriber>> {
        Ok(page(self.subscribers.lock().iter().filter(|s| s.subscribed).cloned(), p))
    }

    async fn count_active(&self) -> Result<i64> {
        Ok(self.subscribers.lock().iter().filter(|s| s.subscribed).count() as i64)
    }
}

#[async_trait]
impl AuditLogRepository for MemoryStore {
    async fn record(&self, entry: NewAuditLog) -> Result<()> {
        self.audit.lock().push(AuditLog {
            id: Uuid::new_v4(),
            actor_id: entry.actor_id,
            action: entry.action,
            entity_type: entry.entity_type,
            entity_id: entry.entity_id,
            details: entry.details,
            ip_address: entry.ip_address,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn list(&self, p: Page) -> Result<Vec<AuditLog>> {
        Ok(page(self.audit.lock().iter().rev().cloned(), p))
    }
}

#[async_trait]
impl BlogRepository for MemoryStore {
    async fn list_published(&self, p: Page) -> Result<Vec<BlogPost>> {
        Ok(page(self.posts.lock().iter().filter(|b| b.status == PostStatus::Published).cloned(), p))
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<BlogPost>> {
        Ok(self.posts.lock().iter().find(|b| b.slug == slug).cloned())
    }

    async fn list_all(&self, p: Page) -> Result<Vec<BlogPost>> {
        Ok(page(self.posts.lock().iter().cloned(), p))
    }

    async fn create(&self, post: NewPost) -> Result<BlogPost> {
        let mut posts = self.posts.lock();
        if posts.iter().any(|b| b.slug == post.slug) {
            return Err(RepositoryError::Conflict("slug already exists".to_string()));
        }
        let now = Utc::now();
        let row = BlogPost {
            id: PostId::new(),
            slug: post.slug,
            title: post.title,
            excerpt: post.excerpt,
            body: post.body,
            author_id: post.author_id,
            published_at: (post.status == PostStatus::Published).then_some(now),
            status: post.status,
            created_at: now,
            updated_at: now,
        };
        posts.push(row.clone());
        Ok(row)
    }

    async fn update(&self, id: PostId, update: PostUpdate) -> Result<BlogPost> {
        let mut posts = self.posts.lock();
        let post = posts.iter_mut().find(|b| b.id == id).ok_or_else(|| not_found("post"))?;
        if let Some(title) = update.title {
            post.title = title;
        }
        if let Some(excerpt) = update.excerpt {
            post.excerpt = excerpt;
        }
        if let Some(body) = update.body {
            post.body = body;
        }
        if let Some(status) = update.status {
            if status == PostStatus::Published && post.published_at.is_none() {
                post.published_at = Some(Utc::now());
            }
            post.status = status;
        }
        post.updated_at = Utc::now();
        Ok(post.clone())
    }
}
