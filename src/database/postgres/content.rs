//! PostgreSQL repositories for contact forms, newsletter and blog
use crate::core::repository::{
    BlogRepository, ContactRepository, NewContact, NewPost, NewsletterRepository, Page, PostUpdate,
    Result,
};
use crate::core::types::{BlogPost, ContactStatus, ContactSubmission, NewsletterSubscriber, PostId};
use crate::database::client::Database;
use crate::database::models::{BlogPostRow, ContactRow, SubscriberRow, convert_all};
use crate::database::postgres::{map_write_error, not_found};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

const CONTACT_COLUMNS: &str = "id, name, email, subject, message, status, created_at";
const SUBSCRIBER_COLUMNS: &str = "id, email, subscribed, subscribed_at, unsubscribed_at";
const POST_COLUMNS: &str =
    "id, slug, title, excerpt, body, author_id, status, published_at, created_at, updated_at";

pub struct PostgresContactRepository {
    db: Arc<Database>,
}

impl PostgresContactRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ContactRepository for PostgresContactRepository {
    async fn create(&self, contact: NewContact) -> Result<ContactSubmission> {
        let sql = format!(
            "INSERT INTO contact_submissions (id, name, email, subject, message)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {CONTACT_COLUMNS}"
        );
        let row: ContactRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(&contact.name)
            .bind(&contact.email)
            .bind(&contact.subject)
            .bind(&contact.message)
            .fetch_one(&self.db.pool)
            .await?;
        row.try_into()
    }

    async fn list(&self, status: Option<ContactStatus>, page: Page) -> Result<Vec<ContactSubmission>> {
        let sql = format!(
            "SELECT {CONTACT_COLUMNS} FROM contact_submissions
             WHERE ($1::TEXT IS NULL OR status = $1)
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        );
        let rows: Vec<ContactRow> = sqlx::query_as(&sql)
            .bind(status.map(|s| s.as_str()))
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.db.pool)
            .await?;
        convert_all(rows)
    }

    async fn update_status(&self, id: Uuid, status: ContactStatus) -> Result<ContactSubmission> {
        let sql = format!(
            "UPDATE contact_submissions SET status = $2 WHERE id = $1 RETURNING {CONTACT_COLUMNS}"
        );
        let row: Option<ContactRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&self.db.pool)
            .await?;
        row.ok_or_else(|| not_found("contact submission", id))?.try_into()
    }

    async fn count_with_status(&self, status: ContactStatus) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM contact_submissions WHERE status = $1")
                .bind(status.as_str())
                .fetch_one(&self.db.pool)
                .await?;
        Ok(count)
    }
}

pub struct PostgresNewsletterRepository {
    db: Arc<Database>,
}

impl PostgresNewsletterRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NewsletterRepository for PostgresNewsletterRepository {
    async fn subscribe(&self, email: &str) -> Result<(NewsletterSubscriber, bool)> {
        let mut tx = self.db.pool.begin().await?;

        let was_active: Option<bool> = sqlx::query_scalar(
            "SELECT subscribed FROM newsletter_subscribers WHERE email = $1 FOR UPDATE",
        )
        .bind(email)
        .fetch_optional(&mut *tx)
        .await?;

        let sql = format!(
            "INSERT INTO newsletter_subscribers (id, email) VALUES ($1, $2)
             ON CONFLICT (email) DO UPDATE SET
                subscribed = TRUE,
                subscribed_at = CASE WHEN newsletter_subscribers.subscribed
                                     THEN newsletter_subscribers.subscribed_at ELSE NOW() END,
                unsubscribed_at = NULL
             RETURNING {SUBSCRIBER_COLUMNS}"
        );
        let row: SubscriberRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(email)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((row.into(), was_active != Some(true)))
    }

    async fn unsubscribe(&self, email: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE newsletter_subscribers SET subscribed = FALSE, unsubscribed_at = NOW()
             WHERE email = $1 AND subscribed",
        )
        .bind(email)
        .execute(&self.db.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_active(&self, page: Page) -> Result<Vec<NewsletterSubscriber>> {
        let sql = format!(
            "SELECT {SUBSCRIBER_COLUMNS} FROM newsletter_subscribers WHERE subscribed
             ORDER BY subscribed_at DESC LIMIT $1 OFFSET $2"
        );
        let rows: Vec<SubscriberRow> = sqlx::query_as(&sql)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.db.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count_active(&self) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM newsletter_subscribers WHERE subscribed")
                .fetch_one(&self.db.pool)
                .await?;
        Ok(count)
    }
}

pub struct PostgresBlogRepository {
    db: Arc<Database>,
}

impl PostgresBlogRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BlogRepository for PostgresBlogRepository {
    async fn list_published(&self, page: Page) -> Result<Vec<BlogPost>> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM blog_posts WHERE status = 'published'
             ORDER BY published_at DESC LIMIT $1 OFFSET $2"
        );
        let rows: Vec<BlogPostRow> = sqlx::query_as(&sql)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.db.pool)
            .await?;
        convert_all(rows)
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<BlogPost>> {
        let sql = format!("SELECT {POST_COLUMNS} FROM blog_posts WHERE slug = $1");
        let row: Option<BlogPostRow> =
            sqlx::query_as(&sql).bind(slug).fetch_optional(&self.db.pool).await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn list_all(&self, page: Page) -> Result<Vec<BlogPost>> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM blog_posts ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        );
        let rows: Vec<BlogPostRow> = sqlx::query_as(&sql)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.db.pool)
            .await?;
        convert_all(rows)
    }

    async fn create(&self, post: NewPost) -> Result<BlogPost> {
        let sql = format!(
            "INSERT INTO blog_posts (id, slug, title, excerpt, body, author_id, status, published_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, CASE WHEN $7 = 'published' THEN NOW() END)
             RETURNING {POST_COLUMNS}"
        );
        let row: BlogPostRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(&post.slug)
            .bind(&post.title)
            .bind(&post.excerpt)
            .bind(&post.body)
            .bind(post.author_id.map(|id| id.value()))
            .bind(post.status.as_str())
            .fetch_one(&self.db.pool)
            .await
            .map_err(|e| map_write_error(e, "slug already in use"))?;
        row.try_into()
    }

    async fn update(&self, id: PostId, update: PostUpdate) -> Result<BlogPost> {
        // First publication stamps published_at; later edits keep it
        let sql = format!(
            "UPDATE blog_posts SET
                title = COALESCE($2, title),
                excerpt = COALESCE($3, excerpt),
                body = COALESCE($4, body),
                status = COALESCE($5, status),
                published_at = CASE
                    WHEN COALESCE($5, status) = 'published' THEN COALESCE(published_at, NOW())
                    ELSE published_at END,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {POST_COLUMNS}"
        );
        let row: Option<BlogPostRow> = sqlx::query_as(&sql)
            .bind(id.value())
            .bind(update.title)
            .bind(update.excerpt)
            .bind(update.body)
            .bind(update.status.map(|s| s.as_str()))
            .fetch_optional(&self.db.pool)
            .await?;
        row.ok_or_else(|| not_found("post", id))?.try_into()
    }
}
