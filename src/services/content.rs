//! Contact form, newsletter and blog
use crate::auth::normalize_email;
use crate::core::repository::{NewContact, NewPost, Page, PostUpdate, Repositories, RepositoryError};
use crate::core::types::*;
use crate::core::{DomainError, DomainResult};
use crate::email::templates;
use crate::notify::ADMIN_CHANNEL;
use crate::services::{Actor, Integrations, audit, send_email};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

const MAX_NAME_LEN: usize = 100;
const MAX_SUBJECT_LEN: usize = 200;
const MAX_MESSAGE_LEN: usize = 5_000;
const MAX_SLUG_LEN: usize = 80;

#[derive(Debug, Clone, Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostDraft {
    pub title: String,
    /// Derived from the title when absent
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub excerpt: String,
    pub body: String,
    #[serde(default = "default_post_status")]
    pub status: PostStatus,
}

fn default_post_status() -> PostStatus {
    PostStatus::Draft
}

/// Lowercase ASCII words joined by single dashes
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let mut slug: String = slug.trim_end_matches('-').chars().take(MAX_SLUG_LEN).collect();
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn required(field: &str, value: &str, max: usize) -> DomainResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::Validation(format!("{field} is required")));
    }
    if value.chars().count() > max {
        return Err(DomainError::Validation(format!("{field} is limited to {max} characters")));
    }
    Ok(value.to_string())
}

pub struct ContentService {
    repos: Repositories,
    integrations: Integrations,
    admin_address: String,
}

impl ContentService {
    pub fn new(repos: Repositories, integrations: Integrations, admin_address: String) -> Self {
        Self { repos, integrations, admin_address }
    }

    pub async fn submit_contact(&self, request: ContactRequest, actor: &Actor) -> DomainResult<ContactSubmission> {
        let email = normalize_email(&request.email)
            .ok_or_else(|| DomainError::Validation("invalid email address".into()))?;
        let name = required("name", &request.name, MAX_NAME_LEN)?;
        let message = required("message", &request.message, MAX_MESSAGE_LEN)?;
        let subject = match request.subject.trim() {
            "" => "General enquiry".to_string(),
            subject => required("subject", subject, MAX_SUBJECT_LEN)?,
        };

        let contact = self.repos.contacts.create(NewContact { name, email, subject, message }).await?;
        info!(contact_id = %contact.id, "Contact submission received");
        crate::metrics::incr("contacts.created");

        self.integrations
            .notifier
            .publish(
                ADMIN_CHANNEL,
                "contact.created",
                json!({ "id": contact.id, "name": contact.name, "subject": contact.subject }),
            )
            .await;
        send_email(self.integrations.email.as_ref(), templates::contact_acknowledgement(&contact)).await;
        send_email(
            self.integrations.email.as_ref(),
            templates::admin_contact_alert(&self.admin_address, &contact),
        )
        .await;
        audit(
            self.repos.audit.as_ref(),
            actor,
            "contact.create",
            "contact_submission",
            Some(contact.id.to_string()),
            json!({}),
        )
        .await;
        Ok(contact)
    }

    pub async fn contacts(&self, status: Option<ContactStatus>, page: Page) -> DomainResult<Vec<ContactSubmission>> {
        Ok(self.repos.contacts.list(status, page.clamped()).await?)
    }

    pub async fn update_contact(
        &self,
        id: Uuid,
        status: ContactStatus,
        actor: &Actor,
    ) -> DomainResult<ContactSubmission> {
        let contact = self.repos.contacts.update_status(id, status).await?;
        audit(
            self.repos.audit.as_ref(),
            actor,
            "contact.status",
            "contact_submission",
            Some(id.to_string()),
            json!({ "status": status }),
        )
        .await;
        Ok(contact)
    }

    /// Idempotent; the welcome email goes out only on a fresh subscription
    pub async fn subscribe(&self, email: &str) -> DomainResult<NewsletterSubscriber> {
        let email = normalize_email(email)
            .ok_or_else(|| DomainError::Validation("invalid email address".into()))?;
        let (subscriber, newly) = self.repos.newsletter.subscribe(&email).await?;
        if newly {
            info!(subscriber_id = %subscriber.id, "Newsletter subscription");
            crate::metrics::incr("newsletter.subscribed");
            send_email(self.integrations.email.as_ref(), templates::newsletter_welcome(&email)).await;
        } else {
            debug!(subscriber_id = %subscriber.id, "Already subscribed");
        }
        Ok(subscriber)
    }

    /// Unknown addresses are not an error, so membership cannot be probed
    pub async fn unsubscribe(&self, email: &str) -> DomainResult<()> {
        let email = normalize_email(email)
            .ok_or_else(|| DomainError::Validation("invalid email address".into()))?;
        if self.repos.newsletter.unsubscribe(&email).await? {
            info!("Newsletter unsubscription");
            crate::metrics::incr("newsletter.unsubscribed");
        }
        Ok(())
    }

    pub async fn subscribers(&self, page: Page) -> DomainResult<Vec<NewsletterSubscriber>> {
        Ok(self.repos.newsletter.list_active(page.clamped()).await?)
    }

    pub async fn published_posts(&self, page: Page) -> DomainResult<Vec<BlogPost>> {
        Ok(self.repos.blog.list_published(page.clamped()).await?)
    }

    /// Public lookup; drafts are invisible
    pub async fn post(&self, slug: &str) -> DomainResult<BlogPost> {
        self.repos
            .blog
            .get_by_slug(slug)
            .await?
            .filter(|p| p.status == PostStatus::Published)
            .ok_or_else(|| DomainError::NotFound(format!("post {slug}")))
    }

    pub async fn all_posts(&self, page: Page) -> DomainResult<Vec<BlogPost>> {
        Ok(self.repos.blog.list_all(page.clamped()).await?)
    }

    pub async fn create_post(&self, draft: PostDraft, actor: &Actor) -> DomainResult<BlogPost> {
        let title = required("title", &draft.title, MAX_SUBJECT_LEN)?;
        if draft.body.trim().is_empty() {
            return Err(DomainError::Validation("body is required".into()));
        }

        let explicit = draft.slug.is_some();
        let slug = slugify(draft.slug.as_deref().unwrap_or(&title));
        if slug.is_empty() {
            return Err(DomainError::Validation("slug must contain letters or digits".into()));
        }

        let post = NewPost {
            slug: slug.clone(),
            title,
            excerpt: draft.excerpt.trim().to_string(),
            body: draft.body,
            author_id: actor.user_id,
            status: draft.status,
        };
        let created = match self.repos.blog.create(post.clone()).await {
            // Titles repeat; derived slugs get a short suffix
            Err(RepositoryError::Conflict(_)) if !explicit => {
                let suffix = Uuid::new_v4().simple().to_string();
                let slug = format!("{}-{}", slug, &suffix[..6]);
                self.repos.blog.create(NewPost { slug, ..post }).await?
            },
            other => other?,
        };

        info!(post_id = %created.id, slug = %created.slug, status = %created.status, "Blog post created");
        audit(
            self.repos.audit.as_ref(),
            actor,
            "blog.create",
            "blog_post",
            Some(created.id.to_string()),
            json!({ "slug": created.slug }),
        )
        .await;
        Ok(created)
    }

    pub async fn update_post(&self, id: PostId, update: PostUpdate, actor: &Actor) -> DomainResult<BlogPost> {
        if update.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(DomainError::Validation("title cannot be empty".into()));
        }
        let post = self.repos.blog.update(id, update).await?;
        audit(
            self.repos.audit.as_ref(),
            actor,
            "blog.update",
            "blog_post",
            Some(id.to_string()),
            json!({ "status": post.status }),
        )
        .await;
        Ok(post)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::MemoryStore;
    use crate::email::MockEmailSender;
    use crate::notify::MockNotifier;
    use crate::services::testing::quiet_integrations;
    use std::sync::Arc;

    fn service(store: &Arc<MemoryStore>, integrations: Integrations) -> ContentService {
        ContentService::new(store.repositories(), integrations, "admin@cowork.test".into())
    }

    fn draft(title: &str, status: PostStatus) -> PostDraft {
        PostDraft {
            title: title.into(),
            slug: None,
            excerpt: String::new(),
            body: "Hello".into(),
            status,
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Rust & Coffee -- 2026 "), "rust-coffee-2026");
        assert_eq!(slugify("Café au lait"), "caf-au-lait");
        assert_eq!(slugify("!!!"), "");
    }

    #[tokio::test]
    async fn test_contact_emails_submitter_and_admin() {
        let store = Arc::new(MemoryStore::default());
        let mut email = MockEmailSender::new();
        email.expect_send().withf(|m| m.to == "visitor@example.com").times(1).returning(|_| Ok(()));
        email.expect_send().withf(|m| m.to == "admin@cowork.test").times(1).returning(|_| Ok(()));
        let mut notifier = MockNotifier::new();
        notifier
            .expect_publish()
            .withf(|channel, event, _| channel == ADMIN_CHANNEL && event == "contact.created")
            .times(1)
            .returning(|_, _, _| ());
        let integrations = Integrations { email: Arc::new(email), notifier: Arc::new(notifier), ..quiet_integrations() };

        let contact = service(&store, integrations)
            .submit_contact(
                ContactRequest {
                    name: " Visitor ".into(),
                    email: "Visitor@Example.com".into(),
                    subject: String::new(),
                    message: "Do you have parking?".into(),
                },
                &Actor::default(),
            )
            .await
            .unwrap();
        assert_eq!(contact.name, "Visitor");
        assert_eq!(contact.subject, "General enquiry");
        assert_eq!(contact.status, ContactStatus::New);
    }

    #[tokio::test]
    async fn test_contact_validation() {
        let store = Arc::new(MemoryStore::default());
        let content = service(&store, quiet_integrations());
        let request = ContactRequest {
            name: "A".into(),
            email: "not-an-email".into(),
            subject: String::new(),
            message: "hi".into(),
        };
        assert!(matches!(
            content.submit_contact(request.clone(), &Actor::default()).await,
            Err(DomainError::Validation(_))
        ));
        let empty = ContactRequest { email: "a@example.com".into(), message: "  ".into(), ..request };
        assert!(matches!(content.submit_contact(empty, &Actor::default()).await, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_newsletter_welcome_only_once() {
        let store = Arc::new(MemoryStore::default());
        let mut email = MockEmailSender::new();
        email.expect_send().times(2).returning(|_| Ok(()));
        let integrations = Integrations { email: Arc::new(email), ..quiet_integrations() };
        let content = service(&store, integrations);

        content.subscribe("reader@example.com").await.unwrap();
        content.subscribe("READER@example.com").await.unwrap();
        assert_eq!(content.subscribers(Page::default()).await.unwrap().len(), 1);

        content.unsubscribe("reader@example.com").await.unwrap();
        content.unsubscribe("nobody@example.com").await.unwrap();
        assert!(content.subscribers(Page::default()).await.unwrap().is_empty());

        // Resubscribing is a fresh subscription
        content.subscribe("reader@example.com").await.unwrap();
    }

    #[tokio::test]
    async fn test_drafts_hidden_and_slugs_deduplicated() {
        let store = Arc::new(MemoryStore::default());
        let content = service(&store, quiet_integrations());

        let draft_post = content.create_post(draft("Opening Day", PostStatus::Draft), &Actor::default()).await.unwrap();
        assert_eq!(draft_post.slug, "opening-day");
        assert!(matches!(content.post("opening-day").await, Err(DomainError::NotFound(_))));

        let second = content.create_post(draft("Opening Day", PostStatus::Published), &Actor::default()).await.unwrap();
        assert!(second.slug.starts_with("opening-day-"));
        assert!(second.published_at.is_some());
        assert_eq!(content.post(&second.slug).await.unwrap().id, second.id);

        let mut explicit = draft("Other", PostStatus::Draft);
        explicit.slug = Some("opening-day".into());
        assert!(matches!(content.create_post(explicit, &Actor::default()).await, Err(DomainError::Conflict(_))));

        let published = content
            .update_post(
                draft_post.id,
                PostUpdate { status: Some(PostStatus::Published), ..Default::default() },
                &Actor::default(),
            )
            .await
            .unwrap();
        assert!(published.published_at.is_some());
        assert_eq!(content.published_posts(Page::default()).await.unwrap().len(), 2);
    }
}
