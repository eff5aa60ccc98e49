//! Message templates; every user-supplied value is HTML-escaped
use super::EmailMessage;
use crate::config::CurrencyCode;
use crate::core::types::{Booking, Cents, ContactSubmission, Order, User, Workspace};

/// `1234` → `"12.34 USD"`
pub fn format_money(cents: Cents, currency: CurrencyCode) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02} {}", abs / 100, abs % 100, currency.as_str().to_uppercase())
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Turn plain lines into a minimal HTML body
fn render(to: &str, subject: String, lines: Vec<String>) -> EmailMessage {
    let html = lines
        .iter()
        .map(|line| format!("<p>{}</p>", escape(line)))
        .collect::<Vec<_>>()
        .join("\n");
    EmailMessage { to: to.to_string(), subject, text: lines.join("\n\n"), html }
}

fn booking_lines(workspace: &Workspace, booking: &Booking, currency: CurrencyCode) -> Vec<String> {
    let mut lines = vec![format!(
        "{} on {} from {} to {}",
        workspace.name,
        booking.booking_date,
        booking.start_time.format("%H:%M"),
        booking.end_time.format("%H:%M"),
    )];
    if booking.credits_used > 0 {
        lines.push(format!("Membership credits applied: {}h", booking.credits_used));
    }
    if booking.discount_cents > 0 {
        lines.push(format!("Member discount: {}", format_money(booking.discount_cents, currency)));
    }
    lines.push(format!("Total: {}", format_money(booking.total_cents, currency)));
    lines
}

pub fn booking_confirmation(
    user: &User,
    workspace: &Workspace,
    booking: &Booking,
    currency: CurrencyCode,
) -> EmailMessage {
    let mut lines = vec![format!("Hi {}, your booking is confirmed.", user.name)];
    lines.extend(booking_lines(workspace, booking, currency));
    lines.push(format!("Booking reference: {}", booking.id));
    render(&user.email, format!("Booking confirmed: {}", workspace.name), lines)
}

pub fn booking_cancellation(
    user: &User,
    workspace: &Workspace,
    booking: &Booking,
    currency: CurrencyCode,
) -> EmailMessage {
    let mut lines = vec![format!("Hi {}, your booking has been cancelled.", user.name)];
    lines.extend(booking_lines(workspace, booking, currency));
    if booking.credits_used > 0 {
        lines.push(format!("{}h of credits were returned to your balance.", booking.credits_used));
    }
    render(&user.email, format!("Booking cancelled: {}", workspace.name), lines)
}

pub fn order_receipt(user: &User, order: &Order, currency: CurrencyCode) -> EmailMessage {
    let mut lines = vec![format!("Hi {}, thanks for your order.", user.name)];
    for line in &order.lines {
        lines.push(format!(
            "{} x {} @ {}",
            line.quantity,
            line.name,
            format_money(line.unit_price_cents, currency)
        ));
    }
    if order.discount_cents > 0 {
        lines.push(format!("Member discount: {}", format_money(order.discount_cents, currency)));
    }
    if order.fee_cents > 0 {
        lines.push(format!("Processing fee: {}", format_money(order.fee_cents, currency)));
    }
    lines.push(format!("Total: {}", format_money(order.total_cents, currency)));
    render(&user.email, "Your cafe order".to_string(), lines)
}

pub fn contact_acknowledgement(contact: &ContactSubmission) -> EmailMessage {
    let lines = vec![
        format!("Hi {}, we received your message \"{}\".", contact.name, contact.subject),
        "Someone from the team will get back to you shortly.".to_string(),
    ];
    render(&contact.email, "We got your message".to_string(), lines)
}

pub fn admin_contact_alert(admin_address: &str, contact: &ContactSubmission) -> EmailMessage {
    let lines = vec![
        format!("From: {} <{}>", contact.name, contact.email),
        format!("Subject: {}", contact.subject),
        contact.message.clone(),
    ];
    render(admin_address, format!("New contact submission: {}", contact.subject), lines)
}

pub fn newsletter_welcome(email: &str) -> EmailMessage {
    let lines = vec![
        "Thanks for subscribing to the cowork newsletter.".to_string(),
        "You can unsubscribe at any time from the link in each issue.".to_string(),
    ];
    render(email, "Welcome to the newsletter".to_string(), lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn contact(name: &str, subject: &str) -> ContactSubmission {
        ContactSubmission {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: "visitor@example.com".to_string(),
            subject: subject.to_string(),
            message: "Do you have lockers?".to_string(),
            status: crate::core::types::ContactStatus::New,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(1234, CurrencyCode::Usd), "12.34 USD");
        assert_eq!(format_money(5, CurrencyCode::Eur), "0.05 EUR");
        assert_eq!(format_money(-250, CurrencyCode::Gbp), "-2.50 GBP");
    }

    #[test]
    fn test_user_input_is_escaped_in_html() {
        let message = contact_acknowledgement(&contact("<script>", "a & b"));
        assert!(message.html.contains("&lt;script&gt;"));
        assert!(message.html.contains("a &amp; b"));
        assert!(message.text.contains("<script>"));
        assert_eq!(message.to, "visitor@example.com");
    }

    #[test]
    fn test_admin_alert_goes_to_admin() {
        let message = admin_contact_alert("ops@cowork.test", &contact("Ada", "Lockers"));
        assert_eq!(message.to, "ops@cowork.test");
        assert!(message.subject.contains("Lockers"));
        assert!(message.text.contains("Do you have lockers?"));
    }
}
