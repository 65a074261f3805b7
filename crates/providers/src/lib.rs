//! Clients for the hosted services pickup depends on: Stripe Checkout for
//! payments and Resend for transactional email.

pub mod email;
pub mod stripe;

pub use email::{EmailMessage, EmailSender, LogMailer, Mailer, ResendClient};
pub use stripe::{is_session_id, CheckoutGateway, CheckoutSession, CheckoutSessionRequest, CreatedSession, StripeClient};
