//! Repository implementations for database access.

pub mod access_token;
pub mod activity_log;
pub mod attachment;
pub mod message;
pub mod notification;
pub mod password_reset;
pub mod ticket;
pub mod user;
pub mod whatsapp_message;

pub use access_token::{AccessTokenRepository, TokenOwnerRow};
pub use activity_log::ActivityLogRepository;
pub use attachment::AttachmentRepository;
pub use message::TicketMessageRepository;
pub use notification::NotificationRepository;
pub use password_reset::PasswordResetRepository;
pub use ticket::{TicketListFilter, TicketRepository, TicketVisibility};
pub use user::{UserChanges, UserRepository};
pub use whatsapp_message::WhatsappMessageRepository;
