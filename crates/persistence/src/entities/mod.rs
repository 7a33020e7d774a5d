//! Database entity definitions.

pub mod activity_log;
pub mod attachment;
pub mod message;
pub mod notification;
pub mod ticket;
pub mod user;

pub use activity_log::ActivityLogEntity;
pub use attachment::AttachmentEntity;
pub use message::{TicketMessageEntity, WhatsappMessageEntity};
pub use notification::NotificationEntity;
pub use ticket::{TicketEntity, TicketOriginDb, TicketPriorityDb, TicketStatusDb};
pub use user::{AccessTokenEntity, PasswordResetEntity, RoleDb, UserEntity};
