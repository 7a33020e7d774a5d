//! Domain models for the helpdesk.

pub mod activity_log;
pub mod attachment;
pub mod auth;
pub mod message;
pub mod notification;
pub mod ticket;
pub mod user;

pub use activity_log::{
    ActivityAction, ActivityLog, ActivityLogFilter, ActivityLogQuery, NewActivityLog, Period,
};
pub use attachment::{Attachment, AttachmentScope, NewAttachment};
pub use message::{
    CreateTicketMessageRequest, InboundWhatsapp, SendWhatsappMessageRequest, TicketMessage,
    TicketMessageResponse, WhatsappMessage, WhatsappMessageKind, WhatsappWebhookPayload,
};
pub use notification::{
    AssignedType, NewMessageData, NewNotification, Notification, NotificationKind, RecipientRole,
    TicketAssignedData, UnreadCount,
};
pub use ticket::{
    CreateTicketRequest, NewTicket, Ticket, TicketOrigin, TicketPriority, TicketQuery,
    TicketResponse, TicketStatus, UpdateTicketRequest,
};
pub use user::{
    CreateUserRequest, CurrentUser, Role, UpdateProfileRequest, UpdateUserRequest, User,
    UserResponse, UserSummary,
};
