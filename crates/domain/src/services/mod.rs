//! Business rules shared by the HTTP layer.

pub mod access;
pub mod activity;
pub mod dispatch;
pub mod events;
pub mod lifecycle;
pub mod upload_policy;

pub use activity::ActivityLogBuilder;
pub use events::{Assignment, DomainEvent, EventSink, RecordingEventSink};
pub use upload_policy::{IncomingFile, UploadLimits};
