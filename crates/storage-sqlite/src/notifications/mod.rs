mod model;
mod repository;

pub use model::{NewNotificationDB, NotificationDB};
pub use repository::NotificationRepository;
