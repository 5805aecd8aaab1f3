pub mod directory_repo;
pub mod notification_preference_repo;
pub mod notification_repo;

pub use directory_repo::DirectoryRepo;
pub use notification_preference_repo::NotificationPreferenceRepo;
pub use notification_repo::NotificationRepo;
