pub mod directory;
pub mod notification;
pub mod preference;
