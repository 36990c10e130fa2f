pub mod notification_repo;
