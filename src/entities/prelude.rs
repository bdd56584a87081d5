pub use super::logs::Entity as Logs;
