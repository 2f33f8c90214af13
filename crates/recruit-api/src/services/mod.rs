//! Business logic services.

pub mod accounts;
pub mod blacklist_janitor;

pub use accounts::AccountService;
pub use blacklist_janitor::BlacklistJanitor;
