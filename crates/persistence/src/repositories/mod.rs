//! Repository implementations for database operations.

pub mod average_basket;
pub mod schedule;
pub mod settings;
pub mod tenant;

pub use average_basket::AverageBasketRepository;
pub use schedule::ScheduleRepository;
pub use settings::SettingsRepository;
pub use tenant::TenantRepository;
