// Account registration, login, and credential lookup
pub mod account;

// HTTP API: auth endpoints, request gate, reminders pass-through
pub mod api;

// Environment-derived configuration
pub mod config;

// Encryption at rest for third-party secrets
pub mod credentials;

// External reminders provider abstraction
pub mod reminders;

// Account persistence
pub mod store;

// Session token issuance and verification
pub mod token;
