//! Client for the Correios (Brazilian postal service) shipping API.
//!
//! A [`Client`] authenticates with a postage card, prices shipments,
//! estimates delivery deadlines, and manages pre-postage records and their
//! shipping labels. Price and deadline queries send at most
//! [`batch::BATCH_SIZE`] products per request and merge the answers.

pub mod auth;
pub mod batch;
pub mod client;
pub mod clock;
pub mod config;
pub mod deadline;
pub mod error;
pub mod http;
pub mod prepostage;
pub mod pricing;
pub mod product;

pub use auth::{Session, TokenManager};
pub use client::Client;
pub use clock::{Clock, SystemClock};
pub use config::{Config, Credentials, Environment};
pub use deadline::{DeadlineQuery, DeadlineRecord};
pub use error::{Error, Precondition, Result};
pub use pricing::PriceRecord;
pub use product::ProductEntry;
