#![warn(clippy::all, missing_docs)]

//! Core domain logic for the box office.
//!
//! This crate hosts the ticket models, price parsing and fee math, the
//! payment modal state machine, the quick-booking and account flows,
//! catalog loading and configuration used by the terminal UI and any
//! future frontends.

pub mod account;
pub mod booking;
pub mod catalog;
pub mod config;
pub mod error;
pub mod forms;
pub mod models;
pub mod notice;
pub mod pricing;

pub use booking::{BookingController, BookingState, PaymentMethod, QuickBookingFlow};
pub use catalog::Catalog;
pub use config::AppConfig;
pub use error::{BookingError, ParseError, ResetError, SettlementFailure, ValidationError};
pub use models::{EventListing, EventMetadata, TicketListing, TicketOffer};
pub use pricing::FeeBreakdown;
