//! Reminder pipeline
//!
//! Renders and records reminder emails for due reminders, at most once per
//! reminder, whether triggered by the periodic sweep or a manual send.
//!
//! - `render`: placeholder substitution and amount formatting
//! - `defaults`: stock template provisioning
//! - `selector`: which reminders are due
//! - `dispatcher`: claim, render and outbox write in one transaction
//! - `sweep`: dispatch across an organization or all organizations
//! - `service`: façade over the above

pub mod defaults;
pub mod dispatcher;
pub mod error;
pub mod render;
pub mod selector;
pub mod service;
pub mod sweep;

pub use dispatcher::{DispatchOutcome, TemplateSource};
pub use error::{DispatchError, DispatchErrorKind};
pub use service::ReminderService;
pub use sweep::{AllTenantsReport, SweepReport};
