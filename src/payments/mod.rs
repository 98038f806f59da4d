//! Payment Highway card payments
//!
//! Hosted-form redirects, callback handling, saved-card charges and
//! refunds, signed with the SPH1 scheme.

pub mod card_policy;
pub mod context;
pub mod dispatcher;
pub mod forms;
pub mod providers;
pub mod response;
pub mod signer;
pub mod stamp;
pub mod traits;
pub mod types;
pub mod urls;
pub mod workflow;

pub use context::WorkflowContext;
pub use dispatcher::{CallbackDispatcher, CallbackKind, CallbackOutcome, CallbackParams};
pub use providers::{PaymentHighwayClient, PaymentHighwayConfig};
pub use traits::{PaymentApi, PaymentGateway, RedirectRequest};
pub use workflow::PaymentHighwayGateway;
