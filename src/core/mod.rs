pub mod error;
pub mod serde_ext;
pub mod traits;
pub mod types;

pub use error::{GatewayError, Result};
pub use types::{
    CreatePaymentInput, CustomerDetails, PaymentMethodType, PaymentStatus, PaymentTransaction,
    WebhookHeaders,
};
