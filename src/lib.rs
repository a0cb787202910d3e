//! IndoPay payment gateway adapters
//!
//! One uniform contract for initiating payments and ingesting webhooks
//! across six Indonesian payment providers, each with its own wire format,
//! authentication scheme and status vocabulary. The host application owns
//! persistence, retries and HTTP routing; this crate owns the mapping and
//! the cryptography.

pub mod config;
pub mod core;
pub mod modules;

// Re-export commonly used types
pub use config::Config;
pub use self::core::{
    CreatePaymentInput, CustomerDetails, GatewayError, PaymentMethodType, PaymentStatus,
    PaymentTransaction, Result, WebhookHeaders,
};
pub use modules::gateways;
pub use modules::gateways::{
    DbsGateway, DokuGateway, FaspayGateway, GatewayService, IpaymuGateway, MidtransGateway,
    PaymentGateway, XenditGateway,
};
