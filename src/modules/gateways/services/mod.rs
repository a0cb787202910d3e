pub mod dbs;
pub mod doku;
pub mod faspay;
pub mod gateway_service;
pub mod gateway_trait;
pub mod ipaymu;
pub mod midtrans;
pub mod xendit;

pub use dbs::DbsGateway;
pub use doku::DokuGateway;
pub use faspay::FaspayGateway;
pub use gateway_service::GatewayService;
pub use gateway_trait::PaymentGateway;
pub use ipaymu::IpaymuGateway;
pub use midtrans::MidtransGateway;
pub use xendit::XenditGateway;
