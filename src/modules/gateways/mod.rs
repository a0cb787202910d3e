pub mod services;

pub use services::{
    DbsGateway, DokuGateway, FaspayGateway, GatewayService, IpaymuGateway, MidtransGateway,
    PaymentGateway, XenditGateway,
};
