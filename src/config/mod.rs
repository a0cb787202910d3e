use std::env;
use std::sync::Arc;

use crate::core::error::{GatewayError, Result};
use crate::modules::gateways::{
    DbsGateway, DokuGateway, FaspayGateway, GatewayService, IpaymuGateway, MidtransGateway,
    XenditGateway,
};

/// Provider credentials loaded from the environment.
///
/// Base URLs are optional everywhere and default to each provider's sandbox
/// environment; secrets are required and fail loudly when absent.
#[derive(Debug, Clone)]
pub struct Config {
    pub midtrans: MidtransConfig,
    pub doku: DokuConfig,
    pub faspay: FaspayConfig,
    pub ipaymu: IpaymuConfig,
    pub xendit: XenditConfig,
    pub dbs: DbsConfig,
    pub default_provider: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MidtransConfig {
    pub server_key: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DokuConfig {
    pub client_id: String,
    pub secret_key: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FaspayConfig {
    pub merchant_id: String,
    pub merchant_name: String,
    pub user_id: String,
    pub password: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IpaymuConfig {
    pub api_key: String,
    pub va: String,
    pub notify_url: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct XenditConfig {
    pub secret_key: String,
    pub callback_token: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DbsConfig {
    pub client_id: String,
    /// ASCII-armored merchant private key
    pub private_key: String,
    /// ASCII-armored bank public key
    pub bank_public_key: String,
    pub base_url: Option<String>,
}

fn required(name: &str) -> Result<String> {
    env::var(name).map_err(|_| GatewayError::configuration(format!("{} not set", name)))
}

impl MidtransConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server_key: required("MIDTRANS_SERVER_KEY")?,
            base_url: env::var("MIDTRANS_BASE_URL").ok(),
        })
    }
}

impl DokuConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            client_id: required("DOKU_CLIENT_ID")?,
            secret_key: required("DOKU_SECRET_KEY")?,
            base_url: env::var("DOKU_BASE_URL").ok(),
        })
    }
}

impl FaspayConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            merchant_id: required("FASPAY_MERCHANT_ID")?,
            merchant_name: required("FASPAY_MERCHANT_NAME")?,
            user_id: required("FASPAY_USER_ID")?,
            password: required("FASPAY_PASSWORD")?,
            base_url: env::var("FASPAY_BASE_URL").ok(),
        })
    }
}

impl IpaymuConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            api_key: required("IPAYMU_API_KEY")?,
            va: required("IPAYMU_VA")?,
            notify_url: required("IPAYMU_NOTIFY_URL")?,
            base_url: env::var("IPAYMU_BASE_URL").ok(),
        })
    }
}

impl XenditConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            secret_key: required("XENDIT_SECRET_KEY")?,
            callback_token: required("XENDIT_CALLBACK_TOKEN")?,
            base_url: env::var("XENDIT_BASE_URL").ok(),
        })
    }
}

impl DbsConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            client_id: required("DBS_CLIENT_ID")?,
            private_key: required("DBS_PRIVATE_KEY")?,
            bank_public_key: required("DBS_BANK_PUBLIC_KEY")?,
            base_url: env::var("DBS_BASE_URL").ok(),
        })
    }
}

impl Config {
    /// Load configuration from environment variables, reading a `.env` file
    /// if one is present
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            midtrans: MidtransConfig::from_env()?,
            doku: DokuConfig::from_env()?,
            faspay: FaspayConfig::from_env()?,
            ipaymu: IpaymuConfig::from_env()?,
            xendit: XenditConfig::from_env()?,
            dbs: DbsConfig::from_env()?,
            default_provider: env::var("INDOPAY_DEFAULT_PROVIDER").ok(),
        })
    }

    /// Construct every adapter and register it in a [`GatewayService`].
    ///
    /// This is the explicit composition step: hosts that only need a subset
    /// of providers build adapters directly and register them by hand.
    pub fn build_service(&self) -> Result<GatewayService> {
        let mut service = GatewayService::new();

        service.register(Arc::new(MidtransGateway::new(
            self.midtrans.server_key.clone(),
            self.midtrans.base_url.clone(),
        )));
        service.register(Arc::new(DokuGateway::new(
            self.doku.client_id.clone(),
            self.doku.secret_key.clone(),
            self.doku.base_url.clone(),
        )));
        service.register(Arc::new(FaspayGateway::new(
            self.faspay.merchant_id.clone(),
            self.faspay.merchant_name.clone(),
            self.faspay.user_id.clone(),
            self.faspay.password.clone(),
            self.faspay.base_url.clone(),
        )));
        service.register(Arc::new(IpaymuGateway::new(
            self.ipaymu.api_key.clone(),
            self.ipaymu.va.clone(),
            self.ipaymu.notify_url.clone(),
            self.ipaymu.base_url.clone(),
        )));
        service.register(Arc::new(XenditGateway::new(
            self.xendit.secret_key.clone(),
            self.xendit.callback_token.clone(),
            self.xendit.base_url.clone(),
        )));
        service.register(Arc::new(DbsGateway::new(
            self.dbs.client_id.clone(),
            &self.dbs.private_key,
            &self.dbs.bank_public_key,
            self.dbs.base_url.clone(),
        )?));

        if let Some(name) = &self.default_provider {
            service.set_default(name.clone());
        }

        Ok(service)
    }
}
