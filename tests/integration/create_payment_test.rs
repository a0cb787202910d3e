// End-to-end create_payment flows against mock provider endpoints: payload
// construction, outbound auth headers, response validation, in-band
// rejection, and canonical mapping.

use indopay::{
    CreatePaymentInput, CustomerDetails, DbsGateway, DokuGateway, FaspayGateway, GatewayError,
    IpaymuGateway, MidtransGateway, PaymentGateway, PaymentMethodType, PaymentStatus,
    XenditGateway,
};
use rust_decimal_macros::dec;
use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DBS_PRIVATE_KEY: &str = include_str!("../fixtures/dbs_private.asc");
const DBS_PUBLIC_KEY: &str = include_str!("../fixtures/dbs_public.asc");

fn sample_input(payment_method: PaymentMethodType) -> CreatePaymentInput {
    CreatePaymentInput {
        amount: dec!(10000),
        currency: "IDR".to_string(),
        reference_id: "ORDER-101".to_string(),
        payment_method,
        customer: CustomerDetails {
            email: "jules@example.com".to_string(),
            first_name: "Jules".to_string(),
            last_name: Some("Agent".to_string()),
            phone: Some("0811111111".to_string()),
        },
        metadata: None,
        description: Some("Order 101".to_string()),
    }
}

#[tokio::test]
async fn midtrans_charge_maps_to_canonical_transaction() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/charge"))
        .and(header_exists("authorization"))
        .and(body_string_contains("\"order_id\":\"ORDER-101\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "transaction_id": "mid-tx-1",
            "order_id": "ORDER-101",
            "gross_amount": "10000.00",
            "currency": "IDR",
            "transaction_status": "pending",
            "payment_type": "bank_transfer",
            "transaction_time": "2024-02-01 10:15:30",
            "status_code": "201",
            "status_message": "Success, Bank Transfer transaction is created"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = MidtransGateway::new("SB-Mid-server-12345".to_string(), Some(server.uri()));
    let transaction = gateway
        .create_payment(&sample_input(PaymentMethodType::VirtualAccount))
        .await
        .unwrap();

    assert_eq!(transaction.id, "mid-tx-1");
    assert_eq!(transaction.reference_id, "ORDER-101");
    assert_eq!(transaction.amount, dec!(10000.00));
    assert_eq!(transaction.status, PaymentStatus::Pending);
    assert_eq!(transaction.raw_response["status_code"], "201");
}

#[tokio::test]
async fn midtrans_in_band_rejection_raises_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/charge"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status_code": "406",
            "status_message": "The request could not be completed due to a conflict",
            "id": "irrelevant"
        })))
        .mount(&server)
        .await;

    let gateway = MidtransGateway::new("SB-Mid-server-12345".to_string(), Some(server.uri()));
    let result = gateway
        .create_payment(&sample_input(PaymentMethodType::CreditCard))
        .await;

    match result {
        Err(GatewayError::Provider { code, .. }) => assert_eq!(code, "406"),
        other => panic!("expected provider error, got {other:?}"),
    }
}

#[tokio::test]
async fn midtrans_unauthorized_is_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/charge"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let gateway = MidtransGateway::new("bad-key".to_string(), Some(server.uri()));
    let result = gateway
        .create_payment(&sample_input(PaymentMethodType::CreditCard))
        .await;
    assert!(matches!(result, Err(GatewayError::Authentication(_))));
}

#[tokio::test]
async fn doku_checkout_sends_signed_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/checkout/v1/payment"))
        .and(header("Client-Id", "CLIENT-123"))
        .and(header_exists("Request-Id"))
        .and(header_exists("Request-Timestamp"))
        .and(header_exists("Signature"))
        .and(header_exists("Digest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "order": {"invoice_number": "ORDER-101", "amount": "10000"},
            "virtual_account_info": {"virtual_account_number": "8889990011223344"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = DokuGateway::new(
        "CLIENT-123".to_string(),
        "SECRET-ABC".to_string(),
        Some(server.uri()),
    );
    let transaction = gateway
        .create_payment(&sample_input(PaymentMethodType::VirtualAccount))
        .await
        .unwrap();

    assert_eq!(transaction.reference_id, "ORDER-101");
    assert_eq!(transaction.status, PaymentStatus::Pending);
    assert_eq!(
        transaction.metadata.unwrap()["virtual_account"],
        "8889990011223344"
    );
}

#[tokio::test]
async fn faspay_post_data_transaction_round_trips_xml() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cvr/31932/10"))
        .and(body_string_contains("<bill_no>ORDER-101</bill_no>"))
        .and(body_string_contains("<signature>"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<faspay>\
             <response>Post Data Transaction</response>\
             <response_code>00</response_code>\
             <trx_id>3193200100001</trx_id>\
             <bill_no>ORDER-101</bill_no>\
             <bill_total>10000</bill_total>\
             <redirect_url>https://dev.faspay.co.id/pws/100003/2830000010100000</redirect_url>\
             </faspay>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = FaspayGateway::new(
        "31932".to_string(),
        "IndoPay Store".to_string(),
        "bot31932".to_string(),
        "p@ssw0rd".to_string(),
        Some(server.uri()),
    );
    let transaction = gateway
        .create_payment(&sample_input(PaymentMethodType::VirtualAccount))
        .await
        .unwrap();

    assert_eq!(transaction.id, "3193200100001");
    assert_eq!(transaction.reference_id, "ORDER-101");
    assert_eq!(transaction.status, PaymentStatus::Pending);
}

#[tokio::test]
async fn faspay_non_zero_response_code_raises_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cvr/31932/10"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<faspay>\
             <response>Post Data Transaction</response>\
             <response_code>55</response_code>\
             <response_desc>Wrong signature</response_desc>\
             <trx_id></trx_id>\
             <bill_no>ORDER-101</bill_no>\
             <bill_total>10000</bill_total>\
             </faspay>",
        ))
        .mount(&server)
        .await;

    let gateway = FaspayGateway::new(
        "31932".to_string(),
        "IndoPay Store".to_string(),
        "bot31932".to_string(),
        "wrong".to_string(),
        Some(server.uri()),
    );
    let result = gateway
        .create_payment(&sample_input(PaymentMethodType::VirtualAccount))
        .await;

    match result {
        Err(GatewayError::Provider { code, message }) => {
            assert_eq!(code, "55");
            assert_eq!(message, "Wrong signature");
        }
        other => panic!("expected provider error, got {other:?}"),
    }
}

#[tokio::test]
async fn ipaymu_direct_payment_sends_signature_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payment/direct"))
        .and(header_exists("signature"))
        .and(header("va", "0000001234567890"))
        .and(header_exists("timestamp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "Status": 200,
            "Success": true,
            "Message": "success",
            "Data": {
                "SessionID": "sess-1",
                "TransactionID": 118,
                "ReferenceId": "ORDER-101",
                "Via": "va",
                "Channel": "bca",
                "PaymentNo": "8800111222333",
                "Total": 10000,
                "Expired": "2024-02-02 10:15:30"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = IpaymuGateway::new(
        "SANDBOX-API-KEY".to_string(),
        "0000001234567890".to_string(),
        "https://merchant.example.com/notify".to_string(),
        Some(server.uri()),
    );
    let transaction = gateway
        .create_payment(&sample_input(PaymentMethodType::VirtualAccount))
        .await
        .unwrap();

    assert_eq!(transaction.id, "118");
    assert_eq!(transaction.reference_id, "ORDER-101");
    assert_eq!(transaction.amount, dec!(10000));
    assert_eq!(transaction.metadata.unwrap()["payment_no"], "8800111222333");
}

#[tokio::test]
async fn ipaymu_unsuccessful_body_raises_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payment/direct"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "Status": 401,
            "Success": false,
            "Message": "signature does not match"
        })))
        .mount(&server)
        .await;

    let gateway = IpaymuGateway::new(
        "WRONG-KEY".to_string(),
        "0000001234567890".to_string(),
        "https://merchant.example.com/notify".to_string(),
        Some(server.uri()),
    );
    let result = gateway
        .create_payment(&sample_input(PaymentMethodType::VirtualAccount))
        .await;

    match result {
        Err(GatewayError::Provider { code, message }) => {
            assert_eq!(code, "401");
            assert_eq!(message, "signature does not match");
        }
        other => panic!("expected provider error, got {other:?}"),
    }
}

#[tokio::test]
async fn xendit_invoice_maps_to_canonical_transaction() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/invoices"))
        .and(header_exists("authorization"))
        .and(body_string_contains("\"external_id\":\"ORDER-101\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "inv-5f27",
            "external_id": "ORDER-101",
            "user_id": "user-1",
            "status": "PENDING",
            "merchant_name": "IndoPay Store",
            "amount": 10000,
            "invoice_url": "https://checkout.xendit.co/web/inv-5f27",
            "expiry_date": "2024-02-02T10:15:30.000Z",
            "created": "2024-02-01T10:15:30.000Z",
            "updated": "2024-02-01T10:15:30.000Z",
            "currency": "IDR"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = XenditGateway::new(
        "xnd_development_123".to_string(),
        "callback-token-abc".to_string(),
        Some(server.uri()),
    );
    let transaction = gateway
        .create_payment(&sample_input(PaymentMethodType::Ewallet))
        .await
        .unwrap();

    assert_eq!(transaction.id, "inv-5f27");
    assert_eq!(transaction.reference_id, "ORDER-101");
    assert_eq!(transaction.status, PaymentStatus::Pending);
    assert_eq!(
        transaction.metadata.unwrap()["invoice_url"],
        "https://checkout.xendit.co/web/inv-5f27"
    );
}

#[tokio::test]
async fn xendit_error_body_carries_provider_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/invoices"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error_code": "DUPLICATE_CALLBACK_ERROR",
            "message": "External id has been used before"
        })))
        .mount(&server)
        .await;

    let gateway = XenditGateway::new(
        "xnd_development_123".to_string(),
        "callback-token-abc".to_string(),
        Some(server.uri()),
    );
    let result = gateway
        .create_payment(&sample_input(PaymentMethodType::Ewallet))
        .await;

    match result {
        Err(GatewayError::Provider { code, .. }) => {
            assert_eq!(code, "DUPLICATE_CALLBACK_ERROR")
        }
        other => panic!("expected provider error, got {other:?}"),
    }
}

#[tokio::test]
async fn dbs_payment_round_trips_pgp_ciphertext() {
    use indopay::gateways::services::dbs::encrypt_payload;
    use pgp::composed::{Deserializable, SignedPublicKey};

    let (bank_key, _) = SignedPublicKey::from_string(DBS_PUBLIC_KEY).unwrap();
    let response_plaintext = serde_json::json!({
        "header": {
            "msgId": "1706780130000",
            "orgId": "MERCHANT-77",
            "timeStamp": "2024-02-01T10:15:30+00:00",
            "ctry": "ID"
        },
        "txnInfo": {
            "txnType": "ACT",
            "customerReference": "ORDER-101",
            "txnRefId": "DBS-REF-9",
            "txnDate": "2024-02-01",
            "txnAmount": "10000",
            "txnCcy": "IDR",
            "txnStatus": "ACTC"
        }
    })
    .to_string();
    // Same keypair plays both roles in the test: the adapter encrypts to it
    // and decrypts with it
    let response_ciphertext = encrypt_payload(&response_plaintext, &bank_key).unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/payments"))
        .and(header("X-Client-ID", "MERCHANT-77"))
        .and(header("Content-Type", "text/plain"))
        .and(body_string_contains("BEGIN PGP MESSAGE"))
        .respond_with(ResponseTemplate::new(200).set_body_string(response_ciphertext))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = DbsGateway::new(
        "MERCHANT-77".to_string(),
        DBS_PRIVATE_KEY,
        DBS_PUBLIC_KEY,
        Some(server.uri()),
    )
    .unwrap();

    let transaction = gateway
        .create_payment(&sample_input(PaymentMethodType::DirectDebit))
        .await
        .unwrap();

    assert_eq!(transaction.id, "DBS-REF-9");
    assert_eq!(transaction.reference_id, "ORDER-101");
    assert_eq!(transaction.amount, dec!(10000));
    assert_eq!(transaction.status, PaymentStatus::Paid);
}

#[tokio::test]
async fn dbs_rejected_transaction_raises_provider_error() {
    use indopay::gateways::services::dbs::encrypt_payload;
    use pgp::composed::{Deserializable, SignedPublicKey};

    let (bank_key, _) = SignedPublicKey::from_string(DBS_PUBLIC_KEY).unwrap();
    let response_plaintext = serde_json::json!({
        "header": {
            "msgId": "1706780130001",
            "orgId": "MERCHANT-77",
            "timeStamp": "2024-02-01T10:15:30+00:00",
            "ctry": "ID"
        },
        "txnInfo": {
            "txnType": "ACT",
            "customerReference": "ORDER-101",
            "txnRefId": "DBS-REF-10",
            "txnDate": "2024-02-01",
            "txnAmount": "10000",
            "txnCcy": "IDR",
            "txnStatus": "RJCT",
            "txnStatusDescription": "Insufficient funds"
        }
    })
    .to_string();
    let response_ciphertext = encrypt_payload(&response_plaintext, &bank_key).unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/payments"))
        .respond_with(ResponseTemplate::new(200).set_body_string(response_ciphertext))
        .mount(&server)
        .await;

    let gateway = DbsGateway::new(
        "MERCHANT-77".to_string(),
        DBS_PRIVATE_KEY,
        DBS_PUBLIC_KEY,
        Some(server.uri()),
    )
    .unwrap();

    let result = gateway
        .create_payment(&sample_input(PaymentMethodType::DirectDebit))
        .await;

    match result {
        Err(GatewayError::Provider { code, message }) => {
            assert_eq!(code, "DBS_REJECTED");
            assert_eq!(message, "Insufficient funds");
        }
        other => panic!("expected provider error, got {other:?}"),
    }
}

#[tokio::test]
async fn invalid_input_is_rejected_before_any_network_call() {
    // No mock server: a network attempt would fail loudly
    let gateway = MidtransGateway::new(
        "SB-Mid-server-12345".to_string(),
        Some("http://127.0.0.1:1".to_string()),
    );

    let mut input = sample_input(PaymentMethodType::CreditCard);
    input.amount = dec!(-10);

    let result = gateway.create_payment(&input).await;
    assert!(matches!(result, Err(GatewayError::Validation(_))));
}
