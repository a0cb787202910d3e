// Signature symmetry: a signature generated with the correct secret over a
// payload verifies, and mutating any signed field (or the secret) breaks it.

use indopay::gateways::services::doku::{generate_digest, generate_signature as doku_signature};
use indopay::gateways::services::faspay::legacy_signature;
use indopay::gateways::services::ipaymu::generate_signature as ipaymu_signature;
use indopay::{
    DokuGateway, FaspayGateway, GatewayError, MidtransGateway, PaymentGateway, WebhookHeaders,
    XenditGateway,
};
use sha2::{Digest, Sha512};

const SERVER_KEY: &str = "SB-Mid-server-12345";

fn midtrans_payload(order_id: &str, status_code: &str, gross_amount: &str, key: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(format!("{order_id}{status_code}{gross_amount}{key}").as_bytes());
    let signature = hex::encode(hasher.finalize());

    serde_json::json!({
        "transaction_id": "mid-tx-1",
        "order_id": order_id,
        "gross_amount": gross_amount,
        "transaction_status": "settlement",
        "payment_type": "bank_transfer",
        "transaction_time": "2024-02-01 10:15:30",
        "status_code": status_code,
        "signature_key": signature,
    })
    .to_string()
}

#[tokio::test]
async fn midtrans_signature_is_symmetric() {
    let gateway = MidtransGateway::new(SERVER_KEY.to_string(), None);
    let headers = WebhookHeaders::new();

    // ORDER-101 / 200 / 10000.00 signed with the server key
    let good = midtrans_payload("ORDER-101", "200", "10000.00", SERVER_KEY);
    assert!(gateway.verify_signature(&good, &headers).await.unwrap());

    // Signed with the wrong key
    let wrong_key = midtrans_payload("ORDER-101", "200", "10000.00", "other-key");
    assert!(matches!(
        gateway.verify_signature(&wrong_key, &headers).await,
        Err(GatewayError::SignatureVerification(_))
    ));

    // Each signed field tampered after signing
    for (field, from, to) in [
        ("order_id", "ORDER-101", "ORDER-999"),
        ("status_code", "\"200\"", "\"201\""),
        ("gross_amount", "10000.00", "99999.00"),
    ] {
        let tampered = good.replace(from, to);
        let result = gateway.verify_signature(&tampered, &headers).await;
        assert!(
            matches!(result, Err(GatewayError::SignatureVerification(_))),
            "tampered {field} must fail verification"
        );
    }
}

#[tokio::test]
async fn faspay_signature_is_symmetric() {
    let gateway = FaspayGateway::new(
        "31932".to_string(),
        "IndoPay Store".to_string(),
        "bot31932".to_string(),
        "p@ssw0rd".to_string(),
        None,
    );
    let headers = WebhookHeaders::new();

    let notification = |bill_no: &str, code: &str, signature: &str| {
        format!(
            "<faspay>\
             <request>Payment Notification</request>\
             <trx_id>3193200100001</trx_id>\
             <bill_no>{bill_no}</bill_no>\
             <payment_status_code>{code}</payment_status_code>\
             <payment_total>25000</payment_total>\
             <signature>{signature}</signature>\
             <payment_date>2024-02-01 10:15:30</payment_date>\
             </faspay>"
        )
    };

    // payment_status_code '2' signed as SHA1(MD5(user+pass) + bill_no + '2')
    let signature = legacy_signature("bot31932", "p@ssw0rd", "ORDER-1012");
    let good = notification("ORDER-101", "2", &signature);
    assert!(gateway.verify_signature(&good, &headers).await.unwrap());

    // Same signature over a different bill_no or status code fails
    for payload in [
        notification("ORDER-999", "2", &signature),
        notification("ORDER-101", "8", &signature),
        notification("ORDER-101", "2", "0000000000000000000000000000000000000000"),
    ] {
        assert!(matches!(
            gateway.verify_signature(&payload, &headers).await,
            Err(GatewayError::SignatureVerification(_))
        ));
    }
}

#[tokio::test]
async fn doku_signature_is_symmetric() {
    let gateway = DokuGateway::new("CLIENT-123".to_string(), "SECRET-ABC".to_string(), None);
    let body = r#"{"order":{"invoice_number":"ORDER-101","amount":"150000"}}"#;

    let headers_for = |body: &str, secret: &str| -> WebhookHeaders {
        let digest = generate_digest(body);
        let signature = doku_signature(
            "CLIENT-123",
            "req-1",
            "2024-02-01T10:15:30Z",
            "/payments/notifications",
            &digest,
            secret,
        );
        [
            ("client-id", "CLIENT-123".to_string()),
            ("request-id", "req-1".to_string()),
            ("request-timestamp", "2024-02-01T10:15:30Z".to_string()),
            ("request-target", "/payments/notifications".to_string()),
            ("signature", signature),
        ]
        .into_iter()
        .collect()
    };

    // Valid five-line reconstruction
    let headers = headers_for(body, "SECRET-ABC");
    assert!(gateway.verify_signature(body, &headers).await.unwrap());

    // Tampering the body changes the digest and breaks the signature
    let tampered = body.replace("150000", "999999");
    assert!(matches!(
        gateway.verify_signature(&tampered, &headers).await,
        Err(GatewayError::SignatureVerification(_))
    ));

    // Signature produced with a different secret fails
    let wrong_secret = headers_for(body, "SECRET-XYZ");
    assert!(matches!(
        gateway.verify_signature(body, &wrong_secret).await,
        Err(GatewayError::SignatureVerification(_))
    ));
}

#[tokio::test]
async fn xendit_token_compare_fails_closed() {
    let gateway = XenditGateway::new(
        "xnd_development_123".to_string(),
        "callback-token-abc".to_string(),
        None,
    );

    let with_token = |token: &str| -> WebhookHeaders {
        [("x-callback-token", token)].into_iter().collect()
    };

    assert!(gateway
        .verify_signature("{}", &with_token("callback-token-abc"))
        .await
        .unwrap());

    assert!(matches!(
        gateway.verify_signature("{}", &with_token("wrong")).await,
        Err(GatewayError::SignatureVerification(_))
    ));

    // Missing header is an error, never a silent false
    assert!(matches!(
        gateway.verify_signature("{}", &WebhookHeaders::new()).await,
        Err(GatewayError::SignatureVerification(_))
    ));
}

#[test]
fn ipaymu_request_signature_covers_every_component() {
    let base = ipaymu_signature(r#"{"amount":"1"}"#, "POST", "VA-1", "KEY-1");

    assert_ne!(base, ipaymu_signature(r#"{"amount":"2"}"#, "POST", "VA-1", "KEY-1"));
    assert_ne!(base, ipaymu_signature(r#"{"amount":"1"}"#, "GET", "VA-1", "KEY-1"));
    assert_ne!(base, ipaymu_signature(r#"{"amount":"1"}"#, "POST", "VA-2", "KEY-1"));
    assert_ne!(base, ipaymu_signature(r#"{"amount":"1"}"#, "POST", "VA-1", "KEY-2"));
    // Method casing is normalized
    assert_eq!(base, ipaymu_signature(r#"{"amount":"1"}"#, "post", "VA-1", "KEY-1"));
}
