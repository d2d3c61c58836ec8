use super::*;
use crate::gateway::ServerGateway;
use crate::transport::test_helpers::{ScriptedTransport, http_error};
use crate::transport::{ApiResponse, Transport};
use serde_json::json;

fn request() -> CreateClaimRequest {
    CreateClaimRequest {
        order_id: 12,
        claim_type: ClaimType::Return,
        reason_type: ReasonType::ChangeOfMind,
        reason: "사이즈가 맞지 않아요".into(),
        items: vec![ClaimItem { order_item_id: 31, quantity: 1, exchange_variant_id: None }],
        estimated_refund_amount: 29_000,
        refund_method: Some(RefundMethod::Original),
        bank_name: None,
        bank_account: None,
        bank_holder: None,
    }
}

fn service(transport: &Arc<ScriptedTransport>) -> ClaimService {
    ClaimService::new(Arc::new(ServerGateway::new(Arc::clone(transport) as Arc<dyn Transport>, "")))
}

#[test]
fn request_serializes_camel_case_without_empty_bank_fields() {
    let value = serde_json::to_value(request()).unwrap();
    assert_eq!(value["orderId"], 12);
    assert_eq!(value["claimType"], "RETURN");
    assert_eq!(value["reasonType"], "CHANGE_OF_MIND");
    assert_eq!(value["items"][0]["orderItemId"], 31);
    assert_eq!(value["refundMethod"], "ORIGINAL");
    assert!(value.get("bankName").is_none());
    assert!(value["items"][0].get("exchangeVariantId").is_none());
}

#[tokio::test]
async fn success_returns_data() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on(CLAIMS_ENDPOINT, Ok(ApiResponse::ok(json!({ "success": true, "data": { "claimId": 5 } })))),
    );
    let service = service(&transport);

    let data = service.create_claim(&request()).await.unwrap();

    assert_eq!(data, json!({ "claimId": 5 }));
    assert!(!service.pending());
    assert_eq!(service.last_error(), None);
    assert_eq!(transport.calls()[0].body.as_ref().unwrap()["orderId"], 12);
}

#[tokio::test]
async fn rejection_uses_response_message_or_default() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on(CLAIMS_ENDPOINT, Ok(ApiResponse::ok(json!({ "success": false, "message": "이미 신청된 주문입니다." }))))
            .on(CLAIMS_ENDPOINT, Ok(ApiResponse::ok(json!({ "success": false })))),
    );
    let service = service(&transport);

    let first = service.create_claim(&request()).await.unwrap_err();
    let second = service.create_claim(&request()).await.unwrap_err();

    assert_eq!(first.0, "이미 신청된 주문입니다.");
    assert_eq!(second.0, CLAIM_REJECTED_MESSAGE);
    assert_eq!(service.last_error().as_deref(), Some(CLAIM_REJECTED_MESSAGE));
}

#[tokio::test]
async fn structured_error_message_wins() {
    let transport = Arc::new(ScriptedTransport::new().on(
        CLAIMS_ENDPOINT,
        Err(http_error(400, &json!({ "error": { "message": "반품 기간이 지났습니다." }, "message": "bad request" }))),
    ));

    let err = service(&transport).create_claim(&request()).await.unwrap_err();
    assert_eq!(err.0, "반품 기간이 지났습니다.");
}

#[tokio::test]
async fn top_level_message_is_next() {
    let transport = Arc::new(
        ScriptedTransport::new().on(CLAIMS_ENDPOINT, Err(http_error(400, &json!({ "message": "잘못된 요청" })))),
    );

    let err = service(&transport).create_claim(&request()).await.unwrap_err();
    assert_eq!(err.0, "잘못된 요청");
}

#[tokio::test]
async fn unreachable_backend_uses_generic_message() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on(CLAIMS_ENDPOINT, Err(ApiError::Network("connection refused".into())))
            .on(CLAIMS_ENDPOINT, Err(ApiError::Timeout("30s".into()))),
    );
    let service = service(&transport);

    let refused = service.create_claim(&request()).await.unwrap_err();
    let timed_out = service.create_claim(&request()).await.unwrap_err();

    assert_eq!(refused.0, CLAIM_FAILED_MESSAGE);
    assert_eq!(timed_out.0, CLAIM_FAILED_MESSAGE);
    assert!(!service.pending());
    assert_eq!(service.last_error().as_deref(), Some(CLAIM_FAILED_MESSAGE));
}

#[tokio::test]
async fn unstructured_http_error_falls_back_to_its_display() {
    let transport = Arc::new(
        ScriptedTransport::new().on(CLAIMS_ENDPOINT, Err(ApiError::from_response(502, "Bad Gateway"))),
    );

    let err = service(&transport).create_claim(&request()).await.unwrap_err();

    assert_eq!(err.0, "request failed (502): Bad Gateway");
}
