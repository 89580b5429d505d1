//! Tests for failure categories.

use super::*;
use rstest::rstest;
use serde_json::json;

#[rstest]
#[case(ErrorCode::NotFound, "not found")]
#[case(ErrorCode::ServiceUnavailable, "service unavailable")]
#[case(ErrorCode::Forbidden, "access denied")]
fn blank_messages_take_the_category_default(#[case] code: ErrorCode, #[case] expected: &str) {
    let error = Error::new(code, "  \n");
    assert_eq!(error.code(), code);
    assert_eq!(error.message(), expected);
    assert_eq!(error.to_string(), expected);
}

#[test]
fn supplied_messages_are_kept() {
    let error = Error::conflict("Harbour paddle is full");
    assert_eq!(error.code(), ErrorCode::Conflict);
    assert_eq!(error.to_string(), "Harbour paddle is full");
}

#[rstest]
#[case(ErrorCode::InvalidRequest)]
#[case(ErrorCode::ServiceUnavailable)]
#[case(ErrorCode::InternalError)]
fn codes_serialise_as_their_wire_spelling(#[case] code: ErrorCode) {
    assert_eq!(serde_json::to_value(code).expect("serialises"), json!(code.as_str()));
}

#[test]
fn errors_serialise_code_and_message() {
    let value = serde_json::to_value(Error::unauthorized("token expired")).expect("serialises");
    assert_eq!(
        value,
        json!({"code": "unauthorized", "message": "token expired"})
    );
}
