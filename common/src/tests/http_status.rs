use crate::HttpStatusCode;

#[test]
fn given_status_codes_when_categorized_then_ranges_are_disjoint() {
    // GIVEN / WHEN / THEN
    assert!(HttpStatusCode(204).is_success());
    assert!(!HttpStatusCode(204).is_client_error());
    assert!(HttpStatusCode(404).is_client_error());
    assert!(!HttpStatusCode(404).is_server_error());
    assert!(HttpStatusCode(503).is_server_error());
    assert!(!HttpStatusCode(503).is_success());
}

#[test]
fn given_status_code_when_displayed_then_prints_number() {
    assert_eq!(HttpStatusCode::from(502).to_string(), "502");
}
