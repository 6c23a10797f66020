//! Integration test for OpenAPI loading and the schema index

use apidispatch_common::{DispatchError, ParameterLocation, PathShape, PrimitiveKind};
use apidispatch_parser::openapi::OpenApiParser;
use apidispatch_parser::SchemaIndex;

const PAYMENTS_API: &str = include_str!("fixtures/payments_api.json");

fn index() -> SchemaIndex {
    OpenApiParser::from_json(PAYMENTS_API)
        .expect("fixture should parse")
        .parse()
        .expect("fixture should index")
}

#[test]
fn test_enumeration_is_sorted_and_shape_filtered() {
    let index = index();
    let ids: Vec<&str> = index.operation_ids().collect();

    assert_eq!(
        ids,
        vec![
            "DeleteAccountsAccount",
            "DeleteCustomersCustomer",
            "DeleteSubscriptionsSubscriptionExposedId",
            "GetAccount",
            "GetAccounts",
            "GetAccountsAccount",
            "GetBalance",
            "GetBalanceTransactionsId",
            "GetCustomers",
            "GetCustomersCustomer",
            "GetSetupIntents",
            "GetSetupIntentsIntent",
            "GetSubscriptionsSubscriptionExposedId",
            "PostAccounts",
            "PostCustomers",
            "PostCustomersCustomer",
            "PostSetupIntents",
        ]
    );

    // Enumeration is restartable and stable
    let again: Vec<&str> = index.operation_ids().collect();
    assert_eq!(ids, again);
}

#[test]
fn test_nested_paths_are_invisible() {
    let index = index();
    for id in [
        "GetAccountsAccountExternalAccounts",
        "PostBillingPortalSessions",
        "GetCustomersCustomerSources",
    ] {
        assert!(
            matches!(index.find_operation(id), Err(DispatchError::OperationNotFound(_))),
            "{} should not be indexed",
            id
        );
    }
}

#[test]
fn test_record_extraction() {
    let index = index();

    let record = index.find_operation("GetCustomersCustomer").unwrap();
    assert_eq!(record.shape, PathShape::Detail);
    assert_eq!(record.path, "/v1/customers/{customer}");
    assert_eq!(
        record.description.as_deref(),
        Some("Retrieves a Customer object.")
    );
    assert_eq!(record.identifier_name(), "customer");

    // Path-level parameter merged with a $ref'd operation parameter
    let names: Vec<(&str, ParameterLocation)> = record
        .parameters
        .iter()
        .map(|p| (p.name.as_str(), p.location))
        .collect();
    assert_eq!(
        names,
        vec![
            ("customer", ParameterLocation::Path),
            ("expand", ParameterLocation::Query)
        ]
    );

    let record = index.find_operation("PostCustomers").unwrap();
    assert_eq!(record.shape, PathShape::Collection);
    assert_eq!(record.identifier_name(), "id");
    let kinds: Vec<(&str, PrimitiveKind)> = record
        .body_fields
        .iter()
        .map(|f| (f.name.as_str(), f.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("address", PrimitiveKind::Object),
            ("balance", PrimitiveKind::Integer),
            ("email", PrimitiveKind::String),
            ("metadata", PrimitiveKind::Unknown),
            ("name", PrimitiveKind::String),
            ("tax_exempt", PrimitiveKind::Boolean),
        ]
    );

    let record = index.find_operation("PostSetupIntents").unwrap();
    let usage = record.body_fields.iter().find(|f| f.name == "usage").unwrap();
    assert!(usage.required);
}
