//! Mutation calls and the bulk runner against a mock Admin API.

use bespoke_shopify::client::ShopifyClient;
use bespoke_shopify::{MutationOutcome, NewVariant, ShopifyError, products, run_bulk, variants};
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GRAPHQL_PATH: &str = "/admin/api/2024-07/graphql.json";

fn client_for(server: &MockServer) -> ShopifyClient {
    ShopifyClient::new(
        "test-shop.myshopify.com",
        SecretString::from("shpat_test_token"),
        "2024-07",
    )
    .with_base_url(server.uri())
    .with_retry_policy(0, 0)
}

fn delete_response(deleted_id: Option<&str>, user_errors: serde_json::Value) -> serde_json::Value {
    json!({
        "data": {
            "productVariantDelete": {
                "deletedProductVariantId": deleted_id,
                "userErrors": user_errors,
            },
        },
    })
}

#[tokio::test]
async fn delete_variant_returns_echoed_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_partial_json(
            json!({ "variables": { "id": "gid://shopify/ProductVariant/1" } }),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(delete_response(
            Some("gid://shopify/ProductVariant/1"),
            json!([]),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let deleted =
        products::delete_variant(&client_for(&server), "gid://shopify/ProductVariant/1")
            .await
            .unwrap();

    assert_eq!(deleted, "gid://shopify/ProductVariant/1");
}

#[tokio::test]
async fn delete_variant_surfaces_user_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(delete_response(
            None,
            json!([{ "field": ["id"], "message": "Variant does not exist" }]),
        )))
        .mount(&server)
        .await;

    let result =
        products::delete_variant(&client_for(&server), "gid://shopify/ProductVariant/404").await;

    match result {
        Err(ShopifyError::UserError(message)) => {
            assert_eq!(message, "id: Variant does not exist");
        }
        other => panic!("expected UserError, got {other:?}"),
    }
}

#[tokio::test]
async fn mutations_are_attempted_exactly_once() {
    let server = MockServer::start().await;

    // A generous retry allowance must not apply to deletes.
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).with_retry_policy(3, 0);
    let result = products::delete_variant(&client, "gid://shopify/ProductVariant/1").await;

    assert!(matches!(result, Err(ShopifyError::UnexpectedStatus(500))));
}

#[tokio::test]
async fn bulk_delete_continues_past_a_failed_item() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_partial_json(
            json!({ "variables": { "id": "gid://shopify/ProductVariant/1" } }),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(delete_response(
            Some("gid://shopify/ProductVariant/1"),
            json!([]),
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_partial_json(
            json!({ "variables": { "id": "gid://shopify/ProductVariant/2" } }),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(delete_response(
            None,
            json!([{ "field": ["id"], "message": "Variant does not exist" }]),
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_partial_json(
            json!({ "variables": { "id": "gid://shopify/ProductVariant/3" } }),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(delete_response(
            Some("gid://shopify/ProductVariant/3"),
            json!([]),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let ids: Vec<String> = (1..=3)
        .map(|n| format!("gid://shopify/ProductVariant/{n}"))
        .collect();

    let (results, summary) = run_bulk(ids, |id| {
        let client = client.clone();
        async move { products::delete_variant(&client, &id).await }
    })
    .await;

    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.applied, 2);
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.failed, 0);
    assert!(matches!(results[1].1, MutationOutcome::Rejected(_)));
}

#[tokio::test]
async fn create_variant_posts_rest_payload_and_qualifies_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/admin/api/2024-07/products/123/variants.json"))
        .and(body_partial_json(json!({
            "variant": {
                "price": "105.00",
                "sku": "custom-1724600000000",
                "option1": "Custom Size - 0000",
                "inventory_policy": "continue",
            },
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "variant": { "id": 555 } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let new_variant = NewVariant {
        price: "105.00".to_string(),
        sku: "custom-1724600000000".to_string(),
        option_values: vec!["Custom Size - 0000".to_string()],
    };
    let gid = variants::create_variant(&client_for(&server), 123, &new_variant)
        .await
        .unwrap();

    assert_eq!(gid, "gid://shopify/ProductVariant/555");
}

#[tokio::test]
async fn create_variant_maps_422_to_user_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/admin/api/2024-07/products/123/variants.json"))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_json(json!({ "errors": { "base": ["already exists"] } })),
        )
        .mount(&server)
        .await;

    let new_variant = NewVariant {
        price: "10.00".to_string(),
        sku: "custom-1".to_string(),
        option_values: vec!["L".to_string()],
    };
    let result = variants::create_variant(&client_for(&server), 123, &new_variant).await;

    assert!(matches!(result, Err(ShopifyError::UserError(_))));
}

#[tokio::test]
async fn tag_variant_sets_boolean_metafield() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_partial_json(json!({
            "variables": {
                "metafields": [{
                    "ownerId": "gid://shopify/ProductVariant/555",
                    "namespace": "custom",
                    "key": "is_deletable",
                    "type": "boolean",
                    "value": "true",
                }],
            },
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "metafieldsSet": {
                    "metafields": [{ "id": "gid://shopify/Metafield/1" }],
                    "userErrors": [],
                },
            },
        })))
        .expect(1)
        .mount(&server)
        .await;

    variants::tag_variant_deletable(&client_for(&server), "gid://shopify/ProductVariant/555")
        .await
        .unwrap();
}

#[tokio::test]
async fn profile_fallback_scan_finds_assigned_product() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "deliveryProfiles": {
                    "pageInfo": { "hasNextPage": false },
                    "edges": [
                        {
                            "cursor": "c1",
                            "node": {
                                "id": "gid://shopify/DeliveryProfile/1",
                                "profileItems": {
                                    "pageInfo": { "hasNextPage": false },
                                    "edges": [
                                        { "cursor": "a1", "node": { "product": { "id": "gid://shopify/Product/8" } } },
                                    ],
                                },
                            },
                        },
                        {
                            "cursor": "c2",
                            "node": {
                                "id": "gid://shopify/DeliveryProfile/2",
                                "profileItems": {
                                    "pageInfo": { "hasNextPage": false },
                                    "edges": [
                                        { "cursor": "b1", "node": { "product": { "id": "gid://shopify/Product/9" } } },
                                    ],
                                },
                            },
                        },
                    ],
                },
            },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let profile = variants::find_profile_for_product(&client_for(&server), "gid://shopify/Product/9")
        .await
        .unwrap();

    assert_eq!(profile.as_deref(), Some("gid://shopify/DeliveryProfile/2"));
}

#[tokio::test]
async fn profile_fallback_scan_walks_items_beyond_the_inline_page() {
    let server = MockServer::start().await;

    // One profile whose inline item page misses the product but reports more.
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_string_contains("DeliveryProfiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "deliveryProfiles": {
                    "pageInfo": { "hasNextPage": false },
                    "edges": [{
                        "cursor": "c1",
                        "node": {
                            "id": "gid://shopify/DeliveryProfile/1",
                            "profileItems": {
                                "pageInfo": { "hasNextPage": true },
                                "edges": [
                                    { "cursor": "i1", "node": { "product": { "id": "gid://shopify/Product/8" } } },
                                ],
                            },
                        },
                    }],
                },
            },
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_string_contains("DeliveryProfileItems"))
        .and(body_partial_json(json!({ "variables": { "after": null } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "deliveryProfile": {
                    "profileItems": {
                        "pageInfo": { "hasNextPage": true },
                        "edges": [
                            { "cursor": "i1", "node": { "product": { "id": "gid://shopify/Product/8" } } },
                        ],
                    },
                },
            },
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_string_contains("DeliveryProfileItems"))
        .and(body_partial_json(json!({ "variables": { "after": "i1" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "deliveryProfile": {
                    "profileItems": {
                        "pageInfo": { "hasNextPage": false },
                        "edges": [
                            { "cursor": "i2", "node": { "product": { "id": "gid://shopify/Product/9" } } },
                        ],
                    },
                },
            },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let profile = variants::find_profile_for_product(&client_for(&server), "gid://shopify/Product/9")
        .await
        .unwrap();

    assert_eq!(profile.as_deref(), Some("gid://shopify/DeliveryProfile/1"));
}

#[tokio::test]
async fn assign_variant_surfaces_user_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "deliveryProfileUpdate": {
                    "profile": null,
                    "userErrors": [{ "field": null, "message": "Profile not found" }],
                },
            },
        })))
        .mount(&server)
        .await;

    let result = variants::assign_variant_to_profile(
        &client_for(&server),
        "gid://shopify/DeliveryProfile/404",
        "gid://shopify/ProductVariant/1",
    )
    .await;

    match result {
        Err(ShopifyError::UserError(message)) => assert_eq!(message, "Profile not found"),
        other => panic!("expected UserError, got {other:?}"),
    }
}
