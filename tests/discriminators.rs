//! Discriminator Variant Tests
//!
//! Variants selected by a tag field, at the top level and inside arrays
//! of embedded documents:
//! 1. Variant resolution on construction and hydration
//! 2. Queries through variant-only map fields
//! 3. Per-element mutation inside discriminated arrays
//! 4. Variant models pinned to their tag

use std::sync::Arc;

use aerodoc::document::FieldValue;
use aerodoc::{FieldDef, MemoryStore, Model, Schema, UpdateOptions};
use indexmap::IndexMap;
use serde_json::json;

fn company_schema() -> Schema {
    let employee = Schema::inline(IndexMap::new())
        .field("name", FieldDef::string().required())
        .with_discriminator(
            "Engineer",
            Schema::inline(IndexMap::new()).field("apiKeys", FieldDef::map_of(FieldDef::string())),
        )
        .with_discriminator(
            "Designer",
            Schema::inline(IndexMap::new()).field("portfolio", FieldDef::string()),
        );
    Schema::new("companies", "v1", IndexMap::new())
        .field("name", FieldDef::string())
        .field("employees", FieldDef::array_of(FieldDef::embedded(employee)))
}

fn event_schema() -> Schema {
    Schema::new("events", "v1", IndexMap::new())
        .field("name", FieldDef::string())
        .with_discriminator(
            "Clicked",
            Schema::inline(IndexMap::new()).field("element", FieldDef::string()),
        )
        .with_discriminator(
            "Purchased",
            Schema::inline(IndexMap::new()).field("prices", FieldDef::map_of(FieldDef::number())),
        )
}

async fn seeded_company(store: Arc<MemoryStore>) -> Model<MemoryStore> {
    let model = Model::new("companies", company_schema(), store).unwrap();
    model
        .create(&json!({
            "name": "acme",
            "employees": [
                {"__t": "Engineer", "name": "ada", "apiKeys": {"github": "gh-1", "npm": "npm-1"}},
                {"__t": "Designer", "name": "dan", "portfolio": "https://dan.example"}
            ]
        }))
        .await
        .unwrap();
    model
        .create(&json!({
            "name": "other",
            "employees": [{"__t": "Engineer", "name": "eve", "apiKeys": {"github": "gh-2"}}]
        }))
        .await
        .unwrap();
    model
}

// =============================================================================
// ARRAY ELEMENT VARIANTS
// =============================================================================

/// Each array element resolves its own variant.
#[tokio::test]
async fn test_elements_resolve_their_variant() {
    let model = seeded_company(Arc::new(MemoryStore::new())).await;
    let acme = model.find_one(&json!({"name": "acme"})).await.unwrap().unwrap();

    let employees = acme.get("employees").and_then(FieldValue::as_array).unwrap();
    let variants: Vec<Option<&str>> = employees
        .iter()
        .map(|e| e.as_document().and_then(|doc| doc.variant()))
        .collect();
    assert_eq!(variants, vec![Some("Engineer"), Some("Designer")]);

    let keys = employees[0].as_document().unwrap().map("apiKeys").unwrap();
    assert_eq!(keys.entry_path("github"), "employees.0.apiKeys.github");
    assert!(employees[1].as_document().unwrap().map("apiKeys").is_none());
}

/// Variant-only map entries are queryable by dotted path.
#[tokio::test]
async fn test_query_variant_map_entry() {
    let model = seeded_company(Arc::new(MemoryStore::new())).await;

    let found = model
        .find(&json!({"employees.apiKeys.github": "gh-1"}))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(
        found[0].get("name"),
        Some(&FieldValue::String("acme".to_string()))
    );

    let nested = model
        .find(&json!({"employees": {"apiKeys": {"github": "gh-1"}}}))
        .await
        .unwrap();
    assert_eq!(nested, found);

    let with_keys = model
        .find(&json!({"employees.apiKeys.github": {"$exists": true}}))
        .await
        .unwrap();
    assert_eq!(with_keys.len(), 2);
}

/// Mutating one element's map leaves sibling elements untouched.
#[tokio::test]
async fn test_mutate_one_element() {
    let store = Arc::new(MemoryStore::new());
    let model = seeded_company(Arc::clone(&store)).await;
    let mut acme = model.find_one(&json!({"name": "acme"})).await.unwrap().unwrap();
    let before = store.documents("companies").unwrap()[0].clone();

    acme.set("employees.0.apiKeys.github", "gh-rotated").unwrap();
    assert!(acme.set("employees.1.apiKeys.github", "nope").is_err());
    assert_eq!(
        acme.delta(),
        vec![(
            "employees.0.apiKeys.github".to_string(),
            Some(json!("gh-rotated"))
        )]
    );
    model.save(&mut acme).await.unwrap();

    let after = store.documents("companies").unwrap()[0].clone();
    assert_eq!(after["employees"][0]["apiKeys"]["github"], json!("gh-rotated"));
    assert_eq!(after["employees"][0]["apiKeys"]["npm"], json!("npm-1"));
    assert_eq!(after["employees"][1], before["employees"][1]);

    let rotated = model
        .find(&json!({"employees.apiKeys.github": "gh-rotated"}))
        .await
        .unwrap();
    assert_eq!(rotated.len(), 1);
    assert!(model
        .find(&json!({"employees.apiKeys.github": "gh-1"}))
        .await
        .unwrap()
        .is_empty());
}

/// Entry updates address array elements by index.
#[tokio::test]
async fn test_update_element_entry_by_index() {
    let store = Arc::new(MemoryStore::new());
    let model = seeded_company(Arc::clone(&store)).await;

    let result = model
        .update_one(
            &json!({"name": "other"}),
            &json!({"$set": {"employees.0.apiKeys.npm": "npm-2"}}),
            UpdateOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(result.modified, 1);

    let other = &store.documents("companies").unwrap()[1];
    assert_eq!(
        other["employees"][0]["apiKeys"],
        json!({"github": "gh-2", "npm": "npm-2"})
    );
}

// =============================================================================
// VARIANT MODELS
// =============================================================================

/// Variant models tag their documents and only see their variant.
#[tokio::test]
async fn test_variant_models_are_pinned() {
    let store = Arc::new(MemoryStore::new());
    let events = Model::new("events", event_schema(), Arc::clone(&store)).unwrap();
    let clicked = events.discriminator("Clicked").unwrap();
    let purchased = events.discriminator("Purchased").unwrap();

    clicked
        .create(&json!({"name": "c", "element": "buy-button"}))
        .await
        .unwrap();
    let created = purchased
        .create(&json!({"name": "p", "prices": {"book": "12.5"}}))
        .await
        .unwrap();
    assert_eq!(created.variant(), Some("Purchased"));

    let stored = store.documents("events").unwrap();
    assert_eq!(stored[0]["__t"], json!("Clicked"));
    assert_eq!(stored[1]["__t"], json!("Purchased"));
    assert_eq!(stored[1]["prices"]["book"], json!(12.5));

    assert_eq!(events.find(&json!({})).await.unwrap().len(), 2);
    assert_eq!(clicked.find(&json!({})).await.unwrap().len(), 1);
    assert_eq!(
        purchased.find(&json!({"prices.book": "12.5"})).await.unwrap().len(),
        1
    );

    let all = events.find(&json!({})).await.unwrap();
    let variants: Vec<Option<&str>> = all.iter().map(|doc| doc.variant()).collect();
    assert_eq!(variants, vec![Some("Clicked"), Some("Purchased")]);

    let result = purchased
        .update_one(
            &json!({"name": "c"}),
            &json!({"prices.book": 1}),
            UpdateOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(result.matched, 0);
}

/// An upsert through a variant model inserts a tagged document.
#[tokio::test]
async fn test_variant_upsert_tags_document() {
    let store = Arc::new(MemoryStore::new());
    let events = Model::new("events", event_schema(), Arc::clone(&store)).unwrap();
    let purchased = events.discriminator("Purchased").unwrap();

    let result = purchased
        .update_one(
            &json!({"name": "late"}),
            &json!({"$set": {"prices.tea": 3}}),
            UpdateOptions::upsert(),
        )
        .await
        .unwrap();
    assert!(result.upserted_id.is_some());

    let stored = &store.documents("events").unwrap()[0];
    assert_eq!(stored["__t"], json!("Purchased"));
    assert_eq!(stored["name"], json!("late"));
    assert_eq!(stored["prices"], json!({"tea": 3}));

    let doc = events.find_one(&json!({"name": "late"})).await.unwrap().unwrap();
    assert_eq!(doc.variant(), Some("Purchased"));
}

/// Unknown tags fall back to the base schema.
#[tokio::test]
async fn test_unknown_tag_uses_base_schema() {
    let events = Model::new("events", event_schema(), Arc::new(MemoryStore::new())).unwrap();
    let doc = events
        .new_document(&json!({"__t": "Hovered", "name": "h", "element": "x"}))
        .unwrap();

    assert_eq!(doc.variant(), None);
    assert!(doc.get("element").is_none());
    assert!(doc.get("__t").is_none());
}
