//! `schemas.json` must accept exactly the payloads the generated structs accept.

mod common;

use common::repo::FixtureRepo;
use serde_json::{json, Value};
use specforge::generator::{generate_all, GenerationScope, GeneratorKind, PipelineOptions};

fn definitions() -> Value {
    let repo = FixtureRepo::copy_of("blog");
    let options = PipelineOptions {
        scope: GenerationScope::only(&[GeneratorKind::Schemas]),
        ..PipelineOptions::default()
    };
    generate_all(&repo.layout, &options).unwrap();
    let raw = repo.read("shared/src/generated/schemas.json");
    let doc: Value = serde_json::from_str(&raw).unwrap();
    doc["definitions"].clone()
}

fn validator(definitions: &Value, name: &str) -> jsonschema::Validator {
    let schema = &definitions[name];
    assert!(schema.is_object(), "no definition for {name}");
    jsonschema::validator_for(schema).unwrap()
}

#[test]
fn test_every_view_has_a_definition() {
    let defs = definitions();
    let names: Vec<&str> = defs.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(
        names,
        vec!["User", "UserCreate", "UserUpdate", "Post", "PostCreate", "Notification"]
    );
}

#[test]
fn test_user_schema() {
    let defs = definitions();
    let user = validator(&defs, "User");

    assert!(user.is_valid(&json!({"id": 1, "name": "ada", "role": "author"})));
    assert!(user.is_valid(&json!({"id": 1, "name": "ada", "email": "ada@example.com"})));
    // Unknown properties are rejected.
    assert!(!user.is_valid(&json!({"id": 1, "name": "ada", "nickname": "a"})));
    // Enum values are closed.
    assert!(!user.is_valid(&json!({"id": 1, "name": "ada", "role": "admin"})));
    // Length constraints carry over.
    assert!(!user.is_valid(&json!({"id": 1, "name": ""})));
    assert!(!user.is_valid(&json!({"name": "ada"})));
}

#[test]
fn test_variant_schemas() {
    let defs = definitions();

    let create = validator(&defs, "UserCreate");
    assert!(create.is_valid(&json!({"name": "ada"})));
    assert!(!create.is_valid(&json!({"id": 1, "name": "ada"})));
    assert!(!create.is_valid(&json!({})));

    let update = validator(&defs, "UserUpdate");
    assert!(update.is_valid(&json!({})));
    assert!(update.is_valid(&json!({"role": "reader"})));

    assert_eq!(defs["UserCreate"]["required"], json!(["name"]));
    assert_eq!(defs["UserUpdate"]["required"], json!([]));
}

#[test]
fn test_numeric_and_list_constraints() {
    let defs = definitions();
    let post = validator(&defs, "PostCreate");

    assert!(post.is_valid(&json!({"author_id": 3, "title": "Hello"})));
    assert!(post.is_valid(&json!({"author_id": 3, "title": "Hello", "tags": ["rust", "yaml"]})));
    assert!(!post.is_valid(&json!({"author_id": 0, "title": "Hello"})));
    assert!(!post.is_valid(&json!({"author_id": 3, "title": "Hello", "tags": [1]})));
    assert!(!post.is_valid(&json!({"author_id": 3, "title": "x".repeat(121)})));

    assert_eq!(defs["Post"]["properties"]["tags"]["default"], json!([]));
    assert_eq!(defs["Post"]["properties"]["id"]["readOnly"], true);
    assert_eq!(
        defs["Post"]["properties"]["published_at"]["format"],
        "date-time"
    );
}
