//! End-to-end generation over the multi-service `blog` fixture.

mod common;

use common::repo::FixtureRepo;
use specforge::generator::{
    generate_all, GenerationScope, GeneratorKind, PipelineError, PipelineOptions, WriteOutcome,
};

const HEADER: &str =
    "// @generated by specforge. Do not edit; changes are overwritten on the next run.";

fn generate(repo: &FixtureRepo) {
    generate_all(&repo.layout, &PipelineOptions::default()).expect("generation succeeds");
}

#[test]
fn test_every_service_gets_its_artifacts() {
    let repo = FixtureRepo::copy_of("blog");
    generate(&repo);

    for rel in [
        "shared/src/generated/schemas.rs",
        "shared/src/generated/schemas.json",
        "shared/src/generated/events.rs",
        "shared/src/generated/mod.rs",
        "services/backend/src/generated/contracts/users.rs",
        "services/backend/src/generated/contracts/posts.rs",
        "services/backend/src/generated/web/users.rs",
        "services/backend/src/generated/web/posts.rs",
        "services/backend/src/generated/registry.rs",
        "services/backend/src/handlers/users.rs",
        "services/backend/src/handlers/posts.rs",
        "services/backend/doc/openapi.yaml",
        "services/notifier/src/generated/contracts/notifications.rs",
        "services/notifier/src/generated/bus_adapter.rs",
        "services/notifier/src/generated/registry.rs",
        "services/notifier/src/handlers/notifications.rs",
        "services/frontend/src/generated/clients/backend.rs",
        "services/frontend/src/generated/mod.rs",
        "shared/generated/types.ts",
    ] {
        assert!(repo.exists(rel), "missing {rel}");
    }

    // Only subscribers get a bus adapter, only web domains get a document.
    assert!(!repo.exists("services/backend/src/generated/bus_adapter.rs"));
    assert!(!repo.exists("services/notifier/src/generated/web"));
    assert!(!repo.exists("services/notifier/doc/openapi.yaml"));
    assert!(!repo.exists("services/frontend/src/handlers"));
}

#[test]
fn test_generated_mod_files() {
    let repo = FixtureRepo::copy_of("blog");
    generate(&repo);

    assert_eq!(
        repo.read("services/backend/src/generated/mod.rs"),
        format!("{HEADER}\n\npub mod contracts;\npub mod web;\npub mod registry;\n")
    );
    assert_eq!(
        repo.read("services/notifier/src/generated/mod.rs"),
        format!("{HEADER}\n\npub mod contracts;\npub mod bus_adapter;\npub mod registry;\n")
    );
    assert_eq!(
        repo.read("services/frontend/src/generated/mod.rs"),
        format!("{HEADER}\n\npub mod clients;\n")
    );
    assert_eq!(
        repo.read("services/backend/src/handlers/mod.rs"),
        format!("{HEADER}\n\npub mod posts;\npub mod users;\n")
    );
}

#[test]
fn test_schemas_follow_models() {
    let repo = FixtureRepo::copy_of("blog");
    generate(&repo);

    let schemas = repo.read("shared/src/generated/schemas.rs");
    for ty in ["User", "UserCreate", "UserUpdate", "Post", "PostCreate", "Notification"] {
        assert!(schemas.contains(&format!("pub struct {ty} {{")), "missing {ty}");
    }
    assert!(schemas.contains("pub enum UserRole {"));
    assert!(schemas.contains("#[serde(default = \"default_post_tags\")]"));
    assert!(schemas.contains("vec![]"));
    assert!(schemas.contains("/// Contact address"));

    let events = repo.read("shared/src/generated/events.rs");
    assert!(events.contains("pub const POST_PUBLISHED: &str = \"post.published\";"));
    assert!(events.contains("pub const NOTIFICATION_REQUESTED: &str = \"notification.requested\";"));
}

#[test]
fn test_web_domains_share_one_service() {
    let repo = FixtureRepo::copy_of("blog");
    generate(&repo);

    let users = repo.read("services/backend/src/generated/web/users.rs");
    assert!(users.contains(".route(\"/users/{user_id}\", get(get_user).delete(delete_user))"));
    assert!(users.contains("StatusCode::NO_CONTENT"));
    assert!(!users.contains("bus.publish"));

    let posts = repo.read("services/backend/src/generated/web/posts.rs");
    assert!(posts.contains(".route(\"/posts/by-author/{author_id}\", get(list_posts_by_author))"));
    assert!(posts.contains("state.bus.publish(\"post.published\", value).await?;"));
    assert!(posts.contains("state.bus.publish_error(\"post.publish.failed\", err).await?;"));

    let registry = repo.read("services/backend/src/generated/registry.rs");
    assert!(registry.contains("pub fn create_router(handlers: &Handlers, bus: Arc<Bus>) -> Router"));
    assert!(registry.contains(".merge(web::posts::router("));
    assert!(registry.contains(".merge(web::users::router("));
    assert!(!registry.contains("create_bus_adapter"));
}

#[test]
fn test_subscriber_only_service() {
    let repo = FixtureRepo::copy_of("blog");
    generate(&repo);

    let adapter = repo.read("services/notifier/src/generated/bus_adapter.rs");
    assert!(adapter.contains(".subscribe(\"post.published\", move |message: Post|"));
    assert!(adapter.contains(".subscribe(\"notification.requested\", move |message: Notification|"));
    assert!(adapter.contains("self.notifications.announce_post(message).await"));

    let registry = repo.read("services/notifier/src/generated/registry.rs");
    assert!(registry.contains("pub fn create_router(handlers: &Handlers) -> Router"));
    assert!(registry.contains("let _ = handlers;"));
    assert!(registry.contains("pub fn create_bus_adapter(handlers: &Handlers, bus: Arc<Bus>)"));
}

#[test]
fn test_client_covers_consumed_operations() {
    let repo = FixtureRepo::copy_of("blog");
    generate(&repo);

    let client = repo.read("services/frontend/src/generated/clients/backend.rs");
    assert!(client.contains("pub async fn get_user("));
    assert!(client.contains("pub async fn list_users("));
    assert!(client.contains("pub async fn publish_post("));
    assert!(client.contains("pub async fn list_posts_by_author("));
    assert!(!client.contains("pub async fn create_user("));
    assert!(!client.contains("pub async fn delete_user("));
    assert!(client.contains("format!(\"/posts/by-author/{}\", author_id)"));

    let clients_mod = repo.read("services/frontend/src/generated/clients/mod.rs");
    assert!(clients_mod.contains("pub mod backend;"));
    assert!(clients_mod.contains("pub use backend::BackendClient;"));
}

#[test]
fn test_openapi_document() {
    let repo = FixtureRepo::copy_of("blog");
    generate(&repo);

    let doc: serde_json::Value =
        serde_yaml::from_str(&repo.read("services/backend/doc/openapi.yaml")).unwrap();
    assert_eq!(doc["openapi"], "3.1.0");
    assert_eq!(doc["info"]["title"], "backend");

    let create = &doc["paths"]["/users"]["post"];
    assert_eq!(create["operationId"], "create_user");
    assert_eq!(create["tags"], serde_json::json!(["accounts"]));
    assert_eq!(
        create["requestBody"]["content"]["application/json"]["schema"]["$ref"],
        "#/components/schemas/UserCreate"
    );
    assert!(create["responses"]["201"].is_object());

    let list = &doc["paths"]["/users"]["get"];
    assert_eq!(list["parameters"][0]["name"], "limit");
    assert_eq!(list["parameters"][0]["in"], "query");
    assert_eq!(list["parameters"][0]["schema"]["default"], 20);
    assert_eq!(list["parameters"][0]["required"], false);
    assert_eq!(
        list["responses"]["200"]["content"]["application/json"]["schema"]["type"],
        "array"
    );

    let delete = &doc["paths"]["/users/{user_id}"]["delete"];
    assert_eq!(delete["responses"]["204"]["description"], "No Content");
    assert!(delete["responses"]["204"].get("content").is_none());

    assert_eq!(doc["paths"]["/posts"]["post"]["tags"], serde_json::json!(["posts"]));

    let schemas = doc["components"]["schemas"].as_object().unwrap();
    let names: Vec<&str> = schemas.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["Post", "PostCreate", "User", "UserCreate"]);
    assert_eq!(schemas["UserCreate"]["additionalProperties"], false);
}

#[test]
fn test_typescript_declarations() {
    let repo = FixtureRepo::copy_of("blog");
    generate(&repo);

    let ts = repo.read("shared/generated/types.ts");
    assert!(ts.starts_with(HEADER));
    assert!(ts.contains("export type UserRole = \"reader\" | \"author\";\n"));
    assert!(ts.contains(concat!(
        "export interface User {\n",
        "  readonly id: number;\n",
        "  name: string;\n",
        "  /** Contact address */\n",
        "  email?: string | null;\n",
        "  role?: UserRole;\n",
        "}\n",
    )));
    assert!(ts.contains(concat!(
        "export interface UserUpdate {\n",
        "  name?: string;\n",
        "  /** Contact address */\n",
        "  email?: string | null;\n",
        "  role?: UserRole;\n",
        "}\n",
    )));
    assert!(ts.contains("  tags?: string[];\n"));
    assert!(ts.contains("  published_at?: string | null;\n"));
    assert!(ts.contains("export interface PostCreate {\n  author_id: number;\n"));
    assert!(ts.contains("export interface Notification {\n  user_id: number;\n  text: string;\n}\n"));
}

#[test]
fn test_handlers_survive_regeneration() {
    let repo = FixtureRepo::copy_of("blog");
    generate(&repo);

    let edited = "// my implementation\n";
    repo.write("services/backend/src/handlers/posts.rs", edited);
    let report = generate_all(&repo.layout, &PipelineOptions::default()).unwrap();

    assert_eq!(report.count(WriteOutcome::Written), 0);
    assert_eq!(report.count(WriteOutcome::SkippedExisting), 3);
    assert_eq!(repo.read("services/backend/src/handlers/posts.rs"), edited);
}

#[test]
fn test_removed_domain_keeps_stale_outputs_untouched() {
    let repo = FixtureRepo::copy_of("blog");
    generate(&repo);

    repo.write(
        "services/frontend/spec/manifest.yaml",
        "consumes:\n  - {service: backend, domain: users, operations: [get_user]}\n",
    );
    let options = PipelineOptions {
        scope: GenerationScope::only(&[GeneratorKind::Clients]),
        ..PipelineOptions::default()
    };
    let report = generate_all(&repo.layout, &options).unwrap();
    assert_eq!(report.count(WriteOutcome::Written), 1);

    let client = repo.read("services/frontend/src/generated/clients/backend.rs");
    assert!(client.contains("pub async fn get_user("));
    assert!(!client.contains("pub async fn publish_post("));
}

#[test]
fn test_spec_errors_abort_before_writing() {
    let repo = FixtureRepo::copy_of("blog");
    repo.write(
        "shared/spec/events.yaml",
        "events:\n  post_archived: {message: ArchivedPost, publish: true}\n",
    );
    match generate_all(&repo.layout, &PipelineOptions::default()) {
        Err(PipelineError::Spec(report)) => assert_eq!(report.len(), 1),
        other => panic!("expected spec errors, got {other:?}"),
    }
    assert!(!repo.exists("shared/src/generated"));
    assert!(!repo.exists("services/backend/src"));
}
