//! Integration tests for model loading and reference resolution.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use modelhub::{
    Error, FieldSpec, FnSource, HubConfig, LoadState, ModelDefinition, ModelHub, ScalarType,
    Schema, SchemaField,
};
use serde_json::{json, Value};

struct TestContext {
    hub: ModelHub,
    _models_dir: tempfile::TempDir,
}

impl TestContext {
    /// Write `files` into a fresh model directory and initialize a hub on it.
    fn new(files: &[(&str, &str)], types: &[&str]) -> Self {
        let models_dir = tempfile::tempdir().unwrap();
        for (path, contents) in files {
            write_model(models_dir.path(), path, contents);
        }

        let hub = ModelHub::new();
        hub.init(
            &HubConfig::new("memory://test")
                .with_types(types.iter().copied())
                .with_model_path(models_dir.path()),
        )
        .unwrap();

        Self {
            hub,
            _models_dir: models_dir,
        }
    }
}

fn write_model(root: &Path, path: &str, contents: &str) {
    let path = root.join(path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

fn doc(value: Value) -> modelhub::Document {
    value.as_object().unwrap().clone()
}

const USER: &str = r#"{
    "schema": {
        "name": { "type": "String", "required": true },
        "email": "Email"
    }
}"#;

const POST: &str = r#"{
    "schema": {
        "title": "String",
        "author": { "type": "ObjectId", "ref": "User" },
        "tags": ["String"]
    }
}"#;

#[test]
fn test_referencing_model_built_first() {
    let ctx = TestContext::new(&[("User.json", USER), ("blog/Post.json", POST)], &["email"]);
    let hub = &ctx.hub;

    assert_eq!(hub.registry().names(), vec!["User", "Post"]);
    assert_eq!(hub.registry().state("Post"), Some(LoadState::Unloaded));

    let post = hub.require("Post").unwrap();
    let before = post.schema().field_names();
    assert_eq!(before, vec!["title", "tags"]);
    assert!(post.schema().field("tags").unwrap().many);
    assert!(!hub.registry().is_built("User"));

    let user = hub.require("User").unwrap();
    let after = post.schema().field_names();
    assert_eq!(after, vec!["title", "tags", "author"]);
    assert_eq!(after[before.len()..], ["author"]);
    let author = post.schema().field("author").unwrap();
    assert_eq!(author.target(), Some("User"));
    assert!(author.referenced_schema().unwrap().same(user.schema()));
    hub.verify().unwrap();
}

#[test]
fn test_referenced_model_built_first() {
    let ctx = TestContext::new(&[("User.json", USER), ("blog/Post.json", POST)], &["email"]);
    let hub = &ctx.hub;

    let user = hub.require("User").unwrap();
    let post = hub.require("Post").unwrap();

    let author = post.schema().field("author").unwrap();
    assert!(author.referenced_schema().unwrap().same(user.schema()));
    assert_eq!(post.schema().field_names(), vec!["title", "author", "tags"]);
    assert!(hub.pending_references().is_empty());
}

#[test]
fn test_source_executes_once() {
    let hub = ModelHub::new();
    hub.init(&HubConfig::default()).unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    hub.register_source(
        "Counter",
        FnSource::new(move |name: &str, hub: &ModelHub| {
            counter.fetch_add(1, Ordering::SeqCst);
            hub.create(name, ModelDefinition::new().field("n", FieldSpec::of("Number")))?;
            Ok(())
        }),
    )
    .unwrap();

    let first = hub.require("Counter").unwrap();
    let second = hub.require("Counter").unwrap();
    assert!(first.same(&second));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unknown_model_and_duplicate_init() {
    let ctx = TestContext::new(&[("User.json", USER)], &["email"]);

    assert!(matches!(ctx.hub.get("Ghost"), Err(Error::NotFound(ref n)) if n == "Ghost"));
    assert!(matches!(
        ctx.hub.init(&HubConfig::default()),
        Err(Error::DuplicateInit)
    ));
}

#[test]
fn test_custom_type_virtuals() {
    let ctx = TestContext::new(
        &[(
            "Member.json",
            r#"{ "schema": { "email": "Email", "name": "FullName", "site": "Url" } }"#,
        )],
        &["email", "url", "fullname"],
    );

    let member = ctx.hub.require("Member").unwrap();
    let mut names = member.schema().virtual_names();
    names.sort();
    assert_eq!(names, vec!["email.domain", "id", "name.full"]);
    assert_eq!(
        member.schema().field("site").unwrap().storage_type(),
        ScalarType::String
    );

    let mut record = doc(json!({
        "email": "Ada@Example.ORG",
        "name": { "first": "Ada", "last": "Lovelace" }
    }));
    assert_eq!(
        member.get_virtual(&record, "email.domain"),
        Some(json!("example.org"))
    );
    assert_eq!(
        member.get_virtual(&record, "name.full"),
        Some(json!("Ada Lovelace"))
    );

    assert!(member.set_virtual(&mut record, "name.full", json!("Grace Hopper")));
    assert_eq!(record["name"], json!({ "first": "Grace", "last": "Hopper" }));

    // Read-only virtuals ignore writes.
    assert!(member.set_virtual(&mut record, "email.domain", json!("other.org")));
    assert_eq!(record["email"], json!("Ada@Example.ORG"));
}

#[test]
fn test_installed_virtuals() {
    let hub = ModelHub::new();
    hub.init(&HubConfig::default()).unwrap();
    hub.install_virtuals("Money", |key| {
        let key = key.to_string();
        vec![(
            ".dollars".to_string(),
            modelhub::VirtualSpec::new().getter(move |doc| {
                json!(doc.get(&key).and_then(Value::as_i64).unwrap_or(0) / 100)
            }),
        )]
    });

    let invoice = hub
        .create("Invoice", ModelDefinition::new().field("total", FieldSpec::of("Money")))
        .unwrap();
    assert_eq!(
        invoice.schema().field("total").unwrap().storage_type(),
        ScalarType::Mixed
    );
    assert_eq!(
        invoice.get_virtual(&doc(json!({ "total": 1250 })), "total.dollars"),
        Some(json!(12))
    );
}

#[test]
fn test_unknown_type_then_retry() {
    let ctx = TestContext::new(&[("User.json", USER)], &[]);
    let hub = &ctx.hub;

    let err = hub.require("User").unwrap_err();
    assert!(matches!(
        err,
        Error::UnknownType { ref model, ref field, ref type_name }
            if model == "User" && field == "email" && type_name == "Email"
    ));
    assert_eq!(hub.registry().state("User"), Some(LoadState::Unloaded));
    assert!(hub.registry().schema("User").unwrap().is_empty());

    hub.register_type("Email", ScalarType::String);
    let user = hub.require("User").unwrap();
    assert_eq!(user.schema().field_names(), vec!["name", "email"]);
}

#[test]
fn test_mutual_references() {
    let ctx = TestContext::new(
        &[
            (
                "Author.json",
                r#"{ "schema": { "latest": { "ref": "Book" }, "books": [{ "type": "ObjectId", "ref": "Book" }] } }"#,
            ),
            (
                "Book.json",
                r#"{ "schema": { "author": { "ref": "Author", "required": true } } }"#,
            ),
        ],
        &[],
    );
    let hub = &ctx.hub;

    let author = hub.require("Author").unwrap();
    assert!(author.schema().is_empty());
    assert_eq!(hub.pending_references().len(), 2);

    let book = hub.require("Book").unwrap();
    assert!(book
        .schema()
        .field("author")
        .unwrap()
        .referenced_schema()
        .unwrap()
        .same(author.schema()));
    assert!(author.schema().field("books").unwrap().many);
    assert!(author
        .schema()
        .field("latest")
        .unwrap()
        .referenced_schema()
        .unwrap()
        .same(book.schema()));
    hub.verify().unwrap();
}

#[test]
fn test_self_references() {
    let ctx = TestContext::new(
        &[(
            "Category.json",
            r#"{ "schema": {
                "name": "String",
                "parent": { "ref": "$circular" },
                "children": [{ "ref": "Category" }],
                "root": { "ref": { "$circular": "Category" } }
            } }"#,
        )],
        &[],
    );

    let category = ctx.hub.require("Category").unwrap();
    for key in ["parent", "children", "root"] {
        let field = category.schema().field(key).unwrap();
        assert!(field.referenced_schema().unwrap().same(category.schema()), "{}", key);
    }
    assert!(ctx.hub.pending_references().is_empty());
}

#[test]
fn test_reentrant_load() {
    let ctx = TestContext::new(&[("User.json", USER)], &["email"]);
    let hub = &ctx.hub;

    hub.register_source(
        "Comment",
        FnSource::new(|name: &str, hub: &ModelHub| {
            // Loading itself while running yields nothing instead of recursing.
            assert!(hub.get(name)?.is_none());
            let user = hub.require("User")?;
            assert!(user.schema().has_field("email"));
            hub.create(name, ModelDefinition::new().field("by", FieldSpec::reference("User")))?;
            Ok(())
        }),
    )
    .unwrap();

    let comment = hub.require("Comment").unwrap();
    assert!(comment.schema().field("by").unwrap().referenced_schema().is_some());
    assert_eq!(hub.registry().state("User"), Some(LoadState::Built));
}

#[test]
fn test_source_that_does_not_build() {
    let ctx = TestContext::new(&[], &[]);
    let hub = &ctx.hub;
    hub.register_source("Draft", FnSource::new(|_: &str, _: &ModelHub| Ok(())))
        .unwrap();

    assert!(hub.get("Draft").unwrap().is_none());
    assert_eq!(hub.registry().state("Draft"), Some(LoadState::Executed));
    assert!(matches!(
        hub.require("Draft"),
        Err(Error::MalformedDefinition { ref model, .. }) if model == "Draft"
    ));
}

#[test]
fn test_unresolved_reference_is_reported() {
    let ctx = TestContext::new(
        &[(
            "Invoice.json",
            r#"{ "schema": { "customer": { "ref": "Customer" } } }"#,
        )],
        &[],
    );

    ctx.hub.require("Invoice").unwrap();
    match ctx.hub.verify() {
        Err(Error::UnresolvedReferences(labels)) => {
            assert_eq!(labels, vec!["Invoice.customer"]);
        }
        other => panic!("expected unresolved references, got {:?}", other),
    }
}

#[test]
fn test_discovery_skips_non_definitions() {
    let ctx = TestContext::new(
        &[
            ("User.json", USER),
            ("drafts/User.old.json", USER),
            (".hidden/Secret.json", "{}"),
            ("README.md", "# models"),
        ],
        &["email"],
    );

    assert_eq!(ctx.hub.registry().names(), vec!["User"]);
}

#[test]
fn test_malformed_definition_file() {
    let ctx = TestContext::new(
        &[
            ("Broken.json", r#"{ "schema": { "a": "String" }, "colection": "x" }"#),
            ("Nested.json", r#"{ "schema": { "a": ["String", "Number"] } }"#),
        ],
        &[],
    );

    for name in ["Broken", "Nested"] {
        let err = ctx.hub.require(name).unwrap_err();
        assert!(matches!(err, Error::MalformedDefinition { .. }), "{}", err);
    }
}

#[test]
fn test_schema_plugins_from_definition() {
    let ctx = TestContext::new(
        &[(
            "Order.json",
            r#"{
                "schema": { "total": "Number" },
                "plugins": ["softDelete"],
                "options": { "timestamps": true },
                "statics": { "pageSize": 25 },
                "collection": "sales"
            }"#,
        )],
        &[],
    );
    ctx.hub.install_plugin("softDelete", |schema: &Schema| {
        schema.add_field(SchemaField::scalar("deletedAt", ScalarType::Date));
        Ok(())
    });

    let order = ctx.hub.require("Order").unwrap();
    assert_eq!(
        order.schema().field_names(),
        vec!["total", "createdAt", "updatedAt", "deletedAt"]
    );
    assert_eq!(order.schema().plugins(), vec!["softDelete"]);
    assert_eq!(order.property("pageSize"), Some(&json!(25)));
    assert_eq!(order.collection(), "sales");
}

#[test]
fn test_id_option_from_definition() {
    let ctx = TestContext::new(
        &[
            ("Tag.json", r#"{ "schema": { "label": "String" } }"#),
            (
                "Event.json",
                r#"{ "schema": { "label": "String" }, "options": { "id": false } }"#,
            ),
        ],
        &[],
    );

    let tag = ctx.hub.require("Tag").unwrap();
    let record = doc(json!({ "_id": "t1", "label": "rust" }));
    assert_eq!(tag.get_virtual(&record, "id"), Some(json!("t1")));

    let event = ctx.hub.require("Event").unwrap();
    assert!(!event.schema().options().id);
    assert_eq!(event.get_virtual(&record, "id"), None);
}
