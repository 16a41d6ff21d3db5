use std::fs;
use std::path::Path;

use opwire_core::{OperationRegistry, RegistryConfig};

const PETSTORE_JSON: &str = r##"{
  "servers": [{"url": "https://api.example.com/v2"}],
  "paths": {
    "/pets": {
      "get": {
        "operationId": "listPets",
        "summary": "List all pets",
        "parameters": [
          {"name": "limit", "in": "query", "schema": {"type": "integer"}},
          {"name": "cursor", "in": "query", "schema": {"type": "string"}}
        ]
      },
      "post": {
        "operationId": "createPet",
        "requestBody": {
          "content": {
            "application/json": {"schema": {"$ref": "#/components/schemas/Pet"}}
          }
        }
      }
    },
    "/pets/{petId}": {
      "parameters": [
        {"name": "petId", "in": "path", "required": true, "schema": {"type": "string"}}
      ],
      "get": {"operationId": "getPet"},
      "delete": {}
    }
  },
  "components": {
    "schemas": {
      "Pet": {
        "type": "object",
        "required": ["name"],
        "properties": {"name": {"type": "string"}}
      }
    }
  }
}"##;

const TRACKER_YAML: &str = r#"
servers:
  - url: /api
paths:
  /issues:
    get:
      operationId: listIssues
      parameters:
        - name: page
          in: query
          schema:
            type: integer
"#;

fn write_source(root: &Path) {
    fs::create_dir_all(root.join("petstore")).unwrap();
    fs::write(root.join("petstore/api.json"), PETSTORE_JSON).unwrap();
    fs::create_dir_all(root.join("tracker")).unwrap();
    fs::write(root.join("tracker/api.yaml"), TRACKER_YAML).unwrap();
}

#[test]
fn load_emits_one_entry_per_path_method() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path());

    let mut registry = OperationRegistry::new(RegistryConfig::default());
    let report = registry.load(dir.path()).unwrap();

    assert_eq!(report.documents_loaded, 2);
    assert_eq!(report.documents_skipped, 0);
    // petstore: listPets, createPet, getPet, delete; tracker: listIssues
    assert_eq!(report.operations, 5);

    let list = registry.get("op_petstore_listPets").unwrap();
    assert_eq!(list.method, "GET");
    assert_eq!(list.path, "/pets");
    assert_eq!(list.base_path, vec!["v2".to_string()]);
    assert_eq!(list.pagination_param.as_deref(), Some("cursor"));
    assert_eq!(list.full_path(), "/v2/pets");

    // Synthesized identifier for the id-less DELETE.
    let removed = registry.get("op_petstore_delete_pets_by_petId").unwrap();
    assert_eq!(removed.method, "DELETE");

    let issues = registry.get("op_tracker_listIssues").unwrap();
    assert_eq!(issues.base_path, vec!["api".to_string()]);
    assert!(issues.paginatable());
}

#[test]
fn load_is_idempotent_and_names_are_stable() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path());

    let mut registry = OperationRegistry::new(RegistryConfig::default());
    registry.load(dir.path()).unwrap();
    let first: Vec<String> = registry.entries().iter().map(|e| e.name.clone()).collect();

    registry.load(dir.path()).unwrap();
    let second: Vec<String> = registry.entries().iter().map(|e| e.name.clone()).collect();

    assert_eq!(first, second);
    assert_eq!(registry.stats().operations, first.len());
}

#[test]
fn malformed_document_is_skipped_and_load_continues() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path());
    fs::write(dir.path().join("petstore/broken.json"), "{ not json").unwrap();

    let mut registry = OperationRegistry::new(RegistryConfig::default());
    let report = registry.load(dir.path()).unwrap();

    assert_eq!(report.documents_skipped, 1);
    assert_eq!(report.documents_loaded, 2);
    assert!(registry.get("op_petstore_listPets").is_some());
}

#[test]
fn missing_source_directory_is_fatal() {
    let mut registry = OperationRegistry::new(RegistryConfig::default());
    let err = registry.load(Path::new("/definitely/not/here")).unwrap_err();
    assert!(err.to_string().contains("not readable"));
}

#[test]
fn request_body_ref_is_inlined_into_shape() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path());

    let mut registry = OperationRegistry::new(RegistryConfig::default());
    registry.load(dir.path()).unwrap();

    let create = registry.get("op_petstore_createPet").unwrap();
    let Some(opwire_core::SchemaShape::Object { required, .. }) = &create.request_body else {
        panic!("expected inlined object schema");
    };
    assert_eq!(required, &vec!["name".to_string()]);
}

#[test]
fn operation_with_undeclared_placeholder_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("bad")).unwrap();
    fs::write(
        dir.path().join("bad/api.json"),
        r#"{"paths": {"/x/{id}": {"get": {"operationId": "getX"}}}}"#,
    )
    .unwrap();

    let mut registry = OperationRegistry::new(RegistryConfig::default());
    let report = registry.load(dir.path()).unwrap();

    assert_eq!(report.operations, 0);
    assert!(report
        .diagnostics
        .iter()
        .any(|d| d.contains("placeholder '{id}'")));
}
