//! CLI integration tests for the semantic-client binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("semantic-client"))
}

fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

// Task responses point back at their project through a parent link; the
// schemas live under components and are pulled in through $ref.
const DOCUMENTATION: &str = r##"{
    "openapi": "3.0.0",
    "paths": {
        "/projects/{projectId}": {
            "get": {
                "operationId": "getProject",
                "parameters": [
                    { "name": "projectId", "in": "path", "schema": { "type": "string", "@id": "https://example.org/vocab#projectId" } }
                ],
                "responses": {
                    "200": {
                        "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Project" } } },
                        "links": {
                            "createTask": { "@relation": "https://example.org/vocab#create", "operationId": "createTask" },
                            "archive": { "@relation": "https://example.org/vocab#archive", "operationId": "archiveProject" }
                        }
                    }
                }
            }
        },
        "/projects/{projectId}/tasks": {
            "post": {
                "operationId": "createTask",
                "parameters": [
                    { "name": "projectId", "in": "path", "schema": { "type": "string", "@id": "https://example.org/vocab#projectId" } }
                ],
                "requestBody": {
                    "content": {
                        "application/json": {
                            "schema": { "type": "object", "properties": { "points": { "type": "integer" } } }
                        }
                    }
                },
                "responses": { "201": { "description": "created" } }
            }
        },
        "/projects/{projectId}/archive": {
            "post": {
                "operationId": "archiveProject",
                "parameters": [
                    { "name": "projectId", "in": "path", "schema": { "type": "string" } }
                ],
                "responses": { "204": { "description": "archived" } }
            }
        },
        "/tasks/{taskId}": {
            "get": {
                "operationId": "getTask",
                "parameters": [
                    { "name": "taskId", "in": "path", "schema": { "type": "string" } }
                ],
                "responses": {
                    "200": {
                        "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Task" } } },
                        "links": {
                            "project": {
                                "@relation": "https://example.org/vocab#project",
                                "operationId": "getProject",
                                "x-affiliation": "parent"
                            }
                        }
                    }
                }
            }
        }
    },
    "components": {
        "schemas": {
            "Project": {
                "type": "object",
                "@id": "https://example.org/vocab#Project",
                "properties": {
                    "id": { "type": "string", "@id": "https://example.org/vocab#projectId" },
                    "title": { "type": "string", "@id": "https://example.org/vocab#title" },
                    "owner": {
                        "type": "object",
                        "x-affiliation": "parent",
                        "properties": { "name": { "type": "string", "@id": "https://example.org/vocab#ownerName" } }
                    }
                }
            },
            "Task": {
                "type": "object",
                "@id": "https://example.org/vocab#Task",
                "properties": {
                    "name": { "type": "string", "@id": "https://schema.org/name" },
                    "projectId": { "type": "string", "@id": "https://example.org/vocab#projectId" }
                }
            }
        }
    }
}"##;

const PROJECT: &str = r#"{
    "id": "p1",
    "title": "Jeera",
    "owner": { "name": "Ada" },
    "_links": [{ "relation": "createTask", "parameters": { "points": 3 } }, "archive"]
}"#;

const TASK: &str = r#"{ "name": "Write docs", "projectId": "p1", "_links": ["project"] }"#;

struct Fixture {
    _dir: TempDir,
    doc: String,
    project: String,
    task: String,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let doc = write_temp_file(&dir, "api.json", DOCUMENTATION);
    let project = write_temp_file(&dir, "project.json", PROJECT);
    let task = write_temp_file(&dir, "task.json", TASK);
    Fixture {
        doc: doc.to_str().unwrap().to_string(),
        project: project.to_str().unwrap().to_string(),
        task: task.to_str().unwrap().to_string(),
        _dir: dir,
    }
}

mod get_command {
    use super::*;

    #[test]
    fn local_value() {
        let f = fixture();
        cmd()
            .args([
                "get",
                &f.project,
                "--doc",
                &f.doc,
                "--operation",
                "getProject",
                "--key",
                "https://example.org/vocab#title",
            ])
            .assert()
            .success()
            .stdout(predicate::str::diff("\"Jeera\"\n"));
    }

    #[test]
    fn flattened_value() {
        let f = fixture();
        cmd()
            .args([
                "get",
                &f.project,
                "--doc",
                &f.doc,
                "--operation",
                "getProject",
                "--key",
                "https://example.org/vocab#ownerName",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("Ada"));
    }

    #[test]
    fn miss_exits_1() {
        let f = fixture();
        cmd()
            .args([
                "get",
                &f.project,
                "--doc",
                &f.doc,
                "--operation",
                "getProject",
                "--key",
                "https://example.org/vocab#unknown",
            ])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("No value"));
    }

    #[test]
    fn parent_link_not_followed_without_base_url() {
        let f = fixture();
        cmd()
            .args([
                "get",
                &f.task,
                "--doc",
                &f.doc,
                "--operation",
                "getTask",
                "--key",
                "https://example.org/vocab#title",
            ])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("No value"));
    }

    #[test]
    fn follows_parent_link() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/projects/p1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"p1","title":"Jeera"}"#)
            .create();

        let f = fixture();
        cmd()
            .args([
                "get",
                &f.task,
                "--doc",
                &f.doc,
                "--operation",
                "getTask",
                "--key",
                "https://example.org/vocab#title",
                "--base-url",
                &server.url(),
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("Jeera"));

        mock.assert();
    }

    #[test]
    fn undocumented_media_type_has_no_schema() {
        let f = fixture();
        cmd()
            .args([
                "get",
                &f.project,
                "--doc",
                &f.doc,
                "--operation",
                "getProject",
                "--media-type",
                "application/hal+json",
                "--key",
                "https://example.org/vocab#title",
            ])
            .assert()
            .code(1);
    }

    #[test]
    fn unknown_operation() {
        let f = fixture();
        cmd()
            .args([
                "get",
                &f.project,
                "--doc",
                &f.doc,
                "--operation",
                "getNothing",
                "--key",
                "https://example.org/vocab#title",
            ])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("unknown operation"));
    }

    #[test]
    fn undocumented_status() {
        let f = fixture();
        cmd()
            .args([
                "get",
                &f.project,
                "--doc",
                &f.doc,
                "--operation",
                "getProject",
                "--status",
                "500",
                "--key",
                "https://example.org/vocab#title",
            ])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("status 500"));
    }
}

mod relations_command {
    use super::*;

    #[test]
    fn relation_with_control_defaults() {
        let f = fixture();
        let output = cmd()
            .args([
                "relations",
                &f.project,
                "--doc",
                &f.doc,
                "--operation",
                "getProject",
                "--relation",
                "https://example.org/vocab#create",
            ])
            .output()
            .unwrap();

        assert!(output.status.success());
        let relations: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(relations.as_array().unwrap().len(), 1);
        assert_eq!(relations[0]["key"], "createTask");
        assert_eq!(relations[0]["operation"]["verb"], "post");
        assert_eq!(relations[0]["operation"]["parameters"]["projectId"], "p1");
        assert_eq!(relations[0]["operation"]["body"]["points"], 3);
    }

    #[test]
    fn all_controls() {
        let f = fixture();
        cmd()
            .args([
                "relations",
                &f.project,
                "--doc",
                &f.doc,
                "--operation",
                "getProject",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("createTask"))
            .stdout(predicate::str::contains("archiveProject"));
    }

    #[test]
    fn limit() {
        let f = fixture();
        cmd()
            .args([
                "relations",
                &f.project,
                "--doc",
                &f.doc,
                "--operation",
                "getProject",
                "--limit",
                "1",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("createTask"))
            .stdout(predicate::str::contains("archiveProject").not());
    }

    #[test]
    fn zero_limit_lists_all() {
        let f = fixture();
        cmd()
            .args([
                "relations",
                &f.project,
                "--doc",
                &f.doc,
                "--operation",
                "getProject",
                "--limit",
                "0",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("createTask"))
            .stdout(predicate::str::contains("archiveProject"));
    }

    #[test]
    fn unavailable_relation_is_empty() {
        let f = fixture();
        cmd()
            .args([
                "relations",
                &f.task,
                "--doc",
                &f.doc,
                "--operation",
                "getTask",
                "--relation",
                "https://example.org/vocab#create",
            ])
            .assert()
            .success()
            .stdout(predicate::str::diff("[]\n"));
    }
}

mod remaining_command {
    use super::*;

    #[test]
    fn nothing_read() {
        let f = fixture();
        let output = cmd()
            .args([
                "remaining",
                &f.project,
                "--doc",
                &f.doc,
                "--operation",
                "getProject",
            ])
            .output()
            .unwrap();

        assert!(output.status.success());
        let remaining: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(remaining["data"]["id"], "p1");
        assert_eq!(remaining["data"]["title"], "Jeera");
        assert_eq!(remaining["relations"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn read_terms_drop_out() {
        let f = fixture();
        let output = cmd()
            .args([
                "remaining",
                &f.project,
                "--doc",
                &f.doc,
                "--operation",
                "getProject",
                "--read",
                "https://example.org/vocab#title",
                "--read-relation",
                "https://example.org/vocab#create",
            ])
            .output()
            .unwrap();

        assert!(output.status.success());
        let remaining: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert!(remaining["data"].get("title").is_none());
        assert_eq!(remaining["data"]["id"], "p1");
        assert_eq!(remaining["relations"].as_array().unwrap().len(), 1);
        assert_eq!(remaining["relations"][0]["key"], "archive");
    }

    #[test]
    fn pretty_output() {
        let f = fixture();
        cmd()
            .args([
                "remaining",
                &f.project,
                "--doc",
                &f.doc,
                "--operation",
                "getProject",
                "--pretty",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("{\n"));
    }
}

mod error_handling {
    use super::*;

    #[test]
    fn documentation_not_found() {
        let f = fixture();
        cmd()
            .args([
                "get",
                &f.project,
                "--doc",
                "/nonexistent/api.json",
                "--operation",
                "getProject",
                "--key",
                "https://example.org/vocab#title",
            ])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("not found"));
    }

    #[test]
    fn invalid_payload_json() {
        let f = fixture();
        let dir = TempDir::new().unwrap();
        let payload = write_temp_file(&dir, "bad.json", "{ not json");
        cmd()
            .args([
                "get",
                payload.to_str().unwrap(),
                "--doc",
                &f.doc,
                "--operation",
                "getProject",
                "--key",
                "https://example.org/vocab#title",
            ])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("invalid JSON"));
    }

    #[test]
    fn documentation_without_paths() {
        let f = fixture();
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "api.json", r#"{"openapi":"3.0.0"}"#);
        cmd()
            .args([
                "get",
                &f.project,
                "--doc",
                doc.to_str().unwrap(),
                "--operation",
                "getProject",
                "--key",
                "https://example.org/vocab#title",
            ])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("missing paths"));
    }

    #[test]
    fn missing_doc_flag() {
        let f = fixture();
        cmd()
            .args(["get", &f.project, "--operation", "getProject", "--key", "x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--doc"));
    }
}

mod help {
    use super::*;

    #[test]
    fn help_flag() {
        cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("relations"))
            .stdout(predicate::str::contains("remaining"));
    }

    #[test]
    fn version_flag() {
        cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("semantic-client"));
    }
}
