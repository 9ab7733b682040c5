#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

//! Runs the CLI commands against a mocked OpenAI-compatible server

use std::fs;
use std::path::Path;

use npc_lore::commands::{build_store, compile_items, open_orchestrator};
use npc_lore::config::Config;
use npc_lore::retrieval::Answer;
use npc_lore::store::VectorStore;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn embedding_response(vector: &[f32]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "object": "list",
        "data": [{ "object": "embedding", "index": 0, "embedding": vector }],
        "model": "text-embedding-3-small"
    }))
}

async fn mount_embedding(server: &MockServer, input: &str, vector: &[f32]) {
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "input": input })))
        .respond_with(embedding_response(vector))
        .mount(server)
        .await;
}

fn write_config(dir: &Path, server: &MockServer) {
    let mut config = Config::load(dir).expect("should load default config");
    config
        .openai
        .set_base_url(format!("{}/v1", server.uri()))
        .expect("mock url is valid");
    config.openai.retry_attempts = 1;
    config.save().expect("should save config");

    fs::write(config.secrets_path(), "# test key\nOPENAI_API_KEY=sk-test\n")
        .expect("should write secrets");
    fs::write(
        dir.join("Item_Data.csv"),
        "id,name,type,material_name,material_count,level,reinforce_name,reinforce_count\n\
         1,Sword,weapon,,0,0,,0\n\
         2,Shield,armor,,0,0,,0\n",
    )
    .expect("should write item table");
}

#[tokio::test]
async fn compile_build_and_ask() {
    let server = MockServer::start().await;
    let temp_dir = tempfile::TempDir::new().expect("should create TempDir successfully");
    write_config(temp_dir.path(), &server);

    mount_embedding(&server, "Sword is a weapon-type item.", &[1.0, 0.0]).await;
    mount_embedding(&server, "Shield is an armor-type item.", &[0.0, 1.0]).await;
    mount_embedding(&server, "What is a sword?", &[0.9, 0.1]).await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({ "model": "gpt-3.5-turbo" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": "A fine blade." } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let compiled = compile_items(temp_dir.path(), &temp_dir.path().join("Item_Data.csv"))
        .expect("compile should succeed");
    assert_eq!(compiled, 2);

    let built = build_store(temp_dir.path())
        .await
        .expect("build should succeed");
    assert_eq!(built, 2);

    let snapshot = VectorStore::load(&temp_dir.path().join("vector_db.json"))
        .expect("snapshot should load");
    assert_eq!(snapshot.dimension(), 2);

    let orchestrator = open_orchestrator(temp_dir.path())
        .await
        .expect("orchestrator should open");
    let answer = orchestrator.answer("What is a sword?").await;
    assert_eq!(answer, Answer::Generated("A fine blade.".to_string()));

    let requests = server
        .received_requests()
        .await
        .expect("request recording is enabled");
    let chat_request = requests
        .iter()
        .find(|request| request.url.path() == "/v1/chat/completions")
        .expect("chat request was sent");
    let body: serde_json::Value = chat_request.body_json().expect("chat body is json");
    assert_eq!(body["messages"][0]["role"], "system");
    assert!(
        body["messages"][1]["content"]
            .as_str()
            .expect("user content is a string")
            .contains("Reference material: \"Sword is a weapon-type item.\"")
    );
}

#[tokio::test]
async fn failed_build_keeps_existing_snapshot() {
    let server = MockServer::start().await;
    let temp_dir = tempfile::TempDir::new().expect("should create TempDir successfully");
    write_config(temp_dir.path(), &server);

    mount_embedding(&server, "Sword is a weapon-type item.", &[1.0, 0.0]).await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(body_partial_json(json!({ "input": "Shield is an armor-type item." })))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let snapshot_path = temp_dir.path().join("vector_db.json");
    fs::write(&snapshot_path, r#"{ "vectorEntries": [] }"#).expect("should write snapshot");

    compile_items(temp_dir.path(), &temp_dir.path().join("Item_Data.csv"))
        .expect("compile should succeed");
    let result = build_store(temp_dir.path()).await;

    assert!(result.is_err());
    assert_eq!(
        fs::read_to_string(&snapshot_path).expect("should read snapshot"),
        r#"{ "vectorEntries": [] }"#
    );
}
