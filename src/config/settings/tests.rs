use super::*;
use tempfile::TempDir;

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.openai.base_url, "https://api.openai.com/v1/");
    assert_eq!(config.openai.embedding_model, "text-embedding-3-small");
    assert_eq!(config.openai.chat_model, "gpt-3.5-turbo");
    assert_eq!(config.openai.api_key_name, "OPENAI_API_KEY");
    assert_eq!(config.openai.timeout_seconds, 30);
    assert_eq!(config.openai.retry_attempts, 3);
    assert_eq!(config.npc.persona, DEFAULT_PERSONA);
}

#[test]
fn config_validation() {
    let config = Config::default();
    assert!(config.validate().is_ok());

    let mut invalid_config = config.clone();
    invalid_config.openai.base_url = "ftp://files.example.com".to_string();
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidProtocol(_))
    ));

    let mut invalid_config = config.clone();
    invalid_config.openai.base_url = "not a url".to_string();
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidUrl(_))
    ));

    let mut invalid_config = config.clone();
    invalid_config.openai.embedding_model = "  ".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.openai.api_key_name = "KEY=VALUE".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.openai.timeout_seconds = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.openai.retry_attempts = 11;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config;
    invalid_config.npc.persona = String::new();
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::EmptyPersona)
    ));
}

#[test]
fn api_url_gets_trailing_slash() {
    let mut openai = OpenAiConfig {
        base_url: "http://localhost:8080/v1".to_string(),
        ..OpenAiConfig::default()
    };
    let url = openai.api_url().expect("should build api url");
    assert_eq!(url.as_str(), "http://localhost:8080/v1/");
    assert_eq!(
        url.join("embeddings")
            .expect("should join endpoint")
            .as_str(),
        "http://localhost:8080/v1/embeddings"
    );

    openai
        .set_base_url("https://proxy.example.com/openai/".to_string())
        .expect("should accept https url");
    assert_eq!(
        openai.api_url().expect("should build api url").as_str(),
        "https://proxy.example.com/openai/"
    );
}

#[test]
fn toml_serialization() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config, parsed_config);
}

#[test]
fn partial_openai_section_uses_defaults() {
    let partial_toml = r#"
        [openai]
        chat_model = "gpt-4o-mini"
    "#;

    let config: Config = toml::from_str(partial_toml).expect("should parse partial toml");
    assert_eq!(config.openai.chat_model, "gpt-4o-mini");
    assert_eq!(config.openai.embedding_model, DEFAULT_EMBEDDING_MODEL);
    assert_eq!(config.npc, NpcConfig::default());
}

#[test]
fn setter_validation() {
    let mut config = OpenAiConfig::default();

    assert!(config.set_base_url("http://127.0.0.1:9000".to_string()).is_ok());
    assert!(config.set_embedding_model("text-embedding-3-large".to_string()).is_ok());
    assert!(config.set_chat_model("gpt-4o".to_string()).is_ok());
    assert!(config.set_timeout_seconds(60).is_ok());

    assert!(config.set_base_url("gopher://old.example.com".to_string()).is_err());
    assert!(config.set_embedding_model(String::new()).is_err());
    assert!(config.set_chat_model("   ".to_string()).is_err());
    assert!(config.set_timeout_seconds(0).is_err());
    assert!(config.set_timeout_seconds(301).is_err());

    assert_eq!(config.base_url, "http://127.0.0.1:9000");
    assert_eq!(config.timeout_seconds, 60);
}

#[test]
fn load_missing_config_uses_defaults() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let config = Config::load(temp_dir.path()).expect("should load config successfully");

    assert_eq!(config.openai, OpenAiConfig::default());
    assert_eq!(config.get_base_dir(), temp_dir.path());
}

#[test]
fn save_and_reload() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let config_dir = temp_dir.path().join("nested");

    let mut config = Config::load(&config_dir).expect("should load defaults");
    config.npc.persona = "You are Brannoc, the village blacksmith.".to_string();
    config.save().expect("should save config");

    let reloaded = Config::load(&config_dir).expect("should reload config");
    assert_eq!(reloaded, config);
    assert!(config.config_file_path().exists());
}

#[test]
fn invalid_file_is_rejected() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    fs::write(
        temp_dir.path().join("config.toml"),
        "[openai]\ntimeout_seconds = 0\n",
    )
    .expect("should write config");

    assert!(Config::load(temp_dir.path()).is_err());
}

#[test]
fn derived_paths() {
    let config = Config {
        base_dir: PathBuf::from("/srv/game"),
        ..Config::default()
    };

    assert_eq!(config.secrets_path(), PathBuf::from("/srv/game/secrets.txt"));
    assert_eq!(
        config.knowledge_path(),
        PathBuf::from("/srv/game/knowledge_base.json")
    );
    assert_eq!(
        config.vector_db_path(),
        PathBuf::from("/srv/game/vector_db.json")
    );
}
