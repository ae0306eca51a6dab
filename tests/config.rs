// ABOUTME: Integration tests for configuration parsing and validation.
// ABOUTME: Tests YAML parsing, env var resolution, and config file discovery.

use std::time::Duration;
use stepguard::config::*;
use stepguard::output::RecordingMasker;

mod parsing {
    use super::*;

    #[test]
    fn parse_full_config() {
        let yaml = r#"
env_prefix: ACME

install:
  url: https://releases.example.com/acme-linux-x64
  install_dir: /opt/acme/bin
  binary_name: acme
  retries: 5
  backoff: 2s
  attempt_timeout: 90s
  dependencies:
    - [apt-get, install, -y, libssl3]

server:
  port: 4100
  args: [serve, --port, "{port}"]
  env:
    ACME_MODE: ci
  log_file: /tmp/acme.log
  stop_timeout: 5s
  forceful: false
  health:
    path: /ready
    method: POST
    body: '{"probe":true}'
    expect_status: 204
    expect_body: ready
    timeout: 45s
    interval: 500ms
    attempt_timeout: 2s

auth:
  token_url: https://auth.example.com/oauth/token
  client_id:
    env: ACME_CLIENT_ID
  client_secret:
    env: ACME_CLIENT_SECRET
  scope: deploy

deploy:
  api_url: https://deploy.example.com/api
  application: shop
  version:
    env: GITHUB_SHA
    default: dev
  environment: staging
  timeout: 15m
  interval: 20s
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.env_prefix, "ACME");

        let install = config.require_install().unwrap();
        assert_eq!(install.retries, 5);
        assert_eq!(install.backoff, Duration::from_secs(2));
        assert_eq!(install.dependencies, [vec!["apt-get", "install", "-y", "libssl3"]]);

        let server = config.server.as_ref().unwrap();
        assert!(!server.forceful);
        assert_eq!(server.health.expect_status, Some(204));
        assert_eq!(server.health.attempt_timeout, Some(Duration::from_secs(2)));
        assert_eq!(server.health_url(), "http://127.0.0.1:4100/ready");

        let deploy = config.require_deploy().unwrap();
        assert_eq!(deploy.timeout, Duration::from_secs(900));
        assert_eq!(deploy.poll_spec().interval, Duration::from_secs(20));
    }

    #[test]
    fn deploy_defaults_to_ten_minute_budget() {
        let yaml = r#"
deploy:
  api_url: https://deploy.example.com
  application: shop
  version: "1.0.0"
"#;
        let config = Config::from_yaml(yaml).unwrap();
        let deploy = config.require_deploy().unwrap();
        assert_eq!(deploy.timeout, Duration::from_secs(600));
        assert_eq!(deploy.interval, Duration::from_secs(10));
    }

    #[test]
    fn invalid_yaml_is_a_parse_error() {
        let err = Config::from_yaml("install: [").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn unknown_health_method_is_rejected() {
        let err = Config::from_yaml("server:\n  port: 80\n  health:\n    method: PATCH\n")
            .unwrap_err();
        assert!(err.to_string().contains("PATCH"));
    }

    #[test]
    fn non_http_token_url_is_rejected() {
        let yaml = "auth:\n  token_url: file:///etc/passwd\n  client_id: a\n  client_secret: b\n";
        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("auth.token_url"));
    }
}

mod env_values {
    use super::*;

    const AUTH: &str = r#"
auth:
  token_url: https://auth.example.com/token
  client_id:
    env: TEST_STEPGUARD_CLIENT_ID
  client_secret:
    env: TEST_STEPGUARD_CLIENT_SECRET
"#;

    #[test]
    fn credentials_resolve_from_environment() {
        temp_env::with_vars(
            [
                ("TEST_STEPGUARD_CLIENT_ID", Some("id-from-env")),
                ("TEST_STEPGUARD_CLIENT_SECRET", Some("secret-from-env")),
            ],
            || {
                let masker = RecordingMasker::new();
                let config = Config::from_yaml(AUTH).unwrap();
                let creds = config.require_auth().unwrap().credentials(&masker).unwrap();
                assert_eq!(creds.client_id.expose(), "id-from-env");
                assert_eq!(creds.client_secret.expose(), "secret-from-env");
                assert!(masker.is_masked("id-from-env"));
                assert!(masker.is_masked("secret-from-env"));
            },
        );
    }

    #[test]
    fn missing_variable_names_the_variable() {
        temp_env::with_vars(
            [
                ("TEST_STEPGUARD_CLIENT_ID", Some("id-from-env")),
                ("TEST_STEPGUARD_CLIENT_SECRET", None::<&str>),
            ],
            || {
                let masker = RecordingMasker::new();
                let config = Config::from_yaml(AUTH).unwrap();
                let err = config.require_auth().unwrap().credentials(&masker).unwrap_err();
                assert!(matches!(
                    err,
                    ConfigError::MissingEnvVar(ref var) if var == "TEST_STEPGUARD_CLIENT_SECRET"
                ));
                assert!(masker.is_masked("id-from-env"));
            },
        );
    }

    #[test]
    fn empty_secret_is_rejected() {
        temp_env::with_vars(
            [
                ("TEST_STEPGUARD_CLIENT_ID", Some("id-from-env")),
                ("TEST_STEPGUARD_CLIENT_SECRET", Some("")),
            ],
            || {
                let masker = RecordingMasker::new();
                let config = Config::from_yaml(AUTH).unwrap();
                let err = config.require_auth().unwrap().credentials(&masker).unwrap_err();
                assert!(matches!(err, ConfigError::Invalid(_)));
                assert!(masker.is_masked("id-from-env"));
            },
        );
    }

    #[test]
    fn version_falls_back_to_default() {
        let yaml = r#"
deploy:
  api_url: https://deploy.example.com
  application: shop
  version:
    env: TEST_STEPGUARD_VERSION
    default: dev
"#;
        temp_env::with_var_unset("TEST_STEPGUARD_VERSION", || {
            let config = Config::from_yaml(yaml).unwrap();
            let request = config.require_deploy().unwrap().request().unwrap();
            assert_eq!(request.version, "dev");
        });
        temp_env::with_var("TEST_STEPGUARD_VERSION", Some("abc123"), || {
            let config = Config::from_yaml(yaml).unwrap();
            let request = config.require_deploy().unwrap().request().unwrap();
            assert_eq!(request.version, "abc123");
        });
    }

    #[test]
    fn server_env_is_passed_to_the_process() {
        let yaml = r#"
server:
  port: 8080
  env:
    API_KEY:
      env: TEST_STEPGUARD_API_KEY
    MODE: ci
"#;
        temp_env::with_var("TEST_STEPGUARD_API_KEY", Some("k-1"), || {
            let config = Config::from_yaml(yaml).unwrap();
            let spec = config
                .server
                .unwrap()
                .process_spec(std::path::Path::new("/opt/tool"))
                .unwrap();
            assert_eq!(spec.env.get("API_KEY").map(String::as_str), Some("k-1"));
            assert_eq!(spec.env.get("MODE").map(String::as_str), Some("ci"));
        });
    }
}

mod discovery {
    use super::*;

    #[test]
    fn finds_primary_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME), "env_prefix: FIRST\n").unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME_ALT), "env_prefix: SECOND\n").unwrap();

        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.env_prefix, "FIRST");
    }

    #[test]
    fn finds_config_in_dot_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".stepguard")).unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME_DIR), "env_prefix: DOTDIR\n").unwrap();

        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.env_prefix, "DOTDIR");
    }

    #[test]
    fn missing_file_is_reported_with_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::discover(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(ref path) if path == dir.path()));
    }
}
