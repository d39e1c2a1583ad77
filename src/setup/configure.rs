// Configuration step: collect install answers, derive the server and client
// documents, write baseline settings, persist both documents.

use super::{SetupStep, StepOutcome};
use crate::error::{Result, SetupError};
use crate::installation::ConfigPersister;
use crate::models::documents::{
    baseline_settings, ClientConfig, RedisConfig, ServerConfig, SocketConfig, API_SUFFIX,
    BCRYPT_ROUNDS, UPLOAD_PATH,
};
use crate::models::fields::{
    install_questions, Answers, BASE_URL, PORT, REDIS_HOST, REDIS_PASSWORD, REDIS_PORT, SECRET,
    USE_PORT,
};
use crate::prompt::{collect_or_abort, AnswerSource};
use crate::utils::logging::mask_sensitive;
use crate::utils::validation::parse_port;
use async_trait::async_trait;
use log::info;
use std::sync::Arc;
use url::Url;

/// The parts of the base URL the documents are built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBaseUrl {
    /// `scheme://host[:port]`
    pub origin: String,
    /// Path component, or "" when the path is empty or a bare `/`.
    pub relative_path: String,
}

pub fn parse_base_url(raw: &str) -> Result<ParsedBaseUrl> {
    let invalid = |reason: String| SetupError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| invalid("missing host".to_string()))?;

    let origin = match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    };
    let path = url.path();
    let relative_path = if path.len() > 1 {
        path.to_string()
    } else {
        String::new()
    };

    Ok(ParsedBaseUrl {
        origin,
        relative_path,
    })
}

/// `y`/`Y` as the first character means yes.
pub fn parse_use_port(raw: &str) -> bool {
    raw.trim()
        .chars()
        .next()
        .is_some_and(|c| c.eq_ignore_ascii_case(&'y'))
}

/// Build both documents from the install answers. Pure: no I/O.
pub fn derive_configs(answers: &Answers) -> Result<(ServerConfig, ClientConfig)> {
    let answer = |name: &str| answers.get(name).unwrap_or_default();

    let base = parse_base_url(answer(BASE_URL))?;
    let port = parse_port(PORT, answer(PORT))?;
    let use_port = parse_use_port(answer(USE_PORT));

    let public_origin = if use_port {
        format!("{}:{}", base.origin, port)
    } else {
        base.origin.clone()
    };

    let redis = RedisConfig {
        host: answer(REDIS_HOST).to_string(),
        port: parse_port(REDIS_PORT, answer(REDIS_PORT))?,
        password: answer(REDIS_PASSWORD).to_string(),
    };

    let server = ServerConfig {
        base_url: base.origin.clone(),
        port,
        use_port,
        secret: answer(SECRET).to_string(),
        redis,
        bcrypt_rounds: BCRYPT_ROUNDS,
        upload_path: UPLOAD_PATH.to_string(),
        relative_path: base.relative_path.clone(),
    };

    let client = ClientConfig {
        socket: SocketConfig {
            address: public_origin.clone(),
        },
        api_url: format!("{}{}{}", public_origin, base.relative_path, API_SUFFIX),
        relative_path: base.relative_path,
    };

    Ok((server, client))
}

pub struct ConfigureStep {
    answers: Arc<dyn AnswerSource>,
    persister: ConfigPersister,
}

impl ConfigureStep {
    pub fn new(answers: Arc<dyn AnswerSource>, persister: ConfigPersister) -> Self {
        Self { answers, persister }
    }
}

#[async_trait]
impl SetupStep for ConfigureStep {
    fn name(&self) -> &'static str {
        "configure"
    }

    async fn run(&self) -> Result<StepOutcome> {
        let answers =
            collect_or_abort(self.answers.as_ref(), &install_questions(), "configuration").await?;
        let (server, client) = derive_configs(&answers)?;

        info!(
            "[PHASE: setup] [STEP: configure] Derived configuration (base_url={}, relative_path={:?}, use_port={}, port={}, redis={}:{}, secret={})",
            server.base_url,
            server.relative_path,
            server.use_port,
            server.port,
            server.redis.host,
            server.redis.port,
            mask_sensitive(&server.secret)
        );

        let settings = baseline_settings();
        for (key, value) in &settings {
            self.persister.set_setting(key, value.clone()).await?;
        }

        self.persister.save(&server, &client).await?;

        Ok(StepOutcome::Completed(format!(
            "wrote config.json and public/config.json under {:?}, {} settings applied",
            self.persister.install_root(),
            settings.len()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::PresetAnswers;
    use crate::store::MemoryStore;

    fn answers(base_url: &str, use_port: &str, port: &str) -> Answers {
        [
            (BASE_URL, base_url),
            (PORT, port),
            (USE_PORT, use_port),
            (SECRET, "abc"),
            (REDIS_HOST, "127.0.0.1"),
            (REDIS_PORT, "6379"),
            (REDIS_PASSWORD, ""),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn forum_path_without_port() {
        let (server, client) = derive_configs(&answers("http://example.com/forum", "n", "4567")).unwrap();
        assert_eq!(server.base_url, "http://example.com");
        assert_eq!(server.relative_path, "/forum");
        assert_eq!(client.api_url, "http://example.com/forum/api/");
        assert_eq!(client.socket.address, "http://example.com");
        assert_eq!(client.relative_path, "/forum");
        assert!(!server.use_port);
    }

    #[test]
    fn port_is_appended_after_host_when_used() {
        let (server, client) = derive_configs(&answers("http://example.com/forum", "Yes", "4567")).unwrap();
        assert!(server.use_port);
        assert_eq!(server.base_url, "http://example.com");
        assert_eq!(client.socket.address, "http://example.com:4567");
        assert_eq!(client.api_url, "http://example.com:4567/forum/api/");
    }

    #[test]
    fn bare_host_or_slash_gives_empty_relative_path() {
        for url in ["http://localhost", "http://localhost/", "https://forum.example.org/"] {
            let (server, client) = derive_configs(&answers(url, "n", "4567")).unwrap();
            assert_eq!(server.relative_path, "", "{}", url);
            assert_eq!(client.relative_path, "", "{}", url);
        }
    }

    #[test]
    fn api_url_is_base_plus_relative_path_plus_api() {
        for url in [
            "http://localhost",
            "https://forum.example.org/community",
            "http://10.0.0.1/a/b",
            "http://example.com/forum/",
        ] {
            let (server, client) = derive_configs(&answers(url, "no", "4567")).unwrap();
            assert_eq!(
                client.api_url,
                format!("{}{}/api/", server.base_url, server.relative_path),
                "{}",
                url
            );
        }
    }

    #[test]
    fn longer_paths_are_kept_verbatim() {
        let base = parse_base_url("http://example.com/forum/").unwrap();
        assert_eq!(base.relative_path, "/forum/");
        let base = parse_base_url("http://example.com/a/b").unwrap();
        assert_eq!(base.relative_path, "/a/b");
    }

    #[test]
    fn explicit_url_port_stays_in_origin() {
        let base = parse_base_url("http://example.com:8080/forum").unwrap();
        assert_eq!(base.origin, "http://example.com:8080");
    }

    #[test]
    fn query_is_not_part_of_relative_path() {
        let base = parse_base_url("https://example.com/forum?x=1").unwrap();
        assert_eq!(base.relative_path, "/forum");
    }

    #[test]
    fn unparsable_url_is_invalid_url() {
        for url in ["not a url", "http://", "ftp://example.com", "mailto:a@b.com"] {
            let err = derive_configs(&answers(url, "n", "4567")).unwrap_err();
            assert!(matches!(err, SetupError::InvalidUrl { .. }), "{}: {:?}", url, err);
        }
    }

    #[test]
    fn use_port_reads_first_character() {
        assert!(parse_use_port("y"));
        assert!(parse_use_port("YES"));
        assert!(!parse_use_port("n"));
        assert!(!parse_use_port("no"));
        assert!(!parse_use_port(""));
    }

    #[test]
    fn fixed_fields_and_redis_object() {
        let mut a = answers("http://localhost", "y", "4567");
        a.insert(REDIS_PASSWORD, "pw");
        let (server, _) = derive_configs(&a).unwrap();
        assert_eq!(server.bcrypt_rounds, 12);
        assert_eq!(server.upload_path, "/public/uploads");
        assert_eq!(server.redis.host, "127.0.0.1");
        assert_eq!(server.redis.port, 6379);
        assert_eq!(server.redis.password, "pw");
        assert_eq!(server.secret, "abc");
    }

    #[test]
    fn derivation_is_deterministic() {
        let a = answers("https://forum.example.org/community", "y", "443");
        assert_eq!(derive_configs(&a).unwrap(), derive_configs(&a).unwrap());
    }

    #[tokio::test]
    async fn step_writes_settings_then_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let persister = ConfigPersister::new(dir.path(), store.clone());
        let answers = PresetAnswers::new()
            .with(BASE_URL, "http://example.com/forum")
            .with(USE_PORT, "n");
        let step = ConfigureStep::new(Arc::new(answers), persister);

        let outcome = step.run().await.unwrap();
        assert!(matches!(outcome, StepOutcome::Completed(_)));
        assert_eq!(store.setting("minimumPostLength").await, Some(serde_json::json!(8)));
        assert_eq!(store.journal().await.len(), 7);

        let text = std::fs::read_to_string(dir.path().join("public/config.json")).unwrap();
        let client: ClientConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(client.api_url, "http://example.com/forum/api/");
    }

    #[tokio::test]
    async fn invalid_url_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let persister = ConfigPersister::new(dir.path(), store.clone());
        // passes the collection pattern but has no host
        let answers = PresetAnswers::new().with(BASE_URL, "http://");
        let step = ConfigureStep::new(Arc::new(answers), persister);

        let err = step.run().await.unwrap_err();
        assert!(matches!(err, SetupError::InvalidUrl { .. }));
        assert!(store.journal().await.is_empty());
        assert!(!dir.path().join("config.json").exists());
    }
}
