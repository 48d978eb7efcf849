#![allow(dead_code)]

use async_trait::async_trait;
use health_assistant_service::config::AssistantConfig;
use health_assistant_service::services::metrics;
use health_assistant_service::services::providers::{ProviderError, TextProvider};
use health_assistant_service::startup::Application;
use service_core::config::Config as CoreConfig;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Provider replaying a script of results; answers "OK" once the script runs out.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<String, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn answering(text: &str) -> Arc<Self> {
        Self::new(vec![Ok(text.to_string())])
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("OK".to_string()))
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

pub fn overloaded() -> Result<String, ProviderError> {
    Err(ProviderError::Overloaded("503 Service Unavailable".to_string()))
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn(provider: Arc<dyn TextProvider>) -> Self {
        Self::spawn_with(provider, &[]).await
    }

    /// Spawn the application on a random port with extra configuration variables.
    pub async fn spawn_with(provider: Arc<dyn TextProvider>, vars: &[(&str, &str)]) -> Self {
        let mut env: HashMap<String, String> = HashMap::from([
            ("GOOGLE_API_KEY".to_string(), "test-api-key".to_string()),
            ("MODEL_INITIAL_DELAY_MS".to_string(), "10".to_string()),
            ("MODEL_MAX_DELAY_MS".to_string(), "50".to_string()),
            ("MODEL_REQUEST_TIMEOUT_SECS".to_string(), "10".to_string()),
        ]);
        for (key, value) in vars {
            env.insert(key.to_string(), value.to_string());
        }

        let mut common = CoreConfig::default();
        common.port = 0; // Random port for testing

        let config = AssistantConfig::from_source(common, |key| env.get(key).cloned())
            .expect("Failed to build configuration");

        metrics::init_metrics();

        let app = Application::build_with_provider(config, provider)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to accept connections
        let client = reqwest::Client::new();
        let health_url = format!("{}/api/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
        }

        TestApp {
            address,
            port,
            client,
        }
    }

    pub async fn post_json(&self, path: &str, body: &serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to send request")
    }
}
