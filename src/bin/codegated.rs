//! Gateway binary entrypoint.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use codegate::alerts::AlertSink;
use codegate::config::GatewayConfig;
use codegate::db::{InMemoryStore, ProviderType};
use codegate::matchers::SimilarityOracle;
use codegate::pipeline::input::InputPipelineInstance;
use codegate::pipeline::output::OutputPipelineInstance;
use codegate::pipeline::steps::cli::CliShortcutStep;
use codegate::pipeline::steps::code_comment::CodeCommentStep;
use codegate::pipeline::steps::context_retriever::{ContextRetrieverStep, PackageStatus, PackageVectorStore};
use codegate::pipeline::steps::pii::PiiStep;
use codegate::pipeline::steps::secrets::SecretsStep;
use codegate::providers::anthropic::AnthropicAdapter;
use codegate::providers::ollama::OllamaAdapter;
use codegate::providers::openai::OpenAiAdapter;
use codegate::providers::ProviderAdapter;
use codegate::registry::RuleRegistry;
use codegate::router::MuxingRouter;
use codegate::server::{build_router, GatewayState};
use codegate::session_store::SessionStore;

/// Placeholder similarity oracle until the gateway is wired to a real embeddings service (§1:
/// summarized external collaborator, not reimplemented). Always reports no match, so
/// persona-description mux rules simply never fire until a real oracle is plugged in.
struct NoopSimilarityOracle;

#[async_trait]
impl SimilarityOracle for NoopSimilarityOracle {
    async fn similarity(&self, _persona_id: &str, _text: &str) -> f32 {
        0.0
    }
}

/// Placeholder package vector store, same rationale as [`NoopSimilarityOracle`]: until a real
/// embeddings index is wired in, no package ever looks malicious or archived.
struct NoopPackageVectorStore;

#[async_trait]
impl PackageVectorStore for NoopPackageVectorStore {
    async fn lookup(&self, _package_name: &str) -> Option<PackageStatus> {
        None
    }
}

fn load_secrets_step(config: &GatewayConfig) -> SecretsStep {
    match std::fs::read_to_string(&config.secrets_signatures_path) {
        Ok(yaml) => match SecretsStep::from_yaml(&yaml) {
            Ok(step) => step,
            Err(err) => {
                log::warn!(
                    "failed to parse {}: {err}; starting with no secret signatures",
                    config.secrets_signatures_path.display()
                );
                SecretsStep::new(Vec::new())
            }
        },
        Err(err) => {
            log::warn!(
                "failed to read {}: {err}; starting with no secret signatures",
                config.secrets_signatures_path.display()
            );
            SecretsStep::new(Vec::new())
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = GatewayConfig::default();
    let store: Arc<dyn codegate::db::PersistenceStore> = Arc::new(InMemoryStore::new());
    let registry = Arc::new(RuleRegistry::new());
    let alerts = Arc::new(AlertSink::new(store.clone()));
    let oracle: Arc<dyn SimilarityOracle> = Arc::new(NoopSimilarityOracle);
    let router = Arc::new(MuxingRouter::new(registry.clone(), oracle.clone()));
    let session_store = SessionStore::new();
    let vector_store: Arc<dyn PackageVectorStore> = Arc::new(NoopPackageVectorStore);

    let input_pipeline = Arc::new(InputPipelineInstance::new(vec![
        Box::new(CliShortcutStep::new(store.clone(), registry.clone())),
        Box::new(load_secrets_step(&config)),
        Box::new(PiiStep::new()),
        Box::new(ContextRetrieverStep::new(vector_store.clone())),
    ]));
    let output_pipeline = Arc::new(OutputPipelineInstance::new(vec![Box::new(CodeCommentStep::new(vector_store))]));

    let openai_adapter: Arc<dyn ProviderAdapter> = Arc::new(OpenAiAdapter::new());
    let providers: HashMap<ProviderType, Arc<dyn ProviderAdapter>> = HashMap::from([
        (ProviderType::Openai, openai_adapter.clone()),
        (ProviderType::Vllm, openai_adapter.clone()),
        (ProviderType::Llamacpp, openai_adapter.clone()),
        (ProviderType::Openrouter, openai_adapter),
        (ProviderType::Anthropic, Arc::new(AnthropicAdapter::new()) as Arc<dyn ProviderAdapter>),
        (ProviderType::Ollama, Arc::new(OllamaAdapter::new()) as Arc<dyn ProviderAdapter>),
    ]);

    let state = Arc::new(GatewayState {
        store,
        registry,
        alerts,
        router,
        oracle,
        session_store,
        input_pipeline,
        output_pipeline,
        providers,
    });
    let app = build_router(state);

    log::info!("codegate listening on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .expect("failed to bind listen address");
    axum::serve(listener, app).await.expect("server error");
}
