//! Agent pool behaviour under concurrent first use.

use async_trait::async_trait;
use db_agent_server::agent::{AgentManager, ModelBuilder};
use db_agent_server::config::AgentConfig;
use db_agent_server::error::AgentResult;
use db_agent_server::models::{Model, Provider};
use db_agent_server::providers::{ChatModel, Completion, CompletionRequest};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

struct SlowModel {
    provider: Provider,
}

#[async_trait]
impl ChatModel for SlowModel {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn model_name(&self) -> &str {
        "slow"
    }

    async fn complete(&self, _request: CompletionRequest<'_>) -> AgentResult<Completion> {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(Completion::Text("{\"message\":\"ok\"}".to_string()))
    }
}

fn counting_builder(counter: Arc<AtomicUsize>) -> ModelBuilder {
    Arc::new(
        move |model: &Model, _config: &AgentConfig| -> AgentResult<Arc<dyn ChatModel>> {
            counter.fetch_add(1, Ordering::SeqCst);
            // Widen the race window between concurrent first requests
            std::thread::sleep(Duration::from_millis(5));
            let chat_model: Arc<dyn ChatModel> = Arc::new(SlowModel {
                provider: model.provider,
            });
            Ok(chat_model)
        },
    )
}

fn both_providers() -> AgentConfig {
    AgentConfig::new()
        .with_provider(Provider::Google, "g-key")
        .with_provider(Provider::OpenAI, "o-key")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_use_builds_one_agent() {
    let counter = Arc::new(AtomicUsize::new(0));
    let manager = Arc::new(AgentManager::with_model_builder(
        both_providers(),
        counting_builder(counter.clone()),
    ));

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.get_agent("gpt-4o-mini").await })
        })
        .collect();

    let mut agents = Vec::new();
    for handle in handles {
        agents.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert!(agents.iter().all(|a| Arc::ptr_eq(a, &agents[0])));
    assert_eq!(manager.agent_count().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_use_of_different_models() {
    let counter = Arc::new(AtomicUsize::new(0));
    let manager = Arc::new(AgentManager::with_model_builder(
        both_providers(),
        counting_builder(counter.clone()),
    ));

    let slugs = ["gpt-4o", "gemini-2.5-flash", "gpt-4o", "gemini-2.5-flash"];
    let handles: Vec<_> = slugs
        .iter()
        .cycle()
        .take(16)
        .map(|slug| {
            let manager = Arc::clone(&manager);
            let slug = slug.to_string();
            tokio::spawn(async move { manager.get_agent(&slug).await.map(|a| a.slug().to_string()) })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(manager.agent_count().await, 2);

    assert!(manager.close().await.is_done());
    assert_eq!(manager.agent_count().await, 0);
}
