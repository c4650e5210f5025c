//! 端到端场景：通过公开的 Agent API 驱动完整的一轮请求

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use commander::config::AppConfig;
    use commander::core::AgentBuilder;
    use commander::llm::{LlmBackend, MockBackend};
    use commander::memory::Role;
    use commander::react::SilentObserver;
    use commander::Agent;
    use tempfile::TempDir;

    fn agent_with(
        dir: &TempDir,
        primary: Arc<MockBackend>,
        secondary: Option<Arc<MockBackend>>,
    ) -> Agent {
        let components = AgentBuilder::new(AppConfig::default())
            .with_primary(primary)
            .with_secondary(secondary.map(|s| s as Arc<dyn LlmBackend>))
            .with_cache_dir(dir.path())
            .build_components()
            .unwrap();
        Agent::new(components)
    }

    #[tokio::test]
    async fn test_memorize_skips_backend() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(MockBackend::new());
        let mut agent = agent_with(&dir, backend.clone(), None);

        let request = "remember that my favorite color is blue";
        let response = agent.handle_request(request, &SilentObserver).await;

        assert_eq!(backend.calls(), 0);
        assert_eq!(agent.memory().notepad(), vec![request.to_string()]);
        assert_eq!(response, "Added to notepad memory.");
    }

    #[tokio::test]
    async fn test_simple_question_answered_directly() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(MockBackend::with_texts(["4"]));
        let mut agent = agent_with(&dir, backend.clone(), None);

        let response = agent.handle_request("what is 2+2?", &SilentObserver).await;

        assert_eq!(response, "4");
        assert_eq!(backend.calls(), 1);
        let trace = agent
            .history()
            .messages()
            .iter()
            .find(|m| m.role == Role::Plan)
            .map(|m| m.content.clone())
            .unwrap();
        let plan: serde_json::Value = serde_json::from_str(&trace).unwrap();
        assert_eq!(plan["tool"], "none");
        assert_eq!(plan["message"], "4");
    }

    #[tokio::test]
    async fn test_task_end_write_stops_immediately() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a.txt");
        let directive = serde_json::json!({
            "tool": "write_file",
            "args": {"path": target.to_string_lossy(), "content": "hi"}
        });
        let backend = Arc::new(MockBackend::with_texts([format!("{} TASK_END", directive)]));
        let mut agent = agent_with(&dir, backend.clone(), None);

        let response = agent
            .handle_request("write hi into a.txt", &SilentObserver)
            .await;

        assert_eq!(response, format!("Wrote to {}.", target.display()));
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "hi");
        assert_eq!(backend.calls(), 1);
        assert_eq!(
            agent.memory().state().last_request.as_deref(),
            Some("write hi into a.txt")
        );
    }

    #[tokio::test]
    async fn test_both_tiers_down_returns_message() {
        let dir = TempDir::new().unwrap();
        let primary = Arc::new(MockBackend::failing("connection refused"));
        let secondary = Arc::new(MockBackend::failing("api unreachable"));
        let mut agent = agent_with(&dir, primary.clone(), Some(secondary.clone()));

        let response = agent.handle_request("open my notes", &SilentObserver).await;

        assert!(response.starts_with("Planning failed"));
        assert!(response.contains("connection refused"));
        assert!(response.contains("api unreachable"));
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_follow_ups_are_bounded() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(
            MockBackend::with_texts([r#"{"tool": "run_command", "args": {"cmd": "echo hi"}}"#])
                .repeating(),
        );
        let mut agent = agent_with(&dir, backend.clone(), None);

        let response = agent.handle_request("keep going", &SilentObserver).await;

        assert_eq!(response, "hi");
        assert_eq!(backend.calls(), 1 + agent.max_steps());
    }

    #[tokio::test]
    async fn test_session_resume_keeps_history() {
        let dir = TempDir::new().unwrap();
        let first_path = {
            let backend = Arc::new(MockBackend::with_texts([
                r#"{"tool": "echo", "args": {"text": "hello"}}"#,
            ]));
            let mut agent = agent_with(&dir, backend, None);
            agent.handle_request("say hello", &SilentObserver).await;
            agent.session_path().to_path_buf()
        };

        let backend = Arc::new(MockBackend::with_texts([
            r#"{"tool": "echo", "args": {"text": "again"}}"#,
        ]));
        let mut agent = agent_with(&dir, backend.clone(), None);
        assert_eq!(agent.sessions().list(), vec![first_path.clone()]);

        agent.resume(&first_path).unwrap();
        let before = agent.history().len();
        let response = agent.handle_request("say it again", &SilentObserver).await;

        assert_eq!(response, "again");
        assert!(backend.prompts()[0].contains("say hello"));
        let reloaded = agent.sessions().load(&first_path).unwrap();
        assert!(reloaded.len() > before);
    }
}
