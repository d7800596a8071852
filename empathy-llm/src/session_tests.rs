#[cfg(test)]
mod session_tests {
    use crate::config::*;
    use crate::error::LLMError;
    use crate::providers::MockGenerationBackend;
    use crate::session::ChatSession;
    use mockall::predicate::eq;
    use mockall::Sequence;
    use std::sync::Arc;

    fn response(content: &str) -> ChatResponse {
        ChatResponse {
            content: content.to_string(),
            model: "m".to_string(),
            usage: None,
            finish_reason: Some("STOP".to_string()),
        }
    }

    #[tokio::test]
    async fn test_first_accepted_model_is_pinned() {
        let mut backend = MockGenerationBackend::new();
        backend.expect_name().return_const("mock");
        let mut seq = Sequence::new();
        backend
            .expect_check_model()
            .with(eq("gemini-1.5-flash-latest"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|m| Err(LLMError::ModelNotAvailable(m.to_string())));
        backend
            .expect_check_model()
            .with(eq("gemini-1.5-pro-latest"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let session = ChatSession::start(Arc::new(backend), LLMConfig::default()).await.unwrap();
        assert_eq!(session.model(), "gemini-1.5-pro-latest");
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_every_candidate_rejected_is_fatal() {
        let mut backend = MockGenerationBackend::new();
        backend.expect_name().return_const("mock");
        backend
            .expect_check_model()
            .times(4)
            .returning(|m| Err(LLMError::ModelNotAvailable(m.to_string())));

        let err = ChatSession::start(Arc::new(backend), LLMConfig::default()).await.unwrap_err();
        assert!(err.is_fatal());
        match err {
            LLMError::AllModelsRejected(tried) => assert_eq!(tried.len(), 4),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_explicit_model_fails_hard() {
        let mut backend = MockGenerationBackend::new();
        backend.expect_name().return_const("mock");
        backend
            .expect_check_model()
            .with(eq("gemini-ultra"))
            .times(1)
            .returning(|m| Err(LLMError::ModelNotAvailable(m.to_string())));

        let config = LLMConfig {
            model: Some("gemini-ultra".to_string()),
            ..LLMConfig::default()
        };
        let err = ChatSession::start(Arc::new(backend), config).await.unwrap_err();
        assert!(matches!(err, LLMError::AllModelsRejected(ref tried) if tried == &vec!["gemini-ultra".to_string()]));
    }

    #[tokio::test]
    async fn test_auth_failure_is_not_a_model_rejection() {
        let mut backend = MockGenerationBackend::new();
        backend.expect_name().return_const("mock");
        backend
            .expect_check_model()
            .times(1)
            .returning(|_| Err(LLMError::AuthenticationFailed));

        let err = ChatSession::start(Arc::new(backend), LLMConfig::default()).await.unwrap_err();
        assert!(matches!(err, LLMError::AuthenticationFailed));
    }

    #[tokio::test]
    async fn test_reply_sends_history_and_commits_on_success() {
        let mut backend = MockGenerationBackend::new();
        backend.expect_name().return_const("mock");
        backend.expect_check_model().returning(|_| Ok(()));
        let mut seq = Sequence::new();
        backend
            .expect_chat()
            .withf(|req| {
                req.messages == vec![Message::user("hi")]
                    && req.system_instruction.as_deref() == Some(DEFAULT_SYSTEM_PROMPT)
                    && req.model == DEFAULT_MODEL
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response("  Hello there.  ")));
        backend
            .expect_chat()
            .withf(|req| {
                req.messages
                    == vec![
                        Message::user("hi"),
                        Message::model("Hello there."),
                        Message::user("how are you"),
                    ]
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response("I'm here for you.")));

        let mut session = ChatSession::start(Arc::new(backend), LLMConfig::default()).await.unwrap();
        assert_eq!(session.reply("hi").await.unwrap(), "Hello there.");
        assert_eq!(session.reply("how are you").await.unwrap(), "I'm here for you.");
        assert_eq!(session.history().len(), 4);
    }

    #[tokio::test]
    async fn test_failed_reply_leaves_history_untouched() {
        let mut backend = MockGenerationBackend::new();
        backend.expect_name().return_const("mock");
        backend.expect_check_model().returning(|_| Ok(()));
        let mut seq = Sequence::new();
        backend
            .expect_chat()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(LLMError::RateLimit));
        backend
            .expect_chat()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response("   ")));

        let mut session = ChatSession::start(Arc::new(backend), LLMConfig::default()).await.unwrap();
        assert!(matches!(session.reply("hello").await, Err(LLMError::RateLimit)));
        assert!(matches!(session.reply("hello").await, Err(LLMError::InvalidResponse(_))));
        assert!(session.history().is_empty());
    }
}
