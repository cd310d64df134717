//! Integration tests for the chat page

mod test_utils;

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use mockito::Matcher;
    use serde_json::json;
    use tower::util::ServiceExt;

    use study_tutor::chat::Role;
    use study_tutor::chat::db::find_transcript;
    use study_tutor::gemini::UNAVAILABLE_REPLY;

    use crate::test_utils::{GENERATE_PATH, body_to_string, eventually, gemini_reply, test_app};

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_form(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .method("POST")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    /// Tests the landing page sends visitors to the chat
    #[tokio::test]
    async fn it_redirects_index_to_chat() {
        let (app, _state) = test_app("http://127.0.0.1:9").await;

        let response = app.oneshot(get("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/chat");
    }

    /// Tests a fresh visitor gets the guest view
    #[tokio::test]
    async fn it_shows_guest_mode_when_signed_out() {
        let (app, _state) = test_app("http://127.0.0.1:9").await;

        let response = app.oneshot(get("/chat")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
        let body = body_to_string(response.into_body()).await;
        assert!(body.contains("You are in Guest Mode"));
        assert!(body.contains("Ask your Gemini Tutor about academic topics."));
        assert!(body.contains(r#"href="/login""#));
    }

    /// Tests a guest question is answered on the page but never stored
    #[tokio::test]
    async fn it_answers_guest_question() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Regex(GENERATE_PATH.to_string()))
            .match_query(Matcher::UrlEncoded("key".into(), "test-api-key".into()))
            .match_body(Matcher::PartialJson(json!({
                "contents": [{"parts": [{"text": "What is osmosis?"}]}],
                "systemInstruction": {"parts": [{"text": "You are a study tutor."}]}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(gemini_reply("Water moves across a **membrane**."))
            .expect(1)
            .create_async()
            .await;
        let (app, state) = test_app(&server.url()).await;

        let response = app
            .clone()
            .oneshot(post_form("/chat", "text=What+is+osmosis%3F"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/chat#latest");
        mock.assert_async().await;

        let response = app.oneshot(get("/chat")).await.unwrap();
        let body = body_to_string(response.into_body()).await;
        assert!(body.contains("What is osmosis?"));
        assert!(body.contains("Water moves across a <strong>membrane</strong>."));
        assert!(body.contains(r#"href="https://bio.example/osmosis""#));
        assert!(body.contains(r#"id="latest""#));
        assert!(!body.contains("Ask your Gemini Tutor about academic topics."));

        let messages = state.controller.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
        assert!(
            find_transcript(&state.db, "test-app", "")
                .await
                .unwrap()
                .is_empty()
        );
    }

    /// Tests blank questions never reach the model
    #[tokio::test]
    async fn it_ignores_blank_question() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Regex(GENERATE_PATH.to_string()))
            .expect(0)
            .create_async()
            .await;
        let (app, state) = test_app(&server.url()).await;

        let response = app.oneshot(post_form("/chat", "text=+++")).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(state.controller.messages().is_empty());
        mock.assert_async().await;
    }

    /// Tests a failing model shows the fallback reply instead of an error
    #[tokio::test]
    async fn it_shows_fallback_when_model_fails() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", Matcher::Regex(GENERATE_PATH.to_string()))
            .with_status(503)
            .create_async()
            .await;
        let (app, _state) = test_app(&server.url()).await;

        app.clone()
            .oneshot(post_form("/chat", "text=Explain+gravity"))
            .await
            .unwrap();
        let response = app.oneshot(get("/chat")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_to_string(response.into_body()).await;
        assert!(body.contains(UNAVAILABLE_REPLY));
    }

    /// Tests a signed in user's conversation is saved in order
    #[tokio::test]
    async fn it_saves_signed_in_conversation() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", Matcher::Regex(GENERATE_PATH.to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(gemini_reply("Mitochondria make ATP."))
            .create_async()
            .await;
        let (app, state) = test_app(&server.url()).await;

        let response = app
            .clone()
            .oneshot(post_form(
                "/register",
                "email=ada%40example.com&password=secret1",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let uid = state.identity.current_user().unwrap().uid;

        app.clone()
            .oneshot(post_form("/chat", "text=What+do+mitochondria+do%3F"))
            .await
            .unwrap();

        let db = state.db.clone();
        let mut stored = Vec::new();
        for _ in 0..500 {
            stored = find_transcript(&db, "test-app", &uid).await.unwrap();
            if stored.len() == 2 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].role, Role::User);
        assert_eq!(stored[0].text, "What do mitochondria do?");
        assert_eq!(stored[1].role, Role::Assistant);
        assert_eq!(stored[1].text, "Mitochondria make ATP.");
        assert_eq!(stored[1].sources.len(), 1);

        eventually(|| state.controller.messages().len() == 2).await;

        let response = app.oneshot(get("/chat")).await.unwrap();
        let body = body_to_string(response.into_body()).await;
        assert!(body.contains("Logged in as ada@example.com"));
        assert!(!body.contains("You are in Guest Mode"));
        assert!(body.contains("Mitochondria make ATP."));
    }

    /// Tests logging out clears the page and returns to guest mode
    #[tokio::test]
    async fn it_clears_conversation_on_logout() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", Matcher::Regex(GENERATE_PATH.to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(gemini_reply("Answer"))
            .create_async()
            .await;
        let (app, state) = test_app(&server.url()).await;
        state
            .identity
            .sign_up("ada@example.com", "secret1")
            .await
            .unwrap();
        app.clone()
            .oneshot(post_form("/chat", "text=Question"))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(post_form("/logout", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        assert!(state.identity.current_user().is_none());
        assert!(state.controller.messages().is_empty());
        let response = app.oneshot(get("/chat")).await.unwrap();
        let body = body_to_string(response.into_body()).await;
        assert!(body.contains("You are in Guest Mode"));
        assert!(!body.contains("Answer"));
    }
}
