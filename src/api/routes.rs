use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use crate::store::AudioStore;
use crate::tts::TtsService;

pub struct AppState {
    pub tts: TtsService,
    pub store: AudioStore,
    pub started_at: Instant,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let api_routes = Router::new()
        .route("/text-to-speech/:voice_id", post(handlers::synthesize))
        .route("/voices", get(handlers::list_voices));

    Router::new()
        .nest("/v1", api_routes)
        .route("/health", get(handlers::health))
        .route("/audio/:filename", get(handlers::serve_audio))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{
        body::Body,
        http::{Request, Response, StatusCode},
    };
    use http_body_util::BodyExt;
    use mockito::{Matcher, Server};
    use regex::Regex;
    use serde_json::{json, Value};
    use std::collections::HashSet;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const PUBLIC_URL: &str = "http://proxy.test";

    struct TestApp {
        router: Router,
        _audio_dir: TempDir,
    }

    async fn test_app(upstream_url: &str) -> TestApp {
        let audio_dir = tempfile::tempdir().unwrap();
        let config = Config {
            host: "127.0.0.1".into(),
            port: 0,
            api_key: "test-key".into(),
            public_base_url: PUBLIC_URL.into(),
            upstream_url: upstream_url.into(),
            audio_dir: audio_dir.path().to_path_buf(),
            upstream_timeout: Duration::from_secs(5),
        };
        let store = AudioStore::open(&config.audio_dir).await.unwrap();
        let tts = TtsService::new(&config, store.clone()).unwrap();
        let state = Arc::new(AppState {
            tts,
            store,
            started_at: Instant::now(),
        });
        TestApp {
            router: create_router(state),
            _audio_dir: audio_dir,
        }
    }

    fn synthesize_request(voice_id: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/v1/text-to-speech/{}", voice_id))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_bytes(response: Response<Body>) -> Vec<u8> {
        response
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec()
    }

    async fn body_json(response: Response<Body>) -> Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    #[tokio::test]
    async fn synthesize_returns_url_that_serves_the_audio() {
        let audio = b"\x00\x01\x02\x03ID3-fake-mp3".to_vec();
        let mut upstream = Server::new_async().await;
        let mock = upstream
            .mock("POST", "/v1/text-to-speech/abc123")
            .match_header("xi-api-key", "test-key")
            .match_query(Matcher::UrlEncoded(
                "output_format".into(),
                "mp3_44100_128".into(),
            ))
            .with_status(200)
            .with_header("content-type", "audio/mpeg")
            .with_body(&audio)
            .expect(1)
            .create_async()
            .await;
        let app = test_app(&upstream.url()).await;

        let response = app
            .router
            .clone()
            .oneshot(synthesize_request("abc123", json!({ "text": "Hello world" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["voice_id"], "abc123");
        assert_eq!(body["text_length"], 11);
        assert_eq!(body["model"], "eleven_multilingual_v2");
        assert_eq!(
            body["message"],
            "Audio generado exitosamente. El archivo estará disponible por 1 hora."
        );

        let audio_url = body["audio_url"].as_str().unwrap();
        let pattern = Regex::new(r"^http://proxy\.test/audio/[0-9a-f]{32}\.mp3$").unwrap();
        assert!(pattern.is_match(audio_url), "unexpected url {}", audio_url);
        mock.assert_async().await;

        let path = audio_url.trim_start_matches(PUBLIC_URL);
        let response = app.router.clone().oneshot(get(path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "audio/mpeg");
        assert_eq!(body_bytes(response).await, audio);
    }

    #[tokio::test]
    async fn forwards_model_settings_and_format() {
        let mut upstream = Server::new_async().await;
        let mock = upstream
            .mock("POST", "/v1/text-to-speech/voice-9")
            .match_query(Matcher::UrlEncoded(
                "output_format".into(),
                "mp3_22050_32".into(),
            ))
            .match_body(Matcher::Json(json!({
                "text": "Buenos días",
                "model_id": "eleven_turbo_v2_5",
                "voice_settings": {
                    "stability": 0.3,
                    "similarity_boost": 0.75,
                    "style": 0.0,
                    "use_speaker_boost": false,
                    "speed": 1.2
                }
            })))
            .with_status(200)
            .with_body("audio")
            .create_async()
            .await;
        let app = test_app(&upstream.url()).await;

        let request = Request::builder()
            .method("POST")
            .uri("/v1/text-to-speech/voice-9?output_format=mp3_22050_32")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({
                    "text": "Buenos días",
                    "model_id": "eleven_turbo_v2_5",
                    "voice_settings": {
                        "stability": 0.3,
                        "use_speaker_boost": false,
                        "speed": 1.2
                    }
                })
                .to_string(),
            ))
            .unwrap();
        let response = app.router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["model"], "eleven_turbo_v2_5");
        assert_eq!(body["text_length"], 11);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn blank_text_is_rejected_without_calling_upstream() {
        let mut upstream = Server::new_async().await;
        let mock = upstream
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let app = test_app(&upstream.url()).await;

        for body in [
            json!({ "text": "" }),
            json!({ "text": "   \n\t" }),
            json!({}),
            json!({ "text": null }),
        ] {
            let response = app
                .router
                .clone()
                .oneshot(synthesize_request("abc123", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_json(response).await["error"], "El texto es requerido");
        }

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let app = test_app("http://127.0.0.1:1").await;
        let request = Request::builder()
            .method("POST")
            .uri("/v1/text-to-speech/abc123")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn upstream_errors_map_to_statuses() {
        let cases = [
            (401, StatusCode::UNAUTHORIZED, "API key inválida"),
            (404, StatusCode::NOT_FOUND, "Voice ID no encontrado"),
            (429, StatusCode::TOO_MANY_REQUESTS, "Límite de cuota excedido"),
            (500, StatusCode::INTERNAL_SERVER_ERROR, "Error al generar audio"),
            (422, StatusCode::INTERNAL_SERVER_ERROR, "Error al generar audio"),
        ];

        for (upstream_status, expected, message) in cases {
            let mut upstream = Server::new_async().await;
            let _mock = upstream
                .mock("POST", "/v1/text-to-speech/abc123")
                .match_query(Matcher::Any)
                .with_status(upstream_status)
                .with_body(r#"{"detail":"nope"}"#)
                .create_async()
                .await;
            let app = test_app(&upstream.url()).await;

            let response = app
                .router
                .oneshot(synthesize_request("abc123", json!({ "text": "Hello world" })))
                .await
                .unwrap();

            assert_eq!(response.status(), expected, "upstream {}", upstream_status);
            let body = body_json(response).await;
            assert_eq!(body["error"], message);
            if expected == StatusCode::INTERNAL_SERVER_ERROR {
                let details = body["details"].as_str().unwrap();
                assert!(details.contains(&upstream_status.to_string()));
            } else {
                assert!(body.get("details").is_none());
            }
        }
    }

    #[tokio::test]
    async fn unreachable_upstream_is_a_server_error_with_details() {
        let app = test_app("http://127.0.0.1:1").await;

        let response = app
            .router
            .oneshot(synthesize_request("abc123", json!({ "text": "Hello world" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Error al generar audio");
        assert!(!body["details"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_requests_get_distinct_files() {
        const REQUESTS: usize = 16;

        let mut upstream = Server::new_async().await;
        let mock = upstream
            .mock("POST", "/v1/text-to-speech/abc123")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("audio")
            .expect(REQUESTS)
            .create_async()
            .await;
        let app = test_app(&upstream.url()).await;

        let mut tasks = Vec::new();
        for i in 0..REQUESTS {
            let router = app.router.clone();
            tasks.push(tokio::spawn(async move {
                let body = json!({ "text": format!("request {}", i) });
                let response = router
                    .oneshot(synthesize_request("abc123", body))
                    .await
                    .unwrap();
                assert_eq!(response.status(), StatusCode::OK);
                body_json(response).await["audio_url"]
                    .as_str()
                    .unwrap()
                    .to_string()
            }));
        }

        let mut urls = HashSet::new();
        for task in tasks {
            urls.insert(task.await.unwrap());
        }

        assert_eq!(urls.len(), REQUESTS);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn voices_are_relayed_verbatim() {
        // Key order and spacing must survive untouched.
        let catalogue =
            r#"{"voices":[{"voice_id":"a","name":"Rachel","category":"premade"}], "has_more":false}"#;
        let mut upstream = Server::new_async().await;
        let mock = upstream
            .mock("GET", "/v1/voices")
            .match_header("xi-api-key", "test-key")
            .with_status(200)
            .with_header("content-type", "application/json; charset=utf-8")
            .with_body(catalogue)
            .create_async()
            .await;
        let app = test_app(&upstream.url()).await;

        let response = app.router.oneshot(get("/v1/voices")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "application/json; charset=utf-8"
        );
        assert_eq!(body_bytes(response).await, catalogue.as_bytes());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_json_voices_body_is_still_relayed() {
        let mut upstream = Server::new_async().await;
        let _mock = upstream
            .mock("GET", "/v1/voices")
            .with_status(200)
            .with_header("content-type", "text/plain")
            .with_body("maintenance window")
            .create_async()
            .await;
        let app = test_app(&upstream.url()).await;

        let response = app.router.oneshot(get("/v1/voices")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/plain");
        assert_eq!(body_bytes(response).await, b"maintenance window");
    }

    #[tokio::test]
    async fn voices_failures_are_generic() {
        for status in [401, 404, 500] {
            let mut upstream = Server::new_async().await;
            let _mock = upstream
                .mock("GET", "/v1/voices")
                .with_status(status)
                .create_async()
                .await;
            let app = test_app(&upstream.url()).await;

            let response = app.router.oneshot(get("/v1/voices")).await.unwrap();

            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(
                body_json(response).await,
                json!({ "error": "Error al obtener voces" })
            );
        }
    }

    #[tokio::test]
    async fn health_reports_uptime() {
        let app = test_app("http://127.0.0.1:1").await;

        let response = app.router.oneshot(get("/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "ElevenLabs Proxy");
        assert!(body["uptime"].as_f64().unwrap() >= 0.0);
    }

    #[tokio::test]
    async fn unknown_audio_is_not_found() {
        let app = test_app("http://127.0.0.1:1").await;

        let response = app
            .router
            .oneshot(get("/audio/0123456789abcdef0123456789abcdef.mp3"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn audio_outside_generated_names_is_not_found() {
        let app = test_app("http://127.0.0.1:1").await;

        for uri in [
            "/audio/hello.mp3",
            "/audio/..%2FCargo.toml",
            "/audio/..%2F..%2Fetc%2Fpasswd",
            "/audio/%2Fetc%2Fpasswd",
            "/audio/..",
        ] {
            let response = app.router.clone().oneshot(get(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
            assert_eq!(
                body_json(response).await,
                json!({ "error": "Archivo no encontrado" })
            );
        }
    }

    #[tokio::test]
    async fn bad_query_string_is_a_json_bad_request() {
        let mut upstream = Server::new_async().await;
        let mock = upstream
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let app = test_app(&upstream.url()).await;

        let request = Request::builder()
            .method("POST")
            .uri("/v1/text-to-speech/abc123?output_format=mp3_44100_128&output_format=pcm_16000")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "text": "Hello world" }).to_string()))
            .unwrap();
        let response = app.router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()["content-type"], "application/json");
        assert!(body_json(response).await["error"].is_string());
        mock.assert_async().await;
    }
}
