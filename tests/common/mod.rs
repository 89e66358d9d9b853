use axum::Router;

pub async fn create_test_app() -> Router {
    std::env::set_var("DATABASE_URL", "");
    std::env::set_var("JWT_SECRET", "test-secret");
    std::env::set_var("DICTIONARY_LOOKUP_ENABLED", "false");

    vocabquiz_backend_rust::create_app().await
}
