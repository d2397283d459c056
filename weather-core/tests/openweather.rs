use weather_core::{
    ProviderError, WeatherProvider,
    config::OpenWeatherConfig,
    provider::{Endpoint, openweather::OpenWeatherProvider},
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

fn provider_for(server: &MockServer) -> OpenWeatherProvider {
    let config = OpenWeatherConfig {
        api_key: None,
        base_url: format!("{}/data/2.5/", server.uri()),
        timeout_secs: 5,
    };
    OpenWeatherProvider::from_config(&config, "TEST_KEY".to_string()).unwrap()
}

#[tokio::test]
async fn current_sends_city_and_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "Paris"))
        .and(query_param("appid", "TEST_KEY"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"weather":[{"description":"clear sky"}],
                "main":{"temp":300.0,"humidity":40},
                "wind":{"speed":5.5},"dt":1717405200,"name":"Paris"}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let snap = provider_for(&server).current("Paris").await.unwrap();

    assert_eq!(snap.description, "clear sky");
    assert_eq!(snap.humidity_pct, 40);
    assert_eq!(snap.wind_speed_mps, 5.5);
}

#[tokio::test]
async fn forecast_returns_series_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .and(query_param("q", "Oslo"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"list":[
                {"dt":1717394400,"main":{"temp":280.0,"humidity":90},
                 "weather":[{"description":"light snow"}],"dt_txt":"2024-06-03 06:00:00"},
                {"dt":1717405200,"main":{"temp":282.0,"humidity":85},
                 "weather":[{"description":"overcast clouds"}],"dt_txt":"2024-06-03 09:00:00"}
            ],"city":{"name":"Oslo","country":"NO"}}"#,
        ))
        .mount(&server)
        .await;

    let series = provider_for(&server).forecast("Oslo").await.unwrap();

    let descriptions: Vec<_> = series.entries.iter().map(|e| e.description.as_str()).collect();
    assert_eq!(descriptions, vec!["light snow", "overcast clouds"]);
}

#[tokio::test]
async fn non_success_status_carries_upstream_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(
            ResponseTemplate::new(404).set_body_string(r#"{"cod":"404","message":"city not found"}"#),
        )
        .mount(&server)
        .await;

    let err = provider_for(&server).current("Atlantis").await.unwrap_err();

    match err {
        ProviderError::Status { endpoint, status, body } => {
            assert_eq!(endpoint, Endpoint::Current);
            assert_eq!(status, 404);
            assert!(body.contains("city not found"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn garbage_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = provider_for(&server).forecast("Paris").await.unwrap_err();

    assert!(matches!(err, ProviderError::Decode { endpoint: Endpoint::Forecast, .. }));
}

#[tokio::test]
async fn unreachable_host_is_a_transport_error() {
    let provider = OpenWeatherProvider::new("TEST_KEY".to_string()).with_base_url("http://127.0.0.1:1");

    let err = provider.current("Paris").await.unwrap_err();

    assert!(matches!(err, ProviderError::Transport { endpoint: Endpoint::Current, .. }));
}
