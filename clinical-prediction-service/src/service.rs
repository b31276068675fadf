use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{HeaderValue, StatusCode},
    response::Json,
    routing::{get, post},
};
use risk_core::{
    ImageAnalyzer, Modality, ModelArtifacts, RiskError, RiskScorer, VitalsInput, classify_tier,
    recommendations_for, recommended_tests,
};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::{
    config::ServiceConfig,
    models::{ImageAnalysisResponse, PredictionResponse},
    uploads::StoredUpload,
};

/// Upper bound on an uploaded scan.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;
type ApiError = (StatusCode, Json<Value>);

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "detail": message })))
}

fn internal_error(message: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "detail": message })),
    )
}

fn model_unavailable(what: &str) -> ApiError {
    let err = RiskError::ModelUnavailable(format!("{what} not loaded"));
    internal_error(&err.to_string())
}

#[derive(Clone)]
pub struct AppState {
    /// Absent when the fitted artifacts failed to load; the vitals endpoint
    /// is degraded until the process restarts with loadable artifacts.
    pub scorer: Option<Arc<RiskScorer>>,
    pub analyzer: Option<Arc<ImageAnalyzer>>,
    pub upload_dir: PathBuf,
}

pub fn create_app(config: &ServiceConfig) -> Router {
    let app_state = create_app_state(config);
    build_router(app_state, &config.allowed_origin)
}

fn create_app_state(config: &ServiceConfig) -> AppState {
    if let Err(e) = std::fs::create_dir_all(&config.upload_dir) {
        error!(
            "Failed to create upload directory {}: {}",
            config.upload_dir.display(),
            e
        );
        std::process::exit(1);
    }

    // A missing model degrades the vitals endpoint instead of refusing to
    // start; the imaging endpoints stay available either way.
    let scorer = match ModelArtifacts::load(&config.model_dir) {
        Ok(artifacts) => Some(Arc::new(artifacts.into_scorer())),
        Err(e) => {
            error!(
                "Failed to load model artifacts from {}: {}",
                config.model_dir.display(),
                e
            );
            None
        }
    };

    AppState {
        scorer,
        analyzer: Some(Arc::new(ImageAnalyzer::with_default_scorers())),
        upload_dir: config.upload_dir.clone(),
    }
}

fn build_router(app_state: AppState, allowed_origin: &str) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/predict", post(predict))
        .route("/analyze/chest-xray", post(analyze_chest_xray))
        .route("/analyze/skin-cancer", post(analyze_skin_cancer))
        .route("/analyze/brain-tumor", post(analyze_brain_tumor))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors_layer(allowed_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

fn cors_layer(allowed_origin: &str) -> CorsLayer {
    match allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true),
        Err(_) => {
            warn!(
                "Invalid allowed origin {:?}; allowing any origin without credentials",
                allowed_origin
            );
            CorsLayer::permissive()
        }
    }
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to Clinical Test Prediction API" }))
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

async fn predict(
    State(state): State<AppState>,
    Json(vitals): Json<VitalsInput>,
) -> ApiResult<PredictionResponse> {
    let scorer = state
        .scorer
        .as_ref()
        .ok_or_else(|| model_unavailable("Model"))?;

    let prediction = scorer.score(&vitals.feature_vector());
    let recommended = recommended_tests(prediction.prediction);

    info!(
        prediction = prediction.prediction,
        confidence = prediction.confidence,
        tests = recommended.len(),
        "Scored vitals"
    );

    Ok(Json(PredictionResponse {
        prediction: prediction.prediction,
        confidence: prediction.confidence,
        recommended_tests: recommended,
    }))
}

async fn analyze_chest_xray(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<ImageAnalysisResponse> {
    run_image_analysis(state, Modality::ChestXray, multipart).await
}

async fn analyze_skin_cancer(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<ImageAnalysisResponse> {
    run_image_analysis(state, Modality::SkinCancer, multipart).await
}

async fn analyze_brain_tumor(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<ImageAnalysisResponse> {
    run_image_analysis(state, Modality::BrainTumor, multipart).await
}

async fn run_image_analysis(
    state: AppState,
    modality: Modality,
    multipart: Multipart,
) -> ApiResult<ImageAnalysisResponse> {
    let analyzer = state
        .analyzer
        .clone()
        .ok_or_else(|| model_unavailable("Image analyzer"))?;

    let (file_name, bytes) = read_image_field(multipart).await?;

    let stored = StoredUpload::write(&state.upload_dir, &file_name, &bytes).map_err(|e| {
        error!("Failed to store upload: {}", e);
        internal_error("Failed to store uploaded file")
    })?;

    info!(modality = %modality, bytes = bytes.len(), "Analyzing uploaded image");

    // Decoding and scoring are CPU-bound; keep them off the runtime workers.
    let path = stored.path().to_path_buf();
    let result = tokio::task::spawn_blocking(move || analyzer.analyze(modality, &path))
        .await
        .map_err(|e| {
            error!("Image analysis task panicked: {}", e);
            internal_error("Image analysis failed")
        })?;
    drop(stored);

    let tier = classify_tier(modality, &result);
    let recommendations = recommendations_for(modality, tier)
        .iter()
        .map(|entry| (*entry).to_string())
        .collect();
    let confidence = result.confidence();

    Ok(Json(ImageAnalysisResponse {
        results: result,
        recommendations,
        confidence,
    }))
}

async fn read_image_field(mut multipart: Multipart) -> Result<(String, Bytes), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request_error(&format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request_error(&format!("failed to read uploaded file: {e}")))?;
        return Ok((file_name, bytes));
    }

    Err(bad_request_error("multipart field 'file' is required"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use risk_core::{FEATURE_COUNT, FeatureScaler, RiskClassifier};
    use std::path::Path;
    use tower::ServiceExt;

    const BOUNDARY: &str = "test-boundary";

    fn constant_scorer(positive_rate: f64) -> Arc<RiskScorer> {
        Arc::new(RiskScorer::new(
            FeatureScaler {
                mean: [0.0; FEATURE_COUNT],
                std: [1.0; FEATURE_COUNT],
            },
            RiskClassifier {
                weights: [0.0; FEATURE_COUNT],
                intercept: (positive_rate / (1.0 - positive_rate)).ln(),
            },
        ))
    }

    /// Scorer whose output genuinely depends on the numeric vitals.
    fn weighted_scorer() -> Arc<RiskScorer> {
        Arc::new(RiskScorer::new(
            FeatureScaler {
                mean: [45.0, 0.5, 120.0, 75.0, 37.0, 200.0, 100.0, 25.0],
                std: [15.0, 0.5, 15.0, 10.0, 0.5, 30.0, 15.0, 5.0],
            },
            RiskClassifier {
                weights: [0.3; FEATURE_COUNT],
                intercept: -0.4,
            },
        ))
    }

    fn test_state(upload_dir: &Path, scorer: Option<Arc<RiskScorer>>) -> AppState {
        AppState {
            scorer,
            analyzer: Some(Arc::new(ImageAnalyzer::with_default_scorers())),
            upload_dir: upload_dir.to_path_buf(),
        }
    }

    fn test_app(state: AppState) -> Router {
        build_router(state, "http://localhost:3000")
    }

    fn vitals_json() -> Value {
        json!({
            "age": 52.0,
            "gender": 1,
            "blood_pressure": 131.0,
            "heart_rate": 88.0,
            "temperature": 37.4,
            "cholesterol": 224.0,
            "glucose": 109.0,
            "bmi": 27.8,
            "symptoms": ["fatigue"],
            "previous_conditions": []
        })
    }

    fn png_bytes() -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        image::RgbImage::new(20, 20)
            .write_to(&mut cursor, image::ImageFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    fn multipart_body(field_name: &str, file_name: &str, bytes: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field_name}\"; filename=\"{file_name}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn read_response(response: axum::response::Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn send_get(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        read_response(response).await
    }

    async fn send_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        read_response(response).await
    }

    async fn send_upload(
        app: Router,
        uri: &str,
        field_name: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={BOUNDARY}"),
                    )
                    .body(Body::from(multipart_body(field_name, file_name, bytes)))
                    .unwrap(),
            )
            .await
            .unwrap();
        read_response(response).await
    }

    #[tokio::test]
    async fn root_returns_welcome_message() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(test_state(dir.path(), None));

        let (status, body) = send_get(app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Welcome to Clinical Test Prediction API");
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(test_state(dir.path(), None));

        let (status, body) = send_get(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "healthy" }));
    }

    #[tokio::test]
    async fn predict_without_artifacts_reports_model_not_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(test_state(dir.path(), None));

        let (status, body) = send_json(app, "/predict", vitals_json()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Model not loaded");
    }

    #[tokio::test]
    async fn predict_returns_tier_recommendations() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(test_state(dir.path(), Some(constant_scorer(0.65))));

        let (status, body) = send_json(app, "/predict", vitals_json()).await;
        assert_eq!(status, StatusCode::OK);
        assert!((body["prediction"].as_f64().unwrap() - 0.65).abs() < 1e-9);
        assert!((body["confidence"].as_f64().unwrap() - 0.65).abs() < 1e-9);
        assert_eq!(
            body["recommended_tests"],
            json!([
                "Complete Blood Count (CBC)",
                "Basic Metabolic Panel",
                "Lipid Panel",
                "Thyroid Function Test",
                "Urinalysis",
                "ECG",
                "Liver Function Test",
            ])
        );
    }

    #[tokio::test]
    async fn predict_ignores_symptom_payload() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(test_state(dir.path(), Some(weighted_scorer())));

        let mut with_symptoms = vitals_json();
        with_symptoms["symptoms"] = json!(["chest pain", "dizziness", "nausea"]);
        with_symptoms["previous_conditions"] = json!(["diabetes", "asthma"]);

        let mut shifted_vitals = vitals_json();
        shifted_vitals["blood_pressure"] = json!(160.0);

        let (_, baseline) = send_json(app.clone(), "/predict", vitals_json()).await;
        let (_, symptom_loaded) = send_json(app.clone(), "/predict", with_symptoms).await;
        let (_, shifted) = send_json(app, "/predict", shifted_vitals).await;

        // symptoms and prior conditions are accepted but never scored
        assert_eq!(baseline["prediction"], symptom_loaded["prediction"]);
        assert_eq!(
            baseline["recommended_tests"],
            symptom_loaded["recommended_tests"]
        );
        // while the numeric vitals do move the prediction
        assert_ne!(baseline["prediction"], shifted["prediction"]);
    }

    #[tokio::test]
    async fn predict_rejects_malformed_body() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(test_state(dir.path(), Some(constant_scorer(0.3))));

        let mut missing_age = vitals_json();
        missing_age.as_object_mut().unwrap().remove("age");

        let (status, _) = send_json(app, "/predict", missing_age).await;
        assert!(status.is_client_error());
    }

    #[tokio::test]
    async fn analyze_returns_recommendations_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(test_state(dir.path(), None));

        let (status, body) =
            send_upload(app, "/analyze/skin-cancer", "file", "lesion.png", &png_bytes()).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["results"].get("error").is_none());
        assert!(body["results"]["benign_probability"].is_f64());
        assert!(body["results"]["malignant_probability"].is_f64());
        assert_eq!(body["recommendations"].as_array().unwrap().len(), 3);
        assert!(body["confidence"].as_f64().unwrap() > 0.0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn analyze_reports_inline_error_for_corrupt_image() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(test_state(dir.path(), None));

        let (status, body) =
            send_upload(app, "/analyze/brain-tumor", "file", "scan.png", b"not an image").await;

        assert_eq!(status, StatusCode::OK);
        let error = body["results"]["error"].as_str().unwrap();
        assert!(error.contains("image analysis failed"));
        assert_eq!(body["confidence"], 0.0);
        assert_eq!(
            body["recommendations"],
            json!([
                "Regular check-ups",
                "Monitor for any changes",
                "Maintain healthy lifestyle",
            ])
        );
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn analyze_without_analyzer_reports_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = test_state(dir.path(), None);
        state.analyzer = None;
        let app = test_app(state);

        let (status, body) =
            send_upload(app, "/analyze/chest-xray", "file", "scan.png", &png_bytes()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Image analyzer not loaded");
    }

    #[tokio::test]
    async fn analyze_requires_file_field() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(test_state(dir.path(), None));

        let (status, body) =
            send_upload(app, "/analyze/chest-xray", "image", "scan.png", &png_bytes()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "multipart field 'file' is required");
    }

    #[tokio::test]
    async fn chest_analysis_names_both_diseases() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(test_state(dir.path(), None));

        let (status, body) =
            send_upload(app, "/analyze/chest-xray", "file", "xray.png", &png_bytes()).await;

        assert_eq!(status, StatusCode::OK);
        for field in [
            "normal_probability",
            "pneumonia_probability",
            "tuberculosis_probability",
        ] {
            assert!(body["results"][field].is_f64(), "missing {field}");
        }
    }
}
