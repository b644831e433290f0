use std::sync::Arc;

use http::{Method, StatusCode};
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use workflow_config::{
    AppId, Client, ClientSettings, ConfigPatch, Configuration, ErrorKind, mock::MockController,
};

struct Harness {
    app: AppId,
    controller: Arc<MockController>,
    client: Client<Arc<MockController>>,
}

impl Harness {
    fn with_values(values: Value) -> Self {
        let app = AppId::try_from("billing").unwrap();
        let controller = Arc::new(MockController::new());
        controller.add_node([("disk", "ssd"), ("zone", "eu-west-1a")]);

        let config: Configuration = serde_json::from_value(json!({
            "owner": "jane",
            "values": values,
            "healthcheck": { "web/cmd": { "livenessProbe": { "periodSeconds": 10 } } },
            "uuid": "3c1e5d2a-8d76-4a3b-9a39-5f8c7b7f0e11",
        }))
        .unwrap();
        controller.create_app_with(&app, config);

        let settings = ClientSettings::new("http://controller.test".parse().unwrap()).unwrap();
        let client = Client::new(controller.clone(), settings);

        Self {
            app,
            controller,
            client,
        }
    }

    fn release_count(&self) -> usize {
        self.controller.releases(&self.app).len()
    }
}

#[fixture]
fn harness() -> Harness {
    Harness::with_values(json!({ "DEBUG": "true", "LOG_LEVEL": "info" }))
}

#[rstest]
#[tokio::test]
async fn list_returns_stored_configuration(harness: Harness) {
    let stored = harness.controller.config(&harness.app).unwrap();

    let listed = harness.client.list_config(&harness.app).await.unwrap();
    assert_eq!(listed, stored);
    assert_eq!(listed.extra["healthcheck"]["web/cmd"]["livenessProbe"]["periodSeconds"], 10);

    // Listing is a read, nothing changes.
    assert_eq!(harness.client.list_config(&harness.app).await.unwrap(), stored);
    assert_eq!(harness.release_count(), 1);
    assert_eq!(
        harness.controller.requests(),
        vec![
            (Method::GET, "/v2/apps/billing/config/".to_owned()),
            (Method::GET, "/v2/apps/billing/config/".to_owned()),
        ]
    );
}

#[rstest]
#[tokio::test]
async fn set_adds_key_and_keeps_others(harness: Harness) {
    let patch = ConfigPatch::new().set("WORKERS", "4");
    let config = harness.client.set_config(&harness.app, &patch).await.unwrap();

    assert_eq!(
        serde_json::to_value(&config.values).unwrap(),
        json!({ "DEBUG": "true", "LOG_LEVEL": "info", "WORKERS": "4" })
    );
    assert_eq!(config.owner.as_deref(), Some("jane"));
    assert!(config.extra.contains_key("healthcheck"));
    assert_eq!(harness.release_count(), 2);
    assert_eq!(harness.controller.config(&harness.app), Some(config));
}

#[rstest]
#[tokio::test]
async fn set_unsets_present_key(harness: Harness) {
    let patch = ConfigPatch::new().unset("LOG_LEVEL");
    let config = harness.client.set_config(&harness.app, &patch).await.unwrap();

    assert!(!config.values.contains_key("LOG_LEVEL"));
    assert_eq!(config.values["DEBUG"], "true");
}

#[tokio::test]
async fn unset_and_set_in_one_patch() {
    let harness = Harness::with_values(json!({ "DEBUG": "true" }));

    let patch = ConfigPatch::new().unset("DEBUG").set("WORKERS", "4");
    let config = harness.client.set_config(&harness.app, &patch).await.unwrap();

    assert_eq!(serde_json::to_value(&config.values).unwrap(), json!({ "WORKERS": "4" }));
}

#[rstest]
#[tokio::test]
async fn repeated_identical_patch_creates_releases(harness: Harness) {
    let patch = ConfigPatch::new().set("DEBUG", "true");

    let first = harness.client.set_config(&harness.app, &patch).await.unwrap();
    let second = harness.client.set_config(&harness.app, &patch).await.unwrap();

    assert_eq!(first.values, second.values);
    let versions: Vec<u64> = harness
        .controller
        .releases(&harness.app)
        .iter()
        .map(|release| release.version)
        .collect();
    assert_eq!(versions, [1, 2, 3]);
}

#[rstest]
#[case::empty_patch(ConfigPatch::new(), ErrorKind::Conflict)]
#[case::unset_missing_key(ConfigPatch::new().unset("MISSING"), ErrorKind::Unprocessable)]
#[case::unknown_tag(ConfigPatch::new().set_tag("disk", "nvme").unwrap(), ErrorKind::TagNotFound)]
#[case::unknown_tag_key(ConfigPatch::new().set_tag("gpu", "true").unwrap(), ErrorKind::TagNotFound)]
#[tokio::test]
async fn rejected_patch_changes_nothing(
    harness: Harness,
    #[case] patch: ConfigPatch,
    #[case] kind: ErrorKind,
) {
    let before = harness.controller.config(&harness.app).unwrap();

    let err = harness
        .client
        .set_config(&harness.app, &patch)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), kind, "{err}");
    assert_eq!(harness.controller.config(&harness.app), Some(before));
    assert_eq!(harness.release_count(), 1);
}

#[tokio::test]
async fn empty_patch_on_empty_configuration_conflicts() {
    let harness = Harness::with_values(json!({}));

    let err = harness
        .client
        .set_config(&harness.app, &ConfigPatch::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(harness.controller.config(&harness.app).unwrap().values.is_empty());
    assert_eq!(harness.release_count(), 1);
}

#[rstest]
#[tokio::test]
async fn known_tag_is_accepted(harness: Harness) {
    let patch = ConfigPatch::new().set_tag("disk", "ssd").unwrap();
    let config = harness.client.set_config(&harness.app, &patch).await.unwrap();

    assert_eq!(config.tags["disk"], "ssd");
}

#[rstest]
#[tokio::test]
async fn unknown_app_is_not_found(harness: Harness) {
    let other = AppId::try_from("payroll").unwrap();

    let err = harness.client.list_config(&other).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = harness
        .client
        .set_config(&other, &ConfigPatch::new().set("A", "1"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[rstest]
#[case::not_json(StatusCode::OK, "<html>oops</html>")]
#[case::wrong_shape(StatusCode::OK, r#"{"values": ["A", "B"]}"#)]
#[tokio::test]
async fn malformed_body_is_decode_error(
    harness: Harness,
    #[case] status: StatusCode,
    #[case] body: &'static str,
) {
    harness.controller.respond_once_with(status, body);

    let err = harness.client.list_config(&harness.app).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
}

#[rstest]
#[tokio::test]
async fn unexpected_status_is_api_error(harness: Harness) {
    harness
        .controller
        .respond_once_with(StatusCode::SERVICE_UNAVAILABLE, "maintenance");

    let err = harness
        .client
        .set_config(&harness.app, &ConfigPatch::new().set("A", "1"))
        .await
        .unwrap_err();

    match err {
        workflow_config::Error::Api { status, body, .. } => {
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(body, "maintenance");
        }
        err => panic!("expected an API error, got {err:?}"),
    }
    assert_eq!(harness.release_count(), 1);
}

#[rstest]
#[tokio::test]
async fn concurrent_calls_for_different_apps(harness: Harness) {
    let other = AppId::try_from("payroll").unwrap();
    harness.controller.create_app(&other);

    let billing_patch = ConfigPatch::new().set("A", "1");
    let payroll_patch = ConfigPatch::new().set("B", "2");
    let (billing, payroll) = tokio::join!(
        harness.client.set_config(&harness.app, &billing_patch),
        harness.client.set_config(&other, &payroll_patch),
    );

    assert_eq!(billing.unwrap().values["A"], "1");
    assert!(!payroll.unwrap().values.contains_key("A"));
}
