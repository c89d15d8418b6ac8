//! Domain service tests over the mock API: principle listing, agreement,
//! and the country aggregate feed.

mod common;

use tenet_core::auth::credentials::CredentialStore;
use tenet_core::{CountryService, PrincipleService};

use common::{credential, spawn_mock_api, test_client};

#[tokio::test]
async fn list_returns_page_with_agreement_flags() {
    let mock = spawn_mock_api().await;
    let (api, store) = test_client(&mock.base_url);
    store
        .set_credential(&credential(
            &mock.state.access_token(),
            &mock.state.refresh_token(),
        ))
        .expect("seed credential");

    let principles = PrincipleService::new(api);
    let page = principles.list(1, 20, None).await.expect("list principles");

    assert_eq!(page.principles.len(), 1);
    assert_eq!(page.principles[0].agreement_count, 42);
    assert_eq!(page.pagination.total, 1);
}

#[tokio::test]
async fn agree_reports_updated_count() {
    let mock = spawn_mock_api().await;
    let (api, store) = test_client(&mock.base_url);
    store
        .set_credential(&credential(
            &mock.state.access_token(),
            &mock.state.refresh_token(),
        ))
        .expect("seed credential");

    let principles = PrincipleService::new(api);
    let summary = principles
        .agree("665f1c2a9b3e4d0012a7c101")
        .await
        .expect("agree");

    assert_eq!(summary.principle_id, "665f1c2a9b3e4d0012a7c101");
    assert_eq!(summary.agreement_count, 43);
    assert!(summary.user_agreed);
}

#[tokio::test]
async fn country_feed_parses_percentages() {
    let mock = spawn_mock_api().await;
    let (api, store) = test_client(&mock.base_url);
    store
        .set_credential(&credential(
            &mock.state.access_token(),
            &mock.state.refresh_token(),
        ))
        .expect("seed credential");

    let principles = PrincipleService::new(api);
    let feed = principles
        .country_agreement_percentages(&[], None)
        .await
        .expect("country feed");

    assert_eq!(feed.countries.len(), 2);
    assert_eq!(feed.countries[0].country.code, "GB");
    assert_eq!(feed.countries[0].percentage_display(), "62%");
}

#[tokio::test]
async fn countries_list_and_detect_need_no_credentials() {
    let mock = spawn_mock_api().await;
    let (api, _store) = test_client(&mock.base_url);

    let countries = CountryService::new(api);
    let list = countries.list().await.expect("list countries");
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].code, "GB");

    let detection = countries.detect().await.expect("detect country");
    assert!(detection.detected);
    assert_eq!(detection.country.map(|c| c.code).as_deref(), Some("GB"));
}
