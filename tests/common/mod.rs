//! Test utilities shared across the integration suite: catalogs, raw entry
//! builders, and a mocked upstream leaderboard service.

use mockito::{Matcher, Mock, ServerGuard};

use lapcache_harvester::{CarClass, Catalog, Track};

#[allow(dead_code)]
pub fn one_combo_catalog() -> Catalog {
    Catalog::new(
        vec![Track {
            track_id: "1693".into(),
            track_name: "Nordschleife".into(),
        }],
        vec![CarClass {
            class_id: "8600".into(),
            class_name: "GT3".into(),
        }],
    )
}

#[allow(dead_code)]
pub fn two_track_catalog() -> Catalog {
    Catalog::new(
        vec![
            Track {
                track_id: "1693".into(),
                track_name: "Nordschleife".into(),
            },
            Track {
                track_id: "5276".into(),
                track_name: "Spa".into(),
            },
        ],
        vec![
            CarClass {
                class_id: "8600".into(),
                class_name: "GT3".into(),
            },
            CarClass {
                class_id: "9000".into(),
                class_name: "GT4".into(),
            },
        ],
    )
}

#[allow(dead_code)]
pub fn driver_entry(name: &str) -> serde_json::Value {
    serde_json::json!({"driver": {"name": name}})
}

/// Mount both legs of one combination's fetch (session page GET, then the
/// listing GET) on a mockito server, returning the two mocks so callers can
/// assert call counts with `.assert_async()`.
#[allow(dead_code)]
pub async fn mount_combo(
    server: &mut ServerGuard,
    track_id: &str,
    class_id: &str,
    results: Vec<serde_json::Value>,
) -> (Mock, Mock) {
    let query = Matcher::AllOf(vec![
        Matcher::UrlEncoded("track".into(), track_id.into()),
        Matcher::UrlEncoded("car_class".into(), class_id.into()),
    ]);

    let page = server
        .mock("GET", "/leaderboards")
        .match_query(query.clone())
        .with_status(200)
        .with_body("<html></html>")
        .create_async()
        .await;

    let body = serde_json::json!({"context": {"c": {"results": results}}});
    let listing = server
        .mock("GET", "/leaderboards/ajax")
        .match_query(query)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await;

    (page, listing)
}
