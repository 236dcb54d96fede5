//! Bandcamp lookups through the dispatcher.

use serde_json::json;
use trackseek_search::{LoadKind, RequestContext};

use crate::support::{Reply, SpyTransport, assert_never_both, dispatcher};

fn autocomplete_body() -> serde_json::Value {
    json!({
        "results": [
            {
                "type": "t",
                "id": 1995392148,
                "name": "Windowlicker",
                "band_name": "Aphex Twin",
                "img": "https://f4.bcbits.com/img/a0000000001_3.jpg",
                "url": "https://aphextwin.bandcamp.com/track/windowlicker"
            },
            {
                "type": "t",
                "name": "Broken Entry",
                "band_name": "Nobody"
            },
            {
                "type": "a",
                "id": 7,
                "name": "Syro",
                "url": "https://aphextwin.bandcamp.com/album/syro"
            },
            {
                "type": "t",
                "name": "Flim",
                "band_name": "Aphex Twin",
                "url": "https://aphextwin.bandcamp.com/track/flim"
            }
        ]
    })
}

#[tokio::test]
async fn search_normalizes_tracks_in_order() {
    let transport = SpyTransport::new(Reply::Json(200, autocomplete_body()));
    let dispatcher = dispatcher(&transport);
    let requester = RequestContext::new(json!({"id": "1234", "name": "dj"}));

    let result = dispatcher
        .resolve("bcsearch", "aphex twin", requester.clone())
        .await;

    assert_eq!(result.load_type(), LoadKind::Search);
    assert!(result.exception().is_none());
    assert!(result.plugin_info().is_empty());
    assert!(result.playlist_info().is_none());
    assert_never_both(&result);

    let tracks = result.tracks();
    assert_eq!(tracks.len(), 2);

    assert_eq!(tracks[0].title, "Windowlicker");
    assert_eq!(tracks[0].author.as_deref(), Some("Aphex Twin"));
    assert_eq!(tracks[0].identifier, "1995392148");
    assert_eq!(
        tracks[0].artwork_url.as_deref(),
        Some("https://f4.bcbits.com/img/a0000000001_3.jpg")
    );

    assert_eq!(tracks[1].title, "Flim");
    assert_eq!(tracks[1].uri, "https://aphextwin.bandcamp.com/track/flim");
    assert_eq!(tracks[1].identifier, "flim");

    assert!(tracks.iter().all(|t| t.request_context.same_as(&requester)));
}

#[tokio::test]
async fn aliases_reach_the_same_provider() {
    let transport = SpyTransport::new(Reply::Json(200, autocomplete_body()));
    let dispatcher = dispatcher(&transport);

    for source in ["bcsearch", "bc", "Bandcamp"] {
        let result = dispatcher.resolve(source, "flim", RequestContext::none()).await;
        assert_eq!(result.load_type(), LoadKind::Search);
        assert_never_both(&result);
    }

    assert_eq!(transport.calls(), 3);
    assert_eq!(dispatcher.sources(), vec!["bcsearch"]);
}

#[tokio::test]
async fn request_carries_bandcamp_headers() {
    let transport = SpyTransport::new(Reply::Json(200, json!({"results": []})));
    let dispatcher = dispatcher(&transport);

    dispatcher
        .resolve("bcsearch", "selected ambient works", RequestContext::none())
        .await;

    let request = transport.last_request().unwrap();
    assert_eq!(request.url.path(), "/api/nusearch/2/autocomplete");
    assert_eq!(
        request.url.query(),
        Some("q=selected+ambient+works")
    );
    assert_eq!(
        request.header_value("User-Agent"),
        Some("android-async-http/1.4.1 (http://loopj.com/android-async-http)")
    );
    assert_eq!(request.header_value("Cookie"), Some("$Version=1"));
}

#[tokio::test]
async fn prefixed_lookup_routes_by_prefix_or_default() {
    let transport = SpyTransport::new(Reply::Json(200, autocomplete_body()));
    let dispatcher = dispatcher(&transport);

    let prefixed = dispatcher
        .resolve_prefixed("bc:windowlicker", RequestContext::none())
        .await;
    let bare = dispatcher
        .resolve_prefixed("windowlicker", RequestContext::none())
        .await;

    assert_eq!(prefixed.load_type(), LoadKind::Search);
    assert_eq!(bare.load_type(), LoadKind::Search);
    assert_never_both(&prefixed);
    assert_never_both(&bare);
    assert_eq!(transport.calls(), 2);

    let last = transport.last_request().unwrap();
    assert_eq!(last.url.query(), Some("q=windowlicker"));
}

#[tokio::test]
async fn envelope_serializes_like_lavalink() {
    let transport = SpyTransport::new(Reply::Json(200, autocomplete_body()));
    let dispatcher = dispatcher(&transport);

    let result = dispatcher
        .resolve("bcsearch", "flim", RequestContext::new(json!("user-1")))
        .await;
    let value = serde_json::to_value(&result).unwrap();

    assert_eq!(value["loadType"], "search");
    assert_eq!(value["exception"], serde_json::Value::Null);
    assert_eq!(value["tracks"][1]["identifier"], "flim");
    assert_eq!(value["tracks"][1]["artworkUrl"], serde_json::Value::Null);
    assert_eq!(value["tracks"][1]["requester"], "user-1");
}
