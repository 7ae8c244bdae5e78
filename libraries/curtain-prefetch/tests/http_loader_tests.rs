//! HTTP loader tests against a mock server.

use curtain_core::AssetKind;
use curtain_prefetch::{
    AssetCache, AssetLoader, HttpAssetLoader, LoadError, PrefetchError, Prefetcher,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Downloads
// =============================================================================

mod downloads {
    use super::*;

    #[tokio::test]
    async fn complete_body_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/asset/scene1.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 4096]))
            .expect(1)
            .mount(&server)
            .await;

        let loader = HttpAssetLoader::new(server.uri()).unwrap();
        loader.load("asset/scene1.mp4", AssetKind::Video).await.unwrap();

        let body = loader.cache().get("asset/scene1.mp4").unwrap();
        assert_eq!(body.len(), 4096);
    }

    #[tokio::test]
    async fn cached_asset_is_not_downloaded_again() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/asset/Q1bg.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let cache = AssetCache::new();
        let loader = HttpAssetLoader::new(server.uri()).unwrap().with_cache(cache.clone());
        loader.load("asset/Q1bg.jpg", AssetKind::Image).await.unwrap();
        loader.load("asset/Q1bg.jpg", AssetKind::Image).await.unwrap();

        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn error_status_is_reported_and_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/asset/missing.mp4"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let loader = HttpAssetLoader::new(server.uri()).unwrap();
        let err = loader.load("asset/missing.mp4", AssetKind::Video).await.unwrap_err();

        assert_eq!(err, LoadError::Status(404));
        assert!(loader.cache().is_empty());
    }

    /// Serve one response whose header claims far more bytes than it sends
    async fn overstated_length_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 2048];
            let _ = socket.read(&mut request).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100000000000000\r\n\r\nabc")
                .await
                .unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn overstated_content_length_is_a_transport_error() {
        let loader = HttpAssetLoader::new(overstated_length_server().await).unwrap();

        let err = loader.load("asset/bg.jpg", AssetKind::Image).await.unwrap_err();

        assert!(matches!(err, LoadError::Transport(_)));
        assert!(loader.cache().is_empty());
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        let loader = HttpAssetLoader::new("http://127.0.0.1:9").unwrap();
        let err = loader.load("asset/a.jpg", AssetKind::Image).await.unwrap_err();
        assert!(matches!(err, LoadError::Transport(_)));
    }
}

// =============================================================================
// Policy over HTTP
// =============================================================================

mod policy {
    use super::*;

    #[tokio::test]
    async fn slow_video_times_out_and_leaves_no_partial_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/asset/slow.mp4"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![0u8; 1024])
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let loader = HttpAssetLoader::new(server.uri()).unwrap();
        let cache = loader.cache().clone();
        let prefetcher =
            Prefetcher::new(Arc::new(loader)).with_video_timeout(Duration::from_millis(200));

        let err = prefetcher.prefetch_asset("asset/slow.mp4").await.unwrap_err();
        assert!(matches!(err, PrefetchError::Timeout { .. }));
        assert!(!cache.contains("asset/slow.mp4"));
    }

    #[tokio::test]
    async fn missing_image_does_not_fail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let prefetcher = Prefetcher::new(Arc::new(HttpAssetLoader::new(server.uri()).unwrap()));
        assert!(prefetcher.prefetch_asset("asset/Q1_1.svg").await.is_ok());
        assert!(prefetcher.prefetch_asset("asset/bgm.mp3").await.is_ok());
    }
}
