// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Image Pipeline Example
//!
//! Builds the classic three-stage pipeline for downloaded resources:
//!
//! ```text
//! memory (decoded images) -> disk (raw bytes, one hour) -> network
//! ```
//!
//! Callers address the pipeline with URL strings. The network stage is a read-only source
//! keyed by `http::Request`, so its keys are mapped from the URL. The memory stage holds
//! decoded values, so the byte stages below it are mapped into that type.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use bytes::Bytes;
use http::{Request, Response};
use strata::{Cache, CacheExt, DiskCache, Error, Expiry, ExpiryRecord, Fetcher, HttpClient, NetworkFetcher, RamCache};
use tick::Clock;

/// Stands in for a real HTTP client; a build with the `reqwest` feature can use
/// `NetworkFetcher::reqwest()` instead.
#[derive(Debug, Clone, Default)]
struct ImageServer {
    requests: Arc<AtomicU32>,
}

impl HttpClient for ImageServer {
    async fn execute(&self, request: &Request<()>) -> Result<Response<Bytes>, Error> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let pixels: Vec<u8> = request.uri().path().bytes().collect();
        Ok(Response::new(Bytes::from(pixels)))
    }
}

/// A decoded image.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Image {
    pixels: Vec<u8>,
}

fn decode(bytes: Vec<u8>) -> Result<Image, Error> {
    if bytes.is_empty() {
        return Err(Error::transform("empty image"));
    }
    Ok(Image { pixels: bytes })
}

#[tokio::main]
async fn main() {
    let dir = tempfile::tempdir().unwrap();
    let server = ImageServer::default();
    let clock = Clock::new_tokio();

    let network = NetworkFetcher::new(server.clone())
        .into_cache()
        .map_keys(|url: &String| Request::get(url.as_str()).body(()))
        .map_values(|body: Bytes| Ok::<_, Error>(body.to_vec()), |bytes: Vec<u8>| Ok::<_, Error>(Bytes::from(bytes)));

    let disk = DiskCache::<String, ExpiryRecord<Vec<u8>>>::builder(dir.path())
        .capacity(10 * 1024 * 1024)
        .build()
        .unwrap()
        .expires(Expiry::After(Duration::from_secs(3600)), clock);

    let images = RamCache::<String, Image>::builder().max_capacity(100).name("images").build();

    let pipeline = images
        .compose(disk.compose(network).map_values(decode, |image: Image| Ok::<_, Error>(image.pixels)))
        .reuse_in_flight();

    // Concurrent first requests share one download.
    let url = "https://example.com/cat.png".to_string();
    let (a, b) = tokio::join!(pipeline.get(&url), pipeline.get(&url));
    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(server.requests.load(Ordering::Relaxed), 1);

    // Give the detached write-backs a moment, then the memory stage answers.
    tokio::time::sleep(Duration::from_millis(10)).await;
    let image = pipeline.get_required(&url).await.unwrap();
    assert_eq!(image.pixels, b"/cat.png");
    assert_eq!(server.requests.load(Ordering::Relaxed), 1);

    // Invalid URLs fail in the key mapping without reaching the server.
    assert!(pipeline.get(&"not a url".to_string()).await.is_err());
    assert_eq!(server.requests.load(Ordering::Relaxed), 1);
}
