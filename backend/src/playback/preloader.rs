use std::future::Future;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use image::RgbaImage;
use tokio::sync::watch;

use crate::error::FetchError;

/// How long the loading state lingers after the last frame resolves.
pub const READY_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadProgress {
    pub loaded: usize, // resolved fetches, failed ones included
    pub total: usize,
    pub ready: bool,
}

impl LoadProgress {
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.loaded as f64 / self.total as f64
    }

    pub fn percent(&self) -> u32 {
        (self.ratio() * 100.0).round() as u32
    }

    pub fn is_complete(&self) -> bool {
        self.loaded >= self.total
    }
}

/// Decoded frames in display order. Slots whose fetch failed stay empty.
pub struct FrameSet {
    urls: Vec<String>,
    images: Vec<Option<RgbaImage>>,
}

impl FrameSet {
    pub fn new(urls: Vec<String>, images: Vec<Option<RgbaImage>>) -> Self {
        debug_assert_eq!(urls.len(), images.len());
        Self { urls, images }
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn url(&self, index: usize) -> Option<&str> {
        self.urls.get(index).map(String::as_str)
    }

    pub fn image(&self, index: usize) -> Option<&RgbaImage> {
        self.images.get(index).and_then(Option::as_ref)
    }

    /// Frames that actually decoded.
    pub fn available(&self) -> usize {
        self.images.iter().filter(|img| img.is_some()).count()
    }
}

/// Fetches every frame at once and reports progress through a watch channel.
pub struct Preloader {
    ready_delay: Duration,
    progress: watch::Sender<LoadProgress>,
}

impl Default for Preloader {
    fn default() -> Self {
        Self::new(READY_DELAY)
    }
}

impl Preloader {
    pub fn new(ready_delay: Duration) -> Self {
        let (progress, _) = watch::channel(LoadProgress::default());
        Self { ready_delay, progress }
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadProgress> {
        self.progress.subscribe()
    }

    pub fn progress(&self) -> LoadProgress {
        *self.progress.borrow()
    }

    /// Issues one fetch per url and resolves once every fetch has succeeded or failed.
    ///
    /// Dropping the returned future cancels the fetches still in flight.
    pub async fn load<F, Fut>(&self, urls: Vec<String>, fetch: F) -> FrameSet
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<RgbaImage, FetchError>>,
    {
        let total = urls.len();
        self.progress.send_replace(LoadProgress { loaded: 0, total, ready: false });

        let mut images: Vec<Option<RgbaImage>> = (0..total).map(|_| None).collect();
        let mut pending: FuturesUnordered<_> = urls
            .iter()
            .enumerate()
            .map(|(i, url)| {
                let fut = fetch(url.clone());
                async move { (i, fut.await) }
            })
            .collect();

        while let Some((i, result)) = pending.next().await {
            match result {
                Ok(img) => images[i] = Some(img),
                Err(e) => tracing::warn!("Failed to load frame {}: {}", i + 1, e),
            }
            self.progress.send_modify(|p| p.loaded += 1);
        }

        tokio::time::sleep(self.ready_delay).await;
        self.progress.send_modify(|p| p.ready = true);
        tracing::debug!("Frame preload finished, {} frames", total);

        FrameSet::new(urls, images)
    }
}

/// Fetches frames over HTTP and decodes them.
pub struct HttpFrameFetcher {
    client: reqwest::Client,
    origin: Option<url::Url>,
}

impl HttpFrameFetcher {
    /// `origin` resolves site-relative urls such as `/Frames/frame_0001.png`.
    pub fn new(origin: Option<url::Url>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            origin,
        }
    }

    fn resolve(&self, url: &str) -> Result<url::Url, FetchError> {
        match url::Url::parse(url) {
            Ok(absolute) => Ok(absolute),
            Err(url::ParseError::RelativeUrlWithoutBase) => self
                .origin
                .as_ref()
                .and_then(|base| base.join(url).ok())
                .ok_or_else(|| FetchError::Url(url.to_string())),
            Err(_) => Err(FetchError::Url(url.to_string())),
        }
    }

    pub async fn fetch(&self, url: String) -> Result<RgbaImage, FetchError> {
        let target = self.resolve(&url)?;
        let response = self.client.get(target).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }
        let body = response.bytes().await?;
        Ok(image::load_from_memory(&body)?.to_rgba8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn solid(index: usize) -> RgbaImage {
        RgbaImage::from_pixel(4, 2, Rgba([index as u8, 0, 0, 255]))
    }

    fn urls(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("/frames2/frame_{:04}.webp", i)).collect()
    }

    fn index_of(url: &str) -> usize {
        url.trim_start_matches("/frames2/frame_")
            .trim_end_matches(".webp")
            .parse::<usize>()
            .unwrap()
            - 1
    }

    #[test]
    fn progress_ratio_and_percent() {
        let p = LoadProgress { loaded: 91, total: 182, ready: false };
        assert_eq!(p.ratio(), 0.5);
        assert_eq!(p.percent(), 50);
        assert!(!p.is_complete());
        assert_eq!(LoadProgress::default().ratio(), 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn places_frames_by_index_whatever_the_resolution_order() {
        let preloader = Preloader::default();
        let n = 20;
        let set = preloader
            .load(urls(n), |url| async move {
                let i = index_of(&url);
                // Later frames resolve first
                tokio::time::sleep(Duration::from_millis((n - i) as u64 * 5)).await;
                Ok(solid(i))
            })
            .await;

        assert_eq!(set.len(), n);
        assert_eq!(set.available(), n);
        for i in 0..n {
            assert_eq!(set.image(i).unwrap().get_pixel(0, 0)[0], i as u8);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_frames_still_count() {
        let preloader = Preloader::default();
        let set = preloader
            .load(urls(10), |url| async move {
                let i = index_of(&url);
                if i % 3 == 0 {
                    Err(FetchError::Url(url))
                } else {
                    Ok(solid(i))
                }
            })
            .await;

        let progress = preloader.progress();
        assert_eq!(progress.loaded, 10);
        assert!(progress.ready);
        assert_eq!(set.available(), 6);
        assert!(set.image(0).is_none());
        assert!(set.image(1).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn progress_is_monotonic_and_ready_fires_once() {
        let preloader = Arc::new(Preloader::default());
        let mut rx = preloader.subscribe();
        let ready_transitions = Arc::new(AtomicUsize::new(0));

        let watcher = {
            let ready_transitions = ready_transitions.clone();
            tokio::spawn(async move {
                let mut seen = Vec::new();
                let mut was_ready = false;
                while rx.changed().await.is_ok() {
                    let p = *rx.borrow_and_update();
                    seen.push(p.loaded);
                    if p.ready && !was_ready {
                        ready_transitions.fetch_add(1, Ordering::SeqCst);
                        was_ready = true;
                    }
                    if p.ready {
                        break;
                    }
                }
                seen
            })
        };

        let n = 182;
        let set = preloader
            .load(urls(n), |url| async move {
                let i = index_of(&url);
                tokio::time::sleep(Duration::from_millis(((i * 37) % 11) as u64)).await;
                Ok(solid(i))
            })
            .await;

        let seen = watcher.await.unwrap();
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*seen.last().unwrap(), n);
        assert_eq!(ready_transitions.load(Ordering::SeqCst), 1);
        assert_eq!(preloader.progress().loaded, n);
        assert_eq!(set.len(), n);
    }

    #[tokio::test(start_paused = true)]
    async fn ready_waits_for_the_debounce() {
        let preloader = Arc::new(Preloader::default());
        let task = {
            let preloader = preloader.clone();
            tokio::spawn(async move { preloader.load(urls(3), |url| async move { Ok(solid(index_of(&url))) }).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        let p = preloader.progress();
        assert_eq!(p.loaded, 3);
        assert!(!p.ready);

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(preloader.progress().ready);
        assert_eq!(task.await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn relative_url_without_origin_is_an_error() {
        let fetcher = HttpFrameFetcher::new(None);
        let err = fetcher.fetch("/Frames/frame_0001.png".to_string()).await.unwrap_err();
        assert!(matches!(err, FetchError::Url(_)));
    }
}
