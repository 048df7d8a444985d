//! Background texture loading.
//!
//! Each manifest entry is decoded on its own worker thread; decoded pixels
//! come back over a channel and are turned into handles on the thread that
//! calls [`TextureLoader::poll`] (the render thread, where GPU upload is
//! allowed). The loader is generic over the handle type so it can be driven
//! without a GPU.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use crate::texture::{DecodedImage, TextureError, TextureKey};

/// Lifecycle of one requested asset.
#[derive(Debug)]
pub enum LoadState<T> {
    Pending,
    Ready(T),
    Failed(String),
}

impl<T> LoadState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, LoadState::Pending)
    }
}

/// Notifications produced while polling.
#[derive(Clone, Debug, PartialEq)]
pub enum LoadEvent {
    /// Emitted once, on the first poll.
    Started { total: usize },
    /// One item resolved, successfully or not.
    Progress {
        key: TextureKey,
        loaded: usize,
        total: usize,
    },
    Error { key: TextureKey, message: String },
    /// Emitted once, after every item has resolved.
    Completed { loaded: usize, failed: usize },
}

type Decoded = (TextureKey, Result<DecodedImage, TextureError>);

struct Slot<T> {
    key: TextureKey,
    path: PathBuf,
    state: LoadState<T>,
}

pub struct TextureLoader<T> {
    slots: Vec<Slot<T>>,
    receiver: Receiver<Decoded>,
    started: bool,
    completed: bool,
}

impl<T> TextureLoader<T> {
    /// Start one decode worker per manifest entry.
    pub fn spawn(manifest: Vec<(TextureKey, PathBuf)>) -> Self {
        let (sender, receiver) = mpsc::channel();
        let mut slots = Vec::with_capacity(manifest.len());

        for (key, path) in manifest {
            let sender = sender.clone();
            let worker_path = path.clone();
            let spawned = thread::Builder::new()
                .name(format!("texture-{}", key.label()))
                .spawn(move || {
                    let result = DecodedImage::open(&worker_path);
                    // The loader may already be gone at shutdown.
                    let _ = sender.send((key, result));
                });

            let state = match spawned {
                Ok(_) => LoadState::Pending,
                Err(err) => LoadState::Failed(format!("could not start worker: {err}")),
            };
            slots.push(Slot { key, path, state });
        }

        Self {
            slots,
            receiver,
            started: false,
            completed: false,
        }
    }

    /// Drain finished decodes, upload them with `upload`, and report what changed.
    ///
    /// An upload error fails the slot the same way a decode error does.
    pub fn poll(
        &mut self,
        mut upload: impl FnMut(TextureKey, &DecodedImage) -> Result<T, TextureError>,
    ) -> Vec<LoadEvent> {
        let mut events = Vec::new();
        let total = self.slots.len();

        if !self.started {
            self.started = true;
            log::info!("loading {total} textures");
            events.push(LoadEvent::Started { total });

            // Slots whose worker never started are already resolved.
            for slot in &self.slots {
                if let LoadState::Failed(message) = &slot.state {
                    events.push(Self::error_event(slot.key, message.clone()));
                }
            }
        }

        loop {
            match self.receiver.try_recv() {
                Ok((key, result)) => {
                    let Some(slot) = self.slots.iter_mut().find(|s| s.key == key) else {
                        continue;
                    };
                    match result.and_then(|image| upload(key, &image)) {
                        Ok(handle) => {
                            slot.state = LoadState::Ready(handle);
                        }
                        Err(err) => {
                            let message = err.to_string();
                            events.push(Self::error_event(key, message.clone()));
                            slot.state = LoadState::Failed(message);
                        }
                    }
                    let loaded = self.resolved();
                    log::info!("texture {} resolved ({loaded}/{total})", key.label());
                    events.push(LoadEvent::Progress { key, loaded, total });
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    // Every worker has exited; anything still pending panicked.
                    for slot in self.slots.iter_mut().filter(|s| s.state.is_pending()) {
                        let message = TextureError::WorkerLost {
                            path: slot.path.clone(),
                        }
                        .to_string();
                        events.push(Self::error_event(slot.key, message.clone()));
                        slot.state = LoadState::Failed(message);
                    }
                    break;
                }
            }
        }

        if !self.completed && self.is_settled() {
            self.completed = true;
            let failed = self
                .slots
                .iter()
                .filter(|s| matches!(s.state, LoadState::Failed(_)))
                .count();
            let loaded = total - failed;
            log::info!("texture loading complete: {loaded} loaded, {failed} failed");
            events.push(LoadEvent::Completed { loaded, failed });
        }

        events
    }

    fn error_event(key: TextureKey, message: String) -> LoadEvent {
        log::warn!("texture {} failed to load: {message}", key.label());
        LoadEvent::Error { key, message }
    }

    /// The uploaded handle for `key`, if it finished loading.
    pub fn get(&self, key: TextureKey) -> Option<&T> {
        match self.state(key)? {
            LoadState::Ready(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn state(&self, key: TextureKey) -> Option<&LoadState<T>> {
        self.slots.iter().find(|s| s.key == key).map(|s| &s.state)
    }

    pub fn resolved(&self) -> usize {
        self.slots.iter().filter(|s| !s.state.is_pending()).count()
    }

    pub fn total(&self) -> usize {
        self.slots.len()
    }

    /// True once no slot is pending.
    pub fn is_settled(&self) -> bool {
        self.slots.iter().all(|s| !s.state.is_pending())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn poll_until_settled(loader: &mut TextureLoader<(u32, u32)>) -> Vec<LoadEvent> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut events = Vec::new();
        loop {
            events.extend(loader.poll(|_, image| Ok((image.width, image.height))));
            if loader.is_settled() || Instant::now() > deadline {
                return events;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("shape-lab-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn loads_ready_images_and_reports_missing_ones() {
        let dir = scratch_dir("loader");
        let present = dir.join("space.png");
        image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]))
            .save(&present)
            .unwrap();

        let mut loader = TextureLoader::spawn(vec![
            (TextureKey::Space, present),
            (TextureKey::Earth, dir.join("missing.jpg")),
        ]);
        assert_eq!(loader.total(), 2);

        let events = poll_until_settled(&mut loader);

        assert_eq!(events.first(), Some(&LoadEvent::Started { total: 2 }));
        assert_eq!(
            events.last(),
            Some(&LoadEvent::Completed {
                loaded: 1,
                failed: 1
            })
        );
        let progress = events
            .iter()
            .filter(|e| matches!(e, LoadEvent::Progress { .. }))
            .count();
        assert_eq!(progress, 2);
        assert!(events
            .iter()
            .any(|e| matches!(e, LoadEvent::Error { key: TextureKey::Earth, .. })));

        assert_eq!(loader.get(TextureKey::Space), Some(&(3, 2)));
        assert_eq!(loader.get(TextureKey::Earth), None);
        assert!(matches!(
            loader.state(TextureKey::Earth),
            Some(LoadState::Failed(_))
        ));
        // Keys outside the manifest have no slot at all.
        assert!(loader.state(TextureKey::Normal).is_none());

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn failed_upload_fails_the_slot() {
        let dir = scratch_dir("upload");
        let path = dir.join("earth.png");
        image::RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 0, 255]))
            .save(&path)
            .unwrap();

        let mut loader: TextureLoader<(u32, u32)> =
            TextureLoader::spawn(vec![(TextureKey::Earth, path)]);
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut events = Vec::new();
        while !loader.is_settled() && Instant::now() < deadline {
            events.extend(loader.poll(|key, image| {
                Err(TextureError::Size {
                    label: key.label(),
                    width: image.width,
                    height: image.height,
                    max: 2,
                })
            }));
            thread::sleep(Duration::from_millis(5));
        }

        assert!(events
            .iter()
            .any(|e| matches!(e, LoadEvent::Error { key: TextureKey::Earth, .. })));
        assert_eq!(
            events.last(),
            Some(&LoadEvent::Completed {
                loaded: 0,
                failed: 1
            })
        );
        assert_eq!(loader.get(TextureKey::Earth), None);
        assert!(matches!(
            loader.state(TextureKey::Earth),
            Some(LoadState::Failed(_))
        ));

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn started_and_completed_are_emitted_once() {
        let dir = scratch_dir("once");
        let mut loader: TextureLoader<(u32, u32)> =
            TextureLoader::spawn(vec![(TextureKey::Normal, dir.join("nope.png"))]);

        let events = poll_until_settled(&mut loader);
        let later = loader.poll(|_, image| Ok((image.width, image.height)));

        let starts = events
            .iter()
            .filter(|e| matches!(e, LoadEvent::Started { .. }))
            .count();
        let completions = events
            .iter()
            .filter(|e| matches!(e, LoadEvent::Completed { .. }))
            .count();
        assert_eq!((starts, completions), (1, 1));
        assert!(later.is_empty());

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn empty_manifest_completes_on_first_poll() {
        let mut loader: TextureLoader<()> = TextureLoader::spawn(Vec::new());
        let events = loader.poll(|_, _| Ok(()));
        assert_eq!(
            events,
            vec![
                LoadEvent::Started { total: 0 },
                LoadEvent::Completed {
                    loaded: 0,
                    failed: 0
                }
            ]
        );
    }
}
