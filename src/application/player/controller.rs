//! Audio Controller - 合成/缓存/下载/播放编排
//!
//! 对界面只暴露一个状态值和四个动作（generate_and_play / pause / resume / stop）。
//!
//! 每次 generate_and_play 分配一个单调递增的请求号。每个 I/O 挂起点之后都会
//! 在会话锁内比对请求号，被新请求取代的旧请求不会再产生任何状态转移。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;

use super::cache::AudioCache;
use super::events::{PlayOutcome, PlayerConfig, PlayerEvent, PlayerSnapshot};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    AudioAsset, AudioAssetPort, DocumentRepositoryPort, EngineEvent, PlaybackEnginePort,
    PlaybackHandle, SpeechSynthesisPort,
};
use crate::domain::audio::{CacheKey, PlaybackStatus, PlayerTrigger};
use crate::domain::document::DocumentId;

/// 播放会话（由控制器独占）
#[derive(Debug)]
struct PlaybackSession {
    status: PlaybackStatus,
    text: Option<String>,
    error: Option<String>,
    handle: Option<PlaybackHandle>,
    request_id: u64,
    mounted: bool,
}

impl PlaybackSession {
    fn new() -> Self {
        Self {
            status: PlaybackStatus::Idle,
            text: None,
            error: None,
            handle: None,
            request_id: 0,
            mounted: true,
        }
    }

    fn is_current(&self, request_id: u64) -> bool {
        self.mounted && self.request_id == request_id
    }
}

struct ControllerInner {
    document: Option<DocumentId>,
    synthesizer: Arc<dyn SpeechSynthesisPort>,
    assets: Arc<dyn AudioAssetPort>,
    engine: Arc<dyn PlaybackEnginePort>,
    cache: Option<AudioCache>,
    session: Mutex<PlaybackSession>,
    /// 串行化缓存清单写回，持有期间复核请求号
    cache_writes: Mutex<()>,
    next_request: AtomicU64,
    events: broadcast::Sender<PlayerEvent>,
    state: watch::Sender<PlayerSnapshot>,
    listener: JoinHandle<()>,
}

/// 音频播放控制器
///
/// 每个界面实例一个。`mount` 时开始监听播放引擎通知，`unmount` 后所有在途
/// 结果都被丢弃，播放资源被释放。
pub struct AudioController {
    inner: Arc<ControllerInner>,
}

impl AudioController {
    /// 挂载控制器
    ///
    /// 必须在 tokio 运行时内调用。`document` 与 `documents` 都存在且
    /// `config.use_db` 打开时启用文档级语音缓存。
    pub fn mount(
        config: PlayerConfig,
        document: Option<DocumentId>,
        synthesizer: Arc<dyn SpeechSynthesisPort>,
        assets: Arc<dyn AudioAssetPort>,
        engine: Arc<dyn PlaybackEnginePort>,
        documents: Option<Arc<dyn DocumentRepositoryPort>>,
    ) -> Self {
        let cache = match (&document, documents) {
            (Some(_), Some(documents)) if config.use_db => Some(AudioCache::new(
                documents,
                assets.clone(),
                config.max_manifest_entries,
            )),
            _ => None,
        };

        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (state, _) = watch::channel(PlayerSnapshot::default());
        let engine_events = engine.subscribe();

        let inner = Arc::new_cyclic(|weak: &Weak<ControllerInner>| ControllerInner {
            document,
            synthesizer,
            assets,
            engine,
            cache,
            session: Mutex::new(PlaybackSession::new()),
            cache_writes: Mutex::new(()),
            next_request: AtomicU64::new(1),
            events,
            state,
            listener: tokio::spawn(listen_engine(weak.clone(), engine_events)),
        });

        tracing::debug!(
            document_id = ?inner.document.as_ref().map(|d| d.as_str()),
            cache_enabled = inner.cache.is_some(),
            "AudioController mounted"
        );

        Self { inner }
    }

    /// 当前状态
    pub fn status(&self) -> PlaybackStatus {
        self.inner.state.borrow().status
    }

    /// 最近一次错误信息
    pub fn error(&self) -> Option<String> {
        self.inner.state.borrow().error.clone()
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        self.inner.state.borrow().clone()
    }

    /// 订阅状态变化通知
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.inner.events.subscribe()
    }

    /// 生成并播放
    ///
    /// 缓存命中时跳过合成，但状态仍依次经过 generating → downloading → playing。
    /// 进行中的旧请求会被本次调用取代。
    pub async fn generate_and_play(&self, text: impl Into<String>) -> PlayOutcome {
        let inner = &self.inner;
        let text = text.into();
        let request_id = inner.next_request.fetch_add(1, Ordering::SeqCst);

        {
            let mut session = inner.session.lock().await;
            if !session.mounted {
                tracing::debug!(request_id, "Controller unmounted, ignoring request");
                return PlayOutcome::Superseded;
            }
            session.request_id = request_id;
            inner.release_playback(&mut session);

            if text.trim().is_empty() {
                let message = "Nothing to read: text is empty".to_string();
                inner.apply(&mut session, PlayerTrigger::Invalid, Some(message.clone()));
                return PlayOutcome::Failed(message);
            }

            session.text = Some(text.clone());
            inner.apply(&mut session, PlayerTrigger::Generate, None);
        }

        let key = CacheKey::from_text(&text);
        let cached = match (&inner.cache, &inner.document) {
            (Some(cache), Some(document_id)) => cache.lookup(document_id, &key).await,
            _ => None,
        };

        let asset = match cached {
            Some(asset) => {
                let mut session = inner.session.lock().await;
                if !session.is_current(request_id) {
                    return inner.superseded(request_id);
                }
                tracing::info!(request_id, cache_key = %key, "Using cached audio");
                inner.apply(&mut session, PlayerTrigger::CacheHit, None);
                asset
            }
            None => match self.synthesize(request_id, &text, key).await {
                Ok(asset) => asset,
                Err(outcome) => return outcome,
            },
        };

        let fetched = inner.assets.fetch(&asset).await;

        let mut session = inner.session.lock().await;
        if !session.is_current(request_id) {
            return inner.superseded(request_id);
        }

        let resource = match fetched {
            Ok(resource) => resource,
            Err(e) => {
                let err = ApplicationError::from(e);
                tracing::error!(request_id, file_id = %asset.file_id, error = %err, "Audio download failed");
                let message = err.user_message();
                inner.apply(&mut session, PlayerTrigger::FetchFailed, Some(message.clone()));
                return PlayOutcome::Failed(message);
            }
        };

        inner.stop_foreign_handles(&session);

        let handle = match inner.engine.load(&resource) {
            Ok(handle) => handle,
            Err(e) => {
                let message = ApplicationError::from(e).user_message();
                tracing::error!(request_id, error = %message, "Playback engine load failed");
                inner.apply(&mut session, PlayerTrigger::LoadFailed, Some(message.clone()));
                return PlayOutcome::Failed(message);
            }
        };

        if let Err(e) = inner.engine.play(handle) {
            let message = ApplicationError::from(e).user_message();
            tracing::error!(request_id, handle = %handle, error = %message, "Playback failed to start");
            if let Err(e) = inner.engine.stop(handle) {
                tracing::warn!(handle = %handle, error = %e, "Failed to release playback handle");
            }
            inner.apply(&mut session, PlayerTrigger::LoadFailed, Some(message.clone()));
            return PlayOutcome::Failed(message);
        }

        session.handle = Some(handle);
        inner.apply(&mut session, PlayerTrigger::Fetched, None);
        PlayOutcome::Playing(handle)
    }

    /// 缓存未命中：合成、写回缓存清单、进入 downloading
    async fn synthesize(
        &self,
        request_id: u64,
        text: &str,
        key: CacheKey,
    ) -> Result<AudioAsset, PlayOutcome> {
        let inner = &self.inner;
        tracing::debug!(request_id, text_len = text.len(), cache_key = %key, "Synthesizing speech");

        let result = inner.synthesizer.synthesize(text).await;

        if let (Ok(asset), Some(cache), Some(document_id)) = (&result, &inner.cache, &inner.document) {
            // 被取代的请求不写回清单
            let _writes = inner.cache_writes.lock().await;
            if inner.session.lock().await.is_current(request_id) {
                if let Err(e) = cache.record(document_id, key, asset).await {
                    tracing::warn!(
                        request_id,
                        document_id = %document_id,
                        error = %e,
                        "Failed to persist audio manifest, continuing playback"
                    );
                }
            } else {
                tracing::debug!(request_id, file_id = %asset.file_id, "Skipping manifest write for superseded request");
            }
        }

        let mut session = inner.session.lock().await;
        if !session.is_current(request_id) {
            return Err(inner.superseded(request_id));
        }

        match result {
            Ok(asset) => {
                inner.apply(&mut session, PlayerTrigger::Synthesized, None);
                Ok(asset)
            }
            Err(e) => {
                let err = ApplicationError::from(e);
                tracing::error!(request_id, error = %err, "Speech synthesis failed");
                let message = err.user_message();
                inner.apply(&mut session, PlayerTrigger::SynthesisFailed, Some(message.clone()));
                Err(PlayOutcome::Failed(message))
            }
        }
    }

    /// 暂停（仅在 playing 状态下有效）
    pub async fn pause(&self) -> Result<(), ApplicationError> {
        let inner = &self.inner;
        let mut session = inner.session.lock().await;
        let handle = match (session.status, session.handle) {
            (PlaybackStatus::Playing, Some(handle)) => handle,
            (status, _) => {
                tracing::debug!(status = %status, "Pause rejected");
                return Err(ApplicationError::invalid_state(format!("Cannot pause while {}", status)));
            }
        };

        match inner.engine.pause(handle) {
            Ok(()) => {
                inner.apply(&mut session, PlayerTrigger::Pause, None);
                Ok(())
            }
            Err(e) => {
                let err = ApplicationError::from(e);
                inner.fail_playback(&mut session, err.user_message());
                Err(err)
            }
        }
    }

    /// 恢复（仅在 paused 状态下有效）
    pub async fn resume(&self) -> Result<(), ApplicationError> {
        let inner = &self.inner;
        let mut session = inner.session.lock().await;
        let handle = match (session.status, session.handle) {
            (PlaybackStatus::Paused, Some(handle)) => handle,
            (status, _) => {
                tracing::debug!(status = %status, "Resume rejected");
                return Err(ApplicationError::invalid_state(format!("Cannot resume while {}", status)));
            }
        };

        match inner.engine.resume(handle) {
            Ok(()) => {
                inner.apply(&mut session, PlayerTrigger::Resume, None);
                Ok(())
            }
            Err(e) => {
                let err = ApplicationError::from(e);
                inner.fail_playback(&mut session, err.user_message());
                Err(err)
            }
        }
    }

    /// 停止：总是回到 idle，并取消在途请求
    pub async fn stop(&self) {
        let inner = &self.inner;
        let mut session = inner.session.lock().await;
        session.request_id = inner.next_request.fetch_add(1, Ordering::SeqCst);
        inner.release_playback(&mut session);
        inner.apply(&mut session, PlayerTrigger::Stop, None);
    }

    /// 卸载：丢弃在途结果，释放播放资源，停止监听引擎通知
    pub async fn unmount(&self) {
        let inner = &self.inner;
        let mut session = inner.session.lock().await;
        if !session.mounted {
            return;
        }
        session.mounted = false;
        session.request_id = inner.next_request.fetch_add(1, Ordering::SeqCst);
        inner.release_playback(&mut session);
        inner.listener.abort();
        tracing::debug!("AudioController unmounted");
    }
}

impl Drop for AudioController {
    fn drop(&mut self) {
        self.inner.listener.abort();
        if let Ok(mut session) = self.inner.session.try_lock() {
            if let Some(handle) = session.handle.take() {
                if let Err(e) = self.inner.engine.stop(handle) {
                    tracing::warn!(handle = %handle, error = %e, "Failed to release playback handle on drop");
                }
            }
        }
    }
}

impl ControllerInner {
    /// 执行状态转移并通知订阅者
    ///
    /// 被转移表拒绝的事件不改变状态；卸载后不再发出通知
    fn apply(&self, session: &mut PlaybackSession, trigger: PlayerTrigger, error: Option<String>) -> bool {
        let from = session.status;
        let Some(to) = from.next(trigger) else {
            tracing::debug!(from = %from, trigger = ?trigger, "Transition rejected");
            return false;
        };

        let error = if to == PlaybackStatus::Error { error } else { None };
        // 重新生成时即使状态不变也要通知（请求号已变化）
        if from == to && session.error == error && trigger != PlayerTrigger::Generate {
            return true;
        }

        session.status = to;
        session.error = error.clone();

        if !session.mounted {
            return true;
        }

        tracing::info!(request_id = session.request_id, from = %from, to = %to, "Playback status changed");

        self.state.send_replace(PlayerSnapshot {
            status: to,
            error: error.clone(),
            text: session.text.clone(),
            request_id: session.request_id,
        });

        // 没有订阅者时发送失败是正常情况
        let _ = self.events.send(PlayerEvent::StatusChanged {
            request_id: session.request_id,
            from,
            to,
            error,
        });
        true
    }

    /// 释放当前播放句柄；引擎报错时同样视为已释放
    fn release_playback(&self, session: &mut PlaybackSession) {
        if let Some(handle) = session.handle.take() {
            if let Err(e) = self.engine.stop(handle) {
                tracing::warn!(handle = %handle, error = %e, "Engine error while releasing playback");
            }
        }
    }

    /// 播放设备由单个控制器独占：获取前停止非本会话创建的句柄
    fn stop_foreign_handles(&self, session: &PlaybackSession) {
        for handle in self.engine.active() {
            if session.handle == Some(handle) {
                continue;
            }
            tracing::info!(handle = %handle, "Stopping foreign playback handle");
            if let Err(e) = self.engine.stop(handle) {
                tracing::warn!(handle = %handle, error = %e, "Failed to stop foreign playback handle");
            }
        }
    }

    fn fail_playback(&self, session: &mut PlaybackSession, message: String) {
        tracing::error!(error = %message, "Playback engine failed");
        self.release_playback(session);
        self.apply(session, PlayerTrigger::EngineFailed, Some(message));
    }

    fn superseded(&self, request_id: u64) -> PlayOutcome {
        tracing::debug!(request_id, "Request superseded, dropping result");
        PlayOutcome::Superseded
    }

    async fn on_engine_event(&self, event: EngineEvent) {
        let mut session = self.session.lock().await;
        if session.handle != Some(event.handle()) {
            tracing::debug!(handle = %event.handle(), "Ignoring event for stale handle");
            return;
        }

        match event {
            EngineEvent::Finished(handle) => {
                if session.status != PlaybackStatus::Playing {
                    return;
                }
                tracing::info!(handle = %handle, "Playback finished");
                self.release_playback(&mut session);
                self.apply(&mut session, PlayerTrigger::Ended, None);
            }
            EngineEvent::Failed { message, .. } => {
                self.fail_playback(&mut session, message);
            }
        }
    }
}

/// 播放引擎通知监听任务
async fn listen_engine(inner: Weak<ControllerInner>, mut events: broadcast::Receiver<EngineEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                // 构造完成前到达的通知直接丢弃；任务由 Drop/unmount 终止
                let Some(inner) = inner.upgrade() else {
                    continue;
                };
                inner.on_engine_event(event).await;
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Playback engine events lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::application::ports::{AudioResource, DocumentField};
    use crate::domain::audio::AudioManifest;
    use crate::domain::document::{Document, FileId, Title, UserId};
    use crate::infrastructure::adapters::{FakeSpeechClient, SimulatedPlaybackEngine};
    use crate::infrastructure::memory::{InMemoryAudioAssets, InMemoryDocumentRepository};

    struct Harness {
        controller: AudioController,
        tts: Arc<FakeSpeechClient>,
        assets: Arc<InMemoryAudioAssets>,
        engine: Arc<SimulatedPlaybackEngine>,
        documents: Arc<InMemoryDocumentRepository>,
        document_id: DocumentId,
    }

    async fn harness_with(tts: FakeSpeechClient, assets: Arc<InMemoryAudioAssets>) -> Harness {
        let tts = Arc::new(tts);
        let engine = Arc::new(SimulatedPlaybackEngine::new(None));
        let documents = Arc::new(InMemoryDocumentRepository::new());
        let document_id = DocumentId::new("doc-1").unwrap();
        let document = Document::new(
            document_id.clone(),
            UserId::new("user-1").unwrap(),
            Title::new("report.pdf").unwrap(),
            FileId::new("file-1").unwrap(),
            "application/pdf",
        );
        documents.create(&document).await.unwrap();

        let controller = AudioController::mount(
            PlayerConfig::default(),
            Some(document_id.clone()),
            tts.clone(),
            assets.clone(),
            engine.clone(),
            Some(documents.clone()),
        );

        Harness {
            controller,
            tts,
            assets,
            engine,
            documents,
            document_id,
        }
    }

    async fn harness() -> Harness {
        let assets = Arc::new(InMemoryAudioAssets::new());
        harness_with(FakeSpeechClient::new(assets.clone()), assets).await
    }

    fn drain(rx: &mut broadcast::Receiver<PlayerEvent>) -> Vec<PlaybackStatus> {
        let mut seen = Vec::new();
        while let Ok(PlayerEvent::StatusChanged { to, .. }) = rx.try_recv() {
            seen.push(to);
        }
        seen
    }

    #[tokio::test]
    async fn test_generate_and_play_traverses_all_states() {
        let h = harness().await;
        let mut rx = h.controller.subscribe();

        let outcome = h.controller.generate_and_play("Executive summary.").await;
        assert!(matches!(outcome, PlayOutcome::Playing(_)));
        assert_eq!(h.controller.status(), PlaybackStatus::Playing);
        assert_eq!(
            drain(&mut rx),
            vec![
                PlaybackStatus::Generating,
                PlaybackStatus::Downloading,
                PlaybackStatus::Playing
            ]
        );
        assert_eq!(h.tts.call_count(), 1);
        assert_eq!(h.engine.active().len(), 1);
    }

    #[tokio::test]
    async fn test_warm_cache_skips_synthesis() {
        let h = harness().await;

        h.controller.generate_and_play("Same text").await;
        h.controller.stop().await;

        let mut rx = h.controller.subscribe();
        let outcome = h.controller.generate_and_play("Same text").await;

        assert!(matches!(outcome, PlayOutcome::Playing(_)));
        assert_eq!(h.tts.call_count(), 1);
        assert_eq!(
            drain(&mut rx),
            vec![
                PlaybackStatus::Generating,
                PlaybackStatus::Downloading,
                PlaybackStatus::Playing
            ]
        );
    }

    #[tokio::test]
    async fn test_regenerate_while_playing_reuses_cache() {
        let h = harness().await;
        h.controller.generate_and_play("Same text").await;
        let first = h.engine.active();

        let outcome = h.controller.generate_and_play("Same text").await;
        assert!(matches!(outcome, PlayOutcome::Playing(_)));
        assert_eq!(h.tts.call_count(), 1);
        let second = h.engine.active();
        assert_eq!(second.len(), 1);
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_prepopulated_manifest_is_a_cache_hit() {
        let h = harness().await;
        let asset = h.assets.insert(b"cached-audio".to_vec());
        let mut manifest = AudioManifest::new();
        manifest.upsert(CacheKey::from_text("Known text"), asset.file_id.clone(), 8);
        h.documents
            .update_field(&h.document_id, DocumentField::TtsSummaryParts, &manifest.to_field())
            .await
            .unwrap();

        let mut rx = h.controller.subscribe();
        h.controller.generate_and_play("Known text").await;

        assert_eq!(h.tts.call_count(), 0);
        assert_eq!(h.assets.fetch_count(), 1);
        assert_eq!(
            drain(&mut rx),
            vec![
                PlaybackStatus::Generating,
                PlaybackStatus::Downloading,
                PlaybackStatus::Playing
            ]
        );
    }

    #[tokio::test]
    async fn test_unresolvable_cached_asset_is_resynthesized() {
        let h = harness().await;
        let mut manifest = AudioManifest::new();
        manifest.upsert(CacheKey::from_text("Known text"), FileId::new("gone").unwrap(), 8);
        h.documents
            .update_field(&h.document_id, DocumentField::TtsSummaryParts, &manifest.to_field())
            .await
            .unwrap();

        h.controller.generate_and_play("Known text").await;
        assert_eq!(h.tts.call_count(), 1);
        assert_eq!(h.controller.status(), PlaybackStatus::Playing);

        let doc = h.documents.find_by_id(&h.document_id).await.unwrap().unwrap();
        let entry = doc.manifest().lookup(&CacheKey::from_text("Known text")).cloned().unwrap();
        assert_ne!(entry.file_id.as_str(), "gone");
    }

    #[tokio::test]
    async fn test_manifest_written_after_synthesis() {
        let h = harness().await;
        h.controller.generate_and_play("Write me back").await;

        let doc = h.documents.find_by_id(&h.document_id).await.unwrap().unwrap();
        assert!(doc.manifest().lookup(&CacheKey::from_text("Write me back")).is_some());
    }

    #[tokio::test]
    async fn test_cache_write_failure_does_not_block_playback() {
        let h = harness().await;
        h.documents.fail_updates(true);

        let outcome = h.controller.generate_and_play("Still plays").await;
        assert!(matches!(outcome, PlayOutcome::Playing(_)));
        assert_eq!(h.controller.status(), PlaybackStatus::Playing);
        assert!(h.controller.error().is_none());
    }

    #[tokio::test]
    async fn test_blank_text_is_rejected_without_network() {
        let h = harness().await;
        let outcome = h.controller.generate_and_play("   \n\t").await;

        assert!(matches!(outcome, PlayOutcome::Failed(_)));
        assert_eq!(h.controller.status(), PlaybackStatus::Error);
        assert_eq!(h.controller.error().as_deref(), Some("Nothing to read: text is empty"));
        assert_eq!(h.tts.call_count(), 0);
        assert_eq!(h.assets.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_synthesis_error_message_is_surfaced() {
        let assets = Arc::new(InMemoryAudioAssets::new());
        let tts = FakeSpeechClient::new(assets.clone()).with_failure("quota exceeded");
        let h = harness_with(tts, assets).await;

        h.controller.generate_and_play("Anything").await;
        assert_eq!(h.controller.status(), PlaybackStatus::Error);
        assert_eq!(h.controller.error().as_deref(), Some("quota exceeded"));
    }

    #[tokio::test]
    async fn test_fetch_failure_goes_to_error() {
        let h = harness().await;
        h.assets.fail_fetches(true);

        h.controller.generate_and_play("Anything").await;
        assert_eq!(h.controller.status(), PlaybackStatus::Error);
        assert!(h.controller.error().unwrap().starts_with("Audio download failed"));
    }

    #[tokio::test]
    async fn test_engine_load_failure_goes_to_error() {
        let h = harness().await;
        h.engine.fail_loads(true);

        h.controller.generate_and_play("Anything").await;
        assert_eq!(h.controller.status(), PlaybackStatus::Error);
        assert!(h.controller.error().unwrap().starts_with("Failed to load audio"));
        assert!(h.engine.active().is_empty());
    }

    #[tokio::test]
    async fn test_latest_request_wins() {
        let assets = Arc::new(InMemoryAudioAssets::new());
        let tts = FakeSpeechClient::new(assets.clone())
            .with_latency_for("text A", Duration::from_millis(150));
        let h = harness_with(tts, assets).await;
        let controller = Arc::new(h.controller);
        let mut rx = controller.subscribe();

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.generate_and_play("text A").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = controller.generate_and_play("text B").await;

        assert!(matches!(second, PlayOutcome::Playing(_)));
        assert!(matches!(first.await.unwrap(), PlayOutcome::Superseded));
        assert_eq!(controller.status(), PlaybackStatus::Playing);
        assert_eq!(controller.snapshot().text.as_deref(), Some("text B"));

        let statuses = drain(&mut rx);
        assert_eq!(
            statuses,
            vec![
                PlaybackStatus::Generating,
                PlaybackStatus::Generating,
                PlaybackStatus::Downloading,
                PlaybackStatus::Playing
            ]
        );
        assert_eq!(h.engine.active().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_failure_produces_no_transition() {
        let assets = Arc::new(InMemoryAudioAssets::new());
        let tts = FakeSpeechClient::new(assets.clone())
            .with_latency_for("slow", Duration::from_millis(100))
            .with_failure_for("slow", "late failure");
        let h = harness_with(tts, assets).await;
        let controller = Arc::new(h.controller);

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.generate_and_play("slow").await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        controller.generate_and_play("fast").await;
        first.await.unwrap();

        assert_eq!(controller.status(), PlaybackStatus::Playing);
        assert!(controller.error().is_none());
    }

    #[tokio::test]
    async fn test_superseded_synthesis_does_not_touch_cache() {
        let assets = Arc::new(InMemoryAudioAssets::new());
        let tts = FakeSpeechClient::new(assets.clone())
            .with_call_latencies([Duration::from_millis(100), Duration::ZERO]);
        let h = harness_with(tts, assets).await;
        h.assets.delay_fetches(Duration::from_millis(200));
        let controller = Arc::new(h.controller);

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.generate_and_play("Same text").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = controller.generate_and_play("Same text").await;

        assert!(matches!(first.await.unwrap(), PlayOutcome::Superseded));
        assert!(matches!(second, PlayOutcome::Playing(_)), "got {:?}", second);
        assert_eq!(controller.status(), PlaybackStatus::Playing);
        assert_eq!(h.tts.call_count(), 2);

        let doc = h.documents.find_by_id(&h.document_id).await.unwrap().unwrap();
        let manifest = doc.manifest();
        assert_eq!(manifest.len(), 1);
        let entry = manifest.lookup(&CacheKey::from_text("Same text")).cloned().unwrap();
        assert!(h.assets.exists(&AudioAsset::new(entry.file_id)).await.unwrap());
    }

    #[tokio::test]
    async fn test_pause_and_resume() {
        let h = harness().await;
        h.controller.generate_and_play("Pause me").await;

        h.controller.pause().await.unwrap();
        assert_eq!(h.controller.status(), PlaybackStatus::Paused);
        h.controller.resume().await.unwrap();
        assert_eq!(h.controller.status(), PlaybackStatus::Playing);
    }

    #[tokio::test]
    async fn test_pause_while_idle_is_noop() {
        let h = harness().await;
        let mut rx = h.controller.subscribe();

        assert!(h.controller.pause().await.is_err());
        assert!(h.controller.resume().await.is_err());
        assert_eq!(h.controller.status(), PlaybackStatus::Idle);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_stop_always_returns_to_idle() {
        let h = harness().await;

        h.controller.generate_and_play("Stop me").await;
        h.controller.stop().await;
        assert_eq!(h.controller.status(), PlaybackStatus::Idle);
        assert!(h.engine.active().is_empty());

        h.controller.generate_and_play("Stop me").await;
        h.controller.pause().await.unwrap();
        h.controller.stop().await;
        assert_eq!(h.controller.status(), PlaybackStatus::Idle);

        h.controller.generate_and_play("").await;
        assert_eq!(h.controller.status(), PlaybackStatus::Error);
        h.controller.stop().await;
        assert_eq!(h.controller.status(), PlaybackStatus::Idle);
        assert!(h.controller.error().is_none());
    }

    #[tokio::test]
    async fn test_stop_releases_even_if_engine_errors() {
        let h = harness().await;
        h.controller.generate_and_play("Stop me").await;
        h.engine.fail_stops(true);

        h.controller.stop().await;
        assert_eq!(h.controller.status(), PlaybackStatus::Idle);
        assert!(h.engine.active().is_empty());
    }

    #[tokio::test]
    async fn test_natural_end_returns_to_idle() {
        let h = harness().await;
        let mut rx = h.controller.subscribe();
        let outcome = h.controller.generate_and_play("Short").await;
        let PlayOutcome::Playing(handle) = outcome else {
            panic!("expected playing");
        };

        h.engine.finish(handle);
        tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                if let Ok(PlayerEvent::StatusChanged { to: PlaybackStatus::Idle, .. }) = rx.recv().await {
                    break;
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(h.controller.status(), PlaybackStatus::Idle);
        assert!(h.engine.active().is_empty());
    }

    #[tokio::test]
    async fn test_engine_failure_during_playback() {
        let h = harness().await;
        let mut rx = h.controller.subscribe();
        let PlayOutcome::Playing(handle) = h.controller.generate_and_play("Short").await else {
            panic!("expected playing");
        };

        h.engine.fail(handle, "device unplugged");
        tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                if let Ok(PlayerEvent::StatusChanged { to: PlaybackStatus::Error, .. }) = rx.recv().await {
                    break;
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(h.controller.error().as_deref(), Some("device unplugged"));
    }

    #[tokio::test]
    async fn test_listener_survives_events_before_construction() {
        let (tx, rx) = broadcast::channel(4);
        let listener = tokio::spawn(listen_engine(Weak::new(), rx));

        tx.send(EngineEvent::Finished(PlaybackHandle::new(7))).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!listener.is_finished());

        drop(tx);
        tokio::time::timeout(Duration::from_secs(1), listener)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_foreign_handle_is_stopped_before_acquire() {
        let h = harness().await;
        let resource = AudioResource {
            asset: AudioAsset::new(FileId::new("other").unwrap()),
            data: vec![1, 2, 3],
            content_type: None,
        };
        let foreign = h.engine.load(&resource).unwrap();
        h.engine.play(foreign).unwrap();

        h.controller.generate_and_play("Mine").await;
        let active = h.engine.active();
        assert_eq!(active.len(), 1);
        assert_ne!(active[0], foreign);
    }

    #[tokio::test]
    async fn test_unmount_discards_in_flight_result() {
        let assets = Arc::new(InMemoryAudioAssets::new());
        let tts = FakeSpeechClient::new(assets.clone())
            .with_latency_for("slow", Duration::from_millis(100));
        let h = harness_with(tts, assets).await;
        let controller = Arc::new(h.controller);
        let mut rx = controller.subscribe();

        let pending = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.generate_and_play("slow").await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        controller.unmount().await;

        assert!(matches!(pending.await.unwrap(), PlayOutcome::Superseded));
        assert_eq!(drain(&mut rx), vec![PlaybackStatus::Generating]);
        assert!(h.engine.active().is_empty());
        assert!(matches!(
            controller.generate_and_play("after").await,
            PlayOutcome::Superseded
        ));
    }

    #[tokio::test]
    async fn test_cache_disabled_without_db_flag() {
        let assets = Arc::new(InMemoryAudioAssets::new());
        let tts = Arc::new(FakeSpeechClient::new(assets.clone()));
        let engine = Arc::new(SimulatedPlaybackEngine::new(None));
        let documents = Arc::new(InMemoryDocumentRepository::new());
        let config = PlayerConfig {
            use_db: false,
            ..PlayerConfig::default()
        };
        let controller = AudioController::mount(
            config,
            Some(DocumentId::new("doc-1").unwrap()),
            tts.clone(),
            assets,
            engine,
            Some(documents),
        );

        controller.generate_and_play("again").await;
        controller.generate_and_play("again").await;
        assert_eq!(tts.call_count(), 2);
        assert_eq!(controller.status(), PlaybackStatus::Playing);
    }
}
