//! Scene director tests.
//!
//! Every test runs on the paused Tokio clock with simulated media and a
//! scripted asset loader, so whole presentations play out in milliseconds.

use async_trait::async_trait;
use curtain_core::test_utils::{MediaProfile, SimulatedBackend};
use curtain_core::{
    millis, AssetKind, AssetManifest, FinaleScene, MediaHandle, MediaRole, PresentationConfig,
    QuestionScene, SceneDescriptor, SceneKind, ScenePlan, WelcomeScene, WelcomeText,
};
use curtain_playback::{
    DirectorError, Focus, Gate, IgnoreReason, Intent, IntentOutcome, PresentationState,
    SceneDirector, StageEvent, LOAD_FAILED_MESSAGE,
};
use curtain_prefetch::{AssetLoader, LoadError, Prefetcher, ScenePrefetcher};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;

// =============================================================================
// Fixtures
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum Behavior {
    Ready,
    Hang,
}

#[derive(Default)]
struct ScriptedLoader {
    behaviors: HashMap<String, Behavior>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedLoader {
    fn with(mut self, path: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(path.to_string(), behavior);
        self
    }

    fn calls(&self, path: &str) -> usize {
        self.calls.lock().unwrap().get(path).copied().unwrap_or(0)
    }
}

#[async_trait]
impl AssetLoader for ScriptedLoader {
    async fn load(&self, path: &str, _kind: AssetKind) -> Result<(), LoadError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_insert(0) += 1;

        match self.behaviors.get(path).copied().unwrap_or(Behavior::Ready) {
            Behavior::Ready => Ok(()),
            Behavior::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}

struct Stage {
    director: SceneDirector,
    events: UnboundedReceiver<StageEvent>,
    backend: Arc<SimulatedBackend>,
    loader: Arc<ScriptedLoader>,
    scenes: ScenePrefetcher,
}

impl Stage {
    fn new(config: PresentationConfig, loader: ScriptedLoader, backend: SimulatedBackend) -> Self {
        let loader = Arc::new(loader);
        let backend = Arc::new(backend);
        let plan = ScenePlan::new(Arc::new(config));
        let scenes = ScenePrefetcher::new(plan, Prefetcher::new(loader.clone()));
        let (director, events) = SceneDirector::new(scenes.clone(), backend.clone()).unwrap();
        Self {
            director,
            events,
            backend,
            loader,
            scenes,
        }
    }

    fn drain(&mut self) -> Vec<StageEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    /// Let time pass until `check` holds, giving up after `limit`
    async fn wait_until(&self, limit: Duration, check: impl Fn(&PresentationState) -> bool) -> bool {
        let deadline = Instant::now() + limit;
        while Instant::now() < deadline {
            if check(&self.director.state()) {
                return true;
            }
            tokio::time::sleep(millis(10)).await;
        }
        check(&self.director.state())
    }
}

fn question(video: &str, options: &[&str]) -> SceneDescriptor {
    SceneDescriptor::Question(QuestionScene {
        video: video.into(),
        question: "Which one?".into(),
        bg: Some("bg.jpg".into()),
        options: options.iter().map(|o| o.to_string()).collect(),
        ..Default::default()
    })
}

fn welcome(texts: Vec<WelcomeText>) -> SceneDescriptor {
    SceneDescriptor::Welcome(WelcomeScene {
        texts,
        ..Default::default()
    })
}

fn finale() -> SceneDescriptor {
    SceneDescriptor::Proposal(FinaleScene::default())
}

fn awaiting_click(state: &PresentationState) -> bool {
    matches!(
        state.focus,
        Focus::WelcomeText {
            awaiting_click: true,
            ..
        }
    ) && state.gate == Gate::Idle
}

fn awaiting_choice(state: &PresentationState) -> bool {
    matches!(
        state.focus,
        Focus::Question {
            awaiting_choice: true,
            ..
        }
    ) && state.gate == Gate::Idle
}

fn count(events: &[StageEvent], predicate: impl Fn(&StageEvent) -> bool) -> usize {
    events.iter().filter(|event| predicate(event)).count()
}

// =============================================================================
// Construction
// =============================================================================

mod construction {
    use super::*;

    #[test]
    fn empty_presentation_is_rejected() {
        let plan = ScenePlan::new(Arc::new(PresentationConfig::new(
            AssetManifest::default(),
            Vec::new(),
        )));
        let scenes = ScenePrefetcher::new(plan, Prefetcher::new(Arc::new(ScriptedLoader::default())));

        let result = SceneDirector::new(scenes, Arc::new(SimulatedBackend::new()));
        assert!(matches!(result, Err(DirectorError::EmptyPresentation)));
    }

    #[tokio::test(start_paused = true)]
    async fn audio_cues_open_silent() {
        let stage = Stage::new(
            PresentationConfig::new(AssetManifest::default(), vec![finale()]),
            ScriptedLoader::default(),
            SimulatedBackend::new(),
        );

        let bgm = stage.backend.last_with_role(MediaRole::Bgm).unwrap();
        assert_eq!(bgm.source(), "asset/bgm.mp3");
        assert_eq!(bgm.volume(), 0.0);
        assert!(bgm.is_looping());
        assert!(!bgm.is_playing());

        let click = stage.backend.last_with_role(MediaRole::Click).unwrap();
        assert_eq!(click.volume(), 1.0);

        let finale_audio = stage.backend.last_with_role(MediaRole::FinaleAudio).unwrap();
        assert_eq!(finale_audio.volume(), 0.0);
        assert!(!finale_audio.is_looping());
    }
}

// =============================================================================
// Input gate
// =============================================================================

mod gate {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn intents_are_ignored_while_animating() {
        let mut stage = Stage::new(
            PresentationConfig::new(
                AssetManifest::default(),
                vec![question("scene1.mp4", &["a", "b"]), finale()],
            ),
            ScriptedLoader::default(),
            SimulatedBackend::new(),
        );
        stage.director.start().await.unwrap();
        assert!(stage.director.is_animating());
        let before = stage.director.state();
        stage.drain();

        assert_eq!(
            stage.director.handle(Intent::SelectOption { scene: 0, option: 0 }),
            IntentOutcome::Ignored(IgnoreReason::Animating)
        );
        assert_eq!(
            stage.director.handle(Intent::JumpTo { scene: 1 }),
            IntentOutcome::Ignored(IgnoreReason::Animating)
        );

        tokio::time::sleep(millis(50)).await;
        assert_eq!(stage.director.state(), before);
        let events = stage.drain();
        assert_eq!(count(&events, |e| matches!(e, StageEvent::SceneReady { .. })), 0);
        assert_eq!(count(&events, |e| matches!(e, StageEvent::OptionChosen { .. })), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unexpected_intents_are_ignored() {
        let stage = Stage::new(
            PresentationConfig::new(
                AssetManifest::default(),
                vec![question("scene1.mp4", &["a", "b"]), finale()],
            ),
            ScriptedLoader::default(),
            SimulatedBackend::new(),
        );
        stage.director.start().await.unwrap();
        assert!(stage.wait_until(millis(5000), awaiting_choice).await);

        let not_expected = IntentOutcome::Ignored(IgnoreReason::NotExpected);
        assert_eq!(stage.director.handle(Intent::Continue), not_expected);
        assert_eq!(
            stage.director.handle(Intent::SelectOption { scene: 0, option: 2 }),
            not_expected
        );
        assert_eq!(
            stage.director.handle(Intent::SelectOption { scene: 1, option: 0 }),
            not_expected
        );
        assert_eq!(
            stage.director.handle(Intent::JumpTo { scene: 7 }),
            IntentOutcome::Ignored(IgnoreReason::UnknownScene)
        );
        assert!(awaiting_choice(&stage.director.state()));
    }

    #[tokio::test(start_paused = true)]
    async fn gate_changes_are_reported() {
        let mut stage = Stage::new(
            PresentationConfig::new(
                AssetManifest::default(),
                vec![question("scene1.mp4", &["a"]), finale()],
            ),
            ScriptedLoader::default(),
            SimulatedBackend::new(),
        );
        stage.director.start().await.unwrap();
        assert!(stage.wait_until(millis(5000), awaiting_choice).await);

        let changes: Vec<bool> = stage
            .drain()
            .into_iter()
            .filter_map(|event| match event {
                StageEvent::AnimatingChanged { animating } => Some(animating),
                _ => None,
            })
            .collect();
        assert_eq!(changes, vec![true, false]);
    }
}

// =============================================================================
// Transitions
// =============================================================================

mod transitions {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn concurrent_transition_requests_advance_once() {
        let mut stage = Stage::new(
            PresentationConfig::new(
                AssetManifest::default(),
                vec![
                    question("scene1.mp4", &["a"]),
                    question("scene2.mp4", &["b"]),
                    finale(),
                ],
            ),
            ScriptedLoader::default(),
            SimulatedBackend::new(),
        );
        stage.director.start().await.unwrap();
        assert!(stage.wait_until(millis(5000), awaiting_choice).await);
        stage.drain();

        assert!(stage.director.transition_to_next_scene());
        assert!(!stage.director.transition_to_next_scene());
        assert!(stage.director.is_transitioning());
        assert_eq!(
            stage.director.handle(Intent::SelectOption { scene: 0, option: 0 }),
            IntentOutcome::Ignored(IgnoreReason::Transitioning)
        );

        assert!(stage.wait_until(millis(10_000), awaiting_choice).await);
        assert_eq!(stage.director.scene_index(), 1);

        let events = stage.drain();
        assert_eq!(count(&events, |e| matches!(e, StageEvent::OverlayMounted)), 1);
        assert_eq!(
            count(&events, |e| matches!(e, StageEvent::SceneReady { scene: 1, .. })),
            1
        );
        assert_eq!(count(&events, |e| matches!(e, StageEvent::SceneReady { scene: 2, .. })), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn overlay_hides_the_scene_swap() {
        let mut stage = Stage::new(
            PresentationConfig::new(
                AssetManifest::default(),
                vec![question("scene1.mp4", &["a"]), question("scene2.mp4", &["b"])],
            ),
            ScriptedLoader::default(),
            SimulatedBackend::new(),
        );
        stage.director.start().await.unwrap();
        assert!(stage.wait_until(millis(5000), awaiting_choice).await);
        stage.drain();

        stage.director.transition_to_next_scene();
        assert!(stage.wait_until(millis(10_000), |s| s.gate == Gate::Idle).await);

        let order: Vec<&'static str> = stage
            .drain()
            .iter()
            .map(StageEvent::event_type)
            .filter(|name| name.starts_with("overlay") || *name == "scene_ready")
            .collect();
        assert_eq!(
            order,
            vec![
                "overlay_mounted",
                "overlay_fading_in",
                "scene_ready",
                "overlay_fading_out",
                "overlay_removed",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn transition_at_last_scene_stays_put() {
        let mut stage = Stage::new(
            PresentationConfig::new(AssetManifest::default(), vec![question("scene1.mp4", &["a"])]),
            ScriptedLoader::default(),
            SimulatedBackend::new(),
        );
        stage.director.start().await.unwrap();
        assert!(stage.wait_until(millis(5000), awaiting_choice).await);
        stage.drain();

        assert!(stage.director.transition_to_next_scene());
        assert!(stage.wait_until(millis(10_000), |s| s.gate == Gate::Idle).await);

        assert_eq!(stage.director.scene_index(), 0);
        let events = stage.drain();
        assert_eq!(count(&events, |e| matches!(e, StageEvent::SceneReady { .. })), 0);
        assert_eq!(count(&events, |e| matches!(e, StageEvent::OverlayRemoved)), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn jump_prefetches_and_renders_target() {
        let mut stage = Stage::new(
            PresentationConfig::new(
                AssetManifest::new(vec![vec!["bgm.mp3"], vec!["scene2.mp4"], vec!["end.mp4"]]),
                vec![
                    question("scene1.mp4", &["a"]),
                    question("scene2.mp4", &["b"]),
                    finale(),
                ],
            ),
            ScriptedLoader::default(),
            SimulatedBackend::new(),
        );
        stage.director.start().await.unwrap();
        assert!(stage.wait_until(millis(5000), awaiting_choice).await);
        stage.drain();

        assert!(stage.director.handle(Intent::JumpTo { scene: 2 }).is_accepted());
        assert!(stage.wait_until(millis(5000), |s| s.focus == Focus::Finale).await);

        assert_eq!(stage.director.scene_index(), 2);
        assert_eq!(stage.loader.calls("asset/end.mp4"), 1);
        assert_eq!(stage.loader.calls("asset/scene2.mp4"), 0);
        let events = stage.drain();
        assert!(events.contains(&StageEvent::SceneReady {
            scene: 2,
            kind: SceneKind::Finale
        }));
    }
}

// =============================================================================
// Welcome
// =============================================================================

mod welcome {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn timed_texts_advance_on_their_own() {
        let mut stage = Stage::new(
            PresentationConfig::new(
                AssetManifest::default(),
                vec![
                    welcome(vec![WelcomeText::timed("a", 0), WelcomeText::timed("b", 200)]),
                    finale(),
                ],
            ),
            ScriptedLoader::default(),
            SimulatedBackend::new(),
        );
        stage.director.start().await.unwrap();

        assert!(stage.wait_until(millis(10_000), |s| s.focus == Focus::Finale).await);
        let shown: Vec<String> = stage
            .drain()
            .into_iter()
            .filter_map(|event| match event {
                StageEvent::WelcomeTextShown { content, .. } => Some(content),
                _ => None,
            })
            .collect();
        assert_eq!(shown, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn first_click_starts_background_music() {
        let mut stage = Stage::new(
            PresentationConfig::new(
                AssetManifest::default(),
                vec![
                    welcome(vec![WelcomeText::click("sound on"), WelcomeText::click("hello")]),
                    finale(),
                ],
            ),
            ScriptedLoader::default(),
            SimulatedBackend::new(),
        );
        stage.director.start().await.unwrap();
        assert!(stage.wait_until(millis(5000), awaiting_click).await);

        let bgm = stage.backend.last_with_role(MediaRole::Bgm).unwrap();
        assert!(!bgm.is_playing());

        assert!(stage.director.handle(Intent::Continue).is_accepted());
        assert!(stage.wait_until(millis(5000), awaiting_click).await);
        assert!(bgm.is_playing());

        let events = stage.drain();
        assert!(events.iter().any(|event| matches!(
            event,
            StageEvent::MediaFade { media, target, duration_ms: 2000, .. }
                if *media == bgm.id() && *target == 0.7
        )));

        tokio::time::sleep(millis(2500)).await;
        assert_eq!(bgm.volume(), 0.7);
    }
}

// =============================================================================
// Question video
// =============================================================================

mod question_video {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn choice_plays_video_then_moves_on() {
        let backend = SimulatedBackend::new();
        backend.set_profile(
            "asset/scene1.mp4",
            MediaProfile::with_duration(Duration::from_secs(10)),
        );
        let mut stage = Stage::new(
            PresentationConfig::new(
                AssetManifest::default(),
                vec![question("scene1.mp4", &["a", "b"]), finale()],
            ),
            ScriptedLoader::default(),
            backend,
        );
        stage.director.start().await.unwrap();
        assert!(stage.wait_until(millis(5000), awaiting_choice).await);

        let question_bgm = stage.backend.last_with_role(MediaRole::QuestionBgm).unwrap();
        assert!(question_bgm.is_playing());

        assert!(stage
            .director
            .handle(Intent::SelectOption { scene: 0, option: 1 })
            .is_accepted());
        assert_eq!(
            stage.director.handle(Intent::SelectOption { scene: 0, option: 0 }),
            IntentOutcome::Ignored(IgnoreReason::Animating)
        );

        assert!(
            stage
                .wait_until(millis(5000), |s| s.focus == Focus::QuestionVideo { scene: 0 })
                .await
        );
        let video = stage.backend.last_opened("asset/scene1.mp4").unwrap();
        assert_eq!(video.role(), MediaRole::SceneVideo);
        assert!(video.is_playing());
        assert!(!video.is_muted());

        assert!(stage.wait_until(millis(20_000), |s| s.focus == Focus::Finale).await);
        assert_eq!(video.volume(), 0.0);
        assert!(video
            .volume_history()
            .iter()
            .any(|volume| *volume == 1.0));

        let events = stage.drain();
        let video_fade_out: Vec<u64> = events
            .iter()
            .filter_map(|event| match event {
                StageEvent::MediaFade { media, target, duration_ms, .. }
                    if *media == video.id() && *target == 0.0 =>
                {
                    Some(*duration_ms)
                }
                _ => None,
            })
            .collect();
        assert_eq!(video_fade_out, vec![2000]);

        let order: Vec<&'static str> = events
            .iter()
            .map(StageEvent::event_type)
            .filter(|name| {
                matches!(
                    *name,
                    "option_chosen" | "video_started" | "question_hidden" | "video_ended" | "finale_started"
                )
            })
            .collect();
        assert_eq!(
            order,
            vec!["option_chosen", "video_started", "question_hidden", "video_ended", "finale_started"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn jumping_away_stops_the_playing_video() {
        let backend = SimulatedBackend::new();
        backend.set_profile(
            "asset/scene1.mp4",
            MediaProfile::with_duration(Duration::from_secs(60)),
        );
        let mut stage = Stage::new(
            PresentationConfig::new(
                AssetManifest::default(),
                vec![question("scene1.mp4", &["a"]), finale()],
            ),
            ScriptedLoader::default(),
            backend,
        );
        stage.director.start().await.unwrap();
        assert!(stage.wait_until(millis(5000), awaiting_choice).await);
        assert!(stage
            .director
            .handle(Intent::SelectOption { scene: 0, option: 0 })
            .is_accepted());
        assert!(
            stage
                .wait_until(millis(5000), |s| {
                    s.focus == Focus::QuestionVideo { scene: 0 } && s.gate == Gate::Idle
                })
                .await
        );
        let video = stage.backend.last_opened("asset/scene1.mp4").unwrap();
        assert!(video.is_playing());

        assert!(stage.director.handle(Intent::JumpTo { scene: 1 }).is_accepted());
        assert!(stage.wait_until(millis(5000), |s| s.focus == Focus::Finale).await);
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(!video.is_playing());
        assert_eq!(video.volume(), 0.0);
        assert_eq!(video.pause_calls(), 1);
        assert_eq!(stage.director.scene_index(), 1);
        assert_eq!(
            count(&stage.drain(), |event| matches!(event, StageEvent::VideoEnded { .. })),
            0
        );
    }

    #[tokio::test(start_paused = true)]
    async fn question_shows_background_and_icons() {
        let mut stage = Stage::new(
            PresentationConfig::new(
                AssetManifest::new(vec![vec!["bg.jpg", "Q1_1.svg", "scene1.mp4"]]),
                vec![question("scene1.mp4", &["a", "b"])],
            ),
            ScriptedLoader::default(),
            SimulatedBackend::new(),
        );
        stage.director.start().await.unwrap();

        let shown = stage
            .drain()
            .into_iter()
            .find_map(|event| match event {
                StageEvent::QuestionShown {
                    options, background, ..
                } => Some((options, background)),
                _ => None,
            })
            .unwrap();
        assert_eq!(shown.1.as_deref(), Some("asset/bg.jpg"));
        assert_eq!(shown.0.len(), 2);
        assert_eq!(shown.0[0].icon.as_deref(), Some("asset/Q1_1.svg"));
    }
}

// =============================================================================
// Finale
// =============================================================================

mod finale_playback {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn video_and_audio_start_together_once_ready() {
        let backend = SimulatedBackend::new();
        backend.set_profile(
            "asset/end.mp4",
            MediaProfile {
                ready_after: Some(Duration::from_secs(2)),
                ..MediaProfile::default()
            },
        );
        let mut stage = Stage::new(
            PresentationConfig::new(AssetManifest::default(), vec![finale()]),
            ScriptedLoader::default(),
            backend,
        );
        stage.director.start().await.unwrap();

        let video = stage.backend.last_with_role(MediaRole::FinaleVideo).unwrap();
        let audio = stage.backend.last_with_role(MediaRole::FinaleAudio).unwrap();
        assert!(video.is_muted());

        tokio::time::sleep(millis(1500)).await;
        assert!(!video.is_playing());
        assert!(!audio.is_playing());

        tokio::time::sleep(millis(1000)).await;
        assert!(video.is_playing());
        assert!(audio.is_playing());
        assert!(audio.is_looping());

        tokio::time::sleep(millis(2500)).await;
        assert_eq!(audio.volume(), 0.5);

        tokio::time::sleep(millis(8000)).await;
        assert!(!video.is_playing());
        assert_eq!(video.seeks().last().copied(), Some(millis(9980)));
        assert!(stage.drain().contains(&StageEvent::FinaleHeld { scene: 0 }));
    }

    #[tokio::test(start_paused = true)]
    async fn leaving_the_finale_silences_its_media() {
        let stage = Stage::new(
            PresentationConfig::new(
                AssetManifest::default(),
                vec![question("scene1.mp4", &["a"]), finale()],
            ),
            ScriptedLoader::default(),
            SimulatedBackend::new(),
        );
        stage.director.start().await.unwrap();
        assert!(stage.wait_until(millis(5000), awaiting_choice).await);

        assert!(stage.director.handle(Intent::JumpTo { scene: 1 }).is_accepted());
        assert!(
            stage
                .wait_until(millis(5000), |s| s.focus == Focus::Finale && s.gate == Gate::Idle)
                .await
        );
        tokio::time::sleep(Duration::from_secs(1)).await;
        let video = stage.backend.last_with_role(MediaRole::FinaleVideo).unwrap();
        let audio = stage.backend.last_with_role(MediaRole::FinaleAudio).unwrap();
        assert!(video.is_playing());
        assert!(audio.is_playing());

        assert!(stage.director.handle(Intent::JumpTo { scene: 0 }).is_accepted());
        assert!(stage.wait_until(millis(5000), awaiting_choice).await);

        assert!(!video.is_playing());
        assert!(!audio.is_playing());
        assert_eq!(audio.volume(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn video_never_ready_falls_back_after_timeout() {
        let backend = SimulatedBackend::new();
        backend.set_profile("asset/end.mp4", MediaProfile::never_ready());
        let stage = Stage::new(
            PresentationConfig::new(AssetManifest::default(), vec![finale()]),
            ScriptedLoader::default(),
            backend,
        );
        stage.director.start().await.unwrap();

        let video = stage.backend.last_with_role(MediaRole::FinaleVideo).unwrap();
        let audio = stage.backend.last_with_role(MediaRole::FinaleAudio).unwrap();

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(!video.is_playing());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(video.is_playing());
        assert!(audio.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn broken_audio_does_not_block_video() {
        let backend = SimulatedBackend::new();
        backend.set_profile("asset/end.mp3", MediaProfile::broken("bad codec"));
        let stage = Stage::new(
            PresentationConfig::new(AssetManifest::default(), vec![finale()]),
            ScriptedLoader::default(),
            backend,
        );
        stage.director.start().await.unwrap();

        tokio::time::sleep(millis(100)).await;
        let video = stage.backend.last_with_role(MediaRole::FinaleVideo).unwrap();
        assert!(video.is_playing());
    }
}

// =============================================================================
// End to end
// =============================================================================

mod end_to_end {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn failing_question_video_halts_with_message() {
        let loader = ScriptedLoader::default().with("asset/a.mp4", Behavior::Hang);
        let mut stage = Stage::new(
            PresentationConfig::new(
                AssetManifest::new(vec![
                    vec!["bgm.mp3", "click.mp3"],
                    vec!["b.jpg", "a.mp4"],
                    vec!["end.mp3", "end.mp4"],
                ]),
                vec![
                    welcome(vec![
                        WelcomeText::click("one"),
                        WelcomeText::click("two"),
                        WelcomeText::click("three"),
                        WelcomeText::click("four"),
                    ]),
                    SceneDescriptor::Question(QuestionScene {
                        video: "a.mp4".into(),
                        bg: Some("b.jpg".into()),
                        options: vec!["yes".into(), "no".into()],
                        ..Default::default()
                    }),
                    finale(),
                ],
            ),
            loader,
            SimulatedBackend::new(),
        );

        let sequence = stage.scenes.run_full_sequence();
        stage.director.start().await.unwrap();

        for _ in 0..4 {
            assert!(stage.wait_until(millis(5000), awaiting_click).await);
            assert!(stage.director.handle(Intent::Continue).is_accepted());
            assert_eq!(
                stage.director.handle(Intent::Continue),
                IntentOutcome::Ignored(IgnoreReason::Animating)
            );
        }

        assert!(stage.wait_until(Duration::from_secs(120), |s| s.focus == Focus::Failed).await);

        let report = sequence.await.unwrap();
        assert_eq!(report.completed, vec![0]);
        assert_eq!(report.aborted_at, Some(1));

        assert_eq!(stage.loader.calls("asset/a.mp4"), 2);
        assert_eq!(stage.loader.calls("asset/end.mp4"), 0);
        assert_eq!(stage.loader.calls("asset/end.mp3"), 0);

        let state = stage.director.state();
        assert_eq!(state.gate, Gate::Halted);
        assert_eq!(
            stage.director.handle(Intent::JumpTo { scene: 2 }),
            IntentOutcome::Ignored(IgnoreReason::Halted)
        );

        let events = stage.drain();
        assert!(events.contains(&StageEvent::LoadFailed {
            scene: 1,
            message: LOAD_FAILED_MESSAGE.to_string()
        }));
        assert_eq!(count(&events, |e| matches!(e, StageEvent::QuestionShown { .. })), 0);
        assert_eq!(count(&events, |e| matches!(e, StageEvent::SceneReady { scene: 1, .. })), 0);
    }
}
