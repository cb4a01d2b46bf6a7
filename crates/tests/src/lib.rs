//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - Config loading into the session blueprint
//! - Event hub registration lifecycle over the simulated device
//! - Frame channel fed by the simulated depth generator
//! - Full pipeline runs against the simulator

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};

    #[test]
    fn test_config_round_trip_through_loader() {
        let config = ConfigLoader::load_from_str(
            r#"
            [depth]
            x_res = 320
            y_res = 240

            [gestures]
            focus = "Wave"
            enabled = ["Wave", "RaiseHand"]
            "#,
            ConfigFormat::Toml,
        )
        .unwrap();
        assert_eq!(config.version, contracts::ConfigVersion::V1);
        assert_eq!(config.depth.output_mode().pixel_count(), 320 * 240);

        let json = ConfigLoader::to_json(&config).unwrap();
        let reloaded = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(reloaded.gestures.focus, "Wave");
        assert_eq!(reloaded.depth.x_res, 320);
    }
}

#[cfg(test)]
mod hub_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use contracts::{DepthConfig, HandEvent, NativeEventSource, Point3D, SimulationConfig};
    use event_hub::{EventHub, HubError};
    use sensor_sim::SimContext;

    fn context() -> SimContext {
        SimContext::new(
            &DepthConfig {
                x_res: 32,
                y_res: 24,
                ..DepthConfig::default()
            },
            &SimulationConfig {
                realtime: false,
                gesture_interval_frames: 0,
                ..SimulationConfig::default()
            },
        )
        .unwrap()
    }

    fn hands_hub(ctx: &SimContext) -> EventHub<HandEvent> {
        let source: Arc<dyn NativeEventSource<HandEvent>> = ctx.hands_generator();
        EventHub::new("hands", source)
    }

    /// Native registration follows the first subscribe and the last unsubscribe
    #[test]
    fn test_registration_follows_subscriber_count() {
        let ctx = context();
        let hands = ctx.hands_generator();
        let hub = hands_hub(&ctx);

        let creates = Arc::new(AtomicUsize::new(0));
        let updates = Arc::new(AtomicUsize::new(0));

        let c = creates.clone();
        let l1 = hub
            .subscribe(move |event: &HandEvent| {
                if matches!(event, HandEvent::Create { .. }) {
                    c.fetch_add(1, Ordering::SeqCst);
                }
                Ok(())
            })
            .unwrap();
        assert_eq!(hands.callback_count(), 1);

        let u = updates.clone();
        let l2 = hub
            .subscribe(move |event: &HandEvent| {
                if matches!(event, HandEvent::Update { .. }) {
                    u.fetch_add(1, Ordering::SeqCst);
                }
                Ok(())
            })
            .unwrap();
        assert_eq!(hands.callback_count(), 1);

        hands.start_tracking(Point3D::new(0.0, 0.0, 1200.0));
        for _ in 0..5 {
            ctx.wait_and_update_all().unwrap();
        }
        assert_eq!(creates.load(Ordering::SeqCst), 1);
        assert_eq!(updates.load(Ordering::SeqCst), 4);

        assert!(hub.unsubscribe(l1).unwrap());
        assert_eq!(hands.callback_count(), 1);
        assert!(hub.unsubscribe(l2).unwrap());
        assert_eq!(hands.callback_count(), 0);
        assert!(!hub.unsubscribe(l2).unwrap());

        let stats = hub.stats();
        assert_eq!(stats.registrations, 1);
        assert_eq!(stats.deregistrations, 1);

        // Nothing reaches the hub once it is unregistered
        ctx.wait_and_update_all().unwrap();
        assert_eq!(updates.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_registration_failure_leaves_hub_empty() {
        let ctx = context();
        let hands = ctx.hands_generator();
        let hub = hands_hub(&ctx);

        hands.fail_next_register();
        let err = hub.subscribe(|_: &HandEvent| Ok(())).unwrap_err();
        assert!(matches!(err, HubError::Registration { .. }));
        assert_eq!(hub.subscriber_count(), 0);
        assert!(!hub.is_registered());
        assert_eq!(hands.callback_count(), 0);

        // The next attempt registers normally
        hub.subscribe(|_: &HandEvent| Ok(())).unwrap();
        assert!(hub.is_registered());
    }

    #[test]
    fn test_deregistration_failure_keeps_listener() {
        let ctx = context();
        let hands = ctx.hands_generator();
        let hub = hands_hub(&ctx);

        let seen = Arc::new(AtomicUsize::new(0));
        let s = seen.clone();
        let id = hub
            .subscribe(move |_: &HandEvent| {
                s.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();

        hands.fail_next_unregister();
        let err = hub.unsubscribe(id).unwrap_err();
        assert!(matches!(err, HubError::Deregistration { .. }));
        assert_eq!(hub.subscriber_count(), 1);
        assert!(hub.is_registered());

        hands.start_tracking(Point3D::new(0.0, 0.0, 1200.0));
        ctx.wait_and_update_all().unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        assert!(hub.unsubscribe(id).unwrap());
        assert_eq!(hands.callback_count(), 0);
    }

    #[test]
    fn test_failing_listener_does_not_block_others() {
        let ctx = context();
        let hands = ctx.hands_generator();
        let hub = hands_hub(&ctx);

        hub.subscribe(|_: &HandEvent| Err("listener rejected event".into()))
            .unwrap();
        let seen = Arc::new(AtomicUsize::new(0));
        let s = seen.clone();
        hub.subscribe(move |_: &HandEvent| {
            s.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

        hands.start_tracking(Point3D::new(0.0, 0.0, 1200.0));
        ctx.wait_and_update_all().unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(hub.stats().listener_failures, 1);
    }
}

#[cfg(test)]
mod frame_tests {
    use std::thread;
    use std::time::Duration;

    use contracts::{DepthConfig, DepthFrame, FrameSource, SimulationConfig};
    use frame_channel::{frame_channel, FrameError};
    use sensor_sim::SimContext;

    /// Simulated producer thread -> consumer in publish order
    #[test]
    fn test_sim_producer_feeds_consumer() {
        let ctx = SimContext::new(
            &DepthConfig {
                x_res: 40,
                y_res: 30,
                fps: 200,
                ..DepthConfig::default()
            },
            &SimulationConfig::default(),
        )
        .unwrap();
        let mode = ctx.output_mode();
        let (mut producer, consumer) =
            frame_channel(DepthFrame::new(mode), DepthFrame::new(mode));

        let depth = ctx.depth_generator();
        let producer_ctx = ctx.clone();
        let handle = thread::spawn(move || {
            for _ in 0..20 {
                producer_ctx.wait_and_update_all().unwrap();
                depth.fill(producer.begin_write()).unwrap();
                producer.publish();
            }
        });

        let mut last_sequence = 0;
        let mut last_frame_id = 0;
        loop {
            match consumer.consume_after(last_sequence, Duration::from_secs(2)) {
                Ok(frame) => {
                    assert!(frame.sequence() > last_sequence);
                    assert!(frame.frame_id > last_frame_id);
                    assert_eq!(frame.depth.len(), 40 * 30);
                    last_sequence = frame.sequence();
                    last_frame_id = frame.frame_id;
                }
                Err(FrameError::Closed) => break,
                Err(e) => panic!("unexpected frame error: {e}"),
            }
        }
        handle.join().unwrap();

        assert_eq!(last_sequence, 20);
        assert!(consumer.is_closed());
        // The last frame stays readable after the producer is gone
        assert_eq!(consumer.try_latest().unwrap().sequence(), 20);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::time::Duration;

    use contracts::{AppConfig, DepthConfig, RenderConfig, SimulationConfig};
    use handtrail_cli::pipeline::{Pipeline, PipelineConfig, StopReason};
    use tempfile::tempdir;

    fn app_config() -> AppConfig {
        AppConfig {
            depth: DepthConfig {
                x_res: 80,
                y_res: 60,
                fps: 120,
                ..DepthConfig::default()
            },
            render: RenderConfig {
                snapshot_every: 10,
                exit_after_secs: 0.0,
                ..RenderConfig::default()
            },
            simulation: SimulationConfig {
                seed: 7,
                hand_lifetime_frames: 15,
                gesture_interval_frames: 5,
                ..SimulationConfig::default()
            },
            ..AppConfig::default()
        }
    }

    /// Gestures start tracking, trails come and go, frames are rendered
    #[tokio::test]
    async fn test_e2e_simulated_session() {
        let dir = tempdir().unwrap();
        let mut config = PipelineConfig::new(app_config());
        config.max_frames = Some(90);
        config.timeout = Some(Duration::from_secs(20));
        config.snapshot_dir = Some(dir.path().join("snapshots"));

        let stats = Pipeline::new(config)
            .run_until(std::future::pending())
            .await
            .unwrap();

        assert_eq!(stats.stop_reason, StopReason::MaxFrames);
        assert_eq!(stats.frames_rendered, 90);
        assert!(stats.frames_published >= stats.frames_rendered);
        assert_eq!(stats.events_dropped, 0);

        let session = &stats.session;
        assert!(session.gestures_recognized.values().sum::<u64>() >= 1);
        assert!(session.hands_created >= 1);
        assert!(session.hands_destroyed >= 1, "hands outlive their lifetime");
        assert!(session.hand_updates > 0);
        assert!(session.trail_points.count() > 0);
        assert!(session.trail_points.max() <= 10.0);

        let snapshots = std::fs::read_dir(dir.path().join("snapshots"))
            .unwrap()
            .count();
        assert_eq!(snapshots, 9);
    }

    #[tokio::test]
    async fn test_e2e_paced_by_fps() {
        let mut app = app_config();
        app.depth.fps = 50;
        let mut config = PipelineConfig::new(app);
        config.max_frames = Some(10);

        let stats = Pipeline::new(config)
            .run_until(std::future::pending())
            .await
            .unwrap();

        // 10 frames at 50 fps cannot finish in much under 180ms
        assert!(stats.duration >= Duration::from_millis(150));
        assert!(stats.recent_fps() < 80.0);
    }
}
