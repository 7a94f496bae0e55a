use std::sync::Mutex;

use tempfile::NamedTempFile;

use vigil::config::{StreamKind, VigildConfig};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "VIGIL_CONFIG",
        "VIGIL_LISTEN_ADDR",
        "VIGIL_DETECTOR_URL",
        "VIGIL_DETECTOR_API_KEY",
        "VIGIL_WORKERS",
        "VIGIL_QUEUE_CAPACITY",
    ] {
        std::env::remove_var(key);
    }
}

fn write_config(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    file
}

#[test]
fn defaults_provide_demo_streams() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = VigildConfig::load().expect("load config");
    assert_eq!(cfg.listen_addr, "127.0.0.1:5000");
    assert_eq!(cfg.pipeline.workers, 4);
    assert_eq!(cfg.pipeline.queue_capacity, 4);
    assert!(cfg.detector.api_url.is_none());
    assert_eq!(cfg.streams.len(), 2);
    assert!(cfg.streams.iter().all(|s| s.path.starts_with("stub://")));

    clear_env();
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(
        r#"{
            "listen_addr": "0.0.0.0:9000",
            "jpeg_quality": 70,
            "detector": {
                "api_url": "https://detect.example.com",
                "api_key": "from-file",
                "timeout_secs": 5,
                "input_size": 640
            },
            "pipeline": {
                "workers": 2,
                "queue_capacity": 8,
                "idle_wait_ms": 2,
                "failure_backoff_ms": 100,
                "max_backoff_steps": 4
            },
            "gesture": {
                "pair_window_ms": 2500,
                "display_window_ms": 1000,
                "reset_window_ms": 1500
            },
            "streams": [
                {
                    "id": "lobby",
                    "path": "stub://lobby?frames=50",
                    "kind": "detection",
                    "model_id": "weapons-v2/3",
                    "confidence_threshold": 0.6,
                    "workers": 6,
                    "queue_capacity": 16
                },
                {
                    "id": "entrance",
                    "path": "stub://entrance",
                    "kind": "gesture",
                    "fps_override": 12.5
                }
            ]
        }"#,
    );

    std::env::set_var("VIGIL_CONFIG", file.path());
    std::env::set_var("VIGIL_DETECTOR_API_KEY", "from-env");
    std::env::set_var("VIGIL_WORKERS", "3");

    let cfg = VigildConfig::load().expect("load config");

    assert_eq!(cfg.listen_addr, "0.0.0.0:9000");
    assert_eq!(cfg.jpeg_quality, 70);
    assert_eq!(cfg.detector.api_url.as_deref(), Some("https://detect.example.com"));
    assert_eq!(cfg.detector.api_key, "from-env");
    assert_eq!(cfg.detector.timeout.as_secs(), 5);
    assert_eq!(cfg.detector.input_size, 640);
    assert_eq!(cfg.pipeline.workers, 3);
    assert_eq!(cfg.pipeline.queue_capacity, 8);
    assert_eq!(cfg.pipeline.max_backoff_steps, 4);
    assert_eq!(cfg.gesture.pair_window.as_millis(), 2500);
    assert_eq!(cfg.gesture.display_window.as_millis(), 1000);
    assert_eq!(cfg.streams.len(), 2);
    assert_eq!(cfg.streams[0].kind, StreamKind::Detection);
    assert_eq!(cfg.streams[0].model_id, "weapons-v2/3");
    assert_eq!(cfg.streams[0].confidence_threshold, 0.6);
    assert_eq!(cfg.streams[0].effective_workers(&cfg.pipeline), 6);
    assert_eq!(cfg.streams[0].effective_queue_capacity(&cfg.pipeline), 16);
    assert_eq!(cfg.streams[1].kind, StreamKind::Gesture);
    assert_eq!(cfg.streams[1].fps_override, Some(12.5));
    assert_eq!(cfg.streams[1].effective_workers(&cfg.pipeline), 3);

    clear_env();
}

#[test]
fn rejects_invalid_configs() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    // Duplicate stream ids.
    let file = write_config(
        r#"{"streams": [
            {"id": "a", "path": "stub://a"},
            {"id": "a", "path": "stub://b"}
        ]}"#,
    );
    std::env::set_var("VIGIL_CONFIG", file.path());
    assert!(VigildConfig::load().is_err());

    // Confidence threshold out of range.
    let file = write_config(
        r#"{"streams": [
            {"id": "a", "path": "stub://a", "confidence_threshold": 1.5}
        ]}"#,
    );
    std::env::set_var("VIGIL_CONFIG", file.path());
    assert!(VigildConfig::load().is_err());

    // Remote detector requires a model id on detection streams.
    let file = write_config(
        r#"{
            "detector": {"api_url": "https://detect.example.com", "api_key": "k"},
            "streams": [{"id": "a", "path": "stub://a", "kind": "detection"}]
        }"#,
    );
    std::env::set_var("VIGIL_CONFIG", file.path());
    assert!(VigildConfig::load().is_err());

    // Zero workers.
    let file = write_config(
        r#"{"pipeline": {"workers": 0}, "streams": [{"id": "a", "path": "stub://a"}]}"#,
    );
    std::env::set_var("VIGIL_CONFIG", file.path());
    assert!(VigildConfig::load().is_err());

    clear_env();
}
