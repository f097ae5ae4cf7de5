//! Property-based tests for the helper contract and handle persistence.

mod common;

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use serde_json::json;

use common::{BACKEND, FakeHelper, harness};
use qrest_hal::{
    AsyncResult, BackendConfig, JobId, MockTransport, ServerError, ServerHelper, ServerMessage,
};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn arb_status() -> impl Strategy<Value = ServerMessage> {
    prop_oneof![
        "[a-z]{1,10}".prop_map(|s| json!({"status": s})),
        any::<i64>().prop_map(|c| json!({"status": "finished", "status_code": c})),
        ("[a-z]{1,10}", any::<i64>()).prop_map(|(s, c)| json!({"status": s, "status_code": c})),
        "[ -~]{0,20}".prop_map(|e| json!({"status": "running", "error": e})),
    ]
}

fn arb_config() -> impl Strategy<Value = BackendConfig> {
    (
        "https://[a-z]{1,8}\\.example",
        proptest::option::of("[ -~]{0,12}"),
        proptest::collection::btree_map("[a-z_]{1,8}", "[ -~]{0,8}", 0..4),
    )
        .prop_map(|(base_url, api_key, extra)| {
            let mut config = BackendConfig::from(extra);
            config.insert("base_url", base_url);
            if let Some(key) = api_key {
                config.insert("api_key", key);
            }
            config
        })
}

proptest! {
    #[test]
    fn job_is_done_is_pure(response in arb_status()) {
        let helper = FakeHelper::new(Arc::default());
        let first = helper.job_is_done(&response).map_err(|e| e.to_string());
        let second = helper.job_is_done(&response).map_err(|e| e.to_string());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn job_is_done_verdicts(status in "[a-z]{1,10}", code in any::<i64>()) {
        let helper = FakeHelper::new(Arc::default());
        let verdict = helper.job_is_done(&json!({"status": status.clone(), "status_code": code}));

        if status != "finished" {
            prop_assert!(matches!(verdict, Ok(false)));
        } else if code == 0 {
            prop_assert!(matches!(verdict, Ok(true)));
        } else {
            prop_assert!(
                matches!(verdict, Err(ServerError::JobExecutionFailed { code: Some(c), .. }) if c == code),
                "expected JobExecutionFailed with code {}, got {:?}", code, verdict
            );
        }
    }

    #[test]
    fn headers_never_carry_empty_values(config in arb_config()) {
        let headers = runtime().block_on(async {
            let mut helper = FakeHelper::new(Arc::default());
            helper
                .initialize(config, Arc::new(MockTransport::new()))
                .await
                .unwrap();
            helper.get_headers()
        });

        for (name, value) in &headers {
            prop_assert!(!value.is_empty(), "header {} is empty", name);
        }
        prop_assert!(headers.contains_key("Content-Type"));
        prop_assert!(headers.contains_key("User-Agent"));
    }

    #[test]
    fn pending_handle_round_trips(
        job_id in "[a-zA-Z0-9-]{1,24}",
        config in arb_config(),
        kernels in proptest::collection::vec("[a-z]{1,8}", 0..4),
        delay_ms in 1u64..600_000,
    ) {
        let handle = AsyncResult::new(
            BACKEND,
            JobId::new(job_id.clone()),
            format!("/jobs/{job_id}"),
            config,
            kernels,
            Duration::from_millis(delay_ms),
        );
        let restored = AsyncResult::from_bytes(&handle.to_bytes().unwrap()).unwrap();
        prop_assert_eq!(&restored, &handle);
        prop_assert_eq!(restored.phase(), handle.phase());
    }
}

#[test]
fn restored_pending_handle_reaches_same_outcome() {
    runtime().block_on(async {
        let h = harness();
        h.transport.on_post("/jobs", json!({"id": "job-1"}));
        h.transport.on_get(
            "/jobs/job-1",
            json!({"status": "finished", "status_code": 0, "counts": {"10": 3}}),
        );

        let helper = h
            .driver
            .connect(BACKEND, common::config())
            .await
            .unwrap();
        let handle = h
            .driver
            .submit(helper.as_ref(), &common::two_circuits())
            .await
            .unwrap();
        let copy = AsyncResult::from_json(handle.to_json().unwrap()).unwrap();

        let original = h.driver.poll_once(helper.as_ref(), &handle).await.unwrap();
        let restored = h.driver.poll_once(helper.as_ref(), &copy).await.unwrap();
        assert_eq!(original, restored);
        assert_eq!(handle.outcome(), copy.outcome());
    });
}
