//! End-to-end tests: a provider and a client on separate endpoints of one fabric.

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use alpha::Admin;
use alpha::Backend;
use alpha::BulkLocation;
use alpha::Client;
use alpha::Error;
use alpha::Provider;
use alpha::ResourceHandle;
use alpha::ResourceId;
use alpha::rpc;
use alpharpc::BulkMode;
use alpharpc::Engine;
use alpharpc::LocalFabric;
use rand::Rng;
use serde_json::Value;
use tokio::runtime::Runtime;

/// Server and client engines sharing a multi-thread runtime.
///
/// The runtime is the last field so it outlives both engines.
struct Fixture {
    _fabric: LocalFabric,
    server: Engine,
    client: Client,
    admin: Admin,
    _runtime: Runtime,
}

impl Fixture {
    fn new() -> Self {
        alpha::logging::init_for_tests();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .expect("Failed to build runtime");

        let fabric = LocalFabric::new();
        let server = Engine::new(fabric.endpoint(), runtime.handle().clone());
        let client_engine = Engine::new(fabric.endpoint(), runtime.handle().clone());

        Self {
            _fabric: fabric,
            server,
            client: Client::new(client_engine.clone()),
            admin: Admin::new(client_engine),
            _runtime: runtime,
        }
    }

    fn address(&self) -> &str {
        self.server.address()
    }

    fn provider(&self, provider_id: u16, token: &str, config: &str) -> Provider {
        Provider::builder(self.server.clone(), provider_id)
            .token(token)
            .config(config)
            .build()
            .expect("Failed to build provider")
    }

    fn create(&self, provider_id: u16, token: &str, backend: &str, config: &str) -> alpha::Result<ResourceId> {
        self.admin
            .create_resource(self.address(), provider_id, token, backend, config)?
            .wait()
    }

    fn handle(&self, provider_id: u16, id: ResourceId) -> ResourceHandle {
        self.client
            .make_resource_handle(self.address(), provider_id, id, true)
            .expect("Failed to make resource handle")
    }
}

/// Backend that counts destroy calls and can refuse to be destroyed.
struct CountingBackend {
    destroyed: Arc<AtomicUsize>,
    refuse: bool,
}

impl Backend for CountingBackend {
    fn get_config(&self) -> String {
        "{}".to_string()
    }

    fn compute_sum(&self, x: i32, y: i32) -> alpha::Result<i32> {
        Ok(x.wrapping_add(y))
    }

    fn destroy(&self) -> alpha::Result<bool> {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        if self.refuse {
            return Err(Error::OperationFailed("refused".into()));
        }
        Ok(true)
    }
}

fn register_counting(name: &str, refuse: bool) -> Arc<AtomicUsize> {
    let destroyed = Arc::new(AtomicUsize::new(0));
    let on_create = destroyed.clone();
    let on_open = destroyed.clone();
    alpha::registry::register_fns(
        name,
        move |_: &Engine, _: &Value| -> anyhow::Result<Box<dyn Backend>> {
            Ok(Box::new(CountingBackend { destroyed: on_create.clone(), refuse }))
        },
        move |_: &Engine, _: &Value| -> anyhow::Result<Box<dyn Backend>> {
            Ok(Box::new(CountingBackend { destroyed: on_open.clone(), refuse }))
        },
    );
    destroyed
}

#[test]
fn test_create_sum_destroy_scenario() {
    let fx = Fixture::new();
    let _provider = fx.provider(42, "", "");

    let id = fx.create(42, "", "reference", "{}").expect("Failed to create resource");
    let handle = fx.handle(42, id);

    let sum = handle
        .compute_sum(42, 51)
        .expect("Failed to issue sum")
        .wait()
        .expect("Sum failed");
    assert_eq!(sum, 93);

    let destroyed = fx
        .admin
        .destroy_resource(fx.address(), 42, "", id)
        .expect("Failed to issue destroy")
        .wait()
        .expect("Destroy failed");
    assert!(destroyed);

    match handle.check().expect("Failed to issue check").wait() {
        Err(Error::ResourceNotFound(missing)) => assert_eq!(missing, id),
        other => panic!("Expected ResourceNotFound, got {:?}", other),
    }
}

#[test]
fn test_random_sums() {
    let fx = Fixture::new();
    let provider = fx.provider(1, "", r#"{ "resources": [ { "type": "reference" } ] }"#);
    let id = provider.resource_ids()[0];
    let handle = fx.handle(1, id);

    let mut rng = rand::thread_rng();
    for _ in 0..50 {
        let x: i32 = rng.gen_range(-1_000_000..1_000_000);
        let y: i32 = rng.gen_range(-1_000_000..1_000_000);
        let sum = handle
            .compute_sum(x, y)
            .expect("Failed to issue sum")
            .wait()
            .expect("Sum failed");
        assert_eq!(sum, x + y);
    }
}

#[test]
fn test_overflow_is_reported() {
    let fx = Fixture::new();
    let _provider = fx.provider(1, "", "");
    let id = fx.create(1, "", "reference", "").expect("Failed to create resource");

    match fx.handle(1, id).compute_sum(i32::MAX, 1).expect("Failed to issue sum").wait() {
        Err(Error::OperationFailed(_)) => {}
        other => panic!("Expected OperationFailed, got {:?}", other),
    }
}

#[test]
fn test_wrong_token_is_rejected() {
    let fx = Fixture::new();
    let provider = fx.provider(3, "secret", "");

    match fx.create(3, "guess", "reference", "{}") {
        Err(Error::Unauthorized) => {}
        other => panic!("Expected Unauthorized, got {:?}", other),
    }
    assert!(provider.is_empty());

    let id = fx.create(3, "secret", "reference", "{}").expect("Failed to create resource");
    match fx.admin.destroy_resource(fx.address(), 3, "guess", id).expect("Failed to issue destroy").wait() {
        Err(Error::Unauthorized) => {}
        other => panic!("Expected Unauthorized, got {:?}", other),
    }
    assert_eq!(provider.resource_ids(), vec![id]);
}

#[test]
fn test_unknown_backend_type() {
    let fx = Fixture::new();
    let provider = fx.provider(4, "", "");

    match fx.create(4, "", "no-such-backend", "{}") {
        Err(Error::UnknownBackendType(name)) => assert_eq!(name, "no-such-backend"),
        other => panic!("Expected UnknownBackendType, got {:?}", other),
    }
    match fx.create(4, "", "reference", "{ broken") {
        Err(Error::ConfigParse(_)) => {}
        other => panic!("Expected ConfigParse, got {:?}", other),
    }
    assert!(provider.is_empty());
}

#[test]
fn test_bulk_sums() {
    let fx = Fixture::new();
    let provider = fx.provider(5, "", r#"{ "resource": { "type": "reference" } }"#);
    let handle = fx.handle(5, provider.resource_ids()[0]);

    let mut rng = rand::thread_rng();
    let x: Vec<i32> = (0..257).map(|_| rng.gen_range(-10_000..10_000)).collect();
    let y: Vec<i32> = (0..257).map(|_| rng.gen_range(-10_000..10_000)).collect();

    let sums = handle
        .compute_sums(&x, &y)
        .expect("Failed to issue bulk sum")
        .wait()
        .expect("Bulk sum failed");
    assert_eq!(sums.len(), x.len());
    for i in 0..x.len() {
        assert_eq!(sums[i], x[i] + y[i]);
    }

    let empty = handle
        .compute_sums(&[], &[])
        .expect("Failed to issue empty bulk sum")
        .wait()
        .expect("Empty bulk sum failed");
    assert!(empty.is_empty());
}

/// Mismatched lengths are refused before anything is sent.
#[test]
fn test_bulk_length_mismatch() {
    let fx = Fixture::new();
    let provider = fx.provider(6, "", r#"{ "resource": { "type": "reference" } }"#);
    let handle = fx.handle(6, provider.resource_ids()[0]);

    match handle.compute_sums(&[1, 2, 3], &[1, 2]) {
        Err(Error::InvalidArgument(_)) => {}
        Err(other) => panic!("Expected InvalidArgument, got {:?}", other),
        Ok(_) => panic!("Expected InvalidArgument, got a future"),
    }

    let engine = fx.client.engine();
    let input = engine.expose(vec![0; 12], BulkMode::ReadOnly);
    let output = engine.expose(vec![0; 8], BulkMode::WriteOnly);
    let x = BulkLocation::within(&input, 0, 12);
    let out = BulkLocation::within(&output, 0, 8);

    match handle.compute_sums_from_bulk(&x, &x, &out) {
        Err(Error::InvalidArgument(_)) => {}
        Err(other) => panic!("Expected InvalidArgument, got {:?}", other),
        Ok(_) => panic!("Expected InvalidArgument, got a future"),
    }

    // The provider applies the same check to requests it receives.
    let args = rpc::SumsArgs {
        id: provider.resource_ids()[0],
        x: x.clone(),
        y: x,
        out,
    };
    let bytes = alpharpc::frame::encode(&args).expect("Failed to encode arguments");
    let mut call = engine
        .call(fx.address(), 6, rpc::COMPUTE_SUMS, bytes, None)
        .expect("Failed to issue call");
    let reply = call.wait().expect("Call failed");
    match alpha::result::decode_reply::<bool>(&reply) {
        Err(Error::InvalidArgument(_)) => {}
        other => panic!("Expected InvalidArgument, got {:?}", other),
    }
    assert_eq!(output.read().expect("Output missing"), vec![0; 8]);
}

#[test]
fn test_bulk_sums_from_caller_windows() {
    let fx = Fixture::new();
    let provider = fx.provider(7, "", r#"{ "resource": { "type": "reference" } }"#);
    let handle = fx.handle(7, provider.resource_ids()[0]);
    let engine = fx.client.engine();

    let mut inputs = alpha::bulk::encode_i32s(&[1, 2, 3]);
    inputs.extend(alpha::bulk::encode_i32s(&[10, 20, 30]));
    let input = engine.expose(inputs, BulkMode::ReadOnly);
    let output = engine.expose(vec![0; 16], BulkMode::WriteOnly);

    let done = handle
        .compute_sums_from_bulk(
            &BulkLocation::within(&input, 0, 12),
            &BulkLocation::within(&input, 12, 12),
            &BulkLocation::within(&output, 4, 12),
        )
        .expect("Failed to issue bulk sum")
        .wait()
        .expect("Bulk sum failed");
    assert!(done);
    let bytes = output.read().expect("Output missing");
    assert_eq!(alpha::bulk::decode_i32s(&bytes), vec![0, 11, 22, 33]);

    // Pushing into a read-only region is a transfer failure.
    match handle
        .compute_sums_from_bulk(
            &BulkLocation::within(&input, 0, 12),
            &BulkLocation::within(&input, 12, 12),
            &BulkLocation::within(&input, 0, 12),
        )
        .expect("Failed to issue bulk sum")
        .wait()
    {
        Err(Error::Transfer(_)) => {}
        other => panic!("Expected Transfer, got {:?}", other),
    }
}

#[test]
fn test_timeout_raises_from_wait_and_completed() {
    let fx = Fixture::new();
    let provider = fx.provider(8, "", r#"{ "resource": { "type": "reference", "config": { "delay_ms": 300 } } }"#);
    let handle = fx.handle(8, provider.resource_ids()[0]);

    let future = handle
        .compute_sum_with_timeout(1, 2, Duration::from_millis(50))
        .expect("Failed to issue sum");
    match future.wait() {
        Err(Error::Timeout) => {}
        other => panic!("Expected Timeout, got {:?}", other),
    }

    let mut future = handle
        .compute_sum_with_timeout(1, 2, Duration::from_millis(50))
        .expect("Failed to issue sum");
    std::thread::sleep(Duration::from_millis(100));
    match future.completed() {
        Err(Error::Timeout) => {}
        other => panic!("Expected Timeout, got {:?}", other),
    }
    match future.wait() {
        Err(Error::Timeout) => {}
        other => panic!("Expected Timeout, got {:?}", other),
    }
}

/// A reply that lands after the deadline, but before anyone looks, is still a timeout.
#[test]
fn test_late_reply_is_a_timeout() {
    let fx = Fixture::new();
    let provider = fx.provider(23, "", r#"{ "resource": { "type": "reference", "config": { "delay_ms": 200 } } }"#);
    let handle = fx.handle(23, provider.resource_ids()[0]);

    let mut polled = handle
        .compute_sum_with_timeout(1, 2, Duration::from_millis(50))
        .expect("Failed to issue sum");
    let waited = handle
        .compute_sum_with_timeout(1, 2, Duration::from_millis(50))
        .expect("Failed to issue sum");
    std::thread::sleep(Duration::from_millis(500));

    match polled.completed() {
        Err(Error::Timeout) => {}
        other => panic!("Expected Timeout, got {:?}", other),
    }
    match waited.wait() {
        Err(Error::Timeout) => {}
        other => panic!("Expected Timeout, got {:?}", other),
    }
    assert_eq!(fx.client.engine().pending_calls(), 0);
}

/// A slow backend call does not hold up other requests on a one-worker pool.
#[test]
fn test_slow_backend_does_not_block_pool() {
    let fx = Fixture::new();
    let pool = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .expect("Failed to build pool");

    let provider = Provider::builder(fx.server.clone(), 24)
        .config(r#"{ "resource": { "type": "reference", "config": { "delay_ms": 1000 } } }"#)
        .pool(pool.handle().clone())
        .build()
        .expect("Failed to build provider");
    let handle = fx.handle(24, provider.resource_ids()[0]);

    let slow = handle.compute_sum(1, 2).expect("Failed to issue sum");
    std::thread::sleep(Duration::from_millis(50));

    let started = std::time::Instant::now();
    fx.create(24, "", "reference", "{}").expect("Failed to create resource");
    assert!(
        started.elapsed() < Duration::from_millis(500),
        "Create waited {:?} behind a slow sum",
        started.elapsed()
    );
    assert_eq!(provider.len(), 2);

    assert_eq!(slow.wait(), Ok(3));
    drop(provider);
    drop(pool);
}

#[test]
fn test_completed_polls_without_blocking() {
    let fx = Fixture::new();
    let provider = fx.provider(9, "", r#"{ "resource": { "type": "reference" } }"#);
    let handle = fx.handle(9, provider.resource_ids()[0]);

    let mut future = handle.compute_sum(20, 22).expect("Failed to issue sum");
    let mut polls = 0;
    while !future.completed().expect("Sum failed") {
        polls += 1;
        assert!(polls < 1000, "Reply never arrived");
        std::thread::sleep(Duration::from_millis(2));
    }
    assert_eq!(future.wait().expect("Sum failed"), 42);
}

#[test]
fn test_close_skips_backend_destroy() {
    let fx = Fixture::new();
    let destroyed = register_counting("suite-counting-close", false);
    let provider = fx.provider(10, "", "");

    let closed = fx.create(10, "", "suite-counting-close", "{}").expect("Failed to create resource");
    let removed = fx
        .admin
        .close_resource(fx.address(), 10, "", closed)
        .expect("Failed to issue close")
        .wait()
        .expect("Close failed");
    assert!(removed);
    assert_eq!(destroyed.load(Ordering::SeqCst), 0);

    match fx.admin.close_resource(fx.address(), 10, "", closed).expect("Failed to issue close").wait() {
        Err(Error::ResourceNotFound(id)) => assert_eq!(id, closed),
        other => panic!("Expected ResourceNotFound, got {:?}", other),
    }

    let id = fx.create(10, "", "suite-counting-close", "{}").expect("Failed to create resource");
    fx.admin
        .destroy_resource(fx.address(), 10, "", id)
        .expect("Failed to issue destroy")
        .wait()
        .expect("Destroy failed");
    assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    assert!(provider.is_empty());
}

/// A backend refusing destroy reports the failure, but the entry is gone.
#[test]
fn test_destroy_failure_still_removes() {
    let fx = Fixture::new();
    let destroyed = register_counting("suite-counting-refuse", true);
    let provider = fx.provider(11, "", "");

    let id = fx.create(11, "", "suite-counting-refuse", "{}").expect("Failed to create resource");
    match fx.admin.destroy_resource(fx.address(), 11, "", id).expect("Failed to issue destroy").wait() {
        Err(Error::OperationFailed(msg)) => assert_eq!(msg, "refused"),
        other => panic!("Expected OperationFailed, got {:?}", other),
    }
    assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    assert!(provider.is_empty());
}

#[test]
fn test_open_resource() {
    let fx = Fixture::new();
    let _provider = fx.provider(12, "t", "");

    let id = fx
        .admin
        .open_resource(fx.address(), 12, "t", "reference", "{}")
        .expect("Failed to issue open")
        .wait()
        .expect("Open failed");
    let sum = fx.handle(12, id).compute_sum(5, 6).expect("Failed to issue sum").wait();
    assert_eq!(sum, Ok(11));
}

/// A running call keeps its backend alive through a concurrent destroy.
#[test]
fn test_inflight_call_survives_destroy() {
    let fx = Fixture::new();
    let provider = fx.provider(13, "", "");
    let id = fx
        .create(13, "", "reference", r#"{ "delay_ms": 300 }"#)
        .expect("Failed to create resource");
    let handle = fx.handle(13, id);

    let pending = handle.compute_sum(7, 8).expect("Failed to issue sum");
    std::thread::sleep(Duration::from_millis(50));

    let destroyed = fx
        .admin
        .destroy_resource(fx.address(), 13, "", id)
        .expect("Failed to issue destroy")
        .wait()
        .expect("Destroy failed");
    assert!(destroyed);
    assert!(provider.is_empty());

    assert_eq!(pending.wait(), Ok(15));
}

/// Feeding a provider's config into another restores the same ids.
#[test]
fn test_config_round_trip() {
    let fx = Fixture::new();
    let first = fx.provider(
        14,
        "",
        r#"{ "resources": [ { "type": "reference" }, { "type": "reference", "config": { "delay_ms": 1 } } ] }"#,
    );
    let mut ids = first.resource_ids();
    ids.sort();
    assert_eq!(ids.len(), 2);

    let config = first.get_config();
    let second = fx.provider(15, "", &config);
    let mut restored = second.resource_ids();
    restored.sort();
    assert_eq!(restored, ids);

    let rendered: Value = serde_json::from_str(&second.get_config()).expect("Config is not JSON");
    let delays: Vec<&Value> = rendered["resources"]
        .as_array()
        .expect("Missing resources")
        .iter()
        .map(|entry| &entry["config"]["delay_ms"])
        .filter(|delay| !delay.is_null())
        .collect();
    assert_eq!(delays, vec![&Value::from(1)]);
}

#[test]
fn test_config_skips_bad_list_entries() {
    let fx = Fixture::new();
    let provider = fx.provider(
        16,
        "",
        r#"{ "resources": [ { "type": "no-such-backend" }, { "type": "reference" }, { "config": {} } ] }"#,
    );
    assert_eq!(provider.len(), 1);
}

#[test]
fn test_build_failures() {
    let fx = Fixture::new();

    let single = Provider::builder(fx.server.clone(), 17)
        .config(r#"{ "resource": { "type": "no-such-backend" } }"#)
        .build();
    match single {
        Err(Error::UnknownBackendType(_)) => {}
        Err(other) => panic!("Expected UnknownBackendType, got {:?}", other),
        Ok(_) => panic!("Expected UnknownBackendType, got a provider"),
    }
    assert!(!fx.server.is_registered(17));

    match Provider::builder(fx.server.clone(), 17).config("{ nope").build() {
        Err(Error::ConfigParse(_)) => {}
        Err(other) => panic!("Expected ConfigParse, got {:?}", other),
        Ok(_) => panic!("Expected ConfigParse, got a provider"),
    }

    let _taken = fx.provider(17, "", "");
    match Provider::builder(fx.server.clone(), 17).build() {
        Err(Error::Rpc(_)) => {}
        Err(other) => panic!("Expected Rpc, got {:?}", other),
        Ok(_) => panic!("Expected Rpc, got a provider"),
    }
}

#[test]
fn test_provider_drop_destroys_backends() {
    let fx = Fixture::new();
    let destroyed = register_counting("suite-counting-drop", false);
    let provider = fx.provider(
        18,
        "",
        r#"{ "resources": [ { "type": "suite-counting-drop" }, { "type": "suite-counting-drop" } ] }"#,
    );
    let id = fx.create(18, "", "suite-counting-drop", "{}").expect("Failed to create resource");
    let handle = fx.handle(18, id);
    assert_eq!(provider.len(), 3);

    drop(provider);
    assert_eq!(destroyed.load(Ordering::SeqCst), 3);
    assert!(!fx.server.is_registered(18));

    match handle.compute_sum(1, 1).expect("Failed to issue sum").wait() {
        Err(Error::Rpc(_)) => {}
        other => panic!("Expected Rpc, got {:?}", other),
    }
}

#[test]
fn test_make_resource_handle_verification() {
    let fx = Fixture::new();
    let provider = fx.provider(19, "", r#"{ "resource": { "type": "reference" } }"#);
    let id = provider.resource_ids()[0];

    match fx.client.make_resource_handle(fx.address(), 20, id, true) {
        Err(Error::Rpc(_)) => {}
        Err(other) => panic!("Expected Rpc, got {:?}", other),
        Ok(_) => panic!("Expected Rpc, got a handle"),
    }

    let missing = ResourceId::new();
    match fx.client.make_resource_handle(fx.address(), 19, missing, true) {
        Err(Error::ResourceNotFound(gone)) => assert_eq!(gone, missing),
        Err(other) => panic!("Expected ResourceNotFound, got {:?}", other),
        Ok(_) => panic!("Expected ResourceNotFound, got a handle"),
    }

    let offline = fx
        .client
        .make_resource_handle("local://404", 19, missing, false)
        .expect("Unverified handle should not touch the network");
    assert!(offline.is_valid());
    assert_eq!(offline.resource_id(), Ok(missing));
    assert_eq!(fx.client.get_config(), "{}");
}

#[test]
fn test_default_handle_is_invalid() {
    let handle = ResourceHandle::default();
    assert!(!handle.is_valid());
    assert!(matches!(handle.compute_sum(1, 2), Err(Error::InvalidHandle)));
    assert!(matches!(handle.compute_sums(&[1], &[2]), Err(Error::InvalidHandle)));
    assert!(matches!(handle.check(), Err(Error::InvalidHandle)));
    assert!(matches!(handle.resource_id(), Err(Error::InvalidHandle)));
}

#[test]
fn test_provider_on_dedicated_pool() {
    let fx = Fixture::new();
    let pool = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("Failed to build pool");

    let provider = Provider::builder(fx.server.clone(), 21)
        .config(r#"{ "resource": { "type": "reference" } }"#)
        .pool(pool.handle().clone())
        .build()
        .expect("Failed to build provider");
    let handle = fx.handle(21, provider.resource_ids()[0]);

    let sums = handle
        .compute_sums(&[1, 2], &[3, 4])
        .expect("Failed to issue bulk sum")
        .wait()
        .expect("Bulk sum failed");
    assert_eq!(sums, vec![4, 6]);

    drop(provider);
    drop(pool);
}

#[test]
fn test_concurrent_clients() {
    let fx = Fixture::new();
    let provider = fx.provider(22, "", r#"{ "resource": { "type": "reference" } }"#);
    let id = provider.resource_ids()[0];

    let futures: Vec<_> = (0..64)
        .map(|i| {
            let handle = fx.handle(22, id);
            (i, handle.compute_sum(i, i).expect("Failed to issue sum"))
        })
        .collect();
    for (i, future) in futures {
        assert_eq!(future.wait(), Ok(2 * i));
    }
}

/// Blocking calls made from inside the runtime fail instead of panicking.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_blocking_calls_inside_runtime_fail() {
    let fabric = LocalFabric::new();
    let runtime = tokio::runtime::Handle::current();
    let server = Engine::new(fabric.endpoint(), runtime.clone());
    let client = Client::new(Engine::new(fabric.endpoint(), runtime));

    let provider = Provider::builder(server.clone(), 31)
        .config(r#"{ "resource": { "type": "reference" } }"#)
        .build()
        .expect("Failed to build provider");
    let id = provider.resource_ids()[0];

    match client.make_resource_handle(server.address(), 31, id, true) {
        Err(Error::Rpc(_)) => {}
        Err(other) => panic!("Expected Rpc, got {:?}", other),
        Ok(_) => panic!("Expected Rpc, got a handle"),
    }

    let handle = client
        .make_resource_handle(server.address(), 31, id, false)
        .expect("Failed to make handle");
    match handle.compute_sum(1, 2).expect("Failed to issue sum").wait() {
        Err(Error::Rpc(_)) => {}
        other => panic!("Expected Rpc, got {:?}", other),
    }
    assert_eq!(handle.compute_sum(1, 2).expect("Failed to issue sum").await, Ok(3));
}

/// Futures can be awaited from async code instead of blocking.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_await_futures() {
    let fabric = LocalFabric::new();
    let runtime = tokio::runtime::Handle::current();
    let server = Engine::new(fabric.endpoint(), runtime.clone());
    let client_engine = Engine::new(fabric.endpoint(), runtime);

    let _provider = Provider::builder(server.clone(), 30)
        .token("t")
        .build()
        .expect("Failed to build provider");

    let admin = Admin::new(client_engine.clone());
    let id = admin
        .create_resource(server.address(), 30, "t", "reference", "{}")
        .expect("Failed to issue create")
        .await
        .expect("Create failed");

    let handle = Client::new(client_engine)
        .make_resource_handle(server.address(), 30, id, false)
        .expect("Failed to make handle");
    assert!(handle.check().expect("Failed to issue check").await.expect("Check failed"));
    assert_eq!(handle.compute_sum(2, 3).expect("Failed to issue sum").await, Ok(5));
    assert_eq!(
        handle.compute_sums(&[1, 1], &[2, 2]).expect("Failed to issue bulk sum").await,
        Ok(vec![3, 3])
    );

    let timed = handle
        .compute_sum_with_timeout(1, 1, Duration::from_secs(5))
        .expect("Failed to issue sum")
        .await;
    assert_eq!(timed, Ok(2));
}
