use fnmock::{MockBuilder, MockableFunction, Registry, RegistryKey, Replacement, Visibility};
use serde_json::json;
use std::sync::{Arc, Barrier};
use std::thread;

fn pid_in(registry: &Arc<Registry>) -> MockableFunction {
    MockableFunction::new("proc", "getpid", |_| Ok(json!(4242)))
        .with_registry(Arc::clone(registry))
}

#[test]
fn test_parallel_tests_do_not_see_each_other() {
    let registry = Arc::new(Registry::default());
    let barrier = Arc::new(Barrier::new(2));

    let workers: Vec<_> = [1, 2]
        .into_iter()
        .map(|id| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let pid = pid_in(&registry);
                let mut mock = MockBuilder::new()
                    .scope("proc")
                    .name("getpid")
                    .value(id)
                    .registry(Arc::clone(&registry))
                    .build()
                    .unwrap();

                mock.enable().unwrap();
                // Both mocks are active at this point.
                barrier.wait();
                let seen = pid.call(&[]).unwrap();
                barrier.wait();
                mock.disable();
                seen
            })
        })
        .collect();

    let seen: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();
    assert_eq!(seen, vec![json!(1), json!(2)]);
    assert!(registry.is_empty());
}

#[test]
fn test_unmocked_thread_sees_real_implementation() {
    let registry = Arc::new(Registry::default());
    let mut mock = MockBuilder::new()
        .scope("proc")
        .name("getpid")
        .value(1)
        .registry(Arc::clone(&registry))
        .build()
        .unwrap();
    mock.enable().unwrap();

    let pid = pid_in(&registry);
    let seen = thread::spawn(move || pid.call(&[]).unwrap()).join().unwrap();
    assert_eq!(seen, json!(4242));
    assert_eq!(pid_in(&registry).call(&[]).unwrap(), json!(1));
    mock.disable();
}

#[test]
fn test_process_wide_mock_reaches_worker_threads() {
    let registry = Arc::new(Registry::default());
    let mut mock = MockBuilder::new()
        .scope("proc")
        .name("getpid")
        .value(7)
        .visibility(Visibility::Process)
        .registry(Arc::clone(&registry))
        .build()
        .unwrap();
    mock.enable().unwrap();

    let pid = pid_in(&registry);
    let seen: Vec<_> = (0..4)
        .map(|_| {
            let pid = pid.clone();
            thread::spawn(move || pid.call(&[]).unwrap())
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|h| h.join().unwrap())
        .collect();
    assert!(seen.iter().all(|v| *v == json!(7)));
    assert_eq!(mock.call_count(), 4);

    mock.disable();
    let after = thread::spawn(move || pid.call(&[]).unwrap()).join().unwrap();
    assert_eq!(after, json!(4242));
}

#[test]
fn test_handle_disabled_from_another_thread() {
    let registry = Arc::new(Registry::default());
    let mut mock = MockBuilder::new()
        .scope("proc")
        .name("getpid")
        .value(1)
        .registry(Arc::clone(&registry))
        .build()
        .unwrap();
    mock.enable().unwrap();

    let mock = thread::spawn(move || {
        mock.disable();
        mock
    })
    .join()
    .unwrap();

    assert!(!mock.is_enabled());
    assert!(registry.is_empty());
}

#[test]
fn test_disable_all_leaves_other_threads_mocks() {
    let enabled = Arc::new(Barrier::new(2));
    let torn_down = Arc::new(Barrier::new(2));

    let worker = {
        let enabled = Arc::clone(&enabled);
        let torn_down = Arc::clone(&torn_down);
        thread::spawn(move || {
            let time = MockableFunction::new("isolation", "time", |_| Ok(json!(0)));
            let mut mock = MockBuilder::new()
                .scope("isolation")
                .name("time")
                .value(2)
                .build()
                .unwrap();
            mock.enable().unwrap();
            enabled.wait();
            torn_down.wait();
            let seen = (mock.is_enabled(), time.call(&[]).unwrap());
            mock.disable();
            seen
        })
    };

    let time = MockableFunction::new("isolation", "time", |_| Ok(json!(0)));
    let mut mock = MockBuilder::new()
        .scope("isolation")
        .name("time")
        .value(1)
        .build()
        .unwrap();
    mock.enable().unwrap();
    enabled.wait();
    fnmock::disable_all();
    torn_down.wait();

    assert_eq!(time.call(&[]).unwrap(), json!(0));
    assert_eq!(worker.join().unwrap(), (true, json!(2)));
    mock.disable();
}

#[test]
fn test_exited_thread_releases_its_keys() {
    let key = RegistryKey::new("isolation", "exit");
    let spawned_key = key.clone();
    thread::spawn(move || {
        Registry::global()
            .register(spawned_key, Replacement::value(1))
            .unwrap();
    })
    .join()
    .unwrap();

    assert!(!Registry::global().active_keys().contains(&key));
    let mut mock = MockBuilder::new()
        .scope("isolation")
        .name("exit")
        .value(2)
        .visibility(Visibility::Process)
        .build()
        .unwrap();
    mock.enable().unwrap();
    mock.disable();
}
