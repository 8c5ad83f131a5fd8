//! Tenant isolation and first-lookup behaviour of the registry.

use std::fs;
use std::sync::{Arc, Barrier};
use std::time::Duration;
use tracing::level_filters::LevelFilter;

use tenant_logging::registry::{RegistryError, WatcherState};
use tenant_logging::repository::SinkSpec;
use tenant_logging::tenant::{current_identity, PackagedResources};
use tenant_logging::{Tenant, TenantIdentity};

mod common;

use common::{write_config, CountingResolver, TestHome};

#[test]
fn test_tenants_get_distinct_repositories() {
    let home = TestHome::new();
    write_config(&home.app_dir("a").join("logging.properties"), "root.level = DEBUG\n", 0);
    write_config(&home.app_dir("b").join("logging.properties"), "root.level = ERROR\n", 0);
    let registry = home.registry();
    let a = home.tenant("a");
    let b = home.tenant("b");

    let repo_a = {
        let _guard = a.enter();
        registry.get_repository().unwrap()
    };
    let repo_b = {
        let _guard = b.enter();
        registry.get_repository().unwrap()
    };

    assert!(!Arc::ptr_eq(&repo_a, &repo_b));
    assert_eq!(repo_a.root_level(), LevelFilter::DEBUG);
    assert_eq!(repo_b.root_level(), LevelFilter::ERROR);
    assert_eq!(registry.len(), 2);
    registry.shutdown();
}

#[test]
fn test_lookup_follows_entered_tenant() {
    let home = TestHome::new();
    let registry = home.registry();
    let a = home.tenant("a");
    let b = home.tenant("b");

    let _outer = a.enter();
    let outer = registry.get_repository().unwrap();
    {
        let _inner = b.enter();
        assert_eq!(current_identity(), b.identity());
        let inner = registry.get_repository().unwrap();
        assert!(!Arc::ptr_eq(&outer, &inner));
    }
    assert_eq!(current_identity(), a.identity());
    assert!(Arc::ptr_eq(&outer, &registry.get_repository().unwrap()));
}

#[test]
fn test_concurrent_first_lookups_publish_once() {
    const THREADS: usize = 8;

    let home = TestHome::new();
    let dir = home.app_dir("t1");
    write_config(&dir.join("logging.properties"), "root.level = WARN\n", 0);
    let registry = Arc::new(home.registry());
    let resolver = Arc::new(CountingResolver::new(dir, Duration::from_millis(50)));
    let tenant = Tenant::new("t1", resolver.clone());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = registry.clone();
            let tenant = tenant.clone();
            let barrier = barrier.clone();
            std::thread::spawn(move || {
                let _guard = tenant.enter();
                barrier.wait();
                registry.get_repository().unwrap()
            })
        })
        .collect();
    let repositories: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    for repository in &repositories[1..] {
        assert!(Arc::ptr_eq(&repositories[0], repository));
    }

    let stats = registry.stats();
    assert_eq!(stats.published, 1);
    assert_eq!(stats.watchers_started, 1);
    // Each candidate looks up the markup name, then finds the key-value one.
    assert_eq!(resolver.lookups() as u64, 2 * (stats.published + stats.races_lost));
    assert_eq!(registry.watcher_state(&tenant.identity()), Some(WatcherState::Running));
    registry.shutdown();
}

#[test]
fn test_repeated_lookups_do_not_rediscover() {
    let home = TestHome::new();
    let resolver = Arc::new(CountingResolver::new(home.app_dir("t1"), Duration::ZERO));
    let tenant = Tenant::new("t1", resolver.clone());
    let registry = home.registry();
    let _guard = tenant.enter();

    let first = registry.get_repository().unwrap();
    let lookups = resolver.lookups();
    for _ in 0..10 {
        assert!(Arc::ptr_eq(&first, &registry.get_repository().unwrap()));
    }
    assert_eq!(resolver.lookups(), lookups);
}

#[test]
fn test_tenant_structured_config_is_applied_and_watched() {
    let home = TestHome::new();
    write_config(
        &home.app_dir("t1").join("logging.xml"),
        r#"<configuration>
  <sink name="file" kind="rolling_file" path="t1-orders.log"/>
  <logger name="orders.db" level="trace"/>
  <root level="warn"><sink-ref name="file"/></root>
</configuration>"#,
        0,
    );
    let registry = home.registry();
    let tenant = home.tenant("t1");
    let _guard = tenant.enter();

    let repository = registry.get_repository().unwrap();
    assert_eq!(repository.root_level(), LevelFilter::WARN);
    assert_eq!(repository.effective_level("orders.db"), LevelFilter::TRACE);
    assert_eq!(
        repository.sinks(),
        vec![SinkSpec::RollingFile {
            path: home.path().join("logs").join("t1-orders.log"),
            max_file_size: 1_000_000,
            max_backups: 100,
        }]
    );
    assert_eq!(registry.watcher_state(&tenant.identity()), Some(WatcherState::Running));
    registry.shutdown();
}

#[test]
fn test_unconfigured_tenant_gets_default_rolling_file() {
    let home = TestHome::new();
    let registry = home.registry();
    let tenant = home.tenant("T1");
    let _guard = tenant.enter();

    let repository = registry.get_repository().unwrap();
    assert_eq!(
        repository.sinks(),
        vec![SinkSpec::RollingFile {
            path: home.path().join("logs").join("mule-app-T1.log"),
            max_file_size: 1_000_000,
            max_backups: 100,
        }]
    );
    assert_eq!(registry.watcher_state(&tenant.identity()), None);

    repository.logger("orders").info("hello from T1");
    repository.flush();
    let written = fs::read_to_string(home.path().join("logs/mule-app-T1.log")).unwrap();
    assert!(written.contains("orders: hello from T1"));
}

#[test]
fn test_host_without_config_fails_and_retries() {
    let home = TestHome::new();
    let registry = home.registry();

    let err = registry.get_repository().unwrap_err();
    assert!(matches!(err, RegistryError::HostConfigMissing { .. }));
    assert!(!registry.contains(&TenantIdentity::Host));

    write_config(&home.path().join("conf/logging.properties"), "root.level = ERROR\n", 0);
    let repository = registry.get_repository().unwrap();
    assert_eq!(repository.root_level(), LevelFilter::ERROR);
    assert!(registry.contains(&TenantIdentity::Host));
    assert_eq!(registry.watcher_state(&TenantIdentity::Host), None);
}

#[test]
fn test_host_prefers_structured_config() {
    let home = TestHome::new();
    write_config(&home.path().join("conf/logging.xml"), "<configuration><root level=\"warn\"/></configuration>", 0);
    write_config(&home.path().join("conf/logging.properties"), "root.level = ERROR\n", 0);
    write_config(&home.path().join("conf/logging.toml"), "[root]\nlevel = \"debug\"\n", 0);
    let registry = home.registry();

    assert_eq!(registry.get_repository().unwrap().root_level(), LevelFilter::WARN);
}

#[test]
fn test_packaged_config_is_applied_without_watcher() {
    let home = TestHome::new();
    let registry = home.registry();
    let resources = PackagedResources::new("t1").with_resource(
        "logging.xml",
        r#"<configuration>
  <sink name="out" kind="console"/>
  <root level="debug"><sink-ref name="out"/></root>
</configuration>"#,
    );
    let tenant = Tenant::new("t1", Arc::new(resources));
    let _guard = tenant.enter();

    let repository = registry.get_repository().unwrap();
    assert_eq!(repository.root_level(), LevelFilter::DEBUG);
    assert_eq!(repository.sink_names(), vec!["out".to_string()]);
    assert_eq!(registry.watcher_state(&tenant.identity()), None);
    assert_eq!(registry.stats().watchers_started, 0);
}
