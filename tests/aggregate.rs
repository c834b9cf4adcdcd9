//! Inventory aggregation across local files, provisioning state and the
//! secret store.

mod support;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use bunker::core::cipher::DeploymentKey;
use bunker::core::config::PluginKind;
use bunker::core::inventory::{Aggregator, InventorySource, InventoryWriter, PluginContext};
use bunker::core::secret_store::{MemoryStore, SecretStore};
use bunker::core::ssh::SshKeypair;
use bunker::core::types::Vars;
use bunker::error::{Error, SecretStoreError};
use serde_json::{json, Value};
use support::*;
use tempfile::TempDir;

fn context(root: &Path, store: Arc<dyn SecretStore>) -> PluginContext {
    PluginContext {
        root: root.to_path_buf(),
        deployment: "staging".to_string(),
        roles: vec!["nginx".to_string()],
        ansible_user: Some("deploy".to_string()),
        store,
    }
}

fn vars(value: Value) -> Vars {
    value.as_object().cloned().unwrap()
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn test_later_sources_take_precedence() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "host_vars/web1",
        "ansible_host: 192.168.0.1\nowner: ops\nlimits:\n  cpu: 1\n  memory: 512\n",
    );
    write(dir.path(), "terraform.tfstate", &tfstate());

    let store = Arc::new(MemoryStore::new());
    store
        .write("staging/hosts", &vars(json!({"all": {"hosts": {"web1": null}}})))
        .unwrap();
    store
        .write("staging/host_vars/web1", &vars(json!({"limits": {"memory": 2048}})))
        .unwrap();

    let ctx = context(dir.path(), store);
    let aggregate = Aggregator::from_kinds(
        &[PluginKind::ProvisioningState, PluginKind::SecretStore],
        &ctx,
    )
    .aggregate()
    .unwrap();

    let web1 = aggregate.model.host_facts("web1").unwrap();
    assert_eq!(web1["ansible_host"], "10.0.0.1");
    assert_eq!(web1["ansible_user"], "deploy");
    assert_eq!(web1["bootstrap_user"], "root");
    assert_eq!(web1["owner"], "ops");
    assert_eq!(web1["limits"], json!({"cpu": 1, "memory": 2048}));

    assert!(aggregate.model.hosts.contains_key("web2"));
    assert!(aggregate.model.groups["bunker"].hosts.contains("web1"));
    assert!(aggregate.model.groups.contains_key("nginx"));
    assert_eq!(aggregate.added_files, ["terraform.tfstate"]);
    assert!(aggregate.degraded.is_empty());
}

#[test]
fn test_local_is_always_first() {
    let dir = TempDir::new().unwrap();
    let ctx = context(dir.path(), Arc::new(MemoryStore::new()));
    let aggregator = Aggregator::from_kinds(
        &[PluginKind::SecretStore, PluginKind::Local, PluginKind::SecretStore],
        &ctx,
    );
    let kinds: Vec<PluginKind> = aggregator.sources().iter().map(|s| s.kind()).collect();
    assert_eq!(kinds, [PluginKind::Local, PluginKind::SecretStore]);
}

#[test]
fn test_missing_provisioning_state_falls_back() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "host_vars/db1", "ansible_host: 10.1.0.5\n");
    write(dir.path(), "hosts.yml", "all:\n  hosts:\n    db1:\n");

    let ctx = context(dir.path(), Arc::new(MemoryStore::new()));
    let aggregate = Aggregator::from_kinds(&[PluginKind::ProvisioningState], &ctx)
        .aggregate()
        .unwrap();

    assert_eq!(aggregate.degraded, ["provisioning_state"]);
    assert_eq!(
        aggregate.model.host_facts("db1").unwrap()["ansible_host"],
        "10.1.0.5"
    );
}

#[test]
fn test_unavailable_secret_store_fails() {
    let dir = TempDir::new().unwrap();
    let ctx = context(dir.path(), Arc::new(MemoryStore::unavailable()));
    let err = Aggregator::from_kinds(&[PluginKind::SecretStore], &ctx)
        .aggregate()
        .unwrap_err();
    assert!(matches!(
        err,
        Error::SecretStore(SecretStoreError::Unavailable(_))
    ));
}

#[test]
fn test_first_key_and_ssh_halves_win() {
    let dir = TempDir::new().unwrap();
    let local_key = DeploymentKey::generate();
    local_key.save(&dir.path().join("deployment.key")).unwrap();
    write(dir.path(), ".ssh/id_ed25519.pub", SSH_PUBLIC_KEY);

    let store = Arc::new(MemoryStore::new());
    store
        .write(
            "staging/deployment_key",
            &vars(json!({"key": DeploymentKey::generate().expose()})),
        )
        .unwrap();
    store
        .write(
            "staging/ssh",
            &vars(json!({"public_key": "ssh-ed25519 other", "private_key": SSH_PRIVATE_KEY})),
        )
        .unwrap();

    let ctx = context(dir.path(), store);
    let aggregate = Aggregator::from_kinds(&[PluginKind::SecretStore], &ctx)
        .aggregate()
        .unwrap();

    assert_eq!(aggregate.deployment_key.as_ref(), Some(&local_key));
    assert_eq!(
        aggregate.ssh_keypair,
        SshKeypair {
            public_key: Some(SSH_PUBLIC_KEY.to_string()),
            private_key: Some(SSH_PRIVATE_KEY.to_string()),
        }
    );
}

#[test]
fn test_persisted_inventory_reads_back() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "terraform.tfstate", &tfstate());
    write(dir.path(), "group_vars/nginx", "nginx_port: 8080\n");

    let store: Arc<dyn SecretStore> = Arc::new(MemoryStore::new());
    let ctx = context(dir.path(), Arc::clone(&store));
    let aggregate = Aggregator::from_kinds(&[PluginKind::ProvisioningState], &ctx)
        .aggregate()
        .unwrap();

    let writer = InventoryWriter::from_kind(PluginKind::SecretStore, &ctx).unwrap();
    writer.persist(&aggregate.model, None, None).unwrap();

    let empty = TempDir::new().unwrap();
    let remote_only = Aggregator::new(vec![InventorySource::from_kind(
        PluginKind::SecretStore,
        &context(empty.path(), store),
    )])
    .aggregate()
    .unwrap();

    assert_eq!(
        remote_only.model.host_facts("web2").unwrap()["ansible_host"],
        "10.0.0.2"
    );
    assert_eq!(remote_only.model.group_vars["nginx"]["nginx_port"], 8080);
    assert!(remote_only.deployment_key.is_none());
}
