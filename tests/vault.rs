//! Vault lock/unlock tests through the public interface.

mod support;

use std::fs;
use std::io::Read;
use std::path::Path;

use bunker::core::cipher::{Age, Cipher, DeploymentKey};
use bunker::core::vault::{pack, unpack, Vault};
use bunker::error::{Error, VaultError};
use flate2::read::GzDecoder;
use proptest::prelude::*;
use support::*;
use tempfile::TempDir;

/// Directory with `a.yml` under version control.
fn setup() -> (TempDir, Vault) {
    let dir = TempDir::new().unwrap();
    git(dir.path(), &["init", "-q"]);
    fs::write(dir.path().join("a.yml"), "x: 1").unwrap();
    let vault = Vault::open(dir.path(), vec!["a.yml".to_string()]).unwrap();
    (dir, vault)
}

fn archive_entries(vault: &Vault) -> Vec<String> {
    let sealed = fs::read(vault.encrypted_archive_path()).unwrap();
    let plain = Age::new(vault.key().unwrap()).unwrap().decrypt(&sealed).unwrap();
    let mut tar = tar::Archive::new(GzDecoder::new(plain.as_slice()));
    tar.entries()
        .unwrap()
        .map(|e| e.unwrap().path().unwrap().to_string_lossy().to_string())
        .collect()
}

#[test]
fn test_lock_cycle_restores_content() {
    skip_without_git!();
    let (dir, mut vault) = setup();
    assert!(vault.new_key_generated());

    vault.lock().unwrap();
    assert!(vault.is_locked());
    assert_sealed(dir.path(), true);
    assert!(!dir.path().join("a.yml").exists());
    assert!(vault.verify().unwrap());

    vault.unlock(false).unwrap();
    assert!(!vault.is_locked());
    assert_sealed(dir.path(), false);
    assert_eq!(fs::read_to_string(dir.path().join("a.yml")).unwrap(), "x: 1");
}

#[test]
fn test_state_survives_reopen() {
    skip_without_git!();
    let (dir, mut vault) = setup();
    vault.lock().unwrap();

    let reopened = Vault::open(dir.path(), vec!["a.yml".to_string()]).unwrap();
    assert!(reopened.is_locked());
    assert!(!reopened.new_key_generated());
    assert_eq!(reopened.key().unwrap(), vault.key().unwrap());
}

#[test]
fn test_lock_and_unlock_are_exclusive() {
    skip_without_git!();
    let (_dir, mut vault) = setup();
    assert!(matches!(
        vault.unlock(false).unwrap_err(),
        Error::Vault(VaultError::AlreadyUnlocked)
    ));
    vault.lock().unwrap();
    assert!(matches!(
        vault.lock().unwrap_err(),
        Error::Vault(VaultError::AlreadyLocked)
    ));
}

#[test]
fn test_key_never_archived() {
    skip_without_git!();
    let (dir, mut vault) = setup();
    vault.add_files(["deployment.key", "a.yml"]);
    vault.lock().unwrap();

    let entries = archive_entries(&vault);
    assert!(entries.iter().any(|e| e == "a.yml"));
    assert!(entries.iter().any(|e| e.starts_with(".git")));
    assert!(!entries.iter().any(|e| e.contains("deployment.key")));
    assert!(dir.path().join("deployment.key").exists());
}

#[test]
fn test_integrity_gate() {
    skip_without_git!();
    let (dir, mut vault) = setup();
    vault.lock().unwrap();
    fs::write(vault.digest_path(), "0".repeat(64)).unwrap();
    assert!(!vault.verify().unwrap());

    assert!(matches!(
        vault.unlock(false).unwrap_err(),
        Error::Vault(VaultError::IntegrityVerificationFailed { .. })
    ));
    // nothing was touched
    assert_sealed(dir.path(), true);
    assert!(!dir.path().join("a.yml").exists());

    vault.unlock(true).unwrap();
    assert_eq!(fs::read_to_string(dir.path().join("a.yml")).unwrap(), "x: 1");
}

#[test]
fn test_tampered_archive_is_rejected() {
    skip_without_git!();
    let (dir, mut vault) = setup();
    vault.lock().unwrap();

    let mut sealed = fs::read(vault.encrypted_archive_path()).unwrap();
    let last = sealed.len() - 1;
    sealed[last] ^= 0x01;
    fs::write(vault.encrypted_archive_path(), &sealed).unwrap();
    assert!(!vault.verify().unwrap());

    assert!(matches!(
        vault.unlock(false).unwrap_err(),
        Error::Vault(VaultError::IntegrityVerificationFailed { .. })
    ));
    assert_sealed(dir.path(), true);
    assert!(!dir.path().join("a.yml").exists());

    // force skips the digest, decryption still refuses the modified payload
    assert!(matches!(vault.unlock(true).unwrap_err(), Error::Cipher(_)));
    assert_sealed(dir.path(), true);
    assert!(!dir.path().join("a.yml").exists());
    assert!(!dir.path().join(".git.shadow").exists());
}

#[test]
fn test_wrong_key_cannot_unlock() {
    skip_without_git!();
    let (dir, mut vault) = setup();
    vault.lock().unwrap();
    vault.set_key(DeploymentKey::generate()).unwrap();

    assert!(matches!(vault.unlock(false).unwrap_err(), Error::Cipher(_)));
    assert_sealed(dir.path(), true);
}

#[test]
fn test_locked_without_key() {
    skip_without_git!();
    let (dir, mut vault) = setup();
    vault.lock().unwrap();
    fs::remove_file(vault.key_path()).unwrap();

    let mut reopened = Vault::open(dir.path(), Vec::new()).unwrap();
    assert!(!reopened.new_key_generated());
    assert!(!vault.key_path().exists());
    assert!(matches!(
        reopened.unlock(false).unwrap_err(),
        Error::Vault(VaultError::MissingKey(_))
    ));
}

#[test]
fn test_shadow_repository_tracks_artifacts() {
    skip_without_git!();
    let (dir, mut vault) = setup();
    git(dir.path(), &["add", "a.yml"]);
    git(dir.path(), &["commit", "-q", "-m", "plaintext history"]);
    vault.lock().unwrap();

    let shadow = vault.shadow_repository();
    assert_eq!(
        shadow.tracked_files().unwrap(),
        [".LOCKED", "deployment.tar.gz.enc", "deployment.tar.gz.enc.sha256"]
    );
    assert_eq!(
        shadow.read_blob("deployment_data").unwrap(),
        fs::read(vault.encrypted_archive_path()).unwrap()
    );

    vault.unlock(false).unwrap();
    assert!(dir.path().join(".git.shadow").is_dir());
    let log = git(dir.path(), &["log", "--format=%s"]);
    assert_eq!(stdout(&log).trim(), "plaintext history");
}

#[test]
fn test_interrupted_unlock_keeps_shadow_history() {
    skip_without_git!();
    let (dir, mut vault) = setup();
    vault.lock().unwrap();

    // unlock stopped midway: shadow parked, deployment repository half written
    fs::rename(dir.path().join(".git"), dir.path().join(".git.shadow")).unwrap();
    fs::create_dir_all(dir.path().join(".git/objects")).unwrap();
    fs::write(dir.path().join(".git/HEAD"), "partial").unwrap();

    vault.unlock(false).unwrap();
    assert_sealed(dir.path(), false);
    assert_eq!(fs::read_to_string(dir.path().join("a.yml")).unwrap(), "x: 1");

    let shadow_log = git(dir.path(), &["--git-dir", ".git.shadow", "log", "--format=%s"]);
    assert!(stdout(&shadow_log).contains("Shadow repository activated"));
    git(dir.path(), &["status", "--short"]);
}

#[test]
fn test_shadow_history_survives_cycles() {
    skip_without_git!();
    let (dir, mut vault) = setup();
    vault.lock().unwrap();
    vault.unlock(false).unwrap();
    fs::write(dir.path().join("a.yml"), "x: 2").unwrap();
    vault.lock().unwrap();

    let count = git(dir.path(), &["rev-list", "--count", "HEAD"]);
    assert_eq!(stdout(&count).trim(), "2");
}

fn read_tree(root: &Path, names: &[String]) -> Vec<Vec<u8>> {
    names
        .iter()
        .map(|n| {
            let mut buf = Vec::new();
            fs::File::open(root.join(n)).unwrap().read_to_end(&mut buf).unwrap();
            buf
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn sealed_archive_restores_files(
        files in prop::collection::btree_map("[a-z]{1,8}\\.yml", prop::collection::vec(any::<u8>(), 0..512), 1..5)
    ) {
        let src = TempDir::new().unwrap();
        for (name, content) in &files {
            fs::write(src.path().join(name), content).unwrap();
        }
        let names: Vec<String> = files.keys().cloned().collect();

        let age = Age::new(&DeploymentKey::generate()).unwrap();
        let sealed = age.encrypt(&pack(src.path(), &names, &[]).unwrap()).unwrap();

        let dst = TempDir::new().unwrap();
        let entries = unpack(dst.path(), &age.decrypt(&sealed).unwrap()).unwrap();
        prop_assert_eq!(entries, names.len());
        prop_assert_eq!(read_tree(dst.path(), &names), files.values().cloned().collect::<Vec<_>>());
    }
}
