//! Constants used throughout bunker.
//!
//! Centralizes file names, directory layout and other magic strings.

/// Deployment manifest file name.
pub const CONFIG_FILE: &str = "deployment.json";

/// Deployment key file name. Never sealed inside the archive it decrypts.
pub const KEY_FILE: &str = "deployment.key";

/// Encrypted archive file name.
pub const ENCRYPTED_ARCHIVE_FILE: &str = "deployment.tar.gz.enc";

/// Digest file stored next to the encrypted archive.
pub const DIGEST_FILE: &str = "deployment.tar.gz.enc.sha256";

/// Lock marker; its presence means the workspace is sealed.
pub const LOCK_MARKER: &str = ".LOCKED";

/// Version control metadata directory.
pub const GIT_DIR: &str = ".git";

/// Parked shadow repository while the workspace is unlocked.
pub const SHADOW_GIT_DIR: &str = ".git.shadow";

/// Blob registry name of the encrypted archive.
pub const ARCHIVE_BLOB: &str = "deployment_data";

/// Prefix of every commit message bunker writes.
pub const COMMIT_PREFIX: &str = "bunker";

/// Hidden clone of the roles source repository.
pub const ROLES_CLONE_DIR: &str = ".roles.git";

/// Roles copied into the working tree.
pub const ROLES_DIR: &str = "roles";

/// Per-host variable directory.
pub const HOST_VARS_DIR: &str = "host_vars";

/// Per-group variable directory.
pub const GROUP_VARS_DIR: &str = "group_vars";

/// SSH keypair directory.
pub const SSH_DIR: &str = ".ssh";

/// Ignore file written into a fresh workspace.
pub const GITIGNORE_FILE: &str = ".gitignore";

/// Paths the deployment repository never tracks.
pub const GITIGNORE_ENTRIES: &[&str] = &[KEY_FILE, SHADOW_GIT_DIR, ROLES_CLONE_DIR, SSH_DIR];

/// Rendered playbook.
pub const PLAYBOOK_FILE: &str = "playbook.yml";

/// Rendered inventory.
pub const HOSTS_FILE: &str = "hosts.yml";

/// Rendered runner configuration.
pub const RUNNER_CONFIG_FILE: &str = "ansible.cfg";

/// Provisioning state file read by the provisioning-state source.
pub const PROVISIONING_STATE_FILE: &str = "terraform.tfstate";

/// Group every provisioned host joins.
pub const DEPLOYMENT_GROUP: &str = "bunker";

/// External playbook runner.
pub const RUNNER_PROGRAM: &str = "ansible-playbook";

/// Directories created in a fresh workspace.
pub const DIRECTORY_LAYOUT: &[&str] = &[HOST_VARS_DIR, GROUP_VARS_DIR, SSH_DIR];

/// Rendered files owned by the workspace.
pub const DEPLOYMENT_FILES: &[&str] = &[PLAYBOOK_FILE, HOSTS_FILE, RUNNER_CONFIG_FILE];

/// Untracked paths under these prefixes count as new repository content.
pub const CONTENT_PATTERNS: &[&str] = &["host_vars/", "group_vars/", "roles/"];

/// Runner configuration lines.
pub const RUNNER_CONFIG: &[&str] = &[
    "[defaults]",
    "inventory = hosts.yml",
    "host_key_checking = False",
    "interpreter_python = auto_silent",
];

/// Log filter environment variable.
pub const LOG_ENV: &str = "BUNKER_LOG";

/// Secret store mount override.
pub const SECRET_MOUNT_ENV: &str = "BUNKER_SECRET_MOUNT";

/// Secret store path prefix override.
pub const SECRET_PREFIX_ENV: &str = "BUNKER_SECRET_PREFIX";
