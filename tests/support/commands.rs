//! Command helper methods for Test.

use std::process::Output;

use assert_cmd::Command;

use super::Test;

impl Test {
    /// A bunker command running in the workspace.
    ///
    /// HOME points at the temporary home so no user git config or secret
    /// store settings leak in.
    pub fn cmd(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("bunker").expect("failed to find bunker binary");
        cmd.env("HOME", self.home.path());
        cmd.env("GIT_CONFIG_NOSYSTEM", "1");
        cmd.env("NO_COLOR", "1");
        cmd.env_remove("VAULT_ADDR");
        cmd.env_remove("VAULT_TOKEN");
        cmd.env_remove("BUNKER_DIR");
        cmd.current_dir(self.dir.path());
        cmd
    }

    /// Run bunker with `args` and collect the output.
    pub fn run(&self, args: &[&str]) -> Output {
        self.cmd()
            .args(args)
            .output()
            .expect("failed to run bunker")
    }

    pub fn init_cmd(&self) -> Output {
        self.run(&["init", "--yes"])
    }

    pub fn lock_cmd(&self) -> Output {
        self.run(&["lock", "--yes"])
    }

    pub fn unlock_cmd(&self) -> Output {
        self.run(&["unlock", "--yes"])
    }

    pub fn status_cmd(&self) -> Output {
        self.run(&["status"])
    }
}
