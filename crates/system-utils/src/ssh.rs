use anyhow::Context;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::path::expand_tilde;

/// Env var the askpass helper prints the password from.
pub const PASSWORD_ENV: &str = "VPP_PROBE_SSH_PASS";

const STATE_DIR: &str = "~/.vpp-probe";
const HELPER_NAME: &str = "ssh-askpass.sh";

fn helper_script() -> String {
    format!("#!/bin/sh\nprintf '%s\\n' \"${PASSWORD_ENV}\"\n")
}

/// Writes the askpass helper into `dir` unless an identical one is already
/// there, and returns its path. The helper is executable by the owner only.
pub fn install_askpass_helper(dir: &Path) -> anyhow::Result<PathBuf> {
    let path = dir.join(HELPER_NAME);
    let script = helper_script();
    if std::fs::read_to_string(&path).is_ok_and(|existing| existing == script) {
        return Ok(path);
    }
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create askpass dir {}", dir.display()))?;
    std::fs::write(&path, &script)
        .with_context(|| format!("failed to write askpass helper {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o700))
            .with_context(|| format!("failed to chmod askpass helper {}", path.display()))?;
    }
    Ok(path)
}

/// Makes `ssh` read `password` through the askpass helper instead of a tty.
pub fn with_password_auth(cmd: &mut Command, password: &str) -> anyhow::Result<()> {
    let helper = install_askpass_helper(&expand_tilde(STATE_DIR))?;
    cmd.env(PASSWORD_ENV, password)
        .env("SSH_ASKPASS", helper)
        .env("SSH_ASKPASS_REQUIRE", "force")
        .env("DISPLAY", ":0");
    Ok(())
}

/// Splits `user@host` into its parts. Both sides must be non-empty.
pub fn parse_ssh_destination(value: &str) -> Option<(&str, &str)> {
    let (user, host) = value.trim().split_once('@')?;
    if user.is_empty() || host.is_empty() || host.contains('@') {
        return None;
    }
    Some((user, host))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!("{name}-{nanos}"))
    }

    #[test]
    fn destination_requires_user_and_host() {
        assert_eq!(parse_ssh_destination("root@10.0.0.1"), Some(("root", "10.0.0.1")));
        assert_eq!(parse_ssh_destination("10.0.0.1"), None);
        assert_eq!(parse_ssh_destination("@host"), None);
        assert_eq!(parse_ssh_destination("root@"), None);
        assert_eq!(parse_ssh_destination("a@b@c"), None);
    }

    #[test]
    fn helper_reads_password_env() {
        let dir = scratch_dir("vpp-probe-askpass");
        let path = install_askpass_helper(&dir).expect("install");
        let body = std::fs::read_to_string(&path).expect("read");
        assert!(body.starts_with("#!/bin/sh\n"));
        assert!(body.contains("$VPP_PROBE_SSH_PASS"));
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).expect("meta").permissions().mode();
            assert_eq!(mode & 0o777, 0o700);
        }
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn stale_helper_is_rewritten() {
        let dir = scratch_dir("vpp-probe-askpass-stale");
        std::fs::create_dir_all(&dir).expect("dir");
        std::fs::write(dir.join(HELPER_NAME), "#!/bin/sh\necho old\n").expect("seed");
        let path = install_askpass_helper(&dir).expect("install");
        assert_eq!(std::fs::read_to_string(path).expect("read"), helper_script());
        let _ = std::fs::remove_dir_all(dir);
    }
}
