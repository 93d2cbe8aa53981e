use std::process::Command;

// Stamp the binary with its source revision and build time; `--version`
// reports both. Absence of git (release tarballs) just leaves the
// revision out.
fn main() {
    if let Some(rev) = git_revision() {
        println!("cargo:rustc-env=NETDISC_GIT_REV={}", rev);
    }
    println!(
        "cargo:rustc-env=NETDISC_BUILT_AT={}",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("cargo:rerun-if-changed=../.git/HEAD");
    println!("cargo:rerun-if-changed=../.git/index");
}

/// `git describe` with a `+` suffix for a dirty tree, or None when git
/// or the repository is unavailable.
fn git_revision() -> Option<String> {
    let out = Command::new("git")
        .args(["describe", "--always", "--dirty=+"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let rev = String::from_utf8(out.stdout).ok()?;
    let rev = rev.trim();
    if rev.is_empty() {
        None
    } else {
        Some(rev.to_string())
    }
}
