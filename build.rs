fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let pkg_version = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();
    let describe = std::process::Command::new("git")
        .args(["describe", "--always", "--dirty", "--tags"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string());

    // e.g. "0.1.0 (a1b2c3d-dirty)"
    let version = match describe {
        Some(rev) if !rev.is_empty() => format!("{} ({})", pkg_version, rev),
        _ => pkg_version,
    };

    println!("cargo:rustc-env=GIT_VERSION={}", version);
}
