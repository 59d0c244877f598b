//! Optional kernel-level layer beneath the path resolver.
//!
//! On Linux, Landlock restricts the whole process so it can only modify files
//! inside the configured virtual roots. System directories stay readable so
//! TLS roots, the dynamic loader and the like keep working. This does not
//! replace [`super::resolve`]: both roots stay reachable to the process, so
//! per-pipeline separation still comes from the resolver.

use super::error::SandboxError;
use super::root::VirtualRoot;

#[cfg(target_os = "linux")]
pub fn enforce_kernel_sandbox(roots: &[VirtualRoot]) -> Result<(), SandboxError> {
    use landlock::{
        ABI, Access, AccessFs, PathBeneath, PathFd, Ruleset, RulesetAttr, RulesetCreatedAttr,
    };

    let unavailable = |context: &str, e: &dyn std::fmt::Display| {
        SandboxError::KernelSandboxUnavailable(format!("{context}: {e}"))
    };

    let abi = ABI::V3;
    let access_all = AccessFs::from_all(abi);
    let access_read = AccessFs::from_read(abi);

    let mut ruleset = Ruleset::default()
        .handle_access(access_all)
        .map_err(|e| unavailable("failed to create Landlock ruleset", &e))?
        .create()
        .map_err(|e| unavailable("failed to create Landlock ruleset instance", &e))?;

    for root in roots {
        let fd = PathFd::new(root.real_dir())
            .map_err(|e| unavailable(&format!("cannot open virtual root '{}'", root.id()), &e))?;
        ruleset = ruleset
            .add_rule(PathBeneath::new(fd, access_all))
            .map_err(|e| unavailable(&format!("cannot add rule for '{}'", root.id()), &e))?;
    }

    let read_execute = access_read | AccessFs::Execute;
    for system_path in [
        "/usr", "/bin", "/sbin", "/etc", "/lib", "/lib64", "/proc", "/dev", "/sys",
    ] {
        let path = std::path::Path::new(system_path);
        if path.exists()
            && let Ok(fd) = PathFd::new(path)
        {
            ruleset = ruleset
                .add_rule(PathBeneath::new(fd, read_execute))
                .map_err(|e| unavailable(&format!("cannot add rule for '{system_path}'"), &e))?;
        }
    }

    let status = ruleset
        .restrict_self()
        .map_err(|e| unavailable("failed to apply Landlock restrictions", &e))?;

    tracing::info!(
        roots = ?roots.iter().map(VirtualRoot::id).collect::<Vec<_>>(),
        status = ?status.ruleset,
        "Landlock restrictions applied"
    );
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn enforce_kernel_sandbox(_roots: &[VirtualRoot]) -> Result<(), SandboxError> {
    Err(SandboxError::KernelSandboxUnavailable(format!(
        "Landlock is only available on Linux (running on {})",
        std::env::consts::OS
    )))
}
