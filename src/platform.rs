//! Host platform probes.

use crate::error::BuildError;
use crate::exec::Executor;

/// Query the host's Debian architecture name (e.g. `amd64`, `arm64`).
///
/// Shells out to `dpkg --print-architecture`; the result is what ends up in
/// the control file and the artifact name for architecture-dependent
/// packages.
pub fn host_architecture(executor: &dyn Executor) -> Result<String, BuildError> {
    let result = executor.run("dpkg", &["--print-architecture"])?;
    Ok(result.stdout.trim().to_string())
}
