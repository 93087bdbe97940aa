use anyhow::Result;
use vergen::EmitBuilder;

// Stamps the binary with the git revision so `hopeturtle --version` identifies
// which build is flashed onto a device.
fn main() -> Result<()> {
    EmitBuilder::builder()
        .git_sha(true)
        .git_commit_date()
        .build_date()
        .emit()?;
    Ok(())
}
