use bindless_shader_transpiler::build_tasks::{self, Config};

/// Transpiles every bindless shader in SHADERS_SOURCE_DIR into plain hlsl
/// and a pipeline description in SHADERS_OUTPUT_DIR
pub fn main() -> Result<(), anyhow::Error> {
    pretty_env_logger::init();

    let config = Config::from_env();
    let report = build_tasks::transpile_shaders(&config)?;

    if !report.failed.is_empty() {
        let file_names: Vec<&str> = report
            .failed
            .iter()
            .map(|failed| failed.file_name.as_str())
            .collect();
        anyhow::bail!(
            "failed to transpile {} of {} shaders: {}",
            file_names.len(),
            file_names.len() + report.transpiled.len(),
            file_names.join(", ")
        );
    }

    Ok(())
}
