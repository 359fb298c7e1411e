use std::path::{Path, PathBuf};

use anyhow::Context;
use log::*;

use crate::description::PipelineDescription;
use crate::includes::SearchPathIncludes;
use crate::parser::parse_source_with;
use crate::preprocessor::{self, LogSink, PreprocessorResult};
use crate::util::{manifest_path, with_extension};

pub const SHADER_EXTENSION: &str = "hlsl";
pub const METADATA_FILE_NAME: &str = "metadata.json";

pub struct Config {
    /// the directory to read bindless hlsl files from
    pub shaders_source_dir: PathBuf,
    /// searched for includes after the source directory
    pub content_dir: PathBuf,
    /// the directory to write transpiled hlsl & json to
    pub output_dir: PathBuf,
}

impl Config {
    /// Reads `SHADERS_SOURCE_DIR`, `SHADERS_CONTENT_DIR` and
    /// `SHADERS_OUTPUT_DIR`, falling back to directories under `shaders/` in
    /// the crate root.
    pub fn from_env() -> Self {
        let dir = |var: &str, default: [&str; 2]| {
            std::env::var_os(var)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| manifest_path(default))
        };

        Self {
            shaders_source_dir: dir("SHADERS_SOURCE_DIR", ["shaders", "source"]),
            content_dir: dir("SHADERS_CONTENT_DIR", ["shaders", "content"]),
            output_dir: dir("SHADERS_OUTPUT_DIR", ["shaders", "transpiled"]),
        }
    }
}

#[derive(Debug, Default)]
pub struct BuildReport {
    pub transpiled: Vec<String>,
    pub failed: Vec<FailedShader>,
}

#[derive(Debug)]
pub struct FailedShader {
    pub file_name: String,
    pub error: anyhow::Error,
}

/// Transpiles every shader in the source directory. A shader that fails is
/// logged and recorded in the report; the remaining shaders still run.
pub fn transpile_shaders(config: &Config) -> anyhow::Result<BuildReport> {
    let shader_file_names = shader_file_names(&config.shaders_source_dir)?;
    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("failed to create {}", config.output_dir.display()))?;

    let includes = SearchPathIncludes::new([
        config.shaders_source_dir.clone(),
        config.content_dir.clone(),
    ]);

    let mut report = BuildReport::default();
    let mut metadata = PreprocessorResult::default();

    for file_name in shader_file_names {
        match transpile_shader(config, &includes, &file_name, &mut metadata) {
            Ok(()) => {
                info!("transpiled {file_name}");
                report.transpiled.push(file_name);
            }
            Err(error) => {
                error!("failed to transpile {file_name}: {error:#}");
                report.failed.push(FailedShader { file_name, error });
            }
        }
    }

    let metadata_json = serde_json::to_string_pretty(&metadata)?;
    std::fs::write(config.output_dir.join(METADATA_FILE_NAME), metadata_json)?;

    Ok(report)
}

fn shader_file_names(shaders_source_dir: &Path) -> anyhow::Result<Vec<String>> {
    let mut file_names: Vec<String> = std::fs::read_dir(shaders_source_dir)
        .with_context(|| format!("failed to read {}", shaders_source_dir.display()))?
        .filter_map(|entry_res| entry_res.ok())
        .map(|dir_entry| dir_entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == SHADER_EXTENSION))
        .filter_map(|path| {
            path.file_name()
                .and_then(|os_str| os_str.to_str())
                .map(|s| s.to_string())
        })
        .collect();
    file_names.sort();
    Ok(file_names)
}

fn transpile_shader(
    config: &Config,
    includes: &SearchPathIncludes,
    file_name: &str,
    metadata: &mut PreprocessorResult,
) -> anyhow::Result<()> {
    let source_path = config.shaders_source_dir.join(file_name);
    let source = std::fs::read_to_string(&source_path)
        .with_context(|| format!("failed to read {}", source_path.display()))?;

    metadata.merge(preprocessor::inspect(file_name, &source, includes, &mut LogSink));

    let result = parse_source_with(file_name, &source, includes)?;
    result.require_pipeline_inputs()?;

    let description = PipelineDescription::from_parse_result(file_name, &result);
    let description_json = serde_json::to_string_pretty(&description)?;

    std::fs::write(config.output_dir.join(file_name), &result.output_source)?;
    std::fs::write(
        config.output_dir.join(with_extension(file_name, "json")),
        description_json,
    )?;

    Ok(())
}
