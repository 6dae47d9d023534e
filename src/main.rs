//! dist_model - 模型预处理工具
//!
//! 读取 OBJ（或已有的 NVM）模型，按配置完成法线/切线合成、缩放和顶点编译，
//! 然后写出 NVM 二进制文件，供渲染端直接加载。
//!
//! # 使用方法
//!
//! ```bash
//! # 使用配置文件 dist_model.toml
//! cargo run -- model.obj
//!
//! # 命令行覆盖
//! cargo run -- model.obj --normals --tangents --radius 1.0 --out-dir build/models
//! ```
//!
//! # 命令行参数
//!
//! - `--normals`: 重建缺失的法线
//! - `--tangents`: 计算切线（同时重建法线）
//! - `--remove-degenerate`: 剔除退化三角形
//! - `--points` / `--edges` / `--adjacency`: 额外生成的图元拓扑
//! - `--radius <value>`: 缩放到目标半径
//! - `--out-dir <dir>`: 输出目录

use anyhow::{bail, Context};
use dist_model::core::{log, Config};
use dist_model::geometry::loaders::{load_model_with_options, save_to_binary};
use dist_model::geometry::PrimitiveMask;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 带参数值的选项
const VALUE_FLAGS: [&str; 2] = ["--radius", "--out-dir"];

/// 收集位置参数（输入文件）
fn input_paths(args: &[String]) -> Vec<PathBuf> {
    let mut inputs = Vec::new();
    let mut iter = args.iter().skip(1);

    while let Some(arg) = iter.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            iter.next();
        } else if !arg.starts_with("--") {
            inputs.push(PathBuf::from(arg));
        }
    }

    inputs
}

/// 输出路径：配置了输出目录时放到目录下，否则放在输入文件旁边
fn output_path(input: &Path, directory: &str) -> PathBuf {
    let file_name = input.with_extension("nvm");
    if directory.is_empty() {
        return file_name;
    }

    let name = file_name.file_name().map(PathBuf::from).unwrap_or(file_name);
    Path::new(directory).join(name)
}

/// 应用程序入口点
///
/// # 初始化流程
///
/// 1. 加载配置文件（dist_model.toml）
/// 2. 应用命令行参数覆盖
/// 3. 初始化日志系统
/// 4. 逐个转换输入文件
fn main() -> anyhow::Result<()> {
    // 1. 加载配置（在初始化日志之前）
    let mut config = Config::from_file_or_default("dist_model.toml");

    // 2. 应用命令行参数
    let args: Vec<String> = std::env::args().collect();
    config.apply_args(&args);

    // 3. 验证配置
    config.validate().context("Invalid configuration")?;

    // 4. 初始化日志系统（使用配置中的设置）
    let log_file = if config.logging.file_output {
        Some(config.logging.log_file.as_str())
    } else {
        None
    };
    log::init_logger(config.logging.level, config.logging.file_output, log_file)
        .context("Failed to initialize logger")?;
    info!(version = env!("CARGO_PKG_VERSION"), "dist_model starting...");

    let inputs = input_paths(&args);
    if inputs.is_empty() {
        bail!("usage: dist_model <model.obj>... [--normals] [--tangents] [--radius <r>] [--out-dir <dir>]");
    }

    let options = config.loader.to_load_options();
    info!(
        target_radius = options.target_radius,
        compute_normals = options.compute_normals,
        compute_tangents = options.compute_tangents,
        primitives = ?options.primitives,
        "Loader configuration"
    );

    if !config.output.directory.is_empty() {
        std::fs::create_dir_all(&config.output.directory)
            .with_context(|| format!("Failed to create output directory {}", config.output.directory))?;
    }

    for input in &inputs {
        let model = match load_model_with_options(input, &options) {
            Ok(model) => model,
            Err(e) => {
                dist_model::engine_error!(input = %input.display(), error = %e, "Model conversion failed");
                return Err(e).with_context(|| format!("Failed to load {}", input.display()));
            }
        };

        let (min, max) = model.bounding_box();
        info!(
            input = %input.display(),
            vertices = model.vertex_count(),
            triangles = model.triangle_count(),
            stride = model.vertex_stride(),
            bbox_min = ?min,
            bbox_max = ?max,
            "Model compiled"
        );

        for kind in [
            PrimitiveMask::POINTS,
            PrimitiveMask::EDGES,
            PrimitiveMask::TRIANGLES_WITH_ADJACENCY,
        ] {
            if let Some(indices) = model.indices(kind) {
                debug!(primitive = ?kind, indices = indices.len(), "Extra topology generated");
            }
        }

        let output = output_path(input, &config.output.directory);
        if output == *input {
            info!(path = %output.display(), "Input is already a binary model, skipping write");
            continue;
        }

        save_to_binary(&model, &output)
            .with_context(|| format!("Failed to write {}", output.display()))?;
    }

    info!(count = inputs.len(), "All models converted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_input_paths_skip_flag_values() {
        let inputs = input_paths(&args(&[
            "dist_model",
            "a.obj",
            "--radius",
            "2.0",
            "--normals",
            "b.obj",
            "--out-dir",
            "out",
        ]));
        assert_eq!(inputs, vec![PathBuf::from("a.obj"), PathBuf::from("b.obj")]);
    }

    #[test]
    fn test_output_path() {
        assert_eq!(output_path(Path::new("models/cube.obj"), ""), PathBuf::from("models/cube.nvm"));
        assert_eq!(
            output_path(Path::new("models/cube.obj"), "build"),
            PathBuf::from("build/cube.nvm")
        );
    }
}
