/// OBJ 文件加载器
///
/// 逐行解析 Wavefront OBJ 文本（`v`、`vn`、`vt`、`f` 记录），
/// 按需合成法线和切线，缩放到目标半径后编译为 [`ModelAsset`]。
/// 其余指令（`s`、`g`、`o`、`usemtl`、`vp` 等）被识别后忽略。
use super::{LoadOptions, ModelLoader};
use crate::core::error::{LoadWarning, MeshLoadError, ParseError, Result};
use crate::geometry::compiler::compile;
use crate::geometry::math_utils::{compute_normals, compute_tangents};
use crate::geometry::model::ModelAsset;
use crate::geometry::raw_mesh::{Corner, RawMesh};
use crate::geometry::tokenizer::Tokenizer;
use std::path::Path;

/// 解析阶段的存储步长；解析结束后按实际分量数压缩
const PARSE_POSITION_STRIDE: usize = 4;
const PARSE_TEXCOORD_STRIDE: usize = 3;
const COLOR_STRIDE: usize = 3;

/// 没有颜色的顶点使用白色
const DEFAULT_COLOR: [f32; 3] = [1.0, 1.0, 1.0];

/// 面角点的索引格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FaceFormat {
    /// `#`
    Position,
    /// `#/#`
    PositionTexCoord,
    /// `#/#/#`
    PositionTexCoordNormal,
    /// `#//#`
    PositionNormal,
}

/// OBJ 格式加载器
///
/// 实现 `ModelLoader` trait，使用默认选项加载；
/// 需要法线合成、缩放等处理时使用 [`ObjLoader::load_with_options`]。
///
/// # 使用示例
///
/// ```rust,no_run
/// use dist_model::geometry::loaders::{LoadOptions, ObjLoader};
///
/// let data = std::fs::read("model.obj")?;
/// let options = LoadOptions {
///     compute_normals: true,
///     ..Default::default()
/// };
/// let model = ObjLoader::load_with_options(&data, &options)?;
/// println!("加载了 {} 个顶点", model.vertex_count());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct ObjLoader;

impl ObjLoader {
    /// 把 OBJ 文本解析为原始网格
    ///
    /// 面记录中的负索引相对于当前已定义的元素个数，正索引从 1 开始。
    /// 解析结束后清除没有被任何面引用的属性，并检查所有索引的范围。
    pub fn parse(data: &[u8]) -> std::result::Result<RawMesh, ParseError> {
        let mut mesh = RawMesh::new();
        mesh.position_size = PARSE_POSITION_STRIDE;
        mesh.texcoord_size = PARSE_TEXCOORD_STRIDE;
        mesh.color_size = COLOR_STRIDE;

        let mut tok = Tokenizer::new(data, b"/");
        let mut colors = Vec::new();
        let mut corners = Vec::new();

        let mut has_position_w = false;
        let mut has_texcoord_w = false;
        let mut has_colors = false;
        let mut uses_normals = false;
        let mut uses_texcoords = false;

        while tok.read_token() {
            let line = tok.line();
            let token = tok.last_token();

            match token {
                b"v" => {
                    let mut values = [0.0f32; 7];
                    let count = tok.get_token_float_array(&mut values, 7);

                    let (position, color) = match count {
                        3 => ([values[0], values[1], values[2], 1.0], None),
                        4 => ([values[0], values[1], values[2], values[3]], None),
                        6 => (
                            [values[0], values[1], values[2], 1.0],
                            Some([values[3], values[4], values[5]]),
                        ),
                        7 => (
                            [values[0], values[1], values[2], values[3]],
                            Some([values[4], values[5], values[6]]),
                        ),
                        _ => return Err(invalid_number(&mut tok, line)),
                    };
                    expect_end_of_record(&mut tok, line)?;

                    has_position_w |= count == 4 || count == 7;
                    has_colors |= color.is_some();
                    mesh.positions.extend_from_slice(&position);
                    colors.extend_from_slice(&color.unwrap_or(DEFAULT_COLOR));
                }
                b"vn" => {
                    let mut values = [0.0f32; 3];
                    if tok.get_token_float_array(&mut values, 3) != 3 {
                        return Err(invalid_number(&mut tok, line));
                    }
                    expect_end_of_record(&mut tok, line)?;

                    mesh.normals.extend_from_slice(&values);
                }
                b"vt" => {
                    let mut values = [0.0f32; 3];
                    let count = tok.get_token_float_array(&mut values, 3);
                    if count < 2 {
                        return Err(invalid_number(&mut tok, line));
                    }
                    expect_end_of_record(&mut tok, line)?;

                    has_texcoord_w |= count == 3;
                    mesh.texcoords.extend_from_slice(&values);
                }
                b"f" => {
                    let counts = ElementCounts {
                        positions: mesh.positions.len() / PARSE_POSITION_STRIDE,
                        texcoords: mesh.texcoords.len() / PARSE_TEXCOORD_STRIDE,
                        normals: mesh.normals.len() / 3,
                    };
                    parse_face(&mut tok, line, &counts, &mut corners)?;
                    tok.consume_to_eol();

                    uses_texcoords |= corners.iter().any(|c| c.texcoord.is_some());
                    uses_normals |= corners.iter().any(|c| c.normal.is_some());
                    mesh.push_polygon(&corners);
                }
                _ => {
                    if token.first() != Some(&b'#') {
                        tracing::trace!(
                            directive = %String::from_utf8_lossy(token),
                            line,
                            "Ignoring OBJ directive"
                        );
                    }
                    tok.consume_to_eol();
                }
            }
        }

        // 清除没有被引用的属性
        if !uses_normals {
            mesh.normals.clear();
            mesh.normal_index.clear();
        }
        if !uses_texcoords {
            mesh.texcoords.clear();
            mesh.texcoord_index.clear();
        }
        if has_colors {
            mesh.colors = colors;
        } else {
            mesh.color_index.clear();
        }

        // 压缩到实际分量数
        if !has_position_w {
            compact(&mut mesh.positions, PARSE_POSITION_STRIDE, 3);
            mesh.position_size = 3;
        }
        if !has_texcoord_w {
            compact(&mut mesh.texcoords, PARSE_TEXCOORD_STRIDE, 2);
            mesh.texcoord_size = 2;
        }

        mesh.validate_indices()?;

        Ok(mesh)
    }

    /// 加载并返回非致命诊断
    ///
    /// 处理顺序：解析 → 剔除退化三角形 → 法线合成 → 切线合成 → 缩放 → 编译。
    /// 请求切线时同时合成法线。
    pub fn load_with_diagnostics(
        data: &[u8],
        options: &LoadOptions,
    ) -> Result<(ModelAsset, Vec<LoadWarning>)> {
        let _span = crate::span_trace!("obj_load").entered();

        let mut mesh = Self::parse(data)?;
        tracing::debug!(
            positions = mesh.position_count(),
            normals = mesh.normal_count(),
            texcoords = mesh.texcoord_count(),
            triangles = mesh.triangle_count(),
            "OBJ parsed"
        );

        let mut warnings = Vec::new();

        if options.remove_degenerate {
            let removed = mesh.remove_degenerate_triangles();
            if removed > 0 {
                tracing::debug!(removed, "Degenerate triangles removed");
            }
        }

        if options.compute_normals || options.compute_tangents {
            compute_normals(&mut mesh, &mut warnings);
        }
        if options.compute_tangents {
            compute_tangents(&mut mesh, &mut warnings);
        }

        if options.target_radius >= 0.0 && !mesh.rescale(options.target_radius) {
            warnings.push(LoadWarning::DegenerateExtent);
        }

        let asset = compile(&mesh, options.primitives);

        for warning in &warnings {
            crate::engine_warn!(%warning, "Degenerate input");
        }

        crate::engine_info!(
            vertices = asset.vertex_count(),
            triangles = asset.triangle_count(),
            stride = asset.vertex_stride(),
            warnings = warnings.len(),
            "OBJ model loaded"
        );

        Ok((asset, warnings))
    }

    /// 使用指定选项加载
    pub fn load_with_options(data: &[u8], options: &LoadOptions) -> Result<ModelAsset> {
        Self::load_with_diagnostics(data, options).map(|(asset, _)| asset)
    }

    /// 从文件加载，使用指定选项
    pub fn load_file_with_options(path: &Path, options: &LoadOptions) -> Result<ModelAsset> {
        // 检查文件是否存在
        if !path.exists() {
            return Err(MeshLoadError::FileNotFound(path.to_path_buf()).into());
        }

        let data = std::fs::read(path)?;
        Self::load_with_options(&data, options)
    }
}

impl ModelLoader for ObjLoader {
    fn load_from_file(path: &Path) -> Result<ModelAsset> {
        Self::load_file_with_options(path, &LoadOptions::default())
    }

    fn load_from_memory(data: &[u8]) -> Result<ModelAsset> {
        Self::load_with_options(data, &LoadOptions::default())
    }

    fn supported_extensions() -> &'static [&'static str] {
        &["obj"]
    }
}

/// 面记录出现时各属性已定义的元素个数
struct ElementCounts {
    positions: usize,
    texcoords: usize,
    normals: usize,
}

fn invalid_number(tok: &mut Tokenizer, line: usize) -> ParseError {
    let token = tok.peek_token();
    ParseError::InvalidNumber {
        line,
        token: if token.is_empty() {
            "<end of line>".to_string()
        } else {
            token
        },
    }
}

/// 数值记录之后只允许空白或注释
fn expect_end_of_record(tok: &mut Tokenizer, line: usize) -> std::result::Result<(), ParseError> {
    if !tok.rest_of_line_is_empty() {
        return Err(invalid_number(tok, line));
    }
    tok.consume_to_eol();
    Ok(())
}

fn malformed(line: usize, reason: impl Into<String>) -> ParseError {
    ParseError::MalformedFace {
        line,
        reason: reason.into(),
    }
}

/// 读取一个面角点，行尾时返回 `None`
///
/// 法线索引总是放在第三个位置。
fn read_corner(
    tok: &mut Tokenizer,
    line: usize,
) -> std::result::Result<Option<(FaceFormat, [i64; 3])>, ParseError> {
    if tok.rest_of_line_is_empty() {
        return Ok(None);
    }

    let mut indices = [0i64; 3];
    let format = match tok.get_token_int_array(&mut indices) {
        0 => {
            return Err(malformed(line, format!("unexpected token '{}'", tok.peek_token())));
        }
        1 => {
            if tok.consume_one_delim() {
                if !tok.consume_one_delim() {
                    return Err(malformed(line, "missing texture coordinate index"));
                }
                tok.set_consume_ws(false);
                let normal = tok.get_token_int();
                tok.set_consume_ws(true);

                indices[2] = normal.ok_or_else(|| malformed(line, "missing normal index"))?;
                FaceFormat::PositionNormal
            } else {
                FaceFormat::Position
            }
        }
        2 => FaceFormat::PositionTexCoord,
        _ => FaceFormat::PositionTexCoordNormal,
    };

    if tok.at_delim() {
        return Err(malformed(line, "trailing delimiter"));
    }

    Ok(Some((format, indices)))
}

/// 把 OBJ 索引转换为 0 起始索引
///
/// 上界在解析结束后统一检查。
fn resolve_index(raw: i64, count: usize, line: usize) -> std::result::Result<u32, ParseError> {
    let resolved = match raw {
        r if r > 0 => r - 1,
        r if r < 0 => count as i64 + r,
        _ => -1,
    };

    u32::try_from(resolved).map_err(|_| ParseError::InvalidIndex { line, index: raw })
}

/// 解析一条面记录的全部角点
///
/// 所有角点必须使用第一个角点的索引格式。
fn parse_face(
    tok: &mut Tokenizer,
    line: usize,
    counts: &ElementCounts,
    corners: &mut Vec<Corner>,
) -> std::result::Result<(), ParseError> {
    corners.clear();
    let mut face_format = None;

    while let Some((format, indices)) = read_corner(tok, line)? {
        match face_format {
            None => face_format = Some(format),
            Some(expected) if expected != format => {
                return Err(malformed(
                    line,
                    format!(
                        "corner {} uses {:?} indices, expected {:?}",
                        corners.len() + 1,
                        format,
                        expected
                    ),
                ));
            }
            Some(_) => {}
        }

        let position = resolve_index(indices[0], counts.positions, line)?;
        let texcoord = match format {
            FaceFormat::PositionTexCoord | FaceFormat::PositionTexCoordNormal => {
                Some(resolve_index(indices[1], counts.texcoords, line)?)
            }
            _ => None,
        };
        let normal = match format {
            FaceFormat::PositionTexCoordNormal | FaceFormat::PositionNormal => {
                Some(resolve_index(indices[2], counts.normals, line)?)
            }
            _ => None,
        };

        corners.push(Corner {
            position,
            texcoord,
            normal,
        });
    }

    if corners.len() < 3 {
        return Err(ParseError::TruncatedFace {
            line,
            corners: corners.len(),
        });
    }

    Ok(())
}

/// 原地把步长 `from` 的数组压缩为步长 `to`（丢弃多余分量）
fn compact(data: &mut Vec<f32>, from: usize, to: usize) {
    let count = data.len() / from;
    for i in 0..count {
        for c in 0..to {
            data[i * to + c] = data[i * from + c];
        }
    }
    data.truncate(count * to);
}
