//! 顶点编译模块
//!
//! 把原始网格的多条独立索引流合并为单一索引的交错顶点缓冲：
//! 每个面角点的 (position, normal, texcoord, tangent, color) 索引元组
//! 唯一确定一个编译顶点，相同元组的角点共享同一个编译索引。
//!
//! 除三角形列表外还可以按需生成边列表、带邻接信息的三角形列表和点列表。

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use bitflags::bitflags;

use crate::geometry::model::ModelAsset;
use crate::geometry::raw_mesh::RawMesh;
use crate::geometry::vertex::VertexLayout;

bitflags! {
    /// 需要生成的图元拓扑
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PrimitiveMask: u32 {
        /// 点列表：每个不同位置一个顶点
        const POINTS = 1 << 0;
        /// 边列表：每条无向边一次
        const EDGES = 1 << 1;
        /// 三角形列表
        const TRIANGLES = 1 << 2;
        /// 带邻接信息的三角形列表（每个三角形 6 个索引）
        const TRIANGLES_WITH_ADJACENCY = 1 << 3;
        const ALL = Self::POINTS.bits()
            | Self::EDGES.bits()
            | Self::TRIANGLES.bits()
            | Self::TRIANGLES_WITH_ADJACENCY.bits();
    }
}

impl Default for PrimitiveMask {
    fn default() -> Self {
        PrimitiveMask::TRIANGLES
    }
}

impl PrimitiveMask {
    /// 补全隐含的拓扑
    ///
    /// 边和邻接拓扑都建立在三角形列表之上，请求它们时同时生成三角形；
    /// 空掩码按三角形处理。
    pub fn normalized(self) -> Self {
        if self.is_empty() || self.intersects(Self::EDGES | Self::TRIANGLES_WITH_ADJACENCY) {
            self | Self::TRIANGLES
        } else {
            self
        }
    }
}

/// 编译顶点的去重键
///
/// 不存在的属性对应字段固定为 0。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompiledVertexKey {
    pub position: u32,
    pub normal: u32,
    pub texcoord: u32,
    pub tangent: u32,
    pub color: u32,
}

/// 某个属性在当前角点的索引；属性数组为空时为 0
#[inline]
fn stream_index(present: bool, stream: &[u32], corner: usize) -> u32 {
    if present {
        stream.get(corner).copied().unwrap_or(0)
    } else {
        0
    }
}

/// 把第 `index` 个元素的 `size` 个分量追加到顶点缓冲
#[inline]
fn append_element(out: &mut Vec<f32>, data: &[f32], index: u32, size: usize) {
    let base = index as usize * size;
    out.extend_from_slice(&data[base..base + size]);
}

/// 编译原始网格
///
/// 原始网格的索引必须已经通过 [`RawMesh::validate_indices`] 检查。
/// 没有面时返回空的（但合法的）模型。
pub fn compile(raw: &RawMesh, primitives: PrimitiveMask) -> ModelAsset {
    let primitives = primitives.normalized();

    let has_normals = raw.has_normals();
    let has_texcoords = raw.has_texcoords();
    let has_tangents = raw.has_tangents();
    let has_colors = raw.has_colors();

    let layout = VertexLayout::packed(
        raw.position_size as u32,
        has_normals,
        if has_texcoords { raw.texcoord_size as u32 } else { 0 },
        has_tangents,
        if has_colors { raw.color_size as u32 } else { 0 },
    );

    let corner_count = raw.corner_count();
    let mut vertices = Vec::new();
    let mut compiled = Vec::with_capacity(corner_count);
    let mut vertex_map: HashMap<CompiledVertexKey, u32> = HashMap::new();

    for corner in 0..corner_count {
        let key = CompiledVertexKey {
            position: raw.position_index[corner],
            normal: stream_index(has_normals, &raw.normal_index, corner),
            texcoord: stream_index(has_texcoords, &raw.texcoord_index, corner),
            tangent: stream_index(has_tangents, &raw.tangent_index, corner),
            color: stream_index(has_colors, &raw.color_index, corner),
        };

        let next = vertex_map.len() as u32;
        let index = match vertex_map.entry(key) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                entry.insert(next);

                append_element(&mut vertices, &raw.positions, key.position, raw.position_size);
                if has_normals {
                    append_element(&mut vertices, &raw.normals, key.normal, 3);
                }
                if has_texcoords {
                    append_element(&mut vertices, &raw.texcoords, key.texcoord, raw.texcoord_size);
                }
                if has_tangents {
                    append_element(&mut vertices, &raw.tangents, key.tangent, 3);
                }
                if has_colors {
                    append_element(&mut vertices, &raw.colors, key.color, raw.color_size);
                }

                next
            }
        };
        compiled.push(index);
    }

    let mut asset = ModelAsset::empty(layout);
    asset.vertices = vertices;
    asset.primitives = primitives;

    let (min, max) = raw.bounding_box();
    asset.bbox_min = min;
    asset.bbox_max = max;

    if primitives.contains(PrimitiveMask::EDGES) {
        asset.edges = build_edges(&raw.position_index, &compiled);
    }

    if primitives.contains(PrimitiveMask::TRIANGLES_WITH_ADJACENCY) {
        let edge_map = build_edge_map(&raw.position_index);
        asset.adjacency = build_adjacency(&raw.position_index, &compiled, &edge_map);
    }

    if primitives.contains(PrimitiveMask::POINTS) {
        asset.points = build_points(&raw.position_index, &compiled);
    }

    // 三角形列表即逐角点的编译索引，保持输入绕序
    if primitives.contains(PrimitiveMask::TRIANGLES) {
        asset.triangles = compiled;
    }

    tracing::debug!(
        corners = corner_count,
        vertices = asset.vertex_count(),
        stride = layout.stride(),
        "Vertices compiled"
    );

    asset
}

#[inline]
fn edge_key(a: u32, b: u32) -> (u32, u32) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// 无向位置边 -> 拥有它的三角形序号
fn build_edge_map(position_index: &[u32]) -> HashMap<(u32, u32), Vec<usize>> {
    let mut edges: HashMap<(u32, u32), Vec<usize>> = HashMap::new();

    for (triangle, corners) in position_index.chunks_exact(3).enumerate() {
        for jj in 0..3 {
            let key = edge_key(corners[jj], corners[(jj + 1) % 3]);
            edges.entry(key).or_default().push(triangle);
        }
    }

    edges
}

/// 每条无向位置边在第一次出现时输出一次
fn build_edges(position_index: &[u32], compiled: &[u32]) -> Vec<u32> {
    let mut seen = HashSet::new();
    let mut edges = Vec::new();

    for (triangle, corners) in position_index.chunks_exact(3).enumerate() {
        for jj in 0..3 {
            let next = (jj + 1) % 3;
            if seen.insert(edge_key(corners[jj], corners[next])) {
                edges.push(compiled[triangle * 3 + jj]);
                edges.push(compiled[triangle * 3 + next]);
            }
        }
    }

    edges
}

/// 带邻接信息的三角形列表
///
/// 每条边输出 (边起点, 相邻三角形的对顶点)。边界边没有相邻三角形，
/// 对顶点取当前三角形自身的第三个顶点 `(jj + 2) % 3`，而不是重复边起点，
/// 这样边界处的"相邻三角形"就是当前三角形本身。
fn build_adjacency(
    position_index: &[u32],
    compiled: &[u32],
    edge_map: &HashMap<(u32, u32), Vec<usize>>,
) -> Vec<u32> {
    let mut adjacency = Vec::with_capacity(compiled.len() * 2);

    for (triangle, corners) in position_index.chunks_exact(3).enumerate() {
        let base = triangle * 3;

        for jj in 0..3 {
            let v0 = corners[jj];
            let v1 = corners[(jj + 1) % 3];

            let neighbor = edge_map
                .get(&edge_key(v0, v1))
                .and_then(|owners| owners.iter().copied().find(|&t| t != triangle));

            let opposite = match neighbor {
                Some(other) => {
                    let other_base = other * 3;
                    // 退化的相邻三角形可能找不到不在边上的顶点，退回它的首顶点
                    let far = (0..3)
                        .find(|&k| {
                            let p = position_index[other_base + k];
                            p != v0 && p != v1
                        })
                        .unwrap_or(0);
                    compiled[other_base + far]
                }
                None => compiled[base + (jj + 2) % 3],
            };

            adjacency.push(compiled[base + jj]);
            adjacency.push(opposite);
        }
    }

    adjacency
}

/// 每个不同位置取第一个使用它的编译顶点
fn build_points(position_index: &[u32], compiled: &[u32]) -> Vec<u32> {
    let mut seen = HashSet::new();
    position_index
        .iter()
        .zip(compiled)
        .filter(|(position, _)| seen.insert(**position))
        .map(|(_, &index)| index)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::raw_mesh::Corner;
    use crate::geometry::vertex::VertexAttribute;

    fn corner(position: u32) -> Corner {
        Corner { position, ..Default::default() }
    }

    /// 两个三角形组成的正方形（共享对角线 0-2）
    fn quad() -> RawMesh {
        let mut mesh = RawMesh::new();
        mesh.positions = vec![
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            1.0, 1.0, 0.0, //
            0.0, 1.0, 0.0,
        ];
        mesh.push_polygon(&[corner(0), corner(1), corner(2), corner(3)]);
        mesh.normal_index.clear();
        mesh.texcoord_index.clear();
        mesh.color_index.clear();
        mesh
    }

    #[test]
    fn test_position_only_layout() {
        let asset = compile(&quad(), PrimitiveMask::TRIANGLES);

        assert_eq!(asset.vertex_stride(), 3);
        assert_eq!(asset.vertex_count(), 4);
        assert_eq!(asset.triangle_indices(), &[0, 1, 2, 0, 2, 3]);
        for attribute in [
            VertexAttribute::Normal,
            VertexAttribute::TexCoord,
            VertexAttribute::Tangent,
            VertexAttribute::Color,
        ] {
            assert_eq!(asset.offset(attribute), None);
        }
    }

    #[test]
    fn test_dedup_by_full_tuple() {
        let mut mesh = quad();
        mesh.texcoords = vec![0.0, 0.0, 1.0, 1.0];
        // 位置 0 在两个三角形中使用不同的纹理坐标
        mesh.texcoord_index = vec![0, 0, 0, 1, 0, 0];

        let asset = compile(&mesh, PrimitiveMask::TRIANGLES);
        assert_eq!(asset.vertex_count(), 5);
        assert_eq!(asset.triangle_indices(), &[0, 1, 2, 3, 2, 4]);
        assert_eq!(asset.vertex_stride(), 5);
        assert_eq!(asset.offset(VertexAttribute::TexCoord), Some(3));
    }

    #[test]
    fn test_edges_emitted_once() {
        let asset = compile(&quad(), PrimitiveMask::EDGES);

        // 5 条无向边：0-1, 1-2, 2-0, 2-3, 3-0
        assert_eq!(asset.indices(PrimitiveMask::EDGES).unwrap(), &[0, 1, 1, 2, 2, 0, 2, 3, 3, 0]);
        // 边拓扑隐含三角形拓扑
        assert!(asset.primitives().contains(PrimitiveMask::TRIANGLES));
    }

    #[test]
    fn test_adjacency() {
        let asset = compile(&quad(), PrimitiveMask::TRIANGLES_WITH_ADJACENCY);
        let adjacency = asset.indices(PrimitiveMask::TRIANGLES_WITH_ADJACENCY).unwrap();

        assert_eq!(adjacency.len(), 12);
        // 三角形 0 (0,1,2)：边 0-1、1-2 是边界，边 2-0 与三角形 1 共享，对顶点为 3
        assert_eq!(&adjacency[..6], &[0, 2, 1, 0, 2, 3]);
        // 三角形 1 (0,2,3)：边 0-2 与三角形 0 共享，对顶点为 1
        assert_eq!(&adjacency[6..], &[0, 1, 2, 0, 3, 2]);
    }

    #[test]
    fn test_points_first_use() {
        let asset = compile(&quad(), PrimitiveMask::POINTS);
        assert_eq!(asset.indices(PrimitiveMask::POINTS).unwrap(), &[0, 1, 2, 3]);
        assert!(asset.indices(PrimitiveMask::TRIANGLES).is_none());
    }

    #[test]
    fn test_empty_mesh() {
        let asset = compile(&RawMesh::new(), PrimitiveMask::TRIANGLES);
        assert_eq!(asset.vertex_count(), 0);
        assert!(asset.triangle_indices().is_empty());
        assert!(asset.validate().is_ok());
    }

    #[test]
    fn test_vertex_data_interleaved() {
        let mut mesh = quad();
        mesh.normals = vec![0.0, 0.0, 1.0];
        mesh.normal_index = vec![0; 6];

        let asset = compile(&mesh, PrimitiveMask::TRIANGLES);
        assert_eq!(asset.vertex_stride(), 6);
        assert_eq!(&asset.vertices()[6..12], &[1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
    }
}
