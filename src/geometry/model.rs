/// 编译后的模型数据模块
///
/// `ModelAsset` 是加载管线的最终产物：一块交错顶点缓冲、按拓扑分开的
/// 索引缓冲、顶点布局描述以及包围盒。它不持有任何指向解析阶段临时数据的引用，
/// 可以独立地移动、克隆或在线程间传递。

use crate::core::error::{MeshLoadError, Result};
use crate::geometry::compiler::PrimitiveMask;
use crate::geometry::vertex::{VertexAttribute, VertexLayout};

/// 编译后的模型
///
/// # 示例
///
/// ```rust
/// use dist_model::geometry::model::ModelAsset;
/// use dist_model::geometry::vertex::VertexLayout;
///
/// let layout = VertexLayout::packed(3, false, 0, false, 0);
/// let model = ModelAsset::from_data(
///     vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
///     layout,
///     vec![0, 1, 2],
/// )?;
///
/// assert_eq!(model.vertex_count(), 3);
/// assert_eq!(model.triangle_count(), 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ModelAsset {
    pub(crate) vertices: Vec<f32>,
    pub(crate) layout: VertexLayout,

    pub(crate) triangles: Vec<u32>,
    pub(crate) edges: Vec<u32>,
    pub(crate) adjacency: Vec<u32>,
    pub(crate) points: Vec<u32>,
    pub(crate) primitives: PrimitiveMask,

    pub(crate) bbox_min: [f32; 3],
    pub(crate) bbox_max: [f32; 3],
}

impl ModelAsset {
    /// 创建一个指定布局的空模型
    pub fn empty(layout: VertexLayout) -> Self {
        Self {
            vertices: Vec::new(),
            layout,
            triangles: Vec::new(),
            edges: Vec::new(),
            adjacency: Vec::new(),
            points: Vec::new(),
            primitives: PrimitiveMask::TRIANGLES,
            bbox_min: [f32::INFINITY; 3],
            bbox_max: [f32::NEG_INFINITY; 3],
        }
    }

    /// 从现成的交错顶点数据创建模型
    ///
    /// 包围盒由顶点位置计算。
    ///
    /// # 参数
    ///
    /// - `vertices`: 交错顶点数据，长度必须是 `layout.stride()` 的倍数
    /// - `layout`: 顶点布局
    /// - `indices`: 三角形索引
    ///
    /// # 错误
    ///
    /// 数据长度或索引范围不合法时返回 `MeshLoadError::ValidationError`。
    pub fn from_data(vertices: Vec<f32>, layout: VertexLayout, indices: Vec<u32>) -> Result<Self> {
        let mut model = Self::empty(layout);
        model.vertices = vertices;
        model.triangles = indices;

        model.validate().map_err(MeshLoadError::ValidationError)?;

        let stride = layout.stride() as usize;
        let offset = layout.offset(VertexAttribute::Position).unwrap_or(0) as usize;
        for vertex in model.vertices.chunks_exact(stride) {
            for axis in 0..3 {
                let value = vertex[offset + axis];
                model.bbox_min[axis] = model.bbox_min[axis].min(value);
                model.bbox_max[axis] = model.bbox_max[axis].max(value);
            }
        }

        Ok(model)
    }

    /// 交错顶点缓冲
    #[inline]
    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    /// 顶点布局
    #[inline]
    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    /// 每个顶点的浮点数个数
    #[inline]
    pub fn vertex_stride(&self) -> u32 {
        self.layout.stride()
    }

    /// 每个顶点的字节数
    #[inline]
    pub fn vertex_size_bytes(&self) -> u32 {
        self.layout.size_bytes()
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        match self.layout.stride() {
            0 => 0,
            stride => self.vertices.len() / stride as usize,
        }
    }

    /// 已生成的拓扑
    #[inline]
    pub fn primitives(&self) -> PrimitiveMask {
        self.primitives
    }

    /// 指定拓扑的索引缓冲
    ///
    /// `kind` 必须是单个拓扑标志；未生成的拓扑返回 `None`。
    pub fn indices(&self, kind: PrimitiveMask) -> Option<&[u32]> {
        if !self.primitives.contains(kind) {
            return None;
        }

        if kind == PrimitiveMask::TRIANGLES {
            Some(&self.triangles)
        } else if kind == PrimitiveMask::EDGES {
            Some(&self.edges)
        } else if kind == PrimitiveMask::TRIANGLES_WITH_ADJACENCY {
            Some(&self.adjacency)
        } else if kind == PrimitiveMask::POINTS {
            Some(&self.points)
        } else {
            None
        }
    }

    /// 指定拓扑的索引个数
    pub fn index_count(&self, kind: PrimitiveMask) -> usize {
        self.indices(kind).map_or(0, |i| i.len())
    }

    /// 三角形列表索引（未生成时为空）
    #[inline]
    pub fn triangle_indices(&self) -> &[u32] {
        self.indices(PrimitiveMask::TRIANGLES).unwrap_or(&[])
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangle_indices().len() / 3
    }

    /// 属性偏移（浮点数个数）
    #[inline]
    pub fn offset(&self, attribute: VertexAttribute) -> Option<u32> {
        self.layout.offset(attribute)
    }

    /// 属性分量数（缺失时为 0）
    #[inline]
    pub fn components(&self, attribute: VertexAttribute) -> u32 {
        self.layout.components(attribute)
    }

    /// 轴对齐包围盒 `(min, max)`
    #[inline]
    pub fn bounding_box(&self) -> ([f32; 3], [f32; 3]) {
        (self.bbox_min, self.bbox_max)
    }

    /// 包围盒中心
    pub fn center(&self) -> [f32; 3] {
        [
            0.5 * (self.bbox_min[0] + self.bbox_max[0]),
            0.5 * (self.bbox_min[1] + self.bbox_max[1]),
            0.5 * (self.bbox_min[2] + self.bbox_max[2]),
        ]
    }

    /// 验证模型数据的有效性
    ///
    /// 检查：
    /// - 布局包含 3 或 4 分量的位置属性
    /// - 顶点缓冲长度是步长的倍数
    /// - 各拓扑的索引个数是图元大小的倍数
    /// - 所有索引都在顶点范围内
    pub fn validate(&self) -> std::result::Result<(), String> {
        let position_size = self.layout.components(VertexAttribute::Position);
        if self.layout.offset(VertexAttribute::Position).is_none() || !(3..=4).contains(&position_size) {
            return Err(format!("位置属性缺失或分量数不合法: {}", position_size));
        }

        let stride = self.layout.stride() as usize;
        if self.vertices.len() % stride != 0 {
            return Err(format!(
                "顶点数据长度 {} 不是步长 {} 的倍数",
                self.vertices.len(),
                stride
            ));
        }

        let vertex_count = self.vertex_count();
        let buffers: [(&str, &[u32], usize); 4] = [
            ("triangles", &self.triangles, 3),
            ("edges", &self.edges, 2),
            ("triangles_with_adjacency", &self.adjacency, 6),
            ("points", &self.points, 1),
        ];

        for (name, indices, primitive_size) in buffers {
            if indices.len() % primitive_size != 0 {
                return Err(format!(
                    "{} 索引数量必须是 {} 的倍数，当前为: {}",
                    name,
                    primitive_size,
                    indices.len()
                ));
            }

            if let Some((i, &index)) = indices
                .iter()
                .enumerate()
                .find(|(_, index)| **index as usize >= vertex_count)
            {
                return Err(format!(
                    "{} 索引 {} 处的值 {} 超出顶点范围 ({} 个顶点)",
                    name, i, index, vertex_count
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::DistModelError;

    fn triangle_layout() -> VertexLayout {
        VertexLayout::packed(3, false, 2, false, 0)
    }

    fn triangle_vertices() -> Vec<f32> {
        vec![
            0.0, 0.0, 0.0, 0.0, 0.0, //
            2.0, 0.0, 0.0, 1.0, 0.0, //
            0.0, 3.0, 0.0, 0.0, 1.0,
        ]
    }

    #[test]
    fn test_from_data_bounding_box() {
        let model = ModelAsset::from_data(triangle_vertices(), triangle_layout(), vec![0, 1, 2]).unwrap();

        assert_eq!(model.vertex_count(), 3);
        assert_eq!(model.vertex_stride(), 5);
        assert_eq!(model.vertex_size_bytes(), 20);
        assert_eq!(model.bounding_box(), ([0.0, 0.0, 0.0], [2.0, 3.0, 0.0]));
        assert_eq!(model.center(), [1.0, 1.5, 0.0]);
        assert_eq!(model.components(VertexAttribute::TexCoord), 2);
    }

    #[test]
    fn test_from_data_rejects_bad_index() {
        let result = ModelAsset::from_data(triangle_vertices(), triangle_layout(), vec![0, 1, 3]);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_data_rejects_partial_vertex() {
        let mut vertices = triangle_vertices();
        vertices.pop();
        assert!(ModelAsset::from_data(vertices, triangle_layout(), vec![0, 1, 2]).is_err());
    }

    #[test]
    fn test_from_data_rejects_layout_without_position() {
        let layout = VertexLayout::packed(0, false, 0, false, 0);
        let result = ModelAsset::from_data(Vec::new(), layout, Vec::new());
        assert!(matches!(
            result,
            Err(DistModelError::MeshLoading(MeshLoadError::ValidationError(_)))
        ));

        let layout = VertexLayout::packed(0, true, 2, false, 0);
        assert!(ModelAsset::from_data(vec![0.0; 5], layout, Vec::new()).is_err());
    }

    #[test]
    fn test_validation_invalid_index_count() {
        let mut model = ModelAsset::from_data(triangle_vertices(), triangle_layout(), vec![0, 1, 2]).unwrap();
        model.triangles.push(0);

        let result = model.validate();
        assert!(result.unwrap_err().contains("3 的倍数"));
    }

    #[test]
    fn test_indices_by_kind() {
        let model = ModelAsset::from_data(triangle_vertices(), triangle_layout(), vec![0, 1, 2]).unwrap();

        assert_eq!(model.indices(PrimitiveMask::TRIANGLES), Some(&[0u32, 1, 2][..]));
        assert_eq!(model.index_count(PrimitiveMask::TRIANGLES), 3);
        assert!(model.indices(PrimitiveMask::EDGES).is_none());
        assert_eq!(model.index_count(PrimitiveMask::POINTS), 0);
    }
}
