/// NVM 二进制模型容器
///
/// 预编译模型的存储格式：固定 84 字节的头部，随后是交错顶点数据和
/// 32 位三角形索引，全部为小端序。读取时不需要再次解析文本或编译顶点。
///
/// # 文件布局
///
/// ```text
/// [NvmHeader: 84 bytes]
/// [vertex_count * vertex_size bytes 交错顶点数据]
/// [index_count * 4 bytes 三角形索引]
/// ```
///
/// 容器只保存三角形列表，其他拓扑在读取后不可用。
use super::ModelLoader;
use crate::core::error::{FormatError, MeshLoadError, Result};
use crate::geometry::compiler::PrimitiveMask;
use crate::geometry::model::ModelAsset;
use crate::geometry::vertex::{VertexAttribute, VertexLayout};
use bytemuck::{Pod, Zeroable};
use std::mem::size_of;
use std::path::Path;

/// 魔数
pub const NVM_MAGIC: [u8; 4] = *b"NVMB";

/// 当前唯一支持的格式版本
pub const NVM_VERSION: u32 = 1;

/// 头部大小（字节）
pub const HEADER_SIZE: usize = size_of::<NvmHeader>();

const INDEX_SIZE: u32 = size_of::<u32>() as u32;

/// 文件头部
///
/// 字段顺序和宽度即磁盘格式。偏移量以浮点数个数计，`-1` 表示属性不存在；
/// 不存在的属性分量数写为 0。
#[repr(C)]
#[derive(Default, Clone, Copy, Debug, Pod, Zeroable)]
pub struct NvmHeader {
    pub magic: [u8; 4],
    pub header_size: u32,
    pub version: u32,
    pub vertex_count: u32,
    pub index_count: u32,
    /// 每个顶点的字节数
    pub vertex_size: u32,
    /// 每个索引的字节数（必须为 4）
    pub index_size: u32,
    /// position, normal, texcoord, tangent, color
    pub offsets: [i32; 5],
    pub position_size: i32,
    pub texcoord_size: i32,
    pub color_size: i32,
    pub bbox_min: [f32; 3],
    pub bbox_max: [f32; 3],
}

impl NvmHeader {
    /// 描述一个模型
    pub fn for_asset(asset: &ModelAsset) -> Self {
        let layout = asset.layout();
        let (bbox_min, bbox_max) = asset.bounding_box();

        Self {
            magic: NVM_MAGIC,
            header_size: HEADER_SIZE as u32,
            version: NVM_VERSION,
            vertex_count: asset.vertex_count() as u32,
            index_count: asset.triangle_indices().len() as u32,
            vertex_size: layout.size_bytes(),
            index_size: INDEX_SIZE,
            offsets: layout.header_offsets(),
            position_size: layout.components(VertexAttribute::Position) as i32,
            texcoord_size: layout.components(VertexAttribute::TexCoord) as i32,
            color_size: layout.components(VertexAttribute::Color) as i32,
            bbox_min,
            bbox_max,
        }
    }

    /// 在主机字节序与小端序之间转换（小端主机上不做任何事）
    fn swap_to_little_endian(self) -> Self {
        let float_le = |v: f32| f32::from_bits(v.to_bits().to_le());

        Self {
            magic: self.magic,
            header_size: self.header_size.to_le(),
            version: self.version.to_le(),
            vertex_count: self.vertex_count.to_le(),
            index_count: self.index_count.to_le(),
            vertex_size: self.vertex_size.to_le(),
            index_size: self.index_size.to_le(),
            offsets: self.offsets.map(i32::to_le),
            position_size: self.position_size.to_le(),
            texcoord_size: self.texcoord_size.to_le(),
            color_size: self.color_size.to_le(),
            bbox_min: self.bbox_min.map(float_le),
            bbox_max: self.bbox_max.map(float_le),
        }
    }

    /// 检查固定字段
    fn check(&self) -> std::result::Result<(), FormatError> {
        if self.magic != NVM_MAGIC {
            return Err(FormatError::BadMagic(self.magic));
        }
        if self.header_size as usize != HEADER_SIZE {
            return Err(FormatError::HeaderSize {
                expected: HEADER_SIZE as u32,
                found: self.header_size,
            });
        }
        if self.version != NVM_VERSION {
            return Err(FormatError::Version {
                expected: NVM_VERSION,
                found: self.version,
            });
        }
        if self.index_size != INDEX_SIZE {
            return Err(FormatError::IndexSize(self.index_size));
        }
        Ok(())
    }

    /// 头部描述的顶点布局
    fn layout(&self) -> std::result::Result<VertexLayout, FormatError> {
        if self.vertex_size % size_of::<f32>() as u32 != 0 {
            return Err(FormatError::InvalidLayout(format!(
                "vertex size {} is not a multiple of 4",
                self.vertex_size
            )));
        }

        VertexLayout::from_parts(
            self.vertex_size / size_of::<f32>() as u32,
            self.offsets,
            self.position_size.max(0) as u32,
            self.texcoord_size.max(0) as u32,
            self.color_size.max(0) as u32,
        )
    }
}

/// 把模型序列化为 NVM 字节流
pub fn encode(asset: &ModelAsset) -> Vec<u8> {
    let header = NvmHeader::for_asset(asset).swap_to_little_endian();
    let indices = asset.triangle_indices();

    let mut bytes =
        Vec::with_capacity(HEADER_SIZE + asset.vertices().len() * 4 + indices.len() * 4);
    bytes.extend_from_slice(bytemuck::bytes_of(&header));
    for value in asset.vertices() {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    for index in indices {
        bytes.extend_from_slice(&index.to_le_bytes());
    }

    bytes
}

/// 从 NVM 字节流反序列化模型
///
/// 魔数、头部大小、版本或索引大小任何一项不匹配都直接失败，
/// 不尝试兼容其他形状的文件。
pub fn decode(data: &[u8]) -> Result<ModelAsset> {
    if data.len() < HEADER_SIZE {
        return Err(FormatError::Truncated {
            expected: HEADER_SIZE,
            found: data.len(),
        }
        .into());
    }

    let header = bytemuck::pod_read_unaligned::<NvmHeader>(&data[..HEADER_SIZE]).swap_to_little_endian();
    header.check()?;
    let layout = header.layout()?;

    let vertex_bytes = (header.vertex_count as usize)
        .checked_mul(header.vertex_size as usize)
        .ok_or_else(|| FormatError::InvalidLayout("vertex data size overflows".to_string()))?;
    let index_bytes = header.index_count as usize * INDEX_SIZE as usize;
    let expected = HEADER_SIZE + vertex_bytes + index_bytes;

    if data.len() < expected {
        return Err(FormatError::Truncated {
            expected,
            found: data.len(),
        }
        .into());
    }

    let vertex_data = &data[HEADER_SIZE..HEADER_SIZE + vertex_bytes];
    let index_data = &data[HEADER_SIZE + vertex_bytes..expected];

    let mut asset = ModelAsset::empty(layout);
    asset.vertices = vertex_data
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    asset.triangles = index_data
        .chunks_exact(4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    asset.primitives = PrimitiveMask::TRIANGLES;
    asset.bbox_min = header.bbox_min;
    asset.bbox_max = header.bbox_max;

    asset.validate().map_err(MeshLoadError::ValidationError)?;

    tracing::debug!(
        vertices = header.vertex_count,
        indices = header.index_count,
        vertex_size = header.vertex_size,
        "NVM model decoded"
    );

    Ok(asset)
}

/// 把模型写入 NVM 文件
pub fn save_to_file(asset: &ModelAsset, path: &Path) -> Result<()> {
    let bytes = encode(asset);
    std::fs::write(path, &bytes)?;

    crate::engine_info!(
        path = %path.display(),
        bytes = bytes.len(),
        vertices = asset.vertex_count(),
        "NVM model written"
    );

    Ok(())
}

/// NVM 格式加载器
pub struct NvmLoader;

impl ModelLoader for NvmLoader {
    fn load_from_file(path: &Path) -> Result<ModelAsset> {
        if !path.exists() {
            return Err(MeshLoadError::FileNotFound(path.to_path_buf()).into());
        }

        let data = std::fs::read(path)?;
        decode(&data)
    }

    fn load_from_memory(data: &[u8]) -> Result<ModelAsset> {
        decode(data)
    }

    fn supported_extensions() -> &'static [&'static str] {
        &["nvm"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::DistModelError;
    use crate::geometry::loaders::obj_loader::ObjLoader;
    use crate::geometry::loaders::LoadOptions;

    const TRIANGLE: &[u8] = b"v 0 0 0\nv 2 0 0\nv 0 3 0\nvt 0 0\nvt 1 0\nvt 0 1\nf 1/1 2/2 3/3\n";

    fn sample() -> ModelAsset {
        let options = LoadOptions {
            compute_normals: true,
            ..Default::default()
        };
        ObjLoader::load_with_options(TRIANGLE, &options).unwrap()
    }

    fn format_error(data: &[u8]) -> FormatError {
        match decode(data) {
            Err(DistModelError::Format(e)) => e,
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn test_header_size() {
        assert_eq!(HEADER_SIZE, 84);
    }

    #[test]
    fn test_header_field_offsets() {
        let bytes = encode(&sample());

        assert_eq!(&bytes[0..4], b"NVMB");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 84);
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 1);
        assert_eq!(u32::from_le_bytes(bytes[12..16].try_into().unwrap()), 3);
        assert_eq!(u32::from_le_bytes(bytes[16..20].try_into().unwrap()), 3);
        // position(3) + normal(3) + texcoord(2) = 8 floats
        assert_eq!(u32::from_le_bytes(bytes[20..24].try_into().unwrap()), 32);
        assert_eq!(u32::from_le_bytes(bytes[24..28].try_into().unwrap()), 4);
        assert_eq!(i32::from_le_bytes(bytes[28..32].try_into().unwrap()), 0);
        assert_eq!(i32::from_le_bytes(bytes[32..36].try_into().unwrap()), 3);
        assert_eq!(i32::from_le_bytes(bytes[36..40].try_into().unwrap()), 6);
        assert_eq!(i32::from_le_bytes(bytes[40..44].try_into().unwrap()), -1);
        assert_eq!(i32::from_le_bytes(bytes[44..48].try_into().unwrap()), -1);
        assert_eq!(i32::from_le_bytes(bytes[48..52].try_into().unwrap()), 3);
        assert_eq!(i32::from_le_bytes(bytes[52..56].try_into().unwrap()), 2);
        assert_eq!(i32::from_le_bytes(bytes[56..60].try_into().unwrap()), 0);
        assert_eq!(f32::from_le_bytes(bytes[72..76].try_into().unwrap()), 2.0);
        assert_eq!(f32::from_le_bytes(bytes[76..80].try_into().unwrap()), 3.0);
        assert_eq!(bytes.len(), 84 + 3 * 32 + 3 * 4);
    }

    #[test]
    fn test_round_trip() {
        let asset = sample();
        let decoded = decode(&encode(&asset)).unwrap();
        assert_eq!(decoded, asset);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut bytes = encode(&sample());
        bytes[3] = b'X';
        assert_eq!(format_error(&bytes), FormatError::BadMagic(*b"NVMX"));
    }

    #[test]
    fn test_rejects_bad_header_size() {
        let mut bytes = encode(&sample());
        bytes[4..8].copy_from_slice(&88u32.to_le_bytes());
        assert_eq!(format_error(&bytes), FormatError::HeaderSize { expected: 84, found: 88 });
    }

    #[test]
    fn test_rejects_bad_version() {
        let mut bytes = encode(&sample());
        bytes[8..12].copy_from_slice(&2u32.to_le_bytes());
        assert_eq!(format_error(&bytes), FormatError::Version { expected: 1, found: 2 });
    }

    #[test]
    fn test_rejects_bad_index_size() {
        let mut bytes = encode(&sample());
        bytes[24..28].copy_from_slice(&2u32.to_le_bytes());
        assert_eq!(format_error(&bytes), FormatError::IndexSize(2));
    }

    #[test]
    fn test_rejects_truncated_data() {
        let bytes = encode(&sample());
        assert!(matches!(
            format_error(&bytes[..bytes.len() - 1]),
            FormatError::Truncated { .. }
        ));
        assert!(matches!(format_error(&bytes[..10]), FormatError::Truncated { expected: 84, found: 10 }));
    }

    #[test]
    fn test_rejects_out_of_range_index() {
        let mut bytes = encode(&sample());
        let last = bytes.len() - 4;
        bytes[last..].copy_from_slice(&7u32.to_le_bytes());
        assert!(matches!(decode(&bytes), Err(DistModelError::MeshLoading(_))));
    }

    #[test]
    fn test_empty_asset_round_trip() {
        let empty = ObjLoader::load_from_memory(b"").unwrap();
        let decoded = decode(&encode(&empty)).unwrap();
        assert_eq!(decoded.vertex_count(), 0);
        assert_eq!(decoded.bounding_box(), empty.bounding_box());
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir().join(format!("dist_model_nvm_{}.nvm", std::process::id()));
        let asset = sample();

        save_to_file(&asset, &path).unwrap();
        let loaded = NvmLoader::load_from_file(&path).unwrap();
        assert_eq!(loaded, asset);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_nonexistent_file() {
        assert!(NvmLoader::load_from_file(Path::new("nonexistent.nvm")).is_err());
    }
}
