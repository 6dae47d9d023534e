//! 几何数学工具模块
//!
//! 在原始网格上合成缺失的逐顶点属性：
//! - 法线重建（按位置索引累加面法线）
//! - S 方向切线（按纹理坐标索引累加 UV 切线）
//!
//! 两个过程都使用"累加或分裂"策略：同一个源索引上，方向在 60° 以内的
//! 面贡献累加到同一个槽位；超出阈值时查找之前分裂出的备用槽位，
//! 都不一致就追加一个新槽位。这样在没有平滑组标注的情况下，
//! 折痕处的顶点会自动拆分，平滑区域共享一条平均后的法线。
//!
//! 必须在编译为渲染格式之前调用。

use std::collections::HashMap;

use crate::core::error::LoadWarning;
use crate::geometry::raw_mesh::RawMesh;
use crate::math::constants::AGREEMENT_COS;
use crate::math::{add_vec3, is_zero, store_vec3, try_normalize, vec2_at, vec3_at, Vector3};

/// 累加槽位存储
///
/// `slots` 是步长为 3 的扁平数组，初始每个源索引一个槽位（全零表示未写入）；
/// `collisions` 记录每个源索引分裂出的备用槽位。
struct SplitAccumulator<'a> {
    slots: &'a mut Vec<f32>,
    collisions: HashMap<u32, Vec<u32>>,
}

impl<'a> SplitAccumulator<'a> {
    fn new(slots: &'a mut Vec<f32>) -> Self {
        Self {
            slots,
            collisions: HashMap::new(),
        }
    }

    fn agrees(&self, slot: u32, direction: &Vector3) -> bool {
        try_normalize(&vec3_at(&self.slots[..], slot, 3))
            .map_or(false, |current| current.dot(direction) >= AGREEMENT_COS)
    }

    /// 把一个面贡献加到 `source` 对应的槽位上，返回最终使用的槽位索引
    ///
    /// `contribution` 是累加量，`direction` 是它的单位方向，用于一致性判定。
    fn accumulate(&mut self, source: u32, contribution: &Vector3, direction: &Vector3) -> u32 {
        let current = vec3_at(&self.slots[..], source, 3);

        if is_zero(&current) {
            store_vec3(&mut self.slots[..], source, contribution);
            return source;
        }

        if self.agrees(source, direction) {
            add_vec3(&mut self.slots[..], source, contribution);
            return source;
        }

        // 方向不一致，查找之前分裂出的槽位
        let existing = self
            .collisions
            .get(&source)
            .and_then(|alternates| alternates.iter().copied().find(|&slot| self.agrees(slot, direction)));

        if let Some(slot) = existing {
            add_vec3(&mut self.slots[..], slot, contribution);
            return slot;
        }

        let target = (self.slots.len() / 3) as u32;
        self.slots.extend_from_slice(contribution.as_slice());
        self.collisions.entry(source).or_default().push(target);
        target
    }
}

/// 原地归一化所有槽位
///
/// 被索引引用但累加结果为零的槽位保持为零，并通过 `on_zero` 报告。
fn normalize_slots(slots: &mut [f32], indices: &[u32], mut on_zero: impl FnMut(usize)) {
    let mut referenced = vec![false; slots.len() / 3];
    for &i in indices {
        referenced[i as usize] = true;
    }

    for (slot, value) in slots.chunks_exact_mut(3).enumerate() {
        let v = Vector3::new(value[0], value[1], value[2]);
        match try_normalize(&v) {
            Some(n) => value.copy_from_slice(n.as_slice()),
            None => {
                value.fill(0.0);
                if referenced[slot] {
                    on_zero(slot);
                }
            }
        }
    }
}

/// 从三角形面重建顶点法线
///
/// 已有法线时不做任何事。面法线为两条边向量的叉积（未归一化，
/// 面积越大权重越大），以位置索引作为默认槽位。
///
/// # 参数
///
/// - `mesh`: 原始网格（法线数组和法线索引流将被填充）
/// - `warnings`: 退化输入诊断
pub fn compute_normals(mesh: &mut RawMesh, warnings: &mut Vec<LoadWarning>) {
    if mesh.has_normals() || mesh.triangle_count() == 0 {
        return;
    }

    let stride = mesh.position_size;
    let mut normals = vec![0.0f32; mesh.position_count() * 3];
    let mut normal_index = Vec::with_capacity(mesh.corner_count());

    {
        let mut acc = SplitAccumulator::new(&mut normals);

        for (triangle, corners) in mesh.position_index.chunks_exact(3).enumerate() {
            let p0 = vec3_at(&mesh.positions, corners[0], stride);
            let p1 = vec3_at(&mesh.positions, corners[1], stride);
            let p2 = vec3_at(&mesh.positions, corners[2], stride);

            let face_normal = (p1 - p0).cross(&(p2 - p0));

            let Some(direction) = try_normalize(&face_normal) else {
                warnings.push(LoadWarning::DegenerateFace { triangle });
                normal_index.extend_from_slice(corners);
                continue;
            };

            for &corner in corners {
                normal_index.push(acc.accumulate(corner, &face_normal, &direction));
            }
        }
    }

    normalize_slots(&mut normals, &normal_index, |slot| {
        warnings.push(LoadWarning::ZeroLengthNormal { slot })
    });

    tracing::debug!(
        normals = normals.len() / 3,
        positions = mesh.position_count(),
        "Normals synthesized"
    );

    mesh.normals = normals;
    mesh.normal_index = normal_index;
}

/// 计算 S 方向切线
///
/// 已有切线或没有纹理坐标时不做任何事。每个三角形的切线由 UV 与边向量的
/// 线性方程组求得，归一化后按纹理坐标索引累加。UV 行列式为零的三角形
/// 不产生贡献，只记录诊断。
///
/// 可能导致顶点数增加，因为分裂会阻止顶点共享。
pub fn compute_tangents(mesh: &mut RawMesh, warnings: &mut Vec<LoadWarning>) {
    if mesh.has_tangents() || !mesh.has_texcoords() || mesh.triangle_count() == 0 {
        return;
    }

    let p_stride = mesh.position_size;
    let t_stride = mesh.texcoord_size;
    let mut tangents = vec![0.0f32; mesh.texcoord_count() * 3];
    let mut tangent_index = Vec::with_capacity(mesh.corner_count());

    {
        let mut acc = SplitAccumulator::new(&mut tangents);

        let faces = mesh
            .position_index
            .chunks_exact(3)
            .zip(mesh.texcoord_index.chunks_exact(3));

        for (triangle, (pos, tex)) in faces.enumerate() {
            let p0 = vec3_at(&mesh.positions, pos[0], p_stride);
            let p1 = vec3_at(&mesh.positions, pos[1], p_stride);
            let p2 = vec3_at(&mesh.positions, pos[2], p_stride);
            let st0 = vec2_at(&mesh.texcoords, tex[0], t_stride);
            let st1 = vec2_at(&mesh.texcoords, tex[1], t_stride);
            let st2 = vec2_at(&mesh.texcoords, tex[2], t_stride);

            let dp0 = p1 - p0;
            let dp1 = p2 - p0;
            let dst0 = st1 - st0;
            let dst1 = st2 - st0;

            let determinant = dst0.x * dst1.y - dst1.x * dst0.y;
            let s_tangent = (dp0 * dst1.y - dp1 * dst0.y) / determinant;

            let direction = if determinant != 0.0 && s_tangent.iter().all(|c| c.is_finite()) {
                try_normalize(&s_tangent)
            } else {
                None
            };

            let Some(direction) = direction else {
                warnings.push(LoadWarning::DegenerateTexCoords { triangle });
                tangent_index.extend_from_slice(tex);
                continue;
            };

            for &corner in tex {
                tangent_index.push(acc.accumulate(corner, &direction, &direction));
            }
        }
    }

    normalize_slots(&mut tangents, &tangent_index, |slot| {
        warnings.push(LoadWarning::ZeroLengthTangent { slot })
    });

    tracing::debug!(
        tangents = tangents.len() / 3,
        texcoords = mesh.texcoord_count(),
        "Tangents synthesized"
    );

    mesh.tangents = tangents;
    mesh.tangent_index = tangent_index;
}
