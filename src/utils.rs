use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
    pub uv: [f32; 2],
}

pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }

    /// Append another mesh, rebasing its indices
    pub fn extend(&mut self, other: &Mesh) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }

    pub fn upload(&self, device: &wgpu::Device) -> MeshBuffer {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: bytemuck::cast_slice(&self.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        MeshBuffer {
            vertex_buffer,
            index_buffer,
            index_count: self.indices.len() as u32,
        }
    }
}

/// Face order: +X, -X, +Y, -Y, +Z, -Z
pub type FaceColors = [[f32; 4]; 6];

pub fn uniform_faces(color: [f32; 4]) -> FaceColors {
    [color; 6]
}

/// Axis-aligned box centred on the origin with one colour per face
pub fn create_box_mesh(width: f32, height: f32, depth: f32, colors: FaceColors) -> Mesh {
    let (hx, hy, hz) = (width / 2.0, height / 2.0, depth / 2.0);

    // (normal, u axis, v axis) per face, u x v = normal so winding is CCW from outside
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];

    let half = [hx, hy, hz];
    let scale = |v: [f32; 3], s: f32| [v[0] * half[0] * s, v[1] * half[1] * s, v[2] * half[2] * s];

    let mut mesh = Mesh::empty();
    for (face, (n, u, v)) in faces.iter().enumerate() {
        let base = mesh.vertices.len() as u32;
        let centre = scale(*n, 1.0);
        for (su, sv, uv) in [(-1.0, -1.0, [0.0, 1.0]), (1.0, -1.0, [1.0, 1.0]), (1.0, 1.0, [1.0, 0.0]), (-1.0, 1.0, [0.0, 0.0])] {
            let du = scale(*u, su);
            let dv = scale(*v, sv);
            mesh.vertices.push(Vertex {
                pos: [
                    centre[0] + du[0] + dv[0],
                    centre[1] + du[1] + dv[1],
                    centre[2] + du[2] + dv[2],
                ],
                normal: *n,
                color: colors[face],
                uv,
            });
        }
        mesh.indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    mesh
}

/// Horizontal square at y = 0 facing up, UVs tiled `repeat` times
pub fn create_ground_mesh(size: f32, repeat: f32) -> Mesh {
    let h = size / 2.0;
    let n = [0.0, 1.0, 0.0];
    let white = [1.0, 1.0, 1.0, 1.0];
    let vertices = vec![
        Vertex { pos: [-h, 0.0, h], normal: n, color: white, uv: [0.0, 0.0] },
        Vertex { pos: [h, 0.0, h], normal: n, color: white, uv: [repeat, 0.0] },
        Vertex { pos: [h, 0.0, -h], normal: n, color: white, uv: [repeat, repeat] },
        Vertex { pos: [-h, 0.0, -h], normal: n, color: white, uv: [0.0, repeat] },
    ];
    Mesh { vertices, indices: vec![0, 1, 2, 0, 2, 3] }
}

pub fn hex_color(rgb: u32) -> [f32; 4] {
    [
        ((rgb >> 16) & 0xff) as f32 / 255.0,
        ((rgb >> 8) & 0xff) as f32 / 255.0,
        (rgb & 0xff) as f32 / 255.0,
        1.0,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [a[1] * b[2] - a[2] * b[1], a[2] * b[0] - a[0] * b[2], a[0] * b[1] - a[1] * b[0]]
    }

    fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
    }

    #[test]
    fn test_box_extents_and_counts() {
        let mesh = create_box_mesh(1.0, 2.0, 1.0, uniform_faces([1.0; 4]));
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        let max_y = mesh.vertices.iter().map(|v| v.pos[1]).fold(f32::MIN, f32::max);
        let min_x = mesh.vertices.iter().map(|v| v.pos[0]).fold(f32::MAX, f32::min);
        assert_eq!(max_y, 1.0);
        assert_eq!(min_x, -0.5);
    }

    #[test]
    fn test_box_triangles_wind_outwards() {
        let mesh = create_box_mesh(2.0, 2.0, 2.0, uniform_faces([1.0; 4]));
        for tri in mesh.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| mesh.vertices[i as usize]);
            let n = cross(sub(b.pos, a.pos), sub(c.pos, a.pos));
            let dot = n[0] * a.normal[0] + n[1] * a.normal[1] + n[2] * a.normal[2];
            assert!(dot > 0.0);
        }
    }

    #[test]
    fn test_face_colors_follow_face_order() {
        let red = hex_color(0xff0000);
        let blue = hex_color(0x0000ff);
        let mut colors = uniform_faces(blue);
        colors[4] = red;
        let mesh = create_box_mesh(1.0, 1.0, 1.0, colors);
        for v in &mesh.vertices {
            let expected = if v.normal == [0.0, 0.0, 1.0] { red } else { blue };
            assert_eq!(v.color, expected);
        }
    }

    #[test]
    fn test_extend_rebases_indices() {
        let mut a = create_ground_mesh(2.0, 1.0);
        let b = create_ground_mesh(2.0, 1.0);
        a.extend(&b);
        assert_eq!(a.indices[6..], [4, 5, 6, 4, 6, 7]);
    }
}
