use bevy::prelude::*;
use bevy::render::mesh::{PrimitiveTopology, VertexAttributeValues};

const INTERSECT_EPSILON: f32 = 1e-7;

/// Nearest surface intersection along a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub point: Vec3,
    /// Unit face normal, oriented against the incoming ray.
    pub normal: Vec3,
    pub distance: f32,
}

#[derive(Debug, Clone, Copy)]
struct SurfaceTriangle {
    a: Vec3,
    b: Vec3,
    c: Vec3,
}

/// One source mesh baked into world space, with its bounds for early rejection.
#[derive(Debug, Clone, Default)]
struct SurfacePart {
    triangles: Vec<SurfaceTriangle>,
    min: Vec3,
    max: Vec3,
}

impl SurfacePart {
    fn from_triangles(triangles: Vec<SurfaceTriangle>) -> Self {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for tri in &triangles {
            for v in [tri.a, tri.b, tri.c] {
                min = min.min(v);
                max = max.max(v);
            }
        }
        Self {
            triangles,
            min,
            max,
        }
    }
}

/// World-space triangle soup of the loaded scan, shared by every tool that
/// needs to land a screen position on the anatomy.
#[derive(Resource, Debug, Clone, Default)]
pub struct SurfaceMesh {
    parts: Vec<SurfacePart>,
}

impl SurfaceMesh {
    /// Build a single-part surface from world-space triangles.
    pub fn from_triangles(triangles: impl IntoIterator<Item = [Vec3; 3]>) -> Self {
        let mut surface = Self::default();
        surface.push_part(triangles);
        surface
    }

    /// Append a triangle list, returning how many triangles were accepted.
    pub fn push_part(&mut self, triangles: impl IntoIterator<Item = [Vec3; 3]>) -> usize {
        let triangles: Vec<SurfaceTriangle> = triangles
            .into_iter()
            .map(|[a, b, c]| SurfaceTriangle { a, b, c })
            .filter(|tri| (tri.b - tri.a).cross(tri.c - tri.a).length_squared() > 0.0)
            .collect();
        let count = triangles.len();
        if count > 0 {
            self.parts.push(SurfacePart::from_triangles(triangles));
        }
        count
    }

    /// Bake a render mesh into world space and append it.
    ///
    /// Only triangle lists with `Float32x3` positions are read; anything else
    /// is skipped and reported as zero triangles.
    pub fn push_mesh(&mut self, mesh: &Mesh, transform: &GlobalTransform) -> usize {
        if mesh.primitive_topology() != PrimitiveTopology::TriangleList {
            return 0;
        }
        let Some(VertexAttributeValues::Float32x3(positions)) =
            mesh.attribute(Mesh::ATTRIBUTE_POSITION)
        else {
            return 0;
        };

        let world: Vec<Vec3> = positions
            .iter()
            .map(|p| transform.transform_point(Vec3::from_array(*p)))
            .collect();

        let indices: Vec<usize> = match mesh.indices() {
            Some(indices) => indices.iter().collect(),
            None => (0..world.len()).collect(),
        };

        let triangles = indices.chunks_exact(3).filter_map(|tri| {
            Some([
                *world.get(tri[0])?,
                *world.get(tri[1])?,
                *world.get(tri[2])?,
            ])
        });
        self.push_part(triangles)
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.parts.iter().map(|part| part.triangles.len()).sum()
    }

    /// Axis-aligned bounds of the whole surface.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        self.parts.iter().fold(None, |acc, part| match acc {
            None => Some((part.min, part.max)),
            Some((min, max)) => Some((min.min(part.min), max.max(part.max))),
        })
    }

    /// Nearest intersection of the ray with any triangle of the surface.
    pub fn cast_ray(&self, ray: Ray3d) -> Option<SurfaceHit> {
        let direction = *ray.direction;
        let mut nearest: Option<(f32, &SurfaceTriangle)> = None;

        for part in &self.parts {
            let Some(entry) = ray_aabb_hit_t(ray.origin, direction, part.min, part.max) else {
                continue;
            };
            if nearest.is_some_and(|(t, _)| entry > t) {
                continue;
            }
            for tri in &part.triangles {
                let Some(t) = ray_triangle_intersect(ray.origin, direction, tri) else {
                    continue;
                };
                if nearest.is_none_or(|(best, _)| t < best) {
                    nearest = Some((t, tri));
                }
            }
        }

        let (t, tri) = nearest?;
        let mut normal = (tri.b - tri.a).cross(tri.c - tri.a).normalize_or_zero();
        if normal.dot(direction) > 0.0 {
            normal = -normal;
        }

        Some(SurfaceHit {
            point: ray.origin + direction * t,
            normal,
            distance: t,
        })
    }
}

/// Lift applied to every drawn point so strokes stay visible above the scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceOffset {
    pub current_zoom: f32,
    pub offset_factor: f32,
}

impl SurfaceOffset {
    pub fn distance(&self) -> f32 {
        self.current_zoom * self.offset_factor
    }

    pub fn apply(&self, hit: &SurfaceHit) -> Vec3 {
        hit.point + hit.normal * self.distance()
    }
}

/// Möller–Trumbore. Returns the ray parameter of a front or back face hit.
fn ray_triangle_intersect(origin: Vec3, direction: Vec3, tri: &SurfaceTriangle) -> Option<f32> {
    let edge1 = tri.b - tri.a;
    let edge2 = tri.c - tri.a;
    let h = direction.cross(edge2);
    let det = edge1.dot(h);
    if det.abs() < INTERSECT_EPSILON {
        return None;
    }

    let inv_det = 1.0 / det;
    let s = origin - tri.a;
    let u = inv_det * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = inv_det * direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = inv_det * edge2.dot(q);
    (t > INTERSECT_EPSILON).then_some(t)
}

/// Slab test; returns the entry distance, or zero when the origin is inside.
fn ray_aabb_hit_t(origin: Vec3, direction: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let mut tmin = f32::NEG_INFINITY;
    let mut tmax = f32::INFINITY;

    for axis in 0..3 {
        let o = origin[axis];
        let d = direction[axis];
        if d.abs() < f32::EPSILON {
            if o < min[axis] || o > max[axis] {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d;
        let mut t0 = (min[axis] - o) * inv;
        let mut t1 = (max[axis] - o) * inv;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        tmin = tmin.max(t0);
        tmax = tmax.min(t1);
        if tmax < tmin {
            return None;
        }
    }

    if tmax < 0.0 {
        return None;
    }
    Some(tmin.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::render::mesh::Indices;
    use bevy::render::render_asset::RenderAssetUsages;

    fn unit_square(z: f32) -> [[Vec3; 3]; 2] {
        [
            [
                Vec3::new(-1.0, -1.0, z),
                Vec3::new(1.0, -1.0, z),
                Vec3::new(1.0, 1.0, z),
            ],
            [
                Vec3::new(-1.0, -1.0, z),
                Vec3::new(1.0, 1.0, z),
                Vec3::new(-1.0, 1.0, z),
            ],
        ]
    }

    fn down_ray(x: f32, y: f32) -> Ray3d {
        Ray3d::new(Vec3::new(x, y, 5.0), Dir3::NEG_Z)
    }

    #[test]
    fn hit_reports_point_and_normal_facing_ray() {
        let surface = SurfaceMesh::from_triangles(unit_square(0.0));
        let hit = surface.cast_ray(down_ray(0.25, -0.5)).unwrap();

        assert!((hit.point - Vec3::new(0.25, -0.5, 0.0)).length() < 1e-5);
        assert!((hit.normal - Vec3::Z).length() < 1e-5);
        assert!((hit.distance - 5.0).abs() < 1e-5);
    }

    #[test]
    fn back_face_normal_is_flipped_towards_viewer() {
        let reversed = unit_square(0.0).map(|[a, b, c]| [a, c, b]);
        let surface = SurfaceMesh::from_triangles(reversed);
        let hit = surface.cast_ray(down_ray(0.0, 0.2)).unwrap();
        assert!(hit.normal.z > 0.99);
    }

    #[test]
    fn miss_outside_surface() {
        let surface = SurfaceMesh::from_triangles(unit_square(0.0));
        assert!(surface.cast_ray(down_ray(3.0, 0.0)).is_none());
        let away = Ray3d::new(Vec3::new(0.0, 0.0, 5.0), Dir3::Z);
        assert!(surface.cast_ray(away).is_none());
    }

    #[test]
    fn nearest_of_stacked_parts_wins() {
        let mut surface = SurfaceMesh::from_triangles(unit_square(0.0));
        surface.push_part(unit_square(1.5));
        let hit = surface.cast_ray(down_ray(0.1, 0.1)).unwrap();
        assert!((hit.point.z - 1.5).abs() < 1e-5);
        assert_eq!(surface.triangle_count(), 4);
    }

    #[test]
    fn offset_lifts_along_normal() {
        let surface = SurfaceMesh::from_triangles(unit_square(0.0));
        let hit = surface.cast_ray(down_ray(0.0, 0.0)).unwrap();
        let offset = SurfaceOffset {
            current_zoom: 300.0,
            offset_factor: 0.0001,
        };
        let lifted = offset.apply(&hit);
        assert!((lifted.z - 0.03).abs() < 1e-5);
    }

    #[test]
    fn mesh_is_baked_with_transform() {
        let mut mesh = Mesh::new(
            PrimitiveTopology::TriangleList,
            RenderAssetUsages::MAIN_WORLD,
        );
        mesh.insert_attribute(
            Mesh::ATTRIBUTE_POSITION,
            vec![[-1.0, -1.0, 0.0], [1.0, -1.0, 0.0], [0.0, 1.0, 0.0]],
        );
        mesh.insert_indices(Indices::U32(vec![0, 1, 2]));

        let mut surface = SurfaceMesh::default();
        let transform = GlobalTransform::from(Transform::from_xyz(0.0, 0.0, 2.0));
        assert_eq!(surface.push_mesh(&mesh, &transform), 1);

        let hit = surface.cast_ray(down_ray(0.0, 0.0)).unwrap();
        assert!((hit.point.z - 2.0).abs() < 1e-5);
        let (min, max) = surface.bounds().unwrap();
        assert!((min.z - 2.0).abs() < 1e-5 && (max.z - 2.0).abs() < 1e-5);
    }
}
