//! Hierarchical models (`.3do`)
//!
//! A model has a list of materials, one or more geosets (levels of detail) made of meshes, and
//! a hierarchy of nodes. Each node optionally displays one mesh of a geoset, nodes reference
//! their parent, first child and next sibling by index.

use crate::{
    flags::{clamp_mode, FaceFlags, GeoMode, LightMode},
    tokenizer::{lookup_section, Args, Line, LineReader, COMMA_SEPARATED},
    ContentError, ContentResult,
};
use glam::{Vec2, Vec3};
use holocron_utils::color::RGBAf;
use log::*;
use smallvec::SmallVec;
use std::io::BufRead;

/// Oldest supported model version
pub const MIN_VERSION: f32 = 2.1;
/// Newest supported model version
pub const MAX_VERSION: f32 = 2.3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceVertex {
    pub vertex: usize,
    pub texture_vertex: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Face {
    /// Index into [`Model::materials`]
    pub material: Option<usize>,
    pub face_flags: FaceFlags,
    pub geo_mode: GeoMode,
    pub light_mode: LightMode,
    pub texture_mode: i32,
    pub extra_light: RGBAf,
    pub vertices: SmallVec<[FaceVertex; 4]>,
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub name: String,
    pub radius: f32,
    pub vertices: Vec<Vec3>,
    pub vertex_colors: Vec<RGBAf>,
    pub texture_vertices: Vec<Vec2>,
    pub vertex_normals: Vec<Vec3>,
    pub faces: Vec<Face>,
    pub face_normals: Vec<Vec3>,
}

#[derive(Debug, Clone, Default)]
pub struct Geoset {
    pub meshes: Vec<Mesh>,
}

#[derive(Debug, Clone, Default)]
pub struct HierarchyNode {
    pub name: String,
    pub flags: u32,
    pub kind: u32,
    /// Mesh index inside a geoset
    pub mesh: Option<usize>,
    pub parent: Option<usize>,
    pub child: Option<usize>,
    pub sibling: Option<usize>,
    pub child_count: usize,
    pub position: Vec3,
    /// Pitch, yaw and roll, in degrees
    pub orientation: Vec3,
    pub pivot: Vec3,
}

#[derive(Debug, Clone, Default)]
pub struct Model {
    pub name: String,
    pub version: f32,
    pub materials: Vec<String>,
    pub radius: f32,
    pub insert_offset: Vec3,
    pub geosets: Vec<Geoset>,
    pub hierarchy: Vec<HierarchyNode>,
}

impl Model {
    pub fn parse(name: &str, reader: impl BufRead) -> ContentResult<Model> {
        let mut parser = Parser {
            lines: LineReader::new(name, reader).with_separators(COMMA_SEPARATED),
            model: Model {
                name: name.to_string(),
                ..Default::default()
            },
            version_declared: false,
            geoset: None,
            mesh: None,
        };

        parser.run()?;
        parser.model.validate_hierarchy()?;

        let model = parser.model;
        debug!(
            "Parsed model `{name}`: version {}, {} geosets, {} nodes",
            model.version,
            model.geosets.len(),
            model.hierarchy.len()
        );
        Ok(model)
    }

    /// Whether vertex colors and face light are stored as RGBA
    pub fn has_rgb_colors(&self) -> bool {
        self.version > MIN_VERSION
    }

    /// Indices of the nodes without a parent
    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.hierarchy
            .iter()
            .enumerate()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(index, _)| index)
    }

    /// Slash-separated names of the nodes from a root down to `index`
    pub fn node_path(&self, index: usize) -> Option<String> {
        let mut names = vec![];
        let mut current = Some(index);
        while let Some(index) = current {
            let node = self.hierarchy.get(index)?;
            names.push(node.name.as_str());
            current = node.parent;
            if names.len() > self.hierarchy.len() {
                return None;
            }
        }
        names.reverse();
        Some(names.join("/"))
    }

    /// Finds a node by name, case-insensitively.
    pub fn find_node(&self, name: &str) -> Option<usize> {
        self.hierarchy
            .iter()
            .position(|node| node.name.eq_ignore_ascii_case(name))
    }

    /// Makes sure the hierarchy is a forest: all links point at existing nodes, no node is its
    /// own ancestor, and meshes exist in every geoset.
    fn validate_hierarchy(&self) -> ContentResult<()> {
        let count = self.hierarchy.len();
        let broken = |reason: String| ContentError::reference(self.name.as_str(), reason);

        for (index, node) in self.hierarchy.iter().enumerate() {
            for (what, link) in [
                ("parent", node.parent),
                ("child", node.child),
                ("sibling", node.sibling),
            ] {
                if let Some(link) = link {
                    if link >= count || link == index {
                        return Err(broken(format!("node {index} has an invalid {what} {link}")));
                    }
                }
            }

            if let Some(mesh) = node.mesh {
                if let Some(geoset) = self.geosets.iter().find(|g| mesh >= g.meshes.len()) {
                    return Err(broken(format!(
                        "node {index} shows mesh {mesh}, but a geoset only has {}",
                        geoset.meshes.len()
                    )));
                }
            }

            // Walk up, a valid chain reaches a root in fewer steps than there are nodes
            let mut steps = 0;
            let mut current = node.parent;
            while let Some(parent) = current {
                steps += 1;
                if steps > count {
                    return Err(broken(format!("node {index} is its own ancestor")));
                }
                current = self.hierarchy[parent].parent;
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum ModelSection {
    Header,
    ModelResource,
    GeometryDef,
    HierarchyDef,
}

const SECTIONS: &[(&str, ModelSection)] = &[
    ("HEADER", ModelSection::Header),
    ("MODELRESOURCE", ModelSection::ModelResource),
    ("GEOMETRYDEF", ModelSection::GeometryDef),
    ("HIERARCHYDEF", ModelSection::HierarchyDef),
];

#[derive(Debug, Clone, Copy)]
enum GeometryKey {
    Radius,
    InsertOffset,
    Geosets,
    Geoset,
    Meshes,
    Mesh,
    Name,
    Vertices,
    TextureVertices,
    VertexNormals,
    Faces,
    FaceNormals,
}

const GEOMETRY_KEYS: &[(&str, GeometryKey)] = &[
    ("RADIUS", GeometryKey::Radius),
    ("INSERT OFFSET", GeometryKey::InsertOffset),
    ("GEOSETS", GeometryKey::Geosets),
    ("GEOSET", GeometryKey::Geoset),
    ("MESHES", GeometryKey::Meshes),
    ("MESH", GeometryKey::Mesh),
    ("NAME", GeometryKey::Name),
    ("VERTICES", GeometryKey::Vertices),
    ("TEXTURE VERTICES", GeometryKey::TextureVertices),
    ("VERTEX NORMALS", GeometryKey::VertexNormals),
    ("FACES", GeometryKey::Faces),
    ("FACE NORMALS", GeometryKey::FaceNormals),
];

struct Parser<R> {
    lines: LineReader<R>,
    model: Model,
    version_declared: bool,
    geoset: Option<usize>,
    mesh: Option<usize>,
}

impl<R: BufRead> Parser<R> {
    fn run(&mut self) -> ContentResult<()> {
        while let Some(line) = self.lines.next_line()? {
            let Some(name) = line.section_name() else {
                continue;
            };

            match lookup_section(&name, SECTIONS) {
                Some(ModelSection::Header) => self.parse_header()?,
                Some(ModelSection::ModelResource) => self.parse_resources()?,
                Some(ModelSection::GeometryDef) => {
                    self.require_version("GEOMETRYDEF")?;
                    self.parse_geometry()?;
                }
                Some(ModelSection::HierarchyDef) => self.parse_hierarchy()?,
                None => {
                    trace!("Skipping section `{name}` of `{}`", self.lines.file());
                    self.lines.skip_section()?;
                }
            }
        }

        Ok(())
    }

    fn require_version(&self, section: &str) -> ContentResult<()> {
        if self.version_declared {
            Ok(())
        } else {
            Err(ContentError::corrupt(
                self.lines.file(),
                format!("section {section} appears before the model version is declared"),
            ))
        }
    }

    fn parse_header(&mut self) -> ContentResult<()> {
        while let Some(line) = self.lines.next_in_section()? {
            let Some((_, args)) = line.keyword(&[("3DO", ())]) else {
                continue;
            };

            let version = args.float(0)?;
            if !(MIN_VERSION..=MAX_VERSION).contains(&version) {
                return Err(ContentError::unsupported(
                    self.lines.file(),
                    format!("model version {version} isn't supported"),
                ));
            }
            self.model.version = version;
            self.version_declared = true;
        }
        Ok(())
    }

    fn parse_resources(&mut self) -> ContentResult<()> {
        while let Some(line) = self.lines.next_in_section()? {
            let Some((_, args)) = line.keyword(&[("MATERIALS", ())]) else {
                continue;
            };

            let count = args.uint(0)? as usize;
            let materials = &mut self.model.materials;
            *materials = vec![String::new(); count];
            for _ in 0..count {
                let line = self.lines.expect_in_section("material")?;
                let (index, name) = material_entry(&line)?;
                let slot = materials.get_mut(index).ok_or_else(|| {
                    line.error(format!("material index {index} is out of range ({count})"))
                })?;
                *slot = name.to_string();
            }
        }
        Ok(())
    }

    fn parse_geometry(&mut self) -> ContentResult<()> {
        let rgb = self.model.has_rgb_colors();

        while let Some(line) = self.lines.next_in_section()? {
            let Some((key, args)) = line.keyword(GEOMETRY_KEYS) else {
                trace!("Unknown geometry entry `{}` in `{}`", line.text(), self.lines.file());
                continue;
            };

            match key {
                GeometryKey::Radius => {
                    let radius = args.float(0)?;
                    match self.mesh {
                        Some(_) => self.current_mesh(&line)?.radius = radius,
                        None => self.model.radius = radius,
                    }
                }
                GeometryKey::InsertOffset => self.model.insert_offset = args.vec3(0)?,
                GeometryKey::Geosets => {
                    self.model.geosets = vec![Geoset::default(); args.uint(0)? as usize];
                }
                GeometryKey::Geoset => {
                    let index = args.uint(0)? as usize;
                    if index >= self.model.geosets.len() {
                        return Err(line.error(format!("geoset {index} wasn't declared")));
                    }
                    self.geoset = Some(index);
                    self.mesh = None;
                }
                GeometryKey::Meshes => {
                    let count = args.uint(0)? as usize;
                    self.current_geoset(&line)?.meshes = vec![Mesh::default(); count];
                }
                GeometryKey::Mesh => {
                    let index = args.uint(0)? as usize;
                    if index >= self.current_geoset(&line)?.meshes.len() {
                        return Err(line.error(format!("mesh {index} wasn't declared")));
                    }
                    self.mesh = Some(index);
                }
                GeometryKey::Name => self.current_mesh(&line)?.name = args.str(0)?.to_string(),
                GeometryKey::Vertices => {
                    let count = args.uint(0)? as usize;
                    let mesh = mesh_mut(&mut self.model, self.geoset, self.mesh, &line)?;
                    mesh.vertices = vec![Vec3::ZERO; count];
                    mesh.vertex_colors = vec![RGBAf::WHITE; count];
                    self.lines.read_indexed(count, "vertex", |index, args| {
                        mesh.vertices[index] = args.vec3(0)?;
                        mesh.vertex_colors[index] = if rgb {
                            let c = args.vec4(3)?;
                            RGBAf::new(c.x, c.y, c.z, c.w).clamped()
                        } else {
                            RGBAf::from_intensity(args.float(3)?).clamped()
                        };
                        Ok(())
                    })?;
                }
                GeometryKey::TextureVertices => {
                    let count = args.uint(0)? as usize;
                    let mesh = mesh_mut(&mut self.model, self.geoset, self.mesh, &line)?;
                    mesh.texture_vertices = vec![Vec2::ZERO; count];
                    self.lines.read_indexed(count, "texture vertex", |index, args| {
                        mesh.texture_vertices[index] = args.vec2(0)?;
                        Ok(())
                    })?;
                }
                GeometryKey::VertexNormals => {
                    let mesh = mesh_mut(&mut self.model, self.geoset, self.mesh, &line)?;
                    let count = mesh.vertices.len();
                    mesh.vertex_normals = vec![Vec3::ZERO; count];
                    self.lines.read_indexed(count, "vertex normal", |index, args| {
                        mesh.vertex_normals[index] = args.vec3(0)?;
                        Ok(())
                    })?;
                }
                GeometryKey::Faces => {
                    let count = args.uint(0)? as usize;
                    let material_count = self.model.materials.len();
                    let mesh = mesh_mut(&mut self.model, self.geoset, self.mesh, &line)?;
                    let mut faces = vec![None; count];
                    self.lines.read_indexed(count, "face", |index, args| {
                        faces[index] = Some(parse_face(mesh, material_count, rgb, index, args)?);
                        Ok(())
                    })?;
                    // Duplicate indices leave holes
                    mesh.faces = faces
                        .into_iter()
                        .enumerate()
                        .map(|(index, face)| {
                            face.ok_or_else(|| line.error(format!("face {index} is missing")))
                        })
                        .collect::<ContentResult<_>>()?;
                }
                GeometryKey::FaceNormals => {
                    let mesh = mesh_mut(&mut self.model, self.geoset, self.mesh, &line)?;
                    let count = mesh.faces.len();
                    mesh.face_normals = vec![Vec3::ZERO; count];
                    self.lines.read_indexed(count, "face normal", |index, args| {
                        mesh.face_normals[index] = args.vec3(0)?;
                        Ok(())
                    })?;
                }
            }
        }

        Ok(())
    }

    fn parse_hierarchy(&mut self) -> ContentResult<()> {
        while let Some(line) = self.lines.next_in_section()? {
            let Some((_, args)) = line.keyword(&[("HIERARCHY NODES", ())]) else {
                continue;
            };

            let count = args.uint(0)? as usize;
            let nodes = &mut self.model.hierarchy;
            *nodes = vec![HierarchyNode::default(); count];
            self.lines.read_indexed(count, "hierarchy node", |index, args| {
                nodes[index] = HierarchyNode {
                    flags: args.hex(0)?,
                    kind: args.hex(1)?,
                    mesh: args.optional_index(2)?,
                    parent: args.optional_index(3)?,
                    child: args.optional_index(4)?,
                    sibling: args.optional_index(5)?,
                    child_count: args.uint(6)? as usize,
                    position: args.vec3(7)?,
                    orientation: args.vec3(10)?,
                    pivot: args.vec3(13)?,
                    name: args.str(16)?.to_string(),
                };
                Ok(())
            })?;
        }
        Ok(())
    }

    fn current_geoset(&mut self, line: &Line) -> ContentResult<&mut Geoset> {
        self.geoset
            .and_then(|index| self.model.geosets.get_mut(index))
            .ok_or_else(|| line.error("entry appears outside of a geoset"))
    }

    fn current_mesh(&mut self, line: &Line) -> ContentResult<&mut Mesh> {
        mesh_mut(&mut self.model, self.geoset, self.mesh, line)
    }
}

fn mesh_mut<'m>(
    model: &'m mut Model,
    geoset: Option<usize>,
    mesh: Option<usize>,
    line: &Line,
) -> ContentResult<&'m mut Mesh> {
    geoset
        .zip(mesh)
        .and_then(|(geoset, mesh)| model.geosets.get_mut(geoset)?.meshes.get_mut(mesh))
        .ok_or_else(|| line.error("entry appears outside of a mesh"))
}

/// Material entries are `idx: name`, sometimes written without a space after the colon.
fn material_entry(line: &Line) -> ContentResult<(usize, &str)> {
    let args = line.args();
    if args.len() >= 2 {
        return Ok((args.index(0)?, args.str(1)?));
    }

    let token = args.str(0)?;
    let (index, name) = token
        .split_once(':')
        .ok_or_else(|| line.error(format!("`{token}` isn't a material entry")))?;
    let index = index
        .parse()
        .map_err(|_| line.error(format!("`{index}` isn't a valid record index")))?;
    Ok((index, name))
}

/// `material type geo light tex extralight count v,tv v,tv...`
fn parse_face(
    mesh: &Mesh,
    material_count: usize,
    rgb: bool,
    index: usize,
    args: Args<'_>,
) -> ContentResult<Face> {
    let line = args.line();
    let broken = |reason: String| ContentError::reference(line.file(), reason);

    let material = args.optional_index(0)?;
    if let Some(material) = material {
        if material >= material_count {
            return Err(broken(format!("face {index} uses unknown material {material}")));
        }
    }

    let context = format!("face {index}");
    let extra_light = if rgb {
        parse_light_tuple(args, 5)?
    } else {
        RGBAf::from_intensity(args.float(5)?).clamped()
    };

    let count = args.uint(6)? as usize;
    let pairs = args.skip(7);
    let mut vertices = SmallVec::with_capacity(count);
    for i in 0..count {
        let vertex = pairs.uint(i * 2)? as usize;
        if vertex >= mesh.vertices.len() {
            return Err(broken(format!("face {index} uses unknown vertex {vertex}")));
        }

        let texture_vertex = pairs.optional_index(i * 2 + 1)?;
        if let Some(tv) = texture_vertex {
            if tv >= mesh.texture_vertices.len() {
                return Err(broken(format!("face {index} uses unknown texture vertex {tv}")));
            }
        }

        vertices.push(FaceVertex {
            vertex,
            texture_vertex,
        });
    }

    Ok(Face {
        material,
        face_flags: FaceFlags::from_bits_truncate(args.hex(1)?),
        geo_mode: clamp_mode(args.uint(2)?, GeoMode::LAST, &context),
        light_mode: clamp_mode(args.uint(3)?, LightMode::LAST, &context),
        texture_mode: args.int(4)?,
        extra_light,
        vertices,
    })
}

/// `(r/g/b/a)` light value of newer models
fn parse_light_tuple(args: Args<'_>, i: usize) -> ContentResult<RGBAf> {
    let token = args.str(i)?;
    let invalid = || args.line().error(format!("`{token}` isn't a valid light value"));

    let channels = token
        .trim_matches(|c| c == '(' || c == ')')
        .split('/')
        .map(|c| c.parse::<f32>().map_err(|_| invalid()))
        .collect::<ContentResult<SmallVec<[f32; 4]>>>()?;

    match channels[..] {
        [r, g, b, a] => Ok(RGBAf::new(r, g, b, a).clamped()),
        _ => Err(invalid()),
    }
}
