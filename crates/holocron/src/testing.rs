//! A small game install, packed into an in-memory GOB

use crate::assets::AssetStore;
use holocron_content::{
    cmp::{ColorMapHeader, CMP_MAGIC, LIGHT_LEVELS, PALETTE_SIZE},
    jkl::Level,
    mat::{
        CelRecord, ColorFormat, ColorMode, MaterialHeader, MaterialKind, TextureCelRecord, TextureHeader,
        MAT_MAGIC,
    },
};
use holocron_gob::{GobWriter, Vfs};
use holocron_utils::packed::PackedWriteExt;
use std::io::{Cursor, Write};

/// A two node model, a textured quad under an empty root
pub const QUAD_3DO: &str = r#"
SECTION: HEADER
3DO 2.1

SECTION: MODELRESOURCE
MATERIALS 2
0: crate.mat
1: dflt.mat

SECTION: GEOMETRYDEF
RADIUS 0.5
INSERT OFFSET 0.0 0.0 0.1
GEOSETS 1
GEOSET 0
MESHES 1
MESH 0
NAME quad
RADIUS 0.25
VERTICES 4
# num: x y z intensity
0: 0.0 0.0 0.0 0.5
1: 1.0 0.0 0.0 1.0
2: 1.0 1.0 0.0 1.0
3: 0.0 1.0 0.0 1.0
TEXTURE VERTICES 4
0: 0.0 0.0
1: 32.0 0.0
2: 32.0 32.0
3: 0.0 32.0
VERTEX NORMALS
0: 0.0 0.0 1.0
1: 0.0 0.0 1.0
2: 0.0 0.0 1.0
3: 0.0 0.0 1.0
FACES 1
0: 0 0x0 4 3 0 0.25 4 0, 0 1, 1 2, 2 3, 3
FACE NORMALS
0: 0.0 0.0 1.0

SECTION: HIERARCHYDEF
HIERARCHY NODES 2
0: 0x0 0x1 -1 -1 1 -1 1 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 0.0 root
1: 0x0 0x1 0 0 -1 -1 0 0.0 0.0 1.0 0.0 90.0 0.0 0.1 0.0 0.0 lid
"#;

/// Lifts the `lid` node of the quad model and spins it past a half turn
pub const LID_OPEN_KEY: &str = r#"
SECTION: HEADER
FLAGS 0x0000
TYPE 0xFFFF
FRAMES 20
FPS 10.000
JOINTS 2

SECTION: MARKERS
MARKERS 1
10.000000 1

SECTION: KEYFRAME NODES
NODES 1

NODE 1
MESH NAME lid
ENTRIES 2
# num: frame flags x y z p y r
#      dx dy dz dp dy dr
1: 10 0x0000 0.0 0.0 1.5 0.0 300.0 0.0
       0.0 0.0 0.0 0.0 0.0 0.0
0: 0 0x0001 0.0 0.0 1.0 0.0 90.0 0.0
       0.0 0.0 0.05 0.0 21.0 0.0
"#;

/// Two sectors joined by a translucent adjoin, a sky ceiling in the second one
pub const TEST_JKL: &str = r#"
SECTION: HEADER
Version 1
World Gravity 4.00
Ceiling Sky Z 15.000000
Horizon Distance 200.000000
Horizon Pixels per Rev 768.000000
Horizon Sky Offset 0.000000 0.000000
Ceiling Sky Offset 0.500000 0.250000
MipMap Distances 1.0 2.0 3.0 4.0
LOD Distances 0.3 0.6 0.9 1.2
Perspective distance 2.000000
Gouraud distance 2.000000

SECTION: MATERIALS
World materials 3
0: floor.mat 1.000000 1.000000
1: wall.mat  1.000000 1.000000
2: gray.mat  1.000000 1.000000
end

SECTION: GEORESOURCE
World Colormaps 1
0: dflt.cmp

World vertices 7
0: 0.0 0.0 0.0
1: 1.0 0.0 0.0
2: 1.0 1.0 0.0
3: 0.0 1.0 0.0
4: 1.0 0.0 1.0
5: 2.0 0.0 0.0
6: 2.0 1.0 0.0

World texture vertices 4
0: 0.0 0.0
1: 64.0 0.0
2: 64.0 64.0
3: 0.0 64.0

World adjoins 2
0: 0x7 1 0.00
1: 0x7 0 0.00

World surfaces 4
0: 0 0x4 0x0 4 3 4 -1 0.0 4 0,0 1,1 2,2 3,3 0.1 0.2 0.3 0.4
1: 1 0x4 0x2 4 3 4 0 0.0 3 1,0 4,1 2,2 1.0 1.0 1.0
2: 1 0x4 0x2 4 3 4 1 0.0 3 1,0 2,2 4,1 1.0 1.0 1.0
3: 2 0x404 0x0 4 3 4 -1 0.0 4 1,0 5,1 6,2 2,3 1.0 1.0 1.0 1.0
0: 0.0 0.0 1.0
1: -1.0 0.0 0.0
2: 1.0 0.0 0.0
3: 0.0 0.0 -1.0

SECTION: SECTORS
World sectors 2

SECTOR 0
FLAGS 0x0
AMBIENT LIGHT 0.5
EXTRA LIGHT 0.0
COLORMAP 0
TINT 0.1 0.2 0.3
BOUNDBOX 0.0 0.0 0.0 1.0 1.0 1.0
CENTER 0.5 0.5 0.5
RADIUS 0.9
VERTICES 4
0: 0
1: 1
2: 2
3: 3
SURFACES 0 2

SECTOR 1
FLAGS 0x2
AMBIENT LIGHT 1.0
EXTRA LIGHT 0.0
THRUST 0.0 0.0 1.0
VERTICES 4
0: 1
1: 5
2: 6
3: 2
SURFACES 2 2

SECTION: MODELS
World models 1
0: crate.3do
end

SECTION: TEMPLATES
World templates 3
_base none type=actor mass=50
_walker _base move=physics collide=1 size=0.065 mass=50
_decor none type=cog collide=1 size=0.1 move=none
end

SECTION: THINGS
World things 6
0: _decor crate 0.5 0.5 0.0 0.0 0.0 0.0 0 model3d=crate.3do puppet=crate.pup
1: _walker guard 1.5 0.5 0.0 0.0 90.0 0.0 1 mass=99
2: _decor torch 0.2 0.2 0.5 0.0 0.0 0.0 0 type=sprite sprite=torch.spr collide=0
3: _decor nosprite 0.3 0.3 0.5 0.0 0.0 0.0 0 type=sprite
4: _decor ghost 0.4 0.4 0.0 0.0 0.0 0.0 1 model3d=missing.3do collide=3
5: _decor lost 0.0 0.0 0.0 0.0 0.0 0.0 7
end
"#;

const CRATE_PUP: &str = "mode=0\nstand lidopen.key 0x0000 0 0\nend\n";
const TORCH_SPR: &str = "# torch flame\ngray.mat 0 0.05 0.1 4 0 0 2.0 0.0 0.0 0.01\n";

/// Gray ramp palette, identity light levels
pub fn colormap_bytes() -> Vec<u8> {
    let mut data = vec![];
    data.write_packed(ColorMapHeader {
        magic: CMP_MAGIC,
        version: 0x1E,
        flags: 0,
        reserved: [0; 52],
    })
    .unwrap();
    for i in 0..PALETTE_SIZE {
        data.write_all(&[i as u8; 3]).unwrap();
    }
    for _ in 0..LIGHT_LEVELS {
        data.extend((0..PALETTE_SIZE).map(|i| i as u8));
    }
    data
}

/// Single frame indexed texture, filled with one palette index
pub fn material_bytes(width: u32, height: u32, index: u8) -> Vec<u8> {
    let mut data = vec![];
    data.write_packed(MAT_MAGIC).unwrap();
    data.write_packed(MaterialHeader {
        version: 0x32,
        kind: MaterialKind::Texture,
        cel_count: 1,
        texture_count: 1,
        format: ColorFormat {
            mode: ColorMode::Indexed,
            bits_per_pixel: 8,
            red_bits: 0,
            green_bits: 0,
            blue_bits: 0,
            red_shift: 0,
            green_shift: 0,
            blue_shift: 0,
            red_expand: 0,
            green_expand: 0,
            blue_expand: 0,
            alpha_bits: 0,
            alpha_shift: 0,
            alpha_expand: 0,
        },
    })
    .unwrap();
    data.write_packed(CelRecord {
        kind: 8,
        color_index: 0,
        unknown: [0x3F800000; 4],
    })
    .unwrap();
    data.write_packed(TextureCelRecord {
        unknown: [0; 2],
        marker: 0xBFF78482,
        texture_index: 0,
    })
    .unwrap();
    data.write_packed(TextureHeader {
        width,
        height,
        transparent: 0,
        padding: [0; 2],
        mip_levels: 1,
    })
    .unwrap();
    data.write_all(&vec![index; (width * height) as usize]).unwrap();
    data
}

pub fn fixture_gob() -> Vec<u8> {
    let mut writer = GobWriter::new();
    writer
        .add("jkl\\test.jkl", TEST_JKL.as_bytes().to_vec())
        .add("3do\\crate.3do", QUAD_3DO.as_bytes().to_vec())
        .add("3do\\key\\lidopen.key", LID_OPEN_KEY.as_bytes().to_vec())
        .add("3do\\mat\\crate.mat", material_bytes(32, 32, 40))
        .add("3do\\mat\\dflt.mat", material_bytes(2, 2, 1))
        .add("mat\\floor.mat", material_bytes(4, 2, 80))
        .add("mat\\wall.mat", material_bytes(2, 2, 120))
        .add("mat\\gray.mat", material_bytes(2, 2, 128))
        .add("misc\\cmp\\dflt.cmp", colormap_bytes())
        .add("misc\\pup\\crate.pup", CRATE_PUP.as_bytes().to_vec())
        .add("misc\\spr\\torch.spr", TORCH_SPR.as_bytes().to_vec());

    let mut bytes = vec![];
    writer.write_to(&mut bytes).unwrap();
    bytes
}

pub fn fixture_store() -> AssetStore {
    let mut vfs = Vfs::new();
    assert!(vfs.add_container_reader("fixture.gob", Cursor::new(fixture_gob())).unwrap());
    AssetStore::new(vfs)
}

pub fn fixture_level(store: &mut AssetStore) -> Level {
    store.load_level("test.jkl").unwrap()
}
