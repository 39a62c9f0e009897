use super::{Fog, Parser};
use crate::{flags::WorldType, ContentResult};
use holocron_utils::color::RGBAf;
use log::*;
use std::io::BufRead;

#[derive(Debug, Clone, Copy)]
enum HeaderKey {
    Version,
    Gravity,
    CeilingSkyZ,
    HorizonDistance,
    HorizonPixelsPerRev,
    HorizonSkyOffset,
    CeilingSkyOffset,
    MipMapDistances,
    LodDistances,
    PerspectiveDistance,
    GouraudDistance,
    Fog,
}

const HEADER_KEYS: &[(&str, HeaderKey)] = &[
    ("VERSION", HeaderKey::Version),
    ("WORLD GRAVITY", HeaderKey::Gravity),
    ("CEILING SKY Z", HeaderKey::CeilingSkyZ),
    ("HORIZON DISTANCE", HeaderKey::HorizonDistance),
    ("HORIZON PIXELS PER REV", HeaderKey::HorizonPixelsPerRev),
    ("HORIZON SKY OFFSET", HeaderKey::HorizonSkyOffset),
    ("CEILING SKY OFFSET", HeaderKey::CeilingSkyOffset),
    ("MIPMAP DISTANCES", HeaderKey::MipMapDistances),
    ("LOD DISTANCES", HeaderKey::LodDistances),
    ("PERSPECTIVE DISTANCE", HeaderKey::PerspectiveDistance),
    ("GOURAUD DISTANCE", HeaderKey::GouraudDistance),
    ("FOG", HeaderKey::Fog),
];

impl<R: BufRead> Parser<R> {
    pub(super) fn parse_header(&mut self) -> ContentResult<()> {
        while let Some(line) = self.lines.next_in_section()? {
            let Some((key, args)) = line.keyword(HEADER_KEYS) else {
                trace!("Unknown header entry `{}` in `{}`", line.text(), self.lines.file());
                continue;
            };

            let header = &mut self.level.header;
            match key {
                HeaderKey::Version => {
                    header.version = args.int(0)?;
                    self.level.world_type = match header.version {
                        1 => WorldType::Jkdf2,
                        _ => WorldType::Ijim,
                    };
                    self.version_declared = true;
                }
                HeaderKey::Gravity => header.gravity = args.float(0)?,
                HeaderKey::CeilingSkyZ => header.ceiling_sky_z = args.float(0)?,
                HeaderKey::HorizonDistance => header.horizon_distance = args.float(0)?,
                HeaderKey::HorizonPixelsPerRev => header.horizon_pixels_per_rev = args.float(0)?,
                HeaderKey::HorizonSkyOffset => header.horizon_sky_offset = args.vec2(0)?,
                HeaderKey::CeilingSkyOffset => header.ceiling_sky_offset = args.vec2(0)?,
                HeaderKey::MipMapDistances => header.mipmap_distances = args.vec4(0)?,
                HeaderKey::LodDistances => header.lod_distances = args.vec4(0)?,
                HeaderKey::PerspectiveDistance => header.perspective_distance = args.float(0)?,
                HeaderKey::GouraudDistance => header.gouraud_distance = args.float(0)?,
                HeaderKey::Fog => {
                    let color = args.vec4(1)?;
                    header.fog = Some(Fog {
                        enabled: args.int(0)? != 0,
                        color: RGBAf::new(color.x, color.y, color.z, color.w),
                        start: args.float(5)?,
                        end: args.float(6)?,
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{flags::WorldType, jkl::tests::parse};

    #[test]
    fn ijim_header() {
        let level = parse(
            "SECTION: HEADER\nVersion 3\nWorld Gravity 1.2\nFog 1 0.5 0.5 0.5 1.0 2.0 20.0\nMystery line 42\n",
        )
        .unwrap();

        assert_eq!(level.world_type, WorldType::Ijim);
        let fog = level.header.fog.unwrap();
        assert!(fog.enabled);
        assert_eq!(fog.color.r, 0.5);
        assert_eq!((fog.start, fog.end), (2.0, 20.0));
    }

    #[test]
    fn geometry_needs_a_version() {
        let error = parse("SECTION: GEORESOURCE\nWorld vertices 0\n").unwrap_err();
        assert!(matches!(error, crate::ContentError::CorruptAsset { .. }));
    }
}
