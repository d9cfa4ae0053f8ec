//! SpimData XML descriptor.
//!
//! BigDataViewer and BigStitcher open a dataset through an XML file that
//! describes the view setups (one per channel × illumination × tile × angle),
//! the timepoints, the image loader, and the registration of every view.
//!
//! # Example Output
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <SpimData version="0.2">
//!   <BasePath type="relative">.</BasePath>
//!   <SequenceDescription>
//!     <ImageLoader format="bdv.n5" version="1.0">
//!       <n5 type="relative">dataset.n5</n5>
//!     </ImageLoader>
//!     <ViewSetups>
//!       <ViewSetup>
//!         <id>0</id>
//!         ...
//!       </ViewSetup>
//!     </ViewSetups>
//!     <Timepoints type="range">
//!       <first>0</first>
//!       <last>0</last>
//!     </Timepoints>
//!   </SequenceDescription>
//!   <ViewRegistrations>
//!     ...
//!   </ViewRegistrations>
//! </SpimData>
//! ```

use std::fmt::Write;

use quick_xml::escape::escape;

use super::transform::AffineTransform;

/// A view setup entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSetupEntry {
    pub id: usize,

    /// Size of the full resolution image `(x, y, z)`
    pub size: [u64; 3],

    /// Physical size of one voxel `(x, y, z)`
    pub voxel_size: [f64; 3],

    pub voxel_unit: String,

    pub channel: usize,
    pub illumination: usize,
    pub tile: usize,
    pub angle: usize,
}

/// A named transform in a view registration.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedTransform {
    pub name: String,
    pub affine: AffineTransform,
}

/// Registration of one view (setup at a timepoint).
///
/// Transforms are listed outermost first: the last entry is applied first.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewRegistrationEntry {
    pub timepoint: usize,
    pub setup: usize,
    pub transforms: Vec<NamedTransform>,
}

/// Names of the entries of every view attribute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeNames {
    pub channels: Vec<String>,
    pub illuminations: Vec<String>,
    pub tiles: Vec<String>,
    pub angles: Vec<String>,
}

/// Everything the descriptor records.
#[derive(Debug, Clone, PartialEq)]
pub struct SpimDataDescriptor {
    /// Path of the N5 container relative to the XML file
    pub n5_path: String,
    pub setups: Vec<ViewSetupEntry>,
    pub registrations: Vec<ViewRegistrationEntry>,
    pub attributes: AttributeNames,
    pub ntimes: usize,
}

impl SpimDataDescriptor {
    /// Render the descriptor as XML.
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        // Writing into a String cannot fail
        let _ = self.write_xml(&mut xml);
        xml
    }

    fn write_xml(&self, xml: &mut String) -> std::fmt::Result {
        writeln!(xml, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(xml, r#"<SpimData version="0.2">"#)?;
        writeln!(xml, r#"  <BasePath type="relative">.</BasePath>"#)?;
        writeln!(xml, "  <SequenceDescription>")?;
        writeln!(xml, r#"    <ImageLoader format="bdv.n5" version="1.0">"#)?;
        writeln!(xml, r#"      <n5 type="relative">{}</n5>"#, escape(&self.n5_path))?;
        writeln!(xml, "    </ImageLoader>")?;

        writeln!(xml, "    <ViewSetups>")?;
        for setup in &self.setups {
            write_setup(xml, setup)?;
        }
        write_attribute(xml, "illumination", "Illumination", &self.attributes.illuminations)?;
        write_attribute(xml, "channel", "Channel", &self.attributes.channels)?;
        write_attribute(xml, "tile", "Tile", &self.attributes.tiles)?;
        write_attribute(xml, "angle", "Angle", &self.attributes.angles)?;
        writeln!(xml, "    </ViewSetups>")?;

        writeln!(xml, r#"    <Timepoints type="range">"#)?;
        writeln!(xml, "      <first>0</first>")?;
        writeln!(xml, "      <last>{}</last>", self.ntimes.saturating_sub(1))?;
        writeln!(xml, "    </Timepoints>")?;
        writeln!(xml, "  </SequenceDescription>")?;

        writeln!(xml, "  <ViewRegistrations>")?;
        for registration in &self.registrations {
            writeln!(
                xml,
                r#"    <ViewRegistration timepoint="{}" setup="{}">"#,
                registration.timepoint, registration.setup
            )?;
            for transform in &registration.transforms {
                writeln!(xml, r#"      <ViewTransform type="affine">"#)?;
                writeln!(xml, "        <Name>{}</Name>", escape(&transform.name))?;
                writeln!(xml, "        <affine>{}</affine>", transform.affine)?;
                writeln!(xml, "      </ViewTransform>")?;
            }
            writeln!(xml, "    </ViewRegistration>")?;
        }
        writeln!(xml, "  </ViewRegistrations>")?;
        writeln!(xml, "</SpimData>")
    }
}

fn write_setup(xml: &mut String, setup: &ViewSetupEntry) -> std::fmt::Result {
    let [sx, sy, sz] = setup.size;
    let [vx, vy, vz] = setup.voxel_size;
    writeln!(xml, "      <ViewSetup>")?;
    writeln!(xml, "        <id>{}</id>", setup.id)?;
    writeln!(xml, "        <name>{}</name>", setup.id)?;
    writeln!(xml, "        <size>{} {} {}</size>", sx, sy, sz)?;
    writeln!(xml, "        <voxelSize>")?;
    writeln!(xml, "          <unit>{}</unit>", escape(&setup.voxel_unit))?;
    writeln!(xml, "          <size>{:?} {:?} {:?}</size>", vx, vy, vz)?;
    writeln!(xml, "        </voxelSize>")?;
    writeln!(xml, "        <attributes>")?;
    writeln!(xml, "          <illumination>{}</illumination>", setup.illumination)?;
    writeln!(xml, "          <channel>{}</channel>", setup.channel)?;
    writeln!(xml, "          <tile>{}</tile>", setup.tile)?;
    writeln!(xml, "          <angle>{}</angle>", setup.angle)?;
    writeln!(xml, "        </attributes>")?;
    writeln!(xml, "      </ViewSetup>")
}

fn write_attribute(xml: &mut String, name: &str, tag: &str, names: &[String]) -> std::fmt::Result {
    writeln!(xml, r#"      <Attributes name="{}">"#, name)?;
    for (id, entry) in names.iter().enumerate() {
        writeln!(xml, "        <{}>", tag)?;
        writeln!(xml, "          <id>{}</id>", id)?;
        writeln!(xml, "          <name>{}</name>", escape(entry))?;
        writeln!(xml, "        </{}>", tag)?;
    }
    writeln!(xml, "      </Attributes>")
}
