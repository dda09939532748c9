#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use rddprep::layout::CountryLayout;

pub fn bmp_bytes(width: u32, height: u32) -> Vec<u8> {
    let row_stride = (width * 3).div_ceil(4) * 4;
    let pixel_array_size = row_stride * height;
    let file_size = 54 + pixel_array_size;

    let mut bytes = Vec::with_capacity(file_size as usize);
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&file_size.to_le_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes.extend_from_slice(&54u32.to_le_bytes());

    bytes.extend_from_slice(&40u32.to_le_bytes());
    bytes.extend_from_slice(&(width as i32).to_le_bytes());
    bytes.extend_from_slice(&(height as i32).to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&24u16.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&pixel_array_size.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());

    bytes.resize(file_size as usize, 0);
    bytes
}

pub fn write_bmp(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, bmp_bytes(width, height)).expect("write bmp file");
}

/// A VOC document for a `width`x`height` image with the given
/// `(class, xmin, ymin, xmax, ymax)` objects.
pub fn voc_xml(width: u32, height: u32, objects: &[(&str, u32, u32, u32, u32)]) -> String {
    let mut xml = format!(
        "<annotation>\n  <size>\n    <width>{width}</width>\n    <height>{height}</height>\n    <depth>3</depth>\n  </size>\n"
    );
    for (name, xmin, ymin, xmax, ymax) in objects {
        xml.push_str(&format!(
            "  <object>\n    <name>{name}</name>\n    <bndbox>\n      <xmin>{xmin}</xmin>\n      <ymin>{ymin}</ymin>\n      <xmax>{xmax}</xmax>\n      <ymax>{ymax}</ymax>\n    </bndbox>\n  </object>\n"
        ));
    }
    xml.push_str("</annotation>\n");
    xml
}

/// Seed `<data_dir>/<name>` with `count` images and matching VOC files.
///
/// Image `i` is `<name>_<i>.bmp` (8x8 pixels) annotated with one box of
/// class `D00`..`D40` chosen by `i % 4` and one box of an unknown class.
pub fn seed_country(data_dir: &Path, name: &str, count: usize) -> CountryLayout {
    let country = CountryLayout::new(data_dir, name);
    fs::create_dir_all(country.images_dir()).expect("create images dir");
    fs::create_dir_all(country.xml_dir()).expect("create xml dir");

    let classes = ["D00", "D10", "D20", "D40"];
    for i in 0..count {
        let stem = format!("{name}_{i:06}");
        write_bmp(&country.images_dir().join(format!("{stem}.bmp")), 8, 8);

        let offset = (i % 50) as u32;
        let xml = voc_xml(
            600,
            600,
            &[
                (classes[i % 4], 10 + offset, 20, 300 + offset, 410),
                ("Repair", 0, 0, 5, 5),
            ],
        );
        fs::write(country.xml_dir().join(format!("{stem}.xml")), xml).expect("write xml");
    }

    country
}

/// Relative path and bytes of every file under `root`, sorted by path.
pub fn snapshot(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut files: Vec<(PathBuf, Vec<u8>)> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let relative = entry
                .path()
                .strip_prefix(root)
                .expect("entry under root")
                .to_path_buf();
            let bytes = fs::read(entry.path()).expect("read file");
            (relative, bytes)
        })
        .collect();
    files.sort();
    files
}

/// File names in `dir`, sorted.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| {
            entry
                .expect("dir entry")
                .file_name()
                .to_string_lossy()
                .to_string()
        })
        .collect();
    names.sort();
    names
}
