//! Pascal VOC style XML parsing.
//!
//! Only the parts of the document the transcoder needs are read: the
//! `<size>` node and each `<object>` with a known class name.

use std::path::Path;

use roxmltree::Node;

use super::{BoundingBox, ClassTable, ImageSize};
use crate::error::PrepError;

/// A parsed annotation file: image dimensions plus the kept boxes in
/// document order.
#[derive(Clone, Debug, PartialEq)]
pub struct VocAnnotation {
    pub size: ImageSize,
    pub boxes: Vec<BoundingBox>,
}

pub(crate) fn parse_voc_str(
    xml: &str,
    path: &Path,
    classes: &ClassTable,
) -> Result<VocAnnotation, PrepError> {
    let document = roxmltree::Document::parse(xml).map_err(|source| PrepError::Format {
        path: path.to_path_buf(),
        message: source.to_string(),
    })?;

    let annotation = document.root_element();

    let size = required_child_element(annotation, "size", path, "<annotation>")?;
    let width = parse_required_u32(size, "width", path, "<size>")?;
    let height = parse_required_u32(size, "height", path, "<size>")?;
    if width == 0 || height == 0 {
        return Err(PrepError::Format {
            path: path.to_path_buf(),
            message: format!("image size {width}x{height} must be positive in both dimensions"),
        });
    }

    let mut boxes = Vec::new();
    for object in annotation
        .children()
        .filter(|node| node.is_element() && node.tag_name().name() == "object")
    {
        let name = required_child_text(object, "name", path, "<object>")?;
        let Some(class_index) = classes.index_of(&name) else {
            continue;
        };

        let bndbox = required_child_element(object, "bndbox", path, "<object>")?;
        let bbox = BoundingBox {
            class_index,
            xmin: parse_required_edge(bndbox, "xmin", path)?,
            ymin: parse_required_edge(bndbox, "ymin", path)?,
            xmax: parse_required_edge(bndbox, "xmax", path)?,
            ymax: parse_required_edge(bndbox, "ymax", path)?,
        };
        if bbox.xmin >= bbox.xmax || bbox.ymin >= bbox.ymax {
            return Err(PrepError::Format {
                path: path.to_path_buf(),
                message: format!(
                    "<bndbox> of '{name}' is empty or inverted: ({}, {}) to ({}, {})",
                    bbox.xmin, bbox.ymin, bbox.xmax, bbox.ymax
                ),
            });
        }
        boxes.push(bbox);
    }

    Ok(VocAnnotation {
        size: ImageSize { width, height },
        boxes,
    })
}

fn required_child_element<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &str,
    path: &Path,
    context: &str,
) -> Result<Node<'a, 'input>, PrepError> {
    child_element(node, tag).ok_or_else(|| PrepError::Format {
        path: path.to_path_buf(),
        message: format!("missing <{tag}> in {context}"),
    })
}

fn required_child_text(
    node: Node<'_, '_>,
    tag: &str,
    path: &Path,
    context: &str,
) -> Result<String, PrepError> {
    optional_child_text(node, tag).ok_or_else(|| PrepError::Format {
        path: path.to_path_buf(),
        message: format!("missing <{tag}> in {context}"),
    })
}

fn parse_required_u32(
    node: Node<'_, '_>,
    tag: &str,
    path: &Path,
    context: &str,
) -> Result<u32, PrepError> {
    let raw = required_child_text(node, tag, path, context)?;
    raw.parse::<u32>().map_err(|_| PrepError::Format {
        path: path.to_path_buf(),
        message: format!("invalid <{tag}> value '{raw}' in {context}; expected u32"),
    })
}

/// Box edges may be written as decimals; they are rounded half-to-even to
/// the nearest whole pixel.
fn parse_required_edge(node: Node<'_, '_>, tag: &str, path: &Path) -> Result<u32, PrepError> {
    let raw = required_child_text(node, tag, path, "<bndbox>")?;
    let invalid = || PrepError::Format {
        path: path.to_path_buf(),
        message: format!("invalid <{tag}> value '{raw}' in <bndbox>; expected non-negative pixel coordinate"),
    };

    let value = raw.parse::<f64>().map_err(|_| invalid())?;
    let rounded = value.round_ties_even();
    if !rounded.is_finite() || rounded < 0.0 || rounded > f64::from(u32::MAX) {
        return Err(invalid());
    }

    Ok(rounded as u32)
}

fn child_element<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && child.tag_name().name() == tag)
}

fn optional_child_text(node: Node<'_, '_>, tag: &str) -> Option<String> {
    child_element(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToOwned::to_owned)
}
