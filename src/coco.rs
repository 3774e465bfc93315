//! COCO format data structures
//!
//! Only the keys this crate rewrites are typed. Every other key of a dataset,
//! image or annotation is kept in `extra` and written back unchanged, so
//! categories, licenses, `category_id`, `segmentation` and friends pass
//! through untouched.

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;

use crate::error::Error;

/// An image or annotation id as found in the source file.
///
/// Numbers keep their full textual precision, so ids wider than any native
/// integer stay distinct. A number and a string with the same digits are
/// different ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    Numeric(Number),
    Text(String),
}

impl Identifier {
    /// The id as a native integer, if it is a non-negative number that fits
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Identifier::Numeric(n) => n.as_u64(),
            Identifier::Text(_) => None,
        }
    }
}

impl From<u64> for Identifier {
    fn from(id: u64) -> Self {
        Identifier::Numeric(Number::from(id))
    }
}

impl TryFrom<Value> for Identifier {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Number(n) => Ok(Identifier::Numeric(n)),
            Value::String(s) => Ok(Identifier::Text(s)),
            other => Err(Error::MalformedRecord(format!(
                "id must be a number or a string, found {}",
                other
            ))),
        }
    }
}

impl From<Identifier> for Value {
    fn from(id: Identifier) -> Self {
        match id {
            Identifier::Numeric(n) => Value::Number(n),
            Identifier::Text(s) => Value::String(s),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Numeric(n) => write!(f, "{}", n),
            Identifier::Text(s) => write!(f, "{:?}", s),
        }
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Identifier::Numeric(n) => n.serialize(serializer),
            Identifier::Text(s) => s.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer)?
            .try_into()
            .map_err(de::Error::custom)
    }
}

/// COCO image entry
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Image {
    pub id: Identifier,
    pub file_name: String,
    pub extra: Map<String, Value>,
}

impl Image {
    pub fn new(id: impl Into<Identifier>, file_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            file_name: file_name.into(),
            extra: Map::new(),
        }
    }
}

impl TryFrom<Map<String, Value>> for Image {
    type Error = Error;

    fn try_from(mut fields: Map<String, Value>) -> Result<Self, Self::Error> {
        let id: Identifier = take_required(&mut fields, "image", "id")?.try_into()?;
        let file_name = match take_required(&mut fields, "image", "file_name")? {
            Value::String(s) => s,
            other => {
                return Err(Error::MalformedRecord(format!(
                    "image {} has a non-string `file_name`: {}",
                    id, other
                )))
            }
        };
        Ok(Self {
            id,
            file_name,
            extra: fields,
        })
    }
}

impl Serialize for Image {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.extra.len() + 2))?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("file_name", &self.file_name)?;
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// COCO annotation entry
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Annotation {
    /// Only ever holds an assigned id. The source `id`, `area` and `iscrowd`
    /// are dropped on load, whatever their type.
    pub id: Option<Identifier>,
    pub image_id: Identifier,
    pub bbox: [f64; 4], // [x, y, width, height]
    pub area: Option<f64>,
    pub iscrowd: Option<bool>,
    pub extra: Map<String, Value>,
}

impl Annotation {
    pub fn new(image_id: impl Into<Identifier>, bbox: [f64; 4]) -> Self {
        Self {
            id: None,
            image_id: image_id.into(),
            bbox,
            area: None,
            iscrowd: None,
            extra: Map::new(),
        }
    }
}

impl TryFrom<Map<String, Value>> for Annotation {
    type Error = Error;

    fn try_from(mut fields: Map<String, Value>) -> Result<Self, Self::Error> {
        // Overwritten by normalization whatever they hold
        for key in ["id", "area", "iscrowd"] {
            fields.shift_remove(key);
        }
        let image_id: Identifier =
            take_required(&mut fields, "annotation", "image_id")?.try_into()?;
        let bbox = parse_bbox(take_required(&mut fields, "annotation", "bbox")?)?;
        Ok(Self {
            id: None,
            image_id,
            bbox,
            area: None,
            iscrowd: None,
            extra: fields,
        })
    }
}

impl Serialize for Annotation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.extra.len() + 5))?;
        if let Some(id) = &self.id {
            map.serialize_entry("id", id)?;
        }
        map.serialize_entry("image_id", &self.image_id)?;
        map.serialize_entry("bbox", &self.bbox)?;
        if let Some(area) = self.area {
            map.serialize_entry("area", &area)?;
        }
        if let Some(iscrowd) = self.iscrowd {
            map.serialize_entry("iscrowd", &u8::from(iscrowd))?;
        }
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Complete COCO dataset document
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Dataset {
    pub images: Vec<Image>,
    pub annotations: Vec<Annotation>,
    /// `info`, `licenses`, `categories` and any other top-level key
    pub extra: Map<String, Value>,
    layout: KeyLayout,
}

/// Where `images` and `annotations` sat among the top-level keys of the source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct KeyLayout {
    images: Option<usize>,
    annotations: Option<usize>,
}

impl Dataset {
    pub fn new(images: Vec<Image>, annotations: Vec<Annotation>) -> Self {
        Self {
            images,
            annotations,
            extra: Map::new(),
            layout: KeyLayout::default(),
        }
    }
}

impl TryFrom<Map<String, Value>> for Dataset {
    type Error = Error;

    fn try_from(mut fields: Map<String, Value>) -> Result<Self, Self::Error> {
        let layout = KeyLayout {
            images: fields.keys().position(|key| key == "images"),
            annotations: fields.keys().position(|key| key == "annotations"),
        };
        let images = records(take_required(&mut fields, "dataset", "images")?, "images")?
            .into_iter()
            .map(Image::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let annotations = records(
            take_required(&mut fields, "dataset", "annotations")?,
            "annotations",
        )?
        .into_iter()
        .map(Annotation::try_from)
        .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            images,
            annotations,
            extra: fields,
            layout,
        })
    }
}

// Top-level keys come back in source order. Datasets built in code, or whose
// extras shrank since loading, get `images` and `annotations` last.
impl Serialize for Dataset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.extra.len() + 2))?;
        let mut rest = self.extra.iter();
        let (mut images_done, mut annotations_done) = (false, false);
        for position in 0.. {
            if !images_done && self.layout.images == Some(position) {
                map.serialize_entry("images", &self.images)?;
                images_done = true;
            } else if !annotations_done && self.layout.annotations == Some(position) {
                map.serialize_entry("annotations", &self.annotations)?;
                annotations_done = true;
            } else if let Some((key, value)) = rest.next() {
                map.serialize_entry(key, value)?;
            } else {
                break;
            }
        }
        if !images_done {
            map.serialize_entry("images", &self.images)?;
        }
        if !annotations_done {
            map.serialize_entry("annotations", &self.annotations)?;
        }
        map.end()
    }
}

fn take_required(
    fields: &mut Map<String, Value>,
    record: &str,
    key: &str,
) -> Result<Value, Error> {
    fields
        .shift_remove(key)
        .ok_or_else(|| Error::MalformedRecord(format!("{} is missing `{}`", record, key)))
}

fn records(value: Value, key: &str) -> Result<Vec<Map<String, Value>>, Error> {
    let Value::Array(items) = value else {
        return Err(Error::MalformedRecord(format!("`{}` must be an array", key)));
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(fields) => Ok(fields),
            other => Err(Error::MalformedRecord(format!(
                "`{}` entries must be objects, found {}",
                key, other
            ))),
        })
        .collect()
}

fn parse_bbox(value: Value) -> Result<[f64; 4], Error> {
    let coords = match value {
        Value::Array(coords) if coords.len() == 4 => coords,
        other => {
            return Err(Error::MalformedRecord(format!(
                "annotation `bbox` must hold 4 numbers, found {}",
                other
            )))
        }
    };
    let mut bbox = [0.0; 4];
    for (slot, coord) in bbox.iter_mut().zip(&coords) {
        *slot = coord.as_f64().ok_or_else(|| {
            Error::MalformedRecord(format!("annotation `bbox` holds a non-number: {}", coord))
        })?;
    }
    Ok(bbox)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wide_numeric_ids_stay_distinct() {
        let raw = r#"{
            "images": [
                {"id": 123456789012345678901234567890, "file_name": "a.jpg"},
                {"id": 123456789012345678901234567891, "file_name": "b.jpg"}
            ],
            "annotations": []
        }"#;
        let dataset: Dataset = serde_json::from_str(raw).unwrap();

        assert_ne!(dataset.images[0].id, dataset.images[1].id);
        assert_eq!(
            dataset.images[0].id.to_string(),
            "123456789012345678901234567890"
        );
        assert_eq!(dataset.images[0].id.as_u64(), None);
    }

    #[test]
    fn test_numeric_and_text_ids_differ() {
        let numeric = Identifier::try_from(json!(5)).unwrap();
        let text = Identifier::try_from(json!("5")).unwrap();

        assert_ne!(numeric, text);
        assert_eq!(numeric, Identifier::from(5u64));
        assert!(Identifier::try_from(json!([5])).is_err());
    }

    #[test]
    fn test_passthrough_fields_survive() {
        let raw = json!({
            "info": {"description": "day set"},
            "categories": [{"id": 1, "name": "drone", "supercategory": "none"}],
            "images": [{"id": 7, "file_name": "x.jpg", "width": 640, "height": 480}],
            "annotations": [{
                "id": 3, "image_id": 7, "category_id": 1,
                "bbox": [1, 2, 3, 4], "segmentation": [], "iscrowd": true
            }]
        });
        let mut dataset: Dataset = serde_json::from_value(raw).unwrap();

        assert_eq!(dataset.extra["categories"][0]["name"], "drone");
        assert_eq!(dataset.images[0].extra["width"], 640);
        assert_eq!(dataset.annotations[0].extra["category_id"], 1);
        assert_eq!(dataset.annotations[0].bbox, [1.0, 2.0, 3.0, 4.0]);

        dataset.annotations[0].iscrowd = Some(false);
        let written = serde_json::to_value(&dataset).unwrap();
        assert_eq!(written["info"]["description"], "day set");
        assert_eq!(written["images"][0]["height"], 480);
        assert_eq!(written["annotations"][0]["iscrowd"], 0);
        assert_eq!(written["annotations"][0]["segmentation"], json!([]));
    }

    #[test]
    fn test_rewritten_fields_are_not_validated() {
        let raw = json!({
            "images": [{"id": 1, "file_name": "x.jpg"}],
            "annotations": [
                {"id": null, "image_id": 1, "bbox": [0, 0, 2, 3], "iscrowd": 2, "area": "unknown"},
                {"id": [9], "image_id": 1, "bbox": [0, 0, 2, 3], "iscrowd": "1", "area": [1]},
                {"id": {"a": 1}, "image_id": 1, "bbox": [0, 0, 2, 3], "iscrowd": "0", "area": null}
            ]
        });
        let dataset: Dataset = serde_json::from_value(raw).unwrap();

        for annotation in &dataset.annotations {
            assert_eq!(annotation.id, None);
            assert_eq!(annotation.area, None);
            assert_eq!(annotation.iscrowd, None);
            assert!(annotation.extra.is_empty());
        }
    }

    #[test]
    fn test_top_level_key_order_survives() {
        let raw = r#"{
            "info": {},
            "images": [{"id": 1, "file_name": "x.jpg"}],
            "licenses": [],
            "annotations": [],
            "categories": []
        }"#;
        let dataset: Dataset = serde_json::from_str(raw).unwrap();
        let written = serde_json::to_string(&dataset).unwrap();

        let at = |key: &str| written.find(&format!("\"{}\"", key)).unwrap();
        assert!(at("info") < at("images"));
        assert!(at("images") < at("licenses"));
        assert!(at("licenses") < at("annotations"));
        assert!(at("annotations") < at("categories"));
    }

    #[test]
    fn test_built_dataset_puts_records_last() {
        let mut dataset = Dataset::new(vec![Image::new(1u64, "x.jpg")], Vec::new());
        dataset.extra.insert("categories".into(), json!([]));
        let written = serde_json::to_string(&dataset).unwrap();

        let at = |key: &str| written.find(&format!("\"{}\"", key)).unwrap();
        assert!(at("categories") < at("images"));
        assert!(at("images") < at("annotations"));
    }

    #[test]
    fn test_missing_bbox_is_rejected() {
        let raw = json!({
            "images": [{"id": 1, "file_name": "x.jpg"}],
            "annotations": [{"id": 1, "image_id": 1}]
        });
        let err = serde_json::from_value::<Dataset>(raw).unwrap_err();
        assert!(err.to_string().contains("bbox"));
    }

    #[test]
    fn test_missing_images_is_rejected() {
        let raw = json!({"annotations": []});
        assert!(serde_json::from_value::<Dataset>(raw).is_err());
    }

    #[test]
    fn test_short_bbox_is_rejected() {
        let fields = json!({"image_id": 1, "bbox": [1, 2, 3]});
        let Value::Object(fields) = fields else {
            unreachable!()
        };
        assert!(matches!(
            Annotation::try_from(fields),
            Err(Error::MalformedRecord(_))
        ));
    }
}
