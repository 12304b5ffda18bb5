//! Documents and the objects they contain.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

use crate::kernel::{Geometry, Placement};

/// Broad category of a scene object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ObjectKind {
    /// Polygon mesh.
    Mesh,
    /// Boundary-represented solid.
    Solid,
    /// Transform-only helper.
    Empty,
    /// Camera.
    Camera,
    /// Light source.
    Light,
}

/// One named object in a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    /// Unique name within the document.
    pub name: String,
    /// Category.
    pub kind: ObjectKind,
    /// Engine-specific type label such as `Cube` or `Part::Box`.
    pub type_name: String,
    /// Placement in world space.
    pub placement: Placement,
    /// Geometry in the object's local frame.
    pub geometry: Geometry,
    /// Assigned material, if any.
    #[serde(default)]
    pub material: Option<String>,
    /// Whether the object is shown.
    #[serde(default = "visible_by_default")]
    pub visible: bool,
    /// Creation parameters and type-specific data.
    #[serde(default)]
    pub properties: Map<String, Value>,
}

const fn visible_by_default() -> bool {
    true
}

impl SceneObject {
    /// Builds a visible object without material.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        kind: ObjectKind,
        type_name: impl Into<String>,
        placement: Placement,
        geometry: Geometry,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            type_name: type_name.into(),
            placement,
            geometry,
            material: None,
            visible: true,
            properties: Map::new(),
        }
    }

    /// Attaches a property.
    #[must_use]
    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_owned(), value.into());
        self
    }

    /// Geometry after applying the placement.
    #[must_use]
    pub fn world_geometry(&self) -> Geometry {
        self.geometry.placed(&self.placement)
    }

    /// Returns `true` for objects that carry volume or surfaces.
    #[must_use]
    pub const fn is_geometric(&self) -> bool {
        matches!(self.kind, ObjectKind::Mesh | ObjectKind::Solid)
    }
}

/// Current frame and playback range of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRange {
    /// Current frame.
    pub current: i64,
    /// First frame.
    pub start: i64,
    /// Last frame.
    pub end: i64,
}

impl Default for FrameRange {
    fn default() -> Self {
        Self {
            current: 1,
            start: 1,
            end: 250,
        }
    }
}

/// A named container of objects; a scene for the mesh engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    name: String,
    label: String,
    objects: Vec<SceneObject>,
    #[serde(default)]
    selection: Vec<String>,
    #[serde(default)]
    active_camera: Option<String>,
    #[serde(default)]
    frames: FrameRange,
}

impl Document {
    /// Creates an empty document whose label equals its name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            objects: Vec::new(),
            selection: Vec::new(),
            active_camera: None,
            frames: FrameRange::default(),
        }
    }

    /// Internal name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// User-facing label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Objects in creation order.
    #[must_use]
    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    /// Number of objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` when the document holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Looks up an object by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|object| object.name == name)
    }

    /// Looks up an object by name for modification.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|object| object.name == name)
    }

    /// Returns `true` when an object with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// First free name derived from `base`.
    ///
    /// `base` itself is used when free; otherwise a zero-padded counter is
    /// appended after `separator`, e.g. `Cube.001` or `Box001`.
    #[must_use]
    pub fn unique_name(&self, base: &str, separator: &str) -> String {
        if !self.contains(base) {
            return base.to_owned();
        }
        (1_u32..)
            .map(|counter| format!("{base}{separator}{counter:03}"))
            .find(|candidate| !self.contains(candidate))
            .unwrap_or_else(|| base.to_owned())
    }

    /// Adds an object. Callers pick a free name first.
    pub fn insert(&mut self, object: SceneObject) -> &SceneObject {
        self.objects.push(object);
        let index = self.objects.len() - 1;
        &self.objects[index]
    }

    /// Removes an object and every reference to it.
    pub fn remove(&mut self, name: &str) -> Option<SceneObject> {
        let index = self.objects.iter().position(|object| object.name == name)?;
        self.selection.retain(|selected| selected != name);
        if self.active_camera.as_deref() == Some(name) {
            self.active_camera = None;
        }
        Some(self.objects.remove(index))
    }

    /// Renames an object, keeping selection and camera references intact.
    ///
    /// Returns `false` when `old` is missing or `new` is taken.
    pub fn rename(&mut self, old: &str, new: &str) -> bool {
        if old != new && self.contains(new) {
            return false;
        }
        let Some(object) = self.get_mut(old) else {
            return false;
        };
        object.name = new.to_owned();
        for selected in &mut self.selection {
            if selected == old {
                new.clone_into(selected);
            }
        }
        if self.active_camera.as_deref() == Some(old) {
            self.active_camera = Some(new.to_owned());
        }
        true
    }

    /// Names of selected objects in selection order.
    #[must_use]
    pub fn selection(&self) -> &[String] {
        &self.selection
    }

    /// Selects an object, optionally keeping the existing selection.
    pub fn select(&mut self, name: &str, extend: bool) {
        if !extend {
            self.selection.clear();
        }
        if !self.selection.iter().any(|selected| selected == name) {
            self.selection.push(name.to_owned());
        }
    }

    /// Name of the camera used for rendering.
    #[must_use]
    pub fn active_camera(&self) -> Option<&str> {
        self.active_camera.as_deref()
    }

    /// Sets the rendering camera.
    pub fn set_active_camera(&mut self, name: Option<String>) {
        self.active_camera = name;
    }

    /// Frame settings.
    #[must_use]
    pub const fn frames(&self) -> FrameRange {
        self.frames
    }

    /// Frame settings for modification.
    pub fn frames_mut(&mut self) -> &mut FrameRange {
        &mut self.frames
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    fn object(name: &str) -> SceneObject {
        SceneObject::new(
            name,
            ObjectKind::Mesh,
            "Cube",
            Placement::identity(),
            Geometry::marker(),
        )
    }

    #[fixture]
    fn document() -> Document {
        let mut document = Document::new("Scene");
        document.insert(object("Cube"));
        document.insert(object("Cube.001"));
        document
    }

    #[rstest]
    #[case("Sphere", ".", "Sphere")]
    #[case("Cube", ".", "Cube.002")]
    #[case("Cube", "", "Cube001")]
    fn unique_names_skip_taken_suffixes(
        document: Document,
        #[case] base: &str,
        #[case] separator: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(document.unique_name(base, separator), expected);
    }

    #[rstest]
    fn removing_an_object_clears_references(mut document: Document) {
        document.select("Cube", false);
        document.set_active_camera(Some("Cube".to_owned()));

        let removed = document.remove("Cube").expect("object exists");

        assert_eq!(removed.name, "Cube");
        assert!(document.selection().is_empty());
        assert_eq!(document.active_camera(), None);
        assert_eq!(document.len(), 1);
    }

    #[rstest]
    fn rename_refuses_taken_names(mut document: Document) {
        assert!(!document.rename("Cube", "Cube.001"));
        assert!(!document.rename("Missing", "Other"));
        document.select("Cube", false);
        assert!(document.rename("Cube", "Hero"));
        assert!(document.contains("Hero"));
        assert_eq!(document.selection(), ["Hero".to_owned()]);
    }

    #[rstest]
    fn select_can_extend_or_replace(mut document: Document) {
        document.select("Cube", false);
        document.select("Cube.001", true);
        assert_eq!(document.selection().len(), 2);
        document.select("Cube", false);
        assert_eq!(document.selection(), ["Cube".to_owned()]);
    }
}
