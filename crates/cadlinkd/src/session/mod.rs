//! Engine session state.
//!
//! An [`EngineSession`] is the single mutable world an engine process owns:
//! its documents, materials and render settings. Only the scheduler hands out
//! `&mut EngineSession`, so every handler observes the effects of all
//! previously completed commands and no two handlers ever run against it at
//! the same time.

mod document;
mod material;
mod persist;

use std::collections::BTreeMap;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};

use cadlink_config::EngineKind;

use crate::kernel::GeometryKernel;

pub use document::{Document, FrameRange, ObjectKind, SceneObject};
pub use material::{DEFAULT_COLOR, Material, RenderEngine, RenderSettings};
pub use persist::{DocumentFile, PersistError, load, save};

/// Name of the scene a mesh engine starts with.
pub const DEFAULT_SCENE_NAME: &str = "Scene";
/// Name of the document a solid engine creates on demand.
pub const DEFAULT_DOCUMENT_NAME: &str = "Unnamed";

/// Mutable state of one engine process.
pub struct EngineSession {
    kind: EngineKind,
    kernel: Arc<dyn GeometryKernel>,
    workspace: Utf8PathBuf,
    documents: BTreeMap<String, Document>,
    active: Option<String>,
    materials: BTreeMap<String, Material>,
    render: RenderSettings,
    revision: u64,
}

impl std::fmt::Debug for EngineSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineSession")
            .field("kind", &self.kind)
            .field("workspace", &self.workspace)
            .field("documents", &self.documents.keys().collect::<Vec<_>>())
            .field("active", &self.active)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

impl EngineSession {
    /// Creates the initial state for an engine.
    ///
    /// Mesh engines start with an empty scene; solid engines start without
    /// documents and create one when the first object needs it.
    #[must_use]
    pub fn new(kind: EngineKind, kernel: Arc<dyn GeometryKernel>, workspace: Utf8PathBuf) -> Self {
        let mut session = Self {
            kind,
            kernel,
            workspace,
            documents: BTreeMap::new(),
            active: None,
            materials: BTreeMap::new(),
            render: RenderSettings::default(),
            revision: 0,
        };
        if kind == EngineKind::Mesh {
            session.new_document(DEFAULT_SCENE_NAME);
        }
        session
    }

    /// Engine flavour.
    #[must_use]
    pub const fn kind(&self) -> EngineKind {
        self.kind
    }

    /// Geometry kernel shared by all handlers.
    #[must_use]
    pub fn kernel(&self) -> Arc<dyn GeometryKernel> {
        Arc::clone(&self.kernel)
    }

    /// Counter bumped by every state-changing command.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Records a state change.
    pub fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    /// Separator used when deriving unique object names.
    #[must_use]
    pub const fn name_separator(&self) -> &'static str {
        match self.kind {
            EngineKind::Mesh => ".",
            EngineKind::Solid => "",
        }
    }

    /// Resolves a client-supplied path against the workspace directory.
    #[must_use]
    pub fn resolve_path(&self, path: &str) -> Utf8PathBuf {
        let path = Utf8Path::new(path);
        if path.is_absolute() {
            path.to_owned()
        } else {
            self.workspace.join(path)
        }
    }

    /// Name of the active document.
    #[must_use]
    pub fn active_name(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// The active document, if any.
    #[must_use]
    pub fn active_document(&self) -> Option<&Document> {
        self.active.as_ref().and_then(|name| self.documents.get(name))
    }

    /// The active document for modification, if any.
    pub fn active_document_mut(&mut self) -> Option<&mut Document> {
        let name = self.active.as_ref()?;
        self.documents.get_mut(name)
    }

    /// The active document, creating and activating a default one first when
    /// none exists.
    pub fn document_or_create(&mut self) -> &mut Document {
        let name = match self.active.clone() {
            Some(name) if self.documents.contains_key(&name) => name,
            _ => {
                let default = match self.kind {
                    EngineKind::Mesh => DEFAULT_SCENE_NAME,
                    EngineKind::Solid => DEFAULT_DOCUMENT_NAME,
                };
                self.new_document(default)
            }
        };
        self.documents
            .entry(name.clone())
            .or_insert_with(|| Document::new(name))
    }

    /// Creates an empty document under a free name and activates it.
    ///
    /// Returns the name actually used.
    pub fn new_document(&mut self, requested: &str) -> String {
        let name = self.free_document_name(requested);
        self.documents.insert(name.clone(), Document::new(name.clone()));
        self.active = Some(name.clone());
        name
    }

    /// Adds a loaded document under a free name and activates it.
    pub fn adopt_document(&mut self, mut document: Document) -> String {
        let name = self.free_document_name(document.name());
        document.set_name(name.clone());
        self.documents.insert(name.clone(), document);
        self.active = Some(name.clone());
        name
    }

    fn free_document_name(&self, requested: &str) -> String {
        if !self.documents.contains_key(requested) {
            return requested.to_owned();
        }
        (1_u32..)
            .map(|counter| format!("{requested}{counter}"))
            .find(|candidate| !self.documents.contains_key(candidate))
            .unwrap_or_else(|| requested.to_owned())
    }

    /// Looks up a document by name.
    #[must_use]
    pub fn document(&self, name: &str) -> Option<&Document> {
        self.documents.get(name)
    }

    /// Looks up a document by name for modification.
    pub fn document_mut(&mut self, name: &str) -> Option<&mut Document> {
        self.documents.get_mut(name)
    }

    /// All documents in name order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    /// Closes a document. When it was active, the first remaining document
    /// becomes active.
    pub fn close_document(&mut self, name: &str) -> Option<Document> {
        let closed = self.documents.remove(name)?;
        if self.active.as_deref() == Some(name) {
            self.active = self.documents.keys().next().cloned();
        }
        Some(closed)
    }

    /// Activates a document. Returns `false` when it does not exist.
    pub fn set_active(&mut self, name: &str) -> bool {
        if self.documents.contains_key(name) {
            self.active = Some(name.to_owned());
            true
        } else {
            false
        }
    }

    /// Looks up a material.
    #[must_use]
    pub fn material(&self, name: &str) -> Option<&Material> {
        self.materials.get(name)
    }

    /// Looks up a material for modification.
    pub fn material_mut(&mut self, name: &str) -> Option<&mut Material> {
        self.materials.get_mut(name)
    }

    /// All materials in name order.
    pub fn materials(&self) -> impl Iterator<Item = &Material> {
        self.materials.values()
    }

    /// Adds a material under a free name derived from its own.
    pub fn add_material(&mut self, mut material: Material) -> &Material {
        let base = material.name.clone();
        if self.materials.contains_key(&base) {
            material.name = (1_u32..)
                .map(|counter| format!("{base}.{counter:03}"))
                .find(|candidate| !self.materials.contains_key(candidate))
                .unwrap_or_else(|| base.clone());
        }
        let name = material.name.clone();
        self.materials.entry(name).or_insert(material)
    }

    /// Removes a material and clears every assignment of it.
    pub fn remove_material(&mut self, name: &str) -> Option<Material> {
        let removed = self.materials.remove(name)?;
        for document in self.documents.values_mut() {
            let names: Vec<String> = document
                .objects()
                .iter()
                .filter(|object| object.material.as_deref() == Some(name))
                .map(|object| object.name.clone())
                .collect();
            for object_name in names {
                if let Some(object) = document.get_mut(&object_name) {
                    object.material = None;
                }
            }
        }
        Some(removed)
    }

    /// Render settings.
    #[must_use]
    pub const fn render_settings(&self) -> &RenderSettings {
        &self.render
    }

    /// Render settings for modification.
    pub fn render_settings_mut(&mut self) -> &mut RenderSettings {
        &mut self.render
    }
}
