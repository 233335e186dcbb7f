// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The update driver: owns both trees and the observers, and reconciles them per frame.

use std::collections::VecDeque;
use std::sync::Arc;

use arbor_scene::{Camera, NodeRef, Scene};
use arbor_tree::PreOrder;
use glam::Mat4;

use crate::error::SceneTreeError;
use crate::event::{DrawableEventKind, DrawableListener, ListenerSlot, emit};
use crate::generator::TreeGenerator;
use crate::object_tree::ObjectTree;
use crate::observer::{ObjectObserver, SceneObserver, SwitchObserver};
use crate::options::SceneTreeOptions;
use crate::transform_tree::TransformTree;
use crate::types::{NodeRoles, ObjectDirty, ObjectTreeIndex, ObjectTreeNode};

/// What one [`SceneTree::update`] did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameChanges {
    /// Frame counter, starting at 1 for the first update.
    pub frame: u64,
    /// The scene root was replaced before this frame's passes ran.
    pub root_replaced: bool,
    /// Transform-tree entries whose matrices were recomputed.
    pub transforms_recomputed: usize,
    /// Object-tree entries that were dirty when the effective-state pass started.
    pub dirty_objects: Vec<ObjectTreeIndex>,
    /// Object-tree entries visited by the effective-state pass.
    pub objects_visited: usize,
    /// Drawables whose effective activation, hints, or mask changed.
    pub changed_drawables: Vec<ObjectTreeIndex>,
}

/// Render-ready mirror of a [`Scene`].
///
/// Built once from the scene's root, then kept current by calling
/// [`SceneTree::update`] once per frame. Authored edits between frames are picked up
/// through observers; structural edits go through the subtree operations.
pub struct SceneTree {
    scene: Arc<Scene>,
    options: SceneTreeOptions,
    objects: ObjectTree,
    transforms: TransformTree,
    root_index: ObjectTreeIndex,
    object_observer: Arc<ObjectObserver>,
    switch_observer: Arc<SwitchObserver>,
    scene_observer: Arc<SceneObserver>,
    listener: ListenerSlot,
    frame: u64,
}

impl core::fmt::Debug for SceneTree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SceneTree")
            .field("options", &self.options)
            .field("objects", &self.objects)
            .field("transforms", &self.transforms)
            .field("root_index", &self.root_index)
            .field("has_listener", &self.listener.is_some())
            .field("frame", &self.frame)
            .finish_non_exhaustive()
    }
}

impl SceneTree {
    /// Mirror the current contents of `scene`.
    pub fn new(scene: Arc<Scene>, options: SceneTreeOptions) -> Self {
        let transforms = TransformTree::new();
        let objects = ObjectTree::new(transforms.root(), options.capacity_hint);
        let sentinel = objects.root();
        let scene_observer = SceneObserver::new();
        scene_observer.attach(&scene);
        let mut tree = Self {
            scene,
            options,
            objects,
            transforms,
            root_index: sentinel,
            object_observer: ObjectObserver::new(),
            switch_observer: SwitchObserver::new(),
            scene_observer,
            listener: None,
            frame: 0,
        };
        let root = tree.scene.root_node();
        tree.root_index = tree.build(&root, sentinel, None);
        log::debug!(
            "scene tree built: {} objects, {} transforms",
            tree.objects.len(),
            tree.transforms.len()
        );
        tree
    }

    /// Install the drawable listener, replacing any previous one.
    ///
    /// `Added` is replayed for every drawable already in the tree.
    pub fn set_listener<L: DrawableListener + 'static>(&mut self, listener: L) {
        self.listener = Some(Box::new(listener));
        for index in self.objects.drawables() {
            emit(
                &mut self.listener,
                index,
                &self.objects[index],
                DrawableEventKind::Added,
            );
        }
    }

    /// Remove the drawable listener.
    pub fn clear_listener(&mut self) {
        self.listener = None;
    }

    /// Bring both trees up to date for `camera`.
    ///
    /// Order: root replacement, transform changes, world matrices, attribute changes,
    /// switches, LODs, effective state.
    pub fn update(&mut self, camera: &Camera, lod_range_scale: f32) -> FrameChanges {
        self.frame += 1;

        let root_replaced = self.scene_observer.take();
        if root_replaced {
            let root = self.scene.root_node();
            self.root_index = if self.has_root() {
                self.replace_sub_tree(&root, self.root_index)
            } else {
                self.build(&root, self.objects.root(), None)
            };
            log::debug!("scene root replaced at frame {}", self.frame);
        }

        for index in self.object_observer.take_transform_changes() {
            match self.objects.get(index) {
                Some(entry) if entry.introduces_transform() => {
                    self.transforms.mark_dirty(entry.transform);
                }
                Some(_) => {}
                None => log::warn!("transform change for dead entry {index}"),
            }
        }
        let transforms_recomputed = self.transforms.compute(camera);

        for (index, hints, mask) in self.object_observer.take_attribute_changes() {
            if !self.objects.set_attributes(index, hints, mask) {
                log::warn!("attribute change for dead entry {index}");
            }
        }
        for index in self.switch_observer.take() {
            self.objects.resolve_switch(index);
        }
        self.objects
            .resolve_lods(&self.transforms, camera, lod_range_scale);

        let dirty_objects = self.objects.dirty_indices().to_vec();
        let world = self.objects.update_world();
        if self.options.emit_change_events {
            for &index in &world.changed_drawables {
                emit(
                    &mut self.listener,
                    index,
                    &self.objects[index],
                    DrawableEventKind::Changed,
                );
            }
        }

        log::trace!(
            "frame {}: {} transforms, {} objects visited, {} drawables changed",
            self.frame,
            transforms_recomputed,
            world.visited,
            world.changed_drawables.len()
        );
        FrameChanges {
            frame: self.frame,
            root_replaced,
            transforms_recomputed,
            dirty_objects,
            objects_visited: world.visited,
            changed_drawables: world.changed_drawables,
        }
    }

    /// Mirror `node` below `parent`, directly after `left_sibling` (first child if `None`).
    ///
    /// Panics where [`SceneTree::try_add_sub_tree`] would return an error.
    pub fn add_sub_tree(
        &mut self,
        node: &NodeRef,
        parent: ObjectTreeIndex,
        left_sibling: Option<ObjectTreeIndex>,
    ) -> ObjectTreeIndex {
        match self.try_add_sub_tree(node, parent, left_sibling) {
            Ok(index) => index,
            Err(err) => panic!("{err}"),
        }
    }

    /// Checked [`SceneTree::add_sub_tree`].
    pub fn try_add_sub_tree(
        &mut self,
        node: &NodeRef,
        parent: ObjectTreeIndex,
        left_sibling: Option<ObjectTreeIndex>,
    ) -> Result<ObjectTreeIndex, SceneTreeError> {
        if !self.objects.contains(parent) {
            return Err(SceneTreeError::StaleIndex(parent));
        }
        if let Some(left) = left_sibling {
            if !self.objects.contains(left) {
                return Err(SceneTreeError::StaleIndex(left));
            }
            if self.objects.parent(left) != Some(parent) {
                return Err(SceneTreeError::NotAChild { parent, left });
            }
        }
        let index = self.build(node, parent, left_sibling);
        if parent == self.objects.root() && !self.has_root() {
            self.root_index = index;
        }
        self.requeue_selector(parent);
        Ok(index)
    }

    /// Remove the entry at `index` and everything below it. Returns the number removed.
    ///
    /// Panics where [`SceneTree::try_remove_sub_tree`] would return an error.
    pub fn remove_sub_tree(&mut self, index: ObjectTreeIndex) -> usize {
        match self.try_remove_sub_tree(index) {
            Ok(removed) => removed,
            Err(err) => panic!("{err}"),
        }
    }

    /// Checked [`SceneTree::remove_sub_tree`].
    pub fn try_remove_sub_tree(&mut self, index: ObjectTreeIndex) -> Result<usize, SceneTreeError> {
        self.check_removable(index)?;
        let parent = self.objects.parent(index);
        let removed = self.remove_object_tree_index(index);
        if let Some(parent) = parent {
            self.requeue_selector(parent);
        }
        Ok(removed)
    }

    /// Rebuild the entry at `index` from `node`, keeping its position among its siblings.
    ///
    /// Panics where [`SceneTree::try_replace_sub_tree`] would return an error.
    pub fn replace_sub_tree(&mut self, node: &NodeRef, index: ObjectTreeIndex) -> ObjectTreeIndex {
        match self.try_replace_sub_tree(node, index) {
            Ok(index) => index,
            Err(err) => panic!("{err}"),
        }
    }

    /// Checked [`SceneTree::replace_sub_tree`].
    pub fn try_replace_sub_tree(
        &mut self,
        node: &NodeRef,
        index: ObjectTreeIndex,
    ) -> Result<ObjectTreeIndex, SceneTreeError> {
        self.check_removable(index)?;
        let parent = self
            .objects
            .parent(index)
            .ok_or(SceneTreeError::SentinelRoot)?;
        let mut left = None;
        for child in self.objects.children(parent) {
            if child == index {
                break;
            }
            left = Some(child);
        }
        let was_root = index == self.root_index;
        self.remove_object_tree_index(index);
        let new_index = self.build(node, parent, left);
        if was_root {
            self.root_index = new_index;
        }
        self.requeue_selector(parent);
        Ok(new_index)
    }

    /// The mirrored scene.
    pub fn scene(&self) -> &Arc<Scene> {
        &self.scene
    }

    /// Options this tree was created with.
    pub fn options(&self) -> SceneTreeOptions {
        self.options
    }

    /// Number of completed updates.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// The object tree.
    pub fn object_tree(&self) -> &ObjectTree {
        &self.objects
    }

    /// The transform tree.
    pub fn transform_tree(&self) -> &TransformTree {
        &self.transforms
    }

    /// The synthetic entry every scene root hangs from.
    pub fn sentinel(&self) -> ObjectTreeIndex {
        self.objects.root()
    }

    /// Entry of the scene's current root node.
    ///
    /// The sentinel while no root is mirrored, e.g. after the root entry was removed.
    pub fn root_index(&self) -> ObjectTreeIndex {
        self.root_index
    }

    /// Entry at `index`.
    pub fn node(&self, index: ObjectTreeIndex) -> Option<&ObjectTreeNode> {
        self.objects.get(index)
    }

    /// First entry, in pre-order from the sentinel, mirroring `node`.
    pub fn find(&self, node: &NodeRef) -> Option<ObjectTreeIndex> {
        let target = Arc::as_ptr(node);
        self.objects.pre_order(self.objects.root()).find(|&i| {
            self.objects[i]
                .object
                .as_ref()
                .is_some_and(|w| core::ptr::eq(w.as_ptr(), target))
        })
    }

    /// The subtree rooted at `index`, parents first.
    pub fn pre_order(
        &self,
        index: ObjectTreeIndex,
    ) -> PreOrder<'_, ObjectTreeNode, ObjectDirty> {
        self.objects.pre_order(index)
    }

    /// All registered drawables.
    pub fn drawables(&self) -> impl Iterator<Item = ObjectTreeIndex> + '_ {
        self.objects.drawables()
    }

    /// Drawables currently visible.
    pub fn visible_drawables(&self) -> impl Iterator<Item = ObjectTreeIndex> + '_ {
        self.objects
            .drawables()
            .filter(|&i| self.objects[i].is_visible())
    }

    /// All registered light sources.
    pub fn light_sources(&self) -> impl Iterator<Item = ObjectTreeIndex> + '_ {
        self.objects.lights()
    }

    /// Model-to-world matrix that applies to the entry at `index`.
    pub fn world_matrix(&self, index: ObjectTreeIndex) -> Option<Mat4> {
        let entry = self.objects.get(index)?;
        self.transforms.world_matrix(entry.transform)
    }

    /// Effective visibility of `index`; false for stale indices.
    pub fn is_visible(&self, index: ObjectTreeIndex) -> bool {
        self.objects.get(index).is_some_and(ObjectTreeNode::is_visible)
    }

    // --- internals ---

    fn build(
        &mut self,
        node: &NodeRef,
        parent: ObjectTreeIndex,
        left_sibling: Option<ObjectTreeIndex>,
    ) -> ObjectTreeIndex {
        let mut generator = TreeGenerator {
            objects: &mut self.objects,
            transforms: &mut self.transforms,
            object_observer: &self.object_observer,
            switch_observer: &self.switch_observer,
            listener: &mut self.listener,
            built: 0,
        };
        let index = generator.build(node, parent, left_sibling);
        log::debug!("generated {} entries under {parent}", generator.built);
        index
    }

    fn has_root(&self) -> bool {
        self.root_index != self.objects.root() && self.objects.contains(self.root_index)
    }

    fn check_removable(&self, index: ObjectTreeIndex) -> Result<(), SceneTreeError> {
        if index == self.objects.root() {
            return Err(SceneTreeError::SentinelRoot);
        }
        if !self.objects.contains(index) {
            return Err(SceneTreeError::StaleIndex(index));
        }
        Ok(())
    }

    /// Children of a switch changed; have the next update re-resolve it.
    fn requeue_selector(&self, parent: ObjectTreeIndex) {
        if self.objects[parent].roles.contains(NodeRoles::SWITCH) {
            self.switch_observer.queue(parent);
        }
    }

    fn remove_object_tree_index(&mut self, index: ObjectTreeIndex) -> usize {
        assert_ne!(index, self.objects.root(), "cannot remove the sentinel root");
        let mut queue = VecDeque::from([index]);
        while let Some(id) = queue.pop_front() {
            let Some(entry) = self.objects.get(id) else {
                continue;
            };
            if id == self.root_index {
                self.root_index = self.objects.root();
            }
            let object = entry.object();
            let introduced = entry.transform_parent.map(|_| entry.transform);
            let roles = entry.roles;
            if entry.is_drawable() {
                emit(&mut self.listener, id, entry, DrawableEventKind::Removed);
            }

            let is_switch = self.objects.unregister(id);
            if let Some(entry) = self.objects.get_mut(id) {
                entry.roles.remove(NodeRoles::DRAWABLE | NodeRoles::LIGHT);
                entry.object = None;
            }
            self.object_observer.detach(object.as_deref(), id);
            if is_switch {
                self.switch_observer.detach(object.as_deref(), id);
            }
            // Nested transforms went away with their enclosing transform.
            if let Some(t) = introduced
                && self.transforms.contains(t)
            {
                if roles.contains(NodeRoles::BILLBOARD) {
                    self.transforms.remove_billboard(t);
                } else {
                    self.transforms.remove_transform(t);
                }
            }
            queue.extend(self.objects.children(id));
        }
        let removed = self.objects.delete(index);
        log::debug!("removed {removed} entries at {index}");
        removed
    }
}

impl Drop for SceneTree {
    fn drop(&mut self) {
        self.scene_observer.detach(&self.scene);
        let sentinel = self.objects.root();
        for index in self.objects.pre_order(sentinel) {
            let Some(object) = self.objects[index].object() else {
                continue;
            };
            self.object_observer.detach(Some(&object), index);
            self.switch_observer.detach(Some(&object), index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::DrawableEvent;
    use arbor_scene::{Billboard, Hints, LightSource, Lod, Node};
    use glam::Vec3;
    use parking_lot::Mutex;

    type Log = Arc<Mutex<Vec<(ObjectTreeIndex, DrawableEventKind)>>>;

    fn record(tree: &mut SceneTree) -> Log {
        let log: Log = Arc::default();
        let sink = log.clone();
        tree.set_listener(move |e: &DrawableEvent| sink.lock().push((e.index, e.kind)));
        log
    }

    fn count(log: &Log, kind: DrawableEventKind) -> usize {
        log.lock().iter().filter(|(_, k)| *k == kind).count()
    }

    fn tree_for(root: NodeRef) -> SceneTree {
        SceneTree::new(Arc::new(Scene::new(root)), SceneTreeOptions::default())
    }

    fn translate(v: Vec3) -> Mat4 {
        Mat4::from_translation(v)
    }

    /// root -> [t -> [g1, light, sw -> [g2, g3]], lod -> [h0, h1]]
    struct Rig {
        root: NodeRef,
        t: NodeRef,
        sw: NodeRef,
        g2: NodeRef,
        g3: NodeRef,
        h0: NodeRef,
    }

    fn rig() -> Rig {
        let root = Node::group("root");
        let t = Node::transform("t", translate(Vec3::X));
        let sw = Node::switch("sw", Some(0));
        let g2 = Node::geometry("g2");
        let g3 = Node::geometry("g3");
        sw.add_child(g2.clone());
        sw.add_child(g3.clone());
        t.add_child(Node::geometry("g1"));
        t.add_child(Node::light_source("light", LightSource::default()));
        t.add_child(sw.clone());
        let lod = Node::lod(
            "lod",
            Lod {
                center: Vec3::ZERO,
                ranges: vec![10.0],
            },
        );
        let h0 = Node::geometry("h0");
        lod.add_child(h0.clone());
        lod.add_child(Node::geometry("h1"));
        root.add_child(t.clone());
        root.add_child(lod);
        Rig {
            root,
            t,
            sw,
            g2,
            g3,
            h0,
        }
    }

    #[test]
    fn switch_toggle_flags_exactly_the_two_children() {
        let root = Node::group("root");
        let sw = Node::switch("sw", Some(0));
        let a = Node::geometry("a");
        let b = Node::geometry("b");
        sw.add_child(a.clone());
        sw.add_child(b.clone());
        root.add_child(sw.clone());

        let mut tree = tree_for(root);
        let log = record(&mut tree);
        assert_eq!(count(&log, DrawableEventKind::Added), 2, "replayed on install");

        let ia = tree.find(&a).unwrap();
        let ib = tree.find(&b).unwrap();
        assert!(tree.node(ia).unwrap().local_active());
        assert!(!tree.node(ib).unwrap().local_active());
        assert!(tree.is_visible(ia));
        assert!(!tree.is_visible(ib));

        let cam = Camera::default();
        assert!(tree.update(&cam, 1.0).dirty_objects.is_empty());

        sw.set_active_child(Some(1));
        let changes = tree.update(&cam, 1.0);
        assert_eq!(changes.dirty_objects, [ia, ib]);
        assert_eq!(changes.changed_drawables, [ia, ib]);
        assert!(!tree.node(ia).unwrap().local_active());
        assert!(tree.node(ib).unwrap().local_active());
        assert_eq!(tree.visible_drawables().collect::<Vec<_>>(), [ib]);
        assert_eq!(count(&log, DrawableEventKind::Changed), 2);
    }

    #[test]
    fn out_of_range_switch_deactivates_everything() {
        let r = rig();
        let mut tree = tree_for(r.root.clone());
        r.sw.set_active_child(Some(5));
        tree.update(&Camera::default(), 1.0);
        for g in [&r.g2, &r.g3] {
            let i = tree.find(g).unwrap();
            assert!(!tree.node(i).unwrap().local_active(), "nothing selected");
        }
    }

    #[test]
    fn removal_retracts_registrations_and_emits_removed() {
        let r = rig();
        let mut tree = tree_for(r.root.clone());
        let log = record(&mut tree);
        tree.update(&Camera::default(), 1.0);

        let objects_before = tree.object_tree().len();
        let transforms_before = tree.transform_tree().len();
        assert_eq!(tree.drawables().count(), 5);
        assert_eq!(tree.light_sources().count(), 1);
        assert_eq!(tree.object_tree().switches().count(), 1);

        let it = tree.find(&r.t).unwrap();
        let removed = tree.remove_sub_tree(it);
        assert_eq!(removed, 6, "t, g1, light, sw, g2, g3");
        assert_eq!(tree.object_tree().len(), objects_before - 6);
        assert_eq!(tree.transform_tree().len(), transforms_before - 1);
        assert_eq!(tree.drawables().count(), 2);
        assert_eq!(tree.light_sources().count(), 0);
        assert_eq!(tree.object_tree().switches().count(), 0);
        assert_eq!(tree.object_tree().lods().count(), 1);
        assert_eq!(count(&log, DrawableEventKind::Removed), 3);
        assert!(tree.find(&r.g2).is_none());
        assert_eq!(r.sw.subject().listener_count(), 0, "observers detached");

        r.sw.set_active_child(Some(1));
        let changes = tree.update(&Camera::default(), 1.0);
        assert!(changes.dirty_objects.is_empty(), "removed switch is not resolved");
    }

    #[test]
    fn replacing_with_the_same_hierarchy_round_trips() {
        let r = rig();
        let mut tree = tree_for(r.root.clone());
        let cam = Camera::look_at(Vec3::new(0.0, 0.0, 20.0), Vec3::ZERO, Vec3::Y);

        let snapshot = |tree: &SceneTree| -> Vec<(u32, String, bool)> {
            tree.pre_order(tree.root_index())
                .map(|i| {
                    let node = tree.node(i).unwrap();
                    let name = node.object().map(|o| o.name().to_owned()).unwrap_or_default();
                    (tree.object_tree().depth(i).unwrap(), name, node.local_active())
                })
                .collect()
        };

        tree.update(&cam, 1.0);
        let before = snapshot(&tree);
        let len_before = tree.object_tree().len();

        let new_root = tree.replace_sub_tree(&r.root, tree.root_index());
        assert_eq!(tree.root_index(), new_root);
        tree.update(&cam, 1.0);

        assert_eq!(tree.object_tree().len(), len_before);
        assert_eq!(snapshot(&tree), before);
        assert_eq!(r.sw.subject().listener_count(), 2, "object and switch observer, once each");
    }

    #[test]
    fn lod_resolution_is_idempotent() {
        let r = rig();
        let mut tree = tree_for(r.root.clone());
        let cam = Camera::look_at(Vec3::new(0.0, 0.0, 20.0), Vec3::ZERO, Vec3::Y);
        let h0 = tree.find(&r.h0).unwrap();

        let first = tree.update(&cam, 1.0);
        assert_eq!(first.dirty_objects.len(), 2, "finest level off, coarse level on");
        assert!(!tree.node(h0).unwrap().local_active());

        let second = tree.update(&cam, 1.0);
        assert!(second.dirty_objects.is_empty());
        assert!(!tree.node(h0).unwrap().local_active());

        let third = tree.update(&cam, 4.0);
        assert_eq!(third.dirty_objects.len(), 2, "wider ranges select the finest level");
        assert!(tree.node(h0).unwrap().local_active());
    }

    #[test]
    fn transform_edits_show_up_in_the_same_frame() {
        let root = Node::transform("outer", translate(Vec3::X));
        let inner = Node::transform("inner", translate(Vec3::Y));
        let geom = Node::geometry("geom");
        inner.add_child(geom.clone());
        root.add_child(inner.clone());
        let mut tree = tree_for(root);
        let cam = Camera::default();

        assert_eq!(tree.update(&cam, 1.0).transforms_recomputed, 2);
        let ig = tree.find(&geom).unwrap();
        assert_eq!(tree.world_matrix(ig), Some(translate(Vec3::new(1.0, 1.0, 0.0))));

        inner.set_local_matrix(translate(Vec3::Z));
        let changes = tree.update(&cam, 1.0);
        assert_eq!(changes.transforms_recomputed, 1);
        assert_eq!(tree.world_matrix(ig), Some(translate(Vec3::new(1.0, 0.0, 1.0))));

        let tt = tree.transform_tree();
        for i in tree.pre_order(tree.sentinel()) {
            let entry = tree.node(i).unwrap();
            if let Some(parent) = entry.transform_parent() {
                let expected =
                    tt.world_matrix(parent).unwrap() * tt.local_matrix(entry.transform()).unwrap();
                assert_eq!(tt.world_matrix(entry.transform()), Some(expected));
            }
        }
        assert!(tt.dirty_indices().is_empty());
    }

    #[test]
    fn hints_propagate_down_and_hide_drawables() {
        let r = rig();
        let mut tree = tree_for(r.root.clone());
        let log = record(&mut tree);
        let cam = Camera::default();
        tree.update(&cam, 1.0);
        let ig2 = tree.find(&r.g2).unwrap();
        assert!(tree.is_visible(ig2));

        r.t.set_hints(Hints::ALWAYS_INVISIBLE);
        let changes = tree.update(&cam, 1.0);
        assert!(!tree.is_visible(ig2));
        assert!(tree.node(ig2).unwrap().world_active(), "still active, only hidden");
        assert_eq!(changes.changed_drawables.len(), 3, "g1, g2, g3");
        assert_eq!(count(&log, DrawableEventKind::Changed), 3);
        assert_eq!(tree.visible_drawables().count(), 1, "only the active LOD level");
    }

    #[test]
    fn change_events_can_be_disabled() {
        let r = rig();
        let options = SceneTreeOptions {
            emit_change_events: false,
            ..SceneTreeOptions::default()
        };
        let mut tree = SceneTree::new(Arc::new(Scene::new(r.root.clone())), options);
        let log = record(&mut tree);
        r.t.set_hints(Hints::OVERLAY);
        let changes = tree.update(&Camera::default(), 1.0);
        assert_eq!(changes.changed_drawables.len(), 3);
        assert_eq!(count(&log, DrawableEventKind::Changed), 0);
    }

    #[test]
    fn root_replacement_rebuilds_under_the_sentinel() {
        let r = rig();
        let scene = Arc::new(Scene::new(r.root.clone()));
        let mut tree = SceneTree::new(scene.clone(), SceneTreeOptions::default());
        let log = record(&mut tree);

        let next = Node::group("next");
        let leaf = Node::geometry("leaf");
        next.add_child(leaf.clone());
        scene.set_root_node(next);

        let changes = tree.update(&Camera::default(), 1.0);
        assert!(changes.root_replaced);
        assert_eq!(count(&log, DrawableEventKind::Removed), 5);
        assert!(tree.find(&r.g2).is_none());
        let il = tree.find(&leaf).unwrap();
        assert_eq!(tree.object_tree().parent(tree.root_index()), Some(tree.sentinel()));
        assert_eq!(tree.drawables().collect::<Vec<_>>(), [il]);
        assert_eq!(tree.object_tree().len(), 3, "sentinel, next, leaf");
        assert_eq!(tree.transform_tree().len(), 1);
        assert!(!tree.update(&Camera::default(), 1.0).root_replaced);
    }

    #[test]
    fn root_replacement_after_the_root_was_removed() {
        let r = rig();
        let scene = Arc::new(Scene::new(r.root.clone()));
        let mut tree = SceneTree::new(scene.clone(), SceneTreeOptions::default());
        let sentinel = tree.sentinel();

        tree.remove_sub_tree(tree.root_index());
        assert_eq!(tree.root_index(), sentinel, "no root mirrored");
        assert_eq!(tree.object_tree().len(), 1);

        let next = Node::group("next");
        let leaf = Node::geometry("leaf");
        next.add_child(leaf.clone());
        scene.set_root_node(next.clone());

        let changes = tree.update(&Camera::default(), 1.0);
        assert!(changes.root_replaced);
        let root = tree.root_index();
        assert_eq!(tree.find(&next), Some(root));
        assert_eq!(tree.object_tree().parent(root), Some(sentinel));
        assert!(tree.find(&leaf).is_some());
        assert_eq!(tree.object_tree().len(), 3, "sentinel, next, leaf");
    }

    #[test]
    fn root_added_under_the_sentinel_is_tracked() {
        let r = rig();
        let scene = Arc::new(Scene::new(r.root.clone()));
        let mut tree = SceneTree::new(scene.clone(), SceneTreeOptions::default());
        let sentinel = tree.sentinel();
        let len = tree.object_tree().len();

        tree.remove_sub_tree(tree.root_index());
        let readded = tree.add_sub_tree(&r.root, sentinel, None);
        assert_eq!(tree.root_index(), readded);
        assert_eq!(tree.object_tree().len(), len);

        let next = Node::group("next");
        scene.set_root_node(next.clone());
        let changes = tree.update(&Camera::default(), 1.0);
        assert!(changes.root_replaced);
        assert_eq!(tree.find(&next), Some(tree.root_index()));
        assert!(tree.find(&r.t).is_none(), "old root went away");
        assert_eq!(tree.object_tree().children(sentinel).count(), 1);
        assert_eq!(tree.drawables().count(), 0);
    }

    #[test]
    fn switches_and_lods_without_children_are_skipped() {
        let root = Node::group("root");
        let sw = Node::switch("sw", Some(0));
        let lod = Node::lod(
            "lod",
            Lod {
                center: Vec3::ZERO,
                ranges: vec![10.0],
            },
        );
        root.add_child(sw.clone());
        root.add_child(lod);
        let mut tree = tree_for(root);
        let cam = Camera::look_at(Vec3::new(0.0, 0.0, 20.0), Vec3::ZERO, Vec3::Y);

        assert_eq!(tree.object_tree().switches().count(), 1);
        assert_eq!(tree.object_tree().lods().count(), 1);
        assert!(tree.update(&cam, 1.0).dirty_objects.is_empty());

        sw.set_active_child(Some(1));
        let changes = tree.update(&cam, 4.0);
        assert!(changes.dirty_objects.is_empty());
        assert_eq!(changes.objects_visited, 0);
    }

    #[test]
    fn destroyed_objects_keep_cached_state_until_removed() {
        let root = Node::group("root");
        let t = Node::transform("t", translate(Vec3::X));
        t.add_child(Node::geometry("g"));
        let sw = Node::switch("sw", Some(0));
        sw.add_child(Node::geometry("a"));
        sw.add_child(Node::geometry("b"));
        let lod = Node::lod(
            "lod",
            Lod {
                center: Vec3::ZERO,
                ranges: vec![10.0],
            },
        );
        lod.add_child(Node::geometry("h0"));
        lod.add_child(Node::geometry("h1"));
        root.add_child(t.clone());
        root.add_child(sw.clone());
        root.add_child(lod.clone());

        let mut tree = tree_for(root.clone());
        let log = record(&mut tree);
        let cam = Camera::look_at(Vec3::new(0.0, 0.0, 20.0), Vec3::ZERO, Vec3::Y);
        tree.update(&cam, 1.0);

        let it = tree.find(&t).unwrap();
        let isw = tree.find(&sw).unwrap();
        let ilod = tree.find(&lod).unwrap();
        let ig = tree.object_tree().children(it).next().unwrap();
        let switched: Vec<_> = tree.object_tree().children(isw).collect();
        let levels: Vec<_> = tree.object_tree().children(ilod).collect();
        let active = |tree: &SceneTree, v: &[ObjectTreeIndex]| -> Vec<bool> {
            v.iter().map(|&i| tree.node(i).unwrap().local_active()).collect()
        };
        assert_eq!(active(&tree, &switched), [true, false]);
        assert_eq!(active(&tree, &levels), [false, true]);

        // Queued edits whose authors are gone by the next update.
        t.set_local_matrix(translate(Vec3::Y));
        sw.set_active_child(Some(1));
        for node in [&t, &sw, &lod] {
            assert!(root.remove_child(node));
        }
        drop((t, sw, lod));
        assert!(tree.node(it).unwrap().object().is_none());

        let changes = tree.update(&cam, 4.0);
        assert_eq!(changes.transforms_recomputed, 1);
        assert!(changes.dirty_objects.is_empty());
        assert_eq!(tree.world_matrix(ig), Some(translate(Vec3::X)), "cached matrix kept");
        assert_eq!(active(&tree, &switched), [true, false]);
        assert_eq!(active(&tree, &levels), [false, true]);

        assert_eq!(tree.remove_sub_tree(it), 2);
        assert_eq!(tree.remove_sub_tree(isw), 3);
        assert_eq!(tree.remove_sub_tree(ilod), 3);
        assert_eq!(tree.drawables().count(), 0);
        assert_eq!(tree.object_tree().switches().count(), 0);
        assert_eq!(tree.object_tree().lods().count(), 0);
        assert_eq!(tree.transform_tree().len(), 1, "only the root transform");
        assert_eq!(count(&log, DrawableEventKind::Removed), 5);
    }

    #[test]
    fn nested_billboard_follows_the_camera_from_its_parent() {
        let t = Node::transform("t", translate(Vec3::new(5.0, 0.0, 0.0)));
        let board = Node::billboard("board", Billboard::default());
        let geom = Node::geometry("geom");
        board.add_child(geom.clone());
        t.add_child(board.clone());
        let mut tree = tree_for(t.clone());

        let near = Camera::look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
        let side = Camera::look_at(Vec3::new(10.0, 0.0, 0.0), Vec3::ZERO, Vec3::Y);
        assert_eq!(tree.update(&near, 1.0).transforms_recomputed, 2);
        assert_eq!(tree.update(&near, 1.0).transforms_recomputed, 0);
        let ig = tree.find(&geom).unwrap();
        let before = tree.world_matrix(ig).unwrap();

        assert_eq!(tree.update(&side, 1.0).transforms_recomputed, 1, "only the billboard");
        let parent_world = tree.world_matrix(tree.find(&t).unwrap()).unwrap();
        let local = board
            .billboard_matrix(&side, parent_world.inverse())
            .unwrap();
        let after = tree.world_matrix(ig).unwrap();
        assert!(after.abs_diff_eq(parent_world * local, 1e-5));
        assert!(!after.abs_diff_eq(before, 1e-3), "camera move changed the billboard");
    }

    #[test]
    fn added_children_of_a_switch_are_resolved_next_frame() {
        let r = rig();
        let mut tree = tree_for(r.root.clone());
        let cam = Camera::default();
        tree.update(&cam, 1.0);

        let isw = tree.find(&r.sw).unwrap();
        let ig3 = tree.find(&r.g3).unwrap();
        let extra = Node::geometry("extra");
        r.sw.add_child(extra.clone());
        let ie = tree.add_sub_tree(&extra, isw, Some(ig3));
        assert_eq!(tree.object_tree().children(isw).last(), Some(ie));
        assert!(tree.node(ie).unwrap().local_active(), "unresolved until the update");

        let changes = tree.update(&cam, 1.0);
        assert_eq!(changes.dirty_objects, [ie]);
        assert!(!tree.node(ie).unwrap().local_active());
    }

    #[test]
    fn ancestor_chains_end_at_the_sentinel() {
        let r = rig();
        let mut tree = tree_for(r.root.clone());
        let it = tree.find(&r.t).unwrap();
        tree.remove_sub_tree(it);
        let it = tree.add_sub_tree(&r.t, tree.root_index(), None);
        tree.replace_sub_tree(&r.t, it);

        let sentinel = tree.sentinel();
        for i in tree.pre_order(sentinel) {
            let depth = tree.object_tree().depth(i).unwrap();
            let mut cur = i;
            let mut steps = 0;
            while let Some(p) = tree.object_tree().parent(cur) {
                cur = p;
                steps += 1;
                assert!(steps <= depth, "chain longer than depth");
            }
            assert_eq!(cur, sentinel);
            assert_eq!(steps, depth);
        }
    }

    #[test]
    fn checked_operations_report_misuse() {
        let r = rig();
        let mut tree = tree_for(r.root.clone());
        let sentinel = tree.sentinel();
        assert_eq!(tree.try_remove_sub_tree(sentinel), Err(SceneTreeError::SentinelRoot));
        assert_eq!(
            tree.try_replace_sub_tree(&r.root, sentinel),
            Err(SceneTreeError::SentinelRoot)
        );

        let it = tree.find(&r.t).unwrap();
        let isw = tree.find(&r.sw).unwrap();
        assert_eq!(
            tree.try_add_sub_tree(&Node::group("x"), sentinel, Some(isw)),
            Err(SceneTreeError::NotAChild {
                parent: sentinel,
                left: isw
            })
        );
        tree.remove_sub_tree(it);
        assert_eq!(tree.try_remove_sub_tree(it), Err(SceneTreeError::StaleIndex(it)));
        assert_eq!(
            tree.try_add_sub_tree(&Node::group("x"), isw, None),
            Err(SceneTreeError::StaleIndex(isw))
        );
    }

    #[test]
    #[should_panic(expected = "cannot remove the sentinel root")]
    fn removing_the_sentinel_panics() {
        let mut tree = tree_for(Node::group("root"));
        let sentinel = tree.sentinel();
        tree.remove_sub_tree(sentinel);
    }

    #[test]
    fn dropping_the_tree_detaches_observers() {
        let r = rig();
        let scene = Arc::new(Scene::new(r.root.clone()));
        let tree = SceneTree::new(scene.clone(), SceneTreeOptions::default());
        assert_eq!(r.g2.subject().listener_count(), 1);
        assert_eq!(scene.subject().listener_count(), 1);
        drop(tree);
        assert_eq!(r.g2.subject().listener_count(), 0);
        assert_eq!(scene.subject().listener_count(), 0);
    }
}
