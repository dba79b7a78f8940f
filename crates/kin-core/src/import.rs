//! Model import
//!
//! Builds a [`World`] from a [`ModelConfig`] in two phases: all frames are
//! created, linked and configured first, then mimic references are resolved
//! by name once every frame exists.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use glam::{DQuat, DVec3};
use tracing::{debug, info};

use crate::config::{FrameConfig, InertiaConfig, JointConfig, ModelConfig, QSpec, ShapeConfig};
use crate::constants::{DEFAULT_SHAPE_SIZE, TRANSFORM_EPSILON};
use crate::error::KinError;
use crate::inertia::Inertia;
use crate::mesh::{MeshError, load_mesh};
use crate::shape::{Shape, ShapeType};
use crate::transform::{Transform, rotation_between};
use crate::world::{FrameId, Joint, JointType, Mimic, Uncertainty, World};

/// Import options for model loading
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Base directory for resolving relative mesh paths
    pub base_dir: PathBuf,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
        }
    }
}

/// Import a model file (RON, or JSON by extension)
///
/// Mesh paths resolve relative to the file's directory.
pub fn import_model(path: impl AsRef<Path>) -> Result<World, KinError> {
    let path = path.as_ref();
    let config = ModelConfig::load(path)?;
    let options = ImportOptions {
        base_dir: path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    let world = build_world(&config, &options)?;
    info!(
        "Imported '{}': {} frames, {} joints",
        path.display(),
        world.frame_count(),
        world.joint_count()
    );
    Ok(world)
}

/// Import a model from RON text
pub fn import_model_str(content: &str) -> Result<World, KinError> {
    build_world(&ModelConfig::from_ron_str(content)?, &ImportOptions::default())
}

/// Build a world from a parsed configuration
pub fn build_world(config: &ModelConfig, options: &ImportOptions) -> Result<World, KinError> {
    let mut world = World::new();

    // Phase 1: frames, links, attachments
    let mut ids: HashMap<&str, FrameId> = HashMap::new();
    for frame in &config.frames {
        if frame.name.is_empty() {
            return Err(KinError::Config("frame without a name".to_string()));
        }
        let id = world.add_frame(frame.name.as_str());
        if ids.insert(frame.name.as_str(), id).is_some() {
            return Err(KinError::Config(format!(
                "duplicate frame name '{}'",
                frame.name
            )));
        }
    }

    let ordered: Vec<(FrameId, &FrameConfig)> = config
        .frames
        .iter()
        .map(|f| (ids[f.name.as_str()], f))
        .collect();

    for &(id, frame) in &ordered {
        if let Some(parent) = &frame.parent {
            let parent_id = *ids
                .get(parent.as_str())
                .ok_or_else(|| KinError::FrameNotFound(parent.clone()))?;
            world.link_from(id, parent_id)?;
        }
    }

    for &(id, frame) in &ordered {
        apply_frame(&mut world, id, frame, options)?;
    }

    for &(id, frame) in &ordered {
        if let Some(joint) = &frame.joint {
            let rel = joint.rel.as_ref().or(frame.rel.as_ref());
            apply_joint(&mut world, id, &frame.name, joint, rel)?;
        }
    }

    // Phase 2: mimic targets
    world.resolve_mimics()?;

    world.ensure_q_layout();
    world.calc_absolute_poses();
    debug!("Built world with {} coordinates", world.q_dim());
    Ok(world)
}

fn apply_frame(
    world: &mut World,
    id: FrameId,
    config: &FrameConfig,
    options: &ImportOptions,
) -> Result<(), KinError> {
    let frame = world.get_mut(id)?;
    frame.active = config.active;
    frame.attributes = config.attributes.clone();
    if let Some(pose) = &config.pose {
        frame.pose = parse_transform(pose, &config.name)?;
    }
    if config.joint.is_none()
        && let Some(rel) = &config.rel
    {
        frame.rel = parse_transform(rel, &config.name)?;
    }

    match (config.mass, &config.inertia) {
        (Some(mass), flags) => {
            let mut inertia = Inertia::from_mass(mass);
            let InertiaConfig {
                fixed,
                is_static,
                kinematic,
                dyntype,
            } = flags.clone().unwrap_or_default();
            inertia.classify(fixed, is_static, kinematic, dyntype)?;
            world.add_inertia(id, inertia)?;
        }
        (None, Some(_)) => {
            return Err(KinError::Config(format!(
                "inertia flags of '{}' need a mass",
                config.name
            )));
        }
        (None, None) => {}
    }

    if let Some(shape) = &config.shape {
        let shape = build_shape(world, id, &config.name, shape, options)?;
        world.add_shape(id, shape)?;
    }
    Ok(())
}

fn build_shape(
    world: &mut World,
    id: FrameId,
    name: &str,
    config: &ShapeConfig,
    options: &ImportOptions,
) -> Result<Shape, KinError> {
    let shape_type = config
        .shape_type
        .as_ref()
        .ok_or_else(|| KinError::UnknownShapeType(format!("shape of '{name}' has no type")))?
        .shape_type()?;

    let mut size = DEFAULT_SHAPE_SIZE;
    if let Some(values) = &config.size {
        if values.len() > size.len() {
            return Err(KinError::InvalidSize {
                frame: name.to_string(),
                reason: format!("size has {} entries, at most 4 allowed", values.len()),
            });
        }
        size[..values.len()].copy_from_slice(values);
    }

    let mut shape = Shape::with_size(shape_type, size);
    shape.contact = config.contact;
    if let Some(color) = &config.color {
        shape.set_color(color)?;
    }

    let frame = world.get_mut(id)?;
    if let Some(mesh_path) = &config.mesh {
        let path = resolve_mesh_path(mesh_path, &options.base_dir)?;
        let loaded = load_mesh(&path)?;
        let colors = std::mem::take(&mut shape.mesh.colors);
        shape.mesh = loaded;
        shape.mesh.colors = colors;
        frame
            .attributes
            .insert("mesh".to_string(), mesh_path.display().to_string());
    }
    if let Some(scale) = config.meshscale {
        shape.mesh.scale_uniform(scale);
        frame
            .attributes
            .insert("meshscale".to_string(), scale.to_string());
    }
    if config.center_mesh && shape_type == ShapeType::Mesh && !shape.mesh.is_empty() {
        shape.mesh.center();
    }

    shape.build(name)?;
    if config.colored_box {
        shape.color_box(name)?;
    }
    Ok(shape)
}

/// Resolve a mesh reference against the model directory
fn resolve_mesh_path(path: &Path, base_dir: &Path) -> Result<PathBuf, KinError> {
    let resolved = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    };
    if !resolved.exists() {
        return Err(MeshError::Io(format!("mesh file not found: {}", resolved.display())).into());
    }
    Ok(resolved)
}

/// Parse a configured transform, naming the frame on failure
fn parse_transform(values: &[f64], frame: &str) -> Result<Transform, KinError> {
    Transform::from_slice(values).map_err(|e| match e {
        KinError::NonFiniteTransform(_) => KinError::NonFiniteTransform(frame.to_string()),
        other => other,
    })
}

/// Attach the joint of a frame entry
///
/// The configured edge is `A · Q(q) · B`: a non-identity `B` becomes the
/// relative transform of the frame's single child, a non-identity `A` is
/// spliced in as a new parent frame, and the joint itself drives `Q`.
fn apply_joint(
    world: &mut World,
    id: FrameId,
    name: &str,
    config: &JointConfig,
    rel: Option<&Vec<f64>>,
) -> Result<(), KinError> {
    let joint_type = match &config.joint_type {
        Some(spec) => spec.joint_type()?,
        None => JointType::HingeX,
    };

    let mut a = match &config.a {
        Some(values) => parse_transform(values, name)?,
        None => Transform::IDENTITY,
    };
    let mut b = if config.b_inv_a {
        a.inverse()
    } else {
        Transform::IDENTITY
    };
    if let Some(values) = &config.b {
        b = parse_transform(values, name)?;
    }

    if let Some(axis) = &config.axis {
        if axis.len() != 3 {
            return Err(KinError::Config(format!(
                "axis of '{name}' needs 3 components, got {}",
                axis.len()
            )));
        }
        let align = Transform::from_rotation(rotation_between(DVec3::X, DVec3::from_slice(axis)));
        if !align.is_finite() {
            return Err(KinError::NonFiniteTransform(name.to_string()));
        }
        a = a * align;
        b = align.inverse() * b;
    }

    if !b.is_identity(TRANSFORM_EPSILON) {
        let children = world.children(id);
        let [child] = children else {
            return Err(KinError::Config(format!(
                "suffix transform of '{name}' needs exactly one child, found {}",
                children.len()
            )));
        };
        let child = *child;
        let child_frame = world.get_mut(child)?;
        if child_frame.joint.is_some() {
            return Err(KinError::JointExists(child_frame.name.clone()));
        }
        child_frame.rel = b;
    }

    if !a.is_identity(TRANSFORM_EPSILON) {
        world.insert_pre_link(id, a)?;
        world.get_mut(id)?.rel = Transform::IDENTITY;
    }
    if let Some(values) = rel {
        world.get_mut(id)?.rel = parse_transform(values, name)?;
    }

    let mut joint = Joint::new(joint_type);
    joint.active = !config.inactive;
    if let Some(h) = config.ctrl_h {
        joint.ctrl_h = h;
    }
    joint.uncertainty = config.uncertainty.clone().map(|sigma| Uncertainty { sigma });
    let dim = joint_type.dim();

    let q0 = match &config.q {
        Some(QSpec::Scalar(angle)) if dim == 0 => {
            world.get_mut(id)?.rel.rot = DQuat::from_rotation_x(*angle);
            None
        }
        Some(QSpec::Scalar(value)) => Some(vec![*value; dim]),
        Some(QSpec::Vector(values)) => {
            if values.len() != dim {
                return Err(KinError::QDimension {
                    frame: name.to_string(),
                    expected: dim,
                    actual: values.len(),
                });
            }
            Some(values.clone())
        }
        None => None,
    };

    joint.limits = config.limits.clone().unwrap_or_default();
    if let Some(ctrl) = &config.ctrl_limits
        && joint_type != JointType::Rigid
    {
        if ctrl.len() != 3 {
            return Err(KinError::LimitsDimension {
                frame: name.to_string(),
                expected: 3,
                actual: ctrl.len(),
            });
        }
        if joint.limits.is_empty() {
            joint.limits = vec![0.0; 2 * dim];
        }
        joint.limits.extend_from_slice(ctrl);
    }
    joint.mimic = config.mimic.clone().map(Mimic::Pending);
    if joint.mimic.is_some() {
        joint.q0.clear();
        return world.add_joint(id, joint);
    }

    world.add_joint(id, joint)?;
    match q0 {
        Some(q0) => {
            world.calc_rel_from_q(id, &q0, 0)?;
            set_q0(world, id, q0)?;
        }
        None => {
            let q0 = world.calc_q_from_rel(id)?;
            set_q0(world, id, q0)?;
        }
    }
    Ok(())
}

fn set_q0(world: &mut World, id: FrameId, q0: Vec<f64>) -> Result<(), KinError> {
    let frame = world.get_mut(id)?;
    let name = frame.name.clone();
    frame.joint_mut().ok_or(KinError::NoJoint(name))?.q0 = q0;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use glam::DVec3;

    #[test]
    fn test_frames_link_by_name() {
        let world = import_model_str(
            r#"(frames: [
                (name: "arm", parent: "base", joint: (type: "transX", q: 0.5)),
                (name: "base", X: [0.0, 0.0, 1.0]),
            ])"#,
        )
        .unwrap();
        let arm = world.frame_by_name("arm").unwrap();
        assert_eq!(world.frame_name(arm.parent().unwrap()), Some("base"));
        assert!(arm.pose.pos.abs_diff_eq(DVec3::new(0.5, 0.0, 1.0), 1e-12));
        assert_eq!(arm.joint().unwrap().q0, vec![0.5]);
    }

    #[test]
    fn test_unknown_parent_and_duplicates() {
        assert!(matches!(
            import_model_str(r#"(frames: [(name: "a", parent: "ghost")])"#),
            Err(KinError::FrameNotFound(_))
        ));
        assert!(matches!(
            import_model_str(r#"(frames: [(name: "a"), (name: "a")])"#),
            Err(KinError::Config(_))
        ));
    }

    #[test]
    fn test_default_joint_is_hinge_x_from_rel() {
        let world = import_model_str(
            r#"(frames: [
                (name: "base"),
                (name: "link", parent: "base", Q: [1.0, 0.0, 0.0, 0.0], joint: ()),
            ])"#,
        )
        .unwrap();
        let joint = world.frame_by_name("link").unwrap().joint().unwrap();
        assert_eq!(joint.joint_type(), JointType::HingeX);
        assert_abs_diff_eq!(joint.q0[0], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_scalar_q_on_rigid_rotates_about_x() {
        let world = import_model_str(
            r#"(frames: [
                (name: "base"),
                (name: "tip", parent: "base", joint: (type: "rigid", q: 0.4)),
            ])"#,
        )
        .unwrap();
        let tip = world.frame_by_name("tip").unwrap();
        let expected = Transform::from_rotation(DQuat::from_rotation_x(0.4));
        assert!(tip.rel.approx_eq(&expected, 1e-12));
        assert!(tip.joint().unwrap().q0.is_empty());
    }

    #[test]
    fn test_ctrl_limits_zero_fill() {
        let world = import_model_str(
            r#"(frames: [
                (name: "base"),
                (name: "j", parent: "base", joint: (type: "transXY", ctrl_limits: [1.0, 2.0, 3.0])),
            ])"#,
        )
        .unwrap();
        let joint = world.frame_by_name("j").unwrap().joint().unwrap();
        assert_eq!(joint.limits, vec![0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 3.0]);
        assert!(joint.validate_limits("j").is_ok());

        assert!(matches!(
            import_model_str(
                r#"(frames: [
                    (name: "base"),
                    (name: "j", parent: "base", joint: (ctrl_limits: [1.0])),
                ])"#,
            ),
            Err(KinError::LimitsDimension { expected: 3, .. })
        ));
    }

    #[test]
    fn test_limits_length_checked() {
        match import_model_str(
            r#"(frames: [
                (name: "base"),
                (name: "j", parent: "base", joint: (type: "universal", limits: [-1.0, 1.0])),
            ])"#,
        ) {
            Err(KinError::LimitsDimension {
                frame,
                expected,
                actual,
            }) => {
                assert_eq!(frame, "j");
                assert_eq!((expected, actual), (4, 2));
            }
            other => panic!("unexpected result: {other:?}"),
        }

        // mimic joints own no coordinates, so their limits are not checked
        let world = import_model_str(
            r#"(frames: [
                (name: "base"),
                (name: "lead", parent: "base", joint: (type: "transY")),
                (name: "follow", parent: "base", joint: (type: "transY", mimic: "lead", limits: [0.0])),
            ])"#,
        )
        .unwrap();
        let follow = world.frame_by_name("follow").unwrap().joint().unwrap();
        assert!(follow.q0.is_empty());
    }

    #[test]
    fn test_zero_quaternion_names_the_frame() {
        for joint in [
            r#"(type: "hingeZ", Q: [0.0, 0.0, 0.0, 0.0])"#,
            r#"(type: "hingeZ", A: [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0])"#,
        ] {
            let model = format!(
                r#"(frames: [(name: "base"), (name: "elbow", parent: "base", joint: {joint})])"#
            );
            match import_model_str(&model) {
                Err(KinError::NonFiniteTransform(name)) => assert_eq!(name, "elbow"),
                other => panic!("unexpected result for {joint}: {other:?}"),
            }
        }
    }

    #[test]
    fn test_q_vector_dimension_checked() {
        assert!(matches!(
            import_model_str(
                r#"(frames: [
                    (name: "base"),
                    (name: "j", parent: "base", joint: (type: "universal", q: [0.1])),
                ])"#,
            ),
            Err(KinError::QDimension { expected: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn test_suffix_needs_single_child() {
        assert!(matches!(
            import_model_str(
                r#"(frames: [
                    (name: "base"),
                    (name: "j", parent: "base", joint: (B: [0.0, 0.0, 1.0])),
                ])"#,
            ),
            Err(KinError::Config(_))
        ));
    }

    #[test]
    fn test_inertia_flags_need_mass() {
        assert!(matches!(
            import_model_str(r#"(frames: [(name: "a", inertia: (fixed: true))])"#),
            Err(KinError::Config(_))
        ));
    }

    #[test]
    fn test_shape_without_type() {
        assert!(matches!(
            import_model_str(r#"(frames: [(name: "a", shape: (size: [1.0]))])"#),
            Err(KinError::UnknownShapeType(_))
        ));
    }

    #[test]
    fn test_mesh_shape_from_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("tet.obj"),
            "v 1 1 1\nv 3 1 1\nv 1 3 1\nv 1 1 3\nf 1 3 2\nf 1 2 4\nf 1 4 3\nf 2 3 4\n",
        )
        .unwrap();
        let model = dir.path().join("model.ron");
        std::fs::write(
            &model,
            r#"(frames: [(name: "part", shape: (type: "mesh", mesh: "tet.obj", meshscale: 0.5, rel_includes_mesh_center: true))])"#,
        )
        .unwrap();

        let world = import_model(&model).unwrap();
        let part = world.frame_by_name("part").unwrap();
        let shape = part.shape().unwrap();
        assert_eq!(shape.mesh.vertices.len(), 4);
        assert!(shape.mesh.centroid().abs_diff_eq(DVec3::ZERO, 1e-12));
        assert_eq!(shape.core.triangles.len(), 4);
        assert!(shape.mesh_radius().is_some());
        assert_eq!(part.attributes.get("mesh").map(String::as_str), Some("tet.obj"));
        assert_eq!(part.attributes.get("meshscale").map(String::as_str), Some("0.5"));

        std::fs::write(
            &model,
            r#"(frames: [(name: "part", shape: (type: "mesh", mesh: "missing.stl"))])"#,
        )
        .unwrap();
        assert!(matches!(import_model(&model), Err(KinError::Mesh(_))));
    }
}
